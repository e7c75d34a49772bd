use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    payment::Card,
    store::OrderRecord,
};

/// Requested delivery moment, interpreted as UTC.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct DeliveryDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    #[serde(default)]
    pub hour: u32,
    #[serde(default)]
    pub minutes: u32,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct OrderParams {
    pub currency: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
    pub date: DeliveryDate,
}

impl OrderParams {
    /// Checks every field, naming the first failing one, and resolves the
    /// delivery date. The date must be strictly in the future.
    pub fn validate(&self) -> AppResult<DateTime<Utc>> {
        let fields = [
            ("currency", &self.currency),
            ("address", &self.address),
            ("city", &self.city),
            ("state", &self.state),
            ("zip_code", &self.zip_code),
            ("country", &self.country),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(AppError::InvalidArgument(format!(
                    "{name} must not be empty"
                )));
            }
        }

        let date = &self.date;
        let delivery = Utc
            .with_ymd_and_hms(date.year, date.month, date.day, date.hour, date.minutes, 0)
            .single()
            .ok_or_else(|| {
                AppError::InvalidArgument("date is not a valid calendar date".to_string())
            })?;

        if delivery <= Utc::now() {
            return Err(AppError::InvalidArgument(
                "date must be in the future".to_string(),
            ));
        }
        Ok(delivery)
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PlaceOrderRequest {
    pub user_id: Uuid,
    pub cart_id: Uuid,
    #[serde(flatten)]
    pub params: OrderParams,
    pub card: Card,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OrderListQuery {
    pub user_id: Uuid,
    #[serde(flatten)]
    pub pagination: crate::routes::params::Pagination,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<OrderRecord>,
}

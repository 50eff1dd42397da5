use crate::entities::voucher_entity;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateVoucherRequest {
    pub brand_id: i64,
    /// 全局唯一券码
    pub voucher_code: String,
    pub description: String,
    pub cost: Decimal,
    pub quantity: i32,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RestockRequest {
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateVoucherStatusRequest {
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VoucherResponse {
    pub id: i64,
    pub voucher_code: String,
    pub brand_id: i64,
    pub description: String,
    pub cost: Decimal,
    pub initial_quantity: i32,
    pub current_quantity: i32,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl From<voucher_entity::Model> for VoucherResponse {
    fn from(m: voucher_entity::Model) -> Self {
        VoucherResponse {
            id: m.id,
            voucher_code: m.voucher_code,
            brand_id: m.brand_id,
            description: m.description,
            cost: m.cost,
            initial_quantity: m.initial_quantity,
            current_quantity: m.current_quantity,
            expires_at: m.expires_at,
            is_active: m.is_active,
        }
    }
}

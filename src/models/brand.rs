use crate::entities::brand_entity;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateBrandRequest {
    pub name: String,
    /// 初始钱包余额
    pub initial_balance: Decimal,
    #[serde(default)]
    pub daily_spend_limit: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct DepositRequest {
    pub amount: Decimal,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateBrandStatusRequest {
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BrandResponse {
    pub id: i64,
    pub name: String,
    pub wallet_balance: Decimal,
    pub daily_spend_limit: Decimal,
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<brand_entity::Model> for BrandResponse {
    fn from(m: brand_entity::Model) -> Self {
        BrandResponse {
            id: m.id,
            name: m.name,
            wallet_balance: m.wallet_balance,
            daily_spend_limit: m.daily_spend_limit,
            is_active: m.is_active,
            created_at: m.created_at,
        }
    }
}

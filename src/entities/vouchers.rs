use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;

/// 奖券实体
/// - current_quantity 只在批处理中扣减, 管理端补货时增加
/// - version: 乐观锁版本号
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "vouchers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub voucher_code: String,
    pub brand_id: i64,
    pub description: String,
    pub cost: Decimal,
    pub initial_quantity: i32,
    pub current_quantity: i32,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub version: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    /// Awardable: active, in stock, and not past expiry.
    pub fn is_available(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.current_quantity > 0
            && self.expires_at.map_or(true, |expiry| now < expiry)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

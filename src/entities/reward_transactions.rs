use crate::models::TransactionStatus;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;

/// 发奖流水 (append-only)
/// - batch_id 用于幂等探测: 同一批次的所有流水共享同一 batch_id
/// - amount 仅在 WIN 时有值, 等于发放时的券面成本
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "reward_transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    pub game_id: i64,
    pub voucher_id: Option<i64>,
    pub batch_id: String,
    pub status: TransactionStatus,
    pub amount: Option<Decimal>,
    pub reward_message: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

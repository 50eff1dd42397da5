use crate::entities::reward_transaction_entity;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::StringLen;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Canonical losing message written on every LOSS transaction.
pub const LOSS_MESSAGE: &str = "Better luck next time!";

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    #[sea_orm(string_value = "WIN")]
    Win,
    #[sea_orm(string_value = "LOSS")]
    Loss,
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "FAILED")]
    Failed,
    #[sea_orm(string_value = "REFUNDED")]
    Refunded,
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionStatus::Win => write!(f, "WIN"),
            TransactionStatus::Loss => write!(f, "LOSS"),
            TransactionStatus::Pending => write!(f, "PENDING"),
            TransactionStatus::Failed => write!(f, "FAILED"),
            TransactionStatus::Refunded => write!(f, "REFUNDED"),
        }
    }
}

/// One tick's worth of users for one game.
/// 对外字段使用 camelCase (批处理接口契约)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RewardRequest {
    pub batch_id: String,
    pub game_id: i64,
    pub usernames: Vec<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserRewardResult {
    pub username: String,
    pub status: TransactionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voucher_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voucher_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    pub message: String,
}

impl UserRewardResult {
    pub fn loss(username: String) -> Self {
        UserRewardResult {
            username,
            status: TransactionStatus::Loss,
            voucher_id: None,
            voucher_code: None,
            amount: None,
            message: LOSS_MESSAGE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RewardResponse {
    pub batch_id: String,
    pub processed_at: DateTime<Utc>,
    pub rewards: Vec<UserRewardResult>,
    pub total_spent: Decimal,
    pub processing_time_ms: i64,
}

/// 发奖流水查询响应 (历史记录)
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TransactionResponse {
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

impl From<reward_transaction_entity::Model> for TransactionResponse {
    fn from(m: reward_transaction_entity::Model) -> Self {
        TransactionResponse {
            id: m.id,
            user_id: m.user_id,
            game_id: m.game_id,
            voucher_id: m.voucher_id,
            batch_id: m.batch_id,
            status: m.status,
            amount: m.amount,
            reward_message: m.reward_message,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GameStatisticsResponse {
    pub total_wins: i64,
    pub total_rewards_distributed: Decimal,
}

/// WebSocket 玩家投递消息: {"username": "..."}
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PlayMessage {
    pub username: String,
}

/// WebSocket 入队确认
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlayAck {
    pub r#type: String,
    pub game_id: i64,
    pub username: String,
}

impl PlayAck {
    pub fn new(game_id: i64, username: String) -> Self {
        PlayAck {
            r#type: "ack".to_string(),
            game_id,
            username,
        }
    }
}

use crate::entities::game_entity;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::StringLen;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 游戏状态机:
/// SCHEDULED -> ACTIVE -> COMPLETED
///                    \-> BUDGET_EXHAUSTED (剩余预算归零)
/// SCHEDULED / ACTIVE -> CANCELLED (管理端)
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    #[sea_orm(string_value = "SCHEDULED")]
    Scheduled,
    #[sea_orm(string_value = "ACTIVE")]
    Active,
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
    #[sea_orm(string_value = "BUDGET_EXHAUSTED")]
    BudgetExhausted,
}

impl std::fmt::Display for GameStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameStatus::Scheduled => write!(f, "SCHEDULED"),
            GameStatus::Active => write!(f, "ACTIVE"),
            GameStatus::Completed => write!(f, "COMPLETED"),
            GameStatus::Cancelled => write!(f, "CANCELLED"),
            GameStatus::BudgetExhausted => write!(f, "BUDGET_EXHAUSTED"),
        }
    }
}

/// 单个品牌的出资项
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct BrandContribution {
    pub brand_id: i64,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateGameRequest {
    pub start_time: DateTime<Utc>,
    pub duration_minutes: i64,
    /// 各品牌出资, 合计即游戏总预算
    pub brand_contributions: Vec<BrandContribution>,
    #[serde(default)]
    pub win_probability: Option<f64>,
    #[serde(default)]
    pub volatility_factor: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct GameListQuery {
    pub status: Option<GameStatus>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GameResponse {
    pub id: i64,
    pub game_code: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub total_budget: Decimal,
    pub remaining_budget: Decimal,
    pub status: GameStatus,
    pub win_probability: f64,
    pub volatility_factor: f64,
}

impl From<game_entity::Model> for GameResponse {
    fn from(m: game_entity::Model) -> Self {
        GameResponse {
            id: m.id,
            game_code: m.game_code,
            start_time: m.start_time,
            end_time: m.end_time,
            total_budget: m.total_budget,
            remaining_budget: m.remaining_budget,
            status: m.status,
            win_probability: m.win_probability,
            volatility_factor: m.volatility_factor,
        }
    }
}

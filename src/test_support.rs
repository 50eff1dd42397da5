//! Shared fixtures for the inline test modules: an in-memory sqlite store
//! (single connection, so concurrent transactions serialize the way the
//! production row locks do) plus seed helpers for the core entities.

use crate::entities::{brand_entity as brands, game_entity as games, voucher_entity as vouchers};
use crate::models::GameStatus;
use chrono::{DateTime, Duration, Utc};
use migration::{Migrator, MigratorTrait};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};

pub async fn db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:".to_string());
    options
        .max_connections(1)
        .acquire_timeout(std::time::Duration::from_secs(600));

    let conn = Database::connect(options)
        .await
        .expect("failed to open in-memory sqlite");
    Migrator::up(&conn, None)
        .await
        .expect("failed to run migrations");
    conn
}

pub async fn insert_brand(db: &DatabaseConnection, name: &str, balance: Decimal) -> brands::Model {
    let now = Utc::now();
    brands::ActiveModel {
        name: Set(name.to_string()),
        wallet_balance: Set(balance),
        daily_spend_limit: Set(Decimal::ZERO),
        is_active: Set(true),
        created_at: Set(Some(now)),
        updated_at: Set(Some(now)),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("failed to insert brand")
}

pub struct GameSeed {
    pub status: GameStatus,
    pub total_budget: Decimal,
    pub remaining_budget: Decimal,
    pub start_offset_secs: i64,
    pub end_offset_secs: i64,
    pub win_probability: f64,
    pub volatility_factor: f64,
}

impl Default for GameSeed {
    fn default() -> Self {
        GameSeed {
            status: GameStatus::Active,
            total_budget: dec!(100.00),
            remaining_budget: dec!(100.00),
            start_offset_secs: -60,
            end_offset_secs: 3600,
            win_probability: 0.15,
            volatility_factor: 1.2,
        }
    }
}

/// Insert a game whose window is expressed as offsets from `now`.
pub async fn insert_game(
    db: &DatabaseConnection,
    seed: GameSeed,
    now: DateTime<Utc>,
) -> games::Model {
    games::ActiveModel {
        game_code: Set(format!("GAME_{}", uuid::Uuid::new_v4())),
        start_time: Set(now + Duration::seconds(seed.start_offset_secs)),
        end_time: Set(now + Duration::seconds(seed.end_offset_secs)),
        total_budget: Set(seed.total_budget),
        remaining_budget: Set(seed.remaining_budget),
        status: Set(seed.status),
        win_probability: Set(seed.win_probability),
        volatility_factor: Set(seed.volatility_factor),
        version: Set(0),
        created_at: Set(Some(now)),
        updated_at: Set(Some(now)),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("failed to insert game")
}

pub async fn insert_voucher(
    db: &DatabaseConnection,
    brand_id: i64,
    code: &str,
    cost: Decimal,
    quantity: i32,
) -> vouchers::Model {
    let now = Utc::now();
    vouchers::ActiveModel {
        voucher_code: Set(code.to_string()),
        brand_id: Set(brand_id),
        description: Set(format!("{code} voucher")),
        cost: Set(cost),
        initial_quantity: Set(quantity),
        current_quantity: Set(quantity),
        expires_at: Set(None),
        is_active: Set(true),
        version: Set(0),
        created_at: Set(Some(now)),
        updated_at: Set(Some(now)),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("failed to insert voucher")
}

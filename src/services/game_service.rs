use crate::config::RewardConfig;
use crate::entities::{
    brand_entity as brands, game_brand_link_entity as links, game_entity as games,
};
use crate::error::{AppError, AppResult};
use crate::models::{CreateGameRequest, GameResponse, GameStatus};
use crate::utils::{Clock, money};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use std::collections::HashSet;

#[derive(Clone)]
pub struct GameService {
    db: DatabaseConnection,
    clock: Clock,
    config: RewardConfig,
}

impl GameService {
    pub fn new(db: DatabaseConnection, clock: Clock, config: RewardConfig) -> Self {
        Self { db, clock, config }
    }

    /// 创建游戏:
    /// 1. 校验每个品牌出资可负担
    /// 2. 扣除各品牌钱包 (出资锁定)
    /// 3. 总预算 = 各出资之和, 写入锁定的关联记录
    pub async fn create_game(&self, request: CreateGameRequest) -> AppResult<GameResponse> {
        if request.brand_contributions.is_empty() {
            return Err(AppError::ValidationError(
                "At least one brand contribution is required".into(),
            ));
        }
        if request.duration_minutes <= 0 {
            return Err(AppError::ValidationError(
                "Duration must be positive".into(),
            ));
        }
        let mut seen = HashSet::new();
        for contribution in &request.brand_contributions {
            if contribution.amount <= Decimal::ZERO {
                return Err(AppError::ValidationError(
                    "Contribution amount must be positive".into(),
                ));
            }
            if !seen.insert(contribution.brand_id) {
                return Err(AppError::ValidationError(format!(
                    "Duplicate contribution for brand {}",
                    contribution.brand_id
                )));
            }
        }

        let win_probability = request
            .win_probability
            .unwrap_or(self.config.default_win_probability);
        if !(win_probability > 0.0 && win_probability <= 1.0) {
            return Err(AppError::ValidationError(
                "Win probability must be in (0, 1]".into(),
            ));
        }
        let volatility_factor = request
            .volatility_factor
            .unwrap_or(self.config.default_volatility_factor);
        if volatility_factor <= 0.0 {
            return Err(AppError::ValidationError(
                "Volatility factor must be positive".into(),
            ));
        }

        let now = self.clock.now();
        let txn = self.db.begin().await?;

        // 先整体校验再扣款
        let mut total_budget = Decimal::ZERO;
        for contribution in &request.brand_contributions {
            let brand = brands::Entity::find_by_id(contribution.brand_id)
                .one(&txn)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(format!("Brand not found: {}", contribution.brand_id))
                })?;
            let amount = money::round_money(contribution.amount);
            if !brand.can_afford(amount) {
                return Err(AppError::InsufficientFunds(format!(
                    "Brand {} cannot afford contribution of {}",
                    brand.name, amount
                )));
            }
            total_budget += amount;
        }

        let end_time = request.start_time + Duration::minutes(request.duration_minutes);
        let game = games::ActiveModel {
            game_code: Set(format!("GAME_{}", now.timestamp_millis())),
            start_time: Set(request.start_time),
            end_time: Set(end_time),
            total_budget: Set(total_budget),
            remaining_budget: Set(total_budget),
            status: Set(GameStatus::Scheduled),
            win_probability: Set(win_probability),
            volatility_factor: Set(volatility_factor),
            version: Set(0),
            created_at: Set(Some(now)),
            updated_at: Set(Some(now)),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        for contribution in &request.brand_contributions {
            let brand = brands::Entity::find_by_id(contribution.brand_id)
                .one(&txn)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(format!("Brand not found: {}", contribution.brand_id))
                })?;
            let amount = money::round_money(contribution.amount);

            let mut am = brand.clone().into_active_model();
            am.wallet_balance = Set(brand.wallet_balance - amount);
            am.updated_at = Set(Some(now));
            am.update(&txn).await?;

            links::ActiveModel {
                game_id: Set(game.id),
                brand_id: Set(contribution.brand_id),
                contribution_amount: Set(amount),
                is_locked: Set(true),
                created_at: Set(Some(now)),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await?;

        log::info!(
            "Game created with ID: {} and total budget: {}",
            game.id,
            total_budget
        );
        Ok(game.into())
    }

    pub async fn get_game(&self, id: i64) -> AppResult<GameResponse> {
        let game = games::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Game not found: {id}")))?;
        Ok(game.into())
    }

    pub async fn list_games(&self, status: Option<GameStatus>) -> AppResult<Vec<GameResponse>> {
        let mut query = games::Entity::find().order_by_asc(games::Column::Id);
        if let Some(status) = status {
            query = query.filter(games::Column::Status.eq(status));
        }
        let list = query.all(&self.db).await?;
        Ok(list.into_iter().map(Into::into).collect())
    }

    /// 当前正在进行 (ACTIVE 且未到结束时间) 的游戏
    pub async fn active_games(&self) -> AppResult<Vec<GameResponse>> {
        let now = self.clock.now();
        let list = games::Entity::find()
            .filter(games::Column::Status.eq(GameStatus::Active))
            .filter(games::Column::EndTime.gt(now))
            .order_by_asc(games::Column::Id)
            .all(&self.db)
            .await?;
        Ok(list.into_iter().map(Into::into).collect())
    }

    pub async fn start_game(&self, id: i64) -> AppResult<GameResponse> {
        self.transition(id, GameStatus::Scheduled, GameStatus::Active)
            .await
    }

    pub async fn complete_game(&self, id: i64) -> AppResult<GameResponse> {
        self.transition(id, GameStatus::Active, GameStatus::Completed)
            .await
    }

    pub async fn cancel_game(&self, id: i64) -> AppResult<GameResponse> {
        let txn = self.db.begin().await?;
        let game = games::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Game not found: {id}")))?;
        if game.status != GameStatus::Scheduled && game.status != GameStatus::Active {
            return Err(AppError::StateInvalid(format!(
                "Game {} cannot be cancelled from status {}",
                id, game.status
            )));
        }
        set_status(&txn, &game, GameStatus::Cancelled, self.clock.now()).await?;
        let updated = games::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Game not found: {id}")))?;
        txn.commit().await?;
        Ok(updated.into())
    }

    async fn transition(
        &self,
        id: i64,
        from: GameStatus,
        to: GameStatus,
    ) -> AppResult<GameResponse> {
        let txn = self.db.begin().await?;
        let game = games::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Game not found: {id}")))?;
        if game.status != from {
            return Err(AppError::StateInvalid(format!(
                "Game {id} must be in {from} status, found {}",
                game.status
            )));
        }
        set_status(&txn, &game, to, self.clock.now()).await?;
        let updated = games::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Game not found: {id}")))?;
        txn.commit().await?;

        log::info!("Game {id} transitioned {from} -> {to}");
        Ok(updated.into())
    }

    /// Sweeper: SCHEDULED games past their start time go ACTIVE.
    /// Per-game failures are logged and retried on the next sweep.
    pub async fn auto_start_games(&self) -> AppResult<usize> {
        let now = self.clock.now();
        let due = games::Entity::find()
            .filter(games::Column::Status.eq(GameStatus::Scheduled))
            .filter(games::Column::StartTime.lte(now))
            .all(&self.db)
            .await?;

        let mut started = 0;
        for game in due {
            match set_status(&self.db, &game, GameStatus::Active, now).await {
                Ok(()) => {
                    log::info!("Auto-starting game: {}", game.id);
                    started += 1;
                }
                Err(e) => log::error!("Error auto-starting game {}: {e:?}", game.id),
            }
        }
        Ok(started)
    }

    /// Sweeper: ACTIVE games past their end time go COMPLETED.
    pub async fn auto_complete_games(&self) -> AppResult<usize> {
        let now = self.clock.now();
        let due = games::Entity::find()
            .filter(games::Column::Status.eq(GameStatus::Active))
            .filter(games::Column::EndTime.lte(now))
            .all(&self.db)
            .await?;

        let mut completed = 0;
        for game in due {
            match set_status(&self.db, &game, GameStatus::Completed, now).await {
                Ok(()) => {
                    log::info!("Auto-completing game: {}", game.id);
                    completed += 1;
                }
                Err(e) => log::error!("Error auto-completing game {}: {e:?}", game.id),
            }
        }
        Ok(completed)
    }
}

/// Version-checked single-row status update.
async fn set_status<C: ConnectionTrait>(
    conn: &C,
    game: &games::Model,
    to: GameStatus,
    now: DateTime<Utc>,
) -> AppResult<()> {
    let result = games::Entity::update_many()
        .col_expr(games::Column::Status, Expr::value(to))
        .col_expr(games::Column::Version, Expr::value(game.version + 1))
        .col_expr(games::Column::UpdatedAt, Expr::value(now))
        .filter(games::Column::Id.eq(game.id))
        .filter(games::Column::Version.eq(game.version))
        .exec(conn)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::Conflict(format!(
            "Game {} was modified concurrently",
            game.id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BrandContribution;
    use crate::test_support;
    use rust_decimal_macros::dec;

    fn service_at(db: &DatabaseConnection, now: DateTime<Utc>) -> GameService {
        GameService::new(db.clone(), Clock::manual(now), RewardConfig::default())
    }

    #[tokio::test]
    async fn test_create_game_debits_brand_wallets() {
        let db = test_support::db().await;
        let now = Utc::now();
        let nike = test_support::insert_brand(&db, "Nike", dec!(600.00)).await;
        let adidas = test_support::insert_brand(&db, "Adidas", dec!(400.00)).await;
        let service = service_at(&db, now);

        let game = service
            .create_game(CreateGameRequest {
                start_time: now + Duration::minutes(1),
                duration_minutes: 60,
                brand_contributions: vec![
                    BrandContribution {
                        brand_id: nike.id,
                        amount: dec!(500.00),
                    },
                    BrandContribution {
                        brand_id: adidas.id,
                        amount: dec!(300.00),
                    },
                ],
                win_probability: None,
                volatility_factor: None,
            })
            .await
            .unwrap();

        assert_eq!(game.total_budget, dec!(800.00));
        assert_eq!(game.remaining_budget, dec!(800.00));
        assert_eq!(game.status, GameStatus::Scheduled);
        assert_eq!(game.win_probability, 0.15);

        let nike_after = brands::Entity::find_by_id(nike.id)
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(nike_after.wallet_balance, dec!(100.00));

        let link_rows = links::Entity::find().all(&db).await.unwrap();
        assert_eq!(link_rows.len(), 2);
        assert!(link_rows.iter().all(|l| l.is_locked));
    }

    #[tokio::test]
    async fn test_create_game_insufficient_wallet() {
        let db = test_support::db().await;
        let now = Utc::now();
        let brand = test_support::insert_brand(&db, "Nike", dec!(100.00)).await;
        let service = service_at(&db, now);

        let err = service
            .create_game(CreateGameRequest {
                start_time: now,
                duration_minutes: 30,
                brand_contributions: vec![BrandContribution {
                    brand_id: brand.id,
                    amount: dec!(500.00),
                }],
                win_probability: None,
                volatility_factor: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InsufficientFunds(_)));

        // 校验失败必须整体回滚
        let wallet = brands::Entity::find_by_id(brand.id)
            .one(&db)
            .await
            .unwrap()
            .unwrap()
            .wallet_balance;
        assert_eq!(wallet, dec!(100.00));
    }

    #[tokio::test]
    async fn test_manual_lifecycle_transitions() {
        let db = test_support::db().await;
        let now = Utc::now();
        let brand = test_support::insert_brand(&db, "Nike", dec!(100.00)).await;
        let service = service_at(&db, now);

        let game = service
            .create_game(CreateGameRequest {
                start_time: now,
                duration_minutes: 30,
                brand_contributions: vec![BrandContribution {
                    brand_id: brand.id,
                    amount: dec!(50.00),
                }],
                win_probability: Some(0.5),
                volatility_factor: None,
            })
            .await
            .unwrap();

        let started = service.start_game(game.id).await.unwrap();
        assert_eq!(started.status, GameStatus::Active);

        // 不能重复启动
        let err = service.start_game(game.id).await.unwrap_err();
        assert!(matches!(err, AppError::StateInvalid(_)));

        let completed = service.complete_game(game.id).await.unwrap();
        assert_eq!(completed.status, GameStatus::Completed);
    }

    #[tokio::test]
    async fn test_sweeper_transitions_due_games() {
        let db = test_support::db().await;
        let now = Utc::now();
        let service = service_at(&db, now);

        // 已到开始时间的 SCHEDULED 游戏
        let due = test_support::insert_game(
            &db,
            test_support::GameSeed {
                status: GameStatus::Scheduled,
                start_offset_secs: -5,
                end_offset_secs: 3600,
                ..test_support::GameSeed::default()
            },
            now,
        )
        .await;
        // 未到开始时间的游戏不受影响
        let not_due = test_support::insert_game(
            &db,
            test_support::GameSeed {
                status: GameStatus::Scheduled,
                start_offset_secs: 3600,
                end_offset_secs: 7200,
                ..test_support::GameSeed::default()
            },
            now,
        )
        .await;
        // 已到结束时间的 ACTIVE 游戏
        let overdue = test_support::insert_game(
            &db,
            test_support::GameSeed {
                status: GameStatus::Active,
                start_offset_secs: -3600,
                end_offset_secs: -5,
                ..test_support::GameSeed::default()
            },
            now,
        )
        .await;

        assert_eq!(service.auto_start_games().await.unwrap(), 1);
        assert_eq!(service.auto_complete_games().await.unwrap(), 1);

        let reload = |id: i64| {
            let db = db.clone();
            async move {
                games::Entity::find_by_id(id)
                    .one(&db)
                    .await
                    .unwrap()
                    .unwrap()
            }
        };
        assert_eq!(reload(due.id).await.status, GameStatus::Active);
        assert_eq!(reload(not_due.id).await.status, GameStatus::Scheduled);
        assert_eq!(reload(overdue.id).await.status, GameStatus::Completed);
    }
}

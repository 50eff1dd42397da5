use crate::config::RewardConfig;
use crate::entities::{
    game_entity as games, reward_transaction_entity as transactions, user_entity as users,
    voucher_entity as vouchers,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    GameStatisticsResponse, GameStatus, LOSS_MESSAGE, PaginatedResponse, PaginationParams,
    RewardRequest, RewardResponse, TransactionResponse, TransactionStatus, UserRewardResult,
};
use crate::services::UserService;
use crate::utils::{Clock, SharedRng};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DatabaseTransaction, EntityTrait,
    FromQueryResult, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use std::collections::HashMap;
use std::time::Instant;

/// Test-only hook invoked before each user iteration with the user's index;
/// a returned status is applied to the game row inside the batch transaction.
#[cfg(test)]
pub(crate) type UserHook = std::sync::Arc<dyn Fn(usize) -> Option<GameStatus> + Send + Sync>;

/// Per-batch constants threaded through the per-user decision loop.
struct BatchContext {
    game_id: i64,
    batch_id: String,
    tick_budget: Decimal,
    win_probability: f64,
    now: DateTime<Utc>,
}

/// 时间窗批处理核心:
/// 1. 幂等探测 (batch_id)
/// 2. 游戏行排他锁 + 状态/预算校验
/// 3. 计算本 tick 预算
/// 4. 查询预算内候选券
/// 5. Fisher-Yates 打乱用户顺序
/// 6. 逐用户判定输赢并锁券扣减库存
/// 7. 原子扣减游戏预算, 归零则转 BUDGET_EXHAUSTED
///
/// 乐观锁冲突时整批重试 (最多 batch_retry_count 次)。
#[derive(Clone)]
pub struct RewardService {
    db: DatabaseConnection,
    users: UserService,
    rng: SharedRng,
    clock: Clock,
    config: RewardConfig,
    #[cfg(test)]
    user_hook: Option<UserHook>,
}

impl RewardService {
    pub fn new(
        db: DatabaseConnection,
        users: UserService,
        rng: SharedRng,
        clock: Clock,
        config: RewardConfig,
    ) -> Self {
        Self {
            db,
            users,
            rng,
            clock,
            config,
            #[cfg(test)]
            user_hook: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_user_hook(mut self, hook: UserHook) -> Self {
        self.user_hook = Some(hook);
        self
    }

    /// Process one batch. Safe to call twice with the same `batch_id`: a
    /// replay reconstructs the original response from the stored
    /// transactions and mutates nothing.
    ///
    /// Results come back in processing (shuffled) order; a replay preserves
    /// that order because transactions are read back in insertion order.
    pub async fn process_batch(&self, request: RewardRequest) -> AppResult<RewardResponse> {
        if request.batch_id.trim().is_empty() {
            return Err(AppError::ValidationError("Batch ID is required".into()));
        }
        if request.usernames.is_empty() {
            return Err(AppError::ValidationError(
                "Usernames list cannot be empty".into(),
            ));
        }

        let max_attempts = self.config.batch_retry_count.max(1);
        let mut attempt: u32 = 0;
        loop {
            match self.process_batch_attempt(&request).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() => {
                    attempt += 1;
                    if attempt >= max_attempts {
                        log::error!(
                            "Failed to process batch {} after {max_attempts} retries: {e}",
                            request.batch_id
                        );
                        return Err(AppError::Conflict(format!(
                            "Unable to process batch {} due to concurrent modifications",
                            request.batch_id
                        )));
                    }
                    log::warn!(
                        "Conflict on batch {}, retrying (attempt {attempt}/{max_attempts})",
                        request.batch_id
                    );
                    let backoff = self.config.batch_retry_backoff_ms * u64::from(attempt)
                        + 5 * u64::from(attempt) * u64::from(attempt);
                    tokio::time::sleep(std::time::Duration::from_millis(backoff)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// One transactional attempt. Any retryable failure rolls the whole
    /// batch back; a committed batch is never partial.
    async fn process_batch_attempt(&self, request: &RewardRequest) -> AppResult<RewardResponse> {
        let started = Instant::now();
        let now = self.clock.now();
        log::info!(
            "Processing batch: {} for game: {} with {} users",
            request.batch_id,
            request.game_id,
            request.usernames.len()
        );

        let txn = self.db.begin().await?;

        // Step 1: 幂等探测
        let existing = transactions::Entity::find()
            .filter(transactions::Column::BatchId.eq(request.batch_id.clone()))
            .order_by_asc(transactions::Column::Id)
            .all(&txn)
            .await?;
        if !existing.is_empty() {
            log::warn!(
                "Batch {} already processed. Returning stored results.",
                request.batch_id
            );
            let response = self
                .reconstruct_response(&txn, &request.batch_id, existing, now)
                .await?;
            txn.commit().await?;
            return Ok(response);
        }

        // Step 2: 游戏行排他锁
        let game = games::Entity::find_by_id(request.game_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Game not found: {}", request.game_id)))?;

        if !game.is_active_and_funded(now) {
            log::warn!(
                "Game {} is not active or has no budget. Returning all losses.",
                game.id
            );
            let rewards = self
                .record_losses(&txn, game.id, &request.batch_id, &request.usernames, now)
                .await?;
            txn.commit().await?;
            return Ok(assemble_response(
                &request.batch_id,
                now,
                rewards,
                Decimal::ZERO,
                started,
            ));
        }

        // Step 3: tick 预算以批次开始时的游戏状态为准
        let tick_budget = game.tick_budget(now);
        log::info!(
            "Tick budget calculated: {tick_budget} (Remaining: {}, Seconds left: {})",
            game.remaining_budget,
            game.remaining_seconds(now)
        );

        // Step 4: 预算内候选券
        let candidates = vouchers::Entity::find()
            .filter(vouchers::Column::IsActive.eq(true))
            .filter(vouchers::Column::CurrentQuantity.gt(0))
            .filter(vouchers::Column::Cost.lte(tick_budget))
            .filter(
                Condition::any()
                    .add(vouchers::Column::ExpiresAt.is_null())
                    .add(vouchers::Column::ExpiresAt.gt(now)),
            )
            .all(&txn)
            .await?;
        if candidates.is_empty() {
            log::warn!("No available vouchers within tick budget. Returning all losses.");
            let rewards = self
                .record_losses(&txn, game.id, &request.batch_id, &request.usernames, now)
                .await?;
            txn.commit().await?;
            return Ok(assemble_response(
                &request.batch_id,
                now,
                rewards,
                Decimal::ZERO,
                started,
            ));
        }

        // Step 5: 公平性锚点: 打乱用户顺序
        let mut shuffled = request.usernames.clone();
        self.rng.shuffle(&mut shuffled);

        let ctx = BatchContext {
            game_id: game.id,
            batch_id: request.batch_id.clone(),
            tick_budget,
            win_probability: game.win_probability,
            now,
        };

        // Step 6: 逐用户判定
        let mut results: Vec<UserRewardResult> = Vec::with_capacity(shuffled.len());
        let mut batch_spend = Decimal::ZERO;

        for (index, username) in shuffled.iter().enumerate() {
            #[cfg(test)]
            if let Some(hook) = &self.user_hook
                && let Some(status) = hook(index)
            {
                games::Entity::update_many()
                    .col_expr(games::Column::Status, Expr::value(status))
                    .filter(games::Column::Id.eq(ctx.game_id))
                    .exec(&txn)
                    .await?;
            }

            // 每个用户前重新读取游戏状态, 防止并发批次间超支
            let current_game = games::Entity::find_by_id(ctx.game_id)
                .lock_exclusive()
                .one(&txn)
                .await?;
            let Some(current_game) = current_game else {
                log::error!(
                    "Game {} disappeared during batch processing. Remaining users lose.",
                    ctx.game_id
                );
                let rest = self
                    .record_losses(&txn, ctx.game_id, &ctx.batch_id, &shuffled[index..], now)
                    .await?;
                results.extend(rest);
                break;
            };
            if !current_game.is_active_and_funded(now) {
                log::info!(
                    "Game {} became inactive during batch processing. Processing remaining users as losses.",
                    ctx.game_id
                );
                let rest = self
                    .record_losses(&txn, ctx.game_id, &ctx.batch_id, &shuffled[index..], now)
                    .await?;
                results.extend(rest);
                break;
            }
            let remaining_budget = current_game.remaining_budget;

            let result = self
                .decide_user_reward(&txn, &ctx, username, &candidates, batch_spend, remaining_budget)
                .await?;
            if result.status == TransactionStatus::Win {
                batch_spend += result.amount.unwrap_or(Decimal::ZERO);
            }
            results.push(result);

            // 提前终止: tick 预算或剩余预算已用尽
            if batch_spend >= ctx.tick_budget || batch_spend >= remaining_budget {
                log::info!("Batch budget exhausted. Processing remaining users as losses.");
                let rest = self
                    .record_losses(&txn, ctx.game_id, &ctx.batch_id, &shuffled[index + 1..], now)
                    .await?;
                results.extend(rest);
                break;
            }
        }

        // Step 7/8: 预算提交与状态迁移
        let total_spent = self.commit_spend(&txn, &ctx, &results).await?;
        txn.commit().await?;

        let response = assemble_response(&request.batch_id, now, results, total_spent, started);
        log::info!(
            "Batch {} processed in {}ms. Total spend: {}, Winners: {}",
            response.batch_id,
            response.processing_time_ms,
            response.total_spent,
            response
                .rewards
                .iter()
                .filter(|r| r.status == TransactionStatus::Win)
                .count()
        );
        Ok(response)
    }

    /// Win/loss decision for a single user. Exactly one transaction row is
    /// written whatever the outcome; a failed candidate is skipped, never
    /// surfaced as a batch error.
    async fn decide_user_reward(
        &self,
        txn: &DatabaseTransaction,
        ctx: &BatchContext,
        username: &str,
        candidates: &[vouchers::Model],
        batch_spend: Decimal,
        remaining_budget: Decimal,
    ) -> AppResult<UserRewardResult> {
        let user = self.users.get_or_create_tx(txn, username, ctx.now).await?;

        let roll = self.rng.roll();
        if roll > ctx.win_probability {
            self.insert_loss(txn, user.id, ctx).await?;
            return Ok(UserRewardResult::loss(user.username));
        }

        // 中奖候选: 打乱后逐个尝试锁定
        let mut shuffled: Vec<vouchers::Model> = candidates.to_vec();
        self.rng.shuffle(&mut shuffled);

        for candidate in &shuffled {
            let potential_spend = batch_spend + candidate.cost;
            if potential_spend > ctx.tick_budget || potential_spend > remaining_budget {
                continue;
            }

            // 锁定后以权威数据复核库存与预算
            let Some(locked) = vouchers::Entity::find_by_id(candidate.id)
                .lock_exclusive()
                .one(txn)
                .await?
            else {
                continue;
            };
            let locked_spend = batch_spend + locked.cost;
            if !locked.is_available(ctx.now)
                || locked_spend > ctx.tick_budget
                || locked_spend > remaining_budget
            {
                log::debug!(
                    "Voucher {} not available or does not fit budget (spend {locked_spend})",
                    locked.id
                );
                continue;
            }

            match decrement_voucher(txn, &locked, ctx.now).await {
                Ok(()) => {}
                Err(AppError::Conflict(msg)) => {
                    log::debug!("Skipping voucher {}: {msg}", locked.id);
                    continue;
                }
                Err(e) => return Err(e),
            }

            let message = format!("Congratulations! You won: {}", locked.description);
            transactions::ActiveModel {
                user_id: Set(user.id),
                game_id: Set(ctx.game_id),
                voucher_id: Set(Some(locked.id)),
                batch_id: Set(ctx.batch_id.clone()),
                status: Set(TransactionStatus::Win),
                amount: Set(Some(locked.cost)),
                reward_message: Set(message.clone()),
                created_at: Set(Some(ctx.now)),
                ..Default::default()
            }
            .insert(txn)
            .await?;

            return Ok(UserRewardResult {
                username: user.username,
                status: TransactionStatus::Win,
                voucher_id: Some(locked.id),
                voucher_code: Some(locked.voucher_code),
                amount: Some(locked.cost),
                message,
            });
        }

        // 没有可负担的券
        self.insert_loss(txn, user.id, ctx).await?;
        Ok(UserRewardResult::loss(user.username))
    }

    /// Step 7/8: deduct the measured spend under the game lock. A spend
    /// larger than the remaining budget is clamped with a CRITICAL audit
    /// entry; a zeroed budget flips the game to BUDGET_EXHAUSTED.
    async fn commit_spend(
        &self,
        txn: &DatabaseTransaction,
        ctx: &BatchContext,
        results: &[UserRewardResult],
    ) -> AppResult<Decimal> {
        let actual_spend: Decimal = results
            .iter()
            .filter(|r| r.status == TransactionStatus::Win)
            .filter_map(|r| r.amount)
            .sum();
        if actual_spend <= Decimal::ZERO {
            return Ok(Decimal::ZERO);
        }

        let game = games::Entity::find_by_id(ctx.game_id)
            .lock_exclusive()
            .one(txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Game not found: {}", ctx.game_id)))?;

        let mut spend_to_deduct = actual_spend;
        if spend_to_deduct > game.remaining_budget {
            log::error!(
                "CRITICAL: batch {} spend {spend_to_deduct} exceeds remaining budget {} for game {}. \
                 Clamping to available budget.",
                ctx.batch_id,
                game.remaining_budget,
                game.id
            );
            spend_to_deduct = game.remaining_budget;
        }

        let new_remaining = game.remaining_budget - spend_to_deduct;
        let new_status = if new_remaining <= Decimal::ZERO {
            GameStatus::BudgetExhausted
        } else {
            game.status
        };

        let result = games::Entity::update_many()
            .col_expr(games::Column::RemainingBudget, Expr::value(new_remaining))
            .col_expr(games::Column::Status, Expr::value(new_status))
            .col_expr(games::Column::Version, Expr::value(game.version + 1))
            .col_expr(games::Column::UpdatedAt, Expr::value(ctx.now))
            .filter(games::Column::Id.eq(game.id))
            .filter(games::Column::Version.eq(game.version))
            .exec(txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::Conflict(format!(
                "Game {} was modified concurrently",
                game.id
            )));
        }

        Ok(spend_to_deduct)
    }

    /// Persist a LOSS row per username, in the given order.
    async fn record_losses(
        &self,
        txn: &DatabaseTransaction,
        game_id: i64,
        batch_id: &str,
        usernames: &[String],
        now: DateTime<Utc>,
    ) -> AppResult<Vec<UserRewardResult>> {
        let ctx = BatchContext {
            game_id,
            batch_id: batch_id.to_string(),
            tick_budget: Decimal::ZERO,
            win_probability: 0.0,
            now,
        };
        let mut results = Vec::with_capacity(usernames.len());
        for username in usernames {
            let user = self.users.get_or_create_tx(txn, username, now).await?;
            self.insert_loss(txn, user.id, &ctx).await?;
            results.push(UserRewardResult::loss(user.username));
        }
        Ok(results)
    }

    async fn insert_loss(
        &self,
        txn: &DatabaseTransaction,
        user_id: i64,
        ctx: &BatchContext,
    ) -> AppResult<()> {
        transactions::ActiveModel {
            user_id: Set(user_id),
            game_id: Set(ctx.game_id),
            voucher_id: Set(None),
            batch_id: Set(ctx.batch_id.clone()),
            status: Set(TransactionStatus::Loss),
            amount: Set(None),
            reward_message: Set(LOSS_MESSAGE.to_string()),
            created_at: Set(Some(ctx.now)),
            ..Default::default()
        }
        .insert(txn)
        .await?;
        Ok(())
    }

    /// Rebuild the response for an already-processed batch from its stored
    /// transactions (idempotent replay).
    async fn reconstruct_response(
        &self,
        txn: &DatabaseTransaction,
        batch_id: &str,
        rows: Vec<transactions::Model>,
        now: DateTime<Utc>,
    ) -> AppResult<RewardResponse> {
        let user_ids: Vec<i64> = rows.iter().map(|t| t.user_id).collect();
        let username_by_id: HashMap<i64, String> = users::Entity::find()
            .filter(users::Column::Id.is_in(user_ids))
            .all(txn)
            .await?
            .into_iter()
            .map(|u| (u.id, u.username))
            .collect();

        let voucher_ids: Vec<i64> = rows.iter().filter_map(|t| t.voucher_id).collect();
        let code_by_id: HashMap<i64, String> = if voucher_ids.is_empty() {
            HashMap::new()
        } else {
            vouchers::Entity::find()
                .filter(vouchers::Column::Id.is_in(voucher_ids))
                .all(txn)
                .await?
                .into_iter()
                .map(|v| (v.id, v.voucher_code))
                .collect()
        };

        let total_spent: Decimal = rows
            .iter()
            .filter(|t| t.status == TransactionStatus::Win)
            .filter_map(|t| t.amount)
            .sum();

        let rewards = rows
            .into_iter()
            .map(|t| UserRewardResult {
                username: username_by_id.get(&t.user_id).cloned().unwrap_or_default(),
                status: t.status,
                voucher_id: t.voucher_id,
                voucher_code: t.voucher_id.and_then(|id| code_by_id.get(&id).cloned()),
                amount: t.amount,
                message: t.reward_message,
            })
            .collect();

        Ok(RewardResponse {
            batch_id: batch_id.to_string(),
            processed_at: now,
            rewards,
            total_spent,
            processing_time_ms: 0,
        })
    }

    pub async fn user_transactions(
        &self,
        user_id: i64,
        params: &PaginationParams,
    ) -> AppResult<PaginatedResponse<TransactionResponse>> {
        let query = transactions::Entity::find()
            .filter(transactions::Column::UserId.eq(user_id));
        let total = query.clone().count(&self.db).await? as i64;
        let rows = query
            .order_by_desc(transactions::Column::Id)
            .limit(params.get_limit() as u64)
            .offset(params.get_offset() as u64)
            .all(&self.db)
            .await?;
        let items = rows.into_iter().map(Into::into).collect();
        Ok(PaginatedResponse::new(items, params, total))
    }

    pub async fn game_transactions(
        &self,
        game_id: i64,
        params: &PaginationParams,
    ) -> AppResult<PaginatedResponse<TransactionResponse>> {
        let query = transactions::Entity::find()
            .filter(transactions::Column::GameId.eq(game_id));
        let total = query.clone().count(&self.db).await? as i64;
        let rows = query
            .order_by_desc(transactions::Column::Id)
            .limit(params.get_limit() as u64)
            .offset(params.get_offset() as u64)
            .all(&self.db)
            .await?;
        let items = rows.into_iter().map(Into::into).collect();
        Ok(PaginatedResponse::new(items, params, total))
    }

    pub async fn game_statistics(&self, game_id: i64) -> AppResult<GameStatisticsResponse> {
        #[derive(FromQueryResult)]
        struct SumRow {
            total: Option<Decimal>,
        }

        let total_wins = transactions::Entity::find()
            .filter(transactions::Column::GameId.eq(game_id))
            .filter(transactions::Column::Status.eq(TransactionStatus::Win))
            .count(&self.db)
            .await? as i64;

        let total_rewards = transactions::Entity::find()
            .select_only()
            .column_as(transactions::Column::Amount.sum(), "total")
            .filter(transactions::Column::GameId.eq(game_id))
            .filter(transactions::Column::Status.eq(TransactionStatus::Win))
            .into_model::<SumRow>()
            .one(&self.db)
            .await?
            .and_then(|row| row.total)
            .unwrap_or(Decimal::ZERO);

        Ok(GameStatisticsResponse {
            total_wins,
            total_rewards_distributed: total_rewards,
        })
    }
}

/// Version-checked inventory decrement; a mismatch means another batch got
/// to the voucher first and the caller should try its next candidate.
async fn decrement_voucher(
    txn: &DatabaseTransaction,
    voucher: &vouchers::Model,
    now: DateTime<Utc>,
) -> AppResult<()> {
    let result = vouchers::Entity::update_many()
        .col_expr(
            vouchers::Column::CurrentQuantity,
            Expr::value(voucher.current_quantity - 1),
        )
        .col_expr(vouchers::Column::Version, Expr::value(voucher.version + 1))
        .col_expr(vouchers::Column::UpdatedAt, Expr::value(now))
        .filter(vouchers::Column::Id.eq(voucher.id))
        .filter(vouchers::Column::Version.eq(voucher.version))
        .filter(vouchers::Column::CurrentQuantity.gt(0))
        .exec(txn)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::Conflict(format!(
            "Voucher {} was modified concurrently",
            voucher.id
        )));
    }
    Ok(())
}

fn assemble_response(
    batch_id: &str,
    now: DateTime<Utc>,
    rewards: Vec<UserRewardResult>,
    total_spent: Decimal,
    started: Instant,
) -> RewardResponse {
    RewardResponse {
        batch_id: batch_id.to_string(),
        processed_at: now,
        rewards,
        total_spent,
        processing_time_ms: started.elapsed().as_millis() as i64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GameStatus;
    use crate::test_support::{self, GameSeed};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn service(db: &DatabaseConnection, now: DateTime<Utc>, seed: u64) -> RewardService {
        RewardService::new(
            db.clone(),
            UserService::new(db.clone()),
            SharedRng::seeded(seed),
            Clock::manual(now),
            RewardConfig::default(),
        )
    }

    fn request(batch_id: &str, game_id: i64, usernames: &[&str]) -> RewardRequest {
        RewardRequest {
            batch_id: batch_id.to_string(),
            game_id,
            usernames: usernames.iter().map(|u| u.to_string()).collect(),
            timestamp: None,
        }
    }

    async fn batch_rows(db: &DatabaseConnection, batch_id: &str) -> Vec<transactions::Model> {
        transactions::Entity::find()
            .filter(transactions::Column::BatchId.eq(batch_id))
            .order_by_asc(transactions::Column::Id)
            .all(db)
            .await
            .unwrap()
    }

    async fn reload_game(db: &DatabaseConnection, id: i64) -> games::Model {
        games::Entity::find_by_id(id).one(db).await.unwrap().unwrap()
    }

    async fn reload_voucher(db: &DatabaseConnection, id: i64) -> vouchers::Model {
        vouchers::Entity::find_by_id(id)
            .one(db)
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_missing_game_is_not_found() {
        let db = test_support::db().await;
        let service = service(&db, Utc::now(), 1);
        let err = service
            .process_batch(request("b-missing", 999, &["u1"]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_empty_usernames_rejected() {
        let db = test_support::db().await;
        let service = service(&db, Utc::now(), 1);
        let err = service
            .process_batch(request("b-empty", 1, &[]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        let err = service.process_batch(request(" ", 1, &["u1"])).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_inactive_game_records_all_losses() {
        let db = test_support::db().await;
        let now = Utc::now();
        let game = test_support::insert_game(
            &db,
            GameSeed {
                status: GameStatus::Completed,
                ..GameSeed::default()
            },
            now,
        )
        .await;
        let service = service(&db, now, 1);

        let response = service
            .process_batch(request("b-inactive", game.id, &["u1", "u2"]))
            .await
            .unwrap();

        assert_eq!(response.rewards.len(), 2);
        assert!(response
            .rewards
            .iter()
            .all(|r| r.status == TransactionStatus::Loss));
        assert_eq!(response.total_spent, Decimal::ZERO);
        assert_eq!(batch_rows(&db, "b-inactive").await.len(), 2);
    }

    #[tokio::test]
    async fn test_no_candidate_vouchers_records_all_losses() {
        let db = test_support::db().await;
        let now = Utc::now();
        let game = test_support::insert_game(&db, GameSeed::default(), now).await;
        let service = service(&db, now, 1);

        let response = service
            .process_batch(request("b-dry", game.id, &["u1"]))
            .await
            .unwrap();

        assert_eq!(response.rewards.len(), 1);
        assert_eq!(response.rewards[0].status, TransactionStatus::Loss);
        assert_eq!(response.rewards[0].message, LOSS_MESSAGE);
        assert_eq!(batch_rows(&db, "b-dry").await.len(), 1);
    }

    /// 幂等重放: 第二次调用返回相同结果且不产生新的状态变更
    #[tokio::test]
    async fn test_idempotent_replay() {
        let db = test_support::db().await;
        let now = Utc::now();
        let brand = test_support::insert_brand(&db, "Nike", dec!(1000.00)).await;
        let game = test_support::insert_game(
            &db,
            GameSeed {
                end_offset_secs: 10,
                ..GameSeed::default()
            },
            now,
        )
        .await;
        test_support::insert_voucher(&db, brand.id, "NIKE1", dec!(1.00), 100).await;
        let service = service(&db, now, 42);

        let first = service
            .process_batch(request("B1", game.id, &["u1", "u2", "u3"]))
            .await
            .unwrap();
        let budget_after_first = reload_game(&db, game.id).await.remaining_budget;

        let second = service
            .process_batch(request("B1", game.id, &["u1", "u2", "u3"]))
            .await
            .unwrap();

        assert_eq!(first.rewards, second.rewards);
        assert_eq!(first.total_spent, second.total_spent);
        assert_eq!(batch_rows(&db, "B1").await.len(), 3);
        assert_eq!(
            reload_game(&db, game.id).await.remaining_budget,
            budget_after_first
        );
    }

    /// 游戏在批次中途失效: 已处理结果保留, 其余用户判负
    #[tokio::test]
    async fn test_game_deactivated_mid_batch() {
        let db = test_support::db().await;
        let now = Utc::now();
        let brand = test_support::insert_brand(&db, "Nike", dec!(1000.00)).await;
        let game = test_support::insert_game(
            &db,
            GameSeed {
                end_offset_secs: 10,
                win_probability: 1.0,
                ..GameSeed::default()
            },
            now,
        )
        .await;
        test_support::insert_voucher(&db, brand.id, "NIKE1", dec!(1.00), 100).await;

        let service = service(&db, now, 7)
            .with_user_hook(Arc::new(|index| (index == 3).then_some(GameStatus::Completed)));

        let usernames: Vec<String> = (0..10).map(|i| format!("u{i}")).collect();
        let username_refs: Vec<&str> = usernames.iter().map(|s| s.as_str()).collect();
        let response = service
            .process_batch(request("b-hook", game.id, &username_refs))
            .await
            .unwrap();

        assert_eq!(response.rewards.len(), 10);
        assert!(response.rewards[..3]
            .iter()
            .all(|r| r.status == TransactionStatus::Win));
        assert!(response.rewards[3..]
            .iter()
            .all(|r| r.status == TransactionStatus::Loss));
        assert_eq!(batch_rows(&db, "b-hook").await.len(), 10);

        // 后 7 个用户不再影响剩余预算
        let reloaded = reload_game(&db, game.id).await;
        assert_eq!(reloaded.remaining_budget, dec!(97.00));
        assert_eq!(reloaded.status, GameStatus::Completed);
    }

    /// 库存耗尽: 库存 1 张, 50 个必中用户, 恰好 1 人中奖
    #[tokio::test]
    async fn test_single_voucher_inventory_exhausted() {
        let db = test_support::db().await;
        let now = Utc::now();
        let brand = test_support::insert_brand(&db, "Nike", dec!(1000.00)).await;
        let game = test_support::insert_game(
            &db,
            GameSeed {
                end_offset_secs: 10,
                win_probability: 1.0,
                ..GameSeed::default()
            },
            now,
        )
        .await;
        let voucher = test_support::insert_voucher(&db, brand.id, "NIKE5", dec!(5.00), 1).await;
        let service = service(&db, now, 9);

        let usernames: Vec<String> = (0..50).map(|i| format!("u{i}")).collect();
        let username_refs: Vec<&str> = usernames.iter().map(|s| s.as_str()).collect();
        let response = service
            .process_batch(request("b-stock", game.id, &username_refs))
            .await
            .unwrap();

        let wins: Vec<&UserRewardResult> = response
            .rewards
            .iter()
            .filter(|r| r.status == TransactionStatus::Win)
            .collect();
        assert_eq!(wins.len(), 1);
        assert_eq!(wins[0].voucher_id, Some(voucher.id));
        assert_eq!(wins[0].amount, Some(dec!(5.00)));
        assert_eq!(response.rewards.len(), 50);
        assert_eq!(batch_rows(&db, "b-stock").await.len(), 50);
        assert_eq!(reload_voucher(&db, voucher.id).await.current_quantity, 0);
    }

    /// 预算耗尽: 最后一笔发放把剩余预算清零并翻转状态
    #[tokio::test]
    async fn test_budget_exhaustion_flips_status() {
        let db = test_support::db().await;
        let now = Utc::now();
        let brand = test_support::insert_brand(&db, "Nike", dec!(1000.00)).await;
        let game = test_support::insert_game(
            &db,
            GameSeed {
                total_budget: dec!(10.00),
                remaining_budget: dec!(10.00),
                end_offset_secs: 1,
                win_probability: 1.0,
                ..GameSeed::default()
            },
            now,
        )
        .await;
        test_support::insert_voucher(&db, brand.id, "NIKE10", dec!(10.00), 100).await;
        let service = service(&db, now, 3);

        let response = service
            .process_batch(request("b-drain", game.id, &["u1", "u2", "u3", "u4", "u5"]))
            .await
            .unwrap();

        let wins: Vec<&UserRewardResult> = response
            .rewards
            .iter()
            .filter(|r| r.status == TransactionStatus::Win)
            .collect();
        assert_eq!(wins.len(), 1);
        assert_eq!(wins[0].amount, Some(dec!(10.00)));
        assert_eq!(response.total_spent, dec!(10.00));

        let reloaded = reload_game(&db, game.id).await;
        assert_eq!(reloaded.remaining_budget, Decimal::ZERO);
        assert_eq!(reloaded.status, GameStatus::BudgetExhausted);
    }

    /// tick 预算封顶: (10000/900)*1.2 = 13.332, 5 元券最多发 2 张
    #[tokio::test]
    async fn test_tick_cap_limits_spend() {
        let db = test_support::db().await;
        let now = Utc::now();
        let brand = test_support::insert_brand(&db, "Nike", dec!(100000.00)).await;
        let game = test_support::insert_game(
            &db,
            GameSeed {
                total_budget: dec!(10000.00),
                remaining_budget: dec!(10000.00),
                end_offset_secs: 900,
                win_probability: 1.0,
                ..GameSeed::default()
            },
            now,
        )
        .await;
        test_support::insert_voucher(&db, brand.id, "NIKE5", dec!(5.00), 100).await;
        let service = service(&db, now, 11);

        let usernames: Vec<String> = (0..100).map(|i| format!("u{i}")).collect();
        let username_refs: Vec<&str> = usernames.iter().map(|s| s.as_str()).collect();
        let response = service
            .process_batch(request("b-cap", game.id, &username_refs))
            .await
            .unwrap();

        let wins = response
            .rewards
            .iter()
            .filter(|r| r.status == TransactionStatus::Win)
            .count();
        assert_eq!(wins, 2);
        assert_eq!(response.total_spent, dec!(10.00));
        assert!(response
            .rewards
            .iter()
            .filter(|r| r.status == TransactionStatus::Win)
            .all(|r| r.voucher_id.is_some() && r.amount == Some(dec!(5.00))));
        assert_eq!(
            reload_game(&db, game.id).await.remaining_budget,
            dec!(9990.00)
        );
    }

    /// 高并发预算合规: 1000 个单用户批次, 预算与库存不变量必须保持
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_batches_respect_budget() {
        let db = test_support::db().await;
        let now = Utc::now();
        let brand = test_support::insert_brand(&db, "Nike", dec!(100000.00)).await;
        let game = test_support::insert_game(
            &db,
            GameSeed {
                total_budget: dec!(10000.00),
                remaining_budget: dec!(10000.00),
                end_offset_secs: 900,
                win_probability: 0.15,
                ..GameSeed::default()
            },
            now,
        )
        .await;
        let mut voucher_ids = Vec::new();
        for i in 0..5 {
            let v =
                test_support::insert_voucher(&db, brand.id, &format!("V{i}"), dec!(10.00), 100)
                    .await;
            voucher_ids.push(v.id);
        }
        let service = service(&db, now, 1234);

        let mut handles = Vec::new();
        for i in 0..1000 {
            let service = service.clone();
            let game_id = game.id;
            handles.push(tokio::spawn(async move {
                let username = format!("user{i}");
                service
                    .process_batch(request(&format!("batch-{i}"), game_id, &[&username]))
                    .await
            }));
        }

        let mut succeeded = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                succeeded += 1;
            }
        }
        assert!(succeeded >= 800, "only {succeeded}/1000 batches succeeded");

        let reloaded = reload_game(&db, game.id).await;
        assert!(reloaded.remaining_budget >= Decimal::ZERO);
        assert!(reloaded.remaining_budget <= dec!(10000.00));

        // Σ WIN 金额与预算扣减必须严格一致
        let win_total: Decimal = transactions::Entity::find()
            .filter(transactions::Column::GameId.eq(game.id))
            .filter(transactions::Column::Status.eq(TransactionStatus::Win))
            .all(&db)
            .await
            .unwrap()
            .iter()
            .filter_map(|t| t.amount)
            .sum();
        assert_eq!(win_total, dec!(10000.00) - reloaded.remaining_budget);

        for id in voucher_ids {
            let v = reload_voucher(&db, id).await;
            assert!(v.current_quantity >= 0);
            assert!(v.current_quantity <= v.initial_quantity);
        }
    }

    #[tokio::test]
    async fn test_statistics_and_history() {
        let db = test_support::db().await;
        let now = Utc::now();
        let brand = test_support::insert_brand(&db, "Nike", dec!(1000.00)).await;
        let game = test_support::insert_game(
            &db,
            GameSeed {
                end_offset_secs: 10,
                win_probability: 1.0,
                ..GameSeed::default()
            },
            now,
        )
        .await;
        test_support::insert_voucher(&db, brand.id, "NIKE2", dec!(2.00), 10).await;
        let service = service(&db, now, 5);

        let response = service
            .process_batch(request("b-stats", game.id, &["u1", "u2", "u3"]))
            .await
            .unwrap();
        let wins = response
            .rewards
            .iter()
            .filter(|r| r.status == TransactionStatus::Win)
            .count() as i64;

        let stats = service.game_statistics(game.id).await.unwrap();
        assert_eq!(stats.total_wins, wins);
        assert_eq!(stats.total_rewards_distributed, response.total_spent);

        let user = users::Entity::find()
            .filter(users::Column::Username.eq("u1"))
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        let history = service
            .user_transactions(user.id, &PaginationParams::new(None, None))
            .await
            .unwrap();
        assert_eq!(history.items.len(), 1);
        assert_eq!(history.pagination.total, 1);

        let game_history = service
            .game_transactions(game.id, &PaginationParams::new(Some(1), Some(2)))
            .await
            .unwrap();
        assert_eq!(game_history.items.len(), 2);
        assert_eq!(game_history.pagination.total, 3);
    }
}

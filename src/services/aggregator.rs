use crate::models::{RewardRequest, RewardResponse, UserRewardResult};
use crate::services::{ResultBroadcaster, RewardService};
use crate::utils::Clock;
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

/// 时间窗聚合器: 按游戏缓冲入站请求, 每个 tick 快照清空并提交批处理。
///
/// 缓冲只存在于内存中 (DashMap), 进程停止时未提交的请求会丢失;
/// 入队即确认, 结果通过 broadcaster 异步送达。
#[derive(Clone)]
pub struct BatchAggregator {
    buffers: Arc<DashMap<i64, Vec<String>>>,
    rewards: RewardService,
    broadcaster: ResultBroadcaster,
    clock: Clock,
    max_batch_size: usize,
}

impl BatchAggregator {
    pub fn new(
        rewards: RewardService,
        broadcaster: ResultBroadcaster,
        clock: Clock,
        max_batch_size: usize,
    ) -> Self {
        BatchAggregator {
            buffers: Arc::new(DashMap::new()),
            rewards,
            broadcaster,
            clock,
            max_batch_size,
        }
    }

    /// Append a play request to the game's buffer and acknowledge.
    pub fn enqueue(&self, game_id: i64, username: String) {
        self.buffers.entry(game_id).or_default().push(username);
    }

    /// Snapshot-and-clear every non-empty buffer. A buffer larger than
    /// `max_batch_size` is cut at the threshold; the overflow stays queued
    /// for the next tick.
    fn drain_batches(&self) -> Vec<(i64, Vec<String>)> {
        let mut batches = Vec::new();
        for mut entry in self.buffers.iter_mut() {
            if entry.is_empty() {
                continue;
            }
            let snapshot = if entry.len() > self.max_batch_size {
                entry.drain(..self.max_batch_size).collect()
            } else {
                std::mem::take(entry.value_mut())
            };
            batches.push((*entry.key(), snapshot));
        }
        batches
    }

    /// One tick: submit every game's snapshot to the batch processor,
    /// games in parallel, and hand each result to the broadcaster.
    pub async fn flush(&self) {
        let batches = self.drain_batches();
        if batches.is_empty() {
            return;
        }

        let mut handles = Vec::with_capacity(batches.len());
        for (game_id, usernames) in batches {
            let aggregator = self.clone();
            handles.push(tokio::spawn(async move {
                aggregator.dispatch(game_id, usernames).await;
            }));
        }
        for handle in handles {
            if let Err(e) = handle.await {
                log::error!("Batch dispatch task panicked: {e}");
            }
        }
    }

    async fn dispatch(&self, game_id: i64, usernames: Vec<String>) {
        let batch_id = format!("batch_{}", Uuid::new_v4());
        log::info!(
            "Processing batch for game {game_id} with {} users",
            usernames.len()
        );

        let request = RewardRequest {
            batch_id: batch_id.clone(),
            game_id,
            usernames: usernames.clone(),
            timestamp: Some(self.clock.now().timestamp_millis()),
        };

        match self.rewards.process_batch(request).await {
            Ok(response) => {
                self.broadcaster.publish(game_id, &response);
            }
            Err(e) => {
                // 失败降级: 广播全败结果 (不落库), 用户下个 tick 可重试
                log::error!("Error processing batch {batch_id} for game {game_id}: {e:?}");
                let degraded = RewardResponse {
                    batch_id,
                    processed_at: self.clock.now(),
                    rewards: usernames.into_iter().map(UserRewardResult::loss).collect(),
                    total_spent: Decimal::ZERO,
                    processing_time_ms: 0,
                };
                self.broadcaster.publish(game_id, &degraded);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RewardConfig;
    use crate::entities::reward_transaction_entity as transactions;
    use crate::models::{GameStatus, TransactionStatus};
    use crate::services::UserService;
    use crate::test_support::{self, GameSeed};
    use crate::utils::SharedRng;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

    fn aggregator(db: &DatabaseConnection, max_batch_size: usize) -> BatchAggregator {
        let clock = Clock::manual(Utc::now());
        let rewards = RewardService::new(
            db.clone(),
            UserService::new(db.clone()),
            SharedRng::seeded(21),
            clock.clone(),
            RewardConfig::default(),
        );
        BatchAggregator::new(rewards, ResultBroadcaster::new(), clock, max_batch_size)
    }

    #[tokio::test]
    async fn test_drain_snapshots_and_clears_buffers() {
        let db = test_support::db().await;
        let aggregator = aggregator(&db, 100);

        aggregator.enqueue(1, "u1".to_string());
        aggregator.enqueue(1, "u2".to_string());
        aggregator.enqueue(2, "u3".to_string());

        let mut batches = aggregator.drain_batches();
        batches.sort_by_key(|(game_id, _)| *game_id);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0], (1, vec!["u1".to_string(), "u2".to_string()]));
        assert_eq!(batches[1], (2, vec!["u3".to_string()]));

        // 再次 drain 应为空
        assert!(aggregator.drain_batches().is_empty());
    }

    #[tokio::test]
    async fn test_drain_truncates_at_max_batch_size() {
        let db = test_support::db().await;
        let aggregator = aggregator(&db, 3);

        for i in 0..5 {
            aggregator.enqueue(1, format!("u{i}"));
        }

        let batches = aggregator.drain_batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].1.len(), 3);

        // 溢出部分留待下个 tick
        let leftover = aggregator.drain_batches();
        assert_eq!(leftover.len(), 1);
        assert_eq!(leftover[0].1, vec!["u3".to_string(), "u4".to_string()]);
    }

    #[tokio::test]
    async fn test_flush_processes_and_broadcasts() {
        let db = test_support::db().await;
        let now = Utc::now();
        test_support::insert_brand(&db, "Nike", dec!(1000.00)).await;
        let game = test_support::insert_game(
            &db,
            GameSeed {
                status: GameStatus::Completed,
                ..GameSeed::default()
            },
            now,
        )
        .await;

        let aggregator = aggregator(&db, 100);
        let mut rx = aggregator.broadcaster.subscribe(game.id);

        aggregator.enqueue(game.id, "u1".to_string());
        aggregator.enqueue(game.id, "u2".to_string());
        aggregator.flush().await;

        // 批次已落库 (此处游戏非活跃 -> 全败)
        let rows = transactions::Entity::find()
            .filter(transactions::Column::GameId.eq(game.id))
            .all(&db)
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|t| t.status == TransactionStatus::Loss));
        assert!(rows[0].batch_id.starts_with("batch_"));

        // 结果已广播
        let payload = rx.recv().await.unwrap();
        assert!(payload.contains(&rows[0].batch_id));
    }

    #[tokio::test]
    async fn test_flush_broadcasts_degraded_result_on_failure() {
        let db = test_support::db().await;
        let aggregator = aggregator(&db, 100);
        let mut rx = aggregator.broadcaster.subscribe(404);

        // 游戏不存在 -> 批处理报 NotFound -> 降级广播全败
        aggregator.enqueue(404, "u1".to_string());
        aggregator.flush().await;

        let payload = rx.recv().await.unwrap();
        assert!(payload.contains("\"status\":\"LOSS\""));
        assert!(payload.contains("\"totalSpent\":\"0\""));
    }
}

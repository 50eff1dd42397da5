use crate::models::RewardResponse;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::broadcast;

const BROADCAST_CHANNEL_SIZE: usize = 256;

/// Per-game fan-out of batch results to connected WebSocket sessions.
///
/// Delivery is best-effort: only subscribers connected at broadcast time
/// receive the message; late joiners read history through the transaction
/// query endpoints instead.
#[derive(Clone)]
pub struct ResultBroadcaster {
    channels: Arc<DashMap<i64, broadcast::Sender<String>>>,
}

impl ResultBroadcaster {
    pub fn new() -> Self {
        ResultBroadcaster {
            channels: Arc::new(DashMap::new()),
        }
    }

    /// Subscribe to a game's result stream, creating the channel lazily.
    pub fn subscribe(&self, game_id: i64) -> broadcast::Receiver<String> {
        self.channels
            .entry(game_id)
            .or_insert_with(|| broadcast::channel(BROADCAST_CHANNEL_SIZE).0)
            .subscribe()
    }

    /// Publish a batch result to current subscribers of the game's topic.
    pub fn publish(&self, game_id: i64, response: &RewardResponse) {
        let payload = match serde_json::to_string(response) {
            Ok(payload) => payload,
            Err(e) => {
                log::error!("Failed to serialize batch result {}: {e}", response.batch_id);
                return;
            }
        };

        if let Some(sender) = self.channels.get(&game_id) {
            let delivered = sender.send(payload).unwrap_or(0);
            log::debug!(
                "Broadcast batch {} for game {game_id} to {delivered} subscribers",
                response.batch_id
            );
        }
    }
}

impl Default for ResultBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRewardResult;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn sample_response(batch_id: &str) -> RewardResponse {
        RewardResponse {
            batch_id: batch_id.to_string(),
            processed_at: Utc::now(),
            rewards: vec![UserRewardResult::loss("u1".to_string())],
            total_spent: Decimal::ZERO,
            processing_time_ms: 1,
        }
    }

    #[tokio::test]
    async fn test_subscriber_receives_published_result() {
        let broadcaster = ResultBroadcaster::new();
        let mut rx = broadcaster.subscribe(1);

        broadcaster.publish(1, &sample_response("b-1"));

        let payload = rx.recv().await.unwrap();
        assert!(payload.contains("\"batchId\":\"b-1\""));
        assert!(payload.contains("\"status\":\"LOSS\""));
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_noop() {
        let broadcaster = ResultBroadcaster::new();
        // 没有订阅者也不应 panic
        broadcaster.publish(42, &sample_response("b-2"));
    }

    #[tokio::test]
    async fn test_games_have_isolated_topics() {
        let broadcaster = ResultBroadcaster::new();
        let mut rx_game1 = broadcaster.subscribe(1);
        let mut rx_game2 = broadcaster.subscribe(2);

        broadcaster.publish(1, &sample_response("b-3"));

        assert!(rx_game1.recv().await.is_ok());
        assert!(rx_game2.try_recv().is_err());
    }
}

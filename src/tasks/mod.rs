//! Background loops for the reward core.
//!
//! Two recurring jobs: the aggregator flush (one tick per period, default
//! 1 s) and the game lifecycle sweeper (every 10 s). Call `spawn_all` once
//! during startup; it detaches both via `tokio::spawn` and does not block.

use crate::services::{BatchAggregator, GameService};
use std::time::Duration;

const SWEEP_INTERVAL: Duration = Duration::from_secs(10);

pub fn spawn_all(aggregator: BatchAggregator, game_service: GameService, tick_period: Duration) {
    // 每个 tick 提交各游戏缓冲的批次
    {
        let aggregator = aggregator.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(tick_period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                aggregator.flush().await;
            }
        });
    }

    // 生命周期扫描: SCHEDULED -> ACTIVE, ACTIVE -> COMPLETED
    {
        let svc = game_service.clone();
        tokio::spawn(async move {
            loop {
                match svc.auto_start_games().await {
                    Ok(n) if n > 0 => log::info!("Games auto-started: {n}"),
                    Ok(_) => {}
                    Err(e) => log::error!("Failed to auto-start games: {e:?}"),
                }
                match svc.auto_complete_games().await {
                    Ok(n) if n > 0 => log::info!("Games auto-completed: {n}"),
                    Ok(_) => {}
                    Err(e) => log::error!("Failed to auto-complete games: {e:?}"),
                }
                tokio::time::sleep(SWEEP_INTERVAL).await;
            }
        });
    }
}

use crate::models::{PlayAck, PlayMessage};
use crate::services::{BatchAggregator, ResultBroadcaster};
use actix_web::{Error, HttpRequest, HttpResponse, web};
use actix_ws::Message;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::time::interval;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

/// 游戏实时通道: GET /ws/game/{game_id}
///
/// - 客户端发送 `{"username": "..."}` 即入队当前 tick, 回 ack
/// - 本游戏每个批次的 RewardResponse 以 JSON 文本帧推送
/// - 入队即确认; 结果在批次处理完成后到达 (不保证与入队同序)
pub async fn game_socket(
    req: HttpRequest,
    stream: web::Payload,
    path: web::Path<i64>,
    aggregator: web::Data<BatchAggregator>,
    broadcaster: web::Data<ResultBroadcaster>,
) -> Result<HttpResponse, Error> {
    let game_id = path.into_inner();
    let (response, mut session, mut msg_stream) = actix_ws::handle(&req, stream)?;

    let mut rx = broadcaster.subscribe(game_id);
    let aggregator = aggregator.get_ref().clone();

    actix_web::rt::spawn(async move {
        let mut heartbeat = interval(HEARTBEAT_INTERVAL);
        let mut last_seen = Instant::now();

        loop {
            tokio::select! {
                msg = msg_stream.recv() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            last_seen = Instant::now();
                            match serde_json::from_str::<PlayMessage>(&text) {
                                Ok(play) => {
                                    aggregator.enqueue(game_id, play.username.clone());
                                    let ack = PlayAck::new(game_id, play.username);
                                    let payload = serde_json::to_string(&ack).unwrap_or_default();
                                    if session.text(payload).await.is_err() {
                                        break;
                                    }
                                }
                                Err(e) => {
                                    log::debug!("Ignoring malformed play message: {e}");
                                }
                            }
                        }
                        Some(Ok(Message::Ping(bytes))) => {
                            last_seen = Instant::now();
                            if session.pong(&bytes).await.is_err() {
                                break;
                            }
                        }
                        Some(Ok(Message::Pong(_))) => {
                            last_seen = Instant::now();
                        }
                        Some(Ok(Message::Close(reason))) => {
                            let _ = session.close(reason).await;
                            return;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(_)) | None => break,
                    }
                }
                result = rx.recv() => {
                    match result {
                        Ok(payload) => {
                            if session.text(payload).await.is_err() {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            log::warn!(
                                "Result subscriber for game {game_id} lagged, skipped {skipped} messages"
                            );
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
                _ = heartbeat.tick() => {
                    if last_seen.elapsed() > CLIENT_TIMEOUT {
                        log::debug!("WebSocket client for game {game_id} timed out");
                        let _ = session.close(None).await;
                        return;
                    }
                    if session.ping(b"").await.is_err() {
                        break;
                    }
                }
            }
        }
        let _ = session.close(None).await;
    });

    Ok(response)
}

/// 路由配置
pub fn ws_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/ws/game/{game_id}", web::get().to(game_socket));
}

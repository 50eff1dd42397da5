use crate::models::*;
use crate::services::RewardService;
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    post,
    path = "/api/rewards/process-batch",
    tag = "rewards",
    request_body = RewardRequest,
    responses(
        (status = 200, description = "批处理完成", body = RewardResponse),
        (status = 400, description = "请求格式无效"),
        (status = 404, description = "游戏不存在"),
        (status = 409, description = "并发冲突重试耗尽")
    )
)]
/// 处理一个 tick 批次 (幂等: 相同 batchId 重放返回首次结果)
pub async fn process_batch(
    service: web::Data<RewardService>,
    body: web::Json<RewardRequest>,
) -> Result<HttpResponse> {
    match service.process_batch(body.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(response)),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/rewards/user/{user_id}/history",
    tag = "rewards",
    params(
        ("user_id" = i64, Path, description = "用户ID"),
        ("page" = Option<u32>, Query, description = "页码 (默认1)"),
        ("per_page" = Option<u32>, Query, description = "每页数量 (默认20)")
    ),
    responses(
        (status = 200, description = "用户流水", body = PaginatedResponse<TransactionResponse>)
    )
)]
pub async fn user_history(
    service: web::Data<RewardService>,
    path: web::Path<i64>,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse> {
    match service
        .user_transactions(path.into_inner(), &query.into_inner())
        .await
    {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": page }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/rewards/game/{game_id}/history",
    tag = "rewards",
    params(
        ("game_id" = i64, Path, description = "游戏ID"),
        ("page" = Option<u32>, Query, description = "页码 (默认1)"),
        ("per_page" = Option<u32>, Query, description = "每页数量 (默认20)")
    ),
    responses(
        (status = 200, description = "游戏流水", body = PaginatedResponse<TransactionResponse>)
    )
)]
pub async fn game_history(
    service: web::Data<RewardService>,
    path: web::Path<i64>,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse> {
    match service
        .game_transactions(path.into_inner(), &query.into_inner())
        .await
    {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": page }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/rewards/game/{game_id}/statistics",
    tag = "rewards",
    params(
        ("game_id" = i64, Path, description = "游戏ID")
    ),
    responses(
        (status = 200, description = "游戏统计", body = GameStatisticsResponse)
    )
)]
pub async fn game_statistics(
    service: web::Data<RewardService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match service.game_statistics(path.into_inner()).await {
        Ok(stats) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": stats }))),
        Err(e) => Ok(e.error_response()),
    }
}

/// 路由配置
pub fn reward_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/rewards")
            .route("/process-batch", web::post().to(process_batch))
            .route("/user/{user_id}/history", web::get().to(user_history))
            .route("/game/{game_id}/history", web::get().to(game_history))
            .route("/game/{game_id}/statistics", web::get().to(game_statistics)),
    );
}

use crate::models::*;
use crate::services::GameService;
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    post,
    path = "/api/games",
    tag = "games",
    request_body = CreateGameRequest,
    responses(
        (status = 201, description = "游戏创建成功 (各品牌出资已锁定)", body = GameResponse),
        (status = 400, description = "出资不足或参数无效"),
        (status = 404, description = "品牌不存在")
    )
)]
pub async fn create_game(
    service: web::Data<GameService>,
    body: web::Json<CreateGameRequest>,
) -> Result<HttpResponse> {
    match service.create_game(body.into_inner()).await {
        Ok(game) => Ok(HttpResponse::Created().json(json!({ "success": true, "data": game }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/games/{id}",
    tag = "games",
    params(("id" = i64, Path, description = "游戏ID")),
    responses(
        (status = 200, description = "游戏信息", body = GameResponse),
        (status = 404, description = "游戏不存在")
    )
)]
pub async fn get_game(
    service: web::Data<GameService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match service.get_game(path.into_inner()).await {
        Ok(game) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": game }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/games",
    tag = "games",
    params(("status" = Option<GameStatus>, Query, description = "按状态过滤")),
    responses(
        (status = 200, description = "游戏列表", body = [GameResponse])
    )
)]
pub async fn list_games(
    service: web::Data<GameService>,
    query: web::Query<GameListQuery>,
) -> Result<HttpResponse> {
    match service.list_games(query.into_inner().status).await {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": list }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/games/active",
    tag = "games",
    responses(
        (status = 200, description = "进行中的游戏列表", body = [GameResponse])
    )
)]
pub async fn active_games(service: web::Data<GameService>) -> Result<HttpResponse> {
    match service.active_games().await {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": list }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/api/games/{id}/start",
    tag = "games",
    params(("id" = i64, Path, description = "游戏ID")),
    responses(
        (status = 200, description = "游戏已启动", body = GameResponse),
        (status = 409, description = "当前状态不允许启动")
    )
)]
pub async fn start_game(
    service: web::Data<GameService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match service.start_game(path.into_inner()).await {
        Ok(game) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": game }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/api/games/{id}/complete",
    tag = "games",
    params(("id" = i64, Path, description = "游戏ID")),
    responses(
        (status = 200, description = "游戏已结束", body = GameResponse),
        (status = 409, description = "当前状态不允许结束")
    )
)]
pub async fn complete_game(
    service: web::Data<GameService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match service.complete_game(path.into_inner()).await {
        Ok(game) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": game }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/api/games/{id}/cancel",
    tag = "games",
    params(("id" = i64, Path, description = "游戏ID")),
    responses(
        (status = 200, description = "游戏已取消", body = GameResponse),
        (status = 409, description = "当前状态不允许取消")
    )
)]
pub async fn cancel_game(
    service: web::Data<GameService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match service.cancel_game(path.into_inner()).await {
        Ok(game) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": game }))),
        Err(e) => Ok(e.error_response()),
    }
}

/// 路由配置 (注意 /active 要先于 /{id} 注册)
pub fn game_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/games")
            .route("", web::post().to(create_game))
            .route("", web::get().to(list_games))
            .route("/active", web::get().to(active_games))
            .route("/{id}", web::get().to(get_game))
            .route("/{id}/start", web::post().to(start_game))
            .route("/{id}/complete", web::post().to(complete_game))
            .route("/{id}/cancel", web::post().to(cancel_game)),
    );
}

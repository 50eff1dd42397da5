use crate::models::*;
use crate::services::BrandService;
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    post,
    path = "/api/brands",
    tag = "brands",
    request_body = CreateBrandRequest,
    responses(
        (status = 201, description = "品牌创建成功", body = BrandResponse),
        (status = 400, description = "参数无效或名称重复")
    )
)]
pub async fn create_brand(
    service: web::Data<BrandService>,
    body: web::Json<CreateBrandRequest>,
) -> Result<HttpResponse> {
    match service.create_brand(body.into_inner()).await {
        Ok(brand) => Ok(HttpResponse::Created().json(json!({ "success": true, "data": brand }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/brands/{id}",
    tag = "brands",
    params(("id" = i64, Path, description = "品牌ID")),
    responses(
        (status = 200, description = "品牌信息", body = BrandResponse),
        (status = 404, description = "品牌不存在")
    )
)]
pub async fn get_brand(
    service: web::Data<BrandService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match service.get_brand(path.into_inner()).await {
        Ok(brand) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": brand }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/brands",
    tag = "brands",
    responses(
        (status = 200, description = "启用中的品牌列表", body = [BrandResponse])
    )
)]
pub async fn list_brands(service: web::Data<BrandService>) -> Result<HttpResponse> {
    match service.list_active_brands().await {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": list }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/api/brands/{id}/deposit",
    tag = "brands",
    params(("id" = i64, Path, description = "品牌ID")),
    request_body = DepositRequest,
    responses(
        (status = 200, description = "充值成功", body = BrandResponse),
        (status = 404, description = "品牌不存在")
    )
)]
pub async fn deposit(
    service: web::Data<BrandService>,
    path: web::Path<i64>,
    body: web::Json<DepositRequest>,
) -> Result<HttpResponse> {
    match service
        .deposit_funds(path.into_inner(), body.into_inner().amount)
        .await
    {
        Ok(brand) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": brand }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/api/brands/{id}/status",
    tag = "brands",
    params(("id" = i64, Path, description = "品牌ID")),
    request_body = UpdateBrandStatusRequest,
    responses(
        (status = 200, description = "状态更新成功", body = BrandResponse),
        (status = 404, description = "品牌不存在")
    )
)]
pub async fn set_status(
    service: web::Data<BrandService>,
    path: web::Path<i64>,
    body: web::Json<UpdateBrandStatusRequest>,
) -> Result<HttpResponse> {
    match service
        .set_status(path.into_inner(), body.into_inner().is_active)
        .await
    {
        Ok(brand) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": brand }))),
        Err(e) => Ok(e.error_response()),
    }
}

/// 路由配置
pub fn brand_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/brands")
            .route("", web::post().to(create_brand))
            .route("", web::get().to(list_brands))
            .route("/{id}", web::get().to(get_brand))
            .route("/{id}/deposit", web::post().to(deposit))
            .route("/{id}/status", web::post().to(set_status)),
    );
}

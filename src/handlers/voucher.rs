use crate::models::*;
use crate::services::VoucherService;
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    post,
    path = "/api/vouchers",
    tag = "vouchers",
    request_body = CreateVoucherRequest,
    responses(
        (status = 201, description = "奖券创建成功", body = VoucherResponse),
        (status = 400, description = "钱包无法覆盖 cost × quantity 或券码重复"),
        (status = 404, description = "品牌不存在")
    )
)]
pub async fn create_voucher(
    service: web::Data<VoucherService>,
    body: web::Json<CreateVoucherRequest>,
) -> Result<HttpResponse> {
    match service.create_voucher(body.into_inner()).await {
        Ok(voucher) => {
            Ok(HttpResponse::Created().json(json!({ "success": true, "data": voucher })))
        }
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/vouchers/{id}",
    tag = "vouchers",
    params(("id" = i64, Path, description = "奖券ID")),
    responses(
        (status = 200, description = "奖券信息", body = VoucherResponse),
        (status = 404, description = "奖券不存在")
    )
)]
pub async fn get_voucher(
    service: web::Data<VoucherService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match service.get_voucher(path.into_inner()).await {
        Ok(voucher) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": voucher }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/vouchers/brand/{brand_id}",
    tag = "vouchers",
    params(("brand_id" = i64, Path, description = "品牌ID")),
    responses(
        (status = 200, description = "品牌下的奖券列表", body = [VoucherResponse])
    )
)]
pub async fn list_by_brand(
    service: web::Data<VoucherService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match service.list_by_brand(path.into_inner()).await {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": list }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/api/vouchers/{id}/restock",
    tag = "vouchers",
    params(("id" = i64, Path, description = "奖券ID")),
    request_body = RestockRequest,
    responses(
        (status = 200, description = "补货成功 (initial 与 current 同增)", body = VoucherResponse),
        (status = 404, description = "奖券不存在")
    )
)]
pub async fn restock(
    service: web::Data<VoucherService>,
    path: web::Path<i64>,
    body: web::Json<RestockRequest>,
) -> Result<HttpResponse> {
    match service
        .restock(path.into_inner(), body.into_inner().quantity)
        .await
    {
        Ok(voucher) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": voucher }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/api/vouchers/{id}/status",
    tag = "vouchers",
    params(("id" = i64, Path, description = "奖券ID")),
    request_body = UpdateVoucherStatusRequest,
    responses(
        (status = 200, description = "状态更新成功", body = VoucherResponse),
        (status = 404, description = "奖券不存在")
    )
)]
pub async fn set_status(
    service: web::Data<VoucherService>,
    path: web::Path<i64>,
    body: web::Json<UpdateVoucherStatusRequest>,
) -> Result<HttpResponse> {
    match service
        .set_status(path.into_inner(), body.into_inner().is_active)
        .await
    {
        Ok(voucher) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": voucher }))),
        Err(e) => Ok(e.error_response()),
    }
}

/// 路由配置
pub fn voucher_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/vouchers")
            .route("", web::post().to(create_voucher))
            .route("/{id}", web::get().to(get_voucher))
            .route("/brand/{brand_id}", web::get().to(list_by_brand))
            .route("/{id}/restock", web::post().to(restock))
            .route("/{id}/status", web::post().to(set_status)),
    );
}

use actix_web::web;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use crate::models::*;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::reward::process_batch,
        handlers::reward::user_history,
        handlers::reward::game_history,
        handlers::reward::game_statistics,
        handlers::brand::create_brand,
        handlers::brand::get_brand,
        handlers::brand::list_brands,
        handlers::brand::deposit,
        handlers::brand::set_status,
        handlers::voucher::create_voucher,
        handlers::voucher::get_voucher,
        handlers::voucher::list_by_brand,
        handlers::voucher::restock,
        handlers::voucher::set_status,
        handlers::game::create_game,
        handlers::game::get_game,
        handlers::game::list_games,
        handlers::game::active_games,
        handlers::game::start_game,
        handlers::game::complete_game,
        handlers::game::cancel_game,
    ),
    components(
        schemas(
            ApiError,
            RewardRequest,
            RewardResponse,
            UserRewardResult,
            TransactionResponse,
            TransactionStatus,
            GameStatisticsResponse,
            CreateBrandRequest,
            DepositRequest,
            UpdateBrandStatusRequest,
            BrandResponse,
            CreateVoucherRequest,
            RestockRequest,
            UpdateVoucherStatusRequest,
            VoucherResponse,
            BrandContribution,
            CreateGameRequest,
            GameResponse,
            GameStatus,
            PlayMessage,
            PlayAck,
            PaginationParams,
            PaginationInfo,
        )
    ),
    tags(
        (name = "rewards", description = "时间窗批处理与流水查询"),
        (name = "brands", description = "品牌与钱包管理"),
        (name = "vouchers", description = "奖券与库存管理"),
        (name = "games", description = "游戏生命周期管理")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    );
}

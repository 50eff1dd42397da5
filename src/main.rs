use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter
use std::time::Duration;

use luck_engine::{
    config::Config,
    database::{create_connection, run_migrations},
    handlers,
    middlewares::create_cors,
    services::{
        BatchAggregator, BrandService, GameService, ResultBroadcaster, RewardService, UserService,
        VoucherService,
    },
    swagger::swagger_config,
    tasks,
    utils::{Clock, SharedRng},
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    // 加载配置
    let config = Config::from_toml().expect("Failed to load configuration file");

    // 数据库连接与迁移
    let db = create_connection(&config.database)
        .await
        .expect("Failed to create database connection");
    run_migrations(&db)
        .await
        .expect("Failed to run database migrations");

    // 批处理核心依赖: 时钟与 (可选固定种子的) 随机源
    let clock = Clock::system();
    let rng = SharedRng::from_config(config.reward.rng_seed);

    // 创建服务
    let user_service = UserService::new(db.clone());
    let brand_service = BrandService::new(db.clone());
    let voucher_service = VoucherService::new(db.clone());
    let game_service = GameService::new(db.clone(), clock.clone(), config.reward.clone());
    let reward_service = RewardService::new(
        db.clone(),
        user_service.clone(),
        rng,
        clock.clone(),
        config.reward.clone(),
    );

    let broadcaster = ResultBroadcaster::new();
    let aggregator = BatchAggregator::new(
        reward_service.clone(),
        broadcaster.clone(),
        clock.clone(),
        config.reward.max_batch_size,
    );

    // 启动后台任务: tick 聚合提交 + 生命周期扫描
    tasks::spawn_all(
        aggregator.clone(),
        game_service.clone(),
        Duration::from_millis(config.reward.tick_period_ms),
    );

    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(create_cors())
            .app_data(web::Data::new(brand_service.clone()))
            .app_data(web::Data::new(voucher_service.clone()))
            .app_data(web::Data::new(game_service.clone()))
            .app_data(web::Data::new(reward_service.clone()))
            .app_data(web::Data::new(aggregator.clone()))
            .app_data(web::Data::new(broadcaster.clone()))
            .configure(swagger_config)
            .configure(handlers::ws_config)
            .service(
                web::scope("/api")
                    .configure(handlers::reward_config)
                    .configure(handlers::brand_config)
                    .configure(handlers::voucher_config)
                    .configure(handlers::game_config),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}

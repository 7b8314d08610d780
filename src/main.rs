use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter

use spinserve_backend::{
    config::Config,
    database::create_repositories,
    handlers,
    middlewares::create_cors,
    services::{RestaurantService, SessionService},
    swagger::swagger_config,
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
    let config = Config::from_toml()
        .map_err(|e| std::io::Error::other(format!("Failed to load configuration: {e}")))?;

    // 存储 (Postgres 会先执行迁移)
    let repos = create_repositories(&config.database)
        .await
        .map_err(|e| std::io::Error::other(format!("Failed to initialise storage: {e}")))?;

    let session_service = SessionService::new(&repos);
    let restaurant_service = RestaurantService::new(&repos);

    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(create_cors())
            .app_data(web::Data::new(session_service.clone()))
            .app_data(web::Data::new(restaurant_service.clone()))
            .configure(swagger_config)
            .service(
                web::scope("/api/v1")
                    .configure(handlers::session_config)
                    .configure(handlers::restaurant_config),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}

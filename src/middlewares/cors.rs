use actix_cors::Cors;

/// 服务员平板与顾客扫码页面分别部署，来源不固定
pub fn create_cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allowed_methods(vec!["GET", "POST", "PUT", "OPTIONS"])
        .allow_any_header()
        .max_age(3600)
}

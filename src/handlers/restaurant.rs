use crate::models::*;
use crate::services::RestaurantService;
use actix_web::{HttpResponse, ResponseError, Result, web};

#[utoipa::path(
    get,
    path = "/restaurants/{id}/config",
    tag = "restaurant",
    params(
        ("id" = String, Path, description = "餐厅ID")
    ),
    responses(
        (status = 200, description = "解锁门槛与转盘配置", body = RestaurantConfig),
        (status = 404, description = "餐厅不存在")
    )
)]
pub async fn get_config(
    service: web::Data<RestaurantService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    match service.get_config(&path).await {
        Ok(config) => Ok(HttpResponse::Ok().json(ApiResponse::success(config))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/restaurants/{id}/spinner-config",
    tag = "restaurant",
    params(
        ("id" = String, Path, description = "餐厅ID")
    ),
    request_body = UpdateSpinnerConfigRequest,
    responses(
        (status = 200, description = "更新成功", body = RestaurantConfig),
        (status = 400, description = "转盘配置不合法"),
        (status = 404, description = "餐厅不存在")
    )
)]
/// 替换转盘格子（可同时调整解锁门槛）
pub async fn update_spinner_config(
    service: web::Data<RestaurantService>,
    path: web::Path<String>,
    request: web::Json<UpdateSpinnerConfigRequest>,
) -> Result<HttpResponse> {
    match service
        .update_spinner_config(&path, request.into_inner())
        .await
    {
        Ok(config) => Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
            config,
            "Spinner config updated".to_string(),
        ))),
        Err(e) => Ok(e.error_response()),
    }
}

/// 路由配置
pub fn restaurant_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/restaurants")
            .route("/{id}/config", web::get().to(get_config))
            .route("/{id}/spinner-config", web::put().to(update_spinner_config)),
    );
}

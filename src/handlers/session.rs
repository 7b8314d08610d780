use crate::models::*;
use crate::services::SessionService;
use actix_web::{HttpResponse, ResponseError, Result, web};

#[utoipa::path(
    post,
    path = "/sessions",
    tag = "session",
    request_body = OpenSessionRequest,
    responses(
        (status = 201, description = "开台成功", body = DiningSession),
        (status = 400, description = "请求参数错误"),
        (status = 404, description = "餐厅不存在")
    )
)]
/// 开台：创建空会话 (LOCKED / OPEN)
pub async fn open_session(
    service: web::Data<SessionService>,
    request: web::Json<OpenSessionRequest>,
) -> Result<HttpResponse> {
    match service.open_session(request.into_inner()).await {
        Ok(session) => Ok(HttpResponse::Created().json(ApiResponse::success(session))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/sessions",
    tag = "session",
    params(
        ("restaurant_id" = String, Query, description = "餐厅ID")
    ),
    responses(
        (status = 200, description = "进行中的会话 (最多100条)", body = [DiningSession])
    )
)]
pub async fn list_open_sessions(
    service: web::Data<SessionService>,
    query: web::Query<SessionListQuery>,
) -> Result<HttpResponse> {
    match service.list_open_sessions(&query.restaurant_id).await {
        Ok(list) => Ok(HttpResponse::Ok().json(ApiResponse::success(list))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/sessions/{id}",
    tag = "session",
    params(
        ("id" = String, Path, description = "会话ID")
    ),
    responses(
        (status = 200, description = "会话详情", body = DiningSession),
        (status = 404, description = "会话不存在")
    )
)]
pub async fn get_session(
    service: web::Data<SessionService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    match service.get_session(&path).await {
        Ok(session) => Ok(HttpResponse::Ok().json(ApiResponse::success(session))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/sessions/{id}/add-items",
    tag = "session",
    params(
        ("id" = String, Path, description = "会话ID")
    ),
    request_body = AddItemsRequest,
    responses(
        (status = 200, description = "加菜成功，必要时解锁游戏", body = DiningSession),
        (status = 400, description = "明细不合法"),
        (status = 404, description = "会话或餐厅不存在"),
        (status = 409, description = "会话已不接受加菜")
    )
)]
/// 服务员加菜：追加明细、累计金额、达到门槛自动解锁
pub async fn add_items(
    service: web::Data<SessionService>,
    path: web::Path<String>,
    request: web::Json<AddItemsRequest>,
) -> Result<HttpResponse> {
    match service.add_items(&path, request.into_inner().items).await {
        Ok(session) => Ok(HttpResponse::Ok().json(ApiResponse::success(session))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/sessions/{id}/game-won",
    tag = "session",
    params(
        ("id" = String, Path, description = "会话ID")
    ),
    responses(
        (status = 200, description = "游戏胜利", body = DiningSession),
        (status = 404, description = "会话不存在"),
        (status = 409, description = "游戏未解锁或已结束")
    )
)]
pub async fn mark_won(
    service: web::Data<SessionService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    match service.mark_won(&path).await {
        Ok(session) => Ok(HttpResponse::Ok().json(ApiResponse::success(session))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/sessions/{id}/game-lost",
    tag = "session",
    params(
        ("id" = String, Path, description = "会话ID")
    ),
    responses(
        (status = 200, description = "游戏失败已记录", body = DiningSession),
        (status = 404, description = "会话不存在"),
        (status = 409, description = "游戏未解锁或已结束")
    )
)]
pub async fn mark_lost(
    service: web::Data<SessionService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    match service.mark_lost(&path).await {
        Ok(session) => Ok(HttpResponse::Ok().json(ApiResponse::success(session))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/sessions/{id}/spin",
    tag = "session",
    params(
        ("id" = String, Path, description = "会话ID")
    ),
    responses(
        (status = 200, description = "转盘结果", body = SpinResponse),
        (status = 404, description = "会话不存在"),
        (status = 409, description = "未胜利或已转过"),
        (status = 500, description = "餐厅未配置转盘")
    )
)]
/// 转盘：按配置概率抽取一格，每个会话只有一次机会
pub async fn spin(
    service: web::Data<SessionService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    match service.spin(&path).await {
        Ok(result) => Ok(HttpResponse::Ok().json(ApiResponse::success(result))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/sessions/{id}/status",
    tag = "session",
    params(
        ("id" = String, Path, description = "会话ID")
    ),
    request_body = AdvanceStatusRequest,
    responses(
        (status = 200, description = "状态已推进", body = DiningSession),
        (status = 404, description = "会话不存在"),
        (status = 409, description = "非法的状态跳转")
    )
)]
/// OPEN -> FOOD_DELIVERED -> BILLED -> CLOSED，只能逐级前进
pub async fn advance_status(
    service: web::Data<SessionService>,
    path: web::Path<String>,
    request: web::Json<AdvanceStatusRequest>,
) -> Result<HttpResponse> {
    match service.advance_status(&path, request.status).await {
        Ok(session) => Ok(HttpResponse::Ok().json(ApiResponse::success(session))),
        Err(e) => Ok(e.error_response()),
    }
}

/// 路由配置
pub fn session_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/sessions")
            .route("", web::post().to(open_session))
            .route("", web::get().to(list_open_sessions))
            .route("/{id}", web::get().to(get_session))
            .route("/{id}/add-items", web::post().to(add_items))
            .route("/{id}/game-won", web::post().to(mark_won))
            .route("/{id}/game-lost", web::post().to(mark_lost))
            .route("/{id}/spin", web::post().to(spin))
            .route("/{id}/status", web::post().to(advance_status)),
    );
}

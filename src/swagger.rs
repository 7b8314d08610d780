use actix_web::web;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use crate::models::*;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::session::open_session,
        handlers::session::list_open_sessions,
        handlers::session::get_session,
        handlers::session::add_items,
        handlers::session::mark_won,
        handlers::session::mark_lost,
        handlers::session::spin,
        handlers::session::advance_status,
        handlers::restaurant::get_config,
        handlers::restaurant::update_spinner_config,
    ),
    components(
        schemas(
            DiningSession,
            OrderLine,
            Reward,
            OfferType,
            GameStatus,
            SessionStatus,
            SpinnerSlot,
            RestaurantConfig,
            OpenSessionRequest,
            AddItemsRequest,
            AdvanceStatusRequest,
            SessionListQuery,
            SpinResponse,
            UpdateSpinnerConfigRequest,
            ApiError,
        )
    ),
    tags(
        (name = "session", description = "Dining session and game API"),
        (name = "restaurant", description = "Restaurant gamification config API"),
    ),
    info(
        title = "SpinServe Backend API",
        version = "1.0.0",
        description = "Dining session and spin-the-wheel REST API documentation"
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}

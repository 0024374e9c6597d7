use axum::Json;
use utoipa::OpenApi;
use crate::{handlers, lamp, models};

#[derive(OpenApi)]
#[openapi(
    paths(handlers::get_state),
    components(
        schemas(
            models::BusMessage,
            models::CommandPayload,
            models::ColorCommand,
            models::StatePayload,
            models::ColorPayload,
            lamp::ColorMode,
        )
    )
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

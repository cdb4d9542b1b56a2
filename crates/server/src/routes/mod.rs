use axum::{
    Router,
    routing::{IntoMakeService, get},
};
use tower_http::{services::ServeDir, trace::TraceLayer};
use utils::assets::STATIC_ROUTE;

use crate::AppState;

pub mod health;
pub mod twilio;
pub mod uploads;

/// Build the application router without turning it into a service
pub fn app(state: AppState) -> Router {
    // Twilio and Meta fetch previews and reels from here, so it must stay public
    let media = ServeDir::new(&state.config.media_dir);

    Router::new()
        .route("/", get(health::health_check))
        .merge(twilio::twilio_routes())
        .merge(uploads::upload_routes())
        .nest_service(STATIC_ROUTE, media)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub fn router(state: AppState) -> IntoMakeService<Router> {
    app(state).into_make_service()
}

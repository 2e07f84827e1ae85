//! Router assembly

use super::{agents, handlers, tokens, AppState};
use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Build the full HTTP router
pub fn build_router(state: AppState, max_body_bytes: usize) -> Router {
    let threads: Router<AppState> = Router::new()
        .route(
            "/api/v1/threads",
            post(handlers::create_thread).get(handlers::list_threads),
        )
        .route(
            "/api/v1/threads/:id",
            get(handlers::get_thread)
                .patch(handlers::update_thread)
                .delete(handlers::delete_thread),
        )
        .route(
            "/api/v1/threads/:id/messages",
            post(handlers::send_message).get(handlers::list_messages),
        )
        .route("/api/v1/threads/:id/summary", get(handlers::get_summary))
        .route("/api/v1/threads/:id/agents", post(agents::thread_agents));

    // model ids contain slashes, so they are captured as wildcards
    let token_routes: Router<AppState> = Router::new()
        .route("/api/v1/tokens/count", post(tokens::count_tokens))
        .route("/api/v1/tokens/count-messages", post(tokens::count_messages))
        .route("/api/v1/tokens/validate/*model", get(tokens::validate))
        .route("/api/v1/tokens/status/*model", get(tokens::status))
        .route(
            "/api/v1/tokens/available-tokens/*model",
            get(tokens::available_tokens),
        )
        .route("/api/v1/tokens/check-fit", post(tokens::check_fit))
        .route("/api/v1/tokens/models-info", get(tokens::models_info));

    let agent_routes: Router<AppState> = Router::new()
        .route("/api/v1/agents", get(agents::list_agents))
        .route("/api/v1/agents/single", post(agents::run_single))
        .route("/api/v1/agents/team", post(agents::run_team))
        .route("/api/v1/agents/workflow", post(agents::run_workflow));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .route("/api/v1/models", get(handlers::list_models))
        .merge(threads)
        .merge(token_routes)
        .merge(agent_routes)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

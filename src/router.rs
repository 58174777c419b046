use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::handlers;
use crate::state::AppState;

/// Router の構築
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    let router = Router::new()
        .route("/", get(handlers::welcome))
        .route("/api/health", get(handlers::health_check))
        // 認証
        .route("/api/register", post(handlers::register))
        .route("/api/verify_email", post(handlers::verify_email))
        .route("/api/login", post(handlers::login))
        .route("/api/logout", post(handlers::logout))
        .route(
            "/api/profile",
            get(handlers::get_profile).put(handlers::update_profile),
        )
        .route("/api/password/forgot", post(handlers::forgot_password))
        .route("/api/password/reset", post(handlers::reset_password))
        // 書類
        .route("/api/letters", get(handlers::list_letters))
        .route("/api/letters/leave", post(handlers::generate_leave_letter))
        .route(
            "/api/letters/transfer",
            post(handlers::generate_transfer_letter),
        )
        .route("/api/letters/exam-paper", post(handlers::generate_exam_paper))
        .route(
            "/api/letters/{id}",
            get(handlers::get_letter)
                .put(handlers::update_letter)
                .delete(handlers::delete_letter),
        )
        .route(
            "/api/letters/{id}/download",
            post(handlers::prepare_download),
        )
        .route("/api/downloads/{handle}", get(handlers::download))
        // 管理者
        .route("/api/admin/users", get(handlers::list_users))
        .route("/api/admin/users/search", get(handlers::search_users))
        .route("/api/admin/users/{id}", get(handlers::get_user))
        .route(
            "/api/admin/users/{id}/letters",
            get(handlers::list_user_letters),
        )
        .route("/api/admin/letters", get(handlers::list_all_letters))
        .with_state(state);

    let router = match cors {
        Some(cors) => router.layer(cors),
        None => router,
    };

    router.layer(
        TraceLayer::new_for_http()
            .make_span_with(|req: &axum::http::Request<_>| {
                let method = req.method().clone();
                let uri = req.uri().clone();
                tracing::info_span!("http_request", %method, uri = %uri)
            })
            .on_response(
                |res: &axum::http::Response<_>, latency: std::time::Duration, _span: &tracing::Span| {
                    let status = res.status();
                    let latency_ms = latency.as_millis() as u64;
                    if status.is_server_error() {
                        tracing::error!(%status, latency_ms, "レスポンス");
                    } else {
                        tracing::info!(%status, latency_ms, "レスポンス");
                    }
                },
            ),
    )
}

/// CORS 設定（Cookie 送信のため許可オリジンは1つに限定）
fn cors_layer(config: &Config) -> Option<CorsLayer> {
    let origin = config.cors_allowed_origin.as_deref()?;
    match origin.parse::<HeaderValue>() {
        Ok(origin) => Some(
            CorsLayer::new()
                .allow_origin(origin)
                .allow_credentials(true)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                .allow_headers([header::CONTENT_TYPE]),
        ),
        Err(e) => {
            tracing::warn!(error = ?e, origin, "CORS_ALLOWED_ORIGIN が不正なため CORS 無効");
            None
        }
    }
}

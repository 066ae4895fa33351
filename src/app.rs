use std::net::SocketAddr;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{auth, readings};

async fn root_index() -> Json<Value> {
    Json(json!({
        "name": "Blood Sugar Tracker API",
        "health": "/healthz",
        "endpoints": {
            "register": "/api/register/",
            "login": "/api/login/",
            "profile": "/api/profile/",
            "readings_list_create": "/api/readings/",
            "reading_detail": "/api/readings/{id}/"
        }
    }))
}

async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn api_index() -> Json<Value> {
    Json(json!({
        "name": "Blood Sugar Tracker API",
        "version": 1,
        "health": "/healthz",
        "endpoints": {
            "register": "/api/register/",
            "login": "/api/login/",
            "profile": "/api/profile/",
            "readings_list_create": "/api/readings/",
            "reading_detail": "/api/readings/{id}/",
            "filter_by_notes": "/api/readings/?notes_icontains=after%20dinner",
            "filter_by_date": "/api/readings/?date_from=2025-10-18&date_to=2025-10-19",
            "ordering": "/api/readings/?ordering=-timestamp"
        }
    }))
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_index))
        .route("/healthz", get(healthz))
        .route("/api/", get(api_index))
        .nest(
            "/api",
            Router::new()
                .route("/", get(api_index))
                .merge(auth::router())
                .merge(readings::router()),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

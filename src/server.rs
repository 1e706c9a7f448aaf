use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use crate::db::RecordSource;
use crate::error::PredictError;
use crate::models::{LearnerFeatures, Prediction};
use crate::service::PredictionService;

impl IntoResponse for PredictError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.to_string() }));
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

pub fn router<S>(service: Arc<PredictionService<S>>) -> Router
where
    S: RecordSource + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route("/predict/:user_id", post(predict::<S>))
        .route("/features/:user_id", get(features::<S>))
        .with_state(service)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn predict<S: RecordSource>(
    State(service): State<Arc<PredictionService<S>>>,
    Path(user_id): Path<i64>,
) -> Result<Json<Prediction>, PredictError> {
    service.predict(user_id).await.map(Json)
}

async fn features<S: RecordSource>(
    State(service): State<Arc<PredictionService<S>>>,
    Path(user_id): Path<i64>,
) -> Result<Json<LearnerFeatures>, PredictError> {
    service.features(user_id).await.map(Json)
}

pub async fn serve<S>(service: PredictionService<S>, bind_addr: &str) -> anyhow::Result<()>
where
    S: RecordSource + 'static,
{
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    log::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, router(Arc::new(service)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Resolves on Ctrl-C. Never resolves when the handler cannot be installed.
async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!("failed to listen for Ctrl-C, graceful shutdown disabled: {err}");
        std::future::pending::<()>().await;
    }
    log::info!("Shutting down");
}

use std::{future::Future, sync::Arc};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use tracing::{error, info};

use crate::controller::AttenuatorController;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Ok,
    Error,
}

/// Response envelope shared by both routes. Failures are only ever reported
/// through `status`; the HTTP status code stays 200.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attenuation: Option<String>,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self {
            status: Status::Ok,
            attenuation: None,
        }
    }

    pub fn error() -> Self {
        Self {
            status: Status::Error,
            attenuation: None,
        }
    }

    pub fn attenuation(percent: f64) -> Self {
        Self {
            status: Status::Ok,
            attenuation: Some(format!("{percent:.2}")),
        }
    }
}

pub fn router(controller: Arc<AttenuatorController>) -> Router {
    Router::new()
        .route("/get", get(get_attenuation))
        .route("/set/{attenuation}", get(set_attenuation))
        .with_state(controller)
}

pub async fn serve(
    controller: Arc<AttenuatorController>,
    bind_address: &str,
    port: u16,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(format!("{bind_address}:{port}"))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {bind_address}:{port}: {e}"))?;

    info!("Attenuator HTTP server listening on {}:{}", bind_address, port);

    axum::serve(listener, router(controller))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Attenuator HTTP server stopped");
    Ok(())
}

async fn get_attenuation(
    State(controller): State<Arc<AttenuatorController>>,
) -> Json<StatusResponse> {
    match controller.get_attenuation().await {
        Ok(fraction) => Json(StatusResponse::attenuation(fraction * 100.0)),
        Err(e) => {
            error!("Failed to read attenuation: {}", e);
            Json(StatusResponse::error())
        }
    }
}

async fn set_attenuation(
    State(controller): State<Arc<AttenuatorController>>,
    Path(attenuation): Path<String>,
) -> Response {
    // Only non-negative integers match the route. Any digit string is
    // accepted, however large, and left to the range check.
    if attenuation.is_empty() || !attenuation.bytes().all(|b| b.is_ascii_digit()) {
        return StatusCode::NOT_FOUND.into_response();
    }

    let Ok(value) = attenuation.parse::<f64>() else {
        return Json(StatusResponse::error()).into_response();
    };

    let response = match controller.set_attenuation(value).await {
        Ok(_) => StatusResponse::ok(),
        Err(e) => {
            error!("Failed to set attenuation to {}%: {}", attenuation, e);
            StatusResponse::error()
        }
    };

    Json(response).into_response()
}

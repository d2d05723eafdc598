// SPDX-License-Identifier: MIT OR Apache-2.0

//! Admin-key-gated control surface.

use crate::AppState;
use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use osp_degradation::DegradationLevel;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::warn;

const ADMIN_KEY_HEADER: &str = "x-admin-key";

/// Body of `POST /admin/degradation`.
#[derive(Debug, Deserialize)]
pub struct DegradationRequest {
    /// Target level: `D0`..`D3` or the full level name.
    pub level: String,
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), Response> {
    let presented = headers
        .get(ADMIN_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    // Constant-time comparison; the admin key is an authorization secret.
    let authorized = state
        .config
        .admin_key
        .as_deref()
        .is_some_and(|key| bool::from(key.as_bytes().ct_eq(presented.as_bytes())));
    if authorized {
        Ok(())
    } else {
        warn!("admin request rejected: invalid or missing admin key");
        Err((
            StatusCode::FORBIDDEN,
            Json(json!({"error": "Invalid admin key"})),
        )
            .into_response())
    }
}

/// `POST /admin/degradation` — set the degradation level.
pub async fn set_degradation(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<DegradationRequest>,
) -> Response {
    if let Err(rejection) = authorize(&state, &headers) {
        return rejection;
    }

    match request.level.parse::<DegradationLevel>() {
        Ok(level) => {
            state.degradation.set_level(level);
            state.metrics.degradation_level.set(i64::from(level.value()));
            (
                StatusCode::OK,
                Json(json!({"status": "success", "level": level.as_str()})),
            )
                .into_response()
        }
        Err(_) => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "Invalid degradation level. Use D0_NORMAL, D1_REDUCED_INTELLIGENCE, D2_MINIMAL, D3_CRITICAL"
            })),
        )
            .into_response(),
    }
}

/// `GET /admin/debug/keys` — expose the ephemeral signing keypair so test
/// clients can sign requests. Compiled only with the `debug-keys` feature.
#[cfg(feature = "debug-keys")]
pub async fn debug_keys(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    use osp_canon::KeyMaterial;

    if let Err(rejection) = authorize(&state, &headers) {
        return rejection;
    }

    match &state.debug_keys {
        Some(pair) => {
            let private = match &pair.private {
                KeyMaterial::Pem(pem) => pem.clone(),
                KeyMaterial::Secret(_) => String::new(),
            };
            let public = match &pair.public {
                Some(KeyMaterial::Pem(pem)) => pem.clone(),
                _ => String::new(),
            };
            (
                StatusCode::OK,
                Json(json!({"private_key": private, "public_key": public})),
            )
                .into_response()
        }
        None => (
            StatusCode::OK,
            Json(json!({"error": "Keys not generated"})),
        )
            .into_response(),
    }
}

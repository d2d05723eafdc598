// SPDX-License-Identifier: MIT OR Apache-2.0

//! The JSON-RPC 2.0 dispatcher at `POST /osp-rpc`.

use crate::AppState;
use crate::conformance::run_conformance;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use osp_core::{PROTOCOL_VERSION, ReasonCode, RouteResponse, SERVER_VERSION};
use osp_degradation::DegradationLevel;
use osp_delivery::{DEFAULT_TTL_SECONDS, DeliveryError, DeliveryStatus};
use osp_registry::{EntryStatus, RegistryEntry, RegistryError};
use osp_routing::RouteRequest;
use serde::Deserialize;
use serde_json::{Value, json};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};
use uuid::Uuid;

/// Methods that stay admitted while the server sheds load at D3.
const D3_EXEMPT_METHODS: &[&str] = &["osp.get_capabilities", "osp.list_profiles", "osp.conformance.run"];

/// JSON-RPC 2.0 request envelope.
#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    /// Must be `"2.0"`.
    pub jsonrpc: String,
    /// Method name (e.g. `"osp.route"`).
    pub method: String,
    /// Method parameters.
    #[serde(default)]
    pub params: Value,
    /// Caller-chosen correlation id.
    #[serde(default)]
    pub id: Value,
}

/// Outcome of a dispatched method: HTTP status plus either a result value
/// or a JSON-RPC error object.
enum Dispatched {
    Result(StatusCode, Value),
    Error(StatusCode, i64, String),
}

/// Largest accepted request body.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// `POST /osp-rpc`.
pub async fn handle_rpc(State(state): State<Arc<AppState>>, request: Request) -> Response {
    let connect = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|c| c.0);
    let headers = request.headers().clone();
    let body = match axum::body::to_bytes(request.into_body(), MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(err) => {
            state.record_request("unknown", StatusCode::BAD_REQUEST);
            return rpc_error(
                StatusCode::BAD_REQUEST,
                -32700,
                format!("Failed to read request body: {err}"),
                Value::Null,
            );
        }
    };

    // Rate limit per client IP before any parsing.
    let client_ip = client_ip(connect);
    if !state.rate_limiter.check(client_ip) {
        state.record_request("unknown", StatusCode::TOO_MANY_REQUESTS);
        return rpc_error(
            StatusCode::TOO_MANY_REQUESTS,
            -32000,
            ReasonCode::RateLimitExceeded.as_str().to_string(),
            Value::Null,
        );
    }

    // Request-plane authentication over the raw body bytes.
    if let Err(err) = state.verifier.verify(&headers, &body) {
        state.record_request("unknown", StatusCode::UNAUTHORIZED);
        return rpc_error(StatusCode::UNAUTHORIZED, -32000, err.to_string(), Value::Null);
    }

    // Envelope validation.
    let request: RpcRequest = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(err) => {
            state.record_request("unknown", StatusCode::BAD_REQUEST);
            return rpc_error(
                StatusCode::BAD_REQUEST,
                -32700,
                format!("Parse error: {err}"),
                Value::Null,
            );
        }
    };
    if request.jsonrpc != "2.0" {
        state.record_request(&request.method, StatusCode::BAD_REQUEST);
        return rpc_error(
            StatusCode::BAD_REQUEST,
            -32600,
            "Invalid JSON-RPC version".to_string(),
            request.id,
        );
    }

    info!(method = request.method.as_str(), "rpc request");

    // Admission. Introspection methods stay available during load
    // shedding; everything else is refused at D3.
    if !state.degradation.check_request_allowed()
        && !D3_EXEMPT_METHODS.contains(&request.method.as_str())
    {
        state.record_request(&request.method, StatusCode::SERVICE_UNAVAILABLE);
        return rpc_error(
            StatusCode::SERVICE_UNAVAILABLE,
            -32000,
            "Service Unavailable (Degradation D3)".to_string(),
            request.id,
        );
    }

    let dispatched = dispatch(&state, &request).await;
    match dispatched {
        Dispatched::Result(status, result) => {
            state.record_request(&request.method, status);
            rpc_result(status, result, request.id)
        }
        Dispatched::Error(status, code, message) => {
            state.record_request(&request.method, status);
            rpc_error(status, code, message, request.id)
        }
    }
}

async fn dispatch(state: &AppState, request: &RpcRequest) -> Dispatched {
    match request.method.as_str() {
        "osp.route" => route(state, request.params.clone()),
        "osp.execute" => execute(state, &request.params).await,
        "osp.get_proof" => get_proof(state, &request.params),
        "osp.list_skills" => Dispatched::Result(
            StatusCode::OK,
            serde_json::to_value(state.skills.manifests()).unwrap_or_default(),
        ),
        "osp.get_skill" => get_skill(state, &request.params),
        "osp.get_capabilities" => Dispatched::Result(StatusCode::OK, capabilities()),
        "osp.list_profiles" => Dispatched::Result(StatusCode::OK, profiles(state)),
        "osp.conformance.run" => Dispatched::Result(StatusCode::OK, run_conformance()),
        "osp.registry.register" => registry_register(state, request.params.clone()),
        "osp.registry.revoke" => registry_revoke(state, &request.params),
        "osp.registry.list" => registry_list(state, &request.params),
        "osp.registry.log" => registry_log(state, &request.params),
        other => Dispatched::Error(
            StatusCode::NOT_FOUND,
            -32601,
            format!("Method '{other}' not found"),
        ),
    }
}

// ---------------------------------------------------------------------------
// osp.route
// ---------------------------------------------------------------------------

fn route(state: &AppState, params: Value) -> Dispatched {
    let mut request: RouteRequest = match serde_json::from_value(params) {
        Ok(req) => req,
        Err(err) => {
            return Dispatched::Error(
                StatusCode::BAD_REQUEST,
                -32602,
                format!("Invalid params: {err}"),
            );
        }
    };

    // Strict levels disable the semantic stage regardless of what the
    // caller asked for.
    if state.degradation.is_strict_routing_only() {
        request.routing_conditions.skip_semantic = true;
    }

    let response = state.router.route(&request);
    let status = match &response {
        RouteResponse::Fallback(fallback) => {
            StatusCode::from_u16(fallback.reason_code.http_status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
        }
        RouteResponse::Decision(_) => StatusCode::OK,
    };

    match serde_json::to_value(&response) {
        Ok(value) => Dispatched::Result(status, value),
        Err(err) => {
            error!(error = %err, "failed to serialize routing response");
            Dispatched::Error(
                StatusCode::INTERNAL_SERVER_ERROR,
                -32603,
                "Internal error".to_string(),
            )
        }
    }
}

// ---------------------------------------------------------------------------
// osp.execute
// ---------------------------------------------------------------------------

async fn execute(state: &AppState, params: &Value) -> Dispatched {
    let Some(skill_id) = params.get("skill_id").and_then(Value::as_str) else {
        return Dispatched::Error(
            StatusCode::BAD_REQUEST,
            -32602,
            "Missing skill_id".to_string(),
        );
    };
    let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));
    let ttl_seconds = params
        .get("ttl_seconds")
        .and_then(Value::as_u64)
        .unwrap_or(DEFAULT_TTL_SECONDS);
    let idempotency_key = params
        .get("idempotency_key")
        .and_then(Value::as_str)
        .map(str::to_string);

    let Some(skill) = state.skills.get(skill_id) else {
        return Dispatched::Error(
            StatusCode::NOT_FOUND,
            -32601,
            format!("Skill tools not found for {skill_id}"),
        );
    };

    let started = Instant::now();
    let outcome = state
        .delivery
        .execute_with_contract(
            skill_id,
            skill.as_ref(),
            arguments,
            ttl_seconds,
            idempotency_key,
            Some(state.degradation.as_ref()),
        )
        .await;
    state
        .metrics
        .execution_duration
        .with_label_values(&[skill_id])
        .observe(started.elapsed().as_secs_f64());

    match outcome {
        Ok(outcome) if outcome.status == DeliveryStatus::Success => Dispatched::Result(
            StatusCode::OK,
            serde_json::to_value(&outcome).unwrap_or_default(),
        ),
        Ok(outcome) => Dispatched::Error(
            StatusCode::INTERNAL_SERVER_ERROR,
            -32603,
            outcome.error.unwrap_or_else(|| "execution failed".to_string()),
        ),
        Err(DeliveryError::RejectedDegradation) => Dispatched::Error(
            StatusCode::SERVICE_UNAVAILABLE,
            -32000,
            "Service unavailable (load shedding)".to_string(),
        ),
    }
}

// ---------------------------------------------------------------------------
// osp.get_proof
// ---------------------------------------------------------------------------

fn get_proof(state: &AppState, params: &Value) -> Dispatched {
    let Some(key) = params.get("idempotency_key").and_then(Value::as_str) else {
        return Dispatched::Error(
            StatusCode::BAD_REQUEST,
            -32602,
            "Missing idempotency_key".to_string(),
        );
    };

    match state.delivery.get_proof(key) {
        Some((contract, entries)) => {
            let total_events = entries.len();
            Dispatched::Result(
                StatusCode::OK,
                json!({
                    "contract": contract,
                    "proof_log": entries,
                    "total_events": total_events,
                }),
            )
        }
        None => Dispatched::Result(
            StatusCode::OK,
            json!({"error": format!("No contract found for key '{key}'")}),
        ),
    }
}

// ---------------------------------------------------------------------------
// osp.get_skill / capabilities / profiles
// ---------------------------------------------------------------------------

fn get_skill(state: &AppState, params: &Value) -> Dispatched {
    let Some(skill_id) = params.get("skill_id").and_then(Value::as_str) else {
        return Dispatched::Error(
            StatusCode::BAD_REQUEST,
            -32602,
            "Missing skill_id".to_string(),
        );
    };
    match state.skills.manifest(skill_id) {
        Some(manifest) => Dispatched::Result(
            StatusCode::OK,
            serde_json::to_value(manifest).unwrap_or_default(),
        ),
        None => Dispatched::Result(
            StatusCode::OK,
            json!({"error": format!("Skill '{skill_id}' not found")}),
        ),
    }
}

fn capabilities() -> Value {
    json!({
        "protocol": PROTOCOL_VERSION,
        "server": SERVER_VERSION,
        "methods": [
            "osp.route", "osp.execute", "osp.list_skills",
            "osp.get_capabilities", "osp.get_skill", "osp.get_proof",
            "osp.list_profiles", "osp.conformance.run",
            "osp.registry.register", "osp.registry.revoke", "osp.registry.list", "osp.registry.log",
        ],
        "auth": "JCS+ES256/ES384/ES512/RS256/RS384/RS512/EdDSA/HS256/HS512",
        "degradation_levels": ["D0_NORMAL", "D1_REDUCED_INTELLIGENCE", "D2_MINIMAL", "D3_CRITICAL"],
        "delivery_contracts": true,
    })
}

fn profiles(state: &AppState) -> Value {
    let mut profiles = serde_json::Map::new();
    for level in DegradationLevel::ALL {
        profiles.insert(
            level.as_str().to_string(),
            serde_json::to_value(level.profile()).unwrap_or_default(),
        );
    }
    json!({
        "current_level": state.degradation.level().as_str(),
        "profiles": Value::Object(profiles),
    })
}

// ---------------------------------------------------------------------------
// osp.registry.*
// ---------------------------------------------------------------------------

fn registry_register(state: &AppState, params: Value) -> Dispatched {
    let entry: RegistryEntry = match serde_json::from_value(params) {
        Ok(entry) => entry,
        Err(err) => {
            return Dispatched::Error(
                StatusCode::BAD_REQUEST,
                -32602,
                format!("Invalid registry entry: {err}"),
            );
        }
    };

    match state.registry.register(entry) {
        Ok(stored) => Dispatched::Result(
            StatusCode::OK,
            json!({
                "status": "registered",
                "skill_ref": stored.entry.skill_ref,
                "entry_type": stored.entry.entry_type,
            }),
        ),
        Err(err) => registry_failure(err),
    }
}

fn registry_revoke(state: &AppState, params: &Value) -> Dispatched {
    let (Some(skill_ref), Some(signed_by)) = (
        params.get("skill_ref").and_then(Value::as_str),
        params.get("signed_by").and_then(Value::as_str),
    ) else {
        return Dispatched::Error(
            StatusCode::BAD_REQUEST,
            -32602,
            "Missing skill_ref or signed_by".to_string(),
        );
    };

    match state.registry.revoke(skill_ref, signed_by) {
        Ok(stored) => Dispatched::Result(
            StatusCode::OK,
            json!({"status": "revoked", "skill_ref": stored.entry.skill_ref}),
        ),
        Err(err) => registry_failure(err),
    }
}

fn registry_list(state: &AppState, params: &Value) -> Dispatched {
    let status = match params.get("status").and_then(Value::as_str).unwrap_or("active") {
        "active" => EntryStatus::Active,
        "revoked" => EntryStatus::Revoked,
        other => {
            return Dispatched::Error(
                StatusCode::BAD_REQUEST,
                -32602,
                format!("Unknown status filter: {other}"),
            );
        }
    };
    Dispatched::Result(
        StatusCode::OK,
        serde_json::to_value(state.registry.list_entries(status)).unwrap_or_default(),
    )
}

fn registry_log(state: &AppState, params: &Value) -> Dispatched {
    let limit = params.get("limit").and_then(Value::as_u64).unwrap_or(100) as usize;
    let offset = params.get("offset").and_then(Value::as_u64).unwrap_or(0) as usize;
    let page = state.registry.transparency_log(limit, offset);
    Dispatched::Result(StatusCode::OK, serde_json::to_value(page).unwrap_or_default())
}

fn registry_failure(err: RegistryError) -> Dispatched {
    let status = match &err {
        RegistryError::UnauthorizedRevoke { .. } => StatusCode::FORBIDDEN,
        RegistryError::NotFound { .. } => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_REQUEST,
    };
    Dispatched::Error(status, -32602, err.to_string())
}

// ---------------------------------------------------------------------------
// Envelopes
// ---------------------------------------------------------------------------

fn meta() -> Value {
    json!({
        "request_id": Uuid::new_v4().to_string(),
        "trace_id": Uuid::new_v4().to_string(),
        "timestamp": Utc::now().to_rfc3339(),
    })
}

fn rpc_result(status: StatusCode, result: Value, id: Value) -> Response {
    let body = json!({
        "jsonrpc": "2.0",
        "result": result,
        "id": id,
        "_meta": meta(),
    });
    (status, axum::Json(body)).into_response()
}

fn rpc_error(status: StatusCode, code: i64, message: String, id: Value) -> Response {
    let body = json!({
        "jsonrpc": "2.0",
        "error": {"code": code, "message": message},
        "id": id,
        "_meta": meta(),
    });
    (status, axum::Json(body)).into_response()
}

/// The rate-limit key. Only the transport-level peer address is trusted;
/// forwarding headers are attacker-controlled on direct connections.
fn client_ip(connect: Option<SocketAddr>) -> IpAddr {
    connect
        .map(|addr| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

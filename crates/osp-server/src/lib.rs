// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = "Open Skills Protocol reference server: HTTP plane and wiring."]
#![deny(unsafe_code)]

//! Composes the engine-plane crates into an axum application: the JSON-RPC
//! dispatcher at `POST /osp-rpc`, health and Prometheus endpoints, and the
//! admin-key-gated control surface. All shared state is dependency-injected
//! through [`AppState`], built once at startup.

mod admin;
mod auth;
mod config;
mod conformance;
mod metrics;
mod ratelimit;
mod rpc;
mod skills;

pub use auth::{ALGORITHM_HEADER, AuthError, SIGNATURE_HEADER, SignatureVerifier};
pub use config::{ServerConfig, SignatureMode};
pub use metrics::Metrics;
pub use ratelimit::RateLimiter;
pub use skills::{CalculatorSkill, EchoSkill, SkillCatalog, register_builtin_skills};

use axum::{
    Router,
    extract::State,
    response::IntoResponse,
    routing::{get, post},
};
use osp_canon::{Algorithm, KeyPair};
use osp_degradation::DegradationController;
use osp_delivery::DeliveryEnforcer;
use osp_registry::RegistryService;
use osp_routing::{HashingEmbedder, RouterService};
use osp_safety::SafetyEngine;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

/// Identity allowed to revoke any registry entry when an admin key is
/// configured.
pub const ADMIN_IDENTITY: &str = "__admin__";

/// All shared server state, built once at startup.
pub struct AppState {
    /// The four-stage router (owns the safety engine).
    pub router: RouterService,
    /// Delivery-contract enforcer.
    pub delivery: DeliveryEnforcer,
    /// Skill registry.
    pub registry: RegistryService,
    /// Degradation controller.
    pub degradation: Arc<DegradationController>,
    /// Executable skill catalog.
    pub skills: SkillCatalog,
    /// Request-plane signature verifier.
    pub verifier: SignatureVerifier,
    /// Per-IP rate limiter.
    pub rate_limiter: RateLimiter,
    /// Prometheus instruments.
    pub metrics: Metrics,
    /// Runtime configuration.
    pub config: ServerConfig,
    /// Ephemeral keypair backing the signature plane; exposed through the
    /// debug endpoint in test builds.
    pub debug_keys: Option<KeyPair>,
}

impl AppState {
    /// Build the full state from configuration.
    ///
    /// When signatures are enabled an ephemeral ES256 keypair is generated
    /// for the verification plane, matching what the debug-keys endpoint
    /// hands to clients.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        let (debug_keys, verifier) = match config.signature_mode {
            SignatureMode::Disabled => (None, SignatureVerifier::new(SignatureMode::Disabled, None)),
            mode => {
                let pair = osp_canon::generate_key(Algorithm::Es256)
                    .expect("ephemeral key generation succeeds at startup");
                info!("generated ephemeral ES256 keypair for the signature plane");
                let verifier = SignatureVerifier::new(mode, pair.public.clone());
                (Some(pair), verifier)
            }
        };

        let degradation = Arc::new(DegradationController::new());
        let safety = Arc::new(SafetyEngine::new());
        let router = RouterService::new(safety, Some(Arc::new(HashingEmbedder::default())));
        let admin_identity = config.admin_key.as_ref().map(|_| ADMIN_IDENTITY.to_string());

        Self {
            router,
            delivery: DeliveryEnforcer::new(),
            registry: RegistryService::new(admin_identity),
            degradation,
            skills: SkillCatalog::new(),
            verifier,
            rate_limiter: RateLimiter::new(config.rate_limit_max, config.rate_limit_window),
            metrics: Metrics::new(),
            config,
            debug_keys,
        }
    }

    /// Count one finished request in the metrics.
    pub(crate) fn record_request(&self, method: &str, status: axum::http::StatusCode) {
        self.metrics
            .requests_total
            .with_label_values(&[method, status.as_str()])
            .inc();
    }
}

/// Build the axum application over shared state.
pub fn build_app(state: Arc<AppState>) -> Router {
    let router = Router::new()
        .route("/osp-rpc", post(rpc::handle_rpc))
        .route("/health", get(health))
        .route("/metrics", get(metrics_endpoint))
        .route("/admin/degradation", post(admin::set_degradation));

    #[cfg(feature = "debug-keys")]
    let router = router.route("/admin/debug/keys", get(admin::debug_keys));

    router.layer(CorsLayer::permissive()).with_state(state)
}

async fn health() -> impl IntoResponse {
    axum::Json(json!({"status": "ok"}))
}

async fn metrics_endpoint(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

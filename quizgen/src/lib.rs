//! # quizgen: notes-to-quiz generation service
//!
//! `quizgen` turns study notes into multiple-choice quizzes. A browser front-end posts notes
//! (pasted text or an uploaded plain-text file) to `POST /api/generate-quiz`; the service wraps
//! them in a fixed instruction prompt, asks an OpenAI-compatible chat completion API for a JSON
//! array of questions, and returns the parsed questions.
//!
//! ## Request Flow
//!
//! 1. [`notes`] reads the multipart form: non-blank `text` wins over `file`, and whichever is used
//!    must fit in `limits.max_notes_bytes`.
//! 2. [`quiz::QuizGenerator`] builds the prompt and makes exactly one call through the configured
//!    [`upstream::CompletionProvider`].
//! 3. The answer is parsed strictly. Anything unusable is replaced by a single placeholder
//!    question, so callers always get a well-formed list. Only transport or upstream failures
//!    surface as errors.
//!
//! Nothing is persisted. The only state shared between requests is the loaded [`Config`] and the
//! provider, both immutable after startup.
//!
//! ## Endpoints
//!
//! - `POST /api/generate-quiz` - quiz generation (every other method answers 405)
//! - `GET /healthz` - liveness
//! - `GET /api-docs/openapi.json`, `GET /docs` - OpenAPI document and Scalar UI
//! - `GET /internal/metrics` - Prometheus metrics, when `enable_metrics` is set
//!
//! ## Configuration
//!
//! See [`config`] for the YAML layout and environment overrides. The upstream credential is
//! normally supplied through `OPENAI_API_KEY`.

pub mod api;
pub mod config;
pub mod errors;
pub mod metrics;
pub mod notes;
mod openapi;
pub mod quiz;
pub mod telemetry;
pub mod upstream;

#[cfg(test)]
mod test_utils;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::{Method, header},
    routing::{get, post},
};
use bon::Builder;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, info, warn};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use config::Config;
use config::{CorsOrigin, UpstreamConfig};
use openapi::ApiDoc;
use quiz::QuizGenerator;

/// Room for multipart boundaries, part headers and the `text` field alongside a full-size file.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Shared state handed to every handler.
///
/// ```ignore
/// let state = AppState::builder()
///     .config(config)
///     .generator(Arc::new(generator))
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub generator: Arc<QuizGenerator>,
}

fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let origins = &config.cors.allowed_origins;

    let allow_origin = if origins.contains(&CorsOrigin::Wildcard) {
        AllowOrigin::any()
    } else {
        let mut values = Vec::with_capacity(origins.len());
        for origin in origins {
            if let CorsOrigin::Url(url) = origin {
                // Origins never carry a trailing slash
                values.push(url.as_str().trim_end_matches('/').parse::<header::HeaderValue>()?);
            }
        }
        AllowOrigin::list(values)
    };

    let mut cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    if let Some(max_age) = config.cors.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router with all endpoints and middleware.
///
/// # Errors
///
/// Returns an error if a configured CORS origin is not a valid header value.
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    let body_limit = state
        .config
        .limits
        .max_notes_bytes
        .saturating_mul(2)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    let quiz_route = post(api::handlers::quiz::generate_quiz)
        .fallback(api::handlers::quiz::method_not_allowed)
        .layer(DefaultBodyLimit::max(body_limit));

    let mut router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .route("/api/generate-quiz", quiz_route)
        .with_state(state.clone())
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    if state.config.enable_metrics {
        router = router.route("/internal/metrics", get(metrics::render));
    }

    let router = router.layer(create_cors_layer(&state.config)?).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// A fully wired service, ready to serve.
pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    /// Build the provider, state and router from configuration.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        match &config.upstream {
            UpstreamConfig::OpenAi(openai) if openai.api_key.is_none() => {
                warn!(
                    base_url = %openai.base_url,
                    "No upstream API key configured (set OPENAI_API_KEY); quiz requests will likely fail"
                );
            }
            UpstreamConfig::Dummy(_) => {
                info!("Using dummy upstream provider; quizzes are canned");
            }
            UpstreamConfig::OpenAi(_) => {}
        }

        let provider = upstream::create_provider(&config.upstream)?;
        let generator = QuizGenerator::new(provider, config.quiz.clone());

        let state = AppState::builder()
            .config(config.clone())
            .generator(Arc::new(generator))
            .build();

        let router = build_router(&state)?;

        Ok(Self { router, config })
    }

    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router.into_make_service()).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "Quiz service listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Quiz service stopped");
        Ok(())
    }
}

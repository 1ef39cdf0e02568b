//! Tally Web Server
//!
//! Axum-based REST API for the Tally expense tracker.
//!
//! Security features:
//! - Access proxy / API key authentication (secure by default, use --no-auth for local dev)
//! - Every query scoped to the authenticated user
//! - Restrictive CORS policy
//! - Classified, sanitized error responses

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{de::DeserializeOwned, Serialize};
use tower_http::{
    cors::CorsLayer, services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};
use tracing::{error, info, warn};

use tally_core::ai::{AIBackend, AIClient};
use tally_core::classify::{AppFailure, ErrorKind};
use tally_core::db::Database;
use tally_core::validation::ValidationErrors;

mod handlers;

/// Access proxy header carrying the authenticated user's email
const CF_ACCESS_USER_HEADER: &str = "cf-access-authenticated-user-email";

/// Authorization header for API key auth
const AUTHORIZATION_HEADER: &str = "authorization";

/// User id used when authentication is disabled
pub const LOCAL_DEV_USER: &str = "local-dev";

/// User id for API keys configured without an explicit owner
pub const DEFAULT_API_KEY_USER: &str = "api-key";

/// Maximum accepted JSON body size (1 MB)
pub const MAX_BODY_SIZE: usize = 1024 * 1024;

/// A bearer key and the user it authenticates as
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiKey {
    pub key: String,
    pub user_id: String,
}

/// Parse a comma-separated list of API keys
///
/// Entries are either `key` (authenticates as `api-key`) or `key=user_id`.
pub fn parse_api_keys(input: &str) -> Vec<ApiKey> {
    input
        .split(',')
        .filter_map(|entry| {
            let entry = entry.trim();
            if entry.is_empty() {
                return None;
            }
            match entry.split_once('=') {
                Some((key, user)) if !key.trim().is_empty() && !user.trim().is_empty() => {
                    Some(ApiKey {
                        key: key.trim().to_string(),
                        user_id: user.trim().to_string(),
                    })
                }
                Some(_) => {
                    warn!("Ignoring malformed API key entry");
                    None
                }
                None => Some(ApiKey {
                    key: entry.to_string(),
                    user_id: DEFAULT_API_KEY_USER.to_string(),
                }),
            }
        })
        .collect()
}

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    /// Whether authentication is required (secure by default)
    pub require_auth: bool,
    /// Allowed CORS origins (empty = same-origin only in production)
    pub allowed_origins: Vec<String>,
    /// API keys for service authentication (alternative to the access proxy)
    /// Format: "Bearer <key>" in Authorization header
    pub api_keys: Vec<ApiKey>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            require_auth: true,
            allowed_origins: vec![],
            api_keys: vec![],
        }
    }
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub config: ServerConfig,
    pub ai: Option<AIClient>,
}

/// How a request was authenticated
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    AccessHeader,
    ApiKey,
    None,
}

impl AuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessHeader => "access_header",
            Self::ApiKey => "api_key",
            Self::None => "none",
        }
    }
}

/// The authenticated owner of a request, inserted by [`auth_middleware`]
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: String,
    pub method: AuthMethod,
}

/// Authentication middleware - resolves the access proxy header or an API key
/// to a user id
///
/// # Security Notes
///
/// **Access proxy header**: trusted as-is. Only safe when the server sits
/// behind a proxy that strips or rewrites the header.
///
/// **API keys**: Compared using constant-time comparison to prevent timing attacks.
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    if !state.config.require_auth {
        request.extensions_mut().insert(AuthUser {
            id: LOCAL_DEV_USER.to_string(),
            method: AuthMethod::None,
        });
        return next.run(request).await;
    }

    let header_user = request
        .headers()
        .get(CF_ACCESS_USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    if let Some(email) = header_user {
        info!(user = %email, path = %request.uri().path(), "Authenticated via access header");
        request.extensions_mut().insert(AuthUser {
            id: email,
            method: AuthMethod::AccessHeader,
        });
        return next.run(request).await;
    }

    // Check for API key in Authorization header (Bearer token)
    let key_user = request
        .headers()
        .get(AUTHORIZATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .and_then(|key| validate_api_key(key, &state.config.api_keys));

    if let Some(user_id) = key_user {
        info!(user = %user_id, path = %request.uri().path(), "Authenticated via API key");
        request.extensions_mut().insert(AuthUser {
            id: user_id,
            method: AuthMethod::ApiKey,
        });
        return next.run(request).await;
    }

    warn!(path = %request.uri().path(), "Unauthorized request - no valid auth");
    AppError::from(AppFailure::unauthorized("Authentication required")).into_response()
}

/// Find the user of a matching API key using constant-time comparison
fn validate_api_key(provided: &str, valid_keys: &[ApiKey]) -> Option<String> {
    use subtle::ConstantTimeEq;

    let provided_bytes = provided.as_bytes();
    let mut matched = None;

    for entry in valid_keys {
        let key_bytes = entry.key.as_bytes();
        // Only compare if lengths match (constant-time for same-length keys)
        if provided_bytes.len() == key_bytes.len()
            && bool::from(provided_bytes.ct_eq(key_bytes))
            && matched.is_none()
        {
            matched = Some(entry.user_id.clone());
        }
    }
    matched
}

/// Parse a JSON request body, reporting syntax errors as validation failures
pub(crate) fn parse_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, AppError> {
    serde_json::from_slice(bytes).map_err(|e| {
        AppError::bad_request(&format!("Invalid JSON body: {}", e))
    })
}

/// Create the application router
///
/// The AI backend is taken from the environment.
pub fn create_router(db: Database, static_dir: Option<&str>, config: ServerConfig) -> Router {
    let ai = AIClient::from_env();
    if let Some(ref client) = ai {
        info!(
            "AI backend configured: {} (model: {})",
            client.host(),
            client.model()
        );
    } else {
        info!("ℹ️  AI backend not configured (set GEMINI_API_KEY to enable insights)");
    }

    create_router_with_options(db, static_dir, config, ai)
}

/// Create the application router with an explicit AI backend (for testing)
pub fn create_router_with_options(
    db: Database,
    static_dir: Option<&str>,
    config: ServerConfig,
    ai: Option<AIClient>,
) -> Router {
    let state = Arc::new(AppState {
        db,
        config: config.clone(),
        ai,
    });

    let api_routes = Router::new()
        // Auth
        .route("/me", get(handlers::get_me))
        // Expenses
        .route(
            "/expenses",
            get(handlers::list_expenses).post(handlers::create_expense),
        )
        .route(
            "/expenses/:id",
            axum::routing::put(handlers::update_expense).delete(handlers::delete_expense),
        )
        // Summaries
        .route("/summary/monthly", get(handlers::get_monthly_summary))
        .route("/summary/categories", get(handlers::get_category_summary))
        .route("/summary/daily", get(handlers::get_daily_spending))
        // AI insights
        .route("/insights", axum::routing::post(handlers::generate_insights))
        // Profile
        .route(
            "/profile",
            get(handlers::get_profile)
                .put(handlers::update_profile)
                .delete(handlers::delete_profile),
        );

    // CORS configuration
    let cors = if config.allowed_origins.is_empty() {
        // No CORS headers = same-origin only
        CorsLayer::new()
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    };

    let csp_value = HeaderValue::from_static(
        "default-src 'self'; script-src 'self'; style-src 'self' 'unsafe-inline'; img-src 'self' data:; connect-src 'self'; frame-ancestors 'none'",
    );

    let mut app = Router::new()
        .nest("/api", api_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        // Liveness stays reachable without credentials
        .route("/api/health", get(handlers::health))
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            csp_value,
        ));

    // Serve static files if directory provided
    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app
}

/// Start the server
pub async fn serve(
    db: Database,
    host: &str,
    port: u16,
    static_dir: Option<&str>,
) -> anyhow::Result<()> {
    serve_with_config(db, host, port, static_dir, ServerConfig::default()).await
}

/// Start the server with custom configuration
pub async fn serve_with_config(
    db: Database,
    host: &str,
    port: u16,
    static_dir: Option<&str>,
    config: ServerConfig,
) -> anyhow::Result<()> {
    if !config.require_auth {
        warn!("⚠️  Authentication disabled - do not expose to network!");
    }

    check_ai_connection().await;

    let app = create_router(db, static_dir, config);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Check and log AI backend connection status
async fn check_ai_connection() {
    match AIClient::from_env() {
        Some(client) => {
            if client.health_check().await {
                info!(
                    "✅ AI backend connected: {} (model: {})",
                    client.host(),
                    client.model()
                );
            } else {
                warn!(
                    "⚠️  AI backend configured but not responding: {} (model: {})",
                    client.host(),
                    client.model()
                );
            }
        }
        None => {
            info!("ℹ️  AI backend not configured (set GEMINI_API_KEY to enable insights)");
        }
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error carrying a classified failure
///
/// Serialized as `{error, message, statusCode, retryable, errors?}` where
/// `error` is the label of the failure kind.
#[derive(Debug)]
pub struct AppError {
    failure: AppFailure,
    errors: Option<ValidationErrors>,
    internal: Option<anyhow::Error>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody<'a> {
    error: &'a str,
    message: &'a str,
    status_code: u16,
    retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<&'a ValidationErrors>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        AppFailure::validation(msg).into()
    }

    pub fn not_found(msg: &str) -> Self {
        AppFailure::not_found(msg).into()
    }

    pub fn forbidden(msg: &str) -> Self {
        AppFailure::forbidden(msg).into()
    }

    pub fn internal(msg: &str) -> Self {
        AppFailure::internal(msg).into()
    }

    /// Field validation failure; the message is the first field error
    pub fn validation(errors: ValidationErrors) -> Self {
        let message = errors.first().unwrap_or("Invalid input").to_string();
        Self {
            failure: AppFailure::validation(message),
            errors: Some(errors),
            internal: None,
        }
    }

    pub fn failure(&self) -> &AppFailure {
        &self.failure
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(
                error = %err,
                kind = ?self.failure.kind,
                status = self.failure.status_code,
                "Request failed"
            );
        }

        let status = StatusCode::from_u16(self.failure.status_code)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let body = ErrorBody {
            error: self.failure.kind.label(),
            message: &self.failure.message,
            status_code: status.as_u16(),
            retryable: self.failure.retryable,
            errors: self.errors.as_ref(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<AppFailure> for AppError {
    fn from(failure: AppFailure) -> Self {
        Self {
            failure,
            errors: None,
            internal: None,
        }
    }
}

impl From<tally_core::Error> for AppError {
    fn from(err: tally_core::Error) -> Self {
        let mut failure = err.classify();

        // Raw storage messages stay in the logs
        if failure.kind == ErrorKind::Database && !failure.retryable {
            failure.message = "Database operation failed".to_string();
        }

        Self {
            failure,
            errors: None,
            internal: Some(anyhow::Error::new(err)),
        }
    }
}

#[cfg(test)]
mod tests;

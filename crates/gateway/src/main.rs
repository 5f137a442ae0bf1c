//! Newsroom API Gateway
//!
//! The HTTP entry point for the newsroom backend.
//! Handles:
//! - Authentication and role checks
//! - The article review workflow
//! - Article, category, comment, and user CRUD
//! - Uploads and static serving of uploaded files
//! - Rate limiting and observability (logging, metrics, tracing)

mod handlers;
mod middleware;

use axum::{
    extract::{DefaultBodyLimit, FromRef},
    http::HeaderValue,
    routing::{delete, get, post, put},
    Router,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use newsroom_common::{
    config::AppConfig,
    db::{ArticleStore, DbPool, Repository, SeaOrmArticleStore},
    errors::AppError,
    metrics,
    projection::ArticleProjector,
    uploads::LocalUploadStore,
    workflow::WorkflowEngine,
    JwtManager,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Multipart framing overhead allowed on top of a file size limit
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub articles: Arc<dyn ArticleStore>,
    pub workflow: WorkflowEngine,
    pub projector: ArticleProjector,
    pub repo: Repository,
    pub jwt: Arc<JwtManager>,
    pub uploads: LocalUploadStore,
}

impl AppState {
    pub fn new(
        config: Arc<AppConfig>,
        pool: DbPool,
        articles: Arc<dyn ArticleStore>,
    ) -> Result<Self, AppError> {
        let secret = config
            .auth
            .jwt_secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::Configuration {
                message: "auth.jwt_secret must be set".to_string(),
            })?;

        Ok(Self {
            workflow: WorkflowEngine::new(articles.clone(), config.workflow.approval_policy()),
            projector: ArticleProjector::new(articles.clone()),
            repo: Repository::new(pool),
            jwt: Arc::new(JwtManager::new(secret, config.auth.jwt_expiration_secs)),
            uploads: LocalUploadStore::new(&config.uploads),
            articles,
            config,
        })
    }
}

impl FromRef<AppState> for Arc<JwtManager> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Arc::new(AppConfig::load()?);

    // Initialize tracing
    init_tracing(&config);

    info!("Starting Newsroom API Gateway v{}", newsroom_common::VERSION);

    // Initialize metrics
    if config.observability.metrics_port != 0 {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                metrics::LATENCY_BUCKETS,
            )?
            .install()?;
        info!("Prometheus exporter listening on {}", addr);
    }
    metrics::register_metrics();

    // Initialize database connection
    let db = DbPool::new(&config.database).await?;
    if config.database.auto_migrate {
        db.ensure_schema().await?;
    }

    let articles: Arc<dyn ArticleStore> = Arc::new(SeaOrmArticleStore::new(db.clone()));
    let state = AppState::new(config.clone(), db, articles)?;
    state.uploads.ensure_dirs().await?;

    info!(
        approval_policy = ?config.workflow.approval_policy(),
        upload_dir = %config.uploads.dir.display(),
        "Application state ready"
    );

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));

    if config.observability.json_logging {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    let config = state.config.clone();

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let media_limit = DefaultBodyLimit::max(config.uploads.max_media_bytes + MULTIPART_OVERHEAD);
    let profile_limit =
        DefaultBodyLimit::max(config.uploads.max_profile_bytes + MULTIPART_OVERHEAD);

    // API routes
    let api_routes = Router::new()
        // Health endpoints (no auth)
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))

        // Auth endpoints
        .route("/auth/signup", post(handlers::auth::signup))
        .route("/auth/login", post(handlers::auth::login))

        // Admin user management
        .route(
            "/auth/users",
            get(handlers::users::list_users)
                .post(handlers::users::create_user)
                .layer(profile_limit.clone()),
        )
        .route(
            "/auth/users/{id}",
            put(handlers::users::update_user)
                .delete(handlers::users::delete_user)
                .layer(profile_limit),
        )

        // Article endpoints
        .route(
            "/articles",
            get(handlers::articles::list_public).post(handlers::articles::create_article),
        )
        .route(
            "/articles/{id}",
            get(handlers::articles::get_article)
                .put(handlers::articles::update_article)
                .delete(handlers::articles::delete_article),
        )

        // Workflow endpoints
        .route("/workflow/articles", get(handlers::workflow::list_for_role))
        .route("/workflow/articles/{id}/submit", post(handlers::workflow::submit))
        .route("/workflow/articles/{id}/approve", post(handlers::workflow::approve))
        .route("/workflow/articles/{id}/reject", post(handlers::workflow::reject))
        .route("/workflow/articles/{id}/publish", post(handlers::workflow::publish))

        // Category endpoints
        .route(
            "/categories",
            get(handlers::categories::list_categories).post(handlers::categories::create_category),
        )
        .route(
            "/categories/{id}",
            put(handlers::categories::update_category)
                .delete(handlers::categories::delete_category),
        )

        // Comment endpoints
        .route(
            "/articles/{id}/comments",
            get(handlers::comments::list_comments).post(handlers::comments::create_comment),
        )
        .route("/comments/{id}", delete(handlers::comments::delete_comment))

        // Uploads
        .route("/uploads", post(handlers::uploads::upload_media).layer(media_limit));

    let limiter = middleware::rate_limit::create_rate_limiter(
        config.rate_limit.requests_per_second,
        config.rate_limit.burst,
    );
    let api_routes = if config.rate_limit.enabled {
        api_routes.layer(axum::middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit::rate_limit_middleware,
        ))
    } else {
        api_routes
    };

    // Compose the app
    Router::new()
        .nest("/api", api_routes)
        .nest_service(
            &config.uploads.public_prefix,
            ServeDir::new(&config.uploads.dir),
        )
        .layer(
            ServiceBuilder::new()
                .layer(request_id)
                .layer(TraceLayer::new_for_http())
                .layer(propagate_id)
                .layer(cors_layer(&config))
                .layer(TimeoutLayer::new(config.request_timeout()))
                .layer(axum::middleware::from_fn(middleware::track_metrics)),
        )
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use newsroom_common::db::memory::{article_fixture, MemoryArticleStore};
    use newsroom_common::db::models::{ArticleStatus, User, UserRole};
    use serde_json::Value;
    use tower::ServiceExt;

    fn test_state(store: Arc<MemoryArticleStore>) -> AppState {
        let mut config = AppConfig::default();
        config.auth.jwt_secret = Some("test-secret".to_string());
        config.rate_limit.enabled = false;
        config.uploads.dir = std::env::temp_dir().join("newsroom-gateway-tests");

        AppState::new(Arc::new(config), DbPool::disconnected(), store).unwrap()
    }

    fn seeded() -> (Router, AppState) {
        let store = Arc::new(MemoryArticleStore::with_articles([
            article_fixture(1, ArticleStatus::Draft, None),
            article_fixture(2, ArticleStatus::Approved, None),
            article_fixture(3, ArticleStatus::Published, None),
        ]));
        let state = test_state(store);
        (create_router(state.clone()), state)
    }

    fn token(state: &AppState, id: i64, role: UserRole) -> String {
        let user = User {
            id,
            name: "Test".to_string(),
            email: format!("user{}@example.com", id),
            password_hash: String::new(),
            role,
            profile_picture: None,
            created_at: chrono::Utc::now().into(),
        };
        state.jwt.generate_token(&user).unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn json_request(
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    fn post(uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
        json_request("POST", uri, token, body)
    }

    fn get(uri: &str, token: Option<&str>) -> Request<Body> {
        json_request("GET", uri, token, None)
    }

    const BOUNDARY: &str = "newsroom-test-boundary";

    fn multipart(method: &str, uri: &str, token: &str, fields: &[(&str, &str)]) -> Request<Body> {
        let mut body = String::new();
        for (name, value) in fields {
            body.push_str(&format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            ));
        }
        body.push_str(&format!("--{}--\r\n", BOUNDARY));

        Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {}", token))
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = seeded();
        let (status, body) = send(&app, get("/api/health", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_ready_reports_database_down() {
        let (app, _) = seeded();
        let (status, body) = send(&app, get("/api/ready", None)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["checks"]["database"]["status"], "down");
    }

    #[tokio::test]
    async fn test_workflow_requires_token() {
        let (app, _) = seeded();
        let (status, body) = send(&app, get("/api/workflow/articles", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");

        let (status, _) = send(&app, get("/api/workflow/articles", Some("garbage"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_submit_route() {
        let (app, state) = seeded();
        let editor = token(&state, 10, UserRole::Editor);

        let submit = post("/api/workflow/articles/1/submit", Some(&editor), None);
        let (status, body) = send(&app, submit).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "pending_admin_review");
        assert_eq!(body["current_reviewer_role"], "admin");

        let (status, body) = send(&app, get("/api/workflow/articles", Some(&editor))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn test_publish_route_statuses() {
        let (app, state) = seeded();
        let editor = token(&state, 10, UserRole::Editor);
        let super_admin = token(&state, 1, UserRole::SuperAdmin);
        let approved = "/api/workflow/articles/2/publish";
        let draft = "/api/workflow/articles/1/publish";

        let (status, _) = send(&app, post(approved, Some(&editor), None)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(&app, post(draft, Some(&super_admin), None)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "NOT_APPLICABLE");

        let (status, body) = send(&app, post(approved, Some(&super_admin), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "published");
    }

    #[tokio::test]
    async fn test_reject_route_requires_reason() {
        let (app, state) = seeded();
        let admin = token(&state, 20, UserRole::Admin);

        let request = post(
            "/api/workflow/articles/1/reject",
            Some(&admin),
            Some(serde_json::json!({ "reason": "  " })),
        );
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["field"], "reason");
    }

    #[tokio::test]
    async fn test_public_listing_clamps_paging() {
        let (app, _) = seeded();
        let (status, body) = send(&app, get("/api/articles?page=0&limit=200", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["page"], 1);
        assert_eq!(body["limit"], 100);
        assert_eq!(body["totalItems"], 3);
        assert_eq!(body["hasMore"], false);
        assert_eq!(body["articles"][0]["id"], 3);
    }

    #[tokio::test]
    async fn test_public_listing_huge_page_is_empty() {
        let (app, _) = seeded();
        let uri = format!("/api/articles?page={}&limit=100", i64::MAX);
        let (status, body) = send(&app, get(&uri, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["articles"], serde_json::json!([]));
        assert_eq!(body["totalItems"], 3);
        assert_eq!(body["hasMore"], false);
    }

    #[tokio::test]
    async fn test_article_lookup_and_create() {
        let (app, state) = seeded();

        let (status, _) = send(&app, get("/api/articles/99", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let payload = serde_json::json!({ "title": "Flood warning", "section": "news" });
        let viewer = token(&state, 40, UserRole::Viewer);
        let create = post("/api/articles", Some(&viewer), Some(payload.clone()));
        let (status, _) = send(&app, create).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let editor = token(&state, 10, UserRole::Editor);
        let (status, body) = send(&app, post("/api/articles", Some(&editor), Some(payload))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"], "draft");
        assert_eq!(body["page"], "Home");
        assert_eq!(body["subLinks"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_article_crud_cannot_set_live_flag() {
        let (app, state) = seeded();
        let editor = token(&state, 10, UserRole::Editor);

        let payload = serde_json::json!({
            "title": "Unreviewed",
            "section": "news",
            "is_live": true,
        });
        let (status, body) = send(&app, post("/api/articles", Some(&editor), Some(payload))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["is_live"], false);
        let created = body["id"].clone();

        let (_, listing) = send(&app, get("/api/articles", None)).await;
        assert_eq!(listing["articles"][0]["id"], 3);
        assert_ne!(listing["articles"][0]["id"], created);

        let live_only = serde_json::json!({ "is_live": true });
        let update = json_request("PUT", "/api/articles/1", Some(&editor), Some(live_only));
        let (status, _) = send(&app, update).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let retitle = serde_json::json!({ "title": "Retitled", "is_live": true });
        let update = json_request("PUT", "/api/articles/1", Some(&editor), Some(retitle));
        let (status, body) = send(&app, update).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "Retitled");
        assert_eq!(body["is_live"], false);
        assert_eq!(body["status"], "draft");
    }

    #[tokio::test]
    async fn test_admin_cannot_grant_staff_roles() {
        let (app, state) = seeded();
        let admin = token(&state, 20, UserRole::Admin);

        let fields = [
            ("name", "Eve"),
            ("email", "eve@example.com"),
            ("role", "super_admin"),
            ("password", "secret123"),
        ];
        let create = multipart("POST", "/api/auth/users", &admin, &fields);
        let (status, body) = send(&app, create).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "FORBIDDEN");

        let fields = [
            ("name", "Self"),
            ("email", "user20@example.com"),
            ("role", "super_admin"),
        ];
        let update = multipart("PUT", "/api/auth/users/20", &admin, &fields);
        let (status, _) = send(&app, update).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_super_admin_role_change_is_not_self_service() {
        let (app, state) = seeded();
        let super_admin = token(&state, 1, UserRole::SuperAdmin);

        let fields = [
            ("name", "Chief"),
            ("email", "user1@example.com"),
            ("role", "viewer"),
        ];
        let update = multipart("PUT", "/api/auth/users/1", &super_admin, &fields);
        let (status, _) = send(&app, update).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(
            &app,
            json_request("DELETE", "/api/auth/users/1", Some(&super_admin), None),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_comment_requests_are_checked_before_storage() {
        let (app, state) = seeded();

        let comment = serde_json::json!({ "author_name": "Reader", "body": "Nice piece" });
        let uri = "/api/articles/99/comments";
        let (status, _) = send(&app, post(uri, None, Some(comment))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let blank = serde_json::json!({
            "author_name": "Reader",
            "author_email": "not-an-email",
            "body": "",
        });
        let (status, body) = send(&app, post("/api/articles/1/comments", None, Some(blank))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

        let editor = token(&state, 10, UserRole::Editor);
        let delete = json_request("DELETE", "/api/comments/5", Some(&editor), None);
        let (status, _) = send(&app, delete).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_category_writes_are_validated() {
        let (app, state) = seeded();
        let editor = token(&state, 10, UserRole::Editor);
        let admin = token(&state, 20, UserRole::Admin);

        let sport = serde_json::json!({ "name": "Sport" });
        let (status, _) = send(&app, post("/api/categories", Some(&editor), Some(sport))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let blank = serde_json::json!({ "name": "   " });
        let (status, body) = send(&app, post("/api/categories", Some(&admin), Some(blank))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["field"], "name");

        let symbols = serde_json::json!({ "name": "!!!" });
        let (status, body) = send(&app, post("/api/categories", Some(&admin), Some(symbols))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["field"], "slug");
    }
}

//! Demo HTTP server.
//!
//! # Responsibilities
//! - Create the Axum router with the demo handlers
//! - Wire the per-request action middleware and request tracing
//! - Bind to a listener and shut down gracefully on Ctrl+C
//!
//! Handlers use a users collection and an articles index so every request
//! produces an action record with store and search stats.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::action::manager::LogManager;
use crate::clients::search::{self, MemorySearch, SearchError, SearchRequest, SearchType, Searchable};
use crate::clients::store::{self, Collection, Document, MemoryStore, StoreError};
use crate::config::ActionLogConfig;
use crate::http::middleware::action_log_middleware;
use crate::log::marker::{CodedError, ErrorCode, Failure, Severity};
use crate::log::LoggerFactory;

pub const USER_NOT_FOUND: &str = "USER_NOT_FOUND";
pub const ARTICLE_NOT_FOUND: &str = "ARTICLE_NOT_FOUND";
pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub email: String,
}

impl Document for User {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub body: String,
}

impl Searchable for Article {
    fn id(&self) -> &str {
        &self.id
    }

    fn text(&self) -> String {
        format!("{} {}", self.title, self.body)
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<LogManager>,
    pub users: Arc<Collection<User>>,
    pub articles: Arc<SearchType<Article>>,
}

impl AppState {
    /// Build the demo clients with loggers from `factory`.
    pub fn new(config: &ActionLogConfig, factory: &LoggerFactory) -> Self {
        Self {
            manager: factory.manager().clone(),
            users: Arc::new(Collection::with_logger(
                "users",
                MemoryStore::new("users"),
                &config.store,
                factory.get_logger(store::LOGGER_NAME),
            )),
            articles: Arc::new(SearchType::with_logger(
                "articles",
                MemorySearch::new(),
                &config.search,
                factory.get_logger(search::LOGGER_NAME),
            )),
        }
    }
}

/// Handler failure, rendered as JSON and classified for the action record.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    NotFound(CodedError),

    #[error(transparent)]
    BadRequest(CodedError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Search(#[from] SearchError),
}

impl ErrorCode for AppError {
    fn error_code(&self) -> Option<&str> {
        match self {
            AppError::NotFound(e) | AppError::BadRequest(e) => e.error_code(),
            AppError::Store(e) => e.error_code(),
            AppError::Search(e) => e.error_code(),
        }
    }

    fn severity(&self) -> Severity {
        match self {
            AppError::NotFound(e) | AppError::BadRequest(e) => e.severity(),
            AppError::Store(e) => e.severity(),
            AppError::Search(e) => e.severity(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    error_code: Option<String>,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Search(SearchError::InvalidRequest(_)) => StatusCode::BAD_REQUEST,
            AppError::Store(_) | AppError::Search(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let failure = Failure::classify(&self);
        let body = ErrorBody {
            error_code: failure.error_code.clone(),
            message: self.to_string(),
        };
        let mut response = (status, Json(body)).into_response();
        response.extensions_mut().insert(failure);
        response
    }
}

/// HTTP server for the demo application.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(state: AppState) -> Self {
        Self {
            router: build_router(state),
        }
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the router with all middleware layers.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/users", post(create_user))
        .route("/users/{id}", get(get_user))
        .route("/articles/search", get(search_articles))
        .route("/articles/{id}", put(put_article))
        .route_layer(middleware::from_fn_with_state(
            state.manager.clone(),
            action_log_middleware,
        ))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn health() -> &'static str {
    "OK"
}

async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<User>, AppError> {
    let user = state.users.get(&id)?.ok_or_else(|| {
        AppError::NotFound(CodedError::warn(
            USER_NOT_FOUND,
            format!("user not found, id={id}"),
        ))
    })?;
    Ok(Json(user))
}

#[derive(Debug, Deserialize)]
struct NewUser {
    name: String,
    email: String,
}

async fn create_user(
    State(state): State<AppState>,
    Json(new_user): Json<NewUser>,
) -> Result<(StatusCode, Json<User>), AppError> {
    if new_user.name.trim().is_empty() || !new_user.email.contains('@') {
        return Err(AppError::BadRequest(CodedError::warn(
            VALIDATION_ERROR,
            "name must not be empty and email must contain '@'",
        )));
    }
    let mut user = User {
        id: None,
        name: new_user.name,
        email: new_user.email,
    };
    let id = state.users.insert(user.clone())?;
    user.id = Some(id);
    Ok((StatusCode::CREATED, Json(user)))
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    q: String,
    #[serde(default)]
    skip: usize,
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct SearchResult {
    total: u64,
    hits: Vec<Article>,
}

async fn search_articles(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResult>, AppError> {
    let mut request = SearchRequest::new(params.q).skip(params.skip);
    if let Some(limit) = params.limit {
        request = request.limit(limit);
    }
    let response = state.articles.search(&request)?;
    Ok(Json(SearchResult {
        total: response.total,
        hits: response.hits,
    }))
}

#[derive(Debug, Deserialize)]
struct ArticleBody {
    title: String,
    body: String,
}

async fn put_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ArticleBody>,
) -> Result<Json<Article>, AppError> {
    let article = Article {
        id,
        title: body.title,
        body: body.body,
    };
    state.articles.index(article.clone())?;
    Ok(Json(article))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        return;
    }
    tracing::info!("Shutdown signal received");
}

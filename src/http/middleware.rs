//! Unit-of-work boundary for HTTP requests.
//!
//! # Responsibilities
//! - Open one action per request, named after the matched route
//! - Bind it to the request's task for the rest of the stack
//! - Classify the response and flush the action record
//!
//! # Design Decisions
//! - Applied with `route_layer` so `MatchedPath` is available and
//!   unmatched requests do not open actions
//! - A `Failure` response extension set by the handler wins over the status
//! - A request served inside an already bound action joins it instead of
//!   opening a nested one

use axum::{
    extract::{MatchedPath, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::action::manager::{LogManager, Outcome};
use crate::action::tracker;
use crate::log::marker::Failure;

/// Response header carrying the action id.
pub const X_ACTION_ID: &str = "x-action-id";

pub async fn action_log_middleware(
    State(manager): State<Arc<LogManager>>,
    request: Request,
    next: Next,
) -> Response {
    if tracker::current().is_some() {
        return next.run(request).await;
    }

    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let action = format!("{} {}", request.method(), route);

    // ends the action as a failure if the handler panics
    let guard = manager.guard(manager.start(&action));
    let mut response = match guard.handle().scope(next.run(request)).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(action = %action, error = %e, "Failed to bind request action");
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
    };

    let outcome = classify(&response);
    if let Ok(value) = HeaderValue::from_str(guard.handle().id()) {
        response.headers_mut().insert(X_ACTION_ID, value);
    }
    if let Err(e) = guard.finish(outcome) {
        tracing::warn!(action = %action, error = %e, "Failed to end request action");
    }
    response
}

fn classify(response: &Response) -> Outcome {
    if let Some(failure) = response.extensions().get::<Failure>() {
        return Outcome::Failure(failure.clone());
    }
    if response.status().is_server_error() {
        return Outcome::Failure(Failure::unclassified());
    }
    Outcome::Success
}

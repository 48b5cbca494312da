//! Shared request path of the domain services: retry once after session
//! recovery, unwrap the envelope, log failures.

use crate::session::SessionManager;
use serde::de::DeserializeOwned;
use std::future::Future;
use taskdesk_core::{Result, TaskdeskError};
use taskdesk_interaction::ApiResponse;

/// Sends a request and decodes its `data`.
pub(crate) async fn fetch<T, F, Fut>(
    session: &SessionManager,
    action: &'static str,
    send: F,
) -> Result<T>
where
    T: DeserializeOwned,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<ApiResponse>>,
{
    let result = session.with_reauth(send).await.and_then(ApiResponse::into_data);
    log_failure(action, result)
}

/// Sends a request whose response carries no data worth decoding.
pub(crate) async fn execute<F, Fut>(
    session: &SessionManager,
    action: &'static str,
    send: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<ApiResponse>>,
{
    let result = session
        .with_reauth(send)
        .await
        .and_then(|response| response.ensure_success());
    log_failure(action, result)
}

/// The signed-in user's id, or `Unauthorized` when nobody is signed in.
pub(crate) fn current_user_id(session: &SessionManager) -> Result<i64> {
    session
        .session()
        .user_id()
        .ok_or_else(|| TaskdeskError::unauthorized("Not signed in"))
}

fn log_failure<T>(action: &'static str, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        tracing::warn!(action, error = %e, "Request failed");
    }
    result
}

//! Request-scoped diagnostic context
//!
//! Binds the [`RequestData`] of the request being served to everything that
//! runs on its behalf, so a fault raised deep inside a handler can still name
//! the request that caused it. The value is visible across `.await` points
//! for the whole extent of [`run`]; nested scopes shadow and then restore the
//! outer value. Tokio does not carry task-locals into spawned tasks, so work
//! that logically descends from a request must be started with
//! [`spawn_in_context`].

use std::future::Future;
use tokio::task::JoinHandle;

use shared::RequestData;

tokio::task_local! {
    static REQUEST_CONTEXT: RequestData;
}

/// Run `fut` with `value` as the current context
pub async fn run<F>(value: RequestData, fut: F) -> F::Output
where
    F: Future,
{
    REQUEST_CONTEXT.scope(value, fut).await
}

/// Synchronous variant of [`run`]
pub fn run_sync<R>(value: RequestData, f: impl FnOnce() -> R) -> R {
    REQUEST_CONTEXT.sync_scope(value, f)
}

/// Owned copy of the current context, `None` outside any scope
pub fn current() -> Option<RequestData> {
    REQUEST_CONTEXT.try_with(|value| value.clone()).ok()
}

/// `tokio::spawn` that keeps the caller's context
pub fn spawn_in_context<F>(fut: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    match current() {
        Some(value) => tokio::spawn(REQUEST_CONTEXT.scope(value, fut)),
        None => tokio::spawn(fut),
    }
}

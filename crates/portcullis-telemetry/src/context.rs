//! Process span and per-request context.
//!
//! The request id and matched route live in a task-local scope so the remote
//! resolver can forward the id without it being threaded through every call.

use std::future::Future;
use std::sync::Arc;

use tracing::Span;
use tracing::span::EnteredSpan;

use crate::init::build_sha;

/// Keeps the process-level `gateway` span entered while alive.
pub struct GlobalContextGuard {
    _span: EnteredSpan,
}

impl GlobalContextGuard {
    /// Enter a `gateway` span tagged with `phase` and the build SHA.
    #[must_use]
    pub fn new(phase: impl Into<String>) -> Self {
        let phase = phase.into();
        let span = tracing::info_span!("gateway", phase = %phase, build_sha = %build_sha());
        Self {
            _span: span.entered(),
        }
    }
}

/// Record the topology on the active request span.
pub fn record_topology(topology: &str) {
    Span::current().record("topology", tracing::field::display(topology));
}

#[derive(Clone)]
struct RequestScope {
    request_id: Arc<str>,
    route: Arc<str>,
}

tokio::task_local! {
    static REQUEST_SCOPE: RequestScope;
}

fn in_scope<T>(read: impl FnOnce(&RequestScope) -> T) -> Option<T> {
    REQUEST_SCOPE.try_with(read).ok()
}

/// Request id of the request being served, if any.
#[must_use]
pub fn current_request_id() -> Option<String> {
    in_scope(|scope| scope.request_id.to_string()).filter(|id| !id.is_empty())
}

/// Route template of the request being served, if any.
#[must_use]
pub fn current_route() -> Option<String> {
    in_scope(|scope| scope.route.to_string())
}

/// Run `fut` with the request id and route visible to [`current_request_id`]
/// and [`current_route`].
pub async fn with_request_context<Fut, T>(
    request_id: impl Into<String>,
    route: impl Into<String>,
    fut: Fut,
) -> T
where
    Fut: Future<Output = T>,
{
    let scope = RequestScope {
        request_id: Arc::from(request_id.into()),
        route: Arc::from(route.into()),
    };
    REQUEST_SCOPE.scope(scope, fut).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_span_records_topology_without_panicking() {
        let guard = GlobalContextGuard::new("test");
        record_topology("sandbox");
        drop(guard);
    }

    #[tokio::test]
    async fn scope_is_visible_only_inside_the_future() {
        let route = "/gateway/{topology}/auth/api/v1/pre";
        let seen = with_request_context("req-42", route, async {
            (current_request_id(), current_route())
        })
        .await;
        assert_eq!(seen.0.as_deref(), Some("req-42"));
        assert_eq!(seen.1.as_deref(), Some(route));
        assert!(current_request_id().is_none());
        assert!(current_route().is_none());
    }

    #[tokio::test]
    async fn empty_request_id_reads_as_absent() {
        let id = with_request_context("", "/metrics", async { current_request_id() }).await;
        assert!(id.is_none());
    }
}

//! Request lifecycle hooks.
//!
//! # Responsibilities
//! - Two extension points per request: before the handler runs, and after
//!   the response is finalized
//! - Run every installed hook in registration order at each point
//! - Keep hook failures away from the request/response path
//!
//! # Design Decisions
//! - Hooks return when done; there is no continuation to call
//! - The completion point fires exactly once per request, through a guard
//!   that also fires (as `Aborted`) when the request future is dropped
//! - A response with a body completes once the body has been fully handed
//!   to the connection; dropping it earlier reports `Aborted`
//! - A panicking hook is caught, logged, and counted

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    body::{Body, BodyDataStream, Bytes, HttpBody},
    extract::State,
    http::{header, HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use futures_util::stream::Stream;

use crate::http::context::RequestContext;
use crate::observability::metrics;

/// How a request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseOutcome {
    /// A response was produced with this status.
    Completed(StatusCode),
    /// The request was dropped before a response was produced.
    Aborted,
}

impl ResponseOutcome {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ResponseOutcome::Completed(status) => Some(*status),
            ResponseOutcome::Aborted => None,
        }
    }
}

impl fmt::Display for ResponseOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseOutcome::Completed(status) => write!(f, "{}", status.as_u16()),
            ResponseOutcome::Aborted => f.write_str("aborted"),
        }
    }
}

/// A pair of callbacks run around every request.
pub trait RequestHook: Send + Sync + 'static {
    /// Short identifier used in logs and metrics.
    fn name(&self) -> &'static str;

    /// Runs before the handler.
    fn on_request(&self, _ctx: &mut RequestContext) {}

    /// Runs once the response is finalized, or the request was aborted.
    fn on_response(&self, _ctx: &RequestContext, _outcome: ResponseOutcome) {}
}

#[derive(Debug, Clone, Copy)]
enum HookPhase {
    BeforeHandler,
    AfterResponse,
}

impl HookPhase {
    fn as_str(self) -> &'static str {
        match self {
            HookPhase::BeforeHandler => "before_handler",
            HookPhase::AfterResponse => "after_response",
        }
    }
}

/// Ordered set of installed hooks.
#[derive(Default)]
pub struct HookPipeline {
    hooks: Vec<Arc<dyn RequestHook>>,
    failures: AtomicU64,
}

impl HookPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a hook; hooks run in the order they were added.
    pub fn with_hook<H: RequestHook>(mut self, hook: H) -> Self {
        self.hooks.push(Arc::new(hook));
        self
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.hooks.iter().map(|h| h.name()).collect()
    }

    /// Hook invocations that panicked and were swallowed.
    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn before_handler(&self, ctx: &mut RequestContext) {
        for hook in &self.hooks {
            self.guarded(hook.as_ref(), HookPhase::BeforeHandler, || hook.on_request(ctx));
        }
    }

    pub fn after_response(&self, ctx: &RequestContext, outcome: ResponseOutcome) {
        for hook in &self.hooks {
            self.guarded(hook.as_ref(), HookPhase::AfterResponse, || {
                hook.on_response(ctx, outcome)
            });
        }
    }

    fn guarded(&self, hook: &dyn RequestHook, phase: HookPhase, f: impl FnOnce()) {
        if catch_unwind(AssertUnwindSafe(f)).is_err() {
            self.failures.fetch_add(1, Ordering::Relaxed);
            metrics::record_hook_failure(hook.name(), phase.as_str());
            tracing::warn!(hook = hook.name(), phase = phase.as_str(), "Request hook failed, continuing");
        }
    }

    /// Run the before-handler hooks and arm the completion guard.
    pub fn start(self: &Arc<Self>, mut ctx: RequestContext) -> CompletionGuard {
        self.before_handler(&mut ctx);
        CompletionGuard {
            pipeline: Arc::clone(self),
            ctx: Some(ctx),
        }
    }
}

impl fmt::Debug for HookPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookPipeline")
            .field("hooks", &self.names())
            .field("failures", &self.failure_count())
            .finish()
    }
}

/// Fires the after-response hooks exactly once.
///
/// `complete` fires them with the response status; dropping the guard
/// without completing fires them with `Aborted`.
pub struct CompletionGuard {
    pipeline: Arc<HookPipeline>,
    ctx: Option<RequestContext>,
}

impl CompletionGuard {
    pub fn complete(mut self, status: StatusCode) {
        if let Some(ctx) = self.ctx.take() {
            self.pipeline
                .after_response(&ctx, ResponseOutcome::Completed(status));
        }
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }
        if let Some(ctx) = self.ctx.take() {
            self.pipeline.after_response(&ctx, ResponseOutcome::Aborted);
        }
    }
}

/// Axum middleware running the pipeline around the rest of the stack.
pub async fn hook_middleware(
    State(pipeline): State<Arc<HookPipeline>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let head = req.method() == Method::HEAD;
    let guard = pipeline.start(RequestContext::from_request(&req));
    let response = next.run(req).await;
    let status = response.status();

    if head || !carries_body(status) || HttpBody::is_end_stream(response.body()) {
        guard.complete(status);
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let remaining = HttpBody::size_hint(&body).exact();
    if let Some(len) = remaining {
        // Streaming the body drops its size hint; keep the length on the wire.
        parts
            .headers
            .entry(header::CONTENT_LENGTH)
            .or_insert_with(|| HeaderValue::from(len));
    }

    let body = CompleteOnEnd {
        inner: body.into_data_stream(),
        guard: Some(guard),
        status,
        remaining,
    };
    Response::from_parts(parts, Body::from_stream(body))
}

fn carries_body(status: StatusCode) -> bool {
    !(status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED)
}

/// Response body that completes its guard after the last chunk.
///
/// The connection may stop polling once a known length has been written,
/// so a sized body completes when its byte count runs out rather than
/// waiting for end of stream.
struct CompleteOnEnd {
    inner: BodyDataStream,
    guard: Option<CompletionGuard>,
    status: StatusCode,
    remaining: Option<u64>,
}

impl CompleteOnEnd {
    fn complete(&mut self) {
        if let Some(guard) = self.guard.take() {
            guard.complete(self.status);
        }
    }
}

impl Stream for CompleteOnEnd {
    type Item = Result<Bytes, axum::Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_next(cx);

        match &polled {
            Poll::Ready(Some(Ok(chunk))) => {
                if let Some(remaining) = this.remaining.as_mut() {
                    *remaining = remaining.saturating_sub(chunk.len() as u64);
                    if *remaining == 0 {
                        this.complete();
                    }
                }
            }
            // A failing body never finished; the dropped guard reports it.
            Poll::Ready(Some(Err(_))) => drop(this.guard.take()),
            Poll::Ready(None) => this.complete(),
            Poll::Pending => {}
        }

        polled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::routing::get;
    use axum::Router;
    use futures_util::stream::{self, StreamExt};
    use std::sync::Mutex;
    use tower::ServiceExt;

    #[derive(Default)]
    struct Recorder {
        events: Arc<Mutex<Vec<String>>>,
    }

    impl RequestHook for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        fn on_request(&self, ctx: &mut RequestContext) {
            self.events.lock().unwrap().push(format!("start {}", ctx.path()));
        }

        fn on_response(&self, ctx: &RequestContext, outcome: ResponseOutcome) {
            self.events
                .lock()
                .unwrap()
                .push(format!("end {} {}", ctx.path(), outcome));
        }
    }

    struct Panicky;

    impl RequestHook for Panicky {
        fn name(&self) -> &'static str {
            "panicky"
        }

        fn on_request(&self, _ctx: &mut RequestContext) {
            panic!("boom");
        }

        fn on_response(&self, _ctx: &RequestContext, _outcome: ResponseOutcome) {
            panic!("boom");
        }
    }

    fn ctx(path: &str) -> RequestContext {
        RequestContext::new("req", Method::GET, path)
    }

    #[test]
    fn completion_fires_once_with_status() {
        let recorder = Recorder::default();
        let events = recorder.events.clone();
        let pipeline = Arc::new(HookPipeline::new().with_hook(recorder));

        let guard = pipeline.start(ctx("/a"));
        guard.complete(StatusCode::NOT_FOUND);

        assert_eq!(*events.lock().unwrap(), vec!["start /a", "end /a 404"]);
    }

    #[test]
    fn dropped_guard_reports_aborted() {
        let recorder = Recorder::default();
        let events = recorder.events.clone();
        let pipeline = Arc::new(HookPipeline::new().with_hook(recorder));

        drop(pipeline.start(ctx("/gone")));

        assert_eq!(*events.lock().unwrap(), vec!["start /gone", "end /gone aborted"]);
    }

    #[test]
    fn panicking_hook_is_swallowed_and_counted() {
        let recorder = Recorder::default();
        let events = recorder.events.clone();
        let pipeline = Arc::new(HookPipeline::new().with_hook(Panicky).with_hook(recorder));

        pipeline.start(ctx("/p")).complete(StatusCode::OK);

        assert_eq!(pipeline.failure_count(), 2);
        assert_eq!(events.lock().unwrap().len(), 2, "later hooks still run");
    }

    #[test]
    fn hooks_keep_registration_order() {
        let pipeline = HookPipeline::new().with_hook(Panicky).with_hook(Recorder::default());
        assert_eq!(pipeline.names(), vec!["panicky", "recorder"]);
        assert_eq!(pipeline.len(), 2);
    }

    #[test]
    fn outcome_display() {
        assert_eq!(ResponseOutcome::Completed(StatusCode::OK).to_string(), "200");
        assert_eq!(ResponseOutcome::Aborted.to_string(), "aborted");
        assert_eq!(ResponseOutcome::Aborted.status(), None);
    }

    fn recorded_app(routes: Router) -> (Router, Arc<Mutex<Vec<String>>>) {
        let recorder = Recorder::default();
        let events = recorder.events.clone();
        let pipeline = Arc::new(HookPipeline::new().with_hook(recorder));
        let app = routes.layer(axum::middleware::from_fn_with_state(pipeline, hook_middleware));
        (app, events)
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn streamed_body_completes_after_last_chunk() {
        let routes = Router::new().route(
            "/stream",
            get(|| async { Body::from_stream(stream::iter(["a", "b"].map(Ok::<_, std::io::Error>))) }),
        );
        let (app, events) = recorded_app(routes);

        let resp = app.oneshot(get_request("/stream")).await.unwrap();
        assert_eq!(*events.lock().unwrap(), vec!["start /stream"]);

        let body = to_bytes(resp.into_body(), 64).await.unwrap();
        assert_eq!(&body[..], b"ab");
        assert_eq!(*events.lock().unwrap(), vec!["start /stream", "end /stream 200"]);
    }

    #[tokio::test]
    async fn body_dropped_mid_stream_reports_aborted() {
        let routes = Router::new().route(
            "/stalled",
            get(|| async {
                let first = stream::iter([Ok::<_, std::io::Error>("partial")]);
                Body::from_stream(first.chain(stream::pending()))
            }),
        );
        let (app, events) = recorded_app(routes);

        let resp = app.oneshot(get_request("/stalled")).await.unwrap();
        let mut body = resp.into_body().into_data_stream();
        let chunk = body.next().await.unwrap().unwrap();
        assert_eq!(&chunk[..], b"partial");
        drop(body);

        assert_eq!(*events.lock().unwrap(), vec!["start /stalled", "end /stalled aborted"]);
    }

    #[tokio::test]
    async fn sized_body_keeps_its_length() {
        let routes = Router::new().route("/hello", get(|| async { "hello" }));
        let (app, events) = recorded_app(routes);

        let resp = app.oneshot(get_request("/hello")).await.unwrap();
        assert_eq!(resp.headers()[header::CONTENT_LENGTH], "5");

        let body = to_bytes(resp.into_body(), 64).await.unwrap();
        assert_eq!(&body[..], b"hello");
        assert_eq!(*events.lock().unwrap(), vec!["start /hello", "end /hello 200"]);
    }

    #[tokio::test]
    async fn empty_response_completes_immediately() {
        let routes = Router::new().route("/empty", get(|| async { StatusCode::NO_CONTENT }));
        let (app, events) = recorded_app(routes);

        let resp = app.oneshot(get_request("/empty")).await.unwrap();

        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(*events.lock().unwrap(), vec!["start /empty", "end /empty 204"]);
    }
}

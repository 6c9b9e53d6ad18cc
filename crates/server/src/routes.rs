//! HTTP routes backed by the caches.
//!
//! - `GET /{file}`: `1234-2020` redirects to the canonical page, `1234-2020.json`
//!   returns the assembled detail
//! - `GET /data/{path}`: proxies the snapshot file `build/{path}`
//! - `GET /robots.txt`

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::{
        HeaderValue, Request, StatusCode,
        header::{CACHE_CONTROL, CONTENT_TYPE, EXPIRES, LOCATION},
    },
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Utc;
use tokio_util::sync::DropGuard;
use tracing::Instrument;

use civic_core::config::AppConfig;
use civic_core::{CacheService, Error, RequestScope};

use crate::error::HttpError;

const REDIRECT_TTL: Duration = Duration::from_secs(60 * 60);
const DETAIL_TTL: Duration = Duration::from_secs(60 * 60);
const DATA_TTL: Duration = Duration::from_secs(15 * 60);
const SEARCH_INDEX_TTL: Duration = Duration::from_secs(24 * 60 * 60);
const MISSING_DATA_TTL: Duration = Duration::from_secs(10 * 60);
const ROBOTS_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

const ROBOTS_TXT: &str = "# robots welcome\n";

#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<CacheService>,
    /// Skip Cache-Control and Expires headers.
    pub dev_mode: bool,
    /// Deadline applied to each request's upstream work.
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(cache: Arc<CacheService>, config: &AppConfig) -> Self {
        Self { cache, dev_mode: config.dev_mode, request_timeout: config.timeout() }
    }

    /// Scope for one request. The returned guard cancels it when dropped,
    /// which includes the handler future being dropped on disconnect.
    fn scope(&self) -> (RequestScope, DropGuard) {
        let scope = RequestScope::with_timeout(self.request_timeout);
        let guard = scope.token().clone().drop_guard();
        (scope, guard)
    }

    fn expire_headers(&self, response: &mut Response, ttl: Duration) {
        if self.dev_mode {
            return;
        }
        let expires = Utc::now() + chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::zero());
        let headers = response.headers_mut();
        if let Ok(value) = HeaderValue::from_str(&format!("public, max-age={}", ttl.as_secs())) {
            headers.insert(CACHE_CONTROL, value);
        }
        if let Ok(value) = HeaderValue::from_str(&expires.format("%a, %d %b %Y %H:%M:%S GMT").to_string()) {
            headers.insert(EXPIRES, value);
        }
    }
}

pub fn build_router(state: AppState, log_requests: bool) -> Router {
    let router = Router::new()
        .route("/robots.txt", get(robots_txt))
        .route("/data/{path}", get(proxy_json))
        .route("/{file}", get(file_route))
        .with_state(state);

    if log_requests { router.layer(middleware::from_fn(log_responses)) } else { router }
}

async fn file_route(State(state): State<AppState>, Path(file): Path<String>) -> Response {
    match file.strip_suffix(".json") {
        Some(segment) => bill_detail(&state, segment).await,
        None => bill_redirect(&state, &file).await,
    }
}

async fn bill_redirect(state: &AppState, segment: &str) -> Response {
    let (scope, _guard) = state.scope();
    match state.cache.redirects.resolve_path(segment, &scope).await {
        Ok(url) => {
            let mut response = StatusCode::FOUND.into_response();
            match HeaderValue::from_str(&url) {
                Ok(value) => response.headers_mut().insert(LOCATION, value),
                Err(_) => {
                    let err = Error::Decode(format!("canonical url is not a valid header: {url:?}"));
                    return HttpError::new("routes::redirect", err).into_response();
                }
            };
            state.expire_headers(&mut response, REDIRECT_TTL);
            response
        }
        Err(err) => HttpError::new("routes::redirect", err).into_response(),
    }
}

async fn bill_detail(state: &AppState, segment: &str) -> Response {
    let (scope, _guard) = state.scope();
    match state.cache.details.get_detail_path(segment, &scope).await {
        Ok(detail) => {
            let mut response = Json(detail.as_ref()).into_response();
            state.expire_headers(&mut response, DETAIL_TTL);
            response
        }
        Err(err) => HttpError::new("routes::detail", err).into_response(),
    }
}

async fn proxy_json(State(state): State<AppState>, Path(path): Path<String>) -> Response {
    if !path.ends_with(".json") || path.starts_with('.') || path.contains(['/', '\\']) {
        return HttpError::new("routes::data", Error::NotFound(path)).into_response();
    }

    let ttl = if path.starts_with("search_index_") { SEARCH_INDEX_TTL } else { DATA_TTL };
    let (scope, _guard) = state.scope();

    match state.cache.snapshots.get(&format!("build/{path}"), &scope).await {
        Ok(body) => {
            let mut response = Response::new(Body::from(body));
            response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            state.expire_headers(&mut response, ttl);
            response
        }
        Err(err) if err.is_not_found() => {
            let mut response = HttpError::new("routes::data", err).into_response();
            state.expire_headers(&mut response, MISSING_DATA_TTL);
            response
        }
        Err(err) => HttpError::new("routes::data", err).into_response(),
    }
}

async fn robots_txt(State(state): State<AppState>) -> Response {
    let mut response = ([(CONTENT_TYPE, "text/plain")], ROBOTS_TXT).into_response();
    state.expire_headers(&mut response, ROBOTS_TTL);
    response
}

async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let span = tracing::info_span!(
        target: "civic_mirror::http",
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        status = tracing::field::Empty,
        elapsed_ms = tracing::field::Empty,
    );
    let start = Instant::now();

    let response = next.run(request).instrument(span.clone()).await;

    span.record("status", response.status().as_u16());
    span.record("elapsed_ms", start.elapsed().as_millis() as u64);
    span.in_scope(|| tracing::info!(target: "civic_mirror::http", "request completed"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use axum::body::Bytes;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use civic_core::records::{
        Matter, MatterAttachment, MatterHistory, MatterSponsor, MatterText, MatterTextVersion, Vote,
    };
    use civic_core::{CacheSettings, MatterFilter, ObjectSource, RecordApi};

    #[derive(Default)]
    struct Objects {
        bodies: Mutex<HashMap<String, &'static str>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ObjectSource for Objects {
        async fn open_object(&self, key: &str) -> Result<Bytes, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.bodies.lock().unwrap().get(key) {
                Some(body) => Ok(Bytes::from_static(body.as_bytes())),
                None => Err(Error::NotFound(key.to_string())),
            }
        }

        fn describe(&self) -> String {
            "memory://test".to_string()
        }
    }

    #[derive(Default)]
    struct Records {
        lookups: AtomicUsize,
        fail_transport: bool,
    }

    #[async_trait]
    impl RecordApi for Records {
        async fn matters(&self, filter: &MatterFilter) -> Result<Vec<Matter>, Error> {
            if self.fail_transport {
                return Err(Error::Transport("connection refused".into()));
            }
            if filter.file != "Int 1234-2020" {
                return Ok(Vec::new());
            }
            Ok(vec![Matter {
                matter_id: 68917,
                matter_file: filter.file.clone(),
                matter_type_name: filter.type_name.clone(),
                matter_version: "A".into(),
                ..Default::default()
            }])
        }

        async fn matter_sponsors(&self, _matter_id: i64) -> Result<Vec<MatterSponsor>, Error> {
            Ok(vec![MatterSponsor {
                matter_sponsor_name_id: 1,
                matter_sponsor_name: "Jane Doe".into(),
                matter_sponsor_matter_version: "A".into(),
                ..Default::default()
            }])
        }

        async fn matter_histories(&self, _matter_id: i64) -> Result<Vec<MatterHistory>, Error> {
            Ok(Vec::new())
        }

        async fn event_votes(&self, _history_id: i64) -> Result<Vec<Vote>, Error> {
            Ok(Vec::new())
        }

        async fn matter_attachments(&self, _matter_id: i64) -> Result<Vec<MatterAttachment>, Error> {
            Ok(Vec::new())
        }

        async fn matter_text_versions(&self, _matter_id: i64) -> Result<Vec<MatterTextVersion>, Error> {
            Ok(Vec::new())
        }

        async fn matter_text(&self, _matter_id: i64, _text_id: i64) -> Result<MatterText, Error> {
            Ok(MatterText::default())
        }

        async fn resolve_canonical_url(&self, matter_id: i64) -> Result<String, Error> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Ok(format!("https://legistar.example/LegislationDetail.aspx?ID={matter_id}"))
        }
    }

    struct Harness {
        objects: Arc<Objects>,
        records: Arc<Records>,
        router: Router,
    }

    fn harness(records: Records, dev_mode: bool) -> Harness {
        let objects = Arc::new(Objects::default());
        objects.bodies.lock().unwrap().insert("build/people_all.json".into(), "[1,2]");
        objects.bodies.lock().unwrap().insert("build/search_index_2024-2025.json".into(), "{}");
        let records = Arc::new(records);

        let cache = Arc::new(CacheService::new(objects.clone(), records.clone(), CacheSettings::default()));
        let state = AppState { cache, dev_mode, request_timeout: Duration::from_secs(5) };
        Harness { objects, records, router: build_router(state, true) }
    }

    async fn get(router: &Router, uri: &str) -> Response {
        router.clone().oneshot(Request::get(uri).body(Body::empty()).unwrap()).await.unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_redirect_is_memoized() {
        let h = harness(Records::default(), false);

        let response = get(&h.router, "/1234-2020").await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(LOCATION).unwrap(),
            "https://legistar.example/LegislationDetail.aspx?ID=68917"
        );
        assert_eq!(response.headers().get(CACHE_CONTROL).unwrap(), "public, max-age=3600");
        assert!(response.headers().get(EXPIRES).unwrap().to_str().unwrap().ends_with(" GMT"));

        let response = get(&h.router, "/1234-2020").await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(h.records.lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_and_invalid_files_are_not_found() {
        let h = harness(Records::default(), false);

        assert_eq!(get(&h.router, "/0001-2020").await.status(), StatusCode::NOT_FOUND);
        assert_eq!(get(&h.router, "/9999-2020").await.status(), StatusCode::NOT_FOUND);
        assert_eq!(get(&h.router, "/about").await.status(), StatusCode::NOT_FOUND);
        assert_eq!(get(&h.router, "/1234-2020.xml").await.status(), StatusCode::NOT_FOUND);
        assert_eq!(h.records.lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_detail_json() {
        let h = harness(Records::default(), false);

        let response = get(&h.router, "/1234-2020.json").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(response.headers().get(CACHE_CONTROL).unwrap(), "public, max-age=3600");

        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["ID"], 68917);
        assert_eq!(json["File"], "Int 1234-2020");
        assert_eq!(json["Sponsors"][0]["FullName"], "Jane Doe");
    }

    #[tokio::test]
    async fn test_upstream_failure_is_server_error() {
        let h = harness(Records { fail_transport: true, ..Default::default() }, false);

        let response = get(&h.router, "/1234-2020.json").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_text(response).await, "unknown error");
    }

    #[tokio::test]
    async fn test_proxy_json() {
        let h = harness(Records::default(), false);

        let response = get(&h.router, "/data/people_all.json").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(response.headers().get(CACHE_CONTROL).unwrap(), "public, max-age=900");
        assert_eq!(body_text(response).await, "[1,2]");

        get(&h.router, "/data/people_all.json").await;
        assert_eq!(h.objects.calls.load(Ordering::SeqCst), 1);

        let response = get(&h.router, "/data/search_index_2024-2025.json").await;
        assert_eq!(response.headers().get(CACHE_CONTROL).unwrap(), "public, max-age=86400");
    }

    #[tokio::test]
    async fn test_proxy_json_missing_and_rejected() {
        let h = harness(Records::default(), false);

        let response = get(&h.router, "/data/legislation_2031.json").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers().get(CACHE_CONTROL).unwrap(), "public, max-age=600");

        assert_eq!(get(&h.router, "/data/people_all.txt").await.status(), StatusCode::NOT_FOUND);
        assert_eq!(get(&h.router, "/data/..%2Fsecret.json").await.status(), StatusCode::NOT_FOUND);
        assert_eq!(h.objects.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dev_mode_skips_cache_headers() {
        let h = harness(Records::default(), true);

        let response = get(&h.router, "/robots.txt").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(CACHE_CONTROL).is_none());
        assert!(response.headers().get(EXPIRES).is_none());
        assert_eq!(body_text(response).await, ROBOTS_TXT);
    }

    #[tokio::test]
    async fn test_robots_txt_cached_for_a_week() {
        let h = harness(Records::default(), false);

        let response = get(&h.router, "/robots.txt").await;
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "text/plain");
        assert_eq!(response.headers().get(CACHE_CONTROL).unwrap(), "public, max-age=604800");
    }

    struct SpanNames(Arc<Mutex<Vec<String>>>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for SpanNames {
        fn on_new_span(
            &self,
            attrs: &tracing::span::Attributes<'_>,
            _id: &tracing::span::Id,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            self.0.lock().unwrap().push(attrs.metadata().name().to_string());
        }
    }

    #[tokio::test]
    async fn test_request_logging_opens_a_span_per_request() {
        use tracing_subscriber::layer::SubscriberExt;

        let names = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::registry().with(SpanNames(Arc::clone(&names)));
        let _guard = tracing::subscriber::set_default(subscriber);

        let h = harness(Records::default(), false);
        get(&h.router, "/robots.txt").await;
        get(&h.router, "/data/people_all.json").await;

        let requests = names.lock().unwrap().iter().filter(|name| *name == "request").count();
        assert_eq!(requests, 2);
    }
}

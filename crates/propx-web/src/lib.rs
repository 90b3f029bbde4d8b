//! Axum + Askama front end for the PropertyDetails extractor.

use std::sync::Arc;

use askama::Template;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use propx_search::{SearchConfig, SearchError, SearchPipeline, DEFAULT_MAX_PROPERTIES, DEMO_ADDRESS};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{info, warn};

pub const CRATE_NAME: &str = "propx-web";

const DEMO_PROPERTIES: usize = 3;

#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<SearchPipeline>,
}

impl AppState {
    pub fn new(pipeline: SearchPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }

    pub fn from_config(config: SearchConfig) -> Result<Self, SearchError> {
        Ok(Self::new(SearchPipeline::new(config)?))
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default = "default_max_properties")]
    pub max_properties: usize,
}

fn default_max_properties() -> usize {
    DEFAULT_MAX_PROPERTIES
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    schema_version: String,
    mode: String,
    demo_address: &'static str,
    default_max: usize,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/search", post(search_handler))
        .route("/api/health", get(health_handler))
        .route("/api/demo", get(demo_handler))
        .with_state(state)
}

pub async fn serve_from_env() -> anyhow::Result<()> {
    let config = SearchConfig::from_env();
    let port = config.web_port;
    let mode = config.mode;
    let state = AppState::from_config(config)?;
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, %mode, "listening");
    axum::serve(listener, app(state)).await?;
    Ok(())
}

async fn index_handler(State(state): State<AppState>) -> Response {
    let config = state.pipeline.config();
    render_html(IndexTemplate {
        schema_version: config.schema_version.to_string(),
        mode: config.mode.to_string(),
        demo_address: DEMO_ADDRESS,
        default_max: DEFAULT_MAX_PROPERTIES,
    })
}

async fn search_handler(
    State(state): State<AppState>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return json_error(StatusCode::BAD_REQUEST, rejection.body_text()),
    };
    let address = request.address.unwrap_or_default();
    match state.pipeline.run(&address, request.max_properties).await {
        Ok(outcome) => Json(outcome.envelope).into_response(),
        Err(err) => search_error(err),
    }
}

async fn health_handler(State(state): State<AppState>) -> Response {
    Json(json!({
        "status": "healthy",
        "version": state.pipeline.config().schema_version.as_str(),
        "timestamp": Utc::now().to_rfc3339(),
        "message": "PropertyDetails extractor is running",
    }))
    .into_response()
}

async fn demo_handler(State(state): State<AppState>) -> Response {
    match state.pipeline.run(DEMO_ADDRESS, DEMO_PROPERTIES).await {
        Ok(outcome) => {
            let found = outcome.envelope.summary.total_found;
            Json(json!({
                "status": "success",
                "message": format!("Demo search for {DEMO_ADDRESS} returned {found} properties"),
                "demo_results": outcome.envelope,
            }))
            .into_response()
        }
        Err(err) => search_error(err),
    }
}

fn search_error(err: SearchError) -> Response {
    let status = if err.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        warn!(error = %err, "search request failed");
        StatusCode::INTERNAL_SERVER_ERROR
    };
    json_error(status, err.to_string())
}

fn json_error(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn render_html<T: Template>(tpl: T) -> Response {
    match tpl.render() {
        Ok(html) => Html(html).into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html(format!("Server error: {}", err)),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};
    use http_body_util::BodyExt;
    use propx_search::SearchMode;
    use serde_json::Value;
    use tower::ServiceExt;

    fn sample_app(out: &std::path::Path) -> Router {
        let config = SearchConfig {
            mode: SearchMode::Sample,
            output_dir: out.to_path_buf(),
            item_delay_ms: 0,
            sample_seed: Some(11),
            ..SearchConfig::default()
        };
        app(AppState::from_config(config).unwrap())
    }

    fn post_search(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/search")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(resp: Response) -> Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn file_count(dir: &std::path::Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    #[tokio::test]
    async fn search_returns_paired_records_for_three_properties() {
        let out = tempfile::tempdir().unwrap();
        let resp = sample_app(out.path())
            .oneshot(post_search(
                r#"{"address": "7709 Palmbrook Dr, Tampa, FL 33615", "max_properties": 3}"#,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = json_body(resp).await;
        assert_eq!(body["summary"]["total_found"], 3);
        for (key, source) in [("zillow_properties", "Zillow"), ("reapi_properties", "REAPI")] {
            let records = body[key].as_array().unwrap();
            assert_eq!(records.len(), 3);
            for record in records {
                assert_eq!(record["PropertyDetails"]["meta_data"]["data_source"], source);
            }
        }
        assert_eq!(file_count(out.path()), 1);
    }

    #[tokio::test]
    async fn blank_or_missing_address_is_rejected_without_writing() {
        let out = tempfile::tempdir().unwrap();
        let app = sample_app(out.path());
        for body in [r#"{"max_properties": 3}"#, r#"{"address": "   "}"#, "not json"] {
            let resp = app.clone().oneshot(post_search(body)).await.unwrap();
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body: {body}");
            let json = json_body(resp).await;
            assert!(json["error"].is_string());
        }
        assert_eq!(file_count(out.path()), 0);
    }

    #[tokio::test]
    async fn missing_address_reports_required_message() {
        let out = tempfile::tempdir().unwrap();
        let resp = sample_app(out.path()).oneshot(post_search("{}")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(resp).await["error"], "Address is required");
    }

    #[tokio::test]
    async fn health_reports_schema_version() {
        let out = tempfile::tempdir().unwrap();
        let resp = sample_app(out.path())
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["version"], "v6.2");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn demo_runs_the_subject_address() {
        let out = tempfile::tempdir().unwrap();
        let resp = sample_app(out.path())
            .oneshot(Request::builder().uri("/api/demo").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["status"], "success");
        assert_eq!(body["demo_results"]["subject_address"], DEMO_ADDRESS);
        assert_eq!(body["demo_results"]["summary"]["total_found"], 3);
        assert_eq!(
            body["message"],
            format!("Demo search for {DEMO_ADDRESS} returned 3 properties")
        );
    }

    #[tokio::test]
    async fn demo_message_reports_the_fixture_count() {
        let out = tempfile::tempdir().unwrap();
        let workspace = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../..")
            .canonicalize()
            .unwrap();
        let config = SearchConfig {
            mode: SearchMode::Fixture,
            output_dir: out.path().to_path_buf(),
            workspace_root: workspace,
            item_delay_ms: 0,
            ..SearchConfig::default()
        };
        let resp = app(AppState::from_config(config).unwrap())
            .oneshot(Request::builder().uri("/api/demo").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        let found = body["demo_results"]["summary"]["total_found"].as_u64().unwrap();
        assert!(found <= 3);
        assert_eq!(
            body["message"],
            format!("Demo search for {DEMO_ADDRESS} returned {found} properties")
        );
    }

    #[tokio::test]
    async fn index_page_renders() {
        let out = tempfile::tempdir().unwrap();
        let resp = sample_app(out.path())
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("PropertyDetails Extractor"));
        assert!(text.contains("7709 Palmbrook Dr"));
    }
}

//! HTTP surface: a small demo site plus the `/data` answering endpoint.
//!
//! The server owns one loaded pipeline, handed in by the caller, and runs
//! every request through it. Inference is synchronous CPU work, so it runs
//! on the blocking pool while the pipeline is locked.

use axum::{
    body::Bytes,
    extract::State,
    http::{StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::pipeline::ExtractionPipeline;
use crate::sink;
use crate::types::Question;

const HOME_PAGE: &str = include_str!("home.html");

#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<Mutex<ExtractionPipeline>>,
}

impl AppState {
    pub fn new(pipeline: ExtractionPipeline) -> Self {
        Self {
            pipeline: Arc::new(Mutex::new(pipeline)),
        }
    }
}

#[derive(Debug, Serialize)]
struct DataResponse {
    output: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/about", get(about))
        .route("/data", post(answer_data))
        .fallback(missing_page)
        .layer(axum::middleware::from_fn(
            crate::middleware::allowed_hosts_middleware,
        ))
        .with_state(state)
}

/// Bind per `SQUADQA_HOST` and serve until shutdown.
pub async fn serve(pipeline: ExtractionPipeline) -> Result<()> {
    let state = AppState::new(pipeline);
    let app = router(state);

    let addr = crate::envconfig::Host::from_env().addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn home() -> impl IntoResponse {
    Html(HOME_PAGE)
}

async fn about() -> impl IntoResponse {
    "about page"
}

async fn missing_page(uri: Uri) -> Response {
    let name = uri.path().trim_start_matches('/');
    (
        StatusCode::NOT_FOUND,
        format!("The page named {} does not exist.", name),
    )
        .into_response()
}

async fn answer_data(State(state): State<AppState>, body: Bytes) -> Response {
    let (context, question) = match parse_body(&body) {
        Ok(fields) => fields,
        Err(msg) => return (StatusCode::BAD_REQUEST, msg).into_response(),
    };

    let pipeline = Arc::clone(&state.pipeline);
    let outcome = tokio::task::spawn_blocking(move || {
        let questions = vec![Question::new("0", question)];
        let mut pipeline = pipeline.lock();
        pipeline.run(&context, &questions)
    })
    .await;

    let results = match outcome {
        Ok(Ok(results)) => results,
        Ok(Err(e)) => return error_response(e),
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("inference task failed: {}", e),
            )
                .into_response()
        }
    };

    match results.into_iter().next() {
        Some(result) => Json(DataResponse {
            output: sink::api_answer_text(&result.answer),
        })
        .into_response(),
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "pipeline returned no result".to_string(),
        )
            .into_response(),
    }
}

/// Pull `context` and `question` out of the request body, accepting a JSON
/// object first and falling back to a urlencoded form.
fn parse_body(body: &Bytes) -> std::result::Result<(String, String), String> {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
        if value.is_object() {
            let context = value.get("context").and_then(|v| v.as_str());
            let question = value.get("question").and_then(|v| v.as_str());
            return match (context, question) {
                (Some(context), Some(question)) => {
                    Ok((context.to_string(), question.to_string()))
                }
                _ => Err("missing 'context' or 'question' field".to_string()),
            };
        }
    }

    let mut context = None;
    let mut question = None;
    for (key, value) in url::form_urlencoded::parse(body) {
        match key.as_ref() {
            "context" => context = Some(value.into_owned()),
            "question" => question = Some(value.into_owned()),
            _ => {}
        }
    }
    match (context, question) {
        (Some(context), Some(question)) => Ok((context, question)),
        _ => Err("missing 'context' or 'question' field".to_string()),
    }
}

fn error_response(e: Error) -> Response {
    let status = match e {
        Error::InvalidBatch(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, e.to_string()).into_response()
}

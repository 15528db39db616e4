//! Single-page web form for asking questions.
//!
//! `GET /` shows the form, `POST /` answers a submitted question and
//! `POST /api/ask` offers the same over JSON.

use crate::rag::Answerer;
use anyhow::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;

pub const DEFAULT_TITLE: &str = "Syville Designs PA";

#[derive(Clone)]
pub struct AppState {
    answerer: Arc<dyn Answerer>,
    title: Arc<str>,
}

impl AppState {
    pub fn new(answerer: Arc<dyn Answerer>, title: &str) -> Self {
        AppState {
            answerer,
            title: Arc::from(title),
        }
    }
}

#[derive(Deserialize)]
pub struct AskForm {
    #[serde(default)]
    pub question: String,
}

#[derive(Deserialize)]
pub struct AskRequest {
    pub question: String,
}

#[derive(Serialize)]
pub struct AskResponse {
    pub answer: String,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(show_form).post(submit_form))
        .route("/api/ask", post(ask_json))
        .with_state(state)
}

/// Bind `addr` and serve the form until the process is stopped
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Web form listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn show_form(State(state): State<AppState>) -> Html<String> {
    Html(render_page(&state.title, "", PageOutcome::Empty))
}

async fn submit_form(State(state): State<AppState>, Form(form): Form<AskForm>) -> Response {
    let question = form.question.trim();
    if question.is_empty() {
        let page = render_page(&state.title, "", PageOutcome::Error("Please enter a question."));
        return (StatusCode::BAD_REQUEST, Html(page)).into_response();
    }

    match state.answerer.answer(question).await {
        Ok(answer) => Html(render_page(&state.title, question, PageOutcome::Answer(&answer)))
            .into_response(),
        Err(e) => {
            error!("Failed to answer question: {:#}", e);
            let message = format!("{:#}", e);
            let page = render_page(&state.title, question, PageOutcome::Error(&message));
            (StatusCode::INTERNAL_SERVER_ERROR, Html(page)).into_response()
        }
    }
}

async fn ask_json(State(state): State<AppState>, Json(request): Json<AskRequest>) -> Response {
    let question = request.question.trim();
    if question.is_empty() {
        return error_json(StatusCode::BAD_REQUEST, "question must not be empty".to_string());
    }

    match state.answerer.answer(question).await {
        Ok(answer) => Json(AskResponse { answer }).into_response(),
        Err(e) => {
            error!("Failed to answer question: {:#}", e);
            error_json(StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e))
        }
    }
}

fn error_json(status: StatusCode, error: String) -> Response {
    (status, Json(ErrorResponse { error })).into_response()
}

enum PageOutcome<'a> {
    Empty,
    Answer(&'a str),
    Error(&'a str),
}

fn render_page(title: &str, question: &str, outcome: PageOutcome<'_>) -> String {
    let title = escape_html(title);
    let output = match outcome {
        PageOutcome::Empty => String::new(),
        PageOutcome::Answer(answer) => {
            format!("<pre class=\"answer\">{}</pre>", escape_html(answer))
        }
        PageOutcome::Error(message) => format!("<p class=\"error\">{}</p>", escape_html(message)),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
body {{ font-family: sans-serif; max-width: 48rem; margin: 2rem auto; }}
textarea {{ width: 100%; }}
.answer {{ white-space: pre-wrap; background: #f4f4f4; padding: 1rem; }}
.error {{ color: #b00020; }}
</style>
</head>
<body>
<h1>{title}</h1>
<form method="post" action="/">
<textarea name="question" rows="3">{question}</textarea>
<button type="submit">Submit</button>
</form>
{output}
</body>
</html>
"#,
        title = title,
        question = escape_html(question),
        output = output,
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use tower::ServiceExt;

    struct Echo;

    #[async_trait]
    impl Answerer for Echo {
        async fn answer(&self, question: &str) -> Result<String> {
            if question == "fail" {
                return Err(anyhow::anyhow!("store unavailable"));
            }
            Ok(format!("You asked <{}>", question))
        }
    }

    fn app() -> Router {
        router(AppState::new(Arc::new(Echo), DEFAULT_TITLE))
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn form_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_form_page_has_title_and_input() {
        let response = app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("<title>Syville Designs PA</title>"));
        assert!(body.contains("name=\"question\""));
    }

    #[tokio::test]
    async fn test_submitted_question_is_answered_and_escaped() {
        let response = app()
            .oneshot(form_request("question=opening+hours%3F"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("You asked &lt;opening hours?&gt;"));
    }

    #[tokio::test]
    async fn test_blank_question_is_bad_request() {
        let response = app().oneshot(form_request("question=++")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_answer_failure_renders_error() {
        let response = app().oneshot(form_request("question=fail")).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_text(response).await.contains("store unavailable"));
    }

    #[tokio::test]
    async fn test_json_endpoint() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/ask")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"question":"delivery"}"#))
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["answer"], "You asked <delivery>");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & Jerry's</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&#39;s&lt;/a&gt;"
        );
    }
}

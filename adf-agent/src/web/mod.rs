//! Browser dashboard
//!
//! Each browser session gets its own in-memory history, keyed by a random id in
//! the URL. A question holds the session's lock for the whole run, so one
//! session never has two queries in flight; other sessions are unaffected.
//! Only asking a question creates a session, and the map is capped at
//! [`DEFAULT_MAX_SESSIONS`] by dropping the least recently used idle one.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use axum::extract::{Form, Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::driver::SessionDriver;
use crate::history::SessionHistory;

pub mod render;

type SharedHistory = Arc<tokio::sync::Mutex<SessionHistory>>;

/// Sessions kept before the least recently used idle one is dropped
pub const DEFAULT_MAX_SESSIONS: usize = 256;

struct SessionSlot {
    history: SharedHistory,
    last_used: u64,
}

/// Live sessions; only asking a question creates one
struct Sessions {
    slots: HashMap<Uuid, SessionSlot>,
    clock: u64,
    max: usize,
}

impl Sessions {
    fn touch(&mut self, id: Uuid) -> Option<SharedHistory> {
        self.clock += 1;
        let clock = self.clock;
        self.slots.get_mut(&id).map(|slot| {
            slot.last_used = clock;
            slot.history.clone()
        })
    }

    /// Drop the least recently used session nobody is holding
    fn evict_one(&mut self) {
        let idle = self
            .slots
            .iter()
            .filter(|(_, slot)| Arc::strong_count(&slot.history) == 1)
            .min_by_key(|(_, slot)| slot.last_used)
            .map(|(id, _)| *id);
        if let Some(id) = idle {
            self.slots.remove(&id);
            info!(session = %id, "evicted idle session");
        }
    }
}

#[derive(Clone)]
pub struct WebState {
    driver: Arc<SessionDriver>,
    sessions: Arc<Mutex<Sessions>>,
}

impl WebState {
    pub fn new(driver: Arc<SessionDriver>) -> Self {
        Self::with_max_sessions(driver, DEFAULT_MAX_SESSIONS)
    }

    pub fn with_max_sessions(driver: Arc<SessionDriver>, max: usize) -> Self {
        Self {
            driver,
            sessions: Arc::new(Mutex::new(Sessions {
                slots: HashMap::new(),
                clock: 0,
                max: max.max(1),
            })),
        }
    }

    fn sessions(&self) -> std::sync::MutexGuard<'_, Sessions> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// An existing session's history; never creates one
    fn find(&self, id: Uuid) -> Option<SharedHistory> {
        self.sessions().touch(id)
    }

    /// The session's history, created (and the map trimmed) on first use
    fn open(&self, id: Uuid) -> SharedHistory {
        let mut sessions = self.sessions();
        if let Some(history) = sessions.touch(id) {
            return history;
        }
        if sessions.slots.len() >= sessions.max {
            sessions.evict_one();
        }
        let history = SharedHistory::default();
        let last_used = sessions.clock;
        sessions.slots.insert(
            id,
            SessionSlot {
                history: history.clone(),
                last_used,
            },
        );
        history
    }

    pub fn session_count(&self) -> usize {
        self.sessions().slots.len()
    }
}

#[derive(Debug, Deserialize)]
struct AskForm {
    #[serde(default)]
    question: String,
}

pub fn router(state: WebState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/sessions/{id}", get(show_session))
        .route("/sessions/{id}/ask", post(ask))
        .route("/sessions/{id}/clear", post(clear))
        .route("/sessions/{id}/latest.json", get(latest_json))
        .with_state(state)
}

pub async fn serve(listen: SocketAddr, driver: Arc<SessionDriver>) -> anyhow::Result<()> {
    let app = router(WebState::new(driver));
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .context("bind server listener failed")?;
    info!(%listen, "web dashboard listening");
    axum::serve(listener, app)
        .await
        .context("server terminated with error")
}

fn session_url(id: Uuid) -> String {
    format!("/sessions/{}", id)
}

async fn index() -> Redirect {
    Redirect::to(&session_url(Uuid::new_v4()))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn show_session(State(state): State<WebState>, Path(id): Path<Uuid>) -> Html<String> {
    let page = match state.find(id) {
        None => render::session_page(id, Some(&SessionHistory::new())),
        Some(session) => {
            let page = match session.try_lock() {
                Ok(history) => render::session_page(id, Some(&*history)),
                Err(_) => render::session_page(id, None),
            };
            page
        }
    };
    Html(page)
}

async fn ask(
    State(state): State<WebState>,
    Path(id): Path<Uuid>,
    Form(form): Form<AskForm>,
) -> Redirect {
    let question = form.question.trim();
    if !question.is_empty() {
        let session = state.open(id);
        let mut history = session.lock().await;
        info!(session = %id, query = %question, "running query");
        let result = state.driver.run_query(question).await;
        history.push(result);
    }
    Redirect::to(&session_url(id))
}

async fn clear(State(state): State<WebState>, Path(id): Path<Uuid>) -> Redirect {
    if let Some(session) = state.find(id) {
        session.lock().await.clear();
    }
    Redirect::to(&session_url(id))
}

async fn latest_json(State(state): State<WebState>, Path(id): Path<Uuid>) -> Response {
    let Some(session) = state.find(id) else {
        return no_results();
    };
    let Ok(history) = session.try_lock() else {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "error": "a query is running for this session" })),
        )
            .into_response();
    };
    match history.latest() {
        Some(result) => Json(result.clone()).into_response(),
        None => no_results(),
    }
}

fn no_results() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "no results for this session" })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use adf_agent_sdk::{AgentResult, RunStatus};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use tower::ServiceExt;

    use crate::bootstrap::build_driver;
    use crate::config::Settings;

    fn demo_state(max_sessions: usize) -> WebState {
        let settings = Settings::from_lookup(|_: &str| None, false).unwrap();
        let driver = build_driver(&settings, true).unwrap();
        WebState::with_max_sessions(Arc::new(driver), max_sessions)
    }

    fn app() -> Router {
        router(demo_state(DEFAULT_MAX_SESSIONS))
    }

    async fn body_text(resp: Response) -> String {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_form(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn root_redirects_to_a_fresh_session() {
        let resp = app().oneshot(get_req("/")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        let location = resp.headers()[header::LOCATION].to_str().unwrap();
        assert!(location.starts_with("/sessions/"));
        assert!(Uuid::parse_str(location.trim_start_matches("/sessions/")).is_ok());
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let resp = app().oneshot(get_req("/health")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_text(resp).await, r#"{"status":"ok"}"#);
    }

    #[tokio::test]
    async fn latest_is_404_until_a_question_is_asked() {
        let id = Uuid::new_v4();
        let resp = app()
            .oneshot(get_req(&format!("/sessions/{}/latest.json", id)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test(start_paused = true)]
    async fn ask_then_clear() {
        let app = app();
        let id = Uuid::new_v4();

        let resp = app
            .clone()
            .oneshot(post_form(
                &format!("/sessions/{}/ask", id),
                "question=why+did+CustomerETL+fail+with+an+error%3F",
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);

        let resp = app
            .clone()
            .oneshot(get_req(&format!("/sessions/{}/latest.json", id)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let result: AgentResult = serde_json::from_str(&body_text(resp).await).unwrap();
        assert_eq!(result.status, RunStatus::Completed);
        assert!(result.summary.contains("schema mismatch"));
        assert_eq!(result.query, "why did CustomerETL fail with an error?");

        let page = body_text(
            app.clone()
                .oneshot(get_req(&format!("/sessions/{}", id)))
                .await
                .unwrap(),
        )
        .await;
        assert!(page.contains("schema mismatch"));
        assert!(page.contains("adf_pipeline_activity_runs"));

        app.clone()
            .oneshot(post_form(&format!("/sessions/{}/clear", id), ""))
            .await
            .unwrap();
        let resp = app
            .oneshot(get_req(&format!("/sessions/{}/latest.json", id)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn blank_questions_are_ignored() {
        let app = app();
        let id = Uuid::new_v4();
        app.clone()
            .oneshot(post_form(&format!("/sessions/{}/ask", id), "question=+++"))
            .await
            .unwrap();
        let resp = app
            .oneshot(get_req(&format!("/sessions/{}/latest.json", id)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn reading_unknown_sessions_creates_nothing() {
        let state = demo_state(DEFAULT_MAX_SESSIONS);
        let app = router(state.clone());

        for _ in 0..20 {
            let id = Uuid::new_v4();
            let resp = app
                .clone()
                .oneshot(get_req(&format!("/sessions/{}/latest.json", id)))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::NOT_FOUND);

            let page = body_text(app.clone().oneshot(get_req(&session_url(id))).await.unwrap()).await;
            assert!(page.contains("No results yet."));

            app.clone()
                .oneshot(post_form(&format!("/sessions/{}/clear", id), ""))
                .await
                .unwrap();
            app.clone().oneshot(get_req("/")).await.unwrap();
        }

        assert_eq!(state.session_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn least_recently_used_session_is_evicted_at_the_cap() {
        let state = demo_state(2);
        let app = router(state.clone());
        let ids = [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];

        for id in &ids {
            app.clone()
                .oneshot(post_form(
                    &format!("/sessions/{}/ask", id),
                    "question=status+of+CustomerETL",
                ))
                .await
                .unwrap();
        }

        assert_eq!(state.session_count(), 2);
        let first = app
            .clone()
            .oneshot(get_req(&format!("/sessions/{}/latest.json", ids[0])))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::NOT_FOUND);
        let last = app
            .oneshot(get_req(&format!("/sessions/{}/latest.json", ids[2])))
            .await
            .unwrap();
        assert_eq!(last.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn latest_answers_conflict_while_a_query_runs() {
        let state = demo_state(DEFAULT_MAX_SESSIONS);
        let app = router(state.clone());
        let id = Uuid::new_v4();

        let session = state.open(id);
        let _running = session.lock().await;

        let resp = app
            .clone()
            .oneshot(get_req(&format!("/sessions/{}/latest.json", id)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let page = body_text(app.oneshot(get_req(&session_url(id))).await.unwrap()).await;
        assert!(page.contains("A query is running"));
    }
}

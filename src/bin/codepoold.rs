//! codepoold — the codepool HTTP front end.
//!
//! A thin layer over one [`CodeStore`]; every request maps onto a single
//! store operation:
//!
//! - `GET  /redeem?code=…` — redeem, then redirect to the rating form
//! - `GET  /rate?code=…` — rating form
//! - `POST /rate?code=…` — record a 1–5 score (form field `score`)
//! - `GET  /stats` — clicks, total and clickthrough
//! - `GET  /health` — server status
//!
//! Build and run: `cargo run --features server --bin codepoold`

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Form, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Json, Router};
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use serde::{Deserialize, Serialize};

use codepool::config::PoolConfig;
use codepool::error::StoreError;
use codepool::store::{CodeStore, StoreResult};

#[derive(Parser)]
#[command(name = "codepoold", version, about = "HTTP front end for a codepool")]
struct Args {
    /// TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Pool file (overrides the config file).
    #[arg(long)]
    pool: Option<PathBuf>,

    /// Listen address (overrides the config file).
    #[arg(long)]
    bind: Option<String>,
}

// ── Server state ──────────────────────────────────────────────────────────

#[derive(Clone)]
struct AppState {
    store: Arc<CodeStore>,
}

impl AppState {
    /// Run a store operation off the async runtime; it holds a std mutex
    /// around file I/O.
    async fn run<T, F>(&self, op: F) -> Result<StoreResult<T>, (StatusCode, String)>
    where
        T: Send + 'static,
        F: FnOnce(&CodeStore) -> StoreResult<T> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || op(&store))
            .await
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("store task failed: {e}")))
    }
}

// ── Request/response types ────────────────────────────────────────────────

#[derive(Deserialize)]
struct CodeQuery {
    #[serde(default)]
    code: String,
}

#[derive(Deserialize)]
struct ScoreForm {
    #[serde(default)]
    score: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Serialize)]
struct StatsResponse {
    total: usize,
    clicks: usize,
    clickthrough: Option<f64>,
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn redeem(
    State(state): State<AppState>,
    Query(CodeQuery { code }): Query<CodeQuery>,
) -> Result<Response, (StatusCode, String)> {
    tracing::info!(code = %code, "redeeming");
    let lookup = code.clone();
    match state.run(move |store| store.redeem(&lookup)).await? {
        Ok(outcome) if outcome.is_success() => {
            Ok(Redirect::to(&format!("/rate?code={code}")).into_response())
        }
        Ok(_) => Ok("code does not exist or has been redeemed already\n".into_response()),
        Err(e) => {
            tracing::error!(code = %code, "redeem failed: {e}");
            Err((StatusCode::INTERNAL_SERVER_ERROR, "failed to redeem\n".into()))
        }
    }
}

async fn rate_form(Query(CodeQuery { code }): Query<CodeQuery>) -> Html<String> {
    let code = escape_html(&code);
    Html(format!(
        "<!doctype html>\n\
         <html><body>\n\
         <h1>How realistic was it?</h1>\n\
         <form method=\"post\" action=\"/rate?code={code}\">\n\
         <label>Score (1 = not at all, 5 = completely)\n\
         <input type=\"number\" name=\"score\" min=\"1\" max=\"5\" required></label>\n\
         <button type=\"submit\">Submit</button>\n\
         </form>\n\
         </body></html>\n"
    ))
}

async fn rate_submit(
    State(state): State<AppState>,
    Query(CodeQuery { code }): Query<CodeQuery>,
    Form(form): Form<ScoreForm>,
) -> Result<&'static str, (StatusCode, String)> {
    let score = parse_score(&form.score).map_err(|msg| (StatusCode::BAD_REQUEST, msg.into()))?;

    tracing::info!(code = %code, score, "setting score");
    let lookup = code.clone();
    match state.run(move |store| store.set_score(&lookup, score)).await? {
        Ok(()) => Ok("success!\n"),
        Err(e @ StoreError::NotFound { .. }) => {
            tracing::warn!(code = %code, "{e}");
            Err((StatusCode::BAD_REQUEST, "error setting score\n".into()))
        }
        Err(e) => {
            tracing::error!(code = %code, "set score failed: {e}");
            Err((StatusCode::INTERNAL_SERVER_ERROR, "error setting score\n".into()))
        }
    }
}

async fn stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, (StatusCode, String)> {
    let pool = state
        .run(|store| store.snapshot())
        .await?
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("{e}")))?;
    Ok(Json(StatsResponse {
        total: pool.total,
        clicks: pool.clicks,
        clickthrough: pool.clickthrough(),
    }))
}

/// Validate a submitted score: an integer from 1 to 5.
fn parse_score(raw: &str) -> std::result::Result<i32, &'static str> {
    let score: i32 = raw.trim().parse().map_err(|_| "invalid score\n")?;
    if (1..=5).contains(&score) {
        Ok(score)
    } else {
        Err("score must be between 1 and 5 inclusive\n")
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn router(store: Arc<CodeStore>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/redeem", get(redeem))
        .route("/rate", get(rate_form).post(rate_submit))
        .route("/stats", get(stats))
        .with_state(AppState { store })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = PoolConfig::load_or_default(args.config.as_deref())?;
    if let Some(pool) = args.pool {
        config.path = pool;
    }
    if let Some(bind) = args.bind {
        config.bind = bind;
    }

    // Without a readable pool there is nothing to serve.
    let store = CodeStore::open_or_create(&config.path, config.total)?;
    let app = router(Arc::new(store));

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .into_diagnostic()?;
    tracing::info!(bind = %config.bind, pool = %config.path.display(), "codepoold listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let ctrl_c = tokio::signal::ctrl_c();
            #[cfg(unix)]
            {
                match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(mut sigterm) => {
                        tokio::select! {
                            _ = ctrl_c => {},
                            _ = sigterm.recv() => {},
                        }
                    }
                    Err(_) => {
                        ctrl_c.await.ok();
                    }
                }
            }
            #[cfg(not(unix))]
            {
                ctrl_c.await.ok();
            }
            tracing::info!("codepoold shutting down");
        })
        .await
        .into_diagnostic()?;

    Ok(())
}

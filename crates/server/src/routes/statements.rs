//! Statement PDF routes
//!
//! `GET /stmt/:id/:ym[/:password[/:flag]]` returns the cached PDF for an
//! account and month, rendering it first when needed. A `flag` of
//! `nocache` forces a fresh render.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
    routing::get,
    Router,
};
use statement::{
    CachedArtifact, Cancellation, KeyError, Period, RenderRequest, StatementKey,
};
use tracing::{info, warn};

use crate::error::{AppError, Result};
use crate::state::AppState;

const NO_CACHE_FLAG: &str = "nocache";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:id/:ym", get(by_period))
        .route("/:id/:ym/:password", get(with_password))
        .route("/:id/:ym/:password/:flag", get(with_flag))
}

async fn by_period(
    State(state): State<AppState>,
    Path((id, ym)): Path<(String, String)>,
) -> Result<Response> {
    serve(state, &id, &ym, None, None).await
}

async fn with_password(
    State(state): State<AppState>,
    Path((id, ym, password)): Path<(String, String, String)>,
) -> Result<Response> {
    serve(state, &id, &ym, Some(password), None).await
}

async fn with_flag(
    State(state): State<AppState>,
    Path((id, ym, password, flag)): Path<(String, String, String, String)>,
) -> Result<Response> {
    serve(state, &id, &ym, Some(password), Some(flag.as_str())).await
}

/// Reject account ids that could escape the statement directories
pub fn sanitize_account(id: &str) -> Result<&str> {
    let unsafe_id = id.is_empty()
        || id.contains(['/', '\\', '\0'])
        || id.contains("..");
    if unsafe_id {
        return Err(AppError::BadRequest(format!("invalid account id `{id}`")));
    }
    Ok(id)
}

async fn serve(
    state: AppState,
    id: &str,
    ym: &str,
    password: Option<String>,
    flag: Option<&str>,
) -> Result<Response> {
    let account = sanitize_account(id)?;
    let period: Period = ym
        .parse()
        .map_err(|e: KeyError| AppError::BadRequest(e.to_string()))?;

    let mut request = RenderRequest::new(StatementKey::new(account, period))
        .force_refresh(flag == Some(NO_CACHE_FLAG));
    if let Some(password) = password {
        request = request.with_password(password);
    }

    let artifact = render(&state, request).await?;
    let bytes = tokio::fs::read(&artifact.path).await.map_err(|e| {
        warn!(path = %artifact.path.display(), error = %e, "failed to read cached statement");
        AppError::Internal(format!("failed to read cached statement: {e}"))
    })?;
    info!(
        account,
        period = %period,
        state = ?artifact.state,
        bytes = bytes.len(),
        "serving statement"
    );

    let filename = artifact
        .path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(header::CONTENT_LENGTH, bytes.len())
        .header(
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{filename}\""),
        )
        .body(Body::from(bytes))
        .map_err(|e| AppError::Internal(e.to_string()))
}

/// Run the cache lookup on the blocking pool, cancelling it on timeout
async fn render(state: &AppState, request: RenderRequest) -> Result<CachedArtifact> {
    let cancel = Cancellation::new();
    let key = request.key.clone();
    let task = {
        let state = state.clone();
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || state.cache().fetch_with(&request, &cancel))
    };

    match tokio::time::timeout(state.render_timeout(), task).await {
        Ok(Ok(result)) => Ok(result?),
        Ok(Err(e)) => Err(AppError::Internal(format!("render task failed: {e}"))),
        Err(_) => {
            cancel.cancel();
            warn!(key = %key, timeout = ?state.render_timeout(), "render timed out");
            Err(AppError::Timeout)
        }
    }
}

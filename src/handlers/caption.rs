use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::media::MediaRequest;
use crate::pipeline::{CaptionFailure, CaptionOutcome};
use crate::state::AppState;

use super::UrlBody;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CaptionQuery {
    pub audio_only: bool,
    pub debug: bool,
}

/// `POST /caption?audio_only=&debug=`
///
/// Validates the URL before anything else, then runs the caption pipeline.
/// A malformed URL never reaches the provider, the downloader or the worker.
pub async fn create_caption(
    state: web::Data<AppState>,
    query: web::Query<CaptionQuery>,
    body: web::Json<UrlBody>,
) -> AppResult<HttpResponse> {
    let request = MediaRequest::new(body.url.as_deref(), query.audio_only, query.debug, false)?;
    debug!(url = %request.url(), "Caption request accepted");

    let _in_flight = state.track_caption();
    match state.pipeline.caption(&request).await {
        CaptionOutcome::Success(response) => Ok(HttpResponse::Ok().json(response)),
        CaptionOutcome::Failure(CaptionFailure { error, debug }) => {
            Err(AppError::pipeline(error, debug))
        }
    }
}

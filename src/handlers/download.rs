use actix_web::http::header;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::info;
use url::Url;

use crate::error::{AppError, AppResult};
use crate::media::MediaRequest;
use crate::state::AppState;

use super::UrlBody;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DownloadQuery {
    pub hq: bool,
}

/// `POST /download?hq=`
///
/// Resolves metadata and answers `302 Found` pointing at the selected media
/// URL. Bytes are never proxied through this service.
pub async fn redirect_to_media(
    state: web::Data<AppState>,
    query: web::Query<DownloadQuery>,
    body: web::Json<UrlBody>,
) -> AppResult<HttpResponse> {
    let request = MediaRequest::new(body.url.as_deref(), false, false, query.hq)?;
    let target = state.pipeline.download_url(&request).await?;

    // Providers hand back arbitrary strings; only absolute http(s) URLs go
    // into the Location header, and they go in unmodified.
    let usable = Url::parse(&target)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false);
    if !usable {
        return Err(AppError::Internal(format!(
            "provider returned an unusable media URL: {}",
            target
        )));
    }

    info!(url = %request.url(), hq = query.hq, "Redirecting to media");
    Ok(HttpResponse::Found()
        .insert_header((header::LOCATION, target))
        .finish())
}

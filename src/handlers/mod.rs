//! HTTP handlers and route table.

pub mod caption;
pub mod docs;
pub mod download;

use actix_web::error::{JsonPayloadError, QueryPayloadError};
use actix_web::{web, HttpRequest};
use serde::Deserialize;

use crate::error::AppError;
use crate::health;

/// Request body shared by `/caption` and `/download`.
///
/// `url` is optional here so a missing field surfaces as the same 400
/// "URL is required" as an empty one, instead of a generic JSON error.
#[derive(Debug, Default, Deserialize)]
pub struct UrlBody {
    pub url: Option<String>,
}

/// Register every route on the given service config.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .app_data(web::QueryConfig::default().error_handler(query_error))
        .route("/", web::get().to(docs::usage))
        .route("/caption", web::post().to(caption::create_caption))
        .route("/download", web::post().to(download::redirect_to_media))
        .route("/health", web::get().to(health::health_check))
        .route("/metrics", web::get().to(health::detailed_metrics));
}

fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::BadRequest(format!("Invalid request body: {}", err)).into()
}

fn query_error(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::BadRequest(format!("Invalid query string: {}", err)).into()
}

//! # Media Module
//!
//! Everything between a TikTok URL and the bytes handed to the worker:
//! request validation, provider-specific metadata extraction, variant
//! selection, download, and the on-disk content-address cache.

pub mod cache;
pub mod downloader;
pub mod providers;
pub mod resolver;
pub mod types;

pub use cache::MediaCache;
pub use downloader::{HttpDownloader, MediaDownloader};
pub use providers::{MetadataProvider, TikwmProvider, YtDlpProvider};
pub use resolver::{FetchedMedia, MediaResolver};
pub use types::{CandidateUrls, MediaKind, MediaMetadata, MediaRequest};

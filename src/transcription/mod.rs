//! # Transcription Module
//!
//! The speech-to-text engine runs as a separate worker service; this module
//! only knows how to hand it media and read back the caption.

pub mod worker;

pub use worker::{Transcriber, WorkerClient, DEFAULT_TRANSCRIPTION_TIMEOUT};

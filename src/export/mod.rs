//! # Export
//!
//! Writes a combined clip to disk through the external FFmpeg encoder.

pub mod encoder;

pub use encoder::{EncodedVideo, VideoEncoder};

//! # Music Video Combiner
//!
//! Merge a video file and an audio file into one music video. Both inputs are
//! trimmed to the shorter of the two durations, the video's own audio is
//! replaced, and the result is re-encoded with FFmpeg.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use music_video_combiner::{
//!     combine::{ConsoleReporter, MediaCombiner},
//!     config::Config,
//! };
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let combiner = MediaCombiner::new(Config::default(), Box::new(ConsoleReporter));
//! let report = combiner
//!     .combine("clip.mp4", "song.wav", "exports/music_video.mp4")
//!     .await?;
//!
//! println!("{:.2}s at {}x{}", report.duration, report.width, report.height);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`media`] - Video and audio handles, metadata probing, time windows
//! - [`export`] - FFmpeg encoding and muxing
//! - [`combine`] - The load, align, export pipeline
//! - [`cli`] - Argument parsing and input validation
//! - [`config`] - Configuration management

pub mod cli;
pub mod combine;
pub mod config;
pub mod error;
pub mod export;
pub mod media;

// Re-export commonly used types for convenience
pub use crate::{
    combine::{CombineReport, MediaCombiner},
    config::Config,
    error::{CombinerError, Result},
};

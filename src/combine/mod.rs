//! # Combine
//!
//! The load, align, export pipeline and the progress lines it reports.

pub mod engine;
pub mod progress;

pub use engine::{CombineReport, MediaCombiner};
pub use progress::{ConsoleReporter, ProgressReporter, SilentReporter, Stage};

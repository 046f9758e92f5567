//! # Media Sources
//!
//! Open handles on the two inputs of a combine run. Opening reads metadata
//! eagerly (ffprobe for video; hound, symphonia or ffprobe for audio) and
//! fails fast on files that cannot be decoded. Trimming narrows a
//! [`TimeWindow`] over the file and never rewrites it.

pub mod audio;
pub mod probe;
pub mod video;
pub mod window;

pub use audio::{AudioBackend, AudioMetadata, AudioSource};
pub use probe::{ProbeReport, ProbeStream};
pub use video::{SoundTrack, VideoMetadata, VideoSource};
pub use window::{common_duration, TimeWindow};

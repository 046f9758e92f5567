//! Command-line front end: argument parsing and input validation.

use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::info;

use crate::{
    combine::{CombineReport, ConsoleReporter, MediaCombiner, ProgressReporter, SilentReporter},
    config::Config,
    error::{CombinerError, InputKind, Result},
};

pub const DEFAULT_VIDEO: &str = "exports/simien_mountain_cinematic_view.mp4";
pub const DEFAULT_AUDIO: &str = "exports/ethio_jazz_instrumental.wav";
pub const DEFAULT_OUTPUT: &str = "exports/music_video_ethiopian_mountains.mp4";

#[derive(Parser, Debug, Clone)]
#[command(
    name = "music-video-combiner",
    version,
    about = "Combine video and audio into a music video",
    long_about = "Replaces the audio of a video with a separate audio file. Both are trimmed to the shorter of the two durations and the result is re-encoded as H.264/AAC."
)]
pub struct Cli {
    /// Path to video file
    #[arg(short, long, default_value = DEFAULT_VIDEO)]
    pub video: PathBuf,

    /// Path to audio file
    #[arg(short, long, default_value = DEFAULT_AUDIO)]
    pub audio: PathBuf,

    /// Path to output file
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,

    /// Configuration file (optional)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long)]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        if self.quiet {
            Box::new(SilentReporter)
        } else {
            Box::new(ConsoleReporter)
        }
    }

    /// Check inputs exist and the output would not clobber one of them
    pub fn validate_paths(&self) -> Result<()> {
        if !self.video.exists() {
            return Err(CombinerError::input_not_found(InputKind::Video, &self.video));
        }

        if !self.audio.exists() {
            return Err(CombinerError::input_not_found(InputKind::Audio, &self.audio));
        }

        for input in [&self.video, &self.audio] {
            if same_file(input, &self.output) {
                return Err(CombinerError::invalid_arguments(format!(
                    "output {} would overwrite input {}",
                    self.output.display(),
                    input.display()
                )));
            }
        }

        Ok(())
    }

    pub fn load_config(&self) -> Result<Config> {
        match &self.config {
            Some(config_path) => {
                info!("Loading configuration from {:?}", config_path);
                Config::from_file(config_path)
            }
            None => {
                info!("Using default configuration");
                Ok(Config::default())
            }
        }
    }
}

/// Validate arguments, prepare the output directory and run one combine
pub async fn run(cli: &Cli) -> Result<CombineReport> {
    cli.validate_paths()?;
    let config = cli.load_config()?;

    if let Some(parent) = cli.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let combiner = MediaCombiner::new(config, cli.reporter());
    combiner.combine(&cli.video, &cli.audio, &cli.output).await
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

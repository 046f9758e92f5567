use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::{
    combine::progress::{ProgressReporter, Stage},
    config::Config,
    error::{CombinerError, Result},
    export::VideoEncoder,
    media::{common_duration, AudioSource, VideoSource},
};

/// Outcome of a successful combine run
#[derive(Debug, Clone)]
pub struct CombineReport {
    pub output: PathBuf,
    /// Common duration both tracks were trimmed to
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub file_size: u64,
}

/// Merges a video file and an audio file into one output video
///
/// The pipeline is strictly linear:
/// 1. Load - open both inputs and read their metadata
/// 2. Align - trim both views to the shorter duration
/// 3. Export - replace the video's audio and encode the result
///
/// Every media handle is owned by a local of [`combine`](Self::combine), so
/// all of them are released when it returns, whichever step failed.
pub struct MediaCombiner {
    config: Config,
    reporter: Box<dyn ProgressReporter>,
}

impl MediaCombiner {
    pub fn new(config: Config, reporter: Box<dyn ProgressReporter>) -> Self {
        Self { config, reporter }
    }

    /// Combine `video_path` and `audio_path` into `output_path`
    pub async fn combine<P: AsRef<Path>>(
        &self,
        video_path: P,
        audio_path: P,
        output_path: P,
    ) -> Result<CombineReport> {
        let output_path = output_path.as_ref();

        let (video, audio) = self.load_sources(video_path.as_ref(), audio_path.as_ref()).await?;
        let (video, audio, duration) = self.align(video, audio)?;

        self.reporter.report(Stage::Info, "Combining video and audio...");
        let final_clip = video.with_audio(audio);

        let report = self.export(&final_clip, output_path, duration).await?;
        drop(final_clip);

        self.reporter.report(Stage::Success, "Music video created successfully!");
        self.reporter.report(Stage::Output, &output_path.display().to_string());
        Ok(report)
    }

    /// Open both inputs; metadata is decoded before this returns
    async fn load_sources(&self, video_path: &Path, audio_path: &Path) -> Result<(VideoSource, AudioSource)> {
        let ffprobe = &self.config.tools.ffprobe;

        self.reporter.report(Stage::Video, &format!("Loading video: {}", video_path.display()));
        let video = VideoSource::open(video_path, ffprobe).await?;

        self.reporter.report(Stage::Audio, &format!("Loading audio: {}", audio_path.display()));
        let audio = AudioSource::open(audio_path, ffprobe).await?;

        Ok((video, audio))
    }

    /// Trim both views to their common duration
    pub(crate) fn align(&self, video: VideoSource, audio: AudioSource) -> Result<(VideoSource, AudioSource, f64)> {
        let duration = common_duration(video.duration(), audio.duration());
        if duration <= 0.0 {
            return Err(CombinerError::invalid_arguments(format!(
                "no overlap between video ({:.3}s) and audio ({:.3}s)",
                video.duration(),
                audio.duration()
            )));
        }

        self.reporter.report(Stage::Info, &format!("Duration: {:.2} seconds", duration));
        self.reporter.report(
            Stage::Info,
            &format!(
                "Video resolution: {}x{} @ {} fps",
                video.width(),
                video.height(),
                video.fps()
            ),
        );
        debug!(
            "Trimming video {:.3}s and audio {:.3}s to {:.3}s",
            video.duration(),
            audio.duration(),
            duration
        );

        let video = video.subclip(0.0, duration)?;
        let audio = audio.subclip(0.0, duration)?;
        Ok((video, audio, duration))
    }

    async fn export(&self, clip: &VideoSource, output_path: &Path, duration: f64) -> Result<CombineReport> {
        self.reporter.report(Stage::Export, &format!("Exporting to: {}", output_path.display()));

        let encoder = VideoEncoder::new(self.config.export.clone(), &self.config.tools);
        let encoded = encoder.write_videofile(clip, output_path).await?;

        info!(
            "Output written: {:?} ({:.1} MB, {:.2}s)",
            encoded.path,
            encoded.file_size as f64 / 1024.0 / 1024.0,
            encoded.duration
        );

        Ok(CombineReport {
            output: encoded.path,
            duration,
            width: clip.width(),
            height: clip.height(),
            fps: encoded.fps,
            file_size: encoded.file_size,
        })
    }
}

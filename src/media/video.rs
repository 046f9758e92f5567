use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{DecodeError, Result};
use crate::media::audio::AudioSource;
use crate::media::probe::{parse_frame_rate, run_ffprobe, ProbeReport};
use crate::media::window::TimeWindow;

/// Decoded metadata of a video file
#[derive(Debug, Clone, PartialEq)]
pub struct VideoMetadata {
    /// Full length of the file in seconds
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// Frame rate as the rational ffprobe reported, e.g. `30000/1001`
    pub frame_rate: String,
    pub codec: String,
    /// Whether the file carries its own audio stream
    pub has_audio: bool,
}

impl VideoMetadata {
    /// Extract video metadata from an ffprobe report
    pub fn from_probe(path: &Path, report: &ProbeReport) -> Result<Self> {
        let display = path.display().to_string();
        let stream = report
            .first_stream("video")
            .ok_or_else(|| DecodeError::NoVideoStream { path: display.clone() })?;

        let (frame_rate, fps) = stream
            .frame_rate_text()
            .and_then(|rate| parse_frame_rate(rate).map(|fps| (rate.to_string(), fps)))
            .ok_or_else(|| DecodeError::InvalidFrameRate {
                path: display.clone(),
                rate: stream
                    .avg_frame_rate
                    .clone()
                    .or_else(|| stream.r_frame_rate.clone())
                    .unwrap_or_default(),
            })?;

        let duration = stream
            .duration_secs()
            .or_else(|| report.format_duration())
            .filter(|d| *d > 0.0)
            .ok_or_else(|| DecodeError::MissingDuration { path: display.clone() })?;

        let (width, height) = match (stream.width, stream.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
            _ => {
                return Err(DecodeError::ProbeFailed {
                    path: display,
                    reason: "video stream has no frame size".to_string(),
                }
                .into())
            }
        };

        Ok(Self {
            duration,
            width,
            height,
            fps,
            frame_rate,
            codec: stream.codec_name.clone().unwrap_or_else(|| "unknown".to_string()),
            has_audio: report.has_stream("audio"),
        })
    }
}

/// The audio that plays alongside a video view
#[derive(Debug)]
pub enum SoundTrack {
    /// Whatever audio the video file carries (possibly none)
    Embedded,
    /// An external audio source replacing the embedded track
    Replaced(AudioSource),
}

/// Open handle on a video file with a time window over it
///
/// The file stays open for the lifetime of the value and is closed on drop,
/// whichever path the pipeline leaves by.
#[derive(Debug)]
pub struct VideoSource {
    path: PathBuf,
    _handle: File,
    metadata: VideoMetadata,
    window: TimeWindow,
    soundtrack: SoundTrack,
}

impl VideoSource {
    /// Open a video file and read its metadata immediately
    pub async fn open<P: AsRef<Path>>(path: P, ffprobe: &str) -> Result<Self> {
        let path = path.as_ref();
        let handle = File::open(path).map_err(|source| DecodeError::Open {
            path: path.display().to_string(),
            source,
        })?;

        let report = run_ffprobe(ffprobe, path).await?;
        let metadata = VideoMetadata::from_probe(path, &report)?;

        info!(
            "Video metadata: {}x{} @ {:.2}fps, {:.2}s ({})",
            metadata.width, metadata.height, metadata.fps, metadata.duration, metadata.codec
        );

        Ok(Self::from_parts(path.to_path_buf(), handle, metadata))
    }

    pub(crate) fn from_parts(path: PathBuf, handle: File, metadata: VideoMetadata) -> Self {
        Self {
            path,
            _handle: handle,
            window: TimeWindow::full(metadata.duration),
            metadata,
            soundtrack: SoundTrack::Embedded,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    /// Duration of the current view in seconds
    pub fn duration(&self) -> f64 {
        self.window.duration()
    }

    pub fn window(&self) -> TimeWindow {
        self.window
    }

    pub fn width(&self) -> u32 {
        self.metadata.width
    }

    pub fn height(&self) -> u32 {
        self.metadata.height
    }

    pub fn fps(&self) -> f64 {
        self.metadata.fps
    }

    /// Exact source frame rate, suitable for FFmpeg's `-r`
    pub fn frame_rate(&self) -> &str {
        &self.metadata.frame_rate
    }

    pub fn soundtrack(&self) -> &SoundTrack {
        &self.soundtrack
    }

    /// Narrow the view to `[start, end)` seconds of the current view
    pub fn subclip(mut self, start: f64, end: f64) -> Result<Self> {
        self.window = self.window.narrow(start, end)?;
        debug!(
            "Video view of {} narrowed to {:.3}-{:.3}s",
            self.path.display(),
            self.window.start,
            self.window.end
        );
        Ok(self)
    }

    /// Replace the audio of this view; the previous track is released
    pub fn with_audio(mut self, audio: AudioSource) -> Self {
        self.soundtrack = SoundTrack::Replaced(audio);
        self
    }

    /// The attached replacement audio, if any
    pub fn replacement_audio(&self) -> Option<&AudioSource> {
        match &self.soundtrack {
            SoundTrack::Replaced(audio) => Some(audio),
            SoundTrack::Embedded => None,
        }
    }
}

impl Drop for VideoSource {
    fn drop(&mut self) {
        debug!("Released video handle {}", self.path.display());
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::media::audio::tests::fake_audio;
    use tempfile::NamedTempFile;

    pub(crate) fn fake_video(duration: f64) -> (NamedTempFile, VideoSource) {
        let file = NamedTempFile::new().unwrap();
        let handle = file.reopen().unwrap();
        let metadata = VideoMetadata {
            duration,
            width: 1920,
            height: 1080,
            fps: 30.0,
            frame_rate: "30/1".to_string(),
            codec: "h264".to_string(),
            has_audio: true,
        };
        let video = VideoSource::from_parts(file.path().to_path_buf(), handle, metadata);
        (file, video)
    }

    #[test]
    fn test_metadata_from_probe() {
        let json = r#"{
            "streams": [
                {"codec_type": "video", "codec_name": "h264", "width": 1280, "height": 720,
                 "avg_frame_rate": "24000/1001"},
                {"codec_type": "audio", "codec_name": "aac"}
            ],
            "format": {"duration": "12.5"}
        }"#;
        let path = Path::new("clip.mp4");
        let report = ProbeReport::from_json(path, json).unwrap();
        let metadata = VideoMetadata::from_probe(path, &report).unwrap();

        assert_eq!((metadata.width, metadata.height), (1280, 720));
        assert!((metadata.fps - 23.976).abs() < 0.001);
        assert_eq!(metadata.frame_rate, "24000/1001");
        assert_eq!(metadata.duration, 12.5);
        assert!(metadata.has_audio);
    }

    #[test]
    fn test_audio_only_file_is_not_a_video() {
        let json = r#"{"streams": [{"codec_type": "audio"}], "format": {"duration": "3.0"}}"#;
        let path = Path::new("song.m4a");
        let report = ProbeReport::from_json(path, json).unwrap();

        let result = VideoMetadata::from_probe(path, &report);
        assert!(matches!(
            result,
            Err(crate::error::CombinerError::Decode(DecodeError::NoVideoStream { .. }))
        ));
    }

    #[test]
    fn test_bad_frame_rate_is_decode_error() {
        let json = r#"{"streams": [{"codec_type": "video", "width": 10, "height": 10,
            "avg_frame_rate": "0/0", "r_frame_rate": "0/0", "duration": "1.0"}]}"#;
        let path = Path::new("broken.mp4");
        let report = ProbeReport::from_json(path, json).unwrap();

        let result = VideoMetadata::from_probe(path, &report);
        assert!(matches!(
            result,
            Err(crate::error::CombinerError::Decode(DecodeError::InvalidFrameRate { .. }))
        ));
    }

    #[test]
    fn test_subclip_keeps_format() {
        let (_file, video) = fake_video(10.0);
        let video = video.subclip(0.0, 7.5).unwrap();

        assert_eq!(video.duration(), 7.5);
        assert_eq!(video.width(), 1920);
        assert_eq!(video.height(), 1080);
        assert_eq!(video.fps(), 30.0);
        assert_eq!(video.metadata().duration, 10.0);
    }

    #[test]
    fn test_with_audio_replaces_embedded_track() {
        let (_vfile, video) = fake_video(5.0);
        let (_afile, audio) = fake_audio(5.0);

        assert!(matches!(video.soundtrack(), SoundTrack::Embedded));
        let combined = video.with_audio(audio);
        assert_eq!(combined.replacement_audio().map(|a| a.duration()), Some(5.0));
    }
}

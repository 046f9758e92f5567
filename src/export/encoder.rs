use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;
use tokio::task;
use tracing::{debug, info, warn};

use crate::config::{ExportConfig, ToolsConfig};
use crate::error::{EncodeError, Result};
use crate::media::{SoundTrack, TimeWindow, VideoSource};

/// Represents an encoded video output
#[derive(Debug, Clone)]
pub struct EncodedVideo {
    pub path: PathBuf,
    pub duration: f64,
    pub fps: f64,
    pub file_size: u64,
}

/// Where the audio of the export comes from
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum AudioInput {
    File { path: PathBuf, window: TimeWindow },
    None,
}

/// Encodes a video view and its soundtrack into one container with FFmpeg.
///
/// Audio is encoded first into a scratch file next to the output, then muxed
/// with the re-encoded video. The scratch directory is removed when the
/// export returns, on success and on failure alike.
pub struct VideoEncoder {
    ffmpeg: String,
    settings: ExportConfig,
}

impl VideoEncoder {
    pub fn new(settings: ExportConfig, tools: &ToolsConfig) -> Self {
        Self {
            ffmpeg: tools.ffmpeg.clone(),
            settings,
        }
    }

    /// Encode `clip` to `output_path` at the clip's own frame rate
    pub async fn write_videofile<P: AsRef<Path>>(
        &self,
        clip: &VideoSource,
        output_path: P,
    ) -> Result<EncodedVideo> {
        let output_path = output_path.as_ref();
        let audio = Self::audio_input(clip);

        let scratch = self.scratch_dir(output_path)?;
        let temp_audio = scratch.path().join(&self.settings.temp_audio_file);

        if let AudioInput::File { path, window } = &audio {
            info!("Encoding audio track to {}", temp_audio.display());
            let args = self.audio_args(path, *window, &temp_audio);
            self.run_ffmpeg("audio encode", args).await?;
        }

        info!(
            "Encoding video with {} ({} preset, {} threads) at {} fps",
            self.settings.video_codec, self.settings.preset, self.settings.threads, clip.frame_rate()
        );
        let muxed_audio = match audio {
            AudioInput::File { .. } => Some(temp_audio.as_path()),
            AudioInput::None => None,
        };
        let args = self.mux_args(clip.path(), clip.window(), clip.frame_rate(), muxed_audio, output_path);
        self.run_ffmpeg("video encode", args).await?;

        if let Err(e) = scratch.close() {
            warn!("Failed to remove temporary audio directory: {}", e);
        }

        let metadata = std::fs::metadata(output_path).map_err(|_| EncodeError::OutputMissing {
            path: output_path.display().to_string(),
        })?;
        if metadata.len() == 0 {
            return Err(EncodeError::OutputMissing {
                path: output_path.display().to_string(),
            }
            .into());
        }

        Ok(EncodedVideo {
            path: output_path.to_path_buf(),
            duration: clip.duration(),
            fps: clip.fps(),
            file_size: metadata.len(),
        })
    }

    pub(crate) fn audio_input(clip: &VideoSource) -> AudioInput {
        match clip.soundtrack() {
            SoundTrack::Replaced(audio) => AudioInput::File {
                path: audio.path().to_path_buf(),
                window: audio.window(),
            },
            SoundTrack::Embedded if clip.metadata().has_audio => AudioInput::File {
                path: clip.path().to_path_buf(),
                window: clip.window(),
            },
            SoundTrack::Embedded => AudioInput::None,
        }
    }

    fn scratch_dir(&self, output_path: &Path) -> Result<TempDir> {
        let parent = output_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        tempfile::Builder::new()
            .prefix(".mvc-audio-")
            .tempdir_in(parent)
            .map_err(|e| {
                EncodeError::TempFile {
                    reason: format!("{}: {}", parent.display(), e),
                }
                .into()
            })
    }

    /// Arguments for encoding the trimmed audio into the scratch file
    pub(crate) fn audio_args(&self, input: &Path, window: TimeWindow, temp_audio: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-y".into(),
            "-v".into(), "error".into(),
            "-ss".into(), format_secs(window.start).into(),
            "-t".into(), format_secs(window.duration()).into(),
            "-i".into(), input.into(),
            "-vn".into(),
            "-c:a".into(), self.settings.audio_codec.clone().into(),
            "-threads".into(), self.settings.threads.to_string().into(),
        ];
        args.push(temp_audio.into());
        args
    }

    /// Arguments for re-encoding the video and muxing in the scratch audio
    pub(crate) fn mux_args(
        &self,
        video: &Path,
        window: TimeWindow,
        frame_rate: &str,
        audio: Option<&Path>,
        output: &Path,
    ) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-y".into(),
            "-v".into(), "error".into(),
            "-ss".into(), format_secs(window.start).into(),
            "-t".into(), format_secs(window.duration()).into(),
            "-i".into(), video.into(),
        ];

        if let Some(audio) = audio {
            args.extend([OsString::from("-i"), audio.into()]);
            args.extend(["-map", "0:v:0", "-map", "1:a:0"].map(OsString::from));
        } else {
            args.extend(["-map", "0:v:0", "-an"].map(OsString::from));
        }

        args.extend([
            OsString::from("-c:v"), self.settings.video_codec.clone().into(),
            "-preset".into(), self.settings.preset.clone().into(),
            "-pix_fmt".into(), self.settings.pixel_format.clone().into(),
            "-r".into(), frame_rate.into(),
            "-threads".into(), self.settings.threads.to_string().into(),
        ]);

        if audio.is_some() {
            // Already encoded with the target codec
            args.extend(["-c:a", "copy"].map(OsString::from));
        }

        args.extend([OsString::from("-t"), format_secs(window.duration()).into()]);
        if is_mp4_family(output) {
            args.extend(["-movflags", "+faststart"].map(OsString::from));
        }
        args.push(output.into());
        args
    }

    async fn run_ffmpeg(&self, stage: &str, args: Vec<OsString>) -> Result<()> {
        debug!("{}: {} {:?}", stage, self.ffmpeg, args);

        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args(args);

        let output = task::spawn_blocking(move || cmd.output()).await
            .map_err(|e| EncodeError::EncoderUnavailable {
                tool: self.ffmpeg.clone(),
                reason: format!("Failed to spawn FFmpeg process: {}", e),
            })?
            .map_err(|e| EncodeError::EncoderUnavailable {
                tool: self.ffmpeg.clone(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EncodeError::EncoderFailed {
                stage: stage.to_string(),
                status: output.status.to_string(),
                stderr: stderr.trim().to_string(),
            }.into());
        }

        Ok(())
    }
}

fn format_secs(secs: f64) -> String {
    format!("{:.6}", secs)
}

fn is_mp4_family(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some(ext) if matches!(ext.to_lowercase().as_str(), "mp4" | "m4v" | "mov")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::audio::tests::fake_audio;
    use crate::media::video::tests::fake_video;
    use tempfile::tempdir;

    fn encoder() -> VideoEncoder {
        VideoEncoder::new(ExportConfig::default(), &ToolsConfig::default())
    }

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    fn value_after(args: &[String], flag: &str) -> Option<String> {
        args.iter().position(|a| a == flag).and_then(|i| args.get(i + 1).cloned())
    }

    #[test]
    fn test_mux_args_use_fixed_codecs() {
        let window = TimeWindow::full(7.5);
        let args = strings(&encoder().mux_args(
            Path::new("in.mp4"),
            window,
            "30/1",
            Some(Path::new("temp-audio.m4a")),
            Path::new("out.mp4"),
        ));

        // Reruns overwrite the previous output instead of prompting
        assert_eq!(args.first().map(String::as_str), Some("-y"));
        assert_eq!(value_after(&args, "-c:v").as_deref(), Some("libx264"));
        assert_eq!(value_after(&args, "-preset").as_deref(), Some("medium"));
        assert_eq!(value_after(&args, "-threads").as_deref(), Some("4"));
        assert_eq!(value_after(&args, "-r").as_deref(), Some("30/1"));
        assert_eq!(value_after(&args, "-c:a").as_deref(), Some("copy"));
        assert_eq!(args.last().map(String::as_str), Some("out.mp4"));
    }

    #[test]
    fn test_mux_args_map_replacement_audio() {
        let args = strings(&encoder().mux_args(
            Path::new("in.mp4"),
            TimeWindow::full(5.0),
            "25/1",
            Some(Path::new("temp-audio.m4a")),
            Path::new("out.mp4"),
        ));

        let maps: Vec<_> = args
            .iter()
            .enumerate()
            .filter(|(_, a)| *a == "-map")
            .filter_map(|(i, _)| args.get(i + 1).cloned())
            .collect();
        assert_eq!(maps, vec!["0:v:0", "1:a:0"]);
        assert!(!args.contains(&"-an".to_string()));
    }

    #[test]
    fn test_mux_args_trim_to_window() {
        let window = TimeWindow::full(10.0).narrow(0.0, 7.5).unwrap();
        let args = strings(&encoder().mux_args(
            Path::new("in.mp4"),
            window,
            "30/1",
            None,
            Path::new("out.mp4"),
        ));

        assert_eq!(value_after(&args, "-ss").as_deref(), Some("0.000000"));
        assert_eq!(value_after(&args, "-t").as_deref(), Some("7.500000"));
        assert!(args.contains(&"-an".to_string()));
    }

    #[test]
    fn test_audio_args_encode_to_target_codec() {
        let window = TimeWindow::full(9.0).narrow(0.0, 4.0).unwrap();
        let args = strings(&encoder().audio_args(
            Path::new("song.wav"),
            window,
            Path::new("/tmp/x/temp-audio.m4a"),
        ));

        assert_eq!(args.first().map(String::as_str), Some("-y"));
        assert_eq!(value_after(&args, "-i").as_deref(), Some("song.wav"));
        assert_eq!(value_after(&args, "-t").as_deref(), Some("4.000000"));
        assert_eq!(value_after(&args, "-c:a").as_deref(), Some("aac"));
        assert!(args.contains(&"-vn".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("/tmp/x/temp-audio.m4a"));
    }

    #[test]
    fn test_faststart_only_for_mp4_outputs() {
        let mp4 = strings(&encoder().mux_args(
            Path::new("in.mp4"), TimeWindow::full(1.0), "30/1", None, Path::new("out.mp4"),
        ));
        let mkv = strings(&encoder().mux_args(
            Path::new("in.mp4"), TimeWindow::full(1.0), "30/1", None, Path::new("out.mkv"),
        ));

        assert!(mp4.contains(&"-movflags".to_string()));
        assert!(!mkv.contains(&"-movflags".to_string()));
    }

    #[test]
    fn test_fractional_rate_passed_as_rational() {
        let args = strings(&encoder().mux_args(
            Path::new("in.mp4"), TimeWindow::full(1.0), "30000/1001", None, Path::new("out.mp4"),
        ));
        assert_eq!(value_after(&args, "-r").as_deref(), Some("30000/1001"));
    }

    #[test]
    fn test_clip_frame_rate_reaches_mux_args() {
        let (_vfile, video) = fake_video(3.0);
        let args = strings(&encoder().mux_args(
            video.path(), video.window(), video.frame_rate(), None, Path::new("out.mp4"),
        ));
        assert_eq!(value_after(&args, "-r").as_deref(), Some("30/1"));
    }

    #[test]
    fn test_replacement_audio_takes_precedence() {
        let (_vfile, video) = fake_video(10.0);
        let (_afile, audio) = fake_audio(7.5);
        let audio_path = audio.path().to_path_buf();

        let clip = video.subclip(0.0, 7.5).unwrap().with_audio(audio.subclip(0.0, 7.5).unwrap());
        match VideoEncoder::audio_input(&clip) {
            AudioInput::File { path, window } => {
                assert_eq!(path, audio_path);
                assert_eq!(window.duration(), 7.5);
            }
            AudioInput::None => panic!("expected the replacement audio"),
        }
    }

    #[tokio::test]
    async fn test_missing_encoder_cleans_scratch_dir() {
        let dir = tempdir().unwrap();
        let tools = ToolsConfig {
            ffmpeg: "ffmpeg-not-installed".to_string(),
            ..ToolsConfig::default()
        };
        let encoder = VideoEncoder::new(ExportConfig::default(), &tools);
        let (_vfile, video) = fake_video(5.0);
        let (_afile, audio) = fake_audio(5.0);
        let clip = video.with_audio(audio);

        let output = dir.path().join("out.mp4");
        let result = encoder.write_videofile(&clip, &output).await;

        assert!(matches!(
            result,
            Err(crate::error::CombinerError::Encode(EncodeError::EncoderUnavailable { .. }))
        ));
        assert!(!output.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}

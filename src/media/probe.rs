use std::path::Path;
use std::process::Command;

use serde::Deserialize;
use tokio::task;
use tracing::debug;

use crate::error::{DecodeError, Result};

/// Parsed `ffprobe -show_format -show_streams` output
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeReport {
    #[serde(default)]
    pub streams: Vec<ProbeStream>,

    #[serde(default)]
    pub format: Option<ProbeFormat>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeStream {
    #[serde(default)]
    pub codec_type: Option<String>,

    #[serde(default)]
    pub codec_name: Option<String>,

    #[serde(default)]
    pub width: Option<u32>,

    #[serde(default)]
    pub height: Option<u32>,

    #[serde(default)]
    pub avg_frame_rate: Option<String>,

    #[serde(default)]
    pub r_frame_rate: Option<String>,

    /// ffprobe prints durations as strings
    #[serde(default)]
    pub duration: Option<String>,

    #[serde(default)]
    pub sample_rate: Option<String>,

    #[serde(default)]
    pub channels: Option<u16>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeFormat {
    #[serde(default)]
    pub format_name: Option<String>,

    #[serde(default)]
    pub duration: Option<String>,
}

impl ProbeReport {
    pub fn from_json(path: &Path, json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            DecodeError::ProbeFailed {
                path: path.display().to_string(),
                reason: format!("invalid ffprobe output: {}", e),
            }
            .into()
        })
    }

    /// First stream of the given type ("video" or "audio")
    pub fn first_stream(&self, codec_type: &str) -> Option<&ProbeStream> {
        self.streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some(codec_type))
    }

    pub fn has_stream(&self, codec_type: &str) -> bool {
        self.first_stream(codec_type).is_some()
    }

    /// Container-level duration in seconds
    pub fn format_duration(&self) -> Option<f64> {
        self.format
            .as_ref()
            .and_then(|f| f.duration.as_deref())
            .and_then(parse_seconds)
    }
}

impl ProbeStream {
    pub fn duration_secs(&self) -> Option<f64> {
        self.duration.as_deref().and_then(parse_seconds)
    }

    /// Frame rate, preferring the average rate over the base rate
    pub fn frame_rate(&self) -> Option<f64> {
        self.frame_rate_text().and_then(parse_frame_rate)
    }

    /// The rational behind [`frame_rate`](Self::frame_rate), as ffprobe wrote it
    pub fn frame_rate_text(&self) -> Option<&str> {
        [self.avg_frame_rate.as_deref(), self.r_frame_rate.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|rate| parse_frame_rate(rate).is_some())
    }

    pub fn sample_rate_hz(&self) -> Option<u32> {
        self.sample_rate.as_deref().and_then(|s| s.trim().parse().ok())
    }
}

/// Parse an ffprobe rational such as `30000/1001` or a plain number.
///
/// Returns `None` for `0/0`, zero, negative or non-finite rates.
pub fn parse_frame_rate(rate: &str) -> Option<f64> {
    let rate = rate.trim();
    let fps = match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => rate.parse().ok()?,
    };

    (fps.is_finite() && fps > 0.0).then_some(fps)
}

fn parse_seconds(value: &str) -> Option<f64> {
    let secs: f64 = value.trim().parse().ok()?;
    (secs.is_finite() && secs >= 0.0).then_some(secs)
}

/// Runs `ffprobe` against a file and returns its parsed report
pub async fn run_ffprobe(ffprobe: &str, path: &Path) -> Result<ProbeReport> {
    let mut cmd = Command::new(ffprobe);
    cmd.args(["-v", "error", "-print_format", "json", "-show_format", "-show_streams"])
        .arg(path);

    debug!("Probing {} with {}", path.display(), ffprobe);

    let output = task::spawn_blocking(move || cmd.output())
        .await
        .map_err(|e| DecodeError::ProbeUnavailable {
            tool: ffprobe.to_string(),
            reason: format!("failed to spawn probe task: {}", e),
        })?
        .map_err(|e| DecodeError::ProbeUnavailable {
            tool: ffprobe.to_string(),
            reason: e.to_string(),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(DecodeError::ProbeFailed {
            path: path.display().to_string(),
            reason: stderr.trim().to_string(),
        }
        .into());
    }

    let json = String::from_utf8_lossy(&output.stdout);
    ProbeReport::from_json(path, &json)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "streams": [
            {
                "index": 0,
                "codec_name": "h264",
                "codec_type": "video",
                "width": 1920,
                "height": 1080,
                "r_frame_rate": "30/1",
                "avg_frame_rate": "30/1",
                "duration": "10.000000"
            },
            {
                "index": 1,
                "codec_name": "aac",
                "codec_type": "audio",
                "sample_rate": "48000",
                "channels": 2,
                "duration": "9.984000"
            }
        ],
        "format": {
            "format_name": "mov,mp4,m4a,3gp,3g2,mj2",
            "duration": "10.010000"
        }
    }"#;

    #[test]
    fn test_parse_report() {
        let report = ProbeReport::from_json(Path::new("clip.mp4"), SAMPLE).unwrap();

        let video = report.first_stream("video").unwrap();
        assert_eq!(video.width, Some(1920));
        assert_eq!(video.height, Some(1080));
        assert_eq!(video.frame_rate(), Some(30.0));
        assert_eq!(video.duration_secs(), Some(10.0));

        let audio = report.first_stream("audio").unwrap();
        assert_eq!(audio.sample_rate_hz(), Some(48000));
        assert_eq!(audio.channels, Some(2));

        assert_eq!(report.format_duration(), Some(10.01));
    }

    #[test]
    fn test_missing_sections_default() {
        let report = ProbeReport::from_json(Path::new("x"), "{}").unwrap();
        assert!(report.streams.is_empty());
        assert!(!report.has_stream("video"));
        assert_eq!(report.format_duration(), None);
    }

    #[test]
    fn test_garbage_is_probe_failure() {
        let result = ProbeReport::from_json(Path::new("x"), "not json");
        assert!(matches!(
            result,
            Err(crate::error::CombinerError::Decode(DecodeError::ProbeFailed { .. }))
        ));
    }

    #[test]
    fn test_frame_rate_parsing() {
        assert_eq!(parse_frame_rate("30/1"), Some(30.0));
        assert_eq!(parse_frame_rate("25"), Some(25.0));
        let ntsc = parse_frame_rate("30000/1001").unwrap();
        assert!((ntsc - 29.97).abs() < 0.01);

        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("0/1"), None);
        assert_eq!(parse_frame_rate("abc"), None);
    }

    #[test]
    fn test_avg_rate_falls_back_to_base_rate() {
        let stream = ProbeStream {
            avg_frame_rate: Some("0/0".to_string()),
            r_frame_rate: Some("24/1".to_string()),
            ..Default::default()
        };
        assert_eq!(stream.frame_rate(), Some(24.0));
        assert_eq!(stream.frame_rate_text(), Some("24/1"));
    }
}

use std::path::Path;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// x264/x265 preset names accepted by `export.preset` for those codecs
pub const X264_PRESETS: &[&str] = &[
    "ultrafast", "superfast", "veryfast", "faster", "fast",
    "medium", "slow", "slower", "veryslow", "placebo",
];

/// Main configuration for the combiner
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Encoder settings for the combined output
    #[serde(default)]
    pub export: ExportConfig,

    /// External tool locations
    #[serde(default)]
    pub tools: ToolsConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound { path: path.display().to_string() })?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidValue {
                key: "config".to_string(),
                value: e.to_string()
            })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.export.validate()?;
        self.tools.validate()?;
        Ok(())
    }
}

/// Output encoding configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Video codec passed to the encoder
    pub video_codec: String,

    /// Audio codec passed to the encoder
    pub audio_codec: String,

    /// Named encoder preset (speed vs. compression)
    pub preset: String,

    /// Encoder worker threads
    pub threads: usize,

    /// File name of the intermediate audio track used while muxing
    pub temp_audio_file: String,

    /// Pixel format of the output video stream
    pub pixel_format: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            preset: "medium".to_string(),
            threads: 4,
            temp_audio_file: "temp-audio.m4a".to_string(),
            pixel_format: "yuv420p".to_string(),
        }
    }
}

impl ExportConfig {
    fn validate(&self) -> Result<()> {
        for (key, value) in [
            ("export.video_codec", &self.video_codec),
            ("export.audio_codec", &self.audio_codec),
            ("export.pixel_format", &self.pixel_format),
            ("export.preset", &self.preset),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: value.clone()
                }.into());
            }
        }

        // Other encoders name their presets differently
        let x264_family = matches!(self.video_codec.as_str(), "libx264" | "libx265");
        if x264_family && !X264_PRESETS.contains(&self.preset.as_str()) {
            return Err(ConfigError::InvalidValue {
                key: "export.preset".to_string(),
                value: self.preset.clone()
            }.into());
        }

        let max_threads = num_cpus::get().max(1) * 4;
        if self.threads == 0 || self.threads > max_threads {
            return Err(ConfigError::InvalidValue {
                key: "export.threads".to_string(),
                value: self.threads.to_string()
            }.into());
        }

        // Must stay inside the scratch directory
        let name = Path::new(&self.temp_audio_file);
        if self.temp_audio_file.is_empty()
            || name.file_name().map(|n| n != name.as_os_str()).unwrap_or(true)
        {
            return Err(ConfigError::InvalidValue {
                key: "export.temp_audio_file".to_string(),
                value: self.temp_audio_file.clone()
            }.into());
        }

        Ok(())
    }
}

/// Paths or names of the FFmpeg executables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg: String,
    pub ffprobe: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
        }
    }
}

impl ToolsConfig {
    fn validate(&self) -> Result<()> {
        if self.ffmpeg.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "tools.ffmpeg".to_string(),
                value: self.ffmpeg.clone()
            }.into());
        }

        if self.ffprobe.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "tools.ffprobe".to_string(),
                value: self.ffprobe.clone()
            }.into());
        }

        Ok(())
    }
}

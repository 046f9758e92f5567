use std::fmt;

use thiserror::Error;

/// Main error type for the music video combiner
#[derive(Error, Debug)]
pub enum CombinerError {
    #[error("{kind} file not found: {path}")]
    InputNotFound { kind: InputKind, path: String },

    #[error("Media decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid arguments: {details}")]
    InvalidArguments { details: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Which of the two inputs an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Video,
    Audio,
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => write!(f, "Video"),
            Self::Audio => write!(f, "Audio"),
        }
    }
}

/// Errors raised while opening a media file and reading its metadata
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("probe tool '{tool}' could not be started: {reason}")]
    ProbeUnavailable { tool: String, reason: String },

    #[error("failed to probe {path}: {reason}")]
    ProbeFailed { path: String, reason: String },

    #[error("no video stream in {path}")]
    NoVideoStream { path: String },

    #[error("no audio stream in {path}")]
    NoAudioStream { path: String },

    #[error("invalid frame rate '{rate}' in {path}")]
    InvalidFrameRate { path: String, rate: String },

    #[error("could not determine duration of {path}")]
    MissingDuration { path: String },

    #[error("unsupported audio format in {path}: {reason}")]
    UnsupportedAudio { path: String, reason: String },

    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while writing the combined output
#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("encoder '{tool}' could not be started: {reason}")]
    EncoderUnavailable { tool: String, reason: String },

    #[error("{stage} failed with status {status}: {stderr}")]
    EncoderFailed {
        stage: String,
        status: String,
        stderr: String,
    },

    #[error("could not prepare temporary audio file: {reason}")]
    TempFile { reason: String },

    #[error("encoder finished but no output was written to {path}")]
    OutputMissing { path: String },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path}: {reason}")]
    ParseFailed { path: String, reason: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Convenience type alias for Results using CombinerError
pub type Result<T> = std::result::Result<T, CombinerError>;

impl CombinerError {
    /// Process exit code for this error.
    ///
    /// A missing input is reported with `1`; every failure past the input
    /// check (decode, encode, configuration, arguments, IO) uses `2`.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InputNotFound { .. } => 1,
            _ => 2,
        }
    }

    pub fn input_not_found<P: AsRef<std::path::Path>>(kind: InputKind, path: P) -> Self {
        Self::InputNotFound {
            kind,
            path: path.as_ref().display().to_string(),
        }
    }

    pub fn invalid_arguments<S: Into<String>>(details: S) -> Self {
        Self::InvalidArguments {
            details: details.into(),
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Decode(DecodeError::ProbeUnavailable { tool, .. }) => {
                format!("Could not run '{}'. Please check FFmpeg is installed and on PATH.", tool)
            }
            Self::Encode(EncodeError::EncoderUnavailable { tool, .. }) => {
                format!("Could not run '{}'. Please check FFmpeg is installed and on PATH.", tool)
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_inputs_exit_with_one() {
        let video = CombinerError::input_not_found(InputKind::Video, "clip.mp4");
        let audio = CombinerError::input_not_found(InputKind::Audio, "song.wav");

        assert_eq!(video.exit_code(), 1);
        assert_eq!(audio.exit_code(), 1);
        assert_eq!(video.to_string(), "Video file not found: clip.mp4");
        assert_eq!(audio.to_string(), "Audio file not found: song.wav");
    }

    #[test]
    fn test_processing_failures_exit_with_two() {
        let decode: CombinerError = DecodeError::NoVideoStream {
            path: "a.mp4".to_string(),
        }
        .into();
        let encode: CombinerError = EncodeError::OutputMissing {
            path: "out.mp4".to_string(),
        }
        .into();

        assert_eq!(decode.exit_code(), 2);
        assert_eq!(encode.exit_code(), 2);
        assert_eq!(CombinerError::invalid_arguments("same path").exit_code(), 2);
    }

    #[test]
    fn test_user_message_mentions_tool() {
        let err: CombinerError = EncodeError::EncoderUnavailable {
            tool: "ffmpeg".to_string(),
            reason: "No such file or directory".to_string(),
        }
        .into();

        assert!(err.user_message().contains("'ffmpeg'"));
    }
}

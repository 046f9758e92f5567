use std::fmt;

/// Pipeline stage a progress line belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Video,
    Audio,
    Info,
    Export,
    Success,
    Output,
    Error,
}

impl Stage {
    /// Tag printed in front of the message
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Video => "[VIDEO]",
            Self::Audio => "[AUDIO]",
            Self::Info => "[INFO]",
            Self::Export => "[EXPORT]",
            Self::Success => "[SUCCESS]",
            Self::Output => "[OUTPUT]",
            Self::Error => "[ERROR]",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Receives the human-readable stage lines of a combine run
pub trait ProgressReporter: Send + Sync {
    fn report(&self, stage: Stage, message: &str);
}

/// Prints stage lines to stdout, errors to stderr
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleReporter;

impl ProgressReporter for ConsoleReporter {
    fn report(&self, stage: Stage, message: &str) {
        if stage == Stage::Error {
            eprintln!("{} {}", stage, message);
        } else {
            println!("{} {}", stage, message);
        }
    }
}

/// Drops every line except errors
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {
    fn report(&self, stage: Stage, message: &str) {
        if stage == Stage::Error {
            eprintln!("{} {}", stage, message);
        }
    }
}

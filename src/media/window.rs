use crate::error::{CombinerError, Result};

/// Time window `[start, end)` over a media resource, in seconds.
///
/// Narrowing a window never touches the underlying file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    pub start: f64,
    pub end: f64,
}

impl TimeWindow {
    /// Window covering a whole resource of the given length
    pub fn full(duration: f64) -> Self {
        Self { start: 0.0, end: duration }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Narrow to `[start, end)` measured relative to this window.
    ///
    /// `end` may not run past the current window and `start` must precede it.
    pub fn narrow(&self, start: f64, end: f64) -> Result<Self> {
        let length = self.duration();
        if !(start.is_finite() && end.is_finite()) || start < 0.0 || start >= end || end > length {
            return Err(CombinerError::invalid_arguments(format!(
                "window {:.3}-{:.3}s is outside a {:.3}s clip",
                start, end, length
            )));
        }

        Ok(Self {
            start: self.start + start,
            end: self.start + end,
        })
    }
}

/// Length of the overlap both tracks can cover
pub fn common_duration(video: f64, audio: f64) -> f64 {
    video.min(audio)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_duration_picks_shorter() {
        assert_eq!(common_duration(10.0, 7.5), 7.5);
        assert_eq!(common_duration(4.0, 9.0), 4.0);
        assert_eq!(common_duration(5.0, 5.0), 5.0);
    }

    #[test]
    fn test_narrow_is_relative() {
        let full = TimeWindow::full(10.0);
        let first = full.narrow(2.0, 8.0).unwrap();
        assert_eq!(first, TimeWindow { start: 2.0, end: 8.0 });

        let second = first.narrow(1.0, 3.0).unwrap();
        assert_eq!(second, TimeWindow { start: 3.0, end: 5.0 });
        assert_eq!(second.duration(), 2.0);
    }

    #[test]
    fn test_narrow_to_full_length() {
        let full = TimeWindow::full(7.5);
        assert_eq!(full.narrow(0.0, 7.5).unwrap(), full);
    }

    #[test]
    fn test_narrow_rejects_out_of_range() {
        let full = TimeWindow::full(5.0);
        assert!(full.narrow(0.0, 5.5).is_err());
        assert!(full.narrow(3.0, 3.0).is_err());
        assert!(full.narrow(-1.0, 2.0).is_err());
        assert!(full.narrow(0.0, f64::NAN).is_err());
    }
}

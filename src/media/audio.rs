use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use symphonia::core::codecs::CODEC_TYPE_NULL;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::Time;
use tokio::task;
use tracing::{debug, info};

use crate::error::{CombinerError, DecodeError, Result};
use crate::media::probe::run_ffprobe;
use crate::media::window::TimeWindow;

/// Which decoder produced the metadata of an audio file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioBackend {
    /// WAV header read with hound
    Wav,
    /// Container probed with symphonia
    Symphonia,
    /// External ffprobe, for containers symphonia does not read
    Ffprobe,
}

/// Decoded metadata of an audio file
#[derive(Debug, Clone, PartialEq)]
pub struct AudioMetadata {
    pub duration: f64,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
    pub backend: AudioBackend,
}

/// Open handle on an audio file with a time window over it
#[derive(Debug)]
pub struct AudioSource {
    path: PathBuf,
    _handle: File,
    metadata: AudioMetadata,
    window: TimeWindow,
}

impl AudioSource {
    /// Open an audio file and read its metadata immediately.
    ///
    /// WAV files are read with hound, everything else with symphonia, and
    /// ffprobe is the last resort when neither recognises the file.
    pub async fn open<P: AsRef<Path>>(path: P, ffprobe: &str) -> Result<Self> {
        let path = path.as_ref();
        let handle = File::open(path).map_err(|source| DecodeError::Open {
            path: path.display().to_string(),
            source,
        })?;

        let metadata = match Self::read_native(path).await {
            Ok(metadata) => metadata,
            Err(e) => {
                debug!("Native audio probe failed for {}: {}", path.display(), e);
                Self::read_ffprobe(path, ffprobe).await?
            }
        };

        info!(
            "Audio metadata: {:.2}s, {} Hz, {} channels ({:?})",
            metadata.duration,
            metadata.sample_rate.map(|r| r.to_string()).unwrap_or_else(|| "?".to_string()),
            metadata.channels.map(|c| c.to_string()).unwrap_or_else(|| "?".to_string()),
            metadata.backend
        );

        Ok(Self::from_parts(path.to_path_buf(), handle, metadata))
    }

    pub(crate) fn from_parts(path: PathBuf, handle: File, metadata: AudioMetadata) -> Self {
        Self {
            path,
            _handle: handle,
            window: TimeWindow::full(metadata.duration),
            metadata,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn metadata(&self) -> &AudioMetadata {
        &self.metadata
    }

    /// Duration of the current view in seconds
    pub fn duration(&self) -> f64 {
        self.window.duration()
    }

    pub fn window(&self) -> TimeWindow {
        self.window
    }

    /// Narrow the view to `[start, end)` seconds of the current view
    pub fn subclip(mut self, start: f64, end: f64) -> Result<Self> {
        self.window = self.window.narrow(start, end)?;
        debug!(
            "Audio view of {} narrowed to {:.3}-{:.3}s",
            self.path.display(),
            self.window.start,
            self.window.end
        );
        Ok(self)
    }

    /// Each decoder opens its own descriptor so none sees another's read offset
    async fn read_native(path: &Path) -> Result<AudioMetadata> {
        let owned_path = path.to_path_buf();
        let is_wav = Self::detect_format(path).as_deref() == Some("wav");

        task::spawn_blocking(move || -> Result<AudioMetadata> {
            if is_wav {
                match read_wav_header(&owned_path, File::open(&owned_path)?) {
                    Ok(metadata) => return Ok(metadata),
                    Err(e) => debug!("hound could not read {}: {}", owned_path.display(), e),
                }
            }
            read_symphonia(&owned_path, File::open(&owned_path)?)
        })
        .await
        .map_err(|e| DecodeError::UnsupportedAudio {
            path: path.display().to_string(),
            reason: format!("probe task failed: {}", e),
        })?
    }

    async fn read_ffprobe(path: &Path, ffprobe: &str) -> Result<AudioMetadata> {
        let report = run_ffprobe(ffprobe, path).await?;
        let stream = report
            .first_stream("audio")
            .ok_or_else(|| DecodeError::NoAudioStream { path: path.display().to_string() })?;

        let duration = stream
            .duration_secs()
            .or_else(|| report.format_duration())
            .filter(|d| *d > 0.0)
            .ok_or_else(|| DecodeError::MissingDuration { path: path.display().to_string() })?;

        Ok(AudioMetadata {
            duration,
            sample_rate: stream.sample_rate_hz(),
            channels: stream.channels,
            backend: AudioBackend::Ffprobe,
        })
    }

    /// Detect audio format from file extension
    pub fn detect_format<P: AsRef<Path>>(path: P) -> Option<String> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
    }
}

impl Drop for AudioSource {
    fn drop(&mut self) {
        debug!("Released audio handle {}", self.path.display());
    }
}

/// Read duration from the WAV header without decoding samples
fn read_wav_header(path: &Path, file: File) -> Result<AudioMetadata> {
    let reader = hound::WavReader::new(BufReader::new(file)).map_err(|e| {
        DecodeError::UnsupportedAudio {
            path: path.display().to_string(),
            reason: e.to_string(),
        }
    })?;

    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return Err(DecodeError::MissingDuration { path: path.display().to_string() }.into());
    }

    Ok(AudioMetadata {
        duration: reader.duration() as f64 / spec.sample_rate as f64,
        sample_rate: Some(spec.sample_rate),
        channels: Some(spec.channels),
        backend: AudioBackend::Wav,
    })
}

fn read_symphonia(path: &Path, file: File) -> Result<AudioMetadata> {
    let unsupported = |reason: String| -> CombinerError {
        DecodeError::UnsupportedAudio {
            path: path.display().to_string(),
            reason,
        }
        .into()
    };

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| unsupported(e.to_string()))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| DecodeError::NoAudioStream { path: path.display().to_string() })?;

    let track_id = track.id;
    let params = track.codec_params.clone();
    let sample_rate = params.sample_rate;
    let channels = params.channels.map(|c| c.count() as u16);

    // Fall back to walking packet timestamps when the header has no frame count
    let frames = match params.n_frames {
        Some(n) => n,
        None => {
            let mut end_ts = 0u64;
            loop {
                match format.next_packet() {
                    Ok(packet) if packet.track_id() == track_id => {
                        end_ts = end_ts.max(packet_end(packet.ts(), packet.dur()));
                    }
                    Ok(_) => continue,
                    Err(SymphoniaError::ResetRequired) => continue,
                    Err(_) => break,
                }
            }
            end_ts
        }
    };

    let duration = match (params.time_base, sample_rate) {
        (Some(time_base), _) => time_to_secs(time_base.calc_time(frames)),
        (None, Some(rate)) if rate > 0 => frames as f64 / rate as f64,
        _ => return Err(DecodeError::MissingDuration { path: path.display().to_string() }.into()),
    };

    if duration <= 0.0 {
        return Err(DecodeError::MissingDuration { path: path.display().to_string() }.into());
    }

    Ok(AudioMetadata {
        duration,
        sample_rate,
        channels,
        backend: AudioBackend::Symphonia,
    })
}

/// End timestamp of a packet; corrupt timestamps clamp instead of wrapping
fn packet_end(ts: u64, dur: u64) -> u64 {
    ts.saturating_add(dur)
}

fn time_to_secs(time: Time) -> f64 {
    time.seconds as f64 + time.frac
}

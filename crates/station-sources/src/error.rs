//! Error taxonomy for source capture (§7: `CaptureError`).

/// Errors raised by source capture, device enumeration, and file I/O.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV file read/write error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// Audio stream setup or runtime error.
    #[error("audio stream error: {0}")]
    Stream(String),

    /// No audio device available on the system.
    #[error("no audio device available")]
    NoDevice,

    /// The requested sample format is not supported.
    #[error("unsupported sample format: {0}")]
    UnsupportedFormat(String),

    /// The requested audio device was not found.
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    /// A source's reconnect cap was exceeded; the source is now `Error` and
    /// will not retry without an explicit `restart()` (§4.1 step 2e).
    #[error("source '{source}' gave up after {attempts} reconnect attempts: {message}")]
    CaptureFailed {
        /// Name of the source that failed.
        source: String,
        /// Consecutive reconnect attempts made before giving up.
        attempts: u32,
        /// Underlying failure message.
        message: String,
    },

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

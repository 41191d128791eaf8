//! Playback error taxonomy (§7 `PlaybackError`).

use std::path::PathBuf;
use thiserror::Error;

/// Failure of a single segment playback attempt.
///
/// `Interrupted` is carried here only so callers can match on it uniformly;
/// the worker never surfaces it as a `Failed` terminal status (§4.7: "not a
/// failure — it is a status").
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The segment's audio file does not exist.
    #[error("audio file not found: {0}")]
    MissingFile(PathBuf),
    /// The player subprocess exited with a non-zero code.
    #[error("player exited with code {0}")]
    PlayerExit(i32),
    /// The player subprocess had to be force-killed after the SIGTERM grace
    /// period elapsed.
    #[error("player did not exit within the termination grace period")]
    Timeout,
    /// Playback was preempted by a higher-priority item.
    #[error("playback interrupted by a higher-priority alert")]
    Interrupted,
    /// The player subprocess could not be spawned.
    #[error("failed to spawn player process: {0}")]
    Spawn(#[from] std::io::Error),
}

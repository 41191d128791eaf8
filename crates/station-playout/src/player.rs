//! Player subprocess supervision (§6.2).
//!
//! Grounded on `app_core/audio/output_service.py`'s `_play_audio_file`/
//! `_terminate_current_process`: spawn the operator-configured player with
//! the segment path appended, discard its stdio, and poll for completion at
//! 100 ms granularity so a preemption or stop request can terminate it
//! promptly.

use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use crate::error::PlaybackError;

/// Grace period between SIGTERM and SIGKILL (§6.2, §5 cancellation
/// semantics).
pub const TERMINATION_GRACE: Duration = Duration::from_secs(1);

/// Poll interval while waiting for the player process to exit (§4.7 step 5).
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Spawn `argv` (operator-supplied player command) with `segment` appended
/// as the final argument, discarding stdout/stderr.
pub fn spawn(argv: &[String], segment: &Path) -> Result<Child, PlaybackError> {
    let (program, args) = argv.split_first().ok_or_else(|| {
        PlaybackError::Spawn(std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty player command"))
    })?;
    Command::new(program)
        .args(args)
        .arg(segment)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(PlaybackError::Spawn)
}

/// Terminate `child`: SIGTERM (or the platform-equivalent best effort), then
/// SIGKILL if it has not exited after [`TERMINATION_GRACE`].
pub fn terminate(child: &mut Child) -> bool {
    if child.try_wait().ok().flatten().is_some() {
        return true;
    }

    request_terminate(child);

    let deadline = Instant::now() + TERMINATION_GRACE;
    loop {
        if child.try_wait().ok().flatten().is_some() {
            return true;
        }
        if Instant::now() >= deadline {
            break;
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    tracing::warn!("player did not exit after SIGTERM, force killing");
    let _ = child.kill();
    child.wait().is_ok()
}

#[cfg(unix)]
fn request_terminate(child: &Child) {
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    let pid = Pid::from_raw(child.id() as i32);
    if let Err(e) = signal::kill(pid, Signal::SIGTERM) {
        tracing::warn!(error = %e, "failed to send SIGTERM to player process");
    }
}

#[cfg(not(unix))]
fn request_terminate(child: &mut Child) {
    // No graceful-termination signal available on this platform; fall
    // straight through to the SIGKILL-equivalent in `terminate`.
    let _ = child.kill();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_rejects_empty_argv() {
        let result = spawn(&[], Path::new("alert.wav"));
        assert!(result.is_err());
    }

    #[test]
    #[cfg(unix)]
    fn terminate_stops_a_long_running_process() {
        let mut child = Command::new("sleep").arg("30").spawn().expect("spawn sleep");
        assert!(terminate(&mut child));
    }
}

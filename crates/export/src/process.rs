//! Running an external tool with a deadline.

use invite_core::{Error, Result};
use std::io::Read;
#[cfg(unix)]
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// How often a running child is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Longest stderr excerpt kept in an error message.
const MAX_STDERR_CHARS: usize = 400;

/// Run `cmd` to completion, killing it if it outlives `timeout`.
///
/// On Unix the child leads its own process group and a timeout kills the
/// whole group. `libreoffice` is a launcher for `soffice.bin`, and a stray
/// renderer keeps the user profile locked for every later conversion.
///
/// Spawn failures, timeouts and non-zero exits become [`Error::Conversion`].
pub(crate) fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> Result<()> {
    let program = cmd.get_program().to_string_lossy().into_owned();
    log::debug!("Running {:?}", cmd);

    #[cfg(unix)]
    cmd.process_group(0);

    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                Error::Conversion(format!("'{}' not found; is it installed and on PATH?", program))
            }
            _ => Error::Conversion(format!("Failed to start '{}': {}", program, e)),
        })?;

    // Drain stderr on the side so a chatty child never blocks on a full pipe.
    let stderr = child.stderr.take().map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = String::new();
            let _ = pipe.read_to_string(&mut buf);
            buf
        })
    });

    let start = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if start.elapsed() >= timeout => {
                log::warn!("'{}' exceeded {:?}, killing it", program, timeout);
                if let Err(e) = kill_tree(&mut child) {
                    log::error!("Failed to kill '{}': {}", program, e);
                }
                let _ = child.wait();
                return Err(Error::Conversion(format!(
                    "'{}' timed out after {}s",
                    program,
                    timeout.as_secs_f32()
                )));
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                return Err(Error::Conversion(format!("Failed to wait for '{}': {}", program, e)));
            }
        }
    };

    let stderr = stderr
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default();

    if status.success() {
        if !stderr.trim().is_empty() {
            log::debug!("'{}' stderr: {}", program, stderr.trim());
        }
        return Ok(());
    }

    let excerpt: String = stderr.trim().chars().take(MAX_STDERR_CHARS).collect();
    Err(Error::Conversion(if excerpt.is_empty() {
        format!("'{}' exited with {}", program, status)
    } else {
        format!("'{}' exited with {}: {}", program, status, excerpt)
    }))
}

/// Kill the child together with everything it started.
#[cfg(unix)]
fn kill_tree(child: &mut Child) -> std::io::Result<()> {
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    // Negative pid addresses the process group led by the child.
    let group = Pid::from_raw(-(child.id() as i32));
    if let Err(e) = signal::kill(group, Signal::SIGKILL) {
        log::debug!("Failed to signal process group {}: {}", child.id(), e);
        return child.kill();
    }
    Ok(())
}

#[cfg(not(unix))]
fn kill_tree(child: &mut Child) -> std::io::Result<()> {
    child.kill()
}

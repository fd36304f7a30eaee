//! Run a shell command with an overall and an idle timeout, streaming its
//! output line by line to a sink.

use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, RecvTimeoutError, Sender};

use crate::error::{CloverError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Receives the output of a running command as it is produced.
pub trait OutputSink {
    fn line(&mut self, line: &str);
}

/// Forwards every line to `tracing` at info level.
pub struct TracingSink;

impl OutputSink for TracingSink {
    fn line(&mut self, line: &str) {
        tracing::info!(target: "cloverlens::process", "{}", line);
    }
}

impl OutputSink for Vec<String> {
    fn line(&mut self, line: &str) {
        self.push(line.to_string());
    }
}

/// Result of a command that ran to completion.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// -1 when the process was terminated by a signal.
    pub exit_code: i32,
    /// Combined stdout and stderr, in arrival order.
    pub output: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Run `command` through `sh -c` in `dir`.
///
/// The command is killed once it runs longer than `timeout`, or goes
/// `idle_timeout` without writing a line to stdout or stderr. It runs in its
/// own process group, and the whole group is killed, so workers it spawned
/// do not outlive it.
pub fn run(
    command: &str,
    dir: &Path,
    timeout: Duration,
    idle_timeout: Duration,
    sink: &mut dyn OutputSink,
) -> Result<ProcessOutput> {
    tracing::debug!("running '{}' in {}", command, dir.display());

    let mut cmd = Command::new("sh");
    cmd.arg("-c")
        .arg(command)
        .current_dir(dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }
    let mut child = cmd.spawn()?;

    let (tx, rx) = unbounded::<String>();
    let readers = [
        child.stdout.take().map(|s| spawn_reader(s, tx.clone())),
        child.stderr.take().map(|s| spawn_reader(s, tx.clone())),
    ];
    // Only the reader threads hold senders now; the channel disconnects
    // once both streams are closed.
    drop(tx);

    let start = Instant::now();
    let mut last_output = Instant::now();
    let mut output = String::new();

    loop {
        let overall_left = timeout.saturating_sub(start.elapsed());
        let idle_left = idle_timeout.saturating_sub(last_output.elapsed());
        let wait = overall_left.min(idle_left);

        match rx.recv_timeout(wait) {
            Ok(line) => {
                sink.line(&line);
                output.push_str(&line);
                output.push('\n');
                last_output = Instant::now();
            }
            Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                kill(&mut child);
                return Err(expired(command, start, timeout, idle_timeout));
            }
        }
    }

    for reader in readers.into_iter().flatten() {
        let _ = reader.join();
    }

    // Both streams are closed but the command may still be running.
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        let overall_left = timeout.saturating_sub(start.elapsed());
        let idle_left = idle_timeout.saturating_sub(last_output.elapsed());
        if overall_left.is_zero() || idle_left.is_zero() {
            kill(&mut child);
            return Err(expired(command, start, timeout, idle_timeout));
        }
        thread::sleep(POLL_INTERVAL.min(overall_left).min(idle_left));
    };

    Ok(ProcessOutput {
        exit_code: status.code().unwrap_or(-1),
        output,
    })
}

fn spawn_reader<R: Read + Send + 'static>(stream: R, tx: Sender<String>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    let line = line.trim_end_matches(['\n', '\r']);
                    if tx.send(line.to_string()).is_err() {
                        break;
                    }
                }
            }
        }
    })
}

fn expired(command: &str, start: Instant, timeout: Duration, idle_timeout: Duration) -> CloverError {
    if start.elapsed() >= timeout {
        CloverError::TimedOut {
            command: command.to_string(),
            timeout,
        }
    } else {
        CloverError::IdleTimeout {
            command: command.to_string(),
            idle_timeout,
        }
    }
}

/// Kill the child's process group, then the child itself.
///
/// Reader threads are not joined here; they finish once the last process
/// holding the pipes is gone.
fn kill(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Ok(pid) = libc::pid_t::try_from(child.id()) {
            // SAFETY: plain syscall; the child leads its own process group.
            unsafe {
                libc::kill(-pid, libc::SIGKILL);
            }
        }
    }
    child.kill().ok();
    child.wait().ok();
}

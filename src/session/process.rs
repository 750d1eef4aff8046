//! The managed debugger child process.
//!
//! All communication goes through the process stdio: command lines are
//! written to stdin, raw stdout bytes are forwarded to the session's control
//! thread by a background reader. The reader does no decoding at all, so the
//! protocol state machine stays single-threaded.

use super::error::Error;
use crate::{md_debug, md_warn, weak_error};
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use timeout_readwrite::TimeoutReader;

/// Reader poll interval, also bounds the teardown latency of the reader thread.
const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// What the background reader hands over to the control thread.
pub enum Output {
    /// Raw stdout bytes, arbitrary chunk boundaries.
    Chunk(Vec<u8>),
    /// Stdout reached end of file - the process is gone or going.
    Eof,
}

pub struct DebuggerProcess {
    child: Child,
    output: Receiver<Output>,
    shutdown: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
}

impl DebuggerProcess {
    /// Start the debugger executable and wire up its stdio.
    ///
    /// A bare program name is resolved through `PATH`.
    pub fn spawn(program: &str, args: &[String]) -> Result<(Self, ChildStdin), Error> {
        let path = if Path::new(program).exists() {
            program.to_string()
        } else {
            which::which(program)
                .map_err(|_| Error::DebuggerNotFound(program.to_string()))?
                .to_string_lossy()
                .to_string()
        };

        md_debug!(target: "session", "spawn debugger: {path} {args:?}");
        let mut child = Command::new(&path)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdin = child.stdin.take().expect("stdin is piped");
        let stdout = child.stdout.take().expect("stdout is piped");
        let stderr = child.stderr.take().expect("stderr is piped");

        let (tx, rx) = mpsc::channel();
        let shutdown = Arc::new(AtomicBool::new(false));

        let reader = {
            let shutdown = Arc::clone(&shutdown);
            thread::spawn(move || read_loop(stdout, tx, shutdown))
        };

        // debugger diagnostics on stderr are not part of the protocol, route
        // them into the logs
        thread::spawn(move || {
            for line in BufReader::new(stderr).lines() {
                match line {
                    Ok(line) => md_warn!(target: "debugger-stderr", "{line}"),
                    Err(_) => break,
                }
            }
        });

        let process = Self {
            child,
            output: rx,
            shutdown,
            reader: Some(reader),
        };
        Ok((process, stdin))
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Next output item, `None` when nothing arrived within `timeout`.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Output> {
        match self.output.recv_timeout(timeout) {
            Ok(output) => Some(output),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Output::Eof),
        }
    }

    /// Next output item if one is already queued.
    pub fn try_recv(&self) -> Option<Output> {
        match self.output.try_recv() {
            Ok(output) => Some(output),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Output::Eof),
        }
    }

    /// Collect the exit status. Blocks until the process is really gone,
    /// which it already is (or is about to be) when stdout hit EOF.
    pub fn reap(&mut self) -> Option<i32> {
        weak_error!(self.child.wait(), "reap debugger process:").and_then(|status| status.code())
    }
}

impl Drop for DebuggerProcess {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        _ = self.child.kill();
        _ = self.child.wait();
        if let Some(reader) = self.reader.take() {
            _ = reader.join();
        }
    }
}

fn read_loop(stdout: ChildStdout, tx: Sender<Output>, shutdown: Arc<AtomicBool>) {
    let mut stdout = TimeoutReader::new(stdout, READ_TIMEOUT);
    let mut buf = [0u8; 4096];
    loop {
        if shutdown.load(Ordering::SeqCst) {
            return;
        }
        match stdout.read(&mut buf) {
            Ok(0) => {
                _ = tx.send(Output::Eof);
                return;
            }
            Ok(n) => {
                if tx.send(Output::Chunk(buf[..n].to_vec())).is_err() {
                    return;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => continue,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(_) => {
                _ = tx.send(Output::Eof);
                return;
            }
        }
    }
}

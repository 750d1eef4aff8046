//! The debugging session: spawns and owns a GDB-family debugger process,
//! correlates its token-tagged MI output with issued commands and mirrors
//! debugger-side state (breakpoints, frames, threads, variables).
//!
//! The session is single-threaded with respect to its own state: decoding,
//! correlation and command issue all happen on the thread that owns the
//! [`Session`] value. The only background activity is a reader thread that
//! forwards raw stdout bytes (see [`process`]).

mod dispatch;
pub mod error;
mod framer;
mod process;
pub mod snapshot;

pub use dispatch::Persistence;
pub use error::Error;

use crate::backend::Backend;
use crate::mi::parser::MiResults;
use crate::mi::{
    self, AsyncKind, AsyncRecord, OutputRecord, ResultClass, ResultRecord, StreamKind, Token,
};
use crate::session::dispatch::{CommandTable, OutstandingCommand, TokenGenerator};
use crate::session::framer::LineFramer;
use crate::session::process::{DebuggerProcess, Output};
use crate::session::snapshot::{
    Breakpoint, SnapshotKind, StackFrame, StopReason, Thread, Variable,
};
use crate::{md_debug, md_error, md_info, md_warn};
use std::io::Write;
use std::time::{Duration, Instant};
use strum_macros::Display;

/// Default upper bound for synchronous command waits.
///
/// The wait must never be unbounded: a debugger that stopped answering would
/// otherwise hang its caller forever.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Consumer of session events. All callbacks run on the session's control
/// thread, while the record that caused them is being processed.
pub trait EventHook {
    /// The debugged program stopped (breakpoint, completed step, signal...).
    fn on_stopped(&self, reason: &StopReason, thread_id: Option<u32>) -> anyhow::Result<()>;

    /// The debugged program resumed.
    fn on_running(&self) {}

    /// The debugger process itself is gone.
    fn on_process_exit(&self, code: Option<i32>);

    /// The authoritative breakpoint set changed.
    fn on_breakpoints_changed(&self, _breakpoints: &[Breakpoint]) {}

    /// A list snapshot was replaced.
    fn on_snapshot_updated(&self, _kind: SnapshotKind) {}

    /// Console/log/target stream output, including undecodable lines and the
    /// echo of every dispatched command.
    fn on_stream_text(&self, _kind: StreamKind, _text: &str) {}

    /// A command the debugger answered with an error result.
    fn on_command_failed(&self, _msg: &str) {}
}

/// State of the managed debugger process and its debuggee.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Display)]
pub enum ExecutionStatus {
    #[default]
    NotStarted,
    /// Debugger process spawned, debuggee not running yet.
    Starting,
    Running,
    Stopped,
    /// Debugger process exited. Entered only via the process's own exit.
    Terminated,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Debugger executable, overrides the backend default.
    pub debugger_program: Option<String>,
    /// Arguments appended after the backend pre-arguments, typically the
    /// path of the program to debug.
    pub arguments: Vec<String>,
    /// Upper bound for synchronous command waits.
    pub response_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debugger_program: None,
            arguments: vec![],
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
        }
    }
}

pub struct Session<H: EventHook> {
    backend: Box<dyn Backend>,
    config: SessionConfig,
    hooks: H,
    process: Option<DebuggerProcess>,
    stdin: Option<Box<dyn Write + Send>>,
    framer: LineFramer,
    tokens: TokenGenerator,
    commands: CommandTable<H>,
    status: ExecutionStatus,

    // debugger-side state mirror
    breakpoints: Vec<Breakpoint>,
    stack_frames: Vec<StackFrame>,
    threads: Vec<Thread>,
    current_thread: Option<u32>,
    variables: Vec<Variable>,
    source_files: Vec<String>,
}

impl<H: EventHook> Session<H> {
    pub fn new(backend: Box<dyn Backend>, config: SessionConfig, hooks: H) -> Self {
        Self {
            backend,
            config,
            hooks,
            process: None,
            stdin: None,
            framer: LineFramer::new(),
            tokens: TokenGenerator::default(),
            commands: CommandTable::default(),
            status: ExecutionStatus::default(),
            breakpoints: vec![],
            stack_frames: vec![],
            threads: vec![],
            current_thread: None,
            variables: vec![],
            source_files: vec![],
        }
    }

    // ------------------------------- lifecycle -------------------------------

    /// Spawn the debugger process.
    ///
    /// Resets the token counter and drops any leftover outstanding commands:
    /// tokens are only meaningful within one process lifetime.
    pub fn launch(&mut self) -> Result<(), Error> {
        if self.is_executing() {
            return Err(Error::AlreadyRun);
        }

        let program = self
            .config
            .debugger_program
            .clone()
            .unwrap_or_else(|| self.backend.program().to_string());
        let mut arguments = self.backend.pre_arguments();
        arguments.extend(self.config.arguments.iter().cloned());

        let (process, stdin) = DebuggerProcess::spawn(&program, &arguments)?;
        md_info!(target: "session", "debugger started: {program}, pid {}", process.pid());

        self.process = Some(process);
        self.stdin = Some(Box::new(stdin));
        self.tokens.reset();
        self.commands.clear();
        self.framer.clear();
        self.status = ExecutionStatus::Starting;
        Ok(())
    }

    /// Start the debugged program.
    pub fn run(&mut self) -> Result<(), Error> {
        let command = self.backend.launch()?;
        self.send(&command)?;
        Ok(())
    }

    /// Ask the debugger to exit. Only guarantees the command was sent; actual
    /// termination is observed through [`EventHook::on_process_exit`].
    pub fn quit(&mut self) -> Result<(), Error> {
        let command = self.backend.quit()?;
        self.send(&command)?;
        Ok(())
    }

    /// Kill the debugged program (the debugger stays).
    pub fn kill(&mut self) -> Result<(), Error> {
        let command = self.backend.kill()?;
        self.send(&command)?;
        Ok(())
    }

    /// Drop the debugger process without waiting for a polite exit.
    pub fn terminate(&mut self) {
        if self.is_executing() {
            self.teardown();
        }
    }

    pub fn is_executing(&self) -> bool {
        self.process.is_some()
    }

    pub fn process_id(&self) -> Option<u32> {
        self.process.as_ref().map(DebuggerProcess::pid)
    }

    pub fn status(&self) -> ExecutionStatus {
        self.status
    }

    // ------------------------------- breakpoints -----------------------------

    pub fn insert_breakpoint(&mut self, file: &str, line: u32) -> Result<(), Error> {
        let command = self.backend.break_insert(file, line)?;
        let location = format!("{file}:{line}");
        self.dispatch_command(command, Persistence::OneShot, move |session, record| {
            match record.class {
                ResultClass::Done => {
                    let results = session.backend.parse_payload(&record.payload)?;
                    let breakpoint = session.backend.parse_breakpoint(&results)?;
                    md_info!(
                        target: "session",
                        "breakpoint {} set at {}:{}",
                        breakpoint.number, breakpoint.file, breakpoint.line
                    );
                    session.breakpoints.push(breakpoint);
                    session.hooks.on_breakpoints_changed(&session.breakpoints);
                }
                ResultClass::Error => {
                    let msg = session.error_message(&record.payload);
                    session
                        .hooks
                        .on_command_failed(&format!("breakpoint at {location} not set: {msg}"));
                }
                class => md_warn!(target: "session", "unexpected {class} result for breakpoint insert"),
            }
            Ok(())
        })?;
        Ok(())
    }

    pub fn remove_breakpoint(&mut self, number: u32) -> Result<(), Error> {
        let command = self.backend.break_remove(number)?;
        self.dispatch_command(command, Persistence::OneShot, move |session, record| {
            match record.class {
                ResultClass::Done => {
                    session.breakpoints.retain(|bp| bp.number != number);
                    session.hooks.on_breakpoints_changed(&session.breakpoints);
                }
                ResultClass::Error => {
                    let msg = session.error_message(&record.payload);
                    session
                        .hooks
                        .on_command_failed(&format!("breakpoint {number} not removed: {msg}"));
                }
                _ => {}
            }
            Ok(())
        })?;
        Ok(())
    }

    pub fn remove_all_breakpoints(&mut self) -> Result<(), Error> {
        let command = self.backend.break_remove_all()?;
        self.dispatch_command(command, Persistence::OneShot, |session, record| {
            if record.class == ResultClass::Done {
                session.breakpoints.clear();
                session.hooks.on_breakpoints_changed(&session.breakpoints);
            }
            Ok(())
        })?;
        Ok(())
    }

    /// Convenience form of [`Self::remove_breakpoint`]: one removal per
    /// breakpoint currently known in `file`.
    pub fn remove_breakpoints_in_file(&mut self, file: &str) -> Result<(), Error> {
        let numbers: Vec<u32> = self
            .breakpoints
            .iter()
            .filter(|bp| bp.file == file)
            .map(|bp| bp.number)
            .collect();
        for number in numbers {
            self.remove_breakpoint(number)?;
        }
        Ok(())
    }

    // ------------------------------- snapshots -------------------------------

    /// Refresh the stack-frame snapshot and wait for the result.
    pub fn update_stack_frames(&mut self) -> Result<&[StackFrame], Error> {
        let command = self.backend.stack_list_frames()?;
        let token = self.dispatch_command(command, Persistence::OneShot, |session, record| {
            match record.class {
                ResultClass::Done => {
                    let results = session.backend.parse_payload(&record.payload)?;
                    session.stack_frames = session.backend.parse_stack_frames(&results)?;
                    session.hooks.on_snapshot_updated(SnapshotKind::StackFrames);
                }
                ResultClass::Error => {
                    let msg = session.error_message(&record.payload);
                    session.hooks.on_command_failed(&format!("stack frames: {msg}"));
                }
                _ => {}
            }
            Ok(())
        })?;
        self.wait_for(token)?;
        Ok(&self.stack_frames)
    }

    /// Refresh the variable snapshot of the current frame and wait for it.
    pub fn update_variables(&mut self) -> Result<&[Variable], Error> {
        let command = self.backend.stack_list_variables()?;
        let token = self.dispatch_command(command, Persistence::OneShot, |session, record| {
            match record.class {
                ResultClass::Done => {
                    let results = session.backend.parse_payload(&record.payload)?;
                    session.variables = session.backend.parse_variables(&results)?;
                    session.hooks.on_snapshot_updated(SnapshotKind::Variables);
                }
                ResultClass::Error => {
                    let msg = session.error_message(&record.payload);
                    session.hooks.on_command_failed(&format!("variables: {msg}"));
                }
                _ => {}
            }
            Ok(())
        })?;
        self.wait_for(token)?;
        Ok(&self.variables)
    }

    /// Refresh the thread snapshot and wait for it.
    pub fn update_threads(&mut self) -> Result<&[Thread], Error> {
        let command = self.backend.thread_info()?;
        let token = self.dispatch_command(command, Persistence::OneShot, |session, record| {
            match record.class {
                ResultClass::Done => {
                    let results = session.backend.parse_payload(&record.payload)?;
                    let (threads, current) = session.backend.parse_threads(&results)?;
                    session.threads = threads;
                    session.current_thread = current;
                    session.hooks.on_snapshot_updated(SnapshotKind::Threads);
                }
                ResultClass::Error => {
                    let msg = session.error_message(&record.payload);
                    session.hooks.on_command_failed(&format!("threads: {msg}"));
                }
                _ => {}
            }
            Ok(())
        })?;
        self.wait_for(token)?;
        Ok(&self.threads)
    }

    /// Refresh the source-file list of the debugged program and wait for it.
    pub fn update_source_files(&mut self) -> Result<&[String], Error> {
        let command = self.backend.list_source_files()?;
        let token = self.dispatch_command(command, Persistence::OneShot, |session, record| {
            if record.class == ResultClass::Done {
                let results = session.backend.parse_payload(&record.payload)?;
                session.source_files = session.backend.parse_source_files(&results)?;
                session.hooks.on_snapshot_updated(SnapshotKind::SourceFiles);
            }
            Ok(())
        })?;
        self.wait_for(token)?;
        Ok(&self.source_files)
    }

    pub fn all_breakpoints(&self) -> &[Breakpoint] {
        &self.breakpoints
    }

    pub fn all_stack_frames(&self) -> &[StackFrame] {
        &self.stack_frames
    }

    pub fn all_threads(&self) -> &[Thread] {
        &self.threads
    }

    pub fn current_thread(&self) -> Option<u32> {
        self.current_thread
    }

    pub fn all_variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn source_files(&self) -> &[String] {
        &self.source_files
    }

    // ------------------------------- execution -------------------------------
    //
    // Fire-and-forget: the state change surfaces later as an asynchronous
    // execution record, not as a direct result.

    pub fn pause(&mut self) -> Result<(), Error> {
        let command = self.backend.exec_pause()?;
        self.send(&command)?;
        Ok(())
    }

    pub fn continue_execution(&mut self) -> Result<(), Error> {
        let command = self.backend.exec_continue()?;
        self.send(&command)?;
        Ok(())
    }

    pub fn step_over(&mut self) -> Result<(), Error> {
        let command = self.backend.exec_step_over()?;
        self.send(&command)?;
        Ok(())
    }

    pub fn step_into(&mut self) -> Result<(), Error> {
        let command = self.backend.exec_step_into()?;
        self.send(&command)?;
        Ok(())
    }

    pub fn step_out(&mut self) -> Result<(), Error> {
        let command = self.backend.exec_step_out()?;
        self.send(&command)?;
        Ok(())
    }

    pub fn select_thread(&mut self, id: u32) -> Result<(), Error> {
        let command = self.backend.thread_select(id)?;
        self.dispatch_command(command, Persistence::OneShot, move |session, record| {
            if record.class == ResultClass::Done {
                session.current_thread = Some(id);
            }
            Ok(())
        })?;
        Ok(())
    }

    // ------------------------------- output pump -----------------------------

    /// Drain every output chunk that already arrived, without blocking.
    pub fn process_output(&mut self) -> Result<(), Error> {
        loop {
            let output = {
                let Some(process) = self.process.as_ref() else {
                    return Ok(());
                };
                process.try_recv()
            };
            match output {
                Some(output) => self.handle_output(output)?,
                None => return Ok(()),
            }
        }
    }

    /// Process output for (at most) the given window of time. Returns early
    /// when the debugger process goes away.
    pub fn pump_events(&mut self, window: Duration) -> Result<(), Error> {
        let deadline = Instant::now() + window;
        loop {
            let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                return Ok(());
            };
            let output = {
                let Some(process) = self.process.as_ref() else {
                    return Ok(());
                };
                process.recv_timeout(remaining)
            };
            match output {
                Some(output) => self.handle_output(output)?,
                None => return Ok(()),
            }
        }
    }

    /// Issue a raw backend command with an explicit completion.
    ///
    /// This is the dispatcher contract behind every high-level operation:
    /// token allocation, zero-padded framing, completion registration. The
    /// write blocks until the OS accepted the bytes, not until a response
    /// arrives.
    pub fn dispatch_command(
        &mut self,
        command: String,
        persistence: Persistence,
        handler: impl FnMut(&mut Session<H>, &ResultRecord) -> Result<(), Error> + 'static,
    ) -> Result<Token, Error> {
        let token = self.send(&command)?;
        self.commands.register(
            token,
            OutstandingCommand {
                handler: Box::new(handler),
                persistence,
            },
        );
        Ok(token)
    }

    // ------------------------------- internals -------------------------------

    fn send(&mut self, command: &str) -> Result<Token, Error> {
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(Error::ProcessNotStarted);
        };

        let token = self.tokens.next();
        let line = format!("{token:0width$}{command}\n", width = mi::TOKEN_WIDTH);
        if let Err(e) = stdin.write_all(line.as_bytes()).and_then(|_| stdin.flush()) {
            md_error!(target: "session", "write to debugger: {e:#}");
            self.teardown();
            return Err(Error::CommandWrite(e));
        }

        // every dispatched command is echoed into the stream surface
        self.hooks
            .on_stream_text(StreamKind::Log, &format!("Command:{line}"));
        Ok(token)
    }

    /// Pump output until the completion registered under `token` ran (its
    /// one-shot table entry disappearing is the fulfillment signal).
    fn wait_for(&mut self, token: Token) -> Result<(), Error> {
        let timeout = self.config.response_timeout;
        let deadline = Instant::now() + timeout;
        while self.commands.contains(token) {
            let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                return Err(Error::ResponseTimeout(timeout));
            };
            let output = {
                let Some(process) = self.process.as_ref() else {
                    // waiters must never hang on a dead session
                    return Err(Error::Terminated);
                };
                process.recv_timeout(remaining)
            };
            match output {
                // a cleared table must not look like fulfillment
                Some(Output::Eof) => {
                    self.child_exited();
                    return Err(Error::Terminated);
                }
                Some(output) => self.handle_output(output)?,
                None => return Err(Error::ResponseTimeout(timeout)),
            }
        }
        Ok(())
    }

    fn handle_output(&mut self, output: Output) -> Result<(), Error> {
        match output {
            Output::Chunk(chunk) => self.ingest(&chunk),
            Output::Eof => {
                self.child_exited();
                Ok(())
            }
        }
    }

    fn ingest(&mut self, chunk: &[u8]) -> Result<(), Error> {
        for line in self.framer.push_chunk(chunk) {
            let text = String::from_utf8_lossy(&line);
            self.handle_line(text.as_ref())?;
        }
        Ok(())
    }

    fn handle_line(&mut self, line: &str) -> Result<(), Error> {
        match mi::classify(line) {
            Ok(OutputRecord::Result(record)) => self.handle_result(record),
            Ok(OutputRecord::Async(record)) => self.handle_async(record),
            Ok(OutputRecord::Stream(kind, text)) => {
                self.hooks.on_stream_text(kind, &text);
                Ok(())
            }
            Ok(OutputRecord::Prompt) => Ok(()),
            Err(e) => {
                // not fatal, but never dropped silently
                md_warn!(target: "session", "{e:#}");
                self.hooks.on_stream_text(StreamKind::Log, line);
                Ok(())
            }
        }
    }

    fn handle_result(&mut self, record: ResultRecord) -> Result<(), Error> {
        // a `running` result is also an execution state change (gdb answers
        // `-exec-run`/`-exec-continue` with one even when no asynchronous
        // running record follows)
        if record.class == ResultClass::Running && self.status != ExecutionStatus::Running {
            self.status = ExecutionStatus::Running;
            self.hooks.on_running();
        }

        let Some(token) = record.token else {
            return Ok(());
        };
        let Some(mut command) = self.commands.take(token) else {
            // stray or duplicate result, a defined no-op
            md_debug!(target: "session", "result with unknown token {token}, ignored");
            return Ok(());
        };

        let result = (command.handler)(self, &record);
        if command.persistence == Persistence::Persistent {
            self.commands.restore(token, command);
        }
        match result {
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                md_warn!(target: "session", "completion for token {token}: {e:#}");
                Ok(())
            }
            Ok(()) => Ok(()),
        }
    }

    fn handle_async(&mut self, record: AsyncRecord) -> Result<(), Error> {
        match record.kind {
            AsyncKind::Exec => match record.class.as_str() {
                "stopped" => {
                    let results = self.payload_or_empty(&record.payload);
                    let (reason, thread_id) = self.backend.parse_stop_reason(&results);
                    md_info!(target: "session", "stopped: {reason}");
                    self.status = ExecutionStatus::Stopped;
                    self.hooks
                        .on_stopped(&reason, thread_id)
                        .map_err(Error::Hook)?;
                    Ok(())
                }
                "running" => {
                    if self.status != ExecutionStatus::Running {
                        self.status = ExecutionStatus::Running;
                        self.hooks.on_running();
                    }
                    Ok(())
                }
                class => {
                    md_debug!(target: "session", "unhandled exec record: {class}");
                    Ok(())
                }
            },
            AsyncKind::Notify => self.handle_notify(record),
            AsyncKind::Status => {
                md_debug!(target: "session", "status record: {}", record.class);
                Ok(())
            }
        }
    }

    /// Notifications that matter for the state mirror; everything else only
    /// hits the debug log.
    fn handle_notify(&mut self, record: AsyncRecord) -> Result<(), Error> {
        match record.class.as_str() {
            "breakpoint-modified" => {
                let results = self.payload_or_empty(&record.payload);
                if let Ok(breakpoint) = self.backend.parse_breakpoint(&results) {
                    if let Some(existing) = self
                        .breakpoints
                        .iter_mut()
                        .find(|bp| bp.number == breakpoint.number)
                    {
                        *existing = breakpoint;
                        self.hooks.on_breakpoints_changed(&self.breakpoints);
                    }
                }
                Ok(())
            }
            "breakpoint-deleted" => {
                let results = self.payload_or_empty(&record.payload);
                if let Some(number) = results.get_u32("id") {
                    let before = self.breakpoints.len();
                    self.breakpoints.retain(|bp| bp.number != number);
                    if self.breakpoints.len() != before {
                        self.hooks.on_breakpoints_changed(&self.breakpoints);
                    }
                }
                Ok(())
            }
            class => {
                md_debug!(target: "session", "notify record: {class}");
                Ok(())
            }
        }
    }

    fn child_exited(&mut self) {
        if self.process.is_none() && self.status == ExecutionStatus::Terminated {
            return;
        }
        let code = self.process.as_mut().and_then(DebuggerProcess::reap);
        md_info!(target: "session", "debugger process exited, code {code:?}");

        self.process = None;
        self.stdin = None;
        let abandoned = self.commands.clear();
        if abandoned > 0 {
            md_debug!(target: "session", "{abandoned} outstanding command(s) abandoned");
        }
        self.framer.clear();
        self.status = ExecutionStatus::Terminated;
        self.hooks.on_process_exit(code);
    }

    /// Session-fatal teardown: kill the process, abandon outstanding
    /// commands, release anything that could still be waiting.
    fn teardown(&mut self) {
        self.stdin = None;
        // dropping the handle kills the child and joins the reader
        self.process = None;
        self.commands.clear();
        self.framer.clear();
        self.status = ExecutionStatus::Terminated;
        self.hooks.on_process_exit(None);
    }

    fn payload_or_empty(&self, payload: &str) -> MiResults {
        match self.backend.parse_payload(payload) {
            Ok(results) => results,
            Err(e) => {
                md_warn!(target: "session", "async payload: {e:#}");
                MiResults::default()
            }
        }
    }

    fn error_message(&self, payload: &str) -> String {
        let results = self.payload_or_empty(payload);
        self.backend.parse_error_message(&results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct HookState {
        stops: RefCell<Vec<(StopReason, Option<u32>)>>,
        running: Cell<usize>,
        exits: RefCell<Vec<Option<i32>>>,
        breakpoint_changes: Cell<usize>,
        snapshots: RefCell<Vec<SnapshotKind>>,
        failures: RefCell<Vec<String>>,
        streams: RefCell<Vec<(StreamKind, String)>>,
    }

    struct RecordingHook(Rc<HookState>);

    impl EventHook for RecordingHook {
        fn on_stopped(&self, reason: &StopReason, thread_id: Option<u32>) -> anyhow::Result<()> {
            self.0.stops.borrow_mut().push((reason.clone(), thread_id));
            Ok(())
        }

        fn on_running(&self) {
            self.0.running.set(self.0.running.get() + 1);
        }

        fn on_process_exit(&self, code: Option<i32>) {
            self.0.exits.borrow_mut().push(code);
        }

        fn on_breakpoints_changed(&self, _breakpoints: &[Breakpoint]) {
            self.0
                .breakpoint_changes
                .set(self.0.breakpoint_changes.get() + 1);
        }

        fn on_snapshot_updated(&self, kind: SnapshotKind) {
            self.0.snapshots.borrow_mut().push(kind);
        }

        fn on_stream_text(&self, kind: StreamKind, text: &str) {
            self.0.streams.borrow_mut().push((kind, text.to_string()));
        }

        fn on_command_failed(&self, msg: &str) {
            self.0.failures.borrow_mut().push(msg.to_string());
        }
    }

    #[derive(Clone, Default)]
    struct SharedSink(Arc<Mutex<Vec<u8>>>);

    impl SharedSink {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for SharedSink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Session wired to an in-memory stdin sink instead of a real process;
    /// output is injected with `ingest`.
    fn sink_session() -> (Session<RecordingHook>, Rc<HookState>, SharedSink) {
        let state = Rc::new(HookState::default());
        let mut session = Session::new(
            backend::select("gdb").unwrap(),
            SessionConfig::default(),
            RecordingHook(Rc::clone(&state)),
        );
        let sink = SharedSink::default();
        session.stdin = Some(Box::new(sink.clone()));
        session.status = ExecutionStatus::Stopped;
        (session, state, sink)
    }

    #[test]
    fn test_insert_breakpoint_scenario() {
        let (mut session, state, sink) = sink_session();

        session.insert_breakpoint("main.c", 10).unwrap();
        assert_eq!(sink.contents(), "000000-break-insert main.c:10\n");

        session
            .ingest(b"000000^done,bkpt={number=\"1\",enabled=\"y\",file=\"main.c\",fullname=\"/tmp/main.c\",line=\"10\"}\n")
            .unwrap();

        assert_eq!(
            session.all_breakpoints(),
            &[Breakpoint {
                number: 1,
                file: "main.c".to_string(),
                line: 10,
                enabled: true,
            }]
        );
        assert_eq!(state.breakpoint_changes.get(), 1);
        assert!(session.commands.is_empty());
    }

    #[test]
    fn test_insert_breakpoint_error_result() {
        let (mut session, state, _sink) = sink_session();

        session.insert_breakpoint("nope.c", 1).unwrap();
        session
            .ingest(b"000000^error,msg=\"No source file named nope.c.\"\n")
            .unwrap();

        assert!(session.all_breakpoints().is_empty());
        let failures = state.failures.borrow();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].contains("No source file named nope.c."));
    }

    #[test]
    fn test_remove_all_breakpoints() {
        let (mut session, _state, sink) = sink_session();
        for number in 1..=3 {
            session.breakpoints.push(Breakpoint {
                number,
                file: "main.c".to_string(),
                line: number * 10,
                enabled: true,
            });
        }

        session.remove_all_breakpoints().unwrap();
        assert_eq!(sink.contents(), "000000-break-delete\n");

        session.ingest(b"000000^done\n").unwrap();
        assert!(session.all_breakpoints().is_empty());
    }

    #[test]
    fn test_remove_breakpoints_in_file_resolves_to_batch() {
        let (mut session, _state, sink) = sink_session();
        session.breakpoints = vec![
            Breakpoint { number: 1, file: "a.c".to_string(), line: 1, enabled: true },
            Breakpoint { number: 2, file: "b.c".to_string(), line: 2, enabled: true },
            Breakpoint { number: 3, file: "a.c".to_string(), line: 3, enabled: true },
        ];

        session.remove_breakpoints_in_file("a.c").unwrap();
        assert_eq!(
            sink.contents(),
            "000000-break-delete 1\n000001-break-delete 3\n"
        );

        session.ingest(b"000000^done\n000001^done\n").unwrap();
        assert_eq!(session.all_breakpoints().len(), 1);
        assert_eq!(session.all_breakpoints()[0].number, 2);
    }

    #[test]
    fn test_unsolicited_stop_notification() {
        let (mut session, state, _sink) = sink_session();
        session.status = ExecutionStatus::Running;

        session
            .ingest(b"*stopped,reason=\"breakpoint-hit\",disp=\"keep\",bkptno=\"1\",thread-id=\"1\"\n")
            .unwrap();

        assert_eq!(session.status(), ExecutionStatus::Stopped);
        assert_eq!(
            *state.stops.borrow(),
            vec![(StopReason::BreakpointHit, Some(1))]
        );
        assert!(session.commands.is_empty());
    }

    #[test]
    fn test_running_result_changes_status() {
        let (mut session, state, _sink) = sink_session();
        session.run().unwrap();
        session.ingest(b"000000^running\n*running,thread-id=\"all\"\n").unwrap();
        assert_eq!(session.status(), ExecutionStatus::Running);
        // the asynchronous record right after the result must not double-fire
        assert_eq!(state.running.get(), 1);
    }

    #[test]
    fn test_unknown_token_is_ignored() {
        let (mut session, state, _sink) = sink_session();
        session
            .ingest(b"999999^done,bkpt={number=\"7\",file=\"x.c\",line=\"1\"}\n")
            .unwrap();
        assert!(session.all_breakpoints().is_empty());
        assert!(state.failures.borrow().is_empty());
        assert_eq!(session.status(), ExecutionStatus::Stopped);
    }

    #[test]
    fn test_persistent_completion_fires_repeatedly() {
        let (mut session, _state, _sink) = sink_session();
        let fired = Rc::new(Cell::new(0));

        let token = {
            let fired = Rc::clone(&fired);
            session
                .dispatch_command(
                    "-thread-info".to_string(),
                    Persistence::Persistent,
                    move |_, _| {
                        fired.set(fired.get() + 1);
                        Ok(())
                    },
                )
                .unwrap()
        };

        session.ingest(b"000000^done\n").unwrap();
        session.ingest(b"000000^done\n").unwrap();
        assert_eq!(fired.get(), 2);
        assert!(session.commands.contains(token));
    }

    #[test]
    fn test_one_shot_completion_fires_once() {
        let (mut session, _state, _sink) = sink_session();
        let fired = Rc::new(Cell::new(0));

        let token = {
            let fired = Rc::clone(&fired);
            session
                .dispatch_command("-thread-info".to_string(), Persistence::OneShot, move |_, _| {
                    fired.set(fired.get() + 1);
                    Ok(())
                })
                .unwrap()
        };

        session.ingest(b"000000^done\n").unwrap();
        assert!(!session.commands.contains(token));
        // duplicate result for the same token is a no-op
        session.ingest(b"000000^done\n").unwrap();
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn test_outstanding_commands_abandoned_on_process_exit() {
        let (mut session, state, _sink) = sink_session();
        let fired = Rc::new(Cell::new(0));

        for _ in 0..2 {
            let fired = Rc::clone(&fired);
            session
                .dispatch_command("-thread-info".to_string(), Persistence::OneShot, move |_, _| {
                    fired.set(fired.get() + 1);
                    Ok(())
                })
                .unwrap();
        }

        session.child_exited();

        // abandoned, not failed: completions never ran
        assert_eq!(fired.get(), 0);
        assert!(session.commands.is_empty());
        assert_eq!(session.status(), ExecutionStatus::Terminated);
        assert_eq!(state.exits.borrow().len(), 1);
    }

    #[test]
    fn test_write_failure_is_session_fatal() {
        let (mut session, state, _sink) = sink_session();
        session.stdin = Some(Box::new(BrokenPipe));

        let err = session.run().unwrap_err();
        assert!(matches!(err, Error::CommandWrite(_)));
        assert!(err.is_fatal());
        assert_eq!(session.status(), ExecutionStatus::Terminated);
        assert!(session.commands.is_empty());
        assert_eq!(state.exits.borrow().len(), 1);
    }

    #[test]
    fn test_undecodable_line_surfaces_as_log_text() {
        let (mut session, state, _sink) = sink_session();
        session.ingest(b"Reading symbols from /bin/ls...\n").unwrap();

        let streams = state.streams.borrow();
        assert!(streams
            .iter()
            .any(|(kind, text)| *kind == StreamKind::Log && text.contains("Reading symbols")));
    }

    #[test]
    fn test_command_echo_surfaces_as_stream_text() {
        let (mut session, state, _sink) = sink_session();
        session.run().unwrap();

        let streams = state.streams.borrow();
        assert_eq!(
            streams.as_slice(),
            &[(StreamKind::Log, "Command:000000-exec-run\n".to_string())]
        );
    }

    #[test]
    fn test_breakpoint_deleted_notification() {
        let (mut session, state, _sink) = sink_session();
        session.breakpoints = vec![
            Breakpoint { number: 1, file: "a.c".to_string(), line: 1, enabled: true },
            Breakpoint { number: 2, file: "a.c".to_string(), line: 2, enabled: true },
        ];

        session.ingest(b"=breakpoint-deleted,id=\"1\"\n").unwrap();
        assert_eq!(session.all_breakpoints().len(), 1);
        assert_eq!(session.all_breakpoints()[0].number, 2);
        assert_eq!(state.breakpoint_changes.get(), 1);
    }

    #[test]
    fn test_breakpoint_modified_notification() {
        let (mut session, _state, _sink) = sink_session();
        session.breakpoints = vec![Breakpoint {
            number: 1,
            file: "a.c".to_string(),
            line: 1,
            enabled: true,
        }];

        session
            .ingest(b"=breakpoint-modified,bkpt={number=\"1\",enabled=\"n\",file=\"a.c\",line=\"1\"}\n")
            .unwrap();
        assert!(!session.all_breakpoints()[0].enabled);
    }

    #[test]
    fn test_send_without_process() {
        let state = Rc::new(HookState::default());
        let mut session = Session::new(
            backend::select("gdb").unwrap(),
            SessionConfig::default(),
            RecordingHook(Rc::clone(&state)),
        );
        assert!(matches!(session.run(), Err(Error::ProcessNotStarted)));
    }

    #[test]
    fn test_sync_snapshot_update() {
        let (mut session, state, sink) = sink_session();

        // drive the exchange by hand: dispatch, then feed the result before
        // the wait (the wait is a no-op once the completion ran)
        let command = session.backend.stack_list_frames().unwrap();
        session
            .dispatch_command(
                command,
                Persistence::OneShot,
                |session, record| {
                    let results = session.backend.parse_payload(&record.payload)?;
                    session.stack_frames = session.backend.parse_stack_frames(&results)?;
                    session.hooks.on_snapshot_updated(SnapshotKind::StackFrames);
                    Ok(())
                },
            )
            .unwrap();
        assert_eq!(sink.contents(), "000000-stack-list-frames\n");

        session
            .ingest(b"000000^done,stack=[frame={level=\"0\",func=\"main\",file=\"main.c\",line=\"3\"}]\n")
            .unwrap();

        assert_eq!(session.all_stack_frames().len(), 1);
        assert_eq!(session.all_stack_frames()[0].func.as_deref(), Some("main"));
        assert_eq!(*state.snapshots.borrow(), vec![SnapshotKind::StackFrames]);
    }
}

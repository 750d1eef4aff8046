//! Interactive console on top of the session engine.
//!
//! The readline loop runs on its own thread and forwards every input line to
//! the application loop, which owns the session. Between commands the
//! application loop keeps draining debugger output so asynchronous events
//! surface promptly.

pub mod command;
pub mod hook;

use crate::backend;
use crate::console::command::{BreakpointCommand, BreakpointIdentity, Command, ThreadCommand};
use crate::console::hook::ConsoleHook;
use crate::session::snapshot::StackFrame;
use crate::session::{Error, ExecutionStatus, Session, SessionConfig};
use rustyline::error::ReadlineError;
use rustyline::history::MemHistory;
use rustyline::{Editor, ExternalPrinter};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Once;
use std::thread;
use std::time::Duration;

const WELCOME_TEXT: &str = "midrive greets";
const PROMT: &str = "(mdr) ";

const HELP_TEXT: &str = "\
run, r                      start the debugged program
continue, c                 resume execution
pause                       interrupt execution
next, stepover              step over the current line
step, stepinto              step into function calls
finish, stepout             run until the current function returns
break <file>:<line>, b      set a breakpoint
break remove <num|file|all> remove breakpoints
break info                  list breakpoints
backtrace, bt               print the call stack
vars                        print variables of the current frame
thread info|current         inspect threads
thread switch <num>         switch the current thread
sources                     list source files of the debugged program
kill                        kill the debugged program
quit, q                     exit";

/// Interval between output drains while the prompt is idle.
const PUMP_INTERVAL: Duration = Duration::from_millis(50);
/// How long to wait for the debugger to exit after a polite quit.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

type MdEditor = Editor<(), MemHistory>;

pub struct AppBuilder {
    program: String,
    config: SessionConfig,
}

impl AppBuilder {
    pub fn new(program: String, config: SessionConfig) -> Self {
        Self { program, config }
    }

    pub fn build(self) -> anyhow::Result<TerminalApplication> {
        let mut editor = MdEditor::with_history(rustyline::Config::default(), MemHistory::new())?;
        let hook_printer = editor.create_external_printer()?;
        let loop_printer = editor.create_external_printer()?;

        let backend = backend::select(&self.program)?;
        let mut session = Session::new(backend, self.config, ConsoleHook::new(hook_printer));
        session.launch()?;

        Ok(TerminalApplication {
            session,
            editor,
            printer: Box::new(loop_printer),
        })
    }
}

enum Control {
    /// New command from user received
    Cmd(String),
    /// Terminate application
    Terminate,
}

pub struct TerminalApplication {
    session: Session<ConsoleHook>,
    editor: MdEditor,
    printer: Box<dyn ExternalPrinter>,
}

pub static LOGGER_ONCE: Once = Once::new();

impl TerminalApplication {
    pub fn run(self) -> anyhow::Result<()> {
        LOGGER_ONCE.call_once(|| {
            env_logger::init();
        });

        let TerminalApplication {
            session,
            mut editor,
            printer,
        } = self;

        let (control_tx, control_rx) = mpsc::sync_channel::<Control>(0);
        thread::spawn(move || {
            println!("{WELCOME_TEXT}");
            loop {
                match editor.readline(PROMT) {
                    Ok(input) => {
                        if input == "q" || input == "quit" {
                            _ = control_tx.send(Control::Terminate);
                            break;
                        }
                        _ = editor.add_history_entry(&input);
                        if control_tx.send(Control::Cmd(input)).is_err() {
                            break;
                        }
                    }
                    Err(ReadlineError::Eof | ReadlineError::Interrupted) => {
                        _ = control_tx.send(Control::Terminate);
                        break;
                    }
                    Err(err) => {
                        println!("error: {err:#}");
                        _ = control_tx.send(Control::Terminate);
                        break;
                    }
                }
            }
        });

        let mut app_loop = AppLoop { session, printer };
        app_loop.run(control_rx)
    }
}

struct AppLoop {
    session: Session<ConsoleHook>,
    printer: Box<dyn ExternalPrinter>,
}

impl AppLoop {
    fn run(&mut self, control_rx: Receiver<Control>) -> anyhow::Result<()> {
        loop {
            match control_rx.recv_timeout(PUMP_INTERVAL) {
                Ok(Control::Cmd(input)) => {
                    let input = input.trim();
                    if input.is_empty() {
                        continue;
                    }
                    match Command::parse(input) {
                        Ok(command) => {
                            if let Err(e) = self.handle_command(command) {
                                self.println(format!("error: {e:#}"));
                                if e.is_fatal() {
                                    break;
                                }
                            }
                        }
                        Err(e) => self.println(format!("error: {e}")),
                    }
                }
                Ok(Control::Terminate) => {
                    _ = self.session.quit();
                    _ = self.session.pump_events(SHUTDOWN_GRACE);
                    self.session.terminate();
                    break;
                }
                Err(RecvTimeoutError::Timeout) => {
                    self.session.process_output()?;
                    if self.session.status() == ExecutionStatus::Terminated {
                        break;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        Ok(())
    }

    fn handle_command(&mut self, command: Command) -> Result<(), Error> {
        match command {
            Command::Run => self.session.run()?,
            Command::Continue => self.session.continue_execution()?,
            Command::Pause => self.session.pause()?,
            Command::StepOver => self.session.step_over()?,
            Command::StepInto => self.session.step_into()?,
            Command::StepOut => self.session.step_out()?,
            Command::Kill => self.session.kill()?,
            Command::Breakpoint(command) => match command {
                BreakpointCommand::Add { file, line } => {
                    self.session.insert_breakpoint(&file, line)?;
                }
                BreakpointCommand::Remove(BreakpointIdentity::Number(number)) => {
                    self.session.remove_breakpoint(number)?;
                }
                BreakpointCommand::Remove(BreakpointIdentity::File(file)) => {
                    self.session.remove_breakpoints_in_file(&file)?;
                }
                BreakpointCommand::Remove(BreakpointIdentity::All) => {
                    self.session.remove_all_breakpoints()?;
                }
                BreakpointCommand::Info => {
                    for bp in self.session.all_breakpoints() {
                        let state = if bp.enabled { "enabled" } else { "disabled" };
                        _ = self.printer.print(format!(
                            "breakpoint {} at {}:{} ({state})\n",
                            bp.number, bp.file, bp.line
                        ));
                    }
                }
            },
            Command::PrintBacktrace => {
                self.session.update_stack_frames()?;
                for frame in self.session.all_stack_frames() {
                    let line = render_frame(frame);
                    _ = self.printer.print(line);
                }
            }
            Command::PrintVariables => {
                self.session.update_variables()?;
                for var in self.session.all_variables() {
                    let ty = var.r#type.as_deref().unwrap_or("?");
                    let value = var.value.as_deref().unwrap_or("?");
                    _ = self.printer.print(format!("{} ({ty}) = {value}\n", var.name));
                }
            }
            Command::PrintSources => {
                self.session.update_source_files()?;
                for file in self.session.source_files() {
                    _ = self.printer.print(format!("{file}\n"));
                }
            }
            Command::Thread(command) => match command {
                ThreadCommand::Info => {
                    self.session.update_threads()?;
                    let current = self.session.current_thread();
                    for thread in self.session.all_threads() {
                        let marker = if current == Some(thread.id) { "*" } else { " " };
                        _ = self.printer.print(format!(
                            "{marker}thread #{} {} ({})\n",
                            thread.id,
                            thread.name.as_deref().unwrap_or_default(),
                            thread.state.as_deref().unwrap_or("unknown"),
                        ));
                    }
                }
                ThreadCommand::Current => {
                    let current = self
                        .session
                        .current_thread()
                        .map(|id| format!("thread #{id}"))
                        .unwrap_or_else(|| "unknown".to_string());
                    self.println(current);
                }
                ThreadCommand::Switch(id) => self.session.select_thread(id)?,
            },
            Command::Help { .. } => self.println(HELP_TEXT),
        }
        Ok(())
    }

    fn println(&mut self, text: impl Into<String>) {
        let mut text = text.into();
        text.push('\n');
        _ = self.printer.print(text);
    }
}

fn render_frame(frame: &StackFrame) -> String {
    let func = frame.func.as_deref().unwrap_or("??");
    let place = match (frame.file.as_deref(), frame.line) {
        (Some(file), Some(line)) => format!(" at {file}:{line}"),
        (Some(file), None) => format!(" at {file}"),
        _ => String::new(),
    };
    match frame.address {
        Some(addr) => format!("#{} {:#x} {func}{place}\n", frame.level, addr),
        None => format!("#{} {func}{place}\n", frame.level),
    }
}

use crate::md_debug;
use crate::mi::StreamKind;
use crate::session::snapshot::{Breakpoint, StopReason};
use crate::session::EventHook;
use rustyline::ExternalPrinter;
use std::cell::RefCell;

/// Renders session events into the console above the active prompt.
pub struct ConsoleHook {
    printer: RefCell<Box<dyn ExternalPrinter>>,
}

impl ConsoleHook {
    pub fn new(printer: impl ExternalPrinter + 'static) -> Self {
        Self {
            printer: RefCell::new(Box::new(printer)),
        }
    }

    fn println(&self, text: impl Into<String>) {
        let mut text = text.into();
        text.push('\n');
        _ = self.printer.borrow_mut().print(text);
    }
}

impl EventHook for ConsoleHook {
    fn on_stopped(&self, reason: &StopReason, thread_id: Option<u32>) -> anyhow::Result<()> {
        match thread_id {
            Some(id) => self.println(format!("Stopped: {reason} (thread {id})")),
            None => self.println(format!("Stopped: {reason}")),
        }
        Ok(())
    }

    fn on_running(&self) {
        self.println("Continuing.");
    }

    fn on_process_exit(&self, code: Option<i32>) {
        match code {
            Some(code) => self.println(format!("Debugger exited with code {code}")),
            None => self.println("Debugger exited"),
        }
    }

    fn on_breakpoints_changed(&self, breakpoints: &[Breakpoint]) {
        self.println(format!("{} breakpoint(s) active", breakpoints.len()));
    }

    fn on_stream_text(&self, kind: StreamKind, text: &str) {
        match kind {
            // console and target output go to the user as-is
            StreamKind::Console | StreamKind::Target => {
                _ = self.printer.borrow_mut().print(text.to_string());
            }
            StreamKind::Log => md_debug!(target: "console", "{}", text.trim_end()),
        }
    }

    fn on_command_failed(&self, msg: &str) {
        self.println(format!("error: {msg}"));
    }
}

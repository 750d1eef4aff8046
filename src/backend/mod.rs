//! Capability backends: translators between high-level debugging intents and
//! one debugger family's concrete command syntax.
//!
//! The engine never builds command text or interprets result payloads itself;
//! it asks the active backend. Supporting another MI-speaking debugger (e.g.
//! lldb-mi) means implementing [`Backend`], nothing in the engine changes.

pub mod gdb;

use crate::mi::parser::MiResults;
use crate::session::snapshot::{Breakpoint, StackFrame, StopReason, Thread, Variable};
use crate::session::Error;

/// One debugger family.
///
/// Render methods return the exact command text (without token prefix and
/// trailing newline, those belong to the dispatcher). Every render method
/// defaults to an unsupported-operation error so a family only implements
/// what it actually speaks.
pub trait Backend {
    fn name(&self) -> &'static str;

    /// Default executable of this family.
    fn program(&self) -> &str;

    /// Arguments prepended before the caller-supplied ones at process start.
    fn pre_arguments(&self) -> Vec<String>;

    // ------------------------------ lifecycle ------------------------------

    /// Start the debugged program.
    fn launch(&self) -> Result<String, Error> {
        Err(Error::UnsupportedOperation("launch"))
    }

    /// Ask the debugger itself to exit.
    fn quit(&self) -> Result<String, Error> {
        Err(Error::UnsupportedOperation("quit"))
    }

    /// Kill the debugged program (not the debugger).
    fn kill(&self) -> Result<String, Error> {
        Err(Error::UnsupportedOperation("kill"))
    }

    // ------------------------------ breakpoints ----------------------------

    fn break_insert(&self, file: &str, line: u32) -> Result<String, Error> {
        _ = (file, line);
        Err(Error::UnsupportedOperation("break_insert"))
    }

    fn break_remove(&self, number: u32) -> Result<String, Error> {
        _ = number;
        Err(Error::UnsupportedOperation("break_remove"))
    }

    fn break_remove_all(&self) -> Result<String, Error> {
        Err(Error::UnsupportedOperation("break_remove_all"))
    }

    // ------------------------------ inspection -----------------------------

    fn stack_list_frames(&self) -> Result<String, Error> {
        Err(Error::UnsupportedOperation("stack_list_frames"))
    }

    fn stack_list_variables(&self) -> Result<String, Error> {
        Err(Error::UnsupportedOperation("stack_list_variables"))
    }

    fn thread_info(&self) -> Result<String, Error> {
        Err(Error::UnsupportedOperation("thread_info"))
    }

    fn list_source_files(&self) -> Result<String, Error> {
        Err(Error::UnsupportedOperation("list_source_files"))
    }

    // ------------------------------ execution ------------------------------

    fn exec_pause(&self) -> Result<String, Error> {
        Err(Error::UnsupportedOperation("exec_pause"))
    }

    fn exec_continue(&self) -> Result<String, Error> {
        Err(Error::UnsupportedOperation("exec_continue"))
    }

    fn exec_step_over(&self) -> Result<String, Error> {
        Err(Error::UnsupportedOperation("exec_step_over"))
    }

    fn exec_step_into(&self) -> Result<String, Error> {
        Err(Error::UnsupportedOperation("exec_step_into"))
    }

    fn exec_step_out(&self) -> Result<String, Error> {
        Err(Error::UnsupportedOperation("exec_step_out"))
    }

    fn thread_select(&self, id: u32) -> Result<String, Error> {
        _ = id;
        Err(Error::UnsupportedOperation("thread_select"))
    }

    // ------------------------------ payload parsing ------------------------
    //
    // The engine carries record payloads as raw text; structure is a backend
    // concern because the value grammar differs between families.

    fn parse_payload(&self, payload: &str) -> Result<MiResults, Error>;

    fn parse_breakpoint(&self, results: &MiResults) -> Result<Breakpoint, Error>;

    fn parse_stack_frames(&self, results: &MiResults) -> Result<Vec<StackFrame>, Error>;

    fn parse_variables(&self, results: &MiResults) -> Result<Vec<Variable>, Error>;

    /// Thread list plus the debugger-reported current thread id.
    fn parse_threads(&self, results: &MiResults) -> Result<(Vec<Thread>, Option<u32>), Error>;

    fn parse_source_files(&self, results: &MiResults) -> Result<Vec<String>, Error>;

    /// Reason and thread id of a `stopped` execution notification.
    fn parse_stop_reason(&self, results: &MiResults) -> (StopReason, Option<u32>);

    /// Human-readable message of an `error` result.
    fn parse_error_message(&self, results: &MiResults) -> String;
}

/// Pick a backend by the requested debugger program name.
pub fn select(program: &str) -> Result<Box<dyn Backend>, Error> {
    if program.contains("gdb") {
        Ok(Box::new(gdb::GdbMi))
    } else {
        Err(Error::UnknownDebuggerFamily(program.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_by_program_name() {
        assert_eq!(select("gdb").unwrap().name(), "gdb");
        assert_eq!(select("/usr/bin/gdb-multiarch").unwrap().name(), "gdb");
        assert!(matches!(
            select("windbg"),
            Err(Error::UnknownDebuggerFamily(_))
        ));
    }
}

//! GDB implementation of the [`Backend`] contract (the `-interpreter=mi`
//! command set and value grammar).

use super::Backend;
use crate::mi::parser::{self, MiResults, MiValue};
use crate::mi::DecodeError;
use crate::session::snapshot::{Breakpoint, StackFrame, StopReason, Thread, Variable};
use crate::session::Error;

pub struct GdbMi;

impl GdbMi {
    fn missing(what: &str) -> Error {
        Error::Decode(DecodeError::Payload(format!("`{what}` missing in payload")))
    }
}

/// A list entry that is either a bare tuple or a named result wrapping one
/// (gdb emits `stack=[frame={...},...]` but `variables=[{...},...]`).
fn tuple_of(entry: &MiValue, name: &str) -> Option<MiResults> {
    let tuple = entry.as_tuple()?;
    match tuple.get(name) {
        Some(inner) => inner.as_tuple().cloned(),
        None => Some(tuple.clone()),
    }
}

fn parse_address(addr: &str) -> Option<u64> {
    let addr = addr.strip_prefix("0x").or_else(|| addr.strip_prefix("0X"))?;
    u64::from_str_radix(addr, 16).ok()
}

impl Backend for GdbMi {
    fn name(&self) -> &'static str {
        "gdb"
    }

    fn program(&self) -> &str {
        "gdb"
    }

    fn pre_arguments(&self) -> Vec<String> {
        vec!["-interpreter=mi".to_string(), "-quiet".to_string()]
    }

    fn launch(&self) -> Result<String, Error> {
        Ok("-exec-run".to_string())
    }

    fn quit(&self) -> Result<String, Error> {
        Ok("-gdb-exit".to_string())
    }

    fn kill(&self) -> Result<String, Error> {
        Ok("kill".to_string())
    }

    fn break_insert(&self, file: &str, line: u32) -> Result<String, Error> {
        Ok(format!("-break-insert {file}:{line}"))
    }

    fn break_remove(&self, number: u32) -> Result<String, Error> {
        Ok(format!("-break-delete {number}"))
    }

    fn break_remove_all(&self) -> Result<String, Error> {
        // without arguments gdb deletes all breakpoints
        Ok("-break-delete".to_string())
    }

    fn stack_list_frames(&self) -> Result<String, Error> {
        Ok("-stack-list-frames".to_string())
    }

    fn stack_list_variables(&self) -> Result<String, Error> {
        Ok("-stack-list-variables --all-values".to_string())
    }

    fn thread_info(&self) -> Result<String, Error> {
        Ok("-thread-info".to_string())
    }

    fn list_source_files(&self) -> Result<String, Error> {
        Ok("-file-list-exec-source-files".to_string())
    }

    fn exec_pause(&self) -> Result<String, Error> {
        Ok("-exec-interrupt".to_string())
    }

    fn exec_continue(&self) -> Result<String, Error> {
        Ok("-exec-continue".to_string())
    }

    fn exec_step_over(&self) -> Result<String, Error> {
        Ok("-exec-next".to_string())
    }

    fn exec_step_into(&self) -> Result<String, Error> {
        Ok("-exec-step".to_string())
    }

    fn exec_step_out(&self) -> Result<String, Error> {
        Ok("-exec-finish".to_string())
    }

    fn thread_select(&self, id: u32) -> Result<String, Error> {
        Ok(format!("-thread-select {id}"))
    }

    fn parse_payload(&self, payload: &str) -> Result<MiResults, Error> {
        Ok(parser::parse_results(payload)?)
    }

    fn parse_breakpoint(&self, results: &MiResults) -> Result<Breakpoint, Error> {
        let bkpt = results
            .get("bkpt")
            .and_then(MiValue::as_tuple)
            .ok_or_else(|| Self::missing("bkpt"))?;
        Ok(Breakpoint {
            number: bkpt.get_u32("number").ok_or_else(|| Self::missing("bkpt.number"))?,
            file: bkpt
                .get_str("file")
                .or_else(|| bkpt.get_str("fullname"))
                .ok_or_else(|| Self::missing("bkpt.file"))?
                .to_string(),
            line: bkpt.get_u32("line").ok_or_else(|| Self::missing("bkpt.line"))?,
            enabled: bkpt.get_str("enabled").map(|e| e == "y").unwrap_or(true),
        })
    }

    fn parse_stack_frames(&self, results: &MiResults) -> Result<Vec<StackFrame>, Error> {
        let stack = results
            .get("stack")
            .and_then(MiValue::as_list)
            .ok_or_else(|| Self::missing("stack"))?;

        let mut frames = Vec::with_capacity(stack.len());
        for entry in stack {
            let Some(frame) = tuple_of(entry, "frame") else {
                continue;
            };
            frames.push(StackFrame {
                level: frame.get_u32("level").unwrap_or(frames.len() as u32),
                func: frame.get_str("func").map(ToString::to_string),
                file: frame.get_str("file").map(ToString::to_string),
                line: frame.get_u32("line"),
                address: frame.get_str("addr").and_then(parse_address),
            });
        }
        Ok(frames)
    }

    fn parse_variables(&self, results: &MiResults) -> Result<Vec<Variable>, Error> {
        let variables = results
            .get("variables")
            .and_then(MiValue::as_list)
            .ok_or_else(|| Self::missing("variables"))?;

        Ok(variables
            .iter()
            .filter_map(|entry| {
                let var = tuple_of(entry, "variable")?;
                Some(Variable {
                    name: var.get_str("name")?.to_string(),
                    value: var.get_str("value").map(ToString::to_string),
                    r#type: var.get_str("type").map(ToString::to_string),
                })
            })
            .collect())
    }

    fn parse_threads(&self, results: &MiResults) -> Result<(Vec<Thread>, Option<u32>), Error> {
        let threads = results
            .get("threads")
            .and_then(MiValue::as_list)
            .ok_or_else(|| Self::missing("threads"))?;

        let threads = threads
            .iter()
            .filter_map(|entry| {
                let thread = tuple_of(entry, "thread")?;
                Some(Thread {
                    id: thread.get_u32("id")?,
                    target_id: thread.get_str("target-id").map(ToString::to_string),
                    name: thread.get_str("name").map(ToString::to_string),
                    state: thread.get_str("state").map(ToString::to_string),
                })
            })
            .collect();
        Ok((threads, results.get_u32("current-thread-id")))
    }

    fn parse_source_files(&self, results: &MiResults) -> Result<Vec<String>, Error> {
        let files = results
            .get("files")
            .and_then(MiValue::as_list)
            .ok_or_else(|| Self::missing("files"))?;

        Ok(files
            .iter()
            .filter_map(|entry| {
                let file = tuple_of(entry, "file")?;
                file.get_str("fullname")
                    .or_else(|| file.get_str("file"))
                    .map(ToString::to_string)
            })
            .collect())
    }

    fn parse_stop_reason(&self, results: &MiResults) -> (StopReason, Option<u32>) {
        let reason = results
            .get_str("reason")
            .map(StopReason::from_wire)
            .unwrap_or_else(|| StopReason::Other("stopped".to_string()));
        (reason, results.get_u32("thread-id"))
    }

    fn parse_error_message(&self, results: &MiResults) -> String {
        results
            .get_str("msg")
            .unwrap_or("unknown error")
            .to_string()
    }
}

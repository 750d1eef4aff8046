//! Read-only mirrors of debugger-side state.
//!
//! List snapshots (frames, threads, variables, source files) are replaced
//! wholesale each time the corresponding list command completes; they are
//! never merged with previous content. The breakpoint set is the single
//! authoritative source for breakpoints, mutated only by command results and
//! asynchronous breakpoint notifications.

use std::str::FromStr;
use strum_macros::EnumString;

/// A breakpoint known to the debugger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breakpoint {
    /// Debugger-assigned breakpoint number.
    pub number: u32,
    pub file: String,
    pub line: u32,
    pub enabled: bool,
}

/// One frame of the current thread's call stack.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StackFrame {
    pub level: u32,
    pub func: Option<String>,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub address: Option<u64>,
}

/// A thread of the debugged program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thread {
    pub id: u32,
    pub target_id: Option<String>,
    pub name: Option<String>,
    pub state: Option<String>,
}

/// A variable visible in the current frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub value: Option<String>,
    pub r#type: Option<String>,
}

/// Which snapshot a completed list command replaced.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SnapshotKind {
    StackFrames,
    Variables,
    Threads,
    SourceFiles,
}

/// Reason reported by a `stopped` execution notification.
#[derive(Debug, Clone, PartialEq, Eq, EnumString)]
pub enum StopReason {
    #[strum(serialize = "breakpoint-hit")]
    BreakpointHit,
    #[strum(serialize = "watchpoint-trigger")]
    WatchpointTrigger,
    #[strum(serialize = "end-stepping-range")]
    EndSteppingRange,
    #[strum(serialize = "function-finished")]
    FunctionFinished,
    #[strum(serialize = "location-reached")]
    LocationReached,
    #[strum(serialize = "signal-received")]
    SignalReceived,
    #[strum(serialize = "exited-normally")]
    ExitedNormally,
    #[strum(serialize = "exited")]
    Exited,
    #[strum(default)]
    Other(String),
}

impl StopReason {
    pub fn from_wire(reason: &str) -> Self {
        // infallible thanks to the default variant
        StopReason::from_str(reason).unwrap_or_else(|_| StopReason::Other(reason.to_string()))
    }
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::BreakpointHit => f.write_str("breakpoint hit"),
            StopReason::WatchpointTrigger => f.write_str("watchpoint triggered"),
            StopReason::EndSteppingRange => f.write_str("step complete"),
            StopReason::FunctionFinished => f.write_str("function finished"),
            StopReason::LocationReached => f.write_str("location reached"),
            StopReason::SignalReceived => f.write_str("signal received"),
            StopReason::ExitedNormally => f.write_str("program exited normally"),
            StopReason::Exited => f.write_str("program exited"),
            StopReason::Other(reason) => f.write_str(reason),
        }
    }
}

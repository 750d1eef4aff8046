use crate::mi::DecodeError;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // --------------------------------- generic errors --------------------------------------------
    #[error("debugger already run")]
    AlreadyRun,
    #[error("debugger process is not started")]
    ProcessNotStarted,
    #[error(transparent)]
    IO(#[from] std::io::Error),

    // --------------------------------- process errors --------------------------------------------
    #[error("debugger executable `{0}` not found")]
    DebuggerNotFound(String),
    #[error("write to debugger stdin: {0}")]
    CommandWrite(std::io::Error),
    #[error("session terminated")]
    Terminated,

    // --------------------------------- protocol errors -------------------------------------------
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("no response within {0:?}")]
    ResponseTimeout(Duration),

    // --------------------------------- backend errors --------------------------------------------
    #[error("unsupported debugger family: {0}")]
    UnknownDebuggerFamily(String),
    #[error("operation `{0}` is unsupported by this debugger")]
    UnsupportedOperation(&'static str),

    // --------------------------------- third party errors ----------------------------------------
    #[error("hook: {0}")]
    Hook(anyhow::Error),
}

impl Error {
    /// Return a hint to an interface - continue debugging after error or stop whole session.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::AlreadyRun => false,
            Error::ProcessNotStarted => false,
            Error::Decode(_) => false,
            Error::ResponseTimeout(_) => false,
            Error::UnknownDebuggerFamily(_) => false,
            Error::UnsupportedOperation(_) => false,
            Error::Hook(_) => false,

            // currently fatal errors
            Error::IO(_) => true,
            Error::DebuggerNotFound(_) => true,
            Error::CommandWrite(_) => true,
            Error::Terminated => true,
        }
    }
}

#[macro_export]
macro_rules! _error {
    ($log_fn: path, $res: expr) => {
        match $res {
            Ok(value) => Some(value),
            Err(e) => {
                $log_fn!("{:#}", e);
                None
            }
        }
    };
    ($log_fn: path, $res: expr, $msg: tt) => {
        match $res {
            Ok(value) => Some(value),
            Err(e) => {
                $log_fn!(concat!($msg, " {:#}"), e);
                None
            }
        }
    };
}

/// Transforms `Result` into `Option` and logs an error if it occurs.
#[macro_export]
macro_rules! weak_error {
    ($res: expr) => {
        $crate::_error!(log::warn, $res)
    };
    ($res: expr, $msg: tt) => {
        $crate::_error!(log::warn, $res, $msg)
    };
}

/// Transforms `Result` into `Option` and put error into debug logs if it occurs.
#[macro_export]
macro_rules! muted_error {
    ($res: expr) => {
        $crate::_error!(log::debug, $res)
    };
    ($res: expr, $msg: tt) => {
        $crate::_error!(log::debug, $res, $msg)
    };
}

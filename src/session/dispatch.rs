//! Token allocation and the outstanding-command table.
//!
//! Every command written to the debugger gets the next token; commands that
//! expect a result register a completion under that token. The table lives on
//! the session's control thread only, so it needs no locking.

use super::{Error, EventHook, Session};
use crate::mi::{ResultRecord, Token, TOKEN_MODULUS};
use std::collections::HashMap;

/// Monotonic token source, wrapping at [`TOKEN_MODULUS`].
///
/// Reset to zero on every debugger process start: tokens are only meaningful
/// within one process lifetime.
#[derive(Debug, Default)]
pub struct TokenGenerator {
    next: Token,
}

impl TokenGenerator {
    pub fn next(&mut self) -> Token {
        let token = self.next;
        self.next = (token + 1) % TOKEN_MODULUS;
        token
    }

    pub fn reset(&mut self) {
        self.next = 0;
    }
}

/// How long a completion stays registered.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Persistence {
    /// Removed right after the first matching result.
    OneShot,
    /// Fires on every matching result until session teardown (polling-style
    /// commands).
    Persistent,
}

pub(super) type Completion<H> =
    Box<dyn FnMut(&mut Session<H>, &ResultRecord) -> Result<(), Error>>;

pub(super) struct OutstandingCommand<H: EventHook> {
    pub handler: Completion<H>,
    pub persistence: Persistence,
}

/// Outstanding commands keyed by token.
pub(super) struct CommandTable<H: EventHook> {
    table: HashMap<Token, OutstandingCommand<H>>,
}

impl<H: EventHook> Default for CommandTable<H> {
    fn default() -> Self {
        Self {
            table: HashMap::new(),
        }
    }
}

impl<H: EventHook> CommandTable<H> {
    pub fn register(&mut self, token: Token, command: OutstandingCommand<H>) {
        let prev = self.table.insert(token, command);
        debug_assert!(prev.is_none(), "token {token} reused while outstanding");
    }

    /// Remove and return the entry for `token`. Persistent entries are put
    /// back by the caller after their completion ran.
    pub fn take(&mut self, token: Token) -> Option<OutstandingCommand<H>> {
        self.table.remove(&token)
    }

    pub fn restore(&mut self, token: Token, command: OutstandingCommand<H>) {
        self.table.insert(token, command);
    }

    pub fn contains(&self, token: Token) -> bool {
        self.table.contains_key(&token)
    }

    /// Discard all entries without invoking them (the "abandoned" outcome on
    /// process death). Returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let abandoned = self.table.len();
        self.table.clear();
        abandoned
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

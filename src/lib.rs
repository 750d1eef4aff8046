pub mod backend;
pub mod config;
pub mod console;
pub mod log;
pub mod mi;
pub mod session;

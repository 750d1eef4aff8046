use clap::Parser;
use midrive::config::FileConfig;
use midrive::console::AppBuilder;
use midrive::session::{SessionConfig, DEFAULT_RESPONSE_TIMEOUT};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Debugger executable (a gdb-family MI debugger)
    #[arg(short, long, env = "MDR_DEBUGGER")]
    debugger: Option<String>,

    /// Upper bound for synchronous command waits, in milliseconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Path to an alternative configuration file
    #[arg(long)]
    config: Option<String>,

    /// Suppress internal logs
    #[arg(short, long)]
    quiet: bool,

    /// Program to debug
    debugee: String,

    /// Extra arguments passed to the debugger
    args: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.quiet {
        midrive::log::disable();
    }

    let file_config = FileConfig::from_file(args.config.as_deref()).unwrap_or_default();
    let debugger = args
        .debugger
        .or(file_config.debugger.clone())
        .unwrap_or_else(|| "gdb".to_string());
    let timeout = args
        .timeout
        .map(Duration::from_millis)
        .or_else(|| file_config.timeout())
        .unwrap_or(DEFAULT_RESPONSE_TIMEOUT);

    let mut arguments = vec![args.debugee];
    arguments.extend(args.args);

    let config = SessionConfig {
        debugger_program: Some(debugger.clone()),
        arguments,
        response_timeout: timeout,
    };

    let app = AppBuilder::new(debugger, config).build()?;
    app.run()
}

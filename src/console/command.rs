//! Console command grammar.

use anyhow::anyhow;
use chumsky::error::Rich;
use chumsky::prelude::{any, choice, end, just};
use chumsky::text::Char;
use chumsky::{extra, text, Boxed, Parser};

pub const RUN_COMMAND: &str = "run";
pub const RUN_COMMAND_SHORT: &str = "r";
pub const CONTINUE_COMMAND: &str = "continue";
pub const CONTINUE_COMMAND_SHORT: &str = "c";
pub const PAUSE_COMMAND: &str = "pause";
pub const STEP_INTO_COMMAND: &str = "stepinto";
pub const STEP_INTO_COMMAND_SHORT: &str = "step";
pub const STEP_OUT_COMMAND: &str = "stepout";
pub const STEP_OUT_COMMAND_SHORT: &str = "finish";
pub const STEP_OVER_COMMAND: &str = "stepover";
pub const STEP_OVER_COMMAND_SHORT: &str = "next";
pub const BREAK_COMMAND: &str = "break";
pub const BREAK_COMMAND_SHORT: &str = "b";
pub const BREAK_COMMAND_REMOVE_SUBCOMMAND: &str = "remove";
pub const BREAK_COMMAND_REMOVE_SUBCOMMAND_SHORT: &str = "r";
pub const BREAK_COMMAND_INFO_SUBCOMMAND: &str = "info";
pub const BACKTRACE_COMMAND: &str = "backtrace";
pub const BACKTRACE_COMMAND_SHORT: &str = "bt";
pub const VAR_COMMAND: &str = "vars";
pub const THREAD_COMMAND: &str = "thread";
pub const THREAD_COMMAND_INFO_SUBCOMMAND: &str = "info";
pub const THREAD_COMMAND_CURRENT_SUBCOMMAND: &str = "current";
pub const THREAD_COMMAND_SWITCH_SUBCOMMAND: &str = "switch";
pub const SOURCES_COMMAND: &str = "sources";
pub const KILL_COMMAND: &str = "kill";
pub const HELP_COMMAND: &str = "help";
pub const HELP_COMMAND_SHORT: &str = "h";

type Err<'a> = extra::Err<Rich<'a, char>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BreakpointIdentity {
    Number(u32),
    File(String),
    All,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BreakpointCommand {
    Add { file: String, line: u32 },
    Remove(BreakpointIdentity),
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadCommand {
    Info,
    Current,
    Switch(u32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Run,
    Continue,
    Pause,
    StepInto,
    StepOut,
    StepOver,
    Breakpoint(BreakpointCommand),
    PrintBacktrace,
    PrintVariables,
    PrintSources,
    Thread(ThreadCommand),
    Kill,
    Help { command: Option<String> },
}

fn brkpt_at_line<'a>() -> impl Parser<'a, &'a str, BreakpointCommand, Err<'a>> {
    any()
        .filter(|c: &char| c.to_char() != ':')
        .repeated()
        .to_slice()
        .then_ignore(just(':'))
        .then(text::int(10).from_str().unwrapped())
        .map(|(file, line): (&str, u32)| BreakpointCommand::Add {
            file: file.trim().to_string(),
            line,
        })
        .padded()
}

fn brkpt_number<'a>() -> impl Parser<'a, &'a str, BreakpointIdentity, Err<'a>> {
    text::int(10)
        .from_str()
        .unwrapped()
        .map(BreakpointIdentity::Number)
        .padded()
}

fn brkpt_file<'a>() -> impl Parser<'a, &'a str, BreakpointIdentity, Err<'a>> {
    any()
        .repeated()
        .to_slice()
        .map(|file: &str| BreakpointIdentity::File(file.trim().to_string()))
}

fn command<'a, I>(ctx: &'static str, inner: I) -> Boxed<'a, 'a, &'a str, Command, Err<'a>>
where
    I: Parser<'a, &'a str, Command, Err<'a>> + 'a,
{
    inner.then_ignore(end()).labelled(ctx).boxed()
}

impl Command {
    /// Parse input string into command.
    pub fn parse(input: &str) -> anyhow::Result<Command> {
        Self::parser()
            .parse(input)
            .into_result()
            .map_err(|e| anyhow!("{}", e[0]))
    }

    fn parser<'a>() -> impl Parser<'a, &'a str, Command, Err<'a>> {
        let op = |sym| just(sym).padded();
        let op2 = |full, short| op(full).or(op(short));

        let run = command(RUN_COMMAND, op2(RUN_COMMAND, RUN_COMMAND_SHORT).to(Command::Run));
        let r#continue = command(
            CONTINUE_COMMAND,
            op2(CONTINUE_COMMAND, CONTINUE_COMMAND_SHORT).to(Command::Continue),
        );
        let pause = command(PAUSE_COMMAND, op(PAUSE_COMMAND).to(Command::Pause));
        let step_into = command(
            STEP_INTO_COMMAND,
            op2(STEP_INTO_COMMAND, STEP_INTO_COMMAND_SHORT).to(Command::StepInto),
        );
        let step_out = command(
            STEP_OUT_COMMAND,
            op2(STEP_OUT_COMMAND, STEP_OUT_COMMAND_SHORT).to(Command::StepOut),
        );
        let step_over = command(
            STEP_OVER_COMMAND,
            op2(STEP_OVER_COMMAND, STEP_OVER_COMMAND_SHORT).to(Command::StepOver),
        );

        let r#break = command(
            BREAK_COMMAND,
            op2(BREAK_COMMAND, BREAK_COMMAND_SHORT).ignore_then(choice((
                op2(
                    BREAK_COMMAND_REMOVE_SUBCOMMAND,
                    BREAK_COMMAND_REMOVE_SUBCOMMAND_SHORT,
                )
                .ignore_then(choice((
                    op("all").then_ignore(end()).to(BreakpointIdentity::All),
                    brkpt_number(),
                    brkpt_file(),
                )))
                .map(|brkpt| Command::Breakpoint(BreakpointCommand::Remove(brkpt))),
                op(BREAK_COMMAND_INFO_SUBCOMMAND)
                    .to(Command::Breakpoint(BreakpointCommand::Info)),
                brkpt_at_line().map(Command::Breakpoint),
            ))),
        );

        let backtrace = command(
            BACKTRACE_COMMAND,
            op2(BACKTRACE_COMMAND, BACKTRACE_COMMAND_SHORT).to(Command::PrintBacktrace),
        );
        let vars = command(VAR_COMMAND, op(VAR_COMMAND).to(Command::PrintVariables));
        let sources = command(SOURCES_COMMAND, op(SOURCES_COMMAND).to(Command::PrintSources));

        let thread = command(
            THREAD_COMMAND,
            op(THREAD_COMMAND).ignore_then(choice((
                op(THREAD_COMMAND_INFO_SUBCOMMAND).to(Command::Thread(ThreadCommand::Info)),
                op(THREAD_COMMAND_CURRENT_SUBCOMMAND).to(Command::Thread(ThreadCommand::Current)),
                op(THREAD_COMMAND_SWITCH_SUBCOMMAND)
                    .ignore_then(text::int(10).from_str().unwrapped().padded())
                    .map(|id| Command::Thread(ThreadCommand::Switch(id))),
            ))),
        );

        let kill = command(KILL_COMMAND, op(KILL_COMMAND).to(Command::Kill));

        let help = command(
            HELP_COMMAND,
            op2(HELP_COMMAND, HELP_COMMAND_SHORT)
                .ignore_then(text::ident().padded().or_not())
                .map(|command| Command::Help {
                    command: command.map(ToOwned::to_owned),
                }),
        );

        choice((
            r#continue, run, step_into, step_out, step_over, pause, r#break, backtrace, vars,
            sources, thread, kill, help,
        ))
    }
}

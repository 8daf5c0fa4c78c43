//! Agent state machine CLI.
//!
//! Every command is a short-lived invocation against `.asm/` in the current
//! directory. Results are printed to stdout as one JSON object; diagnostics go
//! to stderr (see `RUST_LOG`).

use std::io::Read;

use anyhow::{Context, Result};
use asm::error::AsmError;
use asm::{conversation, delegate, exit_codes, logging, permission_check, session, transition};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::{Value, json};

#[derive(Parser)]
#[command(
    name = "asm",
    version,
    about = "Event-sourced agent state machine for multi-agent sessions"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create or re-point to a session and record its initialization.
    Init {
        /// Session directory name under `.asm/` (default: `<prefix>_<timestamp>`).
        #[arg(long)]
        name: Option<String>,
        /// Operating mode recorded with the initialization (e.g. `orchestrator`).
        #[arg(long)]
        mode: Option<String>,
    },
    /// Replay the log and print current state, workspace and permissions.
    Status,
    /// Record a transition into `state` (BASH, MAIN, or any agent name).
    Transition {
        state: String,
        /// Free-text reason recorded with the transition.
        trigger: Option<String>,
    },
    /// Start the next conversation and create its workspace.
    ConvStart,
    /// End the active conversation and append its summary to the index.
    ConvEnd {
        /// Summary words (joined with spaces).
        summary: Vec<String>,
    },
    /// Append a conversation summary read as JSON from stdin.
    Log,
    /// List ended conversations from the index.
    History,
    /// Prepare delegation parameters pinning `agent` to the active workspace.
    Delegate {
        agent: String,
        #[arg(required = true)]
        task: Vec<String>,
    },
    /// Check whether the current state may write `file`.
    CanWrite { file: String },
    /// Check whether the current state may execute `verb`.
    CanExec { verb: String },
}

fn main() {
    logging::init();
    let cli = Cli::parse();
    match run(cli) {
        Ok(output) => {
            print_json(&output);
            std::process::exit(exit_codes::OK);
        }
        Err(err) => {
            let (kind, code) = match err.downcast_ref::<AsmError>() {
                Some(asm_err) => (asm_err.kind(), asm_err.exit_code()),
                None => ("error", exit_codes::INVALID),
            };
            let mut output = json!({
                "status": "error",
                "kind": kind,
                "message": format!("{err:#}"),
            });
            if let Some(AsmError::PartialCompletion {
                failed, completed, ..
            }) = err.downcast_ref::<AsmError>()
            {
                output["failed_step"] = json!(failed);
                output["completed_steps"] = json!(completed);
            }
            print_json(&output);
            std::process::exit(code);
        }
    }
}

fn run(cli: Cli) -> Result<Value> {
    let cwd = std::env::current_dir().context("resolve current directory")?;
    let cwd = cwd.as_path();
    match cli.command {
        Command::Init { name, mode } => success(&session::initialize(
            cwd,
            &session::InitOptions { name, mode },
        )?),
        Command::Status => success(&session::status(cwd)?),
        Command::Transition { state, trigger } => success(&transition::transition(
            cwd,
            &state,
            trigger.as_deref().unwrap_or(""),
        )?),
        Command::ConvStart => success(&conversation::start_conversation(cwd)?),
        Command::ConvEnd { summary } => {
            success(&conversation::end_conversation(cwd, &summary.join(" "))?)
        }
        Command::Log => cmd_log(),
        Command::History => success(&conversation::history(cwd)?),
        Command::Delegate { agent, task } => {
            success(&delegate::delegate(cwd, &agent, &task.join(" "))?)
        }
        Command::CanWrite { file } => success(&permission_check::check_write(cwd, &file)?),
        Command::CanExec { verb } => success(&permission_check::check_execute(cwd, &verb)?),
    }
}

fn cmd_log() -> Result<Value> {
    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("read log request from stdin")?;
    if input.trim().is_empty() {
        return Err(AsmError::InvalidInput(
            "expected a JSON log request on stdin: {\"session_path\": ..., \"conversation_data\": {...}}"
                .to_string(),
        )
        .into());
    }
    success(&conversation::log_conversation(&input)?)
}

/// Serialize `outcome` and tag it with `"status": "success"`.
fn success<T: Serialize>(outcome: &T) -> Result<Value> {
    let mut value = serde_json::to_value(outcome).context("serialize result")?;
    if let Value::Object(map) = &mut value {
        map.insert("status".to_string(), Value::String("success".to_string()));
    }
    Ok(value)
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(err) => eprintln!("failed to render output: {err}"),
    }
}

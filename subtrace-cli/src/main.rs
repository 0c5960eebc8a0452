use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use subtrace_core::{
    DEFAULT_MIN_TOOL_MS, DEFAULT_ROOT_LIMIT, RootFilter, TracePaths, render_latest_text,
    render_root_debug, render_root_tree, render_roots_text, resolve_latest_root, resolve_roots,
    to_raw_json,
};

#[derive(Debug, Parser)]
#[command(
    name = "subtrace",
    version,
    about = "Find and debug nested subagent invocations in the subagent trace log"
)]
struct Cli {
    /// Path to the trace JSONL (default: $PI_CODING_AGENT_DIR/logs/subagent-trace.jsonl, or ~/.pi/agent/logs/subagent-trace.jsonl)
    #[arg(long, global = true)]
    trace: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List recent root invocations
    Roots {
        /// Max rows
        #[arg(long, default_value_t = DEFAULT_ROOT_LIMIT)]
        limit: usize,

        /// Filter by root agent (case-insensitive substring)
        #[arg(long)]
        agent: Option<String>,

        /// Output raw JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show the latest root invocation
    Latest {
        /// Filter by root agent (case-insensitive substring)
        #[arg(long)]
        agent: Option<String>,

        /// Print only the root invocation id
        #[arg(long, conflicts_with = "json")]
        id_only: bool,

        /// Output raw JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print the invocation tree for one root
    Tree {
        /// Root invocation id
        root: String,

        /// Include subagent_run_end rows
        #[arg(long)]
        runs: bool,
    },

    /// Tree plus failures and bottlenecks
    Debug {
        /// Root invocation id
        root: String,

        /// Slow tool threshold in milliseconds
        #[arg(long, default_value_t = DEFAULT_MIN_TOOL_MS)]
        min_tool_ms: i64,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> subtrace_core::Result<()> {
    let trace = match cli.trace {
        Some(path) => path,
        None => TracePaths::from_env_or_home()?.trace_file(),
    };
    log::debug!("reading trace {}", trace.display());

    match cli.command {
        Command::Roots { limit, agent, json } => {
            let filter = RootFilter {
                agent,
                limit: Some(limit),
            };
            let listing = resolve_roots(&trace, &filter)?;
            if json {
                println!("{}", to_raw_json(&listing.rows)?);
            } else {
                print!("{}", render_roots_text(&listing));
            }
        }
        Command::Latest {
            agent,
            id_only,
            json,
        } => {
            let root = resolve_latest_root(&trace, agent.as_deref())?;
            if id_only {
                println!("{}", root.root_id);
            } else if json {
                println!("{}", to_raw_json(&root)?);
            } else {
                print!("{}", render_latest_text(&root));
            }
        }
        Command::Tree { root, runs } => {
            print!("{}", render_root_tree(&trace, &root, runs)?);
        }
        Command::Debug { root, min_tool_ms } => {
            print!("{}", render_root_debug(&trace, &root, min_tool_ms)?);
        }
    }

    Ok(())
}

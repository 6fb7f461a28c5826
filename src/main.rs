/*!
Main binary for mongrep.
*/

mod commands;

use anyhow::{Context, Result};
use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use serde_json::Value;
use std::{
    fs,
    io::{self, IsTerminal, Read, Write},
    path::PathBuf,
};

use mongrep::{
    expr::EvalLimits,
    formats::{InputFormat, parse_documents},
    matcher::{LogObserver, Matcher},
    utils::{OutputStyle, write_match},
};

/// Print the documents of a collection that match MongoDB-style criteria.
#[derive(Parser)]
#[command(name = "mg", version, about, arg_required_else_help = true, long_about = None, disable_help_subcommand = true)]
struct Args {
    /// Optional subcommands
    #[command(subcommand)]
    command: Option<Commands>,
    /// Criteria as a JSON object (e.g., '{"age": {"$gte": 18}}')
    criteria: Option<String>,
    #[arg(value_name = "FILE")]
    /// Optional path to the input collection. If omitted, reads from STDIN
    input: Option<PathBuf>,
    /// Input format. Inferred from the file extension if omitted, else JSON
    #[arg(short, long, value_enum)]
    format: Option<InputFormat>,
    /// Do not pretty-print the matched documents, instead use compact
    #[arg(long, action = ArgAction::SetTrue)]
    compact: bool,
    /// Display count of number of matches
    #[arg(long, action = ArgAction::SetTrue)]
    count: bool,
    /// Do not display matched documents
    #[arg(short, long, action = ArgAction::SetTrue)]
    no_display: bool,
    /// Do not print the `#<index>:` header before each matched document
    #[arg(long, action = ArgAction::SetTrue)]
    no_header: bool,
    /// Most expression nodes a `$where` body may evaluate per document
    #[arg(long, value_name = "N")]
    max_where_steps: Option<usize>,
    #[command(flatten)]
    verbose: Verbosity<WarnLevel>,
}

/// Available subcommands for `mg`
#[derive(Subcommand)]
enum Commands {
    #[command(subcommand)]
    /// Generate additional documentation and/or completions
    Generate(GenerateCommand),
}

/// Generate shell completions and man page
#[derive(Subcommand)]
enum GenerateCommand {
    /// Generate shell completions for the given shell to stdout.
    Shell { shell: clap_complete::Shell },
    /// Generate man pages for mg to output directory if specified, else
    /// the current directory.
    Man {
        /// The output directory to write the man pages.
        #[clap(short, long)]
        output_dir: Option<PathBuf>,
    },
}

/// Entry point for main binary.
///
/// This parses the criteria and the input collection, then prints every
/// document that matches. If no file is given, the collection is read from
/// STDIN.
fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.verbose.log_level_filter())
        .init();

    if !io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    match &args.command {
        Some(Commands::Generate(GenerateCommand::Shell { shell })) => {
            commands::generate_completions(
                *shell,
                &mut Args::command(),
                &mut io::stdout().lock(),
            );
            Ok(())
        }
        Some(Commands::Generate(GenerateCommand::Man { output_dir })) => {
            commands::generate_man_pages(&Args::command(), output_dir.clone())?;
            Ok(())
        }
        None => run(&args),
    }
}

fn run(args: &Args) -> Result<()> {
    let criteria: Value = args
        .criteria
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("Criteria required unless using subcommand"))
        .and_then(|text| serde_json::from_str(text).context("Criteria are not valid JSON"))?;

    let limits = EvalLimits {
        max_steps: args
            .max_where_steps
            .unwrap_or_else(|| EvalLimits::default().max_steps),
        ..EvalLimits::default()
    };
    let matcher = Matcher::with_limits(&criteria, limits)
        .context("Failed to parse criteria")?
        .with_observer(LogObserver);

    let format = args
        .format
        .or_else(|| args.input.as_deref().and_then(InputFormat::from_path))
        .unwrap_or_default();

    let bytes = if let Some(path) = &args.input {
        fs::read(path).with_context(|| format!("Failed to read file {}", path.display()))?
    } else {
        if io::stdin().is_terminal() {
            // No piped input and no file specified
            let mut cmd = Args::command();
            return Ok(cmd.print_help()?);
        }
        let mut buffer = vec![];
        io::stdin().read_to_end(&mut buffer)?;
        buffer
    };
    let documents = parse_documents(&bytes, format)?;

    let matched = matcher.find_indexed(&documents);
    log::info!("{} of {} document(s) matched", matched.len(), documents.len());

    let mut out = io::stdout().lock();
    if args.count {
        writeln!(out, "Found matches: {}", matched.len())?;
    }

    if !args.no_display {
        let style = OutputStyle { pretty: !args.compact, show_index: !args.no_header };
        for (index, document) in matched {
            write_match(&mut out, index, document, style)?;
        }
    }

    Ok(())
}

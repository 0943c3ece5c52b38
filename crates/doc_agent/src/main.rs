use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use doc_agent::agent::Agent;
use doc_agent::classifier::Classifier;
use doc_agent::driver::{self, TerminalInteraction, UserInteraction};
use doc_agent::prompts::PackagePrompts;
use doc_agent::sandbox::Sandbox;
use doc_agent::session::{SessionController, SessionMode};
use doc_agent::tools::ToolRegistry;
use doc_agent::transcript::TranscriptRecorder;
use doc_agent::{config, interrupt, package, providers};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "info,doc_agent=info";
const CONFIRM_QUESTION: &str = "Do you want to update the documentation using the AI agent?";

#[derive(Debug, Parser)]
#[command(name = "doc_agent", version, about = "LLM-assisted package documentation")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate or revise _dev/build/docs/README.md for a package.
    UpdateDocumentation(UpdateArgs),
}

#[derive(Debug, Args)]
struct UpdateArgs {
    /// Accept the first changed document without asking.
    #[arg(long)]
    non_interactive: bool,
    /// Package directory; defaults to the nearest ancestor with manifest.yml.
    #[arg(long, value_name = "PATH")]
    package_root: Option<PathBuf>,
    /// Write a JSONL transcript of every agent run into this directory.
    #[arg(long, value_name = "PATH", env = "DOC_AGENT_TRANSCRIPT_DIR")]
    transcript_dir: Option<PathBuf>,
    /// Skip the confirmation prompt.
    #[arg(long, short = 'y')]
    yes: bool,
    /// Debug-level diagnostics on stderr.
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let Command::UpdateDocumentation(args) = cli.command;
    init_tracing(args.verbose);

    match update_documentation(args) {
        Ok(code) => ExitCode::from(code),
        Err(error) => {
            eprintln!("Error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn update_documentation(args: UpdateArgs) -> anyhow::Result<u8> {
    let package_root = match args.package_root {
        Some(root) => root,
        None => {
            let cwd = std::env::current_dir().context("failed to read current directory")?;
            package::find_package_root(&cwd)?
        }
    };
    let sandbox = Sandbox::for_package(&package_root)
        .with_context(|| format!("invalid package root {}", package_root.display()))?;
    let target = sandbox.target_document();

    let stdout = io::stdout();
    let mut out = stdout.lock();

    let Some(provider) = providers::provider_from_env()? else {
        driver::print_manual_instructions(&mut out, &target)?;
        return Ok(0);
    };

    let stdin = io::stdin();
    let mut interaction = TerminalInteraction::new(stdin.lock(), io::stdout());
    let mode = if args.non_interactive {
        SessionMode::NonInteractive
    } else {
        SessionMode::Interactive
    };

    if mode == SessionMode::Interactive
        && !args.yes
        && !interaction
            .confirm(CONFIRM_QUESTION)
            .context("failed to read confirmation")?
    {
        writeln!(out, "Documentation update skipped.")?;
        return Ok(0);
    }

    let cancel = Arc::new(AtomicBool::new(false));
    let _interrupt = interrupt::install(Arc::clone(&cancel))
        .context("failed to install interrupt handler")?;

    let classifier = Classifier::new(config::phrase_table_from_env()?);
    let prompts = PackagePrompts::load(sandbox.root())?;
    info!(
        package = %prompts.manifest().name,
        root = %sandbox.root().display(),
        provider = %provider.name(),
        ?mode,
        "starting documentation session"
    );

    let mut agent = Agent::new(Arc::clone(&provider), ToolRegistry::new(sandbox.clone()));
    if let Some(dir) = args.transcript_dir {
        agent = agent.with_transcripts(TranscriptRecorder::new(
            dir,
            sandbox.root(),
            provider.profile().provider_id,
        ));
    }

    let (controller, first) = SessionController::start(&target, prompts, classifier, mode)?;
    let outcome = match mode {
        SessionMode::Interactive => {
            driver::run_interactive(&mut agent, controller, first, &mut interaction, &mut out, &cancel)?
        }
        SessionMode::NonInteractive => {
            driver::run_non_interactive(&mut agent, controller, first, &mut out, &cancel)?
        }
    };

    if let Some(transcripts) = agent.transcripts() {
        for path in transcripts.written() {
            info!(path = %path.display(), "wrote transcript");
        }
    }

    Ok(outcome.exit_code())
}

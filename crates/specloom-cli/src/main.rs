use std::borrow::Cow::{self, Borrowed, Owned};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Parser;
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use tracing_subscriber::EnvFilter;

use specloom_application::{render_spec_markdown, InvokeRequest, SessionService};
use specloom_core::checkpoint::CheckpointRepository;
use specloom_core::session::{UserCommand, UserProfile};
use specloom_execution::standard_workflow;
use specloom_infrastructure::{
    InMemoryCheckpointRepository, RipgrepCodeSearch, TomlCheckpointRepository,
};
use specloom_interaction::OpenRouterCapability;

const SLASH_COMMANDS: [&str; 10] = [
    "/techdebt",
    "/security",
    "/diagram",
    "/multispec",
    "/preview",
    "/export",
    "/cancel",
    "/state",
    "/checkpoints",
    "/help",
];

#[derive(Parser)]
#[command(name = "specloom")]
#[command(about = "SPECLOOM - conversational feature specification builder", long_about = None)]
struct Cli {
    /// Repository identifier to ground the spec in (repeatable)
    #[arg(short, long = "repo")]
    repos: Vec<String>,

    /// Root directory under which repositories are resolved
    #[arg(long, default_value = ".")]
    search_root: PathBuf,

    /// Conversational register: technical or non-technical
    #[arg(long, value_parser = parse_profile)]
    profile: Option<UserProfile>,

    /// Resume an existing session by id
    #[arg(long)]
    session: Option<String>,

    /// Checkpoint storage directory (defaults to ~/.specloom)
    #[arg(long)]
    store_dir: Option<PathBuf>,

    /// Keep checkpoints in memory only (no files written)
    #[arg(long)]
    memory: bool,

    /// Override the OpenRouter model
    #[arg(long)]
    model: Option<String>,
}

fn parse_profile(value: &str) -> Result<UserProfile, String> {
    match value {
        "technical" => Ok(UserProfile::Technical),
        "non-technical" | "non_technical" => Ok(UserProfile::NonTechnical),
        other => Err(format!(
            "unknown profile '{}' (expected 'technical' or 'non-technical')",
            other
        )),
    }
}

/// CLI helper for rustyline that provides completion, highlighting, and hints.
#[derive(Clone)]
struct CliHelper {
    commands: Vec<String>,
}

impl CliHelper {
    fn new() -> Self {
        Self {
            commands: SLASH_COMMANDS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl Helper for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];

        if line.starts_with('/') {
            let candidates: Vec<Pair> = self
                .commands
                .iter()
                .filter(|cmd| cmd.starts_with(line))
                .map(|cmd| Pair {
                    display: cmd.clone(),
                    replacement: cmd.clone(),
                })
                .collect();
            Ok((0, candidates))
        } else {
            Ok((0, vec![]))
        }
    }
}

impl Highlighter for CliHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];

        if line.starts_with('/') && !line.contains(' ') {
            self.commands
                .iter()
                .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
                .map(|cmd| cmd[line.len()..].to_string())
        } else {
            None
        }
    }
}

impl Validator for CliHelper {}

fn slash_command(input: &str) -> Option<UserCommand> {
    match input {
        "/techdebt" => Some(UserCommand::AnalyzeTechDebt),
        "/security" => Some(UserCommand::CheckSecurity),
        "/diagram" => Some(UserCommand::GenerateDiagram),
        "/multispec" => Some(UserCommand::DetectMultiSpec),
        "/preview" => Some(UserCommand::PreviewSpec),
        "/export" => Some(UserCommand::Export),
        "/cancel" => Some(UserCommand::Cancel),
        _ => None,
    }
}

fn print_help() {
    println!("{}", "Commands:".bright_yellow());
    println!("  /techdebt     analyze technical debt in the selected repositories");
    println!("  /security     generate a security checklist for the feature");
    println!("  /diagram      generate a Mermaid diagram of the feature");
    println!("  /multispec    check whether the feature should split per repository");
    println!("  /preview      show the specification document so far");
    println!("  /export       write the specification to a file and end the session");
    println!("  /cancel       discard the session");
    println!("  /state        show session progress");
    println!("  /checkpoints  list recorded checkpoints");
    println!("  quit / exit   leave without ending the session (resume later)");
}

async fn show_state(service: &SessionService, session_id: &str) -> Result<()> {
    let state = service.get_state(session_id).await?;
    println!(
        "{}",
        format!(
            "Session {} - {}% complete ({}/10 sections), {} turn(s)",
            state.session_id,
            state.completion_percentage,
            state.filled_sections(),
            state.iteration_count
        )
        .bright_yellow()
    );
    if !state.selected_repositories.is_empty() {
        println!(
            "{}",
            format!("Repositories: {}", state.selected_repositories.join(", ")).bright_black()
        );
    }
    if let Some(error) = &state.last_error {
        println!("{}", format!("Last error: {}", error).red());
    }
    Ok(())
}

async fn show_checkpoints(service: &SessionService, session_id: &str) -> Result<()> {
    let checkpoints = service.list_checkpoints(session_id).await?;
    if checkpoints.is_empty() {
        println!("{}", "No checkpoints recorded yet.".bright_black());
        return Ok(());
    }
    for summary in checkpoints {
        println!(
            "{}",
            format!(
                "{}  {:<18} {:>3}%  {}",
                summary.created_at, summary.step, summary.completion, summary.id
            )
            .bright_black()
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // ===== Backend Initialization =====
    let mut language = OpenRouterCapability::try_from_env()
        .context("OpenRouter configuration missing (set OPENROUTER_API_KEY)")?;
    if let Some(model) = &cli.model {
        language = language.with_model(model);
    }
    let search = RipgrepCodeSearch::new(&cli.search_root);

    let workflow = standard_workflow(Arc::new(language), Arc::new(search))
        .context("Failed to build the specification workflow")?;

    let checkpoints: Arc<dyn CheckpointRepository> = if cli.memory {
        Arc::new(InMemoryCheckpointRepository::new())
    } else if let Some(dir) = &cli.store_dir {
        Arc::new(TomlCheckpointRepository::new(dir)?)
    } else {
        Arc::new(TomlCheckpointRepository::default_location()?)
    };
    let service = SessionService::new(Arc::new(workflow), checkpoints);

    // ===== REPL Setup =====
    let mut rl = Editor::new()?;
    rl.set_helper(Some(CliHelper::new()));

    println!("{}", "=== Specloom ===".bright_magenta().bold());
    println!(
        "{}",
        "Describe the feature you want to specify, or type '/help' for commands.".bright_black()
    );
    println!();

    let mut session_id = cli.session.clone();
    let mut repositories = if cli.repos.is_empty() {
        None
    } else {
        Some(cli.repos.clone())
    };
    let mut profile = cli.profile;

    // ===== Main REPL Loop =====
    loop {
        let readline = rl.readline(">> ");

        match readline {
            Ok(line) => {
                let trimmed = line.trim();

                if trimmed == "quit" || trimmed == "exit" {
                    println!("{}", "Goodbye!".bright_green());
                    break;
                }
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&line);

                if trimmed == "/help" {
                    print_help();
                    continue;
                }
                if trimmed == "/state" || trimmed == "/checkpoints" {
                    let Some(id) = &session_id else {
                        println!("{}", "No active session yet.".bright_black());
                        continue;
                    };
                    let result = if trimmed == "/state" {
                        show_state(&service, id).await
                    } else {
                        show_checkpoints(&service, id).await
                    };
                    if let Err(e) = result {
                        eprintln!("{}", format!("Error: {}", e).red());
                    }
                    continue;
                }

                let command = slash_command(trimmed);
                if trimmed.starts_with('/') && command.is_none() {
                    println!("{}", "Unknown command".bright_black());
                    continue;
                }

                let request = InvokeRequest {
                    session_id: session_id.clone(),
                    // Slash commands are routed, not conversed about.
                    message: if command.is_some() {
                        String::new()
                    } else {
                        trimmed.to_string()
                    },
                    command,
                    repositories: repositories.take(),
                    profile: profile.take(),
                };

                let response = match service.invoke(request).await {
                    Ok(response) => response,
                    Err(e) => {
                        eprintln!("{}", format!("Error: {}", e).red());
                        continue;
                    }
                };
                session_id = Some(response.session_id.clone());

                if let Some(reply) = &response.assistant_reply {
                    for line in reply.lines() {
                        println!("{}", line.bright_blue());
                    }
                }
                println!(
                    "{}",
                    format!(
                        "[{}% complete{}]",
                        response.completion_percentage,
                        if response.is_complete { ", ready to export" } else { "" }
                    )
                    .bright_black()
                );

                if command == Some(UserCommand::PreviewSpec)
                    || command == Some(UserCommand::Export)
                {
                    let state = service.get_state(&response.session_id).await?;
                    let document = render_spec_markdown(&state);
                    if command == Some(UserCommand::Export) {
                        let path = format!("spec-{}.md", response.session_id);
                        std::fs::write(&path, &document)
                            .with_context(|| format!("Failed to write {}", path))?;
                        println!("{}", format!("Specification written to {}", path).green());
                    } else {
                        println!("{}", document);
                    }
                }

                if response.finished {
                    println!("{}", "Session ended.".bright_green());
                    break;
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type 'quit' to exit.".yellow());
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
    }

    Ok(())
}

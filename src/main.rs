//! Nomads Stakeholder Chat - persona-grounded RAG chat
//!
//! This is the main entry point for the chat binary. It builds a retrieval
//! index over a fixed document directory at startup, then answers questions
//! in the voice of a selected synthetic stakeholder, grounding every answer
//! in the retrieved material.

mod backend;
mod cli;
mod config;
mod engine;
mod error;
mod gate;
mod index;
mod logging;
mod persona;
mod types;
mod version;

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use crate::backend::{OpenAiBackend, SharedBackend};
use crate::cli::{Cli, Commands, ConfigSubcommand, PersonaSubcommand};
use crate::config::ChatConfig;
use crate::engine::{open_session, ConversationEngine, ConversationHistory, TurnOutcome};
use crate::error::{Error, Result};
use crate::gate::AccessGate;
use crate::persona::{Persona, PersonaRegistry};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // The informational subcommands skip config loading entirely
    match &cli.command {
        Commands::Version => {
            version::print_version();
            return Ok(());
        }
        Commands::Config { subcommand } => {
            logging::init_simple(tracing::Level::WARN)?;
            if let Err(e) = handle_config_command(subcommand.clone()) {
                eprint!("{}", e.format_for_terminal());
                std::process::exit(e.exit_code());
            }
            return Ok(());
        }
        Commands::Persona { subcommand } => {
            logging::init_simple(tracing::Level::WARN)?;
            if let Err(e) = handle_persona_command(subcommand.clone()) {
                eprint!("{}", e.format_for_terminal());
                std::process::exit(e.exit_code());
            }
            return Ok(());
        }
        _ => {}
    }

    // Load configuration for chat/ask commands
    let config_path = match &cli.command {
        Commands::Chat { config, .. } => config.clone(),
        Commands::Ask { config, .. } => config.clone(),
        _ => None,
    };

    let config = match ChatConfig::load(config_path.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprint!("{}", e.format_for_terminal());
            std::process::exit(e.exit_code());
        }
    };

    // Initialize logging with config settings.
    // The guards must be kept alive for the lifetime of the program.
    let _log_guards = logging::init_logging(&config.logging, cli.verbose, cli.quiet)?;

    let build = version::build_info();
    info!(version = %build.full_version(), "Starting stakeholder chat");

    let result = match cli.command {
        Commands::Chat {
            persona,
            password,
            no_stream,
            ..
        } => run_chat(config, persona, password, no_stream),
        Commands::Ask {
            query,
            persona,
            password,
            ..
        } => run_ask(config, query, persona, password),
        Commands::Version | Commands::Config { .. } | Commands::Persona { .. } => {
            unreachable!("dispatched before config load");
        }
    };

    if let Err(e) = result {
        eprint!("{}", e.format_for_terminal());
        std::process::exit(e.exit_code());
    }

    Ok(())
}

// ─────────────────────────────────────────────────────────────────
// Session Bootstrap
// ─────────────────────────────────────────────────────────────────

/// Build the tokio runtime. One session, one turn at a time: a current
/// thread runtime is all the concurrency this application has.
fn build_runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::Internal(format!("Failed to create async runtime: {}", e)))
}

/// Gate, then index build; everything a session needs to accept turns.
async fn bootstrap(
    config: &ChatConfig,
    password: Option<String>,
) -> Result<(ConversationEngine, SharedBackend)> {
    config.ensure_api_key()?;

    let submitted = match password {
        Some(p) => p,
        None => prompt_line("Password: ")?.ok_or(Error::AccessDenied)?,
    };

    let gate = AccessGate::with_default_secret();
    let backend: SharedBackend = Arc::new(OpenAiBackend::new(config.openai.clone())?);

    println!("Indexing documents in {} ...", config.documents.dir);
    let engine = open_session(
        &gate,
        submitted.trim(),
        &config.documents_dir(),
        backend.clone(),
        &config.retrieval,
        &config.chat,
    )
    .await?;

    Ok((engine, backend))
}

/// Resolve the persona from a CLI slug or an interactive pick.
fn resolve_persona(registry: &PersonaRegistry, slug: Option<String>) -> Result<Persona> {
    if let Some(slug) = slug {
        return registry.get(&slug).map(|p| p.clone());
    }

    println!("Choose a synthetic stakeholder to chat with:");
    for (i, persona) in registry.all().iter().enumerate() {
        println!("  {}. {} ({})", i + 1, persona.display_name, persona.id);
    }

    loop {
        let Some(input) = prompt_line("> ")? else {
            return Err(Error::Internal("input closed during persona selection".to_string()));
        };
        let input = input.trim();

        // Accept a list number or an id slug
        if let Ok(n) = input.parse::<usize>() {
            if n >= 1 && n <= registry.all().len() {
                return Ok(registry.all()[n - 1].clone());
            }
        }
        if let Ok(persona) = registry.get(input) {
            return Ok(persona.clone());
        }

        println!("Pick a number between 1 and {}.", registry.all().len());
    }
}

/// Read one line from stdin; `None` signals a closed input stream.
fn prompt_line(prompt: &str) -> Result<Option<String>> {
    print!("{}", prompt);
    io::stdout().flush()?;

    let mut line = String::new();
    let read = io::stdin().lock().read_line(&mut line)?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\n', '\r']).to_string()))
}

// ─────────────────────────────────────────────────────────────────
// Interactive Chat
// ─────────────────────────────────────────────────────────────────

/// Run the interactive chat session
fn run_chat(
    config: ChatConfig,
    persona_slug: Option<String>,
    password: Option<String>,
    no_stream: bool,
) -> Result<()> {
    let registry = PersonaRegistry::load()?;
    let runtime = build_runtime()?;

    runtime.block_on(async {
        let (engine, _backend) = bootstrap(&config, password).await?;
        let persona = resolve_persona(&registry, persona_slug)?;
        let streaming = config.chat.streaming && !no_stream;

        println!();
        println!("Chatting with {}. Type 'exit' to quit.", persona.display_name);
        println!();

        let mut history = ConversationHistory::new();
        info!(session = %history.session_id(), persona = %persona.id, "Chat session started");

        loop {
            let Some(line) = prompt_line("You: ")? else {
                // Closed stdin ends the session
                break;
            };
            let input = line.trim();
            if matches!(input, "exit" | "quit") {
                break;
            }

            if !input.is_empty() {
                print!("{}: ", persona.display_name);
                io::stdout().flush()?;
            }

            let sink: engine::FragmentSink = Arc::new(|fragment: &str| {
                print!("{}", fragment);
                let _ = io::stdout().flush();
            });

            let outcome = engine
                .submit_turn(&persona, &mut history, input, streaming, Some(sink))
                .await;

            match outcome {
                Ok(TurnOutcome::Reply { message }) => {
                    if !streaming {
                        print!("{}", message.content);
                    }
                    println!();
                    println!();
                }
                Ok(TurnOutcome::EmptyInput) => {
                    println!();
                    println!("Please enter a message.");
                    println!();
                }
                Ok(TurnOutcome::Failed { message, error }) => {
                    if !streaming {
                        print!("{}", message.content);
                    }
                    println!();
                    eprint!("{}", error.format_for_terminal());
                    println!();
                }
                Err(e) => {
                    // Retrieval failures: the transcript is untouched and
                    // the question may simply be asked again.
                    println!();
                    eprint!("{}", e.format_for_terminal());
                    println!();
                }
            }
        }

        info!(
            session = %history.session_id(),
            turns = history.len() / 2,
            "Chat session ended"
        );
        Ok(())
    })
}

// ─────────────────────────────────────────────────────────────────
// Single-Shot Query
// ─────────────────────────────────────────────────────────────────

/// Answer a single question and exit
fn run_ask(
    config: ChatConfig,
    query: String,
    persona_slug: String,
    password: Option<String>,
) -> Result<()> {
    let registry = PersonaRegistry::load()?;
    let persona = registry.get(&persona_slug)?.clone();
    let runtime = build_runtime()?;

    runtime.block_on(async {
        let (engine, _backend) = bootstrap(&config, password).await?;

        match engine.ask(&persona, &query).await? {
            TurnOutcome::Reply { message } => {
                println!("{}: {}", persona.display_name, message.content);
                Ok(())
            }
            TurnOutcome::EmptyInput => {
                println!("Please enter a message.");
                Ok(())
            }
            TurnOutcome::Failed { error, .. } => Err(error),
        }
    })
}

// ─────────────────────────────────────────────────────────────────
// Subcommand Handlers
// ─────────────────────────────────────────────────────────────────

fn handle_persona_command(subcommand: PersonaSubcommand) -> Result<()> {
    let registry = PersonaRegistry::load()?;

    match subcommand {
        PersonaSubcommand::List => {
            println!("Available stakeholders:");
            for persona in registry.all() {
                println!("  {:<14} {}", persona.id.slug(), persona.display_name);
            }
        }
        PersonaSubcommand::Show { persona } => {
            let persona = registry.get(&persona)?;
            println!("{} ({})", persona.display_name, persona.id);
            println!();
            println!("{}", persona.system_instruction.trim());
        }
    }

    Ok(())
}

fn handle_config_command(subcommand: ConfigSubcommand) -> Result<()> {
    match subcommand {
        ConfigSubcommand::Show { config } => {
            let cfg = ChatConfig::load(config.as_deref())?;
            println!("{}", toml::to_string_pretty(&cfg)?);
        }
        ConfigSubcommand::Init { path, force } => {
            config::init_config(path.as_deref(), force)?;
        }
        ConfigSubcommand::Validate { config } => {
            let path = config.as_deref();
            match ChatConfig::load(path) {
                Ok(_) => {
                    println!("Configuration is valid.");
                }
                Err(e) => {
                    eprint!("{}", e.format_for_terminal());
                    std::process::exit(e.exit_code());
                }
            }
        }
    }

    Ok(())
}

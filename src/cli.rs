//! Command-line surface, clap v4 derive style.

use clap::{Parser, Subcommand};

/// Nomads Stakeholder Chat - converse with synthetic stakeholders grounded in reference documents
///
/// Builds a retrieval index over a document directory at startup, then answers
/// questions in the voice of a selected stakeholder persona, citing the
/// retrieved material.
#[derive(Parser, Debug)]
#[command(name = "nomads-chat")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start an interactive chat session with a stakeholder persona
    Chat {
        /// Path to configuration file
        #[arg(short, long, env = "NOMADS_CONFIG")]
        config: Option<String>,

        /// Persona to chat with (see 'persona list'); prompted if omitted
        #[arg(long, env = "NOMADS_PERSONA")]
        persona: Option<String>,

        /// Access password; prompted if omitted
        #[arg(long)]
        password: Option<String>,

        /// Disable streaming output (wait for complete answers)
        #[arg(long)]
        no_stream: bool,
    },

    /// Ask a single question and exit (no conversation history)
    Ask {
        /// The question to ask
        query: String,

        /// Path to configuration file
        #[arg(short, long, env = "NOMADS_CONFIG")]
        config: Option<String>,

        /// Persona to answer as (see 'persona list')
        #[arg(long, env = "NOMADS_PERSONA")]
        persona: String,

        /// Access password; prompted if omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// Stakeholder persona management
    Persona {
        #[command(subcommand)]
        subcommand: PersonaSubcommand,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Display version and build information
    Version,
}

/// Persona subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum PersonaSubcommand {
    /// List all available stakeholder personas
    List,

    /// Show a persona's role instruction
    Show {
        /// Persona id (e.g. municipality, e-retailer)
        persona: String,
    },
}

/// Configuration subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigSubcommand {
    /// Display the current configuration
    Show {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Initialize a new configuration file
    Init {
        /// Path where to create the config file
        #[arg(short, long)]
        path: Option<String>,

        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Validate a configuration file
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        config: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_chat_command() {
        let cli = Cli::parse_from(["nomads-chat", "chat"]);
        match cli.command {
            Commands::Chat {
                config,
                persona,
                password,
                no_stream,
            } => {
                assert!(config.is_none());
                assert!(persona.is_none());
                assert!(password.is_none());
                assert!(!no_stream);
            }
            _ => panic!("Expected Chat command"),
        }
    }

    #[test]
    fn test_chat_with_persona() {
        let cli = Cli::parse_from(["nomads-chat", "chat", "--persona", "municipality"]);
        match cli.command {
            Commands::Chat { persona, .. } => {
                assert_eq!(persona, Some("municipality".to_string()));
            }
            _ => panic!("Expected Chat command"),
        }
    }

    #[test]
    fn test_ask_command() {
        let cli = Cli::parse_from([
            "nomads-chat",
            "ask",
            "What is your stance on circular systems?",
            "--persona",
            "municipality",
        ]);
        match cli.command {
            Commands::Ask { query, persona, .. } => {
                assert_eq!(query, "What is your stance on circular systems?");
                assert_eq!(persona, "municipality");
            }
            _ => panic!("Expected Ask command"),
        }
    }

    #[test]
    fn test_persona_list() {
        let cli = Cli::parse_from(["nomads-chat", "persona", "list"]);
        match cli.command {
            Commands::Persona {
                subcommand: PersonaSubcommand::List,
            } => {}
            _ => panic!("Expected Persona List command"),
        }
    }

    #[test]
    fn test_persona_show() {
        let cli = Cli::parse_from(["nomads-chat", "persona", "show", "waste-expert"]);
        match cli.command {
            Commands::Persona {
                subcommand: PersonaSubcommand::Show { persona },
            } => {
                assert_eq!(persona, "waste-expert");
            }
            _ => panic!("Expected Persona Show command"),
        }
    }

    #[test]
    fn test_config_show() {
        let cli = Cli::parse_from(["nomads-chat", "config", "show"]);
        match cli.command {
            Commands::Config {
                subcommand: ConfigSubcommand::Show { config },
            } => {
                assert!(config.is_none());
            }
            _ => panic!("Expected Config Show command"),
        }
    }

    #[test]
    fn test_config_init() {
        let cli = Cli::parse_from(["nomads-chat", "config", "init", "--force"]);
        match cli.command {
            Commands::Config {
                subcommand: ConfigSubcommand::Init { path, force },
            } => {
                assert!(path.is_none());
                assert!(force);
            }
            _ => panic!("Expected Config Init command"),
        }
    }

    #[test]
    fn test_verbose_flags() {
        let cli = Cli::parse_from(["nomads-chat", "-vv", "version"]);
        assert_eq!(cli.verbose, 2);
        assert!(!cli.quiet);
    }

    #[test]
    fn test_quiet_flag() {
        let cli = Cli::parse_from(["nomads-chat", "--quiet", "version"]);
        assert!(cli.quiet);
    }
}

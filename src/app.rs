//! Application orchestration and command routing.
//!
//! Handles command-line argument parsing and delegates to appropriate command handlers.

use crate::commands;
use crate::logging;
use anyhow::anyhow;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;
use std::process;

/// Checks if setup is needed (version mismatch or missing config) and runs setup if required.
///
/// This is called early in the startup sequence, before command handling.
/// It checks:
/// 1. If config file doesn't exist, runs full setup
/// 2. If config version is older than app version, runs setup and logs migration
/// 3. If config version matches app version, does nothing
async fn check_and_run_setup() -> Result<(), anyhow::Error> {
    let config_path = dirs::home_dir()
        .ok_or_else(|| anyhow!("Could not determine home directory"))?
        .join(".config")
        .join("ova")
        .join("ova.toml");

    // A missing config means a first run: write the default config, which
    // already carries the current version line.
    if !config_path.exists() {
        tracing::info!("No config file found - running first-time setup");
        crate::setup::run_setup().map_err(|e| {
            tracing::error!("Setup failed: {e}");
            anyhow!("Setup failed: {e}")
        })?;
        return Ok(());
    }

    match crate::setup::version::check_setup_needed(&config_path)? {
        Some(old_version) => {
            // Setup is needed - either config doesn't exist or version is older
            tracing::info!(
                "Setup needed - migrating from version {} to {}",
                old_version,
                env!("CARGO_PKG_VERSION")
            );
            crate::setup::run_setup().map_err(|e| {
                tracing::error!("Setup failed: {e}");
                anyhow!("Setup failed: {e}")
            })?;
            crate::setup::version::update_config_version(&config_path).map_err(|e| {
                tracing::error!("Failed to update config version: {e}");
                anyhow!("Failed to update config version: {e}")
            })?;
            tracing::info!(
                "Setup completed successfully - migrated to version {}",
                env!("CARGO_PKG_VERSION")
            );
        }
        None => {
            // Config exists and version matches, no setup needed
            tracing::debug!("Config version up to date ({})", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

/// A terminal voice-assistant client: record a question, hear the answer
#[derive(Parser)]
#[command(name = "ova")]
#[command(version)]
#[command(about = "\n\n ┏┓┓┏┏┓ \n ┗┛┗┛┣┫ ")]
#[command(long_about = "\n\n ┏┓┓┏┏┓ \n ┗┛┗┛┣┫ \n\nA terminal voice-assistant client. Record a spoken question, send it to an\nassistant server, read the transcript and answer, and hear the spoken reply.\n\nDEFAULT COMMAND:\n    If no command is specified, 'ask' is used by default.\n    Ask options (-c, -o) can be used without explicitly saying 'ask'.\n\nEXAMPLES:\n    # Ask a question and pipe the answer to another command\n    $ ova | wc -w\n    $ ova ask | wc -w\n    \n    # Ask and copy the answer to clipboard\n    $ ova -c\n    $ ova ask -c\n    \n    # Ask and write the answer to a file\n    $ ova -o answer.txt\n    \n    # Submit a pre-recorded question\n    $ ova send question.wav\n    \n    # Re-submit the most recent question\n    $ ova resend\n    \n    # Replay the spoken answer of exchange #2\n    $ ova replay 2\n    \n    # Browse your exchange history\n    $ ova history\n    \n    # Edit configuration file\n    $ ova config")]
#[command(
    after_help = "CONFIGURATION:\n    Config file:        ~/.config/ova/ova.toml\n    Logs:               ~/.local/state/ova/ova.log.*\n\nFor more information, visit: https://github.com/open-voice-assistant/ova"
)]
struct Cli {
    /// Copy the answer to clipboard instead of stdout (ask default command)
    #[arg(short, long, global = true)]
    clipboard: bool,

    /// Write the answer to file instead of stdout (ask default command)
    #[arg(short, long, value_name = "FILE", global = true)]
    output: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a question and hear the answer (default)
    ///
    /// Press r to record, Enter to send, Space to pause/resume, Escape/q to
    /// leave. By default, the answer text outputs to stdout for piping.
    #[command(visible_alias = "a")]
    Ask {
        /// Copy the answer to clipboard instead of stdout
        #[arg(short, long)]
        clipboard: bool,

        /// Write the answer to file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<String>,
    },

    /// Submit a pre-recorded audio file as a question
    ///
    /// Send an existing audio file to the assistant server without
    /// recording. Supports the same output options as ask.
    ///
    /// Examples:
    ///   ova send question.wav
    ///   ova send voice-memo.wav -c
    ///   ova send question.wav -o answer.txt
    #[command(visible_alias = "s")]
    Send {
        /// Path to the audio file to submit
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Copy the answer to clipboard instead of stdout
        #[arg(short, long)]
        clipboard: bool,

        /// Write the answer to file instead of stdout
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<String>,
    },

    /// Re-submit a previous question from history
    ///
    /// Upload the question audio of a past exchange again. Useful when the
    /// upload failed or you want a fresh answer.
    Resend {
        /// Exchange index (1 = most recent, 2 = second most recent, etc.)
        #[arg(value_name = "N")]
        index: Option<usize>,

        /// Copy the answer to clipboard instead of stdout
        #[arg(short, long)]
        clipboard: bool,

        /// Write the answer to file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<String>,
    },

    /// Replay the spoken answer of a previous exchange
    ///
    /// Play back the synthesized answer audio without contacting the server.
    #[command(visible_alias = "rp")]
    Replay {
        /// Exchange index (1 = most recent, 2 = second most recent, etc.)
        #[arg(value_name = "N")]
        index: Option<usize>,
    },

    /// View and browse exchange history
    ///
    /// Browse previous questions and answers, play spoken answers, and copy
    /// answer text. Use arrow keys to navigate, Enter to copy, p to play,
    /// Esc to exit.
    #[command(visible_alias = "h")]
    History,

    /// Open configuration file in your preferred editor
    ///
    /// Edit audio settings, the assistant server URL, and other
    /// configuration. Uses $EDITOR environment variable or falls back to
    /// nano/vi.
    #[command(visible_alias = "c")]
    Config,

    /// List available audio input devices
    ///
    /// Shows device IDs, names, and configurations to help configure
    /// the correct input device in ova.toml.
    #[command(name = "list-devices")]
    ListDevices,

    /// Show recent log entries from the application
    ///
    /// Display the last 50 lines of the most recent log file.
    /// Useful for troubleshooting issues.
    Logs,

    /// Generate shell completion script
    ///
    /// Generate completion script for your shell. Save the output to your
    /// shell's completion directory or source it directly.
    ///
    /// Examples:
    ///   ova completions bash > ova.bash
    ///   ova completions zsh > _ova
    ///   ova completions fish > ova.fish
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Runs the main application based on command-line arguments.
///
/// # Exit Codes
/// - 0: Success
/// - 1: General error
/// - 2: Usage error (invalid arguments)
///
/// # Errors
/// - If setup fails
/// - If logging initialization fails
/// - If command execution fails (e.g., recording, upload, history viewing)
pub async fn run() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Handle commands that don't need logging or config setup
    match &cli.command {
        Some(Commands::Completions { shell }) => {
            generate(*shell, &mut Cli::command(), "ova", &mut io::stdout());
            return Ok(());
        }
        Some(Commands::ListDevices) => {
            return match commands::handle_list_devices() {
                Ok(()) => Ok(()),
                Err(e) => {
                    eprintln!("Error: {e}");
                    process::exit(1);
                }
            };
        }
        Some(Commands::Logs) => {
            return match commands::handle_logs() {
                Ok(()) => Ok(()),
                Err(e) => {
                    eprintln!("Error: {e}");
                    process::exit(1);
                }
            };
        }
        _ => {}
    }

    // Initialize logging for all other commands
    logging::init_logging()?;

    // Check if setup is needed (version check or missing config)
    check_and_run_setup().await?;

    // Route to appropriate command handler
    match cli.command {
        None | Some(Commands::Ask { .. }) => {
            // Default command is ask
            // Merge top-level options with explicit ask command options
            // If both are specified, the explicit ask command options take precedence
            let (clipboard, output) = match cli.command {
                Some(Commands::Ask { clipboard, output }) => (clipboard, output),
                None => (cli.clipboard, cli.output),
                _ => unreachable!(),
            };
            commands::handle_ask(clipboard, output).await?;
        }
        Some(Commands::Send {
            file,
            clipboard,
            output,
        }) => {
            commands::handle_send(file, clipboard, output).await?;
        }
        Some(Commands::Resend {
            index,
            clipboard,
            output,
        }) => {
            commands::handle_resend(index, clipboard, output).await?;
        }
        Some(Commands::Replay { index }) => {
            commands::handle_replay(index).await?;
        }
        Some(Commands::History) => {
            commands::handle_history().await?;
        }
        Some(Commands::Config) => {
            commands::handle_config()?;
        }
        Some(Commands::Completions { .. }) | Some(Commands::ListDevices) | Some(Commands::Logs) => {
            unreachable!("These commands are handled earlier")
        }
    }

    Ok(())
}

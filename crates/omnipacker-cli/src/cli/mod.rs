//! CLI for the OmniPacker download-and-compress queue.

mod commands;
mod control_input;
mod process_runner;
mod queue_view;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use omnipacker_core::config;
use std::path::PathBuf;

use commands::{
    run_classify, run_completions, run_login, run_man, run_output_dir, run_queue, run_render,
    run_template,
};

/// Top-level CLI for OmniPacker.
#[derive(Debug, Parser)]
#[command(name = "omnipacker")]
#[command(about = "OmniPacker: queue depot downloads, pack them and write release notes", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Run every job in a jobs file, one at a time.
    Run {
        /// TOML file with one `[[job]]` table per download.
        jobs_file: PathBuf,
        /// Fill missing usernames and passwords from the saved login.
        #[arg(long)]
        saved_login: bool,
    },

    /// Render release notes from a metadata JSON file and print them.
    Render {
        /// Metadata JSON (game_name, os, branch, build_datetime_utc, build_id, depots).
        #[arg(long)]
        metadata: PathBuf,
        /// Template payload JSON; the saved template is used when omitted.
        #[arg(long)]
        template: Option<PathBuf>,
    },

    /// Classify downloader output read from stdin, one line at a time.
    Classify {
        /// Treat input lines as stderr.
        #[arg(long)]
        stderr: bool,
    },

    /// Show, replace or reset the saved release-notes template.
    Template {
        #[command(subcommand)]
        action: TemplateAction,
    },

    /// Manage the saved account login.
    Login {
        #[command(subcommand)]
        action: LoginAction,
    },

    /// Print where finished downloads are written.
    OutputDir,

    /// Generate shell completions.
    Completions {
        shell: clap_complete::Shell,
    },

    /// Print the man page to stdout.
    Man,
}

#[derive(Debug, Subcommand)]
pub enum TemplateAction {
    /// Print the saved template (or the default) as JSON.
    Show,
    /// Validate and save a template payload JSON file.
    Save { file: PathBuf },
    /// Delete the saved template so the default applies.
    Reset,
}

#[derive(Debug, Subcommand)]
pub enum LoginAction {
    /// Save a username and password.
    Save { username: String, password: String },
    /// Show the saved username.
    Show,
    /// Delete the saved login.
    Delete,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Run {
                jobs_file,
                saved_login,
            } => {
                let cfg = config::load_or_init()?;
                tracing::debug!("loaded config: {:?}", cfg);
                run_queue(&cfg, &jobs_file, saved_login).await?;
            }
            CliCommand::Render { metadata, template } => {
                let cfg = config::load_or_init()?;
                run_render(&cfg, &metadata, template.as_deref())?;
            }
            CliCommand::Classify { stderr } => run_classify(stderr).await?,
            CliCommand::Template { action } => run_template(action)?,
            CliCommand::Login { action } => run_login(action)?,
            CliCommand::OutputDir => {
                let cfg = config::load_or_init()?;
                run_output_dir(&cfg)?;
            }
            CliCommand::Completions { shell } => run_completions(&mut Cli::command(), shell),
            CliCommand::Man => run_man(Cli::command())?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;

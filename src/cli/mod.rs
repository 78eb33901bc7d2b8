pub mod commands;
pub mod output;

use crate::errors::Result;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::stack::StackAction;

#[derive(Parser)]
#[command(name = "rp")]
#[command(about = "Ripple - keeps stacked branches in sync after merges")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize repository for Ripple
    Init {
        /// Default base branch for new stacks
        #[arg(long)]
        base: Option<String>,

        /// Force initialization even if already initialized
        #[arg(long)]
        force: bool,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Stack management
    Stack {
        #[command(subcommand)]
        action: StackAction,
    },

    /// Show tracked branches with sync and PR status
    Status,

    /// Sync a stack after a branch merged, or continue/abort a stopped sync
    Sync {
        /// The merged branch (omit with --continue / --abort)
        branch: Option<String>,

        /// Continue after resolving conflicts manually
        #[arg(long = "continue", conflicts_with = "abort")]
        continue_sync: bool,

        /// Abort the in-progress sync and restore the original branch
        #[arg(long)]
        abort: bool,
    },

    /// Poll for merged PRs and sync stacks as they land
    Watch {
        /// Run a single poll cycle and exit
        #[arg(long)]
        once: bool,
    },

    /// Create a pull request for a tracked branch
    Submit {
        /// Branch to submit (defaults to the current branch)
        branch: Option<String>,

        /// Create the PR as a draft
        #[arg(long)]
        draft: bool,

        /// Open the PR in a browser afterwards
        #[arg(long)]
        web: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Get a configuration value
    Get {
        /// Configuration key (e.g., rerere.enabled)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,
        /// Configuration value
        value: String,
    },

    /// List all configuration values
    List,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        self.setup_logging();

        match self.command {
            Commands::Init { base, force } => commands::init::run(base, force).await,
            Commands::Config { action } => commands::config::run(action).await,
            Commands::Stack { action } => commands::stack::run(action).await,
            Commands::Status => commands::status::run().await,
            Commands::Sync {
                branch,
                continue_sync,
                abort,
            } => commands::sync::run(branch, continue_sync, abort).await,
            Commands::Watch { once } => commands::watch::run(once).await,
            Commands::Submit { branch, draft, web } => {
                commands::submit::run(branch, draft, web).await
            }
            Commands::Completions { shell } => commands::completions::generate_completions(shell),
        }
    }

    fn setup_logging(&self) {
        let level = if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        };

        let subscriber = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_target(false)
            .without_time();

        if self.no_color {
            subscriber.with_ansi(false).init();
        } else {
            subscriber.init();
        }
    }
}

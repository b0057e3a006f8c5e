use clap::{Parser, Subcommand, ValueEnum};

/// Shell types for completion generation
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
    Powershell,
}

#[derive(Parser)]
#[command(name = "feescope")]
#[command(author, version, about = "Reconstruct checkout price breakdowns and surface hidden charges", long_about = None)]
#[command(after_help = r#"Examples:
  feescope analyze ./checkout.html --site swiggy.com     Analyze a saved checkout page
  feescope analyze https://shop.example/checkout --json  Fetch and analyze a live page
  curl -s https://shop.example/cart | feescope analyze - One-shot from stdin
  feescope monitor ./checkout.html --save                Watch a page while it settles
  feescope history                                       Show saved transactions
  feescope stats                                         Hidden-fee analytics

Quick Start:
  1. feescope notify set --ntfy my-fee-alerts
  2. feescope monitor ./checkout.html --save
"#)]
pub struct Cli {
    /// Log engine decisions (info level; FEESCOPE_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a single immediate analysis pass
    #[command(after_help = r#"Examples:
  feescope analyze ./checkout.html
  feescope analyze ./checkout.html --site www.zomato.com --save
  feescope analyze https://shop.example/checkout --json | jq .hiddenCharges
  feescope analyze - < page.html
"#)]
    Analyze {
        /// URL, path to a saved HTML file, or '-' for stdin
        source: String,

        /// Site name recorded with the result (default: URL host or file name)
        #[arg(long)]
        site: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Save the result to transaction history
        #[arg(long)]
        save: bool,

        /// Do not record the scan in analytics
        #[arg(long)]
        no_record: bool,
    },

    /// Watch a page until it settles, re-analyzing on significant changes
    #[command(after_help = r#"Examples:
  feescope monitor ./checkout.html                 Edits to the file count as page changes
  feescope monitor https://shop.example/checkout --linger 2m
  feescope monitor ./checkout.html --json --save
"#)]
    Monitor {
        /// URL or path to an HTML file
        source: String,

        /// Site name recorded with results (default: URL host or file name)
        #[arg(long)]
        site: Option<String>,

        /// Output each result as a JSON line
        #[arg(long)]
        json: bool,

        /// Save every completed pass to transaction history
        #[arg(long)]
        save: bool,

        /// Keep watching for changes this long after the last pass (e.g., 30s, 5m)
        #[arg(long)]
        linger: Option<String>,
    },

    /// Show saved transactions
    #[command(after_help = r#"Examples:
  feescope history
  feescope history --limit 5
  feescope history --json
"#)]
    History {
        /// Number of entries to show
        #[arg(long, short = 'n', default_value = "20")]
        limit: usize,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a saved transaction
    Forget {
        /// Transaction ID (or unique prefix)
        id: String,
    },

    /// Delete all history and analytics
    Clear {
        /// Skip confirmation
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Show hidden-fee analytics
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Configure notifications
    #[command(subcommand, after_help = r#"Examples:
  feescope notify set --ntfy my-topic
  feescope notify set --slack https://hooks.slack.com/...
  feescope notify show
  feescope notify test
"#)]
    Notify(NotifyCommands),

    /// Generate shell completions
    #[command(after_help = r#"Examples:
  feescope completions bash > ~/.local/share/bash-completion/completions/feescope
  feescope completions zsh > ~/.zfunc/_feescope
  feescope completions fish > ~/.config/fish/completions/feescope.fish
"#)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

#[derive(Subcommand)]
pub enum NotifyCommands {
    /// Set the notification target
    Set {
        /// ntfy topic (e.g., my-topic or https://ntfy.sh/my-topic)
        #[arg(long)]
        ntfy: Option<String>,

        /// Slack webhook URL
        #[arg(long)]
        slack: Option<String>,

        /// Discord webhook URL
        #[arg(long)]
        discord: Option<String>,

        /// Custom command (receives JSON on stdin)
        #[arg(long)]
        command: Option<String>,

        /// Turn first-disclosure notifications off
        #[arg(long, conflicts_with_all = ["ntfy", "slack", "discord", "command"])]
        disable: bool,
    },

    /// Show current notification settings
    Show,

    /// Send a test notification
    Test,
}

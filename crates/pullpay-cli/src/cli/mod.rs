//! CLI entry and dispatch.

use anyhow::{Context, Result};
use clap::Parser;
use pullpay_core::config::Config;
use pullpay_core::models::{Identity, ProfileUpdate};
use pullpay_core::session::TokenStore;
use pullpay_core::views::Dashboard;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "pullpay")]
#[command(version)]
#[command(about = "PullPay donor dashboard in the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log requests and session changes to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Log in and store the session
    Login {
        /// Log in with an email address
        #[arg(long, conflicts_with = "username", required_unless_present = "username")]
        email: Option<String>,

        /// Log in with a username
        #[arg(long)]
        username: Option<String>,

        #[command(flatten)]
        password: PasswordArg,
    },

    /// Create an account
    Register {
        #[arg(long)]
        first_name: String,

        #[arg(long)]
        last_name: String,

        #[arg(long)]
        email: String,

        #[command(flatten)]
        password: PasswordArg,

        /// Log in right after registering
        #[arg(long)]
        login: bool,
    },

    /// Remove the stored session
    Logout,

    /// Show the dashboard overview
    Dashboard,

    /// View or edit your profile
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },

    /// List or create transactions
    Transactions {
        #[command(subcommand)]
        command: TransactionCommands,
    },

    /// List churches
    Churches {
        #[command(subcommand)]
        command: ChurchCommands,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Password source: flag, then `PULLPAY_PASSWORD`, then a line on stdin.
#[derive(clap::Args, Debug, Clone, Default)]
struct PasswordArg {
    /// Account password
    #[arg(long, env = "PULLPAY_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

#[derive(clap::Subcommand)]
enum ProfileCommands {
    /// Show your profile
    Show,
    /// Update profile fields
    Update {
        #[arg(long)]
        first_name: Option<String>,

        #[arg(long)]
        last_name: Option<String>,

        #[arg(long)]
        email: Option<String>,
    },
}

#[derive(clap::Subcommand)]
enum TransactionCommands {
    /// List your transactions
    List {
        /// Page number (1-based)
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Record a new donation
    Create {
        /// Amount, e.g. 25.50
        #[arg(long)]
        amount: String,

        /// Church id (see `pullpay churches list`)
        #[arg(long, value_name = "ID")]
        church: u64,
    },
}

#[derive(clap::Subcommand)]
enum ChurchCommands {
    /// List churches
    List,
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
    /// Set a config value
    Set {
        #[arg(value_name = "KEY")]
        key: String,
        #[arg(value_name = "VALUE")]
        value: String,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    // single-threaded: one view at a time, concurrency only within a view
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("PULLPAY_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn open_dashboard() -> Result<Dashboard> {
    let config = Config::load().context("load config")?;
    let tokens = TokenStore::open_default().context("open session")?;
    let dashboard = Dashboard::from_config(&config, tokens)?;
    debug!(
        base_url = dashboard.client().base_url(),
        auth_scheme = config.auth_scheme.display_name(),
        "dashboard ready"
    );
    Ok(dashboard)
}

async fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Login {
            email,
            username,
            password,
        } => {
            let identity = match (email, username) {
                (Some(email), None) => Identity::Email(email),
                (None, Some(username)) => Identity::Username(username),
                _ => anyhow::bail!("Please specify exactly one of --email or --username"),
            };
            commands::auth::login(&open_dashboard()?, identity, password.password).await
        }
        Commands::Register {
            first_name,
            last_name,
            email,
            password,
            login,
        } => {
            let options = commands::auth::RegisterOptions {
                first_name,
                last_name,
                email,
                password: password.password,
                login,
            };
            commands::auth::register(&open_dashboard()?, options).await
        }
        Commands::Logout => commands::auth::logout(&open_dashboard()?),
        Commands::Dashboard => commands::dashboard::show(&open_dashboard()?).await,

        Commands::Profile { command } => match command {
            ProfileCommands::Show => commands::profile::show(&open_dashboard()?).await,
            ProfileCommands::Update {
                first_name,
                last_name,
                email,
            } => {
                let update = ProfileUpdate {
                    first_name,
                    last_name,
                    email,
                };
                commands::profile::update(&open_dashboard()?, update).await
            }
        },

        Commands::Transactions { command } => match command {
            TransactionCommands::List { page } => {
                commands::transactions::list(&open_dashboard()?, page).await
            }
            TransactionCommands::Create { amount, church } => {
                commands::transactions::create(&open_dashboard()?, &amount, church).await
            }
        },

        Commands::Churches { command } => match command {
            ChurchCommands::List => commands::churches::list(&open_dashboard()?).await,
        },

        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
            ConfigCommands::Set { key, value } => commands::config::set(&key, &value),
        },
    }
}

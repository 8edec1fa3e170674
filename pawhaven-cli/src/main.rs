//! Pawhaven CLI - drive the session layer from a terminal
//!
//! Every command restores the persisted session first, exactly as the web
//! client does on start-up, then performs its operation.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use pawhaven_core::{init_logging, PawhavenConfig, ProfileUpdate, RegisterRequest};
use pawhaven_session::{
    ApiClientConfig, AuthSession, FileStore, GuardDecision, Location, MemoryNavigator,
    RouteTable, SessionError, TokenStore,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "pawhaven")]
#[command(about = "Sign in to a Pawhaven backend and inspect route access")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,

        /// Keep the session for later commands
        #[arg(long)]
        remember: bool,
    },

    /// Create an account and sign in
    Register {
        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,

        #[arg(long)]
        photo_url: Option<String>,
    },

    /// Sign out and forget the stored session
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Update profile fields
    Profile {
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        photo_url: Option<String>,
    },

    /// Show what the route guards decide for a path
    Route {
        /// Path, e.g. /dashboard/admin
        path: String,
    },

    /// Manage configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Write a default configuration file
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;

    let mut logging_config = config.logging.clone();
    if cli.verbose {
        logging_config.level = "debug".to_string();
    }
    init_logging(&logging_config).map_err(|e| anyhow::anyhow!(e))?;

    info!("Starting Pawhaven CLI v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Login {
            email,
            password,
            remember,
        } => handle_login(&config, &email, &password, remember).await,
        Commands::Register {
            name,
            email,
            password,
            photo_url,
        } => {
            let request = RegisterRequest {
                name,
                email,
                password,
                photo_url,
                ..Default::default()
            };
            handle_register(&config, request).await
        }
        Commands::Logout => handle_logout(&config).await,
        Commands::Whoami => handle_whoami(&config).await,
        Commands::Profile { name, photo_url } => {
            let update = ProfileUpdate {
                name,
                photo_url,
                ..Default::default()
            };
            handle_profile(&config, update).await
        }
        Commands::Route { path } => handle_route(&config, &path).await,
        Commands::Config { show, init } => handle_config(cli.config.as_deref(), show, init),
    }
}

fn load_config(config_path: Option<&Path>) -> anyhow::Result<PawhavenConfig> {
    if let Some(path) = config_path {
        return PawhavenConfig::load(Some(path))
            .with_context(|| format!("Failed to load configuration from {:?}", path));
    }

    match PawhavenConfig::default_paths()
        .into_iter()
        .find(|path| path.exists())
    {
        Some(path) => PawhavenConfig::load(Some(&path))
            .with_context(|| format!("Failed to load configuration from {:?}", path)),
        None => PawhavenConfig::load(None).context("Failed to load default configuration"),
    }
}

/// Restore the persisted session, standing at `at`
async fn boot_session(config: &PawhavenConfig, at: Location) -> anyhow::Result<AuthSession> {
    let state_path = config.storage.state_path();
    debug!("Using session state at {:?}", state_path);

    let store = FileStore::new(&state_path)?;
    let session = AuthSession::new(
        ApiClientConfig::from(&config.api),
        TokenStore::new(Arc::new(store)),
        Arc::new(MemoryNavigator::new(at)),
    )?;

    session.init().await;
    Ok(session)
}

/// Wrap a session failure with the text a user should see
fn report(error: SessionError) -> anyhow::Error {
    let message = error.user_message();
    anyhow::Error::new(error).context(message)
}

async fn handle_login(
    config: &PawhavenConfig,
    email: &str,
    password: &str,
    remember: bool,
) -> anyhow::Result<()> {
    let session = boot_session(config, Location::new("/login")).await?;

    let user = if remember {
        session.login_remembered(email, password, true).await
    } else {
        session.login(email, password).await
    }
    .map_err(report)?;

    println!("Signed in as {}", user.display_string());
    if !remember {
        println!("The session ends with this command; pass --remember to keep it.");
    }
    Ok(())
}

async fn handle_register(config: &PawhavenConfig, request: RegisterRequest) -> anyhow::Result<()> {
    let session = boot_session(config, Location::new("/register")).await?;
    let user = session.register(request).await.map_err(report)?;

    println!("Registered and signed in as {}", user.display_string());
    Ok(())
}

async fn handle_logout(config: &PawhavenConfig) -> anyhow::Result<()> {
    let session = boot_session(config, Location::new("/")).await?;
    let was_signed_in = session.user().is_some();

    session.logout().await.map_err(report)?;

    if was_signed_in {
        println!("Signed out");
    } else {
        println!("No active session; local state cleared");
    }
    Ok(())
}

async fn handle_whoami(config: &PawhavenConfig) -> anyhow::Result<()> {
    let session = boot_session(config, Location::new("/")).await?;

    match session.user() {
        Some(user) => {
            println!("{}", user.display_string());
            println!("id:     {}", user.id);
            if let Some(photo) = &user.photo_url {
                println!("photo:  {}", photo);
            }
            println!("admin:  {}", session.is_admin());
        }
        None => println!("Not signed in"),
    }
    Ok(())
}

async fn handle_profile(config: &PawhavenConfig, update: ProfileUpdate) -> anyhow::Result<()> {
    if update.is_empty() {
        bail!("Nothing to update; pass --name and/or --photo-url");
    }

    let session = boot_session(config, Location::new("/dashboard/profile")).await?;
    let user = session.update_profile(update).await.map_err(report)?;

    println!("Profile updated: {}", user.display_string());
    Ok(())
}

async fn handle_route(config: &PawhavenConfig, path: &str) -> anyhow::Result<()> {
    let requested = Location::parse(path);
    let session = boot_session(config, requested.clone()).await?;

    let decision = RouteTable::default().evaluate(&requested, Some(&session));
    println!("{}", describe_decision(&requested, &decision));
    Ok(())
}

fn describe_decision(requested: &Location, decision: &GuardDecision) -> String {
    match decision {
        GuardDecision::Loading => format!("{}: waiting for session", requested.path),
        GuardDecision::Render => format!("{}: render", requested.path),
        GuardDecision::Redirect(to) => {
            format!("{}: redirect to {}", requested.path, to.to_href())
        }
        GuardDecision::Unavailable(message) => format!("{}: error: {}", requested.path, message),
    }
}

fn handle_config(config_path: Option<&Path>, show: bool, init: bool) -> anyhow::Result<()> {
    if init {
        let path = match config_path {
            Some(path) => path.to_path_buf(),
            None => PawhavenConfig::default_paths()
                .into_iter()
                .next()
                .context("Could not determine a configuration directory")?,
        };

        if path.exists() {
            bail!("Configuration already exists at {:?}", path);
        }

        PawhavenConfig::default().save_to_file(&path)?;
        println!("Configuration initialized at: {:?}", path);
    }

    if show {
        let config = load_config(config_path)?;
        println!("{}", toml::to_string_pretty(&config)?);
    }

    if !init && !show {
        println!("Nothing to do; pass --show or --init");
    }

    Ok(())
}

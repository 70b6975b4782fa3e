use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use clap::Parser;
use scimserver::{
    AppState, auth::password::hash_password, build_app, config::ScimServerConfig, db::DbPool,
    observability,
};

/// Config file used when `--config` is not given.
const DEFAULT_CONFIG_PATH: &str = "scimserver.toml";

/// CLI arguments for the SCIM server
#[derive(Parser, Debug)]
#[command(version, about = "SCIM 2.0 provisioning server", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to config file (defaults to ./scimserver.toml; built-in defaults
    /// are used when that file does not exist)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Start the SCIM server (default)
    Serve,
    /// Apply database migrations and exit
    Migrate,
    /// Print a `{SSHA256}` hash for use as `auth.users[].password_hash`
    HashPassword {
        /// The password to hash
        password: String,
    },
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    match args.command {
        Some(Command::HashPassword { password }) => {
            println!("{}", hash_password(&password));
        }
        Some(Command::Migrate) => run_migrate(args.config).await,
        Some(Command::Serve) | None => run_server(args.config).await,
    }
}

/// Load configuration, or exit with a message on failure.
///
/// An explicit `--config` must exist; the default path falls back to
/// built-in defaults when missing.
fn load_config(explicit: Option<PathBuf>) -> ScimServerConfig {
    let result = match explicit {
        Some(path) => ScimServerConfig::from_file(&path),
        None if std::path::Path::new(DEFAULT_CONFIG_PATH).exists() => {
            ScimServerConfig::from_file(DEFAULT_CONFIG_PATH)
        }
        None => ScimServerConfig::from_str(""),
    };

    result.unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    })
}

fn init_logging(config: &ScimServerConfig) {
    if let Err(e) = observability::init_tracing(&config.observability) {
        eprintln!("Error: failed to initialize logging: {}", e);
        std::process::exit(1);
    }
}

async fn connect_database(config: &ScimServerConfig) -> DbPool {
    match DbPool::from_config(&config.database).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!(error = %e, "Failed to connect to database");
            std::process::exit(1);
        }
    }
}

async fn run_migrate(config_path: Option<PathBuf>) {
    let config = load_config(config_path);
    init_logging(&config);

    let db = connect_database(&config).await;
    if let Err(e) = db.run_migrations().await {
        tracing::error!(error = %e, "Migrations failed");
        std::process::exit(1);
    }
}

async fn run_server(config_path: Option<PathBuf>) {
    let config = load_config(config_path);
    init_logging(&config);

    if !config.auth.enabled {
        tracing::warn!("SCIM authentication is disabled; every client has full access");
    }

    let db = connect_database(&config).await;
    if config.database.run_migrations()
        && let Err(e) = db.run_migrations().await
    {
        tracing::error!(error = %e, "Migrations failed");
        std::process::exit(1);
    }

    let addr = SocketAddr::new(config.server.host, config.server.port);
    let state = AppState::new(Arc::new(db), Arc::new(config));
    let app = build_app(state);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, error = %e, "Failed to bind");
            std::process::exit(1);
        }
    };
    tracing::info!(%addr, "SCIM server listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }

    tracing::info!("Shutdown complete");
}

/// Resolve on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining in-flight requests");
}

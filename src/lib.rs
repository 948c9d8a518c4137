pub mod api;
pub mod auth;
pub mod config;
pub mod constants;
pub mod db;
pub mod entities;
pub mod models;
pub mod services;
pub mod state;

use tokio::signal;

pub use config::Config;
use db::Store;
use models::user::Role;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::load()?;
    config.validate()?;

    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_help();
        return Ok(());
    }

    match args[1].as_str() {
        "serve" | "-s" | "--serve" => run_server(config).await,

        "create-admin" => {
            if args.len() < 4 {
                println!("Usage: critiq create-admin <username> <email> [--superuser]");
                return Ok(());
            }
            let username = &args[2];
            let email = &args[3];
            let superuser = args.get(4).map(String::as_str) == Some("--superuser");
            cmd_create_admin(&config, username, email, superuser).await
        }

        "init" | "--init" => {
            Config::create_default_if_missing()?;
            println!("✓ Config file created. Edit config.toml and run again.");
            Ok(())
        }

        "help" | "-h" | "--help" => {
            print_help();
            Ok(())
        }

        _ => {
            println!("Unknown command: {}", args[1]);
            println!();
            print_help();
            Ok(())
        }
    }
}

fn print_help() {
    println!("Critiq - Content Review API Server");
    println!();
    println!("USAGE:");
    println!("  critiq <COMMAND> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("  serve                          Run the HTTP API server");
    println!("  create-admin <user> <email>    Create an admin account");
    println!("                                 (--superuser for a superuser)");
    println!("  init                           Create default config file");
    println!("  help                           Show this help message");
    println!();
    println!("CONFIG:");
    println!("  Edit config.toml to configure the database, server port, and mail.");
    println!("  Set CRITIQ_TOKEN_SECRET to override the signing secret.");
}

async fn cmd_create_admin(
    config: &Config,
    username: &str,
    email: &str,
    superuser: bool,
) -> anyhow::Result<()> {
    api::validation::validate_username(username).map_err(|e| anyhow::anyhow!(e))?;
    api::validation::validate_email(email).map_err(|e| anyhow::anyhow!(e))?;

    let store = Store::new(&config.general.database_path).await?;

    if store.get_user_by_username(username).await?.is_some() {
        println!("User '{}' already exists.", username);
        return Ok(());
    }
    if store.get_user_by_email(email).await?.is_some() {
        println!("Email '{}' is already in use.", email);
        return Ok(());
    }

    let user = store
        .create_user(username, email, Role::Admin, superuser)
        .await?;

    println!("✓ Created admin account: {} <{}>", user.username, user.email);
    if superuser {
        println!("  Superuser: yes");
    }
    println!();
    println!("Sign in via POST /api/v1/auth/signup followed by /api/v1/auth/token.");

    Ok(())
}

async fn run_server(config: Config) -> anyhow::Result<()> {
    info!("Critiq v{} starting...", env!("CARGO_PKG_VERSION"));

    if !config.server.enabled {
        anyhow::bail!("Server is disabled in config.toml");
    }

    let port = config.server.port;
    let api_state = api::create_app_state_from_config(config).await?;
    let app = api::router(api_state).await;

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("API server running at http://{}", addr);

    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Server error: {}", e);
        }
    });

    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!("Error listening for shutdown: {}", e),
    }

    server.abort();
    info!("Server stopped");

    Ok(())
}

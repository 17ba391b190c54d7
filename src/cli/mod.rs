//! CLI module for the storefront binary.
//!
//! Without a subcommand the binary starts the server. Subcommands:
//! - `config check` - Validate configuration file
//! - `user create` - Create an admin user directly in the database

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::api::auth::create_user;
use crate::config::Config;
use crate::db::{self, RegisterRequest};

/// CLI arguments structure
#[derive(Parser, Debug)]
#[command(name = "storefront")]
#[command(author, version, about = "Storefront catalog and admin backend", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "STOREFRONT_CONFIG", default_value = "storefront.toml")]
    pub config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Subcommand to run (if none, starts the server)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Configuration management commands
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Admin user management commands
    #[command(subcommand)]
    User(UserCommands),
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Validate configuration file
    Check,
}

/// User subcommands
#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// Create an admin user
    Create {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        /// Password (can also be set via STOREFRONT_ADMIN_PASSWORD env var)
        #[arg(long, env = "STOREFRONT_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

/// Run a CLI command
pub async fn run_command(cli: &Cli) -> Result<()> {
    match &cli.command {
        Some(Commands::Config(ConfigCommands::Check)) => cmd_config_check(cli),
        Some(Commands::User(UserCommands::Create {
            username,
            email,
            password,
        })) => cmd_user_create(cli, username, email, password).await,
        None => {
            // No subcommand means start the server - this is handled in main.rs
            Ok(())
        }
    }
}

/// Validate configuration file
fn cmd_config_check(cli: &Cli) -> Result<()> {
    let config_path = &cli.config;

    println!("Checking configuration file: {}", config_path.display());
    println!();

    if !config_path.exists() {
        println!(
            "[!!] Configuration file not found: {}",
            config_path.display()
        );
        println!();
        println!("A default configuration will be used when starting the server.");
        return Ok(());
    }

    match Config::load(config_path) {
        Ok(config) => {
            println!("[OK] Configuration file is valid!");
            println!();
            println!("=== Configuration Summary ===");
            println!();
            println!("Server:");
            println!("  Host:         {}", config.server.host);
            println!("  Port:         {}", config.server.port);
            println!("  Data Dir:     {}", config.server.data_dir.display());
            println!("  Static Dir:   {}", config.server.static_dir.display());
            println!();
            println!("Auth:");
            println!(
                "  Bootstrap Admin: {}",
                config.auth.admin_username.as_deref().unwrap_or("(none)")
            );
            println!(
                "  Registration: {}",
                if config.auth.allow_registration {
                    "Enabled"
                } else {
                    "First user only"
                }
            );
            println!("  Session TTL:  {}h", config.auth.session_ttl_hours);
            println!();
            println!("Catalog:");
            println!(
                "  Page Size:    {} (max {})",
                config
                    .catalog
                    .default_page_size
                    .map(|size| size.to_string())
                    .unwrap_or_else(|| "unlimited".to_string()),
                config.catalog.max_page_size
            );
            println!();

            if !config.auth.secure_cookies {
                println!("Warnings:");
                println!("  [!] secure_cookies is off - enable it when serving over HTTPS");
                println!();
            }

            Ok(())
        }
        Err(e) => {
            println!("[!!] Configuration file is invalid!");
            println!();
            println!("Error: {:#}", e);
            println!();
            anyhow::bail!("Invalid configuration file");
        }
    }
}

/// Create an admin user in the configured database
async fn cmd_user_create(cli: &Cli, username: &str, email: &str, password: &str) -> Result<()> {
    let config = Config::load(&cli.config)?;

    std::fs::create_dir_all(&config.server.data_dir).with_context(|| {
        format!(
            "Failed to create data directory: {}",
            config.server.data_dir.display()
        )
    })?;
    let pool = db::init(&config.server.data_dir).await?;

    let request = RegisterRequest {
        username: username.to_string(),
        email: email.to_string(),
        password: password.to_string(),
    };
    let user = create_user(&pool, &request)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create user: {}", e))?;

    println!("[OK] Created admin user '{}' (id {})", user.username, user.id);
    Ok(())
}

//! CLI module for the sanpo command-line interface.
//!
//! Running without a subcommand starts the API server. Subcommands:
//! - `config check` - Validate configuration file and print the resolved values
//! - `db seed-samples` - Insert the sample system courses into an empty catalog

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;

/// CLI arguments structure
#[derive(Parser, Debug)]
#[command(name = "sanpo")]
#[command(author, version, about = "Walking course planning and logging server", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "SANPO_CONFIG", default_value = "sanpo.toml")]
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

    /// Database management commands
    #[command(subcommand)]
    Db(DbCommands),
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Validate configuration file
    Check,
}

/// Database subcommands
#[derive(Subcommand, Debug)]
pub enum DbCommands {
    /// Insert the sample courses (relax, hungry, active) if no templates exist
    SeedSamples,
}

/// Run a CLI command
pub async fn run_command(cli: &Cli) -> Result<()> {
    match &cli.command {
        Some(Commands::Config(ConfigCommands::Check)) => cmd_config_check(cli),
        Some(Commands::Db(DbCommands::SeedSamples)) => cmd_seed_samples(cli).await,
        None => {
            // No subcommand means start the server - this is handled in main.rs
            Ok(())
        }
    }
}

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
            println!("  Upload Dir:   {}", config.server.upload_dir.display());
            println!("  Upload Limit: {} bytes", config.server.max_upload_bytes);
            println!();
            println!("Auth:");
            println!("  Token TTL:    {} hours", config.auth.session_ttl_hours);
            println!("  Min Password: {} characters", config.auth.min_password_length);
            println!();
            println!("CORS:");
            if config.cors.allowed_origins.is_empty() {
                println!("  Origins:      any");
            } else {
                for origin in &config.cors.allowed_origins {
                    println!("  Origin:       {}", origin);
                }
            }
            println!();
            println!("Logging:");
            println!("  Level:        {}", config.logging.level);
            println!();

            if config.cors.allowed_origins.is_empty() {
                println!("Warnings:");
                println!("  [!] No CORS origins configured - any origin may call the API");
                println!();
            }

            Ok(())
        }
        Err(e) => {
            println!("[!!] Configuration file is invalid!");
            println!();
            println!("Error: {:#}", e);
            println!();
            println!("Please check the configuration file syntax and try again.");
            anyhow::bail!("Invalid configuration file");
        }
    }
}

async fn cmd_seed_samples(cli: &Cli) -> Result<()> {
    let config = Config::load(&cli.config)?;

    std::fs::create_dir_all(&config.server.data_dir).with_context(|| {
        format!(
            "Failed to create data directory: {}",
            config.server.data_dir.display()
        )
    })?;

    let pool = crate::db::init(&config.server.data_dir).await?;
    let inserted = crate::db::seed_sample_courses(&pool).await?;

    if inserted == 0 {
        println!("Course templates already exist; nothing was inserted.");
    } else {
        println!("Inserted {} sample course templates.", inserted);
    }

    pool.close().await;
    Ok(())
}

//! CLI module for Canvasdive
//!
//! Provides commands:
//! - `layouts`, `area`, `types`: inspect the catalog and the area-string codec
//! - `new`, `show`, `add-item`, `dive`, `export`, `links`: work with stored canvases
//! - `config`: print the effective configuration

use anyhow::{Context, Result};
use canvasdive_canvas::SqliteCanvasStore;
use clap::{Parser, Subcommand};
use sqlx::sqlite::SqlitePoolOptions;
use std::path::PathBuf;
use uuid::Uuid;

use crate::config::AppConfig;

pub mod canvas;
pub mod config;
pub mod layout;

/// Canvasdive CLI
#[derive(Parser, Debug)]
#[command(name = "canvasdive")]
#[command(about = "Structured canvases with linked deep dives")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List layouts for a section count
    Layouts {
        /// Number of sections
        count: usize,
    },
    /// Decode an area string and show its geometry
    Area {
        /// Area string, e.g. "1 / 1 / 3 / 2"
        area: String,
        /// Grid columns
        #[arg(long, default_value_t = 3)]
        columns: usize,
        /// Grid rows
        #[arg(long, default_value_t = 3)]
        rows: usize,
    },
    /// List canvas types
    Types,
    /// Create a canvas
    New {
        /// Canvas type ID
        #[arg(long = "type")]
        type_id: String,
        /// Canvas name
        #[arg(long)]
        name: String,
        /// Optional description
        #[arg(long)]
        description: Option<String>,
    },
    /// Show a canvas
    Show {
        /// Canvas ID
        id: Uuid,
    },
    /// Add a text item to a section
    AddItem {
        /// Canvas ID
        id: Uuid,
        /// Section name
        section: String,
        /// Item text
        text: String,
    },
    /// Derive a linked child canvas from an item
    Dive {
        /// Parent canvas ID
        id: Uuid,
        /// Section holding the item
        section: String,
        /// Item ID
        item: Uuid,
        /// Canvas type for the child
        #[arg(long = "type")]
        type_id: String,
    },
    /// Export a canvas as a fixed-page HTML document
    Export {
        /// Canvas ID
        id: Uuid,
        /// Output file
        #[arg(long)]
        out: PathBuf,
    },
    /// Audit a canvas's parent and child links
    Links {
        /// Canvas ID
        id: Uuid,
    },
    /// Print the effective configuration
    Config,
}

/// Open the configured canvas store, creating tables if needed
pub async fn open_store(config: &AppConfig) -> Result<SqliteCanvasStore> {
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.storage.database_url)
        .await
        .with_context(|| format!("Failed to open {}", config.storage.database_url))?;
    let store = SqliteCanvasStore::new(pool);
    store.init().await.context("Failed to initialize schema")?;
    Ok(store)
}

/// Run the CLI command
pub async fn run(cli: Cli, config: AppConfig) -> Result<()> {
    match cli.command {
        Some(Commands::Layouts { count }) => layout::layouts(count).await,
        Some(Commands::Area {
            area,
            columns,
            rows,
        }) => layout::area(&config, &area, columns, rows),
        Some(Commands::Types) => layout::types().await,
        Some(Commands::New {
            type_id,
            name,
            description,
        }) => canvas::create(&config, &type_id, &name, description).await,
        Some(Commands::Show { id }) => canvas::show(&config, id).await,
        Some(Commands::AddItem { id, section, text }) => {
            canvas::add_item(&config, id, &section, &text).await
        }
        Some(Commands::Dive {
            id,
            section,
            item,
            type_id,
        }) => canvas::dive(&config, id, &section, item, &type_id).await,
        Some(Commands::Export { id, out }) => canvas::export(&config, id, &out).await,
        Some(Commands::Links { id }) => canvas::links(&config, id).await,
        Some(Commands::Config) => config::show(&config),
        None => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            cmd.print_help()?;
            println!();
            Ok(())
        }
    }
}

//! Command-line interface for the arena server.

use clap::{Parser, Subcommand};

/// Arena - authoritative tic-tac-toe match server
#[derive(Parser, Debug)]
#[command(name = "arena")]
#[command(about = "Authoritative tic-tac-toe match server", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Apply database migrations
    Migrate {
        /// Path to the database file (created if it doesn't exist)
        #[arg(long)]
        db_path: Option<String>,

        /// Path to the server config file
        #[arg(short, long, default_value = "arena.toml")]
        config: std::path::PathBuf,
    },

    /// Host a scripted match between two players and settle it
    Demo {
        /// Path to the server config file
        #[arg(short, long, default_value = "arena.toml")]
        config: std::path::PathBuf,

        /// Match mode tag
        #[arg(long, default_value = "casual")]
        mode: String,

        /// Cells played in order, alternating X and O (comma-separated)
        #[arg(long, default_value = "4,0,2,1,6", value_delimiter = ',')]
        moves: Vec<i64>,
    },

    /// Print leaderboard standings
    Leaderboard {
        /// Path to the database file
        #[arg(long)]
        db_path: Option<String>,

        /// Path to the server config file
        #[arg(short, long, default_value = "arena.toml")]
        config: std::path::PathBuf,

        /// Show today's standings instead of all-time
        #[arg(long)]
        daily: bool,

        /// Maximum rows
        #[arg(long, default_value = "10")]
        limit: i64,
    },
}

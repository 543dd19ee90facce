//! A utility for creating and initializing a pocketledger SQLite database.

use std::path::PathBuf;
use std::process::exit;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use pocketledger::{
    models::{Email, PasswordHash},
    stores::{
        sqlite::{initialize, open, SqliteUserStore},
        UserStore,
    },
};

/// Create an empty pocketledger database, optionally seeded with a demo user
/// for manual testing.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: PathBuf,

    /// Also create a demo user (demo@example.com with the password "test").
    #[arg(long)]
    demo_user: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    if args.output_path.is_file() {
        eprintln!("File already exists at {:?}!", args.output_path);
        exit(1);
    }

    tracing::info!("creating database at {:?}", args.output_path);
    let connection = open(&args.output_path, Duration::from_secs(5))?;
    initialize(&connection)?;

    if args.demo_user {
        let mut users = SqliteUserStore::new(Arc::new(Mutex::new(connection)));
        let user = users.create(Email::new("demo@example.com")?, PasswordHash::new("test")?)?;
        tracing::info!(user_id = %user.id, "created demo user");
    }

    tracing::info!("done");

    Ok(())
}

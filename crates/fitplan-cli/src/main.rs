//! fitplan command-line client.
//!
//! Reads `fitplan.toml` (or the path given with `--config`) plus `FITPLAN_*`
//! environment variables, opens the local SQLite store, and runs one
//! command against it. The signed-in session persists in the store between
//! invocations.

mod commands;
mod render;

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use fitplan_store_sqlite::SqliteBackend;
use fitplan_sync::{Client, ClientConfig};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

// ─── CLI args ────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "fitplan", author, version, about = "Workout plans from the terminal")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, value_name = "FILE", default_value = "fitplan.toml")]
  config: PathBuf,

  /// Print results as JSON instead of text.
  #[arg(long, global = true)]
  json: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Create an account and sign in.
  Register {
    #[arg(long)]
    email:    String,
    #[arg(long)]
    name:     String,
    /// Preferred username; one is derived from the email otherwise.
    #[arg(long)]
    username: Option<String>,
    #[arg(long, env = "FITPLAN_PASSWORD", hide_env_values = true)]
    password: Option<String>,
  },
  /// Sign in to an existing account.
  Login {
    #[arg(long)]
    email:    String,
    #[arg(long, env = "FITPLAN_PASSWORD", hide_env_values = true)]
    password: Option<String>,
  },
  Logout,
  /// Show the signed-in account.
  Whoami,
  /// Request a password-reset email.
  ResetPassword { email: String },
  /// Show or edit a profile.
  Profile {
    #[command(subcommand)]
    action: ProfileCommand,
  },
  /// List plans from one collection.
  Plans {
    #[command(subcommand)]
    which: PlansCommand,
  },
  /// Show one plan with its days and exercises.
  Show { plan: Uuid },
  /// Create a plan from a TOML definition.
  Create { file: PathBuf },
  /// Change a plan's header fields.
  Update(UpdateArgs),
  /// Replace a plan's days with those from a TOML definition.
  Resave { plan: Uuid, file: PathBuf },
  Delete { plan: Uuid },
  Like { plan: Uuid },
  Unlike { plan: Uuid },
  Save { plan: Uuid },
  Unsave { plan: Uuid },
  /// Record a lifted weight for an exercise.
  Log {
    exercise: Uuid,
    /// Weight in kilograms; `52,5` and `52.5` are both accepted.
    weight:   String,
    #[arg(long)]
    note:     Option<String>,
  },
  /// Show your weight history for an exercise, most recent first.
  History { exercise: Uuid },
}

#[derive(Subcommand)]
enum ProfileCommand {
  /// Show a profile and its stats; defaults to your own.
  Show { username: Option<String> },
  /// Edit your profile.
  Update {
    #[arg(long)]
    name:     Option<String>,
    #[arg(long)]
    username: Option<String>,
    #[arg(long)]
    email:    Option<String>,
    /// Prompt for a new password.
    #[arg(long)]
    password: bool,
  },
}

#[derive(Subcommand)]
enum PlansCommand {
  /// Plans you created.
  Mine,
  /// Plans you saved.
  Saved,
  /// Public plans, most liked first.
  Explore,
  /// Public plans by one user.
  User { username: String },
}

#[derive(Args)]
struct UpdateArgs {
  plan:              Uuid,
  #[arg(long)]
  name:              Option<String>,
  #[arg(long, conflicts_with = "clear_description")]
  description:       Option<String>,
  #[arg(long)]
  clear_description: bool,
  #[arg(long)]
  glyph:             Option<String>,
  #[arg(long, conflicts_with = "private")]
  public:            bool,
  #[arg(long)]
  private:           bool,
}

// ─── Entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config.clone()).required(false))
    .add_source(config::Environment::with_prefix("FITPLAN"))
    .build()
    .context("failed to read config file")?;

  let client_cfg: ClientConfig = settings
    .try_deserialize()
    .context("failed to deserialise ClientConfig")?;

  let store_path = expand_tilde(&client_cfg.store_path);
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }

  let backend = SqliteBackend::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  tracing::debug!(path = ?store_path, "store opened");

  let client = Client::start(backend, client_cfg.store_options()).await;
  let out = render::Output { json: cli.json };

  commands::run(&client, cli.command, out).await
}

/// Expand a leading `~/` to the home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  if let Ok(rest) = path.strip_prefix("~")
    && let Some(home) = std::env::var_os("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

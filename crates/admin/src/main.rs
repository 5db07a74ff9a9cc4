//! `sportos-admin`: manage the sportos content collections from a terminal.

mod commands;
mod render;

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use models::{
    EntityKind,
    banner::Banner,
    featured_player::FeaturedPlayer,
    fixture::{Fixture, MatchStatus},
    league::League,
    news::News,
    player::Player,
    sponsor::Sponsor,
    standing::Standing,
    star_performer::StarPerformer,
    trophy::Trophy,
    user::User,
};
use services::services::{config::Config, refresher::AutoRefresher};
use tracing::info;

use crate::commands::Dashboard;

#[derive(Parser)]
#[command(name = "sportos-admin", version, about = "Sportos content dashboard")]
struct Cli {
    /// Config file (defaults to <config dir>/sportos-admin/config.toml)
    #[arg(long, env = "SPORTOS_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[arg(long, env = "SPORTOS_API_URL", global = true)]
    api_url: Option<String>,

    #[arg(long, env = "SPORTOS_USERS_API_URL", global = true)]
    users_api_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, env = "SPORTOS_TIMEOUT_SECS", global = true)]
    timeout: Option<u64>,

    /// How often failed reads are retried
    #[arg(long, env = "SPORTOS_READ_RETRIES", global = true)]
    read_retries: Option<usize>,

    #[arg(long, env = "SPORTOS_UPLOAD_URL", global = true)]
    upload_url: Option<String>,

    #[arg(long, env = "SPORTOS_UPLOAD_PRESET", global = true)]
    upload_preset: Option<String>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, env = "SPORTOS_LOG", default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print a collection
    List {
        kind: EntityKind,
        /// Only matches with this status
        #[arg(long)]
        status: Option<MatchStatus>,
        /// Only players in this position
        #[arg(long)]
        position: Option<String>,
        /// Standings tab to show (defaults to the first league)
        #[arg(long)]
        league: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Create a record from a JSON file; a JSON array creates star performers in bulk
    Create {
        kind: EntityKind,
        file: PathBuf,
        /// Upload an image into a field, e.g. `--image team1.logo_url=crest.png`
        #[arg(long = "image", value_name = "FIELD=PATH", value_parser = parse_image)]
        images: Vec<(String, PathBuf)>,
    },
    /// Edit a record, merging an optional JSON file over it
    Update {
        kind: EntityKind,
        id: String,
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long = "image", value_name = "FIELD=PATH", value_parser = parse_image)]
        images: Vec<(String, PathBuf)>,
    },
    /// Delete a record
    Delete { kind: EntityKind, id: String },
    /// Upload an image and print its hosted URL
    Upload { path: PathBuf },
    /// Keep collections fresh and report changes until interrupted
    Watch {
        kinds: Vec<EntityKind>,
        /// Poll interval in seconds
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        interval: Option<u64>,
    },
    /// Inspect or write the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the config file location
    Path,
    /// Write the effective configuration to the config file
    Save,
}

fn parse_image(arg: &str) -> Result<(String, PathBuf), String> {
    let (field, path) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=PATH, got `{arg}`"))?;
    if field.is_empty() || path.is_empty() {
        return Err(format!("expected FIELD=PATH, got `{arg}`"));
    }
    Ok((field.to_string(), PathBuf::from(path)))
}

impl Cli {
    fn config_path(&self) -> Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => Ok(Config::default_path()?),
        }
    }

    /// File settings with flags and environment layered on top.
    fn load_config(&self, path: &Path) -> Result<Config> {
        let mut config = Config::load_from(path)?;

        if let Some(url) = &self.api_url {
            config.api.base_url = url.clone();
        }
        if let Some(url) = &self.users_api_url {
            config.api.users_base_url = url.clone();
        }
        if let Some(secs) = self.timeout {
            config.api.timeout_secs = secs;
        }
        if let Some(retries) = self.read_retries {
            config.api.read_retries = retries;
        }
        if let Some(url) = &self.upload_url {
            config.media.upload_url = Some(url.clone());
        }
        if let Some(preset) = &self.upload_preset {
            config.media.upload_preset = preset.clone();
        }
        Ok(config)
    }
}

/// Run `commands::$run` for the record type behind `$kind`. Matches span
/// three store slots, so the caller supplies their list.
macro_rules! with_list {
    ($dash:expr, $kind:expr, $matches:expr, $run:ident($($arg:expr),*)) => {
        match $kind {
            EntityKind::Match => commands::$run::<Fixture>($matches, $($arg),*).await,
            EntityKind::Player => commands::$run::<Player>($dash.list(), $($arg),*).await,
            EntityKind::FeaturedPlayer => {
                commands::$run::<FeaturedPlayer>($dash.list(), $($arg),*).await
            }
            EntityKind::Banner => commands::$run::<Banner>($dash.list(), $($arg),*).await,
            EntityKind::Sponsor => commands::$run::<Sponsor>($dash.list(), $($arg),*).await,
            EntityKind::Trophy => commands::$run::<Trophy>($dash.list(), $($arg),*).await,
            EntityKind::League => commands::$run::<League>($dash.list(), $($arg),*).await,
            EntityKind::News => commands::$run::<News>($dash.list(), $($arg),*).await,
            EntityKind::Standing => commands::$run::<Standing>($dash.list(), $($arg),*).await,
            EntityKind::StarPerformer => {
                commands::$run::<StarPerformer>($dash.list(), $($arg),*).await
            }
            EntityKind::User => commands::$run::<User>($dash.list(), $($arg),*).await,
        }
    };
}

async fn create(
    dash: &Dashboard,
    kind: EntityKind,
    file: &Path,
    images: &[(String, PathBuf)],
) -> Result<()> {
    match kind {
        EntityKind::Match => commands::create::<Fixture>(dash, file, images).await,
        EntityKind::Player => commands::create::<Player>(dash, file, images).await,
        EntityKind::FeaturedPlayer => commands::create::<FeaturedPlayer>(dash, file, images).await,
        EntityKind::Banner => commands::create::<Banner>(dash, file, images).await,
        EntityKind::Sponsor => commands::create::<Sponsor>(dash, file, images).await,
        EntityKind::Trophy => commands::create::<Trophy>(dash, file, images).await,
        EntityKind::League => commands::create::<League>(dash, file, images).await,
        EntityKind::News => commands::create::<News>(dash, file, images).await,
        EntityKind::Standing => commands::create::<Standing>(dash, file, images).await,
        EntityKind::StarPerformer => commands::create::<StarPerformer>(dash, file, images).await,
        EntityKind::User => anyhow::bail!("users sign up through the public site"),
    }
}

async fn watch(dash: &Dashboard, kinds: Vec<EntityKind>, interval: Duration) -> Result<()> {
    let store = &dash.store;
    let mut reporters = Vec::new();
    for kind in &kinds {
        macro_rules! report {
            ($record:ty) => {
                commands::report_changes(kind.to_string(), store.subscribe::<$record>())
            };
        }
        match kind {
            EntityKind::Match => {
                for status in MatchStatus::ALL {
                    reporters.push(commands::report_changes(
                        format!("{status} matches"),
                        store.match_slot(status).subscribe(),
                    ));
                }
            }
            EntityKind::Player => reporters.push(report!(Player)),
            EntityKind::FeaturedPlayer => reporters.push(report!(FeaturedPlayer)),
            EntityKind::Banner => reporters.push(report!(Banner)),
            EntityKind::Sponsor => reporters.push(report!(Sponsor)),
            EntityKind::Trophy => reporters.push(report!(Trophy)),
            EntityKind::League => reporters.push(report!(League)),
            EntityKind::News => reporters.push(report!(News)),
            EntityKind::Standing => reporters.push(report!(Standing)),
            EntityKind::StarPerformer => reporters.push(report!(StarPerformer)),
            EntityKind::User => reporters.push(report!(User)),
        }
    }

    let refresher = AutoRefresher::spawn(store.clone(), kinds, interval);
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;

    info!("interrupted, shutting down");
    store.close();
    refresher.await?;
    for reporter in reporters {
        reporter.abort();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    utils::logging::init(&cli.log_level)?;

    let config_path = cli.config_path()?;
    let config = cli.load_config(&config_path)?;

    match cli.command {
        Command::Config { action } => match action {
            ConfigAction::Show => print!("{}", toml::to_string_pretty(&config)?),
            ConfigAction::Path => println!("{}", config_path.display()),
            ConfigAction::Save => {
                config.save_to(&config_path)?;
                println!("Wrote {}", config_path.display());
            }
        },
        Command::List {
            kind,
            status,
            position,
            league,
            json,
        } => {
            let dash = Dashboard::connect(&config)?;
            match kind {
                EntityKind::Match => commands::list_matches(&dash, status, json).await?,
                EntityKind::Player => {
                    commands::list_players(&dash, position.as_deref(), json).await?
                }
                EntityKind::Standing => {
                    commands::list_standings(&dash, league.as_deref(), json).await?
                }
                other => with_list!(dash, other, dash.matches(MatchStatus::Live), list_rows(json))?,
            }
        }
        Command::Create { kind, file, images } => {
            let dash = Dashboard::connect(&config)?;
            create(&dash, kind, &file, &images).await?;
        }
        Command::Update {
            kind,
            id,
            file,
            images,
        } => {
            let dash = Dashboard::connect(&config)?;
            with_list!(
                dash,
                kind,
                dash.match_list_with(&id).await?,
                update(&id, file.as_deref(), &images)
            )?;
        }
        Command::Delete { kind, id } => {
            let dash = Dashboard::connect(&config)?;
            with_list!(dash, kind, dash.match_list_with(&id).await?, delete(&id))?;
        }
        Command::Upload { path } => {
            let dash = Dashboard::connect(&config)?;
            commands::upload(&dash, &path).await?;
        }
        Command::Watch { kinds, interval } => {
            let kinds = if kinds.is_empty() {
                config.refresh.kinds.clone()
            } else {
                kinds
            };
            let interval = interval
                .map(Duration::from_secs)
                .unwrap_or_else(|| config.refresh.interval());
            let dash = Dashboard::connect(&config)?;
            watch(&dash, kinds, interval).await?;
        }
    }

    Ok(())
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for drafting and saving canvassing territories.
//!
//! Every command prints the final draft snapshot (and the saved territory,
//! if any) as JSON on stdout. A rejected or failed step exits non-zero.

mod config;

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use canvass_client::http::HttpTerritoryApi;
use canvass_draft::{
    Collaborators, DraftMachine, DraftSnapshot, SaveOutcome, ValidationOutcome,
};
use canvass_residents::{ResidentStore, TerritoryStore};
use canvass_territory_models::{LocationSelection, Point, Resident, Territory};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::CliConfig;

#[derive(Parser)]
#[command(name = "canvass", about = "Territory boundary capture and synchronization")]
struct Cli {
    /// TOML configuration file (defaults to the embedded API settings)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// JSON array of residents already on record, used for membership and
    /// de-duplication
    #[arg(long, global = true)]
    residents: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a drawn boundary against existing territories
    Validate {
        /// JSON array of `{ "latitude", "longitude" }` vertices
        #[arg(long)]
        drawing: PathBuf,
    },
    /// Validate a drawn boundary and save it as a new territory
    Create {
        /// JSON array of `{ "latitude", "longitude" }` vertices
        #[arg(long)]
        drawing: PathBuf,
        /// Territory name
        #[arg(long)]
        name: String,
        /// Territory description
        #[arg(long, default_value = "")]
        description: String,
        /// Area id
        #[arg(long)]
        area: String,
        /// Municipality id
        #[arg(long)]
        municipality: String,
        /// Community id
        #[arg(long)]
        community: String,
    },
    /// Open a persisted territory, optionally re-draw it, and save
    Edit {
        /// JSON territory as previously returned by `create`
        #[arg(long)]
        territory: PathBuf,
        /// Replacement boundary; the stored one is kept when omitted
        #[arg(long)]
        drawing: Option<PathBuf>,
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// New description
        #[arg(long)]
        description: Option<String>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Report {
    snapshot: DraftSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    saved: Option<Territory>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    pretty_env_logger::formatted_builder()
        .parse_env("RUST_LOG")
        .init();
    let cli = Cli::parse();

    let config = CliConfig::load(cli.config.as_deref())?;
    let residents: Vec<Resident> = match &cli.residents {
        Some(path) => read_json(path)?,
        None => Vec::new(),
    };
    log::info!(
        "Using territory API at {} with {} known resident(s)",
        config.api.base_url,
        residents.len()
    );

    let api = Arc::new(HttpTerritoryApi::new(config.api)?);
    let machine = DraftMachine::new(
        Collaborators::from_api(api),
        Arc::new(ResidentStore::with_residents(residents)),
        Arc::new(TerritoryStore::new()),
        config.engine,
    );

    let result = run(&machine, cli.command).await;

    let report = Report {
        snapshot: machine.snapshot(),
        saved: result.as_ref().ok().cloned().flatten(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    result.map(|_| ())
}

async fn run(machine: &DraftMachine, command: Commands) -> Result<Option<Territory>, Box<dyn Error>> {
    match command {
        Commands::Validate { drawing } => {
            draw(machine, &read_json::<Vec<Point>>(&drawing)?)?;
            accept(machine.complete_shape().await?)?;
            Ok(None)
        }
        Commands::Create {
            drawing,
            name,
            description,
            area,
            municipality,
            community,
        } => {
            draw(machine, &read_json::<Vec<Point>>(&drawing)?)?;
            accept(machine.complete_shape().await?)?;
            machine.set_name(name)?;
            machine.set_description(description)?;
            machine.set_location(LocationSelection::new(area, municipality, community))?;
            save(machine).await.map(Some)
        }
        Commands::Edit {
            territory,
            drawing,
            name,
            description,
        } => {
            machine.open_territory(read_json(&territory)?)?;
            if let Some(drawing) = drawing {
                let polygon: Vec<Point> = read_json(&drawing)?;
                accept(machine.edit_existing(&polygon).await?)?;
            }
            if let Some(name) = name {
                machine.set_name(name)?;
            }
            if let Some(description) = description {
                machine.set_description(description)?;
            }
            save(machine).await.map(Some)
        }
    }
}

fn draw(machine: &DraftMachine, points: &[Point]) -> Result<(), Box<dyn Error>> {
    for point in points {
        machine.add_vertex(*point)?;
    }
    Ok(())
}

fn accept(outcome: ValidationOutcome) -> Result<(), Box<dyn Error>> {
    match outcome {
        ValidationOutcome::Ready { pending, reused } => {
            log::info!(
                "Boundary accepted{}: {} resident(s) inside",
                if reused { " (unchanged)" } else { "" },
                pending.residents.len()
            );
            Ok(())
        }
        ValidationOutcome::Rejected { errors } => Err(errors.join("\n").into()),
        ValidationOutcome::Failed { message } => Err(message.into()),
        ValidationOutcome::Discarded => Err("Validation was superseded".into()),
    }
}

async fn save(machine: &DraftMachine) -> Result<Territory, Box<dyn Error>> {
    match machine.save().await? {
        SaveOutcome::Created(territory) | SaveOutcome::Updated(territory) => Ok(territory),
        SaveOutcome::Failed { message } => Err(message.into()),
        SaveOutcome::Discarded => Err("Save was superseded".into()),
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, Box<dyn Error>> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    Ok(serde_json::from_str(&contents)?)
}

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use catalog::auth::Principal;
use catalog::config::AppConfig;
use catalog::error::AppError;
use catalog::models::category::{CreateCategoryRequest, UpdateCategoryRequest};
use catalog::models::image::SetImageOrderRequest;
use catalog::models::vehicle::{VehicleInput, VehicleListQuery};
use catalog::services::vehicle::DEFAULT_RELATED_LIMIT;
use catalog::state::AppState;
use clap::{Parser, Subcommand};
use common::VehicleStatus;
use serde::Serialize;
use tracing::{Level, info};

#[derive(Parser)]
#[command(
    name = "dealer-catalog",
    about = "Administer the dealership inventory and its images"
)]
struct Cli {
    /// Config file stem; `.toml`, `.yaml` and `.json` are tried.
    #[arg(long, global = true, default_value = "config/config")]
    config: String,
    /// Bearer token required by every mutating command.
    #[arg(long, global = true, env = "CATALOG_TOKEN", hide_env_values = true)]
    token: Option<String>,
    /// Log at DEBUG instead of INFO.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Vehicle categories
    Category {
        #[command(subcommand)]
        action: CategoryAction,
    },
    /// Inventory records
    Vehicle {
        #[command(subcommand)]
        action: VehicleAction,
    },
    /// Vehicle images
    Image {
        #[command(subcommand)]
        action: ImageAction,
    },
}

#[derive(Subcommand)]
enum CategoryAction {
    List,
    /// Show a category by numeric id or slug
    Show { key: String },
    Create {
        #[arg(long)]
        name_local: String,
        #[arg(long)]
        name_global: String,
        #[arg(long)]
        slug: String,
    },
    Update {
        id: i32,
        #[arg(long)]
        name_local: Option<String>,
        #[arg(long)]
        name_global: Option<String>,
        #[arg(long)]
        slug: Option<String>,
    },
    Delete { id: i32 },
    /// Replace the icon with the SVG markup in FILE
    SetIcon { id: i32, file: PathBuf },
    ClearIcon { id: i32 },
}

#[derive(Subcommand)]
enum VehicleAction {
    List {
        /// Category slug
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        min_price: Option<i64>,
        #[arg(long)]
        max_price: Option<i64>,
        #[arg(long)]
        min_year: Option<i32>,
        #[arg(long)]
        max_year: Option<i32>,
        #[arg(long)]
        status: Option<VehicleStatus>,
        #[arg(long)]
        page: Option<u64>,
        #[arg(long)]
        page_size: Option<u64>,
    },
    Show { id: i32 },
    Search { query: String },
    /// Create a vehicle from a JSON file
    Create { file: PathBuf },
    /// Replace every field of a vehicle from a JSON file
    Update { id: i32, file: PathBuf },
    /// Set the sales status (available, reserved, sold)
    Status { id: i32, status: VehicleStatus },
    /// Delete a vehicle and all of its images
    Delete { id: i32 },
    /// Recommend similar available vehicles
    Related {
        id: i32,
        #[arg(long, default_value_t = DEFAULT_RELATED_LIMIT)]
        limit: u64,
    },
}

#[derive(Subcommand)]
enum ImageAction {
    List { vehicle_id: i32 },
    Upload {
        vehicle_id: i32,
        file: PathBuf,
        /// Declared MIME type; guessed from the file extension when omitted
        #[arg(long)]
        mime: Option<String>,
    },
    Delete { id: i32 },
    /// Swap the display order of two images
    Swap { vehicle_id: i32, a: i32, b: i32 },
    /// Set the full display order, first id shown first
    Order {
        vehicle_id: i32,
        #[arg(required = true, num_args = 1..)]
        image_ids: Vec<i32>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast::<AppError>() {
                Ok(app) => {
                    let body = app.into_body();
                    match serde_json::to_string_pretty(&body) {
                        Ok(json) => eprintln!("{json}"),
                        Err(_) => eprintln!("{}: {}", body.code, body.message),
                    }
                }
                Err(other) => eprintln!("error: {other:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = AppConfig::load_from(&cli.config).context("failed to load configuration")?;
    let state = AppState::build(config).await?;
    let token = cli.token.as_deref();

    match cli.command {
        Command::Category { action } => run_category(&state, token, action).await,
        Command::Vehicle { action } => run_vehicle(&state, token, action).await,
        Command::Image { action } => run_image(&state, token, action).await,
    }
}

fn authorize(state: &AppState, token: Option<&str>) -> Result<Principal, AppError> {
    let token = token.ok_or(AppError::Unauthorized)?;
    let principal = state.auth.authenticate(token)?;
    info!(user = %principal.username, role = %principal.role, "Authenticated");
    Ok(principal)
}

async fn run_category(
    state: &AppState,
    token: Option<&str>,
    action: CategoryAction,
) -> anyhow::Result<()> {
    let registry = &state.categories;
    match action {
        CategoryAction::List => print_json(&registry.list().await?),
        CategoryAction::Show { key } => {
            let found = match key.parse::<i32>() {
                Ok(id) => registry.get(id).await?,
                Err(_) => registry.get_by_slug(&key).await?,
            };
            print_json(&found)
        }
        CategoryAction::Create {
            name_local,
            name_global,
            slug,
        } => {
            authorize(state, token)?;
            let created = registry
                .create(CreateCategoryRequest {
                    name_local,
                    name_global,
                    slug,
                })
                .await?;
            print_json(&created)
        }
        CategoryAction::Update {
            id,
            name_local,
            name_global,
            slug,
        } => {
            authorize(state, token)?;
            let updated = registry
                .update(
                    id,
                    UpdateCategoryRequest {
                        name_local,
                        name_global,
                        slug,
                    },
                )
                .await?;
            print_json(&updated)
        }
        CategoryAction::Delete { id } => {
            authorize(state, token)?;
            registry.delete(id).await?;
            print_json(&serde_json::json!({ "deleted": id }))
        }
        CategoryAction::SetIcon { id, file } => {
            authorize(state, token)?;
            let markup = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            print_json(&registry.set_icon(id, &markup).await?)
        }
        CategoryAction::ClearIcon { id } => {
            authorize(state, token)?;
            print_json(&registry.clear_icon(id).await?)
        }
    }
}

async fn run_vehicle(
    state: &AppState,
    token: Option<&str>,
    action: VehicleAction,
) -> anyhow::Result<()> {
    let vehicles = &state.vehicles;
    match action {
        VehicleAction::List {
            category,
            min_price,
            max_price,
            min_year,
            max_year,
            status,
            page,
            page_size,
        } => {
            let query = VehicleListQuery {
                category,
                min_price,
                max_price,
                min_year,
                max_year,
                status,
                page,
                page_size,
            };
            print_json(&vehicles.list(query).await?)
        }
        VehicleAction::Show { id } => print_json(&vehicles.get(id).await?),
        VehicleAction::Search { query } => print_json(&vehicles.search(&query).await?),
        VehicleAction::Create { file } => {
            authorize(state, token)?;
            let input = read_vehicle_input(&file).await?;
            print_json(&vehicles.create(input).await?)
        }
        VehicleAction::Update { id, file } => {
            authorize(state, token)?;
            let input = read_vehicle_input(&file).await?;
            print_json(&vehicles.update(id, input).await?)
        }
        VehicleAction::Status { id, status } => {
            authorize(state, token)?;
            print_json(&vehicles.set_status(id, status).await?)
        }
        VehicleAction::Delete { id } => {
            authorize(state, token)?;
            vehicles.delete(id).await?;
            print_json(&serde_json::json!({ "deleted": id }))
        }
        VehicleAction::Related { id, limit } => print_json(&vehicles.related_for(id, limit).await?),
    }
}

async fn run_image(state: &AppState, token: Option<&str>, action: ImageAction) -> anyhow::Result<()> {
    let media = &state.media;
    match action {
        ImageAction::List { vehicle_id } => print_json(&media.list_for_vehicle(vehicle_id).await?),
        ImageAction::Upload {
            vehicle_id,
            file,
            mime,
        } => {
            authorize(state, token)?;
            let mime = mime.unwrap_or_else(|| {
                mime_guess::from_path(&file)
                    .first_or_octet_stream()
                    .essence_str()
                    .to_string()
            });
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            print_json(&media.upload(vehicle_id, bytes, &mime).await?)
        }
        ImageAction::Delete { id } => {
            authorize(state, token)?;
            media.delete(id).await?;
            print_json(&serde_json::json!({ "deleted": id }))
        }
        ImageAction::Swap { vehicle_id, a, b } => {
            authorize(state, token)?;
            print_json(&media.reorder(vehicle_id, a, b).await?)
        }
        ImageAction::Order {
            vehicle_id,
            image_ids,
        } => {
            authorize(state, token)?;
            let ordered = media
                .set_order(vehicle_id, SetImageOrderRequest { image_ids })
                .await?;
            print_json(&ordered)
        }
    }
}

async fn read_vehicle_input(path: &Path) -> anyhow::Result<VehicleInput> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw)
        .map_err(|e| AppError::Validation(format!("Invalid vehicle JSON: {e}")).into())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

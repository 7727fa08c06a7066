//! Map poster CLI: submit a generation job and watch it to completion, or
//! browse the public gallery.

use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use poster_client::HttpGenerationService;
use poster_control::{GenerateOptions, JobController};
use poster_types::{GenerationService, LocationInput, PosterResult, PublishRequest, TaskStatus};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type AppError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Parser)]
#[command(name = "poster-app", about = "Map poster generation client", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Submit a generation job and watch it until it finishes
    Generate(GenerateArgs),
    /// List cities in the public gallery
    Gallery(GalleryArgs),
    /// Show all posters for one city
    City {
        /// City slug as listed by `gallery`
        slug: String,
    },
}

#[derive(Args)]
struct GenerateArgs {
    /// City name as it should appear on the poster
    #[arg(long)]
    city: String,

    /// Country name
    #[arg(long)]
    country: String,

    /// Latitude in decimal degrees; without it the service geocodes the city
    #[arg(long, requires = "lon")]
    lat: Option<String>,

    /// Longitude in decimal degrees
    #[arg(long, requires = "lat")]
    lon: Option<String>,

    /// Theme name; defaults to the first theme the service advertises
    #[arg(long)]
    theme: Option<String>,

    /// Rendering distance in meters
    #[arg(long, default_value_t = 12_000)]
    distance: u32,

    /// Street network: drive, walk, bike or all
    #[arg(long, default_value = "drive")]
    network: String,

    /// Output format: png or svg
    #[arg(long, default_value = "png")]
    format: String,

    /// Also render a thumbnail
    #[arg(long)]
    thumbnail: bool,

    /// Leave out the data attribution line
    #[arg(long)]
    hide_attribution: bool,

    /// Poster size preset; defaults to the service's advertised default
    #[arg(long)]
    size: Option<String>,

    /// Publish the finished poster to the public gallery
    /// (reads POSTER_ADMIN_PASSWORD)
    #[arg(long)]
    publish: bool,
}

#[derive(Args)]
struct GalleryArgs {
    #[arg(long, default_value_t = 1)]
    page: u32,

    #[arg(long, default_value_t = 20)]
    limit: u32,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let service = Arc::new(HttpGenerationService::from_env());
    match cli.command {
        Command::Generate(args) => generate(service, args).await,
        Command::Gallery(args) => gallery(service, args).await,
        Command::City { slug } => city(service, &slug).await,
    }
}

async fn generate(service: Arc<HttpGenerationService>, args: GenerateArgs) -> Result<(), AppError> {
    let themes = service.themes().await?;
    let sizes = service.poster_sizes().await?;

    let theme = match args.theme {
        Some(theme) => {
            if !themes.themes.is_empty() && !themes.themes.iter().any(|t| t.name == theme) {
                let known: Vec<&str> = themes.themes.iter().map(|t| t.name.as_str()).collect();
                return Err(format!("unknown theme {theme:?}; available: {}", known.join(", ")).into());
            }
            theme
        }
        None => themes
            .themes
            .first()
            .map(|t| t.name.clone())
            .ok_or("the service advertises no themes; pass --theme explicitly")?,
    };

    let poster_size = match args.size {
        Some(size) => {
            if !sizes.sizes.is_empty() && !sizes.sizes.iter().any(|s| s.value == size) {
                let known: Vec<&str> = sizes.sizes.iter().map(|s| s.value.as_str()).collect();
                return Err(format!("unknown poster size {size:?}; available: {}", known.join(", ")).into());
            }
            size
        }
        None => sizes.default_size.clone(),
    };

    let location = match (args.lat, args.lon) {
        (Some(latitude), Some(longitude)) => LocationInput::Coordinates {
            city: args.city,
            country: args.country,
            latitude,
            longitude,
        },
        _ => LocationInput::Geocode {
            city: args.city,
            country: args.country,
        },
    };

    let options = GenerateOptions {
        theme,
        distance: args.distance,
        network_type: args.network.parse()?,
        format: args.format.parse()?,
        thumbnail: args.thumbnail,
        hide_attribution: args.hide_attribution,
        poster_size,
    };

    let poll_service: Arc<dyn GenerationService> = service.clone();
    let controller = JobController::new(poll_service);
    let mut rx = controller.subscribe();
    let task_id = controller.submit(location, options).await?;
    tracing::info!(%task_id, "job accepted, waiting for the poster");

    loop {
        let current = rx.borrow_and_update().clone();
        let view = match current {
            Some(view) => view,
            None => {
                rx.changed().await?;
                continue;
            }
        };
        match view.job.status {
            TaskStatus::Completed => {
                let result = view.job.result.ok_or("completed job carried no result")?;
                println!("Poster ready: {}", service.absolute_url(&result.poster_url));
                if let Some(thumb) = &result.thumbnail_url {
                    println!("Thumbnail:    {}", service.absolute_url(thumb));
                }
                println!(
                    "{}, {} — {} ({:.4}°, {:.4}°)",
                    result.city, result.country, result.theme, result.coords[0], result.coords[1]
                );
                if args.publish {
                    publish(&service, &result).await?;
                }
                return Ok(());
            }
            TaskStatus::Failed => {
                let message = view
                    .job
                    .error
                    .unwrap_or_else(|| "Unknown error occurred".to_string());
                eprintln!("Generation failed: {message}");
                std::process::exit(1);
            }
            TaskStatus::Processing => {
                tracing::info!(progress = view.job.progress, "generating");
            }
            _ => {}
        }
        rx.changed().await?;
    }
}

async fn publish(service: &HttpGenerationService, result: &PosterResult) -> Result<(), AppError> {
    let password = std::env::var("POSTER_ADMIN_PASSWORD")
        .map_err(|_| "POSTER_ADMIN_PASSWORD is not set")?;
    let verified = service.verify_password(&password).await?;
    if !verified.valid {
        return Err(verified
            .message
            .unwrap_or_else(|| "Invalid password".to_string())
            .into());
    }
    let published = service
        .publish_to_gallery(&PublishRequest {
            password,
            poster_path: result.publish_path().to_string(),
        })
        .await?;
    if !published.success {
        return Err(published.message.into());
    }
    match published.gallery_path {
        Some(path) => println!("Published to gallery: {}", service.absolute_url(&path)),
        None => println!("Published to gallery"),
    }
    Ok(())
}

async fn gallery(service: Arc<HttpGenerationService>, args: GalleryArgs) -> Result<(), AppError> {
    let page = service.gallery(args.page, args.limit).await?;
    println!("{} cities, page {}", page.total, page.page);
    for city in &page.cities {
        println!(
            "{:<24} {:<16} {:>3} themes  {}",
            city.slug,
            city.country,
            city.theme_count,
            format_timestamp(&city.created_at)
        );
    }
    Ok(())
}

async fn city(service: Arc<HttpGenerationService>, slug: &str) -> Result<(), AppError> {
    let detail = service.city_detail(slug).await?;
    println!("{} ({} posters)", detail.city, detail.posters.len());
    for poster in &detail.posters {
        println!(
            "{:<20} {:<4} {:>10}  {}  {}",
            poster.theme_display_name,
            poster.format,
            human_size(poster.file_size),
            format_timestamp(&poster.created_at),
            service.absolute_url(&poster.poster_url)
        );
    }
    Ok(())
}

/// Gallery timestamps come as `YYYYMMDD_HHMMSS`; show them readably.
fn format_timestamp(raw: &str) -> String {
    chrono::NaiveDateTime::parse_from_str(raw, "%Y%m%d_%H%M%S")
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

fn human_size(bytes: u64) -> String {
    if bytes >= 1_048_576 {
        format!("{:.1} MiB", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1024 {
        format!("{:.1} KiB", bytes as f64 / 1024.0)
    } else {
        format!("{bytes} B")
    }
}

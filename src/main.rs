use std::{path::PathBuf, sync::Arc};

use clap::{Parser, Subcommand};
use tokio::signal;
use tracing_subscriber::{fmt, EnvFilter};

use foodgram::{
    config::Config,
    document::FontSource,
    jwt::SessionKeys,
    media::MediaStorage,
    memory::MemoryStore,
    routes::routes,
    state::State,
    store::{PgStore, Store},
    views::catalog,
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Parser)]
#[command(name = "foodgram")]
#[command(about = "Recipe sharing service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API
    Serve {
        /// Keep everything in process memory instead of Postgres
        #[arg(long)]
        in_memory: bool,
    },
    /// Insert the default tags
    LoadTags,
    /// Import ingredients from a JSON array of {name, measurement_unit}
    LoadIngredients { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Serve { in_memory } => serve(config, in_memory).await?,
        Commands::LoadTags => {
            let store = connect(&config).await?;
            let created = catalog::load_tags(&store).await?;
            log::info!("{created} tags loaded");
        }
        Commands::LoadIngredients { file } => {
            let json = tokio::fs::read_to_string(&file).await?;
            let ingredients = catalog::parse_ingredients(&json)?;
            let store = connect(&config).await?;
            let created = catalog::load_ingredients(&store, ingredients).await?;
            log::info!("{created} ingredients loaded from {}", file.display());
        }
    }

    Ok(())
}

async fn connect(config: &Config) -> Result<PgStore, BoxError> {
    let store = PgStore::connect(
        config.require_database_url()?,
        config.database_max_connections,
    )
    .await?;
    store.migrate().await?;
    Ok(store)
}

async fn serve(config: Config, in_memory: bool) -> Result<(), BoxError> {
    let store: Arc<dyn Store> = if in_memory {
        log::warn!("Serving from memory, nothing will be persisted");
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(connect(&config).await?)
    };

    if !config.font_path.exists() {
        log::warn!(
            "Font {} not found, shopping list downloads will fail",
            config.font_path.display()
        );
    }

    let state = State::new(
        store,
        MediaStorage::new(config.media_root.clone(), &config.media_url),
        SessionKeys::new(config.secret_key.as_bytes(), config.session_lifetime_hours)?,
        FontSource::TrueType(config.font_path.clone()),
    );

    let (address, server) = warp::serve(routes(state))
        .try_bind_with_graceful_shutdown(config.bind_address, shutdown_signal())?;

    log::info!("Server running on {address}");
    server.await;
    log::info!("Server shut down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
        log::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                log::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                log::error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

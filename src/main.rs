use std::sync::Arc;

use ambulance::config::{AppConfig, TripBackend};
use ambulance::db::{init_pool, run_migrations};
use ambulance::error::AppError;
use ambulance::routes::create_router;
use ambulance::services::{
    git::GitService, notify::NotificationService, storage::StorageService, store::TripStore,
    table::TripTable,
};
use ambulance::state::AppState;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_logging();

    let config = AppConfig::from_env()?;

    let store: Arc<dyn TripStore> = match config.backend {
        TripBackend::File => {
            let storage = StorageService::new(config.data_root.clone());
            storage.ensure_structure().await?;
            info!(path = %storage.trips_path().display(), "using file trip store");
            Arc::new(storage)
        }
        TripBackend::Sqlite => {
            let db = init_pool(&config.database_url).await?;
            if let Err(err) = run_migrations(&db).await {
                error!("migration failed: {err:?}");
                return Err(err);
            }
            info!(url = %config.database_url, "using sqlite trip store");
            Arc::new(TripTable::new(db))
        }
    };

    let git = if config.git_sync {
        let git = GitService::new(config.repo_root.clone(), &config.data_root);
        git.init_repo_if_needed()?;
        Some(git)
    } else {
        None
    };

    let notifier = NotificationService::new(
        config.notify_recipient.clone(),
        config.notify_template.clone(),
    );
    if !notifier.is_enabled() {
        warn!("NOTIFY_RECIPIENT is not set, trip notifications are disabled");
    }

    let state = AppState::new(store, notifier, git);

    let app = create_router(state);

    let listener = TcpListener::bind(config.listen_addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,ambulance=debug".into());

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}

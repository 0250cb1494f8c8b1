mod error;
mod routes;

use std::{error::Error, net::SocketAddr};

use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use cleanbook::{
    domain::dispatch::Dispatcher,
    infrastructure::{
        core::{EventStoreReservationRepository, MeiliSearchScheduleQuery},
        memory::InMemoryReservationStore,
    },
    CleanbookConfig, Storage,
};
use eventstore::ClientSettings;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    match CleanbookConfig::load() {
        Ok(config) => {
            config.logger.init();
            if let Err(error) = run(&config).await {
                error!("アプリケーションエラー: {}", error);
            }
        }
        Err(error) => {
            tracing_subscriber::fmt::init();
            error!("アプリケーションエラー: {}", error)
        }
    }
}

async fn run(config: &CleanbookConfig) -> Result<(), Box<dyn Error>> {
    let app = match config.web.storage {
        Storage::EventStore => {
            let settings = config.eventstore.url.parse::<ClientSettings>()?;
            let reservations =
                EventStoreReservationRepository::new(eventstore::Client::new(settings)?);
            let schedules = MeiliSearchScheduleQuery::new(meilisearch_sdk::Client::new(
                &config.meilisearch.url,
                &config.meilisearch.api_key,
            ));
            routes::router(Dispatcher::new(reservations, schedules))
        }
        Storage::Memory => {
            warn!("予約はメモリ上にのみ保持されます");
            let store = InMemoryReservationStore::default();
            routes::router(Dispatcher::new(store.clone(), store))
        }
    };
    serve(app, config).await
}

async fn serve(app: Router, config: &CleanbookConfig) -> Result<(), Box<dyn Error>> {
    let addr = config.web.bind.parse::<SocketAddr>()?;
    match (&config.web.tls_cert, &config.web.tls_key) {
        (Some(cert), Some(key)) => {
            let tls = RustlsConfig::from_pem_file(cert, key).await?;
            info!("管理APIを起動します (TLS): {}", addr);
            axum_server::bind_rustls(addr, tls)
                .serve(app.into_make_service())
                .await?;
        }
        _ => {
            info!("管理APIを起動します: {}", addr);
            axum::Server::bind(&addr)
                .serve(app.into_make_service())
                .await?;
        }
    }
    Ok(())
}

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tracing_subscriber::{fmt, EnvFilter};

use blueprint_orchestrator::blueprint::UnimplementedContainerFactory;
use blueprint_orchestrator::config;
use blueprint_orchestrator::events::store::InMemoryEventStore;
use blueprint_orchestrator::resolver::file::LocalFilesystemHandler;
use blueprint_orchestrator::resolver::https::HttpsHandler;
use blueprint_orchestrator::resolver::object_store::{ObjectStoreHandler, UnimplementedObjectFetcher};
use blueprint_orchestrator::resolver::Resolver;
use blueprint_orchestrator::routes::api_routes;
use blueprint_orchestrator::state::AppState;
use blueprint_orchestrator::stores::changesets::InMemoryChangesetStore;
use blueprint_orchestrator::stores::instances::InMemoryInstanceStore;
use blueprint_orchestrator::stores::validations::InMemoryValidationStore;

async fn root() -> &'static str {
    "blueprint orchestrator"
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt().with_env_filter(EnvFilter::from_default_env()).json().init();

    dotenvy::dotenv().ok();

    let mut resolver = Resolver::new(Arc::new(LocalFilesystemHandler));
    let object_fetcher = Arc::new(UnimplementedObjectFetcher);
    resolver.register("s3", Arc::new(ObjectStoreHandler::new(object_fetcher.clone())));
    resolver.register("gcs", Arc::new(ObjectStoreHandler::new(object_fetcher.clone())));
    resolver.register("azureblob", Arc::new(ObjectStoreHandler::new(object_fetcher)));
    resolver.register("https", Arc::new(HttpsHandler::new(reqwest::Client::new())));

    let state = AppState {
        events: Arc::new(InMemoryEventStore::new()),
        validations: Arc::new(InMemoryValidationStore::new()),
        changesets: Arc::new(InMemoryChangesetStore::new()),
        instances: Arc::new(InMemoryInstanceStore::new()),
        resolver: Arc::new(resolver),
        containers: Arc::new(UnimplementedContainerFactory),
    };

    let app = Router::new()
        .route("/", get(root))
        .merge(api_routes())
        .layer(Extension(state));

    let addr: SocketAddr = config::BIND_ADDRESS
        .parse()
        .map_err(|error| Box::new(error) as Box<dyn std::error::Error>)?;
    tracing::info!(%addr, "listening for incoming connections");
    axum::Server::bind(&addr).serve(app.into_make_service()).await?;

    Ok(())
}

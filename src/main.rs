mod fetcher;
mod handlers;
mod sampler;
mod store;
mod structures;

use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use clap::{command, Parser};
use log::{info, warn};
use reqwest::Client;

use crate::{
    fetcher::{Fetcher, HttpFetcher},
    handlers::Settings,
    store::{MemoryStore, PgStore, Store},
    structures::{config::Config, errors::SitemetersError},
};

#[cfg(all(target_env = "musl", target_pointer_width = "64"))]
#[global_allocator]
static GLOBAL: jemallocator::Jemalloc = jemallocator::Jemalloc;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// path to config file
    #[arg(long, env, default_value = "./config.yaml")]
    config_path: String,

    /// postgres connection string, overrides the config file
    #[arg(long, env)]
    database_url: Option<String>,
}

async fn open_store(config: &Config) -> Result<Arc<dyn Store>, SitemetersError> {
    match &config.database_url {
        Some(url) => {
            info!("Connecting to postgres");
            Ok(Arc::new(PgStore::connect(url, config.max_connections).await?))
        }
        None => {
            warn!("No database_url configured, measurements are kept in memory only");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

async fn seed_sites(store: &dyn Store, config: &Config) -> Result<(), SitemetersError> {
    for seed in &config.sites {
        let site = store.upsert_site(&seed.name, &seed.url).await?;
        info!("Seeded site {} ({})", site.name, site.permalink);
    }
    Ok(())
}

#[actix_web::main]
async fn main() -> Result<(), SitemetersError> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let args = Args::parse();
    info!("Started with args: {:?}", args);

    info!("Reading config from {}", args.config_path);
    let mut config = Config::from_path(&args.config_path)?;
    if args.database_url.is_some() {
        config.database_url = args.database_url;
    }

    let store = open_store(&config).await?;
    seed_sites(store.as_ref(), &config).await?;

    let client = Client::builder()
        .user_agent(concat!("sitemeters/", env!("CARGO_PKG_VERSION")))
        .build()?;
    let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(client, config.fetch_timeout()));
    let settings = Settings {
        fetch_concurrency: config.fetch_concurrency,
        recent_limit: config.recent_limit,
    };

    info!(
        "Listening on {}:{} (fetch timeout {}s, concurrency {})",
        config.bind_address, config.port, config.fetch_timeout_secs, config.fetch_concurrency
    );
    Ok(HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(web::Data::from(store.clone()))
            .app_data(web::Data::from(fetcher.clone()))
            .app_data(web::Data::new(settings.clone()))
            .configure(handlers::configure)
    })
    .bind((config.bind_address.as_str(), config.port))?
    .run()
    .await?)
}

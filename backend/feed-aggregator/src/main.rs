use actix_web::{middleware::Logger, web, App, HttpServer};
use std::io;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use feed_aggregator::clients::{SocialApiClient, SocialBackend};
use feed_aggregator::config::Config;
use feed_aggregator::handlers::{self, FeedHandlerState};
use feed_aggregator::services::{FeedAggregator, FollowService};

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_thread_ids(true)
                .with_line_number(true)
                .with_file(true)
                .with_target(true),
        )
        .init();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Configuration loading failed: {:#}", e);
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!("Starting feed-aggregator v{}", env!("CARGO_PKG_VERSION"));
    info!("Environment: {}", config.app.env);

    let backend: Arc<dyn SocialBackend> = match SocialApiClient::from_config(&config.upstream) {
        Ok(client) => {
            info!(
                "Social API client ready: {} (timeout {:?})",
                client.base_url(),
                config.upstream.timeout()
            );
            Arc::new(client)
        }
        Err(e) => {
            tracing::error!("Failed to create social API client: {}", e);
            eprintln!("ERROR: Failed to create social API client: {}", e);
            std::process::exit(1);
        }
    };

    let feed_state = web::Data::new(FeedHandlerState::new(
        backend.clone(),
        FeedAggregator::new(config.feed.fetch_concurrency),
    ));
    let follow_service = web::Data::new(FollowService::new(backend));

    let bind_addr = (config.app.host.clone(), config.app.port);
    info!("HTTP server listening on {}:{}", bind_addr.0, bind_addr.1);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(feed_state.clone())
            .app_data(follow_service.clone())
            .configure(handlers::configure)
    })
    .bind(bind_addr)?
    .run()
    .await
}

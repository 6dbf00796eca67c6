use actix_web::{
    middleware::{NormalizePath, TrailingSlash},
    web::{Data, JsonConfig},
    App, HttpServer,
};
use config::Config;
use entity::EntityRegistry;
use service::QueueStatsService;
use tracing::level_filters::LevelFilter;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{util::SubscriberInitExt, EnvFilter, FmtSubscriber};

pub mod api;
pub mod config;
pub mod entity;
pub mod error;
pub mod id;
pub mod page;
pub mod queue_stats;
pub mod service;
pub mod store;
pub mod validation;

fn init_tracing() -> eyre::Result<()> {
    let filter = EnvFilter::builder()
        .with_env_var("QUEUESTATS_LOG")
        .with_default_directive(LevelFilter::INFO.into())
        .from_env()?;

    #[cfg(debug_assertions)]
    FmtSubscriber::builder()
        .pretty()
        .with_env_filter(filter)
        .finish()
        .try_init()?;

    #[cfg(not(debug_assertions))]
    FmtSubscriber::builder()
        .json()
        .with_env_filter(filter)
        .finish()
        .try_init()?;

    Ok(())
}

/// Returns a builder for the main application.
///
/// Without an explicit `config`, configuration is read from the environment.
#[bon::builder(finish_fn = start)]
pub async fn run(config: Option<Config>) -> eyre::Result<()> {
    init_tracing()?;

    let config = match config {
        Some(config) => config,
        None => Config::load()?,
    };

    let service = QueueStatsService::connect_with(&config).await?;

    let mut registry = EntityRegistry::new();
    registry.register(service.entity_type(), service.entity_lookup());

    let service = Data::new(service);
    let registry = Data::new(registry);

    tracing::info!("Listening on {}:{}", config.host, config.port);

    HttpServer::new(move || {
        let json_cfg = JsonConfig::default().content_type_required(false);

        App::new()
            .wrap(TracingLogger::default())
            .wrap(NormalizePath::new(TrailingSlash::Trim))
            .service(api::service())
            .app_data(service.clone())
            .app_data(registry.clone())
            .app_data(json_cfg)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;

    Ok(())
}

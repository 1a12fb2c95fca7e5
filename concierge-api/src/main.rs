use anyhow::Context;
use concierge_api::{app, worker, AppState, AuthConfig};
use concierge_core::notify::{LogNotifier, Notifier};
use concierge_desk::DeskRules;
use concierge_store::{app_config::Config, seed_admin, DbClient, EventProducer, KafkaNotifier, RedisClient};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "concierge_api=debug,concierge_desk=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Concierge back-office on port {}", config.server.port);

    // Postgres
    let db = DbClient::new(&config.database.url)
        .await
        .context("Failed to connect to Postgres")?;
    db.migrate().await.context("Failed to run migrations")?;
    let repos = db.repositories();

    if let Some(admin) = &config.auth.bootstrap_admin {
        seed_admin(repos.staff.as_ref(), admin)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to seed admin account: {}", e))?;
    }

    let rules = db
        .fetch_business_rules(config.business_rules.clone())
        .await
        .context("Failed to load business rules")?;

    // Redis
    let redis = RedisClient::new(&config.redis.url)
        .await
        .context("Failed to connect to Redis")?;
    if let Err(e) = redis.ping().await {
        tracing::warn!("Redis not reachable yet: {}", e);
    }

    // Kafka
    let notifier: Arc<dyn Notifier> = if config.kafka.enabled {
        let producer = EventProducer::new(&config.kafka.brokers).context("Failed to create Kafka producer")?;
        Arc::new(KafkaNotifier::new(producer))
    } else {
        tracing::info!("Kafka disabled, emails and events go to the log");
        Arc::new(LogNotifier)
    };

    let state = AppState::new(
        repos,
        Arc::new(redis),
        notifier,
        DeskRules {
            currency: rules.currency.clone(),
            vat_rate_bp: rules.vat_rate_bp,
            tentative_hold_hours: rules.tentative_hold_hours,
        },
        AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
            login_attempt_limit: config.auth.login_attempt_limit,
            login_window_seconds: config.auth.login_window_seconds,
        },
        config.server.requests_per_minute,
    );

    tokio::spawn(worker::start_sweep_worker(
        state.desk.reservations.clone(),
        rules.sweep_interval_seconds,
    ));

    let app = app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.context("Failed to bind listener")?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .context("Server error")?;

    Ok(())
}

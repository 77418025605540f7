//! Wristband Shop - custom wristband storefront backend

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wristband_shop::api::{self, AppState};
use wristband_shop::config::Settings;
use wristband_shop::domain::aggregates::Role;
use wristband_shop::events::EventBus;
use wristband_shop::notifications::{LogMailer, Mailer, ResendClient};
use wristband_shop::payments::StripeClient;
use wristband_shop::services::Shop;
use wristband_shop::storage::FsObjectStore;
use wristband_shop::store::{MemoryStore, PgStore, Store};

#[derive(Parser)]
#[command(name = "wristband-shop", version, about = "Custom wristband storefront backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Apply database migrations and exit
    Migrate,
    /// Create or update a user and print a new API token
    IssueToken {
        #[arg(long)]
        email: String,
        #[arg(long)]
        full_name: Option<String>,
        #[arg(long, default_value = "user")]
        role: Role,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::from_env()?;
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();

    match Cli::parse().command.unwrap_or(Command::Serve) {
        Command::Serve => serve(settings).await,
        Command::Migrate => {
            let url = settings.database_url.as_deref().context("DATABASE_URL is required to migrate")?;
            connect(url).await?;
            tracing::info!("migrations applied");
            Ok(())
        }
        Command::IssueToken { email, full_name, role } => {
            let store = open_store(&settings).await?;
            let (profile, token) = wristband_shop::auth::issue_token(store.as_ref(), &email, full_name, role).await?;
            tracing::info!(user_id = %profile.id, email = %profile.email, %role, "token issued");
            println!("{token}");
            Ok(())
        }
    }
}

async fn connect(url: &str) -> Result<sqlx::PgPool> {
    let db = PgPoolOptions::new().max_connections(10).connect(url).await?;
    sqlx::migrate!("./migrations").run(&db).await?;
    Ok(db)
}

async fn open_store(settings: &Settings) -> Result<Arc<dyn Store>> {
    Ok(match settings.database_url.as_deref() {
        Some(url) => Arc::new(PgStore::new(connect(url).await?)),
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store");
            Arc::new(MemoryStore::new())
        }
    })
}

async fn serve(settings: Settings) -> Result<()> {
    let store = open_store(&settings).await?;
    let events = EventBus::connect(settings.nats_url.as_deref()).await;
    let payments = Arc::new(StripeClient::new(&settings.stripe));
    if settings.stripe.secret_key.is_none() {
        tracing::warn!("STRIPE_SECRET_KEY not set, checkout is disabled");
    }
    let mailer: Arc<dyn Mailer> = match settings.email.resend_api_key.as_deref() {
        Some(key) => Arc::new(ResendClient::new(key, &settings.email.api_base)),
        None => {
            tracing::warn!("RESEND_API_KEY not set, emails are logged only");
            Arc::new(LogMailer)
        }
    };
    let objects = Arc::new(FsObjectStore::new(settings.storage.root.clone(), &settings.storage.public_base_url));
    let storage_root = settings.storage.root.clone();
    let port = settings.port;

    let shop = Shop::new(store, payments, mailer, objects, events, settings);
    let app = api::router(AppState::new(shop), &storage_root);

    tracing::info!("Wristband Shop listening on 0.0.0.0:{}", port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?, app).await?;
    Ok(())
}

//! # Recipe Admin
//!
//! Management commands for deployments.
//!
//! ```bash
//! recipe-admin wait-for-db --attempts 30 --interval-secs 1
//! recipe-admin migrate
//! recipe-admin create-superuser --email admin@example.com --password secret
//! ```

use std::time::Duration;

use clap::{Parser, Subcommand};
use recipe_shared::{
    auth::password::validate_password_length,
    db::{
        migrations::{ensure_database_exists, get_migration_status, run_migrations},
        pool::{close_pool, create_pool, wait_for_database, DatabaseConfig},
    },
    models::user::{create_superuser, UserExtra},
};
use sqlx::PgPool;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "recipe-admin")]
#[command(version)]
#[command(about = "Management commands for the recipe API", long_about = None)]
struct Cli {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Block until the database accepts connections
    WaitForDb {
        /// Connection attempts before giving up
        #[arg(long, default_value_t = 30)]
        attempts: u32,

        /// Seconds between attempts
        #[arg(long, default_value_t = 1)]
        interval_secs: u64,
    },

    /// Create the database if needed and apply pending migrations
    Migrate,

    /// Create a user with the staff and superuser flags set
    CreateSuperuser {
        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,

        /// Display name
        #[arg(long)]
        name: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "recipe_admin=info,recipe_shared=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::WaitForDb {
            attempts,
            interval_secs,
        } => {
            wait_for_database(&cli.database_url, attempts, Duration::from_secs(interval_secs))
                .await?;
            println!("Database available!");
        }
        Commands::Migrate => {
            ensure_database_exists(&cli.database_url).await?;
            let pool = connect(&cli.database_url).await?;

            run_migrations(&pool).await?;
            let status = get_migration_status(&pool).await?;
            println!(
                "Applied {} migrations (latest: {})",
                status.applied_migrations,
                status
                    .latest_version
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "none".to_string())
            );

            close_pool(pool).await;
        }
        Commands::CreateSuperuser {
            email,
            password,
            name,
        } => {
            validate_password_length(&password).map_err(|e| anyhow::anyhow!("password: {}", e))?;

            let pool = connect(&cli.database_url).await?;

            let extra = UserExtra {
                name: name.unwrap_or_default(),
                ..Default::default()
            };
            let user = create_superuser(&pool, &email, &password, extra).await?;

            println!("Superuser {} created (id {})", user.email, user.id);
            close_pool(pool).await;
        }
    }

    Ok(())
}

async fn connect(url: &str) -> anyhow::Result<PgPool> {
    let pool = create_pool(DatabaseConfig {
        url: url.to_string(),
        max_connections: 2,
        min_connections: 1,
        ..Default::default()
    })
    .await?;

    Ok(pool)
}

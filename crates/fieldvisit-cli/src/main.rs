mod customers;
mod locations;

use clap::{Parser, Subcommand};
use fieldvisit_core::AppConfig;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "fieldvisit-cli")]
#[command(about = "Field visit customer reconciliation command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Reconciled customers for one visitor
    Customers {
        #[command(subcommand)]
        command: CustomerCommands,
    },
    /// Location catalog lookups
    Locations {
        #[command(subcommand)]
        command: LocationCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check that the database is reachable
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[derive(Debug, Subcommand)]
enum CustomerCommands {
    /// List reconciled customers with their visit rollups
    List {
        /// Visitor whose field data is loaded
        #[arg(long)]
        owner: Uuid,
        /// Case-insensitive filter on name, phone, address and store type
        #[arg(long)]
        search: Option<String>,
        /// name | total_visits | total_orders | conversion_percent | last_visit_at
        #[arg(long, default_value = "last_visit_at")]
        sort: String,
        /// asc | desc
        #[arg(long, default_value = "desc")]
        order: String,
        /// Substitute empty streams for ones that fail to load
        #[arg(long)]
        allow_degraded: bool,
    },
    /// Show one customer with its visit timeline
    Show {
        /// Visitor whose field data is loaded
        #[arg(long)]
        owner: Uuid,
        /// Customer id: a UUID, `adhoc-<key>` or `report-<key>`
        id: String,
        /// all | with-order | without-order
        #[arg(long, default_value = "all")]
        orders: String,
        /// Print the detail as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Subcommand)]
enum LocationCommands {
    /// Find locations whose name contains the given text
    Search { substring: String },
}

async fn connect(config: &AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let pool_config = fieldvisit_db::PoolConfig::from_app_config(config);
    let pool = fieldvisit_db::connect_pool(&config.database_url, pool_config).await?;
    Ok(pool)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("fieldvisit-cli ready; see --help for commands");
        return Ok(());
    };

    let config = fieldvisit_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool = connect(&config).await?;
    let fetch_timeout = config.fetch_timeout();

    match command {
        Commands::Db {
            command: DbCommands::Ping,
        } => {
            fieldvisit_db::ping(&pool).await?;
            println!("database reachable");
        }
        Commands::Db {
            command: DbCommands::Migrate,
        } => {
            let applied = fieldvisit_db::run_migrations(&pool).await?;
            tracing::info!(applied, "migrations complete");
            println!("applied {applied} migration(s)");
        }
        Commands::Customers {
            command:
                CustomerCommands::List {
                    owner,
                    search,
                    sort,
                    order,
                    allow_degraded,
                },
        } => {
            let args = customers::ListArgs {
                owner,
                search: search.unwrap_or_default(),
                sort,
                order,
                allow_degraded,
            };
            customers::run_list(pool, &args, fetch_timeout).await?;
        }
        Commands::Customers {
            command:
                CustomerCommands::Show {
                    owner,
                    id,
                    orders,
                    json,
                },
        } => {
            customers::run_show(pool, owner, &id, &orders, json, fetch_timeout).await?;
        }
        Commands::Locations {
            command: LocationCommands::Search { substring },
        } => {
            locations::run_search(pool, &substring).await?;
        }
    }

    Ok(())
}

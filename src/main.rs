use anyhow::Result;
use clap::{Parser, Subcommand};
use ns_cache_key::{CacheKeyConfig, CacheKeyService, RedisKvStore, StoreConfig};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Derive namespaced cache keys and rotate namespace tokens.
#[derive(Debug, Parser)]
#[command(name = "ns-cache-key", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the cache key for a business operation
    Key {
        business: String,
        /// Key parameter, hashed into the last segment
        #[arg(long, default_value = "")]
        param: String,
        /// Project name (defaults to CACHE_PROJECT_NAME)
        #[arg(long, default_value = "")]
        project: String,
    },
    /// Invalidate every key of a project
    RefreshProject {
        #[arg(long, default_value = "")]
        project: String,
    },
    /// Invalidate every key of a business operation
    RefreshBusiness {
        business: String,
        #[arg(long, default_value = "")]
        project: String,
    },
    /// Ping every configured Redis instance
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    dotenvy::dotenv().ok();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    let store = RedisKvStore::new(&StoreConfig::from_env()?)?;

    match cli.command {
        Command::Health => {
            store.health_check().await?;
            info!(instances = ?store.instance_names(), "✅ Redis instances healthy");
            println!("ok");
        }
        command => {
            let service = CacheKeyService::new(Arc::new(store), CacheKeyConfig::from_env()?)?;
            run(&service, command).await?;
        }
    }

    Ok(())
}

async fn run(service: &CacheKeyService, command: Command) -> Result<()> {
    match command {
        Command::Key {
            business,
            param,
            project,
        } => {
            let key = service.get_cache_key(&business, &param, &project).await?;
            println!("{}", key);
        }
        Command::RefreshProject { project } => {
            let token = service.refresh_project_namespace(&project).await?;
            println!("{}", token);
        }
        Command::RefreshBusiness { business, project } => {
            let token = service.refresh_business_namespace(&business, &project).await?;
            println!("{}", token);
        }
        Command::Health => {}
    }
    Ok(())
}

use std::collections::HashSet;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use dotenvy::dotenv;
use sqlx::SqlitePool;

use todo_rights::authz::{AuthContext, Capability, Decision, DenyReason, EntityRef, SqlStore};
use todo_rights::db::{self, MIGRATOR};
use todo_rights::{AuthzError, DbConfig, RightsConfig, RightsEngine};

#[derive(Parser, Debug)]
#[command(author, version, about = "to-do rights operator tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply pending migrations
    MigrateRun,
    /// Show migration status against the current database
    MigrateStatus,
    /// Decide one capability for a principal on an entity
    Check {
        #[command(flatten)]
        who: Who,
        /// Target as `<kind>:<id>`, e.g. `task:42`
        #[arg(long)]
        entity: EntityRef,
        #[arg(long)]
        capability: Capability,
    },
    /// Print the effective permission level of a principal on an entity
    Explain {
        #[command(flatten)]
        who: Who,
        #[arg(long)]
        entity: EntityRef,
    },
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct Who {
    /// Registered user id
    #[arg(long)]
    user: Option<i64>,
    /// Link share hash
    #[arg(long)]
    link_share: Option<String>,
}

impl Who {
    fn context(&self) -> anyhow::Result<AuthContext> {
        match (&self.user, &self.link_share) {
            (Some(id), _) => Ok(AuthContext::user(*id)),
            (None, Some(hash)) => Ok(AuthContext::link_share(hash.clone())),
            (None, None) => anyhow::bail!("either --user or --link-share is required"),
        }
    }
}

const DENY_EXIT_CODE: i32 = 2;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Try the CWD first, then the crate-local `.env`
    if dotenv().is_err() {
        let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(crate_env);
    }

    init_tracing();

    let cli = Cli::parse();
    let config = DbConfig::from_env()?;

    match cli.command {
        Commands::MigrateRun => {
            // init applies pending migrations
            db::init(&config).await?;
            println!("Migrations applied");
        }
        Commands::MigrateStatus => {
            let pool = db::connect(&config).await?;
            print_status(&pool).await?;
        }
        Commands::Check { who, entity, capability } => {
            let engine = engine(&config).await?;
            let decision = match engine.resolve(&who.context()?).await {
                Ok(principal) => engine.decide(&principal, entity, capability).await?,
                Err(AuthzError::Unauthenticated(_)) | Err(AuthzError::PrincipalInactive(_)) => {
                    Decision::Deny(DenyReason::Unauthenticated)
                }
                Err(e) => return Err(e.into()),
            };

            match decision {
                Decision::Allow => println!("allow"),
                Decision::Deny(reason) => {
                    println!("deny ({})", deny_label(reason));
                    std::process::exit(DENY_EXIT_CODE);
                }
            }
        }
        Commands::Explain { who, entity } => {
            let engine = engine(&config).await?;
            let principal = engine.resolve(&who.context()?).await?;
            let level = engine.effective_level(&principal, entity).await?;
            println!("{principal} has {level} on {entity}");
        }
    }

    Ok(())
}

async fn engine(config: &DbConfig) -> anyhow::Result<RightsEngine<SqlStore>> {
    let pool = db::connect(config).await?;
    let rights = RightsConfig::from_env()?;
    Ok(RightsEngine::new(SqlStore::new(pool), rights))
}

fn deny_label(reason: DenyReason) -> &'static str {
    match reason {
        DenyReason::Unauthenticated => "unauthenticated",
        DenyReason::NotFound => "not found",
        DenyReason::Forbidden => "forbidden",
    }
}

async fn print_status(pool: &SqlitePool) -> anyhow::Result<()> {
    // If the migrations table doesn't exist, nothing is applied yet
    let table: Option<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations'")
            .fetch_optional(pool)
            .await
            .context("failed to inspect schema")?;

    let applied_versions: HashSet<i64> = if table.is_some() {
        sqlx::query_scalar::<_, i64>("SELECT version FROM _sqlx_migrations WHERE success = 1")
            .fetch_all(pool)
            .await?
            .into_iter()
            .collect()
    } else {
        HashSet::new()
    };

    println!("{:<8} {:<20} Name", "Status", "Version");
    for migration in MIGRATOR.iter() {
        let status = if applied_versions.contains(&migration.version) { "applied" } else { "pending" };
        let desc = migration.description.trim();
        let name = if desc.is_empty() { "unknown" } else { desc };
        println!("{:<8} {:<20} {}", status, migration.version, name);
    }

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use artfund_backend::{
    config::Config,
    db::connection::create_pool,
    images::variants::VariantResolver,
    jobs::purge::{run_trash_purge, PurgeOptions, DEFAULT_PURGE_LIMIT},
    repositories::PgTrashLog,
    storage::HttpObjectStore,
};

/// Permanently removes expired trash entries and reclaims their storage.
/// Intended to run from cron; safe to invoke concurrently.
#[derive(Debug, Parser)]
#[command(name = "trash_purge")]
struct Args {
    /// Report the candidates without deleting anything.
    #[arg(long)]
    dry_run: bool,

    /// Maximum number of trash entries to process in one run.
    #[arg(long, default_value_t = DEFAULT_PURGE_LIMIT)]
    limit: i64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "artfund_backend=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = Config::load()?;
    if !args.dry_run {
        config.require_storage_credentials()?;
    }

    let pool = create_pool(&config.database_url).await?;
    let log = PgTrashLog::new(pool.as_ref().clone());
    let store = HttpObjectStore::new(&config);
    let resolver = VariantResolver::new(config.public_storage_base());

    let opts = PurgeOptions {
        limit: args.limit,
        dry_run: args.dry_run,
    };
    let summary = run_trash_purge(&log, &store, &resolver, &opts).await?;
    summary.emit();

    Ok(())
}

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use artfund_backend::{
    config::Config,
    db::connection::create_pool,
    images::variants::VariantResolver,
    jobs::backfill::{run_variant_backfill, BackfillOptions},
    repositories::PgArtworkCatalog,
    storage::HttpObjectStore,
};

/// Renders missing image-variant families for existing artworks and rewrites
/// their stored references to the canonical original-variant URL.
#[derive(Debug, Parser)]
#[command(name = "variant_backfill")]
struct Args {
    /// Perform uploads and reference rewrites. Without this flag the job
    /// only reports what it would do.
    #[arg(long)]
    apply: bool,

    /// Stop after scanning this many artworks.
    #[arg(long)]
    limit: Option<u64>,

    /// Restrict the run to a single artwork id.
    #[arg(long)]
    artwork_id: Option<String>,

    /// Probe storage for every family member instead of trusting the path
    /// suffix; regenerates families with missing members.
    #[arg(long)]
    check_missing: bool,
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
    if !config.variant_transforms_enabled {
        anyhow::bail!("variant transforms are disabled (VARIANT_TRANSFORMS_ENABLED)");
    }
    // Even a dry run probes storage when --check-missing is set.
    config.require_storage_credentials()?;

    let pool = create_pool(&config.database_url).await?;
    let catalog = PgArtworkCatalog::new(pool.as_ref().clone());
    let store = HttpObjectStore::new(&config);
    let resolver = VariantResolver::new(config.public_storage_base());

    let opts = BackfillOptions {
        apply: args.apply,
        limit: args.limit,
        artwork_id: args.artwork_id,
        check_missing: args.check_missing,
    };
    let summary = run_variant_backfill(&catalog, &store, &resolver, &opts).await?;
    summary.emit();

    if summary.failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

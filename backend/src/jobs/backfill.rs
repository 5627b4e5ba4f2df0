//! Variant backfill: walks the artwork catalog, renders the five-variant
//! family for every managed image that predates the variant pipeline, and
//! rewrites stored references to the canonical `__original.webp` form.
//! Safe to re-run; converted images are recognized by their suffix and
//! skipped unless `--check-missing` asks for an existence probe.

use bytes::Bytes;
use chrono::Utc;
use std::collections::HashSet;

use crate::images::encode::{encode_variant, VARIANT_CONTENT_TYPE};
use crate::images::variants::{
    family_base, has_variant_suffix, variant_family, variant_object_path, Variant, VariantResolver,
};
use crate::models::artwork::Artwork;
use crate::repositories::ArtworkCatalog;
use crate::storage::ObjectStore;

/// Catalog page size for the scan loop.
const SCAN_PAGE_SIZE: i64 = 50;

#[derive(Debug, Clone, Default)]
pub struct BackfillOptions {
    /// Without this flag the job only reports what it would do.
    pub apply: bool,
    /// Stop after scanning this many artworks.
    pub limit: Option<u64>,
    /// Restrict the run to a single artwork.
    pub artwork_id: Option<String>,
    /// Probe storage for each family member instead of trusting the path
    /// suffix; regenerates families with missing members.
    pub check_missing: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackfillSummary {
    pub apply: bool,
    pub artworks_scanned: u64,
    pub images_seen: u64,
    pub converted: u64,
    pub skipped: u64,
    pub failed: u64,
    pub uploads: u64,
    pub references_rewritten: u64,
}

impl BackfillSummary {
    pub fn lines(&self) -> Vec<String> {
        vec![
            format!("apply={}", self.apply),
            format!("artworks_scanned={}", self.artworks_scanned),
            format!("images_seen={}", self.images_seen),
            format!("converted={}", self.converted),
            format!("skipped={}", self.skipped),
            format!("failed={}", self.failed),
            format!("uploads={}", self.uploads),
            format!("references_rewritten={}", self.references_rewritten),
        ]
    }

    pub fn emit(&self) {
        for line in self.lines() {
            println!("{line}");
        }
    }
}

pub async fn run_variant_backfill(
    catalog: &dyn ArtworkCatalog,
    store: &dyn ObjectStore,
    resolver: &VariantResolver,
    opts: &BackfillOptions,
) -> anyhow::Result<BackfillSummary> {
    let mut summary = BackfillSummary {
        apply: opts.apply,
        ..BackfillSummary::default()
    };
    // Families already regenerated this run; two artworks sharing an image
    // only cost one encode pass.
    let mut regenerated: HashSet<String> = HashSet::new();

    if let Some(id) = &opts.artwork_id {
        let artwork = catalog
            .find(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("artwork {id} not found"))?;
        process_artwork(catalog, store, resolver, opts, &artwork, &mut regenerated, &mut summary)
            .await;
        return Ok(summary);
    }

    let mut offset = 0i64;
    'scan: loop {
        let page = catalog.page(SCAN_PAGE_SIZE, offset).await?;
        if page.is_empty() {
            break;
        }
        offset += page.len() as i64;

        for artwork in &page {
            if let Some(limit) = opts.limit {
                if summary.artworks_scanned >= limit {
                    break 'scan;
                }
            }
            process_artwork(catalog, store, resolver, opts, artwork, &mut regenerated, &mut summary)
                .await;
        }

        tracing::info!(
            scanned = summary.artworks_scanned,
            converted = summary.converted,
            failed = summary.failed,
            "backfill progress"
        );
    }

    tracing::info!(
        scanned = summary.artworks_scanned,
        converted = summary.converted,
        skipped = summary.skipped,
        failed = summary.failed,
        rewritten = summary.references_rewritten,
        apply = summary.apply,
        "variant backfill completed"
    );
    Ok(summary)
}

async fn process_artwork(
    catalog: &dyn ArtworkCatalog,
    store: &dyn ObjectStore,
    resolver: &VariantResolver,
    opts: &BackfillOptions,
    artwork: &Artwork,
    regenerated: &mut HashSet<String>,
    summary: &mut BackfillSummary,
) {
    summary.artworks_scanned += 1;

    let mut rewritten = Vec::with_capacity(artwork.images.0.len());
    let mut changed = false;

    for image_ref in &artwork.images.0 {
        summary.images_seen += 1;

        // Unmanaged references are none of this job's business.
        let Some(path) = resolver.storage_path(image_ref) else {
            summary.skipped += 1;
            rewritten.push(image_ref.clone());
            continue;
        };

        let base = family_base(&path);
        let canonical_ref = format!(
            "{}{}",
            resolver.public_base(),
            variant_object_path(&base, Variant::Original)
        );

        let needs_family = match family_needs_work(store, opts, &path, &base, regenerated).await {
            Ok(needs) => needs,
            Err(err) => {
                summary.failed += 1;
                tracing::warn!(
                    artwork_id = %artwork.id,
                    image = %image_ref,
                    error = %err,
                    "variant existence probe failed"
                );
                rewritten.push(image_ref.clone());
                continue;
            }
        };

        if needs_family {
            if opts.apply {
                match regenerate_family(store, &path, &base).await {
                    Ok(uploads) => {
                        summary.uploads += uploads;
                        summary.converted += 1;
                        regenerated.insert(base.clone());
                    }
                    Err(err) => {
                        summary.failed += 1;
                        tracing::warn!(
                            artwork_id = %artwork.id,
                            image = %image_ref,
                            error = %err,
                            "variant generation failed"
                        );
                        // Keep the old reference; a broken rewrite would
                        // point at objects that were never produced.
                        rewritten.push(image_ref.clone());
                        continue;
                    }
                }
            } else {
                summary.converted += 1;
                regenerated.insert(base.clone());
            }
        } else {
            summary.skipped += 1;
        }

        if *image_ref != canonical_ref {
            summary.references_rewritten += 1;
            changed = true;
        }
        rewritten.push(canonical_ref);
    }

    if changed && opts.apply {
        // A row-level write failure is this artwork's problem, not the
        // batch's; later artworks still get their turn.
        match catalog.update_images(&artwork.id, &rewritten, Utc::now()).await {
            Ok(true) => {}
            Ok(false) => {
                // Row deleted between the scan and the rewrite.
                tracing::warn!(artwork_id = %artwork.id, "artwork vanished before rewrite");
            }
            Err(err) => {
                summary.failed += 1;
                tracing::warn!(
                    artwork_id = %artwork.id,
                    error = %err,
                    "failed to persist rewritten references"
                );
            }
        }
    }
}

/// Whether the family behind `path` has to be (re)generated.
async fn family_needs_work(
    store: &dyn ObjectStore,
    opts: &BackfillOptions,
    path: &str,
    base: &str,
    regenerated: &HashSet<String>,
) -> anyhow::Result<bool> {
    if regenerated.contains(base) {
        return Ok(false);
    }
    if opts.check_missing {
        for member in variant_family(base) {
            if !store.exists(&member).await? {
                return Ok(true);
            }
        }
        return Ok(false);
    }
    Ok(!has_variant_suffix(path))
}

/// Downloads the source object once and uploads all five rendered variants.
/// Returns the number of uploads performed.
async fn regenerate_family(
    store: &dyn ObjectStore,
    source_path: &str,
    base: &str,
) -> anyhow::Result<u64> {
    let original = store.download(source_path).await?;

    let mut uploads = 0u64;
    for variant in Variant::ALL {
        let encoded = encode_variant(&original, variant)?;
        let target = variant_object_path(base, variant);
        store
            .upload(&target, Bytes::from(encoded), VARIANT_CONTENT_TYPE)
            .await?;
        uploads += 1;
    }
    Ok(uploads)
}

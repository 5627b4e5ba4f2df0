//! Variant path grammar and the pure URL resolver for pre-rendered image
//! variants.
//!
//! Managed object paths follow the grammar `base ("__" variant)* ("." ext)?`.
//! Legacy rows can carry double-suffixed paths (`x__thumb__card.webp`), so
//! normalization strips trailing variant tokens repeatedly. The purge job and
//! the backfill job both rely on this module for path naming; they must never
//! disagree about what a variant family looks like.

use std::fmt;
use std::str::FromStr;

/// Encoding extension shared by every derived variant object.
pub const VARIANT_EXT: &str = "webp";

/// One of the five pre-rendered sizes derived from an original upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    Thumb,
    Card,
    Detail,
    Hero,
    Original,
}

impl Variant {
    pub const ALL: [Variant; 5] = [
        Variant::Thumb,
        Variant::Card,
        Variant::Detail,
        Variant::Hero,
        Variant::Original,
    ];

    /// Path suffix token, e.g. `thumb` in `x__thumb.webp`.
    pub fn suffix(self) -> &'static str {
        match self {
            Variant::Thumb => "thumb",
            Variant::Card => "card",
            Variant::Detail => "detail",
            Variant::Hero => "hero",
            Variant::Original => "original",
        }
    }

    /// Longest-edge bound in pixels. Sources smaller than the bound are
    /// re-encoded as-is, never upscaled.
    pub fn max_edge(self) -> u32 {
        match self {
            Variant::Thumb => 400,
            Variant::Card => 960,
            Variant::Detail => 1600,
            Variant::Hero => 1920,
            Variant::Original => 2560,
        }
    }

    fn from_suffix(token: &str) -> Option<Variant> {
        match token {
            "thumb" => Some(Variant::Thumb),
            "card" => Some(Variant::Card),
            "detail" => Some(Variant::Detail),
            "hero" => Some(Variant::Hero),
            "original" => Some(Variant::Original),
            _ => None,
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// UI usage preset. The preset-to-variant mapping is total; an unknown preset
/// string is a caller bug surfaced at parse time, not a runtime condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    Slider,
    Card,
    Detail,
    Hero,
    Original,
}

impl Preset {
    pub fn variant(self) -> Variant {
        match self {
            Preset::Slider => Variant::Thumb,
            Preset::Card => Variant::Card,
            Preset::Detail => Variant::Detail,
            Preset::Hero => Variant::Hero,
            Preset::Original => Variant::Original,
        }
    }
}

impl FromStr for Preset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "slider" => Ok(Preset::Slider),
            "card" => Ok(Preset::Card),
            "detail" => Ok(Preset::Detail),
            "hero" => Ok(Preset::Hero),
            "original" => Ok(Preset::Original),
            other => Err(format!("unknown image preset: {other}")),
        }
    }
}

/// Strips the encoding extension from the filename segment, if any.
fn strip_extension(path: &str) -> &str {
    match path.rsplit_once('.') {
        Some((stem, ext)) if !ext.is_empty() && !ext.contains('/') => stem,
        _ => path,
    }
}

/// Reduces a bucket-relative object path to its variant-family base:
/// the extension goes first, then every trailing `__variant` token.
pub fn family_base(path: &str) -> String {
    let mut base = strip_extension(path);
    loop {
        match base.rsplit_once("__") {
            Some((head, tail)) if !head.is_empty() && Variant::from_suffix(tail).is_some() => {
                base = head;
            }
            _ => break,
        }
    }
    base.to_string()
}

/// Whether the path already carries a recognized variant suffix.
pub fn has_variant_suffix(path: &str) -> bool {
    let stem = strip_extension(path);
    matches!(
        stem.rsplit_once("__"),
        Some((head, tail)) if !head.is_empty() && Variant::from_suffix(tail).is_some()
    )
}

/// Canonical object path of one variant of a family.
pub fn variant_object_path(base: &str, variant: Variant) -> String {
    format!("{base}__{}.{VARIANT_EXT}", variant.suffix())
}

/// The full five-object family derived from a family base path.
pub fn variant_family(base: &str) -> Vec<String> {
    Variant::ALL
        .iter()
        .map(|v| variant_object_path(base, *v))
        .collect()
}

/// Maps public image URLs into the managed storage namespace and back.
///
/// Constructed from the bucket's public URL prefix; everything outside that
/// prefix (relative asset paths, third-party URLs) passes through untouched.
#[derive(Debug, Clone)]
pub struct VariantResolver {
    public_base: String,
    transforms_enabled: bool,
}

impl VariantResolver {
    pub fn new(public_base: impl Into<String>) -> Self {
        Self::with_transforms(public_base, true)
    }

    /// With transforms disabled the read surface (`resolve_url`,
    /// `resolve_preset`) passes every reference through unchanged; path
    /// mapping for cleanup stays active, trash reclamation is not gated.
    pub fn with_transforms(public_base: impl Into<String>, transforms_enabled: bool) -> Self {
        let mut public_base = public_base.into();
        if !public_base.ends_with('/') {
            public_base.push('/');
        }
        Self {
            public_base,
            transforms_enabled,
        }
    }

    pub fn public_base(&self) -> &str {
        &self.public_base
    }

    /// Bucket-relative path for a managed public URL, `None` for anything
    /// outside the managed namespace.
    pub fn storage_path(&self, image_ref: &str) -> Option<String> {
        image_ref
            .strip_prefix(&self.public_base)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
    }

    /// Public URL of one variant. Unmanaged references come back unchanged.
    /// Idempotent: resolving an already-resolved URL is a no-op.
    pub fn resolve_url(&self, image_ref: &str, variant: Variant) -> String {
        if !self.transforms_enabled {
            return image_ref.to_string();
        }
        match self.storage_path(image_ref) {
            Some(path) => {
                let object = variant_object_path(&family_base(&path), variant);
                format!("{}{}", self.public_base, object)
            }
            None => image_ref.to_string(),
        }
    }

    /// Public URL for a usage preset.
    pub fn resolve_preset(&self, image_ref: &str, preset: Preset) -> String {
        self.resolve_url(image_ref, preset.variant())
    }

    /// Grouping key for a reference: the family base, re-prefixed for managed
    /// URLs so unrelated namespaces never collide.
    pub fn family_key(&self, image_ref: &str) -> String {
        match self.storage_path(image_ref) {
            Some(path) => format!("{}{}", self.public_base, family_base(&path)),
            None => image_ref.to_string(),
        }
    }

    /// Bucket-relative delete paths for a managed reference: the whole
    /// five-variant family, or nothing for unmanaged references.
    pub fn cleanup_family(&self, image_ref: &str) -> Vec<String> {
        match self.storage_path(image_ref) {
            Some(path) => variant_family(&family_base(&path)),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://store.test/storage/v1/object/public/artworks/";

    fn resolver() -> VariantResolver {
        VariantResolver::new(BASE)
    }

    #[test]
    fn resolve_url_appends_variant_suffix() {
        let url = format!("{BASE}abc123/x.jpg");
        assert_eq!(
            resolver().resolve_url(&url, Variant::Thumb),
            format!("{BASE}abc123/x__thumb.webp")
        );
    }

    #[test]
    fn resolve_url_is_idempotent() {
        let r = resolver();
        let url = format!("{BASE}abc123/x.jpg");
        for variant in Variant::ALL {
            let once = r.resolve_url(&url, variant);
            assert_eq!(r.resolve_url(&once, variant), once);
        }
    }

    #[test]
    fn resolve_url_normalizes_double_suffixed_legacy_paths() {
        let r = resolver();
        let url = format!("{BASE}abc123/x__thumb__card.webp");
        assert_eq!(
            r.resolve_url(&url, Variant::Hero),
            format!("{BASE}abc123/x__hero.webp")
        );
    }

    #[test]
    fn resolve_url_replaces_existing_variant() {
        let r = resolver();
        let url = format!("{BASE}abc123/x__card.webp");
        assert_eq!(
            r.resolve_url(&url, Variant::Detail),
            format!("{BASE}abc123/x__detail.webp")
        );
    }

    #[test]
    fn relative_and_foreign_references_pass_through() {
        let r = resolver();
        for reference in [
            "/static/hero.png",
            "logo.svg",
            "https://cdn.example.com/banner.jpg",
        ] {
            for variant in Variant::ALL {
                assert_eq!(r.resolve_url(reference, variant), reference);
            }
            assert_eq!(r.family_key(reference), reference);
            assert!(r.cleanup_family(reference).is_empty());
        }
    }

    #[test]
    fn family_base_keeps_non_variant_underscores() {
        assert_eq!(family_base("abc/my__photo.jpg"), "abc/my__photo");
        assert_eq!(family_base("abc/x__thumb.webp"), "abc/x");
        assert_eq!(family_base("abc/x__thumb"), "abc/x");
        assert_eq!(family_base("abc/x"), "abc/x");
    }

    #[test]
    fn family_base_ignores_dots_in_directories() {
        assert_eq!(family_base("a.b/x"), "a.b/x");
        assert_eq!(family_base("a.b/x.jpg"), "a.b/x");
    }

    #[test]
    fn variant_family_has_five_canonical_paths() {
        let family = variant_family("abc123/x");
        assert_eq!(family.len(), 5);
        assert!(family.contains(&"abc123/x__thumb.webp".to_string()));
        assert!(family.contains(&"abc123/x__original.webp".to_string()));
    }

    #[test]
    fn has_variant_suffix_detects_converted_paths() {
        assert!(has_variant_suffix("abc/x__thumb.webp"));
        assert!(has_variant_suffix("abc/x__original.webp"));
        assert!(!has_variant_suffix("abc/x.jpg"));
        assert!(!has_variant_suffix("abc/my__photo.jpg"));
    }

    #[test]
    fn preset_mapping_is_total() {
        assert_eq!(Preset::Slider.variant(), Variant::Thumb);
        assert_eq!(Preset::Card.variant(), Variant::Card);
        assert_eq!(Preset::Detail.variant(), Variant::Detail);
        assert_eq!(Preset::Hero.variant(), Variant::Hero);
        assert_eq!(Preset::Original.variant(), Variant::Original);
    }

    #[test]
    fn unknown_preset_fails_loudly() {
        assert!("banner".parse::<Preset>().is_err());
    }

    #[test]
    fn disabled_transforms_pass_managed_references_through() {
        let r = VariantResolver::with_transforms(BASE, false);
        let url = format!("{BASE}abc123/x.jpg");
        for variant in Variant::ALL {
            assert_eq!(r.resolve_url(&url, variant), url);
        }
        assert_eq!(r.resolve_preset(&url, Preset::Slider), url);
        // Cleanup mapping is not gated; trashed objects are still reclaimed.
        assert_eq!(r.storage_path(&url).as_deref(), Some("abc123/x.jpg"));
        assert_eq!(r.cleanup_family(&url).len(), 5);
    }

    #[test]
    fn family_key_groups_variants_of_one_image() {
        let r = resolver();
        let a = format!("{BASE}abc123/x__thumb.webp");
        let b = format!("{BASE}abc123/x__hero.webp");
        let c = format!("{BASE}abc123/x.jpg");
        assert_eq!(r.family_key(&a), r.family_key(&b));
        assert_eq!(r.family_key(&a), r.family_key(&c));
    }
}

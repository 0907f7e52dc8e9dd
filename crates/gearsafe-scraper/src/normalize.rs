//! Manufacturer canonicalization and subtype mapping.
//!
//! Every upstream spells manufacturer names its own way ("SHOEI", "Shoei
//! Helmets", "HJC Helmets"). Records are mapped onto the canonical names held
//! in the catalog's manufacturers table before any linkage happens.

/// Minimum Jaro–Winkler score for a canonical name to be accepted outright.
pub const MANUFACTURER_MATCH_THRESHOLD: f64 = 0.70;

/// Case-folded Jaro–Winkler similarity in `[0, 1]`.
///
/// `strsim`'s variant applies the Winkler prefix bonus (up to 4 chars) only
/// when the Jaro score is strictly above 0.7; a Jaro score of exactly 0.7
/// gets no bonus.
#[must_use]
pub fn name_similarity(a: &str, b: &str) -> f64 {
    strsim::jaro_winkler(&a.to_lowercase(), &b.to_lowercase())
}

/// Outcome of [`canonicalize_manufacturer`].
#[derive(Debug, Clone, PartialEq)]
pub enum ManufacturerMatch {
    /// Best Jaro–Winkler score cleared [`MANUFACTURER_MATCH_THRESHOLD`].
    Similar { canonical: String, score: f64 },
    /// Found by prefix or word containment after the similarity pass failed.
    Contained { canonical: String },
    /// Nothing matched; the raw value is kept as is.
    Unmatched { raw: String },
}

impl ManufacturerMatch {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Similar { canonical, .. } | Self::Contained { canonical } => canonical,
            Self::Unmatched { raw } => raw,
        }
    }

    #[must_use]
    pub fn into_name(self) -> String {
        match self {
            Self::Similar { canonical, .. } | Self::Contained { canonical } => canonical,
            Self::Unmatched { raw } => raw,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Unmatched { .. })
    }
}

/// Maps a raw manufacturer string onto one of `canonicals`.
///
/// The highest Jaro–Winkler score wins (first one on ties) if it is at least
/// [`MANUFACTURER_MATCH_THRESHOLD`]. Failing that, the first canonical `C`
/// for which `raw` starts with `C` or contains `" C"` is taken; this catches
/// names like "Nolan N-Com" or "The HJC Company" that similarity misses.
#[must_use]
pub fn canonicalize_manufacturer(raw: &str, canonicals: &[String]) -> ManufacturerMatch {
    let mut best: Option<(&String, f64)> = None;
    for canonical in canonicals {
        let score = name_similarity(canonical, raw);
        if best.is_none_or(|(_, top)| score > top) {
            best = Some((canonical, score));
        }
    }

    if let Some((canonical, score)) = best {
        if score >= MANUFACTURER_MATCH_THRESHOLD {
            return ManufacturerMatch::Similar {
                canonical: canonical.clone(),
                score,
            };
        }
    }

    let raw_lower = raw.to_lowercase();
    for canonical in canonicals {
        let needle = canonical.to_lowercase();
        if needle.is_empty() {
            continue;
        }
        if raw_lower.starts_with(&needle) || raw_lower.contains(&format!(" {needle}")) {
            tracing::warn!(
                raw,
                canonical = %canonical,
                "manufacturer matched by containment, not similarity"
            );
            return ManufacturerMatch::Contained {
                canonical: canonical.clone(),
            };
        }
    }

    ManufacturerMatch::Unmatched {
        raw: raw.to_owned(),
    }
}

/// Subtype from a SHARP "helmet type" cell ("System", "Full Face", ...).
#[must_use]
pub fn sharp_subtype(helmet_type: &str) -> &'static str {
    let lower = helmet_type.to_lowercase();
    if lower.contains("system") {
        "modular"
    } else if lower.contains("full face") {
        "full"
    } else {
        ""
    }
}

/// Subtype from a SNELL `faceconfig` value.
#[must_use]
pub fn snell_subtype(face_config: &str) -> &'static str {
    match face_config.trim().to_lowercase().as_str() {
        "modular" => "modular",
        "full face" => "full",
        "open face" => "open",
        _ => "",
    }
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;

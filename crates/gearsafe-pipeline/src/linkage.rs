//! Record linkage between sources that share no key.
//!
//! SNELL records are matched onto SHARP-origin helmets, and affiliate search
//! results onto catalog products, by Jaro–Winkler similarity of lowercased
//! names. A score equal to the threshold counts as a match.

use gearsafe_core::Product;
use gearsafe_scraper::{name_similarity, AffiliateProduct};

pub const SNELL_MATCH_THRESHOLD: f64 = 0.90;
pub const AFFILIATE_MATCH_THRESHOLD: f64 = 0.80;

#[derive(Debug, Clone, PartialEq)]
pub enum SnellLink {
    /// `index` into the helmet slice passed to [`link_snell_to_sharp`].
    Matched { index: usize, confidence: f64 },
    /// No helmet from that manufacturer.
    NoCandidates,
    /// Best candidate scored under [`SNELL_MATCH_THRESHOLD`].
    LowConfidence { best_model: String, confidence: f64 },
}

/// Finds the helmet a SNELL record describes.
///
/// Candidates are helmets whose manufacturer equals `manufacturer` exactly
/// (both sides already canonicalized). The first best-scoring candidate wins.
#[must_use]
pub fn link_snell_to_sharp(helmets: &[Product], manufacturer: &str, model: &str) -> SnellLink {
    let best = helmets
        .iter()
        .enumerate()
        .filter(|(_, p)| p.manufacturer == manufacturer)
        .map(|(index, p)| (index, name_similarity(&p.model, model)))
        .fold(None, |best: Option<(usize, f64)>, (index, score)| match best {
            Some((_, top)) if top >= score => best,
            _ => Some((index, score)),
        });

    match best {
        None => SnellLink::NoCandidates,
        Some((index, confidence)) if is_snell_match(confidence) => {
            SnellLink::Matched { index, confidence }
        }
        Some((index, confidence)) => SnellLink::LowConfidence {
            best_model: helmets[index].model.clone(),
            confidence,
        },
    }
}

fn is_snell_match(confidence: f64) -> bool {
    confidence >= SNELL_MATCH_THRESHOLD
}

#[derive(Debug, Clone, PartialEq)]
pub struct AffiliateMatch {
    pub product: AffiliateProduct,
    pub confidence: f64,
}

/// Top-scoring helmet among `results` for `"<manufacturer> <model>"`.
#[must_use]
pub fn best_affiliate_match(
    results: Vec<AffiliateProduct>,
    manufacturer: &str,
    model: &str,
) -> Option<AffiliateMatch> {
    let target = format!("{manufacturer} {model}");
    results
        .into_iter()
        .filter(AffiliateProduct::is_helmet)
        .map(|product| AffiliateMatch {
            confidence: name_similarity(&product.name, &target),
            product,
        })
        .fold(None, |best: Option<AffiliateMatch>, candidate| match best {
            Some(top) if top.confidence >= candidate.confidence => Some(top),
            _ => Some(candidate),
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AffiliateDecision {
    /// Confident match whose buy page is gone.
    Discontinued,
    /// Confident match that is still on sale.
    Available,
    /// Not confident; try the next model candidate.
    NoMatch,
}

#[must_use]
pub fn decide(confidence: f64, discontinued: bool) -> AffiliateDecision {
    if confidence < AFFILIATE_MATCH_THRESHOLD {
        AffiliateDecision::NoMatch
    } else if discontinued {
        AffiliateDecision::Discontinued
    } else {
        AffiliateDecision::Available
    }
}

//! Safety percentage computation.
//!
//! Scores are pure functions of a product's certifications. Each gear family
//! has its own weighting; the result is always rounded to a whole percentage
//! in `0..=100`.

use crate::certifications::{
    CeZone, Certifications, HelmetCertifications, JacketCertifications, PantsCertifications,
    ZoneCertifications,
};

const SHARP_MAX_RATING: f64 = 5.0;
const SHARP_ZONE_WEIGHT: f64 = 0.2;
const SHARP_WEIGHT: f64 = 0.8;

/// (SNELL, ECE, DOT) weights when a SHARP rating is present.
const WEIGHTS_WITH_SHARP: (f64, f64, f64) = (0.10, 0.08, 0.02);
/// (SNELL, ECE, DOT) weights without SHARP; caps the helmet at 80 %.
const WEIGHTS_WITHOUT_SHARP: (f64, f64, f64) = (0.65, 0.10, 0.05);

const EMPTY_ZONE_SCORE: f64 = 0.50;
const LEVEL_1_ZONE_SCORE: f64 = 0.75;
const LEVEL_2_ZONE_SCORE: f64 = 0.95;
const APPROVED_BONUS: f64 = 0.05;

const JACKET_ZONE_WEIGHT: f64 = 0.85;
const AIRBAG_BONUS: f64 = 0.15;

/// Safety percentage (0–100) for any gear family.
#[must_use]
pub fn compute_safety_percentage(certifications: &Certifications) -> i32 {
    let total = match certifications {
        Certifications::Helmet(h) => helmet_score(h),
        Certifications::Jacket(j) => jacket_score(j),
        Certifications::Pants(p) => pants_score(p),
        Certifications::Boots(z) | Certifications::Gloves(z) => overall_score(z),
    };
    to_percentage(total)
}

/// Score of one CE zone in `[0, 1]`.
#[must_use]
pub fn zone_score(zone: Option<&CeZone>) -> f64 {
    let Some(zone) = zone else {
        return 0.0;
    };
    if zone.is_empty {
        return EMPTY_ZONE_SCORE;
    }
    let base = if zone.is_level_2 {
        LEVEL_2_ZONE_SCORE
    } else {
        LEVEL_1_ZONE_SCORE
    };
    if zone.is_approved {
        base + APPROVED_BONUS
    } else {
        base
    }
}

fn helmet_score(certs: &HelmetCertifications) -> f64 {
    let (snell_w, ece_w, dot_w, sharp_part) = match &certs.sharp {
        Some(sharp) => {
            let zones: f64 = sharp
                .impact_zones
                .ratings()
                .iter()
                .map(|&r| f64::from(r) / SHARP_MAX_RATING * SHARP_ZONE_WEIGHT)
                .sum();
            let (s, e, d) = WEIGHTS_WITH_SHARP;
            (s, e, d, SHARP_WEIGHT * zones)
        }
        None => {
            let (s, e, d) = WEIGHTS_WITHOUT_SHARP;
            (s, e, d, 0.0)
        }
    };

    let mut total = sharp_part;
    if certs.snell {
        total += snell_w;
    }
    if certs.ece {
        total += ece_w;
    }
    if certs.dot {
        total += dot_w;
    }
    total
}

/// `0.85 × mean(back, chest, elbow, shoulder) + 0.15` with an airbag.
///
/// This is not the plain `sum(zone) / 4 + 0.15`: the zone part is scaled to
/// 0.85 so that four level-2 approved zones plus an airbag top out at exactly
/// 100. A jacket with only an empty back pocket therefore scores 11, not 13.
fn jacket_score(certs: &JacketCertifications) -> f64 {
    let zones = [certs.back, certs.chest, certs.elbow, certs.shoulder];
    let mut total = JACKET_ZONE_WEIGHT * mean_zone_score(&zones);
    if certs.fits_airbag {
        total += AIRBAG_BONUS;
    }
    total
}

fn pants_score(certs: &PantsCertifications) -> f64 {
    mean_zone_score(&[certs.hip, certs.knee, certs.tailbone])
}

fn overall_score(certs: &ZoneCertifications) -> f64 {
    zone_score(certs.overall.as_ref())
}

#[allow(clippy::cast_precision_loss)]
fn mean_zone_score(zones: &[Option<CeZone>]) -> f64 {
    if zones.is_empty() {
        return 0.0;
    }
    let sum: f64 = zones.iter().map(|z| zone_score(z.as_ref())).sum();
    sum / zones.len() as f64
}

#[allow(clippy::cast_possible_truncation)]
fn to_percentage(total: f64) -> i32 {
    (total * 100.0).round().clamp(0.0, 100.0) as i32
}

//! Certification inference from retailer product copy.
//!
//! Soft gear never has an official rating source; CE zones are read from the
//! description bullet points. Helmet copy is only trusted for the DOT and ECE
//! flags.

use gearsafe_core::{CeZone, Certifications, HelmetCertifications};

const AIRBAG_KEYWORDS: [&str; 5] = ["d-air", "tech-air", "tech air", "air bag", "airbag"];
const EMPTY_KEYWORDS: [&str; 3] = ["sold separately", "optional", "pocket"];

/// Per-part signals read from one description line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PartSignals {
    certified: bool,
    zone: CeZone,
}

impl PartSignals {
    fn read(part: &str) -> Self {
        let lower = part.to_lowercase();
        let is_approved = part.contains("CE approved");
        Self {
            certified: part.contains("CE") || is_approved,
            zone: CeZone {
                is_level_2: lower.contains("level 2") || lower.contains("level ii"),
                is_approved,
                is_empty: EMPTY_KEYWORDS.iter().any(|k| lower.contains(k)),
            },
        }
    }
}

fn fill_zone(slot: &mut Option<CeZone>, zone: CeZone) {
    if slot.is_none() {
        *slot = Some(zone);
    }
}

/// Applies every description part to `certifications` in order.
///
/// A zone is written only while it is still absent, so the first part that
/// mentions it wins. Helmets are left untouched; use [`infer_helmet_text`].
pub fn infer_soft_gear(certifications: &mut Certifications, parts: &[String]) {
    for part in parts {
        let lower = part.to_lowercase();
        let signals = PartSignals::read(part);

        match certifications {
            Certifications::Jacket(jacket) => {
                if AIRBAG_KEYWORDS.iter().any(|k| lower.contains(k)) {
                    jacket.fits_airbag = true;
                }
                if !signals.certified {
                    continue;
                }
                for (keyword, slot) in [
                    ("back", &mut jacket.back),
                    ("elbow", &mut jacket.elbow),
                    ("shoulder", &mut jacket.shoulder),
                    ("chest", &mut jacket.chest),
                ] {
                    if lower.contains(keyword) {
                        fill_zone(slot, signals.zone);
                    }
                }
            }
            Certifications::Pants(pants) => {
                if !signals.certified {
                    continue;
                }
                for (keyword, slot) in [
                    ("tailbone", &mut pants.tailbone),
                    ("hip", &mut pants.hip),
                    ("knee", &mut pants.knee),
                ] {
                    if lower.contains(keyword) {
                        fill_zone(slot, signals.zone);
                    }
                }
            }
            Certifications::Boots(zones) | Certifications::Gloves(zones) => {
                if signals.certified {
                    fill_zone(&mut zones.overall, signals.zone);
                }
            }
            Certifications::Helmet(_) => return,
        }
    }
}

/// Sets DOT/ECE from free-text helmet copy. Returns `(dot_updated, ece_updated)`.
///
/// A SNELL mention implies DOT; the SNELL flag itself only ever comes from the
/// SNELL feed.
pub fn infer_helmet_text(certs: &mut HelmetCertifications, text: &str) -> (bool, bool) {
    let lower = text.to_lowercase();
    let mentions_dot = text.contains("DOT")
        || text.contains("D.O.T.")
        || ["snell", "m2010", "m2015"].iter().any(|k| lower.contains(k));
    let mentions_ece = ["ECE", "22/05", "22.05"].iter().any(|k| text.contains(k));

    let dot_updated = mentions_dot && !certs.dot;
    let ece_updated = mentions_ece && !certs.ece;
    certs.dot |= dot_updated;
    certs.ece |= ece_updated;
    (dot_updated, ece_updated)
}

//! Canonical catalog product.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::certifications::{Certifications, HelmetCertifications};
use crate::scoring::compute_safety_percentage;

/// Stored latch percentage for helmets SHARP reports no latch data for.
pub const NO_LATCH_PERCENTAGE: i32 = -1;

/// Stored weight when the source weight could not be parsed.
pub const UNKNOWN_WEIGHT_LBS: f64 = -1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GearType {
    Helmet,
    Jacket,
    Pants,
    Boots,
    Gloves,
}

impl GearType {
    pub const ALL: [GearType; 5] = [
        GearType::Helmet,
        GearType::Jacket,
        GearType::Pants,
        GearType::Boots,
        GearType::Gloves,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            GearType::Helmet => "helmet",
            GearType::Jacket => "jacket",
            GearType::Pants => "pants",
            GearType::Boots => "boots",
            GearType::Gloves => "gloves",
        }
    }
}

impl std::fmt::Display for GearType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GearType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "helmet" | "helmets" => Ok(GearType::Helmet),
            "jacket" | "jackets" => Ok(GearType::Jacket),
            "pants" => Ok(GearType::Pants),
            "boots" => Ok(GearType::Boots),
            "gloves" => Ok(GearType::Gloves),
            other => Err(format!("unknown gear type \"{other}\"")),
        }
    }
}

/// An alternative model name. Aliases feed affiliate lookups; display
/// aliases are also shown to users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelAlias {
    pub name: String,
    pub is_for_display: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub uuid: Uuid,
    /// Retailer or affiliate id; unique across the catalog when set.
    pub external_id: Option<String>,
    /// Type-dependent subtype, e.g. `"modular"` or `"full"` for helmets.
    pub subtype: String,
    pub manufacturer: String,
    pub model: String,
    pub model_aliases: Vec<ModelAlias>,
    pub image_url: String,
    /// Object-storage key of the copied image; empty until copied.
    pub image_key: String,
    pub affiliate_buy_url: String,
    pub affiliate_price_cents: i64,
    pub msrp_cents: i64,
    pub search_price_cents: i64,
    /// Modular helmets only; [`NO_LATCH_PERCENTAGE`] when absent.
    pub latch_percentage: i32,
    pub weight_lbs: f64,
    pub sizes: Vec<String>,
    pub materials: String,
    pub retention_system: String,
    pub certifications: Certifications,
    pub is_discontinued: bool,
    /// 0–100, derived from `certifications` by [`Product::update_safety_percentage`].
    pub safety_percentage: i32,
}

impl Product {
    /// A blank product of `gear_type` with a fresh uuid.
    #[must_use]
    pub fn new(
        gear_type: crate::GearType,
        manufacturer: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            external_id: None,
            subtype: String::new(),
            manufacturer: manufacturer.into(),
            model: model.into(),
            model_aliases: Vec::new(),
            image_url: String::new(),
            image_key: String::new(),
            affiliate_buy_url: String::new(),
            affiliate_price_cents: 0,
            msrp_cents: 0,
            search_price_cents: 0,
            latch_percentage: NO_LATCH_PERCENTAGE,
            weight_lbs: UNKNOWN_WEIGHT_LBS,
            sizes: Vec::new(),
            materials: String::new(),
            retention_system: String::new(),
            certifications: Certifications::empty(gear_type),
            is_discontinued: false,
            safety_percentage: 0,
        }
    }

    #[must_use]
    pub fn gear_type(&self) -> GearType {
        self.certifications.gear_type()
    }

    #[must_use]
    pub fn helmet_certifications(&self) -> Option<&HelmetCertifications> {
        match &self.certifications {
            Certifications::Helmet(h) => Some(h),
            _ => None,
        }
    }

    pub fn helmet_certifications_mut(&mut self) -> Option<&mut HelmetCertifications> {
        match &mut self.certifications {
            Certifications::Helmet(h) => Some(h),
            _ => None,
        }
    }

    /// Affiliate price when one is known, otherwise MSRP.
    pub fn update_search_price(&mut self) {
        self.search_price_cents = if self.affiliate_price_cents > 0 {
            self.affiliate_price_cents
        } else {
            self.msrp_cents
        };
    }

    pub fn update_safety_percentage(&mut self) {
        self.safety_percentage = compute_safety_percentage(&self.certifications);
    }

    /// Recomputes every derived field. Returns `true` when either changed.
    pub fn refresh_derived(&mut self) -> bool {
        let before = (self.search_price_cents, self.safety_percentage);
        self.update_search_price();
        self.update_safety_percentage();
        before != (self.search_price_cents, self.safety_percentage)
    }

    /// Model name followed by every alias, in order: the candidate list for
    /// affiliate searches.
    #[must_use]
    pub fn model_candidates(&self) -> Vec<&str> {
        std::iter::once(self.model.as_str())
            .chain(self.model_aliases.iter().map(|a| a.name.as_str()))
            .collect()
    }

    /// Folds a fresh source sighting into this stored product.
    ///
    /// Source-owned fields come from `fresh`. Enrichment state (affiliate
    /// listing, discontinued flag, copied image, external id) stays. ECE and
    /// DOT only ever turn on, since they may have been inferred from an
    /// affiliate description rather than the source being re-read.
    pub fn absorb_source(&mut self, fresh: Product) {
        let Product {
            subtype,
            model_aliases,
            image_url,
            msrp_cents,
            latch_percentage,
            weight_lbs,
            sizes,
            materials,
            retention_system,
            certifications,
            ..
        } = fresh;

        if !subtype.is_empty() {
            self.subtype = subtype;
        }
        if !model_aliases.is_empty() {
            self.model_aliases = model_aliases;
        }
        if !image_url.is_empty() && image_url != self.image_url {
            self.image_url = image_url;
            self.image_key.clear();
        }
        if msrp_cents > 0 {
            self.msrp_cents = msrp_cents;
        }
        if latch_percentage != NO_LATCH_PERCENTAGE {
            self.latch_percentage = latch_percentage;
        }
        if weight_lbs > 0.0 {
            self.weight_lbs = weight_lbs;
        }
        if !sizes.is_empty() {
            self.sizes = sizes;
        }
        if !materials.is_empty() {
            self.materials = materials;
        }
        if !retention_system.is_empty() {
            self.retention_system = retention_system;
        }

        self.certifications = match (self.certifications, certifications) {
            (Certifications::Helmet(stored), Certifications::Helmet(fresh)) => {
                Certifications::Helmet(HelmetCertifications {
                    sharp: fresh.sharp.or(stored.sharp),
                    snell: fresh.snell || stored.snell,
                    ece: fresh.ece || stored.ece,
                    dot: fresh.dot || stored.dot,
                })
            }
            (_, fresh) => fresh,
        };
    }
}

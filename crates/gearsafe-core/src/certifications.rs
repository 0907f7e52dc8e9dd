//! Certification records, one family per gear type.
//!
//! A product owns exactly one family, which is enforced structurally: the
//! [`Certifications`] enum is the gear-type discriminator for [`crate::Product`].

use serde::{Deserialize, Serialize};

use crate::product::GearType;

/// SHARP impact-zone ratings, each 0–5. Zones SHARP did not publish are
/// stored as 0, never as null.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharpImpactZones {
    pub left: u8,
    pub right: u8,
    pub rear: u8,
    pub top: SharpTopZones,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharpTopZones {
    pub front: u8,
    pub rear: u8,
}

impl SharpImpactZones {
    /// All five zones in scoring order: left, right, top front, top rear, rear.
    #[must_use]
    pub fn ratings(&self) -> [u8; 5] {
        [self.left, self.right, self.top.front, self.top.rear, self.rear]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharpRating {
    /// Overall star rating, 0–5.
    pub stars: u8,
    pub impact_zones: SharpImpactZones,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelmetCertifications {
    pub sharp: Option<SharpRating>,
    pub snell: bool,
    pub ece: bool,
    pub dot: bool,
}

/// CE protection state of one impact zone on soft gear.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CeZone {
    pub is_level_2: bool,
    pub is_approved: bool,
    /// The product has a pocket for armor in this zone but ships without it.
    pub is_empty: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JacketCertifications {
    pub shoulder: Option<CeZone>,
    pub elbow: Option<CeZone>,
    pub back: Option<CeZone>,
    pub chest: Option<CeZone>,
    pub fits_airbag: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PantsCertifications {
    pub hip: Option<CeZone>,
    pub knee: Option<CeZone>,
    pub tailbone: Option<CeZone>,
}

/// Boots and gloves carry a single overall CE zone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneCertifications {
    pub overall: Option<CeZone>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "gear_type", content = "ratings", rename_all = "lowercase")]
pub enum Certifications {
    Helmet(HelmetCertifications),
    Jacket(JacketCertifications),
    Pants(PantsCertifications),
    Boots(ZoneCertifications),
    Gloves(ZoneCertifications),
}

impl Certifications {
    /// Empty certifications of the family matching `gear_type`.
    #[must_use]
    pub fn empty(gear_type: GearType) -> Self {
        match gear_type {
            GearType::Helmet => Self::Helmet(HelmetCertifications::default()),
            GearType::Jacket => Self::Jacket(JacketCertifications::default()),
            GearType::Pants => Self::Pants(PantsCertifications::default()),
            GearType::Boots => Self::Boots(ZoneCertifications::default()),
            GearType::Gloves => Self::Gloves(ZoneCertifications::default()),
        }
    }

    #[must_use]
    pub fn gear_type(&self) -> GearType {
        match self {
            Self::Helmet(_) => GearType::Helmet,
            Self::Jacket(_) => GearType::Jacket,
            Self::Pants(_) => GearType::Pants,
            Self::Boots(_) => GearType::Boots,
            Self::Gloves(_) => GearType::Gloves,
        }
    }
}

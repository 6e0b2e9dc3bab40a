//! Hygiene zones: operator-drawn regions with a scooper policy attached.
//!
//! Zones are stored exclusively in natural (frame) space. The registry owns
//! their lifetime; everything else borrows.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

use crate::error::ZoneError;
use crate::geometry::{Natural, NaturalPoint, Shape};

mod payload;
mod registry;

pub use payload::ZonePayload;
pub use registry::ZoneRegistry;

pub type ZoneShape = Shape<Natural>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneId(pub u32);

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "zone:{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Zone {
    pub id: ZoneId,
    pub name: String,
    pub shape: ZoneShape,
    /// Ingredient held in the zone (e.g. "sauce", "cheese"). Cross-contamination
    /// is a move between scooper-required zones of different categories.
    pub ingredient_category: String,
    pub requires_scooper: bool,
}

impl Zone {
    pub fn contains(&self, point: NaturalPoint) -> bool {
        self.shape.contains(point)
    }
}

/// Everything about a zone except its registry-assigned id.
#[derive(Clone, Debug, PartialEq)]
pub struct ZoneSpec {
    pub name: String,
    pub shape: ZoneShape,
    pub ingredient_category: String,
    pub requires_scooper: bool,
}

impl ZoneSpec {
    pub fn new(name: &str, shape: ZoneShape, ingredient_category: &str) -> Self {
        Self {
            name: name.to_string(),
            shape,
            ingredient_category: ingredient_category.to_string(),
            requires_scooper: true,
        }
    }

    pub fn with_scooper_required(mut self, required: bool) -> Self {
        self.requires_scooper = required;
        self
    }

    pub(crate) fn into_zone(self, id: ZoneId) -> Zone {
        Zone {
            id,
            name: self.name,
            shape: self.shape,
            ingredient_category: self.ingredient_category,
            requires_scooper: self.requires_scooper,
        }
    }
}

/// Zone names are display labels, not free text: 1..=64 letters, digits,
/// spaces and `_-.()`.
pub fn validate_zone_name(name: &str) -> Result<(), ZoneError> {
    static ZONE_NAME_RE: OnceLock<regex::Regex> = OnceLock::new();
    let re = ZONE_NAME_RE.get_or_init(|| {
        regex::Regex::new(r"^[\p{L}\p{N} _.()\-]{1,64}$").expect("zone name pattern compiles")
    });

    if name.trim() != name || !re.is_match(name) {
        return Err(ZoneError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_names_follow_allowlist() {
        assert!(validate_zone_name("Sauce container").is_ok());
        assert!(validate_zone_name("cheese_bin-2 (left)").is_ok());
        assert!(validate_zone_name("Käse").is_ok());
        assert!(validate_zone_name("").is_err());
        assert!(validate_zone_name(" padded").is_err());
        assert!(validate_zone_name("tabs\tinside").is_err());
        assert!(validate_zone_name("a/b").is_err());
        assert!(validate_zone_name(&"x".repeat(65)).is_err());
    }

    #[test]
    fn zone_id_renders_with_prefix() {
        assert_eq!(ZoneId(7).to_string(), "zone:7");
    }
}

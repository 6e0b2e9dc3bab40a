use serde::{Deserialize, Serialize};

use crate::error::{GeometryError, ZoneError};
use crate::geometry::{NaturalPoint, Shape, ShapeKind};

use super::{Zone, ZoneId, ZoneShape, ZoneSpec};

fn default_requires_scooper() -> bool {
    true
}

/// Zone create/update payload as exchanged with the calling layer.
///
/// Coordinates are natural-space `[x, y]` pairs. A rectangle is written as
/// its four corners and read from either two defining corners or four.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZonePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ZoneId>,
    pub name: String,
    pub coordinates: Vec<[f64; 2]>,
    #[serde(rename = "type")]
    pub kind: ShapeKind,
    #[serde(default)]
    pub ingredient_category: String,
    #[serde(default = "default_requires_scooper")]
    pub requires_scooper: bool,
}

impl ZonePayload {
    pub fn from_zone(zone: &Zone) -> Self {
        Self {
            id: Some(zone.id),
            name: zone.name.clone(),
            coordinates: zone.shape.vertices().iter().map(|p| [p.x, p.y]).collect(),
            kind: zone.shape.kind(),
            ingredient_category: zone.ingredient_category.clone(),
            requires_scooper: zone.requires_scooper,
        }
    }

    /// Build the shape without validating it. Only a rectangle with fewer than
    /// two points cannot be represented at all.
    pub fn shape(&self) -> Result<ZoneShape, GeometryError> {
        let points: Vec<NaturalPoint> = self
            .coordinates
            .iter()
            .map(|&[x, y]| NaturalPoint::new(x, y))
            .collect();
        match self.kind {
            ShapeKind::Polygon => Ok(Shape::Polygon(points)),
            ShapeKind::Rectangle => {
                if points.len() < 2 {
                    return Err(GeometryError::TooFewPoints {
                        count: points.len(),
                    });
                }
                let min_x = points.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
                let max_x = points.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
                let min_y = points.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
                let max_y = points.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);
                Ok(Shape::Rectangle {
                    p1: NaturalPoint::new(min_x, min_y),
                    p2: NaturalPoint::new(max_x, max_y),
                })
            }
        }
    }

    pub fn to_spec(&self) -> Result<ZoneSpec, ZoneError> {
        Ok(ZoneSpec {
            name: self.name.clone(),
            shape: self.shape()?,
            ingredient_category: self.ingredient_category.clone(),
            requires_scooper: self.requires_scooper,
        })
    }
}

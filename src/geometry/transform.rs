//! Natural <-> display coordinate mapping.
//!
//! Zones are stored in natural (frame) space. Anything an operator touches is
//! in display space and must pass through here before it reaches a zone.

use crate::error::GeometryError;

use super::{DisplayPoint, DisplaySpace, Natural, NaturalPoint, Shape};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoordinateTransform {
    natural_width: f64,
    natural_height: f64,
    display_width: f64,
    display_height: f64,
}

fn check_dimensions(width: f64, height: f64) -> Result<(), GeometryError> {
    if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
        return Err(GeometryError::InvalidDimensions { width, height });
    }
    Ok(())
}

impl CoordinateTransform {
    pub fn new(
        natural_width: f64,
        natural_height: f64,
        display_width: f64,
        display_height: f64,
    ) -> Result<Self, GeometryError> {
        check_dimensions(natural_width, natural_height)?;
        check_dimensions(display_width, display_height)?;
        Ok(Self {
            natural_width,
            natural_height,
            display_width,
            display_height,
        })
    }

    /// Display surface the same size as the frame.
    pub fn identity(width: f64, height: f64) -> Result<Self, GeometryError> {
        Self::new(width, height, width, height)
    }

    /// Build from a natural size and per-axis scale factors.
    pub fn from_scale(
        natural_width: f64,
        natural_height: f64,
        scale_x: f64,
        scale_y: f64,
    ) -> Result<Self, GeometryError> {
        Self::new(
            natural_width,
            natural_height,
            natural_width * scale_x,
            natural_height * scale_y,
        )
    }

    pub fn scale_x(&self) -> f64 {
        self.display_width / self.natural_width
    }

    pub fn scale_y(&self) -> f64 {
        self.display_height / self.natural_height
    }

    pub fn natural_size(&self) -> (f64, f64) {
        (self.natural_width, self.natural_height)
    }

    pub fn display_size(&self) -> (f64, f64) {
        (self.display_width, self.display_height)
    }

    /// The display surface changed size; natural space is unaffected.
    pub fn resize_display(&mut self, width: f64, height: f64) -> Result<(), GeometryError> {
        check_dimensions(width, height)?;
        self.display_width = width;
        self.display_height = height;
        Ok(())
    }

    pub fn to_display(&self, p: NaturalPoint) -> DisplayPoint {
        DisplayPoint::new(p.x * self.scale_x(), p.y * self.scale_y())
    }

    pub fn to_natural(&self, p: DisplayPoint) -> NaturalPoint {
        NaturalPoint::new(p.x / self.scale_x(), p.y / self.scale_y())
    }

    pub fn points_to_display(&self, points: &[NaturalPoint]) -> Vec<DisplayPoint> {
        points.iter().map(|p| self.to_display(*p)).collect()
    }

    pub fn points_to_natural(&self, points: &[DisplayPoint]) -> Vec<NaturalPoint> {
        points.iter().map(|p| self.to_natural(*p)).collect()
    }

    pub fn shape_to_natural(&self, shape: &Shape<DisplaySpace>) -> Shape<Natural> {
        shape.map_points(|p| self.to_natural(p))
    }

    pub fn shape_to_display(&self, shape: &Shape<Natural>) -> Shape<DisplaySpace> {
        shape.map_points(|p| self.to_display(p))
    }

    /// Convert a display-space length (e.g. a hit radius) to natural pixels,
    /// using the smaller scale so the radius never shrinks.
    pub fn length_to_natural(&self, length: f64) -> f64 {
        length / self.scale_x().min(self.scale_y())
    }
}

//! Projection and path engine.
//!
//! Maps longitude/latitude to screen space under a spherical Mercator
//! projection built from declared parameters, and composes the user's
//! pan/zoom transform on top. Geometry always stays in geographic
//! coordinates; the transform is re-applied every frame, never baked in.

use std::collections::BTreeMap;
use std::f64::consts::FRAC_PI_4;

use egui::{Pos2, Rect, Vec2};
use serde::Deserialize;

use crate::error::DataError;

/// Mercator blows up at the poles; clamp like the web map convention.
const LAT_LIMIT: f64 = 85.0511;

/// Pure (longitude, latitude) → screen mapping.
#[derive(Clone, Copy, Debug)]
pub struct Projection {
    center: (f64, f64),
    scale: f64,
    translate: Vec2,
}

/// Declared-parameter builder for [`Projection`].
#[derive(Clone, Copy, Debug)]
pub struct ProjectionBuilder {
    center: (f64, f64),
    scale: f64,
    translate: Vec2,
}

impl Projection {
    pub fn builder() -> ProjectionBuilder {
        ProjectionBuilder {
            center: (0.0, 20.0),
            scale: 130.0,
            translate: Vec2::ZERO,
        }
    }

    pub fn project(&self, lon: f64, lat: f64) -> Pos2 {
        let x = self.scale * (lon.to_radians() - self.center.0.to_radians());
        let y = self.scale * (mercator_y(lat) - mercator_y(self.center.1));
        Pos2::new(
            self.translate.x + x as f32,
            self.translate.y - y as f32,
        )
    }
}

impl ProjectionBuilder {
    pub fn center(mut self, lon: f64, lat: f64) -> Self {
        self.center = (lon, lat.clamp(-LAT_LIMIT, LAT_LIMIT));
        self
    }

    pub fn scale(mut self, scale: f64) -> Self {
        self.scale = scale.max(f64::MIN_POSITIVE);
        self
    }

    pub fn translate(mut self, translate: Vec2) -> Self {
        self.translate = translate;
        self
    }

    pub fn build(self) -> Projection {
        Projection {
            center: self.center,
            scale: self.scale,
            translate: self.translate,
        }
    }
}

fn mercator_y(lat: f64) -> f64 {
    let lat = lat.clamp(-LAT_LIMIT, LAT_LIMIT).to_radians();
    (FRAC_PI_4 + lat / 2.0).tan().ln()
}

/// The user's accumulated pan/zoom, composed on top of a base projection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
    pub translation: Vec2,
    pub scale: f32,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            translation: Vec2::ZERO,
            scale: 1.0,
        }
    }
}

impl ViewTransform {
    pub fn apply(&self, p: Pos2) -> Pos2 {
        Pos2::new(
            p.x * self.scale + self.translation.x,
            p.y * self.scale + self.translation.y,
        )
    }

    pub fn pan(&mut self, delta: Vec2) {
        self.translation += delta;
    }

    /// Map a screen point back into pre-transform coordinates.
    pub fn invert(&self, p: Pos2) -> Pos2 {
        Pos2::new(
            (p.x - self.translation.x) / self.scale,
            (p.y - self.translation.y) / self.scale,
        )
    }

    /// Zoom by `factor` keeping the point under `anchor` fixed on screen.
    pub fn zoom_about(&mut self, anchor: Pos2, factor: f32, limits: (f32, f32)) {
        let new_scale = (self.scale * factor).clamp(limits.0, limits.1);
        if new_scale == self.scale {
            return;
        }
        let ratio = new_scale / self.scale;
        self.translation = anchor.to_vec2() - (anchor.to_vec2() - self.translation) * ratio;
        self.scale = new_scale;
    }
}

// ---------------------------------------------------------------------------
// Topology features

/// One country outline: polygon rings of `[lon, lat]` pairs.
#[derive(Debug, Clone, Deserialize)]
pub struct CountryFeature {
    pub name: String,
    pub rings: Vec<Vec<[f64; 2]>>,
}

impl CountryFeature {
    /// Point average of the largest ring; a planar stand-in for a spherical
    /// centroid, adequate at world scale.
    pub fn centroid(&self) -> Option<(f64, f64)> {
        let ring = self.rings.iter().max_by_key(|r| r.len())?;
        if ring.is_empty() {
            return None;
        }
        let (sx, sy) = ring
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p[0], sy + p[1]));
        let n = ring.len() as f64;
        Some((sx / n, sy / n))
    }
}

#[derive(Debug, Clone, Deserialize)]
struct AtlasDoc {
    countries: Vec<CountryFeature>,
}

/// World boundary features keyed by country name, as supplied by the
/// topology collaborator.
#[derive(Debug, Clone, Default)]
pub struct WorldAtlas {
    pub features: Vec<CountryFeature>,
    centroids: BTreeMap<String, (f64, f64)>,
}

impl WorldAtlas {
    pub fn from_json(json: &str) -> Result<Self, DataError> {
        let doc: AtlasDoc =
            serde_json::from_str(json).map_err(|e| DataError::load(e.to_string()))?;
        if doc.countries.is_empty() {
            return Err(DataError::shape("atlas has no countries"));
        }
        Ok(Self::new(doc.countries))
    }

    pub fn new(features: Vec<CountryFeature>) -> Self {
        let centroids = features
            .iter()
            .filter_map(|f| f.centroid().map(|c| (f.name.clone(), c)))
            .collect();
        Self {
            features,
            centroids,
        }
    }

    /// Centroid lookup; `None` excludes the name from spatial placement.
    pub fn centroid(&self, name: &str) -> Option<(f64, f64)> {
        self.centroids.get(name).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.features.iter().map(|f| f.name.as_str())
    }
}

/// Fixed anchor coordinates for region-aggregated symbols.
const REGION_ANCHORS: &[(&str, (f64, f64))] = &[
    ("Africa", (17.0, 3.0)),
    ("Americas", (-78.0, 8.0)),
    ("Asia & Oceania", (100.0, 25.0)),
    ("Europe", (15.0, 50.0)),
    ("Middle East", (45.0, 29.0)),
];

/// Anchor (longitude, latitude) for a world region.
pub fn region_anchor(region: &str) -> Option<(f64, f64)> {
    REGION_ANCHORS
        .iter()
        .find(|(name, _)| *name == region)
        .map(|(_, anchor)| *anchor)
}

/// Project one ring into screen space under projection + transform.
pub fn ring_points(
    ring: &[[f64; 2]],
    projection: &Projection,
    transform: &ViewTransform,
) -> Vec<Pos2> {
    ring.iter()
        .map(|p| transform.apply(projection.project(p[0], p[1])))
        .collect()
}

/// Even-odd test for pointer hit-testing against a projected ring.
pub fn point_in_ring(p: Pos2, ring: &[Pos2]) -> bool {
    let mut inside = false;
    let n = ring.len();
    if n < 3 {
        return false;
    }
    let mut j = n - 1;
    for i in 0..n {
        let (a, b) = (ring[i], ring[j]);
        if (a.y > p.y) != (b.y > p.y)
            && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Fit a projection so the whole world occupies `rect` reasonably.
pub fn world_projection(rect: Rect) -> Projection {
    Projection::builder()
        .center(0.0, 20.0)
        .scale((rect.width() as f64 / 360.0) * 58.0)
        .translate(rect.center().to_vec2())
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proj() -> Projection {
        Projection::builder()
            .center(0.0, 0.0)
            .scale(100.0)
            .translate(Vec2::new(500.0, 300.0))
            .build()
    }

    #[test]
    fn center_projects_to_translate() {
        let p = proj().project(0.0, 0.0);
        assert!((p.x - 500.0).abs() < 1e-4);
        assert!((p.y - 300.0).abs() < 1e-4);
    }

    #[test]
    fn east_is_right_and_north_is_up() {
        let p = proj();
        let east = p.project(10.0, 0.0);
        let north = p.project(0.0, 10.0);
        assert!(east.x > 500.0);
        assert!(north.y < 300.0);
    }

    #[test]
    fn polar_latitudes_stay_finite() {
        let p = proj().project(0.0, 90.0);
        assert!(p.y.is_finite());
    }

    #[test]
    fn zoom_about_keeps_anchor_fixed() {
        let mut t = ViewTransform::default();
        let anchor = Pos2::new(120.0, 80.0);
        let before = {
            // The world point currently under the anchor.
            let inv_x = (anchor.x - t.translation.x) / t.scale;
            let inv_y = (anchor.y - t.translation.y) / t.scale;
            Pos2::new(inv_x, inv_y)
        };
        t.zoom_about(anchor, 2.0, (1.0, 8.0));
        let after = t.apply(before);
        assert!((after.x - anchor.x).abs() < 1e-3);
        assert!((after.y - anchor.y).abs() < 1e-3);
        assert_eq!(t.scale, 2.0);
    }

    #[test]
    fn zoom_clamps_to_extent() {
        let mut t = ViewTransform::default();
        t.zoom_about(Pos2::ZERO, 100.0, (1.0, 8.0));
        assert_eq!(t.scale, 8.0);
        t.zoom_about(Pos2::ZERO, 1e-6, (1.0, 8.0));
        assert_eq!(t.scale, 1.0);
    }

    #[test]
    fn invert_round_trips() {
        let mut t = ViewTransform::default();
        t.zoom_about(Pos2::new(40.0, 40.0), 3.0, (0.5, 5.0));
        t.pan(Vec2::new(-12.0, 7.0));
        let p = Pos2::new(123.0, -45.0);
        let back = t.invert(t.apply(p));
        assert!((back.x - p.x).abs() < 1e-3);
        assert!((back.y - p.y).abs() < 1e-3);
    }

    #[test]
    fn transform_composes_after_projection() {
        let projection = proj();
        let mut transform = ViewTransform::default();
        transform.pan(Vec2::new(10.0, -5.0));
        let base = projection.project(10.0, 10.0);
        let moved = transform.apply(base);
        assert_eq!(moved, Pos2::new(base.x + 10.0, base.y - 5.0));
    }

    #[test]
    fn atlas_centroids_resolve_by_name() {
        let json = r#"{"countries": [
            {"name": "Boxland", "rings": [[[0,0],[10,0],[10,10],[0,10]]]}
        ]}"#;
        let atlas = WorldAtlas::from_json(json).unwrap();
        let (cx, cy) = atlas.centroid("Boxland").unwrap();
        assert!((cx - 5.0).abs() < 1e-9);
        assert!((cy - 5.0).abs() < 1e-9);
        assert!(atlas.centroid("Atlantis").is_none());
    }

    #[test]
    fn point_in_ring_even_odd() {
        let ring = vec![
            Pos2::new(0.0, 0.0),
            Pos2::new(10.0, 0.0),
            Pos2::new(10.0, 10.0),
            Pos2::new(0.0, 10.0),
        ];
        assert!(point_in_ring(Pos2::new(5.0, 5.0), &ring));
        assert!(!point_in_ring(Pos2::new(15.0, 5.0), &ring));
        assert!(!point_in_ring(Pos2::new(-1.0, -1.0), &ring));
    }

    #[test]
    fn region_anchors_resolve_and_project() {
        let (lon, lat) = region_anchor("Middle East").unwrap();
        let p = world_projection(Rect::from_min_max(
            Pos2::ZERO,
            Pos2::new(800.0, 400.0),
        ))
        .project(lon, lat);
        assert!(p.x.is_finite() && p.y.is_finite());
        assert!(region_anchor("Atlantis").is_none());
    }

    #[test]
    fn empty_atlas_is_a_shape_error() {
        assert!(matches!(
            WorldAtlas::from_json(r#"{"countries": []}"#),
            Err(DataError::Shape { .. })
        ));
    }
}

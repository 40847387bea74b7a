pub mod brush;
pub mod crease;
pub mod drag;
pub mod flatten;
pub mod inflate;
pub mod paint;
pub mod pinch;
pub mod rotate;
pub mod scale;
pub mod smooth;

use glam::{Vec2, Vec3, Vec4};

use crate::history::commands::StrokeRecorder;
use crate::mesh::SculptMesh;
use crate::util::picking::{Hit, Ray};

/// Brush parameters driven by the UI, snapshotted per invocation.
#[derive(Clone, Copy)]
pub struct BrushParams {
    /// Brush radius in screen pixels; converted to world units per hit.
    pub radius_px: f32,
    /// 0..1 strength multiplier.
    pub intensity: f32,
    /// Carve instead of build for the displacement tools.
    pub invert: bool,
    /// Target color for the paint tool.
    pub color: Vec4,
}

impl Default for BrushParams {
    fn default() -> Self {
        Self {
            radius_px: 50.0,
            intensity: 0.75,
            invert: false,
            color: Vec4::new(0.85, 0.32, 0.25, 1.0),
        }
    }
}

/// One strategy invocation: one side (primary or mirrored) of one logical
/// stroke update.
pub struct StrokeSample<'a> {
    /// Fresh surface hit, absent when the tool forgoes re-picking.
    pub hit: Option<Hit>,
    /// The cursor ray — already reflected for the mirrored side.
    pub ray: Ray,
    pub cursor: Vec2,
    pub params: &'a BrushParams,
    /// Mirror plane (origin, unit normal) on the reflected application.
    pub mirror: Option<(Vec3, Vec3)>,
}

impl StrokeSample<'_> {
    /// Index of the symmetry side this sample belongs to, for tools that
    /// keep per-side working state.
    pub fn side(&self) -> usize {
        self.mirror.is_some() as usize
    }
}

/// One deformation behavior, long-lived for the session. `stroke_begin`
/// runs once per stroke side; `stroke_step` on every subsequent logical
/// update of that stroke. Implementations record first-touch state into
/// the recorder before mutating anything.
pub trait ToolStrategy {
    fn name(&self) -> &'static str;
    fn stroke_begin(
        &mut self,
        mesh: &mut SculptMesh,
        sample: &StrokeSample,
        rec: &mut StrokeRecorder,
    );
    fn stroke_step(
        &mut self,
        mesh: &mut SculptMesh,
        sample: &StrokeSample,
        rec: &mut StrokeRecorder,
    );
}

/// Smooth polynomial falloff: 1 at the brush center, 0 at the rim, flat
/// tangents at both ends.
pub fn falloff(dist: f32, radius: f32) -> f32 {
    if radius <= 0.0 {
        return 0.0;
    }
    let x = (dist / radius).clamp(0.0, 1.0);
    let x2 = x * x;
    3.0 * x2 * x2 - 4.0 * x2 * x + 1.0
}

/// Average vertex normal of the brushed area.
pub fn region_normal(mesh: &SculptMesh, verts: &[u32]) -> Vec3 {
    let mut acc = Vec3::ZERO;
    for &v in verts {
        acc += mesh.normal(v);
    }
    acc.normalize_or_zero()
}

/// Centroid of the brushed area.
pub fn region_center(mesh: &SculptMesh, verts: &[u32]) -> Vec3 {
    if verts.is_empty() {
        return Vec3::ZERO;
    }
    let mut acc = Vec3::ZERO;
    for &v in verts {
        acc += mesh.position(v);
    }
    acc / verts.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falloff_is_one_at_center_zero_at_rim() {
        assert!((falloff(0.0, 2.0) - 1.0).abs() < 1e-6);
        assert!(falloff(2.0, 2.0).abs() < 1e-6);
        assert!(falloff(5.0, 2.0).abs() < 1e-6);
        let mid = falloff(1.0, 2.0);
        assert!(mid > 0.0 && mid < 1.0);
    }

    #[test]
    fn falloff_of_degenerate_radius_is_zero() {
        assert_eq!(falloff(1.0, 0.0), 0.0);
    }
}

use super::{StrokeSample, ToolStrategy, falloff, region_normal};
use crate::history::commands::StrokeRecorder;
use crate::mesh::SculptMesh;

const CREASE_PINCH: f32 = 0.25;
const CREASE_DIG: f32 = 0.03;

/// Crease: pinch toward the stroke center combined with a carve along the
/// surface normal, cutting a sharp valley (or ridge when inverted).
#[derive(Default)]
pub struct CreaseTool;

impl ToolStrategy for CreaseTool {
    fn name(&self) -> &'static str {
        "Crease"
    }

    fn stroke_begin(
        &mut self,
        mesh: &mut SculptMesh,
        sample: &StrokeSample,
        rec: &mut StrokeRecorder,
    ) {
        self.stroke_step(mesh, sample, rec);
    }

    fn stroke_step(
        &mut self,
        mesh: &mut SculptMesh,
        sample: &StrokeSample,
        rec: &mut StrokeRecorder,
    ) {
        let Some(hit) = sample.hit else { return };
        let verts = mesh.vertices_within(hit.position, hit.radius);
        if verts.is_empty() {
            return;
        }
        rec.capture(mesh, &verts);

        let normal = region_normal(mesh, &verts);
        let dig = if sample.params.invert { normal } else { -normal };
        let intensity = sample.params.intensity;
        let dig_step = hit.radius * intensity * CREASE_DIG;
        for &v in &verts {
            let p = mesh.position(v);
            let w = falloff(p.distance(hit.position), hit.radius);
            if w > 0.0 {
                let gather = (hit.position - p) * (w * intensity * CREASE_PINCH);
                // Squared falloff keeps the cut narrow relative to the pinch.
                mesh.displace(v, gather + dig * (w * w * dig_step));
            }
        }
    }
}

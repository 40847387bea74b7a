use super::{StrokeSample, ToolStrategy, falloff};
use crate::history::commands::StrokeRecorder;
use crate::mesh::SculptMesh;

const PINCH_STEP: f32 = 0.25;

/// Pinch: gathers vertices toward the brush center, sharpening detail.
#[derive(Default)]
pub struct PinchTool;

impl ToolStrategy for PinchTool {
    fn name(&self) -> &'static str {
        "Pinch"
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

        let strength = sample.params.intensity * PINCH_STEP;
        for &v in &verts {
            let p = mesh.position(v);
            let w = falloff(p.distance(hit.position), hit.radius);
            if w > 0.0 {
                mesh.displace(v, (hit.position - p) * (w * strength));
            }
        }
    }
}

use super::{StrokeSample, ToolStrategy, falloff};
use crate::history::commands::StrokeRecorder;
use crate::mesh::SculptMesh;

const INFLATE_STEP: f32 = 0.04;

/// Inflate: every vertex moves along its own normal, ballooning the
/// surface rather than raising it as a slab.
#[derive(Default)]
pub struct InflateTool;

impl ToolStrategy for InflateTool {
    fn name(&self) -> &'static str {
        "Inflate"
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

        let sign = if sample.params.invert { -1.0 } else { 1.0 };
        let step = hit.radius * sample.params.intensity * INFLATE_STEP * sign;
        for &v in &verts {
            let w = falloff(mesh.position(v).distance(hit.position), hit.radius);
            if w > 0.0 {
                let n = mesh.normal(v);
                mesh.displace(v, n * (w * step));
            }
        }
    }
}

use super::{StrokeSample, ToolStrategy, falloff};
use crate::history::commands::StrokeRecorder;
use crate::mesh::SculptMesh;

/// Paint: blends vertex colors toward the active color with the brush
/// falloff. Geometry is untouched.
#[derive(Default)]
pub struct PaintTool;

impl ToolStrategy for PaintTool {
    fn name(&self) -> &'static str {
        "Paint"
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

        let target = sample.params.color;
        for &v in &verts {
            let w = falloff(mesh.position(v).distance(hit.position), hit.radius)
                * sample.params.intensity;
            if w > 0.0 {
                let c = mesh.color(v);
                mesh.set_color(v, c.lerp(target, w.min(1.0)));
            }
        }
    }
}

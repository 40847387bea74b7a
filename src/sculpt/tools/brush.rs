use super::{StrokeSample, ToolStrategy, falloff, region_normal};
use crate::history::commands::StrokeRecorder;
use crate::mesh::SculptMesh;

const BRUSH_STEP: f32 = 0.05;

/// Standard sculpt brush: pushes the brushed area along its average
/// normal, building material up (or carving it out when inverted).
#[derive(Default)]
pub struct BrushTool;

impl ToolStrategy for BrushTool {
    fn name(&self) -> &'static str {
        "Brush"
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
        let dir = if sample.params.invert { -normal } else { normal };
        let step = hit.radius * sample.params.intensity * BRUSH_STEP;
        for &v in &verts {
            let w = falloff(mesh.position(v).distance(hit.position), hit.radius);
            if w > 0.0 {
                mesh.displace(v, dir * (w * step));
            }
        }
    }
}

use super::{StrokeSample, ToolStrategy, falloff, region_center, region_normal};
use crate::history::commands::StrokeRecorder;
use crate::mesh::SculptMesh;

/// Flatten: presses the brushed area onto its own fitted plane.
#[derive(Default)]
pub struct FlattenTool;

impl ToolStrategy for FlattenTool {
    fn name(&self) -> &'static str {
        "Flatten"
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

        let center = region_center(mesh, &verts);
        let normal = region_normal(mesh, &verts);
        if normal.length_squared() < 1e-6 {
            return;
        }
        for &v in &verts {
            let p = mesh.position(v);
            let height = (p - center).dot(normal);
            let w = falloff(p.distance(hit.position), hit.radius) * sample.params.intensity;
            if w > 0.0 {
                mesh.displace(v, normal * (-height * w));
            }
        }
    }
}

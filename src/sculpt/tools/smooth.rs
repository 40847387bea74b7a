use glam::Vec3;

use super::{StrokeSample, ToolStrategy, falloff};
use crate::history::commands::StrokeRecorder;
use crate::mesh::SculptMesh;

/// Smooth: Laplacian relaxation, pulling each vertex toward the average
/// of its ring neighbors.
#[derive(Default)]
pub struct SmoothTool;

impl ToolStrategy for SmoothTool {
    fn name(&self) -> &'static str {
        "Smooth"
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

        // Targets first, writes second: relaxing in place would bias the
        // average toward already-moved neighbors.
        let mut targets: Vec<(u32, Vec3)> = Vec::with_capacity(verts.len());
        for &v in &verts {
            let ring = mesh.ring(v);
            if ring.is_empty() {
                continue;
            }
            let mut avg = Vec3::ZERO;
            for &n in ring {
                avg += mesh.position(n);
            }
            avg /= ring.len() as f32;
            let w = falloff(mesh.position(v).distance(hit.position), hit.radius)
                * sample.params.intensity;
            if w > 0.0 {
                targets.push((v, mesh.position(v).lerp(avg, w)));
            }
        }
        for (v, p) in targets {
            mesh.set_position(v, p);
        }
    }
}

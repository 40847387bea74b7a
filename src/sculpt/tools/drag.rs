use glam::Vec3;

use super::{StrokeSample, ToolStrategy};
use crate::history::commands::StrokeRecorder;
use crate::mesh::SculptMesh;

struct DragState {
    verts: Vec<u32>,
    plane_point: Vec3,
    plane_normal: Vec3,
    last_point: Vec3,
}

/// Drag: grabs the vertices under the initial hit and carries them with
/// the cursor across the screen-parallel plane through the grab point.
/// No re-picking happens while the grab is live.
#[derive(Default)]
pub struct DragTool {
    // One grab per symmetry side.
    sides: [Option<DragState>; 2],
}

impl ToolStrategy for DragTool {
    fn name(&self) -> &'static str {
        "Drag"
    }

    fn stroke_begin(
        &mut self,
        mesh: &mut SculptMesh,
        sample: &StrokeSample,
        rec: &mut StrokeRecorder,
    ) {
        let side = sample.side();
        self.sides[side] = None;
        let Some(hit) = sample.hit else { return };
        let verts = mesh.vertices_within(hit.position, hit.radius);
        if verts.is_empty() {
            return;
        }
        rec.capture(mesh, &verts);
        self.sides[side] = Some(DragState {
            verts,
            plane_point: hit.position,
            // The mirrored sample carries the reflected ray, so this plane
            // mirrors along with it.
            plane_normal: -sample.ray.direction,
            last_point: hit.position,
        });
    }

    fn stroke_step(
        &mut self,
        mesh: &mut SculptMesh,
        sample: &StrokeSample,
        rec: &mut StrokeRecorder,
    ) {
        let Some(state) = &mut self.sides[sample.side()] else {
            return;
        };
        let Some(t) = sample
            .ray
            .intersect_plane(state.plane_point, state.plane_normal)
        else {
            return;
        };
        let point = sample.ray.point_at(t);
        let delta = point - state.last_point;
        if delta.length_squared() < 1e-12 {
            return;
        }
        rec.capture(mesh, &state.verts);
        for &v in &state.verts {
            mesh.displace(v, delta);
        }
        state.last_point = point;
    }
}

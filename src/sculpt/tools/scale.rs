use glam::Vec3;

use super::{StrokeSample, ToolStrategy};
use crate::history::commands::StrokeRecorder;
use crate::mesh::SculptMesh;

const SCALE_SPEED: f32 = 0.005;

struct ScaleState {
    verts: Vec<u32>,
    center: Vec3,
    last_x: f32,
}

/// Scale: grows or shrinks the grabbed region radially about the grab
/// point, driven by horizontal cursor travel.
#[derive(Default)]
pub struct ScaleTool {
    sides: [Option<ScaleState>; 2],
}

impl ToolStrategy for ScaleTool {
    fn name(&self) -> &'static str {
        "Scale"
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
        self.sides[side] = Some(ScaleState {
            verts,
            center: hit.position,
            last_x: sample.cursor.x,
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
        let travel = sample.cursor.x - state.last_x;
        if travel.abs() < 1e-6 {
            return;
        }
        // Scaling is reflection-invariant; both sides share the factor.
        let factor = (1.0 + travel * SCALE_SPEED).clamp(0.5, 2.0);
        rec.capture(mesh, &state.verts);
        for &v in &state.verts {
            let p = mesh.position(v);
            mesh.set_position(v, state.center + (p - state.center) * factor);
        }
        state.last_x = sample.cursor.x;
    }
}

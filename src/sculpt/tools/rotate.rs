use glam::{Quat, Vec3};

use super::{StrokeSample, ToolStrategy};
use crate::history::commands::StrokeRecorder;
use crate::mesh::SculptMesh;

const ROTATE_SPEED: f32 = 0.01;

struct RotateState {
    verts: Vec<u32>,
    center: Vec3,
    axis: Vec3,
    last_x: f32,
    /// -1 on the mirrored side: reflection flips rotation handedness.
    sign: f32,
}

/// Rotate: twists the grabbed region around the view axis, driven by
/// horizontal cursor travel.
#[derive(Default)]
pub struct RotateTool {
    sides: [Option<RotateState>; 2],
}

impl ToolStrategy for RotateTool {
    fn name(&self) -> &'static str {
        "Rotate"
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
        self.sides[side] = Some(RotateState {
            verts,
            center: hit.position,
            axis: sample.ray.direction.normalize_or_zero(),
            last_x: sample.cursor.x,
            sign: if sample.mirror.is_some() { -1.0 } else { 1.0 },
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
        let angle = (sample.cursor.x - state.last_x) * ROTATE_SPEED * state.sign;
        if angle.abs() < 1e-6 {
            return;
        }
        rec.capture(mesh, &state.verts);
        let rotation = Quat::from_axis_angle(state.axis, angle);
        for &v in &state.verts {
            let p = mesh.position(v);
            mesh.set_position(v, state.center + rotation * (p - state.center));
        }
        state.last_x = sample.cursor.x;
    }
}

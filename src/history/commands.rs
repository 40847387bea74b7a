use std::collections::HashMap;

use glam::{Vec3, Vec4};

use super::Command;
use crate::mesh::SculptMesh;

/// One committed stroke: positions and colors of every vertex it touched,
/// before and after. A symmetric stroke records both sides here, so undo
/// reverts them as a unit.
pub struct StrokeEdit {
    verts: Vec<u32>,
    old_positions: Vec<Vec3>,
    new_positions: Vec<Vec3>,
    old_colors: Vec<Vec4>,
    new_colors: Vec<Vec4>,
    label: &'static str,
}

impl Command for StrokeEdit {
    fn apply(&mut self, mesh: &mut SculptMesh) {
        for (i, &v) in self.verts.iter().enumerate() {
            mesh.set_position(v, self.new_positions[i]);
            mesh.set_color(v, self.new_colors[i]);
        }
        mesh.reconcile();
    }

    fn undo(&mut self, mesh: &mut SculptMesh) {
        for (i, &v) in self.verts.iter().enumerate() {
            mesh.set_position(v, self.old_positions[i]);
            mesh.set_color(v, self.old_colors[i]);
        }
        mesh.reconcile();
    }

    fn description(&self) -> &str {
        self.label
    }
}

/// Accumulates first-touch vertex state over one stroke. Every strategy
/// invocation (primary and mirrored alike) funnels through the same
/// recorder, which is what makes a symmetric stroke a single undo step.
#[derive(Default)]
pub struct StrokeRecorder {
    touched: HashMap<u32, (Vec3, Vec4)>,
}

impl StrokeRecorder {
    /// Remember the current state of `verts` unless already captured
    /// earlier in the stroke.
    pub fn capture(&mut self, mesh: &SculptMesh, verts: &[u32]) {
        for &v in verts {
            self.touched
                .entry(v)
                .or_insert_with(|| (mesh.position(v), mesh.color(v)));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.touched.is_empty()
    }

    /// Freeze into a command: old values from the capture, new values from
    /// the mesh as it stands now. None when nothing was touched.
    pub fn into_command(self, mesh: &SculptMesh, label: &'static str) -> Option<StrokeEdit> {
        if self.touched.is_empty() {
            return None;
        }
        let mut verts: Vec<u32> = self.touched.keys().copied().collect();
        verts.sort_unstable();

        let mut old_positions = Vec::with_capacity(verts.len());
        let mut old_colors = Vec::with_capacity(verts.len());
        let mut new_positions = Vec::with_capacity(verts.len());
        let mut new_colors = Vec::with_capacity(verts.len());
        for &v in &verts {
            let (pos, col) = self.touched[&v];
            old_positions.push(pos);
            old_colors.push(col);
            new_positions.push(mesh.position(v));
            new_colors.push(mesh.color(v));
        }

        Some(StrokeEdit {
            verts,
            old_positions,
            new_positions,
            old_colors,
            new_colors,
            label,
        })
    }
}

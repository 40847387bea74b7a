pub mod commands;

use crate::mesh::SculptMesh;

/// Undo/redo history using the command pattern. Commands mutate the
/// active mesh only; GPU invalidation rides on the mesh revisions.
pub struct History {
    undo_stack: Vec<Box<dyn Command>>,
    redo_stack: Vec<Box<dyn Command>>,
    max_depth: usize,
    /// Set to true on push/undo/redo, cleared by `mark_saved()`.
    pub dirty: bool,
}

pub trait Command {
    fn apply(&mut self, mesh: &mut SculptMesh);
    fn undo(&mut self, mesh: &mut SculptMesh);
    fn description(&self) -> &str;
}

impl History {
    pub fn new() -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_depth: 100,
            dirty: false,
        }
    }

    pub fn push(&mut self, mut cmd: Box<dyn Command>, mesh: &mut SculptMesh) {
        cmd.apply(mesh);
        self.undo_stack.push(cmd);
        self.redo_stack.clear();
        if self.undo_stack.len() > self.max_depth {
            self.undo_stack.remove(0);
        }
        self.dirty = true;
    }

    pub fn undo(&mut self, mesh: &mut SculptMesh) {
        if let Some(mut cmd) = self.undo_stack.pop() {
            cmd.undo(mesh);
            self.redo_stack.push(cmd);
            self.dirty = true;
        }
    }

    pub fn redo(&mut self, mesh: &mut SculptMesh) {
        if let Some(mut cmd) = self.redo_stack.pop() {
            cmd.apply(mesh);
            self.undo_stack.push(cmd);
            self.dirty = true;
        }
    }

    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    /// Drop everything; every mesh load starts from a clean history.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::commands::StrokeRecorder;
    use super::*;
    use crate::mesh::BaseMesh;
    use glam::Vec3;

    fn triangle_mesh() -> SculptMesh {
        let mut base = BaseMesh::new();
        base.positions = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        base.triangles = vec![[0, 1, 2]];
        let mut mesh = SculptMesh::new(base);
        mesh.init();
        mesh
    }

    #[test]
    fn undo_restores_recorded_positions() {
        let mut mesh = triangle_mesh();
        let mut history = History::new();

        let mut rec = StrokeRecorder::default();
        rec.capture(&mesh, &[0]);
        mesh.displace(0, Vec3::new(0.0, 0.0, 1.0));
        mesh.commit_update();
        let cmd = rec.into_command(&mesh, "brush").unwrap();
        history.push(Box::new(cmd), &mut mesh);

        assert!(history.can_undo());
        assert!(history.dirty);
        history.undo(&mut mesh);
        assert!(mesh.position(0).abs_diff_eq(Vec3::ZERO, 1e-6));
        history.redo(&mut mesh);
        assert!(mesh.position(0).abs_diff_eq(Vec3::new(0.0, 0.0, 1.0), 1e-6));
    }

    #[test]
    fn clear_resets_both_stacks_and_dirty() {
        let mut mesh = triangle_mesh();
        let mut history = History::new();
        let mut rec = StrokeRecorder::default();
        rec.capture(&mesh, &[1]);
        mesh.displace(1, Vec3::Y);
        let cmd = rec.into_command(&mesh, "brush").unwrap();
        history.push(Box::new(cmd), &mut mesh);
        history.undo(&mut mesh);

        history.clear();
        assert!(!history.can_undo());
        assert!(!history.can_redo());
        assert!(!history.dirty);
    }
}

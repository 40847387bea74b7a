use std::collections::HashSet;

use glam::{Vec3, Vec4};

/// Flat triangle-mesh storage: shared vertices, indexed faces.
#[derive(Default)]
pub struct BaseMesh {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub colors: Vec<Vec4>,
    pub triangles: Vec<[u32; 3]>,
    /// Neighbor vertices per vertex. Built by `init_topology`.
    rings: Vec<Vec<u32>>,
    /// Triangles adjacent to each vertex. Built by `init_topology`.
    vert_tris: Vec<Vec<u32>>,
}

impl BaseMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Build adjacency (vertex rings, vertex→triangle lists) and fill
    /// per-vertex defaults for attributes the importer did not provide.
    pub fn init_topology(&mut self) {
        let n = self.positions.len();
        if self.colors.len() != n {
            self.colors = vec![Vec4::ONE; n];
        }

        self.vert_tris = vec![Vec::new(); n];
        let mut ring_sets: Vec<HashSet<u32>> = vec![HashSet::new(); n];
        for (ti, tri) in self.triangles.iter().enumerate() {
            for k in 0..3 {
                let v = tri[k] as usize;
                self.vert_tris[v].push(ti as u32);
                ring_sets[v].insert(tri[(k + 1) % 3]);
                ring_sets[v].insert(tri[(k + 2) % 3]);
            }
        }
        self.rings = ring_sets
            .into_iter()
            .map(|s| {
                let mut r: Vec<u32> = s.into_iter().collect();
                r.sort_unstable();
                r
            })
            .collect();

        self.compute_all_normals();
    }

    pub fn ring(&self, v: u32) -> &[u32] {
        &self.rings[v as usize]
    }

    fn triangle_normal(&self, ti: u32) -> Vec3 {
        let [a, b, c] = self.triangles[ti as usize];
        let pa = self.positions[a as usize];
        let pb = self.positions[b as usize];
        let pc = self.positions[c as usize];
        // Area-weighted: the cross product magnitude carries the weight.
        (pb - pa).cross(pc - pa)
    }

    /// Recompute every vertex normal from scratch.
    pub fn compute_all_normals(&mut self) {
        let n = self.positions.len();
        self.normals = vec![Vec3::ZERO; n];
        for ti in 0..self.triangles.len() {
            let fnorm = self.triangle_normal(ti as u32);
            for &v in &self.triangles[ti] {
                self.normals[v as usize] += fnorm;
            }
        }
        for nrm in &mut self.normals {
            *nrm = nrm.normalize_or_zero();
        }
    }

    /// Recompute normals for the given vertices only, from their adjacent
    /// triangles. Requires `init_topology` to have run.
    pub fn refresh_normals(&mut self, verts: &[u32]) {
        for &v in verts {
            let mut acc = Vec3::ZERO;
            for &ti in &self.vert_tris[v as usize] {
                acc += self.triangle_normal(ti);
            }
            self.normals[v as usize] = acc.normalize_or_zero();
        }
    }

    /// Axis-aligned bounds, or None for an empty mesh.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let first = *self.positions.first()?;
        let mut min = first;
        let mut max = first;
        for &p in &self.positions[1..] {
            min = min.min(p);
            max = max.max(p);
        }
        Some((min, max))
    }
}

/// The sculptable mesh: wraps a `BaseMesh` with change tracking and the
/// deferred-work set that is flushed when a stroke commits.
///
/// Revision counters are per-mesh and start at zero for every freshly
/// constructed instance, so GPU caches keyed on (scene generation,
/// revision) can never confuse a new mesh with its predecessor.
pub struct SculptMesh {
    base: BaseMesh,
    dirty: HashSet<u32>,
    geometry_rev: u64,
    color_rev: u64,
    topology_rev: u64,
}

impl SculptMesh {
    pub fn new(base: BaseMesh) -> Self {
        Self {
            base,
            dirty: HashSet::new(),
            geometry_rev: 0,
            color_rev: 0,
            topology_rev: 0,
        }
    }

    /// Finish construction after import: build topology and mark the
    /// render-facing state stale.
    pub fn init(&mut self) {
        self.base.init_topology();
        self.topology_rev += 1;
        self.geometry_rev += 1;
        self.color_rev += 1;
    }

    pub fn base(&self) -> &BaseMesh {
        &self.base
    }

    pub fn vertex_count(&self) -> usize {
        self.base.vertex_count()
    }

    pub fn triangle_count(&self) -> usize {
        self.base.triangle_count()
    }

    pub fn position(&self, v: u32) -> Vec3 {
        self.base.positions[v as usize]
    }

    pub fn normal(&self, v: u32) -> Vec3 {
        self.base.normals[v as usize]
    }

    pub fn color(&self, v: u32) -> Vec4 {
        self.base.colors[v as usize]
    }

    pub fn ring(&self, v: u32) -> &[u32] {
        self.base.ring(v)
    }

    /// All vertices within `radius` of `center`. Linear scan.
    pub fn vertices_within(&self, center: Vec3, radius: f32) -> Vec<u32> {
        let r2 = radius * radius;
        self.base
            .positions
            .iter()
            .enumerate()
            .filter(|(_, p)| p.distance_squared(center) <= r2)
            .map(|(i, _)| i as u32)
            .collect()
    }

    pub fn set_position(&mut self, v: u32, p: Vec3) {
        self.base.positions[v as usize] = p;
        self.dirty.insert(v);
    }

    pub fn displace(&mut self, v: u32, delta: Vec3) {
        self.base.positions[v as usize] += delta;
        self.dirty.insert(v);
    }

    pub fn set_color(&mut self, v: u32, c: Vec4) {
        self.base.colors[v as usize] = c;
        self.color_rev += 1;
    }

    /// Refresh normals around the vertices touched since the last commit
    /// and advance the geometry revision. Called once per logical stroke
    /// update, after both symmetric applications.
    pub fn commit_update(&mut self) {
        if self.dirty.is_empty() {
            return;
        }
        // Normals of a moved vertex depend on its ring; refresh both.
        let mut affected: HashSet<u32> = self.dirty.iter().copied().collect();
        for &v in &self.dirty {
            affected.extend(self.base.ring(v).iter().copied());
        }
        let verts: Vec<u32> = affected.into_iter().collect();
        self.base.refresh_normals(&verts);
        self.geometry_rev += 1;
    }

    /// Flush deferred structural work at stroke end: a full normal pass
    /// over the mesh and a clean dirty set.
    pub fn reconcile(&mut self) {
        if self.dirty.is_empty() {
            return;
        }
        self.base.compute_all_normals();
        self.dirty.clear();
        self.geometry_rev += 1;
    }

    pub fn geometry_rev(&self) -> u64 {
        self.geometry_rev
    }

    pub fn color_rev(&self) -> u64 {
        self.color_rev
    }

    pub fn topology_rev(&self) -> u64 {
        self.topology_rev
    }

    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        self.base.bounds()
    }

    /// Center and bounding radius, for camera framing.
    pub fn framing_sphere(&self) -> Option<(Vec3, f32)> {
        let (min, max) = self.bounds()?;
        let center = (min + max) * 0.5;
        Some((center, (max - center).length().max(1e-3)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_mesh() -> BaseMesh {
        // Two triangles in the XY plane sharing an edge.
        let mut mesh = BaseMesh::new();
        mesh.positions = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        mesh.triangles = vec![[0, 1, 2], [0, 2, 3]];
        mesh
    }

    #[test]
    fn topology_builds_rings_and_normals() {
        let mut mesh = quad_mesh();
        mesh.init_topology();
        // Vertex 0 and 2 sit on both triangles: three neighbors each.
        assert_eq!(mesh.ring(0), &[1, 2, 3]);
        assert_eq!(mesh.ring(1), &[0, 2]);
        for v in 0..4 {
            assert!(mesh.normals[v].abs_diff_eq(Vec3::Z, 1e-5));
        }
    }

    #[test]
    fn commit_refreshes_touched_normals_and_bumps_revision() {
        let mut mesh = SculptMesh::new(quad_mesh());
        mesh.init();
        let rev = mesh.geometry_rev();
        mesh.displace(1, Vec3::new(0.0, 0.0, 0.5));
        mesh.commit_update();
        assert_eq!(mesh.geometry_rev(), rev + 1);
        // The moved vertex tilted its adjacent face; its normal left +Z.
        assert!(mesh.normal(1).dot(Vec3::Z) < 0.9999);
        // Second commit with nothing new touched is a no-op revision-wise.
        mesh.reconcile();
        mesh.commit_update();
        assert_eq!(mesh.geometry_rev(), rev + 2);
    }

    #[test]
    fn fresh_mesh_starts_at_revision_zero() {
        let mesh = SculptMesh::new(BaseMesh::new());
        assert_eq!(mesh.geometry_rev(), 0);
        assert_eq!(mesh.color_rev(), 0);
        assert_eq!(mesh.topology_rev(), 0);
    }

    #[test]
    fn vertices_within_selects_by_distance() {
        let mut mesh = SculptMesh::new(quad_mesh());
        mesh.init();
        let hits = mesh.vertices_within(Vec3::ZERO, 1.1);
        assert_eq!(hits, vec![0, 1, 3]);
    }
}

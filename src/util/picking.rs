use glam::{Mat4, Vec2, Vec3, Vec4Swizzles};

use crate::mesh::SculptMesh;

/// A ray in 3D space with origin and direction.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

/// Result of a ray hitting the sculptable surface.
#[derive(Debug, Clone, Copy)]
pub struct Hit {
    pub position: Vec3,
    pub normal: Vec3,
    pub distance: f32,
    pub triangle: u32,
    /// World-space brush radius at the hit depth.
    pub radius: f32,
}

impl Ray {
    /// Create a ray from screen coordinates (pixels) through the camera.
    /// `screen_pos` is in pixels from top-left, `screen_size` is viewport width/height.
    pub fn from_screen(screen_pos: Vec2, screen_size: Vec2, view_proj: Mat4) -> Self {
        // Convert screen coords to NDC (-1..1)
        let ndc_x = (2.0 * screen_pos.x / screen_size.x) - 1.0;
        let ndc_y = 1.0 - (2.0 * screen_pos.y / screen_size.y); // Y is flipped

        let inv_vp = view_proj.inverse();

        let near_point = inv_vp.project_point3(Vec3::new(ndc_x, ndc_y, -1.0));
        let far_point = inv_vp.project_point3(Vec3::new(ndc_x, ndc_y, 1.0));

        let direction = (far_point - near_point).normalize();

        Self {
            origin: near_point,
            direction,
        }
    }

    /// Reflect the ray through a plane (point + unit normal). Mirrored
    /// strokes intersect this ray instead of the primary one.
    pub fn reflect(&self, plane_point: Vec3, plane_normal: Vec3) -> Self {
        Self {
            origin: reflect_point(self.origin, plane_point, plane_normal),
            direction: reflect_vector(self.direction, plane_normal),
        }
    }

    /// Intersect ray with a triangle (Möller–Trumbore algorithm).
    /// Returns distance along ray if hit, None if miss.
    pub fn intersect_triangle(&self, v0: Vec3, v1: Vec3, v2: Vec3) -> Option<f32> {
        let edge1 = v1 - v0;
        let edge2 = v2 - v0;
        let h = self.direction.cross(edge2);
        let a = edge1.dot(h);

        if a.abs() < 1e-7 {
            return None; // Parallel to triangle
        }

        let f = 1.0 / a;
        let s = self.origin - v0;
        let u = f * s.dot(h);

        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(edge1);
        let v = f * self.direction.dot(q);

        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = f * edge2.dot(q);
        if t > 1e-7 { Some(t) } else { None }
    }

    /// Intersect ray with an infinite plane defined by a point and normal.
    /// Returns distance along ray if hit, None if parallel.
    pub fn intersect_plane(&self, plane_point: Vec3, plane_normal: Vec3) -> Option<f32> {
        let denom = plane_normal.dot(self.direction);
        if denom.abs() < 1e-7 {
            return None;
        }
        let t = (plane_point - self.origin).dot(plane_normal) / denom;
        if t > 0.0 { Some(t) } else { None }
    }

    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

pub fn reflect_point(p: Vec3, plane_point: Vec3, plane_normal: Vec3) -> Vec3 {
    p - 2.0 * (p - plane_point).dot(plane_normal) * plane_normal
}

pub fn reflect_vector(v: Vec3, plane_normal: Vec3) -> Vec3 {
    v - 2.0 * v.dot(plane_normal) * plane_normal
}

/// Project a 3D point to 2D screen coordinates.
/// Returns None if the point is behind the camera.
pub fn project_to_screen(pos: Vec3, view_proj: Mat4, screen_size: Vec2) -> Option<Vec2> {
    let clip = view_proj * pos.extend(1.0);
    if clip.w <= 0.0 {
        return None;
    }
    let ndc = clip.xyz() / clip.w;
    Some(Vec2::new(
        (ndc.x + 1.0) * 0.5 * screen_size.x,
        (1.0 - ndc.y) * 0.5 * screen_size.y,
    ))
}

/// Closest triangle of the active mesh hit by the ray. The `radius` field
/// of the returned hit is zero; the caller sizes the brush afterwards.
pub fn pick_mesh(ray: &Ray, mesh: &SculptMesh) -> Option<Hit> {
    let base = mesh.base();
    let mut closest: Option<Hit> = None;

    for (ti, tri) in base.triangles.iter().enumerate() {
        let v0 = base.positions[tri[0] as usize];
        let v1 = base.positions[tri[1] as usize];
        let v2 = base.positions[tri[2] as usize];
        if let Some(t) = ray.intersect_triangle(v0, v1, v2) {
            let dominated = closest.as_ref().is_some_and(|c| c.distance <= t);
            if !dominated {
                closest = Some(Hit {
                    position: ray.point_at(t),
                    normal: (v1 - v0).cross(v2 - v0).normalize_or_zero(),
                    distance: t,
                    triangle: ti as u32,
                    radius: 0.0,
                });
            }
        }
    }

    closest
}

/// Convert a screen-space brush radius (pixels) to world units at the hit
/// depth: cast a second ray one radius to the right of the cursor and
/// intersect it with the screen-parallel plane through the hit point.
pub fn world_radius_at(
    hit_position: Vec3,
    cursor: Vec2,
    radius_px: f32,
    screen_size: Vec2,
    view_proj: Mat4,
) -> f32 {
    let center = Ray::from_screen(cursor, screen_size, view_proj);
    let edge = Ray::from_screen(
        Vec2::new(cursor.x + radius_px, cursor.y),
        screen_size,
        view_proj,
    );
    if let Some(t) = edge.intersect_plane(hit_position, -center.direction) {
        (edge.point_at(t) - hit_position).length()
    } else {
        // Degenerate projection; fall back to a depth-proportional size.
        (hit_position - center.origin).length() * radius_px / screen_size.y.max(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{BaseMesh, SculptMesh};

    #[test]
    fn ray_hits_facing_triangle() {
        let ray = Ray {
            origin: Vec3::new(0.2, 0.2, 5.0),
            direction: Vec3::NEG_Z,
        };
        let t = ray
            .intersect_triangle(
                Vec3::new(-1.0, -1.0, 0.0),
                Vec3::new(2.0, -1.0, 0.0),
                Vec3::new(0.0, 2.0, 0.0),
            )
            .expect("ray through the triangle interior must hit");
        assert!((t - 5.0).abs() < 1e-4);
    }

    #[test]
    fn ray_misses_outside_triangle() {
        let ray = Ray {
            origin: Vec3::new(5.0, 5.0, 5.0),
            direction: Vec3::NEG_Z,
        };
        assert!(
            ray.intersect_triangle(
                Vec3::new(-1.0, -1.0, 0.0),
                Vec3::new(1.0, -1.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            )
            .is_none()
        );
    }

    #[test]
    fn reflected_ray_mirrors_origin_and_direction() {
        let ray = Ray {
            origin: Vec3::new(2.0, 0.0, 5.0),
            direction: Vec3::NEG_Z,
        };
        let mirrored = ray.reflect(Vec3::ZERO, Vec3::X);
        assert!(mirrored.origin.abs_diff_eq(Vec3::new(-2.0, 0.0, 5.0), 1e-6));
        assert!(mirrored.direction.abs_diff_eq(Vec3::NEG_Z, 1e-6));
    }

    #[test]
    fn pick_returns_closest_hit() {
        let mut base = BaseMesh::new();
        base.positions = vec![
            // Near triangle at z = 1
            Vec3::new(-1.0, -1.0, 1.0),
            Vec3::new(1.0, -1.0, 1.0),
            Vec3::new(0.0, 1.0, 1.0),
            // Far triangle at z = -1
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(1.0, -1.0, -1.0),
            Vec3::new(0.0, 1.0, -1.0),
        ];
        base.triangles = vec![[0, 1, 2], [3, 4, 5]];
        let mut mesh = SculptMesh::new(base);
        mesh.init();

        let ray = Ray {
            origin: Vec3::new(0.0, 0.0, 5.0),
            direction: Vec3::NEG_Z,
        };
        let hit = pick_mesh(&ray, &mesh).expect("must hit the near triangle");
        assert_eq!(hit.triangle, 0);
        assert!((hit.distance - 4.0).abs() < 1e-4);
    }
}

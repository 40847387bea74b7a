use std::sync::mpsc::Receiver;

use glam::Vec2;

use crate::history::History;
use crate::io::assets::{self, AssetEvent, MatcapImage};
use crate::io::{MeshFormat, detect_format, import_mesh};
use crate::mesh::{BaseMesh, SculptMesh};
use crate::render::camera::Camera;
use crate::util::picking::{self, Hit, Ray};

/// Decoded background image shown behind the mesh. The revision lets the
/// renderer re-upload only when the image actually changes.
pub struct BackgroundImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
    pub revision: u64,
}

/// The renderable world and its load pipeline. Owns the camera, the
/// single active-mesh slot, and the cached default payload fetched in the
/// background at startup.
pub struct Scene {
    pub camera: Camera,
    mesh: Option<SculptMesh>,
    /// Bumped on every successful load; retires all prior mesh epochs.
    generation: u64,
    background: Option<BackgroundImage>,
    background_revs: u64,
    default_payload: Option<(Vec<u8>, MeshFormat)>,
    assets: Receiver<AssetEvent>,
    status: Option<String>,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            camera: Camera::new(),
            mesh: None,
            generation: 0,
            background: None,
            background_revs: 0,
            default_payload: None,
            assets: assets::spawn_loader(),
            status: None,
        }
    }

    pub fn active_mesh(&self) -> Option<&SculptMesh> {
        self.mesh.as_ref()
    }

    pub fn active_mesh_mut(&mut self) -> Option<&mut SculptMesh> {
        self.mesh.as_mut()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn background(&self) -> Option<&BackgroundImage> {
        self.background.as_ref()
    }

    /// One-shot UI notification from the load pipeline.
    pub fn take_status(&mut self) -> Option<String> {
        self.status.take()
    }

    /// Drain the startup asset channel: cache the default payload (loading
    /// it if nothing was ever loaded) and hand decoded matcaps to the
    /// caller for GPU upload.
    pub fn poll_assets(&mut self, history: &mut History) -> Vec<MatcapImage> {
        let mut matcaps = Vec::new();
        while let Ok(event) = self.assets.try_recv() {
            match event {
                AssetEvent::Matcap(img) => matcaps.push(img),
                AssetEvent::DefaultMesh { data, format } => {
                    self.default_payload = Some((data, format));
                    if self.generation == 0 && self.mesh.is_none() {
                        if let Err(e) = self.load_scene(None, None, history) {
                            log::error!("default mesh failed to load: {e}");
                        }
                    }
                }
            }
        }
        matcaps
    }

    /// Route a user file selection by extension. Unsupported extensions
    /// are ignored outright; a parse failure becomes a status message and
    /// the previous mesh stays active.
    pub fn load_file(&mut self, data: &[u8], filename: &str, history: &mut History) {
        let Some(format) = detect_format(filename) else {
            log::warn!("ignoring {filename}: unsupported extension");
            return;
        };
        if let Err(e) = self.load_scene(Some(data), Some(format), history) {
            log::error!("failed to load {filename}: {e}");
            self.status = Some(format!("Load failed: {e}"));
        } else {
            self.status = Some(format!("Loaded {filename}"));
        }
    }

    /// Replace the active mesh with freshly parsed geometry. Without
    /// explicit data this falls back to the cached default payload, and is
    /// a quiet no-op if that has not arrived yet.
    ///
    /// The new mesh is parsed and initialized in full before anything in
    /// the live scene changes, so a malformed file can never leave a
    /// half-populated mesh installed.
    pub fn load_scene(
        &mut self,
        data: Option<&[u8]>,
        format: Option<MeshFormat>,
        history: &mut History,
    ) -> Result<(), String> {
        let (data, format) = match (data, format, &self.default_payload) {
            (Some(data), Some(format), _) => (data, format),
            (None, _, Some((cached, cached_format))) => (cached.as_slice(), *cached_format),
            (None, _, None) => return Ok(()),
            (Some(_), None, _) => return Err("mesh data without a format".to_string()),
        };

        let mut base = BaseMesh::new();
        import_mesh(format, data, &mut base)?;
        let mut mesh = SculptMesh::new(base);
        mesh.init();

        history.clear();
        self.generation += 1;
        if let Some((center, radius)) = mesh.framing_sphere() {
            self.camera.frame(center, radius);
        } else {
            self.camera.reset();
        }
        log::info!(
            "installed mesh: {} vertices, {} triangles (generation {})",
            mesh.vertex_count(),
            mesh.triangle_count(),
            self.generation
        );
        self.mesh = Some(mesh);
        Ok(())
    }

    /// "New scene": drop the current mesh and reload the default blank.
    pub fn reset_scene(&mut self, history: &mut History) {
        self.mesh = None;
        history.clear();
        if let Err(e) = self.load_scene(None, None, history) {
            log::error!("scene reset failed: {e}");
        }
    }

    /// Install a user-chosen background image. Anything that does not
    /// decode is ignored.
    pub fn load_background(&mut self, data: &[u8]) {
        match image::load_from_memory(data) {
            Ok(img) => {
                let rgba = img.to_rgba8();
                let (width, height) = rgba.dimensions();
                self.background_revs += 1;
                self.background = Some(BackgroundImage {
                    width,
                    height,
                    pixels: rgba.into_raw(),
                    revision: self.background_revs,
                });
            }
            Err(e) => log::warn!("ignoring background image: {e}"),
        }
    }

    /// Viewport resize: keep the camera's pixel dimensions in lock-step
    /// with the drawable surface. Redundant calls are harmless.
    pub fn on_resize(&mut self, width: u32, height: u32) {
        self.camera.set_viewport(width as f32, height as f32);
    }

    pub fn screen_ray(&self, cursor: Vec2) -> Ray {
        Ray::from_screen(
            cursor,
            Vec2::new(self.camera.width, self.camera.height),
            self.camera.view_projection(),
        )
    }

    /// Pick the active mesh with an arbitrary ray (primary or mirrored),
    /// sizing the brush in world units at the hit depth.
    pub fn pick_with_ray(&self, ray: &Ray, radius_px: f32) -> Option<Hit> {
        let mesh = self.mesh.as_ref()?;
        let mut hit = picking::pick_mesh(ray, mesh)?;
        let viewport = Vec2::new(self.camera.width, self.camera.height);
        let view_proj = self.camera.view_projection();
        let anchor = picking::project_to_screen(hit.position, view_proj, viewport);
        hit.radius = match anchor {
            Some(screen) => {
                picking::world_radius_at(hit.position, screen, radius_px, viewport, view_proj)
            }
            // Hit projects behind the camera (possible for mirrored rays):
            // fall back to a depth-proportional size.
            None => hit.distance * radius_px / viewport.y.max(1.0),
        };
        Some(hit)
    }

    /// Pick straight through the cursor.
    pub fn pick(&self, cursor: Vec2, radius_px: f32) -> Option<Hit> {
        let ray = self.screen_ray(cursor);
        self.pick_with_ray(&ray, radius_px)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    const TRIANGLE_OBJ: &[u8] = b"v -1 -1 0\nv 1 -1 0\nv 0 1 0\nf 1 2 3\n";

    #[test]
    fn loading_obj_installs_exactly_one_mesh() {
        let mut scene = Scene::new();
        let mut history = History::new();
        scene
            .load_scene(Some(TRIANGLE_OBJ), Some(MeshFormat::Obj), &mut history)
            .unwrap();

        let mesh = scene.active_mesh().expect("mesh installed");
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(scene.generation(), 1);

        // Loading again replaces the slot; it never grows a list.
        scene
            .load_scene(Some(TRIANGLE_OBJ), Some(MeshFormat::Obj), &mut history)
            .unwrap();
        assert_eq!(scene.active_mesh().unwrap().vertex_count(), 3);
        assert_eq!(scene.generation(), 2);
    }

    #[test]
    fn load_resets_history_and_frames_camera() {
        let mut scene = Scene::new();
        let mut history = History::new();
        scene
            .load_scene(Some(TRIANGLE_OBJ), Some(MeshFormat::Obj), &mut history)
            .unwrap();
        // Camera now aims at the triangle's bounding center.
        assert!(scene.camera.target.abs_diff_eq(Vec3::new(0.0, 0.0, 0.0), 1e-5));
        assert!(!history.can_undo());
        assert!(!history.dirty);
    }

    #[test]
    fn corrupt_ply_leaves_previous_mesh_active() {
        let mut scene = Scene::new();
        let mut history = History::new();
        scene
            .load_scene(Some(TRIANGLE_OBJ), Some(MeshFormat::Obj), &mut history)
            .unwrap();

        let garbage = b"ply\nformat binary_little_endian 1.0\nelement vertex 100\nproperty float x\nproperty float y\nproperty float z\nend_header\n\x01\x02";
        let err = scene
            .load_scene(Some(garbage), Some(MeshFormat::Ply), &mut history)
            .unwrap_err();
        assert!(err.contains("truncated"), "{err}");

        let mesh = scene.active_mesh().expect("previous mesh still active");
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(scene.generation(), 1);
    }

    #[test]
    fn reset_before_default_payload_is_a_valid_empty_scene() {
        let mut scene = Scene::new();
        let mut history = History::new();
        // The background fetch has not been polled; no payload is cached.
        scene.reset_scene(&mut history);
        assert!(scene.active_mesh().is_none());
        // Render-facing state stays well-formed: camera matrices finite.
        let vp = scene.camera.view_projection();
        assert!(!vp.to_cols_array().iter().any(|v| v.is_nan()));
    }

    #[test]
    fn unsupported_extension_is_silently_ignored() {
        let mut scene = Scene::new();
        let mut history = History::new();
        scene.load_file(b"whatever", "notes.txt", &mut history);
        assert!(scene.active_mesh().is_none());
        assert!(scene.take_status().is_none());
    }

    #[test]
    fn resize_updates_camera_and_is_idempotent() {
        let mut scene = Scene::new();
        scene.on_resize(800, 600);
        assert_eq!(scene.camera.width, 800.0);
        scene.on_resize(1024, 768);
        scene.on_resize(1024, 768);
        assert_eq!((scene.camera.width, scene.camera.height), (1024.0, 768.0));
    }

    #[test]
    fn picking_through_screen_center_hits_framed_mesh() {
        let mut scene = Scene::new();
        let mut history = History::new();
        scene
            .load_scene(Some(TRIANGLE_OBJ), Some(MeshFormat::Obj), &mut history)
            .unwrap();
        let center = Vec2::new(scene.camera.width * 0.5, scene.camera.height * 0.5);
        let hit = scene.pick(center, 50.0).expect("framed mesh under cursor");
        assert!(hit.radius > 0.0);
        assert!(hit.position.z.abs() < 1e-3);
    }
}

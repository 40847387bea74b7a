pub mod tools;

use std::time::{Duration, Instant};

use glam::{Vec2, Vec3};

use crate::history::History;
use crate::history::commands::StrokeRecorder;
use crate::scene::Scene;
use crate::util::scheduler::{CancelToken, Scheduler};

use tools::brush::BrushTool;
use tools::crease::CreaseTool;
use tools::drag::DragTool;
use tools::flatten::FlattenTool;
use tools::inflate::InflateTool;
use tools::paint::PaintTool;
use tools::pinch::PinchTool;
use tools::rotate::RotateTool;
use tools::scale::ScaleTool;
use tools::smooth::SmoothTool;
use tools::{BrushParams, StrokeSample, ToolStrategy};

/// Period of the background re-application while a continuous stroke is
/// held on a stationary pointer.
pub const CONTINUOUS_TICK: Duration = Duration::from_millis(20);

/// The sculpting modes. Exactly one is active at a time; the table of
/// strategies in the session is indexed by this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    Brush,
    Inflate,
    Rotate,
    Smooth,
    Flatten,
    Pinch,
    Crease,
    Drag,
    Paint,
    Scale,
}

impl ToolKind {
    pub const ALL: [ToolKind; 10] = [
        ToolKind::Brush,
        ToolKind::Inflate,
        ToolKind::Rotate,
        ToolKind::Smooth,
        ToolKind::Flatten,
        ToolKind::Pinch,
        ToolKind::Crease,
        ToolKind::Drag,
        ToolKind::Paint,
        ToolKind::Scale,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            ToolKind::Brush => "Brush",
            ToolKind::Inflate => "Inflate",
            ToolKind::Rotate => "Rotate",
            ToolKind::Smooth => "Smooth",
            ToolKind::Flatten => "Flatten",
            ToolKind::Pinch => "Pinch",
            ToolKind::Crease => "Crease",
            ToolKind::Drag => "Drag",
            ToolKind::Paint => "Paint",
            ToolKind::Scale => "Scale",
        }
    }
}

/// Mirror plane for symmetric sculpting. The normal is kept unit-length
/// and non-zero.
pub struct SymmetryConfig {
    pub enabled: bool,
    pub origin: Vec3,
    normal: Vec3,
}

impl Default for SymmetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            origin: Vec3::ZERO,
            normal: Vec3::X,
        }
    }
}

impl SymmetryConfig {
    pub fn normal(&self) -> Vec3 {
        self.normal
    }

    /// Zero-length candidates are rejected, preserving the invariant.
    pub fn set_normal(&mut self, normal: Vec3) {
        if normal.length_squared() > 1e-12 {
            self.normal = normal.normalize();
        }
    }
}

#[derive(Clone, Copy)]
enum Phase {
    Begin,
    Step,
}

/// Ephemeral state for one pointer-down-to-pointer-up interaction.
struct Stroke {
    /// Snapshotted at start: selecting another tool mid-stroke must not
    /// retarget the stroke already in flight.
    tool: ToolKind,
    recorder: StrokeRecorder,
    timer: Option<CancelToken>,
    last_cursor: Vec2,
}

/// The sculpting session controller: owns the tool strategies, the
/// active selection, symmetry and continuous-mode configuration, and the
/// stroke lifecycle.
pub struct SculptSession {
    active: ToolKind,
    tools: Vec<Box<dyn ToolStrategy>>,
    pub symmetry: SymmetryConfig,
    pub continuous: bool,
    pub params: BrushParams,
    scheduler: Scheduler,
    stroke: Option<Stroke>,
}

impl SculptSession {
    pub fn new() -> Self {
        // Eager construction, one long-lived strategy per kind, in
        // ToolKind order.
        let tools: Vec<Box<dyn ToolStrategy>> = vec![
            Box::new(BrushTool),
            Box::new(InflateTool),
            Box::new(RotateTool::default()),
            Box::new(SmoothTool),
            Box::new(FlattenTool),
            Box::new(PinchTool),
            Box::new(CreaseTool),
            Box::new(DragTool::default()),
            Box::new(PaintTool),
            Box::new(ScaleTool::default()),
        ];
        Self {
            active: ToolKind::Brush,
            tools,
            symmetry: SymmetryConfig::default(),
            continuous: false,
            params: BrushParams::default(),
            scheduler: Scheduler::new(),
            stroke: None,
        }
    }

    pub fn active_tool(&self) -> ToolKind {
        self.active
    }

    /// Takes effect on the next stroke start.
    pub fn select_tool(&mut self, kind: ToolKind) {
        self.active = kind;
    }

    pub fn is_stroking(&self) -> bool {
        self.stroke.is_some()
    }

    /// Tools whose semantics are a one-shot transform driven by cursor
    /// travel. They neither re-pick mid-stroke nor qualify for background
    /// continuity — one exclusion set for both questions.
    fn cursor_transform(kind: ToolKind) -> bool {
        matches!(kind, ToolKind::Rotate | ToolKind::Drag | ToolKind::Scale)
    }

    /// Whether the tool re-picks the surface while the pointer moves.
    pub fn allows_picking(kind: ToolKind) -> bool {
        !Self::cursor_transform(kind)
    }

    /// Whether the tool may keep re-applying from the background tick.
    pub fn allows_continuous(kind: ToolKind) -> bool {
        !Self::cursor_transform(kind)
    }

    /// Begin a stroke. Ignored while one is already live. Schedules the
    /// continuous tick only when the mode is on, the first pick engaged
    /// the mesh, and the tool is continuity-eligible.
    pub fn start(&mut self, cursor: Vec2, scene: &mut Scene) {
        if self.stroke.is_some() {
            return;
        }
        let mut stroke = Stroke {
            tool: self.active,
            recorder: StrokeRecorder::default(),
            timer: None,
            last_cursor: cursor,
        };
        let engaged = self.apply(&mut stroke, cursor, scene, Phase::Begin);
        if engaged {
            log::debug!("{} stroke started", self.tools[stroke.tool.index()].name());
        }
        if self.continuous && engaged && Self::allows_continuous(stroke.tool) {
            stroke.timer = Some(self.scheduler.schedule(CONTINUOUS_TICK, Instant::now()));
        }
        self.stroke = Some(stroke);
    }

    /// Pointer moved during a stroke. Under continuous mode with an
    /// eligible tool this only records the new cursor — the background
    /// tick is the sole update driver, so a logical tick is never applied
    /// from two sources.
    pub fn update(&mut self, cursor: Vec2, scene: &mut Scene) {
        let Some(mut stroke) = self.stroke.take() else {
            return;
        };
        stroke.last_cursor = cursor;
        if !(self.continuous && Self::allows_continuous(stroke.tool)) {
            self.apply(&mut stroke, cursor, scene, Phase::Step);
        }
        self.stroke = Some(stroke);
    }

    /// Pointer released, or left the viewport (both route here). Safe to
    /// call with no live stroke, and safe to call twice.
    pub fn end(&mut self, scene: &mut Scene, history: &mut History) {
        if let Some(mesh) = scene.active_mesh_mut() {
            mesh.reconcile();
        }
        let Some(stroke) = self.stroke.take() else {
            return;
        };
        if let Some(token) = stroke.timer {
            self.scheduler.cancel(token);
        }
        // Both symmetric sides were funneled through one recorder, so the
        // whole stroke lands as a single undo step.
        if !stroke.recorder.is_empty()
            && let Some(mesh) = scene.active_mesh_mut()
            && let Some(cmd) = stroke.recorder.into_command(mesh, stroke.tool.label())
        {
            history.push(Box::new(cmd), mesh);
        }
    }

    /// Drive the continuous tick. Returns true when a deformation was
    /// applied and the scene should be rendered.
    pub fn pump(&mut self, now: Instant, scene: &mut Scene) -> bool {
        let due = self.scheduler.poll(now);
        if due.is_empty() {
            return false;
        }
        let Some(mut stroke) = self.stroke.take() else {
            return false;
        };
        let mut render_needed = false;
        if let Some(token) = stroke.timer
            && due.contains(&token)
        {
            let cursor = stroke.last_cursor;
            self.apply(&mut stroke, cursor, scene, Phase::Step);
            render_needed = true;
        }
        self.stroke = Some(stroke);
        render_needed
    }

    /// One logical stroke update: resolve picks, invoke the strategy for
    /// the primary side, then — only after that completes — for the
    /// mirrored side. Returns whether the primary pick engaged the mesh.
    fn apply(&mut self, stroke: &mut Stroke, cursor: Vec2, scene: &mut Scene, phase: Phase) -> bool {
        let ray = scene.screen_ray(cursor);
        let params = self.params;
        let pick_now = matches!(phase, Phase::Begin) || Self::allows_picking(stroke.tool);

        let hit = if pick_now {
            scene.pick_with_ray(&ray, params.radius_px)
        } else {
            None
        };

        let mirror = self
            .symmetry
            .enabled
            .then(|| (self.symmetry.origin, self.symmetry.normal()));
        let mirrored = mirror.map(|(origin, normal)| {
            let mray = ray.reflect(origin, normal);
            let mhit = if pick_now {
                scene.pick_with_ray(&mray, params.radius_px)
            } else {
                None
            };
            (mray, mhit)
        });

        let strategy = &mut self.tools[stroke.tool.index()];
        let Some(mesh) = scene.active_mesh_mut() else {
            return false;
        };

        let sample = StrokeSample {
            hit,
            ray,
            cursor,
            params: &params,
            mirror: None,
        };
        match phase {
            Phase::Begin => strategy.stroke_begin(mesh, &sample, &mut stroke.recorder),
            Phase::Step => strategy.stroke_step(mesh, &sample, &mut stroke.recorder),
        }

        if let (Some((mray, mhit)), Some((origin, normal))) = (mirrored, mirror) {
            let sample = StrokeSample {
                hit: mhit,
                ray: mray,
                cursor,
                params: &params,
                mirror: Some((origin, normal)),
            };
            match phase {
                Phase::Begin => strategy.stroke_begin(mesh, &sample, &mut stroke.recorder),
                Phase::Step => strategy.stroke_step(mesh, &sample, &mut stroke.recorder),
            }
        }

        mesh.commit_update();
        hit.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MeshFormat;
    use crate::util::picking::project_to_screen;
    use glam::Vec4;

    const TRIANGLE_OBJ: &[u8] = b"v -1 -1 0\nv 1 -1 0\nv 0 1 0\nf 1 2 3\n";
    const MIRRORED_PAIR_OBJ: &[u8] = b"v 1.5 0.5 0\nv 2.5 0.5 0\nv 2 1.5 0\nv -1.5 0.5 0\nv -2.5 0.5 0\nv -2 1.5 0\nf 1 2 3\nf 4 5 6\n";

    fn loaded_scene(obj: &[u8]) -> (Scene, History) {
        let mut scene = Scene::new();
        let mut history = History::new();
        scene
            .load_scene(Some(obj), Some(MeshFormat::Obj), &mut history)
            .unwrap();
        (scene, history)
    }

    fn screen_center(scene: &Scene) -> Vec2 {
        Vec2::new(scene.camera.width * 0.5, scene.camera.height * 0.5)
    }

    fn session_with_wide_brush() -> SculptSession {
        let mut session = SculptSession::new();
        session.params.radius_px = 400.0;
        session.symmetry.enabled = false;
        session
    }

    #[test]
    fn rotate_drag_scale_share_the_exclusion_set() {
        for kind in ToolKind::ALL {
            let excluded = matches!(kind, ToolKind::Rotate | ToolKind::Drag | ToolKind::Scale);
            assert_eq!(SculptSession::allows_continuous(kind), !excluded, "{kind:?}");
            assert_eq!(SculptSession::allows_picking(kind), !excluded, "{kind:?}");
            assert_eq!(
                SculptSession::allows_continuous(kind),
                SculptSession::allows_picking(kind),
                "{kind:?}"
            );
        }
    }

    #[test]
    fn continuous_start_schedules_one_timer_and_end_cancels_it() {
        let (mut scene, mut history) = loaded_scene(TRIANGLE_OBJ);
        let mut session = session_with_wide_brush();
        session.continuous = true;

        session.start(screen_center(&scene), &mut scene);
        assert!(session.is_stroking());
        assert_eq!(session.scheduler.len(), 1);

        session.end(&mut scene, &mut history);
        assert!(!session.is_stroking());
        assert!(session.scheduler.is_empty());

        // A second end without an intervening start is a clean no-op.
        session.end(&mut scene, &mut history);
        assert!(session.scheduler.is_empty());
    }

    #[test]
    fn continuous_update_never_applies_directly() {
        let (mut scene, mut history) = loaded_scene(TRIANGLE_OBJ);
        let mut session = session_with_wide_brush();
        session.continuous = true;

        let center = screen_center(&scene);
        session.start(center, &mut scene);
        let rev = scene.active_mesh().unwrap().geometry_rev();

        // Pointer-move updates only feed the tick; the mesh is untouched.
        session.update(center + Vec2::new(3.0, 0.0), &mut scene);
        session.update(center + Vec2::new(6.0, 0.0), &mut scene);
        assert_eq!(scene.active_mesh().unwrap().geometry_rev(), rev);

        // The background tick is what deforms.
        let fired = session.pump(Instant::now() + CONTINUOUS_TICK * 2, &mut scene);
        assert!(fired);
        assert!(scene.active_mesh().unwrap().geometry_rev() > rev);

        session.end(&mut scene, &mut history);
    }

    #[test]
    fn direct_update_applies_without_continuous_mode() {
        let (mut scene, mut history) = loaded_scene(TRIANGLE_OBJ);
        let mut session = session_with_wide_brush();

        let center = screen_center(&scene);
        session.start(center, &mut scene);
        assert!(session.scheduler.is_empty());
        let rev = scene.active_mesh().unwrap().geometry_rev();

        session.update(center + Vec2::new(2.0, 0.0), &mut scene);
        assert!(scene.active_mesh().unwrap().geometry_rev() > rev);

        session.end(&mut scene, &mut history);
    }

    #[test]
    fn cursor_transform_tools_never_get_a_timer() {
        let (mut scene, mut history) = loaded_scene(TRIANGLE_OBJ);
        let mut session = session_with_wide_brush();
        session.continuous = true;
        session.select_tool(ToolKind::Drag);

        session.start(screen_center(&scene), &mut scene);
        assert!(session.is_stroking());
        assert!(session.scheduler.is_empty());
        session.end(&mut scene, &mut history);
    }

    #[test]
    fn start_while_stroking_is_ignored() {
        let (mut scene, mut history) = loaded_scene(TRIANGLE_OBJ);
        let mut session = session_with_wide_brush();
        session.continuous = true;

        let center = screen_center(&scene);
        session.start(center, &mut scene);
        session.start(center, &mut scene);
        assert_eq!(session.scheduler.len(), 1);
        session.end(&mut scene, &mut history);
    }

    #[test]
    fn missed_pick_engages_nothing() {
        let (mut scene, mut history) = loaded_scene(TRIANGLE_OBJ);
        let mut session = session_with_wide_brush();
        session.continuous = true;

        // Top-left corner: the framed triangle is nowhere near.
        session.start(Vec2::new(2.0, 2.0), &mut scene);
        assert!(session.is_stroking());
        assert!(session.scheduler.is_empty());

        session.end(&mut scene, &mut history);
        assert_eq!(history.undo_len(), 0);
    }

    #[test]
    fn end_before_any_mesh_loads_is_a_noop() {
        let mut scene = Scene::new();
        let mut history = History::new();
        let mut session = SculptSession::new();
        session.end(&mut scene, &mut history);
        session.update(Vec2::ZERO, &mut scene);
        assert!(!session.is_stroking());
    }

    #[test]
    fn symmetric_stroke_hits_both_sides_as_one_undo_step() {
        let (mut scene, mut history) = loaded_scene(MIRRORED_PAIR_OBJ);
        let mut session = SculptSession::new();
        session.params.radius_px = 150.0;
        // Defaults: symmetry on, plane {origin (0,0,0), normal (1,0,0)}.
        assert!(session.symmetry.enabled);

        let before: Vec<_> = (0..6)
            .map(|v| scene.active_mesh().unwrap().position(v))
            .collect();

        // Aim at the centroid of the +X triangle.
        let centroid = (before[0] + before[1] + before[2]) / 3.0;
        let viewport = Vec2::new(scene.camera.width, scene.camera.height);
        let cursor = project_to_screen(centroid, scene.camera.view_projection(), viewport)
            .expect("centroid in front of camera");

        session.start(cursor, &mut scene);
        session.end(&mut scene, &mut history);

        assert_eq!(history.undo_len(), 1);
        let mesh = scene.active_mesh().unwrap();
        let moved =
            |v: u32| -> bool { !mesh.position(v).abs_diff_eq(before[v as usize], 1e-7) };
        // Primary side deformed...
        assert!((0..3).any(|v| moved(v)), "primary side untouched");
        // ...and so did its reflection across x = 0.
        assert!((3..6).any(|v| moved(v)), "mirrored side untouched");

        // One undo reverts both sides together.
        let mesh = scene.active_mesh_mut().unwrap();
        history.undo(mesh);
        for v in 0..6u32 {
            assert!(
                mesh.position(v).abs_diff_eq(before[v as usize], 1e-6),
                "vertex {v} not restored"
            );
        }
    }

    #[test]
    fn tool_change_mid_stroke_keeps_the_dispatched_strategy() {
        let (mut scene, mut history) = loaded_scene(TRIANGLE_OBJ);
        let mut session = session_with_wide_brush();

        let center = screen_center(&scene);
        session.start(center, &mut scene);
        let rev = scene.active_mesh().unwrap().geometry_rev();
        // Switching to Paint mid-stroke must not retarget the live stroke.
        session.select_tool(ToolKind::Paint);
        session.update(center + Vec2::new(2.0, 1.0), &mut scene);

        let mesh = scene.active_mesh().unwrap();
        // Still brushing: geometry moved, colors untouched.
        assert!(mesh.geometry_rev() > rev);
        for v in 0..3 {
            assert_eq!(mesh.color(v), Vec4::ONE);
        }
        assert_eq!(session.active_tool(), ToolKind::Paint);

        session.end(&mut scene, &mut history);
    }
}

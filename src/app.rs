use std::sync::Arc;
use std::time::Instant;

use glam::Vec2;
use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::keyboard::KeyCode;
use winit::window::{Window, WindowAttributes, WindowId};

use crate::history::History;
use crate::input::InputState;
use crate::render::Renderer;
use crate::scene::Scene;
use crate::sculpt::SculptSession;
use crate::settings::Settings;
use crate::ui::{self, UiAction};

/// Top-level application state.
pub struct App {
    gpu: Option<GpuState>,
    scene: Scene,
    session: SculptSession,
    history: History,
    input: InputState,
    settings: Settings,
    matcap_index: usize,
    bg_color: [f32; 3],
    status_line: Option<String>,
}

/// Everything that requires the window to exist.
struct GpuState {
    window: Arc<Window>,
    renderer: Renderer,
    egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

impl App {
    pub fn new(_event_loop: &winit::event_loop::EventLoop<()>) -> Self {
        let settings = Settings::load();

        let mut session = SculptSession::new();
        session.params.radius_px = settings.sculpt.radius_px;
        session.params.intensity = settings.sculpt.intensity;
        session.params.color = glam::Vec4::from_array(settings.sculpt.paint_color);
        session.symmetry.enabled = settings.sculpt.symmetry;
        session.continuous = settings.sculpt.continuous;

        Self {
            gpu: None,
            scene: Scene::new(),
            session,
            history: History::new(),
            input: InputState::new(),
            matcap_index: settings.display.matcap,
            bg_color: settings.display.bg_color,
            settings,
            status_line: None,
        }
    }

    fn sync_settings(&mut self) {
        self.settings.sculpt.radius_px = self.session.params.radius_px;
        self.settings.sculpt.intensity = self.session.params.intensity;
        self.settings.sculpt.paint_color = self.session.params.color.into();
        self.settings.sculpt.symmetry = self.session.symmetry.enabled;
        self.settings.sculpt.continuous = self.session.continuous;
        self.settings.display.matcap = self.matcap_index;
        self.settings.display.bg_color = self.bg_color;
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_some() {
            return;
        }

        let attrs = WindowAttributes::default()
            .with_title("Clayforge")
            .with_inner_size(winit::dpi::LogicalSize::new(1280u32, 720u32));
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .expect("failed to create window"),
        );

        let renderer = pollster::block_on(Renderer::new(window.clone()));

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx,
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer =
            egui_wgpu::Renderer::new(&renderer.device, renderer.surface_format, None, 1, false);

        let size = window.inner_size();
        self.scene.on_resize(size.width, size.height);

        self.gpu = Some(GpuState {
            window,
            renderer,
            egui_state,
            egui_renderer,
        });
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(gpu) = &mut self.gpu else { return };

        // Let egui process the event first
        let egui_response = gpu.egui_state.on_window_event(&gpu.window, &event);
        let egui_consumed = egui_response.consumed;

        match &event {
            WindowEvent::CloseRequested => {
                self.sync_settings();
                self.settings.save();
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                gpu.renderer.resize(new_size.width, new_size.height);
                self.scene.on_resize(new_size.width, new_size.height);
                gpu.window.request_redraw();
            }
            WindowEvent::RedrawRequested => {
                self.redraw();
            }
            _ => {}
        }

        // Forward input events if egui didn't consume them. Release and
        // cursor-exit always pass through: a stroke must never survive a
        // pointer-up that happened to land on a panel.
        let stroke_terminator = matches!(
            &event,
            WindowEvent::MouseInput {
                state: ElementState::Released,
                ..
            } | WindowEvent::CursorLeft { .. }
        );
        if !egui_consumed || stroke_terminator {
            self.input.handle_event(&event);
        }

        // Always request redraw to keep the render loop going
        if let Some(gpu) = &self.gpu {
            gpu.window.request_redraw();
        }
    }
}

impl App {
    fn process_input(&mut self) {
        if self.gpu.is_none() {
            return;
        }

        // Apply camera settings from preferences
        let cam = &self.settings.camera;
        self.scene.camera.fov_y = cam.fov_degrees.to_radians();
        self.scene.camera.near = cam.near_plane;
        self.scene.camera.far = cam.far_plane;

        // Camera navigation: Space+left drag or middle drag orbits,
        // Space+right or Shift+middle pans, wheel zooms.
        let orbiting = (self.input.space_held() && self.input.left_pressed)
            || (self.input.middle_pressed && !self.input.shift_held());
        if orbiting && !self.session.is_stroking() {
            self.scene.camera.orbit(
                -self.input.mouse_delta.x * cam.orbit_sensitivity,
                -self.input.mouse_delta.y * cam.orbit_sensitivity,
            );
        }
        let panning = (self.input.space_held() && self.input.right_pressed)
            || (self.input.middle_pressed && self.input.shift_held());
        if panning {
            let pan_sens = cam.pan_sensitivity * self.scene.camera.distance;
            self.scene.camera.pan(
                -self.input.mouse_delta.x * pan_sens,
                self.input.mouse_delta.y * pan_sens,
            );
        }
        if self.input.scroll_delta != 0.0 {
            let step = self.input.scroll_delta * cam.zoom_speed * self.scene.camera.distance * 0.2;
            self.scene.camera.zoom(step);
        }

        // Stroke lifecycle. Camera chords never start a stroke.
        let camera_nav = self.input.space_held() || self.input.middle_pressed;
        if self.input.left_just_pressed && !camera_nav {
            self.session.start(self.input.mouse_pos, &mut self.scene);
        }
        if self.session.is_stroking() && self.input.mouse_delta != Vec2::ZERO {
            self.session.update(self.input.mouse_pos, &mut self.scene);
        }
        // Pointer release and pointer-leaving-the-canvas end the stroke
        // the same way.
        if self.input.left_just_released || self.input.pointer_exited {
            self.session.end(&mut self.scene, &mut self.history);
        }

        // Continuous-sculpt tick; the render loop runs every frame, so a
        // fired tick is drawn by this same redraw.
        self.session.pump(Instant::now(), &mut self.scene);

        // Undo/redo hotkeys
        if self.input.ctrl_held() && self.input.key_just_pressed(KeyCode::KeyZ) {
            if let Some(mesh) = self.scene.active_mesh_mut() {
                if self.input.shift_held() {
                    self.history.redo(mesh);
                } else {
                    self.history.undo(mesh);
                }
            }
        }
        if self.input.ctrl_held() && self.input.key_just_pressed(KeyCode::KeyY) {
            if let Some(mesh) = self.scene.active_mesh_mut() {
                self.history.redo(mesh);
            }
        }

        self.input.begin_frame();
    }

    fn redraw(&mut self) {
        self.process_input();

        // Startup assets arrive over the channel: the default mesh payload
        // installs through the scene, matcaps go to the GPU.
        let matcaps = self.scene.poll_assets(&mut self.history);
        if let Some(status) = self.scene.take_status() {
            self.status_line = Some(status);
        }

        let Some(gpu) = &mut self.gpu else { return };
        for img in &matcaps {
            gpu.renderer.upload_matcap(img);
        }

        let output = match gpu.renderer.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let size = gpu.window.inner_size();
                gpu.renderer.resize(size.width, size.height);
                return;
            }
            Err(e) => {
                log::error!("surface error: {e}");
                return;
            }
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let title = if self.history.dirty {
            "Clayforge *"
        } else {
            "Clayforge"
        };
        gpu.window.set_title(title);

        // Run egui
        let raw_input = gpu.egui_state.take_egui_input(&gpu.window);
        let egui_ctx = gpu.egui_state.egui_ctx().clone();
        let mut action = UiAction::None;
        let full_output = egui_ctx.run(raw_input, |ctx| {
            action = ui::draw_ui(
                ctx,
                &mut self.session,
                &self.scene,
                &self.history,
                &mut self.matcap_index,
                self.status_line.as_deref(),
            );
        });
        gpu.egui_state
            .handle_platform_output(&gpu.window, full_output.platform_output);

        match action {
            UiAction::OpenMesh => {
                let file = rfd::FileDialog::new()
                    .add_filter("Meshes", &["obj", "stl", "ply"])
                    .set_title("Open Mesh")
                    .pick_file();
                if let Some(path) = file {
                    match std::fs::read(&path) {
                        Ok(data) => {
                            let name = path
                                .file_name()
                                .map(|s| s.to_string_lossy().into_owned())
                                .unwrap_or_default();
                            self.scene.load_file(&data, &name, &mut self.history);
                        }
                        Err(e) => log::error!("failed to read {}: {e}", path.display()),
                    }
                }
            }
            UiAction::OpenBackground => {
                let file = rfd::FileDialog::new()
                    .add_filter("Images", &["png", "jpg", "jpeg"])
                    .set_title("Open Background Image")
                    .pick_file();
                if let Some(path) = file {
                    match std::fs::read(&path) {
                        Ok(data) => self.scene.load_background(&data),
                        Err(e) => log::error!("failed to read {}: {e}", path.display()),
                    }
                }
            }
            UiAction::ExportMesh => {
                if let Some(mesh) = self.scene.active_mesh() {
                    let file = rfd::FileDialog::new()
                        .add_filter("Wavefront OBJ", &["obj"])
                        .set_file_name("sculpt.obj")
                        .save_file();
                    if let Some(path) = file {
                        let text = crate::io::export_obj(mesh.base());
                        match std::fs::write(&path, text) {
                            Ok(()) => {
                                self.history.mark_saved();
                                self.status_line = Some(format!("Exported {}", path.display()));
                            }
                            Err(e) => log::error!("export failed: {e}"),
                        }
                    }
                }
            }
            UiAction::NewScene => {
                self.scene.reset_scene(&mut self.history);
            }
            UiAction::Undo => {
                if let Some(mesh) = self.scene.active_mesh_mut() {
                    self.history.undo(mesh);
                }
            }
            UiAction::Redo => {
                if let Some(mesh) = self.scene.active_mesh_mut() {
                    self.history.redo(mesh);
                }
            }
            UiAction::None => {}
        }
        if let Some(status) = self.scene.take_status() {
            self.status_line = Some(status);
        }

        let paint_jobs = egui_ctx.tessellate(full_output.shapes, full_output.pixels_per_point);
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [gpu.renderer.config.width, gpu.renderer.config.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        // Update egui textures
        for (id, delta) in &full_output.textures_delta.set {
            gpu.egui_renderer
                .update_texture(&gpu.renderer.device, &gpu.renderer.queue, *id, delta);
        }

        // Upload per-frame data before render pass
        gpu.renderer.prepare_frame(&self.scene);

        // Main 3D render pass
        {
            let mut encoder = gpu
                .renderer
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("scene_encoder"),
                });
            {
                let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("main_pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(wgpu::Color {
                                r: self.bg_color[0] as f64,
                                g: self.bg_color[1] as f64,
                                b: self.bg_color[2] as f64,
                                a: 1.0,
                            }),
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                        view: &gpu.renderer.depth_view,
                        depth_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Clear(1.0),
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }),
                    ..Default::default()
                });

                gpu.renderer.render_scene(&mut pass, self.matcap_index);
            }
            gpu.renderer.queue.submit(std::iter::once(encoder.finish()));
        }

        // Egui render pass (separate encoder so egui owns the pass)
        {
            let mut encoder = gpu
                .renderer
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("egui_encoder"),
                });

            gpu.egui_renderer.update_buffers(
                &gpu.renderer.device,
                &gpu.renderer.queue,
                &mut encoder,
                &paint_jobs,
                &screen_descriptor,
            );

            {
                let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui_pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    ..Default::default()
                });
                // SAFETY: The render pass is dropped before encoder.finish() is called.
                let pass_static: &mut wgpu::RenderPass<'static> =
                    unsafe { std::mem::transmute(&mut pass) };
                gpu.egui_renderer
                    .render(pass_static, &paint_jobs, &screen_descriptor);
            }

            gpu.renderer.queue.submit(std::iter::once(encoder.finish()));
        }

        output.present();

        // Free egui textures
        for id in &full_output.textures_delta.free {
            gpu.egui_renderer.free_texture(id);
        }
    }
}

use glam::{Vec3, Vec4};

use crate::history::History;
use crate::io::assets::MATCAP_SLOTS;
use crate::scene::Scene;
use crate::sculpt::{SculptSession, ToolKind};

/// Actions the panels request from the app.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiAction {
    None,
    OpenMesh,
    OpenBackground,
    ExportMesh,
    NewScene,
    Undo,
    Redo,
}

const MATCAP_NAMES: [&str; MATCAP_SLOTS] = [
    "Clay", "Chavant", "Skin", "Bronze", "Velvet", "Pearl",
];

/// Draw the tool panel and status bar. Returns the action to perform, if
/// any button was clicked.
pub fn draw_ui(
    ctx: &egui::Context,
    session: &mut SculptSession,
    scene: &Scene,
    history: &History,
    matcap_index: &mut usize,
    status_line: Option<&str>,
) -> UiAction {
    let mut action = UiAction::None;

    egui::SidePanel::left("tools_panel")
        .default_width(190.0)
        .show(ctx, |ui| {
            ui.heading("Tool");
            let active = session.active_tool();
            for kind in ToolKind::ALL {
                if ui.selectable_label(kind == active, kind.label()).clicked() {
                    session.select_tool(kind);
                }
            }
            ui.small("Takes effect on the next stroke");

            ui.separator();
            ui.heading("Brush");
            ui.add(egui::Slider::new(&mut session.params.radius_px, 5.0..=200.0).text("Radius"));
            ui.add(egui::Slider::new(&mut session.params.intensity, 0.0..=1.0).text("Intensity"));
            ui.checkbox(&mut session.params.invert, "Invert (carve)");
            if session.active_tool() == ToolKind::Paint {
                let mut color: [f32; 4] = session.params.color.into();
                ui.horizontal(|ui| {
                    ui.label("Color:");
                    ui.color_edit_button_rgba_unmultiplied(&mut color);
                });
                session.params.color = Vec4::from_array(color);
            }

            ui.separator();
            ui.heading("Symmetry");
            ui.checkbox(&mut session.symmetry.enabled, "Mirror strokes");
            let normal = session.symmetry.normal();
            ui.horizontal(|ui| {
                for (axis, label) in [(Vec3::X, "X"), (Vec3::Y, "Y"), (Vec3::Z, "Z")] {
                    let selected = normal.abs_diff_eq(axis, 1e-4);
                    if ui.selectable_label(selected, label).clicked() {
                        session.symmetry.set_normal(axis);
                    }
                }
            });

            ui.separator();
            ui.checkbox(&mut session.continuous, "Continuous sculpting");
            ui.small("Keeps deforming while the pointer is held");

            ui.separator();
            egui::ComboBox::from_label("Material")
                .selected_text(MATCAP_NAMES[(*matcap_index).min(MATCAP_SLOTS - 1)])
                .show_ui(ui, |ui| {
                    for (i, name) in MATCAP_NAMES.iter().enumerate() {
                        ui.selectable_value(matcap_index, i, *name);
                    }
                });

            ui.separator();
            ui.heading("Scene");
            if ui.button("Open mesh…").clicked() {
                action = UiAction::OpenMesh;
            }
            if ui.button("Background…").clicked() {
                action = UiAction::OpenBackground;
            }
            if ui
                .add_enabled(scene.active_mesh().is_some(), egui::Button::new("Export OBJ…"))
                .clicked()
            {
                action = UiAction::ExportMesh;
            }
            if ui.button("New scene").clicked() {
                action = UiAction::NewScene;
            }

            ui.separator();
            ui.horizontal(|ui| {
                if ui
                    .add_enabled(history.can_undo(), egui::Button::new("Undo"))
                    .clicked()
                {
                    action = UiAction::Undo;
                }
                if ui
                    .add_enabled(history.can_redo(), egui::Button::new("Redo"))
                    .clicked()
                {
                    action = UiAction::Redo;
                }
            });
            ui.small("Ctrl+Z / Ctrl+Y");
        });

    egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
        ui.horizontal(|ui| {
            match scene.active_mesh() {
                Some(mesh) => ui.label(format!(
                    "{} vertices · {} triangles",
                    mesh.vertex_count(),
                    mesh.triangle_count()
                )),
                None => ui.label("No mesh loaded"),
            };
            ui.separator();
            ui.label(session.active_tool().label());
            if let Some(status) = status_line {
                ui.separator();
                ui.label(status);
            }
        });
    });

    action
}

use glam::{Vec3, Vec4};
use prism_render::config::MAX_BLUR_RADIUS;
use prism_render::{FrameOrchestrator, LightKind, LightSet, Scene};
use prism_tools::{EntityEdit, SceneInspector};

/// Side length of the shadow map preview in points.
const SHADOW_PREVIEW_SIZE: f32 = 256.0;

/// Window facts the inspector shows but does not own.
pub struct WindowInfo {
    pub width: u32,
    pub height: u32,
    pub fps: f32,
}

/// Inspector settings that live outside the scene.
pub struct InspectorState {
    /// Mirror size and frame rate into the window title.
    pub title_stats: bool,
    /// Color copy of the shadow map, registered with the egui renderer.
    pub shadow_preview: Option<egui::TextureId>,
}

/// Window title carrying the stats the window section shows.
pub fn title_text(window: &WindowInfo) -> String {
    let frame_ms = if window.fps > 0.0 {
        1000.0 / window.fps
    } else {
        0.0
    };
    format!(
        "Prism    Width: {}    Height: {}    FPS: {:.0}    Frame Time: {:.2}ms",
        window.width, window.height, window.fps, frame_ms
    )
}

pub fn draw_inspector(
    ctx: &egui::Context,
    scene: &mut Scene,
    orchestrator: &mut FrameOrchestrator,
    window: &WindowInfo,
    state: &mut InspectorState,
) {
    egui::SidePanel::left("inspector")
        .default_width(300.0)
        .show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.heading("Prism");
                ui.small(SceneInspector::summary(scene, orchestrator.config()).to_string());
                ui.separator();

                ui.collapsing("Window", |ui| window_section(ui, orchestrator, window, state));
                ui.collapsing("Entities", |ui| entities_section(ui, scene));
                ui.collapsing("Cameras", |ui| cameras_section(ui, scene));
                ui.collapsing("Lights", |ui| {
                    lights_section(ui, scene.lights_mut(), state.shadow_preview)
                });
                ui.collapsing("Post Processing", |ui| post_section(ui, orchestrator));

                ui.separator();
                ui.small("LMB drag: Look | WASD/Space/Shift: Move | Tab: Next camera | Esc: Quit");
            });
        });
}

fn window_section(
    ui: &mut egui::Ui,
    orchestrator: &mut FrameOrchestrator,
    window: &WindowInfo,
    state: &mut InspectorState,
) {
    ui.label(format!("Size: {} x {}", window.width, window.height));
    ui.label(format!("FPS: {:.0}", window.fps));
    let mut vsync = orchestrator.config().vsync;
    if ui.checkbox(&mut vsync, "VSync").changed() {
        orchestrator.set_vsync(vsync);
        tracing::info!(vsync, "vsync toggled");
    }
    ui.checkbox(&mut state.title_stats, "Update title bar stats");
}

fn entities_section(ui: &mut egui::Ui, scene: &mut Scene) {
    for index in 0..scene.entities().len() {
        let Some(info) = SceneInspector::inspect_entity(scene, index) else {
            continue;
        };
        egui::CollapsingHeader::new(&info.name)
            .id_salt(("entity", index))
            .show(ui, |ui| {
                ui.label(format!("Material: {}", info.material));
                let mut edit = EntityEdit::default();

                let mut tint = info.color_tint;
                ui.horizontal(|ui| {
                    ui.label("Tint");
                    if ui.color_edit_button_rgba_unmultiplied(&mut tint).changed() {
                        edit.color_tint = Some(Vec4::from_array(tint));
                    }
                });
                let mut roughness = info.roughness;
                if ui
                    .add(egui::Slider::new(&mut roughness, 0.0..=1.0).text("Roughness"))
                    .changed()
                {
                    edit.roughness = Some(roughness);
                }
                edit.position = drag_vec3(ui, "Position", info.transform.position, 0.01);
                edit.rotation = drag_vec3(ui, "Rotation", info.transform.rotation, 0.01);
                edit.scale = drag_vec3(ui, "Scale", info.transform.scale, 0.01);

                if edit != EntityEdit::default() {
                    SceneInspector::apply_entity_edit(scene, index, &edit);
                }
            });
    }
}

fn cameras_section(ui: &mut egui::Ui, scene: &mut Scene) {
    ui.horizontal(|ui| {
        if ui.button("<").clicked() {
            scene.select_previous_camera();
        }
        ui.label(format!(
            "Camera {} of {}",
            scene.active_camera_index() + 1,
            scene.cameras().len()
        ));
        if ui.button(">").clicked() {
            scene.select_next_camera();
        }
    });

    let camera = scene.active_camera_mut();
    let mut move_speed = camera.move_speed();
    if ui
        .add(
            egui::DragValue::new(&mut move_speed)
                .prefix("Move speed: ")
                .speed(0.1)
                .range(0.0..=100.0),
        )
        .changed()
    {
        camera.set_move_speed(move_speed);
    }
    let mut rotation_speed = camera.rotation_speed();
    if ui
        .add(
            egui::DragValue::new(&mut rotation_speed)
                .prefix("Rotation speed: ")
                .speed(0.001)
                .range(0.0..=1.0),
        )
        .changed()
    {
        camera.set_rotation_speed(rotation_speed);
    }

    if let Some(info) = SceneInspector::camera_info(scene, scene.active_camera_index()) {
        let [px, py, pz] = info.transform.position;
        let [rx, ry, rz] = info.transform.rotation;
        ui.label(format!("Position: ({px:.2}, {py:.2}, {pz:.2})"));
        ui.label(format!("Rotation: ({rx:.2}, {ry:.2}, {rz:.2})"));
        ui.label(format!("FOV: {:.1} deg", info.field_of_view.to_degrees()));
    }
}

fn lights_section(
    ui: &mut egui::Ui,
    lights: &mut LightSet,
    shadow_preview: Option<egui::TextureId>,
) {
    let mut ambient = lights.ambient().to_array();
    ui.horizontal(|ui| {
        ui.label("Ambient");
        if ui.color_edit_button_rgb(&mut ambient).changed() {
            lights.set_ambient(Vec3::from_array(ambient));
        }
    });

    for index in 0..lights.len() {
        let Some(mut light) = lights.get(index).copied() else {
            continue;
        };
        let title = if index == lights.shadow_caster() {
            format!("Light {index} (shadow)")
        } else {
            format!("Light {index}")
        };
        egui::CollapsingHeader::new(title)
            .id_salt(("light", index))
            .show(ui, |ui| {
                let before = light;
                egui::ComboBox::from_id_salt(("light_kind", index))
                    .selected_text(light.kind.label())
                    .show_ui(ui, |ui| {
                        for kind in [LightKind::Directional, LightKind::Point, LightKind::Spot] {
                            ui.selectable_value(&mut light.kind, kind, kind.label());
                        }
                    });
                let direction = drag_vec3(ui, "Direction", light.direction.to_array(), 0.01);
                if let Some(position) = drag_vec3(ui, "Position", light.position.to_array(), 0.05) {
                    light.position = position;
                }
                ui.add(
                    egui::DragValue::new(&mut light.range)
                        .prefix("Range: ")
                        .speed(0.1)
                        .range(0.0..=1000.0),
                );
                ui.add(
                    egui::DragValue::new(&mut light.intensity)
                        .prefix("Intensity: ")
                        .speed(0.01)
                        .range(0.0..=100.0),
                );
                ui.add(
                    egui::DragValue::new(&mut light.spot_falloff)
                        .prefix("Spot falloff: ")
                        .speed(0.1)
                        .range(0.0..=256.0),
                );
                let mut color = light.color.to_array();
                ui.horizontal(|ui| {
                    ui.label("Color");
                    if ui.color_edit_button_rgb(&mut color).changed() {
                        light.color = Vec3::from_array(color);
                    }
                });

                if light != before {
                    if let Some(slot) = lights.get_mut(index) {
                        *slot = light;
                    }
                }
                if let Some(direction) = direction {
                    lights.set_direction(index, direction);
                }
            });
    }

    if let Some(texture) = shadow_preview {
        ui.label("Shadow map");
        ui.add(egui::Image::new(egui::load::SizedTexture::new(
            texture,
            egui::vec2(SHADOW_PREVIEW_SIZE, SHADOW_PREVIEW_SIZE),
        )));
    }
}

fn post_section(ui: &mut egui::Ui, orchestrator: &mut FrameOrchestrator) {
    let mut enabled = orchestrator.config().post_process;
    if ui.checkbox(&mut enabled, "Blur").changed() {
        orchestrator.set_post_process(enabled);
    }
    let mut radius = orchestrator.config().blur_radius;
    if ui
        .add(egui::Slider::new(&mut radius, 0..=MAX_BLUR_RADIUS).text("Blur radius"))
        .changed()
    {
        orchestrator.set_blur_radius(radius);
    }
}

/// Three labelled drag fields. Returns the new value if any field moved.
fn drag_vec3(ui: &mut egui::Ui, label: &str, value: [f32; 3], speed: f64) -> Option<Vec3> {
    let mut v = value;
    let mut changed = false;
    ui.label(label);
    ui.horizontal(|ui| {
        for (prefix, component) in ["X: ", "Y: ", "Z: "].into_iter().zip(v.iter_mut()) {
            changed |= ui
                .add(egui::DragValue::new(component).prefix(prefix).speed(speed))
                .changed();
        }
    });
    changed.then(|| Vec3::from_array(v))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_carries_size_and_rate() {
        let title = title_text(&WindowInfo {
            width: 1280,
            height: 720,
            fps: 125.0,
        });
        assert!(title.starts_with("Prism"));
        assert!(title.contains("Width: 1280"));
        assert!(title.contains("Height: 720"));
        assert!(title.contains("FPS: 125"));
        assert!(title.contains("Frame Time: 8.00ms"));
    }

    #[test]
    fn title_survives_first_frame() {
        let title = title_text(&WindowInfo {
            width: 1,
            height: 1,
            fps: 0.0,
        });
        assert!(title.contains("Frame Time: 0.00ms"));
    }
}

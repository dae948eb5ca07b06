use glam::{Vec3, Vec4};
use prism_common::SpatialTransform;
use prism_render::{FrameConfig, LightKind, Scene};
use serde::Serialize;
use std::fmt;

/// Scene inspector for developer tooling.
///
/// Read-only queries return plain snapshots the UI or the CLI can render;
/// [`EntityEdit`] carries changes back in.
pub struct SceneInspector;

impl SceneInspector {
    /// Produce a summary of the scene and the frame settings.
    pub fn summary(scene: &Scene, config: &FrameConfig) -> SceneSummary {
        SceneSummary {
            entity_count: scene.entities().len(),
            camera_count: scene.cameras().len(),
            active_camera: scene.active_camera_index(),
            light_count: scene.lights().len(),
            has_sky: scene.sky().is_some(),
            vsync: config.vsync,
            post_process: config.post_process,
            blur_radius: config.blur_radius,
        }
    }

    pub fn inspect_entity(scene: &Scene, index: usize) -> Option<EntityInfo> {
        let entity = scene.entities().get(index)?;
        let material = entity.material().borrow();
        Some(EntityInfo {
            index,
            name: entity.name().to_string(),
            material: material.name().to_string(),
            transform: TransformInfo::from(entity.transform()),
            color_tint: material.color_tint().to_array(),
            roughness: material.roughness(),
            index_count: entity.mesh().index_count(),
        })
    }

    /// Entity names in draw order.
    pub fn list_entities(scene: &Scene) -> Vec<String> {
        scene
            .entities()
            .iter()
            .map(|e| e.name().to_string())
            .collect()
    }

    pub fn camera_info(scene: &Scene, index: usize) -> Option<CameraInfo> {
        let camera = scene.cameras().get(index)?;
        Some(CameraInfo {
            index,
            active: index == scene.active_camera_index(),
            transform: TransformInfo::from(camera.transform()),
            field_of_view: camera.field_of_view(),
            move_speed: camera.move_speed(),
            rotation_speed: camera.rotation_speed(),
        })
    }

    pub fn light_info(scene: &Scene, index: usize) -> Option<LightInfo> {
        let light = scene.lights().get(index)?;
        Some(LightInfo {
            index,
            kind: light.kind,
            direction: light.direction.to_array(),
            range: light.range,
            position: light.position.to_array(),
            intensity: light.intensity,
            color: light.color.to_array(),
            spot_falloff: light.spot_falloff,
            casts_shadow: index == scene.lights().shadow_caster(),
        })
    }

    /// Apply an edit to one entity. Returns false for an unknown index.
    pub fn apply_entity_edit(scene: &mut Scene, index: usize, edit: &EntityEdit) -> bool {
        let Some(entity) = scene.entity_mut(index) else {
            return false;
        };
        let transform = entity.transform_mut();
        if let Some(p) = edit.position {
            transform.set_position_vec(p);
        }
        if let Some(r) = edit.rotation {
            transform.set_rotation_vec(r);
        }
        if let Some(s) = edit.scale {
            transform.set_scale_vec(s);
        }
        if edit.color_tint.is_some() || edit.roughness.is_some() {
            let mut material = entity.material().borrow_mut();
            if let Some(tint) = edit.color_tint {
                material.set_color_tint(tint);
            }
            if let Some(roughness) = edit.roughness {
                material.set_roughness(roughness.clamp(0.0, 1.0));
            }
        }
        tracing::debug!(index, ?edit, "entity edited");
        true
    }
}

/// Summary of scene state for the inspector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneSummary {
    pub entity_count: usize,
    pub camera_count: usize,
    pub active_camera: usize,
    pub light_count: usize,
    pub has_sky: bool,
    pub vsync: bool,
    pub post_process: bool,
    pub blur_radius: i32,
}

impl fmt::Display for SceneSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Scene: entities={} cameras={} (active {}) lights={} sky={} vsync={} blur={}",
            self.entity_count,
            self.camera_count,
            self.active_camera,
            self.light_count,
            self.has_sky,
            self.vsync,
            if self.post_process {
                self.blur_radius.to_string()
            } else {
                "off".to_string()
            },
        )
    }
}

/// Position, pitch/yaw/roll in radians, and scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TransformInfo {
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    pub scale: [f32; 3],
}

impl From<&SpatialTransform> for TransformInfo {
    fn from(t: &SpatialTransform) -> Self {
        Self {
            position: t.position().to_array(),
            rotation: t.pitch_yaw_roll().to_array(),
            scale: t.scale_factors().to_array(),
        }
    }
}

impl fmt::Display for TransformInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [px, py, pz] = self.position;
        let [rx, ry, rz] = self.rotation;
        let [sx, sy, sz] = self.scale;
        write!(
            f,
            "pos=({px:.2}, {py:.2}, {pz:.2}) rot=({rx:.2}, {ry:.2}, {rz:.2}) scale=({sx:.2}, {sy:.2}, {sz:.2})"
        )
    }
}

/// Detailed info about a single entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityInfo {
    pub index: usize,
    pub name: String,
    pub material: String,
    pub transform: TransformInfo,
    pub color_tint: [f32; 4],
    pub roughness: f32,
    pub index_count: u32,
}

impl fmt::Display for EntityInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Entity [{}] {} ({}) {} roughness={:.2} indices={}",
            self.index, self.name, self.material, self.transform, self.roughness, self.index_count
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CameraInfo {
    pub index: usize,
    pub active: bool,
    pub transform: TransformInfo,
    pub field_of_view: f32,
    pub move_speed: f32,
    pub rotation_speed: f32,
}

impl fmt::Display for CameraInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Camera [{}]{} {} fov={:.1}deg",
            self.index,
            if self.active { "*" } else { "" },
            self.transform,
            self.field_of_view.to_degrees()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LightInfo {
    pub index: usize,
    pub kind: LightKind,
    pub direction: [f32; 3],
    pub range: f32,
    pub position: [f32; 3],
    pub intensity: f32,
    pub color: [f32; 3],
    pub spot_falloff: f32,
    pub casts_shadow: bool,
}

impl fmt::Display for LightInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [dx, dy, dz] = self.direction;
        let [r, g, b] = self.color;
        write!(
            f,
            "Light [{}] {} dir=({dx:.2}, {dy:.2}, {dz:.2}) color=({r:.2}, {g:.2}, {b:.2}) intensity={:.2}{}",
            self.index,
            self.kind.label(),
            self.intensity,
            if self.casts_shadow { " shadow" } else { "" }
        )
    }
}

/// Changes to one entity; `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityEdit {
    pub position: Option<Vec3>,
    pub rotation: Option<Vec3>,
    pub scale: Option<Vec3>,
    pub color_tint: Option<Vec4>,
    pub roughness: Option<f32>,
}

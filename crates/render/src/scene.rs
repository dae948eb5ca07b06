use crate::camera::Camera;
use crate::entity::Entity;
use crate::error::RenderError;
use crate::light::LightSet;
use crate::sky::Sky;
use prism_input::InputState;

/// Everything drawn in a frame: entities, cameras, sky and lights.
#[derive(Debug)]
pub struct Scene {
    entities: Vec<Entity>,
    cameras: Vec<Camera>,
    active_camera: usize,
    sky: Option<Sky>,
    lights: LightSet,
}

impl Scene {
    /// A scene needs at least one camera; the first one starts active.
    pub fn new(cameras: Vec<Camera>) -> Result<Self, RenderError> {
        if cameras.is_empty() {
            return Err(RenderError::NoCameras);
        }
        Ok(Self {
            entities: Vec::new(),
            cameras,
            active_camera: 0,
            sky: None,
            lights: LightSet::default(),
        })
    }

    pub fn add_entity(&mut self, entity: Entity) -> usize {
        self.entities.push(entity);
        self.entities.len() - 1
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entities_mut(&mut self) -> &mut [Entity] {
        &mut self.entities
    }

    pub fn entity_mut(&mut self, index: usize) -> Option<&mut Entity> {
        self.entities.get_mut(index)
    }

    pub fn cameras(&self) -> &[Camera] {
        &self.cameras
    }

    pub fn cameras_mut(&mut self) -> &mut [Camera] {
        &mut self.cameras
    }

    pub fn active_camera_index(&self) -> usize {
        self.active_camera
    }

    pub fn active_camera(&self) -> &Camera {
        &self.cameras[self.active_camera]
    }

    pub fn active_camera_mut(&mut self) -> &mut Camera {
        &mut self.cameras[self.active_camera]
    }

    /// Activate the next camera, wrapping to the first.
    pub fn select_next_camera(&mut self) {
        self.active_camera = (self.active_camera + 1) % self.cameras.len();
    }

    /// Activate the previous camera, wrapping to the last.
    pub fn select_previous_camera(&mut self) {
        let n = self.cameras.len();
        self.active_camera = (self.active_camera + n - 1) % n;
    }

    pub fn sky(&self) -> Option<&Sky> {
        self.sky.as_ref()
    }

    pub fn set_sky(&mut self, sky: Sky) {
        self.sky = Some(sky);
    }

    pub fn lights(&self) -> &LightSet {
        &self.lights
    }

    pub fn lights_mut(&mut self) -> &mut LightSet {
        &mut self.lights
    }

    pub fn set_lights(&mut self, lights: LightSet) {
        self.lights = lights;
    }

    /// Drive the active camera from this frame's input.
    pub fn update(&mut self, dt: f32, input: &InputState) {
        self.active_camera_mut().update(dt, input);
    }

    /// Rebuild every camera's projection for a new surface aspect ratio.
    pub fn update_projections(&mut self, aspect_ratio: f32) {
        for camera in &mut self.cameras {
            camera.update_projection_matrix(aspect_ratio);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn cameras(n: usize) -> Vec<Camera> {
        (0..n)
            .map(|i| Camera::new(Vec3::new(i as f32, 0.0, 0.0), 5.0, 0.01, 1.0, 1.0))
            .collect()
    }

    #[test]
    fn empty_camera_list_is_rejected() {
        assert!(matches!(Scene::new(Vec::new()), Err(RenderError::NoCameras)));
    }

    #[test]
    fn next_wraps_with_two_cameras() {
        let mut scene = Scene::new(cameras(2)).unwrap();
        scene.select_next_camera();
        assert_eq!(scene.active_camera_index(), 1);
        scene.select_next_camera();
        assert_eq!(scene.active_camera_index(), 0);
    }

    #[test]
    fn previous_wraps_with_five_cameras() {
        let mut scene = Scene::new(cameras(5)).unwrap();
        scene.select_previous_camera();
        assert_eq!(scene.active_camera_index(), 4);
        for _ in 0..4 {
            scene.select_previous_camera();
        }
        assert_eq!(scene.active_camera_index(), 0);
    }

    #[test]
    fn single_camera_stays_selected() {
        let mut scene = Scene::new(cameras(1)).unwrap();
        scene.select_next_camera();
        scene.select_previous_camera();
        assert_eq!(scene.active_camera_index(), 0);
    }

    #[test]
    fn update_projections_touches_every_camera() {
        let mut scene = Scene::new(cameras(3)).unwrap();
        let before: Vec<_> = scene.cameras().iter().map(Camera::projection).collect();
        scene.update_projections(2.0);
        for (cam, old) in scene.cameras().iter().zip(before) {
            assert_ne!(cam.projection(), old);
        }
    }

    #[test]
    fn update_moves_only_active_camera() {
        let mut scene = Scene::new(cameras(2)).unwrap();
        scene.select_next_camera();
        let mut input = InputState::new();
        input.press(prism_input::Key::W);
        scene.update(1.0, &input);
        assert_eq!(scene.cameras()[0].position(), Vec3::ZERO);
        assert_eq!(scene.cameras()[1].position(), Vec3::new(1.0, 0.0, 5.0));
    }
}

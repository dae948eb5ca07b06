use crate::device::{RenderDevice, SamplerId, TextureId};
use crate::shader::SimpleShader;
use glam::Vec4;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Material handle shared between entities. Edits are seen by every user.
pub type SharedMaterial = Rc<RefCell<Material>>;

/// Surface appearance: tint, roughness, a program pair and named resources.
///
/// Resources are keyed by the name the pixel program declares them under.
/// A program slot with no matching entry stays whatever was bound last.
#[derive(Debug, Clone)]
pub struct Material {
    name: String,
    color_tint: Vec4,
    roughness: f32,
    vertex_shader: Rc<SimpleShader>,
    pixel_shader: Rc<SimpleShader>,
    textures: BTreeMap<String, TextureId>,
    samplers: BTreeMap<String, SamplerId>,
}

impl Material {
    pub fn new(
        name: impl Into<String>,
        color_tint: Vec4,
        roughness: f32,
        vertex_shader: Rc<SimpleShader>,
        pixel_shader: Rc<SimpleShader>,
    ) -> Self {
        Self {
            name: name.into(),
            color_tint,
            roughness,
            vertex_shader,
            pixel_shader,
            textures: BTreeMap::new(),
            samplers: BTreeMap::new(),
        }
    }

    pub fn into_shared(self) -> SharedMaterial {
        Rc::new(RefCell::new(self))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn color_tint(&self) -> Vec4 {
        self.color_tint
    }

    pub fn set_color_tint(&mut self, tint: Vec4) {
        self.color_tint = tint;
    }

    pub fn roughness(&self) -> f32 {
        self.roughness
    }

    pub fn set_roughness(&mut self, roughness: f32) {
        self.roughness = roughness;
    }

    pub fn vertex_shader(&self) -> Rc<SimpleShader> {
        Rc::clone(&self.vertex_shader)
    }

    pub fn set_vertex_shader(&mut self, shader: Rc<SimpleShader>) {
        self.vertex_shader = shader;
    }

    pub fn pixel_shader(&self) -> Rc<SimpleShader> {
        Rc::clone(&self.pixel_shader)
    }

    pub fn set_pixel_shader(&mut self, shader: Rc<SimpleShader>) {
        self.pixel_shader = shader;
    }

    /// Store a texture under `name`. Replaces any earlier entry.
    pub fn add_texture_srv(&mut self, name: impl Into<String>, texture: TextureId) {
        self.textures.insert(name.into(), texture);
    }

    pub fn add_sampler(&mut self, name: impl Into<String>, sampler: SamplerId) {
        self.samplers.insert(name.into(), sampler);
    }

    pub fn textures(&self) -> &BTreeMap<String, TextureId> {
        &self.textures
    }

    pub fn samplers(&self) -> &BTreeMap<String, SamplerId> {
        &self.samplers
    }

    /// Bind every stored texture and sampler on the pixel program.
    pub fn prepare_material(&self, device: &mut dyn RenderDevice) {
        for (name, texture) in &self.textures {
            self.pixel_shader
                .set_shader_resource_view(device, name, Some(*texture));
        }
        for (name, sampler) in &self.samplers {
            self.pixel_shader.set_sampler_state(device, name, *sampler);
        }
    }
}

//! Packing of named shader parameters into the fixed uniform layouts the
//! WGSL programs declare.
//!
//! Parameters a program does not declare are ignored; declared parameters
//! that were never staged stay zeroed, except matrices, which default to
//! identity.

use crate::shaders::Program;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};
use prism_render::{GpuLight, ParameterBlock, ShaderValue};

/// Lights the lit program reads. Extra staged lights are dropped.
pub const MAX_LIGHTS: usize = 8;

type Matrix = [[f32; 4]; 4];

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct LitVertexUniforms {
    pub world: Matrix,
    pub world_inv_transpose: Matrix,
    pub view: Matrix,
    pub projection: Matrix,
    pub light_view: Matrix,
    pub light_projection: Matrix,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct LitPixelUniforms {
    pub color_tint: [f32; 4],
    pub camera_position: [f32; 3],
    pub roughness: f32,
    pub ambient: [f32; 3],
    pub time: f32,
    pub light_count: i32,
    pub padding: [i32; 3],
    pub lights: [GpuLight; MAX_LIGHTS],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct ShadowUniforms {
    pub world: Matrix,
    pub view: Matrix,
    pub projection: Matrix,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct SkyUniforms {
    pub view: Matrix,
    pub projection: Matrix,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct BlurUniforms {
    pub blur_radius: i32,
    pub pixel_width: f32,
    pub pixel_height: f32,
    pub padding: f32,
}

/// Typed reads from a parameter block. A wrong-typed value reads as absent.
struct Params<'a>(&'a ParameterBlock);

impl Params<'_> {
    fn matrix(&self, name: &str) -> Matrix {
        match self.0.get(name) {
            Some(ShaderValue::Matrix(m)) => m.to_cols_array_2d(),
            _ => Mat4::IDENTITY.to_cols_array_2d(),
        }
    }

    fn float(&self, name: &str) -> f32 {
        match self.0.get(name) {
            Some(ShaderValue::Float(v)) => *v,
            _ => 0.0,
        }
    }

    fn float3(&self, name: &str) -> [f32; 3] {
        match self.0.get(name) {
            Some(ShaderValue::Float3(v)) => v.to_array(),
            _ => Vec3::ZERO.to_array(),
        }
    }

    fn float4(&self, name: &str) -> [f32; 4] {
        match self.0.get(name) {
            Some(ShaderValue::Float4(v)) => v.to_array(),
            _ => Vec4::ZERO.to_array(),
        }
    }

    fn int(&self, name: &str) -> i32 {
        match self.0.get(name) {
            Some(ShaderValue::Int(v)) => *v,
            _ => 0,
        }
    }

    fn data(&self, name: &str) -> &[u8] {
        match self.0.get(name) {
            Some(ShaderValue::Data(bytes)) => bytes,
            _ => &[],
        }
    }
}

fn lights(bytes: &[u8]) -> [GpuLight; MAX_LIGHTS] {
    let mut lights = [GpuLight::zeroed(); MAX_LIGHTS];
    let dst = bytemuck::bytes_of_mut(&mut lights);
    let len = bytes.len().min(dst.len());
    dst[..len].copy_from_slice(&bytes[..len]);
    lights
}

/// Vertex-stage uniform bytes for a draw, if the program has any.
pub fn vertex_bytes(program: Program, block: &ParameterBlock) -> Option<Vec<u8>> {
    let p = Params(block);
    match program {
        Program::Lit => Some(bytemuck::bytes_of(&LitVertexUniforms {
            world: p.matrix("world"),
            world_inv_transpose: p.matrix("worldInvTranspose"),
            view: p.matrix("view"),
            projection: p.matrix("projection"),
            light_view: p.matrix("lightView"),
            light_projection: p.matrix("lightProjection"),
        })
        .to_vec()),
        Program::Shadow => Some(bytemuck::bytes_of(&ShadowUniforms {
            world: p.matrix("world"),
            view: p.matrix("view"),
            projection: p.matrix("projection"),
        })
        .to_vec()),
        Program::Sky => Some(bytemuck::bytes_of(&SkyUniforms {
            view: p.matrix("view"),
            projection: p.matrix("projection"),
        })
        .to_vec()),
        Program::Blur => None,
    }
}

/// Pixel-stage uniform bytes for a draw, if the program has any.
pub fn pixel_bytes(program: Program, block: &ParameterBlock) -> Option<Vec<u8>> {
    let p = Params(block);
    match program {
        Program::Lit => Some(bytemuck::bytes_of(&LitPixelUniforms {
            color_tint: p.float4("colorTint"),
            camera_position: p.float3("cameraPosition"),
            roughness: p.float("roughness"),
            ambient: p.float3("ambient"),
            time: p.float("time"),
            light_count: p.int("lightCount").clamp(0, MAX_LIGHTS as i32),
            padding: [0; 3],
            lights: lights(p.data("lights")),
        })
        .to_vec()),
        Program::Blur => Some(bytemuck::bytes_of(&BlurUniforms {
            blur_radius: p.int("blurRadius"),
            pixel_width: p.float("pixelWidth"),
            pixel_height: p.float("pixelHeight"),
            padding: 0.0,
        })
        .to_vec()),
        Program::Shadow | Program::Sky => None,
    }
}

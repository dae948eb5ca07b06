use prism_render::ShaderStage;
use prism_render::shader::programs;

/// A compiled WGSL module and the bind group layout its stages share.
///
/// Named programs resolve to a family plus a stage; a vertex program decides
/// the family of a draw and its pixel program must belong to the same one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Program {
    Lit,
    Shadow,
    Sky,
    Blur,
}

/// What a texture binding expects to sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureSlot {
    Color,
    Depth,
    Cube,
}

impl TextureSlot {
    pub fn label(self) -> &'static str {
        match self {
            TextureSlot::Color => "2D color texture",
            TextureSlot::Depth => "depth texture",
            TextureSlot::Cube => "cube texture",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    VertexUniforms,
    PixelUniforms,
    Texture(TextureSlot),
    Sampler { comparison: bool },
}

/// One entry of a family's bind group. The binding index is its position.
#[derive(Debug, Clone, Copy)]
pub struct Binding {
    pub name: &'static str,
    pub kind: BindingKind,
}

const fn binding(name: &'static str, kind: BindingKind) -> Binding {
    Binding { name, kind }
}

const LIT_BINDINGS: [Binding; 9] = [
    binding("vertex", BindingKind::VertexUniforms),
    binding("pixel", BindingKind::PixelUniforms),
    binding("Albedo", BindingKind::Texture(TextureSlot::Color)),
    binding("NormalMap", BindingKind::Texture(TextureSlot::Color)),
    binding("RoughnessMap", BindingKind::Texture(TextureSlot::Color)),
    binding("MetalnessMap", BindingKind::Texture(TextureSlot::Color)),
    binding("ShadowMap", BindingKind::Texture(TextureSlot::Depth)),
    binding("BasicSampler", BindingKind::Sampler { comparison: false }),
    binding("ShadowSampler", BindingKind::Sampler { comparison: true }),
];

const SHADOW_BINDINGS: [Binding; 1] = [binding("vertex", BindingKind::VertexUniforms)];

const SKY_BINDINGS: [Binding; 3] = [
    binding("vertex", BindingKind::VertexUniforms),
    binding("CubeMap", BindingKind::Texture(TextureSlot::Cube)),
    binding("BasicSampler", BindingKind::Sampler { comparison: false }),
];

const BLUR_BINDINGS: [Binding; 3] = [
    binding("pixel", BindingKind::PixelUniforms),
    binding("Pixels", BindingKind::Texture(TextureSlot::Color)),
    binding("ClampSampler", BindingKind::Sampler { comparison: false }),
];

impl Program {
    pub const ALL: [Program; 4] = [Program::Lit, Program::Shadow, Program::Sky, Program::Blur];

    /// Family and stage of a named program.
    pub fn resolve(name: &str) -> Option<(Program, ShaderStage)> {
        match name {
            programs::LIT_VS => Some((Program::Lit, ShaderStage::Vertex)),
            programs::LIT_PS => Some((Program::Lit, ShaderStage::Pixel)),
            programs::SHADOW_VS => Some((Program::Shadow, ShaderStage::Vertex)),
            programs::SKY_VS => Some((Program::Sky, ShaderStage::Vertex)),
            programs::SKY_PS => Some((Program::Sky, ShaderStage::Pixel)),
            programs::FULLSCREEN_VS => Some((Program::Blur, ShaderStage::Vertex)),
            programs::BLUR_PS => Some((Program::Blur, ShaderStage::Pixel)),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Program::Lit => "lit",
            Program::Shadow => "shadow",
            Program::Sky => "sky",
            Program::Blur => "blur",
        }
    }

    pub fn source(self) -> &'static str {
        match self {
            Program::Lit => LIT_SHADER,
            Program::Shadow => SHADOW_SHADER,
            Program::Sky => SKY_SHADER,
            Program::Blur => BLUR_SHADER,
        }
    }

    pub fn has_fragment(self) -> bool {
        !matches!(self, Program::Shadow)
    }

    /// The fullscreen blur generates its own vertices.
    pub fn uses_mesh(self) -> bool {
        !matches!(self, Program::Blur)
    }

    pub fn bindings(self) -> &'static [Binding] {
        match self {
            Program::Lit => &LIT_BINDINGS,
            Program::Shadow => &SHADOW_BINDINGS,
            Program::Sky => &SKY_BINDINGS,
            Program::Blur => &BLUR_BINDINGS,
        }
    }
}

/// Shadowed, normal-mapped physically based lighting.
pub const LIT_SHADER: &str = r#"
const PI: f32 = 3.14159265;
const MAX_LIGHTS: i32 = 8;
const LIGHT_DIRECTIONAL: u32 = 0u;
const LIGHT_POINT: u32 = 1u;
const LIGHT_SPOT: u32 = 2u;
const MIN_ROUGHNESS: f32 = 0.0000001;
const DIELECTRIC_F0: f32 = 0.04;

struct VertexUniforms {
    world: mat4x4<f32>,
    world_inv_transpose: mat4x4<f32>,
    view: mat4x4<f32>,
    projection: mat4x4<f32>,
    light_view: mat4x4<f32>,
    light_projection: mat4x4<f32>,
};

// x of each row carries a scalar, yzw a vector; kind is stored as bits
struct Light {
    kind_direction: vec4<f32>,
    range_position: vec4<f32>,
    intensity_color: vec4<f32>,
    spot_falloff: vec4<f32>,
};

struct PixelUniforms {
    color_tint: vec4<f32>,
    camera_position: vec3<f32>,
    roughness: f32,
    ambient: vec3<f32>,
    time: f32,
    light_count: i32,
    pad0: i32,
    pad1: i32,
    pad2: i32,
    lights: array<Light, 8>,
};

@group(0) @binding(0) var<uniform> object: VertexUniforms;
@group(0) @binding(1) var<uniform> surface: PixelUniforms;
@group(0) @binding(2) var albedo_map: texture_2d<f32>;
@group(0) @binding(3) var normal_map: texture_2d<f32>;
@group(0) @binding(4) var roughness_map: texture_2d<f32>;
@group(0) @binding(5) var metalness_map: texture_2d<f32>;
@group(0) @binding(6) var shadow_map: texture_depth_2d;
@group(0) @binding(7) var basic_sampler: sampler;
@group(0) @binding(8) var shadow_sampler: sampler_comparison;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
    @location(3) tangent: vec3<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) tangent: vec3<f32>,
    @location(3) uv: vec2<f32>,
    @location(4) shadow_position: vec4<f32>,
};

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    let world_position = object.world * vec4<f32>(in.position, 1.0);
    var out: VertexOutput;
    out.clip_position = object.projection * object.view * world_position;
    out.world_position = world_position.xyz;
    out.normal = normalize((object.world_inv_transpose * vec4<f32>(in.normal, 0.0)).xyz);
    out.tangent = normalize((object.world * vec4<f32>(in.tangent, 0.0)).xyz);
    out.uv = in.uv;
    out.shadow_position = object.light_projection * object.light_view * world_position;
    return out;
}

fn distribution_ggx(n: vec3<f32>, h: vec3<f32>, roughness: f32) -> f32 {
    let a = max(roughness * roughness, MIN_ROUGHNESS);
    let a2 = a * a;
    let n_dot_h = saturate(dot(n, h));
    let denom = n_dot_h * n_dot_h * (a2 - 1.0) + 1.0;
    return a2 / (PI * denom * denom);
}

fn fresnel_schlick(v: vec3<f32>, h: vec3<f32>, f0: vec3<f32>) -> vec3<f32> {
    let v_dot_h = saturate(dot(v, h));
    return f0 + (vec3<f32>(1.0) - f0) * pow(1.0 - v_dot_h, 5.0);
}

fn geometry_schlick_ggx(n: vec3<f32>, v: vec3<f32>, roughness: f32) -> f32 {
    let k = pow(roughness + 1.0, 2.0) / 8.0;
    let n_dot_v = saturate(dot(n, v));
    return n_dot_v / max(n_dot_v * (1.0 - k) + k, 0.00001);
}

// to_light points from the surface toward the light
fn shade(
    to_light: vec3<f32>,
    radiance: vec3<f32>,
    n: vec3<f32>,
    v: vec3<f32>,
    albedo: vec3<f32>,
    roughness: f32,
    metalness: f32,
) -> vec3<f32> {
    let h = normalize(to_light + v);
    let n_dot_l = saturate(dot(n, to_light));
    let f0 = mix(vec3<f32>(DIELECTRIC_F0), albedo, metalness);
    let f = fresnel_schlick(v, h, f0);
    let d = distribution_ggx(n, h, roughness);
    let g = geometry_schlick_ggx(n, v, roughness) * geometry_schlick_ggx(n, to_light, roughness);
    let specular = d * f * g / max(4.0 * saturate(dot(n, v)) * n_dot_l, 0.0001);
    let diffuse = albedo * (vec3<f32>(1.0) - f) * (1.0 - metalness);
    return (diffuse + specular) * n_dot_l * radiance;
}

fn attenuate(light: Light, world_position: vec3<f32>) -> f32 {
    let range = max(light.range_position.x, 0.0001);
    let dist = distance(light.range_position.yzw, world_position);
    let falloff = saturate(1.0 - (dist * dist) / (range * range));
    return falloff * falloff;
}

fn shadow_factor(shadow_position: vec4<f32>) -> f32 {
    let ndc = shadow_position.xyz / shadow_position.w;
    let uv = ndc.xy * vec2<f32>(0.5, -0.5) + vec2<f32>(0.5, 0.5);
    // outside the shadow volume counts as lit
    if any(uv < vec2<f32>(0.0)) || any(uv > vec2<f32>(1.0)) || ndc.z > 1.0 {
        return 1.0;
    }
    return textureSampleCompareLevel(shadow_map, shadow_sampler, uv, ndc.z);
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let albedo = textureSample(albedo_map, basic_sampler, in.uv).rgb * surface.color_tint.rgb;
    let packed_normal = textureSample(normal_map, basic_sampler, in.uv).rgb;
    let roughness = textureSample(roughness_map, basic_sampler, in.uv).r;
    let metalness = textureSample(metalness_map, basic_sampler, in.uv).r;

    let n = normalize(in.normal);
    let t = normalize(in.tangent - n * dot(in.tangent, n));
    let b = cross(t, n);
    let normal = normalize(mat3x3<f32>(t, b, n) * (packed_normal * 2.0 - 1.0));
    let v = normalize(surface.camera_position - in.world_position);

    let shadow = shadow_factor(in.shadow_position);
    var color = surface.ambient * albedo;
    let count = min(surface.light_count, MAX_LIGHTS);
    for (var i = 0; i < count; i++) {
        let light = surface.lights[i];
        let kind = bitcast<u32>(light.kind_direction.x);
        let radiance = light.intensity_color.yzw * light.intensity_color.x;
        var lit = vec3<f32>(0.0);
        if kind == LIGHT_DIRECTIONAL {
            let to_light = normalize(-light.kind_direction.yzw);
            lit = shade(to_light, radiance, normal, v, albedo, roughness, metalness);
            // only the first light casts the shadow
            if i == 0 {
                lit *= shadow;
            }
        } else if kind == LIGHT_POINT {
            let to_light = normalize(light.range_position.yzw - in.world_position);
            lit = shade(to_light, radiance, normal, v, albedo, roughness, metalness)
                * attenuate(light, in.world_position);
        } else if kind == LIGHT_SPOT {
            let to_light = normalize(light.range_position.yzw - in.world_position);
            let cone = pow(saturate(dot(-to_light, normalize(light.kind_direction.yzw))),
                light.spot_falloff.x);
            lit = shade(to_light, radiance, normal, v, albedo, roughness, metalness)
                * attenuate(light, in.world_position) * cone;
        }
        color += lit;
    }
    return vec4<f32>(color, surface.color_tint.a);
}
"#;

/// Depth-only pass from the shadow-casting light.
pub const SHADOW_SHADER: &str = r#"
struct ShadowUniforms {
    world: mat4x4<f32>,
    view: mat4x4<f32>,
    projection: mat4x4<f32>,
};

@group(0) @binding(0) var<uniform> shadow: ShadowUniforms;

@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return shadow.projection * shadow.view * shadow.world * vec4<f32>(position, 1.0);
}
"#;

/// Cube-mapped sky pinned to the far plane around the camera.
pub const SKY_SHADER: &str = r#"
struct SkyUniforms {
    view: mat4x4<f32>,
    projection: mat4x4<f32>,
};

@group(0) @binding(0) var<uniform> sky: SkyUniforms;
@group(0) @binding(1) var cube_map: texture_cube<f32>;
@group(0) @binding(2) var basic_sampler: sampler;

struct SkyOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) direction: vec3<f32>,
};

@vertex
fn vs_main(@location(0) position: vec3<f32>) -> SkyOutput {
    var view = sky.view;
    view[3] = vec4<f32>(0.0, 0.0, 0.0, 1.0);
    let clip = sky.projection * view * vec4<f32>(position, 1.0);
    var out: SkyOutput;
    // z = w lands every sky fragment at depth 1.0
    out.clip_position = clip.xyww;
    out.direction = position;
    return out;
}

@fragment
fn fs_main(in: SkyOutput) -> @location(0) vec4<f32> {
    return textureSample(cube_map, basic_sampler, in.direction);
}
"#;

/// Fullscreen triangle and box blur of the offscreen scene color.
pub const BLUR_SHADER: &str = r#"
struct BlurUniforms {
    blur_radius: i32,
    pixel_width: f32,
    pixel_height: f32,
    pad0: f32,
};

@group(0) @binding(0) var<uniform> blur: BlurUniforms;
@group(0) @binding(1) var pixels: texture_2d<f32>;
@group(0) @binding(2) var clamp_sampler: sampler;

struct FullscreenOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> FullscreenOutput {
    let uv = vec2<f32>(f32((index << 1u) & 2u), f32(index & 2u));
    var out: FullscreenOutput;
    out.position = vec4<f32>(uv * vec2<f32>(2.0, -2.0) + vec2<f32>(-1.0, 1.0), 0.0, 1.0);
    out.uv = uv;
    return out;
}

@fragment
fn fs_main(in: FullscreenOutput) -> @location(0) vec4<f32> {
    var total = vec4<f32>(0.0);
    var samples = 0.0;
    for (var x = -blur.blur_radius; x <= blur.blur_radius; x++) {
        for (var y = -blur.blur_radius; y <= blur.blur_radius; y++) {
            let offset = vec2<f32>(f32(x) * blur.pixel_width, f32(y) * blur.pixel_height);
            total += textureSampleLevel(pixels, clamp_sampler, in.uv + offset, 0.0);
            samples += 1.0;
        }
    }
    return total / samples;
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_named_program_resolves() {
        for name in programs::ALL {
            assert!(Program::resolve(name).is_some(), "{name} unresolved");
        }
        assert!(Program::resolve("toon_ps").is_none());
    }

    #[test]
    fn stages_match_names() {
        assert_eq!(
            Program::resolve(programs::SHADOW_VS),
            Some((Program::Shadow, ShaderStage::Vertex))
        );
        assert_eq!(
            Program::resolve(programs::BLUR_PS),
            Some((Program::Blur, ShaderStage::Pixel))
        );
    }

    #[test]
    fn shader_bindings_are_declared_in_source() {
        for program in Program::ALL {
            let source = program.source();
            for index in 0..program.bindings().len() {
                let decl = format!("@binding({index})");
                assert!(source.contains(&decl), "{} lacks {decl}", program.label());
            }
            assert!(source.contains("fn vs_main"));
            assert_eq!(source.contains("fn fs_main"), program.has_fragment());
        }
    }
}

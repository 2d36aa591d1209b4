/// Scene constants and fog shared by the scene and particle shaders.
pub const SCENE_PRELUDE: &str = r#"
struct Scene {
    view_proj: mat4x4<f32>,
    camera_position: vec4<f32>,
    camera_forward: vec4<f32>,
    camera_right: vec4<f32>,
    camera_up: vec4<f32>,
    fog_color: vec4<f32>,
    fog_params: vec4<f32>,
    light_direction: vec4<f32>,
    light_params: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> scene: Scene;

// Linear fog over view depth, optionally thickened by an exp2 term.
fn fog_factor(world_position: vec3<f32>) -> f32 {
    let depth = dot(world_position - scene.camera_position.xyz, scene.camera_forward.xyz);
    let near = scene.fog_params.x;
    let far = scene.fog_params.y;
    let density = scene.fog_params.z;
    let linear_fog = smoothstep(near, far, depth);
    let exp_fog = 1.0 - exp(-density * density * depth * depth);
    return clamp(max(linear_fog, exp_fog) * scene.fog_color.a, 0.0, 1.0);
}

fn apply_fog(color: vec3<f32>, world_position: vec3<f32>) -> vec3<f32> {
    return mix(color, scene.fog_color.rgb, fog_factor(world_position));
}
"#;

pub const SCENE_SHADER: &str = r#"
struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) color: vec3<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) color: vec3<f32>,
};

@vertex
fn vs_scene(vertex: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = scene.view_proj * vec4<f32>(vertex.position, 1.0);
    out.world_position = vertex.position;
    out.normal = vertex.normal;
    out.color = vertex.color;
    return out;
}

const SKY_TINT: vec3<f32> = vec3<f32>(0.86, 0.88, 0.92);
const GROUND_TINT: vec3<f32> = vec3<f32>(0.34, 0.33, 0.31);

@fragment
fn fs_scene(in: VertexOutput) -> @location(0) vec4<f32> {
    let n = normalize(in.normal);
    let environment = mix(GROUND_TINT, SKY_TINT, n.y * 0.5 + 0.5) * scene.light_params.y;
    let diffuse = max(dot(n, scene.light_direction.xyz), 0.0) * scene.light_direction.w;
    let lit = in.color * (environment + vec3<f32>(scene.light_params.x + diffuse));
    return vec4<f32>(apply_fog(lit, in.world_position), 1.0);
}
"#;

pub const PARTICLE_SHADER: &str = r#"
struct ParticleInput {
    @builtin(vertex_index) vertex_index: u32,
    @location(0) center: vec3<f32>,
    @location(1) size: f32,
    @location(2) color: vec3<f32>,
};

struct ParticleOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) corner: vec2<f32>,
    @location(1) color: vec3<f32>,
    @location(2) world_position: vec3<f32>,
};

const OPACITY: f32 = 0.8;
const ALPHA_TEST: f32 = 0.1;

var<private> CORNERS: array<vec2<f32>, 6> = array<vec2<f32>, 6>(
    vec2<f32>(-1.0, -1.0),
    vec2<f32>( 1.0, -1.0),
    vec2<f32>( 1.0,  1.0),
    vec2<f32>( 1.0,  1.0),
    vec2<f32>(-1.0,  1.0),
    vec2<f32>(-1.0, -1.0),
);

@vertex
fn vs_particle(in: ParticleInput) -> ParticleOutput {
    let corner = CORNERS[in.vertex_index];
    let offset = (scene.camera_right.xyz * corner.x + scene.camera_up.xyz * corner.y) * (in.size * 0.5);
    let world_position = in.center + offset;

    var out: ParticleOutput;
    out.clip_position = scene.view_proj * vec4<f32>(world_position, 1.0);
    out.corner = corner;
    out.color = in.color;
    out.world_position = world_position;
    return out;
}

@fragment
fn fs_particle(in: ParticleOutput) -> @location(0) vec4<f32> {
    // Radial gradient: 1 at the center, 0.5 halfway out, 0 at the rim.
    let falloff = clamp(1.0 - length(in.corner), 0.0, 1.0);
    let alpha = falloff * OPACITY;
    if alpha < ALPHA_TEST {
        discard;
    }
    return vec4<f32>(apply_fog(in.color, in.world_position), alpha);
}
"#;

/// Fullscreen post passes. Both entry points share one bind group layout.
pub const POST_SHADER: &str = r#"
struct Post {
    // distortion, scale, vignette strength, unused
    lens: vec4<f32>,
    // red, green, blue horizontal offsets, unused
    chroma: vec4<f32>,
};

@group(0) @binding(0) var source: texture_2d<f32>;
@group(0) @binding(1) var source_sampler: sampler;
@group(0) @binding(2) var<uniform> post: Post;

struct FullscreenOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_fullscreen(@builtin(vertex_index) vertex_index: u32) -> FullscreenOutput {
    let xy = vec2<f32>(f32((vertex_index << 1u) & 2u), f32(vertex_index & 2u));
    var out: FullscreenOutput;
    out.clip_position = vec4<f32>(xy * 2.0 - 1.0, 0.0, 1.0);
    out.uv = vec2<f32>(xy.x, 1.0 - xy.y);
    return out;
}

fn barrel(uv: vec2<f32>) -> vec2<f32> {
    let cc = uv - 0.5;
    let dist = dot(cc, cc);
    let k = post.lens.x;
    let factor = 1.0 + dist * (k - k * dist * 0.15);
    return 0.5 + cc * factor * post.lens.y;
}

@fragment
fn fs_lens(in: FullscreenOutput) -> @location(0) vec4<f32> {
    let distorted = barrel(in.uv);
    let sampled = textureSample(source, source_sampler, clamp(distorted, vec2<f32>(0.0), vec2<f32>(1.0))).rgb;
    let inside = all(distorted >= vec2<f32>(0.0)) && all(distorted <= vec2<f32>(1.0));
    var color = select(vec3<f32>(0.0), sampled, inside);

    let vignette = 1.0 - smoothstep(0.5, 0.95, length(in.uv - 0.5));
    color = mix(color, color * 0.7, vignette * post.lens.z);
    return vec4<f32>(color, 1.0);
}

@fragment
fn fs_chroma(in: FullscreenOutput) -> @location(0) vec4<f32> {
    let lo = vec2<f32>(0.0);
    let hi = vec2<f32>(1.0);
    let r = textureSample(source, source_sampler, clamp(in.uv + vec2<f32>(post.chroma.x, 0.0), lo, hi)).r;
    let g = textureSample(source, source_sampler, clamp(in.uv + vec2<f32>(post.chroma.y, 0.0), lo, hi)).g;
    let b = textureSample(source, source_sampler, clamp(in.uv + vec2<f32>(post.chroma.z, 0.0), lo, hi)).b;
    return vec4<f32>(r, g, b, 1.0);
}
"#;

//! Frame composition: scene and particles into an offscreen target, then the
//! lens pass (barrel distortion and vignette) and the chromatic aberration
//! pass onto the surface.

use std::borrow::Cow;

use fw_core::{AtmosphereConfig, ParticleField, PostConfig, SkylineConfig};
use glam::Vec2;
use wgpu::util::DeviceExt;

use crate::camera::{srgb_to_linear, FirstPersonCamera, SceneUniform};
use crate::gpu_context::DEPTH_FORMAT;
use crate::shaders;
use crate::skyline::build_scene_mesh;
use crate::vertex::{particle_position_layout, ParticleAttributes, SceneVertex};

const PARTICLE_VERTICES: u32 = 6;

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PostUniform {
    pub lens: [f32; 4],
    pub chroma: [f32; 4],
}

impl PostUniform {
    pub fn from_config(post: &PostConfig) -> Self {
        if !post.enabled {
            return Self {
                lens: [0.0, 1.0, 0.0, 0.0],
                chroma: [0.0; 4],
            };
        }
        Self {
            lens: [post.distortion, post.distortion_scale, post.vignette_strength, 0.0],
            chroma: [post.red_offset, post.green_offset, post.blue_offset, 0.0],
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RenderStats {
    pub draw_calls: u32,
    pub particles_drawn: u32,
    pub scene_triangles: u32,
}

/// Size-dependent textures, rebuilt on resize.
struct RenderTargets {
    depth: wgpu::TextureView,
    scene_color: wgpu::TextureView,
    lens_color: wgpu::TextureView,
    lens_from_scene: wgpu::BindGroup,
    chroma_from_lens: wgpu::BindGroup,
    chroma_from_scene: wgpu::BindGroup,
}

pub struct WalkthroughRenderer {
    scene_pipeline: wgpu::RenderPipeline,
    particle_pipeline: wgpu::RenderPipeline,
    lens_pipeline: wgpu::RenderPipeline,
    chroma_pipeline: wgpu::RenderPipeline,

    scene_uniform_buffer: wgpu::Buffer,
    scene_bind_group: wgpu::BindGroup,
    post_uniform_buffer: wgpu::Buffer,
    post_bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,

    scene_vertex_buffer: wgpu::Buffer,
    scene_index_buffer: wgpu::Buffer,
    scene_index_count: u32,

    particle_position_buffer: wgpu::Buffer,
    particle_attribute_buffer: wgpu::Buffer,
    particle_capacity: u32,
    particle_count: u32,

    targets: RenderTargets,
    surface_format: wgpu::TextureFormat,
}

impl WalkthroughRenderer {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        skyline: &SkylineConfig,
        start: Vec2,
    ) -> Self {
        let scene_uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("scene_uniform_buffer"),
            size: std::mem::size_of::<SceneUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let scene_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("scene_bind_group_layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let scene_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("scene_bind_group"),
            layout: &scene_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: scene_uniform_buffer.as_entire_binding(),
            }],
        });

        let scene_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scene_pipeline_layout"),
            bind_group_layouts: &[&scene_bind_group_layout],
            push_constant_ranges: &[],
        });

        let scene_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("scene_shader"),
            source: wgpu::ShaderSource::Wgsl(Cow::Owned(format!(
                "{}{}",
                shaders::SCENE_PRELUDE,
                shaders::SCENE_SHADER
            ))),
        });

        let scene_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("scene_pipeline"),
            layout: Some(&scene_layout),
            vertex: wgpu::VertexState {
                module: &scene_shader,
                entry_point: Some("vs_scene"),
                compilation_options: Default::default(),
                buffers: &[SceneVertex::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &scene_shader,
                entry_point: Some("fs_scene"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });

        let particle_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("particle_shader"),
            source: wgpu::ShaderSource::Wgsl(Cow::Owned(format!(
                "{}{}",
                shaders::SCENE_PRELUDE,
                shaders::PARTICLE_SHADER
            ))),
        });

        let particle_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("particle_pipeline"),
            layout: Some(&scene_layout),
            vertex: wgpu::VertexState {
                module: &particle_shader,
                entry_point: Some("vs_particle"),
                compilation_options: Default::default(),
                buffers: &[particle_position_layout(), ParticleAttributes::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &particle_shader,
                entry_point: Some("fs_particle"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });

        let post_uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("post_uniform_buffer"),
            contents: bytemuck::bytes_of(&PostUniform::from_config(&PostConfig::default())),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let post_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("post_bind_group_layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                ],
            });

        let post_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("post_pipeline_layout"),
            bind_group_layouts: &[&post_bind_group_layout],
            push_constant_ranges: &[],
        });

        let post_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("post_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::POST_SHADER.into()),
        });

        let lens_pipeline =
            create_post_pipeline(device, &post_layout, &post_shader, "fs_lens", surface_format);
        let chroma_pipeline =
            create_post_pipeline(device, &post_layout, &post_shader, "fs_chroma", surface_format);

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("post_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let mesh = build_scene_mesh(skyline, start);
        let scene_vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("scene_vertex_buffer"),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let scene_index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("scene_index_buffer"),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let scene_index_count = mesh.indices.len() as u32;

        let (particle_position_buffer, particle_attribute_buffer) =
            create_particle_buffers(device, 1);

        let targets = create_targets(
            device,
            &post_bind_group_layout,
            &sampler,
            &post_uniform_buffer,
            surface_format,
            width,
            height,
        );

        log::info!(
            "Renderer ready: {} skyline blocks, {}x{} targets",
            mesh.block_count,
            width,
            height
        );

        Self {
            scene_pipeline,
            particle_pipeline,
            lens_pipeline,
            chroma_pipeline,
            scene_uniform_buffer,
            scene_bind_group,
            post_uniform_buffer,
            post_bind_group_layout,
            sampler,
            scene_vertex_buffer,
            scene_index_buffer,
            scene_index_count,
            particle_position_buffer,
            particle_attribute_buffer,
            particle_capacity: 1,
            particle_count: 0,
            targets,
            surface_format,
        }
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.targets = create_targets(
            device,
            &self.post_bind_group_layout,
            &self.sampler,
            &self.post_uniform_buffer,
            self.surface_format,
            width,
            height,
        );
    }

    /// Rebuilds the static ground and skyline geometry.
    pub fn rebuild_scene(&mut self, device: &wgpu::Device, skyline: &SkylineConfig, start: Vec2) {
        let mesh = build_scene_mesh(skyline, start);
        self.scene_vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("scene_vertex_buffer"),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        self.scene_index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("scene_index_buffer"),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        self.scene_index_count = mesh.indices.len() as u32;
        log::info!("Skyline rebuilt: {} blocks", mesh.block_count);
    }

    /// Uploads the fixed per-particle attributes. Positions follow every
    /// frame through `update_particle_positions`.
    pub fn attach_particles(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        field: &ParticleField,
    ) {
        let count = field.len() as u32;
        if count > self.particle_capacity {
            let (positions, attributes) = create_particle_buffers(device, count);
            self.particle_position_buffer = positions;
            self.particle_attribute_buffer = attributes;
            self.particle_capacity = count;
        }
        let attributes = ParticleAttributes::from_field(field.sizes(), field.colors());
        if !attributes.is_empty() {
            queue.write_buffer(
                &self.particle_attribute_buffer,
                0,
                bytemuck::cast_slice(&attributes),
            );
        }
        self.update_particle_positions(queue, field.as_renderable_buffer());
    }

    pub fn update_particle_positions(&mut self, queue: &wgpu::Queue, packed: &[f32]) {
        let count = ((packed.len() / 3) as u32).min(self.particle_capacity);
        if count > 0 {
            queue.write_buffer(
                &self.particle_position_buffer,
                0,
                bytemuck::cast_slice(&packed[..count as usize * 3]),
            );
        }
        self.particle_count = count;
    }

    /// Records the full frame into `encoder`, ending with the surface written.
    pub fn render(
        &self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        surface_view: &wgpu::TextureView,
        camera: &FirstPersonCamera,
        atmosphere: &AtmosphereConfig,
        post: &PostConfig,
    ) -> RenderStats {
        let mut stats = RenderStats::default();
        queue.write_buffer(
            &self.scene_uniform_buffer,
            0,
            bytemuck::bytes_of(&camera.build_uniform(atmosphere)),
        );
        queue.write_buffer(
            &self.post_uniform_buffer,
            0,
            bytemuck::bytes_of(&PostUniform::from_config(post)),
        );

        let [r, g, b] = srgb_to_linear(atmosphere.fog_color);
        let clear = wgpu::Color {
            r: f64::from(r),
            g: f64::from(g),
            b: f64::from(b),
            a: f64::from(atmosphere.fog_alpha),
        };

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.targets.scene_color,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.targets.depth,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            pass.set_pipeline(&self.scene_pipeline);
            pass.set_bind_group(0, &self.scene_bind_group, &[]);
            pass.set_vertex_buffer(0, self.scene_vertex_buffer.slice(..));
            pass.set_index_buffer(self.scene_index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..self.scene_index_count, 0, 0..1);
            stats.draw_calls += 1;
            stats.scene_triangles = self.scene_index_count / 3;

            if self.particle_count > 0 {
                pass.set_pipeline(&self.particle_pipeline);
                pass.set_bind_group(0, &self.scene_bind_group, &[]);
                pass.set_vertex_buffer(0, self.particle_position_buffer.slice(..));
                pass.set_vertex_buffer(1, self.particle_attribute_buffer.slice(..));
                pass.draw(0..PARTICLE_VERTICES, 0..self.particle_count);
                stats.draw_calls += 1;
                stats.particles_drawn = self.particle_count;
            }
        }

        let chroma_source = if post.enabled {
            self.fullscreen_pass(
                encoder,
                "lens_pass",
                &self.lens_pipeline,
                &self.targets.lens_from_scene,
                &self.targets.lens_color,
            );
            stats.draw_calls += 1;
            &self.targets.chroma_from_lens
        } else {
            &self.targets.chroma_from_scene
        };

        self.fullscreen_pass(
            encoder,
            "chroma_pass",
            &self.chroma_pipeline,
            chroma_source,
            surface_view,
        );
        stats.draw_calls += 1;
        stats
    }

    fn fullscreen_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        label: &str,
        pipeline: &wgpu::RenderPipeline,
        source: &wgpu::BindGroup,
        target: &wgpu::TextureView,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            ..Default::default()
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, source, &[]);
        pass.draw(0..3, 0..1);
    }
}

fn create_post_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    fragment_entry: &str,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(fragment_entry),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_fullscreen"),
            compilation_options: Default::default(),
            buffers: &[],
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some(fragment_entry),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: Default::default(),
        multiview: None,
        cache: None,
    })
}

fn create_particle_buffers(device: &wgpu::Device, capacity: u32) -> (wgpu::Buffer, wgpu::Buffer) {
    let capacity = u64::from(capacity.max(1));
    let positions = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("particle_position_buffer"),
        size: capacity * 3 * std::mem::size_of::<f32>() as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let attributes = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("particle_attribute_buffer"),
        size: capacity * std::mem::size_of::<ParticleAttributes>() as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    (positions, attributes)
}

fn create_color_target(
    device: &wgpu::Device,
    label: &str,
    format: wgpu::TextureFormat,
    width: u32,
    height: u32,
) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    texture.create_view(&Default::default())
}

fn create_depth_target(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("depth_texture"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&Default::default())
}

fn create_post_bind_group(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::BindGroupLayout,
    source: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
    uniform: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(source),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: uniform.as_entire_binding(),
            },
        ],
    })
}

fn create_targets(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    uniform: &wgpu::Buffer,
    format: wgpu::TextureFormat,
    width: u32,
    height: u32,
) -> RenderTargets {
    let depth = create_depth_target(device, width, height);
    let scene_color = create_color_target(device, "scene_color", format, width, height);
    let lens_color = create_color_target(device, "lens_color", format, width, height);
    let lens_from_scene =
        create_post_bind_group(device, "lens_from_scene", layout, &scene_color, sampler, uniform);
    let chroma_from_lens =
        create_post_bind_group(device, "chroma_from_lens", layout, &lens_color, sampler, uniform);
    let chroma_from_scene =
        create_post_bind_group(device, "chroma_from_scene", layout, &scene_color, sampler, uniform);
    RenderTargets {
        depth,
        scene_color,
        lens_color,
        lens_from_scene,
        chroma_from_lens,
        chroma_from_scene,
    }
}

//! Instanced point sprites: one camera-facing quad per particle, blended
//! additively so dense regions glow.

use glam::Vec3;
use particle_morph::{Frame, PointSink};
use wgpu::util::DeviceExt;

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ParticleUniforms {
    pub view_proj: [[f32; 4]; 4], // 64 B
    pub world: [[f32; 4]; 4],     // +64 -> 128
    /// World-space camera right vector; xyz of a 16-B slot.
    pub cam_right: [f32; 3],      // +12
    pub particle_size: f32,       // +4  -> 144
    pub cam_up: [f32; 3],         // +12
    /// Non-zero selects per-particle colors over `tint`.
    pub color_mode: u32,          // +4  -> 160
    pub tint: [f32; 3],           // +12
    pub opacity: f32,             // +4  -> 176
}

// Buffer size must match the WGSL struct.
const _: [(); 176] = [(); core::mem::size_of::<ParticleUniforms>()];

const POSITION_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![1 => Float32x3];
const COLOR_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![2 => Float32x3];

impl ParticleUniforms {
    pub fn from_frame(frame: &Frame<'_>) -> Self {
        // The camera sits on +Z looking at the origin with +Y up.
        let m = &frame.material;
        Self {
            view_proj: frame.view_proj.to_cols_array_2d(),
            world: frame.world.to_cols_array_2d(),
            cam_right: Vec3::X.to_array(),
            particle_size: m.particle_size,
            cam_up: Vec3::Y.to_array(),
            color_mode: u32::from(m.color_mode),
            tint: m.tint.to_array(),
            opacity: m.opacity,
        }
    }
}

/// A growable vertex buffer holding `len` floats.
struct InstanceBuffer {
    buffer: wgpu::Buffer,
    len: usize,
}

fn upload(
    slot: &mut Option<InstanceBuffer>,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    data: &[f32],
) {
    let bytes: &[u8] = bytemuck::cast_slice(data);
    match slot {
        Some(existing) if existing.buffer.size() >= bytes.len() as u64 => {
            queue.write_buffer(&existing.buffer, 0, bytes);
            existing.len = data.len();
        }
        _ => {
            log::debug!("Allocating {} ({} floats)", label, data.len());
            let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytes,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            });
            *slot = Some(InstanceBuffer {
                buffer,
                len: data.len(),
            });
        }
    }
}

pub struct ParticlePipeline {
    pipeline:       wgpu::RenderPipeline,
    bind_group:     wgpu::BindGroup,
    uniform_buffer: wgpu::Buffer,
    quad_vb:        wgpu::Buffer,
    positions:      Option<InstanceBuffer>,
    colors:         Option<InstanceBuffer>,
}

impl ParticlePipeline {
    pub fn new(device: &wgpu::Device, color_fmt: wgpu::TextureFormat) -> Self {
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label:              Some("Particle Uniform Buffer"),
            size:               std::mem::size_of::<ParticleUniforms>() as u64,
            usage:              wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label:   Some("Particle BGL"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding:    0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty:                 wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size:   wgpu::BufferSize::new(
                        std::mem::size_of::<ParticleUniforms>() as u64,
                    ),
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label:   Some("Particle Bind Group"),
            layout:  &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding:  0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        // Unit quad corners (two triangles)
        let corners: [[f32; 2]; 6] = [
            [-1.0, -1.0], [1.0, -1.0], [1.0, 1.0],
            [-1.0, -1.0], [1.0, 1.0],  [-1.0, 1.0],
        ];
        let quad_vb = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label:    Some("Particle Quad VB"),
            contents: bytemuck::cast_slice(&corners),
            usage:    wgpu::BufferUsages::VERTEX,
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label:  Some("Particle WGSL"),
            source: wgpu::ShaderSource::Wgsl(PARTICLE_WGSL.into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label:                Some("Particle Pipeline Layout"),
            bind_group_layouts:   &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let additive = wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::One,
            operation:  wgpu::BlendOperation::Add,
        };

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label:  Some("Particle Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module:      &shader,
                entry_point: "vs_main",
                buffers: &[
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<[f32; 2]>() as u64,
                        step_mode:    wgpu::VertexStepMode::Vertex,
                        attributes:   &[wgpu::VertexAttribute {
                            shader_location: 0,
                            format:          wgpu::VertexFormat::Float32x2,
                            offset:          0,
                        }],
                    },
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<[f32; 3]>() as u64,
                        step_mode:    wgpu::VertexStepMode::Instance,
                        attributes:   &POSITION_ATTRS,
                    },
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<[f32; 3]>() as u64,
                        step_mode:    wgpu::VertexStepMode::Instance,
                        attributes:   &COLOR_ATTRS,
                    },
                ],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module:      &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format:     color_fmt,
                    blend:      Some(wgpu::BlendState {
                        color: additive,
                        alpha: additive,
                    }),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample:   wgpu::MultisampleState::default(),
            multiview:     None,
        });

        Self {
            pipeline,
            bind_group,
            uniform_buffer,
            quad_vb,
            positions: None,
            colors: None,
        }
    }

    /// Number of particles the next draw will emit.
    pub fn instance_count(&self) -> u32 {
        self.positions.as_ref().map_or(0, |p| (p.len / 3) as u32)
    }

    /// Whether GPU buffers are currently held for a scene.
    pub fn has_buffers(&self) -> bool {
        self.positions.is_some() || self.colors.is_some()
    }

    pub fn draw<'a>(&'a self, rpass: &mut wgpu::RenderPass<'a>) {
        let Some(positions) = &self.positions else {
            return;
        };
        let instances = self.instance_count();
        if instances == 0 {
            return;
        }

        // Without matching colors the position stream stands in; the shader
        // ignores it unless color mode is on.
        let colors = match &self.colors {
            Some(c) if c.len == positions.len => &c.buffer,
            _ => &positions.buffer,
        };

        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, &self.bind_group, &[]);
        rpass.set_vertex_buffer(0, self.quad_vb.slice(..));
        rpass.set_vertex_buffer(1, positions.buffer.slice(..));
        rpass.set_vertex_buffer(2, colors.slice(..));
        rpass.draw(0..6, 0..instances);
    }

    pub fn release(&mut self) {
        if self.has_buffers() {
            log::debug!("Releasing particle buffers");
        }
        self.positions = None;
        self.colors = None;
    }
}

/// Per-frame upload target handed to the scene.
pub struct ParticleSink<'a> {
    pub device:    &'a wgpu::Device,
    pub queue:     &'a wgpu::Queue,
    pub particles: &'a mut ParticlePipeline,
}

impl PointSink for ParticleSink<'_> {
    fn submit(&mut self, frame: &Frame<'_>) {
        if let Some(positions) = frame.positions {
            upload(
                &mut self.particles.positions,
                self.device,
                self.queue,
                "Particle Positions",
                positions,
            );
        }
        if let Some(colors) = frame.colors {
            upload(
                &mut self.particles.colors,
                self.device,
                self.queue,
                "Particle Colors",
                colors,
            );
        }

        let uniforms = ParticleUniforms::from_frame(frame);
        self.queue
            .write_buffer(&self.particles.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
    }

    fn release(&mut self) {
        self.particles.release();
    }
}

const PARTICLE_WGSL: &str = r#"
struct Particles {
    view_proj: mat4x4<f32>,
    world: mat4x4<f32>,
    cam_right: vec3<f32>,
    particle_size: f32,
    cam_up: vec3<f32>,
    color_mode: u32,
    tint: vec3<f32>,
    opacity: f32,
};

@group(0) @binding(0) var<uniform> u: Particles;

struct VsOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) corner: vec2<f32>,
    @location(1) color: vec3<f32>,
};

@vertex
fn vs_main(
    @location(0) corner: vec2<f32>,
    @location(1) center: vec3<f32>,
    @location(2) color: vec3<f32>,
) -> VsOut {
    let world_center = (u.world * vec4<f32>(center, 1.0)).xyz;
    let extent = 0.5 * u.particle_size;
    let p = world_center + (u.cam_right * corner.x + u.cam_up * corner.y) * extent;

    var out: VsOut;
    out.clip = u.view_proj * vec4<f32>(p, 1.0);
    out.corner = corner;
    out.color = select(u.tint, color, u.color_mode != 0u);
    return out;
}

@fragment
fn fs_main(v: VsOut) -> @location(0) vec4<f32> {
    let d = length(v.corner);
    if (d > 1.0) {
        discard;
    }
    let falloff = 1.0 - smoothstep(0.0, 1.0, d);
    let a = falloff * u.opacity;
    return vec4<f32>(v.color * a, a);
}
"#;

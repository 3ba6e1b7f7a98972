// scene/renderer.rs - Render backend seam and the offscreen wgpu implementation

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use image::RgbaImage;
use wgpu::util::DeviceExt;

use crate::config::SceneConfig;
use crate::error_handling::{padded_bytes_per_row, unpad_rows, RendererError, Result};
use super::assets::EnvironmentMap;
use super::model::{DrawItem, SceneModel, Vertex};

const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// What the scene hands the backend each frame
pub struct RenderFrame<'a> {
    pub view_projection: Mat4,
    pub camera_position: Vec3,
    pub draws: &'a [DrawItem],
}

/// Anything that can draw the skull scene
pub trait RenderBackend {
    /// Upload geometry and lighting; called once before the first render
    fn prepare(&mut self, model: &SceneModel, environment: &EnvironmentMap) -> Result<()>;

    /// Canvas size in CSS pixels
    fn set_size(&mut self, width: u32, height: u32);

    fn set_pixel_ratio(&mut self, ratio: f32);

    fn render(&mut self, frame: &RenderFrame<'_>) -> Result<()>;

    /// Read back the last rendered frame, if the backend keeps one
    fn capture(&mut self) -> Result<Option<RgbaImage>> {
        Ok(None)
    }

    /// Release GPU resources; later renders fail with `Disposed`
    fn dispose(&mut self);
}

/// Device and queue for headless rendering, shareable between renderers
#[derive(Clone)]
pub struct GpuContext {
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
}

impl GpuContext {
    pub async fn new(force_vulkan: bool) -> Result<Self> {
        let backends = if force_vulkan || std::env::var("WGPU_BACKEND").as_deref() == Ok("vulkan") {
            wgpu::Backends::VULKAN
        } else {
            wgpu::Backends::PRIMARY
        };

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends,
            flags: wgpu::InstanceFlags::empty(),
            dx12_shader_compiler: Default::default(),
            gles_minor_version: wgpu::Gles3MinorVersion::Automatic,
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RendererError::AdapterCreationFailed)?;

        log::info!("Using GPU: {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Scene Renderer"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
        })
    }
}

/// Per-frame uniforms, matching `FrameUniforms` in scene.wgsl
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct FrameUniforms {
    view_proj: [[f32; 4]; 4],
    camera_position: [f32; 3],
    exposure: f32,
    fog_color: [f32; 3],
    fog_near: f32,
    sky: [f32; 3],
    fog_far: f32,
    ground: [f32; 3],
    _pad: f32,
}

static_assertions::const_assert_eq!(std::mem::size_of::<FrameUniforms>(), 128);

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct DrawUniforms {
    model: [[f32; 4]; 4],
    normal: [[f32; 4]; 4],
}

static_assertions::const_assert_eq!(std::mem::size_of::<DrawUniforms>(), 128);

impl DrawUniforms {
    fn new(world: Mat4) -> Self {
        Self {
            model: world.to_cols_array_2d(),
            normal: world.inverse().transpose().to_cols_array_2d(),
        }
    }
}

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

fn vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &VERTEX_ATTRIBUTES,
    }
}

fn uniform_layout_entry() -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding: 0,
        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Tone mapping, fog and lighting inputs that don't change per frame
#[derive(Debug, Clone, Copy)]
struct Shading {
    exposure: f32,
    fog_color: [f32; 3],
    fog_near: f32,
    fog_far: f32,
    sky: [f32; 3],
    ground: [f32; 3],
}

struct GpuPrimitive {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

struct DrawSlot {
    uniforms: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    /// World-space vertices for skinned draws, rewritten every frame
    skinned: Option<(wgpu::Buffer, usize)>,
}

struct RenderTargets {
    color: wgpu::Texture,
    color_view: wgpu::TextureView,
    depth_view: wgpu::TextureView,
    width: u32,
    height: u32,
}

/// Offscreen wgpu renderer: colour and depth targets sized to the canvas
/// times the pixel ratio, cleared to transparent every frame.
pub struct WgpuRenderer {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    pipeline: wgpu::RenderPipeline,
    draw_layout: wgpu::BindGroupLayout,
    frame_uniforms: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    shading: Shading,
    css_size: (u32, u32),
    pixel_ratio: f32,
    targets: Option<RenderTargets>,
    meshes: Vec<Vec<GpuPrimitive>>,
    slots: Vec<DrawSlot>,
    prepared: bool,
    disposed: bool,
}

impl WgpuRenderer {
    pub fn new(gpu: GpuContext, config: &SceneConfig) -> Self {
        let GpuContext { device, queue } = gpu;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/scene.wgsl").into()),
        });

        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Frame Bind Group Layout"),
            entries: &[uniform_layout_entry()],
        });
        let draw_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Draw Bind Group Layout"),
            entries: &[uniform_layout_entry()],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&frame_layout, &draw_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Scene Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[vertex_layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: COLOR_FORMAT,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let frame_uniforms = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Uniforms"),
            size: std::mem::size_of::<FrameUniforms>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame Bind Group"),
            layout: &frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_uniforms.as_entire_binding(),
            }],
        });

        Self {
            device,
            queue,
            pipeline,
            draw_layout,
            frame_uniforms,
            frame_bind_group,
            shading: Shading {
                exposure: config.tone_mapping_exposure,
                fog_color: config.fog_color,
                fog_near: config.fog_near,
                fog_far: config.fog_far,
                sky: [1.0; 3],
                ground: [1.0; 3],
            },
            css_size: (0, 0),
            pixel_ratio: 1.0,
            targets: None,
            meshes: Vec::new(),
            slots: Vec::new(),
            prepared: false,
            disposed: false,
        }
    }

    /// Drawing-buffer size in physical pixels
    pub fn physical_size(&self) -> (u32, u32) {
        let scale = |css: u32| ((css as f32 * self.pixel_ratio).round() as u32).max(1);
        (scale(self.css_size.0), scale(self.css_size.1))
    }

    fn ensure_targets(&mut self) {
        let (width, height) = self.physical_size();
        let stale = !matches!(&self.targets, Some(t) if t.width == width && t.height == height);
        if stale {
            log::debug!("Creating {}x{} render targets", width, height);
            let size = wgpu::Extent3d { width, height, depth_or_array_layers: 1 };
            let color = self.device.create_texture(&wgpu::TextureDescriptor {
                label: Some("Scene Color"),
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: COLOR_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
                view_formats: &[],
            });
            let depth = self.device.create_texture(&wgpu::TextureDescriptor {
                label: Some("Scene Depth"),
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: DEPTH_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            });
            self.targets = Some(RenderTargets {
                color_view: color.create_view(&Default::default()),
                depth_view: depth.create_view(&Default::default()),
                color,
                width,
                height,
            });
        }
    }

    fn ensure_slot(&mut self, index: usize) {
        while self.slots.len() <= index {
            let uniforms = self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Draw Uniforms"),
                size: std::mem::size_of::<DrawUniforms>() as wgpu::BufferAddress,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Draw Bind Group"),
                layout: &self.draw_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniforms.as_entire_binding(),
                }],
            });
            self.slots.push(DrawSlot { uniforms, bind_group, skinned: None });
        }
    }

    fn write_skinned(&mut self, index: usize, vertices: &[Vertex]) {
        let slot = &mut self.slots[index];
        let fits = matches!(&slot.skinned, Some((_, len)) if *len == vertices.len());
        if fits {
            if let Some((buffer, _)) = &slot.skinned {
                self.queue.write_buffer(buffer, 0, bytemuck::cast_slice(vertices));
            }
        } else {
            let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Skinned Vertices"),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            });
            slot.skinned = Some((buffer, vertices.len()));
        }
    }
}

impl RenderBackend for WgpuRenderer {
    fn prepare(&mut self, model: &SceneModel, environment: &EnvironmentMap) -> Result<()> {
        if self.disposed {
            return Err(RendererError::Disposed);
        }

        self.meshes = model
            .meshes
            .iter()
            .map(|mesh| {
                mesh.primitives
                    .iter()
                    .map(|primitive| GpuPrimitive {
                        vertex_buffer: self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                            label: Some("Vertex Buffer"),
                            contents: bytemuck::cast_slice(&primitive.vertices),
                            usage: wgpu::BufferUsages::VERTEX,
                        }),
                        index_buffer: self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                            label: Some("Index Buffer"),
                            contents: bytemuck::cast_slice(&primitive.indices),
                            usage: wgpu::BufferUsages::INDEX,
                        }),
                        index_count: primitive.indices.len() as u32,
                    })
                    .collect()
            })
            .collect();

        self.shading.sky = environment.sky_irradiance();
        self.shading.ground = environment.ground_irradiance();
        self.prepared = true;

        log::info!("Uploaded {} vertices", model.vertex_count());
        Ok(())
    }

    fn set_size(&mut self, width: u32, height: u32) {
        self.css_size = (width, height);
    }

    fn set_pixel_ratio(&mut self, ratio: f32) {
        if ratio > 0.0 {
            self.pixel_ratio = ratio;
        }
    }

    fn render(&mut self, frame: &RenderFrame<'_>) -> Result<()> {
        if self.disposed {
            return Err(RendererError::Disposed);
        }
        if !self.prepared {
            return Err(RendererError::NotPrepared);
        }

        let shading = self.shading;
        let uniforms = FrameUniforms {
            view_proj: frame.view_projection.to_cols_array_2d(),
            camera_position: frame.camera_position.into(),
            exposure: shading.exposure,
            fog_color: shading.fog_color,
            fog_near: shading.fog_near,
            sky: shading.sky,
            fog_far: shading.fog_far,
            ground: shading.ground,
            _pad: 0.0,
        };
        self.queue.write_buffer(&self.frame_uniforms, 0, bytemuck::bytes_of(&uniforms));

        for (index, draw) in frame.draws.iter().enumerate() {
            self.ensure_slot(index);
            self.queue.write_buffer(&self.slots[index].uniforms, 0, bytemuck::bytes_of(&DrawUniforms::new(draw.world)));
            if let Some(vertices) = &draw.skinned {
                self.write_skinned(index, vertices);
            }
        }

        self.ensure_targets();
        let Some(targets) = &self.targets else {
            return Ok(());
        };

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Scene Encoder"),
        });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &targets.color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &targets.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &self.frame_bind_group, &[]);

            for (draw, slot) in frame.draws.iter().zip(&self.slots) {
                let Some(primitive) = self.meshes.get(draw.mesh).and_then(|m| m.get(draw.primitive)) else {
                    continue;
                };
                let vertex_buffer = match (&draw.skinned, &slot.skinned) {
                    (Some(_), Some((buffer, _))) => buffer,
                    _ => &primitive.vertex_buffer,
                };
                pass.set_bind_group(1, &slot.bind_group, &[]);
                pass.set_vertex_buffer(0, vertex_buffer.slice(..));
                pass.set_index_buffer(primitive.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..primitive.index_count, 0, 0..1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn capture(&mut self) -> Result<Option<RgbaImage>> {
        let Some(targets) = &self.targets else {
            return Ok(None);
        };
        let (width, height) = (targets.width, targets.height);
        let bpr_padded = padded_bytes_per_row(width, 4);

        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Capture Staging"),
            size: (bpr_padded * height) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Capture Encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &targets.color,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &staging,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(bpr_padded),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
        );
        self.queue.submit(Some(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, mut rx) = tokio::sync::oneshot::channel();
        slice.map_async(wgpu::MapMode::Read, move |res| {
            tx.send(res).ok();
        });
        self.device.poll(wgpu::Maintain::Wait);
        rx.try_recv()
            .map_err(|_| RendererError::BufferError { message: "capture buffer was never mapped".into() })?
            .map_err(|e| RendererError::BufferError { message: e.to_string() })?;

        let padded = slice.get_mapped_range();
        let raw = unpad_rows(&padded, width, height, 4);
        drop(padded);
        staging.unmap();

        RgbaImage::from_raw(width, height, raw)
            .map(Some)
            .ok_or_else(|| RendererError::BufferError { message: "capture size mismatch".into() })
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.meshes.clear();
        self.slots.clear();
        self.targets = None;
        self.prepared = false;
        self.disposed = true;
        log::debug!("Renderer disposed");
    }
}

//! GPU implementation of [`ComputeBackend`] built on [`wgpu`].
//!
//! The `WgpuBackend` compiles the WGSL collision shaders on first use and
//! dispatches them on the user's graphics device. Results are read back
//! synchronously: every dispatch stalls until the device is idle, so this
//! backend trades latency for parallel width. Initialization fails if no
//! compatible adapter is found.

use crate::layout::{STORAGE_PARTICLES, STORAGE_SHAPES};
use crate::{BufferView, ComputeBackend, ComputeError, Kernel};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use wgpu::util::DeviceExt;

struct CachedPipeline {
    layout: wgpu::BindGroupLayout,
    pipeline: wgpu::ComputePipeline,
}

/// GPU-backed implementation of [`ComputeBackend`] built on `wgpu`.
pub struct WgpuBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    /// Pipelines compiled on first use, per kernel.
    pipelines: Mutex<HashMap<Kernel, Arc<CachedPipeline>>>,
}

impl WgpuBackend {
    /// Creates a new backend using the system's default high-performance GPU.
    ///
    /// # Errors
    ///
    /// `BackendUnavailable` when no adapter or device can be acquired.
    pub fn new() -> Result<Self, ComputeError> {
        let instance = wgpu::Instance::default();
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            compatible_surface: None,
        }))
        .ok_or(ComputeError::BackendUnavailable)?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("dynamics-collision-device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
            },
            None,
        ))
        .map_err(|err| {
            tracing::warn!("Failed to request device: {err:?}");
            ComputeError::BackendUnavailable
        })?;

        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            pipelines: Mutex::new(HashMap::new()),
        })
    }

    fn pipeline(&self, kernel: Kernel) -> Arc<CachedPipeline> {
        let mut cache = self.pipelines.lock();
        cache
            .entry(kernel)
            .or_insert_with(|| Arc::new(self.build_pipeline(kernel)))
            .clone()
    }

    fn build_pipeline(&self, kernel: Kernel) -> CachedPipeline {
        let shader = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(kernel_name(kernel)),
                source: wgpu::ShaderSource::Wgsl(to_shader_source(kernel).into()),
            });

        let storage_entry = |binding: u32, read_only: bool| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let layout = self
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("collide_layout"),
                entries: &[
                    storage_entry(STORAGE_PARTICLES, false),
                    storage_entry(STORAGE_SHAPES, true),
                ],
            });

        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("collide_pipeline_layout"),
                bind_group_layouts: &[&layout],
                push_constant_ranges: &[],
            });

        let pipeline = self
            .device
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(kernel_name(kernel)),
                layout: Some(&pipeline_layout),
                module: &shader,
                entry_point: "main",
            });

        CachedPipeline { layout, pipeline }
    }
}

/// Returns the label used for a given [`Kernel`].
fn kernel_name(kernel: Kernel) -> &'static str {
    match kernel {
        Kernel::CollideSpheres => "collide_spheres",
        Kernel::CollideCapsules => "collide_capsules",
    }
}

/// Provides the WGSL shader source associated with the kernel.
fn to_shader_source(kernel: Kernel) -> &'static str {
    match kernel {
        Kernel::CollideSpheres => include_str!("../../../shaders/collide_spheres.wgsl"),
        Kernel::CollideCapsules => include_str!("../../../shaders/collide_capsules.wgsl"),
    }
}

impl ComputeBackend for WgpuBackend {
    fn dispatch(
        &self,
        kernel: &Kernel,
        binds: &[BufferView],
        workgroups: [u32; 3],
    ) -> Result<Vec<Vec<u8>>, ComputeError> {
        if binds.len() != kernel.binding_count() as usize {
            return Err(ComputeError::ShapeMismatch("wrong number of bindings for kernel"));
        }
        if binds.iter().any(|view| view.data.is_empty()) {
            return Err(ComputeError::ShapeMismatch("wgpu cannot bind empty buffers"));
        }

        let cached = self.pipeline(*kernel);

        let particles = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("particles"),
                contents: &binds[STORAGE_PARTICLES as usize].data,
                usage: wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_DST
                    | wgpu::BufferUsages::COPY_SRC,
            });
        let shapes = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("shapes"),
                contents: &binds[STORAGE_SHAPES as usize].data,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            });

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("collide_bind_group"),
            layout: &cached.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: STORAGE_PARTICLES,
                    resource: particles.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: STORAGE_SHAPES,
                    resource: shapes.as_entire_binding(),
                },
            ],
        });

        let size = binds[STORAGE_PARTICLES as usize].data.len() as u64;
        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("particles_staging"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("collide_encoder") });
        {
            let mut cpass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("collide_pass"),
                timestamp_writes: None,
            });
            cpass.set_pipeline(&cached.pipeline);
            cpass.set_bind_group(0, &bind_group, &[]);
            cpass.dispatch_workgroups(workgroups[0], workgroups[1], workgroups[2]);
        }
        encoder.copy_buffer_to_buffer(&particles, 0, &staging, 0, size);
        self.queue.submit(Some(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|err| ComputeError::Device(err.to_string()))?
            .map_err(|err| ComputeError::Device(err.to_string()))?;

        let data = slice.get_mapped_range().to_vec();
        staging.unmap();
        Ok(vec![data])
    }

    fn name(&self) -> &'static str {
        "wgpu"
    }
}

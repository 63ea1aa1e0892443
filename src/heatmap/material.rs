//! Display material management: the uniform buffer carrying the per-frame
//! color-mapping parameters and the bind groups tying the accumulation
//! snapshot into the surface shader. Updates are in-place uniform writes
//! plus bind-group selection — never a reallocation, so there is no flicker
//! or GPU resource churn on parameter changes.

use bytemuck::{Pod, Zeroable};

use super::accum::AccumulationBuffer;
use super::colormap::{DisplayConfig, RAMP_POINTS};

/// Fragment-stage uniform mirrored by `DisplayUniform` in surface.wgsl.
/// The ramp rows are the active gradient's control points (rgb + pad).
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct DisplayUniform {
    ramp: [[f32; 4]; RAMP_POINTS],
    min_heat: f32,
    max_heat: f32,
    use_transparency: u32,
    _pad: u32,
}

impl DisplayUniform {
    fn from_config(cfg: &DisplayConfig) -> Self {
        let mut ramp = [[0.0f32; 4]; RAMP_POINTS];
        for (row, point) in ramp.iter_mut().zip(cfg.gradient_style.ramp()) {
            row[0] = point[0];
            row[1] = point[1];
            row[2] = point[2];
        }
        Self {
            ramp,
            min_heat: cfg.min_heat,
            max_heat: cfg.max_heat,
            use_transparency: cfg.use_transparency as u32,
            _pad: 0,
        }
    }
}

/// Tracks the last configuration pushed to the GPU. The uniform is written
/// only when a field actually changed, or after the accumulation binding is
/// rebuilt (which invalidates whatever the buffer held).
#[derive(Debug, Default)]
pub struct ConfigTracker {
    applied: Option<DisplayConfig>,
}

impl ConfigTracker {
    /// Whether the given config differs from what the GPU last saw.
    pub fn is_dirty(&self, cfg: &DisplayConfig) -> bool {
        self.applied.as_ref() != Some(cfg)
    }

    pub fn mark_applied(&mut self, cfg: &DisplayConfig) {
        self.applied = Some(*cfg);
    }

    /// Forget the applied config, forcing the next update to push.
    pub fn invalidate(&mut self) {
        self.applied = None;
    }
}

/// Owns the display uniform and the two bind groups (one per ping/pong
/// texture). Created once; re-bound when the accumulation state is rebuilt
/// for a newly loaded model.
pub struct DisplayMaterialManager {
    bind_group_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    sampler: wgpu::Sampler,
    /// One bind group per accumulation texture, indexed by ping/pong index.
    bind_groups: Option<[wgpu::BindGroup; 2]>,
    active_idx: usize,
    tracker: ConfigTracker,
}

impl DisplayMaterialManager {
    pub fn new(device: &wgpu::Device) -> Self {
        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("display_material_layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    // R32Float is not filterable without extra features;
                    // pair an unfilterable texture with a non-filtering
                    // sampler and let the bilinear write splat provide
                    // smoothness instead.
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: false },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::NonFiltering),
                        count: None,
                    },
                ],
            });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("display_uniform_buffer"),
            size: std::mem::size_of::<DisplayUniform>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("heat_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            bind_group_layout,
            uniform_buffer,
            sampler,
            bind_groups: None,
            active_idx: 0,
            tracker: ConfigTracker::default(),
        }
    }

    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout
    }

    /// (Re)create the two bind groups against a freshly built accumulation
    /// buffer. Called once per loaded model, not per frame.
    pub fn bind_accumulation(&mut self, device: &wgpu::Device, accum: &AccumulationBuffer) {
        let views = accum.views();
        let make = |idx: usize| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("display_material_bind_group"),
                layout: &self.bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: self.uniform_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(views[idx]),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(&self.sampler),
                    },
                ],
            })
        };
        let groups = [make(0), make(1)];
        self.bind_groups = Some(groups);
        self.active_idx = accum.snapshot().0;
        self.tracker.invalidate();
    }

    /// Drop the bind groups when the accumulation state is torn down.
    pub fn unbind(&mut self) {
        self.bind_groups = None;
        self.tracker.invalidate();
    }

    /// Whether the given config differs from what the GPU last saw.
    pub fn config_dirty(&self, cfg: &DisplayConfig) -> bool {
        self.tracker.is_dirty(cfg)
    }

    /// Rebind the snapshot and push the color-mapping parameters in place.
    /// No-op (returns false) while uninitialized — not an error, the
    /// system is still booting.
    pub fn update_display_materials(
        &mut self,
        queue: &wgpu::Queue,
        snapshot_idx: usize,
        cfg: &DisplayConfig,
    ) -> bool {
        if self.bind_groups.is_none() {
            return false;
        }
        self.active_idx = snapshot_idx;
        if self.tracker.is_dirty(cfg) {
            let uniform = DisplayUniform::from_config(cfg);
            queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniform));
            self.tracker.mark_applied(cfg);
        }
        true
    }

    /// Bind group for the current readable accumulation texture.
    pub fn active_bind_group(&self) -> Option<&wgpu::BindGroup> {
        self.bind_groups.as_ref().map(|groups| &groups[self.active_idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heatmap::colormap::GradientStyle;

    #[test]
    fn fresh_tracker_is_dirty_and_settles_after_apply() {
        let mut tracker = ConfigTracker::default();
        let cfg = DisplayConfig::default();
        assert!(tracker.is_dirty(&cfg));

        tracker.mark_applied(&cfg);
        assert!(!tracker.is_dirty(&cfg));
    }

    #[test]
    fn any_single_field_change_marks_dirty() {
        let base = DisplayConfig::default();
        let mut tracker = ConfigTracker::default();
        tracker.mark_applied(&base);

        let variants = [
            DisplayConfig { min_heat: 0.1, ..base },
            DisplayConfig { max_heat: 2.0, ..base },
            DisplayConfig { gradient_style: GradientStyle::Viridis, ..base },
            DisplayConfig { use_transparency: true, ..base },
        ];
        for cfg in variants {
            assert!(tracker.is_dirty(&cfg), "change not detected: {cfg:?}");
            // The applied config is unchanged until the new one is pushed.
            assert!(!tracker.is_dirty(&base));
        }
    }

    #[test]
    fn invalidate_forces_the_next_push() {
        let cfg = DisplayConfig::default();
        let mut tracker = ConfigTracker::default();
        tracker.mark_applied(&cfg);
        assert!(!tracker.is_dirty(&cfg));

        // Rebinding or tearing down the accumulation state invalidates the
        // uniform even though the config itself did not change.
        tracker.invalidate();
        assert!(tracker.is_dirty(&cfg));
    }
}

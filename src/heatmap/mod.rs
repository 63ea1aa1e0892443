//! Heatmap engine: composes accumulation, color mapping, display materials,
//! and geometry binding, driven once per frame by the playback snapshot.

pub mod accum;
pub mod colormap;
pub mod geometry;
pub mod material;

use instant::Instant;

use crate::model::HeatmapModelData;
use crate::playback::PlaybackSnapshot;
use crate::trace::SampleFeed;

use self::accum::{AccumStatus, AccumulationBuffer};
use self::colormap::DisplayConfig;
use self::geometry::{GeometryBinder, GeometryMode, SurfaceSlot};
use self::material::DisplayMaterialManager;

/// How often to log accumulation throughput (seconds).
const THROUGHPUT_LOG_INTERVAL: f64 = 5.0;

/// Geometry-related UI flags, sampled once per frame.
#[derive(Debug, Clone, Copy)]
pub struct GeometryFlags {
    pub use_plane_geometry: bool,
    pub is_visible: bool,
}

/// Orchestrates the heatmap pipeline. Exclusively owns the accumulation
/// textures; everything else sees them only through `snapshot()`.
pub struct HeatmapEngine {
    model: Option<HeatmapModelData>,
    accum: Option<AccumulationBuffer>,
    binder: Option<GeometryBinder>,
    material: DisplayMaterialManager,

    /// Timeline position of the last accumulated tick.
    last_time: f32,
    /// Invoked after a reset completes, so the controller can settle
    /// its edge-triggered signal.
    on_reset: Option<Box<dyn FnMut()>>,

    // Throughput accounting.
    samples_window: u64,
    log_timer: Instant,
}

impl HeatmapEngine {
    pub fn new(device: &wgpu::Device) -> Self {
        Self {
            model: None,
            accum: None,
            binder: None,
            material: DisplayMaterialManager::new(device),
            last_time: 0.0,
            on_reset: None,
            samples_window: 0,
            log_timer: Instant::now(),
        }
    }

    /// Bind group layout the surface pipeline renders against.
    pub fn material_layout(&self) -> &wgpu::BindGroupLayout {
        self.material.layout()
    }

    /// Register the reset-acknowledgement callback.
    pub fn set_on_reset(&mut self, callback: Box<dyn FnMut()>) {
        self.on_reset = Some(callback);
    }

    /// Install freshly loaded model data, tearing down and recreating the
    /// accumulation state. If the accumulation textures cannot be created
    /// the heatmap feature is disabled; the rest of the scene is unaffected.
    pub fn load_model(&mut self, device: &wgpu::Device, data: HeatmapModelData) {
        self.material.unbind();
        self.accum = None;
        self.binder = None;
        self.last_time = 0.0;

        let res = data.grid_resolution;
        match AccumulationBuffer::new(device, res, res) {
            Some(accum) => {
                self.material.bind_accumulation(device, &accum);
                self.accum = Some(accum);
            }
            None => log::error!("heatmap accumulation unavailable; overlay will not render"),
        }
        self.binder = Some(GeometryBinder::new(device, &data));
        self.model = Some(data);
    }

    pub fn has_model(&self) -> bool {
        self.model.as_ref().is_some_and(|m| m.has_model())
    }

    /// Apply samples to the accumulation buffer. No-op with an
    /// `Uninitialized` signal before model data is loaded; `tick` calls
    /// this every playing frame.
    pub fn accumulate<I>(&mut self, samples: I) -> AccumStatus
    where
        I: IntoIterator<Item = (glam::Vec2, f32)>,
    {
        match &mut self.accum {
            Some(accum) => accum.accumulate(samples),
            None => AccumStatus::Uninitialized,
        }
    }

    /// Drive one frame of the pipeline. Pulls due samples while playing,
    /// handles the edge-triggered reset, and refreshes display materials
    /// when configuration changed or new heat was written. Display refresh
    /// is reactive to configuration even while paused.
    pub fn tick(
        &mut self,
        queue: &wgpu::Queue,
        playback: PlaybackSnapshot,
        cfg: &DisplayConfig,
        geo: GeometryFlags,
        feed: &mut SampleFeed,
    ) {
        if let Some(binder) = &mut self.binder {
            let mode = if geo.use_plane_geometry || !binder.has_model() {
                GeometryMode::Plane
            } else {
                GeometryMode::Model
            };
            binder.set_mode(mode);
            binder.set_visible(geo.is_visible);
        }

        if playback.is_reset {
            self.perform_reset(queue, cfg, feed);
            return;
        }

        let mut wrote = false;
        if playback.is_playing {
            // Scrubbing backward is reset-then-replay, never negative
            // accumulation.
            if playback.current_time < self.last_time {
                if let Some(accum) = &mut self.accum {
                    accum.reset(queue);
                }
                feed.rewind();
                log::debug!(
                    "backward scrub to {:.2}s: replaying trace",
                    playback.current_time
                );
            }

            match self.accumulate(feed.advance_to(playback.current_time)) {
                AccumStatus::Applied(n) if n > 0 => {
                    if let Some(accum) = &mut self.accum {
                        wrote = accum.flush(queue);
                    }
                    self.samples_window += n as u64;
                }
                _ => {}
            }
            self.last_time = playback.current_time;
        }

        if let Some(accum) = &self.accum {
            if wrote || self.material.config_dirty(cfg) {
                let (idx, _) = accum.snapshot();
                self.material.update_display_materials(queue, idx, cfg);
            }
        }

        self.log_throughput();
    }

    /// Clear all accumulated state and acknowledge via `on_reset`.
    fn perform_reset(&mut self, queue: &wgpu::Queue, cfg: &DisplayConfig, feed: &mut SampleFeed) {
        if let Some(accum) = &mut self.accum {
            accum.reset(queue);
            // Refresh with the (now zeroed) snapshot so residual color does
            // not linger on screen.
            let (idx, _) = accum.snapshot();
            self.material.update_display_materials(queue, idx, cfg);
        }
        feed.rewind();
        self.last_time = 0.0;
        log::info!("heatmap reset: accumulation cleared");

        if let Some(callback) = &mut self.on_reset {
            callback();
        }
    }

    /// What to draw this frame: the active surface mesh and the bind group
    /// referencing the current accumulation snapshot. None while hidden or
    /// uninitialized.
    pub fn active_draw(&self) -> Option<(&SurfaceSlot, &wgpu::BindGroup)> {
        let slot = self.binder.as_ref()?.active()?;
        let bind_group = self.material.active_bind_group()?;
        Some((slot, bind_group))
    }

    /// Total samples applied since the accumulation state was created.
    pub fn sample_count(&self) -> u64 {
        self.accum.as_ref().map_or(0, |a| a.grid().sample_count())
    }

    fn log_throughput(&mut self) {
        let elapsed = self.log_timer.elapsed().as_secs_f64();
        if elapsed >= THROUGHPUT_LOG_INTERVAL {
            if self.samples_window > 0 {
                log::info!(
                    "accumulated {} samples ({:.0}/s), total {}",
                    self.samples_window,
                    self.samples_window as f64 / elapsed,
                    self.sample_count(),
                );
            }
            self.samples_window = 0;
            self.log_timer = Instant::now();
        }
    }
}

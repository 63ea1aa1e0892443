//! Heat accumulation: a CPU-authoritative intensity grid plus a ping/pong
//! pair of GPU textures. Samples splat into the grid; a flush re-uploads the
//! grid into the writable texture and swaps read/write roles, so the display
//! side never observes a partially-written pass.

use glam::Vec2;

/// Result of an accumulate call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccumStatus {
    /// Number of samples splatted this call.
    Applied(usize),
    /// No accumulation target exists yet (model data not loaded). No-op.
    Uninitialized,
}

/// Per-texel intensity grid over the surface's UV parameterization.
/// Values are unbounded above; normalization happens at display time.
pub struct AccumGrid {
    cells: Vec<f32>,
    width: usize,
    height: usize,
    sample_count: u64,
}

impl AccumGrid {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            cells: vec![0.0; width * height],
            width,
            height,
            sample_count: 0,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    /// Splat one sample at a continuous UV coordinate using bilinear
    /// weights over the four nearest texel centers. Negative deltas are
    /// clamped to zero: intensity never decreases except on reset.
    pub fn splat(&mut self, uv: Vec2, delta: f32) {
        let delta = delta.max(0.0);
        if delta == 0.0 {
            self.sample_count += 1;
            return;
        }

        let u = uv.x.clamp(0.0, 1.0);
        let v = uv.y.clamp(0.0, 1.0);

        // Texel-center space: texel (i, j) is centered at ((i+0.5)/w, (j+0.5)/h).
        let x = u * self.width as f32 - 0.5;
        let y = v * self.height as f32 - 0.5;
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;

        let weights = [
            (x0 as i64, y0 as i64, (1.0 - fx) * (1.0 - fy)),
            (x0 as i64 + 1, y0 as i64, fx * (1.0 - fy)),
            (x0 as i64, y0 as i64 + 1, (1.0 - fx) * fy),
            (x0 as i64 + 1, y0 as i64 + 1, fx * fy),
        ];

        for (cx, cy, w) in weights {
            if w <= 0.0 {
                continue;
            }
            if cx < 0 || cy < 0 || cx >= self.width as i64 || cy >= self.height as i64 {
                continue;
            }
            self.cells[cy as usize * self.width + cx as usize] += delta * w;
        }

        self.sample_count += 1;
    }

    /// Intensity at a texel.
    pub fn value_at(&self, x: usize, y: usize) -> f32 {
        self.cells[y * self.width + x]
    }

    /// Intensity at a continuous UV coordinate (nearest texel).
    pub fn sample(&self, uv: Vec2) -> f32 {
        let x = ((uv.x.clamp(0.0, 1.0) * self.width as f32) as usize).min(self.width - 1);
        let y = ((uv.y.clamp(0.0, 1.0) * self.height as f32) as usize).min(self.height - 1);
        self.value_at(x, y)
    }

    pub fn max_value(&self) -> f32 {
        self.cells.iter().copied().fold(0.0, f32::max)
    }

    /// Zero every cell and the sample count.
    pub fn reset(&mut self) {
        self.cells.fill(0.0);
        self.sample_count = 0;
    }

    /// Raw texel data for GPU upload (R32Float, row-major).
    pub fn as_texel_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.cells)
    }
}

/// Splat a batch of (uv, delta) samples into a grid, if one exists.
/// Before model data is loaded there is no grid; that case no-ops with an
/// `Uninitialized` signal instead of aborting the pipeline, and the lazy
/// sample sequence is left unconsumed.
pub fn accumulate_into<I>(grid: Option<&mut AccumGrid>, samples: I) -> AccumStatus
where
    I: IntoIterator<Item = (Vec2, f32)>,
{
    let Some(grid) = grid else {
        return AccumStatus::Uninitialized;
    };
    let mut n = 0;
    for (uv, delta) in samples {
        grid.splat(uv, delta);
        n += 1;
    }
    AccumStatus::Applied(n)
}

/// The accumulation render target: the authoritative grid plus two
/// GPU-resident textures whose read/write roles swap on each flush.
/// Exclusively owned by the engine; consumers only see `snapshot()`.
pub struct AccumulationBuffer {
    grid: AccumGrid,
    textures: [wgpu::Texture; 2],
    views: [wgpu::TextureView; 2],
    read_idx: usize,
    dirty: bool,
}

impl AccumulationBuffer {
    /// Create the texture pair. Returns None (heatmap feature disabled) if
    /// the requested resolution exceeds device limits; the rest of the
    /// scene keeps rendering.
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Option<Self> {
        let max_dim = device.limits().max_texture_dimension_2d;
        if width == 0 || height == 0 || width > max_dim || height > max_dim {
            log::error!(
                "accumulation buffer {}x{} exceeds device limit {}; heatmap disabled",
                width,
                height,
                max_dim
            );
            return None;
        }

        let make_texture = |label: &str| {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::R32Float,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            })
        };

        let textures = [make_texture("heat_ping"), make_texture("heat_pong")];
        let views = [
            textures[0].create_view(&wgpu::TextureViewDescriptor::default()),
            textures[1].create_view(&wgpu::TextureViewDescriptor::default()),
        ];

        log::info!("accumulation buffer created: {}x{} R32Float x2", width, height);

        Some(Self {
            grid: AccumGrid::new(width as usize, height as usize),
            textures,
            views,
            read_idx: 0,
            dirty: false,
        })
    }

    pub fn grid(&self) -> &AccumGrid {
        &self.grid
    }

    /// Apply a batch of (uv, delta) samples to the writable side.
    pub fn accumulate<I>(&mut self, samples: I) -> AccumStatus
    where
        I: IntoIterator<Item = (Vec2, f32)>,
    {
        let status = accumulate_into(Some(&mut self.grid), samples);
        if matches!(status, AccumStatus::Applied(n) if n > 0) {
            self.dirty = true;
        }
        status
    }

    /// Upload the grid into the writable texture and swap roles.
    /// Returns true if a swap happened (i.e. there were pending writes).
    pub fn flush(&mut self, queue: &wgpu::Queue) -> bool {
        if !self.dirty {
            return false;
        }
        let write_idx = 1 - self.read_idx;
        self.upload(queue, write_idx);
        self.read_idx = write_idx;
        self.dirty = false;
        true
    }

    /// The readable side for display binding: (ping/pong index, view).
    /// Cheap; no copy.
    pub fn snapshot(&self) -> (usize, &wgpu::TextureView) {
        (self.read_idx, &self.views[self.read_idx])
    }

    /// Both texture views, ping then pong, for bind group creation.
    pub fn views(&self) -> [&wgpu::TextureView; 2] {
        [&self.views[0], &self.views[1]]
    }

    /// Zero the grid and both textures. The readable side is zeroed in
    /// place, so a snapshot taken immediately after is all-zero.
    pub fn reset(&mut self, queue: &wgpu::Queue) {
        self.grid.reset();
        self.upload(queue, 0);
        self.upload(queue, 1);
        self.dirty = false;
    }

    fn upload(&self, queue: &wgpu::Queue, idx: usize) {
        let width = self.grid.width() as u32;
        let height = self.grid.height() as u32;
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.textures[idx],
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            self.grid.as_texel_bytes(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulation_is_monotonic() {
        let mut grid = AccumGrid::new(16, 16);
        let mut rng = fastrand::Rng::with_seed(7);
        let mut prev = vec![0.0f32; 16 * 16];

        for _ in 0..200 {
            let uv = Vec2::new(rng.f32(), rng.f32());
            grid.splat(uv, rng.f32() * 0.5);
            for y in 0..16 {
                for x in 0..16 {
                    let v = grid.value_at(x, y);
                    assert!(v >= prev[y * 16 + x], "texel ({x},{y}) decreased");
                    prev[y * 16 + x] = v;
                }
            }
        }
    }

    #[test]
    fn accumulating_without_a_grid_signals_uninitialized() {
        // Samples can arrive before model data is loaded; the engine must
        // get a no-op signal back, never a panic or a lost-write.
        let samples = [(Vec2::new(0.5, 0.5), 1.0)];
        assert_eq!(
            accumulate_into(None, samples.iter().copied()),
            AccumStatus::Uninitialized
        );

        let mut grid = AccumGrid::new(4, 4);
        assert_eq!(
            accumulate_into(Some(&mut grid), samples.iter().copied()),
            AccumStatus::Applied(1)
        );
        assert!(grid.max_value() > 0.0);
    }

    #[test]
    fn negative_delta_is_clamped() {
        let mut grid = AccumGrid::new(8, 8);
        grid.splat(Vec2::new(0.5, 0.5), 1.0);
        let before = grid.max_value();
        grid.splat(Vec2::new(0.5, 0.5), -5.0);
        assert_eq!(grid.max_value(), before);
    }

    #[test]
    fn reset_zeroes_every_texel() {
        let mut grid = AccumGrid::new(32, 32);
        let mut rng = fastrand::Rng::with_seed(3);
        for _ in 0..500 {
            grid.splat(Vec2::new(rng.f32(), rng.f32()), 1.0);
        }
        assert!(grid.max_value() > 0.0);

        grid.reset();
        for y in 0..32 {
            for x in 0..32 {
                assert_eq!(grid.value_at(x, y), 0.0);
            }
        }
        assert_eq!(grid.sample_count(), 0);
    }

    #[test]
    fn texel_center_splat_lands_on_one_texel() {
        // On a 3x3 grid, uv (0.5, 0.5) is exactly the center texel's center.
        let mut grid = AccumGrid::new(3, 3);
        for _ in 0..3 {
            grid.splat(Vec2::new(0.5, 0.5), 1.0);
        }
        assert!((grid.value_at(1, 1) - 3.0).abs() < 1e-6);
        for (x, y) in [(0, 0), (1, 0), (2, 0), (0, 1), (2, 1), (0, 2), (1, 2), (2, 2)] {
            assert_eq!(grid.value_at(x, y), 0.0, "neighbor ({x},{y}) should be untouched");
        }
        assert_eq!(grid.sample_count(), 3);
    }

    #[test]
    fn bilinear_splat_distributes_full_delta() {
        // Interior off-center sample: the four weights sum to the delta.
        let mut grid = AccumGrid::new(8, 8);
        grid.splat(Vec2::new(0.4, 0.6), 2.0);
        let total: f32 = (0..8)
            .flat_map(|y| (0..8).map(move |x| (x, y)))
            .map(|(x, y)| grid.value_at(x, y))
            .sum();
        assert!((total - 2.0).abs() < 1e-5);
    }

    #[test]
    fn corner_uv_clamps_into_grid() {
        let mut grid = AccumGrid::new(4, 4);
        grid.splat(Vec2::new(0.0, 0.0), 1.0);
        grid.splat(Vec2::new(1.0, 1.0), 1.0);
        // Corner samples lose the out-of-bounds share but never write
        // outside the grid or panic.
        assert!(grid.value_at(0, 0) > 0.0);
        assert!(grid.value_at(3, 3) > 0.0);
    }

    #[test]
    fn scenario_three_unit_samples_map_to_ramp_top() {
        use crate::heatmap::colormap::{self, DisplayConfig, GradientStyle};

        let mut grid = AccumGrid::new(3, 3);
        for _ in 0..3 {
            grid.splat(Vec2::new(0.5, 0.5), 1.0);
        }

        let cfg = DisplayConfig {
            min_heat: 0.0,
            max_heat: 3.0,
            gradient_style: GradientStyle::Thermal,
            use_transparency: false,
        };

        // Read back through the same UV lookup the display side uses.
        let hot = colormap::map(grid.sample(Vec2::new(0.5, 0.5)), &cfg);
        let ramp = GradientStyle::Thermal.ramp();
        let top = ramp[ramp.len() - 1];
        assert_eq!(hot, [top[0], top[1], top[2], 1.0]);

        let cold = colormap::map(grid.sample(Vec2::new(0.0, 0.0)), &cfg);
        let bottom = ramp[0];
        assert_eq!(cold, [bottom[0], bottom[1], bottom[2], 1.0]);
    }
}

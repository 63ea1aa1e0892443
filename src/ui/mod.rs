pub mod history;

use winit::window::Window;

use self::history::FrameHistory;
use crate::heatmap::colormap::{DisplayConfig, GradientStyle};
use crate::render::GpuState;

/// Number of frame times to keep in the histogram.
const FRAME_HISTORY_LEN: usize = 300;
/// How often to log FPS (seconds).
const FPS_LOG_INTERVAL: f64 = 5.0;

/// Control panel powered by egui: playback transport plus display
/// configuration. The app reads the public control fields once per frame.
pub struct ControlPanel {
    pub egui_ctx: egui::Context,
    pub egui_state: egui_winit::State,
    pub egui_renderer: egui_wgpu::Renderer,

    /// Rolling window of frame times (seconds).
    frame_times: FrameHistory,
    fps: f64,
    frame_time_avg: f64,
    frame_time_min: f64,
    frame_time_max: f64,

    // Playback controls.
    pub playing: bool,
    pub looping: bool,
    pub speed: f32,
    /// One-shot: reset button pressed this frame.
    pub reset_clicked: bool,
    /// One-shot: user dragged the timeline to this position.
    pub scrub_target: Option<f32>,

    // Display configuration.
    pub min_heat: f32,
    pub max_heat: f32,
    pub gradient_index: usize,
    pub use_transparency: bool,

    // Geometry.
    pub use_plane_geometry: bool,
    pub is_visible: bool,

    // Stats accumulator.
    frame_count: u64,
    log_timer: f64,
    log_frame_count: u32,
    log_frame_sum: f64,
    log_frame_min: f64,
    log_frame_max: f64,
}

/// Read-only status displayed by the panel each frame.
pub struct PanelStatus {
    pub current_time: f32,
    pub duration: f32,
    pub sample_count: u64,
    pub has_model: bool,
}

impl ControlPanel {
    pub fn new(window: &Window, gpu: &GpuState) -> Self {
        let egui_ctx = egui::Context::default();

        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            Some(gpu.device.limits().max_texture_dimension_2d as usize),
        );

        let egui_renderer = egui_wgpu::Renderer::new(
            &gpu.device,
            gpu.surface_config.format,
            egui_wgpu::RendererOptions {
                depth_stencil_format: None,
                msaa_samples: 1,
                dithering: true,
                predictable_texture_filtering: false,
            },
        );

        Self {
            egui_ctx,
            egui_state,
            egui_renderer,
            frame_times: FrameHistory::new(FRAME_HISTORY_LEN),
            fps: 0.0,
            frame_time_avg: 0.0,
            frame_time_min: 0.0,
            frame_time_max: 0.0,
            playing: false,
            looping: false,
            speed: 1.0,
            reset_clicked: false,
            scrub_target: None,
            min_heat: 0.0,
            max_heat: 1.0,
            gradient_index: 0,
            use_transparency: false,
            use_plane_geometry: true,
            is_visible: true,
            frame_count: 0,
            log_timer: 0.0,
            log_frame_count: 0,
            log_frame_sum: 0.0,
            log_frame_min: f64::MAX,
            log_frame_max: 0.0,
        }
    }

    /// The display configuration as currently set in the panel.
    pub fn display_config(&self) -> DisplayConfig {
        DisplayConfig {
            min_heat: self.min_heat,
            max_heat: self.max_heat,
            gradient_style: GradientStyle::ALL[self.gradient_index],
            use_transparency: self.use_transparency,
        }
    }

    /// Record a frame time, update rolling stats, and periodically log.
    pub fn record_frame(&mut self, dt: f64) {
        self.frame_count += 1;
        self.frame_times.push(dt);

        if let Some(stats) = self.frame_times.stats() {
            self.frame_time_avg = stats.avg;
            self.frame_time_min = stats.min;
            self.frame_time_max = stats.max;
            self.fps = 1.0 / stats.avg;
        }

        self.log_frame_count += 1;
        self.log_frame_sum += dt;
        self.log_frame_min = self.log_frame_min.min(dt);
        self.log_frame_max = self.log_frame_max.max(dt);
        self.log_timer += dt;

        if self.log_timer >= FPS_LOG_INTERVAL {
            let avg_ms = (self.log_frame_sum / self.log_frame_count as f64) * 1000.0;
            let fps = self.log_frame_count as f64 / self.log_timer;
            log::info!(
                "FPS: {:.0} | avg: {:.2}ms | min: {:.2}ms | max: {:.2}ms | total frames: {}",
                fps,
                avg_ms,
                self.log_frame_min * 1000.0,
                self.log_frame_max * 1000.0,
                self.frame_count,
            );
            self.log_timer = 0.0;
            self.log_frame_count = 0;
            self.log_frame_sum = 0.0;
            self.log_frame_min = f64::MAX;
            self.log_frame_max = 0.0;
        }
    }

    /// Forward a winit event to egui. Returns true if egui consumed it.
    pub fn on_window_event(
        &mut self,
        window: &Window,
        event: &winit::event::WindowEvent,
    ) -> bool {
        let response = self.egui_state.on_window_event(window, event);
        response.consumed
    }

    /// Run the egui frame and produce paint output.
    pub fn run_frame(
        &mut self,
        window: &Window,
        screen_w: u32,
        screen_h: u32,
        status: &PanelStatus,
    ) -> (
        Vec<egui::epaint::ClippedPrimitive>,
        egui::TexturesDelta,
        egui_wgpu::ScreenDescriptor,
    ) {
        let raw_input = self.egui_state.take_egui_input(window);

        let stats = StatsSnapshot {
            fps: self.fps,
            frame_time_avg: self.frame_time_avg,
            frame_time_min: self.frame_time_min,
            frame_time_max: self.frame_time_max,
            frame_times: self.frame_times.iter().collect(),
        };

        // Mutable controls — copied out, written back after run() (avoids
        // a borrow conflict between egui_ctx.run() and the closure).
        let mut playing = self.playing;
        let mut looping = self.looping;
        let mut speed = self.speed;
        let mut reset_clicked = false;
        let mut scrub_pos = status.current_time;
        let mut min_heat = self.min_heat;
        let mut max_heat = self.max_heat;
        let mut gradient_index = self.gradient_index;
        let mut use_transparency = self.use_transparency;
        let mut use_plane_geometry = self.use_plane_geometry;
        let mut is_visible = self.is_visible;

        let ctx = self.egui_ctx.clone();
        let full_output = ctx.run(raw_input, |ctx| {
            draw_ui(
                ctx,
                status,
                &stats,
                &mut playing,
                &mut looping,
                &mut speed,
                &mut reset_clicked,
                &mut scrub_pos,
                &mut min_heat,
                &mut max_heat,
                &mut gradient_index,
                &mut use_transparency,
                &mut use_plane_geometry,
                &mut is_visible,
            );
        });

        self.playing = playing;
        self.looping = looping;
        self.speed = speed;
        self.reset_clicked = reset_clicked;
        self.scrub_target = if (scrub_pos - status.current_time).abs() > f32::EPSILON {
            Some(scrub_pos)
        } else {
            None
        };
        self.min_heat = min_heat;
        self.max_heat = max_heat;
        self.gradient_index = gradient_index;
        self.use_transparency = use_transparency;
        self.use_plane_geometry = use_plane_geometry;
        self.is_visible = is_visible;

        self.egui_state
            .handle_platform_output(window, full_output.platform_output);

        let pixels_per_point = full_output.pixels_per_point;
        let clipped_primitives = self.egui_ctx.tessellate(full_output.shapes, pixels_per_point);

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [screen_w, screen_h],
            pixels_per_point,
        };

        (clipped_primitives, full_output.textures_delta, screen_descriptor)
    }

    /// Upload egui textures and buffers. Call before the egui render pass.
    pub fn prepare_egui(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        primitives: &[egui::epaint::ClippedPrimitive],
        textures_delta: &egui::TexturesDelta,
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
    ) -> Vec<wgpu::CommandBuffer> {
        for (id, image_delta) in &textures_delta.set {
            self.egui_renderer
                .update_texture(device, queue, *id, image_delta);
        }

        self.egui_renderer
            .update_buffers(device, queue, encoder, primitives, screen_descriptor)
    }

    /// Render egui into the given render pass.
    pub fn render_egui(
        &self,
        render_pass: &mut wgpu::RenderPass<'static>,
        primitives: &[egui::epaint::ClippedPrimitive],
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
    ) {
        self.egui_renderer
            .render(render_pass, primitives, screen_descriptor);
    }

    /// Free textures after present.
    pub fn free_textures(&mut self, textures_delta: &egui::TexturesDelta) {
        for &id in &textures_delta.free {
            self.egui_renderer.free_texture(&id);
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot + free-function draw (avoids borrow conflicts with egui_ctx)
// ---------------------------------------------------------------------------

struct StatsSnapshot {
    fps: f64,
    frame_time_avg: f64,
    frame_time_min: f64,
    frame_time_max: f64,
    frame_times: Vec<f64>,
}

#[allow(clippy::too_many_arguments)]
fn draw_ui(
    ctx: &egui::Context,
    status: &PanelStatus,
    stats: &StatsSnapshot,
    playing: &mut bool,
    looping: &mut bool,
    speed: &mut f32,
    reset_clicked: &mut bool,
    scrub_pos: &mut f32,
    min_heat: &mut f32,
    max_heat: &mut f32,
    gradient_index: &mut usize,
    use_transparency: &mut bool,
    use_plane_geometry: &mut bool,
    is_visible: &mut bool,
) {
    let panel_frame = egui::Frame::NONE
        .fill(egui::Color32::from_rgba_unmultiplied(20, 20, 20, 220))
        .corner_radius(6.0)
        .inner_margin(10.0);

    egui::Window::new("Heatmap")
        .default_pos([10.0, 10.0])
        .default_width(320.0)
        .resizable(true)
        .frame(panel_frame)
        .show(ctx, |ui| {
            ui.style_mut().visuals.override_text_color = Some(egui::Color32::from_gray(220));

            // --- Playback ---
            ui.heading("Playback");
            ui.horizontal(|ui| {
                let label = if *playing { "Pause" } else { "Play" };
                if ui.button(label).clicked() {
                    *playing = !*playing;
                }
                if ui.button("Reset").clicked() {
                    *reset_clicked = true;
                }
                ui.checkbox(looping, "Loop");
            });
            ui.horizontal(|ui| {
                ui.label(format!(
                    "{:.1}s / {:.1}s",
                    status.current_time, status.duration
                ));
                ui.label(format!("{} samples", status.sample_count));
            });
            ui.add(
                egui::Slider::new(scrub_pos, 0.0..=status.duration.max(0.001))
                    .text("Timeline"),
            );
            ui.add(egui::Slider::new(speed, 0.1..=10.0).logarithmic(true).text("Speed"));
            ui.add_space(4.0);

            // --- Display ---
            ui.heading("Display");
            ui.horizontal(|ui| {
                ui.label("Heat range:");
                ui.add(egui::DragValue::new(min_heat).speed(0.01).prefix("min "));
                ui.add(egui::DragValue::new(max_heat).speed(0.01).prefix("max "));
            });
            egui::ComboBox::from_label("Gradient")
                .selected_text(GradientStyle::ALL[*gradient_index].label())
                .show_ui(ui, |ui| {
                    for (i, style) in GradientStyle::ALL.iter().enumerate() {
                        ui.selectable_value(gradient_index, i, style.label());
                    }
                });
            ui.checkbox(use_transparency, "Transparency");
            ui.add_space(4.0);

            // --- Geometry ---
            ui.heading("Geometry");
            ui.checkbox(is_visible, "Show heatmap");
            ui.horizontal(|ui| {
                ui.radio_value(use_plane_geometry, true, "Plane");
                ui.add_enabled_ui(status.has_model, |ui| {
                    ui.radio_value(use_plane_geometry, false, "Model");
                });
            });
            if !status.has_model {
                ui.label(egui::RichText::new("no model loaded (--model path.obj)").weak());
            }
            ui.add_space(4.0);

            // --- Performance ---
            ui.heading("Performance");
            ui.label(format!("FPS: {:.1}", stats.fps));
            ui.label(format!(
                "Frame: {:.2}ms avg | {:.2} min | {:.2} max",
                stats.frame_time_avg * 1000.0,
                stats.frame_time_min * 1000.0,
                stats.frame_time_max * 1000.0,
            ));

            if !stats.frame_times.is_empty() {
                let max_time = stats
                    .frame_times
                    .iter()
                    .copied()
                    .fold(0.0f64, f64::max)
                    .max(0.020);

                let (response, painter) =
                    ui.allocate_painter(egui::vec2(300.0, 48.0), egui::Sense::hover());
                let rect = response.rect;

                let bar_width = rect.width() / stats.frame_times.len() as f32;
                for (i, &t) in stats.frame_times.iter().enumerate() {
                    let h = (t / max_time) as f32 * rect.height();
                    let x = rect.left() + i as f32 * bar_width;
                    let color = if t > 0.01667 {
                        egui::Color32::from_rgb(255, 100, 80)
                    } else {
                        egui::Color32::from_rgb(80, 200, 120)
                    };
                    painter.rect_filled(
                        egui::Rect::from_min_max(
                            egui::pos2(x, rect.bottom() - h),
                            egui::pos2(x + bar_width - 1.0, rect.bottom()),
                        ),
                        0.0,
                        color,
                    );
                }
            }

            ui.add_space(2.0);
            ui.label(
                egui::RichText::new("drag: orbit | wheel: zoom | space: play/pause")
                    .weak()
                    .small(),
            );
        });
}

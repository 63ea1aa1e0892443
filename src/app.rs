use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use instant::Instant;
use winit::application::ApplicationHandler;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::heatmap::{GeometryFlags, HeatmapEngine};
use crate::model::HeatmapModelData;
use crate::playback::PlaybackController;
use crate::render::camera::OrbitCamera;
use crate::render::GpuState;
use crate::trace::{BehaviorTrace, SampleFeed};
use crate::ui::{ControlPanel, PanelStatus};

/// Synthetic trace parameters, used when no --trace file is given.
const SYNTH_DURATION: f32 = 120.0;
const SYNTH_RATE_HZ: f32 = 60.0;
const SYNTH_SEED: u64 = 0xC0FFEE;

/// Initial window size.
const WINDOW_WIDTH: u32 = 1280;
const WINDOW_HEIGHT: u32 = 800;

/// Paths supplied on the command line.
pub struct LaunchOptions {
    pub model_path: Option<PathBuf>,
    pub trace_path: Option<PathBuf>,
}

/// Top-level application state.
struct App {
    opts: LaunchOptions,

    window: Option<Arc<Window>>,
    gpu: Option<GpuState>,
    engine: Option<HeatmapEngine>,
    feed: Option<SampleFeed>,
    playback: Option<PlaybackController>,
    panel: Option<ControlPanel>,

    camera: OrbitCamera,
    /// Set by the engine's on_reset callback; the app settles the
    /// controller's is_reset flag when it sees this.
    reset_ack: Rc<Cell<bool>>,

    last_frame_time: Option<Instant>,
    dragging: bool,
    last_cursor: Option<(f32, f32)>,
}

impl App {
    fn new(opts: LaunchOptions) -> Self {
        Self {
            opts,
            window: None,
            gpu: None,
            engine: None,
            feed: None,
            playback: None,
            panel: None,
            camera: OrbitCamera::new(),
            reset_ack: Rc::new(Cell::new(false)),
            last_frame_time: None,
            dragging: false,
            last_cursor: None,
        }
    }

    fn load_trace(&self) -> BehaviorTrace {
        match &self.opts.trace_path {
            Some(path) => match BehaviorTrace::from_csv(path) {
                Ok(trace) if !trace.is_empty() => trace,
                Ok(_) => {
                    log::warn!("trace {:?} is empty, falling back to synthetic", path);
                    BehaviorTrace::synth_wander(SYNTH_DURATION, SYNTH_RATE_HZ, SYNTH_SEED)
                }
                Err(e) => {
                    log::error!("failed to load trace {:?}: {e}", path);
                    BehaviorTrace::synth_wander(SYNTH_DURATION, SYNTH_RATE_HZ, SYNTH_SEED)
                }
            },
            None => BehaviorTrace::synth_wander(SYNTH_DURATION, SYNTH_RATE_HZ, SYNTH_SEED),
        }
    }

    fn load_model_data(&self) -> HeatmapModelData {
        match HeatmapModelData::load(self.opts.model_path.as_deref()) {
            Ok(data) => data,
            Err(e) => {
                log::error!("failed to import model: {e}; continuing with plane only");
                HeatmapModelData::load(None).expect("plane generation cannot fail")
            }
        }
    }

    /// Run one frame: advance playback, drive the engine, render.
    fn redraw(&mut self) {
        let now = Instant::now();
        let dt = self
            .last_frame_time
            .map(|last| now.duration_since(last).as_secs_f64())
            .unwrap_or(0.0);
        self.last_frame_time = Some(now);

        let (
            Some(window),
            Some(gpu),
            Some(engine),
            Some(feed),
            Some(playback),
            Some(panel),
        ) = (
            self.window.as_ref(),
            self.gpu.as_mut(),
            self.engine.as_mut(),
            self.feed.as_mut(),
            self.playback.as_mut(),
            self.panel.as_mut(),
        )
        else {
            return;
        };

        panel.record_frame(dt);
        playback.advance(dt as f32);

        // --- UI frame ---
        // The controller is authoritative for play state (it pauses itself
        // at end of trace); the panel toggles it.
        panel.playing = playback.is_playing;
        let status = PanelStatus {
            current_time: playback.current_time(),
            duration: playback.duration(),
            sample_count: engine.sample_count(),
            has_model: engine.has_model(),
        };
        let (primitives, textures_delta, screen_descriptor) = panel.run_frame(
            window,
            gpu.surface_config.width,
            gpu.surface_config.height,
            &status,
        );

        // --- Apply panel controls ---
        playback.is_playing = panel.playing;
        playback.speed = panel.speed;
        playback.looping = panel.looping;
        if panel.reset_clicked {
            playback.request_reset();
        }
        if let Some(t) = panel.scrub_target.take() {
            playback.scrub_to(t);
        }

        // --- Drive the heatmap pipeline ---
        engine.tick(
            &gpu.queue,
            playback.snapshot(),
            &panel.display_config(),
            GeometryFlags {
                use_plane_geometry: panel.use_plane_geometry,
                is_visible: panel.is_visible,
            },
            feed,
        );
        if self.reset_ack.get() {
            playback.settle_reset();
            self.reset_ack.set(false);
        }

        // --- Render ---
        if let Some(pipeline) = &gpu.surface_pipeline {
            pipeline.update_camera(&gpu.queue, self.camera.view_proj(gpu.aspect()));
        }

        let Some(mut frame) = gpu.begin_frame() else {
            return;
        };

        gpu.draw_scene(&mut frame.encoder, &frame.view, engine.active_draw());

        let extra_cmd_bufs = panel.prepare_egui(
            &gpu.device,
            &gpu.queue,
            &mut frame.encoder,
            &primitives,
            &textures_delta,
            &screen_descriptor,
        );
        {
            let mut egui_pass = GpuState::begin_egui_pass(&mut frame.encoder, &frame.view);
            panel.render_egui(&mut egui_pass, &primitives, &screen_descriptor);
        }

        gpu.finish_frame(frame.encoder, frame.output, extra_cmd_bufs);
        panel.free_textures(&textures_delta);
    }

    fn handle_key(&mut self, key: &Key, state: ElementState) {
        if state != ElementState::Pressed {
            return;
        }
        match key {
            Key::Named(NamedKey::Space) => {
                if let (Some(playback), Some(panel)) =
                    (self.playback.as_mut(), self.panel.as_mut())
                {
                    playback.is_playing = !playback.is_playing;
                    panel.playing = playback.is_playing;
                }
            }
            Key::Character(c) if c.as_str() == "r" => {
                if let Some(playback) = self.playback.as_mut() {
                    playback.request_reset();
                }
            }
            _ => {}
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attrs = WindowAttributes::default()
            .with_title("heatlens")
            .with_inner_size(winit::dpi::PhysicalSize::new(WINDOW_WIDTH, WINDOW_HEIGHT));

        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .expect("failed to create window"),
        );

        let mut gpu = GpuState::new(window.clone());
        let mut engine = HeatmapEngine::new(&gpu.device);
        gpu.attach_surface_pipeline(engine.material_layout());

        let ack = self.reset_ack.clone();
        engine.set_on_reset(Box::new(move || ack.set(true)));

        let model_data = self.load_model_data();
        engine.load_model(&gpu.device, model_data);

        let trace = self.load_trace();
        let feed = SampleFeed::new(trace);
        let playback = PlaybackController::new(feed.duration());

        let panel = ControlPanel::new(&window, &gpu);

        log::info!(
            "ready: {:.1}s trace, {} samples",
            feed.duration(),
            feed.trace().len()
        );

        event_loop.set_control_flow(ControlFlow::Poll);

        self.gpu = Some(gpu);
        self.engine = Some(engine);
        self.feed = Some(feed);
        self.playback = Some(playback);
        self.panel = Some(panel);
        self.window = Some(window);
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(w) = &self.window {
            w.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let consumed = match (self.panel.as_mut(), self.window.as_ref()) {
            (Some(panel), Some(window)) => panel.on_window_event(window, &event),
            _ => false,
        };

        match event {
            WindowEvent::CloseRequested => {
                log::info!("close requested, exiting");
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let Some(gpu) = &mut self.gpu {
                    gpu.resize(new_size.width, new_size.height);
                }
            }
            WindowEvent::KeyboardInput { event, .. } if !consumed => {
                self.handle_key(&event.logical_key, event.state);
            }
            WindowEvent::MouseInput { state, button, .. } if !consumed => {
                if button == MouseButton::Left {
                    self.dragging = state == ElementState::Pressed;
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                let pos = (position.x as f32, position.y as f32);
                if self.dragging && !consumed {
                    if let Some((lx, ly)) = self.last_cursor {
                        self.camera.orbit(pos.0 - lx, pos.1 - ly);
                    }
                }
                self.last_cursor = Some(pos);
            }
            WindowEvent::MouseWheel { delta, .. } if !consumed => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / 40.0,
                };
                self.camera.zoom(lines);
            }
            WindowEvent::RedrawRequested => {
                self.redraw();
            }
            _ => {}
        }
    }
}

/// Entry point — create event loop and run.
pub fn run(opts: LaunchOptions) -> Result<(), Box<dyn std::error::Error>> {
    let event_loop = EventLoop::new()?;
    let mut app = App::new(opts);
    event_loop.run_app(&mut app)?;
    Ok(())
}

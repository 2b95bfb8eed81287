use anyhow::Result;
use gonogo_core::{Key, Screen};
use gonogo_engine::{deliver_results, InputRouter, TaskConfig, TaskRunner};
use gonogo_render::{load_font, TaskRenderer};
use gonogo_timing::{precise_sleep, Clock, FrameMonitor, MonotonicClock};
use pixels::{Pixels, SurfaceTexture};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::NamedKey,
    window::{Fullscreen, Window, WindowId},
};

use crate::host::FileHost;

/// Within this distance of a deadline the loop stops waiting on the event
/// queue and finishes with a precise sleep instead.
const SPIN_THRESHOLD_NS: u64 = 2_000_000;
/// Wake a little before the deadline so the precise tail has room.
const WAKE_MARGIN_NS: u64 = 1_500_000;

const FRAME_LOG_INTERVAL: usize = 300;

pub struct App {
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    renderer: Option<TaskRenderer>,
    runner: TaskRunner<MonotonicClock>,
    router: InputRouter,
    host: FileHost,
    clock: MonotonicClock,
    frames: FrameMonitor,
    frame_count: usize,
    /// Set when the display stack failed to come up; the run never starts and
    /// a static notice is shown instead.
    failure: Option<String>,
    last_screen: Option<Screen>,
    delivered: bool,
    should_exit: bool,
}

impl App {
    pub fn new(config: TaskConfig) -> Result<Self> {
        let clock = MonotonicClock::new();
        let mut rng = rand::rng();
        let runner = TaskRunner::new(&config, &mut rng, clock.clone())?;
        Ok(Self {
            window: None,
            pixels: None,
            renderer: None,
            runner,
            router: InputRouter::install(),
            host: FileHost::new("results"),
            clock,
            frames: FrameMonitor::default(),
            frame_count: 0,
            failure: None,
            last_screen: None,
            delivered: false,
            should_exit: false,
        })
    }

    pub fn run(mut self) -> Result<()> {
        info!(
            platform = std::env::consts::OS,
            arch = std::env::consts::ARCH,
            "starting task display"
        );
        let event_loop = EventLoop::new()?;
        event_loop.run_app(&mut self)?;
        Ok(())
    }

    fn create_window_and_surface(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let monitor = event_loop
            .primary_monitor()
            .or_else(|| event_loop.available_monitors().next());

        let attributes = Window::default_attributes()
            .with_title("Go/No-Go Task")
            .with_fullscreen(Some(Fullscreen::Borderless(monitor)))
            .with_resizable(false);

        let window = Arc::new(event_loop.create_window(attributes)?);
        let size = window.inner_size();
        info!(
            width = size.width,
            height = size.height,
            scale = window.scale_factor(),
            "display surface created"
        );

        let surface = SurfaceTexture::new(size.width, size.height, window.clone());
        self.pixels = Some(Pixels::new(size.width, size.height, surface)?);

        match load_font() {
            Ok(font) => {
                self.renderer = Some(TaskRenderer::new(size.width, size.height, font)?);
                self.runner.start();
            }
            Err(e) => {
                error!(error = %e, "font load failed, task will not start");
                self.failure = Some(e.to_string());
            }
        }

        window.set_cursor_visible(false);
        window.request_redraw();
        self.window = Some(window);
        Ok(())
    }

    fn render(&mut self) -> Result<()> {
        let Some(pixels) = self.pixels.as_mut() else {
            return Ok(());
        };
        let start = Instant::now();

        let screen = match &self.failure {
            Some(message) => Screen::Failure(message.clone()),
            None => self.runner.screen(),
        };
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.render(&screen);
            pixels.frame_mut().copy_from_slice(renderer.frame());
        } else {
            // No font, no renderer: a solid dark red frame is all we can do.
            for px in pixels.frame_mut().chunks_exact_mut(4) {
                px.copy_from_slice(&[90, 20, 20, 255]);
            }
        }
        pixels.render()?;

        self.frames.record(start.elapsed());
        self.last_screen = Some(screen);
        self.frame_count += 1;
        if self.frame_count % FRAME_LOG_INTERVAL == 0 {
            let report = self.frames.report();
            debug!(
                mean_ms = report.mean_ns / 1e6,
                jitter_ms = report.jitter_ns / 1e6,
                fps = report.effective_fps,
                "frame health"
            );
        }
        Ok(())
    }

    fn redraw_if_changed(&mut self) {
        let current = match &self.failure {
            Some(message) => Screen::Failure(message.clone()),
            None => self.runner.screen(),
        };
        if self.last_screen.as_ref() != Some(&current) {
            if let Some(window) = &self.window {
                window.request_redraw();
            }
        }
    }

    fn handle_key(&mut self, logical: &winit::keyboard::Key, event_loop: &ActiveEventLoop) {
        if matches!(logical, winit::keyboard::Key::Named(NamedKey::Escape)) {
            warn!("escape pressed, aborting run without export");
            self.cleanup_and_exit(event_loop);
            return;
        }
        if let Some(key) = map_key(logical) {
            self.router.route(key, &mut self.runner);
            self.maybe_deliver(event_loop);
            self.redraw_if_changed();
        }
    }

    /// Exports once, the moment the run reaches its finished state.
    fn maybe_deliver(&mut self, event_loop: &ActiveEventLoop) {
        if self.delivered || !self.runner.is_finished() {
            return;
        }
        self.delivered = true;
        match deliver_results(&mut self.runner, &mut self.host, &mut self.router) {
            Ok(()) => info!("run complete"),
            Err(e) => error!(error = %e, "result delivery failed"),
        }
        self.cleanup_and_exit(event_loop);
    }

    fn handle_resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        if let Some(pixels) = &mut self.pixels {
            if let Err(e) = pixels.resize_surface(new_size.width, new_size.height) {
                error!(error = %e, "surface resize failed");
            }
            if let Err(e) = pixels.resize_buffer(new_size.width, new_size.height) {
                error!(error = %e, "buffer resize failed");
            }
        }
        if let Some(renderer) = &mut self.renderer {
            if let Err(e) = renderer.resize(new_size.width, new_size.height) {
                error!(error = %e, "canvas resize failed");
            }
        }
        self.last_screen = None;
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn cleanup_and_exit(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.set_cursor_visible(true);
        }
        self.router.remove();
        self.should_exit = true;
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.create_window_and_surface(event_loop) {
                error!(error = %e, "display startup failed");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.cleanup_and_exit(event_loop),
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.render() {
                    error!(error = %e, "render failed");
                    self.cleanup_and_exit(event_loop);
                }
            }
            WindowEvent::KeyboardInput { event, .. } if event.state.is_pressed() => {
                self.handle_key(&event.logical_key, event_loop);
            }
            WindowEvent::Resized(size) => self.handle_resize(size),
            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(window) = &self.window {
                    self.handle_resize(window.inner_size());
                }
            }
            _ => {}
        }
    }

    /// Drives step timing. Far from a deadline the loop parks on the event
    /// queue; inside the spin threshold it finishes the wait with a precise
    /// sleep so step transitions land within a millisecond of schedule.
    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.should_exit {
            event_loop.exit();
            return;
        }
        let Some(deadline_ns) = self.runner.next_deadline_ns() else {
            event_loop.set_control_flow(ControlFlow::Wait);
            return;
        };
        let now = self.clock.now_ns();
        if deadline_ns <= now.saturating_add(SPIN_THRESHOLD_NS) {
            if deadline_ns > now {
                precise_sleep(Duration::from_nanos(deadline_ns - now));
            }
            self.runner.tick();
            self.maybe_deliver(event_loop);
            self.redraw_if_changed();
            event_loop.set_control_flow(ControlFlow::Poll);
        } else {
            let wake = self.clock.instant_at(deadline_ns.saturating_sub(WAKE_MARGIN_NS));
            event_loop.set_control_flow(ControlFlow::WaitUntil(wake));
        }
    }
}

fn map_key(logical: &winit::keyboard::Key) -> Option<Key> {
    match logical {
        winit::keyboard::Key::Character(text) => text.chars().next().map(Key),
        winit::keyboard::Key::Named(NamedKey::Space) => Some(Key(' ')),
        winit::keyboard::Key::Named(NamedKey::Enter) => Some(Key('\n')),
        _ => None,
    }
}

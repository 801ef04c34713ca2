use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use image::RgbaImage;
use notify::RecommendedWatcher;
use tracing::{debug, error, info, warn};
use wgpu::SurfaceError;
use winit::{
    application::ApplicationHandler,
    dpi::{PhysicalPosition, PhysicalSize},
    event::{ElementState, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop, EventLoopProxy},
    keyboard::ModifiersState,
    window::{Fullscreen, Window, WindowAttributes, WindowId},
};

use crate::catalog::{CatalogBuild, ScanOptions};
use crate::config::Settings;
use crate::events::{Flow, ViewerEvent};
use crate::geometry::Geometry;
use crate::keymap::{accepts_repeat, command_for};
use crate::render::gpu::Gpu;
use crate::services::{ImageService, Screen, Trash};
use crate::session::Session;
use crate::tasks::files::start_watcher;

/// [`Screen`] backed by a winit window and a wgpu surface.
///
/// Until the window exists, titles are remembered and frames dropped.
#[derive(Default)]
pub struct WindowScreen {
    window: Option<Arc<Window>>,
    gpu: Option<Gpu>,
    title: String,
}

impl WindowScreen {
    fn attach(&mut self, window: Arc<Window>, gpu: Gpu) {
        if !self.title.is_empty() {
            window.set_title(&self.title);
        }
        self.window = Some(window);
        self.gpu = Some(gpu);
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        if let Some(gpu) = self.gpu.as_mut() {
            gpu.resize(size.width, size.height);
        }
        self.request_redraw();
    }

    fn request_redraw(&self) {
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }

    /// Draw and present. Returns `false` when the event loop should stop.
    fn draw(&mut self) -> bool {
        let Some(gpu) = self.gpu.as_ref() else {
            return true;
        };
        match gpu.draw() {
            Ok(()) => true,
            Err(SurfaceError::Outdated | SurfaceError::Lost) => {
                info!("viewer surface lost; reconfiguring");
                if let Some(size) = self.window.as_ref().map(|w| w.inner_size()) {
                    self.resize(size);
                }
                true
            }
            Err(SurfaceError::OutOfMemory) => {
                error!("viewer surface out of memory; exiting event loop");
                false
            }
            Err(SurfaceError::Timeout) => {
                warn!("viewer surface acquisition timed out");
                true
            }
            Err(SurfaceError::Other) => {
                warn!("viewer surface reported an unknown error; retrying");
                gpu.reconfigure();
                self.request_redraw();
                true
            }
        }
    }
}

impl Screen for WindowScreen {
    fn set_title(&mut self, title: &str) {
        title.clone_into(&mut self.title);
        if let Some(window) = self.window.as_ref() {
            window.set_title(title);
        }
    }

    fn present(&mut self, image: &RgbaImage) {
        let Some(gpu) = self.gpu.as_mut() else {
            debug!("no surface yet; frame dropped");
            return;
        };
        gpu.upload(image);
        self.request_redraw();
    }

    fn set_fullscreen(&mut self, fullscreen: bool) {
        let Some(window) = self.window.as_ref() else {
            return;
        };
        if fullscreen {
            window.set_fullscreen(Some(Fullscreen::Borderless(window.current_monitor())));
        } else {
            window.set_fullscreen(None);
        }
    }

    fn monitor_size(&self) -> Option<(u32, u32)> {
        let monitor = self.window.as_ref()?.current_monitor()?;
        let size = monitor.size();
        Some((size.width, size.height))
    }
}

struct ViewerApp<I, T> {
    session: Session<WindowScreen, I, T>,
    geometry: Geometry,
    scan: ScanOptions,
    watch: bool,
    proxy: EventLoopProxy<ViewerEvent>,
    watcher: Option<RecommendedWatcher>,
    modifiers: ModifiersState,
    window_id: Option<WindowId>,
    failure: Option<anyhow::Error>,
}

impl<I, T> ViewerApp<I, T>
where
    I: ImageService,
    T: Trash,
{
    fn create_window(&mut self, event_loop: &ActiveEventLoop) -> Result<Arc<Window>> {
        let g = self.geometry;
        let mut attrs = WindowAttributes::default()
            .with_title("reel")
            .with_inner_size(PhysicalSize::new(g.width, g.height))
            .with_position(PhysicalPosition::new(g.x, g.y));
        if self.session.is_fullscreen() {
            attrs = attrs.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }
        let window = event_loop
            .create_window(attrs)
            .context("failed to create viewer window")?;
        Ok(Arc::new(window))
    }

    fn start_watching(&mut self) {
        if !self.watch || self.watcher.is_some() {
            return;
        }
        let proxy = self.proxy.clone();
        let res = start_watcher(
            &self.scan.roots,
            self.scan.recursive,
            self.scan.extensions.clone(),
            move || {
                if proxy.send_event(ViewerEvent::LibraryChanged).is_err() {
                    debug!("event loop closed; change dropped");
                }
            },
        );
        match res {
            Ok(watcher) => self.watcher = Some(watcher),
            Err(err) => warn!(error = %err, "could not watch library; reload with F5"),
        }
    }

    fn follow(&mut self, flow: Flow, event_loop: &ActiveEventLoop) {
        if flow == Flow::Exit {
            info!("viewer exiting");
            event_loop.exit();
        }
    }
}

impl<I, T> ApplicationHandler<ViewerEvent> for ViewerApp<I, T>
where
    I: ImageService,
    T: Trash,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window_id.is_some() {
            return;
        }
        let window = match self.create_window(event_loop) {
            Ok(window) => window,
            Err(err) => {
                error!(error = ?err, "failed to create window");
                self.failure = Some(err);
                event_loop.exit();
                return;
            }
        };
        let gpu = match Gpu::new(window.clone()) {
            Ok(gpu) => gpu,
            Err(err) => {
                error!(error = ?err, "failed to initialize GPU state");
                self.failure = Some(err);
                event_loop.exit();
                return;
            }
        };
        self.window_id = Some(window.id());
        let size = window.inner_size();
        self.session.screen_mut().attach(window, gpu);
        self.session.handle_resize(size.width, size.height);

        let flow = self.session.start();
        self.follow(flow, event_loop);
        self.start_watching();
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        if self.window_id != Some(window_id) {
            return;
        }
        match event {
            WindowEvent::CloseRequested => {
                info!("viewer window close requested");
                event_loop.exit();
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                self.modifiers = modifiers.state();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state != ElementState::Pressed {
                    return;
                }
                let Some(cmd) = command_for(&event.logical_key, self.modifiers) else {
                    return;
                };
                if event.repeat && !accepts_repeat(cmd) {
                    debug!(?cmd, "ignoring key repeat");
                    return;
                }
                let flow = self.session.dispatch(cmd);
                self.follow(flow, event_loop);
            }
            WindowEvent::Resized(size) => {
                self.session.screen_mut().resize(size);
                self.session.handle_resize(size.width, size.height);
            }
            WindowEvent::RedrawRequested => {
                if !self.session.screen_mut().draw() {
                    event_loop.exit();
                }
            }
            _ => {}
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: ViewerEvent) {
        match event {
            ViewerEvent::LibraryChanged => self.session.schedule_rescan(),
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.window_id.is_none() {
            return;
        }
        let flow = self.session.run_due_timers(Instant::now());
        self.follow(flow, event_loop);
        match self.session.next_deadline() {
            Some(deadline) => event_loop.set_control_flow(ControlFlow::WaitUntil(deadline)),
            None => event_loop.set_control_flow(ControlFlow::Wait),
        }
    }
}

/// Open the window and run the slideshow over `build` until it ends.
///
/// # Errors
/// Returns an error if the catalog is empty, or the window or GPU cannot
/// be created.
pub fn run_windowed<I, T>(settings: &Settings, build: CatalogBuild, images: I, trash: T) -> Result<()>
where
    I: ImageService,
    T: Trash,
{
    let session = Session::new(settings, build, WindowScreen::default(), images, trash)?;
    let event_loop = EventLoop::<ViewerEvent>::with_user_event()
        .build()
        .context("failed to build viewer event loop")?;
    let proxy = event_loop.create_proxy();

    let mut app = ViewerApp {
        session,
        geometry: settings.geometry,
        scan: settings.scan.clone(),
        watch: settings.watch,
        proxy,
        watcher: None,
        modifiers: ModifiersState::empty(),
        window_id: None,
        failure: None,
    };
    let run_result = event_loop.run_app(&mut app);
    if let Some(err) = app.failure.take() {
        return Err(err);
    }
    run_result.context("viewer event loop failed")
}

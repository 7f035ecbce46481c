// SPDX-License-Identifier: MIT OR Apache-2.0
//! Main application setup and event loop.

use crate::colors::ColorAssignments;
use crate::config::AppConfig;
use crate::overlay::{instructions, to_sim_rect, DebugOverlay, InputOverlay, TrashZone};
use crate::storage::JsonFileStore;
use crate::tasks::TaskList;
use crate::view::BubbleLayer;
use bubbledo_physics::{
    InteractionEvent, PointerInput, SettingsError, Simulation, SimulationSettings, Vec2, Viewport,
};
use egui_wgpu::wgpu;
use std::sync::Arc;
use thiserror::Error;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

/// Window background (slate-100)
const BACKGROUND: egui::Color32 = egui::Color32::from_rgb(0xf1, 0xf5, 0xf9);

/// Application errors
#[derive(Debug, Error)]
pub enum AppError {
    /// Window creation failed
    #[error("Failed to create window: {0}")]
    WindowCreation(String),

    /// Renderer initialization failed
    #[error("Failed to initialize renderer: {0}")]
    RendererInit(String),

    /// Simulation settings could not be used
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    /// Event loop error
    #[error("Event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
}

/// Result type for application operations
pub type Result<T> = std::result::Result<T, AppError>;

/// Graphics state for wgpu rendering
struct GraphicsState {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    egui_renderer: egui_wgpu::Renderer,
}

impl GraphicsState {
    fn new(window: Arc<Window>) -> Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .map_err(|e| AppError::RendererInit(format!("surface: {e}")))?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::LowPower,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| AppError::RendererInit("no suitable GPU adapter".to_string()))?;

        tracing::info!("Using GPU: {}", adapter.get_info().name);

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("BubbleDo Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                ..Default::default()
            },
            None,
        ))
        .map_err(|e| AppError::RendererInit(format!("device: {e}")))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(wgpu::TextureFormat::is_srgb)
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| AppError::RendererInit("surface has no formats".to_string()))?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let egui_renderer = egui_wgpu::Renderer::new(&device, surface_format, None, 1, false);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            egui_renderer,
        })
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    #[allow(unsafe_code)] // Workaround for wgpu 23 lifetime issue with RenderPass
    fn render(
        &mut self,
        egui_ctx: &egui::Context,
        full_output: egui::FullOutput,
        window: &Window,
    ) -> std::result::Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("BubbleDo Encoder"),
        });

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: window.scale_factor() as f32,
        };

        let paint_jobs = egui_ctx.tessellate(full_output.shapes, full_output.pixels_per_point);

        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer.update_texture(&self.device, &self.queue, *id, image_delta);
        }

        self.egui_renderer.update_buffers(
            &self.device,
            &self.queue,
            &mut encoder,
            &paint_jobs,
            &screen_descriptor,
        );

        // wgpu 23 has a 'static lifetime bound issue with RenderPass
        // We work around this using raw pointers
        let encoder_ptr = Box::into_raw(Box::new(encoder));

        {
            // SAFETY: encoder_ptr is valid and is reclaimed only after the render pass is dropped
            let encoder_ref: &'static mut wgpu::CommandEncoder = unsafe { &mut *encoder_ptr };

            let [r, g, b, _] = egui::Rgba::from(BACKGROUND).to_array();
            let mut render_pass = encoder_ref.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("BubbleDo Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: r as f64,
                            g: g as f64,
                            b: b as f64,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.egui_renderer.render(&mut render_pass, &paint_jobs, &screen_descriptor);
        }

        // SAFETY: the render pass borrowing the encoder has been dropped
        let encoder = unsafe { Box::from_raw(encoder_ptr) };

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        Ok(())
    }
}

/// Everything the user sees and touches: tasks, colours, bubbles, overlays
struct BubbleScene {
    store: JsonFileStore,
    tasks: TaskList,
    colors: ColorAssignments,
    simulation: Simulation,
    layer: BubbleLayer,
    trash: TrashZone,
    input: InputOverlay,
    debug: DebugOverlay,
    last_viewport: Option<Viewport>,
}

impl BubbleScene {
    fn new(config: &AppConfig, settings: SimulationSettings, viewport: Viewport) -> Result<Self> {
        let mut store = JsonFileStore::open(config.store_path());
        let tasks = TaskList::load(&mut store);
        let mut colors = ColorAssignments::load(&mut store, settings.spawn.seed);
        colors.prune(tasks.tasks(), &mut store);
        let simulation = Simulation::new(settings, viewport)?;

        let mut scene = Self {
            store,
            tasks,
            colors,
            simulation,
            layer: BubbleLayer::new(),
            trash: TrashZone,
            input: InputOverlay::default(),
            debug: DebugOverlay::default(),
            last_viewport: Some(viewport),
        };
        scene.sync_tasks();
        Ok(scene)
    }

    /// Bring bodies, colours and bubble elements in line with the task list
    fn sync_tasks(&mut self) {
        let report = self.simulation.reconcile(self.tasks.tasks());
        for id in &report.created {
            self.colors.assign_if_absent(id, &mut self.store);
        }
        self.layer.sync_elements(self.tasks.tasks(), &self.colors);

        if !report.is_empty() {
            tracing::debug!(
                "Reconciled: {} created, {} removed, {} tasks",
                report.created.len(),
                report.removed.len(),
                self.tasks.len()
            );
        }
    }

    fn apply_events(&mut self, events: Vec<InteractionEvent>) {
        let mut changed = false;

        for event in events {
            match event {
                InteractionEvent::DragStarted(id) => tracing::debug!("Dragging {}", id),
                InteractionEvent::DragEnded(id) => tracing::debug!("Released {}", id),
                InteractionEvent::DeleteRequested { id, reason } => {
                    tracing::info!("Completing task {} ({:?})", id, reason);
                    changed |= self.tasks.remove(&id, &mut self.store);
                    self.colors.release(&id, &mut self.store);
                }
            }
        }

        if changed {
            self.sync_tasks();
        }
    }

    /// Translate this frame's pointer state into simulation input
    fn pointer_inputs(ctx: &egui::Context) -> Vec<PointerInput> {
        let over_ui = ctx.is_pointer_over_area();

        ctx.input(|i| {
            let mut inputs = Vec::new();
            let Some(pos) = i.pointer.latest_pos() else {
                return inputs;
            };
            let point = Vec2::new(pos.x, pos.y);

            if i.pointer.primary_pressed() && !over_ui {
                inputs.push(PointerInput::Down(point));
            }
            if i.pointer.is_moving() {
                inputs.push(PointerInput::Move(point));
            }
            if i.pointer.primary_released() {
                inputs.push(PointerInput::Up(point));
            }
            if i.pointer.button_double_clicked(egui::PointerButton::Primary) && !over_ui {
                inputs.push(PointerInput::Activate(point));
            }
            inputs
        })
    }

    /// Run one frame; returns whether another frame is wanted
    fn update(&mut self, ctx: &egui::Context) -> bool {
        let delta_time = ctx.input(|i| i.stable_dt);

        if !self.input.is_open() && ctx.input(|i| i.key_pressed(egui::Key::F1)) {
            self.debug.toggle();
        }

        let screen = ctx.screen_rect();
        let viewport = Viewport::new(screen.width(), screen.height());
        if self.last_viewport != Some(viewport) {
            self.simulation.viewport_signal().post(viewport);
            self.last_viewport = Some(viewport);
        }

        let zone = self.trash.rect(screen);
        self.simulation.set_container_origin(Vec2::new(screen.min.x, screen.min.y));
        self.simulation.set_zone(Some(to_sim_rect(zone)));

        instructions(ctx);
        if let Some(text) = self.input.show(ctx) {
            if self.tasks.add(&text, &mut self.store).is_some() {
                self.sync_tasks();
            }
        }

        for input in Self::pointer_inputs(ctx) {
            let events = self.simulation.handle_pointer(input);
            self.apply_events(events);
        }

        let report = self.simulation.frame(delta_time, &mut self.layer);

        let painter = ctx.layer_painter(egui::LayerId::background());
        painter.rect_filled(screen, 0.0, BACKGROUND);
        self.trash.paint(&painter, zone, report.zone_hovered);
        self.layer.paint(&painter, screen.min);
        if self.debug.is_visible() {
            self.debug.paint(&painter, screen.min, &self.simulation, &self.layer);
        }

        report.running
    }

    fn is_running(&self) -> bool {
        self.simulation.is_running()
    }

    /// Stop the frame loop and release the simulation
    fn shutdown(&mut self) {
        self.simulation.cancellation_token().cancel();
        self.simulation.teardown();
        if let Err(e) = self.store.flush() {
            tracing::warn!("Final store write to {:?} failed: {}", self.store.path(), e);
        }
    }
}

/// Running state of the application
struct AppRunning {
    window: Arc<Window>,
    graphics: GraphicsState,
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    scene: BubbleScene,
}

/// Main application
pub struct BubbleDoApp {
    config: AppConfig,
    settings: SimulationSettings,
    running: Option<AppRunning>,
    failure: Option<AppError>,
}

impl BubbleDoApp {
    /// Create the application; the window opens on the first resume
    pub fn new(config: AppConfig, settings: SimulationSettings) -> Self {
        Self {
            config,
            settings,
            running: None,
            failure: None,
        }
    }

    /// Load settings and run until the window closes
    pub fn run(config: AppConfig) -> Result<()> {
        let settings = config.load_settings()?;

        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut app = BubbleDoApp::new(config, settings);
        event_loop.run_app(&mut app)?;

        match app.failure.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<AppRunning> {
        tracing::info!("Creating window...");

        let [width, height] = self.config.window_size;
        let [min_width, min_height] = self.config.min_window_size;
        let window_attrs = Window::default_attributes()
            .with_title(self.config.window_title.clone())
            .with_inner_size(winit::dpi::LogicalSize::new(width, height))
            .with_min_inner_size(winit::dpi::LogicalSize::new(min_width, min_height));

        let window = Arc::new(
            event_loop
                .create_window(window_attrs)
                .map_err(|e| AppError::WindowCreation(e.to_string()))?,
        );

        tracing::info!("Initializing graphics...");
        let graphics = GraphicsState::new(window.clone())?;

        let egui_ctx = egui::Context::default();
        egui_ctx.set_visuals(egui::Visuals::light());

        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui_ctx.viewport_id(),
            &window,
            Some(window.scale_factor() as f32),
            None,
            Some(2 * 1024), // max texture side
        );

        let logical = window.inner_size().to_logical::<f32>(window.scale_factor());
        let viewport = Viewport::new(logical.width, logical.height);
        let scene = BubbleScene::new(&self.config, self.settings.clone(), viewport)?;

        tracing::info!("BubbleDo initialized, window size {:?}", window.inner_size());

        Ok(AppRunning {
            window,
            graphics,
            egui_ctx,
            egui_state,
            scene,
        })
    }
}

impl ApplicationHandler for BubbleDoApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.running.is_some() || self.failure.is_some() {
            return;
        }

        match self.start(event_loop) {
            Ok(running) => self.running = Some(running),
            Err(e) => {
                tracing::error!("Startup failed: {e}");
                self.failure = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let Some(running) = &mut self.running else {
            return;
        };

        // Let egui handle the event
        let response = running.egui_state.on_window_event(&running.window, &event);
        if response.repaint && running.scene.is_running() {
            running.window.request_redraw();
        }

        if response.consumed {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                tracing::info!("Close requested, exiting...");
                running.scene.shutdown();
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                tracing::debug!("Window resized to {:?}", new_size);
                running.graphics.resize(new_size);
                running.window.request_redraw();
            }
            WindowEvent::RedrawRequested => {
                let raw_input = running.egui_state.take_egui_input(&running.window);
                let mut keep_running = false;
                let full_output = running.egui_ctx.run(raw_input, |ctx| {
                    keep_running = running.scene.update(ctx);
                });

                running
                    .egui_state
                    .handle_platform_output(&running.window, full_output.platform_output.clone());

                match running.graphics.render(&running.egui_ctx, full_output, &running.window) {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let size = running.window.inner_size();
                        running.graphics.resize(size);
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        tracing::error!("Out of GPU memory!");
                        running.scene.shutdown();
                        event_loop.exit();
                        return;
                    }
                    Err(wgpu::SurfaceError::Timeout) => {
                        tracing::warn!("Surface timeout");
                    }
                }

                // The next frame is only requested while the loop runs
                if keep_running {
                    running.window.request_redraw();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(running) = &self.running {
            if running.scene.is_running() {
                running.window.request_redraw();
            }
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(running) = &mut self.running {
            running.scene.shutdown();
        }
    }
}

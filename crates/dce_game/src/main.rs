//! Dungeon crawler -- main loop and application entry point.
//!
//! Architecture: winit drives the event loop via `ApplicationHandler`. All simulation
//! runs inside `RedrawRequested` using a **fixed-timestep** model (see `TimeState`):
//!
//!   1. `begin_frame()` -- measure wall-clock delta, feed accumulator
//!   2. `while should_step()` -- snapshot input, tick the `GameState`
//!   3. Rebuild the sprite mesh from the session + collision overlay
//!   4. Upload camera uniform, issue draw calls, composite the egui HUD
//!
//! The level file is watched via mtime polling and reloaded at frame
//! boundaries. `R` restarts the level from disk. A failed load leaves no
//! session: nothing simulates and the overlay shows the error until a retry
//! succeeds.

mod camera;
mod collision;
mod config;
mod door;
mod error;
mod game_state;
mod level;
mod mesh;
mod meter;
mod mob;
mod player;
#[cfg(test)]
mod replay;
mod tiles;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use wgpu::util::DeviceExt;
use winit::application::ApplicationHandler;
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use config::{load_config_or_default, GameConfig, CONFIG_PATH};
use dce_core::input::{InputState, Key, MouseBtn};
use dce_core::time::{TimeState, FIXED_DT_US};
use dce_devtools::{DebugOverlay, OverlayActions, OverlayStats};
use dce_render::{Camera2D, GpuContext, SpritePipeline, SpriteVertex, Texture};
use error::GameError;
use game_state::GameState;
use level::{level_path, load_level, LevelWatcher};
use mesh::{build_mesh, count_texture_binds, DrawCall};
use tiles::{load_tile_catalog_from_path, TileCatalog};

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.035,
    g: 0.03,
    b: 0.05,
    a: 1.0,
};
const MISSING_TEXTURE_RGBA: [u8; 16] = [
    255, 0, 255, 255, 0, 0, 0, 255, //
    0, 0, 0, 255, 255, 0, 255, 255,
];

struct GpuSpriteTexture {
    texture: Texture,
    bind_group: wgpu::BindGroup,
}

/// All mutable engine state lives here. Constructed lazily in `ApplicationHandler::resumed`
/// once the window and GPU surface are available.
///
/// Ownership is split into three conceptual groups:
///  - **Core systems** (time, input, render camera) -- updated every frame
///  - **Content** (config, catalog, level session) -- loaded from disk, reloadable
///  - **GPU resources** (vertex/index/camera buffers, draw calls) -- rebuilt every frame
struct EngineState {
    window: Arc<Window>,
    gpu: GpuContext,
    time: TimeState,
    input: InputState,
    camera: Camera2D,
    sprite_pipeline: SpritePipeline,
    debug_overlay: DebugOverlay,

    // --- Content ------------------------------------------------------------------
    config: GameConfig,
    catalog: TileCatalog,
    level_id: String,
    level_watcher: LevelWatcher,
    session: Option<GameState>,
    /// Session-local simulation clock; only advances on ticks that ran.
    session_time_us: u64,
    load_error: Option<String>,
    show_collision_debug: bool,
    paused: bool,
    single_step_requested: bool,
    textures: HashMap<Arc<str>, GpuSpriteTexture>,

    // --- Per-frame GPU mesh state -----------------------------------------------
    // Buffers grow (power-of-two) but never shrink.
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    mesh_vertex_capacity: usize,
    mesh_index_capacity: usize,
    draw_calls: Vec<DrawCall>,
    sprite_count: usize,
}

impl EngineState {
    fn new(window: Arc<Window>, config: GameConfig, level_id: String) -> Result<Self, GameError> {
        let gpu = GpuContext::new(window.clone(), &config.window).map_err(GameError::Render)?;
        let sprite_pipeline = SpritePipeline::new(&gpu.device, gpu.surface_format);
        let debug_overlay = DebugOverlay::new(&gpu.device, gpu.surface_format, &window);

        let catalog = load_tile_catalog_from_path(Path::new(&config.catalog_path))
            .map_err(|err| GameError::Config(format!("tile catalog: {err}")))?;

        let mut camera = Camera2D::new(gpu.size.0, gpu.size.1);
        camera.zoom = config.zoom;

        let camera_uniform = camera.build_uniform();
        let camera_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Camera Uniform Buffer"),
                contents: bytemuck::cast_slice(&[camera_uniform]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
        let camera_bind_group =
            sprite_pipeline.create_camera_bind_group(&gpu.device, &camera_buffer);
        let vertex_buffer = create_vertex_buffer(&gpu.device, 1);
        let index_buffer = create_index_buffer(&gpu.device, 1);
        let level_watcher =
            LevelWatcher::new(level_path(Path::new(&config.levels_dir), &level_id));

        let mut state = Self {
            window,
            gpu,
            time: TimeState::new(),
            input: InputState::new(),
            camera,
            sprite_pipeline,
            debug_overlay,
            show_collision_debug: config.show_collision_debug,
            config,
            catalog,
            level_id,
            level_watcher,
            session: None,
            session_time_us: 0,
            load_error: None,
            paused: false,
            single_step_requested: false,
            textures: HashMap::new(),
            vertex_buffer,
            index_buffer,
            camera_buffer,
            camera_bind_group,
            mesh_vertex_capacity: 0,
            mesh_index_capacity: 0,
            draw_calls: Vec::new(),
            sprite_count: 0,
        };

        // Textures first so the first mesh has something to bind.
        state.load_textures();
        state.ensure_mesh_capacity(4, 6);
        state.restart_level("startup");
        Ok(state)
    }

    fn load_textures(&mut self) {
        let sheets = [
            (mesh::TILE_SHEET, self.config.sprite_sheet_path.clone()),
            (mesh::PLAYER_SHEET, self.config.player_sheet_path.clone()),
            (mesh::MOB_SHEET, self.config.mob_sheet_path.clone()),
            (mesh::DOOR_SHEET, self.config.door_sheet_path.clone()),
            (mesh::TORCH_SHEET, self.config.torch_sheet_path.clone()),
        ];
        for (key, path) in sheets {
            let texture = load_texture_asset(&self.gpu.device, &self.gpu.queue, &path);
            self.insert_texture(key, texture);
        }

        let white = Texture::from_rgba8(
            &self.gpu.device,
            &self.gpu.queue,
            &[255, 255, 255, 255],
            1,
            1,
            mesh::DEBUG_WHITE,
        );
        self.insert_texture(mesh::DEBUG_WHITE, white);
    }

    fn insert_texture(&mut self, key: &str, texture: Texture) {
        let bind_group = self
            .sprite_pipeline
            .create_texture_bind_group(&self.gpu.device, &texture);
        self.textures.insert(
            Arc::from(key),
            GpuSpriteTexture {
                texture,
                bind_group,
            },
        );
    }

    /// Load the level from disk and start a fresh session. On failure the
    /// current session is dropped and the error is shown instead.
    fn restart_level(&mut self, reason: &str) {
        if let Err(err) = self.try_start_level(reason) {
            log::error!("Level '{}' failed to load ({reason}): {err}", self.level_id);
            self.session = None;
            self.load_error = Some(err.to_string());
        }
        self.rebuild_scene_mesh();
    }

    /// Hot reload from the file watcher. A broken edit keeps the running
    /// session so a half-saved file does not kill the game.
    fn reload_level_from_watcher(&mut self) {
        if self.session.is_none() {
            self.restart_level("file watcher");
            return;
        }
        if let Err(err) = self.try_start_level("file watcher") {
            log::error!(
                "Level reload failed ({}): {err}",
                self.level_watcher.path().display()
            );
        }
        self.rebuild_scene_mesh();
    }

    fn try_start_level(&mut self, reason: &str) -> Result<(), GameError> {
        let cell_size = self.config.world_cell_size(self.catalog.cell_size);
        let level = load_level(Path::new(&self.config.levels_dir), &self.level_id, cell_size)?;
        let mut session = GameState::new(level, &self.catalog, &self.config);
        let view = self.camera.world_size();
        session.set_viewport(view.x, view.y);

        self.session = Some(session);
        self.session_time_us = 0;
        self.load_error = None;
        self.time.reset_simulation();
        log::info!("Level '{}' started ({reason})", self.level_id);
        Ok(())
    }

    /// Run one fixed step against the current session.
    fn step_session(&mut self, first_step: bool) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let mut snapshot = self.input.snapshot();
        // Edge-triggered input belongs to the first step of the frame only.
        if !first_step {
            snapshot = snapshot.without_edges();
        }

        self.session_time_us += FIXED_DT_US;
        let report = session.tick(&snapshot, self.session_time_us);
        for event in &report.events {
            log::debug!("{event:?}");
        }

        if first_step && self.input.is_just_pressed(Key::L) {
            if let Some(event) = session.toggle_lock_in_reach(self.session_time_us) {
                log::debug!("{event:?}");
            }
        }
    }

    /// Escape, F3, F4 and R. Read once per frame, on its first step.
    fn handle_engine_keys(&mut self) -> Hotkey {
        if self.input.is_just_pressed(Key::Escape) {
            return Hotkey::Quit;
        }
        if self.input.is_just_pressed(Key::F3) {
            self.debug_overlay.toggle();
        }
        if self.input.is_just_pressed(Key::F4) {
            self.show_collision_debug = !self.show_collision_debug;
            log::info!("Collision boxes: {}", on_off(self.show_collision_debug));
        }
        if self.input.is_just_pressed(Key::R) {
            self.restart_level("R key");
            return Hotkey::Restarted;
        }
        Hotkey::None
    }

    /// Drain the accumulator. Returns `false` when the player asked to quit.
    fn run_fixed_steps(&mut self) -> bool {
        while self.time.should_step() {
            let first_step = self.time.steps_this_frame == 1;
            if first_step {
                match self.handle_engine_keys() {
                    Hotkey::Quit => return false,
                    // The restart rewound the clock; resume next frame.
                    Hotkey::Restarted => break,
                    Hotkey::None => {}
                }
            }

            // Paused or unloaded: time is consumed, nothing simulates.
            if self.session.is_none() || (self.paused && !self.single_step_requested) {
                continue;
            }
            self.single_step_requested = false;
            self.step_session(first_step);
        }
        true
    }

    fn apply_overlay_actions(&mut self, actions: OverlayActions) {
        if actions.toggle_pause {
            self.paused = !self.paused;
            log::info!("Simulation paused: {}", on_off(self.paused));
        }
        if actions.single_step {
            self.single_step_requested = true;
        }
        if actions.reload_level {
            self.restart_level("overlay");
        }
    }

    /// Sprite batch first, then the egui overlay on top of it.
    fn draw_frame(&mut self) {
        let camera_uniform = self.camera.build_uniform();
        self.gpu.queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::cast_slice(&[camera_uniform]),
        );
        let Some((output, view)) = self.gpu.begin_frame() else {
            return;
        };

        let hud = self
            .session
            .as_ref()
            .map(|session| session.hud().clone())
            .unwrap_or_default();
        let stats = self.overlay_stats();
        let (primitives, textures_delta, actions) = self.debug_overlay.prepare(
            &self.window,
            &self.time,
            &hud,
            self.load_error.as_deref(),
            Some(stats),
        );
        self.apply_overlay_actions(actions);

        let screen = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.gpu.size.0, self.gpu.size.1],
            pixels_per_point: self.window.scale_factor() as f32,
        };
        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame encoder"),
            });

        self.draw_sprites(&mut encoder, &view);

        self.debug_overlay.upload(
            &self.gpu.device,
            &self.gpu.queue,
            &mut encoder,
            &primitives,
            &textures_delta,
            &screen,
        );
        {
            let mut overlay_pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("overlay pass"),
                    color_attachments: &[Some(color_target(&view, wgpu::LoadOp::Load))],
                    ..Default::default()
                })
                .forget_lifetime();
            self.debug_overlay
                .paint(&mut overlay_pass, &primitives, &screen);
        }
        self.debug_overlay.cleanup(&textures_delta);

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();
    }

    /// One pass over the batched draw calls, rebinding only when the sheet
    /// changes between consecutive calls.
    fn draw_sprites(&self, encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("sprite pass"),
            color_attachments: &[Some(color_target(view, wgpu::LoadOp::Clear(CLEAR_COLOR)))],
            ..Default::default()
        });
        pass.set_pipeline(&self.sprite_pipeline.render_pipeline);
        pass.set_bind_group(0, &self.camera_bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);

        let mut bound: Option<&str> = None;
        for draw in &self.draw_calls {
            let Some(texture) = self.textures.get(&draw.texture_key) else {
                continue;
            };
            if bound != Some(&*draw.texture_key) {
                pass.set_bind_group(1, &texture.bind_group, &[]);
                bound = Some(&*draw.texture_key);
            }
            pass.draw_indexed(draw.index_start..draw.index_start + draw.index_count, 0, 0..1);
        }
    }

    fn estimate_memory_mb(&self) -> f32 {
        let mut bytes: usize = 0;
        for tex in self.textures.values() {
            let (w, h) = tex.texture.size;
            bytes += (w as usize) * (h as usize) * 4;
        }
        bytes += self.mesh_vertex_capacity * std::mem::size_of::<SpriteVertex>();
        bytes += self.mesh_index_capacity * std::mem::size_of::<u32>();
        bytes as f32 / (1024.0 * 1024.0)
    }

    fn rebuild_scene_mesh(&mut self) {
        let Some(session) = &self.session else {
            self.draw_calls.clear();
            self.sprite_count = 0;
            return;
        };
        let mesh = build_mesh(session, &self.catalog, self.show_collision_debug);
        self.camera.position = session.camera.position();
        self.ensure_mesh_capacity(mesh.vertices.len(), mesh.indices.len());
        self.sprite_count = mesh.sprite_count();

        if !mesh.vertices.is_empty() {
            self.gpu
                .queue
                .write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(&mesh.vertices));
        }
        if !mesh.indices.is_empty() {
            self.gpu
                .queue
                .write_buffer(&self.index_buffer, 0, bytemuck::cast_slice(&mesh.indices));
        }
        self.draw_calls = mesh.draw_calls;
    }

    fn ensure_mesh_capacity(&mut self, vertex_count: usize, index_count: usize) {
        let needed_vertices = vertex_count.max(1);
        if needed_vertices > self.mesh_vertex_capacity {
            self.mesh_vertex_capacity = needed_vertices.next_power_of_two();
            self.vertex_buffer = create_vertex_buffer(&self.gpu.device, self.mesh_vertex_capacity);
        }

        let needed_indices = index_count.max(1);
        if needed_indices > self.mesh_index_capacity {
            self.mesh_index_capacity = needed_indices.next_power_of_two();
            self.index_buffer = create_index_buffer(&self.gpu.device, self.mesh_index_capacity);
        }
    }

    fn overlay_stats(&self) -> OverlayStats {
        let mut stats = OverlayStats {
            level_id: self.level_id.clone(),
            draw_calls: self.draw_calls.len() as u32,
            texture_binds: count_texture_binds(&self.draw_calls) as u32,
            sprite_count: self.sprite_count as u32,
            memory_estimate_mb: self.estimate_memory_mb(),
            show_collision: self.show_collision_debug,
            paused: self.paused,
            ..OverlayStats::default()
        };
        if let Some(session) = &self.session {
            stats.live_mobs = session.live_mob_count() as u32;
            stats.player_state = session.player.state().label().to_string();
            stats.player_position = (session.player.position.x, session.player.position.y);
            stats.camera_position = (session.camera.x, session.camera.y);
        }
        stats
    }
}

struct App {
    config: GameConfig,
    level_id: String,
    state: Option<EngineState>,
}

impl App {
    fn new(config: GameConfig, level_id: String) -> Self {
        Self {
            config,
            level_id,
            state: None,
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        let window = match dce_platform::window::create_window(event_loop, &self.config.window) {
            Ok(window) => window,
            Err(err) => {
                log::error!("{}", GameError::Render(err));
                event_loop.exit();
                return;
            }
        };
        match EngineState::new(window, self.config.clone(), self.level_id.clone()) {
            Ok(state) => self.state = Some(state),
            Err(err) => {
                log::error!("Startup failed: {err}");
                event_loop.exit();
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.window.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let state = match self.state.as_mut() {
            Some(s) => s,
            None => return,
        };

        let egui_consumed = state
            .debug_overlay
            .handle_window_event(&state.window, &event);

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting.");
                event_loop.exit();
            }

            WindowEvent::Resized(physical_size) => {
                let w = physical_size.width;
                let h = physical_size.height;
                if w > 0 && h > 0 {
                    state.gpu.resize(w, h);
                    state.camera.viewport = (w, h);
                    let view = state.camera.world_size();
                    if let Some(session) = state.session.as_mut() {
                        session.set_viewport(view.x, view.y);
                    }
                    log::info!("Resized to {}x{}", w, h);
                }
            }

            WindowEvent::KeyboardInput { event, .. } if !egui_consumed => {
                if let PhysicalKey::Code(key_code) = event.physical_key {
                    if let Some(engine_key) = map_key(key_code) {
                        match event.state {
                            ElementState::Pressed => state.input.key_down(engine_key),
                            ElementState::Released => state.input.key_up(engine_key),
                        }
                    }
                }
            }

            WindowEvent::MouseInput {
                state: button_state,
                button,
                ..
            } if !egui_consumed => {
                if let Some(btn) = map_mouse_button(button) {
                    match button_state {
                        ElementState::Pressed => state.input.mouse_down(btn),
                        ElementState::Released => state.input.mouse_up(btn),
                    }
                }
            }

            WindowEvent::RedrawRequested => {
                if state.gpu.size.0 == 0 || state.gpu.size.1 == 0 {
                    return;
                }
                state.time.begin_frame();

                // Reloads happen at the frame boundary, never mid-step.
                if state.level_watcher.should_reload() {
                    state.reload_level_from_watcher();
                }

                if !state.run_fixed_steps() {
                    event_loop.exit();
                    return;
                }
                state.rebuild_scene_mesh();
                state.draw_frame();

                // A press that lands on a frame with no steps waits for the next one.
                if state.time.steps_this_frame > 0 {
                    state.input.end_frame();
                }
            }

            _ => {}
        }
    }
}

enum Hotkey {
    None,
    Quit,
    Restarted,
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

fn color_target(
    view: &wgpu::TextureView,
    load: wgpu::LoadOp<wgpu::Color>,
) -> wgpu::RenderPassColorAttachment<'_> {
    wgpu::RenderPassColorAttachment {
        view,
        resolve_target: None,
        ops: wgpu::Operations {
            load,
            store: wgpu::StoreOp::Store,
        },
    }
}

fn create_vertex_buffer(device: &wgpu::Device, vertex_capacity: usize) -> wgpu::Buffer {
    let byte_len = (vertex_capacity * std::mem::size_of::<SpriteVertex>()).max(1) as u64;
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Dungeon Vertex Buffer"),
        size: byte_len,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_index_buffer(device: &wgpu::Device, index_capacity: usize) -> wgpu::Buffer {
    let byte_len = (index_capacity * std::mem::size_of::<u32>()).max(1) as u64;
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Dungeon Index Buffer"),
        size: byte_len,
        usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// Decode a sprite sheet, or substitute a magenta checker so a missing file
/// is obvious on screen without stopping the game.
fn load_texture_asset(device: &wgpu::Device, queue: &wgpu::Queue, asset_path: &str) -> Texture {
    let loaded = std::fs::read(asset_path)
        .map_err(|e| format!("Failed to read texture '{asset_path}': {e}"))
        .and_then(|bytes| Texture::from_bytes(device, queue, &bytes, asset_path));
    match loaded {
        Ok(texture) => {
            log::info!(
                "Loaded texture '{}' ({}x{})",
                asset_path,
                texture.size.0,
                texture.size.1
            );
            texture
        }
        Err(err) => {
            log::warn!("{err}. Using placeholder texture.");
            Texture::from_rgba8(device, queue, &MISSING_TEXTURE_RGBA, 2, 2, asset_path)
        }
    }
}

fn map_key(key_code: KeyCode) -> Option<Key> {
    match key_code {
        KeyCode::ArrowLeft => Some(Key::Left),
        KeyCode::ArrowRight => Some(Key::Right),
        KeyCode::ArrowUp => Some(Key::Up),
        KeyCode::ArrowDown => Some(Key::Down),
        KeyCode::Escape => Some(Key::Escape),
        KeyCode::F3 => Some(Key::F3),
        KeyCode::F4 => Some(Key::F4),
        KeyCode::KeyW => Some(Key::W),
        KeyCode::KeyA => Some(Key::A),
        KeyCode::KeyS => Some(Key::S),
        KeyCode::KeyD => Some(Key::D),
        KeyCode::KeyE => Some(Key::E),
        KeyCode::KeyL => Some(Key::L),
        KeyCode::KeyR => Some(Key::R),
        _ => None,
    }
}

fn map_mouse_button(button: MouseButton) -> Option<MouseBtn> {
    match button {
        MouseButton::Left => Some(MouseBtn::Left),
        _ => None,
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Dungeon crawler starting...");

    let config = load_config_or_default(&PathBuf::from(CONFIG_PATH));
    let level_id = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config.default_level.clone());
    log::info!("Level: {level_id}");

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(err) => {
            log::error!("Failed to create event loop: {err}");
            std::process::exit(1);
        }
    };
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config, level_id);
    if let Err(err) = event_loop.run_app(&mut app) {
        log::error!("Event loop error: {err}");
        std::process::exit(1);
    }
}

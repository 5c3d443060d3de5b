//! egui overlay composited on top of the dungeon scene.
//!
//! Two layers share one egui context:
//!   - the HUD (health, magic, interaction prompt, game over, load error),
//!     drawn every frame;
//!   - the debug window, toggled with F3.
//!
//! egui-wgpu needs a `RenderPass<'static>` while `begin_render_pass` borrows
//! the encoder, so rendering is split into `prepare()` (UI + tessellation),
//! `upload()` (textures and buffers), `paint()` (a pass created with
//! `forget_lifetime()`) and `cleanup()`.

use dce_core::time::TimeState;
use winit::window::Window;

use crate::hud::HudStatus;

#[derive(Debug, Clone, Default)]
pub struct OverlayStats {
    pub level_id: String,
    pub draw_calls: u32,
    pub texture_binds: u32,
    pub sprite_count: u32,
    /// Estimated GPU memory usage in megabytes
    pub memory_estimate_mb: f32,
    pub live_mobs: u32,
    pub player_state: String,
    pub player_position: (f32, f32),
    pub camera_position: (f32, f32),
    pub show_collision: bool,
    pub paused: bool,
}

#[derive(Debug, Clone, Default)]
pub struct OverlayActions {
    pub toggle_pause: bool,
    /// Advance one fixed step while paused
    pub single_step: bool,
    pub reload_level: bool,
}

pub struct DebugOverlay {
    pub egui_ctx: egui::Context,
    pub egui_winit_state: egui_winit::State,
    pub egui_renderer: egui_wgpu::Renderer,
    pub visible: bool,
}

impl DebugOverlay {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        window: &Window,
    ) -> Self {
        let egui_ctx = egui::Context::default();
        let egui_winit_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui_ctx.viewport_id(),
            window,
            None,
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(device, surface_format, None, 1, false);

        Self {
            egui_ctx,
            egui_winit_state,
            egui_renderer,
            visible: false,
        }
    }

    pub fn handle_window_event(
        &mut self,
        window: &Window,
        event: &winit::event::WindowEvent,
    ) -> bool {
        let response = self.egui_winit_state.on_window_event(window, event);
        response.consumed
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
        log::info!("Debug overlay: {}", if self.visible { "ON" } else { "OFF" });
    }

    pub fn prepare(
        &mut self,
        window: &Window,
        time: &TimeState,
        hud: &HudStatus,
        load_error: Option<&str>,
        stats: Option<OverlayStats>,
    ) -> (
        Vec<egui::ClippedPrimitive>,
        egui::TexturesDelta,
        OverlayActions,
    ) {
        let mut actions = OverlayActions::default();
        let raw_input = self.egui_winit_state.take_egui_input(window);
        let visible = self.visible;
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            if let Some(error) = load_error {
                draw_load_error(ctx, error, &mut actions);
            } else {
                draw_hud(ctx, hud);
            }

            if visible {
                draw_debug_window(ctx, time, stats.as_ref(), &mut actions);
            }
        });

        self.egui_winit_state
            .handle_platform_output(window, full_output.platform_output);

        let primitives = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        (primitives, full_output.textures_delta, actions)
    }

    /// Upload textures and update buffers. Call before creating the egui render pass.
    pub fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        primitives: &[egui::ClippedPrimitive],
        textures_delta: &egui::TexturesDelta,
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
    ) {
        for (id, image_delta) in &textures_delta.set {
            self.egui_renderer
                .update_texture(device, queue, *id, image_delta);
        }

        self.egui_renderer
            .update_buffers(device, queue, encoder, primitives, screen_descriptor);
    }

    /// Render into an existing render pass. Call after `upload()`.
    pub fn paint(
        &self,
        render_pass: &mut wgpu::RenderPass<'static>,
        primitives: &[egui::ClippedPrimitive],
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
    ) {
        self.egui_renderer
            .render(render_pass, primitives, screen_descriptor);
    }

    pub fn cleanup(&mut self, textures_delta: &egui::TexturesDelta) {
        for id in &textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
    }
}

fn draw_hud(ctx: &egui::Context, hud: &HudStatus) {
    egui::Area::new(egui::Id::new("hud_meters"))
        .anchor(egui::Align2::LEFT_TOP, [12.0, 12.0])
        .interactable(false)
        .show(ctx, |ui| {
            ui.label(
                egui::RichText::new(format!(
                    "{}  {}",
                    hud.health_label(),
                    HudStatus::pips(hud.health.0, hud.health.1)
                ))
                .color(egui::Color32::from_rgb(220, 60, 60))
                .size(18.0),
            );
            ui.label(
                egui::RichText::new(format!(
                    "{}  {}",
                    hud.magic_label(),
                    HudStatus::pips(hud.magic.0, hud.magic.1)
                ))
                .color(egui::Color32::from_rgb(80, 140, 230))
                .size(18.0),
            );
        });

    if let Some(message) = &hud.interaction_message {
        egui::Area::new(egui::Id::new("hud_prompt"))
            .anchor(egui::Align2::CENTER_BOTTOM, [0.0, -24.0])
            .interactable(false)
            .show(ctx, |ui| {
                ui.label(
                    egui::RichText::new(message)
                        .color(egui::Color32::WHITE)
                        .size(20.0),
                );
            });
    }

    if hud.game_over {
        egui::Area::new(egui::Id::new("hud_game_over"))
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .interactable(false)
            .show(ctx, |ui| {
                ui.vertical_centered(|ui| {
                    ui.label(
                        egui::RichText::new("GAME OVER")
                            .color(egui::Color32::from_rgb(200, 30, 30))
                            .size(48.0)
                            .strong(),
                    );
                    ui.label("Press R to restart the level");
                });
            });
    }
}

fn draw_load_error(ctx: &egui::Context, error: &str, actions: &mut OverlayActions) {
    egui::Window::new("Level failed to load")
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .collapsible(false)
        .resizable(false)
        .show(ctx, |ui| {
            ui.label(egui::RichText::new(error).color(egui::Color32::from_rgb(230, 90, 90)));
            ui.separator();
            if ui.button("Retry (R)").clicked() {
                actions.reload_level = true;
            }
        });
}

fn draw_debug_window(
    ctx: &egui::Context,
    time: &TimeState,
    stats: Option<&OverlayStats>,
    actions: &mut OverlayActions,
) {
    egui::Window::new("Debug")
        .default_pos([10.0, 90.0])
        .show(ctx, |ui| {
            ui.label(format!("FPS: {:.1}", time.smoothed_fps));
            ui.label(format!("Frame time: {:.2} ms", time.smoothed_frame_time_ms));
            ui.label(format!("Steps this frame: {}", time.steps_this_frame));
            ui.label(format!("Total steps: {}", time.fixed_step_count));
            ui.label(format!("Sim time: {:.2} s", time.now_us() as f64 / 1_000_000.0));

            let Some(stats) = stats else {
                return;
            };
            ui.separator();
            ui.label(format!("Level: {}", stats.level_id));
            ui.label(format!("Draw calls: {}", stats.draw_calls));
            ui.label(format!("Texture binds: {}", stats.texture_binds));
            ui.label(format!("Sprites: {}", stats.sprite_count));
            ui.label(format!("Memory: {:.1} MB", stats.memory_estimate_mb));

            ui.separator();
            ui.label(format!("Player: {}", stats.player_state));
            ui.label(format!(
                "Player pos: ({:.1}, {:.1})",
                stats.player_position.0, stats.player_position.1
            ));
            ui.label(format!(
                "Camera: ({:.1}, {:.1})",
                stats.camera_position.0, stats.camera_position.1
            ));
            ui.label(format!("Live mobs: {}", stats.live_mobs));
            ui.label(format!(
                "Collision boxes (F4): {}",
                if stats.show_collision { "ON" } else { "OFF" }
            ));

            ui.separator();
            ui.horizontal(|ui| {
                let pause_label = if stats.paused { "Resume" } else { "Pause" };
                if ui.button(pause_label).clicked() {
                    actions.toggle_pause = true;
                }
                if stats.paused && ui.button("Step").clicked() {
                    actions.single_step = true;
                }
                if ui.button("Reload").clicked() {
                    actions.reload_level = true;
                }
            });
            if stats.paused {
                ui.label("\u{23f8} PAUSED");
            }
        });
}

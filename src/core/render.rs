//=========================================================================
// Renderer Interface
//=========================================================================
//
// Drawing surface handed to states during `render()`.
//
// The scheduler only decides *which* states draw and in which order;
// what a draw call turns into is up to the backend. Three backends ship
// with the crate:
// - `NullRenderer`: discards everything
// - `TraceRenderer`: logs draw calls under the `render` target
// - `RecordingRenderer`: keeps draw calls for inspection
//
//=========================================================================

//=== External Dependencies ===============================================

use log::trace;

//=== Internal Dependencies ===============================================

use crate::core::world::World;

//=== MenuEntry ===========================================================

/// One row of a menu or dialog as seen by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuEntry<'a> {
    pub label: &'a str,
    pub enabled: bool,
    pub focused: bool,
}

//=== Renderer Trait ======================================================

/// Backend-agnostic drawing surface.
pub trait Renderer: Send {
    /// Starts a frame. `clear` is set when no opaque state fills the
    /// screen from the bottom of the stack.
    fn begin_frame(&mut self, clear: bool);

    /// Draws the simulation seen through the current camera.
    fn draw_scene(&mut self, world: &dyn World, zoom: f32);

    fn draw_menu(&mut self, title: &str, entries: &[MenuEntry<'_>]);

    fn draw_dialog(&mut self, text: &str, entries: &[MenuEntry<'_>], input: Option<&str>);

    fn draw_text(&mut self, text: &str);

    fn draw_cursor(&mut self);

    fn end_frame(&mut self);
}

//=== NullRenderer ========================================================

/// Renderer that draws nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn begin_frame(&mut self, _clear: bool) {}
    fn draw_scene(&mut self, _world: &dyn World, _zoom: f32) {}
    fn draw_menu(&mut self, _title: &str, _entries: &[MenuEntry<'_>]) {}
    fn draw_dialog(&mut self, _text: &str, _entries: &[MenuEntry<'_>], _input: Option<&str>) {}
    fn draw_text(&mut self, _text: &str) {}
    fn draw_cursor(&mut self) {}
    fn end_frame(&mut self) {}
}

//=== TraceRenderer =======================================================

/// Renderer that logs every draw call at trace level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TraceRenderer {
    frame: u64,
}

impl Renderer for TraceRenderer {
    fn begin_frame(&mut self, clear: bool) {
        self.frame += 1;
        trace!(target: "render", "frame {} begin (clear: {})", self.frame, clear);
    }

    fn draw_scene(&mut self, world: &dyn World, zoom: f32) {
        trace!(
            target: "render",
            "scene {:?} at {:.2}x, t={:?}",
            world.current_level(),
            zoom,
            world.game_time()
        );
    }

    fn draw_menu(&mut self, title: &str, entries: &[MenuEntry<'_>]) {
        let focused = entries.iter().find(|e| e.focused).map(|e| e.label);
        trace!(target: "render", "menu '{}' ({} entries, focus {:?})", title, entries.len(), focused);
    }

    fn draw_dialog(&mut self, text: &str, entries: &[MenuEntry<'_>], input: Option<&str>) {
        trace!(target: "render", "dialog '{}' ({} buttons, input {:?})", text, entries.len(), input);
    }

    fn draw_text(&mut self, text: &str) {
        trace!(target: "render", "text '{}'", text);
    }

    fn draw_cursor(&mut self) {
        trace!(target: "render", "cursor");
    }

    fn end_frame(&mut self) {
        trace!(target: "render", "frame {} end", self.frame);
    }
}

//=== RecordingRenderer ===================================================

/// Draw call kept by [`RecordingRenderer`].
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    BeginFrame { clear: bool },
    Scene { level: Option<String>, zoom: f32 },
    Menu { title: String, focused: Option<String> },
    Dialog { text: String, input: Option<String> },
    Text(String),
    Cursor,
    EndFrame,
}

/// Renderer that records draw calls, for tests and headless diagnostics.
#[derive(Debug, Default, Clone)]
pub struct RecordingRenderer {
    calls: Vec<DrawCall>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[DrawCall] {
        &self.calls
    }

    /// Returns recorded calls and starts over.
    pub fn take(&mut self) -> Vec<DrawCall> {
        std::mem::take(&mut self.calls)
    }

    /// Number of frames started.
    pub fn frames(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, DrawCall::BeginFrame { .. }))
            .count()
    }
}

impl Renderer for RecordingRenderer {
    fn begin_frame(&mut self, clear: bool) {
        self.calls.push(DrawCall::BeginFrame { clear });
    }

    fn draw_scene(&mut self, world: &dyn World, zoom: f32) {
        self.calls.push(DrawCall::Scene {
            level: world.current_level().map(|level| level.to_string()),
            zoom,
        });
    }

    fn draw_menu(&mut self, title: &str, entries: &[MenuEntry<'_>]) {
        self.calls.push(DrawCall::Menu {
            title: title.to_string(),
            focused: entries
                .iter()
                .find(|entry| entry.focused)
                .map(|entry| entry.label.to_string()),
        });
    }

    fn draw_dialog(&mut self, text: &str, _entries: &[MenuEntry<'_>], input: Option<&str>) {
        self.calls.push(DrawCall::Dialog {
            text: text.to_string(),
            input: input.map(str::to_string),
        });
    }

    fn draw_text(&mut self, text: &str) {
        self.calls.push(DrawCall::Text(text.to_string()));
    }

    fn draw_cursor(&mut self) {
        self.calls.push(DrawCall::Cursor);
    }

    fn end_frame(&mut self) {
        self.calls.push(DrawCall::EndFrame);
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

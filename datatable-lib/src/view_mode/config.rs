use serde::Deserialize;
use serde::Serialize;

use super::ViewMode;

/// Switch to `mode` when the viewport crosses `width`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakpoint {
    pub width: u32,
    pub mode: ViewMode,
}

impl Breakpoint {
    pub const fn new(width: u32, mode: ViewMode) -> Self {
        Self { width, mode }
    }
}

/// View mode settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewModeConfig {
    pub default_mode: ViewMode,
    /// Modes the user may pick or the viewport may switch to.
    pub available_modes: Vec<ViewMode>,
    /// Thresholds, in any order; sorted ascending when used.
    pub breakpoints: Vec<Breakpoint>,
    /// Follow the breakpoints when the viewport is resized.
    pub auto_switch: bool,
    /// Narrowest card in pixels.
    pub card_min_width: u32,
    /// Narrowest grid tile in pixels.
    pub grid_min_width: u32,
    /// Gap between items in pixels.
    pub spacing: u32,
    /// Card and tile width / height.
    pub aspect_ratio: f32,
    /// Cap on cards or tiles per row.
    pub max_columns: usize,
    /// Date field ordering the timeline.
    pub timeline_field: Option<String>,
}

impl Default for ViewModeConfig {
    fn default() -> Self {
        Self {
            default_mode: ViewMode::Table,
            available_modes: ViewMode::ALL.to_vec(),
            breakpoints: vec![
                Breakpoint::new(640, ViewMode::List),
                Breakpoint::new(1024, ViewMode::Card),
                Breakpoint::new(1280, ViewMode::Table),
            ],
            auto_switch: true,
            card_min_width: 280,
            grid_min_width: 160,
            spacing: 16,
            aspect_ratio: 1.5,
            max_columns: 4,
            timeline_field: None,
        }
    }
}

impl ViewModeConfig {
    pub fn default_mode(mut self, mode: ViewMode) -> Self {
        self.default_mode = mode;
        self
    }

    pub fn available_modes(mut self, modes: &[ViewMode]) -> Self {
        self.available_modes = modes.to_vec();
        self
    }

    pub fn breakpoints(mut self, breakpoints: Vec<Breakpoint>) -> Self {
        self.breakpoints = breakpoints;
        self
    }

    pub fn auto_switch(mut self, enabled: bool) -> Self {
        self.auto_switch = enabled;
        self
    }

    pub fn max_columns(mut self, max: usize) -> Self {
        self.max_columns = max.max(1);
        self
    }

    pub fn spacing(mut self, spacing: u32) -> Self {
        self.spacing = spacing;
        self
    }

    pub fn timeline_field(mut self, field: impl Into<String>) -> Self {
        self.timeline_field = Some(field.into());
        self
    }

    /// Returns `true` if `mode` may be used.
    pub fn is_available(&self, mode: ViewMode) -> bool {
        self.available_modes.contains(&mode)
    }
}

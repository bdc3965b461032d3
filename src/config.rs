//! Engine configuration
//!
//! All geometry is measured in terminal cells. Every struct here deserializes with
//! `#[serde(default)]`, so a trace file may override any subset of the fields.

use serde::{Deserialize, Serialize};

/// Geometry constants used by the frame/level builder, the arrow router and the
/// stack renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Horizontal padding inside a frame, border included
    pub padding_x: i32,
    /// Vertical padding inside a frame, border included
    pub padding_y: i32,
    /// Height of the frame title line drawn above each frame
    pub name_height: i32,
    pub binding_height: i32,
    pub binding_spacing: i32,
    /// Horizontal space between sibling frames
    pub frame_margin: i32,
    pub min_frame_width: i32,
    /// Space between a binding name and an inline value
    pub value_gap: i32,
    pub slot_width: i32,
    pub slot_height: i32,
    /// Vertical space above each value nested under an array
    pub nested_spacing: i32,
    /// Extra rows between levels, zero stacks each level flush under the one above
    pub level_gap: i32,
    pub arrow_clearance: i32,
    pub arrow_head: i32,
    pub function_max_width: i32,
    /// Space between the frame grid and the stack columns
    pub stack_margin: i32,
    pub stack_item_width: i32,
    pub stack_item_height: i32,
    /// Space between the control and stash columns
    pub stack_gap: i32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig {
            padding_x: 2,
            padding_y: 1,
            name_height: 1,
            binding_height: 1,
            binding_spacing: 0,
            frame_margin: 4,
            min_frame_width: 12,
            value_gap: 1,
            slot_width: 6,
            slot_height: 3,
            nested_spacing: 1,
            level_gap: 0,
            arrow_clearance: 1,
            arrow_head: 1,
            function_max_width: 18,
            stack_margin: 6,
            stack_item_width: 18,
            stack_item_height: 1,
            stack_gap: 3,
        }
    }
}

/// Interpolation curve shared by all tweens of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    Linear,
    EaseInOut,
}

impl Easing {
    /// Map linear progress `t` in [0, 1] onto the curve
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
        }
    }
}

/// Timing of step animations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TweenConfig {
    pub duration_ms: u64,
    /// Interval between interpolation ticks
    pub frame_ms: u64,
    pub easing: Easing,
}

impl Default for TweenConfig {
    fn default() -> Self {
        TweenConfig {
            duration_ms: 300,
            frame_ms: 16,
            easing: Easing::EaseInOut,
        }
    }
}

/// Engine-wide settings fixed for the lifetime of an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub layout: LayoutConfig,
    /// How many entries of each stack stay visible when truncation is on
    pub truncation_limit: usize,
    /// Drop unreferenced root bindings on ingestion
    pub prune_globals: bool,
    pub animate: bool,
    pub tween: TweenConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            layout: LayoutConfig::default(),
            truncation_limit: 10,
            prune_globals: true,
            animate: true,
            tween: TweenConfig::default(),
        }
    }
}

/// Color palette of the drawn scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Palette {
    #[default]
    Dark,
    Light,
}

impl Palette {
    pub fn toggle(self) -> Self {
        match self {
            Palette::Dark => Palette::Light,
            Palette::Light => Palette::Dark,
        }
    }
}

/// Runtime display toggles; each distinct tuple gets its own cached scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayMode {
    pub palette: Palette,
    pub truncated: bool,
    pub stacks_visible: bool,
}

impl Default for DisplayMode {
    fn default() -> Self {
        DisplayMode {
            palette: Palette::Dark,
            truncated: false,
            stacks_visible: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn easing_hits_endpoints() {
        for easing in [Easing::Linear, Easing::EaseInOut] {
            assert_eq!(easing.apply(0.0), 0.0);
            assert_eq!(easing.apply(1.0), 1.0);
            assert_eq!(easing.apply(2.0), 1.0);
        }
        assert!((Easing::EaseInOut.apply(0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{ "truncation_limit": 4, "layout": { "slot_width": 8 } }"#)
                .unwrap();
        assert_eq!(config.truncation_limit, 4);
        assert_eq!(config.layout.slot_width, 8);
        assert_eq!(config.layout.padding_x, LayoutConfig::default().padding_x);
        assert!(config.animate);
    }
}

//! Dark and light color themes, one per [`Palette`]

use crate::config::Palette;
use ratatui::style::Color;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub bg: Color,
    pub fg: Color,
    pub primary: Color,   // Blue
    pub secondary: Color, // Orange
    pub comment: Color,   // Grey
    pub success: Color,   // Green
    pub error: Color,     // Red
    pub frame_border: Color,
    pub frame_title: Color,
    pub binding_name: Color,
    pub constant_name: Color,
    pub primitive: Color,
    pub array_border: Color,
    pub function: Color,
    pub global_function: Color, // Muted yellow for library functions
    pub arrow: Color,
    pub stack_label: Color,
    pub stack_header: Color,
    pub highlight_bg: Color, // Hovered stack item
}

impl Theme {
    pub fn for_palette(palette: Palette) -> &'static Theme {
        match palette {
            Palette::Dark => &DARK_THEME,
            Palette::Light => &LIGHT_THEME,
        }
    }
}

pub const DARK_THEME: Theme = Theme {
    bg: Color::Rgb(30, 30, 46),
    fg: Color::Rgb(205, 214, 244),
    primary: Color::Rgb(137, 180, 250),   // Blue
    secondary: Color::Rgb(250, 179, 135), // Orange
    comment: Color::Rgb(108, 112, 134),
    success: Color::Rgb(166, 227, 161),
    error: Color::Rgb(243, 139, 168),
    frame_border: Color::Rgb(108, 112, 134), // Grey border
    frame_title: Color::Rgb(249, 226, 175),  // Yellow titles
    binding_name: Color::Rgb(205, 214, 244),
    constant_name: Color::Rgb(137, 180, 250),
    primitive: Color::Rgb(250, 179, 135),
    array_border: Color::Rgb(148, 226, 213), // Cyan/teal
    function: Color::Rgb(249, 226, 175),
    global_function: Color::Rgb(180, 165, 120),
    arrow: Color::Rgb(166, 173, 200),
    stack_label: Color::Rgb(205, 214, 244),
    stack_header: Color::Rgb(245, 194, 231), // Pink
    highlight_bg: Color::Rgb(50, 50, 70),
};

pub const LIGHT_THEME: Theme = Theme {
    bg: Color::Rgb(239, 241, 245),
    fg: Color::Rgb(76, 79, 105),
    primary: Color::Rgb(30, 102, 245),
    secondary: Color::Rgb(254, 100, 11),
    comment: Color::Rgb(140, 143, 161),
    success: Color::Rgb(64, 160, 43),
    error: Color::Rgb(210, 15, 57),
    frame_border: Color::Rgb(140, 143, 161),
    frame_title: Color::Rgb(223, 142, 29),
    binding_name: Color::Rgb(76, 79, 105),
    constant_name: Color::Rgb(30, 102, 245),
    primitive: Color::Rgb(254, 100, 11),
    array_border: Color::Rgb(23, 146, 153),
    function: Color::Rgb(223, 142, 29),
    global_function: Color::Rgb(156, 130, 80),
    arrow: Color::Rgb(92, 95, 119),
    stack_label: Color::Rgb(76, 79, 105),
    stack_header: Color::Rgb(234, 118, 203),
    highlight_bg: Color::Rgb(204, 208, 218),
};

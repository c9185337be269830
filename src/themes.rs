use egui::{Color32, Style, Vec2, Visuals};

mod style;
pub use style::Styled;

/// Reserved identity colors for the three major suppliers. These are fixed
/// so the same country reads the same across every view; they are never
/// drawn from the rotating categorical palette.
pub const UNITED_STATES: Color32 = Color32::from_rgb(0x46, 0x82, 0xB4);
pub const RUSSIA: Color32 = Color32::from_rgb(0xDC, 0x14, 0x3C);
pub const CHINA: Color32 = Color32::from_rgb(0xFF, 0xDB, 0x58);

/// Categorical palette for everything without a reserved identity.
pub const CATEGORICAL: [Color32; 10] = [
    Color32::from_rgb(0x4E, 0x79, 0xA7),
    Color32::from_rgb(0xF2, 0x8E, 0x2B),
    Color32::from_rgb(0xE1, 0x57, 0x59),
    Color32::from_rgb(0x76, 0xB7, 0xB2),
    Color32::from_rgb(0x59, 0xA1, 0x4F),
    Color32::from_rgb(0xED, 0xC9, 0x48),
    Color32::from_rgb(0xB0, 0x7A, 0xA1),
    Color32::from_rgb(0xFF, 0x9D, 0xA7),
    Color32::from_rgb(0x9C, 0x75, 0x5F),
    Color32::from_rgb(0xBA, 0xB0, 0xAC),
];

/// Accent used for top-recipient markers on the flow map.
pub const TOP_RECIPIENT: Color32 = Color32::from_rgb(0x8A, 0x2B, 0xE2);

/// Yellow-orange-red ramp stops for sequential (heat) encoding.
const HEAT_STOPS: [Color32; 5] = [
    Color32::from_rgb(0xFF, 0xFF, 0xB2),
    Color32::from_rgb(0xFE, 0xCC, 0x5C),
    Color32::from_rgb(0xFD, 0x8D, 0x3C),
    Color32::from_rgb(0xF0, 0x3B, 0x20),
    Color32::from_rgb(0xBD, 0x00, 0x26),
];

pub fn reserved_color(name: &str) -> Option<Color32> {
    match name {
        "United States" => Some(UNITED_STATES),
        "Russia" => Some(RUSSIA),
        "China" => Some(CHINA),
        _ => None,
    }
}

// Color utilities: simple sRGB linear interpolation for quick palette derivation
pub fn blend(a: Color32, b: Color32, t: f32) -> Color32 {
    let t = t.clamp(0.0, 1.0);
    let r = (a.r() as f32 * (1.0 - t) + b.r() as f32 * t).round() as u8;
    let g = (a.g() as f32 * (1.0 - t) + b.g() as f32 * t).round() as u8;
    let bl = (a.b() as f32 * (1.0 - t) + b.b() as f32 * t).round() as u8;
    Color32::from_rgb(r, g, bl)
}

/// Sample the heat ramp at `t` in `[0, 1]`.
pub fn heat(t: f32) -> Color32 {
    let t = t.clamp(0.0, 1.0);
    let scaled = t * (HEAT_STOPS.len() - 1) as f32;
    let i = (scaled.floor() as usize).min(HEAT_STOPS.len() - 2);
    blend(HEAT_STOPS[i], HEAT_STOPS[i + 1], scaled - i as f32)
}

/// Semantic style for the shared tooltip overlay.
#[derive(Clone, Debug)]
pub struct TooltipStyle {
    pub fill: Color32,
    pub ink: Color32,
    pub outline: Color32,
    pub corner_radius: f32,
    pub padding: Vec2,
}

impl From<&Style> for TooltipStyle {
    fn from(style: &Style) -> Self {
        let dark = style.visuals.dark_mode;
        Self {
            fill: if dark {
                Color32::from_rgba_premultiplied(20, 20, 20, 230)
            } else {
                Color32::from_rgba_premultiplied(0, 0, 0, 210)
            },
            ink: Color32::WHITE,
            outline: style.visuals.window_stroke.color,
            corner_radius: 4.0,
            padding: Vec2::new(8.0, 6.0),
        }
    }
}

/// Semantic style for the map widgets (choropleth, symbols, flows).
#[derive(Clone, Debug)]
pub struct MapStyle {
    pub water: Color32,
    pub land: Color32,
    pub border: Color32,
    pub no_data: Color32,
    pub symbol_fill: Color32,
    pub symbol_stroke: Color32,
}

impl From<&Style> for MapStyle {
    fn from(style: &Style) -> Self {
        let dark = style.visuals.dark_mode;
        Self {
            water: if dark {
                Color32::from_rgb(0x16, 0x1A, 0x21)
            } else {
                Color32::from_rgb(0xF0, 0xF0, 0xF0)
            },
            land: if dark {
                Color32::from_rgb(0x3A, 0x3F, 0x47)
            } else {
                Color32::from_rgb(0xC0, 0xC0, 0xC0)
            },
            border: if dark {
                Color32::from_rgb(0x60, 0x66, 0x6E)
            } else {
                Color32::from_rgb(0x33, 0x33, 0x33)
            },
            no_data: if dark {
                Color32::from_rgb(0x2A, 0x2E, 0x35)
            } else {
                Color32::from_rgb(0xCC, 0xCC, 0xCC)
            },
            symbol_fill: Color32::from_rgba_premultiplied(0xB2, 0x30, 0x00, 0xB2),
            symbol_stroke: Color32::from_rgb(0xFF, 0xA5, 0x00),
        }
    }
}

/// Semantic style for non-map charts (network, packing, treemap, axes).
#[derive(Clone, Debug)]
pub struct ChartStyle {
    pub ink: Color32,
    pub grid: Color32,
    pub outline: Color32,
    pub accent: Color32,
    pub muted: Color32,
}

impl From<&Style> for ChartStyle {
    fn from(style: &Style) -> Self {
        let ink = style.visuals.text_color();
        let fill = style.visuals.window_fill;
        Self {
            ink,
            grid: blend(fill, ink, 0.12),
            outline: blend(fill, ink, 0.4),
            accent: style.visuals.selection.stroke.color,
            muted: Color32::from_rgb(0xCC, 0xCC, 0xCC),
        }
    }
}

/// Base visuals for the dashboard runner. Kept close to egui defaults with a
/// flatter, chart-friendly surface.
pub fn dashboard_visuals(dark: bool) -> Visuals {
    let mut visuals = if dark {
        Visuals::dark()
    } else {
        Visuals::light()
    };
    visuals.window_shadow = egui::epaint::Shadow::NONE;
    visuals.popup_shadow = egui::epaint::Shadow {
        offset: [3, 3],
        blur: 0,
        spread: 0,
        color: visuals.window_stroke.color,
    };
    visuals.slider_trailing_fill = true;
    visuals
}

pub fn dashboard_style(dark: bool) -> Style {
    let mut style = Style::default();
    style.visuals = dashboard_visuals(dark);
    style.spacing.item_spacing = egui::vec2(10.0, 8.0);
    style.spacing.slider_width = 240.0;
    style.animation_time = 0.12;
    style
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_suppliers_keep_fixed_colors() {
        assert_eq!(reserved_color("United States"), Some(UNITED_STATES));
        assert_eq!(reserved_color("Russia"), Some(RUSSIA));
        assert_eq!(reserved_color("China"), Some(CHINA));
        assert_eq!(reserved_color("Germany"), None);
    }

    #[test]
    fn heat_ramp_is_total() {
        assert_eq!(heat(-1.0), HEAT_STOPS[0]);
        assert_eq!(heat(2.0), HEAT_STOPS[4]);
        // Interior samples stay between the stops.
        let mid = heat(0.5);
        assert_ne!(mid, HEAT_STOPS[0]);
        assert_ne!(mid, HEAT_STOPS[4]);
    }

    #[test]
    fn blend_endpoints() {
        let a = Color32::from_rgb(10, 20, 30);
        let b = Color32::from_rgb(200, 100, 0);
        assert_eq!(blend(a, b, 0.0), a);
        assert_eq!(blend(a, b, 1.0), b);
    }
}

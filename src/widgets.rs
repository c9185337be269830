//! Chart widgets. Each is a `#[must_use]` builder struct implementing
//! [`egui::Widget`]; view state lives in a small struct owned by the
//! mounting panel and borrowed for the frame.

use eframe::egui::{self, Align2, Rect, Response, Sense, TextStyle, Ui, Vec2};

use crate::geo::ViewTransform;
use crate::themes::ChartStyle;

pub mod chord;
pub mod flow_map;
pub mod network;
pub mod packing;
pub mod parallel;
pub mod symbol_map;
pub mod timeline;
pub mod treemap;

pub use chord::{ChordChart, ChordState};
pub use flow_map::{FlowMap, FlowMapState};
pub use network::{NetworkGraph, NetworkState};
pub use packing::{PackingChart, PackingState};
pub use parallel::ParallelChart;
pub use symbol_map::{CountryBreakdown, MapMode, MapState, SymbolMap};
pub use timeline::Timeline;
pub use treemap::TreemapChart;

/// Allocate a chart canvas of `size` and return its rect, response and a
/// painter clipped to it.
pub(crate) fn canvas(ui: &mut Ui, size: Vec2, sense: Sense) -> (Rect, Response, egui::Painter) {
    let (rect, response) = ui.allocate_exact_size(size, sense);
    let painter = ui.painter().with_clip_rect(rect);
    (rect, response, painter)
}

/// The shared "no data" rendering: every widget falls back to this instead
/// of an empty or broken chart when its filtered input is empty.
pub fn no_data_placeholder(ui: &Ui, painter: &egui::Painter, rect: Rect) {
    let style = ChartStyle::from(ui.style().as_ref());
    painter.rect_stroke(
        rect,
        0.0,
        egui::Stroke::new(1.0, style.grid),
        egui::StrokeKind::Inside,
    );
    painter.text(
        rect.center(),
        Align2::CENTER_CENTER,
        "no data for this selection",
        TextStyle::Body.resolve(ui.style()),
        style.outline,
    );
}

/// Distance from `p` to the segment `a`–`b`, for pointer hit-testing
/// against stroked lines.
pub(crate) fn distance_to_segment(p: egui::Pos2, a: egui::Pos2, b: egui::Pos2) -> f32 {
    let ab = b - a;
    let len2 = ab.length_sq();
    if len2 <= f32::EPSILON {
        return (p - a).length();
    }
    let t = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    (p - (a + ab * t)).length()
}

/// Route pan and zoom gestures into a [`ViewTransform`], working in
/// rect-local coordinates so window moves do not disturb the view.
pub(crate) fn view_control(
    ui: &Ui,
    response: &Response,
    rect: Rect,
    transform: &mut ViewTransform,
    limits: (f32, f32),
) {
    if response.dragged() {
        transform.pan(response.drag_delta());
        ui.ctx().request_repaint();
    }
    let pointer_inside = ui
        .input(|i| i.pointer.hover_pos())
        .is_some_and(|pos| rect.contains(pos));
    if pointer_inside {
        let zoom_delta = ui.input(|i| i.zoom_delta());
        if zoom_delta != 1.0 {
            if let Some(pos) = ui.input(|i| i.pointer.hover_pos()) {
                transform.zoom_about((pos - rect.min).to_pos2(), zoom_delta, limits);
                ui.ctx().request_repaint();
            }
        }
    }
}

//! tradewinds: interactive trade-flow visualization for egui.
//!
//! The crate splits into pure engines (`data`, `scale`, `geo`, `layout`)
//! and the interactive surface built on them (`widgets`, `interact`,
//! `dataflow`). [`Dashboard`] is a small eframe runner that mounts
//! [`Panel`]s and owns the process-wide tooltip overlay.

pub mod data;
pub mod dataflow;
pub mod error;
pub mod geo;
pub mod interact;
pub mod layout;
pub mod scale;
pub mod themes;
pub mod widgets;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use eframe::egui;
use egui::{FontId, Pos2, Rect, TextStyle};

use crate::themes::TooltipStyle;

pub use error::DataError;

// ---------------------------------------------------------------------------
// Tooltip overlay

/// One line of tooltip content.
#[derive(Debug, Clone, PartialEq)]
pub enum TooltipLine {
    Title(String),
    Row(String, String),
    Note(String),
}

impl TooltipLine {
    pub fn title(s: impl Into<String>) -> Self {
        TooltipLine::Title(s.into())
    }

    pub fn row(label: impl Into<String>, value: impl Into<String>) -> Self {
        TooltipLine::Row(label.into(), value.into())
    }

    pub fn note(s: impl Into<String>) -> Self {
        TooltipLine::Note(s.into())
    }
}

#[derive(Debug, Default)]
struct TooltipInner {
    refs: AtomicUsize,
}

/// The process-wide tooltip surface, owned by the dashboard session.
///
/// Widgets hold a [`TooltipHandle`] acquired per mounted panel; the surface
/// exists while at least one handle is alive and is torn down when the last
/// one drops, so switching views never leaks or duplicates overlays.
#[derive(Debug, Default)]
pub struct TooltipLayer {
    inner: Arc<TooltipInner>,
}

impl TooltipLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self) -> TooltipHandle {
        let before = self.inner.refs.fetch_add(1, Ordering::SeqCst);
        if before == 0 {
            log::debug!("tooltip overlay created");
        }
        TooltipHandle {
            inner: Arc::clone(&self.inner),
        }
    }

    pub fn active_handles(&self) -> usize {
        self.inner.refs.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct TooltipHandle {
    inner: Arc<TooltipInner>,
}

impl Clone for TooltipHandle {
    fn clone(&self) -> Self {
        self.inner.refs.fetch_add(1, Ordering::SeqCst);
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Drop for TooltipHandle {
    fn drop(&mut self) {
        if self.inner.refs.fetch_sub(1, Ordering::SeqCst) == 1 {
            log::debug!("tooltip overlay released");
        }
    }
}

impl TooltipHandle {
    /// Paint the tooltip near `cursor`, clamped inside `container`.
    ///
    /// All handles share one layer id, so only one tooltip surface can
    /// exist per process regardless of how many panels are mounted.
    pub fn show(
        &self,
        ctx: &egui::Context,
        container: Rect,
        cursor: Pos2,
        lines: &[TooltipLine],
    ) {
        if lines.is_empty() {
            return;
        }
        let style = TooltipStyle::from(ctx.style().as_ref());
        let title_font = TextStyle::Body.resolve(&ctx.style());
        let row_font = TextStyle::Small.resolve(&ctx.style());

        let layout = |text: &str, font: &FontId| {
            ctx.fonts(|f| f.layout_no_wrap(text.to_owned(), font.clone(), style.ink))
        };
        let rendered: Vec<Arc<egui::Galley>> = lines
            .iter()
            .map(|line| match line {
                TooltipLine::Title(t) => layout(t, &title_font),
                TooltipLine::Row(label, value) => layout(&format!("{label}: {value}"), &row_font),
                TooltipLine::Note(n) => layout(n, &row_font),
            })
            .collect();

        let width = rendered.iter().map(|g| g.size().x).fold(0.0, f32::max);
        let height: f32 = rendered.iter().map(|g| g.size().y + 2.0).sum::<f32>() - 2.0;
        let size = egui::vec2(width, height) + style.padding * 2.0;
        let pos = interact::tooltip_pos(cursor, size, container);
        let rect = Rect::from_min_size(pos, size);

        let painter = ctx.layer_painter(egui::LayerId::new(
            egui::Order::Tooltip,
            egui::Id::new("tradewinds_tooltip"),
        ));
        painter.rect_filled(rect, style.corner_radius, style.fill);
        painter.rect_stroke(
            rect,
            style.corner_radius,
            egui::Stroke::new(1.0, style.outline),
            egui::StrokeKind::Inside,
        );

        let mut y = rect.top() + style.padding.y;
        for galley in rendered {
            let galley_height = galley.size().y;
            painter.galley(
                Pos2::new(rect.left() + style.padding.x, y),
                galley,
                style.ink,
            );
            y += galley_height + 2.0;
        }
    }
}

// ---------------------------------------------------------------------------
// Panels and the dashboard runner

/// Per-frame context for a mounted visualization.
pub struct PanelCtx<'a> {
    pub ui: &'a mut egui::Ui,
    id: egui::Id,
    tooltip: &'a TooltipHandle,
}

impl<'a> PanelCtx<'a> {
    pub fn id(&self) -> egui::Id {
        self.id
    }

    /// The panel's tooltip handle, borrowed for the whole frame so it can
    /// outlive later mutable borrows of `ui`.
    pub fn tooltip(&self) -> &'a TooltipHandle {
        self.tooltip
    }
}

/// One mounted visualization. Owns its entire view state; independent of
/// every other panel.
pub trait Panel {
    fn title(&self) -> &str;
    fn update(&mut self, ctx: &mut PanelCtx);
}

struct PanelEntry {
    id: egui::Id,
    panel: Box<dyn Panel>,
    tooltip: TooltipHandle,
}

/// An eframe app mounting panels in a vertical scroll of cards.
pub struct Dashboard {
    entries: Vec<PanelEntry>,
    tooltip: TooltipLayer,
}

impl Default for Dashboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Dashboard {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            tooltip: TooltipLayer::new(),
        }
    }

    pub fn push_panel(&mut self, panel: Box<dyn Panel>) {
        let id = egui::Id::new(("tradewinds_panel", self.entries.len()));
        let tooltip = self.tooltip.acquire();
        self.entries.push(PanelEntry { id, panel, tooltip });
    }

    pub fn run(self, name: &str) -> eframe::Result {
        let mut native_options = eframe::NativeOptions::default();
        native_options.persist_window = true;

        eframe::run_native(
            name,
            native_options,
            Box::new(|cc| {
                let ctx = cc.egui_ctx.clone();
                ctrlc::set_handler(move || ctx.send_viewport_cmd(egui::ViewportCommand::Close))
                    .expect("failed to set exit signal handler");

                cc.egui_ctx
                    .set_style_of(egui::Theme::Light, themes::dashboard_style(false));
                cc.egui_ctx
                    .set_style_of(egui::Theme::Dark, themes::dashboard_style(true));
                let theme = match dark_light::detect() {
                    Ok(dark_light::Mode::Light) => egui::ThemePreference::Light,
                    Ok(dark_light::Mode::Dark) => egui::ThemePreference::Dark,
                    Ok(dark_light::Mode::Unspecified) | Err(_) => egui::ThemePreference::Dark,
                };
                cc.egui_ctx.set_theme(theme);

                Ok(Box::new(self))
            }),
        )
    }
}

impl eframe::App for Dashboard {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .auto_shrink(false)
                .show(ui, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.set_max_width(1100.0);
                        for entry in &mut self.entries {
                            ui.push_id(entry.id, |ui| {
                                ui.heading(entry.panel.title());
                                let mut panel_ctx = PanelCtx {
                                    ui,
                                    id: entry.id,
                                    tooltip: &entry.tooltip,
                                };
                                entry.panel.update(&mut panel_ctx);
                                ui.separator();
                            });
                        }
                    });
                });
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tooltip_layer_counts_acquire_and_release() {
        let layer = TooltipLayer::new();
        assert_eq!(layer.active_handles(), 0);
        let a = layer.acquire();
        let b = layer.acquire();
        let c = b.clone();
        assert_eq!(layer.active_handles(), 3);
        drop(a);
        drop(b);
        assert_eq!(layer.active_handles(), 1);
        drop(c);
        assert_eq!(layer.active_handles(), 0);
        // Re-mounting after full release creates the surface again.
        let d = layer.acquire();
        assert_eq!(layer.active_handles(), 1);
        drop(d);
    }

    #[test]
    fn tooltip_lines_build() {
        let lines = vec![
            TooltipLine::title("India"),
            TooltipLine::row("Year", "2014"),
            TooltipLine::note("Click for details"),
        ];
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[1],
            TooltipLine::Row("Year".into(), "2014".into())
        );
    }
}

//! Zoomable circle packing.
//!
//! Clicking a non-leaf circle flies the viewport to its bounding circle;
//! clicking the background flies back to the root. A click during a flight
//! aborts it and departs from the current interpolated viewport, so the
//! camera never jumps.

use eframe::egui::{self, Align2, FontId, Pos2, Sense, Stroke, Ui, Vec2, Widget};

use crate::layout::pack::{PackedCircle, Viewport, ZoomTransition};
use crate::scale::CategoricalColor;
use crate::themes::{ChartStyle, Styled};
use crate::widgets;
use crate::{TooltipHandle, TooltipLine};

#[derive(Debug, Default)]
pub struct PackingState {
    pub focus: usize,
    pub hovered: Option<usize>,
    view: Option<Viewport>,
    transition: Option<ZoomTransition>,
}

impl PackingState {
    /// Drop the camera; the next frame re-frames the (new) root.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[must_use = "You should put this widget in a ui with `ui.add(widget);`"]
pub struct PackingChart<'a> {
    circles: &'a [PackedCircle],
    year: u16,
    state: &'a mut PackingState,
    tooltip: &'a TooltipHandle,
    desired_height: Option<f32>,
    chart_style: Option<ChartStyle>,
}

impl<'a> PackingChart<'a> {
    pub fn new(
        circles: &'a [PackedCircle],
        year: u16,
        state: &'a mut PackingState,
        tooltip: &'a TooltipHandle,
    ) -> Self {
        Self {
            circles,
            year,
            state,
            tooltip,
            desired_height: None,
            chart_style: None,
        }
    }

    pub fn desired_height(mut self, height: f32) -> Self {
        self.desired_height = Some(height.max(160.0));
        self
    }
}

impl Styled for PackingChart<'_> {
    type Style = ChartStyle;

    fn set_style(&mut self, style: Option<Self::Style>) {
        self.chart_style = style;
    }
}

impl Widget for PackingChart<'_> {
    fn ui(self, ui: &mut Ui) -> egui::Response {
        let Self {
            circles,
            year,
            state,
            tooltip,
            desired_height,
            chart_style,
        } = self;

        let style = chart_style.unwrap_or_else(|| ChartStyle::from(ui.style().as_ref()));
        let width = ui.available_width().max(320.0);
        let height = desired_height.unwrap_or(width * 0.77);
        let (rect, response, painter) =
            widgets::canvas(ui, Vec2::new(width, height), Sense::click());
        if !ui.is_rect_visible(rect) {
            return response;
        }

        // Root plus at least one child, or there is nothing to show.
        if circles.len() <= 1 {
            widgets::no_data_placeholder(ui, &painter, rect);
            return response;
        }
        if state.focus >= circles.len() {
            state.reset();
        }

        // Advance the in-flight zoom one increment per frame.
        let dt = ui.input(|i| i.stable_dt).min(0.1);
        if let Some(transition) = &mut state.transition {
            let view = transition.advance(dt);
            if transition.is_done() {
                state.transition = None;
            }
            state.view = Some(view);
            ui.ctx().request_repaint();
        }
        let view = state
            .view
            .get_or_insert_with(|| Viewport::around(&circles[0]));
        let view = *view;

        let k = rect.width() / view.w;
        let to_screen = |c: &PackedCircle| {
            rect.center() + Vec2::new((c.x - view.cx) * k, (c.y - view.cy) * k)
        };

        let level_one = CategoricalColor::new(
            circles.iter().filter(|c| c.depth == 1).map(|c| c.name.clone()),
        );
        let level_two = CategoricalColor::new(
            circles.iter().filter(|c| c.depth == 2).map(|c| c.name.clone()),
        );

        let pointer = ui.input(|i| i.pointer.hover_pos()).filter(|p| rect.contains(*p));
        let mut hovered: Option<usize> = None;

        for circle in circles {
            let center = to_screen(circle);
            let r = circle.r * k;
            if r < 0.3 {
                continue;
            }
            match circle.depth {
                0 => {}
                1 => {
                    painter.circle_filled(center, r, level_one.map(&circle.name));
                }
                _ => {
                    painter.circle_filled(center, r, level_two.map(&circle.name));
                }
            }
            if let Some(p) = pointer {
                // Children are emitted after parents, so the last hit is
                // the innermost circle under the cursor.
                if circle.depth > 0 && (p - center).length() <= r {
                    hovered = Some(circle.id);
                }
            }
            if state.hovered == Some(circle.id) && circle.depth > 0 {
                painter.circle_stroke(center, r, Stroke::new(2.0, style.accent));
            }
        }

        // Category labels once their circle is large enough on screen.
        for circle in circles.iter().filter(|c| c.depth == 2) {
            let r = circle.r * k;
            if r > 14.0 {
                painter.text(
                    to_screen(circle),
                    Align2::CENTER_CENTER,
                    &circle.name,
                    FontId::proportional((r / 4.0).clamp(10.0, 18.0)),
                    style.ink,
                );
            }
        }

        state.hovered = hovered;

        if let (Some(id), Some(p)) = (hovered, pointer) {
            let circle = &circles[id];
            let country = ancestor_at_depth(circles, id, 1)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| "N/A".into());
            let lines = vec![
                TooltipLine::row("Country", country),
                TooltipLine::row(
                    "Weapon type",
                    if circle.depth == 2 {
                        circle.name.clone()
                    } else {
                        "N/A".into()
                    },
                ),
                TooltipLine::row("Year", year.to_string()),
                TooltipLine::row("Quantity", format!("{:.0}", circle.value)),
            ];
            tooltip.show(ui.ctx(), rect, p, &lines);
        }

        if response.clicked() {
            let target = match hovered {
                // Zooming targets enclosing circles, never leaves.
                Some(id) if !circles[id].leaf && id != state.focus => Some(id),
                Some(_) => None,
                // Background click returns to the root.
                None if state.focus != 0 => Some(0),
                None => None,
            };
            if let Some(id) = target {
                state.focus = id;
                let destination = Viewport::around(&circles[id]);
                match &mut state.transition {
                    Some(transition) => transition.retarget(destination),
                    None => {
                        state.transition = Some(ZoomTransition::new(view, destination));
                    }
                }
                ui.ctx().request_repaint();
            }
        }

        response
    }
}

fn ancestor_at_depth<'a>(
    circles: &'a [PackedCircle],
    id: usize,
    depth: usize,
) -> Option<&'a PackedCircle> {
    let mut current = &circles[id];
    while current.depth > depth {
        current = &circles[current.parent?];
    }
    (current.depth == depth).then_some(current)
}

//! Per-entity year series over a shared linear year axis.

use eframe::egui::{self, Align2, Pos2, Sense, Shape, Stroke, TextStyle, Ui, Vec2, Widget};

use crate::scale::{CategoricalColor, LinearScale};
use crate::themes::{ChartStyle, Styled};
use crate::widgets;
use crate::{TooltipHandle, TooltipLine};

const POINT_RADIUS: f32 = 2.5;
const HIT_DISTANCE: f32 = 6.0;

#[must_use = "You should put this widget in a ui with `ui.add(widget);`"]
pub struct Timeline<'a> {
    series: &'a [(String, Vec<(u16, f64)>)],
    highlight_year: Option<u16>,
    tooltip: &'a TooltipHandle,
    desired_height: Option<f32>,
    chart_style: Option<ChartStyle>,
}

impl<'a> Timeline<'a> {
    pub fn new(series: &'a [(String, Vec<(u16, f64)>)], tooltip: &'a TooltipHandle) -> Self {
        Self {
            series,
            highlight_year: None,
            tooltip,
            desired_height: None,
            chart_style: None,
        }
    }

    /// Mark one year with a vertical rule, e.g. the filter shared with a
    /// paired map.
    pub fn highlight_year(mut self, year: u16) -> Self {
        self.highlight_year = Some(year);
        self
    }

    pub fn desired_height(mut self, height: f32) -> Self {
        self.desired_height = Some(height.max(140.0));
        self
    }
}

impl Styled for Timeline<'_> {
    type Style = ChartStyle;

    fn set_style(&mut self, style: Option<Self::Style>) {
        self.chart_style = style;
    }
}

impl Widget for Timeline<'_> {
    fn ui(self, ui: &mut Ui) -> egui::Response {
        let Self {
            series,
            highlight_year,
            tooltip,
            desired_height,
            chart_style,
        } = self;

        let style = chart_style.unwrap_or_else(|| ChartStyle::from(ui.style().as_ref()));
        let width = ui.available_width().max(320.0);
        let height = desired_height.unwrap_or(width * 0.42);
        let (rect, response, painter) = widgets::canvas(ui, Vec2::new(width, height), Sense::hover());
        if !ui.is_rect_visible(rect) {
            return response;
        }

        let mut year_lo = u16::MAX;
        let mut year_hi = u16::MIN;
        let mut max_value = 0.0f64;
        for (_, points) in series {
            for (year, value) in points {
                year_lo = year_lo.min(*year);
                year_hi = year_hi.max(*year);
                max_value = max_value.max(*value);
            }
        }
        if series.is_empty() || max_value <= 0.0 {
            widgets::no_data_placeholder(ui, &painter, rect);
            return response;
        }

        let inner = egui::Rect::from_min_max(
            rect.min + Vec2::new(56.0, 10.0),
            rect.max - Vec2::new(12.0, 22.0),
        );
        let x = LinearScale::new(
            (year_lo as f64, year_hi as f64),
            (inner.left(), inner.right()),
        );
        let y = LinearScale::new((0.0, max_value), (inner.bottom(), inner.top()));

        let tick_font = TextStyle::Small.resolve(ui.style());
        for v in y.ticks(4) {
            let py = y.map(v);
            painter.line_segment(
                [Pos2::new(inner.left(), py), Pos2::new(inner.right(), py)],
                Stroke::new(1.0, style.grid),
            );
            painter.text(
                Pos2::new(inner.left() - 6.0, py),
                Align2::RIGHT_CENTER,
                format_value(v),
                tick_font.clone(),
                style.ink.gamma_multiply(0.8),
            );
        }
        for v in x.ticks(6) {
            let px = x.map(v);
            painter.line_segment(
                [Pos2::new(px, inner.bottom()), Pos2::new(px, inner.bottom() + 4.0)],
                Stroke::new(1.0, style.outline),
            );
            painter.text(
                Pos2::new(px, inner.bottom() + 6.0),
                Align2::CENTER_TOP,
                format!("{v:.0}"),
                tick_font.clone(),
                style.ink.gamma_multiply(0.8),
            );
        }

        if let Some(year) = highlight_year {
            if (year_lo..=year_hi).contains(&year) {
                let px = x.map(year as f64);
                painter.extend(Shape::dashed_line(
                    &[Pos2::new(px, inner.top()), Pos2::new(px, inner.bottom())],
                    Stroke::new(1.0, style.accent),
                    5.0,
                    4.0,
                ));
            }
        }

        let colors = CategoricalColor::new(series.iter().map(|(name, _)| name.clone()));
        let pointer = ui.input(|i| i.pointer.hover_pos()).filter(|p| rect.contains(*p));

        // Nearest data point wins the hover; lines alone are too thin to
        // target reliably.
        let mut hovered: Option<(usize, usize)> = None;
        if let Some(p) = pointer {
            let mut best = HIT_DISTANCE;
            for (si, (_, points)) in series.iter().enumerate() {
                for (pi, (year, value)) in points.iter().enumerate() {
                    let at = Pos2::new(x.map(*year as f64), y.map(*value));
                    let d = (p - at).length();
                    if d < best {
                        best = d;
                        hovered = Some((si, pi));
                    }
                }
            }
        }

        for (si, (name, points)) in series.iter().enumerate() {
            let color = colors.map(name);
            let is_hovered = hovered.is_some_and(|(h, _)| h == si);
            let path: Vec<Pos2> = points
                .iter()
                .map(|(year, value)| Pos2::new(x.map(*year as f64), y.map(*value)))
                .collect();
            painter.add(Shape::line(
                path.clone(),
                Stroke::new(
                    if is_hovered { 2.6 } else { 1.8 },
                    if is_hovered { color } else { color.gamma_multiply(0.85) },
                ),
            ));
            for at in path {
                painter.circle_filled(at, POINT_RADIUS, color);
            }
        }

        if let (Some((si, pi)), Some(p)) = (hovered, pointer) {
            let (name, points) = &series[si];
            let (year, value) = points[pi];
            let lines = vec![
                TooltipLine::title(name.clone()),
                TooltipLine::row("Year", year.to_string()),
                TooltipLine::row("Value", format_value(value)),
            ];
            tooltip.show(ui.ctx(), rect, p, &lines);
        }

        response
    }
}

fn format_value(v: f64) -> String {
    if v.abs() >= 1_000_000.0 {
        format!("{:.1}M", v / 1_000_000.0)
    } else if v.abs() >= 1_000.0 {
        format!("{:.1}K", v / 1_000.0)
    } else {
        format!("{v:.0}")
    }
}

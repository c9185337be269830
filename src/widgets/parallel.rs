//! Parallel-coordinate view: one polyline per record, visiting every
//! dimension's axis at the record's mapped position.

use eframe::egui::{self, Align2, Pos2, Sense, Stroke, TextStyle, Ui, Vec2, Widget};

use crate::layout::axes::{self, DimValue, Dimension, DimensionKind};
use crate::scale::CategoricalColor;
use crate::themes::{ChartStyle, Styled};
use crate::widgets;
use crate::{TooltipHandle, TooltipLine};

/// Pointer distance within which a polyline counts as hovered.
const HIT_DISTANCE: f32 = 4.0;

#[must_use = "You should put this widget in a ui with `ui.add(widget);`"]
pub struct ParallelChart<'a> {
    dimensions: &'a [Dimension],
    rows: &'a [Vec<DimValue>],
    tooltip: &'a TooltipHandle,
    desired_height: Option<f32>,
    chart_style: Option<ChartStyle>,
}

impl<'a> ParallelChart<'a> {
    pub fn new(
        dimensions: &'a [Dimension],
        rows: &'a [Vec<DimValue>],
        tooltip: &'a TooltipHandle,
    ) -> Self {
        Self {
            dimensions,
            rows,
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

impl Styled for ParallelChart<'_> {
    type Style = ChartStyle;

    fn set_style(&mut self, style: Option<Self::Style>) {
        self.chart_style = style;
    }
}

impl Widget for ParallelChart<'_> {
    fn ui(self, ui: &mut Ui) -> egui::Response {
        let Self {
            dimensions,
            rows,
            tooltip,
            desired_height,
            chart_style,
        } = self;

        let style = chart_style.unwrap_or_else(|| ChartStyle::from(ui.style().as_ref()));
        let width = ui.available_width().max(320.0);
        let height = desired_height.unwrap_or(width * 0.55);
        let (rect, response, painter) = widgets::canvas(ui, Vec2::new(width, height), Sense::hover());
        if !ui.is_rect_visible(rect) {
            return response;
        }

        if dimensions.is_empty() || rows.is_empty() {
            widgets::no_data_placeholder(ui, &painter, rect);
            return response;
        }

        // Margins leave room for axis titles above and tick labels beside
        // the outermost axes.
        let inner = egui::Rect::from_min_max(
            rect.min + Vec2::new(64.0, 26.0),
            rect.max - Vec2::new(64.0, 14.0),
        );
        let layout = axes::axis_layout(dimensions, rows, inner);

        // Polylines keep the color identity of their first categorical
        // cell, so suppliers read the same here as on every other view.
        let color_domain = dimensions
            .iter()
            .find_map(|d| match &d.kind {
                DimensionKind::Categorical(domain) => Some(domain.clone()),
                DimensionKind::Continuous => None,
            })
            .unwrap_or_default();
        let colors = CategoricalColor::new(color_domain);

        let lines: Vec<(usize, Vec<Pos2>)> = rows
            .iter()
            .enumerate()
            .filter_map(|(i, row)| layout.polyline(row).map(|points| (i, points)))
            .collect();
        if lines.is_empty() {
            widgets::no_data_placeholder(ui, &painter, rect);
            return response;
        }

        let pointer = ui.input(|i| i.pointer.hover_pos()).filter(|p| rect.contains(*p));
        let hovered = pointer.and_then(|p| {
            let mut best: Option<(usize, f32)> = None;
            for (row, points) in &lines {
                for pair in points.windows(2) {
                    let d = widgets::distance_to_segment(p, pair[0], pair[1]);
                    if d < HIT_DISTANCE && best.is_none_or(|(_, bd)| d < bd) {
                        best = Some((*row, d));
                    }
                }
            }
            best.map(|(row, _)| row)
        });

        for (row, points) in &lines {
            let color = row_color(&rows[*row], &colors, &style);
            let is_hovered = hovered == Some(*row);
            let stroke = if is_hovered {
                Stroke::new(2.5, color)
            } else {
                Stroke::new(1.3, color.gamma_multiply(0.7))
            };
            painter.add(egui::Shape::line(points.clone(), stroke));
        }

        // Axes over the lines, the way the eye expects to read them.
        let tick_font = TextStyle::Small.resolve(ui.style());
        for dim in &layout.dims {
            painter.line_segment(
                [
                    Pos2::new(dim.x, inner.top()),
                    Pos2::new(dim.x, inner.bottom()),
                ],
                Stroke::new(1.0, style.outline),
            );
            for (y, label) in dim.ticks() {
                painter.line_segment(
                    [Pos2::new(dim.x - 3.0, y), Pos2::new(dim.x, y)],
                    Stroke::new(1.0, style.outline),
                );
                painter.text(
                    Pos2::new(dim.x - 6.0, y),
                    Align2::RIGHT_CENTER,
                    label,
                    tick_font.clone(),
                    style.ink.gamma_multiply(0.8),
                );
            }
            painter.text(
                Pos2::new(dim.x, rect.top() + 4.0),
                Align2::CENTER_TOP,
                &dim.label,
                tick_font.clone(),
                style.ink,
            );
        }

        if let (Some(row), Some(p)) = (hovered, pointer) {
            let cells = &rows[row];
            let mut tip = Vec::with_capacity(dimensions.len() + 1);
            if let Some(DimValue::Name(name)) = cells.first() {
                tip.push(TooltipLine::title(name.clone()));
            }
            for (dim, cell) in dimensions.iter().zip(cells) {
                tip.push(TooltipLine::row(dim.label.clone(), format_cell(cell)));
            }
            tooltip.show(ui.ctx(), rect, p, &tip);
        }

        response
    }
}

fn row_color(row: &[DimValue], colors: &CategoricalColor, style: &ChartStyle) -> egui::Color32 {
    row.iter()
        .find_map(|cell| match cell {
            DimValue::Name(name) => Some(colors.map(name)),
            DimValue::Number(_) => None,
        })
        .unwrap_or(style.muted)
}

fn format_cell(value: &DimValue) -> String {
    match value {
        DimValue::Name(name) => name.clone(),
        DimValue::Number(v) if v.fract() == 0.0 => format!("{v:.0}"),
        DimValue::Number(v) => format!("{v:.1}"),
    }
}

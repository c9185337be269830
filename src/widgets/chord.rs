//! Chord diagram: countries as arcs around a circle, flows as ribbons
//! between them. Shares the scale-construction contract with the parallel
//! view; the angular layout lives in [`crate::layout::axes`].

use eframe::egui::{self, epaint::PathShape, Align2, Pos2, Sense, TextStyle, Ui, Vec2, Widget};

use crate::geo;
use crate::layout::axes::{self, ChordLayout, CHORD_PAD_ANGLE};
use crate::scale::CategoricalColor;
use crate::themes::{ChartStyle, Styled};
use crate::widgets;
use crate::{TooltipHandle, TooltipLine};

/// Radial thickness of the group arc band.
const BAND: f32 = 14.0;
/// Space kept outside the circle for country labels.
const LABEL_MARGIN: f32 = 56.0;
/// Angular sampling step for arc and ribbon outlines, in radians.
const ARC_STEP: f32 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChordHover {
    Group(usize),
    Ribbon(usize),
}

#[derive(Debug, Default)]
pub struct ChordState {
    pub hovered: Option<ChordHover>,
}

#[must_use = "You should put this widget in a ui with `ui.add(widget);`"]
pub struct ChordChart<'a> {
    names: &'a [String],
    matrix: &'a [Vec<f64>],
    year: u16,
    state: &'a mut ChordState,
    tooltip: &'a TooltipHandle,
    desired_height: Option<f32>,
    chart_style: Option<ChartStyle>,
}

impl<'a> ChordChart<'a> {
    pub fn new(
        names: &'a [String],
        matrix: &'a [Vec<f64>],
        year: u16,
        state: &'a mut ChordState,
        tooltip: &'a TooltipHandle,
    ) -> Self {
        Self {
            names,
            matrix,
            year,
            state,
            tooltip,
            desired_height: None,
            chart_style: None,
        }
    }

    pub fn desired_height(mut self, height: f32) -> Self {
        self.desired_height = Some(height.max(200.0));
        self
    }
}

impl Styled for ChordChart<'_> {
    type Style = ChartStyle;

    fn set_style(&mut self, style: Option<Self::Style>) {
        self.chart_style = style;
    }
}

impl Widget for ChordChart<'_> {
    fn ui(self, ui: &mut Ui) -> egui::Response {
        let Self {
            names,
            matrix,
            year,
            state,
            tooltip,
            desired_height,
            chart_style,
        } = self;

        let style = chart_style.unwrap_or_else(|| ChartStyle::from(ui.style().as_ref()));
        let width = ui.available_width().max(320.0);
        let height = desired_height.unwrap_or(width * 0.75);
        let (rect, response, painter) = widgets::canvas(ui, Vec2::new(width, height), Sense::hover());
        if !ui.is_rect_visible(rect) {
            return response;
        }

        let layout: ChordLayout = axes::chord_layout(matrix, CHORD_PAD_ANGLE);
        if layout.groups.is_empty() || names.len() < matrix.len() {
            widgets::no_data_placeholder(ui, &painter, rect);
            return response;
        }

        let center = rect.center();
        let outer = (rect.width().min(rect.height()) / 2.0 - LABEL_MARGIN).max(40.0);
        let inner = outer - BAND;
        let colors = CategoricalColor::new(names.iter().cloned());

        let pointer = ui.input(|i| i.pointer.hover_pos()).filter(|p| rect.contains(*p));
        let mut hovered: Option<ChordHover> = None;

        // Ribbons first so the arc band always reads on top.
        let ribbons: Vec<Vec<Pos2>> = layout
            .ribbons
            .iter()
            .map(|r| ribbon_outline(center, inner, r.source.start, r.source.end, r.target.start, r.target.end))
            .collect();
        for (i, outline) in ribbons.iter().enumerate() {
            if let Some(p) = pointer {
                if geo::point_in_ring(p, outline) {
                    hovered = Some(ChordHover::Ribbon(i));
                }
            }
        }
        for (i, outline) in ribbons.iter().enumerate() {
            let source = layout.ribbons[i].source.index;
            let is_hovered = state.hovered == Some(ChordHover::Ribbon(i));
            let fill = colors
                .map(&names[source])
                .gamma_multiply(if is_hovered { 0.85 } else { 0.45 });
            let mut shape = PathShape::closed_line(
                outline.clone(),
                egui::epaint::PathStroke::new(
                    if is_hovered { 1.5 } else { 0.5 },
                    style.outline.gamma_multiply(0.4),
                ),
            );
            shape.fill = fill;
            painter.add(shape);
        }

        let label_font = TextStyle::Small.resolve(ui.style());
        for group in &layout.groups {
            if let Some(p) = pointer {
                let v = p - center;
                let d = v.length();
                let mut angle = v.x.atan2(-v.y);
                if angle < 0.0 {
                    angle += std::f32::consts::TAU;
                }
                if d >= inner && d <= outer && angle >= group.start && angle < group.end {
                    hovered = Some(ChordHover::Group(group.index));
                }
            }
            let is_hovered = state.hovered == Some(ChordHover::Group(group.index));
            let mut band: Vec<Pos2> = arc_points(center, outer, group.start, group.end);
            band.extend(arc_points(center, inner, group.end, group.start));
            let mut shape = PathShape::closed_line(
                band,
                egui::epaint::PathStroke::new(
                    if is_hovered { 2.0 } else { 1.0 },
                    style.ink.gamma_multiply(0.5),
                ),
            );
            shape.fill = colors.map(&names[group.index]);
            painter.add(shape);

            let mid = (group.start + group.end) / 2.0;
            let anchor = if mid.sin() >= 0.0 {
                Align2::LEFT_CENTER
            } else {
                Align2::RIGHT_CENTER
            };
            painter.text(
                on_circle(center, outer + 6.0, mid),
                anchor,
                &names[group.index],
                label_font.clone(),
                style.ink,
            );
        }

        state.hovered = hovered;

        if let (Some(hover), Some(p)) = (hovered, pointer) {
            let lines = match hover {
                ChordHover::Group(i) => vec![
                    TooltipLine::title(names[i].clone()),
                    TooltipLine::row("Year", year.to_string()),
                    TooltipLine::row("Total exports", format!("{:.0}", layout.groups[i].value)),
                ],
                ChordHover::Ribbon(i) => {
                    let ribbon = &layout.ribbons[i];
                    vec![
                        TooltipLine::title(format!(
                            "{} → {}",
                            names[ribbon.source.index], names[ribbon.target.index]
                        )),
                        TooltipLine::row("Year", year.to_string()),
                        TooltipLine::row("Value", format!("{:.0}", ribbon.value)),
                    ]
                }
            };
            tooltip.show(ui.ctx(), rect, p, &lines);
        }

        response
    }
}

/// Angles run clockwise from twelve o'clock, matching the layout contract.
fn on_circle(center: Pos2, radius: f32, angle: f32) -> Pos2 {
    center + Vec2::new(angle.sin() * radius, -angle.cos() * radius)
}

fn arc_points(center: Pos2, radius: f32, from: f32, to: f32) -> Vec<Pos2> {
    let steps = (((to - from).abs() / ARC_STEP).ceil() as usize).max(2);
    (0..=steps)
        .map(|i| {
            let t = i as f32 / steps as f32;
            on_circle(center, radius, from + (to - from) * t)
        })
        .collect()
}

/// Closed ribbon outline: the source arc, a curve through the center to the
/// target arc, and a curve back.
fn ribbon_outline(
    center: Pos2,
    radius: f32,
    source_start: f32,
    source_end: f32,
    target_start: f32,
    target_end: f32,
) -> Vec<Pos2> {
    let mut outline = arc_points(center, radius, source_start, source_end);
    outline.extend(quadratic(
        on_circle(center, radius, source_end),
        center,
        on_circle(center, radius, target_start),
    ));
    outline.extend(arc_points(center, radius, target_start, target_end));
    outline.extend(quadratic(
        on_circle(center, radius, target_end),
        center,
        on_circle(center, radius, source_start),
    ));
    outline
}

fn quadratic(from: Pos2, control: Pos2, to: Pos2) -> Vec<Pos2> {
    const STEPS: usize = 16;
    (1..STEPS)
        .map(|i| {
            let t = i as f32 / STEPS as f32;
            let u = 1.0 - t;
            Pos2::new(
                u * u * from.x + 2.0 * u * t * control.x + t * t * to.x,
                u * u * from.y + 2.0 * u * t * control.y + t * t * to.y,
            )
        })
        .collect()
}

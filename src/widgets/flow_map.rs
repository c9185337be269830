//! Supplier→recipient flow lines over the world map, with the top five
//! recipients of each supplier highlighted.

use eframe::egui::{self, epaint::PathShape, Pos2, Sense, Stroke, Ui, Vec2, Widget};

use crate::data::{self, TradeRecord, TOP_RECIPIENTS_PER_SUPPLIER};
use crate::geo::{self, ViewTransform, WorldAtlas};
use crate::scale::{CategoricalColor, SqrtScale};
use crate::themes::{self, MapStyle, Styled};
use crate::widgets;
use crate::{TooltipHandle, TooltipLine};

const STROKE_RANGE: (f32, f32) = (1.0, 4.0);
const ZOOM_LIMITS: (f32, f32) = (1.0, 8.0);
const TOP_RADIUS: f32 = 6.0;
const BASE_RADIUS: f32 = 3.0;

/// Which suppliers to overlay.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SupplierFilter {
    #[default]
    All,
    One(String),
}

#[derive(Debug, Default)]
pub struct FlowMapState {
    pub transform: ViewTransform,
    pub filter: SupplierFilter,
}

struct FlowLine {
    supplier: String,
    recipient: String,
    value: f64,
    from: Pos2,
    to: Pos2,
    top: bool,
}

#[must_use = "You should put this widget in a ui with `ui.add(widget);`"]
pub struct FlowMap<'a> {
    atlas: &'a WorldAtlas,
    records: &'a [TradeRecord],
    year: u16,
    state: &'a mut FlowMapState,
    tooltip: &'a TooltipHandle,
    desired_height: Option<f32>,
    map_style: Option<MapStyle>,
}

impl<'a> FlowMap<'a> {
    pub fn new(
        atlas: &'a WorldAtlas,
        records: &'a [TradeRecord],
        year: u16,
        state: &'a mut FlowMapState,
        tooltip: &'a TooltipHandle,
    ) -> Self {
        Self {
            atlas,
            records,
            year,
            state,
            tooltip,
            desired_height: None,
            map_style: None,
        }
    }

    pub fn desired_height(mut self, height: f32) -> Self {
        self.desired_height = Some(height.max(120.0));
        self
    }
}

impl Styled for FlowMap<'_> {
    type Style = MapStyle;

    fn set_style(&mut self, style: Option<Self::Style>) {
        self.map_style = style;
    }
}

impl Widget for FlowMap<'_> {
    fn ui(self, ui: &mut Ui) -> egui::Response {
        let Self {
            atlas,
            records,
            year,
            state,
            tooltip,
            desired_height,
            map_style,
        } = self;

        let style = map_style.unwrap_or_else(|| MapStyle::from(ui.style().as_ref()));
        let width = ui.available_width().max(320.0);
        let height = desired_height.unwrap_or(width * 0.5);
        let (rect, response, painter) =
            widgets::canvas(ui, Vec2::new(width, height), Sense::click_and_drag());
        if !ui.is_rect_visible(rect) {
            return response;
        }

        widgets::view_control(ui, &response, rect, &mut state.transform, ZOOM_LIMITS);
        painter.rect_filled(rect, 0.0, style.water);

        let local = egui::Rect::from_min_size(Pos2::ZERO, rect.size());
        let projection = geo::world_projection(local);
        let offset = rect.min.to_vec2();

        for feature in &atlas.features {
            for ring in &feature.rings {
                let points: Vec<Pos2> = geo::ring_points(ring, &projection, &state.transform)
                    .into_iter()
                    .map(|p| p + offset)
                    .collect();
                let mut shape = PathShape::closed_line(
                    points,
                    egui::epaint::PathStroke::new(1.0, style.border),
                );
                shape.fill = style.land;
                painter.add(shape);
            }
        }

        let mut suppliers: Vec<&str> = records.iter().map(|r| r.supplier.as_str()).collect();
        suppliers.sort_unstable();
        suppliers.dedup();
        let shown: Vec<&str> = match &state.filter {
            SupplierFilter::All => suppliers.clone(),
            SupplierFilter::One(name) => vec![name.as_str()],
        };
        let colors = CategoricalColor::new(suppliers.iter().map(|s| s.to_string()));

        // Flow geometry for the selected year; unresolved countries have no
        // centroid and are excluded from placement.
        let mut lines: Vec<FlowLine> = Vec::new();
        let mut any_flow = false;
        for supplier in &shown {
            let Some(origin) = atlas.centroid(supplier) else {
                continue;
            };
            let from =
                state.transform.apply(projection.project(origin.0, origin.1)) + offset;
            let mut flows: Vec<(String, f64)> = Vec::new();
            for record in records {
                if record.supplier == *supplier && record.year == year && record.value > 0.0 {
                    flows.push((record.recipient.clone(), record.value));
                }
            }
            any_flow |= !flows.is_empty();
            let top: Vec<String> = data::top_recipients(
                &records
                    .iter()
                    .filter(|r| r.supplier == *supplier && r.year == year)
                    .cloned()
                    .collect::<Vec<_>>(),
                TOP_RECIPIENTS_PER_SUPPLIER,
            );
            for (recipient, value) in flows {
                let Some(dest) = atlas.centroid(&recipient) else {
                    continue;
                };
                let to = state.transform.apply(projection.project(dest.0, dest.1)) + offset;
                lines.push(FlowLine {
                    supplier: supplier.to_string(),
                    top: top.contains(&recipient),
                    recipient,
                    value,
                    from,
                    to,
                });
            }
        }

        let max_value = lines.iter().map(|l| l.value).fold(0.0, f64::max);
        let stroke_scale = SqrtScale::new(max_value, STROKE_RANGE);

        let pointer = ui.input(|i| i.pointer.hover_pos()).filter(|p| rect.contains(*p));
        let mut hovered: Option<usize> = None;

        for (i, line) in lines.iter().enumerate() {
            let color = colors.map(&line.supplier);
            painter.line_segment(
                [line.from, line.to],
                Stroke::new(stroke_scale.map(line.value), color.gamma_multiply(0.6)),
            );
            if let Some(p) = pointer {
                if widgets::distance_to_segment(p, line.from, line.to) < 4.0 {
                    hovered = Some(i);
                }
            }
        }
        for (i, line) in lines.iter().enumerate() {
            let (r, fill) = if line.top {
                (TOP_RADIUS, themes::TOP_RECIPIENT)
            } else {
                (BASE_RADIUS, colors.map(&line.supplier))
            };
            painter.circle_filled(line.to, r, fill);
            if let Some(p) = pointer {
                if (p - line.to).length() <= r {
                    hovered = Some(i);
                }
            }
        }

        if let (Some(i), Some(p)) = (hovered, pointer) {
            if !response.dragged() {
                let line = &lines[i];
                let lines = vec![
                    TooltipLine::row("Origin", line.supplier.clone()),
                    TooltipLine::row("Destination", line.recipient.clone()),
                    TooltipLine::row("Trade value", format!("{:.0}", line.value)),
                ];
                tooltip.show(ui.ctx(), rect, p, &lines);
            }
        }

        if !any_flow {
            widgets::no_data_placeholder(ui, &painter, rect);
        }

        response
    }
}


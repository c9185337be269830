//! Choropleth fill plus proportional symbols over country centroids.

use std::collections::BTreeMap;

use eframe::egui::{self, epaint::PathShape, Pos2, Sense, Stroke, Ui, Vec2, Widget};

use crate::data;
use crate::geo::{self, ViewTransform, WorldAtlas};
use crate::interact::{self, ModalState};
use crate::scale::{SequentialColor, SqrtScale};
use crate::themes::{MapStyle, Styled};
use crate::widgets;
use crate::{TooltipHandle, TooltipLine};

/// Symbol radius range in pixels, zero so countries without data vanish.
const SYMBOL_RANGE: (f32, f32) = (0.0, 50.0);
const ZOOM_LIMITS: (f32, f32) = (1.0, 8.0);

#[derive(Debug, Clone, PartialEq)]
pub struct BreakdownRow {
    pub category: String,
    pub supplier: String,
    pub quantity: f64,
    pub status: String,
}

/// Everything known about one country for the active year/category filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountryBreakdown {
    pub total: f64,
    pub rows: Vec<BreakdownRow>,
}

/// Modal payload for click-to-drill.
#[derive(Debug, Clone, PartialEq)]
pub struct CountryDetail {
    pub country: String,
    pub year: u16,
    pub rows: Vec<BreakdownRow>,
}

/// Placement granularity for fills and symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MapMode {
    #[default]
    Countries,
    /// Aggregate by world region, symbols at fixed region anchors.
    Regions,
}

/// View state owned by the mounting panel; dropped with it.
#[derive(Debug, Default)]
pub struct MapState {
    pub transform: ViewTransform,
    pub mode: MapMode,
    pub hovered: Option<String>,
    pub modal: ModalState<CountryDetail>,
}

#[must_use = "You should put this widget in a ui with `ui.add(widget);`"]
pub struct SymbolMap<'a> {
    atlas: &'a WorldAtlas,
    stats: &'a BTreeMap<String, CountryBreakdown>,
    year: u16,
    state: &'a mut MapState,
    tooltip: &'a TooltipHandle,
    desired_height: Option<f32>,
    map_style: Option<MapStyle>,
}

impl<'a> SymbolMap<'a> {
    pub fn new(
        atlas: &'a WorldAtlas,
        stats: &'a BTreeMap<String, CountryBreakdown>,
        year: u16,
        state: &'a mut MapState,
        tooltip: &'a TooltipHandle,
    ) -> Self {
        Self {
            atlas,
            stats,
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

impl Styled for SymbolMap<'_> {
    type Style = MapStyle;

    fn set_style(&mut self, style: Option<Self::Style>) {
        self.map_style = style;
    }
}

impl Widget for SymbolMap<'_> {
    fn ui(self, ui: &mut Ui) -> egui::Response {
        let Self {
            atlas,
            stats,
            year,
            state,
            tooltip,
            desired_height,
            map_style,
        } = self;

        let style = map_style.unwrap_or_else(|| MapStyle::from(ui.style().as_ref()));
        let width = ui.available_width().max(320.0);
        let height = desired_height.unwrap_or(width * 0.45);
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

        // In region mode everything keys on the region name instead of the
        // country; countries outside the region table drop out.
        let region_stats = (state.mode == MapMode::Regions).then(|| aggregate_by_region(stats));
        let active = region_stats.as_ref().unwrap_or(stats);

        let max_total = active.values().map(|s| s.total).fold(0.0, f64::max);
        let fill_scale = SequentialColor::new(max_total);
        let radius_scale = SqrtScale::new(max_total, SYMBOL_RANGE);

        let pointer = ui.input(|i| i.pointer.hover_pos()).filter(|p| rect.contains(*p));
        let mut hovered: Option<String> = None;

        // Country fills; the last feature under the pointer wins the hover.
        for feature in &atlas.features {
            let key = match state.mode {
                MapMode::Countries => Some(feature.name.as_str()),
                MapMode::Regions => data::region_of(&feature.name),
            };
            let total = key
                .and_then(|k| active.get(k))
                .map(|s| s.total)
                .unwrap_or(0.0);
            let fill = if total > 0.0 {
                fill_scale.map(total)
            } else {
                style.no_data
            };
            for ring in &feature.rings {
                let points: Vec<Pos2> = geo::ring_points(ring, &projection, &state.transform)
                    .into_iter()
                    .map(|p| p + offset)
                    .collect();
                if let (Some(p), Some(key)) = (pointer, key) {
                    if total > 0.0 && geo::point_in_ring(p, &points) {
                        hovered = Some(key.to_owned());
                    }
                }
                let mut shape = PathShape::closed_line(
                    points,
                    egui::epaint::PathStroke::new(0.5, style.border),
                );
                shape.fill = fill;
                painter.add(shape);
            }
        }

        // Proportional symbols at centroids or region anchors. Unresolved
        // names have no centroid and are simply not placed.
        for (name, stat) in active {
            if stat.total <= 0.0 {
                continue;
            }
            let place = match state.mode {
                MapMode::Countries => atlas.centroid(name),
                MapMode::Regions => geo::region_anchor(name),
            };
            let Some((lon, lat)) = place else {
                continue;
            };
            let center = state.transform.apply(projection.project(lon, lat)) + offset;
            let r = radius_scale.map(stat.total);
            painter.circle_filled(center, r, style.symbol_fill);
            painter.circle_stroke(center, r, Stroke::new(0.5, style.symbol_stroke));
            if let Some(p) = pointer {
                if (p - center).length() <= r {
                    hovered = Some(name.clone());
                }
            }
        }

        if response.dragged() {
            hovered = None;
        }
        state.hovered = hovered;

        if let (Some(name), Some(p)) = (&state.hovered, pointer) {
            if let Some(stat) = active.get(name) {
                let lines = vec![
                    TooltipLine::title(name.clone()),
                    TooltipLine::row("Year", year.to_string()),
                    TooltipLine::row("Total imports", format!("{:.0} units", stat.total)),
                    TooltipLine::note("Click for details"),
                ];
                tooltip.show(ui.ctx(), rect, p, &lines);
            }
            if response.clicked() && !state.modal.is_open() {
                if let Some(stat) = active.get(name) {
                    state.modal.open(CountryDetail {
                        country: name.clone(),
                        year,
                        rows: stat.rows.clone(),
                    });
                }
            }
        }

        if max_total <= 0.0 {
            widgets::no_data_placeholder(ui, &painter, rect);
        }

        interact::modal_window(
            ui.ctx(),
            response.id.with("map_modal"),
            "Import details",
            &mut state.modal,
            |ui, detail| {
                ui.label(format!("{} — {}", detail.country, detail.year));
                ui.separator();
                egui::Grid::new("country_detail_rows")
                    .striped(true)
                    .show(ui, |ui| {
                        ui.strong("Weapon type");
                        ui.strong("Supplier");
                        ui.strong("Quantity");
                        ui.strong("Status");
                        ui.end_row();
                        for row in &detail.rows {
                            ui.label(&row.category);
                            ui.label(&row.supplier);
                            ui.label(format!("{:.0}", row.quantity));
                            ui.label(&row.status);
                            ui.end_row();
                        }
                    });
            },
        );

        response
    }
}

/// Fold country stats into one [`CountryBreakdown`] per region.
fn aggregate_by_region(
    stats: &BTreeMap<String, CountryBreakdown>,
) -> BTreeMap<String, CountryBreakdown> {
    let mut regions: BTreeMap<String, CountryBreakdown> = BTreeMap::new();
    for (country, stat) in stats {
        let Some(region) = data::region_of(country) else {
            continue;
        };
        let entry = regions.entry(region.to_owned()).or_default();
        entry.total += stat.total;
        entry.rows.extend(stat.rows.iter().cloned());
    }
    regions
}

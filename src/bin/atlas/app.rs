// Panel implementations for the `atlas` demo dashboard.
//
// Every panel owns its data end to end: a Remote load of the bundled
// sample payload, Derived entities recomputed only when their inputs
// change, and the widget's view state. The map, timeline, flow, network
// and chord panels share one year signal; the hierarchy panels keep a
// local one.

use std::collections::BTreeMap;
use std::time::Duration;

use eframe::egui::{self, Pos2, Rect, Ui};

use tradewinds::data::{
    self, AliasIndex, CategoryTable, Normalized, RawPayload, RowSchema, TradeGraph, TradeRecord,
    TOP_RECIPIENTS_PER_SUPPLIER,
};
use tradewinds::dataflow::{self, DependencyStamp, Derived, Remote, SharedSignal, Signal};
use tradewinds::error::DataError;
use tradewinds::geo::WorldAtlas;
use tradewinds::layout::axes::{DimValue, Dimension};
use tradewinds::layout::pack::{self, PackedCircle, PACK_PADDING};
use tradewinds::layout::treemap::{self, TreemapRect, TREEMAP_PADDING};
use tradewinds::scale::CategoricalColor;
use tradewinds::widgets::symbol_map::BreakdownRow;
use tradewinds::widgets::{
    ChordChart, ChordState, CountryBreakdown, FlowMap, FlowMapState, MapMode, MapState,
    NetworkGraph, NetworkState, PackingChart, PackingState, ParallelChart, SymbolMap, Timeline,
    TreemapChart,
};
use tradewinds::widgets::flow_map::SupplierFilter;
use tradewinds::{Dashboard, Panel, PanelCtx};

const ARMS_TRANSFERS: &str = include_str!("../../../assets/samples/arms_transfers.json");
const TRADE_FLOWS: &str = include_str!("../../../assets/samples/trade_flows.json");
const CATEGORY_TABLE: &str = include_str!("../../../assets/samples/category_table.json");
const WORLD_ATLAS: &str = include_str!("../../../assets/samples/world_atlas.json");

/// How many suppliers the timeline shows.
const TIMELINE_SERIES: usize = 6;

pub fn run() -> eframe::Result {
    let year = dataflow::shared(2014u16);
    let mut dashboard = Dashboard::new();
    dashboard.push_panel(Box::new(MapPanel::new(year.clone())));
    dashboard.push_panel(Box::new(TimelinePanel::new(year.clone())));
    dashboard.push_panel(Box::new(FlowPanel::new(year.clone())));
    dashboard.push_panel(Box::new(NetworkPanel::new(year.clone())));
    dashboard.push_panel(Box::new(PackingPanel::new()));
    dashboard.push_panel(Box::new(TreemapPanel::new()));
    dashboard.push_panel(Box::new(ParallelPanel::new()));
    dashboard.push_panel(Box::new(ChordPanel::new(year)));
    dashboard.run("tradewinds atlas")
}

// ---------------------------------------------------------------------------
// Loading

struct TradeData {
    atlas: WorldAtlas,
    records: Vec<TradeRecord>,
    years: Vec<u16>,
}

impl TradeData {
    fn new(atlas: WorldAtlas, normalized: Normalized) -> Self {
        let mut years: Vec<u16> = normalized.records.iter().map(|r| r.year).collect();
        years.sort_unstable();
        years.dedup();
        Self {
            atlas,
            records: normalized.records,
            years,
        }
    }
}

fn transfer_schema() -> RowSchema {
    RowSchema::new("suppliers", "recipients", "year", "quantity")
        .category("weapon description")
        .status("status")
}

fn sample_aliases(atlas: &WorldAtlas) -> AliasIndex {
    let mut aliases = AliasIndex::with_defaults();
    aliases.add_canonical(atlas.names().map(str::to_owned));
    aliases
}

fn load_transfers() -> Result<TradeData, DataError> {
    // Sleep stands in for transport latency so the pending state is visible.
    std::thread::sleep(Duration::from_millis(350));
    let atlas = WorldAtlas::from_json(WORLD_ATLAS)?;
    let aliases = sample_aliases(&atlas);
    let normalized = match RawPayload::rows_from_json(ARMS_TRANSFERS)? {
        RawPayload::Rows(rows) => data::normalize_rows(&rows, &transfer_schema(), &aliases)?,
        _ => return Err(DataError::shape("expected a row payload")),
    };
    Ok(TradeData::new(atlas, normalized))
}

fn load_flows() -> Result<TradeData, DataError> {
    std::thread::sleep(Duration::from_millis(250));
    let atlas = WorldAtlas::from_json(WORLD_ATLAS)?;
    let aliases = sample_aliases(&atlas);
    let normalized = match RawPayload::flows_from_json(TRADE_FLOWS)? {
        RawPayload::Flows(docs) => data::normalize_flows(&docs, &aliases)?,
        _ => return Err(DataError::shape("expected a flow payload")),
    };
    Ok(TradeData::new(atlas, normalized))
}

fn load_categories() -> Result<CategoryTable, DataError> {
    std::thread::sleep(Duration::from_millis(200));
    match RawPayload::categories_from_json(CATEGORY_TABLE)? {
        RawPayload::Categories(table) => Ok(table),
        _ => Err(DataError::shape("expected a category table")),
    }
}

/// Spinner while loading, error with a retry button on failure. `true`
/// once a value is available to paint.
fn remote_gate<T: Send + 'static>(
    ui: &mut Ui,
    remote: &mut Remote<T>,
    loader: fn() -> Result<T, DataError>,
) -> bool {
    remote.ensure_started(loader);
    if remote.poll() {
        ui.ctx().request_repaint();
    }
    if remote.value().is_none() {
        match remote.error().map(|e| e.to_string()) {
            Some(message) => {
                ui.colored_label(ui.visuals().error_fg_color, message);
                if ui.button("Retry").clicked() {
                    remote.spawn(loader);
                }
            }
            None => {
                ui.spinner();
            }
        }
        return false;
    }
    if remote.is_loading() {
        ui.spinner();
    }
    true
}

/// Adapter so a bare generation number can join a dependency tuple.
struct Stamp(u64);

impl DependencyStamp for Stamp {
    fn stamp(&self) -> u64 {
        self.0
    }
}

fn shared_year_slider(ui: &mut Ui, year: &SharedSignal<u16>, years: &[u16]) -> u16 {
    let (lo, hi) = match (years.first(), years.last()) {
        (Some(lo), Some(hi)) => (*lo, *hi),
        _ => (data::YEAR_MIN, data::YEAR_MAX),
    };
    let mut current = (**year.read()).clamp(lo, hi);
    if ui
        .add(egui::Slider::new(&mut current, lo..=hi).text("Year"))
        .changed()
    {
        year.write().set(current);
    }
    current
}

// ---------------------------------------------------------------------------
// Map panel

struct MapPanel {
    year: SharedSignal<u16>,
    data: Remote<TradeData>,
    stats: Derived<BTreeMap<String, CountryBreakdown>>,
    state: MapState,
}

impl MapPanel {
    fn new(year: SharedSignal<u16>) -> Self {
        Self {
            year,
            data: Remote::new(),
            stats: Derived::new(),
            state: MapState::default(),
        }
    }
}

impl Panel for MapPanel {
    fn title(&self) -> &str {
        "Global arms imports"
    }

    fn update(&mut self, ctx: &mut PanelCtx) {
        let tooltip = ctx.tooltip();
        let ui = &mut *ctx.ui;
        if !remote_gate(ui, &mut self.data, load_transfers) {
            return;
        }
        let Some(data) = self.data.value() else {
            return;
        };

        let year = shared_year_slider(ui, &self.year, &data.years);
        ui.horizontal(|ui| {
            ui.label("Aggregate:");
            ui.selectable_value(&mut self.state.mode, MapMode::Countries, "Countries");
            ui.selectable_value(&mut self.state.mode, MapMode::Regions, "Regions");
        });

        let year_stamp = Stamp(self.year.read().generation());
        let deps = (&self.data, &year_stamp);
        let stats = self.stats.read(&deps, || {
            let mut out: BTreeMap<String, CountryBreakdown> = BTreeMap::new();
            for record in &data.records {
                if record.year != year || record.value <= 0.0 {
                    continue;
                }
                let entry = out.entry(record.recipient.clone()).or_default();
                entry.total += record.value;
                entry.rows.push(BreakdownRow {
                    category: record
                        .category
                        .clone()
                        .unwrap_or_else(|| "Unspecified".into()),
                    supplier: record.supplier.clone(),
                    quantity: record.value,
                    status: record.status.clone().unwrap_or_else(|| "unknown".into()),
                });
            }
            out
        });

        ui.add(SymbolMap::new(
            &data.atlas,
            stats,
            year,
            &mut self.state,
            tooltip,
        ));
    }
}

// ---------------------------------------------------------------------------
// Timeline panel (paired with the map through the shared year)

struct TimelinePanel {
    year: SharedSignal<u16>,
    data: Remote<TradeData>,
    series: Derived<Vec<(String, Vec<(u16, f64)>)>>,
}

impl TimelinePanel {
    fn new(year: SharedSignal<u16>) -> Self {
        Self {
            year,
            data: Remote::new(),
            series: Derived::new(),
        }
    }
}

impl Panel for TimelinePanel {
    fn title(&self) -> &str {
        "Exports over time"
    }

    fn update(&mut self, ctx: &mut PanelCtx) {
        let tooltip = ctx.tooltip();
        let ui = &mut *ctx.ui;
        if !remote_gate(ui, &mut self.data, load_transfers) {
            return;
        }
        let Some(data) = self.data.value() else {
            return;
        };

        let deps = (&self.data,);
        let series = self.series.read(&deps, || {
            let mut series = data::year_series(&data.records, |r| r.supplier.as_str());
            series.truncate(TIMELINE_SERIES);
            series
        });

        let totals: Vec<(String, f64)> = series
            .iter()
            .map(|(name, points)| (name.clone(), points.iter().map(|(_, v)| v).sum()))
            .collect();
        let colors = CategoricalColor::new(totals.iter().map(|(name, _)| name.clone()));
        ui.horizontal_wrapped(|ui| {
            for entry in data::legend_entries(&totals) {
                ui.colored_label(
                    colors.map(&entry.label),
                    format!("■ {} {:.1}%", entry.label, entry.share * 100.0),
                );
            }
        });

        let year = **self.year.read();
        ui.add(Timeline::new(series, tooltip).highlight_year(year));
    }
}

// ---------------------------------------------------------------------------
// Flow map panel

struct FlowPanel {
    year: SharedSignal<u16>,
    data: Remote<TradeData>,
    state: FlowMapState,
}

impl FlowPanel {
    fn new(year: SharedSignal<u16>) -> Self {
        Self {
            year,
            data: Remote::new(),
            state: FlowMapState::default(),
        }
    }
}

impl Panel for FlowPanel {
    fn title(&self) -> &str {
        "Supply routes"
    }

    fn update(&mut self, ctx: &mut PanelCtx) {
        let tooltip = ctx.tooltip();
        let ui = &mut *ctx.ui;
        if !remote_gate(ui, &mut self.data, load_flows) {
            return;
        }
        let Some(data) = self.data.value() else {
            return;
        };

        let year = shared_year_slider(ui, &self.year, &data.years);

        let mut suppliers: Vec<&str> = data.records.iter().map(|r| r.supplier.as_str()).collect();
        suppliers.sort_unstable();
        suppliers.dedup();
        egui::ComboBox::from_label("Supplier")
            .selected_text(match &self.state.filter {
                SupplierFilter::All => "All suppliers",
                SupplierFilter::One(name) => name.as_str(),
            })
            .show_ui(ui, |ui| {
                ui.selectable_value(&mut self.state.filter, SupplierFilter::All, "All suppliers");
                for supplier in suppliers {
                    ui.selectable_value(
                        &mut self.state.filter,
                        SupplierFilter::One(supplier.to_owned()),
                        supplier,
                    );
                }
            });

        ui.add(FlowMap::new(
            &data.atlas,
            &data.records,
            year,
            &mut self.state,
            tooltip,
        ));
    }
}

// ---------------------------------------------------------------------------
// Network panel

struct NetworkPanel {
    year: SharedSignal<u16>,
    data: Remote<TradeData>,
    graph: Derived<TradeGraph>,
    state: NetworkState,
    shown_year: Option<u16>,
}

impl NetworkPanel {
    fn new(year: SharedSignal<u16>) -> Self {
        Self {
            year,
            data: Remote::new(),
            graph: Derived::new(),
            state: NetworkState::default(),
            shown_year: None,
        }
    }
}

impl Panel for NetworkPanel {
    fn title(&self) -> &str {
        "Trade partners"
    }

    fn update(&mut self, ctx: &mut PanelCtx) {
        let tooltip = ctx.tooltip();
        let ui = &mut *ctx.ui;
        if !remote_gate(ui, &mut self.data, load_transfers) {
            return;
        }
        let Some(data) = self.data.value() else {
            return;
        };

        let year = shared_year_slider(ui, &self.year, &data.years);
        if self.shown_year != Some(year) {
            self.state.reset();
            self.shown_year = Some(year);
        }

        let year_stamp = Stamp(self.year.read().generation());
        let deps = (&self.data, &year_stamp);
        let graph = self.graph.read(&deps, || {
            data::trade_graph(&data.records, year, TOP_RECIPIENTS_PER_SUPPLIER)
        });

        ui.add(NetworkGraph::new(graph, &mut self.state, tooltip));
    }
}

// ---------------------------------------------------------------------------
// Hierarchy panels

struct PackingPanel {
    table: Remote<CategoryTable>,
    year: Signal<u16>,
    circles: Derived<Vec<PackedCircle>>,
    state: PackingState,
    shown_year: Option<u16>,
}

impl PackingPanel {
    fn new() -> Self {
        Self {
            table: Remote::new(),
            year: Signal::new(2014),
            circles: Derived::new(),
            state: PackingState::default(),
            shown_year: None,
        }
    }
}

impl Panel for PackingPanel {
    fn title(&self) -> &str {
        "Transfers by category"
    }

    fn update(&mut self, ctx: &mut PanelCtx) {
        let tooltip = ctx.tooltip();
        let ui = &mut *ctx.ui;
        if !remote_gate(ui, &mut self.table, load_categories) {
            return;
        }
        let Some(table) = self.table.value() else {
            return;
        };

        let years = data::category_years(table);
        let (lo, hi) = match (years.first(), years.last()) {
            (Some(lo), Some(hi)) => (*lo, *hi),
            _ => (data::YEAR_MIN, data::YEAR_MAX),
        };
        let mut year = (*self.year).clamp(lo, hi);
        if ui
            .add(egui::Slider::new(&mut year, lo..=hi).text("Year"))
            .changed()
        {
            self.year.set(year);
        }
        if self.shown_year != Some(year) {
            self.state.reset();
            self.shown_year = Some(year);
        }

        let deps = (&self.table, &self.year);
        let circles = self.circles.read(&deps, || {
            let root = data::category_hierarchy(table, year);
            pack::pack(&root, 720.0, PACK_PADDING)
        });

        ui.add(PackingChart::new(circles, year, &mut self.state, tooltip).desired_height(540.0));
    }
}

struct TreemapPanel {
    table: Remote<CategoryTable>,
    year: Signal<u16>,
    tiles: Derived<Vec<TreemapRect>>,
}

impl TreemapPanel {
    fn new() -> Self {
        Self {
            table: Remote::new(),
            year: Signal::new(2014),
            tiles: Derived::new(),
        }
    }
}

impl Panel for TreemapPanel {
    fn title(&self) -> &str {
        "Category breakdown"
    }

    fn update(&mut self, ctx: &mut PanelCtx) {
        let tooltip = ctx.tooltip();
        let ui = &mut *ctx.ui;
        if !remote_gate(ui, &mut self.table, load_categories) {
            return;
        }
        let Some(table) = self.table.value() else {
            return;
        };

        let years = data::category_years(table);
        let (lo, hi) = match (years.first(), years.last()) {
            (Some(lo), Some(hi)) => (*lo, *hi),
            _ => (data::YEAR_MIN, data::YEAR_MAX),
        };
        let mut year = (*self.year).clamp(lo, hi);
        if ui
            .add(egui::Slider::new(&mut year, lo..=hi).text("Year"))
            .changed()
        {
            self.year.set(year);
        }

        let deps = (&self.table, &self.year);
        let tiles = self.tiles.read(&deps, || {
            let root = data::category_hierarchy(table, year);
            treemap::treemap(
                &root,
                Rect::from_min_size(Pos2::ZERO, egui::vec2(960.0, 640.0)),
                TREEMAP_PADDING,
            )
        });

        ui.add(TreemapChart::new(tiles, year, tooltip));
    }
}

// ---------------------------------------------------------------------------
// Parallel coordinates panel

struct ParallelPanel {
    data: Remote<TradeData>,
    table: Derived<(Vec<Dimension>, Vec<Vec<DimValue>>)>,
}

impl ParallelPanel {
    fn new() -> Self {
        Self {
            data: Remote::new(),
            table: Derived::new(),
        }
    }
}

impl Panel for ParallelPanel {
    fn title(&self) -> &str {
        "Transfer profiles"
    }

    fn update(&mut self, ctx: &mut PanelCtx) {
        let tooltip = ctx.tooltip();
        let ui = &mut *ctx.ui;
        if !remote_gate(ui, &mut self.data, load_transfers) {
            return;
        }
        let Some(data) = self.data.value() else {
            return;
        };

        let deps = (&self.data,);
        let (dimensions, rows) = self.table.read(&deps, || {
            let top = data::top_recipients(&data.records, 10);
            let mut suppliers: Vec<String> =
                data.records.iter().map(|r| r.supplier.clone()).collect();
            suppliers.sort_unstable();
            suppliers.dedup();
            let dimensions = vec![
                Dimension::categorical("Supplier", suppliers),
                Dimension::categorical("Recipient", top.clone()),
                Dimension::continuous("Year"),
                Dimension::continuous("Quantity"),
            ];
            let rows = data
                .records
                .iter()
                .filter(|r| r.value > 0.0 && top.contains(&r.recipient))
                .map(|r| {
                    vec![
                        DimValue::Name(r.supplier.clone()),
                        DimValue::Name(r.recipient.clone()),
                        DimValue::Number(r.year as f64),
                        DimValue::Number(r.value),
                    ]
                })
                .collect();
            (dimensions, rows)
        });

        ui.add(ParallelChart::new(dimensions, rows, tooltip));
    }
}

// ---------------------------------------------------------------------------
// Chord panel

struct ChordPanel {
    year: SharedSignal<u16>,
    data: Remote<TradeData>,
    matrix: Derived<(Vec<String>, Vec<Vec<f64>>)>,
    state: ChordState,
}

impl ChordPanel {
    fn new(year: SharedSignal<u16>) -> Self {
        Self {
            year,
            data: Remote::new(),
            matrix: Derived::new(),
            state: ChordState::default(),
        }
    }
}

impl Panel for ChordPanel {
    fn title(&self) -> &str {
        "Flow matrix"
    }

    fn update(&mut self, ctx: &mut PanelCtx) {
        let tooltip = ctx.tooltip();
        let ui = &mut *ctx.ui;
        if !remote_gate(ui, &mut self.data, load_transfers) {
            return;
        }
        let Some(data) = self.data.value() else {
            return;
        };

        let year = shared_year_slider(ui, &self.year, &data.years);

        let year_stamp = Stamp(self.year.read().generation());
        let deps = (&self.data, &year_stamp);
        let (names, matrix) = self.matrix.read(&deps, || {
            data::flow_matrix(&data.records, year, TOP_RECIPIENTS_PER_SUPPLIER)
        });

        ui.add(ChordChart::new(
            names,
            matrix,
            year,
            &mut self.state,
            tooltip,
        ));
    }
}

//! Data normalization and derivation.
//!
//! Raw payloads arrive from an external source in one of three shapes:
//! column-named rows, nested supplier→recipient→year flow documents, or a
//! country→category→year table. Everything here turns those into immutable
//! [`TradeRecord`]s and the derived entities the layout engines consume
//! (hierarchies, graphs, matrices, rankings). Parsing is defensive: a bad
//! cell coerces to zero and the row is kept; only a structurally absent
//! payload is an error.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;
use serde_json::Value;

use crate::error::DataError;

/// Bounded historical range for trade observations.
pub const YEAR_MIN: u16 = 1950;
pub const YEAR_MAX: u16 = 2023;

/// How many recipients each supplier contributes to graph and chord views.
pub const TOP_RECIPIENTS_PER_SUPPLIER: usize = 5;

/// One normalized supplier/recipient/year/value observation.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeRecord {
    pub supplier: String,
    pub recipient: String,
    pub year: u16,
    pub value: f64,
    pub category: Option<String>,
    pub status: Option<String>,
}

// ---------------------------------------------------------------------------
// Raw payload shapes

/// Nested flow document: one supplier with per-recipient year series.
#[derive(Debug, Clone, Deserialize)]
pub struct FlowDoc {
    pub supplier: String,
    pub recipients: Vec<RecipientFlows>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecipientFlows {
    pub recipient: String,
    pub years: BTreeMap<String, Value>,
}

/// country → category → year → value table for hierarchical breakdowns.
pub type CategoryTable = BTreeMap<String, BTreeMap<String, BTreeMap<String, Value>>>;

/// A raw payload as handed over by the data-source collaborator.
#[derive(Debug, Clone)]
pub enum RawPayload {
    Rows(Vec<serde_json::Map<String, Value>>),
    Flows(Vec<FlowDoc>),
    Categories(CategoryTable),
}

impl RawPayload {
    pub fn rows_from_json(json: &str) -> Result<Self, DataError> {
        let rows: Vec<serde_json::Map<String, Value>> =
            serde_json::from_str(json).map_err(|e| DataError::load(e.to_string()))?;
        Ok(RawPayload::Rows(rows))
    }

    pub fn flows_from_json(json: &str) -> Result<Self, DataError> {
        let docs: Vec<FlowDoc> =
            serde_json::from_str(json).map_err(|e| DataError::load(e.to_string()))?;
        Ok(RawPayload::Flows(docs))
    }

    pub fn categories_from_json(json: &str) -> Result<Self, DataError> {
        let table: CategoryTable =
            serde_json::from_str(json).map_err(|e| DataError::load(e.to_string()))?;
        Ok(RawPayload::Categories(table))
    }
}

/// Column declaration for row-shaped payloads. Column names vary per
/// dataset, so each consumer declares its own.
#[derive(Debug, Clone)]
pub struct RowSchema {
    pub supplier: String,
    pub recipient: String,
    pub year: String,
    pub value: String,
    pub category: Option<String>,
    pub status: Option<String>,
}

impl RowSchema {
    pub fn new(
        supplier: impl Into<String>,
        recipient: impl Into<String>,
        year: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            supplier: supplier.into(),
            recipient: recipient.into(),
            year: year.into(),
            value: value.into(),
            category: None,
            status: None,
        }
    }

    pub fn category(mut self, column: impl Into<String>) -> Self {
        self.category = Some(column.into());
        self
    }

    pub fn status(mut self, column: impl Into<String>) -> Self {
        self.status = Some(column.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Country alias resolution

/// Canonical country names plus known alias spellings.
///
/// Resolution never fails: unknown names pass through unchanged and are
/// reported as unmapped so spatial placement can exclude them.
#[derive(Debug, Clone, Default)]
pub struct AliasIndex {
    aliases: BTreeMap<String, String>,
    canonical: BTreeSet<String>,
}

const DEFAULT_ALIASES: &[(&str, &str)] = &[
    ("United States of America", "United States"),
    ("USA", "United States"),
    ("Russian Federation", "Russia"),
    ("People's Republic of China", "China"),
    ("Cote d'Ivoire", "Ivory Coast"),
    ("Congo", "Republic of the Congo"),
];

impl AliasIndex {
    pub fn with_defaults() -> Self {
        let mut index = Self::default();
        for (alias, canonical) in DEFAULT_ALIASES {
            index.add_alias(alias, canonical);
        }
        index
    }

    pub fn add_alias(&mut self, alias: impl Into<String>, canonical: impl Into<String>) {
        let canonical = canonical.into();
        self.canonical.insert(canonical.clone());
        self.aliases.insert(alias.into(), canonical);
    }

    /// Register names the geographic atlas actually knows, so pass-through
    /// names can be told apart from genuinely unmapped ones.
    pub fn add_canonical<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.canonical.extend(names.into_iter().map(Into::into));
    }

    /// Canonical spelling for `name`, or `name` unchanged.
    pub fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        self.aliases.get(name).map(String::as_str).unwrap_or(name)
    }

    pub fn is_known(&self, name: &str) -> bool {
        self.canonical.contains(self.resolve(name))
    }
}

// ---------------------------------------------------------------------------
// Normalization

/// Normalized record set plus the names that failed alias resolution.
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub records: Vec<TradeRecord>,
    pub unmapped: BTreeSet<String>,
}

fn coerce_number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn coerce_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_owned())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn coerce_year(value: Option<&Value>) -> Option<u16> {
    let year = coerce_number(value)?.round();
    if year < YEAR_MIN as f64 || year > YEAR_MAX as f64 {
        return None;
    }
    Some(year as u16)
}

/// Normalize row-shaped data through `schema`, resolving country names.
///
/// Rows with an invalid or out-of-range year are skipped; a missing or
/// non-numeric value coerces to zero with the row retained. Fails only when
/// the payload is structurally absent: no rows, or none of the rows carries
/// the declared value column.
pub fn normalize_rows(
    rows: &[serde_json::Map<String, Value>],
    schema: &RowSchema,
    aliases: &AliasIndex,
) -> Result<Normalized, DataError> {
    if rows.is_empty() {
        return Err(DataError::shape("payload contains no rows"));
    }
    if !rows.iter().any(|row| row.contains_key(&schema.value)) {
        return Err(DataError::shape(format!(
            "value column '{}' absent from every row",
            schema.value
        )));
    }

    let mut out = Normalized::default();
    for row in rows {
        let Some(year) = coerce_year(row.get(&schema.year)) else {
            log::warn!("dropping row with invalid or out-of-range year");
            continue;
        };
        let value = match coerce_number(row.get(&schema.value)) {
            Some(v) if v >= 0.0 => v,
            Some(_) | None => {
                log::warn!("coercing invalid value cell to 0");
                0.0
            }
        };
        let supplier = coerce_string(row.get(&schema.supplier)).unwrap_or_default();
        let recipient = coerce_string(row.get(&schema.recipient)).unwrap_or_default();

        for name in [&supplier, &recipient] {
            if !name.is_empty() && !aliases.is_known(name) {
                out.unmapped.insert(name.clone());
            }
        }

        out.records.push(TradeRecord {
            supplier: aliases.resolve(&supplier).to_owned(),
            recipient: aliases.resolve(&recipient).to_owned(),
            year,
            value,
            category: schema
                .category
                .as_ref()
                .and_then(|c| coerce_string(row.get(c))),
            status: schema.status.as_ref().and_then(|c| coerce_string(row.get(c))),
        });
    }

    log::debug!(
        "normalized {} rows ({} unmapped names)",
        out.records.len(),
        out.unmapped.len()
    );
    Ok(out)
}

/// Flatten nested flow documents into records, one per (supplier, recipient,
/// year) with a positive or zero value.
pub fn normalize_flows(docs: &[FlowDoc], aliases: &AliasIndex) -> Result<Normalized, DataError> {
    if docs.is_empty() {
        return Err(DataError::shape("payload contains no supplier documents"));
    }

    let mut out = Normalized::default();
    for doc in docs {
        for recipient in &doc.recipients {
            if !aliases.is_known(&recipient.recipient) {
                out.unmapped.insert(recipient.recipient.clone());
            }
            for (year, value) in &recipient.years {
                let Some(year) = coerce_year(Some(&Value::String(year.clone()))) else {
                    continue;
                };
                let value = coerce_number(Some(value)).unwrap_or(0.0).max(0.0);
                out.records.push(TradeRecord {
                    supplier: aliases.resolve(&doc.supplier).to_owned(),
                    recipient: aliases.resolve(&recipient.recipient).to_owned(),
                    year,
                    value,
                    category: None,
                    status: None,
                });
            }
        }
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Hierarchies

/// A node in a value-weighted tree for packing and treemap layouts.
/// Rebuilt per render pass, never mutated in place.
#[derive(Debug, Clone, PartialEq)]
pub struct HierarchyNode {
    pub name: String,
    pub depth: usize,
    pub value: f64,
    pub children: Vec<HierarchyNode>,
}

impl HierarchyNode {
    pub fn leaf(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            depth: 0,
            value: value.max(0.0),
            children: Vec::new(),
        }
    }

    pub fn branch(name: impl Into<String>, mut children: Vec<HierarchyNode>) -> Self {
        children.sort_by(|a, b| {
            b.value
                .partial_cmp(&a.value)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
        });
        let value = children.iter().map(|c| c.value).sum();
        let mut node = Self {
            name: name.into(),
            depth: 0,
            value,
            children,
        };
        node.assign_depths(0);
        node
    }

    fn assign_depths(&mut self, depth: usize) {
        self.depth = depth;
        for child in &mut self.children {
            child.assign_depths(depth + 1);
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Group records into a two-level hierarchy, summing values.
///
/// `outer` and `inner` select the grouping keys; records where either
/// returns `None`, or that fall outside `year`, are excluded. Zero-valued
/// groups are pruned.
pub fn hierarchy_by<'a>(
    name: &str,
    records: &'a [TradeRecord],
    year: Option<u16>,
    outer: impl Fn(&'a TradeRecord) -> Option<&'a str>,
    inner: impl Fn(&'a TradeRecord) -> Option<&'a str>,
) -> HierarchyNode {
    let mut groups: BTreeMap<&str, BTreeMap<&str, f64>> = BTreeMap::new();
    for record in records {
        if year.is_some_and(|y| record.year != y) {
            continue;
        }
        let (Some(o), Some(i)) = (outer(record), inner(record)) else {
            continue;
        };
        *groups.entry(o).or_default().entry(i).or_default() += record.value;
    }

    let children = groups
        .into_iter()
        .filter_map(|(outer_name, inner_groups)| {
            let leaves: Vec<_> = inner_groups
                .into_iter()
                .filter(|(_, v)| *v > 0.0)
                .map(|(n, v)| HierarchyNode::leaf(n, v))
                .collect();
            (!leaves.is_empty()).then(|| HierarchyNode::branch(outer_name, leaves))
        })
        .collect();

    HierarchyNode::branch(name, children)
}

/// Hierarchy for one year of a country→category table.
pub fn category_hierarchy(table: &CategoryTable, year: u16) -> HierarchyNode {
    let year_key = year.to_string();
    let children = table
        .iter()
        .filter_map(|(country, categories)| {
            let leaves: Vec<_> = categories
                .iter()
                .filter_map(|(category, years)| {
                    let value = coerce_number(years.get(&year_key)).unwrap_or(0.0);
                    (value > 0.0).then(|| HierarchyNode::leaf(category, value))
                })
                .collect();
            (!leaves.is_empty()).then(|| HierarchyNode::branch(country, leaves))
        })
        .collect();
    HierarchyNode::branch("Transfers by category", children)
}

/// Every year present in a category table, ascending.
pub fn category_years(table: &CategoryTable) -> Vec<u16> {
    let mut years: BTreeSet<u16> = BTreeSet::new();
    for categories in table.values() {
        for year_values in categories.values() {
            for key in year_values.keys() {
                if let Ok(y) = key.parse::<u16>() {
                    if (YEAR_MIN..=YEAR_MAX).contains(&y) {
                        years.insert(y);
                    }
                }
            }
        }
    }
    years.into_iter().collect()
}

// ---------------------------------------------------------------------------
// Graphs and rankings

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Supplier,
    Recipient,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub id: String,
    pub role: Role,
}

/// Edge endpoints index into [`TradeGraph::nodes`].
#[derive(Debug, Clone, PartialEq)]
pub struct GraphEdge {
    pub source: usize,
    pub target: usize,
    pub weight: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TradeGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl TradeGraph {
    pub fn max_weight(&self) -> f64 {
        self.edges.iter().map(|e| e.weight).fold(0.0, f64::max)
    }

    /// Largest weight incident to a node; zero for isolated nodes.
    pub fn node_weight(&self, index: usize) -> f64 {
        self.edges
            .iter()
            .filter(|e| e.source == index || e.target == index)
            .map(|e| e.weight)
            .fold(0.0, f64::max)
    }
}

/// Build the supplier→recipient graph for one year.
///
/// Every supplier appears as a node even when it has no qualifying edges.
/// Each supplier contributes its top `k` recipients by value (ties broken
/// alphabetically); recipients are deduplicated across suppliers.
pub fn trade_graph(records: &[TradeRecord], year: u16, k: usize) -> TradeGraph {
    let mut graph = TradeGraph::default();
    let mut index: BTreeMap<String, usize> = BTreeMap::new();

    let mut suppliers: Vec<&str> = records.iter().map(|r| r.supplier.as_str()).collect();
    suppliers.sort_unstable();
    suppliers.dedup();
    for supplier in &suppliers {
        index.insert((*supplier).to_owned(), graph.nodes.len());
        graph.nodes.push(GraphNode {
            id: (*supplier).to_owned(),
            role: Role::Supplier,
        });
    }

    for supplier in suppliers {
        for (recipient, value) in top_flows_for(records, supplier, year, k) {
            let target = *index.entry(recipient.clone()).or_insert_with(|| {
                graph.nodes.push(GraphNode {
                    id: recipient.clone(),
                    role: Role::Recipient,
                });
                graph.nodes.len() - 1
            });
            graph.edges.push(GraphEdge {
                source: index[supplier],
                target,
                weight: value,
            });
        }
    }

    log::debug!(
        "trade graph for {year}: {} nodes, {} edges",
        graph.nodes.len(),
        graph.edges.len()
    );
    graph
}

/// A supplier's top-`k` recipients by value for one year, positive values
/// only, stable alphabetical tie-break.
fn top_flows_for(
    records: &[TradeRecord],
    supplier: &str,
    year: u16,
    k: usize,
) -> Vec<(String, f64)> {
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    for record in records {
        if record.supplier == supplier && record.year == year && record.value > 0.0 {
            *totals.entry(record.recipient.as_str()).or_default() += record.value;
        }
    }
    let mut flows: Vec<(String, f64)> = totals
        .into_iter()
        .map(|(name, value)| (name.to_owned(), value))
        .collect();
    flows.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    flows.truncate(k);
    flows
}

/// Top `n` recipients by aggregate value over all years, alphabetical
/// tie-break, deterministic regardless of input order.
pub fn top_recipients(records: &[TradeRecord], n: usize) -> Vec<String> {
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    for record in records {
        if record.value > 0.0 {
            *totals.entry(record.recipient.as_str()).or_default() += record.value;
        }
    }
    let mut ranked: Vec<(&str, f64)> = totals.into_iter().collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(b.0))
    });
    ranked.truncate(n);
    ranked.into_iter().map(|(name, _)| name.to_owned()).collect()
}

/// Square flow matrix between every country touched by a supplier's top-`k`
/// flows for `year`. The three major suppliers are always present so the
/// chord view keeps a stable frame. Returns country names (sorted) and the
/// matrix in that order.
pub fn flow_matrix(records: &[TradeRecord], year: u16, k: usize) -> (Vec<String>, Vec<Vec<f64>>) {
    let mut countries: BTreeSet<String> =
        ["United States", "China", "Russia"].iter().map(|s| s.to_string()).collect();
    let mut pairs: Vec<(String, String, f64)> = Vec::new();

    let mut suppliers: Vec<&str> = records.iter().map(|r| r.supplier.as_str()).collect();
    suppliers.sort_unstable();
    suppliers.dedup();
    for supplier in suppliers {
        for (recipient, value) in top_flows_for(records, supplier, year, k) {
            countries.insert(supplier.to_owned());
            countries.insert(recipient.clone());
            pairs.push((supplier.to_owned(), recipient, value));
        }
    }

    let names: Vec<String> = countries.into_iter().collect();
    let index: BTreeMap<&str, usize> = names
        .iter()
        .enumerate()
        .map(|(i, n)| (n.as_str(), i))
        .collect();
    let mut matrix = vec![vec![0.0; names.len()]; names.len()];
    for (supplier, recipient, value) in pairs {
        matrix[index[supplier.as_str()]][index[recipient.as_str()]] = value;
    }
    (names, matrix)
}

/// Per-entity year series, ordered by total value descending then name.
pub fn year_series<'a>(
    records: &'a [TradeRecord],
    key: impl Fn(&'a TradeRecord) -> &'a str,
) -> Vec<(String, Vec<(u16, f64)>)> {
    let mut by_entity: BTreeMap<&str, BTreeMap<u16, f64>> = BTreeMap::new();
    for record in records {
        *by_entity
            .entry(key(record))
            .or_default()
            .entry(record.year)
            .or_default() += record.value;
    }
    let mut series: Vec<(String, Vec<(u16, f64)>)> = by_entity
        .into_iter()
        .map(|(name, years)| (name.to_owned(), years.into_iter().collect()))
        .collect();
    series.sort_by(|a, b| {
        let ta: f64 = a.1.iter().map(|(_, v)| v).sum();
        let tb: f64 = b.1.iter().map(|(_, v)| v).sum();
        tb.partial_cmp(&ta)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    series
}

/// World regions used by the symbol map's aggregate mode.
pub const REGIONS: [&str; 5] = ["Africa", "Americas", "Asia & Oceania", "Europe", "Middle East"];

const REGION_TABLE: &[(&str, &str)] = &[
    ("Algeria", "Africa"),
    ("Egypt", "Africa"),
    ("Ethiopia", "Africa"),
    ("Ivory Coast", "Africa"),
    ("Morocco", "Africa"),
    ("Nigeria", "Africa"),
    ("Republic of the Congo", "Africa"),
    ("South Africa", "Africa"),
    ("Argentina", "Americas"),
    ("Brazil", "Americas"),
    ("Canada", "Americas"),
    ("Chile", "Americas"),
    ("Mexico", "Americas"),
    ("United States", "Americas"),
    ("Australia", "Asia & Oceania"),
    ("China", "Asia & Oceania"),
    ("India", "Asia & Oceania"),
    ("Indonesia", "Asia & Oceania"),
    ("Japan", "Asia & Oceania"),
    ("Pakistan", "Asia & Oceania"),
    ("South Korea", "Asia & Oceania"),
    ("Vietnam", "Asia & Oceania"),
    ("France", "Europe"),
    ("Germany", "Europe"),
    ("Italy", "Europe"),
    ("Netherlands", "Europe"),
    ("Poland", "Europe"),
    ("Russia", "Europe"),
    ("Spain", "Europe"),
    ("Sweden", "Europe"),
    ("Ukraine", "Europe"),
    ("United Kingdom", "Europe"),
    ("Iran", "Middle East"),
    ("Iraq", "Middle East"),
    ("Israel", "Middle East"),
    ("Qatar", "Middle East"),
    ("Saudi Arabia", "Middle East"),
    ("Turkey", "Middle East"),
    ("United Arab Emirates", "Middle East"),
];

/// Region a canonical country name belongs to, `None` for names outside
/// the table (they stay out of regional aggregates).
pub fn region_of(country: &str) -> Option<&'static str> {
    REGION_TABLE
        .iter()
        .find(|(name, _)| *name == country)
        .map(|(_, region)| *region)
}

/// One legend row: label plus its share of the group total.
#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub label: String,
    pub value: f64,
    pub share: f64,
}

pub fn legend_entries(groups: &[(String, f64)]) -> Vec<LegendEntry> {
    let total: f64 = groups.iter().map(|(_, v)| v).sum();
    groups
        .iter()
        .map(|(label, value)| LegendEntry {
            label: label.clone(),
            value: *value,
            share: if total > 0.0 { value / total } else { 0.0 },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(values: Vec<Value>) -> Vec<serde_json::Map<String, Value>> {
        values
            .into_iter()
            .map(|v| v.as_object().unwrap().clone())
            .collect()
    }

    fn schema() -> RowSchema {
        RowSchema::new("suppliers", "recipients", "year", "quantity")
            .category("weapon description")
            .status("status")
    }

    fn record(supplier: &str, recipient: &str, year: u16, value: f64) -> TradeRecord {
        TradeRecord {
            supplier: supplier.into(),
            recipient: recipient.into(),
            year,
            value,
            category: None,
            status: None,
        }
    }

    #[test]
    fn rows_normalize_with_coercion_and_aliases() {
        let aliases = AliasIndex::with_defaults();
        let payload = rows(vec![
            json!({"suppliers": "USA", "recipients": "Cote d'Ivoire", "year": 1999, "quantity": 12, "status": "delivered"}),
            json!({"suppliers": "Russian Federation", "recipients": "India", "year": "2003", "quantity": "7.5"}),
        ]);
        let out = normalize_rows(&payload, &schema(), &aliases).unwrap();
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.records[0].supplier, "United States");
        assert_eq!(out.records[0].recipient, "Ivory Coast");
        assert_eq!(out.records[0].status.as_deref(), Some("delivered"));
        assert_eq!(out.records[1].supplier, "Russia");
        assert_eq!(out.records[1].value, 7.5);
        // India is not in the default canonical set, so it is flagged.
        assert!(out.unmapped.contains("India"));
    }

    #[test]
    fn invalid_value_coerces_to_zero_and_row_is_retained() {
        let aliases = AliasIndex::with_defaults();
        let payload = rows(vec![
            json!({"suppliers": "USA", "recipients": "India", "year": 2000, "quantity": "n/a"}),
            json!({"suppliers": "USA", "recipients": "Egypt", "year": 2000, "quantity": 5}),
        ]);
        let out = normalize_rows(&payload, &schema(), &aliases).unwrap();
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.records[0].value, 0.0);
        // The zero row exists but never enters a ranking.
        assert_eq!(top_recipients(&out.records, 10), vec!["Egypt".to_string()]);
    }

    #[test]
    fn out_of_range_years_are_dropped() {
        let aliases = AliasIndex::with_defaults();
        let payload = rows(vec![
            json!({"suppliers": "USA", "recipients": "India", "year": 1200, "quantity": 3}),
            json!({"suppliers": "USA", "recipients": "India", "year": 1980, "quantity": 3}),
        ]);
        let out = normalize_rows(&payload, &schema(), &aliases).unwrap();
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].year, 1980);
        assert!(out
            .records
            .iter()
            .all(|r| (YEAR_MIN..=YEAR_MAX).contains(&r.year) && r.value >= 0.0));
    }

    #[test]
    fn structurally_absent_payload_is_a_shape_error() {
        let aliases = AliasIndex::with_defaults();
        assert!(matches!(
            normalize_rows(&[], &schema(), &aliases),
            Err(DataError::Shape { .. })
        ));
        let payload = rows(vec![json!({"suppliers": "USA", "year": 2000})]);
        assert!(matches!(
            normalize_rows(&payload, &schema(), &aliases),
            Err(DataError::Shape { .. })
        ));
    }

    #[test]
    fn alias_resolution_is_idempotent() {
        let aliases = AliasIndex::with_defaults();
        let once = aliases.resolve("USA");
        assert_eq!(once, "United States");
        assert_eq!(aliases.resolve(once), "United States");
    }

    #[test]
    fn graph_keeps_suppliers_without_edges() {
        let records = vec![
            record("United States", "India", 2000, 5.0),
            record("Russia", "India", 2001, 9.0),
            record("China", "Egypt", 2001, 0.0),
        ];
        // 2014 has no qualifying flows at all.
        let graph = trade_graph(&records, 2014, TOP_RECIPIENTS_PER_SUPPLIER);
        assert_eq!(graph.nodes.len(), 3);
        assert!(graph.edges.is_empty());
        assert!(graph.nodes.iter().all(|n| n.role == Role::Supplier));
        assert_eq!(graph.max_weight(), 0.0);
    }

    #[test]
    fn graph_takes_top_k_with_alphabetical_ties() {
        let records = vec![
            record("United States", "Chile", 2000, 2.0),
            record("United States", "Brazil", 2000, 2.0),
            record("United States", "Angola", 2000, 1.0),
        ];
        let graph = trade_graph(&records, 2000, 2);
        let recipients: Vec<&str> = graph
            .edges
            .iter()
            .map(|e| graph.nodes[e.target].id.as_str())
            .collect();
        assert_eq!(recipients, vec!["Brazil", "Chile"]);
    }

    #[test]
    fn top_recipients_is_order_independent() {
        let forward = vec![
            record("United States", "Alpha", 2000, 3.0),
            record("United States", "Beta", 2001, 3.0),
            record("United States", "Gamma", 2002, 9.0),
        ];
        let mut reversed = forward.clone();
        reversed.reverse();
        assert_eq!(top_recipients(&forward, 2), top_recipients(&reversed, 2));
        assert_eq!(top_recipients(&forward, 2), vec!["Gamma", "Alpha"]);
    }

    #[test]
    fn hierarchy_groups_and_sums() {
        let mut records = vec![
            record("United States", "India", 2000, 5.0),
            record("United States", "India", 2000, 3.0),
            record("Russia", "Egypt", 2000, 4.0),
            record("Russia", "Egypt", 2001, 100.0),
        ];
        records[0].category = Some("Aircraft".into());
        records[1].category = Some("Ships".into());
        records[2].category = Some("Aircraft".into());
        records[3].category = Some("Aircraft".into());

        let root = hierarchy_by(
            "root",
            &records,
            Some(2000),
            |r| Some(r.supplier.as_str()),
            |r| r.category.as_deref(),
        );
        assert_eq!(root.value, 12.0);
        assert_eq!(root.children.len(), 2);
        // Children sorted by value descending.
        assert_eq!(root.children[0].name, "United States");
        assert_eq!(root.children[0].value, 8.0);
        assert_eq!(root.children[0].depth, 1);
        assert_eq!(root.children[0].children[0].depth, 2);
    }

    #[test]
    fn flow_matrix_always_frames_major_suppliers() {
        let records = vec![record("United States", "India", 2000, 5.0)];
        let (names, matrix) = flow_matrix(&records, 2000, 5);
        for major in ["United States", "China", "Russia"] {
            assert!(names.iter().any(|n| n == major));
        }
        let us = names.iter().position(|n| n == "United States").unwrap();
        let india = names.iter().position(|n| n == "India").unwrap();
        assert_eq!(matrix[us][india], 5.0);
    }

    #[test]
    fn regions_cover_the_major_suppliers() {
        assert_eq!(region_of("United States"), Some("Americas"));
        assert_eq!(region_of("Russia"), Some("Europe"));
        assert_eq!(region_of("China"), Some("Asia & Oceania"));
        assert_eq!(region_of("Atlantis"), None);
        assert!(REGION_TABLE
            .iter()
            .all(|(_, region)| REGIONS.contains(region)));
    }

    #[test]
    fn category_hierarchy_prunes_zero_years() {
        let json = r#"{
            "United States": {"Aircraft": {"2000": 10, "2001": 0}},
            "Russia": {"Ships": {"2001": 4}}
        }"#;
        let RawPayload::Categories(table) = RawPayload::categories_from_json(json).unwrap()
        else {
            unreachable!()
        };
        let root = category_hierarchy(&table, 2000);
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].name, "United States");
        let root = category_hierarchy(&table, 2001);
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].name, "Russia");
        assert_eq!(category_years(&table), vec![2000, 2001]);
    }
}

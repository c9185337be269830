//! Per-dimension scale placement for parallel-coordinate views, plus the
//! chord arc/ribbon layout. Both share the same scale-construction
//! contract: categorical dimensions get evenly spaced positions in declared
//! domain order, continuous dimensions get a linear scale over the observed
//! extent.

use egui::{pos2, Pos2, Rect};

use crate::scale::{BandScale, LinearScale};

/// Angular gap between chord groups, in radians.
pub const CHORD_PAD_ANGLE: f32 = 0.05;

/// One cell of a record row, as extracted for the axis engine.
#[derive(Debug, Clone, PartialEq)]
pub enum DimValue {
    Name(String),
    Number(f64),
}

#[derive(Debug, Clone)]
pub enum DimensionKind {
    /// Declared domain; positions follow this order, not the data order.
    Categorical(Vec<String>),
    Continuous,
}

#[derive(Debug, Clone)]
pub struct Dimension {
    pub label: String,
    pub kind: DimensionKind,
}

impl Dimension {
    pub fn categorical(label: impl Into<String>, domain: Vec<String>) -> Self {
        Self {
            label: label.into(),
            kind: DimensionKind::Categorical(domain),
        }
    }

    pub fn continuous(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            kind: DimensionKind::Continuous,
        }
    }
}

#[derive(Debug, Clone)]
pub enum AxisScale {
    Band(BandScale),
    Linear(LinearScale),
}

impl AxisScale {
    fn map(&self, value: &DimValue) -> Option<f32> {
        match (self, value) {
            (AxisScale::Band(scale), DimValue::Name(name)) => scale.map(name),
            (AxisScale::Linear(scale), DimValue::Number(v)) => Some(scale.map(*v)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlacedDimension {
    pub label: String,
    pub x: f32,
    pub scale: AxisScale,
}

impl PlacedDimension {
    /// Tick positions and labels for drawing the axis.
    pub fn ticks(&self) -> Vec<(f32, String)> {
        match &self.scale {
            AxisScale::Band(scale) => scale
                .domain()
                .iter()
                .enumerate()
                .map(|(i, name)| (scale.position(i), name.clone()))
                .collect(),
            AxisScale::Linear(scale) => scale
                .ticks(5)
                .into_iter()
                .map(|v| (scale.map(v), format_tick(v)))
                .collect(),
        }
    }
}

fn format_tick(v: f64) -> String {
    if v.abs() >= 1_000_000.0 {
        format!("{:.1}M", v / 1_000_000.0)
    } else if v.abs() >= 1_000.0 {
        format!("{:.1}K", v / 1_000.0)
    } else if v.fract() == 0.0 {
        format!("{v}")
    } else {
        format!("{v:.1}")
    }
}

/// The placed dimensions of a parallel-coordinate view.
#[derive(Debug, Clone)]
pub struct AxisLayout {
    pub dims: Vec<PlacedDimension>,
}

/// Place one scale per dimension inside `rect`. Continuous extents are
/// observed from `rows`; the y range runs bottom-up so larger values sit
/// higher.
pub fn axis_layout(dimensions: &[Dimension], rows: &[Vec<DimValue>], rect: Rect) -> AxisLayout {
    let x_positions = BandScale::new(
        dimensions.iter().map(|d| d.label.clone()).collect(),
        (rect.left(), rect.right()),
    );
    let y_range = (rect.bottom(), rect.top());

    let dims = dimensions
        .iter()
        .enumerate()
        .map(|(i, dim)| {
            let scale = match &dim.kind {
                DimensionKind::Categorical(domain) => {
                    AxisScale::Band(BandScale::new(domain.clone(), y_range))
                }
                DimensionKind::Continuous => {
                    let mut lo = f64::INFINITY;
                    let mut hi = f64::NEG_INFINITY;
                    for row in rows {
                        if let Some(DimValue::Number(v)) = row.get(i) {
                            lo = lo.min(*v);
                            hi = hi.max(*v);
                        }
                    }
                    if lo > hi {
                        (lo, hi) = (0.0, 0.0);
                    }
                    AxisScale::Linear(LinearScale::new((lo, hi), y_range))
                }
            };
            PlacedDimension {
                label: dim.label.clone(),
                x: x_positions.position(i),
                scale,
            }
        })
        .collect();

    AxisLayout { dims }
}

impl AxisLayout {
    /// Polyline visiting each dimension's x at the row's mapped y. `None`
    /// when any cell fails to map (e.g. a name outside a declared domain).
    pub fn polyline(&self, row: &[DimValue]) -> Option<Vec<Pos2>> {
        self.dims
            .iter()
            .enumerate()
            .map(|(i, dim)| {
                let y = dim.scale.map(row.get(i)?)?;
                Some(pos2(dim.x, y))
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Chord layout

/// An arc span on the chord circle, in radians from twelve o'clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcSpan {
    pub index: usize,
    pub start: f32,
    pub end: f32,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChordRibbon {
    pub source: ArcSpan,
    pub target: ArcSpan,
    pub value: f64,
}

#[derive(Debug, Clone, Default)]
pub struct ChordLayout {
    pub groups: Vec<ArcSpan>,
    pub ribbons: Vec<ChordRibbon>,
}

/// Group arcs with spans proportional to row sums, subgroups within each
/// group sorted descending, and one ribbon per non-empty country pair with
/// the larger flow as the source.
pub fn chord_layout(matrix: &[Vec<f64>], pad_angle: f32) -> ChordLayout {
    let n = matrix.len();
    if n == 0 {
        return ChordLayout::default();
    }
    let row_sums: Vec<f64> = matrix.iter().map(|row| row.iter().sum()).collect();
    let total: f64 = row_sums.iter().sum();
    if total <= 0.0 {
        return ChordLayout::default();
    }
    let k = (std::f64::consts::TAU - (pad_angle as f64) * n as f64).max(0.0) / total;

    // subgroup span for the flow group_i → group_j, laid on group_i's arc.
    let mut subgroups: Vec<Option<ArcSpan>> = vec![None; n * n];
    let mut groups = Vec::with_capacity(n);

    let mut x = 0.0f64;
    for i in 0..n {
        let x0 = x;
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| {
            matrix[i][b]
                .partial_cmp(&matrix[i][a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        for j in order {
            let v = matrix[i][j];
            let a0 = x;
            x += v * k;
            subgroups[i * n + j] = Some(ArcSpan {
                index: i,
                start: a0 as f32,
                end: x as f32,
                value: v,
            });
        }
        groups.push(ArcSpan {
            index: i,
            start: x0 as f32,
            end: x as f32,
            value: row_sums[i],
        });
        x += pad_angle as f64;
    }

    let mut ribbons = Vec::new();
    for i in 0..n {
        for j in i..n {
            let (Some(forward), Some(back)) = (subgroups[i * n + j], subgroups[j * n + i]) else {
                continue;
            };
            if forward.value <= 0.0 && back.value <= 0.0 {
                continue;
            }
            let (source, target) = if forward.value >= back.value {
                (forward, back)
            } else {
                (back, forward)
            };
            ribbons.push(ChordRibbon {
                source,
                target,
                value: source.value,
            });
        }
    }

    ChordLayout { groups, ribbons }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims() -> Vec<Dimension> {
        vec![
            Dimension::categorical(
                "supplier",
                vec!["United States".into(), "Russia".into()],
            ),
            Dimension::continuous("year"),
            Dimension::continuous("value"),
        ]
    }

    fn rows() -> Vec<Vec<DimValue>> {
        vec![
            vec![
                DimValue::Name("United States".into()),
                DimValue::Number(2000.0),
                DimValue::Number(10.0),
            ],
            vec![
                DimValue::Name("Russia".into()),
                DimValue::Number(2010.0),
                DimValue::Number(40.0),
            ],
        ]
    }

    fn frame() -> Rect {
        Rect::from_min_max(pos2(0.0, 0.0), pos2(300.0, 200.0))
    }

    #[test]
    fn dimensions_spread_across_the_width() {
        let layout = axis_layout(&dims(), &rows(), frame());
        assert_eq!(layout.dims[0].x, 0.0);
        assert_eq!(layout.dims[1].x, 150.0);
        assert_eq!(layout.dims[2].x, 300.0);
    }

    #[test]
    fn polyline_visits_each_axis_bottom_up() {
        let layout = axis_layout(&dims(), &rows(), frame());
        let line = layout.polyline(&rows()[1]).unwrap();
        assert_eq!(line.len(), 3);
        // Russia is second in the declared domain: top of the band axis.
        assert_eq!(line[0], pos2(0.0, 0.0));
        // Max year and max value map to the top of their linear axes.
        assert_eq!(line[1].y, 0.0);
        assert_eq!(line[2].y, 0.0);
        let low = layout.polyline(&rows()[0]).unwrap();
        assert_eq!(low[1].y, 200.0);
    }

    #[test]
    fn unknown_categorical_value_yields_no_polyline() {
        let layout = axis_layout(&dims(), &rows(), frame());
        let row = vec![
            DimValue::Name("Atlantis".into()),
            DimValue::Number(2000.0),
            DimValue::Number(1.0),
        ];
        assert!(layout.polyline(&row).is_none());
    }

    #[test]
    fn chord_groups_fill_the_circle_minus_padding() {
        let matrix = vec![
            vec![0.0, 10.0, 5.0],
            vec![2.0, 0.0, 3.0],
            vec![0.0, 0.0, 0.0],
        ];
        let layout = chord_layout(&matrix, CHORD_PAD_ANGLE);
        let spans: f32 = layout.groups.iter().map(|g| g.end - g.start).sum();
        let expected = std::f32::consts::TAU - CHORD_PAD_ANGLE * 3.0;
        assert!((spans - expected).abs() < 1e-3);
        // Group spans are proportional to row sums.
        let g0 = layout.groups[0].end - layout.groups[0].start;
        let g1 = layout.groups[1].end - layout.groups[1].start;
        assert!((g0 / g1 - 3.0).abs() < 1e-3);
    }

    #[test]
    fn ribbon_source_is_the_larger_flow() {
        let matrix = vec![vec![0.0, 2.0], vec![9.0, 0.0]];
        let layout = chord_layout(&matrix, 0.05);
        assert_eq!(layout.ribbons.len(), 1);
        let ribbon = &layout.ribbons[0];
        assert_eq!(ribbon.source.index, 1);
        assert_eq!(ribbon.target.index, 0);
        assert_eq!(ribbon.value, 9.0);
    }

    #[test]
    fn empty_matrix_yields_empty_layout() {
        assert!(chord_layout(&[], 0.05).groups.is_empty());
        let zeros = vec![vec![0.0; 2]; 2];
        assert!(chord_layout(&zeros, 0.05).groups.is_empty());
    }

    #[test]
    fn subgroups_within_a_group_are_descending() {
        let matrix = vec![
            vec![0.0, 1.0, 8.0, 3.0],
            vec![0.0; 4],
            vec![0.0; 4],
            vec![0.0; 4],
        ];
        let layout = chord_layout(&matrix, 0.0);
        // Ribbons from group 0, ordered by start angle, should descend in value.
        let mut from_zero: Vec<&ChordRibbon> = layout
            .ribbons
            .iter()
            .filter(|r| r.source.index == 0 && r.value > 0.0)
            .collect();
        from_zero.sort_by(|a, b| a.source.start.partial_cmp(&b.source.start).unwrap());
        let values: Vec<f64> = from_zero.iter().map(|r| r.value).collect();
        assert_eq!(values, vec![8.0, 3.0, 1.0]);
    }
}

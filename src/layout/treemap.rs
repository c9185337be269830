//! Squarified treemap subdivision.
//!
//! The plane is recursively subdivided into rectangles whose areas are
//! proportional to subtree value. Rows are packed greedily along the
//! shorter side, accepting an item while it does not worsen the row's
//! worst aspect ratio, which keeps tiles close to square.

use egui::{pos2, Rect};

use crate::data::HierarchyNode;

/// Gap between sibling rectangles in output pixels.
pub const TREEMAP_PADDING: f32 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub struct TreemapRect {
    pub id: usize,
    pub parent: Option<usize>,
    pub name: String,
    pub depth: usize,
    pub value: f64,
    pub rect: Rect,
    pub leaf: bool,
}

/// Subdivide `rect` by `root`, flattened in depth-first order with the root
/// at index 0.
pub fn treemap(root: &HierarchyNode, rect: Rect, padding: f32) -> Vec<TreemapRect> {
    let mut out = Vec::new();
    subdivide(root, rect, None, padding, &mut out);
    tracing::debug!(tiles = out.len(), "treemap layout");
    out
}

fn subdivide(
    node: &HierarchyNode,
    rect: Rect,
    parent: Option<usize>,
    padding: f32,
    out: &mut Vec<TreemapRect>,
) {
    let id = out.len();
    out.push(TreemapRect {
        id,
        parent,
        name: node.name.clone(),
        depth: node.depth,
        value: node.value,
        rect,
        leaf: node.is_leaf(),
    });

    if node.is_leaf() || node.value <= 0.0 {
        return;
    }

    let inner = rect.shrink(padding.min(rect.width() / 2.0).min(rect.height() / 2.0));
    if !inner.is_positive() {
        return;
    }

    let values: Vec<f64> = node.children.iter().map(|c| c.value.max(0.0)).collect();
    let cells = squarify(
        &values,
        inner.left() as f64,
        inner.top() as f64,
        inner.width() as f64,
        inner.height() as f64,
    );
    for (child, cell) in node.children.iter().zip(cells) {
        let child_rect = Rect::from_min_max(
            pos2(cell.x as f32, cell.y as f32),
            pos2((cell.x + cell.w) as f32, (cell.y + cell.h) as f32),
        )
        .shrink(padding / 2.0);
        if child_rect.is_positive() {
            subdivide(child, child_rect, Some(id), padding, out);
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Cell {
    x: f64,
    y: f64,
    w: f64,
    h: f64,
}

/// Exact squarified partition of the `(x, y, w, h)` rectangle into one cell
/// per value, in input order. Zero-valued entries get empty cells.
fn squarify(values: &[f64], x: f64, y: f64, w: f64, h: f64) -> Vec<Cell> {
    let mut cells = vec![Cell::default(); values.len()];
    let total: f64 = values.iter().sum();
    if total <= 0.0 || w <= 0.0 || h <= 0.0 {
        return cells;
    }
    let scale = w * h / total;

    // Work on indices ordered by value descending so rows stay square-ish;
    // output cells keep the caller's order.
    let mut order: Vec<usize> = (0..values.len()).filter(|&i| values[i] > 0.0).collect();
    order.sort_by(|&a, &b| {
        values[b]
            .partial_cmp(&values[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let (mut fx, mut fy, mut fw, mut fh) = (x, y, w, h);
    let mut row: Vec<usize> = Vec::new();
    let mut row_sum = 0.0;

    let mut i = 0;
    while i < order.len() {
        let idx = order[i];
        let area = values[idx] * scale;
        let side = fw.min(fh);

        if row.is_empty()
            || worst_ratio(row_sum + area, min_max_area(&row, values, scale, area), side)
                <= worst_ratio(row_sum, min_max_area(&row, values, scale, 0.0), side)
        {
            row.push(idx);
            row_sum += area;
            i += 1;
        } else {
            lay_row(&row, values, scale, row_sum, &mut fx, &mut fy, &mut fw, &mut fh, &mut cells);
            row.clear();
            row_sum = 0.0;
        }
    }
    if !row.is_empty() {
        lay_row(&row, values, scale, row_sum, &mut fx, &mut fy, &mut fw, &mut fh, &mut cells);
    }
    cells
}

/// (min, max) cell area in the current row, optionally with a candidate.
fn min_max_area(row: &[usize], values: &[f64], scale: f64, candidate: f64) -> (f64, f64) {
    let mut min = if candidate > 0.0 { candidate } else { f64::INFINITY };
    let mut max = candidate;
    for &i in row {
        let a = values[i] * scale;
        min = min.min(a);
        max = max.max(a);
    }
    (min, max)
}

/// Worst aspect ratio a row of `sum` total area would have along `side`.
fn worst_ratio(sum: f64, (min, max): (f64, f64), side: f64) -> f64 {
    if sum <= 0.0 || min <= 0.0 || !min.is_finite() {
        return f64::INFINITY;
    }
    let s2 = sum * sum;
    let w2 = side * side;
    (w2 * max / s2).max(s2 / (w2 * min))
}

#[allow(clippy::too_many_arguments)]
fn lay_row(
    row: &[usize],
    values: &[f64],
    scale: f64,
    row_sum: f64,
    fx: &mut f64,
    fy: &mut f64,
    fw: &mut f64,
    fh: &mut f64,
    cells: &mut [Cell],
) {
    if row_sum <= 0.0 {
        return;
    }
    if *fw >= *fh {
        // Vertical strip on the left.
        let strip_w = row_sum / *fh;
        let mut cy = *fy;
        for &i in row {
            let cell_h = values[i] * scale / strip_w;
            cells[i] = Cell {
                x: *fx,
                y: cy,
                w: strip_w,
                h: cell_h,
            };
            cy += cell_h;
        }
        *fx += strip_w;
        *fw -= strip_w;
    } else {
        // Horizontal strip on top.
        let strip_h = row_sum / *fw;
        let mut cx = *fx;
        for &i in row {
            let cell_w = values[i] * scale / strip_h;
            cells[i] = Cell {
                x: cx,
                y: *fy,
                w: cell_w,
                h: strip_h,
            };
            cx += cell_w;
        }
        *fy += strip_h;
        *fh -= strip_h;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_tree(values: &[f64]) -> HierarchyNode {
        HierarchyNode::branch(
            "root",
            values
                .iter()
                .enumerate()
                .map(|(i, &v)| HierarchyNode::leaf(format!("leaf-{i}"), v))
                .collect(),
        )
    }

    fn frame() -> Rect {
        Rect::from_min_max(pos2(0.0, 0.0), pos2(900.0, 600.0))
    }

    #[test]
    fn zero_padding_partitions_the_frame_exactly() {
        let tiles = treemap(&flat_tree(&[6.0, 3.0, 2.0, 1.0]), frame(), 0.0);
        let leaf_area: f32 = tiles
            .iter()
            .filter(|t| t.leaf)
            .map(|t| t.rect.area())
            .sum();
        assert!((leaf_area - frame().area()).abs() < 1.0);
    }

    #[test]
    fn areas_are_value_proportional() {
        let tiles = treemap(&flat_tree(&[8.0, 2.0]), frame(), 0.0);
        let big = tiles.iter().find(|t| t.value == 8.0).unwrap();
        let small = tiles.iter().find(|t| t.value == 2.0).unwrap();
        assert!((big.rect.area() / small.rect.area() - 4.0).abs() < 0.01);
    }

    #[test]
    fn tiles_never_overlap() {
        let tiles = treemap(&flat_tree(&[5.0, 5.0, 4.0, 3.0, 2.0, 1.0, 1.0]), frame(), 2.0);
        let leaves: Vec<&TreemapRect> = tiles.iter().filter(|t| t.leaf).collect();
        for (i, a) in leaves.iter().enumerate() {
            for b in &leaves[i + 1..] {
                let overlap = a.rect.intersect(b.rect);
                assert!(
                    !overlap.is_positive(),
                    "{} overlaps {}",
                    a.name,
                    b.name
                );
            }
        }
    }

    #[test]
    fn children_stay_inside_their_parent() {
        let tree = HierarchyNode::branch(
            "root",
            vec![
                HierarchyNode::branch(
                    "United States",
                    vec![
                        HierarchyNode::leaf("Lockheed", 60.0),
                        HierarchyNode::leaf("Boeing", 33.0),
                    ],
                ),
                HierarchyNode::branch("Russia", vec![HierarchyNode::leaf("Almaz", 20.0)]),
            ],
        );
        let tiles = treemap(&tree, frame(), 2.0);
        for tile in &tiles {
            let Some(p) = tile.parent else { continue };
            let parent_rect = tiles[p].rect;
            assert!(
                parent_rect.contains_rect(tile.rect),
                "{} escapes {}",
                tile.name,
                tiles[p].name
            );
        }
    }

    #[test]
    fn aspect_ratios_stay_reasonable() {
        let tiles = treemap(&flat_tree(&[10.0, 9.0, 8.0, 7.0, 6.0, 5.0]), frame(), 0.0);
        for tile in tiles.iter().filter(|t| t.leaf) {
            let ratio = (tile.rect.width() / tile.rect.height()).max(
                tile.rect.height() / tile.rect.width(),
            );
            assert!(ratio < 4.0, "{} has ratio {ratio}", tile.name);
        }
    }

    #[test]
    fn zero_valued_children_get_no_space() {
        let tiles = treemap(&flat_tree(&[5.0, 0.0]), frame(), 0.0);
        // The zero leaf is skipped entirely (its cell would be empty).
        assert_eq!(tiles.iter().filter(|t| t.leaf).count(), 1);
    }
}

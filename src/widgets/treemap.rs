//! Squarified treemap of a two-level hierarchy, colored by top-level group.

use eframe::egui::{self, Align2, Pos2, Sense, Stroke, TextStyle, Ui, Vec2, Widget};

use crate::layout::treemap::TreemapRect;
use crate::scale::CategoricalColor;
use crate::themes::{ChartStyle, Styled};
use crate::widgets;
use crate::{TooltipHandle, TooltipLine};

#[must_use = "You should put this widget in a ui with `ui.add(widget);`"]
pub struct TreemapChart<'a> {
    tiles: &'a [TreemapRect],
    year: u16,
    tooltip: &'a TooltipHandle,
    desired_height: Option<f32>,
    chart_style: Option<ChartStyle>,
}

impl<'a> TreemapChart<'a> {
    pub fn new(tiles: &'a [TreemapRect], year: u16, tooltip: &'a TooltipHandle) -> Self {
        Self {
            tiles,
            year,
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

impl Styled for TreemapChart<'_> {
    type Style = ChartStyle;

    fn set_style(&mut self, style: Option<Self::Style>) {
        self.chart_style = style;
    }
}

impl Widget for TreemapChart<'_> {
    fn ui(self, ui: &mut Ui) -> egui::Response {
        let Self {
            tiles,
            year,
            tooltip,
            desired_height,
            chart_style,
        } = self;

        let style = chart_style.unwrap_or_else(|| ChartStyle::from(ui.style().as_ref()));
        let width = ui.available_width().max(320.0);
        let height = desired_height.unwrap_or(width * 0.66);
        let (rect, response, painter) = widgets::canvas(ui, Vec2::new(width, height), Sense::hover());
        if !ui.is_rect_visible(rect) {
            return response;
        }

        let leaves: Vec<&TreemapRect> = tiles.iter().filter(|t| t.leaf && t.value > 0.0).collect();
        if leaves.is_empty() {
            widgets::no_data_placeholder(ui, &painter, rect);
            return response;
        }

        // Layout space is the root tile; scale it onto this canvas.
        let frame = tiles[0].rect;
        let sx = rect.width() / frame.width();
        let sy = rect.height() / frame.height();
        let to_screen = |p: Pos2| {
            Pos2::new(
                rect.left() + (p.x - frame.left()) * sx,
                rect.top() + (p.y - frame.top()) * sy,
            )
        };

        let colors = CategoricalColor::new(
            tiles.iter().filter(|t| t.depth == 1).map(|t| t.name.clone()),
        );
        let total: f64 = leaves.iter().map(|t| t.value).sum();
        let pointer = ui.input(|i| i.pointer.hover_pos()).filter(|p| rect.contains(*p));
        let mut hovered: Option<&TreemapRect> = None;

        let label_font = TextStyle::Small.resolve(ui.style());
        for tile in &leaves {
            let screen =
                egui::Rect::from_min_max(to_screen(tile.rect.min), to_screen(tile.rect.max));
            let group = group_name(tiles, tile);
            let is_hovered = pointer.is_some_and(|p| screen.contains(p));
            if is_hovered {
                hovered = Some(tile);
            }
            let fill = colors.map(group).gamma_multiply(if is_hovered { 1.0 } else { 0.85 });
            painter.rect_filled(screen, 0.0, fill);
            painter.rect_stroke(
                screen,
                0.0,
                Stroke::new(if is_hovered { 2.0 } else { 1.0 }, style.ink.gamma_multiply(0.5)),
                egui::StrokeKind::Inside,
            );
            if screen.width() > 48.0 && screen.height() > 18.0 {
                let clipped = painter.with_clip_rect(screen.shrink(3.0));
                clipped.text(
                    screen.left_top() + Vec2::new(4.0, 4.0),
                    Align2::LEFT_TOP,
                    &tile.name,
                    label_font.clone(),
                    style.ink,
                );
            }
        }

        if let (Some(tile), Some(p)) = (hovered, pointer) {
            let share = if total > 0.0 {
                tile.value / total * 100.0
            } else {
                0.0
            };
            let lines = vec![
                TooltipLine::title(tile.name.clone()),
                TooltipLine::row("Group", group_name(tiles, tile).to_owned()),
                TooltipLine::row("Year", year.to_string()),
                TooltipLine::row(
                    "Value",
                    format!("{:.0} ({share:.2}%)", tile.value),
                ),
            ];
            tooltip.show(ui.ctx(), rect, p, &lines);
        }

        response
    }
}

/// Name of the depth-1 ancestor a tile belongs to.
fn group_name<'a>(tiles: &'a [TreemapRect], tile: &'a TreemapRect) -> &'a str {
    let mut current = tile;
    while current.depth > 1 {
        let Some(parent) = current.parent else {
            break;
        };
        current = &tiles[parent];
    }
    &current.name
}

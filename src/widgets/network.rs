//! Force-directed supplier/recipient network.
//!
//! The widget owns the per-frame loop: it advances the simulation one tick
//! per painted frame while active and requests a repaint until the layout
//! settles. Dragging a node pins it and re-heats the simulation; physics
//! stays in the layout engine.

use eframe::egui::{self, Align2, Pos2, Sense, Stroke, TextStyle, Ui, Vec2, Widget};

use crate::data::{Role, TradeGraph};
use crate::geo::ViewTransform;
use crate::interact::DragState;
use crate::layout::force::Simulation;
use crate::scale::SqrtScale;
use crate::themes::{self, ChartStyle, Styled};
use crate::widgets;
use crate::{TooltipHandle, TooltipLine};

const NODE_RADIUS_RANGE: (f32, f32) = (5.0, 20.0);
const EDGE_STROKE_RANGE: (f32, f32) = (0.5, 3.0);
const ZOOM_LIMITS: (f32, f32) = (0.5, 5.0);

/// View state owned by the mounting panel. `reset` drops the simulation so
/// the next frame rebuilds it from the current graph.
#[derive(Debug, Default)]
pub struct NetworkState {
    pub transform: ViewTransform,
    pub drag: DragState,
    pub hovered: Option<usize>,
    sim: Option<Simulation>,
}

impl NetworkState {
    pub fn reset(&mut self) {
        self.sim = None;
        self.drag = DragState::default();
        self.hovered = None;
    }
}

#[must_use = "You should put this widget in a ui with `ui.add(widget);`"]
pub struct NetworkGraph<'a> {
    graph: &'a TradeGraph,
    state: &'a mut NetworkState,
    tooltip: &'a TooltipHandle,
    desired_height: Option<f32>,
    chart_style: Option<ChartStyle>,
}

impl<'a> NetworkGraph<'a> {
    pub fn new(
        graph: &'a TradeGraph,
        state: &'a mut NetworkState,
        tooltip: &'a TooltipHandle,
    ) -> Self {
        Self {
            graph,
            state,
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

impl Styled for NetworkGraph<'_> {
    type Style = ChartStyle;

    fn set_style(&mut self, style: Option<Self::Style>) {
        self.chart_style = style;
    }
}

impl Widget for NetworkGraph<'_> {
    fn ui(self, ui: &mut Ui) -> egui::Response {
        let Self {
            graph,
            state,
            tooltip,
            desired_height,
            chart_style,
        } = self;

        let style = chart_style.unwrap_or_else(|| ChartStyle::from(ui.style().as_ref()));
        let width = ui.available_width().max(320.0);
        let height = desired_height.unwrap_or(width * 0.68);
        let (rect, response, painter) =
            widgets::canvas(ui, Vec2::new(width, height), Sense::click_and_drag());
        if !ui.is_rect_visible(rect) {
            return response;
        }

        if graph.nodes.is_empty() {
            widgets::no_data_placeholder(ui, &painter, rect);
            return response;
        }

        let sim = state
            .sim
            .get_or_insert_with(|| Simulation::from_graph(graph, (width / 2.0, height / 2.0)));
        if sim.tick() {
            ui.ctx().request_repaint();
        }

        let max_weight = graph.max_weight();
        let radius_scale = SqrtScale::new(max_weight, NODE_RADIUS_RANGE);
        let stroke_scale = SqrtScale::new(max_weight, EDGE_STROKE_RANGE);
        let offset = rect.min.to_vec2();
        let pointer = ui.input(|i| i.pointer.hover_pos()).filter(|p| rect.contains(*p));

        // Drag routing: a press on a node owns the gesture and pins that
        // node; anywhere else the gesture pans the view.
        if response.drag_started() {
            if let Some(p) = response.interact_pointer_pos() {
                state.drag.node = hit_node(p, sim, graph, state.transform, offset, &radius_scale);
            }
        }
        if let Some(i) = state.drag.node {
            if let Some(p) = response.interact_pointer_pos() {
                let local = state.transform.invert((p - rect.min).to_pos2());
                sim.pin(i, (local.x, local.y));
                ui.ctx().request_repaint();
            }
            if response.drag_stopped() {
                sim.unpin(i);
                state.drag.node = None;
            }
        } else {
            widgets::view_control(ui, &response, rect, &mut state.transform, ZOOM_LIMITS);
        }

        let tf = state.transform;
        let to_screen = |node: (f32, f32)| tf.apply(Pos2::new(node.0, node.1)) + offset;

        for edge in &graph.edges {
            let a = to_screen((sim.nodes()[edge.source].x, sim.nodes()[edge.source].y));
            let b = to_screen((sim.nodes()[edge.target].x, sim.nodes()[edge.target].y));
            painter.line_segment(
                [a, b],
                Stroke::new(
                    stroke_scale.map(edge.weight),
                    style.outline.gamma_multiply(0.3),
                ),
            );
        }

        state.hovered = pointer.and_then(|p| hit_node(p, sim, graph, tf, offset, &radius_scale));

        let label_font = TextStyle::Small.resolve(ui.style());
        for (i, node) in graph.nodes.iter().enumerate() {
            let center = to_screen((sim.nodes()[i].x, sim.nodes()[i].y));
            let r = radius_scale.map(graph.node_weight(i));
            let fill = match node.role {
                Role::Supplier => themes::reserved_color(&node.id).unwrap_or(style.muted),
                Role::Recipient => style.muted,
            };
            painter.circle_filled(center, r, fill);
            if state.hovered == Some(i) {
                painter.circle_stroke(center, r + 1.0, Stroke::new(1.5, style.accent));
            }
            painter.text(
                center + Vec2::new(r + 4.0, 0.0),
                Align2::LEFT_CENTER,
                &node.id,
                label_font.clone(),
                style.ink,
            );
        }

        if let (Some(i), Some(p)) = (state.hovered, pointer) {
            if state.drag.node.is_none() && !response.dragged() {
                let node = &graph.nodes[i];
                let lines = vec![
                    TooltipLine::row("Country", node.id.clone()),
                    TooltipLine::row(
                        "Type",
                        match node.role {
                            Role::Supplier => "supplier",
                            Role::Recipient => "recipient",
                        },
                    ),
                ];
                tooltip.show(ui.ctx(), rect, p, &lines);
            }
        }

        response
    }
}

/// Topmost node whose circle contains `p`, in screen space.
fn hit_node(
    p: Pos2,
    sim: &Simulation,
    graph: &TradeGraph,
    transform: ViewTransform,
    offset: Vec2,
    radius_scale: &SqrtScale,
) -> Option<usize> {
    let mut hit = None;
    for (i, node) in sim.nodes().iter().enumerate() {
        let center = transform.apply(Pos2::new(node.x, node.y)) + offset;
        let r = radius_scale.map(graph.node_weight(i));
        if (p - center).length() <= r {
            hit = Some(i);
        }
    }
    hit
}

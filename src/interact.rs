//! Interaction plumbing shared by every widget: tooltip placement, the
//! click-to-drill modal, and drag bookkeeping.

use egui::{pos2, Align2, Pos2, Rect, Vec2};

/// Offset between the cursor and the tooltip's near corner.
pub const TOOLTIP_OFFSET: f32 = 15.0;

/// Place a tooltip of `size` near `cursor`, flipping the offset direction
/// when the default placement would overflow `container`, then clamping so
/// the tooltip always lies entirely inside.
pub fn tooltip_pos(cursor: Pos2, size: Vec2, container: Rect) -> Pos2 {
    let mut x = cursor.x + TOOLTIP_OFFSET;
    if x + size.x > container.right() {
        x = cursor.x - size.x - TOOLTIP_OFFSET;
    }
    let mut y = cursor.y + TOOLTIP_OFFSET;
    if y + size.y > container.bottom() {
        y = cursor.y - size.y - TOOLTIP_OFFSET;
    }

    let max_x = (container.right() - size.x).max(container.left());
    let max_y = (container.bottom() - size.y).max(container.top());
    pos2(
        x.clamp(container.left(), max_x),
        y.clamp(container.top(), max_y),
    )
}

/// The single modal surface of a visualization. Opens with structured
/// detail content; closes on the explicit close control or a click outside
/// its bounds. The owning widget must not route clicks to the chart while
/// the modal is open, so the closing click never drills into the chart
/// underneath.
#[derive(Debug, Clone, Default)]
pub struct ModalState<T> {
    content: Option<T>,
}

impl<T> ModalState<T> {
    pub fn open(&mut self, content: T) {
        self.content = Some(content);
    }

    pub fn close(&mut self) {
        self.content = None;
    }

    pub fn is_open(&self) -> bool {
        self.content.is_some()
    }

    pub fn content(&self) -> Option<&T> {
        self.content.as_ref()
    }
}

/// Show the modal while open. Returns `true` while the modal is on screen.
pub fn modal_window<T>(
    ctx: &egui::Context,
    id: egui::Id,
    title: &str,
    state: &mut ModalState<T>,
    add_contents: impl FnOnce(&mut egui::Ui, &T),
) -> bool {
    let Some(content) = &state.content else {
        return false;
    };

    let mut open = true;
    let response = egui::Window::new(title)
        .id(id)
        .collapsible(false)
        .resizable(false)
        .anchor(Align2::CENTER_CENTER, Vec2::ZERO)
        .open(&mut open)
        .show(ctx, |ui| add_contents(ui, content));

    if let Some(response) = response {
        if response.response.clicked_elsewhere() {
            open = false;
        }
    }
    if !open {
        state.close();
    }
    true
}

/// Which node a pointer drag currently owns, if any. The physics stays with
/// the force engine; this only routes the gesture.
#[derive(Debug, Clone, Copy, Default)]
pub struct DragState {
    pub node: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::vec2;

    fn container() -> Rect {
        Rect::from_min_max(pos2(0.0, 0.0), pos2(800.0, 600.0))
    }

    #[test]
    fn default_placement_offsets_right_and_down() {
        let pos = tooltip_pos(pos2(100.0, 100.0), vec2(200.0, 80.0), container());
        assert_eq!(pos, pos2(115.0, 115.0));
    }

    #[test]
    fn placement_flips_left_near_the_right_edge() {
        let pos = tooltip_pos(pos2(750.0, 100.0), vec2(200.0, 80.0), container());
        assert_eq!(pos.x, 750.0 - 200.0 - TOOLTIP_OFFSET);
        assert_eq!(pos.y, 115.0);
    }

    #[test]
    fn placement_flips_up_near_the_bottom_edge() {
        let pos = tooltip_pos(pos2(100.0, 590.0), vec2(200.0, 80.0), container());
        assert_eq!(pos.y, 590.0 - 80.0 - TOOLTIP_OFFSET);
    }

    #[test]
    fn corner_cursor_still_fits_entirely() {
        let size = vec2(200.0, 80.0);
        for cursor in [
            pos2(0.0, 0.0),
            pos2(800.0, 0.0),
            pos2(0.0, 600.0),
            pos2(800.0, 600.0),
        ] {
            let pos = tooltip_pos(cursor, size, container());
            let rect = Rect::from_min_size(pos, size);
            assert!(container().contains_rect(rect), "overflow at {cursor:?}");
        }
    }

    #[test]
    fn modal_state_open_close() {
        let mut modal: ModalState<String> = ModalState::default();
        assert!(!modal.is_open());
        modal.open("detail".into());
        assert!(modal.is_open());
        assert_eq!(modal.content().map(String::as_str), Some("detail"));
        modal.close();
        assert!(!modal.is_open());
    }

    proptest::proptest! {
        #[test]
        fn tooltip_always_inside_container(
            cx in 0.0f32..800.0,
            cy in 0.0f32..600.0,
            w in 1.0f32..400.0,
            h in 1.0f32..300.0,
        ) {
            let pos = tooltip_pos(pos2(cx, cy), vec2(w, h), container());
            let rect = Rect::from_min_size(pos, vec2(w, h));
            proptest::prop_assert!(container().contains_rect(rect));
        }
    }
}

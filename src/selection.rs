/// Inclusive rectangle in slice pixel coordinates.
///
/// Built through [`SelectionRect::new`] or the controller it is always
/// normalized (`x0 <= x1`, `y0 <= y1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SelectionRect {
    pub x0: usize,
    pub y0: usize,
    pub x1: usize,
    pub y1: usize,
}

impl SelectionRect {
    /// Rectangle spanned by two corners, in any order.
    pub fn new(xa: usize, ya: usize, xb: usize, yb: usize) -> Self {
        Self {
            x0: xa.min(xb),
            y0: ya.min(yb),
            x1: xa.max(xb),
            y1: ya.max(yb),
        }
    }

    pub fn width(&self) -> usize {
        self.x1 - self.x0 + 1
    }

    pub fn height(&self) -> usize {
        self.y1 - self.y0 + 1
    }

    pub fn area(&self) -> usize {
        self.width() * self.height()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionState {
    #[default]
    Idle,
    Dragging {
        anchor: (usize, usize),
        rect: SelectionRect,
    },
    Finalized(SelectionRect),
}

/// Pointer-driven rectangular selection on one slice.
///
/// Pointer coordinates are slice-local and may fall outside the image while
/// dragging; the free corner is clipped to `[0, width-1] x [0, height-1]`.
#[derive(Debug, Clone, Default)]
pub struct SelectionController {
    state: SelectionState,
    bounds: (usize, usize),
}

impl SelectionController {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            state: SelectionState::Idle,
            bounds: (width, height),
        }
    }

    pub fn state(&self) -> SelectionState {
        self.state
    }

    pub fn bounds(&self) -> (usize, usize) {
        self.bounds
    }

    /// Current rectangle, while dragging or once finalized.
    pub fn rect(&self) -> Option<SelectionRect> {
        match self.state {
            SelectionState::Idle => None,
            SelectionState::Dragging { rect, .. } | SelectionState::Finalized(rect) => Some(rect),
        }
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, SelectionState::Dragging { .. })
    }

    /// Start a new selection. Ignored outside the image or while already
    /// dragging. A finalized selection is replaced.
    pub fn pointer_down(&mut self, x: i32, y: i32) -> Option<SelectionRect> {
        if self.is_dragging() || !self.inside(x, y) {
            return None;
        }
        let anchor = (x as usize, y as usize);
        let rect = SelectionRect::new(anchor.0, anchor.1, anchor.0, anchor.1);
        self.state = SelectionState::Dragging { anchor, rect };
        log::debug!("selection started at {anchor:?}");
        Some(rect)
    }

    /// Move the free corner. Returns the updated rectangle while dragging.
    pub fn pointer_move(&mut self, x: i32, y: i32) -> Option<SelectionRect> {
        let SelectionState::Dragging { anchor, .. } = self.state else {
            return None;
        };
        let (cx, cy) = self.clip(x, y)?;
        let rect = SelectionRect::new(anchor.0, anchor.1, cx, cy);
        self.state = SelectionState::Dragging { anchor, rect };
        Some(rect)
    }

    /// Freeze the selection at the release point.
    pub fn pointer_up(&mut self, x: i32, y: i32) -> Option<SelectionRect> {
        let rect = self.pointer_move(x, y)?;
        self.state = SelectionState::Finalized(rect);
        log::debug!("selection finalized at {rect:?}");
        Some(rect)
    }

    pub fn clear(&mut self) {
        if self.state != SelectionState::Idle {
            log::debug!("selection cleared");
        }
        self.state = SelectionState::Idle;
    }

    /// Switch to another slice's coordinate space, discarding any selection.
    pub fn reset(&mut self, width: usize, height: usize) {
        self.clear();
        self.bounds = (width, height);
    }

    fn inside(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.bounds.0 && (y as usize) < self.bounds.1
    }

    fn clip(&self, x: i32, y: i32) -> Option<(usize, usize)> {
        let (width, height) = self.bounds;
        if width == 0 || height == 0 {
            return None;
        }
        let cx = (x.max(0) as usize).min(width - 1);
        let cy = (y.max(0) as usize).min(height - 1);
        Some((cx, cy))
    }
}

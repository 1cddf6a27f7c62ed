/// Pixel distance between the selection end and the trigger marker.
pub const TRIGGER_OFFSET: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A client rectangle as reported by the host (viewport coordinates).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self { left, top, width, height }
    }

    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.left && p.x <= self.right() && p.y >= self.top && p.y <= self.bottom()
    }
}

/// Where the selection visually ends, in document coordinates.
///
/// `left`/`top` is the bottom-right corner of the last line box of the
/// selection; `width`/`height` are that line box's size.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Anchor {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Anchor {
    pub fn from_last_rect(rects: &[Rect], scroll: Point) -> Option<Self> {
        let last = rects.last()?;
        Some(Self {
            left: last.right() + scroll.x,
            top: last.bottom() + scroll.y,
            width: last.width,
            height: last.height,
        })
    }

    pub fn trigger_position(&self) -> Point {
        Point::new(self.left + TRIGGER_OFFSET, self.top + TRIGGER_OFFSET)
    }
}

/// What the host reports about the current selection on pointer release.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawSelection {
    pub text: String,
    /// One rectangle per line box, in visual order.
    pub client_rects: Vec<Rect>,
    pub scroll: Point,
    /// The selected range lives inside the overlay panel itself.
    pub within_panel: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectionSnapshot {
    pub text: String,
    pub anchor: Anchor,
}

impl SelectionSnapshot {
    /// `None` when there is nothing worth translating.
    pub fn capture(raw: &RawSelection) -> Option<Self> {
        if raw.within_panel {
            return None;
        }
        let text = raw.text.trim();
        if text.is_empty() {
            return None;
        }
        let anchor = Anchor::from_last_rect(&raw.client_rects, raw.scroll)?;
        Some(Self {
            text: text.to_string(),
            anchor,
        })
    }
}

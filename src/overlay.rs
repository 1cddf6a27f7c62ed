use crate::error::TranslateError;
use crate::response::DictionaryEntry;
use crate::selection::{Anchor, Point};

/// Minimum distance kept between the panel and the viewport edges.
pub const VIEWPORT_MARGIN: f32 = 20.0;
/// Vertical gap between the selection and the panel.
pub const ANCHOR_GAP: f32 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

/// The visible part of the document, in document coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub scroll_x: f32,
    pub scroll_y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorHint {
    CheckSettings,
    CheckNetwork,
}

impl ErrorHint {
    pub fn for_error(err: &TranslateError) -> Option<Self> {
        match err {
            TranslateError::Cancelled => None,
            TranslateError::Api { status: None, .. } => Some(ErrorHint::CheckNetwork),
            _ => Some(ErrorHint::CheckSettings),
        }
    }

    pub fn text(self) -> &'static str {
        match self {
            ErrorHint::CheckSettings => "Open Settings and check the API parameters",
            ErrorHint::CheckNetwork => "Check your network connection",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum OverlayView {
    #[default]
    Hidden,
    Loading,
    Dictionary(DictionaryEntry),
    Paragraph { original: String, translated: String },
    Error { message: String, hint: Option<ErrorHint> },
}

impl OverlayView {
    pub fn is_visible(&self) -> bool {
        !matches!(self, OverlayView::Hidden)
    }

    pub fn error(err: &TranslateError) -> Self {
        OverlayView::Error {
            message: err.to_string(),
            hint: ErrorHint::for_error(err),
        }
    }

    /// Text a "Copy" action should put on the clipboard.
    pub fn copy_text(&self) -> Option<String> {
        match self {
            OverlayView::Paragraph { translated, .. } => Some(translated.clone()),
            OverlayView::Dictionary(entry) => {
                let mut out = entry.word.clone();
                for m in &entry.meanings {
                    out.push('\n');
                    out.push_str(&m.pos);
                    out.push(' ');
                    out.push_str(&m.definitions.join("; "));
                }
                Some(out)
            }
            _ => None,
        }
    }
}

/// Top-left corner for a panel of `panel` size near `anchor`.
///
/// Prefers below-right of the anchor, stays inside the horizontal viewport
/// bounds, and flips above the selection when it would run off the bottom.
pub fn place_panel(anchor: &Anchor, panel: Size, viewport: Viewport) -> Point {
    let mut left = anchor.left;
    let mut top = anchor.top + ANCHOR_GAP;

    let right_limit = viewport.width + viewport.scroll_x - VIEWPORT_MARGIN;
    if left + panel.width > right_limit {
        left = right_limit - panel.width;
    }
    if left < viewport.scroll_x + VIEWPORT_MARGIN {
        left = viewport.scroll_x + VIEWPORT_MARGIN;
    }

    if top + panel.height > viewport.height + viewport.scroll_y - VIEWPORT_MARGIN {
        top = anchor.top - anchor.height - panel.height - ANCHOR_GAP;
    }

    Point::new(left, top)
}

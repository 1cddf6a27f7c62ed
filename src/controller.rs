//! Selection → trigger → overlay state machine.
//!
//! The host turns its raw pointer and keyboard activity into [`Input`]s and
//! executes the returned [`Command`]s. Everything else (what is selected,
//! whether the trigger shows, what the panel displays, which request is
//! current) lives in one [`Controller`].

use log::{debug, info};

use crate::classify::{classify, TextKind};
use crate::config::DEFAULT_TRIGGER_KEY;
use crate::error::TranslateError;
use crate::overlay::OverlayView;
use crate::protocol::{ReplyData, TranslateReply};
use crate::selection::{Anchor, RawSelection, SelectionSnapshot};

pub type RequestId = u64;

/// What a pointer event landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Page,
    Panel,
    Trigger,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    PointerDown { target: Target },
    PointerUp { target: Target, selection: RawSelection },
    KeyDown { key: String },
    KeyUp { key: String },
    TriggerHovered,
    /// Explicit close from the panel itself.
    Dismiss,
    Settled {
        id: RequestId,
        outcome: Result<TranslateReply, TranslateError>,
    },
    TriggerKeyChanged(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Dispatch { id: RequestId, text: String, kind: TextKind },
    Cancel { id: RequestId },
}

#[derive(Debug, Clone, PartialEq)]
struct InFlight {
    id: RequestId,
    text: String,
}

#[derive(Debug)]
pub struct Controller {
    trigger_key: String,
    snapshot: Option<SelectionSnapshot>,
    trigger_visible: bool,
    view: OverlayView,
    panel_anchor: Option<Anchor>,
    in_flight: Option<InFlight>,
    next_id: RequestId,
}

impl Default for Controller {
    fn default() -> Self {
        Self::new(DEFAULT_TRIGGER_KEY)
    }
}

impl Controller {
    pub fn new(trigger_key: impl Into<String>) -> Self {
        Self {
            trigger_key: trigger_key.into(),
            snapshot: None,
            trigger_visible: false,
            view: OverlayView::Hidden,
            panel_anchor: None,
            in_flight: None,
            next_id: 1,
        }
    }

    pub fn view(&self) -> &OverlayView {
        &self.view
    }

    pub fn snapshot(&self) -> Option<&SelectionSnapshot> {
        self.snapshot.as_ref()
    }

    /// Where the trigger marker sits, if it is showing.
    pub fn trigger_anchor(&self) -> Option<Anchor> {
        if self.trigger_visible {
            self.snapshot.as_ref().map(|s| s.anchor)
        } else {
            None
        }
    }

    /// Where the panel is anchored, if it is showing.
    pub fn panel_anchor(&self) -> Option<Anchor> {
        if self.view.is_visible() {
            self.panel_anchor
        } else {
            None
        }
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn trigger_key(&self) -> &str {
        &self.trigger_key
    }

    pub fn handle(&mut self, input: Input) -> Vec<Command> {
        match input {
            Input::PointerDown { target: Target::Page } => self.dismiss(),
            Input::PointerDown { .. } => Vec::new(),
            Input::PointerUp { target: Target::Page, selection } => {
                self.on_selection(&selection);
                Vec::new()
            }
            Input::PointerUp { .. } => Vec::new(),
            Input::KeyDown { key } => {
                if key == self.trigger_key && self.snapshot.is_some() && self.in_flight.is_none() {
                    self.activate()
                } else {
                    Vec::new()
                }
            }
            Input::KeyUp { key } if key == "Escape" => self.dismiss(),
            Input::KeyUp { .. } => Vec::new(),
            Input::TriggerHovered => {
                if self.trigger_visible && self.in_flight.is_none() {
                    self.activate()
                } else {
                    Vec::new()
                }
            }
            Input::Dismiss => self.dismiss(),
            Input::Settled { id, outcome } => {
                self.settle(id, outcome);
                Vec::new()
            }
            Input::TriggerKeyChanged(key) => {
                info!("Trigger key changed to {}", key);
                self.trigger_key = key;
                Vec::new()
            }
        }
    }

    fn on_selection(&mut self, raw: &RawSelection) {
        match SelectionSnapshot::capture(raw) {
            Some(snapshot) => {
                debug!("Selection captured ({} chars)", snapshot.text.chars().count());
                self.snapshot = Some(snapshot);
                self.trigger_visible = true;
            }
            None => {
                self.snapshot = None;
                self.trigger_visible = false;
            }
        }
    }

    fn activate(&mut self) -> Vec<Command> {
        let Some(snapshot) = self.snapshot.as_ref() else {
            return Vec::new();
        };
        let text = snapshot.text.clone();
        let kind = classify(&text);

        let id = self.next_id;
        self.next_id += 1;
        info!("Dispatching request {} as {:?}", id, kind);

        // Hide the marker but keep the snapshot: the panel is placed from it.
        self.trigger_visible = false;
        self.panel_anchor = Some(snapshot.anchor);
        self.view = OverlayView::Loading;
        self.in_flight = Some(InFlight { id, text: text.clone() });
        vec![Command::Dispatch { id, text, kind }]
    }

    fn settle(&mut self, id: RequestId, outcome: Result<TranslateReply, TranslateError>) {
        if self.in_flight.as_ref().map(|f| f.id) != Some(id) {
            debug!("Ignoring stale result for request {}", id);
            return;
        }
        let Some(InFlight { text, .. }) = self.in_flight.take() else {
            return;
        };

        self.view = match outcome {
            Ok(TranslateReply { data: ReplyData::Entry(entry), .. }) => OverlayView::Dictionary(entry),
            Ok(TranslateReply { data: ReplyData::Text(translated), .. }) => OverlayView::Paragraph {
                original: text,
                translated,
            },
            Err(TranslateError::Cancelled) => OverlayView::Hidden,
            Err(e) => OverlayView::error(&e),
        };
    }

    /// Back to hidden from any state, cancelling whatever is in flight.
    fn dismiss(&mut self) -> Vec<Command> {
        self.view = OverlayView::Hidden;
        self.panel_anchor = None;
        self.trigger_visible = false;
        self.snapshot = None;
        match self.in_flight.take() {
            Some(f) => {
                info!("Cancelling request {}", f.id);
                vec![Command::Cancel { id: f.id }]
            }
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::DictionaryEntry;
    use crate::selection::{Point, Rect};

    fn select(text: &str) -> Input {
        Input::PointerUp {
            target: Target::Page,
            selection: RawSelection {
                text: text.into(),
                client_rects: vec![Rect::new(10.0, 10.0, 30.0, 16.0)],
                scroll: Point::default(),
                within_panel: false,
            },
        }
    }

    fn key_down(k: &str) -> Input {
        Input::KeyDown { key: k.into() }
    }

    fn text_reply(s: &str) -> Result<TranslateReply, TranslateError> {
        Ok(TranslateReply {
            data: ReplyData::Text(s.into()),
            is_translation_model: false,
        })
    }

    fn dispatched_id(cmds: &[Command]) -> RequestId {
        cmds.iter()
            .find_map(|c| match c {
                Command::Dispatch { id, .. } => Some(*id),
                _ => None,
            })
            .expect("dispatch command")
    }

    #[test]
    fn selection_shows_trigger() {
        let mut c = Controller::default();
        assert!(c.handle(select("hello")).is_empty());
        assert!(c.trigger_anchor().is_some());
        assert_eq!(c.snapshot().unwrap().text, "hello");

        c.handle(select("   "));
        assert!(c.trigger_anchor().is_none());
        assert!(c.snapshot().is_none());
    }

    #[test]
    fn trigger_key_starts_word_lookup() {
        let mut c = Controller::default();
        c.handle(select("hello"));
        let cmds = c.handle(key_down("Control"));
        assert_eq!(
            cmds,
            vec![Command::Dispatch { id: 1, text: "hello".into(), kind: TextKind::Word }]
        );
        assert_eq!(c.view(), &OverlayView::Loading);
        assert!(c.trigger_anchor().is_none());
        assert!(c.panel_anchor().is_some());
    }

    #[test]
    fn other_keys_and_no_selection_do_nothing() {
        let mut c = Controller::default();
        assert!(c.handle(key_down("Control")).is_empty());
        c.handle(select("hello world"));
        assert!(c.handle(key_down("Shift")).is_empty());
        assert_eq!(c.view(), &OverlayView::Hidden);
    }

    #[test]
    fn no_double_activation_while_in_flight() {
        let mut c = Controller::default();
        c.handle(select("hello world"));
        assert_eq!(c.handle(Input::TriggerHovered).len(), 1);
        assert!(c.handle(key_down("Control")).is_empty());
        assert!(c.handle(Input::TriggerHovered).is_empty());
        assert!(c.is_busy());
    }

    #[test]
    fn success_renders_paragraph() {
        let mut c = Controller::default();
        c.handle(select("hello world"));
        let id = dispatched_id(&c.handle(key_down("Control")));
        c.handle(Input::Settled { id, outcome: text_reply("你好世界") });
        assert_eq!(
            c.view(),
            &OverlayView::Paragraph { original: "hello world".into(), translated: "你好世界".into() }
        );
        assert!(!c.is_busy());
    }

    #[test]
    fn entry_renders_dictionary() {
        let mut c = Controller::default();
        c.handle(select("cat"));
        let id = dispatched_id(&c.handle(key_down("Control")));
        let entry = DictionaryEntry { word: "cat".into(), ..Default::default() };
        c.handle(Input::Settled {
            id,
            outcome: Ok(TranslateReply { data: ReplyData::Entry(entry.clone()), is_translation_model: false }),
        });
        assert_eq!(c.view(), &OverlayView::Dictionary(entry));
    }

    #[test]
    fn word_mode_text_fallback_renders_paragraph() {
        let mut c = Controller::default();
        c.handle(select("cat"));
        let id = dispatched_id(&c.handle(key_down("Control")));
        c.handle(Input::Settled { id, outcome: text_reply("not json at all") });
        assert_eq!(
            c.view(),
            &OverlayView::Paragraph { original: "cat".into(), translated: "not json at all".into() }
        );
    }

    #[test]
    fn failure_renders_error_with_hint() {
        let mut c = Controller::default();
        c.handle(select("cat"));
        let id = dispatched_id(&c.handle(key_down("Control")));
        c.handle(Input::Settled { id, outcome: Err(TranslateError::missing_config()) });
        match c.view() {
            OverlayView::Error { message, hint } => {
                assert!(message.contains("API settings"));
                assert_eq!(*hint, Some(crate::overlay::ErrorHint::CheckSettings));
            }
            other => panic!("unexpected view {other:?}"),
        }
    }

    #[test]
    fn cancellation_is_silent() {
        let mut c = Controller::default();
        c.handle(select("cat"));
        let id = dispatched_id(&c.handle(key_down("Control")));
        c.handle(Input::Settled { id, outcome: Err(TranslateError::Cancelled) });
        assert_eq!(c.view(), &OverlayView::Hidden);
    }

    #[test]
    fn dismissal_cancels_from_any_state() {
        for dismiss in [
            Input::KeyUp { key: "Escape".into() },
            Input::PointerDown { target: Target::Page },
            Input::Dismiss,
        ] {
            let mut c = Controller::default();
            c.handle(select("cat"));
            let id = dispatched_id(&c.handle(key_down("Control")));
            assert_eq!(c.handle(dismiss), vec![Command::Cancel { id }]);
            assert_eq!(c.view(), &OverlayView::Hidden);
            assert!(c.snapshot().is_none());
            assert!(!c.is_busy());
        }

        let mut idle = Controller::default();
        assert!(idle.handle(Input::KeyUp { key: "Escape".into() }).is_empty());
        assert_eq!(idle.view(), &OverlayView::Hidden);
    }

    #[test]
    fn clicks_on_ui_do_not_dismiss() {
        let mut c = Controller::default();
        c.handle(select("cat"));
        c.handle(key_down("Control"));
        assert!(c.handle(Input::PointerDown { target: Target::Panel }).is_empty());
        assert!(c.handle(Input::PointerUp { target: Target::Panel, selection: RawSelection::default() })
            .is_empty());
        assert_eq!(c.view(), &OverlayView::Loading);
    }

    #[test]
    fn superseded_result_is_ignored() {
        let mut c = Controller::default();
        c.handle(select("first"));
        let first = dispatched_id(&c.handle(key_down("Control")));
        c.handle(Input::PointerDown { target: Target::Page });
        c.handle(select("second"));
        let second = dispatched_id(&c.handle(key_down("Control")));
        assert_ne!(first, second);

        c.handle(Input::Settled { id: first, outcome: text_reply("stale") });
        assert_eq!(c.view(), &OverlayView::Loading);

        c.handle(Input::Settled { id: second, outcome: text_reply("fresh") });
        assert_eq!(
            c.view(),
            &OverlayView::Paragraph { original: "second".into(), translated: "fresh".into() }
        );
    }

    #[test]
    fn trigger_key_can_change() {
        let mut c = Controller::default();
        c.handle(Input::TriggerKeyChanged("Alt".into()));
        c.handle(select("cat"));
        assert!(c.handle(key_down("Control")).is_empty());
        assert_eq!(c.handle(key_down("Alt")).len(), 1);
    }

    #[test]
    fn same_selection_can_be_translated_again() {
        let mut c = Controller::default();
        c.handle(select("cat"));
        let id = dispatched_id(&c.handle(key_down("Control")));
        c.handle(Input::Settled { id, outcome: text_reply("猫") });
        let again = c.handle(key_down("Control"));
        assert_eq!(dispatched_id(&again), id + 1);
    }
}

use crossbeam_channel::Receiver;
use eframe::egui;
use egui_phosphor::regular as icons;
use log::{error, info, warn};
use std::fs;
use std::sync::Arc;
use std::time::{Duration, Instant};

use smart_translate::background::{Background, Pending};
use smart_translate::config::{SettingsChange, SettingsStore, KEY_TRIGGER};
use smart_translate::controller::{Command, Controller, Input, RequestId, Target};
use smart_translate::overlay::{place_panel, OverlayView, Size, Viewport};
use smart_translate::protocol::TranslateReply;
use smart_translate::response::{DictionaryEntry, Example};
use smart_translate::selection::{Point, RawSelection, Rect};
use smart_translate::settings_form::{SettingsForm, TestOutcome, TRIGGER_KEYS};

const TRIGGER_SIZE: f32 = 12.0;
const TRIGGER_COLOR: egui::Color32 = egui::Color32::from_rgb(0x14, 0xB8, 0xA6);
const PANEL_MAX_WIDTH: f32 = 380.0;
const SAVE_STATUS_FOR: Duration = Duration::from_secs(2);

const SAMPLE_PAGE: &str = "Paste or type any text here, select a word or a paragraph, \
then press the trigger key or hover the dot that appears.\n\n\
Serendipity is the occurrence of events by chance in a happy or beneficial way.";

const CJK_FONTS: [&str; 8] = [
    r"C:\Windows\Fonts\msyh.ttc",
    r"C:\Windows\Fonts\msyh.ttf",
    r"C:\Windows\Fonts\simsun.ttc",
    r"C:\Windows\Fonts\simhei.ttf",
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/truetype/wqy/wqy-microhei.ttc",
    "/System/Library/Fonts/PingFang.ttc",
];

fn setup_fonts(ctx: &egui::Context) {
    let mut fonts = egui::FontDefinitions::default();
    egui_phosphor::add_to_fonts(&mut fonts, egui_phosphor::Variant::Regular);

    let loaded = CJK_FONTS
        .iter()
        .find_map(|path| fs::read(path).ok().map(|bytes| (*path, bytes)));
    match loaded {
        Some((path, bytes)) => {
            fonts
                .font_data
                .insert("cjk".to_owned(), egui::FontData::from_owned(bytes));
            for family in [egui::FontFamily::Proportional, egui::FontFamily::Monospace] {
                fonts.families.entry(family).or_default().push("cjk".to_owned());
            }
            info!("Loaded CJK font: {}", path);
        }
        None => warn!("No CJK font found; Chinese text may render as squares"),
    }
    ctx.set_fonts(fonts);
}

fn write_clipboard_string(ctx: &egui::Context, s: String) {
    #[cfg(windows)]
    {
        if clipboard_win::set_clipboard_string(&s).is_ok() {
            return;
        }
        warn!("Clipboard write failed, handing text to egui");
    }
    ctx.output_mut(|o| o.copied_text = s);
}

/// Reads the page selection out of the text edit, as the host-neutral [`RawSelection`].
fn page_selection(text: &str, output: &egui::text_edit::TextEditOutput) -> RawSelection {
    let Some(range) = output.cursor_range else {
        return RawSelection::default();
    };
    let (start, end) = if range.primary.ccursor.index <= range.secondary.ccursor.index {
        (range.primary, range.secondary)
    } else {
        (range.secondary, range.primary)
    };
    if start.ccursor.index == end.ccursor.index {
        return RawSelection::default();
    }
    let selected: String = text
        .chars()
        .skip(start.ccursor.index)
        .take(end.ccursor.index - start.ccursor.index)
        .collect();

    let offset = output.galley_pos.to_vec2();
    let rects = [start, end]
        .iter()
        .map(|c| output.galley.pos_from_cursor(c).translate(offset))
        .map(|r| Rect::new(r.min.x, r.min.y, r.width(), r.height()))
        .collect();
    RawSelection {
        text: selected,
        client_rects: rects,
        scroll: Point::default(),
        within_panel: false,
    }
}

/// Browser-style key names for modifier presses and releases since last frame.
fn modifier_inputs(prev: egui::Modifiers, now: egui::Modifiers) -> Vec<Input> {
    let pairs = [
        ("Control", prev.ctrl, now.ctrl),
        ("Alt", prev.alt, now.alt),
        ("Shift", prev.shift, now.shift),
        ("Meta", prev.mac_cmd, now.mac_cmd),
    ];
    let mut inputs = Vec::new();
    for (name, was, is) in pairs {
        if !was && is {
            inputs.push(Input::KeyDown { key: name.to_string() });
        } else if was && !is {
            inputs.push(Input::KeyUp { key: name.to_string() });
        }
    }
    inputs
}

enum PanelAction {
    None,
    Close,
    Copy(String),
}

pub struct TranslatorApp {
    store: Arc<SettingsStore>,
    settings_rx: Receiver<SettingsChange>,
    background: Background,
    controller: Controller,
    pending: Option<(RequestId, Pending<TranslateReply>)>,
    page: String,
    modifiers: egui::Modifiers,
    panel_rect: Option<egui::Rect>,
    panel_size: Size,
    trigger_rect: Option<egui::Rect>,
    settings_rect: Option<egui::Rect>,
    settings_open: bool,
    form: SettingsForm,
    probe: Option<Pending<String>>,
    probe_result: Option<TestOutcome>,
    save_status: Option<(String, Instant)>,
}

impl TranslatorApp {
    pub fn new(cc: &eframe::CreationContext<'_>, store: Arc<SettingsStore>) -> Self {
        setup_fonts(&cc.egui_ctx);
        let settings = store.get_with_defaults();
        let settings_rx = store.subscribe();
        let background = Background::start(Arc::clone(&store));
        Self {
            settings_open: !settings.is_configured(),
            form: SettingsForm::from_settings(&settings),
            controller: Controller::new(settings.trigger_key),
            store,
            settings_rx,
            background,
            pending: None,
            page: SAMPLE_PAGE.to_string(),
            modifiers: egui::Modifiers::default(),
            panel_rect: None,
            panel_size: Size { width: PANEL_MAX_WIDTH, height: 120.0 },
            trigger_rect: None,
            settings_rect: None,
            probe: None,
            probe_result: None,
            save_status: None,
        }
    }

    fn feed(&mut self, input: Input) {
        let commands = self.controller.handle(input);
        for cmd in commands {
            match cmd {
                Command::Dispatch { id, text, kind } => {
                    let pending = self.background.translate(text, kind);
                    self.pending = Some((id, pending));
                }
                Command::Cancel { id } => {
                    if self.pending.as_ref().is_some_and(|(pid, _)| *pid == id) {
                        if let Some((_, pending)) = self.pending.take() {
                            pending.cancel();
                        }
                    }
                }
            }
        }
    }

    fn drain_settings_changes(&mut self) {
        let changes: Vec<SettingsChange> = self.settings_rx.try_iter().collect();
        for change in changes {
            if change.key == KEY_TRIGGER {
                if let Some(key) = change.new_value.as_str() {
                    self.feed(Input::TriggerKeyChanged(key.to_string()));
                }
            }
        }
    }

    fn poll_pending(&mut self) {
        let settled = match &mut self.pending {
            Some((id, pending)) => pending.try_take().map(|outcome| (*id, outcome)),
            None => None,
        };
        if let Some((id, outcome)) = settled {
            self.pending = None;
            self.feed(Input::Settled { id, outcome });
        }

        if let Some(res) = self.probe.as_mut().and_then(|p| p.try_take()) {
            self.probe = None;
            self.probe_result = Some(TestOutcome::from_result(res));
        }
    }

    fn target_at(&self, pos: egui::Pos2) -> Option<Target> {
        if self.panel_rect.is_some_and(|r| r.contains(pos)) {
            Some(Target::Panel)
        } else if self.trigger_rect.is_some_and(|r| r.contains(pos)) {
            Some(Target::Trigger)
        } else if self.settings_open && self.settings_rect.is_some_and(|r| r.contains(pos)) {
            None
        } else {
            Some(Target::Page)
        }
    }

    fn handle_input(&mut self, ctx: &egui::Context, selection: RawSelection) {
        let (pressed, released, pos, events, modifiers) = ctx.input(|i| {
            (
                i.pointer.any_pressed(),
                i.pointer.any_released(),
                i.pointer.interact_pos(),
                i.events.clone(),
                i.modifiers,
            )
        });

        let target = pos.and_then(|p| self.target_at(p));
        if let Some(target) = target {
            if pressed {
                self.feed(Input::PointerDown { target });
            }
            if released {
                self.feed(Input::PointerUp { target, selection });
            }
        }

        for input in modifier_inputs(self.modifiers, modifiers) {
            self.feed(input);
        }
        self.modifiers = modifiers;

        for event in events {
            if let egui::Event::Key { key, pressed, repeat: false, .. } = event {
                let key = key.name().to_string();
                self.feed(if pressed { Input::KeyDown { key } } else { Input::KeyUp { key } });
            }
        }
    }

    fn show_trigger(&mut self, ctx: &egui::Context) {
        self.trigger_rect = None;
        let Some(anchor) = self.controller.trigger_anchor() else {
            return;
        };
        let at = anchor.trigger_position();
        let area = egui::Area::new(egui::Id::new("st-trigger"))
            .order(egui::Order::Foreground)
            .fixed_pos(egui::pos2(at.x, at.y))
            .show(ctx, |ui| {
                let (rect, response) =
                    ui.allocate_exact_size(egui::vec2(TRIGGER_SIZE, TRIGGER_SIZE), egui::Sense::hover());
                ui.painter().circle_filled(rect.center(), TRIGGER_SIZE / 2.0, TRIGGER_COLOR);
                response
            });
        self.trigger_rect = Some(area.response.rect);
        if area.inner.hovered() {
            self.feed(Input::TriggerHovered);
        }
    }

    fn show_panel(&mut self, ctx: &egui::Context) {
        self.panel_rect = None;
        let Some(anchor) = self.controller.panel_anchor() else {
            return;
        };
        let screen = ctx.screen_rect();
        let viewport = Viewport {
            scroll_x: screen.min.x,
            scroll_y: screen.min.y,
            width: screen.width(),
            height: screen.height(),
        };
        let at = place_panel(&anchor, self.panel_size, viewport);
        let view = self.controller.view().clone();

        let area = egui::Area::new(egui::Id::new("st-panel"))
            .order(egui::Order::Foreground)
            .fixed_pos(egui::pos2(at.x, at.y))
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style())
                    .show(ui, |ui| {
                        ui.set_max_width(PANEL_MAX_WIDTH);
                        panel_contents(ui, &view)
                    })
                    .inner
            });

        let rect = area.response.rect;
        self.panel_rect = Some(rect);
        let size = Size { width: rect.width(), height: rect.height() };
        if size != self.panel_size {
            // Content changed size; place again next frame.
            self.panel_size = size;
            ctx.request_repaint();
        }

        match area.inner {
            PanelAction::Close => self.feed(Input::Dismiss),
            PanelAction::Copy(text) => write_clipboard_string(ctx, text),
            PanelAction::None => {}
        }
    }

    fn start_probe(&mut self) {
        match self.form.probe_settings() {
            Ok(settings) => {
                self.probe_result = None;
                self.probe = Some(self.background.test_connection(settings));
            }
            Err(msg) => self.probe_result = Some(TestOutcome::failed(msg)),
        }
    }

    fn save_settings(&mut self) {
        let settings = self.form.to_settings();
        let status = match self.store.set(&settings) {
            Ok(()) => "Settings saved".to_string(),
            Err(e) => {
                error!("Failed to save settings: {}", e);
                format!("Save failed: {}", e)
            }
        };
        self.form = SettingsForm {
            show_credential: self.form.show_credential,
            ..SettingsForm::from_settings(&settings)
        };
        self.save_status = Some((status, Instant::now()));
    }

    fn show_settings(&mut self, ctx: &egui::Context) {
        self.settings_rect = None;
        if !self.settings_open {
            return;
        }
        let mut open = true;
        let mut test_clicked = false;
        let mut save_clicked = false;
        let mut submitted = false;
        let testing = self.probe.is_some();

        let window = egui::Window::new(format!("{} Settings", icons::GEAR))
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                egui::Grid::new("settings-grid")
                    .num_columns(2)
                    .spacing([8.0, 6.0])
                    .show(ui, |ui| {
                        ui.label("API base URL");
                        let url = ui.add(
                            egui::TextEdit::singleline(&mut self.form.endpoint_base_url)
                                .hint_text("https://api.openai.com/v1"),
                        );
                        submitted |= submit_on_enter(ui, &url);
                        ui.end_row();

                        ui.label("API key");
                        ui.horizontal(|ui| {
                            let key = ui.add(
                                egui::TextEdit::singleline(&mut self.form.credential)
                                    .password(!self.form.show_credential),
                            );
                            submitted |= submit_on_enter(ui, &key);
                            let (icon, tip) = if self.form.show_credential {
                                (icons::EYE_SLASH, "Hide")
                            } else {
                                (icons::EYE, "Show")
                            };
                            if ui.button(icon).on_hover_text(tip).clicked() {
                                self.form.show_credential = !self.form.show_credential;
                            }
                        });
                        ui.end_row();

                        ui.label("Model");
                        let model = ui.add(
                            egui::TextEdit::singleline(&mut self.form.model_id).hint_text("gpt-3.5-turbo"),
                        );
                        submitted |= submit_on_enter(ui, &model);
                        ui.end_row();

                        ui.label("Trigger key");
                        egui::ComboBox::from_id_source("trigger-key")
                            .selected_text(self.form.trigger_key.clone())
                            .show_ui(ui, |ui| {
                                for key in TRIGGER_KEYS {
                                    ui.selectable_value(&mut self.form.trigger_key, key.to_string(), key);
                                }
                            });
                        ui.end_row();
                    });

                ui.add_space(6.0);
                ui.horizontal(|ui| {
                    if ui.add_enabled(!testing, egui::Button::new("Test connection")).clicked() {
                        test_clicked = true;
                    }
                    if testing {
                        ui.spinner();
                    }
                    if ui.button(format!("{} Save", icons::FLOPPY_DISK)).clicked() {
                        save_clicked = true;
                    }
                });

                if let Some(outcome) = &self.probe_result {
                    let color = if outcome.success {
                        egui::Color32::from_rgb(0x16, 0xA3, 0x4A)
                    } else {
                        ui.visuals().error_fg_color
                    };
                    ui.colored_label(color, &outcome.message);
                }
                if let Some((status, at)) = &self.save_status {
                    if at.elapsed() < SAVE_STATUS_FOR {
                        ui.label(status);
                    }
                }
            });

        if let Some(window) = window {
            self.settings_rect = Some(window.response.rect);
        }
        if submitted {
            save_clicked = true;
        }
        if test_clicked {
            self.start_probe();
        }
        if save_clicked {
            self.save_settings();
        }
        if self.save_status.as_ref().is_some_and(|(_, at)| at.elapsed() < SAVE_STATUS_FOR) {
            ctx.request_repaint_after(Duration::from_millis(250));
        }
        self.settings_open = open;
    }
}

/// Enter in a single-line field commits the form.
fn submit_on_enter(ui: &egui::Ui, field: &egui::Response) -> bool {
    field.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter))
}

fn panel_contents(ui: &mut egui::Ui, view: &OverlayView) -> PanelAction {
    let mut action = PanelAction::None;
    ui.horizontal(|ui| {
        ui.strong(format!("{} Smart Translate", icons::TRANSLATE));
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if ui.small_button(icons::X).on_hover_text("Close").clicked() {
                action = PanelAction::Close;
            }
            if let Some(text) = view.copy_text() {
                if ui.small_button(icons::COPY).on_hover_text("Copy").clicked() {
                    action = PanelAction::Copy(text);
                }
            }
        });
    });
    ui.separator();

    match view {
        OverlayView::Hidden => {}
        OverlayView::Loading => {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("Translating...");
            });
        }
        OverlayView::Dictionary(entry) => dictionary_contents(ui, entry),
        OverlayView::Paragraph { original, translated } => {
            ui.small("Original");
            ui.label(original);
            ui.add_space(6.0);
            ui.small("Translation");
            ui.label(egui::RichText::new(translated).strong());
        }
        OverlayView::Error { message, hint } => {
            ui.colored_label(
                ui.visuals().error_fg_color,
                format!("{} Translation failed", icons::WARNING_CIRCLE),
            );
            ui.label(message);
            if let Some(hint) = hint {
                ui.add_space(4.0);
                ui.weak(hint.text());
            }
        }
    }
    action
}

fn dictionary_contents(ui: &mut egui::Ui, entry: &DictionaryEntry) {
    ui.horizontal(|ui| {
        ui.label(egui::RichText::new(&entry.word).heading().strong());
        if let Some(phonetic) = &entry.phonetic {
            ui.weak(phonetic);
        }
    });
    for meaning in &entry.meanings {
        ui.add_space(4.0);
        if !meaning.pos.is_empty() {
            ui.label(egui::RichText::new(&meaning.pos).italics());
        }
        for (i, def) in meaning.definitions.iter().enumerate() {
            ui.label(format!("{}. {}", i + 1, def));
        }
        for example in &meaning.examples {
            match example {
                Example::Pair { en, zh } => {
                    ui.weak(en);
                    ui.weak(zh);
                }
                Example::Text(text) => {
                    ui.weak(text);
                }
            }
        }
    }
}

impl eframe::App for TranslatorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_settings_changes();
        self.poll_pending();

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Smart Translate");
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button(format!("{} Settings", icons::GEAR)).clicked() {
                        self.form = SettingsForm::from_settings(&self.store.get_with_defaults());
                        self.probe_result = None;
                        self.settings_open = true;
                    }
                });
            });
            ui.weak(format!(
                "Select text below, then press {} or hover the dot. Esc closes the panel.",
                self.controller.trigger_key()
            ));
        });

        let mut selection = RawSelection::default();
        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    let output = egui::TextEdit::multiline(&mut self.page)
                        .desired_rows(20)
                        .desired_width(f32::INFINITY)
                        .show(ui);
                    selection = page_selection(&self.page, &output);
                });
        });

        self.show_settings(ctx);
        self.handle_input(ctx, selection);
        self.show_trigger(ctx);
        self.show_panel(ctx);

        if self.pending.is_some() || self.probe.is_some() {
            // Replies arrive off-thread; keep polling.
            ctx.request_repaint_after(Duration::from_millis(50));
        }
    }
}

use std::time::Instant;

use eframe::egui::{self, Color32, RichText, Stroke, TextEdit, Ui, Vec2};
use scorer_api::{
    ApiClient, IllugenVariation, NextPrompt, Prompt, SendPromptRequest, SendPromptResponse,
    TestResult, UploadedNote,
};
use scorer_core::{
    FieldFlash, PromptMode, RequestTracker, RotationCursor, SCORE_0_TO_10, SessionStore,
    StatusLine, SubmitBlock, TestingDraft,
};

use crate::fetch::{self, Inflight};
use crate::widgets::{ScoreSlider, WaveformView, status_banner};

const PAGE: &str = "testing";

const MODEL_VERSIONS: &[(&str, &str)] = &[
    ("v11", "V11"),
    ("v12", "V12 (Latest)"),
    ("v13", "V13 (Cymbals Only)"),
];

/// Drum types the v13 model handles; prompts for these lock the version
/// selector until the user overrides it on a non-cymbal prompt.
const CYMBAL_TYPES: &[&str] = &[
    "ride",
    "crash",
    "china",
    "splash",
    "hihat",
    "closed hihat",
    "open hihat",
];

const DRUM_TYPE_OPTIONS: &[&str] = &[
    "kick",
    "snare",
    "hihat",
    "closed hihat",
    "open hihat",
    "ride",
    "crash",
    "tom",
    "floor tom",
    "rack tom",
    "china",
    "splash",
    "cowbell",
    "tambourine",
    "shaker",
    "clap",
    "snap",
    "bongo",
    "triangle",
    "woodblock",
    "cabasa",
    "fx",
    "scratch",
    "impact",
];

const ILLUGEN_SFX_TYPES: &[&str] = &["one-shot", "loop"];

fn is_cymbal(drum_type: &str) -> bool {
    CYMBAL_TYPES.contains(&drum_type.to_lowercase().as_str())
}

fn version_label(version: &str) -> &str {
    MODEL_VERSIONS
        .iter()
        .find(|(value, _)| *value == version)
        .map(|(_, label)| *label)
        .unwrap_or(version)
}

/// The main prompt-testing flow: fetch a prompt (rotation or free text), send
/// it to the generator, play the result, score it, submit, advance.
pub struct TestingPage {
    draft: TestingDraft,
    rotation: RotationCursor,
    model_version: String,
    user_modified_version: bool,
    generation_score: ScoreSlider,
    llm_score: ScoreSlider,
    notes: String,
    note_audio_path: Option<String>,
    illugen: bool,
    illugen_sfx_type: String,
    illugen_variations: Vec<IllugenVariation>,
    illugen_error: Option<String>,
    waveform: WaveformView,
    variation_preview: WaveformView,
    status: StatusLine,
    generation_flash: FieldFlash,
    llm_flash: FieldFlash,
    drum_type_flash: FieldFlash,
    prompt_requests: RequestTracker,
    send_requests: RequestTracker,
    submit_requests: RequestTracker,
    upload_requests: RequestTracker,
    prompt_inflight: Option<Inflight<NextPrompt>>,
    random_inflight: Option<Inflight<Prompt>>,
    send_inflight: Option<Inflight<SendPromptResponse>>,
    submit_inflight: Option<Inflight<TestResult>>,
    upload_inflight: Option<Inflight<UploadedNote>>,
    dirty: bool,
}

impl TestingPage {
    pub fn new(api: &ApiClient, session: &SessionStore, ctx: &egui::Context) -> Self {
        let draft: TestingDraft = session.restore(PAGE, "draft", TestingDraft::default());
        let (r#gen, llm): (Option<i32>, Option<i32>) = session.restore(PAGE, "scores", (None, None));

        let mut generation_score = ScoreSlider::vertical(SCORE_0_TO_10);
        if let Some(value) = r#gen {
            generation_score.set_value(value);
        }
        let mut llm_score = ScoreSlider::vertical(SCORE_0_TO_10);
        if let Some(value) = llm {
            llm_score.set_value(value);
        }

        let mut rotation = RotationCursor::new();
        if let Some(prompt) = draft.current_prompt() {
            rotation.advance(prompt);
        }

        let mut waveform = WaveformView::new(false);
        waveform.set_source(draft.audio_url.clone(), api, ctx);

        let mut page = Self {
            rotation,
            model_version: session.restore(PAGE, "model_version", "v12".to_string()),
            user_modified_version: session.restore(PAGE, "user_modified_version", false),
            generation_score,
            llm_score,
            notes: session.restore(PAGE, "notes", String::new()),
            note_audio_path: session.restore(PAGE, "note_audio_path", None),
            illugen: session.restore(PAGE, "illugen", false),
            illugen_sfx_type: session.restore(PAGE, "illugen_sfx_type", "one-shot".to_string()),
            illugen_variations: Vec::new(),
            illugen_error: None,
            waveform,
            variation_preview: WaveformView::new(false),
            status: StatusLine::new(),
            generation_flash: FieldFlash::default(),
            llm_flash: FieldFlash::default(),
            drum_type_flash: FieldFlash::default(),
            prompt_requests: RequestTracker::new(),
            send_requests: RequestTracker::new(),
            submit_requests: RequestTracker::new(),
            upload_requests: RequestTracker::new(),
            prompt_inflight: None,
            random_inflight: None,
            send_inflight: None,
            submit_inflight: None,
            upload_inflight: None,
            dirty: false,
            draft,
        };

        if !page.draft.is_free_text() && page.draft.current_prompt().is_none() {
            page.load_next(api, ctx);
        }
        page
    }

    fn save_draft(&self, session: &mut SessionStore) {
        session.set(PAGE, "draft", &self.draft);
        session.set(
            PAGE,
            "scores",
            &(self.generation_score.value(), self.llm_score.value()),
        );
        session.set(PAGE, "model_version", &self.model_version);
        session.set(PAGE, "user_modified_version", &self.user_modified_version);
        session.set(PAGE, "notes", &self.notes);
        session.set(PAGE, "note_audio_path", &self.note_audio_path);
        session.set(PAGE, "illugen", &self.illugen);
        session.set(PAGE, "illugen_sfx_type", &self.illugen_sfx_type);
    }

    pub fn leave(&mut self, session: &mut SessionStore) {
        self.save_draft(session);
        self.waveform.teardown();
        self.variation_preview.teardown();
    }

    fn load_next(&mut self, api: &ApiClient, ctx: &egui::Context) {
        self.status.info("Loading next prompt...");
        let query = self.rotation.query();
        let api = api.clone();
        self.random_inflight = None;
        self.prompt_inflight = Some(fetch::spawn(self.prompt_requests.begin(), ctx, move || {
            api.next_in_rotation(&query)
        }));
    }

    fn load_random(&mut self, api: &ApiClient, ctx: &egui::Context) {
        self.status.info("Loading random prompt...");
        let exclude = self.rotation.exclude_id();
        let api = api.clone();
        self.prompt_inflight = None;
        self.random_inflight = Some(fetch::spawn(self.prompt_requests.begin(), ctx, move || {
            api.random_prompt(exclude)
        }));
    }

    fn apply_prompt(&mut self, prompt: Prompt, api: &ApiClient, ctx: &egui::Context) {
        if !self.user_modified_version {
            let cymbal = prompt.drum_type.as_deref().is_some_and(is_cymbal);
            self.model_version = if cymbal { "v13" } else { "v12" }.to_string();
        }
        self.rotation.advance(&prompt);
        self.draft.set_prompt(prompt);
        self.generation_score.clear();
        self.llm_score.clear();
        self.clear_illugen();
        self.waveform.set_source(None, api, ctx);
        self.status.clear();
        self.dirty = true;
    }

    fn clear_illugen(&mut self) {
        self.illugen_variations.clear();
        self.illugen_error = None;
    }

    fn send_prompt(&mut self, api: &ApiClient, ctx: &egui::Context) {
        let request = match &self.draft.mode {
            PromptMode::Database { prompt } => {
                let Some(prompt) = prompt else { return };
                SendPromptRequest {
                    prompt_id: Some(prompt.id),
                    text: None,
                    model_version: self.model_version.clone(),
                    illugen: self.illugen,
                    illugen_sfx_type: self.illugen.then(|| self.illugen_sfx_type.clone()),
                }
            }
            PromptMode::FreeText { text, .. } => {
                if text.trim().is_empty() {
                    return;
                }
                SendPromptRequest {
                    prompt_id: None,
                    text: Some(text.clone()),
                    model_version: self.model_version.clone(),
                    illugen: self.illugen,
                    illugen_sfx_type: self.illugen.then(|| self.illugen_sfx_type.clone()),
                }
            }
        };
        self.status.info("Sending prompt to DrumGen...");
        let api = api.clone();
        self.send_inflight = Some(fetch::spawn(self.send_requests.begin(), ctx, move || {
            api.send_prompt(&request)
        }));
    }

    fn attempt_submit(&mut self, api: &ApiClient, ctx: &egui::Context) {
        let now = Instant::now();
        match self
            .draft
            .validate_submit(self.generation_score.value(), self.llm_score.value())
        {
            Err(SubmitBlock::GenerationScoreUnset) => {
                self.generation_flash.trigger(now);
                self.status
                    .error("Score the generation quality before submitting.");
            }
            Err(SubmitBlock::LlmScoreUnset) => {
                self.llm_flash.trigger(now);
                self.status.error("Score the LLM accuracy before submitting.");
            }
            Err(SubmitBlock::MissingDrumType) => {
                self.drum_type_flash.trigger(now);
                self.status
                    .error("Please select a drum type for the free text prompt.");
            }
            Err(SubmitBlock::MissingPrompt) => {
                self.status.error("Cannot submit score without prompt.");
            }
            Err(SubmitBlock::NothingGenerated) => {
                self.status.error("Generate audio before submitting a score.");
            }
            Ok(()) => {
                let notes = {
                    let trimmed = self.notes.trim();
                    (!trimmed.is_empty()).then(|| trimmed.to_string())
                };
                let payload = self.draft.score_payload(
                    self.generation_score.value().unwrap_or(0) as u8,
                    self.llm_score.value().unwrap_or(0) as u8,
                    &self.model_version,
                    notes,
                    self.note_audio_path.clone(),
                );
                self.status.info("Submitting score...");
                let api = api.clone();
                self.submit_inflight =
                    Some(fetch::spawn(self.submit_requests.begin(), ctx, move || {
                        api.submit_score(&payload)
                    }));
            }
        }
    }

    fn finish_submission(&mut self, api: &ApiClient, ctx: &egui::Context) {
        let advance = !self.draft.is_free_text();
        self.draft.reset_after_submit();
        self.generation_score.clear();
        self.llm_score.clear();
        self.notes.clear();
        self.note_audio_path = None;
        self.clear_illugen();
        self.waveform.set_source(None, api, ctx);
        self.variation_preview.set_source(None, api, ctx);
        self.dirty = true;
        if advance {
            self.load_next(api, ctx);
        }
    }

    fn pick_note_audio(&mut self, api: &ApiClient, ctx: &egui::Context) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Audio", &["wav", "mp3", "flac", "ogg"])
            .pick_file()
        else {
            return;
        };
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "note_audio.wav".to_string());
        match std::fs::read(&path) {
            Ok(bytes) => {
                self.status.info("Uploading note audio...");
                let api = api.clone();
                self.upload_inflight =
                    Some(fetch::spawn(self.upload_requests.begin(), ctx, move || {
                        api.upload_note_audio(&filename, bytes)
                    }));
            }
            Err(err) => self.status.error(format!("Could not read file: {err}")),
        }
    }

    fn poll(&mut self, api: &ApiClient, ctx: &egui::Context) {
        if let Some((ticket, result)) = fetch::take_completed(&mut self.prompt_inflight) {
            if self.prompt_requests.is_current(ticket) {
                match result {
                    Ok(NextPrompt::Prompt(prompt)) => self.apply_prompt(prompt, api, ctx),
                    Ok(NextPrompt::Exhausted { message }) => self.status.info(message),
                    Err(err) => self.status.error(format!("Error loading prompt: {err}")),
                }
            }
        }
        if let Some((ticket, result)) = fetch::take_completed(&mut self.random_inflight) {
            if self.prompt_requests.is_current(ticket) {
                match result {
                    Ok(prompt) => self.apply_prompt(prompt, api, ctx),
                    Err(err) => self.status.error(format!("Error loading prompt: {err}")),
                }
            }
        }
        if let Some((ticket, result)) = fetch::take_completed(&mut self.send_inflight) {
            if self.send_requests.is_current(ticket) {
                match result {
                    Ok(response) => {
                        self.illugen_variations =
                            response.illugen_variations.clone().unwrap_or_default();
                        self.illugen_error = response.illugen_error.clone();
                        self.draft.set_generation(&response);
                        self.waveform
                            .set_source(self.draft.audio_url.clone(), api, ctx);
                        self.variation_preview.set_source(None, api, ctx);
                        self.status
                            .success("Received JSON and audio from DrumGen", Instant::now());
                        self.dirty = true;
                    }
                    Err(err) => self.status.error(format!("Error: {err}")),
                }
            }
        }
        if let Some((ticket, result)) = fetch::take_completed(&mut self.submit_inflight) {
            if self.submit_requests.is_current(ticket) {
                match result {
                    Ok(_) => {
                        self.status.success("Score saved!", Instant::now());
                        self.finish_submission(api, ctx);
                    }
                    Err(err) => self.status.error(format!("Error: {err}")),
                }
            }
        }
        if let Some((ticket, result)) = fetch::take_completed(&mut self.upload_inflight) {
            if self.upload_requests.is_current(ticket) {
                match result {
                    Ok(uploaded) => {
                        self.note_audio_path = Some(uploaded.path);
                        self.status.success("Note audio attached", Instant::now());
                        self.dirty = true;
                    }
                    Err(err) => self.status.error(format!("Upload failed: {err}")),
                }
            }
        }

        self.waveform.poll(ctx);
        self.variation_preview.poll(ctx);
    }

    pub fn ui(&mut self, ui: &mut Ui, api: &ApiClient, session: &mut SessionStore) {
        self.poll(api, ui.ctx());
        let now = Instant::now();
        let loading = self.prompt_inflight.is_some()
            || self.random_inflight.is_some()
            || self.send_inflight.is_some();
        let submitting = self.submit_inflight.is_some();
        let mut changed = false;

        self.mode_card(ui, api, &mut changed);
        ui.add_space(8.0);
        self.prompt_card(ui, api, loading, &mut changed);

        if self.draft.has_generation() {
            ui.add_space(8.0);
            self.generation_output_card(ui);

            if self.draft.is_free_text() {
                ui.add_space(8.0);
                self.free_text_tagging_card(ui, now, &mut changed);
            }

            ui.add_space(8.0);
            ui.columns(2, |columns| {
                columns[0].group(|ui| {
                    ui.strong("Generated Audio");
                    self.waveform.ui(ui);
                });
                columns[1].group(|ui| {
                    ui.strong("Score the Results");
                    ui.horizontal(|ui| {
                        changed |= self.generation_score.ui(
                            ui,
                            "Generation quality",
                            self.generation_flash.is_active(now),
                        );
                        ui.add_space(16.0);
                        changed |= self.llm_score.ui(
                            ui,
                            "LLM accuracy",
                            self.llm_flash.is_active(now),
                        );
                    });
                    ui.weak("Wheel, drag or double-click to adjust");
                });
            });

            ui.add_space(8.0);
            self.notes_card(ui, api, &mut changed);

            if !self.illugen_variations.is_empty() || self.illugen_error.is_some() {
                ui.add_space(8.0);
                self.illugen_card(ui, api, &mut changed);
            }

            ui.add_space(8.0);
            let submit_label = if self.draft.is_free_text() {
                "Submit Score"
            } else {
                "Submit Score & Next Prompt"
            };
            let submit = ui.add_enabled(
                !loading && !submitting,
                egui::Button::new(submit_label).min_size(Vec2::new(260.0, 34.0)),
            );
            if submit.clicked() {
                self.attempt_submit(api, ui.ctx());
            }
        }

        ui.add_space(8.0);
        status_banner(ui, &mut self.status);

        if changed || self.dirty {
            self.save_draft(session);
            self.dirty = false;
        }
    }

    fn mode_card(&mut self, ui: &mut Ui, api: &ApiClient, changed: &mut bool) {
        ui.group(|ui| {
            ui.horizontal(|ui| {
                ui.heading("Testing Mode");
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let label = if self.draft.is_free_text() {
                        "Database Mode"
                    } else {
                        "Free Text Mode"
                    };
                    if ui.button(label).clicked() {
                        self.draft.toggle_mode();
                        self.clear_illugen();
                        self.waveform.set_source(None, api, ui.ctx());
                        self.status.clear();
                        *changed = true;
                        if !self.draft.is_free_text() && self.draft.current_prompt().is_none() {
                            self.load_next(api, ui.ctx());
                        }
                    }
                });
            });

            let cymbal_locked = self
                .draft
                .current_prompt()
                .and_then(|p| p.drum_type.as_deref())
                .is_some_and(is_cymbal);

            ui.horizontal(|ui| {
                ui.label("Model version:");
                ui.add_enabled_ui(!cymbal_locked, |ui| {
                    egui::ComboBox::from_id_salt("model_version")
                        .selected_text(version_label(&self.model_version))
                        .show_ui(ui, |ui| {
                            for (value, label) in MODEL_VERSIONS {
                                if ui
                                    .selectable_label(self.model_version == *value, *label)
                                    .clicked()
                                {
                                    self.model_version = value.to_string();
                                    self.user_modified_version = true;
                                    *changed = true;
                                }
                            }
                        });
                });
                if cymbal_locked {
                    ui.weak("Auto-selected V13 for cymbal");
                }
            });
        });
    }

    fn prompt_card(&mut self, ui: &mut Ui, api: &ApiClient, loading: bool, changed: &mut bool) {
        ui.group(|ui| {
            if self.draft.is_free_text() {
                ui.label("Enter your prompt:");
                if let PromptMode::FreeText { text, .. } = &mut self.draft.mode {
                    let response = ui.add(
                        TextEdit::multiline(text)
                            .desired_rows(4)
                            .desired_width(f32::INFINITY)
                            .hint_text(
                                "Describe the drum sound you want... \
                                 (Tip: switch to V13 for cymbals)",
                            ),
                    );
                    *changed |= response.changed();
                }
            } else if let Some(prompt) = self.draft.current_prompt().cloned() {
                ui.horizontal(|ui| {
                    ui.label("Current prompt:");
                    ui.weak(format!(
                        "Difficulty: {}/10 | Category: {}",
                        prompt.difficulty,
                        prompt.category.as_deref().unwrap_or("-")
                    ));
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        let random =
                            ui.add_enabled(!loading, egui::Button::new("Random Prompt"));
                        let next = ui.add_enabled(!loading, egui::Button::new("Next Prompt"));
                        if next.clicked() {
                            self.load_next(api, ui.ctx());
                        }
                        if random.clicked() {
                            self.load_random(api, ui.ctx());
                        }
                    });
                });
                egui::Frame::group(ui.style()).show(ui, |ui| {
                    ui.label(RichText::new(&prompt.text).size(16.0));
                });
            } else {
                ui.weak("No prompt loaded yet.");
            }

            ui.horizontal(|ui| {
                if ui.checkbox(&mut self.illugen, "Compare with Illugen").changed() {
                    *changed = true;
                }
                if self.illugen {
                    egui::ComboBox::from_id_salt("illugen_sfx_type")
                        .selected_text(&self.illugen_sfx_type)
                        .show_ui(ui, |ui| {
                            for sfx in ILLUGEN_SFX_TYPES {
                                if ui
                                    .selectable_label(self.illugen_sfx_type == *sfx, *sfx)
                                    .clicked()
                                {
                                    self.illugen_sfx_type = sfx.to_string();
                                    *changed = true;
                                }
                            }
                        });
                }
            });

            let send_label = if loading { "Generating..." } else { "Send to DrumGen" };
            let send = ui.add_enabled(
                !loading && self.draft.can_send(),
                egui::Button::new(send_label).min_size(Vec2::new(ui.available_width(), 34.0)),
            );
            if send.clicked() {
                self.send_prompt(api, ui.ctx());
            }
        });
    }

    fn generation_output_card(&mut self, ui: &mut Ui) {
        ui.group(|ui| {
            egui::CollapsingHeader::new("LLM Output (JSON)")
                .default_open(true)
                .show(ui, |ui| {
                    let pretty = self
                        .draft
                        .llm_json
                        .as_ref()
                        .and_then(|json| serde_json::to_string_pretty(json).ok())
                        .unwrap_or_default();
                    ui.add(
                        TextEdit::multiline(&mut pretty.as_str())
                            .code_editor()
                            .desired_width(f32::INFINITY),
                    );
                });
        });
    }

    fn free_text_tagging_card(&mut self, ui: &mut Ui, now: Instant, changed: &mut bool) {
        let flash = self.drum_type_flash.is_active(now);
        ui.group(|ui| {
            ui.strong("Tag Your Prompt");
            if let PromptMode::FreeText { metadata, .. } = &mut self.draft.mode {
                ui.horizontal(|ui| {
                    ui.label("Drum type *");
                    let stroke = if flash {
                        Stroke::new(2.0, Color32::from_rgb(248, 113, 113))
                    } else {
                        Stroke::NONE
                    };
                    egui::Frame::default().stroke(stroke).show(ui, |ui| {
                        let selected = if metadata.drum_type.is_empty() {
                            "Select drum type...".to_string()
                        } else {
                            metadata.drum_type.clone()
                        };
                        egui::ComboBox::from_id_salt("free_text_drum_type")
                            .selected_text(selected)
                            .show_ui(ui, |ui| {
                                for option in DRUM_TYPE_OPTIONS {
                                    if ui
                                        .selectable_label(metadata.drum_type == *option, *option)
                                        .clicked()
                                    {
                                        metadata.drum_type = option.to_string();
                                        *changed = true;
                                    }
                                }
                            });
                    });
                });
                ui.horizontal(|ui| {
                    ui.label("Difficulty");
                    let response =
                        ui.add(egui::Slider::new(&mut metadata.difficulty, 1..=10));
                    *changed |= response.changed();
                    ui.weak("1 (easy) to 10 (hard)");
                });
            }
        });
    }

    fn notes_card(&mut self, ui: &mut Ui, api: &ApiClient, changed: &mut bool) {
        ui.group(|ui| {
            ui.strong("Notes (optional)");
            let response = ui.add(
                TextEdit::multiline(&mut self.notes)
                    .desired_rows(2)
                    .desired_width(f32::INFINITY)
                    .hint_text("Anything worth remembering about this generation..."),
            );
            *changed |= response.changed();
            ui.horizontal(|ui| {
                let uploading = self.upload_inflight.is_some();
                let attach = ui.add_enabled(!uploading, egui::Button::new("Attach audio file"));
                if attach.clicked() {
                    self.pick_note_audio(api, ui.ctx());
                }
                if let Some(path) = &self.note_audio_path {
                    ui.weak(format!("Attached: {path}"));
                    if ui.small_button("✕").clicked() {
                        self.note_audio_path = None;
                        *changed = true;
                    }
                }
            });
        });
    }

    fn illugen_card(&mut self, ui: &mut Ui, api: &ApiClient, changed: &mut bool) {
        ui.group(|ui| {
            ui.strong("Illugen Comparison");
            if let Some(error) = &self.illugen_error {
                ui.colored_label(Color32::from_rgb(248, 113, 113), error);
            }
            let mut preview: Option<String> = None;
            let mut attach: Option<String> = None;
            for (idx, variation) in self.illugen_variations.iter().enumerate() {
                ui.horizontal(|ui| {
                    let name = variation
                        .filename
                        .as_deref()
                        .unwrap_or(&variation.serve_path);
                    ui.label(format!("Variation {}: {name}", idx + 1));
                    if ui.small_button("Preview").clicked() {
                        let url = variation
                            .url
                            .clone()
                            .unwrap_or_else(|| api.absolute(&variation.serve_path));
                        preview = Some(url);
                    }
                    if ui.small_button("Attach to notes").clicked() {
                        attach = Some(variation.serve_path.clone());
                    }
                });
            }
            if let Some(url) = preview {
                self.variation_preview.set_source(Some(url), api, ui.ctx());
            }
            if let Some(path) = attach {
                if !self.notes.is_empty() && !self.notes.ends_with('\n') {
                    self.notes.push('\n');
                }
                self.notes.push_str(&format!("Illugen variation: {path}"));
                *changed = true;
            }
            if self.variation_preview.source().is_some() {
                self.variation_preview.ui(ui);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cymbal_detection_is_case_insensitive() {
        assert!(is_cymbal("Ride"));
        assert!(is_cymbal("closed hihat"));
        assert!(!is_cymbal("kick"));
        assert!(!is_cymbal("floor tom"));
    }

    #[test]
    fn test_version_label_falls_back_to_raw_value() {
        assert_eq!(version_label("v12"), "V12 (Latest)");
        assert_eq!(version_label("v99"), "v99");
    }

    #[test]
    fn test_restored_draft_rebuilds_rotation_position() {
        let ctx = egui::Context::default();
        let api = ApiClient::new("http://127.0.0.1:9").expect("client");

        let mut session = SessionStore::new();
        let mut draft = TestingDraft::default();
        draft.set_prompt(Prompt {
            id: 33,
            text: "boomy kick".to_string(),
            difficulty: 2,
            drum_type: Some("kick".to_string()),
            category: None,
            used_count: 0,
            is_user_generated: false,
        });
        session.set(PAGE, "draft", &draft);

        let page = TestingPage::new(&api, &session, &ctx);
        // With a prompt restored no initial rotation request is needed, and
        // the next query excludes the restored prompt.
        assert!(page.prompt_inflight.is_none());
        assert_eq!(page.rotation.exclude_id(), Some(33));
    }

    #[test]
    fn test_fresh_page_requests_rotation_start() {
        let ctx = egui::Context::default();
        let api = ApiClient::new("http://127.0.0.1:9").expect("client");
        let session = SessionStore::new();

        let page = TestingPage::new(&api, &session, &ctx);
        assert!(page.prompt_inflight.is_some());
        assert_eq!(page.rotation.exclude_id(), None);
    }

    #[test]
    fn test_scores_restore_from_session() {
        let ctx = egui::Context::default();
        let api = ApiClient::new("http://127.0.0.1:9").expect("client");

        let mut session = SessionStore::new();
        session.set(PAGE, "scores", &(Some(8), None::<i32>));

        let page = TestingPage::new(&api, &session, &ctx);
        assert_eq!(page.generation_score.value(), Some(8));
        assert_eq!(page.llm_score.value(), None);
    }
}

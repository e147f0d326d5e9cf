use std::collections::BTreeMap;
use std::time::Instant;

use eframe::egui::{self, TextEdit, Ui, Vec2};
use scorer_api::{
    ApiClient, GenerateRequest, GenerateResponse, LabelSchema, ModelTestingResultPayload,
    ModelTestingSample, ModelTestingSchema, SamplesResponse,
};
use scorer_core::{
    Debouncer, REGENERATE_QUIET_PERIOD, RequestTracker, SCORE_0_TO_100_BY_10, SessionStore,
    StatusLine,
};
use serde_json::Value;

use crate::fetch::{self, Inflight};
use crate::widgets::{ScoreSlider, WaveformView, status_banner};

const PAGE: &str = "model_testing";
const SAMPLE_BATCH: usize = 50;

const DRUM_KINDS: &[(&str, &str)] = &[
    ("bass_drum", "Bass Drum"),
    ("snare", "Snare"),
    ("low_tom", "Low Tom"),
    ("mid_tom", "Mid Tom"),
    ("high_tom", "High Tom"),
];

fn kind_label(kind: &str) -> &str {
    DRUM_KINDS
        .iter()
        .find(|(value, _)| *value == kind)
        .map(|(_, label)| *label)
        .unwrap_or(kind)
}

/// What the user has picked for one metadata label.
#[derive(Debug, Clone, PartialEq)]
enum LabelSelection {
    Single(String),
    Multi(Vec<String>),
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn to_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(value_to_string)
            .filter(|s| !s.is_empty())
            .collect(),
        Value::Null => Vec::new(),
        other => value_to_string(other)
            .split(',')
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect(),
    }
}

fn case_insensitive_match(candidate: &str, allowed: &[String]) -> Option<String> {
    let lower = candidate.trim().to_lowercase();
    if lower.is_empty() {
        return None;
    }
    allowed
        .iter()
        .find(|option| option.trim().to_lowercase() == lower)
        .cloned()
}

/// Schema options offered for a label. The "quiet" velocity exists in the
/// training data but is not a valid generation target.
fn allowed_options(schema: &LabelSchema, label: &str) -> Vec<String> {
    let options = schema.options(label);
    if label == "Velocity" {
        options.into_iter().filter(|o| o != "quiet").collect()
    } else {
        options
    }
}

fn default_labels(schema: &LabelSchema) -> BTreeMap<String, LabelSelection> {
    schema
        .dictionaries
        .keys()
        .map(|key| {
            let selection = if schema.is_multi_value(key) {
                LabelSelection::Multi(Vec::new())
            } else {
                LabelSelection::Single(String::new())
            };
            (key.clone(), selection)
        })
        .collect()
}

/// Map a sample's stored tags onto the schema's option names, matching
/// case-insensitively and dropping anything the schema does not know.
fn normalize_tags(tags: &Value, schema: &LabelSchema) -> BTreeMap<String, LabelSelection> {
    let mut labels = default_labels(schema);
    for (key, selection) in labels.iter_mut() {
        let allowed = allowed_options(schema, key);
        let Some(raw) = tags.get(key) else { continue };
        match selection {
            LabelSelection::Multi(values) => {
                *values = to_list(raw)
                    .iter()
                    .filter_map(|v| case_insensitive_match(v, &allowed))
                    .collect();
            }
            LabelSelection::Single(value) => {
                if let Some(matched) = case_insensitive_match(&value_to_string(raw), &allowed) {
                    *value = matched;
                }
            }
        }
    }
    labels
}

/// Tags sent to the generator: multi-value labels always go out as arrays,
/// single-value labels only when set.
fn build_request_tags(
    labels: &BTreeMap<String, LabelSelection>,
    schema: &LabelSchema,
) -> serde_json::Map<String, Value> {
    let mut tags = serde_json::Map::new();
    for (key, selection) in labels {
        if !schema.dictionaries.contains_key(key) {
            continue;
        }
        match selection {
            LabelSelection::Multi(values) => {
                tags.insert(
                    key.clone(),
                    Value::Array(values.iter().cloned().map(Value::String).collect()),
                );
            }
            LabelSelection::Single(value) => {
                let trimmed = value.trim();
                if !trimmed.is_empty() {
                    tags.insert(key.clone(), Value::String(trimmed.to_string()));
                }
            }
        }
    }
    tags
}

/// Checked options float to the top, the rest stay alphabetical.
fn sorted_multi_options(options: &[String], selected: &[String]) -> Vec<String> {
    let mut sorted = options.to_vec();
    sorted.sort_by(|a, b| {
        let a_checked = selected.contains(a);
        let b_checked = selected.contains(b);
        b_checked
            .cmp(&a_checked)
            .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
    });
    sorted
}

/// A/B bench for the acoustic model: the source sample on the left, the
/// generated counterpart on the right, a 0-100 score in steps of 10 below.
/// Any control tweak regenerates after a short quiet period.
pub struct ModelTestingPage {
    drum_kind: String,
    schema: Option<ModelTestingSchema>,
    schema_error: Option<String>,
    queue: Vec<ModelTestingSample>,
    index: usize,
    labels: BTreeMap<String, LabelSelection>,
    sliders: BTreeMap<String, f64>,
    temperature: f64,
    width: f64,
    generated: Option<GenerateResponse>,
    score: ScoreSlider,
    notes: String,
    source_view: WaveformView,
    generated_view: WaveformView,
    regenerate: Debouncer,
    status: StatusLine,
    samples_requests: RequestTracker,
    generation_requests: RequestTracker,
    download_requests: RequestTracker,
    schema_inflight: Option<Inflight<ModelTestingSchema>>,
    samples_inflight: Option<Inflight<SamplesResponse>>,
    generate_inflight: Option<Inflight<GenerateResponse>>,
    submit_inflight: Option<Inflight<Value>>,
    download_inflight: Option<Inflight<()>>,
    dirty: bool,
}

impl ModelTestingPage {
    pub fn new(api: &ApiClient, session: &SessionStore, ctx: &egui::Context) -> Self {
        let mut score = ScoreSlider::horizontal_with_arrows(SCORE_0_TO_100_BY_10, 50);
        score.set_value(session.restore(PAGE, "score", 50));

        let mut page = Self {
            drum_kind: session.restore(PAGE, "drum_kind", "bass_drum".to_string()),
            schema: None,
            schema_error: None,
            queue: Vec::new(),
            index: 0,
            labels: BTreeMap::new(),
            sliders: BTreeMap::new(),
            temperature: session.restore(PAGE, "temperature", 1.0),
            width: session.restore(PAGE, "width", 0.5),
            generated: None,
            score,
            notes: session.restore(PAGE, "notes", String::new()),
            source_view: WaveformView::new(false),
            generated_view: WaveformView::new(true),
            regenerate: Debouncer::new(REGENERATE_QUIET_PERIOD),
            status: StatusLine::new(),
            samples_requests: RequestTracker::new(),
            generation_requests: RequestTracker::new(),
            download_requests: RequestTracker::new(),
            schema_inflight: None,
            samples_inflight: None,
            generate_inflight: None,
            submit_inflight: None,
            download_inflight: None,
            dirty: false,
        };
        let schema_api = api.clone();
        page.schema_inflight = Some(fetch::spawn(page.samples_requests.begin(), ctx, move || {
            schema_api.model_testing_schema()
        }));
        page.load_samples(api, ctx);
        page
    }

    fn save_draft(&self, session: &mut SessionStore) {
        session.set(PAGE, "drum_kind", &self.drum_kind);
        session.set(PAGE, "score", &self.score.value().unwrap_or(50));
        session.set(PAGE, "notes", &self.notes);
        session.set(PAGE, "temperature", &self.temperature);
        session.set(PAGE, "width", &self.width);
    }

    pub fn leave(&mut self, session: &mut SessionStore) {
        self.save_draft(session);
        self.source_view.teardown();
        self.generated_view.teardown();
    }

    fn selected_sample(&self) -> Option<&ModelTestingSample> {
        self.queue.get(self.index)
    }

    fn load_samples(&mut self, api: &ApiClient, ctx: &egui::Context) {
        self.status.info("Loading samples...");
        let kind = self.drum_kind.clone();
        let api = api.clone();
        self.samples_inflight = Some(fetch::spawn(self.samples_requests.begin(), ctx, move || {
            api.model_testing_samples(&kind, SAMPLE_BATCH)
        }));
    }

    fn reset_sample_state(&mut self) {
        self.generated = None;
        self.notes.clear();
        self.score.set_value(50);
        self.dirty = true;
    }

    /// Point both players at the freshly selected sample, seed the controls
    /// from its stored tags, and kick off the first generation.
    fn prepare_current_sample(&mut self, api: &ApiClient, ctx: &egui::Context) {
        self.generation_requests.invalidate();
        self.generate_inflight = None;
        self.regenerate.cancel();
        self.temperature = 1.0;
        self.width = 0.5;

        let Some(schema) = &self.schema else { return };
        let Some(sample) = self.queue.get(self.index) else {
            self.source_view.set_source(None, api, ctx);
            self.generated_view.set_source(None, api, ctx);
            return;
        };

        self.sliders = schema
            .conditioning_params
            .iter()
            .map(|name| (name.clone(), 0.0))
            .collect();
        self.labels = normalize_tags(&sample.tags, &schema.label_schema);

        let source_url = api.absolute(&sample.source_audio_proxy_url);
        self.source_view.set_source(Some(source_url), api, ctx);
        self.generated_view.set_source(None, api, ctx);
        self.generate_now(api, ctx);
    }

    fn generate_now(&mut self, api: &ApiClient, ctx: &egui::Context) {
        let Some(schema) = &self.schema else { return };
        let Some(sample) = self.selected_sample() else {
            return;
        };
        let tags = build_request_tags(&self.labels, &schema.label_schema);
        if tags.is_empty() {
            return;
        }
        let request = GenerateRequest {
            sample: sample.model_input().clone(),
            tags: Value::Object(tags),
            temperature: self.temperature,
            width: self.width,
            sliders: self.sliders.clone(),
        };
        self.status.info("Generating acoustic sample...");
        let api = api.clone();
        self.generate_inflight = Some(fetch::spawn(
            self.generation_requests.begin(),
            ctx,
            move || api.model_testing_generate(&request),
        ));
    }

    fn schedule_regenerate(&mut self) {
        self.regenerate.schedule(Instant::now());
    }

    fn advance(&mut self, api: &ApiClient, ctx: &egui::Context) {
        self.reset_sample_state();
        if self.index + 1 < self.queue.len() {
            self.index += 1;
            self.prepare_current_sample(api, ctx);
        } else {
            self.load_samples(api, ctx);
        }
    }

    fn submit(&mut self, api: &ApiClient, ctx: &egui::Context) {
        let (Some(sample), Some(generated)) = (self.selected_sample(), self.generated.as_ref())
        else {
            self.status
                .error("Generate a sample before submitting a score.");
            return;
        };
        let applied_tags = generated.applied_tags.clone().unwrap_or_else(|| {
            let schema = self
                .schema
                .as_ref()
                .map(|s| s.label_schema.clone())
                .unwrap_or_default();
            Value::Object(build_request_tags(&self.labels, &schema))
        });
        let payload = ModelTestingResultPayload {
            source_dataset: sample.dataset.clone(),
            source_filename: sample.filename.clone(),
            source_kind: sample.kind.clone(),
            source_audio_url: sample.source_audio_url.clone(),
            source_metadata: sample.raw_sample.clone(),
            applied_tags,
            generated_audio_id: generated.audio_id.clone(),
            generated_audio_path: generated.audio_file_path.clone(),
            score: self.score.value().unwrap_or(50) as u8,
            notes: {
                let trimmed = self.notes.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            },
        };
        self.status.info("Saving result...");
        let api = api.clone();
        self.submit_inflight = Some(fetch::spawn(self.samples_requests.begin(), ctx, move || {
            api.submit_model_testing_result(&payload)
        }));
    }

    fn download_generated(&mut self, api: &ApiClient, ctx: &egui::Context) {
        let Some(url) = self
            .generated
            .as_ref()
            .and_then(|g| g.audio_url.clone())
        else {
            return;
        };
        let base_name = self
            .selected_sample()
            .map(|s| s.filename.trim_end_matches(".wav").to_string())
            .unwrap_or_else(|| "generated_sample".to_string());
        let Some(path) = rfd::FileDialog::new()
            .add_filter("WAV audio", &["wav"])
            .set_file_name(format!("{base_name}_generated.wav"))
            .save_file()
        else {
            return;
        };
        let api = api.clone();
        self.download_inflight = Some(fetch::spawn(
            self.download_requests.begin(),
            ctx,
            move || {
                let bytes = api.fetch_audio(&url)?;
                std::fs::write(&path, bytes)
                    .map_err(|err| scorer_api::ApiError::Service(err.to_string()))
            },
        ));
    }

    fn poll(&mut self, api: &ApiClient, ctx: &egui::Context) {
        if let Some((_, result)) = fetch::take_completed(&mut self.schema_inflight) {
            match result {
                Ok(schema) => {
                    self.schema = Some(schema);
                    self.schema_error = None;
                    self.prepare_current_sample(api, ctx);
                }
                Err(err) => self.schema_error = Some(err.to_string()),
            }
        }

        if let Some((ticket, result)) = fetch::take_completed(&mut self.samples_inflight) {
            // A drum-kind change mid-request supersedes this batch.
            if self.samples_requests.is_current(ticket) {
                match result {
                    Ok(response) => {
                        self.queue = response.samples;
                        self.index = 0;
                        self.reset_sample_state();
                        if self.queue.is_empty() {
                            let message = response.message.unwrap_or_else(|| {
                                "No unused samples left for selected kind.".to_string()
                            });
                            self.status.info(message);
                            self.source_view.set_source(None, api, ctx);
                            self.generated_view.set_source(None, api, ctx);
                        } else {
                            if self.queue.len() < SAMPLE_BATCH {
                                self.status.info(format!(
                                    "Only {} unused samples left for selected kind.",
                                    self.queue.len()
                                ));
                            } else {
                                self.status.clear();
                            }
                            self.prepare_current_sample(api, ctx);
                        }
                    }
                    Err(err) => self.status.error(format!("Error loading samples: {err}")),
                }
            }
        }

        if let Some((ticket, result)) = fetch::take_completed(&mut self.generate_inflight) {
            if self.generation_requests.is_current(ticket) {
                match result {
                    Ok(response) => {
                        let url = response.audio_url.as_ref().map(|u| api.absolute(u));
                        self.generated = Some(response);
                        self.generated_view.set_source(url, api, ctx);
                        self.status.success("Generated sample ready", Instant::now());
                    }
                    Err(err) => self.status.error(format!("Generation failed: {err}")),
                }
            }
        }

        if let Some((_, result)) = fetch::take_completed(&mut self.submit_inflight) {
            match result {
                Ok(_) => {
                    self.status.success("Result saved", Instant::now());
                    self.advance(api, ctx);
                }
                Err(err) => self.status.error(format!("Failed to save result: {err}")),
            }
        }

        if let Some((_, result)) = fetch::take_completed(&mut self.download_inflight) {
            match result {
                Ok(()) => self.status.success("Saved generated WAV", Instant::now()),
                Err(err) => self.status.error(format!("Download failed: {err}")),
            }
        }

        // Debounced regeneration: the most recent tweak wins.
        if self.regenerate.fire(Instant::now()) {
            self.generate_now(api, ctx);
        }
        if let Some(remaining) = self.regenerate.time_until_fire(Instant::now()) {
            ctx.request_repaint_after(remaining);
        }

        self.source_view.poll(ctx);
        self.generated_view.poll(ctx);
    }

    pub fn ui(&mut self, ui: &mut Ui, api: &ApiClient, session: &mut SessionStore) {
        self.poll(api, ui.ctx());
        let generating = self.generate_inflight.is_some() || self.regenerate.is_pending();
        let busy = self.samples_inflight.is_some() || self.submit_inflight.is_some();
        let mut changed = false;
        let mut tweaked = false;

        ui.horizontal(|ui| {
            ui.heading("Model Testing (Acoustic)");
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.weak(if self.queue.is_empty() {
                    "Sample - / -".to_string()
                } else {
                    format!("Sample {} / {}", self.index + 1, self.queue.len())
                });
                egui::ComboBox::from_id_salt("model_testing_kind")
                    .selected_text(kind_label(&self.drum_kind))
                    .show_ui(ui, |ui| {
                        for (value, label) in DRUM_KINDS {
                            if ui
                                .selectable_label(self.drum_kind == *value, *label)
                                .clicked()
                                && self.drum_kind != *value
                            {
                                self.drum_kind = value.to_string();
                                changed = true;
                                self.load_samples(api, ui.ctx());
                            }
                        }
                    });
                ui.label("Drum type:");
            });
        });
        ui.add_space(8.0);

        ui.columns(2, |columns| {
            columns[0].group(|ui| {
                ui.strong("Original Database Sample");
                self.source_view.ui(ui);
                if let Some(sample) = self.queue.get(self.index) {
                    ui.weak(format!(
                        "{} | {}",
                        sample.kind.as_deref().unwrap_or("-"),
                        sample.filename
                    ));
                    egui::CollapsingHeader::new("Source JSON").show(ui, |ui| {
                        let pretty = serde_json::to_string_pretty(sample.model_input())
                            .unwrap_or_default();
                        ui.add(
                            TextEdit::multiline(&mut pretty.as_str())
                                .code_editor()
                                .desired_width(f32::INFINITY),
                        );
                    });
                } else {
                    ui.weak("No sample loaded");
                }
            });
            columns[1].group(|ui| {
                ui.strong("Generated Sample");
                if self.generated.is_some() {
                    self.generated_view.ui(ui);
                } else if generating {
                    ui.weak("Generating audio...");
                } else {
                    ui.weak("Generate audio to preview it here.");
                }
                ui.horizontal(|ui| {
                    let can_generate = self.selected_sample().is_some() && self.schema.is_some();
                    let regen = ui.add_enabled(
                        can_generate && !generating,
                        egui::Button::new(if generating { "Generating..." } else { "Regenerate" }),
                    );
                    if regen.clicked() {
                        self.generate_now(api, ui.ctx());
                    }
                    let save = ui.add_enabled(
                        self.generated.as_ref().is_some_and(|g| g.audio_url.is_some()),
                        egui::Button::new("Save WAV"),
                    );
                    if save.clicked() {
                        self.download_generated(api, ui.ctx());
                    }
                });
            });
        });

        ui.add_space(8.0);
        ui.vertical_centered(|ui| {
            changed |= self.score.ui(ui, "Generation Score", false);
            ui.add_space(4.0);
            ui.horizontal(|ui| {
                let submit = ui.add_enabled(
                    !busy && !generating && self.generated.is_some(),
                    egui::Button::new("Submit Score").min_size(Vec2::new(170.0, 30.0)),
                );
                if submit.clicked() {
                    self.submit(api, ui.ctx());
                }
                let skip = ui.add_enabled(!busy && !generating, egui::Button::new("Skip Sample"));
                if skip.clicked() {
                    self.advance(api, ui.ctx());
                }
            });
        });

        ui.add_space(4.0);
        ui.label("Notes (optional)");
        let notes = ui.add(
            TextEdit::multiline(&mut self.notes)
                .desired_rows(2)
                .desired_width(f32::INFINITY)
                .hint_text("Add notes about the generated sample..."),
        );
        changed |= notes.changed();

        ui.add_space(8.0);
        self.advanced_controls(ui, &mut tweaked);

        if tweaked {
            self.schedule_regenerate();
            changed = true;
        }

        ui.add_space(8.0);
        status_banner(ui, &mut self.status);

        if changed || self.dirty {
            self.save_draft(session);
            self.dirty = false;
        }
    }

    fn advanced_controls(&mut self, ui: &mut Ui, tweaked: &mut bool) {
        egui::CollapsingHeader::new("Advanced Model Controls").show(ui, |ui| {
            if self.schema_inflight.is_some() {
                ui.weak("Loading model schema...");
                return;
            }
            if let Some(error) = &self.schema_error {
                ui.colored_label(egui::Color32::from_rgb(248, 113, 113), error);
                return;
            }
            let Some(schema) = self.schema.clone() else {
                return;
            };

            ui.horizontal(|ui| {
                if ui.button("Clear All").clicked() {
                    self.labels = default_labels(&schema.label_schema);
                    self.sliders = schema
                        .conditioning_params
                        .iter()
                        .map(|name| (name.clone(), 0.0))
                        .collect();
                    self.temperature = 1.0;
                    self.width = 0.5;
                    *tweaked = true;
                }
                ui.weak("Any tweak regenerates after a short pause");
            });

            ui.add_space(6.0);
            ui.horizontal(|ui| {
                ui.label("Temperature");
                let temp = ui.add(
                    egui::Slider::new(&mut self.temperature, 0.0..=10.0).fixed_decimals(1),
                );
                *tweaked |= temp.changed();
                ui.add_space(16.0);
                ui.label("Stereo width");
                let width =
                    ui.add(egui::Slider::new(&mut self.width, 0.0..=1.0).fixed_decimals(2));
                *tweaked |= width.changed();
            });

            if !schema.conditioning_params.is_empty() {
                ui.add_space(6.0);
                ui.strong("Conditioning");
                ui.horizontal_wrapped(|ui| {
                    for name in &schema.conditioning_params {
                        if let Some(value) = self.sliders.get_mut(name) {
                            ui.vertical(|ui| {
                                ui.weak(name);
                                let slider = ui.add(
                                    egui::Slider::new(value, -1.0..=1.0).fixed_decimals(2),
                                );
                                *tweaked |= slider.changed();
                            });
                        }
                    }
                });
            }

            ui.add_space(6.0);
            ui.strong("Label Metadata");
            for (key, selection) in self.labels.iter_mut() {
                let options = allowed_options(&schema.label_schema, key);
                match selection {
                    LabelSelection::Multi(values) => {
                        ui.weak(key);
                        egui::ScrollArea::vertical()
                            .id_salt(format!("multi_{key}"))
                            .max_height(140.0)
                            .show(ui, |ui| {
                                for option in sorted_multi_options(&options, values) {
                                    let mut checked = values.contains(&option);
                                    if ui.checkbox(&mut checked, &option).changed() {
                                        if checked {
                                            values.push(option);
                                        } else {
                                            values.retain(|v| v != &option);
                                        }
                                        *tweaked = true;
                                    }
                                }
                            });
                    }
                    LabelSelection::Single(value) => {
                        ui.horizontal(|ui| {
                            ui.weak(key);
                            egui::ComboBox::from_id_salt(format!("single_{key}"))
                                .selected_text(if value.is_empty() {
                                    "(not set)".to_string()
                                } else {
                                    value.clone()
                                })
                                .show_ui(ui, |ui| {
                                    if ui.selectable_label(value.is_empty(), "(not set)").clicked()
                                    {
                                        value.clear();
                                        *tweaked = true;
                                    }
                                    for option in &options {
                                        if ui
                                            .selectable_label(*value == **option, option)
                                            .clicked()
                                        {
                                            *value = option.clone();
                                            *tweaked = true;
                                        }
                                    }
                                });
                        });
                    }
                }
            }

            ui.add_space(6.0);
            egui::CollapsingHeader::new("Current Model Payload").show(ui, |ui| {
                let payload = serde_json::json!({
                    "tags": Value::Object(build_request_tags(&self.labels, &schema.label_schema)),
                    "sliders": self.sliders,
                    "temperature": self.temperature,
                    "width": self.width,
                });
                let pretty = serde_json::to_string_pretty(&payload).unwrap_or_default();
                ui.add(
                    TextEdit::multiline(&mut pretty.as_str())
                        .code_editor()
                        .desired_width(f32::INFINITY),
                );
            });
        });
    }
}

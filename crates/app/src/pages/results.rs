use std::collections::HashMap;
use std::time::Instant;

use eframe::egui::{self, Align2, Color32, RichText, TextEdit, Ui, Vec2};
use scorer_api::{ApiClient, Prompt, ResultUpdate, ResultsQuery, TestResult};
use scorer_core::{RequestTracker, SCORE_0_TO_10, StatusLine};

use crate::fetch::{self, Inflight};
use crate::pages::distinct_drum_types;
use crate::widgets::{ScoreSlider, WaveformView, status_banner};

const RESULT_VERSIONS: &[&str] = &["v11", "v12", "v13", "v14"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SortColumn {
    Id,
    Prompt,
    DrumType,
    Difficulty,
    Version,
    AudioScore,
    LlmScore,
    TestedAt,
}

impl SortColumn {
    fn title(self) -> &'static str {
        match self {
            SortColumn::Id => "ID",
            SortColumn::Prompt => "Prompt",
            SortColumn::DrumType => "Drum",
            SortColumn::Difficulty => "Diff",
            SortColumn::Version => "Version",
            SortColumn::AudioScore => "Gen Score",
            SortColumn::LlmScore => "LLM Score",
            SortColumn::TestedAt => "Date",
        }
    }
}

const COLUMNS: &[SortColumn] = &[
    SortColumn::Id,
    SortColumn::Prompt,
    SortColumn::DrumType,
    SortColumn::Difficulty,
    SortColumn::Version,
    SortColumn::AudioScore,
    SortColumn::LlmScore,
    SortColumn::TestedAt,
];

fn sort_results(
    results: &mut [TestResult],
    prompts: &HashMap<i64, Prompt>,
    column: SortColumn,
    ascending: bool,
) {
    let prompt_of = |r: &TestResult| r.prompt_id.and_then(|id| prompts.get(&id));
    results.sort_by(|a, b| {
        let ord = match column {
            SortColumn::Id => a.id.cmp(&b.id),
            SortColumn::Prompt => {
                let a_text = prompt_of(a).map(|p| p.text.as_str()).unwrap_or("");
                let b_text = prompt_of(b).map(|p| p.text.as_str()).unwrap_or("");
                a_text.cmp(b_text)
            }
            SortColumn::DrumType => {
                let a_type = prompt_of(a).and_then(|p| p.drum_type.as_deref()).unwrap_or("");
                let b_type = prompt_of(b).and_then(|p| p.drum_type.as_deref()).unwrap_or("");
                a_type.cmp(b_type)
            }
            SortColumn::Difficulty => {
                let a_diff = prompt_of(a).map(|p| p.difficulty).unwrap_or(0);
                let b_diff = prompt_of(b).map(|p| p.difficulty).unwrap_or(0);
                a_diff.cmp(&b_diff)
            }
            SortColumn::Version => {
                let a_version = a.model_version.as_deref().unwrap_or("");
                let b_version = b.model_version.as_deref().unwrap_or("");
                a_version.cmp(b_version)
            }
            SortColumn::AudioScore => a.audio_quality_score.cmp(&b.audio_quality_score),
            SortColumn::LlmScore => a.llm_accuracy_score.cmp(&b.llm_accuracy_score),
            SortColumn::TestedAt => a.tested_at.cmp(&b.tested_at),
        };
        if ascending { ord } else { ord.reverse() }
    });
}

struct ResultEdit {
    audio_quality: ScoreSlider,
    llm_accuracy: ScoreSlider,
    notes: String,
}

impl ResultEdit {
    fn for_result(result: &TestResult) -> Self {
        let mut audio_quality = ScoreSlider::vertical(SCORE_0_TO_10);
        audio_quality.set_value(result.audio_quality_score as i32);
        let mut llm_accuracy = ScoreSlider::vertical(SCORE_0_TO_10);
        llm_accuracy.set_value(result.llm_accuracy_score as i32);
        Self {
            audio_quality,
            llm_accuracy,
            notes: result.notes.clone().unwrap_or_default(),
        }
    }
}

/// Browsable table of submitted results. Filtering happens server-side via
/// query params; prompts referenced by rows are resolved with follow-up GETs.
pub struct ResultsPage {
    filter: ResultsQuery,
    available_drum_types: Vec<String>,
    results: Vec<TestResult>,
    prompts: HashMap<i64, Prompt>,
    sort_column: SortColumn,
    sort_ascending: bool,
    selected: Option<TestResult>,
    edit: Option<ResultEdit>,
    confirm_delete: bool,
    detail_audio: WaveformView,
    status: StatusLine,
    results_requests: RequestTracker,
    write_requests: RequestTracker,
    results_inflight: Option<Inflight<Vec<TestResult>>>,
    prompts_inflight: Option<Inflight<HashMap<i64, Prompt>>>,
    types_inflight: Option<Inflight<Vec<String>>>,
    update_inflight: Option<Inflight<TestResult>>,
    delete_inflight: Option<Inflight<()>>,
}

impl ResultsPage {
    pub fn new(api: &ApiClient, filter: Option<ResultsQuery>, ctx: &egui::Context) -> Self {
        let mut page = Self {
            filter: filter.unwrap_or_default(),
            available_drum_types: Vec::new(),
            results: Vec::new(),
            prompts: HashMap::new(),
            sort_column: SortColumn::TestedAt,
            sort_ascending: true,
            selected: None,
            edit: None,
            confirm_delete: false,
            detail_audio: WaveformView::new(false),
            status: StatusLine::new(),
            results_requests: RequestTracker::new(),
            write_requests: RequestTracker::new(),
            results_inflight: None,
            prompts_inflight: None,
            types_inflight: None,
            update_inflight: None,
            delete_inflight: None,
        };
        page.load_drum_types(api, ctx);
        page.reload(api, ctx);
        page
    }

    pub fn leave(&mut self) {
        self.detail_audio.teardown();
    }

    /// Query issued for the current filter selection.
    fn query(&self) -> ResultsQuery {
        self.filter.clone()
    }

    fn load_drum_types(&mut self, api: &ApiClient, ctx: &egui::Context) {
        let api = api.clone();
        self.types_inflight = Some(fetch::spawn(self.results_requests.begin(), ctx, move || {
            let prompts = api.list_prompts(5000)?;
            Ok(distinct_drum_types(&prompts))
        }));
    }

    fn reload(&mut self, api: &ApiClient, ctx: &egui::Context) {
        let query = self.query();
        let api = api.clone();
        self.prompts_inflight = None;
        self.results_inflight = Some(fetch::spawn(self.results_requests.begin(), ctx, move || {
            api.list_results(&query)
        }));
    }

    fn resolve_prompts(&mut self, api: &ApiClient, ctx: &egui::Context) {
        let mut ids: Vec<i64> = self.results.iter().filter_map(|r| r.prompt_id).collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.is_empty() {
            return;
        }
        let api = api.clone();
        self.prompts_inflight = Some(fetch::spawn(self.results_requests.begin(), ctx, move || {
            let mut map = HashMap::new();
            for id in ids {
                match api.get_prompt(id) {
                    Ok(prompt) => {
                        map.insert(id, prompt);
                    }
                    Err(err) => tracing::debug!(id, %err, "prompt lookup failed"),
                }
            }
            Ok(map)
        }));
    }

    fn close_detail(&mut self, api: &ApiClient, ctx: &egui::Context) {
        self.selected = None;
        self.edit = None;
        self.confirm_delete = false;
        self.detail_audio.set_source(None, api, ctx);
    }

    fn poll(&mut self, api: &ApiClient, ctx: &egui::Context) {
        if let Some((ticket, result)) = fetch::take_completed(&mut self.results_inflight) {
            // Only the most recent filter selection's response is applied.
            if self.results_requests.is_current(ticket) {
                match result {
                    Ok(results) => {
                        self.results = results;
                        sort_results(
                            &mut self.results,
                            &self.prompts,
                            self.sort_column,
                            self.sort_ascending,
                        );
                        self.resolve_prompts(api, ctx);
                    }
                    Err(err) => self.status.error(format!("Failed to load results: {err}")),
                }
            }
        }
        if let Some((ticket, result)) = fetch::take_completed(&mut self.prompts_inflight) {
            if self.results_requests.is_current(ticket) {
                if let Ok(prompts) = result {
                    self.prompts = prompts;
                    sort_results(
                        &mut self.results,
                        &self.prompts,
                        self.sort_column,
                        self.sort_ascending,
                    );
                }
            }
        }
        if let Some((_, result)) = fetch::take_completed(&mut self.types_inflight) {
            if let Ok(types) = result {
                self.available_drum_types = types;
            }
        }
        if let Some((_, result)) = fetch::take_completed(&mut self.update_inflight) {
            match result {
                Ok(_) => {
                    self.status.success("Changes saved", Instant::now());
                    self.close_detail(api, ctx);
                    self.reload(api, ctx);
                }
                Err(err) => self.status.error(format!("Failed to save changes: {err}")),
            }
        }
        if let Some((_, result)) = fetch::take_completed(&mut self.delete_inflight) {
            match result {
                Ok(()) => {
                    self.status.success("Result deleted", Instant::now());
                    self.close_detail(api, ctx);
                    self.reload(api, ctx);
                }
                Err(err) => self.status.error(format!("Failed to delete result: {err}")),
            }
        }
        self.detail_audio.poll(ctx);
    }

    pub fn ui(&mut self, ui: &mut Ui, api: &ApiClient) {
        self.poll(api, ui.ctx());

        ui.heading("Test Results");
        ui.add_space(8.0);

        if self.filters_ui(ui) {
            self.reload(api, ui.ctx());
        }

        ui.add_space(8.0);
        self.table_ui(ui, api);

        if self.selected.is_some() {
            self.detail_window(ui, api);
        }

        ui.add_space(8.0);
        status_banner(ui, &mut self.status);
    }

    /// Returns true when any filter changed and results must be reloaded.
    fn filters_ui(&mut self, ui: &mut Ui) -> bool {
        let mut changed = false;
        ui.group(|ui| {
            ui.horizontal(|ui| {
                ui.label("Drum type");
                egui::ComboBox::from_id_salt("results_drum_type")
                    .selected_text(self.filter.drum_type.as_deref().unwrap_or("All"))
                    .show_ui(ui, |ui| {
                        if ui
                            .selectable_label(self.filter.drum_type.is_none(), "All")
                            .clicked()
                        {
                            self.filter.drum_type = None;
                            changed = true;
                        }
                        for drum_type in &self.available_drum_types {
                            let selected =
                                self.filter.drum_type.as_deref() == Some(drum_type.as_str());
                            if ui.selectable_label(selected, drum_type).clicked() {
                                self.filter.drum_type = Some(drum_type.clone());
                                changed = true;
                            }
                        }
                    });

                ui.label("Difficulty");
                egui::ComboBox::from_id_salt("results_difficulty")
                    .selected_text(
                        self.filter
                            .difficulty
                            .map(|d| d.to_string())
                            .unwrap_or_else(|| "All".to_string()),
                    )
                    .show_ui(ui, |ui| {
                        if ui
                            .selectable_label(self.filter.difficulty.is_none(), "All")
                            .clicked()
                        {
                            self.filter.difficulty = None;
                            changed = true;
                        }
                        for difficulty in 1..=10u8 {
                            let selected = self.filter.difficulty == Some(difficulty);
                            if ui
                                .selectable_label(selected, difficulty.to_string())
                                .clicked()
                            {
                                self.filter.difficulty = Some(difficulty);
                                changed = true;
                            }
                        }
                    });

                ui.label("Model version");
                egui::ComboBox::from_id_salt("results_version")
                    .selected_text(
                        self.filter
                            .model_version
                            .as_deref()
                            .map(str::to_uppercase)
                            .unwrap_or_else(|| "All".to_string()),
                    )
                    .show_ui(ui, |ui| {
                        if ui
                            .selectable_label(self.filter.model_version.is_none(), "All")
                            .clicked()
                        {
                            self.filter.model_version = None;
                            changed = true;
                        }
                        for version in RESULT_VERSIONS {
                            let selected =
                                self.filter.model_version.as_deref() == Some(*version);
                            if ui
                                .selectable_label(selected, version.to_uppercase())
                                .clicked()
                            {
                                self.filter.model_version = Some(version.to_string());
                                changed = true;
                            }
                        }
                    });

                ui.label("Generation score");
                egui::ComboBox::from_id_salt("results_audio_score")
                    .selected_text(
                        self.filter
                            .audio_quality_score
                            .map(|s| s.to_string())
                            .unwrap_or_else(|| "All".to_string()),
                    )
                    .show_ui(ui, |ui| {
                        if ui
                            .selectable_label(self.filter.audio_quality_score.is_none(), "All")
                            .clicked()
                        {
                            self.filter.audio_quality_score = None;
                            changed = true;
                        }
                        for score in 1..=10u8 {
                            let selected = self.filter.audio_quality_score == Some(score);
                            if ui.selectable_label(selected, score.to_string()).clicked() {
                                self.filter.audio_quality_score = Some(score);
                                changed = true;
                            }
                        }
                    });
            });
        });
        changed
    }

    fn table_ui(&mut self, ui: &mut Ui, api: &ApiClient) {
        let mut resort = false;
        let mut open: Option<TestResult> = None;

        ui.group(|ui| {
            egui::Grid::new("results_table")
                .striped(true)
                .num_columns(COLUMNS.len() + 1)
                .min_col_width(60.0)
                .show(ui, |ui| {
                    for column in COLUMNS {
                        let arrow = if self.sort_column == *column {
                            if self.sort_ascending { " ↑" } else { " ↓" }
                        } else {
                            ""
                        };
                        if ui
                            .button(RichText::new(format!("{}{arrow}", column.title())).strong())
                            .clicked()
                        {
                            if self.sort_column == *column {
                                self.sort_ascending = !self.sort_ascending;
                            } else {
                                self.sort_column = *column;
                                self.sort_ascending = true;
                            }
                            resort = true;
                        }
                    }
                    ui.label("");
                    ui.end_row();

                    if self.results.is_empty() {
                        ui.weak("No results found. Start testing to see results here!");
                        ui.end_row();
                    }

                    for result in &self.results {
                        let prompt = result.prompt_id.and_then(|id| self.prompts.get(&id));
                        ui.label(format!("#{}", result.id));
                        let text = prompt.map(|p| p.text.as_str()).unwrap_or("...");
                        ui.label(truncated(text, 48));
                        ui.label(prompt.and_then(|p| p.drum_type.as_deref()).unwrap_or("-"));
                        ui.label(
                            prompt
                                .map(|p| p.difficulty.to_string())
                                .unwrap_or_else(|| "-".to_string()),
                        );
                        ui.label(
                            result
                                .model_version
                                .as_deref()
                                .map(str::to_uppercase)
                                .unwrap_or_else(|| "-".to_string()),
                        );
                        ui.colored_label(
                            Color32::from_rgb(52, 211, 153),
                            result.audio_quality_score.to_string(),
                        );
                        ui.colored_label(
                            Color32::from_rgb(96, 165, 250),
                            result.llm_accuracy_score.to_string(),
                        );
                        ui.weak(result.tested_at.format("%Y-%m-%d %H:%M").to_string());
                        if ui.small_button("View").clicked() {
                            open = Some(result.clone());
                        }
                        ui.end_row();
                    }
                });
        });

        if resort {
            sort_results(
                &mut self.results,
                &self.prompts,
                self.sort_column,
                self.sort_ascending,
            );
        }
        if let Some(result) = open {
            self.edit = None;
            self.confirm_delete = false;
            let source = result
                .audio_id
                .as_deref()
                .map(|id| format!("/api/audio/{id}"));
            self.detail_audio.set_source(source, api, ui.ctx());
            self.selected = Some(result);
        }
    }

    fn detail_window(&mut self, ui: &mut Ui, api: &ApiClient) {
        let Some(selected) = self.selected.clone() else {
            return;
        };
        let mut close = false;
        let mut save = false;
        let mut delete = false;

        egui::Window::new(format!("Result #{}", selected.id))
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, Vec2::ZERO)
            .show(ui.ctx(), |ui| {
                ui.set_width(560.0);

                let prompt = selected.prompt_id.and_then(|id| self.prompts.get(&id));
                egui::Frame::group(ui.style()).show(ui, |ui| {
                    ui.label(prompt.map(|p| p.text.as_str()).unwrap_or("Free text prompt"));
                    ui.horizontal(|ui| {
                        ui.weak(format!(
                            "Drum: {}",
                            prompt.and_then(|p| p.drum_type.as_deref()).unwrap_or("-")
                        ));
                        ui.weak(format!(
                            "Difficulty: {}",
                            prompt
                                .map(|p| p.difficulty.to_string())
                                .unwrap_or_else(|| "-".to_string())
                        ));
                        ui.weak(format!(
                            "Version: {}",
                            selected
                                .model_version
                                .as_deref()
                                .map(str::to_uppercase)
                                .unwrap_or_else(|| "-".to_string())
                        ));
                    });
                });

                if selected.audio_id.is_some() {
                    ui.add_space(6.0);
                    self.detail_audio.ui(ui);
                }

                ui.add_space(6.0);
                if let Some(edit) = &mut self.edit {
                    ui.horizontal(|ui| {
                        edit.audio_quality.ui(ui, "Generation score", false);
                        ui.add_space(16.0);
                        edit.llm_accuracy.ui(ui, "LLM score", false);
                    });
                    ui.label("Notes:");
                    ui.add(
                        TextEdit::multiline(&mut edit.notes)
                            .desired_rows(3)
                            .desired_width(f32::INFINITY),
                    );
                } else {
                    ui.horizontal(|ui| {
                        ui.label("Generation score:");
                        ui.strong(format!("{}/10", selected.audio_quality_score));
                        ui.add_space(16.0);
                        ui.label("LLM score:");
                        ui.strong(format!("{}/10", selected.llm_accuracy_score));
                    });
                    if let Some(notes) = &selected.notes {
                        ui.add_space(4.0);
                        ui.weak(format!("Notes: {notes}"));
                    }
                }

                if let Some(llm_response) = &selected.llm_response {
                    ui.add_space(6.0);
                    egui::CollapsingHeader::new("LLM Response").show(ui, |ui| {
                        ui.add(
                            TextEdit::multiline(&mut llm_response.as_str())
                                .code_editor()
                                .desired_width(f32::INFINITY),
                        );
                    });
                }

                ui.add_space(10.0);
                ui.separator();
                ui.horizontal(|ui| {
                    if self.edit.is_some() {
                        if ui.button("Save Changes").clicked() {
                            save = true;
                        }
                        if ui.button("Cancel").clicked() {
                            self.edit = None;
                        }
                    } else {
                        if ui.button("Edit Scores").clicked() {
                            self.edit = Some(ResultEdit::for_result(&selected));
                            self.confirm_delete = false;
                        }
                        if self.confirm_delete {
                            ui.colored_label(Color32::from_rgb(248, 113, 113), "Delete result?");
                            if ui.button("Confirm").clicked() {
                                delete = true;
                            }
                            if ui.button("Keep").clicked() {
                                self.confirm_delete = false;
                            }
                        } else if ui.button("Delete").clicked() {
                            self.confirm_delete = true;
                        }
                    }
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button("Close").clicked() {
                            close = true;
                        }
                    });
                });
            });

        if save {
            if let Some(edit) = &self.edit {
                let update = ResultUpdate {
                    audio_quality_score: edit.audio_quality.value().unwrap_or(0) as u8,
                    llm_accuracy_score: edit.llm_accuracy.value().unwrap_or(0) as u8,
                    notes: {
                        let trimmed = edit.notes.trim();
                        (!trimmed.is_empty()).then(|| trimmed.to_string())
                    },
                };
                let id = selected.id;
                let api_clone = api.clone();
                self.update_inflight = Some(fetch::spawn(
                    self.write_requests.begin(),
                    ui.ctx(),
                    move || api_clone.update_result(id, &update),
                ));
            }
        }
        if delete {
            let id = selected.id;
            let api_clone = api.clone();
            self.delete_inflight = Some(fetch::spawn(
                self.write_requests.begin(),
                ui.ctx(),
                move || api_clone.delete_result(id),
            ));
        }
        if close {
            self.close_detail(api, ui.ctx());
        }
    }
}

fn truncated(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{cut}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn result(id: i64, prompt_id: Option<i64>, audio: u8, day: u32) -> TestResult {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "prompt_id": prompt_id,
            "audio_quality_score": audio,
            "llm_accuracy_score": 5,
            "model_version": "v12",
            "tested_at": NaiveDate::from_ymd_opt(2025, 6, day)
                .expect("date")
                .and_hms_opt(12, 0, 0)
                .expect("time"),
        }))
        .expect("result")
    }

    fn prompt(id: i64, text: &str, drum_type: &str) -> Prompt {
        Prompt {
            id,
            text: text.to_string(),
            difficulty: 5,
            drum_type: Some(drum_type.to_string()),
            category: None,
            used_count: 0,
            is_user_generated: false,
        }
    }

    #[test]
    fn test_navigation_filter_seeds_query_params() {
        let ctx = egui::Context::default();
        let api = ApiClient::new("http://127.0.0.1:9").expect("client");
        let filter = ResultsQuery {
            drum_type: Some("snare".to_string()),
            audio_quality_score: Some(7),
            ..Default::default()
        };

        let page = ResultsPage::new(&api, Some(filter), &ctx);
        assert_eq!(page.filter.drum_type.as_deref(), Some("snare"));
        assert_eq!(page.filter.audio_quality_score, Some(7));

        let params = page.query().params();
        assert!(params.contains(&("drum_type", "snare".to_string())));
        assert!(params.contains(&("audio_quality_score", "7".to_string())));
    }

    #[test]
    fn test_no_navigation_state_means_unfiltered_query() {
        let ctx = egui::Context::default();
        let api = ApiClient::new("http://127.0.0.1:9").expect("client");
        let page = ResultsPage::new(&api, None, &ctx);
        assert!(page.query().params().is_empty());
    }

    #[test]
    fn test_sort_by_audio_score_descending() {
        let prompts = HashMap::new();
        let mut results = vec![
            result(1, None, 3, 1),
            result(2, None, 9, 2),
            result(3, None, 6, 3),
        ];
        sort_results(&mut results, &prompts, SortColumn::AudioScore, false);
        let scores: Vec<u8> = results.iter().map(|r| r.audio_quality_score).collect();
        assert_eq!(scores, vec![9, 6, 3]);
    }

    #[test]
    fn test_sort_by_prompt_text_uses_resolved_prompts() {
        let mut prompts = HashMap::new();
        prompts.insert(10, prompt(10, "zesty snare", "snare"));
        prompts.insert(20, prompt(20, "airy kick", "kick"));
        let mut results = vec![result(1, Some(10), 5, 1), result(2, Some(20), 5, 2)];

        sort_results(&mut results, &prompts, SortColumn::Prompt, true);
        assert_eq!(results[0].id, 2);

        sort_results(&mut results, &prompts, SortColumn::Prompt, false);
        assert_eq!(results[0].id, 1);
    }

    #[test]
    fn test_sort_unresolved_prompts_sort_first_ascending() {
        let mut prompts = HashMap::new();
        prompts.insert(10, prompt(10, "big tom", "tom"));
        let mut results = vec![result(1, Some(10), 5, 1), result(2, None, 5, 2)];
        sort_results(&mut results, &prompts, SortColumn::Prompt, true);
        assert_eq!(results[0].id, 2);
    }

    #[test]
    fn test_truncated_keeps_short_text_intact() {
        assert_eq!(truncated("short", 10), "short");
        assert_eq!(truncated("abcdefghij", 4), "abcd…");
    }
}

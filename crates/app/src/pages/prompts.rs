use std::time::Instant;

use eframe::egui::{self, Align2, Color32, RichText, TextEdit, Ui, Vec2};
use scorer_api::{ApiClient, Prompt, PromptUpdate};
use scorer_core::{RequestTracker, StatusLine};

use crate::fetch::{self, Inflight};
use crate::pages::distinct_drum_types;
use crate::widgets::status_banner;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceFilter {
    All,
    PreGenerated,
    UserGenerated,
}

impl SourceFilter {
    fn matches(self, prompt: &Prompt) -> bool {
        match self {
            SourceFilter::All => true,
            SourceFilter::PreGenerated => !prompt.is_user_generated,
            SourceFilter::UserGenerated => prompt.is_user_generated,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PromptSort {
    UsedCount,
    Difficulty,
    DrumType,
}

impl PromptSort {
    fn title(self) -> &'static str {
        match self {
            PromptSort::UsedCount => "Times Used",
            PromptSort::Difficulty => "Difficulty",
            PromptSort::DrumType => "Drum Type",
        }
    }
}

/// Indices of the prompts that pass the filters, in display order. Most-used
/// first when sorting by use count, otherwise ascending.
fn filtered_indices(
    prompts: &[Prompt],
    search: &str,
    difficulty: Option<u8>,
    drum_type: Option<&str>,
    source: SourceFilter,
    sort: PromptSort,
) -> Vec<usize> {
    let needle = search.trim().to_lowercase();
    let mut indices: Vec<usize> = prompts
        .iter()
        .enumerate()
        .filter(|(_, p)| {
            (needle.is_empty() || p.text.to_lowercase().contains(&needle))
                && difficulty.is_none_or(|d| p.difficulty == d)
                && drum_type.is_none_or(|dt| p.drum_type.as_deref() == Some(dt))
                && source.matches(p)
        })
        .map(|(idx, _)| idx)
        .collect();

    indices.sort_by(|&a, &b| {
        let (a, b) = (&prompts[a], &prompts[b]);
        match sort {
            PromptSort::UsedCount => b.used_count.cmp(&a.used_count),
            PromptSort::Difficulty => a.difficulty.cmp(&b.difficulty),
            PromptSort::DrumType => a
                .drum_type
                .as_deref()
                .unwrap_or("")
                .cmp(b.drum_type.as_deref().unwrap_or("")),
        }
    });
    indices
}

struct PromptEdit {
    id: i64,
    text: String,
    difficulty: u8,
    drum_type: String,
    category: String,
}

impl PromptEdit {
    fn for_prompt(prompt: &Prompt) -> Self {
        Self {
            id: prompt.id,
            text: prompt.text.clone(),
            difficulty: prompt.difficulty,
            drum_type: prompt.drum_type.clone().unwrap_or_default(),
            category: prompt.category.clone().unwrap_or_default(),
        }
    }

    fn update(&self) -> PromptUpdate {
        PromptUpdate {
            text: self.text.clone(),
            difficulty: self.difficulty,
            drum_type: {
                let trimmed = self.drum_type.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            },
            category: {
                let trimmed = self.category.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            },
        }
    }
}

/// Prompt database manager: search/filter/sort the full table, edit a prompt
/// in place, delete behind a confirm step.
pub struct PromptsPage {
    prompts: Vec<Prompt>,
    search: String,
    difficulty_filter: Option<u8>,
    drum_type_filter: Option<String>,
    source_filter: SourceFilter,
    sort_by: PromptSort,
    edit: Option<PromptEdit>,
    confirm_delete: Option<i64>,
    loading: bool,
    status: StatusLine,
    list_requests: RequestTracker,
    list_inflight: Option<Inflight<Vec<Prompt>>>,
    update_inflight: Option<Inflight<Prompt>>,
    delete_inflight: Option<Inflight<()>>,
}

impl PromptsPage {
    pub fn new(api: &ApiClient, ctx: &egui::Context) -> Self {
        let mut page = Self {
            prompts: Vec::new(),
            search: String::new(),
            difficulty_filter: None,
            drum_type_filter: None,
            source_filter: SourceFilter::All,
            sort_by: PromptSort::UsedCount,
            edit: None,
            confirm_delete: None,
            loading: false,
            status: StatusLine::new(),
            list_requests: RequestTracker::new(),
            list_inflight: None,
            update_inflight: None,
            delete_inflight: None,
        };
        page.reload(api, ctx);
        page
    }

    pub fn leave(&mut self) {}

    fn reload(&mut self, api: &ApiClient, ctx: &egui::Context) {
        self.loading = true;
        let api = api.clone();
        self.list_inflight = Some(fetch::spawn(self.list_requests.begin(), ctx, move || {
            api.list_prompts(5000)
        }));
    }

    fn poll(&mut self, api: &ApiClient, ctx: &egui::Context) {
        if let Some((ticket, result)) = fetch::take_completed(&mut self.list_inflight) {
            if self.list_requests.is_current(ticket) {
                self.loading = false;
                match result {
                    Ok(prompts) => self.prompts = prompts,
                    Err(err) => self.status.error(format!("Failed to load prompts: {err}")),
                }
            }
        }
        if let Some((_, result)) = fetch::take_completed(&mut self.update_inflight) {
            match result {
                Ok(_) => {
                    self.status.success("Prompt updated", Instant::now());
                    self.edit = None;
                    self.reload(api, ctx);
                }
                Err(err) => self.status.error(format!("Error: {err}")),
            }
        }
        if let Some((_, result)) = fetch::take_completed(&mut self.delete_inflight) {
            match result {
                Ok(()) => {
                    self.status.success("Prompt deleted", Instant::now());
                    self.reload(api, ctx);
                }
                Err(err) => self.status.error(format!("Error: {err}")),
            }
        }
    }

    pub fn ui(&mut self, ui: &mut Ui, api: &ApiClient) {
        self.poll(api, ui.ctx());

        let user_generated = self.prompts.iter().filter(|p| p.is_user_generated).count();
        let pre_generated = self.prompts.len() - user_generated;

        ui.horizontal(|ui| {
            ui.heading("Prompt Database Manager");
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.weak(format!(
                    "{} total ({pre_generated} pre-generated, {user_generated} user-generated)",
                    self.prompts.len()
                ));
            });
        });
        ui.add_space(8.0);

        self.filters_ui(ui, pre_generated, user_generated);
        ui.add_space(8.0);
        self.table_ui(ui, api);

        if self.edit.is_some() {
            self.edit_window(ui, api);
        }

        ui.add_space(8.0);
        status_banner(ui, &mut self.status);
    }

    fn filters_ui(&mut self, ui: &mut Ui, pre_generated: usize, user_generated: usize) {
        let drum_types = distinct_drum_types(&self.prompts);
        ui.group(|ui| {
            ui.horizontal(|ui| {
                ui.label("Search");
                ui.add(
                    TextEdit::singleline(&mut self.search)
                        .hint_text("Search prompts...")
                        .desired_width(200.0),
                );

                ui.label("Difficulty");
                egui::ComboBox::from_id_salt("prompts_difficulty")
                    .selected_text(
                        self.difficulty_filter
                            .map(|d| d.to_string())
                            .unwrap_or_else(|| "All".to_string()),
                    )
                    .show_ui(ui, |ui| {
                        if ui
                            .selectable_label(self.difficulty_filter.is_none(), "All")
                            .clicked()
                        {
                            self.difficulty_filter = None;
                        }
                        for difficulty in 1..=10u8 {
                            if ui
                                .selectable_label(
                                    self.difficulty_filter == Some(difficulty),
                                    difficulty.to_string(),
                                )
                                .clicked()
                            {
                                self.difficulty_filter = Some(difficulty);
                            }
                        }
                    });

                ui.label("Drum type");
                egui::ComboBox::from_id_salt("prompts_drum_type")
                    .selected_text(self.drum_type_filter.as_deref().unwrap_or("All"))
                    .show_ui(ui, |ui| {
                        if ui
                            .selectable_label(self.drum_type_filter.is_none(), "All")
                            .clicked()
                        {
                            self.drum_type_filter = None;
                        }
                        for drum_type in &drum_types {
                            let selected =
                                self.drum_type_filter.as_deref() == Some(drum_type.as_str());
                            if ui.selectable_label(selected, drum_type).clicked() {
                                self.drum_type_filter = Some(drum_type.clone());
                            }
                        }
                    });

                ui.label("Source");
                egui::ComboBox::from_id_salt("prompts_source")
                    .selected_text(match self.source_filter {
                        SourceFilter::All => "All Prompts".to_string(),
                        SourceFilter::PreGenerated => format!("Pre-Generated ({pre_generated})"),
                        SourceFilter::UserGenerated => format!("User-Generated ({user_generated})"),
                    })
                    .show_ui(ui, |ui| {
                        for (filter, label) in [
                            (SourceFilter::All, "All Prompts".to_string()),
                            (
                                SourceFilter::PreGenerated,
                                format!("Pre-Generated ({pre_generated})"),
                            ),
                            (
                                SourceFilter::UserGenerated,
                                format!("User-Generated ({user_generated})"),
                            ),
                        ] {
                            if ui
                                .selectable_label(self.source_filter == filter, label)
                                .clicked()
                            {
                                self.source_filter = filter;
                            }
                        }
                    });

                ui.label("Sort by");
                egui::ComboBox::from_id_salt("prompts_sort")
                    .selected_text(self.sort_by.title())
                    .show_ui(ui, |ui| {
                        for sort in [
                            PromptSort::UsedCount,
                            PromptSort::Difficulty,
                            PromptSort::DrumType,
                        ] {
                            if ui
                                .selectable_label(self.sort_by == sort, sort.title())
                                .clicked()
                            {
                                self.sort_by = sort;
                            }
                        }
                    });
            });
        });
    }

    fn table_ui(&mut self, ui: &mut Ui, api: &ApiClient) {
        let indices = filtered_indices(
            &self.prompts,
            &self.search,
            self.difficulty_filter,
            self.drum_type_filter.as_deref(),
            self.source_filter,
            self.sort_by,
        );
        ui.weak(format!(
            "Showing {} of {} prompts",
            indices.len(),
            self.prompts.len()
        ));

        let mut edit_request: Option<PromptEdit> = None;
        let mut delete_request: Option<i64> = None;
        let mut confirm_request: Option<Option<i64>> = None;

        ui.group(|ui| {
            if self.loading && self.prompts.is_empty() {
                ui.weak("Loading prompts...");
                return;
            }
            if indices.is_empty() {
                ui.weak("No prompts found. Try adjusting your filters.");
                return;
            }

            egui::Grid::new("prompts_table")
                .striped(true)
                .num_columns(5)
                .min_col_width(70.0)
                .show(ui, |ui| {
                    ui.strong("Prompt Text");
                    ui.strong("Difficulty");
                    ui.strong("Drum Type");
                    ui.strong("Times Used");
                    ui.strong("Actions");
                    ui.end_row();

                    for idx in indices {
                        let prompt = &self.prompts[idx];
                        ui.label(&prompt.text);
                        ui.label(format!("{}/10", prompt.difficulty));
                        ui.label(prompt.drum_type.as_deref().unwrap_or("-"));
                        ui.colored_label(
                            Color32::from_rgb(52, 211, 153),
                            prompt.used_count.to_string(),
                        );
                        ui.horizontal(|ui| {
                            if ui.small_button("Edit").clicked() {
                                edit_request = Some(PromptEdit::for_prompt(prompt));
                            }
                            if self.confirm_delete == Some(prompt.id) {
                                ui.colored_label(
                                    Color32::from_rgb(248, 113, 113),
                                    "Delete?",
                                );
                                if ui.small_button("Confirm").clicked() {
                                    delete_request = Some(prompt.id);
                                }
                                if ui.small_button("Cancel").clicked() {
                                    confirm_request = Some(None);
                                }
                            } else if ui.small_button("Delete").clicked() {
                                confirm_request = Some(Some(prompt.id));
                            }
                        });
                        ui.end_row();
                    }
                });
        });

        if let Some(confirm) = confirm_request {
            self.confirm_delete = confirm;
        }
        if let Some(edit) = edit_request {
            self.confirm_delete = None;
            self.edit = Some(edit);
        }
        if let Some(id) = delete_request {
            self.confirm_delete = None;
            let api = api.clone();
            self.delete_inflight = Some(fetch::spawn(self.list_requests.begin(), ui.ctx(), move || {
                api.delete_prompt(id)
            }));
        }
    }

    fn edit_window(&mut self, ui: &mut Ui, api: &ApiClient) {
        let mut save = false;
        let mut cancel = false;

        if let Some(edit) = &mut self.edit {
            egui::Window::new(format!("Edit Prompt #{}", edit.id))
                .collapsible(false)
                .resizable(false)
                .anchor(Align2::CENTER_CENTER, Vec2::ZERO)
                .show(ui.ctx(), |ui| {
                    ui.set_width(460.0);
                    ui.label("Text:");
                    ui.add(
                        TextEdit::multiline(&mut edit.text)
                            .desired_rows(3)
                            .desired_width(f32::INFINITY),
                    );
                    ui.horizontal(|ui| {
                        ui.label("Difficulty");
                        ui.add(egui::Slider::new(&mut edit.difficulty, 1..=10));
                    });
                    ui.horizontal(|ui| {
                        ui.label("Drum type");
                        ui.text_edit_singleline(&mut edit.drum_type);
                    });
                    ui.horizontal(|ui| {
                        ui.label("Category");
                        ui.text_edit_singleline(&mut edit.category);
                    });
                    ui.add_space(8.0);
                    ui.horizontal(|ui| {
                        let valid = !edit.text.trim().is_empty();
                        if ui
                            .add_enabled(valid, egui::Button::new(RichText::new("Save").strong()))
                            .clicked()
                        {
                            save = true;
                        }
                        if ui.button("Cancel").clicked() {
                            cancel = true;
                        }
                    });
                });
        }

        if save {
            if let Some(edit) = &self.edit {
                let id = edit.id;
                let update = edit.update();
                let api = api.clone();
                self.update_inflight = Some(fetch::spawn(
                    self.list_requests.begin(),
                    ui.ctx(),
                    move || api.update_prompt(id, &update),
                ));
            }
        }
        if cancel {
            self.edit = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt(id: i64, text: &str, difficulty: u8, drum_type: &str, used: i64, user: bool) -> Prompt {
        Prompt {
            id,
            text: text.to_string(),
            difficulty,
            drum_type: Some(drum_type.to_string()),
            category: None,
            used_count: used,
            is_user_generated: user,
        }
    }

    fn fixture() -> Vec<Prompt> {
        vec![
            prompt(1, "punchy kick with long tail", 3, "kick", 12, false),
            prompt(2, "crisp snare crack", 6, "snare", 4, false),
            prompt(3, "lo-fi kick thump", 8, "kick", 9, true),
            prompt(4, "washy ride bell", 5, "ride", 1, false),
        ]
    }

    #[test]
    fn test_search_is_case_insensitive_substring() {
        let prompts = fixture();
        let indices = filtered_indices(
            &prompts,
            "KICK",
            None,
            None,
            SourceFilter::All,
            PromptSort::UsedCount,
        );
        assert_eq!(indices, vec![0, 2]);
    }

    #[test]
    fn test_filters_compose() {
        let prompts = fixture();
        let indices = filtered_indices(
            &prompts,
            "",
            Some(8),
            Some("kick"),
            SourceFilter::UserGenerated,
            PromptSort::UsedCount,
        );
        assert_eq!(indices, vec![2]);

        let none = filtered_indices(
            &prompts,
            "",
            Some(8),
            Some("kick"),
            SourceFilter::PreGenerated,
            PromptSort::UsedCount,
        );
        assert!(none.is_empty());
    }

    #[test]
    fn test_sort_by_used_count_is_descending() {
        let prompts = fixture();
        let indices = filtered_indices(
            &prompts,
            "",
            None,
            None,
            SourceFilter::All,
            PromptSort::UsedCount,
        );
        let used: Vec<i64> = indices.iter().map(|&i| prompts[i].used_count).collect();
        assert_eq!(used, vec![12, 9, 4, 1]);
    }

    #[test]
    fn test_sort_by_difficulty_is_ascending() {
        let prompts = fixture();
        let indices = filtered_indices(
            &prompts,
            "",
            None,
            None,
            SourceFilter::All,
            PromptSort::Difficulty,
        );
        let difficulties: Vec<u8> = indices.iter().map(|&i| prompts[i].difficulty).collect();
        assert_eq!(difficulties, vec![3, 5, 6, 8]);
    }

    #[test]
    fn test_edit_update_blanks_become_none() {
        let mut edit = PromptEdit::for_prompt(&prompt(7, "dry rimshot", 4, "snare", 0, false));
        edit.drum_type = "  ".to_string();
        edit.category = "acoustic".to_string();
        let update = edit.update();
        assert!(update.drum_type.is_none());
        assert_eq!(update.category.as_deref(), Some("acoustic"));
    }
}

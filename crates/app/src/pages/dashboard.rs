use eframe::egui::{self, RichText, Ui, Vec2};
use scorer_api::{ApiClient, DashboardAnalytics, DashboardQuery, ResultsQuery};
use scorer_core::{RequestTracker, StatusLine};

use crate::fetch::{self, Inflight};
use crate::pages::{Nav, distinct_drum_types};
use crate::widgets::{ChartColumn, segmented_bar_chart, status_banner};

const ALL_VERSIONS: &[&str] = &["v11", "v12", "v13"];

const SCORE_FORMULA_HELP: &str = "Generation score = ((difficulty × 0.3) + (audio × 0.7)) × 10\n\
    Audio-only, weighted by difficulty: easy prompts with high scores count less than \
    difficult prompts with average scores. Range 0-100.";

/// The headline number: overall when no version filter is active, otherwise
/// that version's own generation score.
fn display_score(analytics: &DashboardAnalytics, version: Option<&str>) -> f64 {
    match version {
        None => analytics.overall_generation_score,
        Some(version) => analytics
            .by_version
            .iter()
            .find(|stats| stats.version == version)
            .map(|stats| stats.generation_score)
            .unwrap_or(0.0),
    }
}

/// Aggregate analytics with the difficulty/score distribution chart. Segment
/// clicks navigate to the results page pre-filtered to that slice.
pub struct DashboardPage {
    version: Option<String>,
    drum_type: Option<String>,
    available_drum_types: Vec<String>,
    analytics: Option<DashboardAnalytics>,
    loading: bool,
    hovered: Option<(usize, u8)>,
    status: StatusLine,
    analytics_requests: RequestTracker,
    analytics_inflight: Option<Inflight<DashboardAnalytics>>,
    types_inflight: Option<Inflight<Vec<String>>>,
}

impl DashboardPage {
    pub fn new(api: &ApiClient, ctx: &egui::Context) -> Self {
        let mut page = Self {
            version: None,
            drum_type: None,
            available_drum_types: Vec::new(),
            analytics: None,
            loading: false,
            hovered: None,
            status: StatusLine::new(),
            analytics_requests: RequestTracker::new(),
            analytics_inflight: None,
            types_inflight: None,
        };
        let types_api = api.clone();
        page.types_inflight = Some(fetch::spawn(
            page.analytics_requests.begin(),
            ctx,
            move || {
                let prompts = types_api.list_prompts(5000)?;
                Ok(distinct_drum_types(&prompts))
            },
        ));
        page.reload(api, ctx);
        page
    }

    pub fn leave(&mut self) {}

    fn reload(&mut self, api: &ApiClient, ctx: &egui::Context) {
        let query = DashboardQuery {
            drum_type: self.drum_type.clone(),
            model_version: self.version.clone(),
        };
        self.loading = true;
        let api = api.clone();
        self.analytics_inflight = Some(fetch::spawn(
            self.analytics_requests.begin(),
            ctx,
            move || api.dashboard(&query),
        ));
    }

    fn poll(&mut self) {
        if let Some((ticket, result)) = fetch::take_completed(&mut self.analytics_inflight) {
            if self.analytics_requests.is_current(ticket) {
                self.loading = false;
                match result {
                    Ok(analytics) => self.analytics = Some(analytics),
                    Err(err) => self.status.error(format!("Failed to load analytics: {err}")),
                }
            }
        }
        if let Some((_, result)) = fetch::take_completed(&mut self.types_inflight) {
            if let Ok(types) = result {
                self.available_drum_types = types;
            }
        }
    }

    pub fn ui(&mut self, ui: &mut Ui, api: &ApiClient) -> Option<Nav> {
        self.poll();
        let mut nav = None;

        ui.horizontal(|ui| {
            ui.heading("Analytics Dashboard");
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let mut changed = false;
                egui::ComboBox::from_id_salt("dashboard_drum_type")
                    .selected_text(self.drum_type.as_deref().unwrap_or("All Drum Types"))
                    .show_ui(ui, |ui| {
                        if ui
                            .selectable_label(self.drum_type.is_none(), "All Drum Types")
                            .clicked()
                        {
                            self.drum_type = None;
                            changed = true;
                        }
                        for drum_type in &self.available_drum_types {
                            let selected = self.drum_type.as_deref() == Some(drum_type.as_str());
                            if ui.selectable_label(selected, drum_type).clicked() {
                                self.drum_type = Some(drum_type.clone());
                                changed = true;
                            }
                        }
                    });
                egui::ComboBox::from_id_salt("dashboard_version")
                    .selected_text(
                        self.version
                            .as_deref()
                            .map(str::to_uppercase)
                            .unwrap_or_else(|| "All Versions".to_string()),
                    )
                    .show_ui(ui, |ui| {
                        if ui
                            .selectable_label(self.version.is_none(), "All Versions")
                            .clicked()
                        {
                            self.version = None;
                            changed = true;
                        }
                        for version in ALL_VERSIONS {
                            let selected = self.version.as_deref() == Some(*version);
                            if ui
                                .selectable_label(selected, version.to_uppercase())
                                .clicked()
                            {
                                self.version = Some(version.to_string());
                                changed = true;
                            }
                        }
                    });
                if changed {
                    self.reload(api, ui.ctx());
                }
            });
        });
        ui.add_space(8.0);

        let has_data = self
            .analytics
            .as_ref()
            .is_some_and(|analytics| analytics.total_tests > 0);

        if self.loading && self.analytics.is_none() {
            ui.group(|ui| {
                ui.weak("Loading analytics...");
            });
        } else if !has_data {
            ui.group(|ui| {
                ui.vertical_centered(|ui| {
                    ui.strong("No Test Data Available");
                    ui.weak("Start testing to see analytics here!");
                });
            });
        } else if let Some(analytics) = self.analytics.clone() {
            self.metric_cards(ui, &analytics);
            ui.add_space(12.0);

            ui.group(|ui| {
                ui.strong("Difficulty vs Score Distribution");
                ui.add_space(6.0);
                let columns: Vec<ChartColumn> = analytics
                    .difficulty_distribution
                    .iter()
                    .map(|bucket| ChartColumn {
                        label: bucket.difficulty.to_string(),
                        total: bucket.total_tests,
                        buckets: (1..=10u8).map(|s| (s, bucket.count_for(s))).collect(),
                    })
                    .collect();
                if let Some(segment) = segmented_bar_chart(ui, &columns, &mut self.hovered) {
                    let difficulty = analytics
                        .difficulty_distribution
                        .get(segment.column)
                        .map(|bucket| bucket.difficulty);
                    nav = Some(Nav::Results(ResultsQuery {
                        drum_type: self.drum_type.clone(),
                        difficulty,
                        model_version: self.version.clone(),
                        audio_quality_score: Some(segment.score),
                    }));
                }
                ui.vertical_centered(|ui| {
                    ui.weak("Difficulty Level");
                });
            });

            if self.version.is_none() && !analytics.by_version.is_empty() {
                ui.add_space(12.0);
                ui.group(|ui| {
                    ui.strong("Performance by Model Version");
                    ui.add_space(6.0);
                    let mut clicked_version = None;
                    ui.horizontal_wrapped(|ui| {
                        for stats in &analytics.by_version {
                            let text = format!(
                                "{}\n{:.0} / 100\nLLM {:.1} · {} test{}",
                                stats.version.to_uppercase(),
                                stats.generation_score,
                                stats.avg_llm,
                                stats.count,
                                if stats.count == 1 { "" } else { "s" },
                            );
                            let card = ui.add(
                                egui::Button::new(text).min_size(Vec2::new(170.0, 92.0)),
                            );
                            if card.clicked() {
                                clicked_version = Some(stats.version.clone());
                            }
                        }
                    });
                    if let Some(version) = clicked_version {
                        self.version = Some(version);
                        self.reload(api, ui.ctx());
                    }
                });
            }
        }

        ui.add_space(8.0);
        status_banner(ui, &mut self.status);
        nav
    }

    fn metric_cards(&self, ui: &mut Ui, analytics: &DashboardAnalytics) {
        let score = display_score(analytics, self.version.as_deref());
        ui.columns(3, |columns| {
            columns[0].group(|ui| {
                ui.vertical_centered(|ui| {
                    ui.weak("Generation Score");
                    ui.label(RichText::new(format!("{score:.0}/100")).size(32.0).strong())
                        .on_hover_text(SCORE_FORMULA_HELP);
                });
            });
            columns[1].group(|ui| {
                ui.vertical_centered(|ui| {
                    ui.weak("LLM Accuracy");
                    ui.label(
                        RichText::new(format!("{:.1}", analytics.avg_llm_accuracy)).size(22.0),
                    );
                });
            });
            columns[2].group(|ui| {
                ui.vertical_centered(|ui| {
                    ui.weak("Total Tests");
                    ui.label(RichText::new(analytics.total_tests.to_string()).size(22.0));
                });
            });
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analytics() -> DashboardAnalytics {
        serde_json::from_value(serde_json::json!({
            "total_tests": 30,
            "overall_generation_score": 61.0,
            "avg_llm_accuracy": 7.2,
            "by_version": [
                {"version": "v11", "count": 10, "generation_score": 48.0, "avg_llm": 6.0},
                {"version": "v12", "count": 20, "generation_score": 67.0, "avg_llm": 7.8}
            ],
            "difficulty_distribution": []
        }))
        .expect("analytics")
    }

    #[test]
    fn test_display_score_overall_without_version_filter() {
        assert_eq!(display_score(&analytics(), None), 61.0);
    }

    #[test]
    fn test_display_score_for_selected_version() {
        assert_eq!(display_score(&analytics(), Some("v12")), 67.0);
        assert_eq!(display_score(&analytics(), Some("v11")), 48.0);
    }

    #[test]
    fn test_display_score_unknown_version_is_zero() {
        assert_eq!(display_score(&analytics(), Some("v99")), 0.0);
    }
}

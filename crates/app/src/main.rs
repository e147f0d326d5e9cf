mod config;
mod fetch;
mod pages;
mod widgets;

use config::Config;
use eframe::egui;
use pages::{DashboardPage, ModelTestingPage, Nav, PromptsPage, ResultsPage, TestingPage};
use scorer_api::{ApiClient, ResultsQuery};
use scorer_core::{LaunchKind, SessionStore};
use tracing_subscriber::EnvFilter;

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::load();
    tracing::info!(base_url = %config.api_base_url, "starting drumgen scorer");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1280.0, 900.0]),
        ..Default::default()
    };

    eframe::run_native(
        "DrumGen Scorer",
        options,
        Box::new(move |cc| {
            let api = ApiClient::new(&config.api_base_url)?;
            Ok(Box::new(ScorerApp::new(api, &cc.egui_ctx)))
        }),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageKind {
    Testing,
    ModelTesting,
    Dashboard,
    Results,
    Prompts,
}

impl PageKind {
    const ALL: [PageKind; 5] = [
        PageKind::Testing,
        PageKind::ModelTesting,
        PageKind::Dashboard,
        PageKind::Results,
        PageKind::Prompts,
    ];

    fn title(self) -> &'static str {
        match self {
            PageKind::Testing => "Testing",
            PageKind::ModelTesting => "Model Testing",
            PageKind::Dashboard => "Dashboard",
            PageKind::Results => "Results",
            PageKind::Prompts => "Prompts",
        }
    }
}

/// The page currently mounted. Only one page lives at a time; switching away
/// drafts its form state to the session store and tears down its audio, and
/// switching back restores from the store.
enum ActivePage {
    Testing(TestingPage),
    ModelTesting(ModelTestingPage),
    Dashboard(DashboardPage),
    Results(ResultsPage),
    Prompts(PromptsPage),
}

impl ActivePage {
    fn kind(&self) -> PageKind {
        match self {
            ActivePage::Testing(_) => PageKind::Testing,
            ActivePage::ModelTesting(_) => PageKind::ModelTesting,
            ActivePage::Dashboard(_) => PageKind::Dashboard,
            ActivePage::Results(_) => PageKind::Results,
            ActivePage::Prompts(_) => PageKind::Prompts,
        }
    }
}

struct ScorerApp {
    api: ApiClient,
    session: SessionStore,
    active: ActivePage,
}

impl ScorerApp {
    fn new(api: ApiClient, ctx: &egui::Context) -> Self {
        let mut session = SessionStore::new();
        // A process start is a fresh launch: every page opens with defaults.
        session.begin(LaunchKind::Fresh);
        let active = ActivePage::Testing(TestingPage::new(&api, &session, ctx));
        Self {
            api,
            session,
            active,
        }
    }

    fn switch_to(&mut self, kind: PageKind, filter: Option<ResultsQuery>, ctx: &egui::Context) {
        match &mut self.active {
            ActivePage::Testing(page) => page.leave(&mut self.session),
            ActivePage::ModelTesting(page) => page.leave(&mut self.session),
            ActivePage::Dashboard(page) => page.leave(),
            ActivePage::Results(page) => page.leave(),
            ActivePage::Prompts(page) => page.leave(),
        }
        // In-app navigation: drafts survive the remount.
        self.session.begin(LaunchKind::Resumed);
        self.active = match kind {
            PageKind::Testing => {
                ActivePage::Testing(TestingPage::new(&self.api, &self.session, ctx))
            }
            PageKind::ModelTesting => {
                ActivePage::ModelTesting(ModelTestingPage::new(&self.api, &self.session, ctx))
            }
            PageKind::Dashboard => ActivePage::Dashboard(DashboardPage::new(&self.api, ctx)),
            PageKind::Results => ActivePage::Results(ResultsPage::new(&self.api, filter, ctx)),
            PageKind::Prompts => ActivePage::Prompts(PromptsPage::new(&self.api, ctx)),
        };
    }
}

impl eframe::App for ScorerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let mut target: Option<(PageKind, Option<ResultsQuery>)> = None;

        egui::TopBottomPanel::top("nav").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.strong("DrumGen Scorer");
                ui.separator();
                let current = self.active.kind();
                for kind in PageKind::ALL {
                    if ui.selectable_label(current == kind, kind.title()).clicked()
                        && kind != current
                    {
                        target = Some((kind, None));
                    }
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .auto_shrink([false; 2])
                .show(ui, |ui| {
                    let nav = match &mut self.active {
                        ActivePage::Testing(page) => {
                            page.ui(ui, &self.api, &mut self.session);
                            None
                        }
                        ActivePage::ModelTesting(page) => {
                            page.ui(ui, &self.api, &mut self.session);
                            None
                        }
                        ActivePage::Dashboard(page) => page.ui(ui, &self.api),
                        ActivePage::Results(page) => {
                            page.ui(ui, &self.api);
                            None
                        }
                        ActivePage::Prompts(page) => {
                            page.ui(ui, &self.api);
                            None
                        }
                    };
                    if let Some(Nav::Results(filter)) = nav {
                        target = Some((PageKind::Results, Some(filter)));
                    }
                });
        });

        if let Some((kind, filter)) = target {
            self.switch_to(kind, filter, ctx);
        }
    }
}

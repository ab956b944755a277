//! Main application UI and state management.
//! Four tabs: review queue, activity dashboard, question list and question entry.

use chrono::{Days, Local, NaiveDate};
use eframe::egui;
use spaced_review_app::config::DashboardConfig;
use spaced_review_app::database::Store;
use spaced_review_app::export::json::{export_json_to_path, import_json};
use spaced_review_app::models::{EditDraft, Outcome, Question, ReviewSession};
use spaced_review_app::service::{DashboardMetrics, DueGroups, Heatmap, ReviewService};
use spaced_review_app::{Error, Result};
use tracing::warn;

const CELL: f32 = 16.0;
const CELL_GAP: f32 = 3.0;
const DAY_LABEL_WIDTH: f32 = 32.0;
const WEEKDAY_LABELS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Application tabs
#[derive(Default, Clone, Copy, PartialEq, Eq)]
enum Tab {
    #[default]
    Review,
    Dashboard,
    AllQuestions,
    AddQuestion,
}

enum Status {
    Info(String),
    Error(String),
}

/// User actions, collected while drawing and applied afterwards.
enum Action {
    Start(Question),
    ToggleAnswer,
    Review(Outcome),
    Back,
    Reschedule(i64),
    BeginEdit(Question),
    SaveEdit,
    CancelEdit,
    Delete(i64),
    ResetAll,
    Add,
    SelectDate(NaiveDate),
    Export,
    Import,
}

/// Everything the tabs display, reloaded after each write.
#[derive(Default)]
struct Snapshot {
    today: Option<NaiveDate>,
    groups: DueGroups,
    questions: Vec<Question>,
    metrics: DashboardMetrics,
    heatmap: Option<Heatmap>,
    history: Vec<NaiveDate>,
    reviewed_on: Vec<String>,
}

/// Main application state
pub struct MyApp {
    show_confirmation_dialog: bool,
    allowed_to_close: bool,
    service: ReviewService<Box<dyn Store>>,
    dashboard: DashboardConfig,

    /// Days added to the real date, for simulating the schedule.
    day_offset: u64,
    tab: Tab,
    session: ReviewSession,
    edit_draft: Option<EditDraft>,
    new_question: String,
    new_answer: String,
    selected_date: Option<NaiveDate>,
    clear_history_on_reset: bool,

    snapshot: Snapshot,
    dirty: bool,
    status: Option<Status>,

    show_result_dialog: bool,
    result_message: String,
}

impl eframe::App for MyApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.dirty || self.snapshot.today != Some(self.today()) {
            self.refresh();
        }

        let mut action = None;

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.heading("Spaced Repetition Learning");
            ui.horizontal(|ui| {
                ui.label(self.today().format("%Y-%m-%d").to_string());
                if ui.button("Next Day").clicked() {
                    self.day_offset += 1;
                }
                if self.day_offset > 0 && ui.button("Back to today").clicked() {
                    self.day_offset = 0;
                }
            });
            ui.horizontal(|ui| {
                ui.selectable_value(&mut self.tab, Tab::Review, "🔁 Review");
                ui.selectable_value(&mut self.tab, Tab::Dashboard, "📊 Dashboard");
                ui.selectable_value(&mut self.tab, Tab::AllQuestions, "📖 All Questions");
                ui.selectable_value(&mut self.tab, Tab::AddQuestion, "➕ Add Question");
            });
        });

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| match &self.status {
            Some(Status::Info(message)) => {
                ui.colored_label(egui::Color32::from_rgb(35, 154, 59), message);
            }
            Some(Status::Error(message)) => {
                ui.colored_label(egui::Color32::from_rgb(200, 40, 40), message);
            }
            None => {
                ui.label("");
            }
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .id_source("tab_body")
                .show(ui, |ui| match self.tab {
                    Tab::Review => self.render_review_tab(ui, &mut action),
                    Tab::Dashboard => self.render_dashboard_tab(ui, &mut action),
                    Tab::AllQuestions => self.render_all_questions_tab(ui, &mut action),
                    Tab::AddQuestion => self.render_add_tab(ui, &mut action),
                });
        });

        if let Some(action) = action {
            self.apply(action);
        }

        // Handle window close requests with confirmation dialog
        if ctx.input(|i| i.viewport().close_requested()) {
            if self.allowed_to_close {
                // Allow close
            } else {
                ctx.send_viewport_cmd(egui::ViewportCommand::CancelClose);
                self.show_confirmation_dialog = true;
            }
        }

        if self.show_confirmation_dialog {
            egui::Window::new("Do you want to quit?")
                .collapsible(false)
                .resizable(false)
                .show(ctx, |ui| {
                    ui.horizontal(|ui| {
                        if ui.button("No").clicked() {
                            self.show_confirmation_dialog = false;
                            self.allowed_to_close = false;
                        }

                        if ui.button("Yes").clicked() {
                            self.show_confirmation_dialog = false;
                            self.allowed_to_close = true;
                            ui.ctx().send_viewport_cmd(egui::ViewportCommand::Close);
                        }
                    });
                });
        }

        if self.show_result_dialog {
            egui::Window::new("Import/Export Result")
                .collapsible(false)
                .resizable(false)
                .show(ctx, |ui| {
                    ui.label(&self.result_message);
                    ui.add_space(10.0);
                    if ui.button("OK").clicked() {
                        self.show_result_dialog = false;
                    }
                });
        }
    }
}

impl MyApp {
    pub fn new(service: ReviewService<Box<dyn Store>>, dashboard: DashboardConfig) -> Self {
        Self {
            show_confirmation_dialog: false,
            allowed_to_close: false,
            service,
            dashboard,
            day_offset: 0,
            tab: Tab::default(),
            session: ReviewSession::new(),
            edit_draft: None,
            new_question: String::new(),
            new_answer: String::new(),
            selected_date: None,
            clear_history_on_reset: false,
            snapshot: Snapshot::default(),
            dirty: true,
            status: None,
            show_result_dialog: false,
            result_message: String::new(),
        }
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive() + Days::new(self.day_offset)
    }

    fn refresh(&mut self) {
        let today = self.today();
        match self.load_snapshot(today) {
            Ok(snapshot) => self.snapshot = snapshot,
            Err(e) => {
                warn!(error = %e, "failed to load questions");
                self.status = Some(Status::Error(format!("Could not load data: {}", e)));
                self.snapshot.today = Some(today);
            }
        }
        self.dirty = false;
    }

    fn load_snapshot(&self, today: NaiveDate) -> Result<Snapshot> {
        let reporter = self.service.reporter();
        let heatmap = reporter.heatmap_series(
            self.dashboard.start_for(today),
            self.dashboard.heatmap_weeks as usize,
            today,
        )?;
        let history = match self.session.current_id() {
            Some(id) => self.service.review_history(id)?,
            None => Vec::new(),
        };
        let selected = self.selected_date.unwrap_or(today);

        Ok(Snapshot {
            today: Some(today),
            groups: self.service.group_by_due_date(today)?,
            questions: self.service.all_questions()?,
            metrics: reporter.dashboard_metrics(today)?,
            heatmap: Some(heatmap),
            history,
            reviewed_on: self.service.questions_reviewed_on(selected)?,
        })
    }

    /// Renders the review queue, or the question under review
    fn render_review_tab(&mut self, ui: &mut egui::Ui, action: &mut Option<Action>) {
        let due = &self.snapshot.groups.due_today;
        ui.heading(format!(
            "To Review Today: {} question{}",
            due.len(),
            plural(due.len())
        ));
        ui.label(format!(
            "Tomorrow: {} · Later: {}",
            self.snapshot.groups.due_tomorrow.len(),
            self.snapshot.groups.future.len()
        ));
        ui.separator();

        if let Some(question) = self.session.current().cloned() {
            let shown = self.session.answer_shown();

            ui.label(egui::RichText::new(format!("Question: {}", question.question)).strong());
            if let Some(scratch) = self.session.scratch_mut() {
                ui.add(
                    egui::TextEdit::multiline(scratch)
                        .hint_text("Your answer (you can write code here)")
                        .code_editor()
                        .desired_rows(4),
                );
            }

            let toggle_label = if shown { "Close Answer" } else { "Reveal Answer" };
            if ui.button(toggle_label).clicked() {
                *action = Some(Action::ToggleAnswer);
            }
            if shown {
                ui.group(|ui| {
                    ui.label("Correct Answer:");
                    ui.label(&question.answer);
                });
            }

            ui.add_space(10.0);
            ui.horizontal(|ui| {
                if ui.button("✅ Mark as reviewed").clicked() {
                    *action = Some(Action::Review(Outcome::Remembered));
                }
                if ui.button("❌ Forgot it").clicked() {
                    *action = Some(Action::Review(Outcome::Forgotten));
                }
            });
            if ui.button("<- See other questions").clicked() {
                *action = Some(Action::Back);
            }

            ui.separator();
            let history = &self.snapshot.history;
            ui.label(format!(
                "Reviewed: {} time{}",
                history.len(),
                plural(history.len())
            ));
            for date in history {
                ui.label(format!("- {}", date));
            }
        } else if self.snapshot.groups.is_empty() {
            ui.label("No questions added yet! Add one in the \"Add Question\" tab.");
        } else if due.is_empty() {
            ui.label("Nothing due today!");
        } else {
            for question in due {
                if ui.button(question.label()).clicked() {
                    *action = Some(Action::Start(question.clone()));
                }
            }
        }
    }

    /// Renders metrics, the activity heatmap and reviews for a chosen day
    fn render_dashboard_tab(&mut self, ui: &mut egui::Ui, action: &mut Option<Action>) {
        let metrics = self.snapshot.metrics;
        ui.columns(4, |cols| {
            metric(&mut cols[0], "Total Questions", metrics.total_questions);
            metric(&mut cols[1], "Due Today", metrics.due_today);
            metric(&mut cols[2], "Reviewed Today", metrics.reviewed_today);
            metric(&mut cols[3], "Total Reviewed", metrics.total_reviewed);
        });
        ui.separator();

        if metrics.total_reviewed == 0 {
            ui.label("No review data available yet");
            return;
        }

        ui.heading("📅 Review Activity");
        if let Some(heatmap) = &self.snapshot.heatmap {
            if let Some(date) = draw_heatmap(ui, heatmap) {
                *action = Some(Action::SelectDate(date));
            }
        }

        ui.separator();
        let today = self.today();
        let selected = self.selected_date.unwrap_or(today);
        ui.horizontal(|ui| {
            ui.label("📌 Reviewed questions on");
            if ui.button("◀").clicked() {
                *action = selected.pred_opt().map(Action::SelectDate);
            }
            ui.label(selected.format("%Y-%m-%d").to_string());
            if ui.button("▶").clicked() {
                *action = selected.succ_opt().map(Action::SelectDate);
            }
            if ui.button("Today").clicked() {
                *action = Some(Action::SelectDate(today));
            }
        });

        if self.snapshot.reviewed_on.is_empty() {
            ui.label("No questions reviewed on this date");
        } else {
            for text in &self.snapshot.reviewed_on {
                ui.label(format!("- {}", text));
            }
        }
    }

    /// Renders every question with reschedule, edit and remove controls
    fn render_all_questions_tab(&mut self, ui: &mut egui::Ui, action: &mut Option<Action>) {
        ui.horizontal(|ui| {
            if ui.button("🔄 Reset All Review Dates").clicked() {
                *action = Some(Action::ResetAll);
            }
            ui.checkbox(&mut self.clear_history_on_reset, "also clear review history");
        });
        ui.horizontal(|ui| {
            if ui.button("Export Questions").clicked() {
                *action = Some(Action::Export);
            }
            if ui.button("Import Questions").clicked() {
                *action = Some(Action::Import);
            }
        });
        ui.separator();

        if self.snapshot.questions.is_empty() {
            ui.label("No questions added yet!");
            return;
        }

        for question in &self.snapshot.questions {
            egui::CollapsingHeader::new(format!(
                "{} (Next Review: {})",
                question.question, question.next_review
            ))
            .id_source(question.id)
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    if ui.button("Add to today's review").clicked() {
                        *action = Some(Action::Reschedule(question.id));
                    }
                    if ui.button("✏️ Edit question").clicked() {
                        *action = Some(Action::BeginEdit(question.clone()));
                    }
                    if ui.button("🗑️ Remove question").clicked() {
                        *action = Some(Action::Delete(question.id));
                    }
                });

                match &mut self.edit_draft {
                    Some(draft) if draft.id == question.id => {
                        ui.label("Edit Question");
                        ui.text_edit_multiline(&mut draft.question);
                        ui.label("Edit Answer");
                        ui.text_edit_multiline(&mut draft.answer);
                        ui.horizontal(|ui| {
                            if ui.button("Save Changes").clicked() {
                                *action = Some(Action::SaveEdit);
                            }
                            if ui.button("Cancel").clicked() {
                                *action = Some(Action::CancelEdit);
                            }
                        });
                    }
                    _ => {
                        ui.label(format!("Answer: {}", question.answer));
                        ui.label(format!("Interval: {} days", question.interval_days));
                        if let Some(last) = question.last_reviewed {
                            ui.label(format!("Last reviewed: {}", last));
                        }
                    }
                }
            });
        }
    }

    /// Renders the new-question form
    fn render_add_tab(&mut self, ui: &mut egui::Ui, action: &mut Option<Action>) {
        ui.label(
            egui::RichText::new(
                "How it works:\n\
                 - A new question is scheduled for review today.\n\
                 - Marking it as reviewed shows it again after 3 days.\n\
                 - Each completed review doubles the interval: 3, 6, 12 days and so on, up to 60.\n\
                 - Forgetting it brings the interval back to 3 days.\n\
                 - An unreviewed question stays in the \"To Review Today\" list after the date rolls over.",
            )
            .small(),
        );
        ui.add_space(10.0);

        ui.label("Enter Question");
        ui.add(egui::TextEdit::multiline(&mut self.new_question).hint_text("[TOPIC] Question"));
        ui.label("Enter Answer");
        ui.add(egui::TextEdit::multiline(&mut self.new_answer).hint_text("Paste the answer here"));

        if ui.button("Add").clicked() {
            *action = Some(Action::Add);
        }
    }

    fn apply(&mut self, action: Action) {
        let today = self.today();
        let result = match action {
            Action::Start(question) => {
                self.session.start(question);
                self.dirty = true;
                Ok(None)
            }
            Action::ToggleAnswer => {
                self.session.toggle_answer();
                Ok(None)
            }
            Action::Back => {
                self.session.back();
                Ok(None)
            }
            Action::Review(outcome) => match self.session.finish() {
                Some(id) => self
                    .service
                    .review(id, outcome, today)
                    .map(|q| Some(format!("Marked as reviewed! Next review on {}.", q.next_review))),
                None => Ok(None),
            },
            Action::Reschedule(id) => self.service.reschedule_today(id, today).map(|_| {
                Some(
                    "Added to today's review. Check the \"Review\" tab to start reviewing it."
                        .to_string(),
                )
            }),
            Action::BeginEdit(question) => {
                self.edit_draft = Some(EditDraft::from_question(&question));
                Ok(None)
            }
            Action::SaveEdit => match self.edit_draft.take() {
                Some(draft) => {
                    let saved = self
                        .service
                        .edit_question(draft.id, &draft.question, &draft.answer);
                    if matches!(saved, Err(Error::Validation(_))) {
                        self.edit_draft = Some(draft);
                    }
                    saved.map(|_| Some("Question updated.".to_string()))
                }
                None => Ok(None),
            },
            Action::CancelEdit => {
                self.edit_draft = None;
                Ok(None)
            }
            Action::Delete(id) => {
                self.session.forget(id);
                if self.edit_draft.as_ref().is_some_and(|d| d.id == id) {
                    self.edit_draft = None;
                }
                self.service
                    .delete_question(id)
                    .map(|_| Some("Question removed.".to_string()))
            }
            Action::ResetAll => {
                self.session.back();
                self.service
                    .reset_all(today, self.clear_history_on_reset)
                    .map(|n| Some(format!("All {} questions have been reset!", n)))
            }
            Action::Add => self
                .service
                .add_question(&self.new_question, &self.new_answer, today)
                .map(|_| {
                    self.new_question.clear();
                    self.new_answer.clear();
                    Some(
                        "Question added! It will appear in today's review and follow the spaced \
                         repetition schedule (3, 6, 12 days, etc)."
                            .to_string(),
                    )
                }),
            Action::SelectDate(date) => {
                self.selected_date = Some(date);
                self.dirty = true;
                Ok(None)
            }
            Action::Export => {
                self.handle_export();
                Ok(None)
            }
            Action::Import => {
                self.handle_import();
                Ok(None)
            }
        };

        match result {
            Ok(Some(message)) => {
                self.status = Some(Status::Info(message));
                self.dirty = true;
            }
            Ok(None) => {}
            Err(Error::Validation(message)) => {
                self.status = Some(Status::Error(format!("Please fix the input: {}", message)));
            }
            Err(e) => {
                warn!(error = %e, "operation failed");
                self.status = Some(Status::Error(e.to_string()));
                self.dirty = true;
            }
        }
    }

    /// Handles question export to JSON file
    fn handle_export(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .set_file_name("questions.json")
            .add_filter("JSON files", &["json"])
            .save_file()
        {
            let exported = self
                .service
                .export_backup()
                .and_then(|backup| export_json_to_path(&backup, &path).map(|_| backup));
            self.result_message = match exported {
                Ok(backup) => format!(
                    "Exported {} questions and {} reviews!",
                    backup.questions.len(),
                    backup.reviews.len()
                ),
                Err(e) => format!("Export failed: {}", e),
            };
            self.show_result_dialog = true;
        }
    }

    /// Handles question import from JSON file
    fn handle_import(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("JSON files", &["json"])
            .pick_file()
        {
            let imported =
                import_json(&path).and_then(|backup| self.service.import_backup(&backup));
            self.result_message = match imported {
                Ok(count) => format!("Imported {} questions successfully!", count),
                Err(e) => format!(
                    "Import failed: {}\n\nPlease check if the file has correct structure:\n{{\n  \"questions\": [...],\n  \"reviews\": [...]\n}}",
                    e
                ),
            };
            self.show_result_dialog = true;
            self.dirty = true;
        }
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "" } else { "s" }
}

fn metric(ui: &mut egui::Ui, label: &str, value: usize) {
    ui.vertical(|ui| {
        ui.label(label);
        ui.heading(value.to_string());
    });
}

/// Cell fill following a five-step green scale; `None` cells stay unfilled.
fn heat_color(count: u32, max: u32) -> egui::Color32 {
    let ratio = if max == 0 { 0.0 } else { count as f32 / max as f32 };
    match ratio {
        r if r <= 0.0 => egui::Color32::from_rgb(0xeb, 0xed, 0xf0),
        r if r <= 0.2 => egui::Color32::from_rgb(0xc6, 0xe4, 0x8b),
        r if r <= 0.4 => egui::Color32::from_rgb(0x7b, 0xc9, 0x6f),
        r if r <= 0.6 => egui::Color32::from_rgb(0x23, 0x9a, 0x3b),
        _ => egui::Color32::from_rgb(0x19, 0x61, 0x27),
    }
}

/// Draws the heatmap and returns the date of a clicked cell.
fn draw_heatmap(ui: &mut egui::Ui, heatmap: &Heatmap) -> Option<NaiveDate> {
    let step = CELL + CELL_GAP;
    let size = egui::vec2(
        DAY_LABEL_WIDTH + heatmap.weeks() as f32 * step,
        WEEKDAY_LABELS.len() as f32 * step,
    );
    let (response, painter) = ui.allocate_painter(size, egui::Sense::click());
    let origin = response.rect.min;
    let max = heatmap.max_count();
    let text_color = ui.visuals().text_color();

    for (weekday, label) in WEEKDAY_LABELS.iter().enumerate() {
        painter.text(
            origin + egui::vec2(DAY_LABEL_WIDTH - 6.0, weekday as f32 * step + CELL / 2.0),
            egui::Align2::RIGHT_CENTER,
            *label,
            egui::FontId::proportional(10.0),
            text_color,
        );
    }

    for week in 0..heatmap.weeks() {
        for weekday in 0..7 {
            let rect = egui::Rect::from_min_size(
                origin + egui::vec2(DAY_LABEL_WIDTH + week as f32 * step, weekday as f32 * step),
                egui::vec2(CELL, CELL),
            );
            match heatmap.get(week, weekday) {
                Some(count) => painter.rect_filled(rect, 2.0, heat_color(count, max)),
                None => painter.rect_stroke(
                    rect,
                    2.0,
                    egui::Stroke::new(1.0, ui.visuals().widgets.noninteractive.bg_stroke.color),
                ),
            };
        }
    }

    let cell_at = |pos: egui::Pos2| {
        let rel = pos - origin - egui::vec2(DAY_LABEL_WIDTH, 0.0);
        if rel.x < 0.0 || rel.y < 0.0 {
            return None;
        }
        let week = (rel.x / step) as usize;
        let weekday = (rel.y / step) as usize;
        (week < heatmap.weeks() && weekday < 7).then_some((week, weekday))
    };

    if let Some((week, weekday)) = response.hover_pos().and_then(cell_at) {
        let date = heatmap.date_at(week, weekday);
        let text = match heatmap.get(week, weekday) {
            Some(count) => format!("{}: {} reviews", date, count),
            None => format!("{}: no data", date),
        };
        ui.label(text);
    }

    if response.clicked() {
        return response
            .interact_pointer_pos()
            .and_then(cell_at)
            .map(|(week, weekday)| heatmap.date_at(week, weekday));
    }
    None
}

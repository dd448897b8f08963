use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local};
use habit_core::calendar::{self, DayState, DAYS_IN_WEEK};
use habit_core::habit::Habit;
use habit_core::service::{export_collection, parse_collection, HabitStoreError};
use habit_core::store::JsonFileStore;
use habit_core::week::WeekNavigator;
use habit_core::HabitService;
use tracing::{info, warn};

const WEEKDAY_LETTERS: [&str; DAYS_IN_WEEK] = ["S", "M", "T", "W", "T", "F", "S"];

#[derive(Clone, Debug, Default)]
pub struct AppConfig {
    pub data_dir: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(dir) = std::env::var("HABITBOOK_DATA_DIR") {
            config.data_dir = Some(PathBuf::from(dir));
        }
        Ok(config)
    }

    fn resolve_data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        Ok(dirs::data_dir()
            .context("no platform data directory available")?
            .join("habitbook"))
    }
}

pub fn run(config: AppConfig) -> Result<()> {
    let data_dir = config.resolve_data_dir()?;
    info!(path = %data_dir.display(), "opening habit store");
    let store = JsonFileStore::open(&data_dir).context("failed to open habit store")?;
    let service = HabitService::new(Box::new(store));

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([420.0, 680.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Habitbook",
        options,
        Box::new(move |_cc| Ok(Box::new(HabitbookApp::new(service)))),
    )
    .map_err(|err| anyhow!("ui loop terminated: {err}"))
}

#[derive(Clone)]
struct EditState {
    id: String,
    name: String,
}

pub struct HabitbookApp {
    service: HabitService,
    habits: Vec<Habit>,
    nav: WeekNavigator,
    new_habit_name: String,
    edit: Option<EditState>,
    pending_import: Option<Vec<Habit>>,
    status: Option<String>,
}

impl HabitbookApp {
    fn new(service: HabitService) -> Self {
        let mut app = Self {
            service,
            habits: Vec::new(),
            nav: WeekNavigator::default(),
            new_habit_name: String::new(),
            edit: None,
            pending_import: None,
            status: None,
        };
        match app.service.load() {
            Ok(habits) => app.habits = habits,
            Err(err) => {
                warn!(%err, "initial load failed");
                app.status = Some(format!("Could not load habits: {err}"));
            }
        }
        app
    }

    /// Fold an operation result into the view: success replaces the local
    /// collection with the one the store returned, failure lands in the
    /// status line so the user can retry.
    fn apply(&mut self, result: Result<Vec<Habit>, HabitStoreError>) {
        match result {
            Ok(habits) => {
                self.habits = habits;
                self.status = None;
            }
            Err(err) => {
                warn!(%err, "habit operation failed");
                self.status = Some(err.to_string());
            }
        }
    }

    fn add_habit(&mut self) {
        let name = self.new_habit_name.trim().to_string();
        if name.is_empty() {
            return;
        }
        let result = self.service.add(Habit::new(name));
        if result.is_ok() {
            self.new_habit_name.clear();
        }
        self.apply(result);
    }

    fn export_habits(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .set_file_name("habitbook.json")
            .save_file()
        else {
            return;
        };
        let payload = match export_collection(&self.habits) {
            Ok(payload) => payload,
            Err(err) => {
                self.status = Some(format!("Export failed: {err}"));
                return;
            }
        };
        match fs::write(&path, payload) {
            Ok(()) => {
                info!(path = %path.display(), count = self.habits.len(), "exported habits");
                self.status = Some(format!("Exported {} habits", self.habits.len()));
            }
            Err(err) => {
                warn!(%err, "export failed");
                self.status = Some(format!("Export failed: {err}"));
            }
        }
    }

    /// A non-empty collection is only replaced after the user confirms; the
    /// payload is validated before any confirmation is offered, so a bad
    /// file can never clear existing data.
    fn import_habits(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("habitbook", &["json"])
            .pick_file()
        else {
            return;
        };
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) => {
                self.status = Some(format!("Import failed: {err}"));
                return;
            }
        };
        match parse_collection(&contents) {
            Ok(imported) if self.habits.is_empty() => {
                let result = self.service.replace_all(imported);
                self.apply(result);
            }
            Ok(imported) => self.pending_import = Some(imported),
            Err(err) => {
                warn!(%err, "rejected import payload");
                self.status = Some(format!("Invalid habits file: {err}"));
            }
        }
    }

    fn global_controls(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.strong(self.nav.global().to_string());
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let global = self.nav.global();
                if ui
                    .add_enabled(!global.at_current(), egui::Button::new("▶"))
                    .clicked()
                {
                    self.nav.global_forward();
                }
                if ui
                    .add_enabled(!global.at_oldest(), egui::Button::new("◀"))
                    .clicked()
                {
                    self.nav.global_back();
                }
            });
        });
    }

    fn habit_card(&mut self, ui: &mut egui::Ui, habit: &Habit, now: DateTime<Local>) {
        ui.group(|ui| {
            ui.horizontal(|ui| {
                let editing = self.edit.as_ref().is_some_and(|edit| edit.id == habit.id);
                if editing {
                    if let Some(edit) = self.edit.as_mut() {
                        ui.text_edit_singleline(&mut edit.name);
                    }
                } else {
                    ui.strong(habit.name.as_str());
                    if ui.small_button("✏").clicked() {
                        self.edit = Some(EditState {
                            id: habit.id.clone(),
                            name: habit.name.clone(),
                        });
                    }
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let selection = self.nav.selection(&habit.id);
                    if ui
                        .add_enabled(!selection.at_current(), egui::Button::new("▶"))
                        .clicked()
                    {
                        self.nav.forward(&habit.id);
                    }
                    if ui
                        .add_enabled(!selection.at_oldest(), egui::Button::new("◀"))
                        .clicked()
                    {
                        self.nav.back(&habit.id);
                    }
                });
            });

            ui.horizontal(|ui| {
                let selection = self.nav.selection(&habit.id);
                for (slot, letter) in WEEKDAY_LETTERS.iter().enumerate() {
                    let index = calendar::day_index(selection.index(), slot);
                    let state = habit.day_state(index, now);
                    let button = egui::Button::new(
                        egui::RichText::new(*letter).color(egui::Color32::WHITE),
                    )
                    .fill(day_fill(state));
                    if ui.add(button).clicked() {
                        let mut updated = habit.clone();
                        updated.toggle_day(index);
                        let result = self.service.edit(updated);
                        self.apply(result);
                    }
                }
            });

            let editing = self.edit.as_ref().is_some_and(|edit| edit.id == habit.id);
            if editing {
                ui.horizontal(|ui| {
                    if ui.button("Cancel").clicked() {
                        self.edit = None;
                    }
                    if ui.button("Update").clicked() {
                        if let Some(edit) = self.edit.clone() {
                            let mut updated = habit.clone();
                            updated.name = edit.name;
                            let result = self.service.edit(updated);
                            if result.is_ok() {
                                self.edit = None;
                            }
                            self.apply(result);
                        }
                    }
                    if ui.button("Delete").clicked() {
                        self.edit = None;
                        let result = self.service.delete_by_id(&habit.id);
                        self.nav.forget(&habit.id);
                        self.apply(result);
                    }
                });
            }
        });
    }

    fn import_confirmation(&mut self, ctx: &egui::Context) {
        if self.pending_import.is_none() {
            return;
        }
        let mut confirmed = false;
        let mut cancelled = false;
        egui::Window::new("Confirm Habits Upload")
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                ui.label(
                    "This will replace your current habits. \
                     Export them first if you need a copy.",
                );
                ui.horizontal(|ui| {
                    if ui.button("Cancel").clicked() {
                        cancelled = true;
                    }
                    if ui.button("Replace").clicked() {
                        confirmed = true;
                    }
                });
            });
        if cancelled {
            self.pending_import = None;
        }
        if confirmed {
            if let Some(imported) = self.pending_import.take() {
                let result = self.service.replace_all(imported);
                self.apply(result);
            }
        }
    }
}

impl eframe::App for HabitbookApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Local::now();
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Habits");

            ui.horizontal(|ui| {
                let response = ui.text_edit_singleline(&mut self.new_habit_name);
                let submitted =
                    response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                if ui.button("Add").clicked() || submitted {
                    self.add_habit();
                }
            });

            ui.horizontal(|ui| {
                if ui.button("Export").clicked() {
                    self.export_habits();
                }
                if ui.button("Import").clicked() {
                    self.import_habits();
                }
            });

            ui.separator();
            self.global_controls(ui);

            if let Some(status) = self.status.clone() {
                ui.colored_label(egui::Color32::from_rgb(0xc9, 0x2a, 0x2a), status);
            }

            egui::ScrollArea::vertical().show(ui, |ui| {
                let habits = self.habits.clone();
                for habit in &habits {
                    self.habit_card(ui, habit, now);
                }
            });
        });

        self.import_confirmation(ctx);
    }
}

fn day_fill(state: DayState) -> egui::Color32 {
    match state {
        DayState::Completed => egui::Color32::from_rgb(0x2b, 0x8a, 0x3e),
        DayState::Missed => egui::Color32::from_rgb(0xc9, 0x2a, 0x2a),
        DayState::NotYetApplicable => egui::Color32::from_rgb(0x86, 0x8e, 0x96),
    }
}

//! Immediate-mode UI over a `ReviewSession`.

mod download;
mod review;

use eframe::{App, Frame, egui};
use review_core::{
    ImageLoadError, ImageLoader, Progress, ReviewConfig, ReviewError, ReviewSession, SaveOutcome,
    SessionPhase,
};

/// Which screen the window shows.
enum Screen {
    AwaitingName,
    /// The session could not start; nothing else is offered.
    Fatal(String),
    Session(Box<ReviewSession>),
}

/// Decoded image for the record on screen; dropped when the record changes.
struct ShownImage {
    reference: String,
    texture: Result<egui::TextureHandle, String>,
}

pub struct UiApp {
    config: ReviewConfig,
    screen: Screen,
    name_input: String,
    name_warning: bool,
    loader: Result<ImageLoader, String>,
    shown: Option<ShownImage>,
    /// Reference the reading/unit fields were filled for.
    editing: Option<String>,
    reading_input: String,
    unit_input: String,
    status: String,
    warning: String,
}

impl UiApp {
    pub fn new(config: ReviewConfig) -> Self {
        let loader = ImageLoader::new(
            config.display_width,
            config.display_height,
            config.http_timeout,
        )
        .map_err(|e: ImageLoadError| e.to_string());
        Self {
            config,
            screen: Screen::AwaitingName,
            name_input: String::new(),
            name_warning: false,
            loader,
            shown: None,
            editing: None,
            reading_input: String::new(),
            unit_input: String::new(),
            status: String::new(),
            warning: String::new(),
        }
    }

    pub(crate) fn phase(&self) -> SessionPhase {
        match &self.screen {
            Screen::AwaitingName | Screen::Fatal(_) => SessionPhase::AwaitingName,
            Screen::Session(session) => session.phase(),
        }
    }

    fn start_session(&mut self) {
        tracing::debug!("phase {:?} -> {:?}", self.phase(), SessionPhase::Loading);
        match ReviewSession::initialize(&self.config, &self.name_input) {
            Ok(session) => {
                self.name_warning = false;
                tracing::info!("phase -> {:?}", session.phase());
                self.screen = Screen::Session(Box::new(session));
            }
            Err(ReviewError::EmptyReviewer) => {
                self.name_warning = true;
            }
            Err(e) => {
                tracing::error!("cannot start review: {e}");
                self.screen = Screen::Fatal(e.to_string());
            }
        }
    }

    fn render_name_prompt(&mut self, ui: &mut egui::Ui) {
        ui.heading("Image Annotation Interface");
        ui.add_space(8.0);
        let mut submitted = false;
        ui.horizontal(|ui| {
            ui.label("Enter Your Name:");
            let response = ui.text_edit_singleline(&mut self.name_input);
            if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                submitted = true;
            }
            if ui.button("Start").clicked() {
                submitted = true;
            }
        });
        if submitted {
            self.start_session();
        }
        if self.name_warning {
            ui.colored_label(
                egui::Color32::from_rgb(200, 140, 0),
                "Please enter your name to proceed.",
            );
        }
    }

    fn set_save_status(&mut self, outcome: &SaveOutcome, success: &str) {
        match outcome {
            SaveOutcome::Saved { path, .. } => {
                self.warning.clear();
                self.status = format!(
                    "{success}: {} ({})",
                    path.display(),
                    chrono::Local::now().format("%H:%M:%S")
                );
            }
            SaveOutcome::Failed(failure) => {
                self.warning = failure.to_string();
            }
        }
    }
}

/// "Total: 3 | Reviewed: 1 | Pending: 2"
pub(crate) fn progress_line(progress: &Progress) -> String {
    format!(
        "Total: {} | Reviewed: {} | Pending: {}",
        progress.total, progress.reviewed, progress.pending
    )
}

impl App for UiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .auto_shrink([false; 2])
                .show(ui, |ui| {
                    if let Screen::Fatal(message) = &self.screen {
                        ui.heading("Image Annotation Interface");
                        ui.colored_label(egui::Color32::RED, message.as_str());
                    } else if matches!(self.screen, Screen::AwaitingName) {
                        self.render_name_prompt(ui);
                    } else {
                        self.render_session(ctx, ui);
                    }
                });
        });
    }
}

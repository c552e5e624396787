//! Review screen: progress, the current image and the correction form.

use super::{ShownImage, Screen, UiApp, progress_line};
use eframe::egui;
use review_core::{Progress, ReviewSession, SessionPhase, SubmitOutcome};

const WARNING_COLOR: egui::Color32 = egui::Color32::from_rgb(200, 140, 0);

impl UiApp {
    pub(super) fn session(&self) -> Option<&ReviewSession> {
        match &self.screen {
            Screen::Session(session) => Some(&**session),
            _ => None,
        }
    }

    fn session_mut(&mut self) -> Option<&mut ReviewSession> {
        match &mut self.screen {
            Screen::Session(session) => Some(&mut **session),
            _ => None,
        }
    }

    /// Renders the reviewer heading, progress banner and the active step.
    pub(super) fn render_session(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        let Some(session) = self.session() else {
            return;
        };
        let reviewer = session.reviewer().to_string();
        let progress = session.progress();
        let phase = session.phase();

        ui.heading(format!("Image Annotation Interface - Reviewer: {reviewer}"));
        ui.label(progress_line(&progress));
        self.render_download(ui);
        ui.separator();

        match phase {
            SessionPhase::AllReviewed => self.render_all_reviewed(ui),
            _ => self.render_current(ctx, ui, progress),
        }

        if !self.warning.is_empty() {
            ui.colored_label(WARNING_COLOR, self.warning.as_str());
        }
        if !self.status.is_empty() {
            ui.label(self.status.as_str());
        }
    }

    /// Fill the reading/unit fields once per record with any value already entered.
    pub(super) fn sync_inputs(&mut self) {
        let current = self
            .session()
            .and_then(|s| s.current_record())
            .map(|r| {
                (
                    r.image_reference.clone(),
                    r.actual_reading.clone(),
                    r.actual_unit.clone(),
                )
            });
        match current {
            Some((reference, reading, unit)) if self.editing.as_ref() != Some(&reference) => {
                self.reading_input = reading;
                self.unit_input = unit;
                self.editing = Some(reference);
            }
            Some(_) => {}
            None => self.editing = None,
        }
    }

    fn render_current(&mut self, ctx: &egui::Context, ui: &mut egui::Ui, progress: Progress) {
        self.sync_inputs();
        let Some((reference, caption, predicted_reading, predicted_unit)) = self
            .session()
            .and_then(|s| s.current_record())
            .map(|r| {
                (
                    r.image_reference.clone(),
                    r.caption().to_string(),
                    r.predicted_reading.clone(),
                    r.predicted_unit.clone(),
                )
            })
        else {
            return;
        };

        if let Some((position, len)) = progress.position {
            ui.heading(format!("Image {position} of {len}"));
        }
        self.render_image(ctx, ui, &reference, &caption);
        ui.add_space(8.0);

        egui::Grid::new("predicted-vs-actual")
            .num_columns(4)
            .spacing([12.0, 8.0])
            .show(ui, |ui| {
                ui.strong("Predicted Reading:");
                ui.monospace(predicted_reading.as_str());
                ui.label("Actual Reading:");
                ui.text_edit_singleline(&mut self.reading_input);
                ui.end_row();

                ui.strong("Predicted Unit:");
                ui.monospace(predicted_unit.as_str());
                ui.label("Actual Unit:");
                ui.text_edit_singleline(&mut self.unit_input);
                ui.end_row();
            });

        ui.add_space(8.0);
        if ui.button("Save & Next").clicked() {
            self.save_and_next(&reference);
        }
    }

    fn render_image(&mut self, ctx: &egui::Context, ui: &mut egui::Ui, reference: &str, caption: &str) {
        if self.shown.as_ref().is_none_or(|s| s.reference != reference) {
            let texture = match &self.loader {
                Ok(loader) => loader
                    .load(reference)
                    .map(|img| {
                        let size = [img.width() as usize, img.height() as usize];
                        let color = egui::ColorImage::from_rgba_unmultiplied(size, img.as_raw());
                        ctx.load_texture(
                            format!("record:{reference}"),
                            color,
                            egui::TextureOptions::LINEAR,
                        )
                    })
                    .map_err(|e| {
                        tracing::warn!("Failed to load image {reference}: {e}");
                        e.to_string()
                    }),
                Err(e) => Err(e.clone()),
            };
            self.shown = Some(ShownImage {
                reference: reference.to_string(),
                texture,
            });
        }

        if let Some(shown) = &self.shown {
            match &shown.texture {
                Ok(texture) => {
                    ui.image(egui::load::SizedTexture::from_handle(texture));
                    ui.label(caption);
                }
                Err(e) => {
                    ui.colored_label(egui::Color32::RED, format!("Failed to load image: {e}"));
                }
            }
        }
    }

    /// "Save & Next" for the record shown as `reference`.
    pub(super) fn save_and_next(&mut self, reference: &str) {
        let reading = self.reading_input.clone();
        let unit = self.unit_input.clone();
        let result = match self.session_mut() {
            Some(session) => session.submit(reference, &reading, &unit),
            None => return,
        };
        match result {
            Ok(SubmitOutcome::Saved) => {
                self.warning.clear();
                self.status = format!(
                    "Saved {reference} ({})",
                    chrono::Local::now().format("%H:%M:%S")
                );
                self.shown = None;
                self.sync_inputs();
            }
            Ok(SubmitOutcome::SaveFailed(failure)) => {
                self.warning = format!("Could not save. {failure}");
            }
            Err(e) => {
                tracing::warn!("submit rejected: {e}");
                self.warning = e.to_string();
                self.shown = None;
                self.sync_inputs();
            }
        }
    }

    fn render_all_reviewed(&mut self, ui: &mut egui::Ui) {
        ui.colored_label(
            egui::Color32::from_rgb(0, 150, 70),
            "All images have already been reviewed.",
        );
        if ui.button("Save Final File").clicked() {
            let outcome = match self.session() {
                Some(session) => session.finalize(),
                None => return,
            };
            match outcome {
                Ok(outcome) => self.set_save_status(&outcome, "Final file saved as"),
                Err(e) => self.warning = e.to_string(),
            }
        }
    }
}

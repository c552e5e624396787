//! Download button for allow-listed reviewers.

use super::UiApp;
use eframe::egui;
use rfd::FileDialog;

impl UiApp {
    /// Shown only to allow-listed reviewers once an output file exists.
    pub(super) fn render_download(&mut self, ui: &mut egui::Ui) {
        let Some(session) = self.session() else {
            return;
        };
        if !self.config.may_download(session.reviewer()) || !session.output_path().exists() {
            return;
        }
        if !ui.button("Download Final File").clicked() {
            return;
        }

        let prepared = session.prepare_download(&self.config);
        match prepared {
            None => {}
            Some(Err(e)) => {
                tracing::error!("preparing download failed: {e}");
                self.warning = format!("Could not prepare download: {e}");
            }
            Some(Ok(artifact)) => {
                let Some(target) = FileDialog::new()
                    .add_filter("CSV", &["csv"])
                    .set_file_name(&artifact.file_name)
                    .save_file()
                else {
                    return;
                };
                match std::fs::write(&target, &artifact.bytes) {
                    Ok(()) => {
                        self.warning.clear();
                        self.status = format!("Downloaded to {}", target.display());
                    }
                    Err(e) => {
                        self.warning = format!("Could not prepare download: {e}");
                    }
                }
            }
        }
    }
}

use std::time::Duration;

use eframe::egui;

use crate::state::{AppState, Tab};
use crate::ui::{chat, panels, plot, table};

/// Repaint interval while a remote reply is in flight.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct NfeAnalystApp {
    pub state: AppState,
}

impl NfeAnalystApp {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    fn handle_input(&mut self, ctx: &egui::Context) {
        let dropped: Vec<_> = ctx.input(|i| {
            i.raw
                .dropped_files
                .iter()
                .filter_map(|f| f.path.clone())
                .collect()
        });
        for path in dropped {
            self.state.open_path(&path);
        }

        let (open, quit) = ctx.input_mut(|i| {
            (
                i.consume_key(egui::Modifiers::COMMAND, egui::Key::O),
                i.consume_key(egui::Modifiers::COMMAND, egui::Key::Q),
            )
        });
        if open {
            panels::open_file_dialog(&mut self.state);
        }
        if quit {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }
    }
}

impl eframe::App for NfeAnalystApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.state.poll_remote() {
            ctx.request_repaint();
        } else if self.state.busy() {
            ctx.request_repaint_after(POLL_INTERVAL);
        }
        self.handle_input(ctx);

        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: files and quick analyses ----
        egui::SidePanel::left("file_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Right side panel: chat ----
        egui::SidePanel::right("chat_panel")
            .default_width(380.0)
            .resizable(true)
            .show(ctx, |ui| {
                chat::chat_panel(ui, &mut self.state);
            });

        // ---- Central panel: table / metadata / charts ----
        egui::CentralPanel::default().show(ctx, |ui| match self.state.tab {
            Tab::Table => table::data_table(ui, &mut self.state),
            Tab::Metadata => table::metadata(ui, &self.state),
            Tab::Charts => plot::charts(ui, &self.state),
        });

        panels::confirm_removal(&mut self.state);
    }
}

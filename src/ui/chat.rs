use eframe::egui::{self, Key, RichText, ScrollArea, TextEdit, Ui};

use crate::color::sender_color;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Right panel – chat with the analyst
// ---------------------------------------------------------------------------

pub fn chat_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("💬 Consulta ao Especialista");
    ui.separator();

    // Predefined questions
    let entries = state.analyst.router().catalog().entries().to_vec();
    ui.horizontal_wrapped(|ui: &mut Ui| {
        for entry in &entries {
            let button = ui
                .add_enabled(!state.busy(), egui::Button::new(&entry.key).small())
                .on_hover_text(&entry.text);
            if button.clicked() {
                state.ask(&entry.text);
            }
        }
    });
    ui.separator();

    // Input line at the bottom, log fills the rest.
    egui::TopBottomPanel::bottom("chat_input")
        .show_separator_line(false)
        .show_inside(ui, |ui: &mut Ui| {
            ui.horizontal(|ui: &mut Ui| {
                let send = ui.add_enabled(!state.busy(), egui::Button::new("Enviar"));
                let input = ui.add_sized(
                    ui.available_size_before_wrap(),
                    TextEdit::singleline(&mut state.input).hint_text("Faça uma pergunta"),
                );
                let entered = input.lost_focus() && ui.input(|i| i.key_pressed(Key::Enter));
                if send.clicked() || entered {
                    state.submit_input();
                    input.request_focus();
                }
            });
            if let Some(pending) = &state.pending {
                ui.horizontal(|ui: &mut Ui| {
                    ui.spinner();
                    ui.label(format!("Consultando especialista: {}", pending.question()));
                });
            }
        });

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .stick_to_bottom(true)
        .show(ui, |ui: &mut Ui| {
            for message in &state.chat {
                let color = sender_color(message.sender);
                ui.label(
                    RichText::new(format!("[{}] {}:", message.timestamp, message.sender.label()))
                        .color(color)
                        .strong(),
                );
                ui.label(RichText::new(&message.text).color(color));
                ui.add_space(6.0);
            }
        });
}

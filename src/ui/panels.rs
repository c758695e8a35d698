use eframe::egui::{self, RichText, ScrollArea, Ui};
use rfd::{MessageButtons, MessageDialog, MessageDialogResult, MessageLevel};

use crate::analysis::{format_count, Query};
use crate::color::sender_color;
use crate::state::{AppState, Tab};

/// Quick-analysis buttons in the left panel.
const QUICK_ANALYSES: [(&str, Query); 6] = [
    ("Top Fornecedores", Query::TopSuppliers { n: 5 }),
    ("Total de NFs", Query::CountInvoices),
    ("Valor Médio", Query::MeanValue),
    ("Distribuição", Query::TemporalDistribution),
    ("Estatísticas", Query::ValueStatistics),
    ("Frequência", Query::SupplierFrequency { n: 5 }),
];

// ---------------------------------------------------------------------------
// Left side panel – loaded files and quick analyses
// ---------------------------------------------------------------------------

pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Arquivos");
    ui.separator();

    if state.analyst.registry().is_empty() {
        ui.weak("Nenhum arquivo carregado.");
    }

    let summaries = state.analyst.registry().summaries();
    let active = state.analyst.registry().active_name().map(str::to_string);

    ScrollArea::vertical()
        .id_salt("file_list")
        .max_height(ui.available_height() * 0.5)
        .show(ui, |ui: &mut Ui| {
            for summary in &summaries {
                let is_active = active.as_deref() == Some(summary.name.as_str());
                ui.horizontal(|ui: &mut Ui| {
                    let label = format!(
                        "{}  ({} linhas, {} colunas)",
                        summary.name,
                        format_count(summary.rows),
                        summary.columns
                    );
                    if ui.selectable_label(is_active, label).clicked() && !is_active {
                        state.select(&summary.name);
                    }
                    if ui.small_button("🗑").on_hover_text("Remover arquivo").clicked() {
                        state.request_removal(&summary.name);
                    }
                });
            }
        });

    ui.add_space(8.0);
    ui.heading("Análise rápida");
    ui.separator();
    for (label, query) in QUICK_ANALYSES {
        if ui
            .add_sized([ui.available_width(), 24.0], egui::Button::new(label))
            .clicked()
        {
            state.run_quick(query);
        }
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("Arquivo", |ui: &mut Ui| {
            if ui.button("Abrir…  (Ctrl+O)").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui.button("Exportar dados consolidados…").clicked() {
                export_dialog(state);
                ui.close_menu();
            }
            ui.separator();
            if ui.button("Sair  (Ctrl+Q)").clicked() {
                ui.ctx().send_viewport_cmd(egui::ViewportCommand::Close);
            }
        });

        ui.separator();

        for (tab, label) in [
            (Tab::Table, "Tabela"),
            (Tab::Metadata, "Metadados"),
            (Tab::Charts, "Gráficos"),
        ] {
            if ui.selectable_label(state.tab == tab, label).clicked() {
                state.tab = tab;
            }
        }

        ui.separator();

        let registry = state.analyst.registry();
        if !registry.is_empty() {
            let total: usize = registry.summaries().iter().map(|s| s.rows).sum();
            ui.label(format!(
                "{} arquivos, {} notas",
                registry.len(),
                format_count(total)
            ));
        }

        match &state.status_message {
            Some((sender, msg)) => {
                ui.label(RichText::new(msg).color(sender_color(*sender)));
            }
            None => {
                ui.label(RichText::new("🟢 Pronto").weak());
            }
        }
    });
}

// ---------------------------------------------------------------------------
// Dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let files = rfd::FileDialog::new()
        .set_title("Abrir dados de NF-e")
        .add_filter("Arquivos suportados", &["csv", "zip", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("ZIP", &["zip"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_files();

    for path in files.unwrap_or_default() {
        state.open_path(&path);
    }
}

pub fn export_dialog(state: &mut AppState) {
    if state.analyst.registry().is_empty() {
        MessageDialog::new()
            .set_level(MessageLevel::Warning)
            .set_title("Aviso")
            .set_description("Nenhum dado para exportar")
            .set_buttons(MessageButtons::Ok)
            .show();
        return;
    }

    let path = rfd::FileDialog::new()
        .set_title("Salvar análise consolidada")
        .set_file_name("nfe_consolidado.csv")
        .add_filter("CSV", &["csv"])
        .add_filter("Parquet", &["parquet"])
        .save_file();

    if let Some(path) = path {
        state.export_to(&path);
    }
}

/// Ask before dropping a file from the registry.
pub fn confirm_removal(state: &mut AppState) {
    let Some(name) = state.pending_removal.clone() else {
        return;
    };
    let answer = MessageDialog::new()
        .set_level(MessageLevel::Warning)
        .set_title("Confirmar")
        .set_description(format!("Remover arquivo {name}?"))
        .set_buttons(MessageButtons::YesNo)
        .show();
    state.confirm_removal(matches!(answer, MessageDialogResult::Yes));
}

use eframe::egui::{self, RichText, ScrollArea, TextEdit, Ui};
use egui_extras::{Column as TableColumn, TableBuilder};

use crate::analysis::{format_count, Query};
use crate::data::model::ColumnKind;
use crate::state::AppState;

const ROW_HEIGHT: f32 = 18.0;

// ---------------------------------------------------------------------------
// Table tab
// ---------------------------------------------------------------------------

/// Active dataset as a searchable table.
pub fn data_table(ui: &mut Ui, state: &mut AppState) {
    let Some(dataset) = state.analyst.registry().active().cloned() else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Abra um arquivo para ver os dados  (Arquivo → Abrir…)");
        });
        return;
    };

    ui.horizontal(|ui: &mut Ui| {
        ui.label("🔍");
        let response = ui.add(
            TextEdit::singleline(&mut state.search)
                .hint_text("Buscar em todas as colunas")
                .desired_width(280.0),
        );
        if response.changed() {
            state.refilter();
        }
        ui.label(format!(
            "{}: {} de {} linhas",
            dataset.name(),
            format_count(state.visible_indices.len()),
            format_count(dataset.len())
        ));
    });
    ui.separator();

    let visible = &state.visible_indices;
    ScrollArea::horizontal().show(ui, |ui: &mut Ui| {
        TableBuilder::new(ui)
            .striped(true)
            .resizable(true)
            .columns(TableColumn::auto().at_least(60.0), dataset.columns().len())
            .header(ROW_HEIGHT + 4.0, |mut header| {
                for column in dataset.columns() {
                    header.col(|ui: &mut Ui| {
                        ui.strong(&column.name).on_hover_text(column.kind.to_string());
                    });
                }
            })
            .body(|body| {
                body.rows(ROW_HEIGHT, visible.len(), |mut row| {
                    let cells = &dataset.rows()[visible[row.index()]];
                    for cell in cells {
                        row.col(|ui: &mut Ui| {
                            ui.label(cell.to_string());
                        });
                    }
                });
            });
    });
}

// ---------------------------------------------------------------------------
// Metadata tab
// ---------------------------------------------------------------------------

/// Column kinds per dataset plus the value statistics over every dataset.
pub fn metadata(ui: &mut Ui, state: &AppState) {
    let registry = state.analyst.registry();
    if registry.is_empty() {
        ui.weak("Nenhum arquivo carregado.");
        return;
    }

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for summary in registry.summaries() {
                egui::CollapsingHeader::new(RichText::new(&summary.name).strong())
                    .default_open(registry.active_name() == Some(summary.name.as_str()))
                    .show(ui, |ui: &mut Ui| {
                        ui.label(format!("Registros: {}", format_count(summary.rows)));
                        ui.label(format!("Colunas: {}", summary.columns));
                        for (kind, names) in [
                            (ColumnKind::Numeric, &summary.numeric),
                            (ColumnKind::Text, &summary.text),
                            (ColumnKind::Temporal, &summary.temporal),
                        ] {
                            if !names.is_empty() {
                                ui.label(format!("Colunas de tipo {kind}: {}", names.join(", ")));
                            }
                        }
                    });
            }

            ui.separator();
            match state.analyst.run(Query::ValueStatistics) {
                Ok(analysis) => {
                    ui.monospace(analysis.to_string());
                }
                Err(err) => {
                    ui.weak(err.to_string());
                }
            }
        });
}

use eframe::egui::{Color32, Ui};
use egui_plot::{Bar, BarChart, Legend, Plot};

use crate::analysis::format_brl;
use crate::color::bar_colors;
use crate::state::AppState;

const HISTOGRAM_BINS: usize = 20;

// ---------------------------------------------------------------------------
// Charts tab
// ---------------------------------------------------------------------------

/// Render the charts tab: supplier rankings, monthly volume and a value histogram.
pub fn charts(ui: &mut Ui, state: &AppState) {
    if state.analyst.registry().is_empty() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Carregue um arquivo para ver os gráficos  (Arquivo → Abrir…)");
        });
        return;
    }

    let charts = &state.charts;
    eframe::egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            ui.strong("Top 5 fornecedores por valor total");
            let labels: Vec<String> = charts.top_suppliers.iter().map(|(s, _)| s.clone()).collect();
            let bars = charts
                .top_suppliers
                .iter()
                .map(|(name, total)| (format!("{name}: {}", format_brl(*total)), *total))
                .collect();
            labeled_bars(ui, "top_suppliers", labels, bars);

            ui.separator();
            ui.strong("Top 5 fornecedores (frequência)");
            let labels: Vec<String> = charts.frequency.iter().map(|(s, _)| s.clone()).collect();
            let bars = charts
                .frequency
                .iter()
                .map(|(name, count)| (format!("{name}: {count}"), *count as f64))
                .collect();
            labeled_bars(ui, "supplier_frequency", labels, bars);

            ui.separator();
            ui.strong("Notas por mês");
            let labels: Vec<String> = charts.months.iter().map(|(m, _)| m.to_string()).collect();
            let bars = charts
                .months
                .iter()
                .map(|(month, count)| (format!("{month}: {count}"), *count as f64))
                .collect();
            labeled_bars(ui, "months", labels, bars);

            if let Some((column, values)) = &charts.histogram {
                ui.separator();
                ui.strong(format!("Distribuição de {column}"));
                histogram_plot(ui, values);
            }
        });
}

fn labeled_bars(ui: &mut Ui, id: &str, labels: Vec<String>, bars: Vec<(String, f64)>) {
    if bars.is_empty() {
        ui.weak("Colunas necessárias não encontradas nos dados.");
        return;
    }

    let colors = bar_colors(bars.len());
    let bars: Vec<Bar> = bars
        .into_iter()
        .zip(colors)
        .enumerate()
        .map(|(i, ((name, height), color))| Bar::new(i as f64, height).name(name).fill(color).width(0.7))
        .collect();

    Plot::new(id)
        .height(220.0)
        .allow_drag(false)
        .allow_scroll(false)
        .allow_zoom(false)
        .x_axis_formatter(move |mark, _range| {
            let i = mark.value.round();
            if (mark.value - i).abs() > f64::EPSILON || i < 0.0 {
                return String::new();
            }
            labels.get(i as usize).cloned().unwrap_or_default()
        })
        .show(ui, |plot_ui| plot_ui.bar_chart(BarChart::new(bars)));
}

fn histogram_plot(ui: &mut Ui, values: &[f64]) {
    let bars: Vec<Bar> = histogram(values, HISTOGRAM_BINS)
        .into_iter()
        .map(|bin| {
            Bar::new(bin.center, bin.count as f64)
                .width(bin.width)
                .name(format!("{} a {}", format_brl(bin.center - bin.width / 2.0), format_brl(bin.center + bin.width / 2.0)))
                .fill(Color32::from_rgb(0x1a, 0x73, 0xe8))
        })
        .collect();

    Plot::new("value_histogram")
        .height(220.0)
        .legend(Legend::default())
        .show(ui, |plot_ui| plot_ui.bar_chart(BarChart::new(bars)));
}

// ---------------------------------------------------------------------------
// Histogram binning
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Bin {
    pub center: f64,
    pub width: f64,
    pub count: usize,
}

/// Equal-width bins over `[min, max]`; the maximum falls in the last bin.
pub fn histogram(values: &[f64], bins: usize) -> Vec<Bin> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if range.abs() < f64::EPSILON {
        return vec![Bin {
            center: min,
            width: 1.0,
            count: values.len(),
        }];
    }

    let width = range / bins as f64;
    let mut counts = vec![0usize; bins];
    for &v in values {
        let slot = (((v - min) / width) as usize).min(bins - 1);
        counts[slot] += 1;
    }
    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| Bin {
            center: min + width * (i as f64 + 0.5),
            width,
            count,
        })
        .collect()
}

//! Writes synthetic NF-e tables for trying out the viewer:
//!
//! * `nfe_portal.csv`   – transparency-portal headers, `;`, Windows-1252, `1.234,56`
//! * `nfe_planilha.csv` – lowercase headers, `,`, UTF-8, `1234.56`
//! * `nfe_amostra.zip`  – both of the above
//!
//! Usage: `generate_sample [output_dir]`

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use encoding_rs::WINDOWS_1252;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use zip::write::SimpleFileOptions;

const SUPPLIERS: &[(&str, f64)] = &[
    ("PAPELARIA CENTRAL LTDA", 350.0),
    ("ACME COMÉRCIO DE INFORMÁTICA S.A.", 4200.0),
    ("DISTRIBUIDORA SÃO JOÃO EIRELI", 1250.0),
    ("LIMPEZA TOTAL SERVIÇOS LTDA", 980.0),
    ("FARMÁCIA POPULAR DO BRASIL", 210.0),
    ("CONSTRUTORA HORIZONTE LTDA", 15800.0),
];

const STATES: &[&str] = &["SP", "RJ", "MG", "PR", "RS", "BA"];

struct Invoice {
    key: String,
    supplier: &'static str,
    state: &'static str,
    date: NaiveDate,
    value: f64,
}

fn generate(rng: &mut StdRng, count: usize, start: NaiveDate) -> Vec<Invoice> {
    (0..count)
        .map(|_| {
            let (supplier, typical) = SUPPLIERS[rng.gen_range(0..SUPPLIERS.len())];
            let value = (typical * rng.gen_range(0.4..1.8) * 100.0).round() / 100.0;
            let key: String = (0..44).map(|_| char::from(b'0' + rng.gen_range(0..10u8))).collect();
            Invoice {
                key,
                supplier,
                state: STATES[rng.gen_range(0..STATES.len())],
                date: start + Duration::days(rng.gen_range(0..180)),
                value,
            }
        })
        .collect()
}

/// `1234.5` → `1.234,50`
fn brazilian(value: f64) -> String {
    let cents = (value * 100.0).round() as u64;
    let int = (cents / 100).to_string();
    let mut grouped = String::new();
    for (i, ch) in int.chars().enumerate() {
        if i > 0 && (int.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    format!("{grouped},{:02}", cents % 100)
}

fn portal_csv(invoices: &[Invoice]) -> Vec<u8> {
    let mut text = String::from(
        "CHAVE DE ACESSO;RAZÃO SOCIAL EMITENTE;UF EMITENTE;DATA EMISSÃO;VALOR NOTA FISCAL\r\n",
    );
    for inv in invoices {
        text.push_str(&format!(
            "{};{};{};{};{}\r\n",
            inv.key,
            inv.supplier,
            inv.state,
            inv.date.format("%d/%m/%Y 10:00:00"),
            brazilian(inv.value)
        ));
    }
    let (bytes, _, _) = WINDOWS_1252.encode(&text);
    bytes.into_owned()
}

fn sheet_csv(invoices: &[Invoice]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["data", "fornecedor", "uf", "valor"])?;
    for inv in invoices {
        writer.write_record([
            inv.date.format("%Y-%m-%d").to_string(),
            inv.supplier.to_string(),
            inv.state.to_string(),
            format!("{:.2}", inv.value),
        ])?;
    }
    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("flushing CSV buffer: {e}"))
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    File::create(path)
        .and_then(|mut f| f.write_all(bytes))
        .with_context(|| format!("writing {}", path.display()))
}

fn main() -> Result<()> {
    let out_dir = std::env::args().nth(1).map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&out_dir)?;

    let mut rng = StdRng::seed_from_u64(281);
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).context("invalid start date")?;

    let portal = portal_csv(&generate(&mut rng, 400, start));
    let sheet = sheet_csv(&generate(&mut rng, 150, start + Duration::days(90)))?;

    write_file(&out_dir.join("nfe_portal.csv"), &portal)?;
    write_file(&out_dir.join("nfe_planilha.csv"), &sheet)?;

    let zip_path = out_dir.join("nfe_amostra.zip");
    let mut archive = zip::ZipWriter::new(File::create(&zip_path)?);
    for (name, bytes) in [("nfe_portal.csv", &portal), ("nfe_planilha.csv", &sheet)] {
        archive.start_file(name, SimpleFileOptions::default())?;
        archive.write_all(bytes)?;
    }
    archive.finish()?;

    println!(
        "Wrote nfe_portal.csv (400 rows), nfe_planilha.csv (150 rows) and nfe_amostra.zip to {}",
        out_dir.display()
    );
    Ok(())
}

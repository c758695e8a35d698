//! Line-oriented menu for running without a window.

use std::io::{self, BufRead, Write};
use std::path::Path;

use crate::analysis::format_count;
use crate::context::AnalystContext;

const RULE: &str = "============================================================";

struct Session<'a, R, W> {
    ctx: &'a mut AnalystContext,
    input: R,
    out: W,
}

/// Run the menu on stdin/stdout until the user quits.
pub fn run(ctx: &mut AnalystContext) -> io::Result<()> {
    let stdin = io::stdin();
    run_with(ctx, stdin.lock(), io::stdout())
}

/// Run the menu over arbitrary streams. Ends on option 7 or end of input.
pub fn run_with<R: BufRead, W: Write>(ctx: &mut AnalystContext, input: R, out: W) -> io::Result<()> {
    Session { ctx, input, out }.menu()
}

impl<R: BufRead, W: Write> Session<'_, R, W> {
    /// Print `text` and read one trimmed line; `None` at end of input.
    fn prompt(&mut self, text: &str) -> io::Result<Option<String>> {
        write!(self.out, "{text}")?;
        self.out.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn menu(&mut self) -> io::Result<()> {
        loop {
            writeln!(self.out, "\n{RULE}")?;
            writeln!(self.out, "{:^60}", "SISTEMA ESPECIALISTA EM NOTAS FISCAIS")?;
            writeln!(self.out, "{RULE}")?;

            writeln!(self.out, "\nARQUIVOS CARREGADOS:")?;
            let active = self.ctx.registry().active_name().map(str::to_string);
            for (i, name) in self.ctx.registry().names().iter().enumerate() {
                let marker = if active.as_deref() == Some(*name) { " (ATIVO)" } else { "" };
                writeln!(self.out, "{}. {name}{marker}", i + 1)?;
            }

            writeln!(self.out, "\nMENU PRINCIPAL:")?;
            writeln!(self.out, "1. Carregar arquivo")?;
            writeln!(self.out, "2. Remover arquivo")?;
            writeln!(self.out, "3. Visualizar metadados")?;
            writeln!(self.out, "4. Perguntas pré-definidas")?;
            writeln!(self.out, "5. Pergunta personalizada")?;
            writeln!(self.out, "6. Exportar análise consolidada")?;
            writeln!(self.out, "7. Sair")?;

            let Some(choice) = self.prompt("\nSelecione uma opção: ")? else {
                return Ok(());
            };
            match choice.as_str() {
                "1" => self.load()?,
                "2" => self.remove()?,
                "3" => self.metadata()?,
                "4" => self.predefined()?,
                "5" => self.custom()?,
                "6" => self.export()?,
                "7" => {
                    writeln!(self.out, "\nEncerrando o sistema...")?;
                    return Ok(());
                }
                _ => writeln!(self.out, "Opção inválida")?,
            }
        }
    }

    fn load(&mut self) -> io::Result<()> {
        let Some(path) = self.prompt("Caminho do arquivo (CSV, ZIP, JSON ou Parquet): ")? else {
            return Ok(());
        };
        match self.ctx.ingest(Path::new(&path)) {
            Ok(report) => {
                for file in report {
                    writeln!(
                        self.out,
                        "Arquivo carregado: {} ({} registros)",
                        file.name,
                        format_count(file.rows)
                    )?;
                    if file.skipped_rows > 0 {
                        writeln!(self.out, "  {} linhas malformadas ignoradas", file.skipped_rows)?;
                    }
                }
            }
            Err(e) => writeln!(self.out, "Falha ao carregar {path}: {e:#}")?,
        }
        Ok(())
    }

    fn remove(&mut self) -> io::Result<()> {
        let Some(name) = self.prompt("Nome do arquivo a remover: ")? else {
            return Ok(());
        };
        match self.ctx.remove(&name) {
            Ok(()) => writeln!(self.out, "Arquivo {name} removido"),
            Err(e) => writeln!(self.out, "{e}"),
        }
    }

    fn metadata(&mut self) -> io::Result<()> {
        let summaries = self.ctx.registry().summaries();
        if summaries.is_empty() {
            return writeln!(self.out, "Nenhum arquivo carregado");
        }
        writeln!(self.out, "\nMETADADOS DOS ARQUIVOS:")?;
        for summary in summaries {
            writeln!(self.out, "\n* {}", summary.name)?;
            writeln!(self.out, "  Registros: {}", format_count(summary.rows))?;
            writeln!(self.out, "  Colunas: {}", summary.columns)?;
            writeln!(self.out, "  Numéricas: {}", summary.numeric.join(", "))?;
            writeln!(self.out, "  Texto: {}", summary.text.join(", "))?;
            writeln!(self.out, "  Datas: {}", summary.temporal.join(", "))?;
        }
        Ok(())
    }

    fn predefined(&mut self) -> io::Result<()> {
        let entries = self.ctx.router().catalog().entries().to_vec();
        writeln!(self.out, "\nPERGUNTAS PRÉ-DEFINIDAS:")?;
        for (i, entry) in entries.iter().enumerate() {
            writeln!(self.out, "{}. {}", i + 1, entry.text)?;
        }
        let Some(choice) = self.prompt("Selecione uma pergunta: ")? else {
            return Ok(());
        };
        let picked = choice
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| entries.get(i));
        match picked {
            Some(entry) => self.answer(&entry.text),
            None => writeln!(self.out, "Opção inválida"),
        }
    }

    fn custom(&mut self) -> io::Result<()> {
        match self.prompt("Digite sua pergunta: ")? {
            Some(question) if !question.is_empty() => self.answer(&question),
            _ => Ok(()),
        }
    }

    fn answer(&mut self, question: &str) -> io::Result<()> {
        match self.ctx.ask_blocking(question) {
            Ok(text) => writeln!(self.out, "\nRESPOSTA:\n{text}\n"),
            Err(err) => writeln!(self.out, "\nErro: {err}\n"),
        }
    }

    fn export(&mut self) -> io::Result<()> {
        let default = format!(
            "analise_consolidada_{}.csv",
            chrono::Local::now().format("%Y%m%d")
        );
        let Some(path) = self.prompt(&format!("Salvar em [{default}]: "))? else {
            return Ok(());
        };
        let path = if path.is_empty() { default } else { path };
        match self.ctx.export(Path::new(&path)) {
            Ok(rows) => writeln!(self.out, "Análise exportada para {path} ({rows} registros)"),
            Err(e) => writeln!(self.out, "Erro ao exportar: {e:#}"),
        }
    }
}

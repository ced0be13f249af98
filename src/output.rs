use crate::error::Result;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tabled::{builder::Builder, settings::Style, Table, Tabled};

/// Rendered size of an embedded chart, in inches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplaySize {
    pub width: f64,
    pub height: Option<f64>,
}

impl DisplaySize {
    pub const fn width(width: f64) -> Self {
        DisplaySize { width, height: None }
    }
}

/// Receiver of report sections. Calls appear in the document in call order.
pub trait ReportSink {
    fn heading(&mut self, text: &str, level: usize);
    fn paragraph(&mut self, text: &str);
    /// `rows` hold display-ready cells, one `Vec` per body row.
    fn table(&mut self, header: &[String], rows: &[Vec<String>]);
    fn image(&mut self, path: &Path, size: DisplaySize);
}

/// Emit typed rows as a table, using the column names of their `Tabled` derive.
pub fn emit_table<T: Tabled>(sink: &mut dyn ReportSink, rows: &[T]) {
    let header: Vec<String> = T::headers().into_iter().map(|h| h.into_owned()).collect();
    let body: Vec<Vec<String>> = rows
        .iter()
        .map(|r| r.fields().into_iter().map(|c| c.into_owned()).collect())
        .collect();
    sink.table(&header, &body);
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading { text: String, level: usize },
    Paragraph(String),
    Table { header: Vec<String>, rows: Vec<Vec<String>> },
    Image { path: PathBuf, size: DisplaySize },
}

/// In-memory document rendered to Markdown on save.
#[derive(Debug, Default)]
pub struct MarkdownDocument {
    blocks: Vec<Block>,
}

impl MarkdownDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            match block {
                Block::Heading { text, level } => {
                    out.push_str(&"#".repeat((*level).clamp(1, 6)));
                    out.push(' ');
                    out.push_str(text);
                }
                Block::Paragraph(text) => out.push_str(text),
                Block::Table { header, rows } => out.push_str(&render_table(header, rows)),
                Block::Image { path, size } => {
                    let alt = path.file_stem().and_then(|s| s.to_str()).unwrap_or("chart");
                    out.push_str(&format!("![{}]({}){{ width={}in", alt, path.display(), size.width));
                    if let Some(h) = size.height {
                        out.push_str(&format!(" height={}in", h));
                    }
                    out.push_str(" }");
                }
            }
            out.push_str("\n\n");
        }
        out
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        ensure_parent(path)?;
        fs::write(path, self.to_markdown())?;
        Ok(())
    }
}

impl ReportSink for MarkdownDocument {
    fn heading(&mut self, text: &str, level: usize) {
        self.blocks.push(Block::Heading { text: text.to_string(), level });
    }

    fn paragraph(&mut self, text: &str) {
        self.blocks.push(Block::Paragraph(text.to_string()));
    }

    fn table(&mut self, header: &[String], rows: &[Vec<String>]) {
        self.blocks.push(Block::Table {
            header: header.to_vec(),
            rows: rows.to_vec(),
        });
    }

    fn image(&mut self, path: &Path, size: DisplaySize) {
        self.blocks.push(Block::Image { path: path.to_path_buf(), size });
    }
}

fn escape_cell(cell: &str) -> String {
    cell.replace('|', "\\|")
}

fn render_table(header: &[String], rows: &[Vec<String>]) -> String {
    let mut builder = Builder::default();
    builder.push_record(header.iter().map(|h| escape_cell(h)));
    for row in rows {
        builder.push_record(row.iter().map(|c| escape_cell(c)));
    }
    builder.build().with(Style::markdown()).to_string()
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    ensure_parent(path)?;
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

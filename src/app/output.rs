//! Rendering scan events and repository listings to stdout
//!
//! `jsonl` writes every event as it arrives, exactly in its wire shape.
//! `text` buffers findings and prints a table once the scan has finished.

use crate::app::cli::args::OutputFormat;
use crate::core::styles::StyleRole;
use crate::events::event::ScanEvent;
use crate::repository::types::RepositoryReference;
use crate::scanner::types::Finding;
use prettytable::{format, Cell, Row, Table};
use std::io::{self, Write};

/// Consumer of scan events
pub trait EventSink {
    fn event(&mut self, event: &ScanEvent) -> io::Result<()>;

    /// Called once after the stream ends
    fn finish(&mut self) -> io::Result<()>;
}

pub fn sink_for<'a, W: Write + 'a>(
    output: OutputFormat,
    out: W,
    color: bool,
) -> Box<dyn EventSink + 'a> {
    match output {
        OutputFormat::Jsonl => Box::new(JsonLinesSink::new(out)),
        OutputFormat::Text => Box::new(TextSink::new(out, color)),
    }
}

pub struct JsonLinesSink<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> EventSink for JsonLinesSink<W> {
    fn event(&mut self, event: &ScanEvent) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, event)?;
        self.out.write_all(b"\n")?;
        self.out.flush()
    }

    fn finish(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

pub struct TextSink<W: Write> {
    out: W,
    color: bool,
    repo_name: Option<String>,
    findings: Vec<Finding>,
    manifests: Vec<String>,
    outcome: Option<ScanEvent>,
}

impl<W: Write> TextSink<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self {
            out,
            color,
            repo_name: None,
            findings: Vec::new(),
            manifests: Vec::new(),
            outcome: None,
        }
    }

    fn findings_table(&self) -> Table {
        let header = |title: &str| Cell::new(title).style_spec(StyleRole::Header.table_spec(self.color));

        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_CLEAN);
        table.set_titles(Row::new(vec![
            header("File"),
            header("Line"),
            header("Marker"),
            header("Text"),
            header("Next line"),
        ]));

        for finding in &self.findings {
            table.add_row(Row::new(vec![
                Cell::new(&finding.file_path).style_spec(StyleRole::Path.table_spec(self.color)),
                Cell::new(&finding.line_num.to_string()).style_spec("r"),
                Cell::new(&finding.marker).style_spec(StyleRole::Marker.table_spec(self.color)),
                Cell::new(&finding.todo_text),
                Cell::new(&finding.next_line).style_spec(StyleRole::Context.table_spec(self.color)),
            ]));
        }
        table
    }
}

impl<W: Write> EventSink for TextSink<W> {
    fn event(&mut self, event: &ScanEvent) -> io::Result<()> {
        match event {
            ScanEvent::Init { repo_name, .. } => self.repo_name = Some(repo_name.clone()),
            ScanEvent::Todo { todo, .. } => self.findings.push(todo.clone()),
            ScanEvent::TodoMdFiles { files } => {
                self.manifests = files.iter().map(|f| f.file_path.clone()).collect()
            }
            ScanEvent::Complete { .. } | ScanEvent::Error { .. } => {
                self.outcome = Some(event.clone())
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        let repo = self.repo_name.clone().unwrap_or_else(|| "repository".to_string());

        if !self.findings.is_empty() {
            self.findings_table().print(&mut self.out)?;
            writeln!(self.out)?;
        }
        if !self.manifests.is_empty() {
            writeln!(
                self.out,
                "{} {}",
                StyleRole::Header.paint("Task lists:", self.color),
                self.manifests.join(", ")
            )?;
        }

        let summary = match &self.outcome {
            Some(ScanEvent::Complete { count }) => StyleRole::Success.paint(
                &format!("{}: {} marker{} found", repo, count, if *count == 1 { "" } else { "s" }),
                self.color,
            ),
            Some(ScanEvent::Error {
                message,
                code,
                correlation_id,
            }) => StyleRole::Failure.paint(
                &format!("{} failed ({}): {} [{}]", repo, code, message, correlation_id),
                self.color,
            ),
            _ => StyleRole::Failure.paint(&format!("{}: scan interrupted", repo), self.color),
        };
        writeln!(self.out, "{}", summary)?;
        self.out.flush()
    }
}

/// Print the repositories known to the local store
pub fn write_repository_list<W: Write>(
    out: &mut W,
    references: &[RepositoryReference],
    output: OutputFormat,
    color: bool,
) -> io::Result<()> {
    match output {
        OutputFormat::Jsonl => {
            for reference in references {
                serde_json::to_writer(&mut *out, reference)?;
                out.write_all(b"\n")?;
            }
        }
        OutputFormat::Text => {
            if references.is_empty() {
                writeln!(out, "No local repositories.")?;
                return out.flush();
            }
            let header =
                |title: &str| Cell::new(title).style_spec(StyleRole::Header.table_spec(color));
            let mut table = Table::new();
            table.set_format(*format::consts::FORMAT_CLEAN);
            table.set_titles(Row::new(vec![
                header("Name"),
                header("Repository"),
                header("Last synced"),
                header("Path"),
            ]));
            for reference in references {
                let synced = reference
                    .last_synced
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                    .unwrap_or_else(|| "never".to_string());
                table.add_row(Row::new(vec![
                    Cell::new(&reference.name).style_spec(StyleRole::Path.table_spec(color)),
                    Cell::new(reference.remote_url.as_deref().unwrap_or(&reference.identifier)),
                    Cell::new(&synced),
                    Cell::new(&reference.path.display().to_string()),
                ]));
            }
            table.print(out)?;
        }
    }
    out.flush()
}

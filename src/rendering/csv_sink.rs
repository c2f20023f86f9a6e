use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use crate::data::{DisplaySeries, PlotConfig};
use crate::processing::Renderer;

const HEADER: [&str; 2] = ["ell", "d_ell_uk2"];

fn write_series<W: Write>(writer: &mut csv::Writer<W>, series: &DisplaySeries) -> Result<()> {
    writer.write_record(HEADER).context("Failed to write CSV header")?;
    for p in &series.points {
        writer
            .write_record([p.ell.to_string(), format!("{:.6}", p.d_ell)])
            .context("Failed to write CSV record")?;
    }
    writer.flush().context("Failed to flush CSV writer")?;
    Ok(())
}

/// Write one series to `path` as `ell,d_ell_uk2` rows.
pub fn export_series_csv<P: AsRef<Path>>(series: &DisplaySeries, path: P) -> Result<()> {
    let file = File::create(&path)
        .with_context(|| format!("Failed to create CSV file: {:?}", path.as_ref()))?;
    let mut writer = csv::Writer::from_writer(file);
    write_series(&mut writer, series)
}

/// Renderer for headless runs: each successful cycle becomes a CSV block,
/// failures are kept for the caller to print.
pub struct CsvRenderer<W: Write> {
    writer: csv::Writer<W>,
    errors: Vec<String>,
    frames: usize,
}

impl<W: Write> CsvRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(out),
            errors: Vec::new(),
            frames: 0,
        }
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush CSV writer: {}", e.error()))
    }
}

impl<W: Write> Renderer for CsvRenderer<W> {
    fn render(&mut self, series: &DisplaySeries, _plot: &PlotConfig) -> Result<()> {
        write_series(&mut self.writer, series)?;
        self.frames += 1;
        Ok(())
    }

    fn report_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }
}

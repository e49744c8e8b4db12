use crate::application::scenario::{OutcomeRow, ScenarioReport};
use crate::error::Result;
use std::io::Write;

/// Writes a scenario report as CSV.
///
/// Emits one line per caller-side outcome followed by the final ledger line.
pub struct ReportWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ReportWriter<W> {
    /// Creates a new `ReportWriter` over any `Write` target (e.g., Stdout).
    pub fn new(target: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(target),
        }
    }

    pub fn write_report(&mut self, report: &ScenarioReport) -> Result<()> {
        for outcome in &report.outcomes {
            self.writer.serialize(outcome)?;
        }
        self.writer.serialize(OutcomeRow::ledger(&report.entitlements))?;
        self.writer.flush()?;
        Ok(())
    }
}

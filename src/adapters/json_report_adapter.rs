//! JSON report adapter implementing ReportPort.

use serde_json::json;
use std::io::Write;

use crate::domain::analysis::AnalysisReport;
use crate::domain::batch::BatchReport;
use crate::domain::error::TrademanError;
use crate::domain::signal::StoredSignal;
use crate::ports::report_port::ReportPort;

/// Writes one JSON document per call to `out`.
pub struct JsonReportAdapter<W: Write> {
    out: W,
    pretty: bool,
}

impl<W: Write> JsonReportAdapter<W> {
    pub fn new(out: W, pretty: bool) -> Self {
        Self { out, pretty }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, value: &serde_json::Value) -> Result<(), TrademanError> {
        if self.pretty {
            serde_json::to_writer_pretty(&mut self.out, value)?;
        } else {
            serde_json::to_writer(&mut self.out, value)?;
        }
        writeln!(self.out)?;
        self.out.flush()?;
        Ok(())
    }
}

impl<W: Write> ReportPort for JsonReportAdapter<W> {
    fn write_analysis(&mut self, report: &AnalysisReport) -> Result<(), TrademanError> {
        let value = serde_json::to_value(report)?;
        self.emit(&value)
    }

    fn write_batch(
        &mut self,
        reports: &[(&str, BatchReport)],
        signals: &[StoredSignal],
    ) -> Result<(), TrademanError> {
        let runs: Vec<serde_json::Value> = reports
            .iter()
            .map(|(stage, report)| json!({ "stage": stage, "report": report }))
            .collect();
        let value = json!({
            "runs": runs,
            "active_signals": signals,
        });
        self.emit(&value)
    }
}

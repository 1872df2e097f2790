//! Report output port trait.

use crate::domain::analysis::AnalysisReport;
use crate::domain::batch::BatchReport;
use crate::domain::error::TrademanError;
use crate::domain::signal::StoredSignal;

/// Port for writing analysis and batch results.
pub trait ReportPort {
    fn write_analysis(&mut self, report: &AnalysisReport) -> Result<(), TrademanError>;

    fn write_batch(
        &mut self,
        reports: &[(&str, BatchReport)],
        signals: &[StoredSignal],
    ) -> Result<(), TrademanError>;
}

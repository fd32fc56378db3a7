use crate::models::{Bill, BillSummary};

/// Bill count and display summaries, newest introduction first
///
/// Bills without an introduction date sort last.
pub fn bill_summaries(bills: &[Bill]) -> (u64, Vec<BillSummary>) {
    let mut summaries: Vec<BillSummary> = bills.iter().map(BillSummary::from).collect();
    summaries.sort_by(|a, b| b.introduced.cmp(&a.introduced));
    (bills.len() as u64, summaries)
}

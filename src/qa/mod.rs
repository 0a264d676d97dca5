/// Quality checks on translated output
///
/// - `checks` - Skeleton comparison and plain-text heuristics
/// - `gate` - Pre-run fixture gate and its JSON report
pub mod checks;
pub mod gate;

pub use checks::{IssueCode, QaIssue, QaResult, QaStatus, check, check_code, check_plain, skeleton};
pub use gate::{GateReport, QaFixtures, run_gate, write_report};

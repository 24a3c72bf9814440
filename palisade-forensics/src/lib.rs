//! # Palisade Forensics — Evidence and reporting
//!
//! The audit side of the pipeline:
//! - **Evidence Recorder** — one durable, append-only record per finding,
//!   day-partitioned, with a rendered human-readable report
//! - **Report Generator** — periodic aggregate projections over the threat
//!   ledger and evidence stats

pub mod evidence_recorder;
pub mod report_generator;
pub mod types;

pub use evidence_recorder::EvidenceRecorder;
pub use report_generator::ReportGenerator;
pub use types::EvidenceRecord;

#[cfg(test)]
mod tests;

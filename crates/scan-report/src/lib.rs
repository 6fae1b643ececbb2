//! 스캐너 리포트 정규화 — Trivy JSON 출력을 내부 발견 항목으로 변환
//!
//! # Module Structure
//!
//! - [`error`]: Domain error types (`ScanReportError`)
//! - [`report`]: Raw scanner report schema (`ScanReport`, `ReportResult`)
//! - [`normalize`]: Threshold filtering, deduplication, deterministic ordering
//!
//! # Architecture
//!
//! ```text
//! trivy JSON --> ScanReport --> normalize(threshold) --> Vec<VulnerabilityFinding>
//!                  |                  |
//!            per-entry skip      dedupe by (package, ecosystem)
//!            (warn, non-fatal)   max severity / max fixed version
//! ```

pub mod error;
pub mod normalize;
pub mod report;

// --- Public API Re-exports ---

pub use error::ScanReportError;
pub use normalize::normalize;
pub use report::{ReportResult, ScanReport};

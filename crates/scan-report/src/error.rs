//! 스캔 리포트 에러 타입
//!
//! [`ScanReportError`]는 리포트 파싱/정규화에서 발생할 수 있는 에러를 나타냅니다.
//! 개별 항목의 스키마 불일치는 에러가 아니라 건너뛰기(경고)로 처리되며,
//! 문서 전체가 스키마에 맞지 않을 때만 `ScanOutputInvalid`로 실행을 중단합니다.

use vulnmend_core::error::VulnmendError;

/// 스캔 리포트 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum ScanReportError {
    /// 리포트 문서 전체가 유효하지 않음 — 실행 중단 사유
    #[error("scan output invalid: {reason}")]
    ScanOutputInvalid {
        /// 파싱 실패 사유
        reason: String,
    },
}

impl From<ScanReportError> for VulnmendError {
    fn from(err: ScanReportError) -> Self {
        VulnmendError::ScanReport(err.to_string())
    }
}

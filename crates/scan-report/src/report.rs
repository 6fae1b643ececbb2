//! 원시 스캐너 리포트 스키마 — Trivy JSON 형식
//!
//! Trivy의 `trivy image --format json` 출력 구조를 나타냅니다.
//! 최상위 `Results` 배열의 각 항목은 하나의 스캔 대상(OS 패키지, 언어별
//! 매니페스트 등)이며 `Vulnerabilities` 배열을 가집니다.
//!
//! 개별 취약점 항목은 [`serde_json::Value`]로 보관하고 정규화 시점에
//! 항목 단위로 역직렬화합니다. 항목 하나가 스키마에 맞지 않아도
//! 문서 전체 파싱이 실패하지 않도록 하기 위함입니다.

use serde::Deserialize;

use crate::error::ScanReportError;

/// 스캐너 리포트 문서 전체
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScanReport {
    /// 스캔 대상별 결과 블록
    #[serde(rename = "Results", alias = "results", default)]
    pub results: Vec<ReportResult>,
}

impl ScanReport {
    /// JSON 문자열에서 리포트를 파싱합니다.
    ///
    /// 문서 전체가 스키마에 맞지 않으면 [`ScanReportError::ScanOutputInvalid`]를
    /// 반환합니다. 이는 해당 실행 전체를 중단시키는 치명적 에러입니다.
    pub fn parse(json: &str) -> Result<Self, ScanReportError> {
        serde_json::from_str(json).map_err(|e| ScanReportError::ScanOutputInvalid {
            reason: e.to_string(),
        })
    }

    /// 이미 역직렬화된 JSON 값에서 리포트를 파싱합니다.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ScanReportError> {
        serde_json::from_value(value).map_err(|e| ScanReportError::ScanOutputInvalid {
            reason: e.to_string(),
        })
    }

    /// 전체 원시 취약점 항목 수를 반환합니다.
    pub fn raw_entry_count(&self) -> usize {
        self.results.iter().map(|r| r.vulnerabilities.len()).sum()
    }
}

/// 스캔 대상 하나의 결과 블록
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportResult {
    /// 스캔 대상 식별자 (이미지 레이어, 매니페스트 경로 등)
    #[serde(rename = "Target", alias = "target", default)]
    pub target: String,
    /// 결과 분류 (`os-pkgs`, `lang-pkgs`)
    #[serde(rename = "Class", alias = "class", default)]
    pub class: Option<String>,
    /// 패키지 출처 타입 (`pip`, `npm`, `jar`, `debian` 등)
    #[serde(rename = "Type", alias = "type", default)]
    pub pkg_type: Option<String>,
    /// 원시 취약점 항목 — 정규화 시점에 항목 단위로 역직렬화
    #[serde(rename = "Vulnerabilities", alias = "vulnerabilities", default)]
    pub vulnerabilities: Vec<serde_json::Value>,
}

/// 취약점 항목 하나의 스키마
///
/// 정규화에 필요한 필드만 선언합니다. 필수 필드가 빠진 항목은
/// 역직렬화 단계가 아니라 정규화 단계에서 건너뜁니다.
#[derive(Debug, Clone, Deserialize)]
pub struct RawVulnerability {
    /// 취약점 ID
    #[serde(rename = "VulnerabilityID", default)]
    pub vulnerability_id: Option<String>,
    /// 패키지명
    #[serde(rename = "PkgName", default)]
    pub pkg_name: Option<String>,
    /// 설치된 버전
    #[serde(rename = "InstalledVersion", default)]
    pub installed_version: Option<String>,
    /// 수정 버전 (쉼표로 여러 값이 올 수 있음)
    #[serde(rename = "FixedVersion", default)]
    pub fixed_version: Option<String>,
    /// 심각도 문자열
    #[serde(rename = "Severity", default)]
    pub severity: Option<String>,
}

//! 발견 항목 정규화 — 필터링, 중복 제거, 결정적 정렬
//!
//! 원시 리포트를 [`VulnerabilityFinding`] 시퀀스로 변환합니다.
//!
//! # 규칙
//!
//! - `severityThreshold` 미만 항목은 제외 (기본: Medium)
//! - (패키지, 생태계) 기준 중복 제거: 최고 심각도 유지, 수정 버전은
//!   생태계 규칙상 가장 높은 버전 유지 — 패키지당 조치 하나를 보장
//! - 정렬: 심각도 내림차순, 같은 심각도 내에서는 패키지명 오름차순
//!   (테스트 가능성을 위한 결정적 순서)
//! - 스키마에 맞지 않는 개별 항목은 경고 후 건너뜀 (실행은 계속)
//! - 생태계를 식별할 수 없는 결과 블록(OS 패키지 등)은 매니페스트 패치
//!   대상이 아니므로 제외

use std::collections::HashMap;

use tracing::{debug, warn};

use vulnmend_core::metrics::{LABEL_SEVERITY, SCAN_ENTRIES_SKIPPED_TOTAL, SCAN_FINDINGS_TOTAL};
use vulnmend_core::types::{Ecosystem, Severity, VulnerabilityFinding};
use vulnmend_core::version;

use crate::report::{RawVulnerability, ScanReport};

/// 리포트를 정규화하여 결정적으로 정렬된 발견 항목 목록을 반환합니다.
///
/// 반환된 `Vec`은 유한하며 반복 가능한(재시작 가능한) 시퀀스입니다.
pub fn normalize(report: &ScanReport, threshold: Severity) -> Vec<VulnerabilityFinding> {
    let mut deduped: HashMap<(String, Ecosystem), VulnerabilityFinding> = HashMap::new();

    for result in &report.results {
        let ecosystem = result
            .pkg_type
            .as_deref()
            .and_then(Ecosystem::from_str_loose);

        let Some(ecosystem) = ecosystem else {
            if !result.vulnerabilities.is_empty() {
                debug!(
                    target_name = %result.target,
                    pkg_type = result.pkg_type.as_deref().unwrap_or("-"),
                    entries = result.vulnerabilities.len(),
                    "skipping result block with unsupported ecosystem"
                );
            }
            continue;
        };

        for raw_value in &result.vulnerabilities {
            let raw: RawVulnerability = match serde_json::from_value(raw_value.clone()) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(target_name = %result.target, error = %e, "skipping malformed finding entry");
                    metrics::counter!(SCAN_ENTRIES_SKIPPED_TOTAL).increment(1);
                    continue;
                }
            };

            let Some(finding) = finding_from_raw(raw, ecosystem) else {
                warn!(target_name = %result.target, "skipping finding entry with missing fields");
                metrics::counter!(SCAN_ENTRIES_SKIPPED_TOTAL).increment(1);
                continue;
            };

            if finding.severity < threshold {
                continue;
            }

            merge_finding(&mut deduped, finding);
        }
    }

    let mut findings: Vec<VulnerabilityFinding> = deduped.into_values().collect();
    findings.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| a.package.cmp(&b.package))
    });

    for finding in &findings {
        metrics::counter!(SCAN_FINDINGS_TOTAL, LABEL_SEVERITY => finding.severity.to_string())
            .increment(1);
    }

    findings
}

/// 원시 항목에서 정규화된 발견 항목을 생성합니다.
///
/// 패키지명, 취약점 ID, 설치 버전이 없으면 `None`을 반환합니다.
fn finding_from_raw(raw: RawVulnerability, ecosystem: Ecosystem) -> Option<VulnerabilityFinding> {
    let package = raw.pkg_name.filter(|s| !s.is_empty())?;
    let vulnerability_id = raw.vulnerability_id.filter(|s| !s.is_empty())?;
    let installed_version = raw.installed_version.filter(|s| !s.is_empty())?;

    let severity = raw
        .severity
        .as_deref()
        .and_then(Severity::from_str_loose)
        .unwrap_or(Severity::Unknown);

    let fixed_version = raw
        .fixed_version
        .filter(|s| !s.trim().is_empty())
        .map(|s| select_highest_fix(ecosystem, &s));

    Some(VulnerabilityFinding {
        vulnerability_id,
        package,
        ecosystem,
        installed_version,
        fixed_version,
        severity,
    })
}

/// 쉼표로 구분된 수정 버전 목록에서 가장 높은 버전을 선택합니다.
///
/// 스캐너는 브랜치별 수정 버전을 `"1.2.3, 2.0.1"` 형태로 보고할 수 있습니다.
fn select_highest_fix(ecosystem: Ecosystem, raw: &str) -> String {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .max_by(|a, b| version::compare(ecosystem, a, b))
        .unwrap_or(raw.trim())
        .to_owned()
}

/// (패키지, 생태계) 키로 병합합니다.
///
/// 심각도는 최고값을, 수정 버전은 생태계 규칙상 가장 높은 버전을 유지합니다.
fn merge_finding(
    deduped: &mut HashMap<(String, Ecosystem), VulnerabilityFinding>,
    finding: VulnerabilityFinding,
) {
    let key = (finding.package.clone(), finding.ecosystem);

    match deduped.entry(key) {
        std::collections::hash_map::Entry::Vacant(entry) => {
            entry.insert(finding);
        }
        std::collections::hash_map::Entry::Occupied(mut entry) => {
            let existing = entry.get_mut();

            if finding.severity > existing.severity {
                existing.severity = finding.severity;
                existing.vulnerability_id = finding.vulnerability_id;
                existing.installed_version = finding.installed_version;
            }

            existing.fixed_version = match (existing.fixed_version.take(), finding.fixed_version) {
                (Some(a), Some(b)) => {
                    if version::compare(finding.ecosystem, &b, &a) == std::cmp::Ordering::Greater {
                        Some(b)
                    } else {
                        Some(a)
                    }
                }
                (Some(a), None) => Some(a),
                (None, Some(b)) => Some(b),
                (None, None) => None,
            };
        }
    }
}

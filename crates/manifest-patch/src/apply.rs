//! 저장소 수준 패치 적용
//!
//! 저장소 루트에서 알려진 매니페스트를 찾아 각 패처를 적용하고,
//! 변경된 파일을 디스크에 되씁니다. 발견 항목 하나가 여러 매니페스트
//! 중 어디에서든 패치되면 해결된 것으로 집계합니다.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use vulnmend_core::metrics::{
    LABEL_ECOSYSTEM, PATCH_APPLIED_TOTAL, PATCH_UNRESOLVED_TOTAL,
};
use vulnmend_core::types::VulnerabilityFinding;

use crate::error::ManifestPatchError;
use crate::patcher::{AppliedPatch, default_patchers};

/// 저장소 하나에 대한 패치 적용 결과
#[derive(Debug, Clone, Default)]
pub struct RepoPatchReport {
    /// 적용된 패치 전체 (매니페스트 파일 순서)
    pub applied: Vec<AppliedPatch>,
    /// 어떤 매니페스트에서도 해결하지 못한 발견 항목의 패키지명
    pub unresolved: Vec<String>,
    /// 패처들이 남긴 경고
    pub warnings: Vec<String>,
    /// 실제로 수정되어 되쓴 매니페스트 경로
    pub patched_files: Vec<PathBuf>,
}

impl RepoPatchReport {
    /// 하나 이상의 매니페스트가 수정되었는지 여부
    pub fn modified(&self) -> bool {
        !self.patched_files.is_empty()
    }
}

/// 저장소의 매니페스트에 패치를 적용합니다.
///
/// 매니페스트가 없거나 적용할 패치가 없으면 빈 리포트를 반환합니다.
/// 에러는 파일 입출력 실패에서만 발생합니다.
pub fn patch_repository(
    repo_root: &Path,
    findings: &[VulnerabilityFinding],
) -> Result<RepoPatchReport, ManifestPatchError> {
    let mut report = RepoPatchReport::default();
    if findings.is_empty() {
        return Ok(report);
    }

    for patcher in default_patchers() {
        let path = repo_root.join(patcher.manifest_filename());
        if !path.is_file() {
            continue;
        }

        let content =
            std::fs::read_to_string(&path).map_err(|e| ManifestPatchError::ManifestRead {
                path: path.display().to_string(),
                source: e,
            })?;

        let mut outcome = patcher.patch(&content, findings);
        report.warnings.append(&mut outcome.warnings);

        // 중복 선언만 고쳐진 경우에도 텍스트가 바뀌었으면 되써야 함
        if outcome.new_text == content {
            continue;
        }

        std::fs::write(&path, &outcome.new_text).map_err(|e| ManifestPatchError::ManifestWrite {
            path: path.display().to_string(),
            source: e,
        })?;

        for patch in &outcome.applied {
            info!(
                manifest = patcher.manifest_filename(),
                package = %patch.package,
                previous = patch.previous.as_deref().unwrap_or("-"),
                new_version = %patch.new_version,
                "patched dependency declaration"
            );
        }
        metrics::counter!(
            PATCH_APPLIED_TOTAL,
            LABEL_ECOSYSTEM => patcher.ecosystem().to_string()
        )
        .increment(outcome.applied.len() as u64);

        report.applied.extend(outcome.applied);
        report.patched_files.push(path);
    }

    report.unresolved = unresolved_findings(findings, &report.applied);
    for package in &report.unresolved {
        warn!(package = %package, "finding could not be resolved in any manifest");
    }
    metrics::counter!(PATCH_UNRESOLVED_TOTAL).increment(report.unresolved.len() as u64);

    Ok(report)
}

/// 어떤 매니페스트에서도 패치되지 않은 발견 항목을 집계합니다.
///
/// 수정 버전이 없는 항목은 항상 unresolved입니다. 선언이 이미 안전한
/// 항목은 패치 대상이 아니므로 제외합니다.
fn unresolved_findings(
    findings: &[VulnerabilityFinding],
    applied: &[AppliedPatch],
) -> Vec<String> {
    use vulnmend_core::version;

    findings
        .iter()
        .filter(|f| {
            let Some(fixed) = f.fixed_version.as_deref() else {
                return true;
            };
            let already_applied = applied
                .iter()
                .any(|p| keys_match(&p.package, &f.package, f.ecosystem.uses_pep440()));
            let already_safe = !version::is_upgrade(f.ecosystem, &f.installed_version, fixed);
            !already_applied && !already_safe
        })
        .map(|f| f.package.clone())
        .collect()
}

fn keys_match(a: &str, b: &str, pep503: bool) -> bool {
    if pep503 {
        let norm = |s: &str| s.to_ascii_lowercase().replace(['_', '.'], "-");
        norm(a) == norm(b)
    } else {
        a == b || a.ends_with(&format!(":{b}")) || b.ends_with(&format!(":{a}"))
    }
}

//! 매니페스트 패처 -- requirements.txt, package.json, pyproject.toml 등
//!
//! [`ManifestPatcher`] trait은 각 매니페스트 형식의 패처가 구현해야 하는
//! 인터페이스입니다. 패치는 순수 텍스트 변환입니다: 버전 토큰만 교체하고
//! 주석, 공백, 키 순서, 무관한 줄은 바이트 단위로 보존합니다.
//! 매니페스트 전체를 역직렬화했다가 다시 직렬화하지 않습니다.
//!
//! # 지원 형식
//!
//! - `requirements.txt` -- [`RequirementsPatcher`]
//! - `package.json` -- [`PackageJsonPatcher`]
//! - `pyproject.toml` -- [`PyprojectPatcher`]
//! - `Pipfile` -- [`PipfilePatcher`]
//! - `pom.xml` -- [`PomPatcher`]
//!
//! # 확장
//!
//! 새로운 형식을 지원하려면 `ManifestPatcher` trait을 구현하고
//! [`default_patchers`]에 등록합니다.

pub mod package_json;
pub mod pipfile;
pub mod pom;
pub mod pyproject;
pub mod requirements;

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;

use vulnmend_core::types::{Ecosystem, VulnerabilityFinding};
use vulnmend_core::version;

pub use package_json::PackageJsonPatcher;
pub use pipfile::PipfilePatcher;
pub use pom::PomPatcher;
pub use pyproject::PyprojectPatcher;
pub use requirements::RequirementsPatcher;

/// 매니페스트 패처 trait
///
/// 매니페스트 텍스트와 발견 항목 목록을 받아 패치된 텍스트를 생성합니다.
/// `patch`는 실패하지 않습니다: 적용할 수 없는 항목은 결과의
/// `unresolved`에, 불확실한 변환은 `warnings`에 기록됩니다.
pub trait ManifestPatcher: Send + Sync {
    /// 이 패처가 담당하는 생태계를 반환합니다.
    fn ecosystem(&self) -> Ecosystem;

    /// 이 패처가 처리하는 매니페스트 파일명을 반환합니다.
    fn manifest_filename(&self) -> &'static str;

    /// 주어진 발견 항목이 이 매니페스트의 패치 대상인지 확인합니다.
    ///
    /// Python 계열 매니페스트는 PEP 440 생태계 전체를 받습니다.
    /// 이미지 스캔은 설치 경로 기준으로 생태계를 보고하므로, 예를 들어
    /// `pip` 항목의 선언이 pyproject.toml에 있을 수 있기 때문입니다.
    fn accepts(&self, ecosystem: Ecosystem) -> bool {
        ecosystem == self.ecosystem()
    }

    /// 주어진 경로의 파일을 이 패처가 처리할 수 있는지 확인합니다.
    fn can_patch(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name == self.manifest_filename())
    }

    /// 매니페스트 텍스트를 패치합니다.
    ///
    /// # Arguments
    ///
    /// - `content`: 매니페스트 파일 내용 (UTF-8 문자열)
    /// - `findings`: 정규화된 발견 항목 목록
    fn patch(&self, content: &str, findings: &[VulnerabilityFinding]) -> PatchOutcome;
}

/// 적용된 패치 하나
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedPatch {
    /// 패키지명 (매니페스트 표기 그대로)
    pub package: String,
    /// 패치 전 선언 버전 (선언이 없던 경우 `None`)
    pub previous: Option<String>,
    /// 패치 후 버전
    pub new_version: String,
    /// 패치된 매니페스트 파일명
    pub manifest: String,
}

/// 패치 결과
///
/// `new_text`는 항상 채워집니다. 적용된 패치가 없으면 입력과 동일합니다.
#[derive(Debug, Clone, Default)]
pub struct PatchOutcome {
    /// 패치된 매니페스트 텍스트
    pub new_text: String,
    /// 적용된 패치 목록
    pub applied: Vec<AppliedPatch>,
    /// 이 매니페스트에서 해결하지 못한 패키지명 목록
    pub unresolved: Vec<String>,
    /// 불확실한 변환에 대한 경고
    pub warnings: Vec<String>,
}

/// 기본 패처 목록을 생성합니다.
///
/// 순서는 저장소 순회 순서이며 결과에는 영향을 주지 않습니다.
pub fn default_patchers() -> Vec<Box<dyn ManifestPatcher>> {
    vec![
        Box::new(RequirementsPatcher),
        Box::new(PackageJsonPatcher),
        Box::new(PyprojectPatcher),
        Box::new(PipfilePatcher),
        Box::new(PomPatcher),
    ]
}

/// 패치 후보 하나 -- 수정 버전이 있는 발견 항목
#[derive(Debug, Clone, Copy)]
pub(crate) struct Candidate<'a> {
    pub finding: &'a VulnerabilityFinding,
    pub fixed: &'a str,
}

/// 패처가 받아들이는 발견 항목을 정규화된 이름으로 색인합니다.
///
/// 수정 버전이 없는 항목은 후보가 아닙니다 (저장소 수준에서
/// unresolved로 집계됩니다).
pub(crate) fn candidate_map<'a>(
    patcher: &dyn ManifestPatcher,
    findings: &'a [VulnerabilityFinding],
) -> HashMap<String, Candidate<'a>> {
    let mut map = HashMap::new();
    for finding in findings {
        if !patcher.accepts(finding.ecosystem) {
            continue;
        }
        let Some(fixed) = finding.fixed_version.as_deref() else {
            continue;
        };
        map.insert(
            normalize_name(patcher.ecosystem(), &finding.package),
            Candidate { finding, fixed },
        );
    }
    map
}

/// 생태계 규칙에 따라 패키지명을 비교용으로 정규화합니다.
///
/// Python 계열은 PEP 503 규칙 (소문자, `_`/`.`를 `-`로)을 따릅니다.
/// Node와 Maven은 표기 그대로 비교합니다.
pub(crate) fn normalize_name(ecosystem: Ecosystem, name: &str) -> String {
    if ecosystem.uses_pep440() {
        name.to_ascii_lowercase().replace(['_', '.'], "-")
    } else {
        name.to_owned()
    }
}

/// 선언 버전이 이미 수정 버전 이상인지 확인합니다.
///
/// 패치는 단조 상향입니다: 이미 안전한 선언은 건드리지 않습니다.
pub(crate) fn already_safe(ecosystem: Ecosystem, declared: &str, fixed: &str) -> bool {
    !version::is_upgrade(ecosystem, declared, fixed)
}

/// 줄 모음을 원본의 후행 개행 여부를 유지하며 합칩니다.
pub(crate) fn join_preserving_newline(original: &str, lines: Vec<String>) -> String {
    let mut text = lines.join("\n");
    if original.ends_with('\n') {
        text.push('\n');
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use vulnmend_core::types::Severity;

    fn finding(pkg: &str, eco: Ecosystem, fixed: Option<&str>) -> VulnerabilityFinding {
        VulnerabilityFinding {
            vulnerability_id: "CVE-2024-0001".to_owned(),
            package: pkg.to_owned(),
            ecosystem: eco,
            installed_version: "0.0.1".to_owned(),
            fixed_version: fixed.map(str::to_owned),
            severity: Severity::High,
        }
    }

    #[test]
    fn can_patch_matches_filename_only() {
        let patcher = RequirementsPatcher;
        assert!(patcher.can_patch(&PathBuf::from("/work/app/requirements.txt")));
        assert!(!patcher.can_patch(&PathBuf::from("/work/app/requirements-dev.txt")));
        assert!(!patcher.can_patch(&PathBuf::from("")));
    }

    #[test]
    fn candidate_map_skips_findings_without_fix() {
        let findings = vec![
            finding("flask", Ecosystem::Python, Some("2.0.0")),
            finding("docutils", Ecosystem::Python, None),
        ];
        let map = candidate_map(&RequirementsPatcher, &findings);
        assert_eq!(map.len(), 1);
        assert!(map.contains_key("flask"));
    }

    #[test]
    fn candidate_map_skips_foreign_ecosystems() {
        let findings = vec![
            finding("semver", Ecosystem::Node, Some("7.5.2")),
            finding("flask", Ecosystem::Python, Some("2.0.0")),
        ];
        let map = candidate_map(&PomPatcher, &findings);
        assert!(map.is_empty());
    }

    #[test]
    fn python_names_normalize_pep503() {
        assert_eq!(
            normalize_name(Ecosystem::Python, "Typing_Extensions"),
            "typing-extensions"
        );
        assert_eq!(normalize_name(Ecosystem::Python, "zope.interface"), "zope-interface");
        assert_eq!(normalize_name(Ecosystem::Node, "@types/Node"), "@types/Node");
    }

    #[test]
    fn already_safe_is_monotonic() {
        assert!(already_safe(Ecosystem::Python, "2.31.0", "2.31.0"));
        assert!(already_safe(Ecosystem::Python, "2.32.0", "2.31.0"));
        assert!(!already_safe(Ecosystem::Python, "2.30.0", "2.31.0"));
    }

    #[test]
    fn default_patchers_cover_all_manifests() {
        let names: Vec<&str> = default_patchers()
            .iter()
            .map(|p| p.manifest_filename())
            .collect();
        assert_eq!(
            names,
            vec!["requirements.txt", "package.json", "pyproject.toml", "Pipfile", "pom.xml"]
        );
    }
}

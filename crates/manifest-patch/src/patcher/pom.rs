//! pom.xml 패처
//!
//! XML 파서 없이 텍스트 교체로 동작합니다. `<artifactId>` 다음에 오는
//! `<version>` 요소의 텍스트만 교체하며, 검색 범위는 해당
//! `</dependency>` 닫힘 태그까지로 제한됩니다.
//!
//! `${...}` 프로퍼티 참조 버전은 비교할 수 없으므로 건드리지 않고
//! 경고로 남깁니다. 발견 항목의 패키지명이 `group:artifact` 형태이면
//! artifactId 부분으로 매칭합니다.

use tracing::debug;

use vulnmend_core::types::{Ecosystem, VulnerabilityFinding};

use crate::patcher::{AppliedPatch, ManifestPatcher, PatchOutcome, already_safe, candidate_map};

/// pom.xml 패처
pub struct PomPatcher;

impl ManifestPatcher for PomPatcher {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Maven
    }

    fn manifest_filename(&self) -> &'static str {
        "pom.xml"
    }

    fn patch(&self, content: &str, findings: &[VulnerabilityFinding]) -> PatchOutcome {
        let candidates = candidate_map(self, findings);
        let mut outcome = PatchOutcome::default();
        let mut text = content.to_owned();

        // 결정적 순서를 위해 패키지명으로 정렬
        let mut ordered: Vec<_> = candidates.values().collect();
        ordered.sort_by(|a, b| a.finding.package.cmp(&b.finding.package));

        for candidate in ordered {
            let package = &candidate.finding.package;
            let artifact_id = artifact_of(package);

            let result =
                patch_artifact(&text, artifact_id, candidate.fixed, candidate.finding.ecosystem);

            if result.replaced > 0 {
                outcome.applied.push(AppliedPatch {
                    package: package.clone(),
                    previous: result.previous,
                    new_version: candidate.fixed.to_owned(),
                    manifest: self.manifest_filename().to_owned(),
                });
                if result.replaced > 1 {
                    outcome
                        .warnings
                        .push(format!("{package}: duplicate declaration patched"));
                }
                text = result.new_text;
            }

            if result.property_managed > 0 {
                outcome.warnings.push(format!(
                    "{package}: version is a property reference, left unchanged"
                ));
                if result.replaced == 0 {
                    outcome.unresolved.push(package.clone());
                }
            } else if result.matched == 0 {
                outcome.unresolved.push(package.clone());
            } else if result.replaced == 0 {
                debug!(package = %package, fixed = candidate.fixed, "declaration already safe");
            }
        }

        outcome.new_text = text;
        outcome
    }
}

/// `group:artifact` 표기에서 artifactId를 추출합니다.
fn artifact_of(package: &str) -> &str {
    match package.split_once(':') {
        Some((_, artifact)) => artifact,
        None => package,
    }
}

/// artifactId 하나에 대한 전체 교체 결과
struct ArtifactPatchResult {
    new_text: String,
    /// 첫 교체 전 버전
    previous: Option<String>,
    replaced: usize,
    property_managed: usize,
    /// `<version>` 요소까지 갖춘 선언의 수
    matched: usize,
}

/// artifactId에 대응하는 `<version>` 요소를 모두 찾아 교체합니다.
///
/// 같은 artifactId가 여러 dependency 블록에 선언되어 있으면 전부
/// 동일하게 교체합니다.
fn patch_artifact(
    content: &str,
    artifact_id: &str,
    fixed: &str,
    ecosystem: Ecosystem,
) -> ArtifactPatchResult {
    let needle = format!("<artifactId>{artifact_id}</artifactId>");
    let mut result = ArtifactPatchResult {
        new_text: String::with_capacity(content.len()),
        previous: None,
        replaced: 0,
        property_managed: 0,
        matched: 0,
    };
    let mut cursor = 0;

    while let Some(rel) = content[cursor..].find(&needle) {
        let after_artifact = cursor + rel + needle.len();
        result.new_text.push_str(&content[cursor..after_artifact]);
        cursor = after_artifact;

        // 검색 범위를 이 dependency 요소 안으로 제한
        let bound = content[after_artifact..]
            .find("</dependency>")
            .map_or(content.len(), |i| after_artifact + i);

        let Some(version_rel) = content[after_artifact..bound].find("<version>") else {
            continue;
        };
        let version_start = after_artifact + version_rel + "<version>".len();

        let Some(version_len) = content[version_start..bound].find("</version>") else {
            continue;
        };
        let old_version = &content[version_start..version_start + version_len];
        result.matched += 1;

        if old_version.contains("${") {
            result.property_managed += 1;
            continue;
        }
        if already_safe(ecosystem, old_version, fixed) {
            continue;
        }

        result.new_text.push_str(&content[after_artifact..version_start]);
        result.new_text.push_str(fixed);
        if result.previous.is_none() {
            result.previous = Some(old_version.to_owned());
        }
        result.replaced += 1;
        cursor = version_start + version_len;
    }
    result.new_text.push_str(&content[cursor..]);
    result
}

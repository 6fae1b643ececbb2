//! Pipfile 패처
//!
//! `[packages]` / `[dev-packages]` 테이블 안의 `pkg = "지정자"` 줄을
//! 패치합니다. 따옴표 안의 `==` 연산자는 유지됩니다: `"==2.25.1"`은
//! `"==2.26.0"`이 됩니다. `"*"`는 수정 버전으로 고정됩니다.
//!
//! 줄 단위 교체 로직은 [`pyproject`](crate::patcher::pyproject)와 공유합니다.

use std::collections::HashSet;

use vulnmend_core::types::{Ecosystem, VulnerabilityFinding};

use crate::patcher::pyproject::patch_dep_line;
use crate::patcher::{
    ManifestPatcher, PatchOutcome, candidate_map, join_preserving_newline, normalize_name,
};

/// Pipfile 패처
pub struct PipfilePatcher;

impl ManifestPatcher for PipfilePatcher {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Pipenv
    }

    fn manifest_filename(&self) -> &'static str {
        "Pipfile"
    }

    fn accepts(&self, ecosystem: Ecosystem) -> bool {
        ecosystem.uses_pep440()
    }

    fn patch(&self, content: &str, findings: &[VulnerabilityFinding]) -> PatchOutcome {
        let candidates = candidate_map(self, findings);
        let mut outcome = PatchOutcome::default();
        let mut patched: HashSet<String> = HashSet::new();
        let mut lines = Vec::new();
        let mut in_packages = false;

        for line in content.lines() {
            let trimmed = line.trim();

            if trimmed.starts_with('[') {
                in_packages = matches!(trimmed, "[packages]" | "[dev-packages]");
                lines.push(line.to_owned());
                continue;
            }

            if !in_packages {
                lines.push(line.to_owned());
                continue;
            }

            lines.push(patch_dep_line(
                self.manifest_filename(),
                line,
                &candidates,
                &mut patched,
                &mut outcome,
            ));
        }

        outcome.unresolved = candidates
            .values()
            .filter(|c| !patched.contains(&normalize_name(self.ecosystem(), &c.finding.package)))
            .map(|c| c.finding.package.clone())
            .collect();
        outcome.unresolved.sort();

        outcome.new_text = join_preserving_newline(content, lines);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vulnmend_core::types::Severity;

    fn finding(pkg: &str, fixed: &str) -> VulnerabilityFinding {
        VulnerabilityFinding {
            vulnerability_id: "CVE-2024-0001".to_owned(),
            package: pkg.to_owned(),
            ecosystem: Ecosystem::Pipenv,
            installed_version: "0.0.1".to_owned(),
            fixed_version: Some(fixed.to_owned()),
            severity: Severity::High,
        }
    }

    const MANIFEST: &str = r#"[[source]]
url = "https://pypi.org/simple"
verify_ssl = true

[packages]
requests = "==2.25.1"
django = "==3.1"
flask = "*"

[dev-packages]
pytest = ">=6.0"
"#;

    #[test]
    fn double_equals_operator_is_preserved() {
        let out = PipfilePatcher.patch(MANIFEST, &[finding("requests", "2.26.0")]);
        assert!(out.new_text.contains(r#"requests = "==2.26.0""#));
        assert!(out.new_text.contains(r#"django = "==3.1""#));
    }

    #[test]
    fn star_spec_is_pinned() {
        let out = PipfilePatcher.patch(MANIFEST, &[finding("flask", "2.0.0")]);
        assert!(out.new_text.contains(r#"flask = "2.0.0""#));
    }

    #[test]
    fn dev_packages_are_patched() {
        let out = PipfilePatcher.patch(MANIFEST, &[finding("pytest", "7.4.0")]);
        assert!(out.new_text.contains(r#"pytest = ">=7.4.0""#));
    }

    #[test]
    fn source_table_is_never_touched() {
        let out = PipfilePatcher.patch(MANIFEST, &[finding("url", "9.9.9")]);
        assert!(out.new_text.contains(r#"url = "https://pypi.org/simple""#));
        assert!(out.applied.is_empty());
    }

    #[test]
    fn already_safe_spec_is_untouched() {
        let out = PipfilePatcher.patch(MANIFEST, &[finding("requests", "2.20.0")]);
        assert_eq!(out.new_text, MANIFEST);
        assert!(out.applied.is_empty());
        assert!(out.unresolved.is_empty());
    }

    #[test]
    fn patch_is_idempotent() {
        let findings = [finding("requests", "2.26.0")];
        let first = PipfilePatcher.patch(MANIFEST, &findings);
        let second = PipfilePatcher.patch(&first.new_text, &findings);
        assert_eq!(second.new_text, first.new_text);
        assert!(second.applied.is_empty());
    }
}

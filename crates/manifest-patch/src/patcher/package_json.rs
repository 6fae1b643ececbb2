//! package.json 패처
//!
//! JSON을 재직렬화하지 않습니다. `dependencies` / `devDependencies` 블록
//! 안에서 해당 패키지 줄을 찾아 따옴표 안의 버전 토큰만 교체합니다.
//! 들여쓰기, 키 순서, 후행 쉼표는 바이트 단위로 보존됩니다.
//!
//! 범위 접두사(`^`, `~`, `>=`)는 유지합니다: `"^1.2.3"`은 `"^1.2.4"`가
//! 됩니다. 최소 버전이 수정 버전으로 올라가는 것으로 충분합니다.

use std::collections::HashSet;

use tracing::debug;

use vulnmend_core::types::{Ecosystem, VulnerabilityFinding};

use crate::patcher::{
    AppliedPatch, ManifestPatcher, PatchOutcome, already_safe, candidate_map,
    join_preserving_newline, normalize_name,
};

/// package.json 패처
pub struct PackageJsonPatcher;

impl ManifestPatcher for PackageJsonPatcher {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Node
    }

    fn manifest_filename(&self) -> &'static str {
        "package.json"
    }

    fn patch(&self, content: &str, findings: &[VulnerabilityFinding]) -> PatchOutcome {
        let candidates = candidate_map(self, findings);
        let mut outcome = PatchOutcome::default();
        let mut patched: HashSet<String> = HashSet::new();
        let mut lines = Vec::new();
        let mut in_deps = false;

        for line in content.lines() {
            let trimmed = line.trim_start();

            if !in_deps {
                if (trimmed.starts_with("\"dependencies\"")
                    || trimmed.starts_with("\"devDependencies\""))
                    && trimmed.contains('{')
                {
                    in_deps = true;
                }
                lines.push(line.to_owned());
                continue;
            }

            if trimmed.starts_with('}') {
                in_deps = false;
                lines.push(line.to_owned());
                continue;
            }

            lines.push(patch_dep_line(line, &candidates, &mut patched, &mut outcome));
        }

        outcome.unresolved = candidates
            .values()
            .filter(|c| !patched.contains(&normalize_name(Ecosystem::Node, &c.finding.package)))
            .map(|c| c.finding.package.clone())
            .collect();
        outcome.unresolved.sort();

        outcome.new_text = join_preserving_newline(content, lines);
        outcome
    }
}

/// 의존성 블록 내부의 `"pkg": "range"` 줄 하나를 패치합니다.
fn patch_dep_line(
    line: &str,
    candidates: &std::collections::HashMap<String, crate::patcher::Candidate<'_>>,
    patched: &mut HashSet<String>,
    outcome: &mut PatchOutcome,
) -> String {
    let Some((key, value_span)) = parse_dep_line(line) else {
        return line.to_owned();
    };

    let Some(candidate) = candidates.get(key) else {
        return line.to_owned();
    };

    let old_range = &line[value_span.0..value_span.1];
    let (prefix, declared) = split_range_prefix(old_range);

    if !declared.is_empty() && already_safe(Ecosystem::Node, declared, candidate.fixed) {
        debug!(package = key, declared, fixed = candidate.fixed, "declaration already safe");
        patched.insert(key.to_owned());
        return line.to_owned();
    }

    let new_range = format!("{prefix}{}", candidate.fixed);
    if !patched.insert(key.to_owned()) {
        // dependencies와 devDependencies 양쪽에 선언된 경우
        outcome
            .warnings
            .push(format!("{key}: duplicate declaration patched"));
    }
    // 앞선 선언이 이미 안전해서 applied가 비어 있어도 교체는 기록
    if !outcome.applied.iter().any(|p| p.package == key) {
        outcome.applied.push(AppliedPatch {
            package: key.to_owned(),
            previous: Some(old_range.to_owned()),
            new_version: candidate.fixed.to_owned(),
            manifest: "package.json".to_owned(),
        });
    }

    format!("{}{new_range}{}", &line[..value_span.0], &line[value_span.1..])
}

/// `"pkg": "range"` 줄에서 키와 값의 바이트 범위를 추출합니다.
fn parse_dep_line(line: &str) -> Option<(&str, (usize, usize))> {
    let trimmed_start = line.len() - line.trim_start().len();
    let rest = &line[trimmed_start..];
    if !rest.starts_with('"') {
        return None;
    }

    let key_end = rest[1..].find('"')? + 1;
    let key = &rest[1..key_end];

    let after_key = &rest[key_end + 1..];
    let colon = after_key.find(':')?;
    let after_colon = &after_key[colon + 1..];
    let value_open = after_colon.find('"')?;
    let value_rel = key_end + 1 + colon + 1 + value_open + 1;
    let value_len = rest[value_rel..].find('"')?;

    Some((key, (trimmed_start + value_rel, trimmed_start + value_rel + value_len)))
}

/// 범위 접두사(`^`, `~`, `>=`, `<=`, `>`, `<`, `=`, `v`)와 버전 토큰을 분리합니다.
fn split_range_prefix(range: &str) -> (&str, &str) {
    let token_start = range
        .find(|c: char| c.is_ascii_digit())
        .unwrap_or(range.len());
    let (prefix, token) = range.split_at(token_start);
    // `*`, `1.2.3 || 2.x` 같은 범위는 접두사 보존 없이 전체 교체
    if token.is_empty() || prefix.contains(' ') || token.contains(' ') {
        return ("", "");
    }
    (prefix, token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vulnmend_core::types::Severity;

    fn finding(pkg: &str, fixed: &str) -> VulnerabilityFinding {
        VulnerabilityFinding {
            vulnerability_id: "CVE-2022-25883".to_owned(),
            package: pkg.to_owned(),
            ecosystem: Ecosystem::Node,
            installed_version: "5.7.1".to_owned(),
            fixed_version: Some(fixed.to_owned()),
            severity: Severity::High,
        }
    }

    const MANIFEST: &str = r#"{
  "name": "demo-app",
  "version": "1.0.0",
  "dependencies": {
    "express": "^4.17.1",
    "semver": "5.7.1"
  },
  "devDependencies": {
    "jest": "~29.0.0"
  }
}
"#;

    #[test]
    fn exact_version_is_replaced() {
        let out = PackageJsonPatcher.patch(MANIFEST, &[finding("semver", "7.5.2")]);
        assert!(out.new_text.contains(r#""semver": "7.5.2""#));
        assert_eq!(out.applied.len(), 1);
        assert_eq!(out.applied[0].previous.as_deref(), Some("5.7.1"));
    }

    #[test]
    fn caret_prefix_is_preserved() {
        let out = PackageJsonPatcher.patch(MANIFEST, &[finding("express", "4.19.2")]);
        assert!(out.new_text.contains(r#""express": "^4.19.2""#));
    }

    #[test]
    fn dev_dependencies_are_patched() {
        let out = PackageJsonPatcher.patch(MANIFEST, &[finding("jest", "29.7.0")]);
        assert!(out.new_text.contains(r#""jest": "~29.7.0""#));
    }

    #[test]
    fn top_level_fields_are_never_touched() {
        // 루트 패키지명과 같은 이름의 의존성이 보고되어도 메타데이터는 보존
        let out = PackageJsonPatcher.patch(MANIFEST, &[finding("name", "9.9.9")]);
        assert!(out.new_text.contains(r#""name": "demo-app""#));
        assert!(out.applied.is_empty());
        assert_eq!(out.unresolved, vec!["name".to_owned()]);
    }

    #[test]
    fn formatting_is_preserved_exactly() {
        let out = PackageJsonPatcher.patch(MANIFEST, &[finding("semver", "7.5.2")]);
        let expected = MANIFEST.replace(r#""semver": "5.7.1""#, r#""semver": "7.5.2""#);
        assert_eq!(out.new_text, expected);
    }

    #[test]
    fn already_safe_range_is_untouched() {
        let out = PackageJsonPatcher.patch(MANIFEST, &[finding("semver", "5.7.0")]);
        assert_eq!(out.new_text, MANIFEST);
        assert!(out.applied.is_empty());
        assert!(out.unresolved.is_empty());
    }

    #[test]
    fn safe_dependency_with_vulnerable_dev_duplicate_is_patched() {
        let manifest = "{\n  \"dependencies\": {\n    \"semver\": \"7.5.2\"\n  },\n  \"devDependencies\": {\n    \"semver\": \"5.7.1\"\n  }\n}\n";
        let out = PackageJsonPatcher.patch(manifest, &[finding("semver", "7.5.2")]);
        assert!(!out.new_text.contains("5.7.1"));
        assert_eq!(out.new_text.matches(r#""semver": "7.5.2""#).count(), 2);
        assert_eq!(out.applied.len(), 1);
        assert_eq!(out.applied[0].previous.as_deref(), Some("5.7.1"));
        assert!(out.warnings.iter().any(|w| w.contains("duplicate")));
    }

    #[test]
    fn scoped_package_names_match() {
        let manifest = "{\n  \"dependencies\": {\n    \"@babel/core\": \"7.0.0\"\n  }\n}\n";
        let out = PackageJsonPatcher.patch(manifest, &[finding("@babel/core", "7.23.2")]);
        assert!(out.new_text.contains(r#""@babel/core": "7.23.2""#));
    }

    #[test]
    fn patch_is_idempotent() {
        let findings = [finding("semver", "7.5.2")];
        let first = PackageJsonPatcher.patch(MANIFEST, &findings);
        let second = PackageJsonPatcher.patch(&first.new_text, &findings);
        assert_eq!(second.new_text, first.new_text);
        assert!(second.applied.is_empty());
    }
}

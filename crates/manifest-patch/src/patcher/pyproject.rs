//! pyproject.toml 패처 (Poetry 형식)
//!
//! TOML을 재직렬화하지 않습니다. `dependencies`로 끝나는 테이블
//! (`[tool.poetry.dependencies]`, `[tool.poetry.group.dev.dependencies]` 등)
//! 안에서 `pkg = "버전"` 줄의 따옴표 안 버전 토큰만 교체합니다.
//!
//! `pkg = { version = "버전", ... }` 인라인 테이블은 `version` 키의
//! 값만 교체합니다. `^`/`~` 등 범위 접두사는 유지됩니다.

use std::collections::HashSet;

use tracing::debug;

use vulnmend_core::types::{Ecosystem, VulnerabilityFinding};

use crate::patcher::{
    AppliedPatch, ManifestPatcher, PatchOutcome, already_safe, candidate_map,
    join_preserving_newline, normalize_name,
};

/// pyproject.toml 패처
pub struct PyprojectPatcher;

impl ManifestPatcher for PyprojectPatcher {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Poetry
    }

    fn manifest_filename(&self) -> &'static str {
        "pyproject.toml"
    }

    fn accepts(&self, ecosystem: Ecosystem) -> bool {
        ecosystem.uses_pep440()
    }

    fn patch(&self, content: &str, findings: &[VulnerabilityFinding]) -> PatchOutcome {
        let candidates = candidate_map(self, findings);
        let mut outcome = PatchOutcome::default();
        let mut patched: HashSet<String> = HashSet::new();
        let mut lines = Vec::new();
        let mut in_deps = false;

        for line in content.lines() {
            let trimmed = line.trim();

            if trimmed.starts_with('[') {
                in_deps = is_dependency_table(trimmed);
                lines.push(line.to_owned());
                continue;
            }

            if !in_deps {
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

/// 테이블 헤더가 의존성 테이블인지 확인합니다.
fn is_dependency_table(header: &str) -> bool {
    header
        .trim_start_matches('[')
        .trim_end_matches(']')
        .trim()
        .ends_with("dependencies")
}

/// 의존성 테이블 내부의 `pkg = "버전"` 줄 하나를 패치합니다.
///
/// Pipfile과 pyproject.toml이 공유합니다. `pkg = { version = "...", ... }`
/// 인라인 테이블도 처리합니다.
pub(crate) fn patch_dep_line(
    manifest: &str,
    line: &str,
    candidates: &std::collections::HashMap<String, crate::patcher::Candidate<'_>>,
    patched: &mut HashSet<String>,
    outcome: &mut PatchOutcome,
) -> String {
    let Some((key, value_span)) = parse_toml_dep(line) else {
        return line.to_owned();
    };

    let norm = normalize_name(Ecosystem::Poetry, key);
    let Some(candidate) = candidates.get(&norm) else {
        return line.to_owned();
    };

    let old_spec = &line[value_span.0..value_span.1];
    let (prefix, declared) = split_spec_prefix(old_spec);

    if !declared.is_empty() && already_safe(candidate.finding.ecosystem, declared, candidate.fixed) {
        debug!(package = key, declared, fixed = candidate.fixed, "declaration already safe");
        patched.insert(norm);
        return line.to_owned();
    }

    let new_spec = format!("{prefix}{}", candidate.fixed);
    if !patched.insert(norm.clone()) {
        outcome
            .warnings
            .push(format!("{key}: duplicate declaration patched"));
    }
    // 앞선 선언이 이미 안전해서 applied가 비어 있어도 교체는 기록
    if !outcome
        .applied
        .iter()
        .any(|p| normalize_name(Ecosystem::Poetry, &p.package) == norm)
    {
        outcome.applied.push(AppliedPatch {
            package: key.to_owned(),
            previous: Some(old_spec.to_owned()),
            new_version: candidate.fixed.to_owned(),
            manifest: manifest.to_owned(),
        });
    }

    format!("{}{new_spec}{}", &line[..value_span.0], &line[value_span.1..])
}

/// `pkg = "spec"` 또는 `pkg = { version = "spec", ... }` 줄에서
/// 키와 버전 문자열의 바이트 범위를 추출합니다.
fn parse_toml_dep(line: &str) -> Option<(&str, (usize, usize))> {
    let trimmed = line.trim_start();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }

    let key_end = trimmed.find(|c: char| c == '=' || c.is_whitespace())?;
    let key = &trimmed[..key_end];
    if key.is_empty() || key.starts_with('"') {
        return None;
    }

    let after_key = &trimmed[key_end..];
    let eq = after_key.find('=')?;
    let value_part = &after_key[eq + 1..];

    // 인라인 테이블이면 version 키의 값을, 아니면 첫 따옴표 문자열을 찾음
    let search_from = if value_part.trim_start().starts_with('{') {
        value_part.find("version")? + "version".len()
    } else {
        0
    };

    let open = value_part[search_from..].find('"')? + search_from;
    let close = value_part[open + 1..].find('"')? + open + 1;

    let base = line.len() - trimmed.len() + key_end + eq + 1;
    Some((key, (base + open + 1, base + close)))
}

/// 지정자 접두사(`^`, `~`, `==`, `>=` 등)와 버전 토큰을 분리합니다.
pub(crate) fn split_spec_prefix(spec: &str) -> (&str, &str) {
    let token_start = spec
        .find(|c: char| c.is_ascii_digit())
        .unwrap_or(spec.len());
    let (prefix, token) = spec.split_at(token_start);
    if token.is_empty() || spec.contains(',') {
        // `*` 또는 복합 지정자는 전체 교체
        return ("", "");
    }
    (prefix, token)
}

//! requirements.txt 패처
//!
//! PEP 508 선언의 버전 토큰만 교체합니다. 연산자, 주석, 환경 마커,
//! 공백, 줄 순서는 보존합니다.
//!
//! # 처리 규칙
//!
//! - `pkg==1.0` / `pkg>=1.0` 등 단일 지정자: 연산자를 유지하고 버전만 교체
//! - `pkg` (버전 없음): `pkg==수정버전`으로 고정
//! - `pkg>=1.0,<2.0` 복합 지정자: `pkg==수정버전`으로 교체하고 경고
//! - `-r`, `--hash` 등 옵션 줄과 URL 지정은 건드리지 않음
//! - 선언 버전이 이미 수정 버전 이상이면 건너뜀 (단조 상향)

use std::collections::HashSet;

use tracing::debug;

use vulnmend_core::types::{Ecosystem, VulnerabilityFinding};

use crate::patcher::{
    AppliedPatch, ManifestPatcher, PatchOutcome, already_safe, candidate_map,
    join_preserving_newline, normalize_name,
};

/// requirements.txt 패처
pub struct RequirementsPatcher;

impl ManifestPatcher for RequirementsPatcher {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Python
    }

    fn manifest_filename(&self) -> &'static str {
        "requirements.txt"
    }

    fn accepts(&self, ecosystem: Ecosystem) -> bool {
        ecosystem.uses_pep440()
    }

    fn patch(&self, content: &str, findings: &[VulnerabilityFinding]) -> PatchOutcome {
        let candidates = candidate_map(self, findings);
        let mut outcome = PatchOutcome::default();
        let mut patched: HashSet<String> = HashSet::new();
        let mut lines = Vec::new();

        for line in content.lines() {
            lines.push(self.patch_line(line, &candidates, &mut patched, &mut outcome));
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

impl RequirementsPatcher {
    fn patch_line(
        &self,
        line: &str,
        candidates: &std::collections::HashMap<String, crate::patcher::Candidate<'_>>,
        patched: &mut HashSet<String>,
        outcome: &mut PatchOutcome,
    ) -> String {
        let (code, comment) = split_comment(line);
        let trimmed = code.trim();

        if trimmed.is_empty() || trimmed.starts_with('-') {
            return line.to_owned();
        }

        let Some(decl) = parse_declaration(trimmed) else {
            return line.to_owned();
        };

        let norm = normalize_name(self.ecosystem(), decl.name);
        let Some(candidate) = candidates.get(&norm) else {
            return line.to_owned();
        };

        let fixed = candidate.fixed;
        let mut previous = None;

        let mut new_decl = match decl.specifier {
            Specifier::None => format!("{}{}=={fixed}", decl.name, decl.extras),
            Specifier::Single { operator, version } => {
                if already_safe(candidate.finding.ecosystem, version, fixed) {
                    debug!(package = decl.name, declared = version, fixed, "declaration already safe");
                    patched.insert(norm);
                    return line.to_owned();
                }
                previous = Some(version.to_owned());
                if matches!(operator, "==" | "===" | ">=" | ">" | "~=") {
                    format!("{}{}{operator}{fixed}", decl.name, decl.extras)
                } else {
                    // <=, <, != 선언은 수정 버전을 포함하지 않을 수 있으므로 고정
                    outcome.warnings.push(format!(
                        "{}: replaced constraint `{operator}{version}` with `=={fixed}`",
                        decl.name
                    ));
                    format!("{}{}=={fixed}", decl.name, decl.extras)
                }
            }
            Specifier::Compound(spec) => {
                outcome.warnings.push(format!(
                    "{}: replaced compound constraint `{spec}` with `=={fixed}`",
                    decl.name
                ));
                format!("{}{}=={fixed}", decl.name, decl.extras)
            }
        };
        if !decl.marker.is_empty() {
            new_decl.push_str(decl.marker);
        }

        if !patched.insert(norm.clone()) {
            outcome
                .warnings
                .push(format!("{}: duplicate declaration patched", decl.name));
        }
        // 앞선 선언이 이미 안전해서 applied가 비어 있어도 교체는 기록
        if !outcome
            .applied
            .iter()
            .any(|p| normalize_name(self.ecosystem(), &p.package) == norm)
        {
            outcome.applied.push(AppliedPatch {
                package: decl.name.to_owned(),
                previous,
                new_version: fixed.to_owned(),
                manifest: self.manifest_filename().to_owned(),
            });
        }

        rebuild_line(code, &new_decl, comment)
    }
}

/// 버전 지정자 형태
enum Specifier<'a> {
    /// 버전 없음 (`flask`)
    None,
    /// 단일 지정자 (`flask==1.0`)
    Single { operator: &'a str, version: &'a str },
    /// 복합 지정자 (`flask>=1.0,<2.0`)
    Compound(&'a str),
}

struct Declaration<'a> {
    name: &'a str,
    extras: &'a str,
    specifier: Specifier<'a>,
    /// `;`부터 시작하는 환경 마커 (없으면 빈 문자열)
    marker: &'a str,
}

/// 주석을 분리합니다. 주석은 `#`부터 줄 끝까지이며 그대로 보존됩니다.
fn split_comment(line: &str) -> (&str, &str) {
    match line.find('#') {
        Some(idx) => (&line[..idx], &line[idx..]),
        None => (line, ""),
    }
}

/// PEP 508 선언을 파싱합니다. 선언 형태가 아니면 `None`을 반환합니다.
fn parse_declaration(s: &str) -> Option<Declaration<'_>> {
    let name_end = s
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.'))
        .unwrap_or(s.len());
    if name_end == 0 || !s.chars().next()?.is_ascii_alphanumeric() {
        return None;
    }
    let name = &s[..name_end];
    let mut rest = &s[name_end..];

    let extras = if rest.starts_with('[') {
        let close = rest.find(']')?;
        let extras = &rest[..=close];
        rest = &rest[close + 1..];
        extras
    } else {
        ""
    };

    // 마커는 `;` 앞 공백까지 포함해 그대로 보존
    let (spec_part, marker) = match rest.find(';') {
        Some(idx) => {
            let spec = &rest[..idx];
            (spec, &rest[spec.trim_end().len()..])
        }
        None => (rest, ""),
    };
    let spec_part = spec_part.trim();

    let specifier = if spec_part.is_empty() {
        Specifier::None
    } else if !spec_part.starts_with(['<', '>', '=', '!', '~']) {
        // URL 지정(@), 경로 등은 선언으로 취급하지 않음
        return None;
    } else if spec_part.contains(',') {
        Specifier::Compound(spec_part)
    } else {
        let op_end = spec_part
            .find(|c: char| !matches!(c, '<' | '>' | '=' | '!' | '~'))
            .unwrap_or(spec_part.len());
        Specifier::Single {
            operator: &spec_part[..op_end],
            version: spec_part[op_end..].trim(),
        }
    };

    Some(Declaration { name, extras, specifier, marker })
}

/// 원본 코드 부분의 앞뒤 공백과 주석을 유지하며 줄을 재구성합니다.
fn rebuild_line(code: &str, new_decl: &str, comment: &str) -> String {
    let leading = &code[..code.len() - code.trim_start().len()];
    let trailing = &code[code.trim_end().len()..];
    format!("{leading}{new_decl}{trailing}{comment}")
}

//! 생태계별 버전 비교 — SemVer 계열과 PEP 440 계열 정렬
//!
//! 버전 비교는 절대 사전식(lexical) 문자열 비교를 사용하지 않습니다.
//! `"1.9.0" < "1.10.0"`이 성립해야 "이미 안전함" 오판을 피할 수 있습니다.
//!
//! - Node/Maven 계열: `semver` 크레이트로 파싱, 실패 시 숫자 세그먼트 비교로 fallback
//! - Python 계열: PEP 440 부분집합 (epoch, release, pre/post/dev 릴리스)

use std::cmp::Ordering;

use crate::types::Ecosystem;

/// 생태계 규칙에 따라 두 버전 문자열을 비교합니다.
pub fn compare(ecosystem: Ecosystem, a: &str, b: &str) -> Ordering {
    if ecosystem.uses_pep440() {
        pep440_cmp(a, b)
    } else {
        semverish_cmp(a, b)
    }
}

/// `to`가 `from`보다 엄격히 높은 버전인지 확인합니다.
pub fn is_upgrade(ecosystem: Ecosystem, from: &str, to: &str) -> bool {
    compare(ecosystem, to, from) == Ordering::Greater
}

// ─── SemVer 계열 ─────────────────────────────────────────────────────

/// SemVer 비교, 파싱 실패 시 숫자 세그먼트 비교로 fallback.
fn semverish_cmp(a: &str, b: &str) -> Ordering {
    let a = strip_constraint_prefix(a);
    let b = strip_constraint_prefix(b);

    if let (Ok(va), Ok(vb)) = (semver::Version::parse(a), semver::Version::parse(b)) {
        return va.cmp(&vb);
    }

    numeric_segment_cmp(a, b)
}

/// 제약 접두어(`^`, `~`, `>=`, `==`, `v` 등)를 제거합니다.
fn strip_constraint_prefix(s: &str) -> &str {
    s.trim()
        .trim_start_matches(['^', '~', '=', '>', '<', '!', 'v', 'V'])
        .trim()
}

/// 점으로 구분된 세그먼트를 숫자 우선으로 비교합니다.
///
/// `semver` 파싱이 불가능한 버전("1.9", "4.2.1.Final" 등)의 fallback 경로입니다.
fn numeric_segment_cmp(a: &str, b: &str) -> Ordering {
    let seg_a: Vec<&str> = a.split(['.', '-', '_']).collect();
    let seg_b: Vec<&str> = b.split(['.', '-', '_']).collect();
    let len = seg_a.len().max(seg_b.len());

    for i in 0..len {
        let sa = seg_a.get(i).copied().unwrap_or("0");
        let sb = seg_b.get(i).copied().unwrap_or("0");

        match (sa.parse::<u64>(), sb.parse::<u64>()) {
            (Ok(na), Ok(nb)) => match na.cmp(&nb) {
                Ordering::Equal => {}
                other => return other,
            },
            // 숫자 세그먼트는 문자 세그먼트보다 높은 것으로 취급
            // ("1.0.0" > "1.0.rc1"와 유사한 규칙)
            (Ok(_), Err(_)) => return Ordering::Greater,
            (Err(_), Ok(_)) => return Ordering::Less,
            (Err(_), Err(_)) => match sa.cmp(sb) {
                Ordering::Equal => {}
                other => return other,
            },
        }
    }

    Ordering::Equal
}

// ─── PEP 440 계열 ────────────────────────────────────────────────────

/// 파싱된 PEP 440 버전 (부분집합)
#[derive(Debug, Clone, PartialEq, Eq)]
struct Pep440 {
    epoch: u64,
    release: Vec<u64>,
    /// (rank, number): rank는 dev(-3) < alpha(-2) < beta(-1) < rc(0) < final(1) < post(2)
    stage: (i8, u64),
}

const STAGE_DEV: i8 = -3;
const STAGE_ALPHA: i8 = -2;
const STAGE_BETA: i8 = -1;
const STAGE_RC: i8 = 0;
const STAGE_FINAL: i8 = 1;
const STAGE_POST: i8 = 2;

/// PEP 440 부분집합 비교.
///
/// epoch, release 튜플, pre/post/dev 순으로 비교합니다.
/// 파싱이 전혀 불가능한 입력은 숫자 세그먼트 비교로 fallback합니다.
fn pep440_cmp(a: &str, b: &str) -> Ordering {
    match (parse_pep440(a), parse_pep440(b)) {
        (Some(va), Some(vb)) => {
            match va.epoch.cmp(&vb.epoch) {
                Ordering::Equal => {}
                other => return other,
            }
            let len = va.release.len().max(vb.release.len());
            for i in 0..len {
                let ra = va.release.get(i).copied().unwrap_or(0);
                let rb = vb.release.get(i).copied().unwrap_or(0);
                match ra.cmp(&rb) {
                    Ordering::Equal => {}
                    other => return other,
                }
            }
            va.stage.cmp(&vb.stage)
        }
        _ => numeric_segment_cmp(a, b),
    }
}

fn parse_pep440(s: &str) -> Option<Pep440> {
    let s = strip_constraint_prefix(s).to_lowercase();
    // 로컬 버전 식별자(+...)는 정렬에 영향을 주지 않는 것으로 취급
    let s = s.split('+').next()?;

    let (epoch, rest) = match s.split_once('!') {
        Some((e, rest)) => (e.parse().ok()?, rest),
        None => (0, s),
    };

    let mut release = Vec::new();
    let mut stage = (STAGE_FINAL, 0u64);
    let mut chars = rest.char_indices().peekable();
    let mut tail = "";

    while let Some(&(i, c)) = chars.peek() {
        if c.is_ascii_digit() || c == '.' {
            chars.next();
        } else {
            tail = &rest[i..];
            break;
        }
    }
    let release_part = if tail.is_empty() {
        rest
    } else {
        &rest[..rest.len() - tail.len()]
    };

    for seg in release_part.split('.').filter(|seg| !seg.is_empty()) {
        release.push(seg.parse().ok()?);
    }
    if release.is_empty() {
        return None;
    }

    if !tail.is_empty() {
        let tail = tail.trim_start_matches(['.', '-', '_']);
        let (rank, num_part) = if let Some(rest) = strip_any(tail, &["rc", "c", "preview", "pre"]) {
            (STAGE_RC, rest)
        } else if let Some(rest) = strip_any(tail, &["alpha", "a"]) {
            (STAGE_ALPHA, rest)
        } else if let Some(rest) = strip_any(tail, &["beta", "b"]) {
            (STAGE_BETA, rest)
        } else if let Some(rest) = strip_any(tail, &["post", "rev", "r"]) {
            (STAGE_POST, rest)
        } else if let Some(rest) = strip_any(tail, &["dev"]) {
            (STAGE_DEV, rest)
        } else {
            return None;
        };
        let num = num_part
            .trim_start_matches(['.', '-', '_'])
            .parse()
            .unwrap_or(0);
        stage = (rank, num);
    }

    Some(Pep440 {
        epoch,
        release,
        stage,
    })
}

fn strip_any<'a>(s: &'a str, prefixes: &[&str]) -> Option<&'a str> {
    for prefix in prefixes {
        if let Some(rest) = s.strip_prefix(prefix) {
            // "a1"의 "a"가 "alpha"의 일부를 잘라내지 않도록 긴 접두어부터 검사하는
            // 호출 순서를 따른다
            if rest.is_empty() || !rest.starts_with(|c: char| c.is_ascii_alphabetic()) {
                return Some(rest);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn semver_not_lexical() {
        assert_eq!(
            compare(Ecosystem::Node, "1.10.0", "1.9.0"),
            Ordering::Greater
        );
        assert_eq!(compare(Ecosystem::Node, "1.9.0", "1.10.0"), Ordering::Less);
    }

    #[test]
    fn semver_equal() {
        assert_eq!(compare(Ecosystem::Node, "2.0.1", "2.0.1"), Ordering::Equal);
    }

    #[test]
    fn semver_constraint_prefix_ignored() {
        assert_eq!(compare(Ecosystem::Node, "^1.2.3", "1.2.3"), Ordering::Equal);
        assert_eq!(compare(Ecosystem::Node, "~2.0.0", "1.9.9"), Ordering::Greater);
    }

    #[test]
    fn semver_two_segment_fallback() {
        // semver::Version은 "1.9"를 파싱하지 못하므로 fallback 경로
        assert_eq!(compare(Ecosystem::Node, "1.10", "1.9"), Ordering::Greater);
        assert_eq!(compare(Ecosystem::Node, "1.9", "1.9.1"), Ordering::Less);
    }

    #[test]
    fn maven_qualifier_fallback() {
        assert_eq!(
            compare(Ecosystem::Maven, "4.2.2", "4.2.1.Final"),
            Ordering::Greater
        );
    }

    #[test]
    fn pep440_not_lexical() {
        assert_eq!(
            compare(Ecosystem::Python, "1.10.0", "1.9.0"),
            Ordering::Greater
        );
        assert_eq!(compare(Ecosystem::Python, "2.9", "2.31"), Ordering::Less);
    }

    #[test]
    fn pep440_padded_release() {
        assert_eq!(compare(Ecosystem::Python, "1.0", "1.0.0"), Ordering::Equal);
        assert_eq!(compare(Ecosystem::Python, "1.0.1", "1.0"), Ordering::Greater);
    }

    #[test]
    fn pep440_prerelease_before_final() {
        assert_eq!(
            compare(Ecosystem::Python, "1.0rc1", "1.0"),
            Ordering::Less
        );
        assert_eq!(compare(Ecosystem::Python, "1.0a1", "1.0b1"), Ordering::Less);
        assert_eq!(compare(Ecosystem::Python, "1.0b2", "1.0rc1"), Ordering::Less);
    }

    #[test]
    fn pep440_post_after_final() {
        assert_eq!(
            compare(Ecosystem::Python, "1.0.post1", "1.0"),
            Ordering::Greater
        );
    }

    #[test]
    fn pep440_dev_before_everything() {
        assert_eq!(
            compare(Ecosystem::Python, "1.0.dev1", "1.0a1"),
            Ordering::Less
        );
    }

    #[test]
    fn pep440_epoch_dominates() {
        assert_eq!(
            compare(Ecosystem::Python, "1!1.0", "2.0"),
            Ordering::Greater
        );
    }

    #[test]
    fn pep440_local_version_ignored() {
        assert_eq!(
            compare(Ecosystem::Python, "1.0+local.1", "1.0"),
            Ordering::Equal
        );
    }

    #[test]
    fn is_upgrade_strict() {
        assert!(is_upgrade(Ecosystem::Python, "1.0", "1.1"));
        assert!(!is_upgrade(Ecosystem::Python, "1.1", "1.1"));
        assert!(!is_upgrade(Ecosystem::Python, "1.1", "1.0"));
        assert!(is_upgrade(Ecosystem::Node, "1.9.0", "1.10.0"));
    }
}

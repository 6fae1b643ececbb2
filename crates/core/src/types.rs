//! 도메인 타입 — 시스템 전역에서 사용되는 공통 타입
//!
//! 스캐너 출력 정규화, 매니페스트 패치, 워크플로 상태 추적에서
//! 공유되는 데이터 구조를 정의합니다.

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// 심각도 레벨
///
/// 취약점의 심각도를 나타냅니다.
/// `Ord` 구현으로 심각도 비교가 가능합니다 (`Unknown < Low < Medium < High < Critical`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Severity {
    /// 심각도 미상 (스캐너가 UNKNOWN으로 보고)
    #[default]
    Unknown,
    /// 낮은 심각도
    Low,
    /// 중간 심각도
    Medium,
    /// 높은 심각도
    High,
    /// 치명적 — 즉시 대응 필요
    Critical,
}

impl Severity {
    /// 문자열에서 심각도를 파싱합니다.
    ///
    /// 대소문자를 구분하지 않습니다.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "unknown" => Some(Self::Unknown),
            "low" => Some(Self::Low),
            "medium" | "med" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" | "crit" => Some(Self::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "Unknown"),
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
            Self::Critical => write!(f, "Critical"),
        }
    }
}

/// 패키지 생태계 (언어/패키지 관리자)
///
/// 각 매니페스트 형식에 대응하는 패키지 생태계를 나타냅니다.
/// 버전 비교 규칙과 매니페스트 문법은 생태계별로 다릅니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ecosystem {
    /// Python (requirements.txt)
    Python,
    /// Python / Poetry (pyproject.toml)
    Poetry,
    /// Python / Pipenv (Pipfile)
    Pipenv,
    /// JavaScript/TypeScript (package.json)
    Node,
    /// Java / Maven (pom.xml)
    Maven,
}

impl Ecosystem {
    /// 스캐너 결과의 타입 문자열에서 생태계를 파싱합니다 (대소문자 구분 없음).
    ///
    /// Trivy는 결과 블록의 `Type` 필드로 패키지 출처를 보고합니다
    /// (`pip`, `poetry`, `pipenv`, `npm`, `yarn`, `jar`, `pom` 등).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "python" | "pip" | "python-pkg" | "requirements" => Some(Self::Python),
            "poetry" => Some(Self::Poetry),
            "pipenv" => Some(Self::Pipenv),
            "node" | "npm" | "yarn" | "pnpm" | "node-pkg" => Some(Self::Node),
            "maven" | "jar" | "pom" | "gradle" => Some(Self::Maven),
            _ => None,
        }
    }

    /// 이 생태계가 Python 계열 버전 규칙(PEP 440)을 따르는지 여부.
    pub fn uses_pep440(&self) -> bool {
        matches!(self, Self::Python | Self::Poetry | Self::Pipenv)
    }
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Python => write!(f, "python"),
            Self::Poetry => write!(f, "poetry"),
            Self::Pipenv => write!(f, "pipenv"),
            Self::Node => write!(f, "node"),
            Self::Maven => write!(f, "maven"),
        }
    }
}

/// 정규화된 취약점 발견 항목
///
/// 스캐너 원시 출력에서 정규화되어 생성되며, 이후 단계에서는 읽기 전용입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VulnerabilityFinding {
    /// 취약점 ID (예: CVE-2024-1234)
    pub vulnerability_id: String,
    /// 영향받는 패키지명
    pub package: String,
    /// 패키지 생태계
    pub ecosystem: Ecosystem,
    /// 설치된 버전
    pub installed_version: String,
    /// 수정된 버전 (없으면 수정 불가)
    pub fixed_version: Option<String>,
    /// 심각도
    pub severity: Severity,
}

impl fmt::Display for VulnerabilityFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {} {} (fixed: {})",
            self.vulnerability_id,
            self.severity,
            self.package,
            self.installed_version,
            self.fixed_version.as_deref().unwrap_or("N/A"),
        )
    }
}

/// 파이프라인 실행 단계
///
/// 저장소 하나에 대한 원격 조치 실행의 현재 단계를 나타냅니다.
/// `Succeeded`, `Failed`, `Skipped`는 종단 상태이며 이후 전이는 없습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStage {
    /// 실행 대기 중
    Queued,
    /// 저장소 클론/갱신 중
    Cloning,
    /// 컨테이너 이미지 빌드 중
    Building,
    /// 이미지 취약점 스캔 중
    Scanning,
    /// 매니페스트 패치 중
    Patching,
    /// 테스트 명령 검증 중
    Testing,
    /// 브랜치 푸시 및 PR 생성 중
    Publishing,
    /// 성공 종료
    Succeeded,
    /// 실패 종료
    Failed,
    /// 조치 대상 없음 (성공적 no-op)
    Skipped,
}

impl RunStage {
    /// 종단 상태 여부를 반환합니다.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Skipped)
    }
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queued => write!(f, "queued"),
            Self::Cloning => write!(f, "cloning"),
            Self::Building => write!(f, "building"),
            Self::Scanning => write!(f, "scanning"),
            Self::Patching => write!(f, "patching"),
            Self::Testing => write!(f, "testing"),
            Self::Publishing => write!(f, "publishing"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// 파이프라인 실행 요약
///
/// 저장소당 최신 실행의 단계와 메시지를 담습니다.
/// StatusTracker에 저장되어 비동기 조회에 사용됩니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// 저장소 이름
    pub repo: String,
    /// 현재 단계
    pub stage: RunStage,
    /// 사람이 읽을 수 있는 상태 메시지
    pub message: String,
    /// 생성된 PR URL (발행된 경우)
    pub pr_url: Option<String>,
    /// 마지막 갱신 시각
    pub updated_at: SystemTime,
}

impl RunSummary {
    /// 새 요약을 생성합니다.
    pub fn new(repo: impl Into<String>, stage: RunStage, message: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            stage,
            message: message.into(),
            pr_url: None,
            updated_at: SystemTime::now(),
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", self.repo, self.stage, self.message)
    }
}

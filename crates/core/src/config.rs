//! 설정 관리 — vulnmend.toml 파싱 및 런타임 설정
//!
//! [`VulnmendConfig`]는 에이전트 전체 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`VULNMEND_GENERAL_WORK_DIR=/tmp/work` 형식)
//! 3. 설정 파일 (`vulnmend.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), vulnmend_core::error::VulnmendError> {
//! use vulnmend_core::config::VulnmendConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = VulnmendConfig::load("vulnmend.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = VulnmendConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, VulnmendError};
use crate::types::Severity;

/// Vulnmend 통합 설정
///
/// `vulnmend.toml` 파일의 최상위 구조를 나타냅니다.
/// 대상 저장소 목록은 시작 시 한 번 읽히며 런타임에 변경되지 않습니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VulnmendConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 스캔/정규화 설정
    #[serde(default)]
    pub scan: ScanConfig,
    /// 발행(브랜치 푸시 + PR) 설정
    #[serde(default)]
    pub publish: PublishConfig,
    /// 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// 대상 저장소 목록
    #[serde(default)]
    pub repos: Vec<RepoConfig>,
}

impl VulnmendConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    ///
    /// 설정 로딩 순서:
    /// 1. TOML 파일 파싱
    /// 2. 환경변수 오버라이드 적용
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, VulnmendError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, VulnmendError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                VulnmendError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                VulnmendError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, VulnmendError> {
        toml::from_str(toml_str).map_err(|e| {
            VulnmendError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `VULNMEND_{SECTION}_{FIELD}`
    /// 예: `VULNMEND_GENERAL_WORK_DIR=/var/lib/vulnmend/work`
    ///
    /// 저장소 목록(`[[repos]]`)은 파일 전용이며 환경변수로 오버라이드할 수 없습니다.
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "VULNMEND_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "VULNMEND_GENERAL_LOG_FORMAT");
        override_string(&mut self.general.work_dir, "VULNMEND_GENERAL_WORK_DIR");
        override_string(&mut self.general.listen_addr, "VULNMEND_GENERAL_LISTEN_ADDR");
        override_u16(&mut self.general.port, "VULNMEND_GENERAL_PORT");

        // Scan
        override_string(&mut self.scan.min_severity, "VULNMEND_SCAN_MIN_SEVERITY");
        override_bool(&mut self.scan.save_reports, "VULNMEND_SCAN_SAVE_REPORTS");

        // Publish
        override_bool(&mut self.publish.enabled, "VULNMEND_PUBLISH_ENABLED");
        override_string(&mut self.publish.api_base, "VULNMEND_PUBLISH_API_BASE");
        override_string(&mut self.publish.token_env, "VULNMEND_PUBLISH_TOKEN_ENV");
        override_string(&mut self.publish.base_branch, "VULNMEND_PUBLISH_BASE_BRANCH");

        // Metrics
        override_bool(&mut self.metrics.enabled, "VULNMEND_METRICS_ENABLED");
        override_string(&mut self.metrics.listen_addr, "VULNMEND_METRICS_LISTEN_ADDR");
        override_u16(&mut self.metrics.port, "VULNMEND_METRICS_PORT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), VulnmendError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if self.general.work_dir.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "general.work_dir".to_owned(),
                reason: "work_dir must not be empty".to_owned(),
            }
            .into());
        }

        // min_severity 검증
        if Severity::from_str_loose(&self.scan.min_severity).is_none() {
            return Err(ConfigError::InvalidValue {
                field: "scan.min_severity".to_owned(),
                reason: "must be one of: unknown, low, medium, high, critical".to_owned(),
            }
            .into());
        }

        // 저장소 목록 검증: 이름 필수, 중복 금지, URL 필수
        let mut seen = std::collections::HashSet::new();
        for repo in &self.repos {
            if repo.name.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "repos.name".to_owned(),
                    reason: "repository name must not be empty".to_owned(),
                }
                .into());
            }
            if repo.url.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: format!("repos.{}.url", repo.name),
                    reason: "clone url must not be empty".to_owned(),
                }
                .into());
            }
            if !seen.insert(repo.name.as_str()) {
                return Err(ConfigError::InvalidValue {
                    field: "repos.name".to_owned(),
                    reason: format!("duplicate repository name: {}", repo.name),
                }
                .into());
            }
        }

        Ok(())
    }

    /// 설정된 최소 심각도를 반환합니다.
    pub fn min_severity(&self) -> Severity {
        Severity::from_str_loose(&self.scan.min_severity).unwrap_or(Severity::Medium)
    }

    /// 이름으로 저장소 설정을 찾습니다.
    pub fn find_repo(&self, name: &str) -> Option<&RepoConfig> {
        self.repos.iter().find(|r| r.name == name)
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
    /// 저장소 작업 디렉토리 루트 (저장소당 하위 디렉토리 생성)
    pub work_dir: String,
    /// HTTP API 수신 주소
    pub listen_addr: String,
    /// HTTP API 포트
    pub port: u16,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
            work_dir: "/var/lib/vulnmend/work".to_owned(),
            listen_addr: "127.0.0.1".to_owned(),
            port: 8420,
        }
    }
}

/// 스캔/정규화 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// 조치 대상 최소 심각도 (unknown, low, medium, high, critical)
    pub min_severity: String,
    /// 원시 스캐너 리포트를 작업 디렉토리에 저장할지 여부
    pub save_reports: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            min_severity: "medium".to_owned(),
            save_reports: true,
        }
    }
}

/// 발행 설정 — 브랜치 푸시 및 PR 생성
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    /// 발행 활성화 여부 (false면 스캔+패치+검증까지만 수행)
    pub enabled: bool,
    /// 포지 REST API 베이스 URL
    pub api_base: String,
    /// 인증 토큰을 담는 환경변수 이름
    pub token_env: String,
    /// PR 베이스 브랜치
    pub base_branch: String,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_base: "https://api.github.com".to_owned(),
            token_env: "GITHUB_TOKEN".to_owned(),
            base_branch: "main".to_owned(),
        }
    }
}

/// 메트릭 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Prometheus 엔드포인트 활성화 여부
    pub enabled: bool,
    /// 메트릭 수신 주소
    pub listen_addr: String,
    /// 메트릭 포트
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9421,
        }
    }
}

/// 대상 저장소 설정
///
/// `[[repos]]` 배열의 엔트리 하나에 대응합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoConfig {
    /// 저장소 이름 (작업 디렉토리명과 상태 키로 사용)
    pub name: String,
    /// 클론 URL
    pub url: String,
    /// 패치 검증용 테스트 명령 (기본: pytest)
    #[serde(default = "default_test_command")]
    pub test_command: String,
    /// 기본 브랜치 (기본: publish.base_branch)
    #[serde(default)]
    pub default_branch: Option<String>,
}

fn default_test_command() -> String {
    "pytest".to_owned()
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, var: &str) {
    if let Ok(value) = std::env::var(var) {
        *target = value;
    }
}

fn override_bool(target: &mut bool, var: &str) {
    if let Ok(value) = std::env::var(var) {
        match value.to_lowercase().as_str() {
            "true" | "1" | "yes" => *target = true,
            "false" | "0" | "no" => *target = false,
            _ => tracing::warn!(var, value, "ignoring invalid boolean env override"),
        }
    }
}

fn override_u16(target: &mut u16, var: &str) {
    if let Ok(value) = std::env::var(var) {
        match value.parse() {
            Ok(parsed) => *target = parsed,
            Err(_) => tracing::warn!(var, value, "ignoring invalid numeric env override"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = VulnmendConfig::default();
        config.validate().unwrap();
        assert_eq!(config.min_severity(), Severity::Medium);
    }

    #[test]
    fn parse_minimal_config() {
        let config = VulnmendConfig::parse(
            r#"
[general]
log_level = "debug"

[[repos]]
name = "demo-app"
url = "https://github.com/acme/demo-app.git"
test_command = "pytest -q"
"#,
        )
        .unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.repos.len(), 1);
        assert_eq!(config.repos[0].test_command, "pytest -q");
    }

    #[test]
    fn test_command_defaults_to_pytest() {
        let config = VulnmendConfig::parse(
            r#"
[[repos]]
name = "demo-app"
url = "https://github.com/acme/demo-app.git"
"#,
        )
        .unwrap();
        assert_eq!(config.repos[0].test_command, "pytest");
    }

    #[test]
    fn rejects_invalid_log_level() {
        let config = VulnmendConfig::parse("[general]\nlog_level = \"verbose\"");
        let err = config.and_then(|c| c.validate().map(|_| c)).unwrap_err();
        assert!(err.to_string().contains("log_level"));
    }

    #[test]
    fn rejects_invalid_min_severity() {
        let config = VulnmendConfig::parse("[scan]\nmin_severity = \"severe\"").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_duplicate_repo_names() {
        let config = VulnmendConfig::parse(
            r#"
[[repos]]
name = "demo"
url = "https://example.com/a.git"

[[repos]]
name = "demo"
url = "https://example.com/b.git"
"#,
        )
        .unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn rejects_empty_repo_url() {
        let config = VulnmendConfig::parse(
            r#"
[[repos]]
name = "demo"
url = ""
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn find_repo_by_name() {
        let config = VulnmendConfig::parse(
            r#"
[[repos]]
name = "demo"
url = "https://example.com/a.git"
"#,
        )
        .unwrap();
        assert!(config.find_repo("demo").is_some());
        assert!(config.find_repo("missing").is_none());
    }

    #[tokio::test]
    async fn load_missing_file_is_config_error() {
        let err = VulnmendConfig::from_file("/nonexistent/vulnmend.toml")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            VulnmendError::Config(ConfigError::FileNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn load_from_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vulnmend.toml");
        tokio::fs::write(
            &path,
            r#"
[general]
log_level = "warn"
log_format = "pretty"
work_dir = "/tmp/vulnmend-work"

[scan]
min_severity = "high"
"#,
        )
        .await
        .unwrap();

        let config = VulnmendConfig::from_file(&path).await.unwrap();
        assert_eq!(config.general.log_format, "pretty");
        assert_eq!(config.min_severity(), Severity::High);
    }
}

//! 에러 타입 — 도메인별 에러 정의

/// Vulnmend 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum VulnmendError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 스캔 리포트 정규화 에러
    #[error("scan report error: {0}")]
    ScanReport(String),

    /// 매니페스트 패치 에러
    #[error("manifest patch error: {0}")]
    ManifestPatch(String),

    /// 워크플로 실행 에러
    #[error("workflow error: {0}")]
    Workflow(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
///
/// 시작 시점에 발생하면 치명적이며 프로세스를 중단합니다.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = ConfigError::InvalidValue {
            field: "general.log_level".to_owned(),
            reason: "must be one of: trace, debug, info, warn, error".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("general.log_level"));
        assert!(msg.contains("must be one of"));
    }

    #[test]
    fn config_error_converts_to_vulnmend_error() {
        let err = ConfigError::FileNotFound {
            path: "vulnmend.toml".to_owned(),
        };
        let top: VulnmendError = err.into();
        assert!(matches!(top, VulnmendError::Config(_)));
        assert!(top.to_string().contains("vulnmend.toml"));
    }

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let top: VulnmendError = io_err.into();
        assert!(matches!(top, VulnmendError::Io(_)));
    }
}

//! 매니페스트 패치 에러 타입
//!
//! 패치 자체는 순수 텍스트 변환이므로 실패하지 않습니다. 에러는
//! 매니페스트 파일 입출력에서만 발생합니다.

use vulnmend_core::error::VulnmendError;

/// 매니페스트 패치 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum ManifestPatchError {
    /// 매니페스트 읽기 실패
    #[error("failed to read manifest {path}: {source}")]
    ManifestRead {
        /// 매니페스트 경로
        path: String,
        /// 원인 I/O 에러
        #[source]
        source: std::io::Error,
    },

    /// 매니페스트 쓰기 실패
    #[error("failed to write manifest {path}: {source}")]
    ManifestWrite {
        /// 매니페스트 경로
        path: String,
        /// 원인 I/O 에러
        #[source]
        source: std::io::Error,
    },
}

impl From<ManifestPatchError> for VulnmendError {
    fn from(err: ManifestPatchError) -> Self {
        VulnmendError::ManifestPatch(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_error_display_includes_path() {
        let err = ManifestPatchError::ManifestRead {
            path: "/work/app/requirements.txt".to_owned(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.to_string().contains("requirements.txt"));
    }

    #[test]
    fn converts_to_vulnmend_error() {
        let err = ManifestPatchError::ManifestWrite {
            path: "pom.xml".to_owned(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let top: VulnmendError = err.into();
        assert!(matches!(top, VulnmendError::ManifestPatch(_)));
    }
}

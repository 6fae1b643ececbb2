//! 워크플로 에러 타입
//!
//! 각 단계의 치명적 실패는 해당 저장소의 실행만 FAILED로 종료시킵니다.
//! 다른 저장소의 실행에는 영향을 주지 않습니다.

use vulnmend_core::error::VulnmendError;
use vulnmend_scan_report::ScanReportError;
use vulnmend_manifest_patch::ManifestPatchError;

/// 워크플로 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// 저장소 클론/갱신 실패
    #[error("failed to clone repository {url}: {reason}")]
    Clone {
        /// 저장소 URL (자격증명 제외)
        url: String,
        /// 실패 사유
        reason: String,
    },

    /// 컨테이너 이미지 빌드 실패
    #[error("image build failed for {image}: {reason}")]
    BuildFailed {
        /// 이미지 태그
        image: String,
        /// 실패 사유
        reason: String,
    },

    /// 스캐너 실행 실패
    #[error("image scan failed for {image}: {reason}")]
    ScanFailed {
        /// 이미지 태그
        image: String,
        /// 실패 사유
        reason: String,
    },

    /// 스캐너 출력이 유효하지 않음
    #[error(transparent)]
    ScanOutputInvalid(#[from] ScanReportError),

    /// 매니페스트 패치 입출력 실패
    #[error(transparent)]
    Patch(#[from] ManifestPatchError),

    /// git 브랜치/커밋/푸시 실패
    #[error("git {op} failed: {reason}")]
    Git {
        /// 실패한 작업 (branch, commit, push)
        op: &'static str,
        /// 실패 사유
        reason: String,
    },

    /// 테스트 검증 실패 -- 게시를 차단하는 안전 게이트
    #[error("test verification failed: `{command}`")]
    TestVerificationFailed {
        /// 실행한 테스트 명령
        command: String,
    },

    /// 풀 리퀘스트 게시 실패
    #[error("publish failed: {reason}")]
    Publish {
        /// 실패 사유
        reason: String,
    },

    /// 같은 저장소의 실행이 이미 진행 중
    #[error("run already in progress for repository {repo}")]
    TriggerRejected {
        /// 저장소 이름
        repo: String,
    },

    /// 작업 디렉토리 등 파일 입출력 실패
    #[error("workflow io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<WorkflowError> for VulnmendError {
    fn from(err: WorkflowError) -> Self {
        VulnmendError::Workflow(err.to_string())
    }
}

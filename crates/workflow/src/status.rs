//! 실행 상태 추적기 -- 저장소별 최신 실행 상태의 인메모리 기록
//!
//! [`StatusTracker`]는 프로세스 수명 동안만 유지되는 저장소별 최신
//! [`RunSummary`] 매핑입니다. 저장소당 마지막 기록이 이전 기록을
//! 덮어씁니다.
//!
//! [`StatusTracker::begin`]은 저장소당 동시 실행 하나를 보장합니다.
//! 반환된 [`RunToken`]이 drop되면 슬롯이 해제됩니다. 같은 저장소에
//! 진행 중인 실행이 있으면 트리거는 거부됩니다. 같은 작업 디렉토리에
//! 대한 동시 클론은 파일시스템 경쟁을 일으키기 때문입니다.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};

use tracing::debug;

use vulnmend_core::types::{RunStage, RunSummary};

use crate::error::WorkflowError;

/// 저장소별 실행 상태 추적기 (clone 가능, 내부 공유)
#[derive(Debug, Clone, Default)]
pub struct StatusTracker {
    /// 저장소별 최신 실행 요약
    summaries: Arc<RwLock<HashMap<String, RunSummary>>>,
    /// 진행 중인 실행의 저장소 이름
    active: Arc<Mutex<HashSet<String>>>,
}

/// 진행 중인 실행 하나를 나타내는 가드
///
/// drop되면 해당 저장소의 실행 슬롯이 해제됩니다.
#[derive(Debug)]
pub struct RunToken {
    repo: String,
    active: Arc<Mutex<HashSet<String>>>,
}

impl Drop for RunToken {
    fn drop(&mut self) {
        if let Ok(mut active) = self.active.lock() {
            active.remove(&self.repo);
        }
        debug!(repo = %self.repo, "run slot released");
    }
}

impl RunToken {
    /// 이 토큰이 보호하는 저장소 이름
    pub fn repo(&self) -> &str {
        &self.repo
    }
}

impl StatusTracker {
    /// 빈 추적기를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 저장소의 실행 시작을 시도합니다.
    ///
    /// 같은 저장소에 진행 중인 실행이 있으면
    /// [`WorkflowError::TriggerRejected`]를 반환합니다.
    pub fn begin(&self, repo: &str) -> Result<RunToken, WorkflowError> {
        let mut active = self
            .active
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if !active.insert(repo.to_owned()) {
            return Err(WorkflowError::TriggerRejected {
                repo: repo.to_owned(),
            });
        }

        Ok(RunToken {
            repo: repo.to_owned(),
            active: Arc::clone(&self.active),
        })
    }

    /// 저장소에 진행 중인 실행이 있는지 확인합니다.
    pub fn is_active(&self, repo: &str) -> bool {
        self.active
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .contains(repo)
    }

    /// 저장소의 최신 실행 상태를 기록합니다. 이전 기록을 덮어씁니다.
    pub fn record(&self, repo: &str, stage: RunStage, message: impl Into<String>) -> RunSummary {
        self.record_with_pr(repo, stage, message, None)
    }

    /// PR URL을 포함해 실행 상태를 기록합니다.
    pub fn record_with_pr(
        &self,
        repo: &str,
        stage: RunStage,
        message: impl Into<String>,
        pr_url: Option<String>,
    ) -> RunSummary {
        let mut summary = RunSummary::new(repo, stage, message);
        summary.pr_url = pr_url;
        self.summaries
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(repo.to_owned(), summary.clone());
        summary
    }

    /// 저장소의 최신 실행 요약을 반환합니다. 기록이 없으면 `None`.
    pub fn get(&self, repo: &str) -> Option<RunSummary> {
        self.summaries
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(repo)
            .cloned()
    }

    /// 추적 중인 저장소 수
    pub fn tracked_count(&self) -> usize {
        self.summaries
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }
}

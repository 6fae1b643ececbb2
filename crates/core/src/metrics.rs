//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `vulnmend_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency)

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 저장소 레이블 키
pub const LABEL_REPO: &str = "repo";

/// 심각도 레이블 키 (unknown, low, medium, high, critical)
pub const LABEL_SEVERITY: &str = "severity";

/// 생태계 레이블 키 (python, node, maven, ...)
pub const LABEL_ECOSYSTEM: &str = "ecosystem";

/// 종단 상태 레이블 키 (succeeded, failed, skipped)
pub const LABEL_OUTCOME: &str = "outcome";

// ─── Workflow 메트릭 ────────────────────────────────────────────────

/// Workflow: 시작된 실행 수 (counter, label: repo)
pub const WORKFLOW_RUNS_STARTED_TOTAL: &str = "vulnmend_workflow_runs_started_total";

/// Workflow: 종료된 실행 수 (counter, label: repo, outcome)
pub const WORKFLOW_RUNS_COMPLETED_TOTAL: &str = "vulnmend_workflow_runs_completed_total";

/// Workflow: 실행 전체 소요 시간 (histogram, 초)
pub const WORKFLOW_RUN_DURATION_SECONDS: &str = "vulnmend_workflow_run_duration_seconds";

// ─── Scan Report 메트릭 ─────────────────────────────────────────────

/// Scan: 정규화된 발견 항목 수 (counter, label: severity)
pub const SCAN_FINDINGS_TOTAL: &str = "vulnmend_scan_findings_total";

/// Scan: 스키마 불일치로 건너뛴 항목 수 (counter)
pub const SCAN_ENTRIES_SKIPPED_TOTAL: &str = "vulnmend_scan_entries_skipped_total";

// ─── Manifest Patch 메트릭 ──────────────────────────────────────────

/// Patch: 적용된 패치 수 (counter, label: ecosystem)
pub const PATCH_APPLIED_TOTAL: &str = "vulnmend_patch_applied_total";

/// Patch: 해소하지 못한 발견 항목 수 (counter)
pub const PATCH_UNRESOLVED_TOTAL: &str = "vulnmend_patch_unresolved_total";

// ─── Publish 메트릭 ─────────────────────────────────────────────────

/// Publish: 생성된 PR 수 (counter)
pub const PUBLISH_PRS_CREATED_TOTAL: &str = "vulnmend_publish_prs_created_total";

/// Publish: 자격 증명 부재 등으로 건너뛴 발행 수 (counter)
pub const PUBLISH_SKIPPED_TOTAL: &str = "vulnmend_publish_skipped_total";

/// 모든 메트릭의 설명을 등록합니다.
///
/// Prometheus recorder 설치 직후 한 번 호출합니다.
pub fn describe_all() {
    metrics::describe_counter!(
        WORKFLOW_RUNS_STARTED_TOTAL,
        "Number of remediation runs started"
    );
    metrics::describe_counter!(
        WORKFLOW_RUNS_COMPLETED_TOTAL,
        "Number of remediation runs reaching a terminal stage"
    );
    metrics::describe_histogram!(
        WORKFLOW_RUN_DURATION_SECONDS,
        "Wall-clock duration of a full remediation run in seconds"
    );
    metrics::describe_counter!(
        SCAN_FINDINGS_TOTAL,
        "Number of normalized vulnerability findings"
    );
    metrics::describe_counter!(
        SCAN_ENTRIES_SKIPPED_TOTAL,
        "Number of malformed scanner entries skipped during normalization"
    );
    metrics::describe_counter!(PATCH_APPLIED_TOTAL, "Number of manifest patches applied");
    metrics::describe_counter!(
        PATCH_UNRESOLVED_TOTAL,
        "Number of findings left unresolved by the patcher"
    );
    metrics::describe_counter!(PUBLISH_PRS_CREATED_TOTAL, "Number of pull requests opened");
    metrics::describe_counter!(
        PUBLISH_SKIPPED_TOTAL,
        "Number of publish stages skipped (missing credential or disabled)"
    );
}

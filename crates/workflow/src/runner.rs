//! 조치 워크플로 오케스트레이터 -- clone→build→scan→patch→test→publish
//!
//! [`WorkflowRunner`]는 저장소 하나의 조치 실행 전체를 순서대로
//! 진행합니다. 각 단계는 셋 중 하나로 끝납니다:
//!
//! - 진행: 다음 단계로
//! - 건너뛰기: 조치할 것이 없음, 실행은 SKIPPED로 종료 (성공의 일종)
//! - 중단: 치명적 에러, 실행은 FAILED로 종료
//!
//! 테스트 검증은 안전 게이트입니다: 검증에 실패한 실행은 절대
//! 게시 단계에 도달하지 않습니다. 실행 하나의 실패는 다른 저장소의
//! 실행에 영향을 주지 않습니다.
//!
//! ```text
//! CLONING -> BUILDING -> SCANNING -> PATCHING -> TESTING -> PUBLISHING
//!    |          |           |  \        |          |           |
//!    v          v           v   v       v          v           v
//!  FAILED     FAILED     FAILED SKIPPED FAILED   FAILED    SUCCEEDED
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use vulnmend_core::config::{RepoConfig, VulnmendConfig};
use vulnmend_core::metrics::{
    LABEL_OUTCOME, LABEL_REPO, PUBLISH_PRS_CREATED_TOTAL, PUBLISH_SKIPPED_TOTAL,
    WORKFLOW_RUN_DURATION_SECONDS, WORKFLOW_RUNS_COMPLETED_TOTAL, WORKFLOW_RUNS_STARTED_TOTAL,
};
use vulnmend_core::types::{RunStage, RunSummary, VulnerabilityFinding};
use vulnmend_manifest_patch::{RepoPatchReport, patch_repository};
use vulnmend_scan_report::{ScanReport, normalize};

use crate::error::WorkflowError;
use crate::exec::{ContainerEngine, GitClient, TestCommandRunner};
use crate::forge::{ForgeClient, PrOutcome, PullRequestSpec};
use crate::status::{RunToken, StatusTracker};

/// 스캔 이미지 태그 접미사
const IMAGE_TAG: &str = "security-scan";

/// 단계 평가 결과
enum StageOutcome<T> {
    /// 다음 단계로 진행
    Proceed(T),
    /// 나머지 단계를 건너뛰고 SKIPPED로 종료
    Skip(String),
}

/// 저장소별 조치 워크플로 실행기
///
/// 외부 도구는 모두 trait으로 주입되어 테스트에서 mock으로 대체됩니다.
pub struct WorkflowRunner<C, G, F, T>
where
    C: ContainerEngine,
    G: GitClient,
    F: ForgeClient,
    T: TestCommandRunner,
{
    config: Arc<VulnmendConfig>,
    tracker: StatusTracker,
    engine: C,
    git: G,
    forge: F,
    tests: T,
}

impl<C, G, F, T> WorkflowRunner<C, G, F, T>
where
    C: ContainerEngine,
    G: GitClient,
    F: ForgeClient,
    T: TestCommandRunner,
{
    /// 실행기를 생성합니다.
    pub fn new(
        config: Arc<VulnmendConfig>,
        tracker: StatusTracker,
        engine: C,
        git: G,
        forge: F,
        tests: T,
    ) -> Self {
        Self {
            config,
            tracker,
            engine,
            git,
            forge,
            tests,
        }
    }

    /// 상태 추적기 참조
    pub fn tracker(&self) -> &StatusTracker {
        &self.tracker
    }

    /// 실행 슬롯 확보를 시도합니다.
    ///
    /// 진행 중인 실행이 있으면 [`WorkflowError::TriggerRejected`].
    /// HTTP 핸들러가 409 응답을 위해 스폰 전에 호출합니다.
    pub fn try_begin(&self, repo_name: &str) -> Result<RunToken, WorkflowError> {
        let token = self.tracker.begin(repo_name)?;
        self.tracker
            .record(repo_name, RunStage::Queued, "run queued");
        Ok(token)
    }

    /// 저장소 하나의 실행 전체를 수행합니다.
    ///
    /// 단계 실패는 FAILED 요약으로 기록될 뿐 `Err`가 아닙니다.
    /// `Err`는 동시 실행 거부뿐입니다.
    pub async fn run(&self, repo: &RepoConfig) -> Result<RunSummary, WorkflowError> {
        let token = self.try_begin(&repo.name)?;
        Ok(self.run_with_token(token, repo).await)
    }

    /// 이미 확보한 슬롯으로 실행합니다.
    pub async fn run_with_token(&self, token: RunToken, repo: &RepoConfig) -> RunSummary {
        debug_assert_eq!(token.repo(), repo.name);
        let started = Instant::now();
        metrics::counter!(WORKFLOW_RUNS_STARTED_TOTAL, LABEL_REPO => repo.name.clone())
            .increment(1);
        info!(repo = %repo.name, url = %repo.url, "workflow run started");

        let summary = match self.run_stages(repo).await {
            Ok(StageOutcome::Proceed((message, pr_url))) => {
                self.tracker
                    .record_with_pr(&repo.name, RunStage::Succeeded, message, pr_url)
            }
            Ok(StageOutcome::Skip(reason)) => {
                info!(repo = %repo.name, reason = %reason, "workflow run skipped");
                self.tracker.record(&repo.name, RunStage::Skipped, reason)
            }
            Err(e) => {
                warn!(repo = %repo.name, error = %e, "workflow run failed");
                self.tracker
                    .record(&repo.name, RunStage::Failed, e.to_string())
            }
        };

        let outcome = summary.stage.to_string();
        metrics::counter!(WORKFLOW_RUNS_COMPLETED_TOTAL, LABEL_OUTCOME => outcome).increment(1);
        metrics::histogram!(WORKFLOW_RUN_DURATION_SECONDS, LABEL_REPO => repo.name.clone())
            .record(started.elapsed().as_secs_f64());
        info!(repo = %repo.name, stage = %summary.stage, "workflow run finished");
        drop(token);
        summary
    }

    /// 단계 순서 전체. 성공 시 최종 상태 메시지와 PR URL을 반환합니다.
    async fn run_stages(
        &self,
        repo: &RepoConfig,
    ) -> Result<StageOutcome<(String, Option<String>)>, WorkflowError> {
        let repo_dir = self.repo_dir(repo);
        let default_branch = self.default_branch(repo);

        // CLONING
        self.tracker
            .record(&repo.name, RunStage::Cloning, "cloning repository");
        self.git
            .clone_or_update(&repo.url, &repo_dir, default_branch)
            .await?;

        // BUILDING
        let image = format!("{}:{IMAGE_TAG}", repo.name);
        self.tracker.record(
            &repo.name,
            RunStage::Building,
            format!("building image {image}"),
        );
        self.engine.build_image(&repo_dir, &image).await?;

        // SCANNING
        self.tracker
            .record(&repo.name, RunStage::Scanning, "scanning image");
        let findings = match self.scan_stage(repo, &image).await? {
            StageOutcome::Proceed(findings) => findings,
            StageOutcome::Skip(reason) => return Ok(StageOutcome::Skip(reason)),
        };

        // PATCHING
        self.tracker.record(
            &repo.name,
            RunStage::Patching,
            format!("patching {} findings", findings.len()),
        );
        let branch = format!("security/fix-vulns-{}", findings.len());
        self.git.create_branch(&repo_dir, &branch).await?;
        let (patch_report, summary_md) = self.patch_stage(repo, &repo_dir, &findings).await?;

        // TESTING -- 게시를 차단하는 안전 게이트
        self.tracker.record(
            &repo.name,
            RunStage::Testing,
            format!("running `{}`", repo.test_command),
        );
        let passed = self.tests.run_tests(&repo_dir, &repo.test_command).await?;
        if !passed {
            return Err(WorkflowError::TestVerificationFailed {
                command: repo.test_command.clone(),
            });
        }

        // PUBLISHING
        self.tracker
            .record(&repo.name, RunStage::Publishing, "publishing fix branch");
        let outcome = self
            .publish_stage(repo, &repo_dir, &branch, default_branch, &patch_report, &summary_md)
            .await?;
        Ok(StageOutcome::Proceed(outcome))
    }

    /// 스캔 단계: 스캐너 실행, 리포트 저장, 정규화.
    async fn scan_stage(
        &self,
        repo: &RepoConfig,
        image: &str,
    ) -> Result<StageOutcome<Vec<VulnerabilityFinding>>, WorkflowError> {
        let raw = self.engine.scan_image(image).await?;

        if self.config.scan.save_reports {
            let report_path = self.work_dir().join(format!("{}_trivy_report.json", repo.name));
            if let Err(e) = tokio::fs::write(&report_path, &raw).await {
                // 리포트 저장은 진단용이므로 실행을 중단하지 않음
                warn!(path = %report_path.display(), error = %e, "failed to save scan report");
            } else {
                info!(path = %report_path.display(), "scan report saved");
            }
        }

        let report = ScanReport::parse(&raw)?;
        let findings = normalize(&report, self.config.min_severity());
        info!(
            repo = %repo.name,
            raw_entries = report.raw_entry_count(),
            findings = findings.len(),
            "scan report normalized"
        );

        if findings.is_empty() {
            return Ok(StageOutcome::Skip(
                "no vulnerabilities at or above severity threshold".to_owned(),
            ));
        }
        Ok(StageOutcome::Proceed(findings))
    }

    /// 패치 단계: 매니페스트 패치, 요약 마크다운 생성/저장.
    ///
    /// 미해결 발견 항목은 정보성일 뿐 실행을 중단하지 않습니다.
    /// 적용된 패치가 없어도 테스트 단계로 진행합니다.
    async fn patch_stage(
        &self,
        repo: &RepoConfig,
        repo_dir: &Path,
        findings: &[VulnerabilityFinding],
    ) -> Result<(RepoPatchReport, String), WorkflowError> {
        let dir = repo_dir.to_path_buf();
        let owned_findings = findings.to_vec();
        let patch_report = tokio::task::spawn_blocking(move || patch_repository(&dir, &owned_findings))
            .await
            .map_err(|e| WorkflowError::Io(std::io::Error::other(e)))??;

        let summary_md = render_summary(&repo.name, findings, &patch_report);
        let summary_path = self
            .work_dir()
            .join(format!("{}_security_summary.md", repo.name));
        if let Err(e) = tokio::fs::write(&summary_path, &summary_md).await {
            warn!(path = %summary_path.display(), error = %e, "failed to save security summary");
        } else {
            info!(path = %summary_path.display(), "security summary saved");
        }

        Ok((patch_report, summary_md))
    }

    /// 게시 단계: 커밋, 푸시, 풀 리퀘스트.
    ///
    /// 자격증명이 없으면 실행은 성공으로 끝나되 게시되지 않았음을
    /// 상태 메시지로 알립니다. 이미 검증된 수정을 조용히 버리지 않습니다.
    async fn publish_stage(
        &self,
        repo: &RepoConfig,
        repo_dir: &Path,
        branch: &str,
        default_branch: &str,
        patch_report: &RepoPatchReport,
        summary_md: &str,
    ) -> Result<(String, Option<String>), WorkflowError> {
        if !self.config.publish.enabled {
            metrics::counter!(PUBLISH_SKIPPED_TOTAL).increment(1);
            return Ok((
                "fix verified locally, publishing disabled by configuration".to_owned(),
                None,
            ));
        }

        // 적용된 패치가 없으면 게시할 것도 없음 (미해결 항목은 정보성)
        if patch_report.applied.is_empty() {
            metrics::counter!(PUBLISH_SKIPPED_TOTAL).increment(1);
            return Ok((
                "no dependency declarations could be patched, nothing to publish".to_owned(),
                None,
            ));
        }

        self.git
            .commit_all(repo_dir, "Security: bump vulnerable dependencies")
            .await?;
        self.git.push(repo_dir, branch).await?;

        let fixed: Vec<&str> = patch_report
            .applied
            .iter()
            .map(|p| p.package.as_str())
            .collect();
        let spec = PullRequestSpec {
            title: format!("Security fixes for {}", repo.name),
            body: format!(
                "This pull request bumps dependencies to fix vulnerabilities \
                 found by an image scan.\n\n**Fixed**: {}\n\n{summary_md}",
                fixed.join(", ")
            ),
            head_branch: branch.to_owned(),
            base_branch: default_branch.to_owned(),
        };

        match self.forge.open_pull_request(&repo.url, &spec).await? {
            PrOutcome::Created { url } => {
                metrics::counter!(PUBLISH_PRS_CREATED_TOTAL).increment(1);
                Ok((format!("pull request created: {url}"), Some(url)))
            }
            PrOutcome::AlreadyExists { url } => Ok(match url {
                Some(url) => (format!("pull request already exists: {url}"), Some(url)),
                None => ("pull request already exists".to_owned(), None),
            }),
            PrOutcome::SkippedNoCredential => {
                metrics::counter!(PUBLISH_SKIPPED_TOTAL).increment(1);
                Ok((
                    "fix verified locally but not published: no forge credential configured"
                        .to_owned(),
                    None,
                ))
            }
        }
    }

    fn work_dir(&self) -> PathBuf {
        PathBuf::from(&self.config.general.work_dir)
    }

    /// 저장소 체크아웃 디렉토리: `<work_dir>/<repo-name>`, 실행 간 재사용.
    fn repo_dir(&self, repo: &RepoConfig) -> PathBuf {
        self.work_dir().join(&repo.name)
    }

    fn default_branch<'a>(&'a self, repo: &'a RepoConfig) -> &'a str {
        repo.default_branch
            .as_deref()
            .unwrap_or(&self.config.publish.base_branch)
    }
}

/// 조치 요약 마크다운을 생성합니다.
///
/// 작업 디렉토리에 저장되고 풀 리퀘스트 본문에도 포함됩니다.
fn render_summary(
    repo_name: &str,
    findings: &[VulnerabilityFinding],
    patch_report: &RepoPatchReport,
) -> String {
    use std::fmt::Write;

    let mut md = String::new();
    let _ = writeln!(md, "# Security Scan Summary for {repo_name}");
    let _ = writeln!(md);
    let _ = writeln!(md, "**Total Vulnerabilities Found**: {}", findings.len());
    let _ = writeln!(md);

    let _ = writeln!(md, "## Fixed Vulnerabilities");
    if patch_report.applied.is_empty() {
        let _ = writeln!(md, "None.");
    } else {
        for patch in &patch_report.applied {
            let previous = patch.previous.as_deref().unwrap_or("unpinned");
            let _ = writeln!(
                md,
                "- **{}**: {previous} -> {} ({})",
                patch.package, patch.new_version, patch.manifest
            );
        }
    }

    let _ = writeln!(md);
    let _ = writeln!(md, "## Unfixed Vulnerabilities");
    if patch_report.unresolved.is_empty() {
        let _ = writeln!(md, "None.");
    } else {
        for package in &patch_report.unresolved {
            let id = findings
                .iter()
                .find(|f| &f.package == package)
                .map_or("-", |f| f.vulnerability_id.as_str());
            let _ = writeln!(
                md,
                "- **{package}** ({id}): no patchable declaration found \
                 (transitive dependency or no fixed release)."
            );
        }
    }

    md
}

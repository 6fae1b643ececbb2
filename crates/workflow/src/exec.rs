//! 외부 도구 추상화 -- 컨테이너 엔진, git, 테스트 명령
//!
//! 각 외부 도구는 trait 뒤에 숨겨 테스트에서 mock으로 대체할 수
//! 있습니다. 운영 구현은 [`tokio::process::Command`]로 CLI 바이너리를
//! 호출합니다: `docker build`, `trivy image`, `git`, `sh -c`.
//!
//! ```text
//! WorkflowRunner
//!   ├── ContainerEngine (trait) ── CommandContainerEngine ── docker / trivy
//!   ├── GitClient       (trait) ── CommandGitClient       ── git
//!   └── TestCommandRunner (trait) ─ ShellTestRunner       ── sh -c
//! ```

use std::future::Future;
use std::path::Path;
use std::process::Output;

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::WorkflowError;

/// 컨테이너 이미지 빌드/스캔 추상화
pub trait ContainerEngine: Send + Sync + 'static {
    /// 저장소 체크아웃에서 이미지를 빌드합니다.
    fn build_image(
        &self,
        context_dir: &Path,
        image: &str,
    ) -> impl Future<Output = Result<(), WorkflowError>> + Send;

    /// 이미지를 스캔하고 스캐너의 JSON 출력을 그대로 반환합니다.
    fn scan_image(&self, image: &str) -> impl Future<Output = Result<String, WorkflowError>> + Send;
}

/// git 저장소 조작 추상화
pub trait GitClient: Send + Sync + 'static {
    /// 저장소를 클론하거나, 이미 있으면 원격 기준으로 갱신합니다.
    fn clone_or_update(
        &self,
        url: &str,
        dest: &Path,
        default_branch: &str,
    ) -> impl Future<Output = Result<(), WorkflowError>> + Send;

    /// 브랜치를 생성하고 체크아웃합니다. 이미 있으면 강제로 재생성합니다.
    fn create_branch(
        &self,
        repo_dir: &Path,
        branch: &str,
    ) -> impl Future<Output = Result<(), WorkflowError>> + Send;

    /// 모든 변경을 스테이징하고 커밋합니다.
    fn commit_all(
        &self,
        repo_dir: &Path,
        message: &str,
    ) -> impl Future<Output = Result<(), WorkflowError>> + Send;

    /// 브랜치를 원격에 푸시합니다.
    fn push(
        &self,
        repo_dir: &Path,
        branch: &str,
    ) -> impl Future<Output = Result<(), WorkflowError>> + Send;
}

/// 저장소 테스트 명령 실행 추상화
pub trait TestCommandRunner: Send + Sync + 'static {
    /// 저장소 루트에서 테스트 명령을 실행합니다.
    ///
    /// `Ok(true)`는 통과, `Ok(false)`는 실패입니다. `Err`는 명령 자체를
    /// 실행하지 못한 경우입니다.
    fn run_tests(
        &self,
        repo_dir: &Path,
        command: &str,
    ) -> impl Future<Output = Result<bool, WorkflowError>> + Send;
}

/// `docker` / `trivy` CLI 기반 컨테이너 엔진
#[derive(Debug, Clone, Default)]
pub struct CommandContainerEngine;

impl ContainerEngine for CommandContainerEngine {
    async fn build_image(&self, context_dir: &Path, image: &str) -> Result<(), WorkflowError> {
        info!(image, context = %context_dir.display(), "building container image");

        let output = Command::new("docker")
            .args(["build", "-t", image, "."])
            .current_dir(context_dir)
            .output()
            .await
            .map_err(|e| WorkflowError::BuildFailed {
                image: image.to_owned(),
                reason: format!("failed to spawn docker: {e}"),
            })?;

        if !output.status.success() {
            return Err(WorkflowError::BuildFailed {
                image: image.to_owned(),
                reason: describe_failure(&output),
            });
        }

        info!(image, "image built");
        Ok(())
    }

    async fn scan_image(&self, image: &str) -> Result<String, WorkflowError> {
        info!(image, "scanning image");

        let output = Command::new("trivy")
            .args(["image", "--format", "json", "--quiet", image])
            .output()
            .await
            .map_err(|e| WorkflowError::ScanFailed {
                image: image.to_owned(),
                reason: format!("failed to spawn trivy: {e}"),
            })?;

        if !output.status.success() {
            return Err(WorkflowError::ScanFailed {
                image: image.to_owned(),
                reason: describe_failure(&output),
            });
        }

        String::from_utf8(output.stdout).map_err(|e| WorkflowError::ScanFailed {
            image: image.to_owned(),
            reason: format!("scanner output is not UTF-8: {e}"),
        })
    }
}

/// `git` CLI 클라이언트
///
/// 토큰이 있으면 클론 URL에 삽입합니다. 토큰은 로그와 에러 메시지에
/// 절대 나타나지 않습니다.
#[derive(Debug, Clone, Default)]
pub struct CommandGitClient {
    token: Option<String>,
}

impl CommandGitClient {
    /// 선택적 접근 토큰으로 클라이언트를 생성합니다.
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }

    /// 토큰을 URL에 삽입합니다. https가 아니면 그대로 반환합니다.
    fn authenticated_url(&self, url: &str) -> String {
        match &self.token {
            Some(token) if url.starts_with("https://") => {
                url.replacen("https://", &format!("https://{token}@"), 1)
            }
            _ => url.to_owned(),
        }
    }

    async fn run_git(
        &self,
        repo_dir: &Path,
        op: &'static str,
        args: &[&str],
    ) -> Result<Output, WorkflowError> {
        let output = Command::new("git")
            .args(args)
            .current_dir(repo_dir)
            .output()
            .await
            .map_err(|e| WorkflowError::Git {
                op,
                reason: format!("failed to spawn git: {e}"),
            })?;

        if !output.status.success() {
            return Err(WorkflowError::Git {
                op,
                reason: describe_failure(&output),
            });
        }
        Ok(output)
    }
}

impl GitClient for CommandGitClient {
    async fn clone_or_update(
        &self,
        url: &str,
        dest: &Path,
        default_branch: &str,
    ) -> Result<(), WorkflowError> {
        if dest.join(".git").is_dir() {
            debug!(dest = %dest.display(), "existing checkout found, updating");
            let remote_ref = format!("origin/{default_branch}");
            let update = async {
                self.run_git(dest, "fetch", &["fetch", "origin"]).await?;
                self.run_git(dest, "checkout", &["checkout", default_branch])
                    .await?;
                self.run_git(dest, "reset", &["reset", "--hard", &remote_ref])
                    .await?;
                Ok::<(), WorkflowError>(())
            };
            if let Err(e) = update.await {
                // 갱신 실패는 치명적이지 않음: 기존 체크아웃으로 진행
                warn!(dest = %dest.display(), error = %e, "failed to update checkout, using existing");
            }
            return Ok(());
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let auth_url = self.authenticated_url(url);
        let output = Command::new("git")
            .args(["clone", &auth_url])
            .arg(dest)
            .output()
            .await
            .map_err(|e| WorkflowError::Clone {
                url: url.to_owned(),
                reason: format!("failed to spawn git: {e}"),
            })?;

        if !output.status.success() {
            return Err(WorkflowError::Clone {
                url: url.to_owned(),
                reason: scrub(&describe_failure(&output), self.token.as_deref()),
            });
        }

        info!(url, dest = %dest.display(), "repository cloned");
        Ok(())
    }

    async fn create_branch(&self, repo_dir: &Path, branch: &str) -> Result<(), WorkflowError> {
        self.run_git(repo_dir, "branch", &["checkout", "-B", branch])
            .await?;
        Ok(())
    }

    async fn commit_all(&self, repo_dir: &Path, message: &str) -> Result<(), WorkflowError> {
        self.run_git(repo_dir, "add", &["add", "-A"]).await?;
        self.run_git(repo_dir, "commit", &["commit", "-m", message])
            .await?;
        Ok(())
    }

    async fn push(&self, repo_dir: &Path, branch: &str) -> Result<(), WorkflowError> {
        match self
            .run_git(repo_dir, "push", &["push", "-u", "origin", branch])
            .await
        {
            Ok(_) => Ok(()),
            Err(WorkflowError::Git { op, reason }) => Err(WorkflowError::Git {
                op,
                reason: scrub(&reason, self.token.as_deref()),
            }),
            Err(e) => Err(e),
        }
    }
}

/// `sh -c` 기반 테스트 실행기
///
/// 저장소 설정의 테스트 명령은 `&&` 같은 셸 연산자를 포함할 수 있으므로
/// 셸을 통해 실행합니다.
#[derive(Debug, Clone, Default)]
pub struct ShellTestRunner;

impl TestCommandRunner for ShellTestRunner {
    async fn run_tests(&self, repo_dir: &Path, command: &str) -> Result<bool, WorkflowError> {
        info!(command, repo_dir = %repo_dir.display(), "running test command");

        let output = Command::new("sh")
            .args(["-c", command])
            .current_dir(repo_dir)
            .output()
            .await
            .map_err(|e| WorkflowError::TestVerificationFailed {
                command: format!("{command} (failed to spawn: {e})"),
            })?;

        if output.status.success() {
            info!(command, "tests passed");
            Ok(true)
        } else {
            warn!(
                command,
                exit = output.status.code().unwrap_or(-1),
                stdout_tail = tail(&output.stdout),
                stderr_tail = tail(&output.stderr),
                "tests failed"
            );
            Ok(false)
        }
    }
}

/// 실패한 프로세스 출력에서 진단 문자열을 구성합니다.
fn describe_failure(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        format!("exit status {}", output.status.code().unwrap_or(-1))
    } else {
        format!(
            "exit status {}: {}",
            output.status.code().unwrap_or(-1),
            truncate(stderr, 500)
        )
    }
}

/// 에러 메시지에서 토큰을 제거합니다.
fn scrub(message: &str, token: Option<&str>) -> String {
    match token {
        Some(token) if !token.is_empty() => message.replace(token, "***"),
        _ => message.to_owned(),
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn tail(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim_end();
    match text.char_indices().rev().nth(400) {
        Some((idx, _)) => text[idx..].to_owned(),
        None => text.to_owned(),
    }
}

//! 소스 포지 클라이언트 -- 풀 리퀘스트 게시
//!
//! [`ForgeClient`]는 검증된 수정 브랜치를 풀 리퀘스트로 게시하는
//! 인터페이스입니다. 운영 구현 [`GithubForgeClient`]는 GitHub REST
//! API v3를 사용합니다.
//!
//! 자격증명이 없으면 게시는 실패가 아니라 건너뛰기입니다: 수정은
//! 로컬에서 검증되었으므로 실행을 실패로 만들지 않고, 게시되지
//! 않았음을 운영자에게 알립니다.

use std::future::Future;

use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::error::WorkflowError;

/// 풀 리퀘스트 요청 내용
#[derive(Debug, Clone)]
pub struct PullRequestSpec {
    /// PR 제목
    pub title: String,
    /// PR 본문 (마크다운)
    pub body: String,
    /// 수정 브랜치
    pub head_branch: String,
    /// 대상 브랜치
    pub base_branch: String,
}

/// 게시 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrOutcome {
    /// 새 PR 생성됨
    Created {
        /// PR 웹 URL
        url: String,
    },
    /// 같은 브랜치의 PR이 이미 열려 있음
    AlreadyExists {
        /// 기존 PR의 웹 URL (조회 실패 시 `None`)
        url: Option<String>,
    },
    /// 자격증명이 없어 게시를 건너뜀
    SkippedNoCredential,
}

/// 소스 포지 추상화
pub trait ForgeClient: Send + Sync + 'static {
    /// 풀 리퀘스트를 엽니다.
    fn open_pull_request(
        &self,
        repo_url: &str,
        spec: &PullRequestSpec,
    ) -> impl Future<Output = Result<PrOutcome, WorkflowError>> + Send;
}

/// GitHub REST API 클라이언트
#[derive(Debug, Clone)]
pub struct GithubForgeClient {
    http: reqwest::Client,
    token: Option<String>,
    api_base: String,
}

/// PR 응답에서 필요한 필드만
#[derive(Debug, Deserialize)]
struct PrResponse {
    html_url: Option<String>,
}

impl GithubForgeClient {
    /// 선택적 토큰과 API 베이스 URL로 클라이언트를 생성합니다.
    ///
    /// `api_base`는 보통 `https://api.github.com`이며 테스트와
    /// GitHub Enterprise를 위해 주입 가능합니다.
    pub fn new(token: Option<String>, api_base: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(concat!("vulnmend/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self {
            http,
            token,
            api_base: api_base.into().trim_end_matches('/').to_owned(),
        }
    }

    /// 저장소 URL에서 `owner/repo`를 추출합니다.
    fn owner_and_repo(repo_url: &str) -> Result<(String, String), WorkflowError> {
        let trimmed = repo_url.trim_end_matches('/').trim_end_matches(".git");
        let mut parts = trimmed.rsplit('/');
        let repo = parts.next().filter(|s| !s.is_empty());
        // scp 형식(git@host:owner/repo)은 콜론 뒤가 owner
        let owner = parts
            .next()
            .map(|s| s.rsplit(':').next().unwrap_or(s))
            .filter(|s| !s.is_empty());

        match (owner, repo) {
            (Some(owner), Some(repo)) => Ok((owner.to_owned(), repo.to_owned())),
            _ => Err(WorkflowError::Publish {
                reason: format!("cannot derive owner/repo from url {repo_url}"),
            }),
        }
    }

    /// 같은 head 브랜치로 열린 기존 PR을 조회합니다.
    async fn find_existing(
        &self,
        pulls_url: &str,
        owner: &str,
        branch: &str,
        token: &str,
    ) -> Option<String> {
        let query_url = format!("{pulls_url}?head={owner}:{branch}");
        let response = self
            .http
            .get(&query_url)
            .header("Authorization", format!("token {token}"))
            .header("Accept", "application/vnd.github.v3+json")
            .send()
            .await
            .ok()?;

        if !response.status().is_success() {
            return None;
        }
        let existing: Vec<PrResponse> = response.json().await.ok()?;
        existing.into_iter().next().and_then(|pr| pr.html_url)
    }
}

impl ForgeClient for GithubForgeClient {
    async fn open_pull_request(
        &self,
        repo_url: &str,
        spec: &PullRequestSpec,
    ) -> Result<PrOutcome, WorkflowError> {
        let Some(token) = self.token.as_deref().filter(|t| !t.is_empty()) else {
            warn!("no forge credential configured, skipping pull request");
            return Ok(PrOutcome::SkippedNoCredential);
        };

        let (owner, repo) = Self::owner_and_repo(repo_url)?;
        let pulls_url = format!("{}/repos/{owner}/{repo}/pulls", self.api_base);

        let response = self
            .http
            .post(&pulls_url)
            .header("Authorization", format!("token {token}"))
            .header("Accept", "application/vnd.github.v3+json")
            .json(&json!({
                "title": spec.title,
                "body": spec.body,
                "head": spec.head_branch,
                "base": spec.base_branch,
            }))
            .send()
            .await
            .map_err(|e| WorkflowError::Publish {
                reason: format!("pull request API call failed: {e}"),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::CREATED {
            let created: PrResponse =
                response.json().await.map_err(|e| WorkflowError::Publish {
                    reason: format!("malformed pull request response: {e}"),
                })?;
            let url = created.html_url.unwrap_or_default();
            info!(url = %url, "pull request created");
            return Ok(PrOutcome::Created { url });
        }

        let body = response.text().await.unwrap_or_default();
        if status == reqwest::StatusCode::UNPROCESSABLE_ENTITY
            && body.contains("A pull request already exists")
        {
            let url = self
                .find_existing(&pulls_url, &owner, &spec.head_branch, token)
                .await;
            info!(url = url.as_deref().unwrap_or("-"), "pull request already exists");
            return Ok(PrOutcome::AlreadyExists { url });
        }

        Err(WorkflowError::Publish {
            reason: format!("pull request rejected: {status}: {body}"),
        })
    }
}

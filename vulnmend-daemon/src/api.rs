//! HTTP surface -- 스캔 트리거와 상태 조회
//!
//! # Routes
//!
//! - `GET /health` -- liveness probe
//! - `GET /repos` -- 설정된 저장소 목록
//! - `POST /scan/{name}` -- 조치 실행 트리거 (202 수락, 404 미설정, 409 진행 중)
//! - `GET /scan-status/{name}` -- 최신 실행 요약
//!
//! 실행은 요청 핸들러에서 분리된 백그라운드 태스크로 진행됩니다.
//! 핸들러는 실행 슬롯 확보 여부만 동기적으로 판정합니다.

use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Json;
use serde::Serialize;
use tracing::info;

use vulnmend_core::config::VulnmendConfig;
use vulnmend_core::types::RunSummary;
use vulnmend_workflow::{
    CommandContainerEngine, CommandGitClient, ContainerEngine, ForgeClient, GithubForgeClient,
    GitClient, ShellTestRunner, StatusTracker, TestCommandRunner, WorkflowRunner,
};

/// 운영 구성의 실행기 타입
pub type DefaultRunner =
    WorkflowRunner<CommandContainerEngine, CommandGitClient, GithubForgeClient, ShellTestRunner>;

/// 핸들러 공유 상태
pub struct AppState<C, G, F, T>
where
    C: ContainerEngine,
    G: GitClient,
    F: ForgeClient,
    T: TestCommandRunner,
{
    /// 데몬 설정 (시작 시 한 번 로드, 이후 읽기 전용)
    pub config: Arc<VulnmendConfig>,
    /// 워크플로 실행기
    pub runner: Arc<WorkflowRunner<C, G, F, T>>,
}

impl<C, G, F, T> Clone for AppState<C, G, F, T>
where
    C: ContainerEngine,
    G: GitClient,
    F: ForgeClient,
    T: TestCommandRunner,
{
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            runner: Arc::clone(&self.runner),
        }
    }
}

impl AppState<CommandContainerEngine, CommandGitClient, GithubForgeClient, ShellTestRunner> {
    /// 운영 협력자들로 상태를 구성합니다.
    ///
    /// 포지 토큰은 설정의 `token_env`가 가리키는 환경변수에서 읽습니다.
    /// 없으면 게시는 건너뛰기로 동작합니다.
    pub fn production(config: Arc<VulnmendConfig>) -> Self {
        let token = std::env::var(&config.publish.token_env)
            .ok()
            .filter(|t| !t.is_empty());

        let runner = WorkflowRunner::new(
            Arc::clone(&config),
            StatusTracker::new(),
            CommandContainerEngine,
            CommandGitClient::new(token.clone()),
            GithubForgeClient::new(token, &config.publish.api_base),
            ShellTestRunner,
        );

        Self {
            config,
            runner: Arc::new(runner),
        }
    }
}

/// 라우터를 구성합니다.
pub fn router<C, G, F, T>(state: AppState<C, G, F, T>) -> Router
where
    C: ContainerEngine,
    G: GitClient,
    F: ForgeClient,
    T: TestCommandRunner,
{
    Router::new()
        .route("/health", get(health))
        .route("/repos", get(list_repos::<C, G, F, T>))
        .route("/scan/{name}", post(trigger_scan::<C, G, F, T>))
        .route("/scan-status/{name}", get(scan_status::<C, G, F, T>))
        .with_state(state)
}

/// API 에러 응답
#[derive(Debug)]
pub struct ApiError {
    /// HTTP 상태 코드
    pub status: StatusCode,
    /// 에러 메시지
    pub message: String,
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn conflict(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// `GET /health` 응답
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// 항상 "ok"
    pub status: &'static str,
    /// 데몬 버전
    pub version: &'static str,
}

/// `GET /repos` 응답의 항목 하나
#[derive(Debug, Serialize)]
pub struct RepoEntry {
    /// 저장소 이름
    pub name: String,
    /// 클론 URL
    pub url: String,
    /// 검증에 사용하는 테스트 명령
    pub test_command: String,
}

/// `POST /scan/{name}` 수락 응답
#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    /// 저장소 이름
    pub repo: String,
    /// 항상 "started"
    pub status: &'static str,
}

/// liveness probe
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// 설정된 저장소 목록
pub async fn list_repos<C, G, F, T>(State(state): State<AppState<C, G, F, T>>) -> Json<Vec<RepoEntry>>
where
    C: ContainerEngine,
    G: GitClient,
    F: ForgeClient,
    T: TestCommandRunner,
{
    let repos = state
        .config
        .repos
        .iter()
        .map(|r| RepoEntry {
            name: r.name.clone(),
            url: r.url.clone(),
            test_command: r.test_command.clone(),
        })
        .collect();
    Json(repos)
}

/// 조치 실행을 트리거합니다.
///
/// 슬롯 확보까지만 동기적으로 처리하고 실행은 백그라운드로 분리합니다.
pub async fn trigger_scan<C, G, F, T>(
    State(state): State<AppState<C, G, F, T>>,
    Path(name): Path<String>,
) -> Result<(StatusCode, Json<TriggerResponse>), ApiError>
where
    C: ContainerEngine,
    G: GitClient,
    F: ForgeClient,
    T: TestCommandRunner,
{
    let Some(repo) = state.config.find_repo(&name) else {
        return Err(ApiError::not_found(format!("unknown repository: {name}")));
    };

    let token = state
        .runner
        .try_begin(&name)
        .map_err(|_| ApiError::conflict(format!("run already in progress for {name}")))?;

    info!(repo = %name, "scan triggered");
    let repo = repo.clone();
    let runner = Arc::clone(&state.runner);
    tokio::spawn(async move {
        runner.run_with_token(token, &repo).await;
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(TriggerResponse {
            repo: name,
            status: "started",
        }),
    ))
}

/// 최신 실행 요약을 반환합니다.
pub async fn scan_status<C, G, F, T>(
    State(state): State<AppState<C, G, F, T>>,
    Path(name): Path<String>,
) -> Result<Json<RunSummary>, ApiError>
where
    C: ContainerEngine,
    G: GitClient,
    F: ForgeClient,
    T: TestCommandRunner,
{
    if let Some(summary) = state.runner.tracker().get(&name) {
        return Ok(Json(summary));
    }

    if state.config.find_repo(&name).is_none() {
        Err(ApiError::not_found(format!("unknown repository: {name}")))
    } else {
        Err(ApiError::not_found(format!("no runs recorded for {name}")))
    }
}

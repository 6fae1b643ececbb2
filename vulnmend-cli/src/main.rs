//! vulnmend 명령줄 도구 -- 일괄 조치 실행과 설정 점검
//!
//! 데몬 없이 설정된 저장소들을 순차적으로 조치합니다.
//! 게시 토큰은 설정의 `token_env`가 가리키는 환경변수에서 읽습니다.

mod cli;

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use serde::Serialize;

use vulnmend_core::config::{RepoConfig, VulnmendConfig};
use vulnmend_core::types::RunStage;
use vulnmend_workflow::{
    CommandContainerEngine, CommandGitClient, GithubForgeClient, ShellTestRunner, StatusTracker,
    WorkflowRunner,
};

use cli::{Cli, Commands, ConfigAction, RunArgs};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = cli.log_level.as_deref().unwrap_or("info");
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .init();

    match cli.command {
        Commands::Run(args) => run_command(&cli.config, args).await,
        Commands::Repos => repos_command(&cli.config).await,
        Commands::Config(args) => match args.action {
            ConfigAction::Validate => config_validate(&cli.config).await,
            ConfigAction::Show { section } => config_show(&cli.config, section).await,
        },
    }
}

/// 설정된 저장소를 순차 실행합니다. 하나라도 FAILED면 종료 코드 1.
async fn run_command(config_path: &std::path::Path, args: RunArgs) -> Result<()> {
    let config = load_config(config_path).await?;
    tracing::info!(config = %config_path.display(), "vulnmend batch run starting");

    tokio::fs::create_dir_all(&config.general.work_dir)
        .await
        .with_context(|| format!("failed to create work dir {}", config.general.work_dir))?;

    let targets: Vec<RepoConfig> = match &args.repo {
        Some(name) => {
            let Some(repo) = config.find_repo(name) else {
                bail!("unknown repository: {name}");
            };
            vec![repo.clone()]
        }
        None => config.repos.clone(),
    };
    if targets.is_empty() {
        bail!("no repositories configured");
    }

    let token = std::env::var(&config.publish.token_env)
        .ok()
        .filter(|t| !t.is_empty());
    let config = Arc::new(config);
    let runner = WorkflowRunner::new(
        Arc::clone(&config),
        StatusTracker::new(),
        CommandContainerEngine,
        CommandGitClient::new(token.clone()),
        GithubForgeClient::new(token, &config.publish.api_base),
        ShellTestRunner,
    );

    let mut failed = 0usize;
    for repo in &targets {
        // CLI는 단일 스레드 순차 실행이므로 슬롯 거부가 나올 수 없음
        let summary = runner.run(repo).await?;
        if summary.stage == RunStage::Failed {
            failed += 1;
        }
        println!(
            "{:<24} {:<10} {}",
            summary.repo, summary.stage, summary.message
        );
    }

    if failed > 0 {
        bail!("{failed} of {} runs failed", targets.len());
    }
    Ok(())
}

/// 설정된 저장소 목록을 출력합니다.
async fn repos_command(config_path: &std::path::Path) -> Result<()> {
    let config = load_config(config_path).await?;

    println!("{:<24} {:<50} {}", "Name", "URL", "Test Command");
    println!("{}", "-".repeat(92));
    for repo in &config.repos {
        println!(
            "{:<24} {:<50} {}",
            repo.name, repo.url, repo.test_command
        );
    }
    Ok(())
}

async fn config_validate(config_path: &std::path::Path) -> Result<()> {
    match load_config(config_path).await {
        Ok(config) => {
            println!(
                "configuration OK: {} ({} repositories)",
                config_path.display(),
                config.repos.len()
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("configuration INVALID: {}", config_path.display());
            Err(e)
        }
    }
}

/// 유효 설정(파일 + 환경변수 + 기본값)을 TOML로 출력합니다.
async fn config_show(config_path: &std::path::Path, section: Option<String>) -> Result<()> {
    let config = load_config(config_path).await?;

    let rendered = match section.as_deref() {
        None => toml::to_string_pretty(&config)?,
        Some("general") => toml::to_string_pretty(&config.general)?,
        Some("scan") => toml::to_string_pretty(&config.scan)?,
        Some("publish") => toml::to_string_pretty(&config.publish)?,
        Some("metrics") => toml::to_string_pretty(&config.metrics)?,
        Some("repos") => toml::to_string_pretty(&ReposSection {
            repos: &config.repos,
        })?,
        Some(other) => {
            bail!("unknown section: {other} (expected: general, scan, publish, metrics, repos)");
        }
    };
    print!("{rendered}");
    Ok(())
}

async fn load_config(path: &std::path::Path) -> Result<VulnmendConfig> {
    VulnmendConfig::load(path)
        .await
        .with_context(|| format!("failed to load configuration from {}", path.display()))
}

/// `--section repos` 출력용 래퍼. TOML 최상위는 테이블이어야 합니다.
#[derive(Serialize)]
struct ReposSection<'a> {
    repos: &'a [RepoConfig],
}

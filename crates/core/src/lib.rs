//! Vulnmend 공통 크레이트 — 도메인 타입, 에러, 설정, 메트릭 상수
//!
//! 모든 vulnmend 모듈이 공유하는 기반을 정의합니다.
//! 각 모듈 크레이트는 이 타입들을 사용하여 파이프라인 데이터를 교환합니다.

pub mod config;
pub mod error;
pub mod metrics;
pub mod types;
pub mod version;

// --- 주요 타입 re-export ---
// 각 모듈의 핵심 타입을 크레이트 루트에서 바로 사용할 수 있도록 합니다.

// 에러
pub use error::{ConfigError, VulnmendError};

// 설정
pub use config::{GeneralConfig, PublishConfig, RepoConfig, ScanConfig, VulnmendConfig};

// 도메인 타입
pub use types::{Ecosystem, RunStage, RunSummary, Severity, VulnerabilityFinding};

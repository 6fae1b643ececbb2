//! 의존성 매니페스트 패치 — 취약 패키지 선언의 버전 상향
//!
//! # Module Structure
//!
//! - [`error`]: Domain error types (`ManifestPatchError`)
//! - [`patcher`]: `ManifestPatcher` trait and per-format implementations
//! - [`apply`]: Repository-level application and aggregation
//!
//! # Architecture
//!
//! ```text
//! Vec<VulnerabilityFinding> --> patch_repository(root)
//!                                  |
//!                      requirements.txt / package.json /
//!                      pyproject.toml / Pipfile / pom.xml
//!                                  |
//!                    RepoPatchReport { applied, unresolved, warnings }
//! ```
//!
//! 패치는 순수 텍스트 변환입니다: 버전 토큰만 바꾸고 나머지는 바이트
//! 단위로 보존합니다. 같은 입력에 두 번 적용해도 결과가 같습니다.

pub mod apply;
pub mod error;
pub mod patcher;

// --- Public API Re-exports ---

pub use apply::{RepoPatchReport, patch_repository};
pub use error::ManifestPatchError;
pub use patcher::{AppliedPatch, ManifestPatcher, PatchOutcome, default_patchers};

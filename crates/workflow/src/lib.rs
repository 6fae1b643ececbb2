//! 저장소별 조치 워크플로 -- clone, build, scan, patch, test, publish
//!
//! # Module Structure
//!
//! - [`error`]: Domain error types (`WorkflowError`)
//! - [`status`]: Per-repository run status tracking (`StatusTracker`, `RunToken`)
//! - [`exec`]: External tool abstractions (container engine, git, test command)
//! - [`forge`]: Pull request publishing (`ForgeClient`, `GithubForgeClient`)
//! - [`runner`]: The stage orchestrator (`WorkflowRunner`)
//!
//! # Architecture
//!
//! ```text
//! trigger ──> StatusTracker.begin() ──> WorkflowRunner
//!                  (409 if active)          |
//!                       clone ─ build ─ scan ─ patch ─ test ─ publish
//!                         |       |      |       |      |       |
//!                       GitClient |  ScanReport  |  TestRunner ForgeClient
//!                        ContainerEngine   patch_repository
//! ```

pub mod error;
pub mod exec;
pub mod forge;
pub mod runner;
pub mod status;

// --- Public API Re-exports ---

pub use error::WorkflowError;
pub use exec::{
    CommandContainerEngine, CommandGitClient, ContainerEngine, GitClient, ShellTestRunner,
    TestCommandRunner,
};
pub use forge::{ForgeClient, GithubForgeClient, PrOutcome, PullRequestSpec};
pub use runner::WorkflowRunner;
pub use status::{RunToken, StatusTracker};

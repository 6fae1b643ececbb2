//! vulnmend-daemon 라이브러리 -- HTTP 표면, 로깅, 메트릭 서버
//!
//! 바이너리 진입점([`main`](../src/main.rs))과 통합 테스트가 공유하는
//! 구성 요소를 노출합니다.

pub mod api;
pub mod cli;
pub mod logging;
pub mod metrics_server;

//! vulnmend.toml 통합 설정 테스트
//!
//! - vulnmend.toml.example 파싱 테스트
//! - 부분 설정 (일부 섹션만) 로딩 테스트
//! - 환경변수 우선순위 테스트

use vulnmend_core::config::VulnmendConfig;
use vulnmend_core::types::Severity;

// =============================================================================
// vulnmend.toml.example 파싱 테스트
// =============================================================================

#[test]
fn example_config_parses_successfully() {
    let content = include_str!("../../../vulnmend.toml.example");
    let config = VulnmendConfig::parse(content).expect("example config should parse");

    assert_eq!(config.general.log_level, "info");
    assert_eq!(config.general.log_format, "json");
    assert_eq!(config.general.work_dir, "/var/lib/vulnmend/work");
    assert_eq!(config.general.listen_addr, "127.0.0.1");
    assert_eq!(config.general.port, 8420);
}

#[test]
fn example_config_passes_validation() {
    let content = include_str!("../../../vulnmend.toml.example");
    let config = VulnmendConfig::parse(content).expect("should parse");
    config
        .validate()
        .expect("example config should pass validation");
}

#[test]
fn example_config_has_correct_scan_and_publish_defaults() {
    let content = include_str!("../../../vulnmend.toml.example");
    let config = VulnmendConfig::parse(content).expect("should parse");

    assert_eq!(config.scan.min_severity, "medium");
    assert!(config.scan.save_reports);

    assert!(config.publish.enabled);
    assert_eq!(config.publish.api_base, "https://api.github.com");
    assert_eq!(config.publish.token_env, "GITHUB_TOKEN");
    assert_eq!(config.publish.base_branch, "main");

    assert!(!config.metrics.enabled);
    assert_eq!(config.metrics.port, 9421);
}

#[test]
fn example_config_repo_entry() {
    let content = include_str!("../../../vulnmend.toml.example");
    let config = VulnmendConfig::parse(content).expect("should parse");

    assert_eq!(config.repos.len(), 1);
    assert_eq!(config.repos[0].name, "demo-app");
    assert_eq!(config.repos[0].test_command, "pytest");
    assert!(config.repos[0].default_branch.is_none());
}

#[test]
fn example_config_matches_code_defaults() {
    let content = include_str!("../../../vulnmend.toml.example");
    let from_file = VulnmendConfig::parse(content).expect("should parse");
    let from_code = VulnmendConfig::default();

    // 예시 파일의 값이 코드 Default 구현과 일치하는지 확인
    assert_eq!(from_file.general.log_level, from_code.general.log_level);
    assert_eq!(from_file.general.log_format, from_code.general.log_format);
    assert_eq!(from_file.general.work_dir, from_code.general.work_dir);
    assert_eq!(from_file.general.listen_addr, from_code.general.listen_addr);
    assert_eq!(from_file.general.port, from_code.general.port);

    assert_eq!(from_file.scan.min_severity, from_code.scan.min_severity);
    assert_eq!(from_file.scan.save_reports, from_code.scan.save_reports);

    assert_eq!(from_file.publish.enabled, from_code.publish.enabled);
    assert_eq!(from_file.publish.api_base, from_code.publish.api_base);
    assert_eq!(from_file.publish.token_env, from_code.publish.token_env);
    assert_eq!(from_file.publish.base_branch, from_code.publish.base_branch);

    assert_eq!(from_file.metrics.enabled, from_code.metrics.enabled);
    assert_eq!(from_file.metrics.listen_addr, from_code.metrics.listen_addr);
    assert_eq!(from_file.metrics.port, from_code.metrics.port);
}

// =============================================================================
// 부분 설정 로딩 테스트
// =============================================================================

#[test]
fn partial_config_general_only() {
    let toml = r#"
[general]
log_level = "debug"
log_format = "pretty"
"#;
    let config = VulnmendConfig::parse(toml).expect("should parse");
    config.validate().expect("should validate");

    assert_eq!(config.general.log_level, "debug");
    assert_eq!(config.general.log_format, "pretty");
    // 나머지 섹션은 기본값
    assert_eq!(config.scan.min_severity, "medium");
    assert!(config.publish.enabled);
    assert!(!config.metrics.enabled);
    assert!(config.repos.is_empty());
}

#[test]
fn partial_config_scan_only() {
    let toml = r#"
[scan]
min_severity = "high"
save_reports = false
"#;
    let config = VulnmendConfig::parse(toml).expect("should parse");
    config.validate().expect("should validate");

    assert_eq!(config.min_severity(), Severity::High);
    assert!(!config.scan.save_reports);
    // general은 기본값
    assert_eq!(config.general.log_level, "info");
}

#[test]
fn partial_config_publish_only() {
    let toml = r#"
[publish]
enabled = false
token_env = "FORGE_TOKEN"
"#;
    let config = VulnmendConfig::parse(toml).expect("should parse");
    config.validate().expect("should validate");

    assert!(!config.publish.enabled);
    assert_eq!(config.publish.token_env, "FORGE_TOKEN");
    assert_eq!(config.publish.base_branch, "main");
}

#[test]
fn partial_config_two_sections() {
    let toml = r#"
[general]
log_level = "warn"

[metrics]
enabled = true
port = 9900
"#;
    let config = VulnmendConfig::parse(toml).expect("should parse");
    config.validate().expect("should validate");

    assert_eq!(config.general.log_level, "warn");
    assert!(config.metrics.enabled);
    assert_eq!(config.metrics.port, 9900);
    // 생략된 섹션은 기본값
    assert!(config.scan.save_reports);
}

// =============================================================================
// 환경변수 우선순위 테스트
// =============================================================================

#[test]
#[serial_test::serial]
fn env_override_takes_precedence_over_toml() {
    let toml = r#"
[general]
log_level = "info"
"#;

    let original = std::env::var("VULNMEND_GENERAL_LOG_LEVEL").ok();
    // SAFETY: 테스트는 serial로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var("VULNMEND_GENERAL_LOG_LEVEL", "error");
    }

    let mut config = VulnmendConfig::parse(toml).expect("should parse");
    config.apply_env_overrides();
    let result = config.general.log_level.clone();

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("VULNMEND_GENERAL_LOG_LEVEL", val),
            None => std::env::remove_var("VULNMEND_GENERAL_LOG_LEVEL"),
        }
    }

    assert_eq!(result, "error");
}

#[test]
#[serial_test::serial]
fn env_override_takes_precedence_over_defaults() {
    let original = std::env::var("VULNMEND_SCAN_MIN_SEVERITY").ok();
    // SAFETY: 테스트는 serial로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var("VULNMEND_SCAN_MIN_SEVERITY", "critical");
    }

    let mut config = VulnmendConfig::parse("").expect("should parse");
    config.apply_env_overrides();
    let result = config.min_severity();

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("VULNMEND_SCAN_MIN_SEVERITY", val),
            None => std::env::remove_var("VULNMEND_SCAN_MIN_SEVERITY"),
        }
    }

    assert_eq!(result, Severity::Critical);
}

#[test]
#[serial_test::serial]
fn env_override_bool_field() {
    let original = std::env::var("VULNMEND_PUBLISH_ENABLED").ok();
    // SAFETY: 테스트는 serial로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var("VULNMEND_PUBLISH_ENABLED", "false");
    }

    let mut config = VulnmendConfig::parse("").expect("should parse");
    config.apply_env_overrides();
    let result = config.publish.enabled;

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("VULNMEND_PUBLISH_ENABLED", val),
            None => std::env::remove_var("VULNMEND_PUBLISH_ENABLED"),
        }
    }

    assert!(!result);
}

#[test]
#[serial_test::serial]
fn env_override_numeric_field() {
    let original = std::env::var("VULNMEND_GENERAL_PORT").ok();
    // SAFETY: 테스트는 serial로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var("VULNMEND_GENERAL_PORT", "9000");
    }

    let mut config = VulnmendConfig::parse("").expect("should parse");
    config.apply_env_overrides();
    let result = config.general.port;

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("VULNMEND_GENERAL_PORT", val),
            None => std::env::remove_var("VULNMEND_GENERAL_PORT"),
        }
    }

    assert_eq!(result, 9000);
}

#[test]
#[serial_test::serial]
fn env_override_invalid_value_is_ignored() {
    let original = std::env::var("VULNMEND_GENERAL_PORT").ok();
    // SAFETY: 테스트는 serial로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var("VULNMEND_GENERAL_PORT", "not-a-port");
    }

    let mut config = VulnmendConfig::parse("").expect("should parse");
    config.apply_env_overrides();
    let result = config.general.port;

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("VULNMEND_GENERAL_PORT", val),
            None => std::env::remove_var("VULNMEND_GENERAL_PORT"),
        }
    }

    // 잘못된 값은 무시되고 기본값 유지
    assert_eq!(result, 8420);
}

// =============================================================================
// 빈 파일 / 잘못된 형식 테스트
// =============================================================================

#[test]
fn empty_config_uses_all_defaults() {
    let config = VulnmendConfig::parse("").expect("empty config should parse");
    config.validate().expect("defaults should validate");
    assert!(config.repos.is_empty());
}

#[test]
fn malformed_toml_is_parse_error() {
    let result = VulnmendConfig::parse("[general\nlog_level = ");
    assert!(result.is_err(), "malformed TOML should fail to parse");
}

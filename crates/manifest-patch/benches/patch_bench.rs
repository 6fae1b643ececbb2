//! 매니페스트 패치 벤치마크
//!
//! requirements.txt와 package.json 텍스트 패치 성능을 측정합니다.

use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use vulnmend_core::types::{Ecosystem, Severity, VulnerabilityFinding};
use vulnmend_manifest_patch::patcher::{PackageJsonPatcher, RequirementsPatcher};
use vulnmend_manifest_patch::ManifestPatcher;

/// count개 선언을 가진 requirements.txt 생성
fn generate_requirements(count: usize) -> String {
    let mut manifest = String::from("# generated dependency set\n");
    for i in 0..count {
        manifest.push_str(&format!("package-{i}==1.{}.0\n", i % 50));
    }
    manifest
}

/// count개 의존성을 가진 package.json 생성
fn generate_package_json(count: usize) -> String {
    let mut manifest = String::from("{\n  \"name\": \"bench-app\",\n  \"dependencies\": {\n");
    for i in 0..count {
        let comma = if i + 1 < count { "," } else { "" };
        manifest.push_str(&format!("    \"package-{i}\": \"^1.{}.0\"{comma}\n", i % 50));
    }
    manifest.push_str("  }\n}\n");
    manifest
}

fn findings(count: usize, ecosystem: Ecosystem) -> Vec<VulnerabilityFinding> {
    (0..count)
        .map(|i| VulnerabilityFinding {
            vulnerability_id: format!("CVE-2024-{i:04}"),
            package: format!("package-{i}"),
            ecosystem,
            installed_version: format!("1.{}.0", i % 50),
            fixed_version: Some("2.0.0".to_owned()),
            severity: Severity::High,
        })
        .collect()
}

fn bench_requirements_patch(c: &mut Criterion) {
    let patcher = RequirementsPatcher;
    let mut group = c.benchmark_group("requirements_patch");

    let small = generate_requirements(10);
    let small_findings = findings(5, Ecosystem::Python);
    group.throughput(Throughput::Elements(10));
    group.bench_function("small_10_lines", |b| {
        b.iter(|| patcher.patch(black_box(&small), black_box(&small_findings)))
    });

    let large = generate_requirements(500);
    let large_findings = findings(50, Ecosystem::Python);
    group.throughput(Throughput::Elements(500));
    group.bench_function("large_500_lines", |b| {
        b.iter(|| patcher.patch(black_box(&large), black_box(&large_findings)))
    });

    group.finish();
}

fn bench_package_json_patch(c: &mut Criterion) {
    let patcher = PackageJsonPatcher;
    let mut group = c.benchmark_group("package_json_patch");

    let manifest = generate_package_json(200);
    let node_findings = findings(20, Ecosystem::Node);
    group.throughput(Throughput::Elements(200));
    group.bench_function("deps_200_entries", |b| {
        b.iter(|| patcher.patch(black_box(&manifest), black_box(&node_findings)))
    });

    group.finish();
}

criterion_group!(benches, bench_requirements_patch, bench_package_json_patch);
criterion_main!(benches);

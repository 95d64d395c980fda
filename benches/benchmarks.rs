//! Performance benchmarks for vpn-paths-agent
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tempfile::TempDir;
use vpn_paths_agent::config::Config;
use vpn_paths_agent::control::ApiRequest;
use vpn_paths_agent::store::{FileBackend, PathStore, VpnPath};

fn bench_config_parsing(c: &mut Criterion) {
    let toml_data = r#"
[store]
backend = "file"
path = "/var/lib/vpn-paths-agent/vpn_paths.json"

[toggle]
mode = "wg_quick"
use_sudo = true
timeout_secs = 60

[control]
socket_path = "/var/run/vpn-paths-agent.sock"
"#;

    c.bench_function("config_parsing_toml", |b| {
        b.iter(|| {
            let _config = Config::parse(black_box(toml_data)).unwrap();
        });
    });
}

fn bench_request_parsing(c: &mut Criterion) {
    let json = r#"{"id":"req-1","action":"addVpnPath","path":"/etc/wireguard/wg0.conf"}"#;

    c.bench_function("request_parsing_json", |b| {
        b.iter(|| {
            let _req = ApiRequest::from_json(black_box(json)).unwrap();
        });
    });
}

fn bench_path_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("path_validation");

    group.bench_function("valid", |b| {
        b.iter(|| VpnPath::new(black_box("/etc/wireguard/wg0.conf")));
    });

    group.bench_function("blank", |b| {
        b.iter(|| VpnPath::new(black_box("      ")));
    });

    group.finish();
}

fn bench_store_list(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("store_list");

    for size in [1usize, 10, 100].iter() {
        let memory = PathStore::in_memory();
        let tmp_dir = TempDir::new().unwrap();
        let file = PathStore::new(Box::new(
            FileBackend::open(tmp_dir.path().join("vpn_paths.json")).unwrap(),
        ));

        rt.block_on(async {
            for i in 0..*size {
                let path = VpnPath::new(format!("/etc/wireguard/wg{}.conf", i)).unwrap();
                memory.add(path.clone()).await.unwrap();
                file.add(path).await.unwrap();
            }
        });

        group.bench_with_input(BenchmarkId::new("memory", size), size, |b, _| {
            b.to_async(&rt).iter(|| async { memory.list().await.unwrap() });
        });

        group.bench_with_input(BenchmarkId::new("file", size), size, |b, _| {
            b.to_async(&rt).iter(|| async { file.list().await.unwrap() });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_config_parsing,
    bench_request_parsing,
    bench_path_validation,
    bench_store_list,
);
criterion_main!(benches);

use campus_portal::config::load_config_from_path;
use campus_portal::Config;
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

fn bench_config_creation(c: &mut Criterion) {
    c.bench_function("config_default", |b| b.iter(Config::default));
}

fn bench_config_serialization(c: &mut Criterion) {
    let config = Config::default();

    c.bench_function("config_to_toml", |b| {
        b.iter(|| toml::to_string(&black_box(&config)))
    });

    let toml_str = toml::to_string(&config).unwrap();
    c.bench_function("config_from_toml", |b| {
        b.iter(|| toml::from_str::<Config>(black_box(&toml_str)))
    });
}

fn bench_config_load(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("portal.toml");
    std::fs::write(
        &path,
        "[api]\nbase_url = \"${PORTAL_BENCH_URL:-http://localhost:5000/api}\"\n\n[server]\njwt_secret = \"${PORTAL_BENCH_SECRET:-bench}\"\n",
    )
    .unwrap();

    c.bench_function("config_load_with_interpolation", |b| {
        b.iter(|| load_config_from_path(black_box(&path)))
    });
}

criterion_group!(
    benches,
    bench_config_creation,
    bench_config_serialization,
    bench_config_load,
);
criterion_main!(benches);

//! 스캐너 벤치마크
//!
//! 파일 탐색, glob 필터, 잠금 파일 해석 성능을 측정합니다.

use std::path::Path;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use fsa_scanner::{CargoLockResolver, DependencyResolver, FileFilter, NpmLockResolver, SourceWalker};

/// count개의 디렉토리에 소스 파일과 잠금 파일을 만듭니다.
fn populate_tree(root: &Path, count: usize) {
    for i in 0..count {
        let dir = root.join(format!("module-{i:04}")).join("src");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("Main.java"), "class Main {}").unwrap();
        std::fs::write(dir.join("notes.txt"), "notes").unwrap();
        if i % 10 == 0 {
            std::fs::write(root.join(format!("module-{i:04}")).join("package-lock.json"), "{}")
                .unwrap();
        }
    }
}

/// count개 패키지를 가진 Cargo.lock 생성
fn generate_cargo_lock(count: usize) -> String {
    let mut lockfile = String::from("version = 3\n");
    for i in 0..count {
        lockfile.push_str(&format!(
            "\n[[package]]\nname = \"crate-{i}\"\nversion = \"1.0.{i}\"\nsource = \"registry+https://github.com/rust-lang/crates.io-index\"\n"
        ));
    }
    lockfile
}

/// count개 패키지를 가진 package-lock.json 생성
fn generate_package_lock(count: usize) -> String {
    let entries: Vec<String> = (0..count)
        .map(|i| format!("\"node_modules/pkg-{i}\": {{ \"version\": \"2.0.{i}\" }}"))
        .collect();
    format!(
        "{{ \"lockfileVersion\": 3, \"packages\": {{ \"\": {{ \"name\": \"app\" }}, {} }} }}",
        entries.join(", ")
    )
}

fn bench_walk(c: &mut Criterion) {
    let mut group = c.benchmark_group("walk");

    for size in [100usize, 1000] {
        let dir = tempfile::tempdir().unwrap();
        populate_tree(dir.path(), size);
        group.throughput(Throughput::Elements((size * 2) as u64));

        group.bench_with_input(BenchmarkId::new("match_all", size), &size, |b, _| {
            b.iter(|| {
                let walker = SourceWalker::new(dir.path(), FileFilter::match_all());
                black_box(walker.files().count())
            });
        });

        let filter = FileFilter::new(
            &["**/*.java".to_owned()],
            &["**/module-00*/**".to_owned()],
            false,
        )
        .unwrap();
        group.bench_with_input(BenchmarkId::new("filtered", size), &size, |b, _| {
            b.iter(|| {
                let walker = SourceWalker::new(dir.path(), filter.clone());
                black_box(walker.files().count())
            });
        });
    }

    group.finish();
}

fn bench_filter(c: &mut Criterion) {
    let filter = FileFilter::new(
        &[
            "**/*.jar".to_owned(),
            "**/package-lock.json".to_owned(),
            "Cargo.lock".to_owned(),
        ],
        &["**/test/**".to_owned()],
        true,
    )
    .unwrap();
    let paths = [
        Path::new("lib/guava-31.1.jar"),
        Path::new("web/package-lock.json"),
        Path::new("src/test/fixtures/old.jar"),
        Path::new("src/main/java/App.java"),
    ];

    c.bench_function("filter_is_match", |b| {
        b.iter(|| {
            for path in &paths {
                black_box(filter.is_match(black_box(path)));
            }
        });
    });
}

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");

    for size in [10usize, 500] {
        let cargo = generate_cargo_lock(size);
        let npm = generate_package_lock(size);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("cargo_lock", size), &cargo, |b, content| {
            b.iter(|| {
                CargoLockResolver
                    .resolve(black_box(content.as_bytes()), "Cargo.lock")
                    .unwrap()
            });
        });

        group.bench_with_input(BenchmarkId::new("package_lock", size), &npm, |b, content| {
            b.iter(|| {
                NpmLockResolver
                    .resolve(black_box(content.as_bytes()), "package-lock.json")
                    .unwrap()
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_walk, bench_filter, bench_resolve);
criterion_main!(benches);

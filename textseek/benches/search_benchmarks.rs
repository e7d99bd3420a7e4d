use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::{fs, num::NonZeroUsize, path::Path};
use tempfile::tempdir;
use textseek::{SearchConfig, SearchSession};

fn create_test_tree(root: &Path, dirs: usize, files_per_dir: usize, lines: usize) {
    for d in 0..dirs {
        let dir = root.join(format!("level_{}", d % 4)).join(format!("dir_{}", d));
        fs::create_dir_all(&dir).unwrap();
        for f in 0..files_per_dir {
            let mut content = String::new();
            for l in 0..lines {
                content.push_str(&format!("Line {} of file {} in dir {}\n", l, f, d));
            }
            if f % 4 == 0 {
                content.push_str("TODO: fix the thing\n");
            }
            fs::write(dir.join(format!("file_{}.txt", f)), content).unwrap();
        }
    }
}

fn session(workers: usize) -> SearchSession {
    SearchSession::new(SearchConfig {
        worker_count: NonZeroUsize::new(workers).unwrap(),
        ..SearchConfig::default()
    })
}

fn bench_pool_sizes(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    create_test_tree(dir.path(), 40, 25, 50);

    let mut group = c.benchmark_group("Pool Size");
    for workers in [1, 4, 10, 16] {
        let session = session(workers);
        group.bench_function(format!("workers_{}", workers), |b| {
            b.iter(|| {
                let summary = session
                    .start_search(dir.path(), black_box("TODO"))
                    .unwrap()
                    .wait()
                    .unwrap();
                black_box(summary.counters)
            });
        });
    }
    group.finish();
}

fn bench_early_exit(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    create_test_tree(dir.path(), 10, 20, 2000);

    let mut group = c.benchmark_group("Early Exit");
    let session = session(10);
    // "Line 0" is on the first line of every file, "TODO" near the end of some
    for pattern in ["Line 0 ", "TODO", "absent-pattern"] {
        group.bench_function(pattern.trim(), |b| {
            b.iter(|| {
                session
                    .start_search(dir.path(), black_box(pattern))
                    .unwrap()
                    .wait()
                    .unwrap()
            });
        });
    }
    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(20);
    targets = bench_pool_sizes, bench_early_exit
}

criterion_main!(benches);

//! Benchmarks for strm-mirror
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use strm_mirror::classify::{Classifier, ExtensionSet};
use strm_mirror::config::{MirrorConfig, DEFAULT_COPY_EXTS, DEFAULT_POINTER_EXTS};
use strm_mirror::remote::MemoryRemote;
use strm_mirror::walker::MirrorCoordinator;

fn default_classifier() -> Classifier {
    Classifier::new(
        ExtensionSet::parse_list(DEFAULT_POINTER_EXTS),
        ExtensionSet::parse_list(DEFAULT_COPY_EXTS),
    )
}

fn benchmark_classify(c: &mut Criterion) {
    let classifier = default_classifier();
    let names = [
        "Movie (2020).mkv",
        "Movie (2020).nfo",
        "poster.JPG",
        "Show.S01E01.en.srt",
        "README",
        "archive.tar.gz",
    ];

    c.bench_function("classify", |b| {
        b.iter(|| {
            for name in &names {
                black_box(classifier.classify(black_box(name)));
            }
        })
    });
}

fn benchmark_memory_mirror(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap();

    let mut remote = MemoryRemote::new();
    for show in 0..10 {
        for ep in 0..20 {
            let dir = format!("/tv/Show{show}/Season 1");
            remote = remote
                .with_file(&format!("{dir}/E{ep:02}.mkv"), vec![0u8; 16])
                .with_file(&format!("{dir}/E{ep:02}.nfo"), vec![1u8; 512]);
        }
    }
    let remote = Arc::new(remote);

    c.bench_function("mirror_400_files", |b| {
        b.to_async(&runtime).iter(|| {
            let remote = Arc::clone(&remote);
            async move {
                let out = tempfile::tempdir().unwrap();
                let config = MirrorConfig::new("http://nas/dav", "/", out.path(), default_classifier());
                let report = MirrorCoordinator::new(config, remote).run_report().await;
                black_box(report.files_copied);
            }
        })
    });
}

criterion_group!(benches, benchmark_classify, benchmark_memory_mirror);
criterion_main!(benches);

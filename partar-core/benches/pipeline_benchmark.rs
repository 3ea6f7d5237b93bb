use std::io::Cursor;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use partar_core::config::Options;
use partar_core::pipeline::compress;

fn make_tar(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (name, data) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, *data).unwrap();
    }
    builder.into_inner().unwrap()
}

fn bench_many_small_files(c: &mut Criterion) {
    let owned: Vec<(String, Vec<u8>)> = (0..500)
        .map(|i| (format!("file_{i:05}.txt"), format!("contents of file number {i}").into_bytes()))
        .collect();
    let files: Vec<(&str, &[u8])> = owned.iter().map(|(n, d)| (n.as_str(), d.as_slice())).collect();
    let tar_bytes = make_tar(&files);

    let mut group = c.benchmark_group("pipeline_many_small_files");
    group.throughput(Throughput::Bytes(tar_bytes.len() as u64));

    for workers in [1, 2, 4] {
        group.bench_function(format!("{workers}_workers"), |b| {
            b.iter(|| {
                let mut options = Options::new();
                options.workers = workers;
                let mut out = Vec::new();
                compress(Cursor::new(tar_bytes.clone()), &mut out, options).unwrap();
                out
            })
        });
    }

    group.finish();
}

fn bench_one_large_file(c: &mut Criterion) {
    let data = vec![b'x'; 8 * 1024 * 1024];
    let tar_bytes = make_tar(&[("big.bin", &data)]);

    let mut group = c.benchmark_group("pipeline_one_large_file");
    group.throughput(Throughput::Bytes(tar_bytes.len() as u64));

    for workers in [1, 2, 4] {
        group.bench_function(format!("{workers}_workers"), |b| {
            b.iter(|| {
                let mut options = Options::new();
                options.workers = workers;
                options.block_in = 1024 * 1024;
                let mut out = Vec::new();
                compress(Cursor::new(tar_bytes.clone()), &mut out, options).unwrap();
                out
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_many_small_files, bench_one_large_file);
criterion_main!(benches);

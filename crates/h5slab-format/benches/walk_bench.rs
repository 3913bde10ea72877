use criterion::{black_box, criterion_group, criterion_main, Criterion};
use h5slab_format::chunk_grid::ChunkGrid;
use h5slab_format::selection::Selection;
use h5slab_format::walker::walk;

const DIMS: [u64; 2] = [1024, 1024];

fn total_length(dims: &[u64], chunk_dims: &[u64], sel: &Selection, bulk: bool) -> u64 {
    walk(dims.len(), dims, chunk_dims, sel, bulk)
        .unwrap()
        .map(|s| s.length)
        .sum()
}

fn bench_walk_all_bulk(c: &mut Criterion) {
    c.bench_function("walk_1M_all_bulk", |b| {
        b.iter(|| total_length(black_box(&DIMS), &DIMS, &Selection::All, true))
    });
}

fn bench_walk_all_rows(c: &mut Criterion) {
    c.bench_function("walk_1M_all_rows", |b| {
        b.iter(|| total_length(black_box(&DIMS), &DIMS, &Selection::All, false))
    });
}

fn bench_walk_chunked(c: &mut Criterion) {
    let chunk_dims = [64, 64];
    c.bench_function("walk_1M_chunked_64x64", |b| {
        b.iter(|| total_length(black_box(&DIMS), &chunk_dims, &Selection::All, true))
    });
}

fn bench_walk_strided(c: &mut Criterion) {
    let chunk_dims = [100, 100];
    let sel = Selection::hyperslab(&[3, 5], &[4, 8], &[250, 127], &[2, 3]).unwrap();
    c.bench_function("walk_strided_hyperslab", |b| {
        b.iter(|| total_length(black_box(&DIMS), &chunk_dims, &sel, true))
    });
}

fn bench_chunk_coords(c: &mut Criterion) {
    let grid = ChunkGrid::new(&[4096, 4096, 64], &[32, 32, 8]).unwrap();
    c.bench_function("chunk_coords_roundtrip", |b| {
        b.iter(|| {
            let mut acc = 0u64;
            for index in 0..grid.num_chunks() {
                acc += grid.chunk_index(&grid.chunk_coords(black_box(index)));
            }
            acc
        })
    });
}

criterion_group!(
    benches,
    bench_walk_all_bulk,
    bench_walk_all_rows,
    bench_walk_chunked,
    bench_walk_strided,
    bench_chunk_coords,
);
criterion_main!(benches);

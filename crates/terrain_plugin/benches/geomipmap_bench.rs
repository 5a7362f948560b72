//! Benchmarks for index generation, entropy tables and full update passes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use terrain_plugin::{max_lod_for_size, EntropyTable, GeoMipMap, HeightField, NeighborLods, TerrainConfig, TerrainQuad};

fn random_heights(len: usize, seed: u64) -> Vec<f32> {
  let mut rng = StdRng::seed_from_u64(seed);
  (0..len).map(|_| rng.random_range(-8.0..8.0)).collect()
}

/// Every LOD, with all four neighbors one level coarser.
fn bench_index_generation(c: &mut Criterion) {
  let mut group = c.benchmark_group("indices");
  for size in [33usize, 65, 129] {
    let mipmap = GeoMipMap::new(size).unwrap();
    let max_lod = max_lod_for_size(size);

    group.bench_with_input(BenchmarkId::new("variable", size), &size, |b, _| {
      b.iter(|| {
        for lod in 1..=max_lod {
          let n = (lod + 1).min(max_lod);
          black_box(mipmap.build_indices_variable(black_box(lod), n, n, n, n));
        }
      })
    });

    group.bench_with_input(BenchmarkId::new("uniform", size), &size, |b, _| {
      b.iter(|| {
        for lod in 1..=max_lod {
          black_box(mipmap.build_indices_uniform(black_box(lod), true, true, true, true));
        }
      })
    });

    group.bench_with_input(BenchmarkId::new("record", size), &size, |b, _| {
      let neighbors = NeighborLods::uniform(2);
      b.iter(|| black_box(mipmap.build_indices(black_box(1), &neighbors)))
    });
  }
  group.finish();
}

fn bench_entropy(c: &mut Criterion) {
  let mut group = c.benchmark_group("entropy");
  for size in [33usize, 65, 129] {
    let field = HeightField::new(size, random_heights(size * size, size as u64)).unwrap();
    group.bench_with_input(BenchmarkId::from_parameter(size), &field, |b, field| {
      b.iter(|| black_box(EntropyTable::generate(black_box(field))))
    });
  }
  group.finish();
}

/// Snapshot, plan and commit on a 4x4-patch terrain with a moving viewer.
fn bench_update_pass(c: &mut Criterion) {
  let total = 257;
  let config = TerrainConfig::default().with_patch_size(65);
  let mut quad = TerrainQuad::new("bench", config, total, random_heights(total * total, 7)).unwrap();
  let viewers = [Vec3::new(10.0, 20.0, 10.0), Vec3::new(250.0, 20.0, 128.0), Vec3::splat(5000.0)];

  let mut step = 0usize;
  c.bench_function("quad::update (257², 65 patches)", |b| {
    b.iter(|| {
      step = (step + 1) % viewers.len();
      black_box(quad.update(&[viewers[step]]).unwrap())
    })
  });
}

criterion_group!(benches, bench_index_generation, bench_entropy, bench_update_pass);
criterion_main!(benches);

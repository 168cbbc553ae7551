use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dynamics::backend::{create_backend, CollisionScene};
use dynamics::ComputeMethod;
use compute::{CapsuleShape, ParticleCell, SphereShape};

fn cells(count: usize) -> Vec<ParticleCell> {
    (0..count)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let t = i as f32 * 0.013;
            ParticleCell {
                center: [t.cos() * 0.4, (t * 3.0).sin() * 0.8, t.sin() * 0.4],
                radius: 0.02,
            }
        })
        .collect()
}

fn scene() -> CollisionScene {
    CollisionScene {
        spheres: (0..8)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let y = i as f32 * 0.2 - 0.8;
                SphereShape { center: [0.0, y, 0.0], radius: 0.3 }
            })
            .collect(),
        capsules: vec![
            CapsuleShape { start: [0.0, -1.0, 0.0], radius: 0.25, end: [0.0, 1.0, 0.0], _pad: 0.0 },
            CapsuleShape { start: [-1.0, 0.0, 0.0], radius: 0.1, end: [1.0, 0.0, 0.0], _pad: 0.0 },
        ],
    }
}

fn bench_backends(c: &mut Criterion) {
    let scene = scene();
    let mut group = c.benchmark_group("collide");
    for count in [256, 4096] {
        let input = cells(count);
        for method in [ComputeMethod::SingleThread, ComputeMethod::ParallelJobs, ComputeMethod::GpuKernel] {
            let backend = create_backend(method);
            group.bench_with_input(BenchmarkId::new(format!("{method:?}"), count), &input, |b, input| {
                b.iter(|| {
                    let mut cells = input.clone();
                    backend.resolve(&mut cells, black_box(&scene));
                    cells
                });
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_backends);
criterion_main!(benches);

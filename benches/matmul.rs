//! Умножение матриц: устройство по умолчанию против CPU (ndarray)

use criterion::{
    black_box, criterion_group, criterion_main, measurement::WallTime, BenchmarkGroup, BenchmarkId,
    Criterion,
};
use opencl_matrix::matrix::{cpu_matrix_multiply, cpu_matrix_vector_multiply};
use opencl_matrix::{ComputeConfig, ComputeEngine, DefaultDevice, Matrix, Vector};

fn open_engine() -> Option<ComputeEngine<DefaultDevice>> {
    let engine = ComputeEngine::new(ComputeConfig::default());
    if let Err(e) = engine.context() {
        eprintln!("No device available, skipping benchmarks: {e}");
        return None;
    }
    Some(engine)
}

fn bench_square<const N: usize>(
    group: &mut BenchmarkGroup<'_, WallTime>,
    engine: &ComputeEngine<DefaultDevice>,
) {
    let a = Matrix::<N, N>::random();
    let b = Matrix::<N, N>::random();

    group.bench_with_input(BenchmarkId::new("device", N), &N, |bench, _| {
        bench.iter(|| black_box(engine.multiply(&a, &b)));
    });
    group.bench_with_input(BenchmarkId::new("cpu", N), &N, |bench, _| {
        bench.iter(|| black_box(cpu_matrix_multiply(&a, &b)));
    });
}

fn bench_matmul(c: &mut Criterion) {
    let Some(engine) = open_engine() else {
        return;
    };

    let mut group = c.benchmark_group("matmul");
    bench_square::<16>(&mut group, &engine);
    bench_square::<64>(&mut group, &engine);
    bench_square::<128>(&mut group, &engine);
    group.finish();
}

fn bench_matvec(c: &mut Criterion) {
    let Some(engine) = open_engine() else {
        return;
    };

    let m = Matrix::<256, 256>::random();
    let v = Vector::<256>::random();

    let mut group = c.benchmark_group("matvec");
    group.bench_function("device/256", |bench| {
        bench.iter(|| black_box(engine.multiply_vector(&m, &v)));
    });
    group.bench_function("cpu/256", |bench| {
        bench.iter(|| black_box(cpu_matrix_vector_multiply(&m, &v)));
    });
    group.finish();
}

criterion_group!(benches, bench_matmul, bench_matvec);
criterion_main!(benches);

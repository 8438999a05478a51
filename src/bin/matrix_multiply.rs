//! Тестирование производительности умножения матриц на устройстве

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use opencl_matrix::matrix::{compare_results, cpu_matrix_multiply};
use opencl_matrix::utils::{gflops, measure_time};
use opencl_matrix::{ComputeConfig, ComputeDevice, ComputeEngine, DefaultDevice, Matrix};
use prettytable::{row, Table};
use std::time::Duration;

const NUM_ITERATIONS: u32 = 10;
const EPSILON: f32 = 1e-3;

/// Результат замера для одного размера
struct Measurement {
    size: usize,
    device_avg: Duration,
    cpu_avg: Duration,
    matches: bool,
}

fn bench_size<const N: usize>(
    engine: &ComputeEngine<DefaultDevice>,
    progress: &ProgressBar,
) -> Result<Measurement> {
    progress.set_message(format!("{N}x{N}"));
    let a = Matrix::<N, N>::random();
    let b = Matrix::<N, N>::random();

    // Прогрев и проверка корректности
    let reference = cpu_matrix_multiply(&a, &b)?;
    let warmup = engine.multiply(&a, &b)?;
    let matches = compare_results(warmup.as_slice(), reference.as_slice(), EPSILON);

    let mut device_total = Duration::ZERO;
    let mut cpu_total = Duration::ZERO;
    for _ in 0..NUM_ITERATIONS {
        let (result, elapsed) = measure_time(|| engine.multiply(&a, &b));
        result?;
        device_total += elapsed;

        let (result, elapsed) = measure_time(|| cpu_matrix_multiply(&a, &b));
        result?;
        cpu_total += elapsed;

        progress.inc(1);
    }

    Ok(Measurement {
        size: N,
        device_avg: device_total / NUM_ITERATIONS,
        cpu_avg: cpu_total / NUM_ITERATIONS,
        matches,
    })
}

fn main() -> Result<()> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => ComputeConfig::from_json_file(&path)?,
        None => ComputeConfig::default(),
    };

    let engine = ComputeEngine::<DefaultDevice>::new(config);
    let context = engine
        .context()
        .context("Не удалось инициализировать устройство")?;
    println!("Тестирование производительности на {}\n", context.device().description());

    let progress = ProgressBar::new(4 * NUM_ITERATIONS as u64);
    progress.set_style(
        ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} {msg}")
            .context("Неверный шаблон прогресса")?
            .progress_chars("#>-"),
    );

    let measurements = vec![
        bench_size::<32>(&engine, &progress)?,
        bench_size::<64>(&engine, &progress)?,
        bench_size::<128>(&engine, &progress)?,
        bench_size::<256>(&engine, &progress)?,
    ];
    progress.finish_with_message("готово");

    let mut table = Table::new();
    table.set_titles(row!["Размер", "Устройство", "GFLOP/s", "CPU", "Ускорение", "Совпадение"]);
    for m in &measurements {
        let speedup = m.cpu_avg.as_secs_f64() / m.device_avg.as_secs_f64();
        table.add_row(row![
            format!("{0}x{0}", m.size),
            format!("{:.3} мс", m.device_avg.as_secs_f64() * 1000.0),
            format!("{:.2}", gflops(m.size, m.size, m.size, m.device_avg)),
            format!("{:.3} мс", m.cpu_avg.as_secs_f64() * 1000.0),
            format!("{:.2}x", speedup),
            if m.matches { "да" } else { "нет" }
        ]);
    }
    table.printstd();

    Ok(())
}

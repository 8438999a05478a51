//! Пример использования библиотеки

use anyhow::{Context, Result};
use log::info;
use opencl_matrix::matrix::{
    compare_results, cpu_matrix_multiply, cpu_matrix_vector_multiply, BLOCK_SIZE,
};
use opencl_matrix::utils::{gflops, measure_time};
use opencl_matrix::{
    ComputeConfig, ComputeDevice, ComputeEngine, DefaultDevice, Matrix, MatrixInit, Vector,
};

const MATRIX_SIZE: usize = 256;
const EPSILON: f32 = 1e-3;

/// Печатает левый верхний угол матрицы 4x4
fn preview<const W: usize, const H: usize>(title: &str, m: &Matrix<W, H>) {
    println!("\n{} ({}x{}):", title, W, H);
    for row in 0..H.min(4) {
        for col in 0..W.min(4) {
            print!("{:.3} ", m[(row, col)]);
        }
        println!("...");
    }
    println!("...");
}

fn main() -> Result<()> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => ComputeConfig::from_json_file(&path)?,
        None => ComputeConfig::default(),
    };

    println!("Начало выполнения программы умножения матриц на устройстве");
    println!("Размер матриц: {}x{}", MATRIX_SIZE, MATRIX_SIZE);
    println!("Размер рабочей группы: {}x{}", BLOCK_SIZE, BLOCK_SIZE);

    println!("\nИнициализация устройства...");
    let engine = ComputeEngine::<DefaultDevice>::new(config);
    let context = engine
        .context()
        .context("Не удалось инициализировать устройство")?;
    println!("Устройство: {}", context.device().description());

    println!("\nПодготовка данных для умножения матриц...");
    let a = Matrix::<MATRIX_SIZE, MATRIX_SIZE>::new(MatrixInit::Random);
    let b = Matrix::<MATRIX_SIZE, MATRIX_SIZE>::new(MatrixInit::Random);
    preview("Входная матрица A", &a);
    preview("Входная матрица B", &b);

    println!("\nЗапуск вычислений на устройстве...");
    let (gpu_result, gpu_duration) = measure_time(|| engine.multiply(&a, &b));
    let gpu_result = gpu_result.context("Ошибка умножения на устройстве")?;
    preview("Результирующая матрица C (устройство)", &gpu_result);

    println!("\nЗапуск вычислений на CPU...");
    let (cpu_result, cpu_duration) = measure_time(|| cpu_matrix_multiply(&a, &b));
    let cpu_result = cpu_result?;
    preview("Результирующая матрица C (CPU)", &cpu_result);

    let results_match = compare_results(gpu_result.as_slice(), cpu_result.as_slice(), EPSILON);
    let speedup = cpu_duration.as_secs_f64() / gpu_duration.as_secs_f64();

    println!("\nИтоговая статистика:");
    println!(
        "Время выполнения на устройстве: {:?} ({:.2} GFLOP/s)",
        gpu_duration,
        gflops(MATRIX_SIZE, MATRIX_SIZE, MATRIX_SIZE, gpu_duration)
    );
    println!("Время выполнения на CPU: {:?}", cpu_duration);
    println!("Устройство быстрее CPU в {:.2} раз", speedup);
    println!(
        "Результаты устройства и CPU {}",
        if results_match { "совпадают" } else { "различаются" }
    );

    println!("\nУмножение матрицы на вектор...");
    let v = Vector::<MATRIX_SIZE>::new(MatrixInit::Random);
    let y = engine
        .multiply_vector(&a, &v)
        .context("Ошибка умножения матрицы на вектор")?;
    let y_cpu = cpu_matrix_vector_multiply(&a, &v)?;
    println!(
        "Результаты устройства и CPU {}",
        if compare_results(y.as_slice(), y_cpu.as_slice(), EPSILON) {
            "совпадают"
        } else {
            "различаются"
        }
    );

    info!("Программа завершена");
    Ok(())
}

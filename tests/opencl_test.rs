//! Проверка настоящего OpenCL устройства; без устройства тесты пропускаются

#![cfg(feature = "opencl")]

use opencl_matrix::matrix::{compare_results, cpu_matrix_multiply};
use opencl_matrix::opencl::OpenClDevice;
use opencl_matrix::{ComputeConfig, ComputeDevice, ComputeEngine, DeviceKind, Matrix, Vector};

fn open_engine() -> Option<ComputeEngine<OpenClDevice>> {
    let config = ComputeConfig {
        device_type: DeviceKind::All,
        ..ComputeConfig::default()
    };
    let engine = ComputeEngine::new(config);
    match engine.context() {
        Ok(context) => println!("Using {}", context.device().description()),
        Err(err) => {
            eprintln!("No OpenCL device, skipping: {err}");
            return None;
        }
    }
    Some(engine)
}

#[test]
fn multiplies_on_device() {
    let Some(engine) = open_engine() else {
        return;
    };

    let c = engine
        .multiply(
            &Matrix::from_rows([[1.0, 2.0], [3.0, 4.0]]),
            &Matrix::from_rows([[5.0, 6.0], [7.0, 8.0]]),
        )
        .unwrap();
    assert_eq!(c.as_slice(), &[19.0, 22.0, 43.0, 50.0]);

    let a = Matrix::<37, 21>::random();
    let b = Matrix::<45, 37>::random();
    let device = engine.multiply(&a, &b).unwrap();
    let cpu = cpu_matrix_multiply(&a, &b).unwrap();
    assert!(compare_results(device.as_slice(), cpu.as_slice(), 1e-3));
}

#[test]
fn matrix_vector_on_device() {
    let Some(engine) = open_engine() else {
        return;
    };

    let y = engine
        .multiply_vector(&Matrix::<2, 2>::identity(), &Vector::from_array([3.0, 4.0]))
        .unwrap();
    assert_eq!(y.as_slice(), &[3.0, 4.0]);
}

//! Умножение матриц на устройстве

use super::buffer::AccessMode;
use super::context::ComputeContext;
use super::device::{ComputeDevice, KernelArg, NdRange};
use super::error::{ComputeError, ComputeResult};
use crate::config::ComputeConfig;
use crate::matrix::{KernelKind, Matrix, MmulSignature, Vector, BLOCK_SIZE};
use crate::opencl::types::CL_INVALID_ARG_VALUE;
use log::{debug, error};
use std::sync::OnceLock;

type DeviceFactory<D> = Box<dyn Fn(&ComputeConfig) -> ComputeResult<D> + Send + Sync>;

/// Движок умножения, владеющий сессией устройства.
///
/// Контекст (устройство, очередь, программы) создаётся один раз при
/// первом обращении, в том числе при одновременном обращении из разных
/// потоков. Ошибка создания сохраняется и возвращается всем
/// последующим вызовам.
pub struct ComputeEngine<D: ComputeDevice> {
    config: ComputeConfig,
    open_device: DeviceFactory<D>,
    context: OnceLock<ComputeResult<ComputeContext<D>>>,
}

impl<D: ComputeDevice> ComputeEngine<D> {
    /// Движок, открывающий устройство через `ComputeDevice::open`
    pub fn new(config: ComputeConfig) -> Self {
        Self::with_device_factory(config, D::open)
    }

    pub fn with_device_factory<F>(config: ComputeConfig, open_device: F) -> Self
    where
        F: Fn(&ComputeConfig) -> ComputeResult<D> + Send + Sync + 'static,
    {
        Self {
            config,
            open_device: Box::new(open_device),
            context: OnceLock::new(),
        }
    }

    pub fn config(&self) -> &ComputeConfig {
        &self.config
    }

    /// Контекст устройства; создаётся при первом вызове
    pub fn context(&self) -> ComputeResult<&ComputeContext<D>> {
        self.context
            .get_or_init(|| {
                (self.open_device)(&self.config)
                    .and_then(|device| ComputeContext::build(device, &self.config))
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    /// C = A * B, где A имеет `K` столбцов и `M` строк, а B имеет `P` столбцов и `K` строк.
    ///
    /// Запуск тайлами `BLOCK_SIZE`×`BLOCK_SIZE`. Если `mmul` принимает
    /// размеры результата, глобальный размер дополняется до целого числа
    /// тайлов; иначе он равен размеру результата и должен делиться на тайл.
    pub fn multiply<const K: usize, const M: usize, const P: usize>(
        &self,
        a: &Matrix<K, M>,
        b: &Matrix<P, K>,
    ) -> ComputeResult<Matrix<P, M>> {
        dispatch("multiply", || {
            let ctx = self.context()?;
            let device = ctx.device();
            let mut result = Matrix::<P, M>::zeros();

            let a_buffer = a.create_buffer(device, AccessMode::ReadOnly)?;
            let b_buffer = b.create_buffer(device, AccessMode::ReadOnly)?;
            let result_buffer = result.create_buffer(device, AccessMode::WriteOnly)?;

            let tile_bytes = BLOCK_SIZE * BLOCK_SIZE * std::mem::size_of::<f32>();
            let mut args = vec![
                dim_arg(K)?,
                a_buffer.arg(),
                b_buffer.arg(),
                result_buffer.arg(),
                KernelArg::Local(tile_bytes),
                KernelArg::Local(tile_bytes),
            ];
            let global = match ctx.mmul_signature() {
                MmulSignature::Bounded => {
                    args.push(dim_arg(P)?);
                    args.push(dim_arg(M)?);
                    [round_up(P, BLOCK_SIZE), round_up(M, BLOCK_SIZE)]
                }
                // Без границ в аргументах ядро считает размеры результата
                // по глобальному размеру, поэтому он не дополняется
                MmulSignature::Exact => [P, M],
            };
            let range = NdRange::tiled(global, [BLOCK_SIZE, BLOCK_SIZE]);
            debug!("mmul: {}x{} * {}x{}, global {:?}", M, K, K, P, range.global());

            ctx.enqueue(KernelKind::MatrixMultiply, &range, &args)?;

            ctx.read(&result_buffer, result.get())?;
            Ok(result)
        })
    }

    /// y = M * v, по одному work-item на строку матрицы
    pub fn multiply_vector<const K: usize, const M: usize>(
        &self,
        matrix: &Matrix<K, M>,
        vector: &Vector<K>,
    ) -> ComputeResult<Vector<M>> {
        dispatch("multiply_vector", || {
            let ctx = self.context()?;
            let device = ctx.device();
            let mut result = Vector::<M>::zeros();

            let matrix_buffer = matrix.create_buffer(device, AccessMode::ReadOnly)?;
            let vector_buffer = vector.create_buffer(device, AccessMode::ReadOnly)?;
            let result_buffer = result.create_buffer(device, AccessMode::WriteOnly)?;

            let range = NdRange::linear(M);
            debug!("matrixVectorMul: {}x{} * {}, global {:?}", M, K, K, range.global());

            ctx.enqueue(
                KernelKind::MatrixVectorMultiply,
                &range,
                &[
                    result_buffer.arg(),
                    matrix_buffer.arg(),
                    vector_buffer.arg(),
                    dim_arg(K)?,
                ],
            )?;

            ctx.read(&result_buffer, result.get())?;
            if self.config.print_vector_results {
                result.print();
            }
            Ok(result)
        })
    }
}

/// Пишет ошибку операции в журнал и передаёт её вызывающему
fn dispatch<T>(operation: &str, f: impl FnOnce() -> ComputeResult<T>) -> ComputeResult<T> {
    f().map_err(|err| {
        error!("{}: {}", operation, err);
        err
    })
}

fn dim_arg<'a, B>(value: usize) -> ComputeResult<KernelArg<'a, B>> {
    i32::try_from(value)
        .map(KernelArg::Int)
        .map_err(|_| ComputeError::device("clSetKernelArg", CL_INVALID_ARG_VALUE))
}

fn round_up(value: usize, multiple: usize) -> usize {
    (value + multiple - 1) / multiple * multiple
}

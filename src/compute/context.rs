//! Вычислительный контекст: устройство, очередь и собранные программы

use super::buffer::DeviceBuffer;
use super::device::{ComputeDevice, KernelArg, NdRange};
use super::error::{ComputeError, ComputeResult};
use crate::config::ComputeConfig;
use crate::matrix::{KernelKind, MmulSignature};
use log::{error, info};

/// Сессия устройства: одна очередь и по программе на каждый вид ядра
pub struct ComputeContext<D: ComputeDevice> {
    queue: D::Queue,
    program_mat: D::Program,
    program_vec: D::Program,
    mmul_signature: MmulSignature,
    device: D,
}

impl<D: ComputeDevice> ComputeContext<D> {
    /// Создаёт очередь и собирает обе программы.
    ///
    /// При ошибке компиляции лог сборки пишется в журнал до возврата ошибки.
    /// `mmul` должна объявлять 6 или 8 параметров, иначе это тоже ошибка сборки.
    pub fn build(device: D, config: &ComputeConfig) -> ComputeResult<Self> {
        let queue = device.create_queue()?;
        let program_mat = build_program(&device, KernelKind::MatrixMultiply, config)?;
        let program_vec = build_program(&device, KernelKind::MatrixVectorMultiply, config)?;
        let mmul_signature = mmul_signature(&device, &program_mat)?;

        info!("Контекст создан: {}", device.description());
        Ok(Self {
            queue,
            program_mat,
            program_vec,
            mmul_signature,
            device,
        })
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn queue(&self) -> &D::Queue {
        &self.queue
    }

    pub fn program(&self, kind: KernelKind) -> &D::Program {
        match kind {
            KernelKind::MatrixMultiply => &self.program_mat,
            KernelKind::MatrixVectorMultiply => &self.program_vec,
        }
    }

    /// Какие аргументы принимает `mmul` этого контекста
    pub fn mmul_signature(&self) -> MmulSignature {
        self.mmul_signature
    }

    /// Ставит ядро в очередь
    pub fn enqueue(
        &self,
        kind: KernelKind,
        range: &NdRange,
        args: &[KernelArg<'_, D::Buffer>],
    ) -> ComputeResult<()> {
        self.device.enqueue_kernel(
            &self.queue,
            self.program(kind),
            kind.entry_point(),
            range,
            args,
        )
    }

    /// Блокирующее чтение буфера в `out`
    pub fn read(&self, buffer: &DeviceBuffer<D>, out: &mut [f32]) -> ComputeResult<()> {
        self.device.read_buffer(&self.queue, buffer.handle(), out)
    }
}

fn build_program<D: ComputeDevice>(
    device: &D,
    kind: KernelKind,
    config: &ComputeConfig,
) -> ComputeResult<D::Program> {
    let source = config.kernel_source(kind)?;
    device
        .build_program(kind.source_file(), &source, &config.build_options)
        .map_err(|err| {
            if let ComputeError::BuildFailure { program, log } = &err {
                error!("Ошибка сборки {}:\n{}", program, log);
            }
            err
        })
}

fn mmul_signature<D: ComputeDevice>(device: &D, program: &D::Program) -> ComputeResult<MmulSignature> {
    let kind = KernelKind::MatrixMultiply;
    let count = device.kernel_arg_count(program, kind.entry_point())?;
    MmulSignature::from_arg_count(count).ok_or_else(|| {
        let log = format!(
            "{}: '{}' declares {} arguments, expected {} or {}",
            kind.source_file(),
            kind.entry_point(),
            count,
            MmulSignature::Exact.arg_count(),
            MmulSignature::Bounded.arg_count()
        );
        error!("Ошибка сборки {}:\n{}", kind.source_file(), log);
        ComputeError::BuildFailure {
            program: kind.source_file().to_string(),
            log,
        }
    })
}

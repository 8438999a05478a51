//! Граница между движком и вычислительным устройством

use super::buffer::AccessMode;
use super::error::ComputeResult;
use crate::config::ComputeConfig;

/// Аргумент ядра в порядке объявления параметров
#[derive(Debug)]
pub enum KernelArg<'a, B> {
    /// Скалярный `int`
    Int(i32),
    /// Буфер в глобальной памяти устройства
    Buffer(&'a B),
    /// Локальная память рабочей группы указанного размера в байтах
    Local(usize),
}

/// Геометрия запуска ядра: глобальный и (опционально) локальный размеры
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NdRange {
    dims: usize,
    global: [usize; 2],
    local: Option<[usize; 2]>,
}

impl NdRange {
    /// Одномерный запуск без рабочих групп
    pub fn linear(global: usize) -> Self {
        Self {
            dims: 1,
            global: [global, 1],
            local: None,
        }
    }

    /// Двумерный запуск с заданной рабочей группой
    pub fn tiled(global: [usize; 2], local: [usize; 2]) -> Self {
        Self {
            dims: 2,
            global,
            local: Some(local),
        }
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn global(&self) -> &[usize] {
        &self.global[..self.dims]
    }

    pub fn local(&self) -> Option<&[usize]> {
        self.local.as_ref().map(|local| &local[..self.dims])
    }
}

/// Устройство с одним контекстом.
///
/// Очередь команд исполняет работу строго в порядке постановки.
/// `read_buffer` блокирует вызывающий поток до окончания копирования.
pub trait ComputeDevice: Sized + Send + Sync + 'static {
    type Buffer: Send + Sync;
    type Program: Send + Sync;
    type Queue: Send + Sync;

    /// Открывает устройство согласно конфигурации
    fn open(config: &ComputeConfig) -> ComputeResult<Self>;

    fn description(&self) -> String;

    fn create_queue(&self) -> ComputeResult<Self::Queue>;

    /// Компилирует программу; при ошибке компиляции возвращает
    /// `ComputeError::BuildFailure` с логом сборки первого устройства.
    fn build_program(&self, name: &str, source: &str, options: &str)
        -> ComputeResult<Self::Program>;

    /// Число параметров, объявленных точкой входа `entry_point`
    fn kernel_arg_count(&self, program: &Self::Program, entry_point: &str)
        -> ComputeResult<usize>;

    /// Выделяет буфер. `host` копируется в буфер при создании и
    /// передаётся только для режимов, читаемых ядром.
    fn create_buffer(
        &self,
        access: AccessMode,
        size_bytes: usize,
        host: Option<&[f32]>,
    ) -> ComputeResult<Self::Buffer>;

    fn enqueue_kernel(
        &self,
        queue: &Self::Queue,
        program: &Self::Program,
        entry_point: &str,
        range: &NdRange,
        args: &[KernelArg<'_, Self::Buffer>],
    ) -> ComputeResult<()>;

    fn read_buffer(
        &self,
        queue: &Self::Queue,
        buffer: &Self::Buffer,
        out: &mut [f32],
    ) -> ComputeResult<()>;
}

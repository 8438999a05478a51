//! Устройство, исполняющее ядра на хосте
//!
//! `HostDevice` повторяет контракт двух программ (`mmul` и
//! `matrixVectorMul`) на CPU: те же аргументы, та же геометрия запуска,
//! те же правила доступа к буферам. Матричное умножение эмулирует
//! рабочие группы: тайлы загружаются в локальную память, после барьера
//! накапливаются. Используется, когда фича `opencl` выключена, и в тестах.

use super::buffer::AccessMode;
use super::device::{ComputeDevice, KernelArg, NdRange};
use super::error::{ComputeError, ComputeResult};
use crate::config::ComputeConfig;
use crate::matrix::{KernelKind, MmulSignature};
use crate::opencl::types::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

const CREATE_BUFFER: &str = "clCreateBuffer";
const SET_KERNEL_ARG: &str = "clSetKernelArg";
const ENQUEUE_KERNEL: &str = "clEnqueueNDRangeKernel";
const READ_BUFFER: &str = "clEnqueueReadBuffer";

/// Устройство-эмулятор с учётом выделенной памяти
#[derive(Debug, Default)]
pub struct HostDevice {
    memory_limit: Option<usize>,
    allocated: Arc<AtomicUsize>,
}

impl HostDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Устройство, отказывающее в выделении сверх `bytes` байт
    pub fn with_memory_limit(bytes: usize) -> Self {
        Self {
            memory_limit: Some(bytes),
            ..Self::default()
        }
    }

    /// Байты, занятые живыми буферами
    pub fn allocated_bytes(&self) -> usize {
        self.allocated.load(Ordering::SeqCst)
    }

    fn reserve(&self, size_bytes: usize) -> ComputeResult<()> {
        self.allocated
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                let next = current.checked_add(size_bytes)?;
                match self.memory_limit {
                    Some(limit) if next > limit => None,
                    _ => Some(next),
                }
            })
            .map(|_| ())
            .map_err(|_| ComputeError::device(CREATE_BUFFER, CL_MEM_OBJECT_ALLOCATION_FAILURE))
    }
}

/// Буфер в "памяти устройства"
#[derive(Debug)]
pub struct HostBuffer {
    access: AccessMode,
    size_bytes: usize,
    data: RwLock<Vec<f32>>,
    allocated: Arc<AtomicUsize>,
}

impl HostBuffer {
    pub fn access(&self) -> AccessMode {
        self.access
    }

    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    fn read(&self) -> ComputeResult<RwLockReadGuard<'_, Vec<f32>>> {
        self.data
            .read()
            .map_err(|_| ComputeError::device(ENQUEUE_KERNEL, CL_INVALID_MEM_OBJECT))
    }

    fn write(&self) -> ComputeResult<RwLockWriteGuard<'_, Vec<f32>>> {
        self.data
            .write()
            .map_err(|_| ComputeError::device(ENQUEUE_KERNEL, CL_INVALID_MEM_OBJECT))
    }
}

impl Drop for HostBuffer {
    fn drop(&mut self) {
        self.allocated.fetch_sub(self.size_bytes, Ordering::SeqCst);
    }
}

/// Собранная программа: точки входа и число их параметров
#[derive(Debug, Clone)]
pub struct HostProgram {
    name: String,
    kernels: Vec<(String, usize)>,
}

impl HostProgram {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entry_points(&self) -> Vec<&str> {
        self.kernels.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Число параметров точки входа, если она есть в программе
    pub fn arg_count(&self, entry_point: &str) -> Option<usize> {
        self.kernels
            .iter()
            .find(|(name, _)| name == entry_point)
            .map(|&(_, count)| count)
    }
}

/// Очередь команд: работа исполняется синхронно, по одной команде
#[derive(Debug, Default)]
pub struct HostQueue {
    lock: Mutex<()>,
    submitted: AtomicUsize,
}

impl HostQueue {
    /// Число запущенных ядер
    pub fn submitted(&self) -> usize {
        self.submitted.load(Ordering::SeqCst)
    }
}

impl ComputeDevice for HostDevice {
    type Buffer = HostBuffer;
    type Program = HostProgram;
    type Queue = HostQueue;

    fn open(_config: &ComputeConfig) -> ComputeResult<Self> {
        Ok(Self::new())
    }

    fn description(&self) -> String {
        "Host device (emulated OpenCL)".to_string()
    }

    fn create_queue(&self) -> ComputeResult<HostQueue> {
        Ok(HostQueue::default())
    }

    fn build_program(&self, name: &str, source: &str, options: &str) -> ComputeResult<HostProgram> {
        check_build_options(options)?;

        let (stripped, mut errors) = strip_and_check(name, source);
        let kernels = kernel_signatures(&stripped);
        if errors.is_empty() && kernels.is_empty() {
            errors.push(format!("{}: error: no __kernel functions found", name));
        }
        if !errors.is_empty() {
            return Err(ComputeError::BuildFailure {
                program: name.to_string(),
                log: errors.join("\n"),
            });
        }

        Ok(HostProgram {
            name: name.to_string(),
            kernels,
        })
    }

    fn kernel_arg_count(&self, program: &HostProgram, entry_point: &str) -> ComputeResult<usize> {
        program
            .arg_count(entry_point)
            .ok_or_else(|| ComputeError::device("clCreateKernel", CL_INVALID_KERNEL_NAME))
    }

    fn create_buffer(
        &self,
        access: AccessMode,
        size_bytes: usize,
        host: Option<&[f32]>,
    ) -> ComputeResult<HostBuffer> {
        let element_size = std::mem::size_of::<f32>();
        if size_bytes == 0 || size_bytes % element_size != 0 {
            return Err(ComputeError::device(CREATE_BUFFER, CL_INVALID_BUFFER_SIZE));
        }
        let len = size_bytes / element_size;

        let data = match (access.copies_host_data(), host) {
            (true, Some(host)) if host.len() == len => host.to_vec(),
            // Содержимое буфера только для записи не определено
            (false, None) => vec![f32::NAN; len],
            _ => return Err(ComputeError::device(CREATE_BUFFER, CL_INVALID_HOST_PTR)),
        };

        self.reserve(size_bytes)?;
        Ok(HostBuffer {
            access,
            size_bytes,
            data: RwLock::new(data),
            allocated: Arc::clone(&self.allocated),
        })
    }

    fn enqueue_kernel(
        &self,
        queue: &HostQueue,
        program: &HostProgram,
        entry_point: &str,
        range: &NdRange,
        args: &[KernelArg<'_, HostBuffer>],
    ) -> ComputeResult<()> {
        let declared = self.kernel_arg_count(program, entry_point)?;
        if args.len() > declared {
            return Err(ComputeError::device(SET_KERNEL_ARG, CL_INVALID_ARG_INDEX));
        }
        if args.len() < declared {
            return Err(ComputeError::device(ENQUEUE_KERNEL, CL_INVALID_KERNEL_ARGS));
        }
        check_range(range)?;

        let _guard = queue
            .lock
            .lock()
            .map_err(|_| ComputeError::device(ENQUEUE_KERNEL, CL_INVALID_COMMAND_QUEUE))?;
        queue.submitted.fetch_add(1, Ordering::SeqCst);

        if entry_point == KernelKind::MatrixMultiply.entry_point() {
            run_mmul(range, args)
        } else if entry_point == KernelKind::MatrixVectorMultiply.entry_point() {
            run_matrix_vector_mul(range, args)
        } else {
            Err(ComputeError::device("clCreateKernel", CL_INVALID_KERNEL_NAME))
        }
    }

    fn read_buffer(&self, queue: &HostQueue, buffer: &HostBuffer, out: &mut [f32]) -> ComputeResult<()> {
        let _guard = queue
            .lock
            .lock()
            .map_err(|_| ComputeError::device(READ_BUFFER, CL_INVALID_COMMAND_QUEUE))?;

        if out.len() * std::mem::size_of::<f32>() > buffer.size_bytes {
            return Err(ComputeError::device(READ_BUFFER, CL_INVALID_VALUE));
        }
        let data = buffer
            .data
            .read()
            .map_err(|_| ComputeError::device(READ_BUFFER, CL_INVALID_MEM_OBJECT))?;
        out.copy_from_slice(&data[..out.len()]);
        Ok(())
    }
}

/// Убирает комментарии и проверяет парность скобок.
/// Возвращает очищенный текст и сообщения об ошибках в стиле компилятора.
fn strip_and_check(name: &str, source: &str) -> (String, Vec<String>) {
    let mut stripped = String::with_capacity(source.len());
    let mut errors = Vec::new();
    let mut open: Vec<(char, usize)> = Vec::new();
    let mut line = 1;
    let mut chars = source.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '/' if chars.peek() == Some(&'/') => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        line += 1;
                        stripped.push('\n');
                        break;
                    }
                }
                continue;
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = ' ';
                let mut closed = false;
                for next in chars.by_ref() {
                    if next == '\n' {
                        line += 1;
                    }
                    if prev == '*' && next == '/' {
                        closed = true;
                        break;
                    }
                    prev = next;
                }
                if !closed {
                    errors.push(format!("{}:{}: error: unterminated comment", name, line));
                }
                stripped.push(' ');
                continue;
            }
            '\n' => line += 1,
            '{' | '(' | '[' => open.push((c, line)),
            '}' | ')' | ']' => {
                let expected = match c {
                    '}' => '{',
                    ')' => '(',
                    _ => '[',
                };
                match open.pop() {
                    Some((opened, _)) if opened == expected => {}
                    _ => errors.push(format!("{}:{}: error: unexpected '{}'", name, line, c)),
                }
            }
            _ => {}
        }
        stripped.push(c);
    }

    for (opened, at) in open {
        errors.push(format!("{}:{}: error: unmatched '{}'", name, at, opened));
    }
    (stripped, errors)
}

/// Функции `__kernel void <имя>(...)` и число их параметров
fn kernel_signatures(source: &str) -> Vec<(String, usize)> {
    let mut kernels = Vec::new();
    let mut rest = source;

    while let Some(open) = rest.find('(') {
        let Some(close) = rest[open..].find(')').map(|offset| open + offset) else {
            break;
        };
        let head: Vec<&str> = rest[..open].split_whitespace().rev().take(3).collect();
        if let [name, "void", "__kernel" | "kernel"] = head[..] {
            let params = rest[open + 1..close].trim();
            let count = if params.is_empty() || params == "void" {
                0
            } else {
                params.split(',').count()
            };
            kernels.push((name.to_string(), count));
        }
        rest = &rest[close + 1..];
    }
    kernels
}

/// Опции сборки начинаются с `-`; у `-D` и `-I` значение может идти
/// отдельным словом (`-D TILE=16`, `-I include`)
fn check_build_options(options: &str) -> ComputeResult<()> {
    let invalid = || ComputeError::device("clBuildProgram", CL_INVALID_BUILD_OPTIONS);
    let mut tokens = options.split_whitespace();
    while let Some(token) = tokens.next() {
        if !token.starts_with('-') {
            return Err(invalid());
        }
        if token == "-D" || token == "-I" {
            tokens.next().ok_or_else(invalid)?;
        }
    }
    Ok(())
}

fn check_range(range: &NdRange) -> ComputeResult<()> {
    if range.global().iter().any(|&size| size == 0) {
        return Err(ComputeError::device(ENQUEUE_KERNEL, CL_INVALID_GLOBAL_WORK_SIZE));
    }
    if let Some(local) = range.local() {
        let divides = range
            .global()
            .iter()
            .zip(local)
            .all(|(&global, &local)| local > 0 && global % local == 0);
        if !divides {
            return Err(ComputeError::device(ENQUEUE_KERNEL, CL_INVALID_WORK_GROUP_SIZE));
        }
    }
    Ok(())
}

fn int_arg(args: &[KernelArg<'_, HostBuffer>], index: usize) -> ComputeResult<usize> {
    match args.get(index) {
        Some(KernelArg::Int(value)) => usize::try_from(*value)
            .map_err(|_| ComputeError::device(SET_KERNEL_ARG, CL_INVALID_ARG_VALUE)),
        _ => Err(ComputeError::device(SET_KERNEL_ARG, CL_INVALID_KERNEL_ARGS)),
    }
}

fn local_arg(args: &[KernelArg<'_, HostBuffer>], index: usize) -> ComputeResult<usize> {
    match args.get(index) {
        Some(KernelArg::Local(bytes)) => Ok(*bytes),
        _ => Err(ComputeError::device(SET_KERNEL_ARG, CL_INVALID_KERNEL_ARGS)),
    }
}

fn buffer_arg<'a>(
    args: &[KernelArg<'a, HostBuffer>],
    index: usize,
    writes: bool,
) -> ComputeResult<&'a HostBuffer> {
    let buffer = match args.get(index) {
        Some(KernelArg::Buffer(buffer)) => *buffer,
        _ => return Err(ComputeError::device(SET_KERNEL_ARG, CL_INVALID_KERNEL_ARGS)),
    };
    let allowed = if writes {
        buffer.access.kernel_writable()
    } else {
        buffer.access.kernel_readable()
    };
    if !allowed {
        return Err(ComputeError::device(ENQUEUE_KERNEL, CL_INVALID_MEM_OBJECT));
    }
    Ok(buffer)
}

fn expect_arg_count(args: &[KernelArg<'_, HostBuffer>], count: usize) -> ComputeResult<()> {
    if args.len() != count {
        return Err(ComputeError::device(ENQUEUE_KERNEL, CL_INVALID_KERNEL_ARGS));
    }
    Ok(())
}

fn out_of_resources() -> ComputeError {
    ComputeError::device(ENQUEUE_KERNEL, CL_OUT_OF_RESOURCES)
}

/// `mmul(k_dim, a, b, c, a_tile, b_tile[, c_width, c_height])`.
///
/// Без двух последних аргументов размеры результата равны глобальному размеру.
fn run_mmul(range: &NdRange, args: &[KernelArg<'_, HostBuffer>]) -> ComputeResult<()> {
    let k_dim = int_arg(args, 0)?;
    let a = buffer_arg(args, 1, false)?;
    let b = buffer_arg(args, 2, false)?;
    let c = buffer_arg(args, 3, true)?;
    let a_tile_bytes = local_arg(args, 4)?;
    let b_tile_bytes = local_arg(args, 5)?;

    let (global_x, global_y, block) = match (range.global(), range.local()) {
        (&[gx, gy], Some(&[lx, ly])) if lx == ly => (gx, gy, lx),
        _ => return Err(ComputeError::device(ENQUEUE_KERNEL, CL_INVALID_WORK_GROUP_SIZE)),
    };

    let (c_width, c_height) = match MmulSignature::from_arg_count(args.len()) {
        Some(MmulSignature::Bounded) => (int_arg(args, 6)?, int_arg(args, 7)?),
        Some(MmulSignature::Exact) => (global_x, global_y),
        None => return Err(ComputeError::device(ENQUEUE_KERNEL, CL_INVALID_KERNEL_ARGS)),
    };

    let tile_bytes = block * block * std::mem::size_of::<f32>();
    if a_tile_bytes < tile_bytes || b_tile_bytes < tile_bytes {
        return Err(ComputeError::device(SET_KERNEL_ARG, CL_INVALID_ARG_SIZE));
    }
    if std::ptr::eq(a, c) || std::ptr::eq(b, c) {
        return Err(ComputeError::device(ENQUEUE_KERNEL, CL_INVALID_MEM_OBJECT));
    }

    let a = a.read()?;
    let b = b.read()?;
    let mut c = c.write()?;
    if a.len() < c_height * k_dim || b.len() < k_dim * c_width || c.len() < c_height * c_width {
        return Err(out_of_resources());
    }

    let mut a_tile = vec![0.0f32; block * block];
    let mut b_tile = vec![0.0f32; block * block];
    let mut sums = vec![0.0f32; block * block];
    let num_blocks = (k_dim + block - 1) / block;

    for group_y in (0..global_y).step_by(block) {
        for group_x in (0..global_x).step_by(block) {
            sums.iter_mut().for_each(|sum| *sum = 0.0);

            for tile in 0..num_blocks {
                // Фаза загрузки: каждый work-item кладёт по элементу в оба тайла
                for local_row in 0..block {
                    for local_col in 0..block {
                        let row = group_y + local_row;
                        let col = group_x + local_col;
                        let a_col = tile * block + local_col;
                        let b_row = tile * block + local_row;
                        let slot = local_row * block + local_col;

                        a_tile[slot] = if row < c_height && a_col < k_dim {
                            a[row * k_dim + a_col]
                        } else {
                            0.0
                        };
                        b_tile[slot] = if b_row < k_dim && col < c_width {
                            b[b_row * c_width + col]
                        } else {
                            0.0
                        };
                    }
                }

                // barrier(CLK_LOCAL_MEM_FENCE)
                for local_row in 0..block {
                    for local_col in 0..block {
                        let sum = &mut sums[local_row * block + local_col];
                        for i in 0..block {
                            *sum = a_tile[local_row * block + i].mul_add(b_tile[i * block + local_col], *sum);
                        }
                    }
                }
            }

            for local_row in 0..block {
                for local_col in 0..block {
                    let row = group_y + local_row;
                    let col = group_x + local_col;
                    if row < c_height && col < c_width {
                        c[row * c_width + col] = sums[local_row * block + local_col];
                    }
                }
            }
        }
    }
    Ok(())
}

/// `matrixVectorMul(result, matrix, vector, width)`
fn run_matrix_vector_mul(range: &NdRange, args: &[KernelArg<'_, HostBuffer>]) -> ComputeResult<()> {
    expect_arg_count(args, 4)?;
    let result = buffer_arg(args, 0, true)?;
    let matrix = buffer_arg(args, 1, false)?;
    let vector = buffer_arg(args, 2, false)?;
    let width = int_arg(args, 3)?;

    let rows = match range.global() {
        &[rows] => rows,
        _ => return Err(ComputeError::device(ENQUEUE_KERNEL, CL_INVALID_WORK_DIMENSION)),
    };
    if std::ptr::eq(result, matrix) || std::ptr::eq(result, vector) {
        return Err(ComputeError::device(ENQUEUE_KERNEL, CL_INVALID_MEM_OBJECT));
    }

    let matrix = matrix.read()?;
    let vector = vector.read()?;
    let mut result = result.write()?;
    if matrix.len() < rows * width || vector.len() < width || result.len() < rows {
        return Err(out_of_resources());
    }

    for row in 0..rows {
        let line = &matrix[row * width..(row + 1) * width];
        result[row] = line.iter().zip(&vector[..width]).map(|(m, v)| m * v).sum();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::BLOCK_SIZE;

    fn program(device: &HostDevice, kind: KernelKind) -> HostProgram {
        device
            .build_program(kind.source_file(), kind.builtin_source(), "")
            .unwrap()
    }

    #[test]
    fn builtin_programs_expose_entry_points() {
        let device = HostDevice::new();
        for kind in KernelKind::ALL {
            let program = program(&device, kind);
            assert_eq!(program.entry_points(), vec![kind.entry_point()]);
        }
        let mmul = program(&device, KernelKind::MatrixMultiply);
        assert_eq!(device.kernel_arg_count(&mmul, "mmul").unwrap(), 8);
        let matvec = program(&device, KernelKind::MatrixVectorMultiply);
        assert_eq!(device.kernel_arg_count(&matvec, "matrixVectorMul").unwrap(), 4);
    }

    #[test]
    fn unbalanced_source_fails_with_log() {
        let device = HostDevice::new();
        let err = device
            .build_program("broken.cl", "__kernel void mmul(int n) {\n  if (n) {\n}", "")
            .unwrap_err();
        match err {
            ComputeError::BuildFailure { program, log } => {
                assert_eq!(program, "broken.cl");
                assert!(log.contains("unmatched '{'"), "log: {log}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn source_without_kernels_fails() {
        let device = HostDevice::new();
        let err = device.build_program("empty.cl", "// nothing here\n", "").unwrap_err();
        assert!(matches!(err, ComputeError::BuildFailure { .. }));
    }

    #[test]
    fn comments_do_not_count_as_delimiters() {
        let device = HostDevice::new();
        let source = "/* ( */ __kernel void k(int a) { // }\n}";
        let program = device.build_program("k.cl", source, "").unwrap();
        assert_eq!(program.entry_points(), vec!["k"]);
        assert_eq!(program.arg_count("k"), Some(1));
    }

    #[test]
    fn invalid_build_options_are_rejected() {
        let device = HostDevice::new();
        let err = device
            .build_program("k.cl", "__kernel void k() {}", "fast")
            .unwrap_err();
        assert_eq!(err.code(), Some(CL_INVALID_BUILD_OPTIONS));
    }

    #[test]
    fn build_option_values_may_be_separate_words() {
        let device = HostDevice::new();
        let source = "__kernel void k() {}";
        assert!(device.build_program("k.cl", source, "-D TILE=16 -cl-mad-enable").is_ok());
        assert!(device.build_program("k.cl", source, "-I include -DFAST").is_ok());

        let err = device.build_program("k.cl", source, "-cl-mad-enable -D").unwrap_err();
        assert_eq!(err.code(), Some(CL_INVALID_BUILD_OPTIONS));
    }

    #[test]
    fn void_parameter_list_has_no_arguments() {
        let device = HostDevice::new();
        let program = device
            .build_program("k.cl", "kernel void a(void) {}\n__kernel void b(int x, int y) {}", "")
            .unwrap();
        assert_eq!(program.arg_count("a"), Some(0));
        assert_eq!(program.arg_count("b"), Some(2));
        assert_eq!(program.arg_count("c"), None);
    }

    #[test]
    fn write_only_buffer_starts_undefined() {
        let device = HostDevice::new();
        let queue = device.create_queue().unwrap();
        let buffer = device.create_buffer(AccessMode::WriteOnly, 8, None).unwrap();
        let mut out = [0.0f32; 2];
        device.read_buffer(&queue, &buffer, &mut out).unwrap();
        assert!(out.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn read_beyond_buffer_is_rejected() {
        let device = HostDevice::new();
        let queue = device.create_queue().unwrap();
        let buffer = device
            .create_buffer(AccessMode::ReadOnly, 8, Some(&[1.0, 2.0]))
            .unwrap();
        let mut out = [0.0f32; 3];
        let err = device.read_buffer(&queue, &buffer, &mut out).unwrap_err();
        assert_eq!(err.code(), Some(CL_INVALID_VALUE));
    }

    #[test]
    fn copy_mode_requires_host_data() {
        let device = HostDevice::new();
        let err = device.create_buffer(AccessMode::ReadOnly, 8, None).unwrap_err();
        assert_eq!(err.code(), Some(CL_INVALID_HOST_PTR));
    }

    #[test]
    fn memory_limit_and_release_are_tracked() {
        let device = HostDevice::with_memory_limit(16);
        let first = device.create_buffer(AccessMode::WriteOnly, 12, None).unwrap();
        assert_eq!(device.allocated_bytes(), 12);

        let err = device.create_buffer(AccessMode::WriteOnly, 8, None).unwrap_err();
        assert_eq!(err.code(), Some(CL_MEM_OBJECT_ALLOCATION_FAILURE));

        drop(first);
        assert_eq!(device.allocated_bytes(), 0);
        assert!(device.create_buffer(AccessMode::WriteOnly, 16, None).is_ok());
    }

    #[test]
    fn mmul_rejects_partial_work_groups() {
        let device = HostDevice::new();
        let queue = device.create_queue().unwrap();
        let program = program(&device, KernelKind::MatrixMultiply);
        let a = device.create_buffer(AccessMode::ReadOnly, 16, Some(&[1.0; 4])).unwrap();
        let b = device.create_buffer(AccessMode::ReadOnly, 16, Some(&[1.0; 4])).unwrap();
        let c = device.create_buffer(AccessMode::WriteOnly, 16, None).unwrap();
        let tile = BLOCK_SIZE * BLOCK_SIZE * 4;
        let args = [
            KernelArg::Int(2),
            KernelArg::Buffer(&a),
            KernelArg::Buffer(&b),
            KernelArg::Buffer(&c),
            KernelArg::Local(tile),
            KernelArg::Local(tile),
            KernelArg::Int(2),
            KernelArg::Int(2),
        ];

        let range = NdRange::tiled([2, 2], [BLOCK_SIZE, BLOCK_SIZE]);
        let err = device
            .enqueue_kernel(&queue, &program, "mmul", &range, &args)
            .unwrap_err();
        assert_eq!(err.code(), Some(CL_INVALID_WORK_GROUP_SIZE));
        assert_eq!(queue.submitted(), 0);
    }

    #[test]
    fn mmul_refuses_to_write_read_only_buffer() {
        let device = HostDevice::new();
        let queue = device.create_queue().unwrap();
        let program = program(&device, KernelKind::MatrixMultiply);
        let a = device.create_buffer(AccessMode::ReadOnly, 16, Some(&[1.0; 4])).unwrap();
        let b = device.create_buffer(AccessMode::ReadOnly, 16, Some(&[1.0; 4])).unwrap();
        let c = device.create_buffer(AccessMode::ReadOnly, 16, Some(&[0.0; 4])).unwrap();
        let tile = BLOCK_SIZE * BLOCK_SIZE * 4;
        let args = [
            KernelArg::Int(2),
            KernelArg::Buffer(&a),
            KernelArg::Buffer(&b),
            KernelArg::Buffer(&c),
            KernelArg::Local(tile),
            KernelArg::Local(tile),
            KernelArg::Int(2),
            KernelArg::Int(2),
        ];

        let range = NdRange::tiled([BLOCK_SIZE, BLOCK_SIZE], [BLOCK_SIZE, BLOCK_SIZE]);
        let err = device
            .enqueue_kernel(&queue, &program, "mmul", &range, &args)
            .unwrap_err();
        assert_eq!(err.code(), Some(CL_INVALID_MEM_OBJECT));
    }

    #[test]
    fn write_only_buffer_is_not_a_read_operand() {
        let device = HostDevice::new();
        let queue = device.create_queue().unwrap();
        let matvec = program(&device, KernelKind::MatrixVectorMultiply);
        let matrix = device
            .create_buffer(AccessMode::ReadOnly, 16, Some(&[1.0, 0.0, 0.0, 1.0]))
            .unwrap();
        let vector = device.create_buffer(AccessMode::WriteOnly, 8, None).unwrap();
        let result = device.create_buffer(AccessMode::WriteOnly, 8, None).unwrap();
        let args = [
            KernelArg::Buffer(&result),
            KernelArg::Buffer(&matrix),
            KernelArg::Buffer(&vector),
            KernelArg::Int(2),
        ];

        let err = device
            .enqueue_kernel(&queue, &matvec, "matrixVectorMul", &NdRange::linear(2), &args)
            .unwrap_err();
        assert_eq!(err.code(), Some(CL_INVALID_MEM_OBJECT));

        let mmul = program(&device, KernelKind::MatrixMultiply);
        let a = device.create_buffer(AccessMode::WriteOnly, 16, None).unwrap();
        let b = device.create_buffer(AccessMode::ReadOnly, 16, Some(&[1.0; 4])).unwrap();
        let c = device.create_buffer(AccessMode::WriteOnly, 16, None).unwrap();
        let tile = BLOCK_SIZE * BLOCK_SIZE * 4;
        let args = [
            KernelArg::Int(2),
            KernelArg::Buffer(&a),
            KernelArg::Buffer(&b),
            KernelArg::Buffer(&c),
            KernelArg::Local(tile),
            KernelArg::Local(tile),
            KernelArg::Int(2),
            KernelArg::Int(2),
        ];
        let range = NdRange::tiled([BLOCK_SIZE, BLOCK_SIZE], [BLOCK_SIZE, BLOCK_SIZE]);
        let err = device
            .enqueue_kernel(&queue, &mmul, "mmul", &range, &args)
            .unwrap_err();
        assert_eq!(err.code(), Some(CL_INVALID_MEM_OBJECT));
    }

    #[test]
    fn mmul_without_bounds_uses_global_size() {
        let device = HostDevice::new();
        let queue = device.create_queue().unwrap();
        let source = "__kernel void mmul(const int k, __global const float* a, \
                      __global const float* b, __global float* c, \
                      __local float* a_tile, __local float* b_tile) {}";
        let program = device.build_program("matmul_kernel.cl", source, "").unwrap();
        assert_eq!(device.kernel_arg_count(&program, "mmul").unwrap(), 6);

        let n = BLOCK_SIZE;
        let tile = n * n * 4;
        let ones = vec![1.0f32; n * n];
        let twos = vec![2.0f32; n * n];
        let a = device.create_buffer(AccessMode::ReadOnly, tile, Some(&ones)).unwrap();
        let b = device.create_buffer(AccessMode::ReadOnly, tile, Some(&twos)).unwrap();
        let c = device.create_buffer(AccessMode::WriteOnly, tile, None).unwrap();
        let args = [
            KernelArg::Int(n as i32),
            KernelArg::Buffer(&a),
            KernelArg::Buffer(&b),
            KernelArg::Buffer(&c),
            KernelArg::Local(tile),
            KernelArg::Local(tile),
        ];

        let range = NdRange::tiled([n, n], [n, n]);
        device.enqueue_kernel(&queue, &program, "mmul", &range, &args).unwrap();
        let mut out = vec![0.0f32; n * n];
        device.read_buffer(&queue, &c, &mut out).unwrap();
        assert!(out.iter().all(|&v| v == 2.0 * n as f32));

        // Лишние аргументы ядро не объявляет
        let extended = [
            KernelArg::Int(n as i32),
            KernelArg::Buffer(&a),
            KernelArg::Buffer(&b),
            KernelArg::Buffer(&c),
            KernelArg::Local(tile),
            KernelArg::Local(tile),
            KernelArg::Int(n as i32),
            KernelArg::Int(n as i32),
        ];
        let err = device
            .enqueue_kernel(&queue, &program, "mmul", &range, &extended)
            .unwrap_err();
        assert_eq!(err.code(), Some(CL_INVALID_ARG_INDEX));
        assert_eq!(queue.submitted(), 1);
    }

    #[test]
    fn mmul_with_undersized_scratch_fails() {
        let device = HostDevice::new();
        let queue = device.create_queue().unwrap();
        let program = program(&device, KernelKind::MatrixMultiply);
        let a = device.create_buffer(AccessMode::ReadOnly, 4, Some(&[2.0])).unwrap();
        let b = device.create_buffer(AccessMode::ReadOnly, 4, Some(&[3.0])).unwrap();
        let c = device.create_buffer(AccessMode::WriteOnly, 4, None).unwrap();
        let args = [
            KernelArg::Int(1),
            KernelArg::Buffer(&a),
            KernelArg::Buffer(&b),
            KernelArg::Buffer(&c),
            KernelArg::Local(4),
            KernelArg::Local(4),
            KernelArg::Int(1),
            KernelArg::Int(1),
        ];

        let range = NdRange::tiled([BLOCK_SIZE, BLOCK_SIZE], [BLOCK_SIZE, BLOCK_SIZE]);
        let err = device
            .enqueue_kernel(&queue, &program, "mmul", &range, &args)
            .unwrap_err();
        assert_eq!(err.code(), Some(CL_INVALID_ARG_SIZE));
    }

    #[test]
    fn unknown_entry_point_is_rejected() {
        let device = HostDevice::new();
        let queue = device.create_queue().unwrap();
        let program = program(&device, KernelKind::MatrixVectorMultiply);
        let err = device
            .enqueue_kernel(&queue, &program, "mmul", &NdRange::linear(1), &[])
            .unwrap_err();
        assert_eq!(err.code(), Some(CL_INVALID_KERNEL_NAME));
    }

    #[test]
    fn matrix_vector_mul_computes_row_dots() {
        let device = HostDevice::new();
        let queue = device.create_queue().unwrap();
        let program = program(&device, KernelKind::MatrixVectorMultiply);
        // 2 строки по 3 элемента
        let matrix = device
            .create_buffer(AccessMode::ReadOnly, 24, Some(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]))
            .unwrap();
        let vector = device
            .create_buffer(AccessMode::ReadOnly, 12, Some(&[1.0, 1.0, 1.0]))
            .unwrap();
        let result = device.create_buffer(AccessMode::WriteOnly, 8, None).unwrap();
        let args = [
            KernelArg::Buffer(&result),
            KernelArg::Buffer(&matrix),
            KernelArg::Buffer(&vector),
            KernelArg::Int(3),
        ];

        device
            .enqueue_kernel(&queue, &program, "matrixVectorMul", &NdRange::linear(2), &args)
            .unwrap();
        let mut out = [0.0f32; 2];
        device.read_buffer(&queue, &result, &mut out).unwrap();
        assert_eq!(out, [6.0, 15.0]);
        assert_eq!(queue.submitted(), 1);
    }
}

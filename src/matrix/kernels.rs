//! OpenCL ядра для матричных операций

/// Сторона тайла (и рабочей группы) матричного умножения
pub const BLOCK_SIZE: usize = 16;

/// Вид вычислительной программы
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KernelKind {
    MatrixMultiply,
    MatrixVectorMultiply,
}

impl KernelKind {
    pub const ALL: [KernelKind; 2] = [KernelKind::MatrixMultiply, KernelKind::MatrixVectorMultiply];

    /// Имя точки входа в программе
    pub fn entry_point(self) -> &'static str {
        match self {
            KernelKind::MatrixMultiply => "mmul",
            KernelKind::MatrixVectorMultiply => "matrixVectorMul",
        }
    }

    /// Имя файла с исходным кодом программы
    pub fn source_file(self) -> &'static str {
        match self {
            KernelKind::MatrixMultiply => "matmul_kernel.cl",
            KernelKind::MatrixVectorMultiply => "matvec_mul.cl",
        }
    }

    /// Встроенный исходный код программы
    pub fn builtin_source(self) -> &'static str {
        match self {
            KernelKind::MatrixMultiply => MATRIX_MULTIPLY_KERNEL,
            KernelKind::MatrixVectorMultiply => MATRIX_VECTOR_KERNEL,
        }
    }
}

/// Сигнатура `mmul` в собранной программе
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MmulSignature {
    /// `(k_dim, a, b, c, a_tile, b_tile)`: ширина и высота результата
    /// берутся из глобального размера, запуск ровно по размеру результата
    Exact,
    /// Те же шесть аргументов и `c_width, c_height`: глобальный размер
    /// дополняется до целого числа тайлов
    Bounded,
}

impl MmulSignature {
    pub fn from_arg_count(count: usize) -> Option<Self> {
        match count {
            6 => Some(MmulSignature::Exact),
            8 => Some(MmulSignature::Bounded),
            _ => None,
        }
    }

    pub fn arg_count(self) -> usize {
        match self {
            MmulSignature::Exact => 6,
            MmulSignature::Bounded => 8,
        }
    }
}

/// Тайловое умножение C = A * B.
///
/// Глобальный размер дополняется до целого числа тайлов, поэтому
/// ядро получает размеры результата и проверяет границы.
pub static MATRIX_MULTIPLY_KERNEL: &str = r#"
__kernel void mmul(
    const int k_dim,
    __global const float* a,
    __global const float* b,
    __global float* c,
    __local float* a_tile,
    __local float* b_tile,
    const int c_width,
    const int c_height
) {
    const int col = get_global_id(0);
    const int row = get_global_id(1);
    const int local_col = get_local_id(0);
    const int local_row = get_local_id(1);
    const int block_size = get_local_size(0);

    float sum = 0.0f;

    // Количество тайлов вдоль общей размерности
    const int num_blocks = (k_dim + block_size - 1) / block_size;

    for (int block = 0; block < num_blocks; block++) {
        const int a_col = block * block_size + local_col;
        const int b_row = block * block_size + local_row;

        // Загрузка тайлов в локальную память, вне матрицы нули
        a_tile[local_row * block_size + local_col] =
            (row < c_height && a_col < k_dim) ? a[row * k_dim + a_col] : 0.0f;
        b_tile[local_row * block_size + local_col] =
            (b_row < k_dim && col < c_width) ? b[b_row * c_width + col] : 0.0f;

        barrier(CLK_LOCAL_MEM_FENCE);

        for (int i = 0; i < block_size; i++) {
            sum = fma(a_tile[local_row * block_size + i], b_tile[i * block_size + local_col], sum);
        }

        barrier(CLK_LOCAL_MEM_FENCE);
    }

    if (row < c_height && col < c_width) {
        c[row * c_width + col] = sum;
    }
}
"#;

/// Умножение матрицы на вектор, один work-item на строку
pub static MATRIX_VECTOR_KERNEL: &str = r#"
__kernel void matrixVectorMul(
    __global float* result,
    __global const float* matrix,
    __global const float* vector,
    const int width
) {
    const int row = get_global_id(0);

    float sum = 0.0f;
    for (int i = 0; i < width; i++) {
        sum += matrix[row * width + i] * vector[i];
    }
    result[row] = sum;
}
"#;

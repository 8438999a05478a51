//! Типы матриц и связанные структуры

use std::fmt;
use std::ops::{Index, IndexMut};

/// Начальное заполнение матрицы
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixInit {
    /// Все элементы равны 0
    Zeros,
    /// Равномерное распределение на [0, 1)
    Random,
    /// Содержимое не задаётся вызывающим (память всё равно обнуляется)
    Uninitialized,
}

/// Плотная матрица из `W` столбцов и `H` строк, хранение построчное.
///
/// Матрица владеет своим хранилищем единолично: `Clone` не реализован,
/// передача возможна только перемещением, память освобождается при drop.
/// Нулевые размеры отвергаются на этапе компиляции.
#[derive(PartialEq)]
pub struct Matrix<const W: usize, const H: usize> {
    data: Box<[f32]>,
}

/// Вектор-строка из `N` элементов
pub type Vector<const N: usize> = Matrix<N, 1>;

impl<const W: usize, const H: usize> Matrix<W, H> {
    const NON_EMPTY: () = assert!(W > 0 && H > 0, "matrix dimensions must be > 0");

    pub(crate) fn from_storage(data: Box<[f32]>) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::NON_EMPTY;
        debug_assert_eq!(data.len(), W * H);
        Self { data }
    }

    pub const fn width(&self) -> usize {
        W
    }

    pub const fn height(&self) -> usize {
        H
    }

    /// Количество элементов, всегда `W * H`
    pub const fn size(&self) -> usize {
        W * H
    }

    pub const fn size_bytes(&self) -> usize {
        W * H * std::mem::size_of::<f32>()
    }

    /// Изменяемое представление сырого хранилища
    pub fn get(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data.into_vec()
    }

    /// Печатает матрицу в stdout построчно
    pub fn print(&self) {
        print!("{}", self);
    }
}

impl<const W: usize, const H: usize> Index<(usize, usize)> for Matrix<W, H> {
    type Output = f32;

    /// Элемент по индексу `(строка, столбец)`
    fn index(&self, (row, col): (usize, usize)) -> &f32 {
        assert!(row < H && col < W, "index ({row}, {col}) out of bounds for {W}x{H} matrix");
        &self.data[row * W + col]
    }
}

impl<const W: usize, const H: usize> IndexMut<(usize, usize)> for Matrix<W, H> {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut f32 {
        assert!(row < H && col < W, "index ({row}, {col}) out of bounds for {W}x{H} matrix");
        &mut self.data[row * W + col]
    }
}

impl<const W: usize, const H: usize> fmt::Display for Matrix<W, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.data.chunks(W) {
            for (i, value) in row.iter().enumerate() {
                if i > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{}", value)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl<const W: usize, const H: usize> fmt::Debug for Matrix<W, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Matrix")
            .field("width", &W)
            .field("height", &H)
            .field("data", &self.data)
            .finish()
    }
}

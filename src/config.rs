//! Конфигурация вычислительного движка

use crate::compute::{ComputeError, ComputeResult};
use crate::matrix::KernelKind;
use crate::opencl::types::*;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

/// Тип устройства OpenCL, выбираемого при открытии
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    #[default]
    Gpu,
    Cpu,
    All,
}

impl DeviceKind {
    pub fn device_type(self) -> cl_device_type {
        match self {
            DeviceKind::Gpu => CL_DEVICE_TYPE_GPU,
            DeviceKind::Cpu => CL_DEVICE_TYPE_CPU,
            DeviceKind::All => CL_DEVICE_TYPE_ALL,
        }
    }
}

/// Настройки устройства и сборки программ
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputeConfig {
    pub device_type: DeviceKind,
    /// Каталог с `matmul_kernel.cl` и `matvec_mul.cl`; без него
    /// используются встроенные ядра
    pub kernel_dir: Option<PathBuf>,
    pub build_options: String,
    /// Печатать результат умножения матрицы на вектор в stdout
    pub print_vector_results: bool,
}

impl ComputeConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Не удалось разобрать конфигурацию")
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Не удалось прочитать конфигурацию {}", path.display()))?;
        Self::from_json_str(&json)
    }

    /// Исходный код программы: файл из `kernel_dir` или встроенное ядро
    pub fn kernel_source(&self, kind: KernelKind) -> ComputeResult<Cow<'static, str>> {
        match &self.kernel_dir {
            Some(dir) => {
                let path = dir.join(kind.source_file());
                fs::read_to_string(&path).map(Cow::Owned).map_err(|err| {
                    ComputeError::KernelSourceUnavailable {
                        path: path.display().to_string(),
                        message: err.to_string(),
                    }
                })
            }
            None => Ok(Cow::Borrowed(kind.builtin_source())),
        }
    }
}

//! Вспомогательные функции и утилиты

use std::time::{Duration, Instant};

/// Измеряет время выполнения функции
pub fn measure_time<F, T>(f: F) -> (T, Duration)
where
    F: FnOnce() -> T,
{
    let start = Instant::now();
    let result = f();
    let duration = start.elapsed();
    (result, duration)
}

/// Производительность умножения `m`×`k` на `k`×`p` в GFLOP/s
pub fn gflops(m: usize, k: usize, p: usize, duration: Duration) -> f64 {
    let seconds = duration.as_secs_f64();
    if seconds == 0.0 {
        return 0.0;
    }
    2.0 * (m * k * p) as f64 / seconds / 1e9
}

// Reduce a raw Docker stats response to CPU% and memory MiB.

use crate::runtime::ContainerUsage;
use bollard::models::ContainerStatsResponse;

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

/// `None` when the sample lacks cpu or precpu data (e.g. first sample of a stream).
pub(crate) fn usage_from_stats(s: &ContainerStatsResponse) -> Option<ContainerUsage> {
    let cpu_stats = s.cpu_stats.as_ref()?;
    let precpu_stats = s.precpu_stats.as_ref()?;

    let cpu_usage = cpu_stats.cpu_usage.as_ref()?;
    let precpu_usage = precpu_stats.cpu_usage.as_ref()?;

    let cpu_delta =
        cpu_usage.total_usage.unwrap_or(0) as i64 - precpu_usage.total_usage.unwrap_or(0) as i64;
    let system_delta = cpu_stats.system_cpu_usage.unwrap_or(0) as i64
        - precpu_stats.system_cpu_usage.unwrap_or(0) as i64;
    let online = cpu_stats.online_cpus.unwrap_or(1) as f64;
    let cpu_percent = if system_delta > 0 && online > 0.0 {
        (cpu_delta as f64 / system_delta as f64) * online * 100.0
    } else {
        0.0
    };

    let mem_usage = s.memory_stats.as_ref().and_then(|m| m.usage).unwrap_or(0);

    Some(ContainerUsage {
        cpu_percent,
        memory_mb: mem_usage as f64 / BYTES_PER_MIB,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bollard::models::{ContainerCpuStats, ContainerCpuUsage, ContainerMemoryStats};

    fn cpu_stats(total_usage: u64, system_cpu_usage: u64) -> ContainerCpuStats {
        ContainerCpuStats {
            cpu_usage: Some(ContainerCpuUsage {
                total_usage: Some(total_usage),
                ..Default::default()
            }),
            system_cpu_usage: Some(system_cpu_usage),
            online_cpus: Some(2),
            throttling_data: None,
        }
    }

    #[test]
    fn missing_cpu_stats_yields_none() {
        let s = ContainerStatsResponse {
            cpu_stats: None,
            precpu_stats: Some(cpu_stats(0, 0)),
            ..Default::default()
        };
        assert!(usage_from_stats(&s).is_none());
    }

    #[test]
    fn missing_precpu_stats_yields_none() {
        let s = ContainerStatsResponse {
            cpu_stats: Some(cpu_stats(100, 1000)),
            precpu_stats: None,
            ..Default::default()
        };
        assert!(usage_from_stats(&s).is_none());
    }

    #[test]
    fn computes_cpu_percent_and_memory_mib() {
        let s = ContainerStatsResponse {
            cpu_stats: Some(cpu_stats(100_000_000, 1_000_000_000)),
            precpu_stats: Some(cpu_stats(50_000_000, 500_000_000)),
            memory_stats: Some(ContainerMemoryStats {
                usage: Some(256 * 1024 * 1024),
                ..Default::default()
            }),
            ..Default::default()
        };
        let out = usage_from_stats(&s).unwrap();
        // (100M-50M)/(1000M-500M) * 2 cpus * 100
        assert!((out.cpu_percent - 20.0).abs() < 0.01);
        assert!((out.memory_mb - 256.0).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_system_delta_gives_zero_cpu() {
        let s = ContainerStatsResponse {
            cpu_stats: Some(cpu_stats(100, 500)),
            precpu_stats: Some(cpu_stats(50, 500)),
            ..Default::default()
        };
        let out = usage_from_stats(&s).unwrap();
        assert_eq!(out.cpu_percent, 0.0);
        assert_eq!(out.memory_mb, 0.0);
    }
}

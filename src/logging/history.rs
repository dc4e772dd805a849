use super::{LoggingConfig, build_current_log_path};
use anyhow::{Context, Result};
use chrono::{Duration as ChronoDuration, Local, NaiveDate};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

/// 清理历史日志: 删除超过保留天数的文件, 按需压缩今天之前的明文日志
///
/// 返回删除与压缩的文件总数. 未配置目录或目录不存在时什么也不做.
pub fn prune_history(config: &LoggingConfig) -> Result<usize> {
    let Some(directory) = config.directory.as_deref().map(Path::new) else {
        return Ok(0);
    };
    prune_history_at(directory, config, Local::now().date_naive())
}

fn prune_history_at(directory: &Path, config: &LoggingConfig, today: NaiveDate) -> Result<usize> {
    if !directory.exists() {
        return Ok(0);
    }
    let cutoff = today - ChronoDuration::days(config.retention_days);
    let current = build_current_log_path(directory, &config.file_prefix, today);
    let mut handled = 0;

    for entry in fs::read_dir(directory)
        .with_context(|| format!("读取日志目录失败, path={}", directory.display()))?
    {
        let entry = entry?;
        let file_name = entry.file_name().to_string_lossy().to_string();
        let file_path = entry.path();

        let Some((date, compressed)) = parse_rotated_log_name(&file_name, &config.file_prefix)
        else {
            continue;
        };

        if date < cutoff {
            if fs::remove_file(&file_path).is_ok() {
                handled += 1;
            }
            continue;
        }

        if config.compress_history && !compressed && date < today && file_path != current {
            if let Err(err) = compress_to_gz(&file_path) {
                tracing::warn!("压缩历史日志失败: {:#}", err);
            } else {
                handled += 1;
            }
        }
    }

    Ok(handled)
}

fn compress_to_gz(path: &Path) -> Result<()> {
    let gz_path = PathBuf::from(format!("{}.gz", path.display()));
    if gz_path.exists() {
        return Ok(());
    }

    let mut input =
        File::open(path).with_context(|| format!("打开待压缩日志失败, path={}", path.display()))?;
    let output = File::create(&gz_path)
        .with_context(|| format!("创建压缩日志失败, path={}", gz_path.display()))?;
    let mut encoder = GzEncoder::new(output, Compression::default());
    io::copy(&mut input, &mut encoder)?;
    encoder.finish()?;

    fs::remove_file(path)
        .with_context(|| format!("删除已压缩日志失败, path={}", path.display()))?;
    Ok(())
}

fn parse_rotated_log_name(file_name: &str, prefix: &str) -> Option<(NaiveDate, bool)> {
    let with_dot = file_name.strip_prefix(prefix)?.strip_prefix('.')?;

    if let Some(date_part) = with_dot.strip_suffix(".log") {
        return Some((parse_date(date_part)?, false));
    }
    if let Some(date_part) = with_dot.strip_suffix(".log.gz") {
        return Some((parse_date(date_part)?, true));
    }
    None
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    if value.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

//! 日志初始化.
//!
//! 控制台输出到 stderr (stdout 留给探测结果), 文件输出按日期命名为
//! `{prefix}.{YYYY-MM-DD}.log`, 跨日时在下一次写入时切换到新文件.
//! 库 crate 通过 `log` 门面输出的记录由 tracing-log 桥接进来.

use anyhow::{Context, Result};
use chrono::{Datelike, Local, NaiveDate, Timelike};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{self, FormatEvent, FormatFields, format::Writer},
    layer::{Layer, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
};

mod history;

pub use history::prune_history;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    /// 日志目录, 为空时不写文件
    #[serde(default)]
    pub directory: Option<String>,
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
    #[serde(default = "default_true")]
    pub compress_history: bool,
    #[serde(default = "default_true")]
    pub console: bool,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_file_prefix() -> String {
    "fhd".to_string()
}

fn default_true() -> bool {
    true
}

fn default_retention_days() -> i64 {
    30
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            directory: None,
            file_prefix: default_file_prefix(),
            retention_days: default_retention_days(),
            compress_history: true,
            console: true,
        }
    }
}

impl LoggingConfig {
    /// 从 JSON 文件读取配置, 缺省字段取默认值
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("读取日志配置失败, path={}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("解析日志配置失败, path={}", path.display()))
    }
}

static LOG_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

pub fn init(config: &LoggingConfig) -> Result<()> {
    let console_layer = config.console.then(|| {
        fmt::Layer::default()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .event_format(ConsoleFormatter)
            .with_filter(EnvFilter::new(&config.level))
    });

    let mut pruned = 0;
    let file_layer = match &config.directory {
        Some(directory) => {
            let directory = Path::new(directory);
            std::fs::create_dir_all(directory)
                .with_context(|| format!("创建日志目录失败, path={}", directory.display()))?;
            pruned = prune_history(config)?;

            let (non_blocking, guard) =
                tracing_appender::non_blocking(CurrentFileWriter::new(directory, &config.file_prefix)?);
            LOG_GUARD.set(guard).ok();

            Some(
                fmt::Layer::default()
                    .with_writer(non_blocking)
                    .with_ansi(false)
                    .event_format(FileFormatter)
                    .with_filter(EnvFilter::new(&config.level)),
            )
        }
        None => None,
    };

    Registry::default()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("初始化日志订阅器失败")?;
    if pruned > 0 {
        tracing::debug!("已清理历史日志 {} 个", pruned);
    }
    Ok(())
}

/// 按当天日期写入的日志文件
struct CurrentFileWriter {
    directory: PathBuf,
    prefix: String,
    date: NaiveDate,
    file: File,
}

impl CurrentFileWriter {
    fn new(directory: &Path, prefix: &str) -> Result<Self> {
        let date = Local::now().date_naive();
        let file = open_append_file(&build_current_log_path(directory, prefix, date))?;
        Ok(Self {
            directory: directory.to_path_buf(),
            prefix: prefix.to_string(),
            date,
            file,
        })
    }
}

impl Write for CurrentFileWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let today = Local::now().date_naive();
        if today != self.date {
            let path = build_current_log_path(&self.directory, &self.prefix, today);
            self.file = open_append_file(&path).map_err(std::io::Error::other)?;
            self.date = today;
        }
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.file.flush()
    }
}

fn open_append_file(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("打开日志文件失败, path={}", path.display()))
}

pub(crate) fn build_current_log_path(directory: &Path, prefix: &str, date: NaiveDate) -> PathBuf {
    directory.join(format!("{}.{}.log", prefix, date.format("%Y-%m-%d")))
}

struct ConsoleFormatter;

impl<S, N> FormatEvent<S, N> for ConsoleFormatter
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &fmt::FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let now = Local::now();
        let meta = event.metadata();
        write!(
            writer,
            "[{:02}:{:02}:{:02}.{:03}] ",
            now.hour(),
            now.minute(),
            now.second(),
            now.timestamp_subsec_millis()
        )?;
        let color = match *meta.level() {
            tracing::Level::ERROR => "\x1b[31m",
            tracing::Level::WARN => "\x1b[33m",
            tracing::Level::INFO => "\x1b[32m",
            _ => "\x1b[34m",
        };
        write!(writer, "{}{:5}\x1b[0m {} > ", color, meta.level().to_string(), meta.target())?;
        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

struct FileFormatter;

impl<S, N> FormatEvent<S, N> for FileFormatter
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &fmt::FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let now = Local::now();
        let meta = event.metadata();
        write!(
            writer,
            "[{:02}-{:02} {:02}:{:02}:{:02}.{:03}] {:5} {}:{} > ",
            now.month(),
            now.day(),
            now.hour(),
            now.minute(),
            now.second(),
            now.timestamp_subsec_millis(),
            meta.level().to_string(),
            meta.file().unwrap_or("unknown"),
            meta.line().unwrap_or(0)
        )?;
        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_build_current_log_path() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 6);
        match date {
            Some(date) => {
                let path = build_current_log_path(Path::new("logs"), "probe", date);
                assert_eq!(path, PathBuf::from("logs/probe.2026-02-06.log"));
            }
            None => panic!("测试日期初始化失败"),
        }
    }

    #[test]
    fn test_配置缺省字段() {
        let config: LoggingConfig = match serde_json::from_str(r#"{"level":"debug"}"#) {
            Ok(config) => config,
            Err(err) => panic!("解析配置失败: {}", err),
        };
        assert_eq!(config.level, "debug");
        assert_eq!(config.directory, None);
        assert_eq!(config.file_prefix, "fhd");
        assert_eq!(config.retention_days, 30);
        assert!(config.compress_history);
        assert!(config.console);
    }

    #[test]
    fn test_从文件读取配置() {
        let temp_dir = match TempDir::new() {
            Ok(temp_dir) => temp_dir,
            Err(err) => panic!("创建临时目录失败: {}", err),
        };
        let path = temp_dir.path().join("logging.json");
        let written = std::fs::write(
            &path,
            r#"{"level":"warn","directory":"logs","retention_days":7,"console":false}"#,
        );
        assert!(written.is_ok());

        let config = LoggingConfig::from_json_file(&path);
        assert!(config.is_ok(), "读取配置失败: {:?}", config.err());
        let config = config.unwrap_or_default();
        assert_eq!(config.directory.as_deref(), Some("logs"));
        assert_eq!(config.retention_days, 7);
        assert!(!config.console);

        assert!(LoggingConfig::from_json_file(&temp_dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_日期写入器创建当天文件() {
        let temp_dir = match TempDir::new() {
            Ok(temp_dir) => temp_dir,
            Err(err) => panic!("创建临时目录失败: {}", err),
        };
        let writer = CurrentFileWriter::new(temp_dir.path(), "probe");
        assert!(writer.is_ok(), "创建写入器失败: {:?}", writer.err());
        let mut writer = match writer {
            Ok(writer) => writer,
            Err(err) => panic!("{}", err),
        };
        assert!(writer.write_all(b"hello\n").is_ok());
        assert!(writer.flush().is_ok());

        let path = build_current_log_path(temp_dir.path(), "probe", writer.date);
        let content = std::fs::read_to_string(path);
        assert_eq!(content.ok().as_deref(), Some("hello\n"));
    }
}

//! fhd-probe - 流探测工具
//!
//! 识别容器格式, 按固定块大小把文件送入解封装器 (模拟网络分片到达),
//! 结束时 flush, 输出每个轨道的摘要.

use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use fhd::core::Rational;
use fhd::logging::{self, LoggingConfig};
use fhd_format::{ContainerFormat, DemuxOptions, DemuxOutput, create_demuxer, detect};
use log::info;
use serde::Serialize;

/// 探测至少需要的头部字节 (3 个 TS 包)
const PROBE_SIZE: usize = 188 * 3 + 1;

/// fhd 流探测工具
#[derive(Parser, Debug)]
#[command(name = "fhd-probe", version, about = "MPEG-TS / FLV 流探测工具")]
struct Cli {
    /// 输入文件路径
    input: PathBuf,

    /// 每次送入的字节数
    #[arg(long, default_value_t = 64 * 1024)]
    chunk_size: usize,

    /// 视频起始时间 (秒)
    #[arg(long)]
    start_time: Option<f64>,

    /// 输出 JSON 格式
    #[arg(long)]
    json: bool,

    /// 日志级别
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// 日志配置文件 (JSON)
    #[arg(long)]
    log_config: Option<PathBuf>,
}

// ============================================================
// 输出结构体
// ============================================================

/// 完整探测结果
#[derive(Serialize, Debug)]
struct ProbeOutput {
    filename: String,
    format_name: String,
    bytes: u64,
    calls: u32,
    warnings: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    video: Option<VideoSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    audio: Option<AudioSummary>,
}

/// 视频轨道摘要
#[derive(Serialize, Debug, Default, PartialEq)]
struct VideoSummary {
    codec: String,
    width: u32,
    height: u32,
    sample_aspect_ratio: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    frame_rate: Option<f64>,
    timescale: u32,
    samples: u64,
    key_frames: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    first_pts: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_pts: Option<i64>,
    dropped: u32,
}

/// 音频轨道摘要
#[derive(Serialize, Debug, Default, PartialEq)]
struct AudioSummary {
    codec: String,
    sample_rate: u32,
    channels: u8,
    timescale: u32,
    samples: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    first_pts: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_pts: Option<i64>,
    dropped: u32,
    inserted: u32,
}

/// 跨调用累积轨道统计
#[derive(Debug, Default)]
struct Collector {
    video: VideoSummary,
    audio: AudioSummary,
    calls: u32,
    warnings: usize,
}

impl Collector {
    fn absorb(&mut self, out: &DemuxOutput<'_>) {
        self.calls += 1;

        let track = out.video_track;
        let video = &mut self.video;
        video.codec = track.codec_string.clone();
        video.width = track.width;
        video.height = track.height;
        video.sample_aspect_ratio = track.sar.to_string();
        video.frame_rate = track.frame_rate.map(Rational::to_f64);
        video.timescale = track.timescale;
        video.dropped = track.dropped;
        video.samples += track.samples.len() as u64;
        video.key_frames += track.samples.iter().filter(|s| s.key).count() as u64;
        if let Some(first) = track.samples.first() {
            video.first_pts.get_or_insert(first.pts);
        }
        if let Some(last) = track.samples.last() {
            video.last_pts = Some(last.pts);
        }

        let track = out.audio_track;
        let audio = &mut self.audio;
        audio.codec = track.codec_string.clone();
        audio.sample_rate = track.sample_rate;
        audio.channels = track.channel_count;
        audio.timescale = track.timescale;
        audio.dropped = track.dropped;
        audio.inserted = track.inserted;
        audio.samples += track.samples.len() as u64;
        if let Some(first) = track.samples.first() {
            audio.first_pts.get_or_insert(first.pts);
        }
        if let Some(last) = track.samples.last() {
            audio.last_pts = Some(last.pts);
        }
    }

    fn finish(self, filename: String, format: ContainerFormat, bytes: u64) -> ProbeOutput {
        ProbeOutput {
            filename,
            format_name: format.name().to_string(),
            bytes,
            calls: self.calls,
            warnings: self.warnings,
            video: (self.video.samples > 0 || !self.video.codec.is_empty()).then_some(self.video),
            audio: (self.audio.samples > 0 || !self.audio.codec.is_empty()).then_some(self.audio),
        }
    }
}

// ============================================================
// 主逻辑
// ============================================================

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = match &cli.log_config {
        Some(path) => LoggingConfig::from_json_file(path)?,
        None => LoggingConfig {
            level: cli.log_level.clone(),
            ..LoggingConfig::default()
        },
    };
    logging::init(&log_config)?;

    let output = probe_file(&cli)?;
    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("序列化探测结果失败")?
        );
    } else {
        print_text(&output);
    }
    Ok(())
}

fn probe_file(cli: &Cli) -> Result<ProbeOutput> {
    if cli.chunk_size == 0 {
        bail!("chunk-size 必须大于 0");
    }
    let mut file = File::open(&cli.input)
        .with_context(|| format!("无法打开文件, path={}", cli.input.display()))?;

    let mut head = Vec::with_capacity(PROBE_SIZE);
    (&mut file)
        .take(PROBE_SIZE as u64)
        .read_to_end(&mut head)
        .context("读取文件头失败")?;
    let Some(format) = detect(&head) else {
        bail!("无法识别容器格式, path={}", cli.input.display());
    };
    info!("格式: {}", format);

    let mut demuxer = create_demuxer(format);
    let mut collector = Collector::default();
    let mut options = DemuxOptions::default();
    if let Some(start_time) = cli.start_time {
        options = options.with_start_time(start_time);
    }

    let mut total = 0u64;
    let mut pending = head;
    let mut buf = vec![0u8; cli.chunk_size];
    loop {
        while pending.len() >= cli.chunk_size {
            let rest = pending.split_off(cli.chunk_size);
            let out = demuxer.demux(&pending, &options)?;
            collector.absorb(&out);
            collector.warnings += demuxer.warnings().len();
            total += pending.len() as u64;
            pending = rest;
        }
        let read = file.read(&mut buf).context("读取文件失败")?;
        if read == 0 {
            break;
        }
        pending.extend_from_slice(&buf[..read]);
    }
    if !pending.is_empty() {
        let out = demuxer.demux(&pending, &options)?;
        collector.absorb(&out);
        collector.warnings += demuxer.warnings().len();
        total += pending.len() as u64;
    }
    let out = demuxer.flush();
    collector.absorb(&out);
    collector.warnings += demuxer.warnings().len();

    Ok(collector.finish(cli.input.display().to_string(), format, total))
}

/// 文本输出
fn print_text(output: &ProbeOutput) {
    println!("[FORMAT]");
    println!("  文件名       : {}", output.filename);
    println!("  格式名称     : {}", output.format_name);
    println!("  字节数       : {}", output.bytes);
    println!("  调用次数     : {}", output.calls);
    println!("  警告数       : {}", output.warnings);
    println!("[/FORMAT]");
    println!();

    if let Some(video) = &output.video {
        println!("[VIDEO]");
        println!("  编解码器     : {}", video.codec);
        println!("  分辨率       : {}x{}", video.width, video.height);
        println!("  SAR          : {}", video.sample_aspect_ratio);
        if let Some(fps) = video.frame_rate {
            println!("  帧率         : {:.3} fps", fps);
        }
        println!("  时钟         : {}", video.timescale);
        println!("  样本数       : {} (关键帧 {})", video.samples, video.key_frames);
        if let (Some(first), Some(last)) = (video.first_pts, video.last_pts) {
            println!("  PTS 范围     : {} .. {}", first, last);
        }
        println!("  丢弃         : {}", video.dropped);
        println!("[/VIDEO]");
        println!();
    }

    if let Some(audio) = &output.audio {
        println!("[AUDIO]");
        println!("  编解码器     : {}", audio.codec);
        println!("  采样率       : {} Hz", audio.sample_rate);
        println!("  声道数       : {}", audio.channels);
        println!("  时钟         : {}", audio.timescale);
        println!("  样本数       : {}", audio.samples);
        if let (Some(first), Some(last)) = (audio.first_pts, audio.last_pts) {
            println!("  PTS 范围     : {} .. {}", first, last);
        }
        println!("  丢弃 / 补入  : {} / {}", audio.dropped, audio.inserted);
        println!("[/AUDIO]");
        println!();
    }
}

//! 解封装器 (Demuxer) trait 定义.
//!
//! 与拉取式读取不同, 这里的解封装器是推入式的: 调用方按到达顺序逐段送入字节,
//! 每次调用后从轨道中取走本次产出的样本. 同一实例的调用必须串行且保持顺序.

use fhd_core::FhdResult;
use thiserror::Error;

use crate::format_id::ContainerFormat;
use crate::track::{AudioTrack, VideoTrack};

/// 单次解封装调用的参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DemuxOptions {
    /// 硬复位: 清空全部轨道状态, PID 发现与累积缓冲
    pub discontinuity: bool,
    /// 时间戳校正是否把本次样本视为上一次的延续
    pub contiguous: bool,
    /// 非连续调用时视频起始时间 (秒)
    pub start_time: Option<f64>,
}

impl Default for DemuxOptions {
    fn default() -> Self {
        Self {
            discontinuity: false,
            contiguous: true,
            start_time: None,
        }
    }
}

impl DemuxOptions {
    /// 设置 discontinuity
    pub fn with_discontinuity(mut self, discontinuity: bool) -> Self {
        self.discontinuity = discontinuity;
        self
    }

    /// 设置 contiguous
    pub fn with_contiguous(mut self, contiguous: bool) -> Self {
        self.contiguous = contiguous;
        self
    }

    /// 设置起始时间 (秒)
    pub fn with_start_time(mut self, start_time: f64) -> Self {
        self.start_time = Some(start_time);
        self
    }
}

/// 一次调用的产出: 被原地修改的两个轨道
#[derive(Debug, Clone, Copy)]
pub struct DemuxOutput<'a> {
    /// 视频轨道, `samples` 只含本次产出
    pub video_track: &'a VideoTrack,
    /// 音频轨道, `samples` 只含本次产出
    pub audio_track: &'a AudioTrack,
}

/// 可恢复的异常, 只用于诊断, 不会中断解封装
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DemuxWarning {
    /// PES 头部无效或不完整
    #[error("PES 解析失败: pid={pid:#06x}")]
    InvalidPes { pid: u16 },
    /// PMT 之后出现未映射的 PID
    #[error("未知 PID: {0:#06x}")]
    UnknownPid(u16),
    /// PMT 中未支持的 stream_type
    #[error("不支持的 stream_type: 0x{stream_type:02x}, pid={pid:#06x}")]
    UnsupportedStreamType { stream_type: u8, pid: u16 },
    /// 视频样本缺少 pts
    #[error("视频样本缺少 pts, 沿用上一样本时间戳={inherited}")]
    MissingVideoPts { inherited: bool },
    /// 音频 PES 缺少 pts 且无法推算
    #[error("音频 PES 缺少 pts, 已丢弃")]
    MissingAudioPts,
    /// 音频数据中未找到有效帧头
    #[error("音频帧头无效: {0}")]
    InvalidAudioFrame(&'static str),
    /// ADTS 第一个同步字之前的字节被跳过
    #[error("ADTS 跳过前导字节: {0}")]
    AdtsSkipped(usize),
    /// ADTS 末尾不完整帧被丢弃
    #[error("ADTS 末尾不完整帧: {0} 字节")]
    AdtsRemaining(usize),
    /// MPEG 音频帧超出 PES 剩余数据
    #[error("MPEG 音频帧损坏")]
    MpegAudioBroken,
    /// 编解码器配置解析失败
    #[error("编解码器配置无效: {0}")]
    InvalidConfig(String),
    /// 不支持的编解码器
    #[error("不支持的编解码器: {0}")]
    UnsupportedCodec(String),
    /// FLV 未知 tag 类型
    #[error("未知 FLV tag 类型: {0}")]
    UnknownTagType(u8),
    /// FLV 前一个 tag 大小不符
    #[error("PreviousTagSize 不匹配: expected={expected}, actual={actual}")]
    PrevTagSizeMismatch { expected: u32, actual: u32 },
    /// 对齐或续接时补入静音帧
    #[error("补入 {count} 个静音帧")]
    SilentFramesInserted { count: u32 },
    /// 对齐或续接时丢弃音频帧
    #[error("丢弃 {count} 个音频帧")]
    AudioFramesDropped { count: u32 },
    /// 首个视频样本 pts 被修正
    #[error("首个视频样本 pts 修正 {delta}")]
    VideoPtsAdjusted { delta: i64 },
    /// 视频解码时间与预期续接点不一致
    #[error("视频 dts 与预期相差 {delta}")]
    VideoDtsGap { delta: i64 },
    /// 时间戳差值过大, 视为时间轴跳变而不做补偿
    #[error("时间戳跳变 {delta}, 不补静音也不丢帧")]
    TimestampGapIgnored { delta: i64 },
    /// PMT 迟迟未到, 排队的包被丢弃
    #[error("PMT 之前排队的包过多, 丢弃 {0} 个")]
    QueuedPacketsDropped(usize),
}

/// 解封装器 trait
///
/// 使用流程:
/// 1. 循环调用 `demux()` 送入到达的字节, 每次取走轨道中的样本
/// 2. 流结束时调用 `flush()` 取出仍在等待的 PES 片段
/// 3. 切换到无关的新流时调用 `reset()` 或送入 `discontinuity = true`
pub trait Demuxer: Send {
    /// 获取格式标识
    fn format(&self) -> ContainerFormat;

    /// 解封装一段字节
    ///
    /// # 返回
    /// - `Ok(output)`: 轨道已更新, 样本列表只含本次产出
    /// - `Err(FhdError::FatalFormat)`: 同步字节或文件签名错误, 流不可用
    fn demux(&mut self, data: &[u8], options: &DemuxOptions) -> FhdResult<DemuxOutput<'_>>;

    /// 流结束: 输出仍在等待后继起始标志的片段
    fn flush(&mut self) -> DemuxOutput<'_>;

    /// 清空全部状态, 等同于下一次调用带 `discontinuity`
    fn reset(&mut self);

    /// 最近一次调用记录的警告
    fn warnings(&self) -> &[DemuxWarning];

    /// 视频轨道
    fn video_track(&self) -> &VideoTrack;

    /// 音频轨道
    fn audio_track(&self) -> &AudioTrack;
}

/// 记录警告并输出日志
pub(crate) fn push_warning(warnings: &mut Vec<DemuxWarning>, warning: DemuxWarning) {
    log::warn!("{}", warning);
    warnings.push(warning);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_默认参数() {
        let opts = DemuxOptions::default();
        assert!(!opts.discontinuity);
        assert!(opts.contiguous);
        assert_eq!(opts.start_time, None);

        let opts = DemuxOptions::default()
            .with_discontinuity(true)
            .with_contiguous(false)
            .with_start_time(1.5);
        assert!(opts.discontinuity && !opts.contiguous);
        assert_eq!(opts.start_time, Some(1.5));
    }

    #[test]
    fn test_警告文本() {
        let w = DemuxWarning::PrevTagSizeMismatch {
            expected: 20,
            actual: 19,
        };
        assert_eq!(w.to_string(), "PreviousTagSize 不匹配: expected=20, actual=19");
        assert_eq!(DemuxWarning::UnknownPid(0x101).to_string(), "未知 PID: 0x0101");
    }
}

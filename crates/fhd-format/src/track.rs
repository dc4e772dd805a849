//! 轨道与样本.
//!
//! 轨道由一个解封装器实例独占, 跨调用原地修改. 每次调用开始时只清空样本列表,
//! 编解码器配置与 PID 映射一直保留到显式 [`VideoTrack::reset`] / [`AudioTrack::reset`].

use bitflags::bitflags;
use bytes::Bytes;
use fhd_codec::codec_id::NalRole;
use fhd_codec::{AudioCodec, VideoCodec};
use fhd_core::Rational;

/// 视频轨道 ID
pub const VIDEO_TRACK_ID: u32 = 1;
/// 音频轨道 ID
pub const AUDIO_TRACK_ID: u32 = 2;

bitflags! {
    /// 视频样本依赖标志
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SampleFlags: u8 {
        /// 随机访问点
        const KEY = 1 << 0;
        /// 非同步样本
        const NON_SYNC = 1 << 1;
        /// 依赖其他样本解码
        const DEPENDS_ON_OTHERS = 1 << 2;
        /// 不被其他样本参考
        const NOT_DEPENDED_ON = 1 << 3;
    }
}

impl Default for SampleFlags {
    fn default() -> Self {
        Self::NON_SYNC | Self::DEPENDS_ON_OTHERS
    }
}

/// 视频样本 (一个访问单元)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoSample {
    /// 显示时间戳
    pub pts: i64,
    /// 解码时间戳
    pub dts: i64,
    /// NAL 单元 (不含起始码或长度前缀)
    pub units: Vec<Bytes>,
    /// 是否关键帧
    pub key: bool,
    /// 时长 (轨道时钟)
    pub duration: i64,
    /// 依赖标志
    pub flags: SampleFlags,
}

impl VideoSample {
    /// 创建空样本
    pub fn new(pts: i64, dts: i64) -> Self {
        Self {
            pts,
            dts,
            units: Vec::new(),
            key: false,
            duration: 0,
            flags: SampleFlags::default(),
        }
    }

    /// 由一组 NAL 单元创建样本
    pub fn with_units(pts: i64, dts: i64, units: Vec<Bytes>) -> Self {
        Self {
            units,
            ..Self::new(pts, dts)
        }
    }

    /// 合成时间偏移 (pts - dts)
    pub fn cts(&self) -> i64 {
        self.pts - self.dts
    }

    /// 标记为关键帧
    pub fn set_key(&mut self) {
        self.key = true;
        self.flags.insert(SampleFlags::KEY);
        self.flags.remove(SampleFlags::NON_SYNC | SampleFlags::DEPENDS_ON_OTHERS);
    }

    /// 全部 NAL 单元的字节数
    pub fn size(&self) -> usize {
        self.units.iter().map(Bytes::len).sum()
    }

    /// 按 NAL 类型推导关键帧与依赖标志
    pub(crate) fn classify_units(&mut self, codec: VideoCodec) {
        let mut has_slice = false;
        let mut has_key = false;
        let mut all_non_reference = true;
        for unit in &self.units {
            match codec.classify(unit) {
                NalRole::KeySlice => {
                    has_slice = true;
                    has_key = true;
                    all_non_reference = false;
                }
                NalRole::Slice => {
                    has_slice = true;
                    if !codec.is_non_reference(unit) {
                        all_non_reference = false;
                    }
                }
                _ => {}
            }
        }
        if has_key {
            self.set_key();
        }
        if has_slice && all_non_reference {
            self.flags.insert(SampleFlags::NOT_DEPENDED_ON);
        }
    }
}

/// 音频样本 (一帧)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSample {
    /// 显示时间戳
    pub pts: i64,
    /// 帧负载
    pub data: Bytes,
    /// 声明的采样数, None 表示编码默认值 (AAC 为 1024)
    pub sample_count: Option<u32>,
}

impl AudioSample {
    /// 创建音频样本
    pub fn new(pts: i64, data: Bytes) -> Self {
        Self {
            pts,
            data,
            sample_count: None,
        }
    }
}

/// 视频轨道
#[derive(Debug, Clone)]
pub struct VideoTrack {
    /// 轨道 ID
    pub id: u32,
    /// 编解码器族, 发现流时确定
    pub codec: Option<VideoCodec>,
    /// TS 中的 PID
    pub pid: Option<u16>,
    /// 产出样本的调用次数
    pub sequence_number: u32,
    /// 时钟频率
    pub timescale: u32,
    /// 本次样本的起始解码时间
    pub base_media_decode_time: i64,
    /// 时长
    pub duration: i64,
    /// 本次调用产出的样本
    pub samples: Vec<VideoSample>,
    /// SPS 列表
    pub sps: Vec<Bytes>,
    /// PPS 列表
    pub pps: Vec<Bytes>,
    /// VPS 列表 (仅 HEVC)
    pub vps: Vec<Bytes>,
    /// RFC 6381 编解码器字符串
    pub codec_string: String,
    /// 显示宽度
    pub width: u32,
    /// 显示高度
    pub height: u32,
    /// 样本宽高比
    pub sar: Rational,
    /// SPS 中 VUI 给出的帧率
    pub frame_rate: Option<Rational>,
    /// 长度前缀字节数
    pub nal_unit_size: usize,
    /// 丢弃的样本数
    pub dropped: u32,
}

impl Default for VideoTrack {
    fn default() -> Self {
        Self {
            id: VIDEO_TRACK_ID,
            codec: None,
            pid: None,
            sequence_number: 0,
            timescale: 0,
            base_media_decode_time: 0,
            duration: 0,
            samples: Vec::new(),
            sps: Vec::new(),
            pps: Vec::new(),
            vps: Vec::new(),
            codec_string: String::new(),
            width: 0,
            height: 0,
            sar: Rational::ONE,
            frame_rate: None,
            nal_unit_size: 4,
            dropped: 0,
        }
    }
}

impl VideoTrack {
    /// 创建空轨道
    pub fn new() -> Self {
        Self::default()
    }

    /// 是否已取得参数集
    pub fn exists(&self) -> bool {
        !self.sps.is_empty() && !self.pps.is_empty()
    }

    /// 清空 PID 映射, 配置与计数器
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// 应用 SPS 解析结果
    pub(crate) fn apply_sps_info(&mut self, info: &fhd_codec::parsers::SpsInfo) {
        self.codec_string = info.codec.clone();
        self.width = info.width;
        self.height = info.height;
        self.sar = info.sar;
        self.frame_rate = info.frame_rate;
    }
}

/// 音频轨道
#[derive(Debug, Clone)]
pub struct AudioTrack {
    /// 轨道 ID
    pub id: u32,
    /// 编解码器族, 发现流时确定
    pub codec: Option<AudioCodec>,
    /// TS 中的 PID
    pub pid: Option<u16>,
    /// 产出样本的调用次数
    pub sequence_number: u32,
    /// 时钟频率 (采样率)
    pub timescale: u32,
    /// 本次样本的起始解码时间
    pub base_media_decode_time: i64,
    /// 时长
    pub duration: i64,
    /// 本次调用产出的样本
    pub samples: Vec<AudioSample>,
    /// 编解码器字符串 (`mp4a.40.2`, `mp3`)
    pub codec_string: String,
    /// 原始配置 (AudioSpecificConfig)
    pub config: Vec<u8>,
    /// 采样率
    pub sample_rate: u32,
    /// 声道数
    pub channel_count: u8,
    /// 每帧采样数
    pub samples_per_frame: u32,
    /// 丢弃的帧数
    pub dropped: u32,
    /// 补入的静音帧数
    pub inserted: u32,
}

impl Default for AudioTrack {
    fn default() -> Self {
        Self {
            id: AUDIO_TRACK_ID,
            codec: None,
            pid: None,
            sequence_number: 0,
            timescale: 0,
            base_media_decode_time: 0,
            duration: 0,
            samples: Vec::new(),
            codec_string: String::new(),
            config: Vec::new(),
            sample_rate: 0,
            channel_count: 0,
            samples_per_frame: fhd_codec::audio::aac::AAC_SAMPLES_PER_FRAME,
            dropped: 0,
            inserted: 0,
        }
    }
}

impl AudioTrack {
    /// 创建空轨道
    pub fn new() -> Self {
        Self::default()
    }

    /// 是否已取得采样率与声道数
    pub fn exists(&self) -> bool {
        self.sample_rate != 0 && self.channel_count != 0
    }

    /// 清空 PID 映射, 配置与计数器
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// 应用 AudioSpecificConfig
    pub(crate) fn apply_config(&mut self, config: &fhd_codec::audio::AudioSpecificConfig) {
        self.codec_string = config.codec.clone();
        self.sample_rate = config.sample_rate;
        self.channel_count = config.channel_count;
        self.config = config.config.clone();
        self.samples_per_frame = fhd_codec::audio::aac::AAC_SAMPLES_PER_FRAME;
    }
}

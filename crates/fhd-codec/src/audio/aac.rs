//! AAC 配置与 ADTS 分帧.
//!
//! # ADTS 帧结构 (7 或 9 字节头部)
//! ```text
//! sync word (12) | ID (1) | layer (2) | protection_absent (1)
//! profile (2) | sampling_frequency_index (4) | private (1) | channel_configuration (3)
//! ... | frame_length (13, 含头部) | buffer_fullness (11) | raw_data_blocks (2)
//! [CRC (16)] 仅当 protection_absent=0
//! ```

use bytes::Bytes;
use fhd_core::bitreader::BitReader;
use fhd_core::clock::MPEG_CLOCK;
use fhd_core::{FhdError, FhdResult};

/// AAC 每帧采样数
pub const AAC_SAMPLES_PER_FRAME: u32 = 1024;

/// 采样率索引表 (ISO 14496-3)
pub const AAC_SAMPLE_RATES: [u32; 13] = [
    96000, 88200, 64000, 48000, 44100, 32000, 24000, 22050, 16000, 12000, 11025, 8000, 7350,
];

/// 采样率索引 15 表示随后 24 位显式采样率
const EXPLICIT_RATE_INDEX: u32 = 15;

/// AudioSpecificConfig 解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSpecificConfig {
    /// audioObjectType (2=LC, 5=SBR, 29=PS ...)
    pub object_type: u8,
    /// 采样率 (Hz)
    pub sample_rate: u32,
    /// 声道数
    pub channel_count: u8,
    /// 编解码器字符串, 如 `mp4a.40.2`
    pub codec: String,
    /// 原始配置字节
    pub config: Vec<u8>,
}

/// 解析 AudioSpecificConfig
pub fn parse_audio_specific_config(data: &[u8]) -> FhdResult<AudioSpecificConfig> {
    if data.len() < 2 {
        return Err(FhdError::InvalidData(format!(
            "AAC: AudioSpecificConfig 太短, len={}",
            data.len()
        )));
    }
    let mut br = BitReader::new(data);
    let mut object_type = br.read_bits(5)?;
    if object_type == 31 {
        object_type = 32 + br.read_bits(6)?;
    }
    let index = br.read_bits(4)?;
    let sample_rate = if index == EXPLICIT_RATE_INDEX {
        br.read_bits(24)?
    } else {
        *AAC_SAMPLE_RATES.get(index as usize).ok_or_else(|| {
            FhdError::InvalidData(format!("AAC: 采样率索引非法, index={}", index))
        })?
    };
    let channel_count = br.read_bits(4)? as u8;
    if sample_rate == 0 {
        return Err(FhdError::InvalidData("AAC: 采样率为 0".into()));
    }

    Ok(AudioSpecificConfig {
        object_type: object_type as u8,
        sample_rate,
        channel_count,
        codec: format!("mp4a.40.{}", object_type),
        config: data.to_vec(),
    })
}

/// 一帧在 90kHz 时钟下的时长
pub fn frame_duration(sample_rate: u32) -> f64 {
    f64::from(AAC_SAMPLES_PER_FRAME) * MPEG_CLOCK as f64 / f64::from(sample_rate)
}

/// ADTS 帧头
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdtsHeader {
    /// profile (0=Main, 1=LC, 2=SSR, 3=LTP), audioObjectType = profile + 1
    pub profile: u8,
    /// 采样率索引
    pub sampling_index: u8,
    /// 声道配置
    pub channel_config: u8,
    /// 帧总长度 (含头部)
    pub frame_length: usize,
    /// 头部长度 (7 或 9)
    pub header_len: usize,
}

impl AdtsHeader {
    /// 采样率 (Hz)
    pub fn sample_rate(&self) -> u32 {
        AAC_SAMPLE_RATES[usize::from(self.sampling_index)]
    }

    /// 由帧头构造 2 字节 AudioSpecificConfig
    pub fn to_audio_specific_config(&self) -> AudioSpecificConfig {
        let object_type = self.profile + 1;
        let config = vec![
            (object_type << 3) | (self.sampling_index >> 1),
            ((self.sampling_index & 1) << 7) | (self.channel_config << 3),
        ];
        AudioSpecificConfig {
            object_type,
            sample_rate: self.sample_rate(),
            channel_count: self.channel_config,
            codec: format!("mp4a.40.{}", object_type),
            config,
        }
    }
}

/// 是否为 ADTS 同步字 (0xFFF, layer=0)
fn is_adts_sync(data: &[u8], offset: usize) -> bool {
    offset + 1 < data.len() && data[offset] == 0xFF && (data[offset + 1] & 0xF6) == 0xF0
}

/// 解析 ADTS 帧头, 数据不足 7 字节或字段非法时返回 None
pub fn parse_adts_header(data: &[u8]) -> Option<AdtsHeader> {
    if data.len() < 7 || !is_adts_sync(data, 0) {
        return None;
    }
    let protection_absent = data[1] & 0x01 != 0;
    let profile = data[2] >> 6;
    let sampling_index = (data[2] >> 2) & 0x0F;
    let channel_config = ((data[2] & 0x01) << 2) | (data[3] >> 6);
    let frame_length = (usize::from(data[3] & 0x03) << 11)
        | (usize::from(data[4]) << 3)
        | (usize::from(data[5]) >> 5);
    let header_len = if protection_absent { 7 } else { 9 };

    if usize::from(sampling_index) >= AAC_SAMPLE_RATES.len() || frame_length <= header_len {
        return None;
    }
    Some(AdtsHeader {
        profile,
        sampling_index,
        channel_config,
        frame_length,
        header_len,
    })
}

/// 一个 ADTS 访问单元
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdtsFrame {
    /// 90kHz 时钟下的 pts
    pub pts: i64,
    /// 原始 AAC 数据 (不含 ADTS 头)
    pub data: Bytes,
}

/// ADTS 流解析结果
#[derive(Debug, Clone)]
pub struct AdtsParse {
    /// 由第一个帧头推导的配置
    pub config: AudioSpecificConfig,
    /// 完整帧
    pub frames: Vec<AdtsFrame>,
    /// 第一个同步字之前被跳过的字节数
    pub skipped: usize,
    /// 末尾不完整帧的字节数
    pub remaining: usize,
}

/// 解析 ADTS 字节流
///
/// 第 i 帧 pts = pts + round(i * 1024 * 90000 / sampleRate). 找不到任何有效帧头时
/// 返回 None.
pub fn parse_adts(data: &Bytes, pts: i64) -> Option<AdtsParse> {
    let mut offset = 0;
    let header = loop {
        if offset + 7 > data.len() {
            return None;
        }
        if let Some(h) = parse_adts_header(&data[offset..]) {
            break h;
        }
        offset += 1;
    };
    let skipped = offset;
    let config = header.to_audio_specific_config();
    let sample_rate = config.sample_rate;

    let mut frames = Vec::new();
    while offset < data.len() {
        let Some(h) = parse_adts_header(&data[offset..]) else {
            if is_adts_sync(data, offset) && offset + 7 > data.len() {
                break;
            }
            offset += 1;
            continue;
        };
        if offset + h.frame_length > data.len() {
            break;
        }
        let index = frames.len() as f64;
        frames.push(AdtsFrame {
            pts: pts + (index * frame_duration(sample_rate)).round() as i64,
            data: data.slice(offset + h.header_len..offset + h.frame_length),
        });
        offset += h.frame_length;
    }

    Some(AdtsParse {
        config,
        frames,
        skipped,
        remaining: data.len() - offset,
    })
}

//! MPEG-1/2/2.5 音频 (Layer I/II/III) 帧头与帧扫描.
//!
//! 帧头结构 (32 位):
//! ```text
//! AAAA AAAA  AAAB BCCD  EEEE FFGH  IIJJ KLMM
//! A = 同步位 (11 bit, 全1)   B = MPEG 版本    C = 层
//! D = CRC 保护              E = 比特率索引    F = 采样率索引
//! G = 填充位                H = 私有位        I = 声道模式
//! ```
//!
//! 帧长 = floor(系数 * 比特率 / 采样率 + 填充) * 每槽字节数.

use bytes::Bytes;

/// 比特率表 (kbps), 5 列 x 14 项 (索引 1..=14):
/// V1 L1, V1 L2, V1 L3, V2/2.5 L1, V2/2.5 L2/L3
const BIT_RATES: [u32; 70] = [
    32, 64, 96, 128, 160, 192, 224, 256, 288, 320, 352, 384, 416, 448, //
    32, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384, //
    32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, //
    32, 48, 56, 64, 80, 96, 112, 128, 144, 160, 176, 192, 224, 256, //
    8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160,
];

/// 采样率表, 3 列 x 3 项: MPEG-1, MPEG-2, MPEG-2.5
const SAMPLE_RATES: [u32; 9] = [44100, 48000, 32000, 22050, 24000, 16000, 11025, 12000, 8000];

/// 帧长系数, 按 [版本字段][层字段] 索引 (层字段 1=III, 2=II, 3=I)
const SAMPLE_COEFFICIENTS: [[u32; 4]; 4] = [
    [0, 72, 144, 12],  // MPEG-2.5
    [0, 0, 0, 0],      // 保留
    [0, 72, 144, 12],  // MPEG-2
    [0, 144, 144, 12], // MPEG-1
];

/// 每槽字节数, 按层字段索引
const BYTES_IN_SLOT: [u32; 4] = [0, 1, 1, 4];

/// 版本字段取值
const VERSION_MPEG1: u8 = 3;
const VERSION_MPEG2: u8 = 2;
const VERSION_RESERVED: u8 = 1;

/// MPEG 音频帧头
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MpegAudioHeader {
    /// 版本字段 (0=2.5, 2=2, 3=1)
    pub version: u8,
    /// 层字段 (1=III, 2=II, 3=I)
    pub layer: u8,
    /// 比特率 (bps)
    pub bit_rate: u32,
    /// 采样率 (Hz)
    pub sample_rate: u32,
    /// 填充位
    pub padding: bool,
    /// 声道模式 (3=单声道)
    pub channel_mode: u8,
    /// 声道数
    pub channel_count: u8,
    /// 帧长 (字节, 含头部)
    pub frame_length: usize,
    /// 每帧采样数
    pub samples_per_frame: u32,
}

/// `offset` 处是否为帧同步字 (11 位全 1 且层字段非 0)
pub fn is_mpeg_audio_sync(data: &[u8], offset: usize) -> bool {
    offset + 1 < data.len()
        && data[offset] == 0xFF
        && data[offset + 1] & 0xE0 == 0xE0
        && data[offset + 1] & 0x06 != 0
}

/// 解析 4 字节帧头
///
/// 拒绝保留版本, 自由格式 (比特率索引 0), 坏比特率 (15) 以及保留采样率索引 (3).
pub fn parse_mpeg_audio_header(data: &[u8]) -> Option<MpegAudioHeader> {
    if data.len() < 4 || !is_mpeg_audio_sync(data, 0) {
        return None;
    }
    let version = (data[1] >> 3) & 3;
    let layer = (data[1] >> 1) & 3;
    let bit_rate_index = usize::from((data[2] >> 4) & 15);
    let sample_rate_index = usize::from((data[2] >> 2) & 3);
    if version == VERSION_RESERVED
        || bit_rate_index == 0
        || bit_rate_index == 15
        || sample_rate_index == 3
    {
        return None;
    }

    let padding = (data[2] >> 1) & 1 == 1;
    let channel_mode = data[3] >> 6;
    let bit_rate_column = if version == VERSION_MPEG1 {
        3 - usize::from(layer)
    } else if layer == 3 {
        3
    } else {
        4
    };
    let bit_rate = BIT_RATES[bit_rate_column * 14 + bit_rate_index - 1] * 1000;
    let sample_rate_column = match version {
        VERSION_MPEG1 => 0,
        VERSION_MPEG2 => 1,
        _ => 2,
    };
    let sample_rate = SAMPLE_RATES[sample_rate_column * 3 + sample_rate_index];
    let coefficient = SAMPLE_COEFFICIENTS[usize::from(version)][usize::from(layer)];
    let bytes_in_slot = BYTES_IN_SLOT[usize::from(layer)];
    let frame_length = (coefficient * bit_rate / sample_rate + u32::from(padding)) * bytes_in_slot;

    Some(MpegAudioHeader {
        version,
        layer,
        bit_rate,
        sample_rate,
        padding,
        channel_mode,
        channel_count: if channel_mode == 3 { 1 } else { 2 },
        frame_length: frame_length as usize,
        samples_per_frame: coefficient * 8 * bytes_in_slot,
    })
}

/// 一个 MPEG 音频帧
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MpegAudioFrame {
    /// 时间戳 (与输入 pts 同一时钟)
    pub pts: i64,
    /// 完整帧 (含帧头)
    pub data: Bytes,
}

/// 帧扫描结果
#[derive(Debug, Clone, Default)]
pub struct MpegAudioParse {
    /// 最后一个有效帧的采样率
    pub sample_rate: u32,
    /// 最后一个有效帧的声道数
    pub channel_count: u8,
    /// 最后一个有效帧的每帧采样数
    pub samples_per_frame: u32,
    /// 扫描到的完整帧
    pub frames: Vec<MpegAudioFrame>,
    /// 检测到的帧头非法或帧超出剩余数据
    pub broken: bool,
}

impl MpegAudioParse {
    /// 编解码器字符串
    pub const CODEC: &'static str = "mp3";
}

/// 扫描缓冲区中的 MPEG 音频帧
///
/// 第 i 帧 pts = pts + round(i * samplesPerFrame * timescale / sampleRate).
/// 同步字之后不足 24 字节时停止且不视为损坏.
pub fn parse_mpeg_audio(data: &Bytes, pts: i64, timescale: u32) -> MpegAudioParse {
    let mut ret = MpegAudioParse::default();
    let mut offset = 0;
    while offset < data.len() {
        if !is_mpeg_audio_sync(data, offset) {
            offset += 1;
            continue;
        }
        if offset + 24 > data.len() {
            break;
        }
        let header = match parse_mpeg_audio_header(&data[offset..]) {
            Some(h) if offset + h.frame_length <= data.len() && h.frame_length > 0 => h,
            _ => {
                ret.broken = true;
                break;
            }
        };
        ret.sample_rate = header.sample_rate;
        ret.channel_count = header.channel_count;
        ret.samples_per_frame = header.samples_per_frame;

        let frame_duration =
            f64::from(header.samples_per_frame) * f64::from(timescale) / f64::from(header.sample_rate);
        let index = ret.frames.len() as f64;
        ret.frames.push(MpegAudioFrame {
            pts: pts + (index * frame_duration).round() as i64,
            data: data.slice(offset..offset + header.frame_length),
        });
        offset += header.frame_length;
    }
    ret
}

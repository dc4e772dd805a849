//! 编解码器族标识.
//!
//! 在发现流时确定一次, 之后贯穿轨道生命周期. NAL 分类 (类型号, 关键帧,
//! 参数集, 访问单元分隔符) 都在这里按编解码器族分派.

use std::fmt;

use crate::parsers::h264::NalUnitType;
use crate::parsers::h265::HevcNalUnitType;

/// 视频编解码器族
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VideoCodec {
    /// H.264 / AVC
    Avc,
    /// H.265 / HEVC
    Hevc,
}

/// 视频 NAL 单元在转封装层面的角色
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NalRole {
    /// 视频参数集 (仅 HEVC)
    Vps,
    /// 序列参数集
    Sps,
    /// 图像参数集
    Pps,
    /// 访问单元分隔符
    Aud,
    /// 补充增强信息
    Sei,
    /// 随机访问切片 (AVC IDR / HEVC IRAP)
    KeySlice,
    /// 其他切片
    Slice,
    /// 其余类型
    Other,
}

impl VideoCodec {
    /// 从 NAL 单元首字节 (含头) 提取类型号
    pub fn nal_type(self, unit: &[u8]) -> Option<u8> {
        let header = *unit.first()?;
        Some(match self {
            Self::Avc => header & 0x1F,
            Self::Hevc => (header >> 1) & 0x3F,
        })
    }

    /// 对 NAL 单元分类
    pub fn classify(self, unit: &[u8]) -> NalRole {
        let Some(nal_type) = self.nal_type(unit) else {
            return NalRole::Other;
        };
        match self {
            Self::Avc => match NalUnitType::from_type_id(nal_type) {
                NalUnitType::Sps => NalRole::Sps,
                NalUnitType::Pps => NalRole::Pps,
                NalUnitType::Aud => NalRole::Aud,
                NalUnitType::Sei => NalRole::Sei,
                t if t.is_idr() => NalRole::KeySlice,
                t if t.is_vcl() => NalRole::Slice,
                _ => NalRole::Other,
            },
            Self::Hevc => match HevcNalUnitType::from_type_id(nal_type) {
                HevcNalUnitType::Vps => NalRole::Vps,
                HevcNalUnitType::Sps => NalRole::Sps,
                HevcNalUnitType::Pps => NalRole::Pps,
                HevcNalUnitType::Aud => NalRole::Aud,
                HevcNalUnitType::PrefixSei | HevcNalUnitType::SuffixSei => NalRole::Sei,
                t if t.is_irap() => NalRole::KeySlice,
                t if t.is_vcl() => NalRole::Slice,
                _ => NalRole::Other,
            },
        }
    }

    /// 该 NAL 单元是否不被其他图像参考
    ///
    /// AVC 取 nal_ref_idc == 0; HEVC 取子层非参考图像 (类型号 <= 14 的偶数).
    pub fn is_non_reference(self, unit: &[u8]) -> bool {
        match (self, self.nal_type(unit)) {
            (Self::Avc, Some(t)) => NalUnitType::from_type_id(t).is_vcl() && unit[0] & 0x60 == 0,
            (Self::Hevc, Some(t)) => t <= 14 && t % 2 == 0,
            _ => false,
        }
    }

    /// 编解码器族名称
    pub fn name(self) -> &'static str {
        match self {
            Self::Avc => "avc",
            Self::Hevc => "hevc",
        }
    }
}

impl fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 音频编解码器族
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioCodec {
    /// AAC (ADTS 或原始帧)
    Aac,
    /// MPEG-1/2 音频 (mp3 等)
    Mpeg,
}

impl AudioCodec {
    /// 编解码器族名称
    pub fn name(self) -> &'static str {
        match self {
            Self::Aac => "aac",
            Self::Mpeg => "mpeg",
        }
    }
}

impl fmt::Display for AudioCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

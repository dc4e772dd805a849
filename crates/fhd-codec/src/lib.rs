//! # fhd-codec
//!
//! 转封装所需的码流头解析, 不做任何像素或音频采样解码:
//! - NAL 分帧 (Annex B 起始码 / 长度前缀) 与防竞争字节移除
//! - H.264 / H.265 SPS 解析与 avcC / hvcC 配置记录
//! - SEI 消息头扫描
//! - AAC (AudioSpecificConfig, ADTS, 静音帧表) 与 MPEG 音频帧头

pub mod audio;
pub mod codec_id;
pub mod nal;
pub mod parsers;

pub use codec_id::{AudioCodec, VideoCodec};
pub use nal::{AnnexBUnit, remove_emulation_prevention, split_annex_b, split_length_prefixed};

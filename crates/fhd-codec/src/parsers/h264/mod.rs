//! H.264/AVC 码流头解析.
//!
//! - NAL 类型识别
//! - SPS 解析 (尺寸, 裁剪, 样本宽高比, 编解码器字符串)
//! - AVCDecoderConfigurationRecord (avcC) 解析与构建

pub mod nal;
pub mod sps;

pub use nal::{AvcDecoderConfig, NalUnitType, build_avc_decoder_config, parse_avc_decoder_config};
pub use sps::{Sps, parse_sps, parse_sps_nal};

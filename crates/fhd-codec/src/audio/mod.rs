//! 音频帧头解析.
//!
//! - [`aac`]: AudioSpecificConfig 与 ADTS 分帧
//! - [`silence`]: 预编码的 AAC 静音帧
//! - [`mpeg`]: MPEG-1/2/2.5 音频帧头与帧扫描

pub mod aac;
pub mod mpeg;
pub mod silence;

pub use aac::{AdtsFrame, AdtsParse, AudioSpecificConfig, parse_adts, parse_audio_specific_config};
pub use mpeg::{MpegAudioFrame, MpegAudioHeader, MpegAudioParse, parse_mpeg_audio, parse_mpeg_audio_header};
pub use silence::silent_frame;

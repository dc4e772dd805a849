//! # fhd
//!
//! 流媒体转封装前端: 把 MPEG-TS / FLV 字节流拆分为逐轨道的音视频样本,
//! 解析码流头 (H.264/H.265 SPS, AAC/MPEG 音频帧头), 并校正跨分片的时间戳.
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use fhd::format::{DemuxOptions, create_demuxer, detect};
//!
//! let data = std::fs::read("segment.ts").unwrap();
//! let format = detect(&data).unwrap();
//! let mut demuxer = create_demuxer(format);
//! let out = demuxer.demux(&data, &DemuxOptions::default()).unwrap();
//! println!("视频 {} 帧, 音频 {} 帧", out.video_track.samples.len(), out.audio_track.samples.len());
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `fhd-core` | 错误类型, 比特读写, 有理数, MPEG 时钟 |
//! | `fhd-codec` | NAL 分帧, 参数集与音频帧头解析 |
//! | `fhd-format` | TS / FLV 解封装与时间戳校正 |

/// 底层基础设施
pub use fhd_core as core;

/// 码流头解析
pub use fhd_codec as codec;

/// 容器解封装
pub use fhd_format as format;

pub mod logging;

/// 获取版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

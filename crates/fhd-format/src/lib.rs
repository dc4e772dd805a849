//! # fhd-format
//!
//! 推入式容器解封装: MPEG-TS 与 FLV 字节流被拆分为逐轨道的音视频样本,
//! TS 样本再经过时间戳连续性与音视频同步校正.

pub mod demuxer;
pub mod demuxers;
pub mod format_id;
pub mod probe;
pub mod timeline;
pub mod track;

// 重导出常用类型
pub use demuxer::{DemuxOptions, DemuxOutput, DemuxWarning, Demuxer};
pub use demuxers::{FlvDemuxer, FlvMetadata, TsDemuxer};
pub use format_id::ContainerFormat;
pub use probe::{create_demuxer, detect};
pub use timeline::TimelineCorrector;
pub use track::{AudioSample, AudioTrack, SampleFlags, VideoSample, VideoTrack};

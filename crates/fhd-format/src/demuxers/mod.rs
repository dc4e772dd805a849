//! 内置解封装器.

pub mod flv;
pub mod mpegts;

pub use flv::{FlvDemuxer, FlvMetadata};
pub use mpegts::{TS_PACKET_SIZE, TsDemuxer};

//! H.265/HEVC 码流头解析.
//!
//! # HEVC NAL 头部 (2 字节)
//! ```text
//! | forbidden(1) | type(6) | layer_id(6) | tid(3) |
//! ```

pub mod nal;
pub mod sps;

pub use nal::{
    HevcDecoderConfig, HevcNalUnitType, build_hevc_decoder_config, parse_hevc_decoder_config,
};
pub use sps::{HevcSps, ProfileTierLevel, parse_hevc_sps, parse_hevc_sps_nal};

//! 格式探测.
//!
//! 只看文件头部的魔数, 不依赖扩展名.

use crate::demuxer::Demuxer;
use crate::demuxers::{FlvDemuxer, TS_PACKET_SIZE, TsDemuxer};
use crate::format_id::ContainerFormat;

/// 是否为 TS: 第 0, 188, 376 字节均为同步字节 0x47
pub fn is_ts(data: &[u8]) -> bool {
    data.len() > 2 * TS_PACKET_SIZE
        && (0..3).all(|i| data[i * TS_PACKET_SIZE] == TsDemuxer::SYNC_BYTE)
}

/// 是否为 FLV: 签名 `FLV`, 版本 1, 头部大小不小于 9
pub fn is_flv(data: &[u8]) -> bool {
    if data.len() < 9 || &data[..3] != b"FLV" || data[3] != 0x01 {
        return false;
    }
    u32::from_be_bytes([data[5], data[6], data[7], data[8]]) >= 9
}

/// 识别容器格式
pub fn detect(data: &[u8]) -> Option<ContainerFormat> {
    if is_flv(data) {
        Some(ContainerFormat::Flv)
    } else if is_ts(data) {
        Some(ContainerFormat::MpegTs)
    } else {
        None
    }
}

/// 创建对应格式的解封装器
pub fn create_demuxer(format: ContainerFormat) -> Box<dyn Demuxer> {
    match format {
        ContainerFormat::MpegTs => Box::new(TsDemuxer::new()),
        ContainerFormat::Flv => Box::new(FlvDemuxer::new()),
    }
}

//! SEI 消息头扫描.
//!
//! 只解析每条 sei_message 的 payloadType / payloadSize (均为 0xFF 累加编码),
//! 对 user_data_unregistered 额外取出 16 字节 UUID. 负载内容不做解释.

use bytes::Bytes;
use fhd_core::{FhdError, FhdResult};

use crate::codec_id::VideoCodec;
use crate::nal::remove_emulation_prevention;

/// user_data_unregistered 负载类型
pub const SEI_USER_DATA_UNREGISTERED: u32 = 5;

/// 单条 SEI 消息头
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeiMessage {
    /// payloadType
    pub payload_type: u32,
    /// payloadSize (字节)
    pub payload_size: usize,
    /// user_data_unregistered 的 UUID
    pub uuid: Option<[u8; 16]>,
    /// 负载 (已去除防竞争字节)
    pub payload: Bytes,
}

/// 读取一个 0xFF 累加编码的值
fn read_ff_coded(rbsp: &[u8], pos: &mut usize) -> FhdResult<u32> {
    let mut value = 0u32;
    loop {
        let Some(&b) = rbsp.get(*pos) else {
            return Err(FhdError::TruncatedBitstream);
        };
        *pos += 1;
        value = value.saturating_add(u32::from(b));
        if b != 0xFF {
            return Ok(value);
        }
    }
}

/// 扫描一个 SEI NAL 单元 (含 NAL 头) 中的全部消息头
///
/// 遇到 rbsp_trailing_bits 或截断时停止; 截断之前已完整的消息照常返回.
pub fn scan_sei(codec: VideoCodec, nal: &[u8]) -> Vec<SeiMessage> {
    let header_len = match codec {
        VideoCodec::Avc => 1,
        VideoCodec::Hevc => 2,
    };
    let mut messages = Vec::new();
    if nal.len() <= header_len {
        return messages;
    }
    let rbsp = remove_emulation_prevention(&nal[header_len..]);

    let mut pos = 0;
    // 只剩 rbsp_trailing_bits (0x80) 时结束
    while pos < rbsp.len() && !(pos + 1 == rbsp.len() && rbsp[pos] == 0x80) {
        let payload_type = match read_ff_coded(&rbsp, &mut pos) {
            Ok(v) => v,
            Err(_) => break,
        };
        let payload_size = match read_ff_coded(&rbsp, &mut pos) {
            Ok(v) => v as usize,
            Err(_) => break,
        };
        if pos + payload_size > rbsp.len() {
            log::debug!(
                "SEI 负载越界: type={}, size={}, remain={}",
                payload_type,
                payload_size,
                rbsp.len() - pos
            );
            break;
        }
        let body = &rbsp[pos..pos + payload_size];
        let uuid = if payload_type == SEI_USER_DATA_UNREGISTERED && body.len() >= 16 {
            let mut id = [0u8; 16];
            id.copy_from_slice(&body[..16]);
            Some(id)
        } else {
            None
        };
        messages.push(SeiMessage {
            payload_type,
            payload_size,
            uuid,
            payload: Bytes::copy_from_slice(body),
        });
        pos += payload_size;
    }
    messages
}

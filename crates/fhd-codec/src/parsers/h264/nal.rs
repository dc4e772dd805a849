//! H.264 NAL 类型与 avcC 配置记录.
//!
//! # NAL 头部 (1 字节)
//! ```text
//! | forbidden(1) | ref_idc(2) | type(5) |
//! ```
//!
//! # AVCDecoderConfigurationRecord
//! ```text
//! version(8) profile(8) compat(8) level(8)
//! reserved(6) lengthSizeMinusOne(2)
//! reserved(3) numOfSPS(5) { len(16) sps }*
//! numOfPPS(8) { len(16) pps }*
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use fhd_core::{FhdError, FhdResult};

use super::sps::parse_sps_nal;
use crate::parsers::SpsInfo;

/// NAL 单元类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NalUnitType {
    /// 非 IDR 图像切片
    Slice,
    /// 数据分区 A/B/C
    SlicePartition(u8),
    /// IDR 图像切片 (关键帧)
    SliceIdr,
    /// 补充增强信息 (SEI)
    Sei,
    /// 序列参数集 (SPS)
    Sps,
    /// 图像参数集 (PPS)
    Pps,
    /// 访问单元分隔符 (AUD)
    Aud,
    /// 序列结束
    EndOfSequence,
    /// 流结束
    EndOfStream,
    /// 填充数据
    FillerData,
    /// 其他类型
    Other(u8),
}

impl NalUnitType {
    /// 从 NAL 类型编号创建
    pub fn from_type_id(type_id: u8) -> Self {
        match type_id {
            1 => Self::Slice,
            2..=4 => Self::SlicePartition(type_id),
            5 => Self::SliceIdr,
            6 => Self::Sei,
            7 => Self::Sps,
            8 => Self::Pps,
            9 => Self::Aud,
            10 => Self::EndOfSequence,
            11 => Self::EndOfStream,
            12 => Self::FillerData,
            _ => Self::Other(type_id),
        }
    }

    /// 是否为 VCL (Video Coding Layer) NAL
    pub fn is_vcl(&self) -> bool {
        matches!(self, Self::Slice | Self::SlicePartition(_) | Self::SliceIdr)
    }

    /// 是否为 IDR 切片
    pub fn is_idr(&self) -> bool {
        matches!(self, Self::SliceIdr)
    }
}

/// avcC 解析结果
#[derive(Debug, Clone)]
pub struct AvcDecoderConfig {
    /// AVCProfileIndication
    pub profile_idc: u8,
    /// profile_compatibility
    pub profile_compatibility: u8,
    /// AVCLevelIndication
    pub level_idc: u8,
    /// NAL 长度前缀字节数 (1..=4)
    pub length_size: usize,
    /// SPS NAL 列表 (含 NAL 头)
    pub sps_list: Vec<Bytes>,
    /// PPS NAL 列表 (含 NAL 头)
    pub pps_list: Vec<Bytes>,
    /// 第一个 SPS 的解析结果
    pub info: Option<SpsInfo>,
}

/// 读取 `count` 个 16 位长度前缀的参数集, 截断时返回已读取部分
fn read_parameter_sets(data: &Bytes, pos: &mut usize, count: usize, out: &mut Vec<Bytes>) {
    for _ in 0..count {
        if *pos + 2 > data.len() {
            return;
        }
        let len = usize::from(u16::from_be_bytes([data[*pos], data[*pos + 1]]));
        *pos += 2;
        if *pos + len > data.len() {
            log::debug!("avcC 参数集截断: declared={}, remain={}", len, data.len() - *pos);
            *pos = data.len();
            return;
        }
        out.push(data.slice(*pos..*pos + len));
        *pos += len;
    }
}

/// 解析 AVCDecoderConfigurationRecord
///
/// 固定头不足 7 字节时失败; 参数集列表截断时保留已读取的部分.
pub fn parse_avc_decoder_config(data: &Bytes) -> FhdResult<AvcDecoderConfig> {
    if data.len() < 7 {
        return Err(FhdError::InvalidData(format!(
            "H.264: avcC 数据太短, len={}",
            data.len()
        )));
    }

    let length_size = usize::from(data[4] & 0x03) + 1;
    let num_sps = usize::from(data[5] & 0x1F);
    let mut pos = 6;

    let mut sps_list = Vec::new();
    read_parameter_sets(data, &mut pos, num_sps, &mut sps_list);

    let mut pps_list = Vec::new();
    if pos < data.len() {
        let num_pps = usize::from(data[pos]);
        pos += 1;
        read_parameter_sets(data, &mut pos, num_pps, &mut pps_list);
    }

    let info = match sps_list.first() {
        Some(sps) => match parse_sps_nal(sps) {
            Ok(parsed) => Some(parsed.info()),
            Err(e) => {
                log::debug!("avcC 中的 SPS 解析失败: {}", e);
                None
            }
        },
        None => None,
    };

    Ok(AvcDecoderConfig {
        profile_idc: data[1],
        profile_compatibility: data[2],
        level_idc: data[3],
        length_size,
        sps_list,
        pps_list,
        info,
    })
}

/// 构建 AVCDecoderConfigurationRecord
pub fn build_avc_decoder_config(
    sps_list: &[&[u8]],
    pps_list: &[&[u8]],
    length_size: usize,
) -> FhdResult<Vec<u8>> {
    let Some(first) = sps_list.first() else {
        return Err(FhdError::MissingConfiguration("H.264: 至少需要一个 SPS".into()));
    };
    if first.len() < 4 {
        return Err(FhdError::InvalidData("H.264: SPS 太短".into()));
    }
    if !(1..=4).contains(&length_size) {
        return Err(FhdError::InvalidArgument(format!(
            "H.264: length_size 非法, value={}",
            length_size
        )));
    }

    let mut out = BytesMut::new();
    out.put_u8(1);
    out.put_slice(&first[1..4]);
    out.put_u8(0xFC | (length_size as u8 - 1));
    out.put_u8(0xE0 | (sps_list.len() as u8 & 0x1F));
    for sps in sps_list {
        out.put_u16(sps.len() as u16);
        out.put_slice(sps);
    }
    out.put_u8(pps_list.len() as u8);
    for pps in pps_list {
        out.put_u16(pps.len() as u16);
        out.put_slice(pps);
    }
    Ok(out.to_vec())
}

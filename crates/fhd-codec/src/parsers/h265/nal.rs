//! HEVC NAL 类型与 hvcC 配置记录.

use bytes::{BufMut, Bytes, BytesMut};
use fhd_core::{FhdError, FhdResult};

use super::sps::parse_hevc_sps_nal;
use crate::parsers::SpsInfo;

/// HEVC NAL 单元类型 (只区分转封装关心的类型)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HevcNalUnitType {
    /// 非随机访问切片 (0..=9)
    Slice(u8),
    /// BLA_W_LP / BLA_W_RADL / BLA_N_LP
    Bla(u8),
    /// IDR_W_RADL / IDR_N_LP
    Idr(u8),
    /// CRA_NUT
    Cra,
    /// 保留的 IRAP 类型 (22, 23)
    ReservedIrap(u8),
    /// VPS
    Vps,
    /// SPS
    Sps,
    /// PPS
    Pps,
    /// 访问单元分隔符
    Aud,
    /// 前缀 SEI
    PrefixSei,
    /// 后缀 SEI
    SuffixSei,
    /// 其他类型
    Other(u8),
}

impl HevcNalUnitType {
    /// 从类型编号创建
    pub fn from_type_id(id: u8) -> Self {
        match id {
            0..=9 => Self::Slice(id),
            16..=18 => Self::Bla(id),
            19 | 20 => Self::Idr(id),
            21 => Self::Cra,
            22 | 23 => Self::ReservedIrap(id),
            32 => Self::Vps,
            33 => Self::Sps,
            34 => Self::Pps,
            35 => Self::Aud,
            39 => Self::PrefixSei,
            40 => Self::SuffixSei,
            _ => Self::Other(id),
        }
    }

    /// 是否为 VCL NAL
    pub fn is_vcl(&self) -> bool {
        matches!(
            self,
            Self::Slice(_) | Self::Bla(_) | Self::Idr(_) | Self::Cra | Self::ReservedIrap(_)
        )
    }

    /// 是否为 IRAP (随机访问点, 类型 16..=23)
    pub fn is_irap(&self) -> bool {
        matches!(
            self,
            Self::Bla(_) | Self::Idr(_) | Self::Cra | Self::ReservedIrap(_)
        )
    }
}

/// hvcC 解析结果
#[derive(Debug, Clone)]
pub struct HevcDecoderConfig {
    /// general_profile_idc
    pub general_profile_idc: u8,
    /// general_level_idc
    pub general_level_idc: u8,
    /// NAL 长度前缀字节数 (1..=4)
    pub length_size: usize,
    /// VPS NAL 列表
    pub vps_list: Vec<Bytes>,
    /// SPS NAL 列表
    pub sps_list: Vec<Bytes>,
    /// PPS NAL 列表
    pub pps_list: Vec<Bytes>,
    /// 第一个 SPS 的解析结果
    pub info: Option<SpsInfo>,
}

/// hvcC 固定头长度
const HVCC_HEADER_LEN: usize = 23;

/// 解析 HEVCDecoderConfigurationRecord
///
/// 固定头不足 23 字节时失败; 数组截断时保留已读取的部分.
pub fn parse_hevc_decoder_config(data: &Bytes) -> FhdResult<HevcDecoderConfig> {
    if data.len() < HVCC_HEADER_LEN {
        return Err(FhdError::InvalidData(format!(
            "HEVC: hvcC 数据太短, len={}",
            data.len()
        )));
    }

    let length_size = usize::from(data[21] & 0x03) + 1;
    let num_arrays = data[22];
    let mut vps_list = Vec::new();
    let mut sps_list = Vec::new();
    let mut pps_list = Vec::new();

    let mut pos = HVCC_HEADER_LEN;
    'arrays: for _ in 0..num_arrays {
        if pos + 3 > data.len() {
            break;
        }
        let nal_type = data[pos] & 0x3F;
        let num_nalus = u16::from_be_bytes([data[pos + 1], data[pos + 2]]);
        pos += 3;

        for _ in 0..num_nalus {
            if pos + 2 > data.len() {
                break 'arrays;
            }
            let len = usize::from(u16::from_be_bytes([data[pos], data[pos + 1]]));
            pos += 2;
            if pos + len > data.len() {
                log::debug!("hvcC NAL 截断: declared={}, remain={}", len, data.len() - pos);
                break 'arrays;
            }
            let nal = data.slice(pos..pos + len);
            pos += len;
            match HevcNalUnitType::from_type_id(nal_type) {
                HevcNalUnitType::Vps => vps_list.push(nal),
                HevcNalUnitType::Sps => sps_list.push(nal),
                HevcNalUnitType::Pps => pps_list.push(nal),
                _ => {}
            }
        }
    }

    let info = sps_list
        .first()
        .and_then(|sps| match parse_hevc_sps_nal(sps) {
            Ok(parsed) => Some(parsed.info()),
            Err(e) => {
                log::debug!("hvcC 中的 SPS 解析失败: {}", e);
                None
            }
        });

    Ok(HevcDecoderConfig {
        general_profile_idc: data[1] & 0x1F,
        general_level_idc: data[12],
        length_size,
        vps_list,
        sps_list,
        pps_list,
        info,
    })
}

/// 构建 HEVCDecoderConfigurationRecord
///
/// profile/level 字段从 SPS 的 profile_tier_level 中取出.
pub fn build_hevc_decoder_config(
    vps_list: &[&[u8]],
    sps_list: &[&[u8]],
    pps_list: &[&[u8]],
) -> FhdResult<Vec<u8>> {
    let Some(first) = sps_list.first() else {
        return Err(FhdError::MissingConfiguration("HEVC: 至少需要一个 SPS".into()));
    };
    let sps = parse_hevc_sps_nal(first)?;
    let ptl = &sps.profile_tier_level;

    let mut out = BytesMut::new();
    out.put_u8(1);
    out.put_u8((ptl.profile_space << 6) | (u8::from(ptl.tier) << 5) | ptl.profile_idc);
    out.put_u32(ptl.compatibility_flags);
    out.put_slice(&ptl.constraint_bytes());
    out.put_u8(ptl.level_idc);
    out.put_u16(0xF000); // min_spatial_segmentation_idc
    out.put_u8(0xFC); // parallelismType
    out.put_u8(0xFC | (sps.chroma_format_idc as u8 & 0x03));
    out.put_u8(0xF8 | ((sps.bit_depth_luma - 8) as u8 & 0x07));
    out.put_u8(0xF8 | ((sps.bit_depth_chroma - 8) as u8 & 0x07));
    out.put_u16(0); // avgFrameRate
    out.put_u8(0x0F); // constantFrameRate=0, numTemporalLayers=1, temporalIdNested=1, lengthSizeMinusOne=3

    let arrays: [(u8, &[&[u8]]); 3] = [(32, vps_list), (33, sps_list), (34, pps_list)];
    out.put_u8(arrays.iter().filter(|(_, list)| !list.is_empty()).count() as u8);
    for (nal_type, list) in arrays {
        if list.is_empty() {
            continue;
        }
        out.put_u8(0x80 | nal_type);
        out.put_u16(list.len() as u16);
        for nal in list {
            out.put_u16(nal.len() as u16);
            out.put_slice(nal);
        }
    }
    Ok(out.to_vec())
}

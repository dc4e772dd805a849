//! 视频码流头解析器.
//!
//! - [`h264`]: AVC SPS 与 avcC 配置记录
//! - [`h265`]: HEVC SPS (含 profile_tier_level) 与 hvcC 配置记录
//! - [`sei`]: SEI 消息头扫描

pub mod h264;
pub mod h265;
pub mod sei;

use fhd_core::Rational;

/// 从 SPS 中提取的转封装所需信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpsInfo {
    /// RFC 6381 编解码器字符串, 如 `avc1.64001f`, `hvc1.1.6.L93.B0`
    pub codec: String,
    /// 显示宽度 (已应用裁剪)
    pub width: u32,
    /// 显示高度 (已应用裁剪)
    pub height: u32,
    /// 样本宽高比
    pub sar: Rational,
    /// VUI timing_info 给出的帧率
    pub frame_rate: Option<Rational>,
}

/// 读取有上限的 ue(v), 超出时返回 `InvalidData`
pub(crate) fn read_ue_max(
    br: &mut fhd_core::BitReader,
    max: u32,
    name: &str,
) -> fhd_core::FhdResult<u32> {
    let value = br.read_ue()?;
    if value > max {
        return Err(fhd_core::FhdError::InvalidData(format!(
            "{} 超出范围, value={}",
            name, value
        )));
    }
    Ok(value)
}

/// VUI 中 aspect_ratio_idc 对应的预定义宽高比 (H.264 表 E-1, H.265 表 E-1 相同)
const SAR_TABLE: [(u32, u32); 17] = [
    (1, 1), // 0: 未指定, 视为方形像素
    (1, 1),
    (12, 11),
    (10, 11),
    (16, 11),
    (40, 33),
    (24, 11),
    (20, 11),
    (32, 11),
    (80, 33),
    (18, 11),
    (15, 11),
    (64, 33),
    (160, 99),
    (4, 3),
    (3, 2),
    (2, 1),
];

/// aspect_ratio_idc 的扩展取值, 随后是两个 16 位原始值
const EXTENDED_SAR: u32 = 255;

/// 读取 VUI 的 aspect_ratio_info, 未出现或取值保留时返回 1:1
pub(crate) fn read_vui_sar(br: &mut fhd_core::BitReader) -> fhd_core::FhdResult<Rational> {
    if !br.read_flag()? {
        return Ok(Rational::ONE);
    }
    let idc = br.read_bits(8)?;
    if idc == EXTENDED_SAR {
        let num = br.read_bits(16)?;
        let den = br.read_bits(16)?;
        let sar = Rational::new(num, den);
        return Ok(if sar.is_valid() { sar } else { Rational::ONE });
    }
    match SAR_TABLE.get(idc as usize) {
        Some(&(num, den)) => Ok(Rational::new(num, den)),
        None => {
            log::debug!("VUI aspect_ratio_idc 为保留值 {}, 按 1:1 处理", idc);
            Ok(Rational::ONE)
        }
    }
}

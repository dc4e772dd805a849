//! H.264 SPS (Sequence Parameter Set) 解析器.
//!
//! 转封装只需要 SPS 中的几何信息: 宏块尺寸, 帧/场编码, 裁剪偏移和 VUI
//! 样本宽高比. 缩放列表只跳过不保存.

use fhd_core::bitreader::BitReader;
use fhd_core::{FhdError, FhdResult, Rational};

use crate::nal::remove_emulation_prevention;
use crate::parsers::{SpsInfo, read_ue_max, read_vui_sar};

/// SPS 解析结果
#[derive(Debug, Clone)]
pub struct Sps {
    /// profile_idc (66=Baseline, 77=Main, 100=High)
    pub profile_idc: u8,
    /// constraint_set 标志位
    pub constraint_set_flags: u8,
    /// level_idc (30=3.0, 41=4.1)
    pub level_idc: u8,
    /// seq_parameter_set_id
    pub sps_id: u32,
    /// 色度格式 (0=单色, 1=4:2:0, 2=4:2:2, 3=4:4:4)
    pub chroma_format_idc: u32,
    /// separate_colour_plane_flag
    pub separate_colour_plane: bool,
    /// 亮度位深
    pub bit_depth_luma: u32,
    /// 色度位深
    pub bit_depth_chroma: u32,
    /// pic_order_cnt_type
    pub poc_type: u32,
    /// 最大参考帧数
    pub max_num_ref_frames: u32,
    /// 宽度 (宏块)
    pub pic_width_in_mbs: u32,
    /// 高度 (map unit)
    pub pic_height_in_map_units: u32,
    /// 是否仅帧编码
    pub frame_mbs_only: bool,
    /// 裁剪偏移 (左, 右, 上, 下), 以裁剪单位计
    pub crop: [u32; 4],
    /// 图像宽度 (像素, 已裁剪)
    pub width: u32,
    /// 图像高度 (像素, 已裁剪)
    pub height: u32,
    /// 样本宽高比
    pub sar: Rational,
    /// 帧率 (VUI timing_info)
    pub frame_rate: Option<Rational>,
}

impl Sps {
    /// 编解码器字符串 `avc1.PPCCLL`
    pub fn codec_string(&self) -> String {
        format!(
            "avc1.{:02x}{:02x}{:02x}",
            self.profile_idc, self.constraint_set_flags, self.level_idc
        )
    }

    /// 转封装所需的摘要信息
    pub fn info(&self) -> SpsInfo {
        SpsInfo {
            codec: self.codec_string(),
            width: self.width,
            height: self.height,
            sar: self.sar,
            frame_rate: self.frame_rate,
        }
    }
}

/// 是否带有 chroma_format_idc 等高规格字段
fn is_high_profile(profile_idc: u8) -> bool {
    matches!(
        profile_idc,
        100 | 110 | 122 | 244 | 44 | 83 | 86 | 118 | 128 | 138 | 139 | 134 | 135
    )
}

/// 裁剪单位 (CropUnitX, CropUnitY)
fn cropping_unit(chroma_array_type: u32, frame_mbs_only: bool) -> (u32, u32) {
    let (sub_width, sub_height) = match chroma_array_type {
        1 => (2, 2),
        2 => (2, 1),
        _ => (1, 1),
    };
    let field_mult = if frame_mbs_only { 1 } else { 2 };
    (sub_width, sub_height * field_mult)
}

/// 从完整 NAL 单元 (含 1 字节头, 可能含防竞争字节) 解析 SPS
pub fn parse_sps_nal(nal: &[u8]) -> FhdResult<Sps> {
    if nal.len() < 4 {
        return Err(FhdError::InvalidData(format!(
            "H.264: SPS NAL 太短, len={}",
            nal.len()
        )));
    }
    parse_sps(&remove_emulation_prevention(&nal[1..]))
}

/// 从 RBSP 数据 (不含 NAL 头) 解析 SPS
pub fn parse_sps(rbsp: &[u8]) -> FhdResult<Sps> {
    if rbsp.len() < 3 {
        return Err(FhdError::InvalidData("H.264: SPS RBSP 太短".into()));
    }
    let mut br = BitReader::new(rbsp);

    let profile_idc = br.read_bits(8)? as u8;
    let constraint_set_flags = br.read_bits(8)? as u8;
    let level_idc = br.read_bits(8)? as u8;
    let sps_id = br.read_ue()?;
    if sps_id > 31 {
        return Err(FhdError::InvalidData(format!(
            "H.264: sps_id 超出范围, sps_id={}",
            sps_id
        )));
    }

    let mut chroma_format_idc = 1;
    let mut separate_colour_plane = false;
    let mut bit_depth_luma = 8;
    let mut bit_depth_chroma = 8;
    if is_high_profile(profile_idc) {
        chroma_format_idc = br.read_ue()?;
        if chroma_format_idc > 3 {
            return Err(FhdError::InvalidData(format!(
                "H.264: chroma_format_idc 非法, value={}",
                chroma_format_idc
            )));
        }
        if chroma_format_idc == 3 {
            separate_colour_plane = br.read_flag()?;
        }
        bit_depth_luma = read_ue_max(&mut br, 6, "H.264: bit_depth_luma_minus8")? + 8;
        bit_depth_chroma = read_ue_max(&mut br, 6, "H.264: bit_depth_chroma_minus8")? + 8;
        br.skip_bits(1)?; // qpprime_y_zero_transform_bypass_flag

        if br.read_flag()? {
            // seq_scaling_matrix_present_flag
            let list_count = if chroma_format_idc == 3 { 12 } else { 8 };
            for i in 0..list_count {
                if br.read_flag()? {
                    br.skip_scaling_list(if i < 6 { 16 } else { 64 })?;
                }
            }
        }
    }

    br.skip_ue()?; // log2_max_frame_num_minus4
    let poc_type = br.read_ue()?;
    match poc_type {
        0 => br.skip_ue()?, // log2_max_pic_order_cnt_lsb_minus4
        1 => {
            br.skip_bits(1)?; // delta_pic_order_always_zero_flag
            br.skip_se()?; // offset_for_non_ref_pic
            br.skip_se()?; // offset_for_top_to_bottom_field
            let cycle = br.read_ue()?;
            if cycle > 255 {
                return Err(FhdError::InvalidData(format!(
                    "H.264: num_ref_frames_in_pic_order_cnt_cycle 超出范围, value={}",
                    cycle
                )));
            }
            for _ in 0..cycle {
                br.skip_se()?;
            }
        }
        2 => {}
        _ => {
            return Err(FhdError::InvalidData(format!(
                "H.264: pic_order_cnt_type 非法, value={}",
                poc_type
            )));
        }
    }

    let max_num_ref_frames = br.read_ue()?;
    br.skip_bits(1)?; // gaps_in_frame_num_value_allowed_flag

    let pic_width_in_mbs = br.read_ue()? + 1;
    let pic_height_in_map_units = br.read_ue()? + 1;
    let frame_mbs_only = br.read_flag()?;
    if !frame_mbs_only {
        br.skip_bits(1)?; // mb_adaptive_frame_field_flag
    }
    br.skip_bits(1)?; // direct_8x8_inference_flag

    let mut crop = [0u32; 4];
    if br.read_flag()? {
        for v in crop.iter_mut() {
            *v = br.read_ue()?;
        }
    }

    let chroma_array_type = if separate_colour_plane { 0 } else { chroma_format_idc };
    let (unit_x, unit_y) = cropping_unit(chroma_array_type, frame_mbs_only);
    let raw_width = u64::from(pic_width_in_mbs) * 16;
    let raw_height = u64::from(pic_height_in_map_units) * 16 * if frame_mbs_only { 1 } else { 2 };
    let crop_x = (u64::from(crop[0]) + u64::from(crop[1])) * u64::from(unit_x);
    let crop_y = (u64::from(crop[2]) + u64::from(crop[3])) * u64::from(unit_y);
    if crop_x >= raw_width
        || crop_y >= raw_height
        || raw_width > u64::from(u32::MAX)
        || raw_height > u64::from(u32::MAX)
    {
        return Err(FhdError::InvalidData(format!(
            "H.264: 裁剪参数非法, raw={}x{}, crop_x={}, crop_y={}",
            raw_width, raw_height, crop_x, crop_y
        )));
    }
    let width = (raw_width - crop_x) as u32;
    let height = (raw_height - crop_y) as u32;

    let mut sar = Rational::ONE;
    let mut frame_rate = None;
    if br.read_flag()? {
        sar = read_vui_sar(&mut br)?;
        frame_rate = parse_vui_timing(&mut br)?;
    }

    Ok(Sps {
        profile_idc,
        constraint_set_flags,
        level_idc,
        sps_id,
        chroma_format_idc,
        separate_colour_plane,
        bit_depth_luma,
        bit_depth_chroma,
        poc_type,
        max_num_ref_frames,
        pic_width_in_mbs,
        pic_height_in_map_units,
        frame_mbs_only,
        crop,
        width,
        height,
        sar,
        frame_rate,
    })
}

/// 解析 aspect_ratio_info 之后的 VUI 字段, 直到 timing_info
///
/// 后续字段 (HRD 等) 与转封装无关, 不再解析.
fn parse_vui_timing(br: &mut BitReader) -> FhdResult<Option<Rational>> {
    if br.read_flag()? {
        br.skip_bits(1)?; // overscan_appropriate_flag
    }
    if br.read_flag()? {
        // video_format(3) video_full_range_flag(1)
        br.skip_bits(4)?;
        if br.read_flag()? {
            br.skip_bits(24)?; // colour_primaries, transfer_characteristics, matrix_coefficients
        }
    }
    if br.read_flag()? {
        br.skip_ue()?; // chroma_sample_loc_type_top_field
        br.skip_ue()?; // chroma_sample_loc_type_bottom_field
    }
    if !br.read_flag()? {
        return Ok(None);
    }
    let num_units_in_tick = br.read_bits(32)?;
    let time_scale = br.read_bits(32)?;
    if num_units_in_tick == 0 || time_scale == 0 {
        return Ok(None);
    }
    // fps = time_scale / (2 * num_units_in_tick)
    Ok(Some(
        Rational::new(time_scale, num_units_in_tick.saturating_mul(2)).reduce(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fhd_core::BitWriter;

    /// 构造一个 SPS RBSP (不含 NAL 头)
    fn build_sps_rbsp(
        profile: u8,
        width: u32,
        height: u32,
        frame_mbs_only: bool,
        sar_idc: Option<(u8, u16, u16)>,
    ) -> Vec<u8> {
        let mut bw = BitWriter::new();
        bw.write_bits(u32::from(profile), 8);
        bw.write_bits(0, 8); // constraint flags
        bw.write_bits(31, 8); // level 3.1
        bw.write_ue(0); // sps_id
        if is_high_profile(profile) {
            bw.write_ue(1); // chroma_format_idc
            bw.write_ue(0);
            bw.write_ue(0);
            bw.write_flag(false);
            // seq_scaling_matrix_present_flag = 1, 只有第一个 4x4 列表出现
            bw.write_flag(true);
            bw.write_flag(true);
            for _ in 0..16 {
                bw.write_se(0);
            }
            for _ in 1..8 {
                bw.write_flag(false);
            }
        }
        bw.write_ue(0); // log2_max_frame_num_minus4
        bw.write_ue(2); // poc_type
        bw.write_ue(4); // max_num_ref_frames
        bw.write_flag(false);

        let mbs_w = width.div_ceil(16);
        let map_unit_h = if frame_mbs_only { 16 } else { 32 };
        let mbs_h = height.div_ceil(map_unit_h);
        bw.write_ue(mbs_w - 1);
        bw.write_ue(mbs_h - 1);
        bw.write_flag(frame_mbs_only);
        if !frame_mbs_only {
            bw.write_flag(false);
        }
        bw.write_flag(true); // direct_8x8_inference_flag

        let crop_unit_y = if frame_mbs_only { 2 } else { 4 };
        let pad_w = mbs_w * 16 - width;
        let pad_h = mbs_h * map_unit_h - height;
        if pad_w != 0 || pad_h != 0 {
            bw.write_flag(true);
            bw.write_ue(0);
            bw.write_ue(pad_w / 2);
            bw.write_ue(0);
            bw.write_ue(pad_h / crop_unit_y);
        } else {
            bw.write_flag(false);
        }

        match sar_idc {
            Some((idc, w, h)) => {
                bw.write_flag(true); // vui_parameters_present_flag
                bw.write_flag(true); // aspect_ratio_info_present_flag
                bw.write_bits(u32::from(idc), 8);
                if idc == 255 {
                    bw.write_bits(u32::from(w), 16);
                    bw.write_bits(u32::from(h), 16);
                }
                bw.write_flag(false); // overscan
                bw.write_flag(false); // video_signal_type
                bw.write_flag(false); // chroma_loc
                bw.write_flag(true); // timing_info
                bw.write_bits(1001, 32);
                bw.write_bits(60000, 32);
                bw.write_flag(true);
            }
            None => bw.write_flag(false),
        }
        bw.write_trailing_bits();
        bw.finish()
    }

    #[test]
    fn test_sps_baseline_1080p_裁剪() {
        let rbsp = build_sps_rbsp(66, 1920, 1080, true, None);
        let sps = parse_sps(&rbsp).unwrap();
        assert_eq!(sps.profile_idc, 66);
        assert_eq!(sps.level_idc, 31);
        assert_eq!((sps.width, sps.height), (1920, 1080));
        assert_eq!(sps.crop, [0, 0, 0, 4]);
        assert_eq!(sps.sar, Rational::ONE);
        assert_eq!(sps.codec_string(), "avc1.42001f");
    }

    #[test]
    fn test_sps_high_缩放列表与场编码() {
        let rbsp = build_sps_rbsp(100, 1280, 720, false, None);
        let sps = parse_sps(&rbsp).unwrap();
        assert_eq!(sps.profile_idc, 100);
        assert!(!sps.frame_mbs_only);
        assert_eq!((sps.width, sps.height), (1280, 720));
    }

    #[test]
    fn test_sps_vui_宽高比与帧率() {
        let rbsp = build_sps_rbsp(77, 720, 576, true, Some((2, 0, 0)));
        let sps = parse_sps(&rbsp).unwrap();
        assert_eq!(sps.sar, Rational::new(12, 11));
        assert_eq!(sps.frame_rate, Some(Rational::new(30000, 1001)));

        let rbsp = build_sps_rbsp(77, 720, 576, true, Some((255, 64, 45)));
        let sps = parse_sps(&rbsp).unwrap();
        assert_eq!(sps.sar, Rational::new(64, 45));
    }

    #[test]
    fn test_sps_nal_含防竞争字节() {
        let rbsp = build_sps_rbsp(66, 640, 480, true, None);
        let mut nal = vec![0x67];
        // 手工插入防竞争: 每个 00 00 后若跟 <= 03 需插入 03
        let mut zeros = 0;
        for &b in &rbsp {
            if zeros >= 2 && b <= 3 {
                nal.push(3);
                zeros = 0;
            }
            zeros = if b == 0 { zeros + 1 } else { 0 };
            nal.push(b);
        }
        let sps = parse_sps_nal(&nal).unwrap();
        assert_eq!((sps.width, sps.height), (640, 480));
        assert_eq!(sps.info().codec, "avc1.42001f");
    }

    #[test]
    fn test_sps_截断返回错误() {
        let rbsp = build_sps_rbsp(66, 1920, 1080, true, None);
        let err = parse_sps(&rbsp[..5]).unwrap_err();
        assert!(matches!(err, FhdError::TruncatedBitstream), "应为截断错误: {}", err);
        assert!(parse_sps(&[0x42, 0x00]).is_err());
    }

    #[test]
    fn test_sps_位深超出范围() {
        for bit_depth_minus8 in [7, u32::MAX - 1] {
            let mut bw = BitWriter::new();
            bw.write_bits(100, 8);
            bw.write_bits(0, 8);
            bw.write_bits(40, 8);
            bw.write_ue(0); // sps_id
            bw.write_ue(1); // chroma_format_idc
            bw.write_ue(bit_depth_minus8);
            bw.write_ue(0);
            bw.write_trailing_bits();
            let err = parse_sps(&bw.finish()).unwrap_err();
            assert!(matches!(err, FhdError::InvalidData(_)), "应为数据错误: {}", err);
            assert!(err.to_string().contains("bit_depth_luma_minus8"));
        }
    }

    #[test]
    fn test_sps_帧率进入摘要() {
        let rbsp = build_sps_rbsp(77, 720, 576, true, Some((1, 0, 0)));
        let info = parse_sps(&rbsp).unwrap().info();
        assert_eq!(info.frame_rate, Some(Rational::new(30000, 1001)));
        let info = parse_sps(&build_sps_rbsp(66, 640, 480, true, None)).unwrap().info();
        assert_eq!(info.frame_rate, None);
    }

    #[test]
    fn test_sps_非法_sps_id() {
        let mut bw = BitWriter::new();
        bw.write_bits(66, 8);
        bw.write_bits(0, 8);
        bw.write_bits(30, 8);
        bw.write_ue(32);
        bw.write_trailing_bits();
        let err = parse_sps(&bw.finish()).unwrap_err();
        assert!(err.to_string().contains("sps_id 超出范围"), "错误信息不符: {}", err);
    }
}

//! H.265/HEVC SPS 解析器.
//!
//! 完整解析 profile_tier_level, 子层排序信息, 缩放列表, PCM, 短期参考图像集
//! (含帧间预测形式) 与长期参考图像, 才能到达 VUI 中的宽高比字段.

use fhd_core::bitreader::BitReader;
use fhd_core::{FhdError, FhdResult, Rational};

use crate::nal::remove_emulation_prevention;
use crate::parsers::{SpsInfo, read_ue_max, read_vui_sar};

/// general_profile_tier_level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileTierLevel {
    /// general_profile_space (0..=3)
    pub profile_space: u8,
    /// general_tier_flag (false=Main, true=High)
    pub tier: bool,
    /// general_profile_idc
    pub profile_idc: u8,
    /// general_profile_compatibility_flag[0..32], 按码流顺序 (flag[0] 为最高位)
    pub compatibility_flags: u32,
    /// progressive/interlaced/non_packed/frame_only + 44 位约束, 共 48 位
    pub constraint_flags: u64,
    /// general_level_idc (level * 30)
    pub level_idc: u8,
}

impl ProfileTierLevel {
    /// 约束标志的 6 个字节
    pub fn constraint_bytes(&self) -> [u8; 6] {
        let mut bytes = [0u8; 6];
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = (self.constraint_flags >> (40 - 8 * i)) as u8;
        }
        bytes
    }

    /// 编解码器字符串, 如 `hvc1.1.6.L93.B0`
    pub fn codec_string(&self) -> String {
        let space = match self.profile_space {
            1 => "A",
            2 => "B",
            3 => "C",
            _ => "",
        };
        let mut codec = format!(
            "hvc1.{}{}.{:X}.{}{}",
            space,
            self.profile_idc,
            self.compatibility_flags.reverse_bits(),
            if self.tier { 'H' } else { 'L' },
            self.level_idc
        );
        let bytes = self.constraint_bytes();
        let used = bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        for b in &bytes[..used] {
            codec.push_str(&format!(".{:X}", b));
        }
        codec
    }
}

/// HEVC SPS 解析结果
#[derive(Debug, Clone)]
pub struct HevcSps {
    /// sps_video_parameter_set_id
    pub vps_id: u8,
    /// sps_max_sub_layers_minus1 + 1
    pub max_sub_layers: u8,
    /// profile_tier_level
    pub profile_tier_level: ProfileTierLevel,
    /// sps_seq_parameter_set_id
    pub sps_id: u32,
    /// 色度格式 (0=单色, 1=4:2:0, 2=4:2:2, 3=4:4:4)
    pub chroma_format_idc: u32,
    /// 亮度位深
    pub bit_depth_luma: u32,
    /// 色度位深
    pub bit_depth_chroma: u32,
    /// 编码宽度 (像素, 未裁剪)
    pub pic_width: u32,
    /// 编码高度 (像素, 未裁剪)
    pub pic_height: u32,
    /// conformance window (左, 右, 上, 下), 以色度采样单位计
    pub conf_win: [u32; 4],
    /// 显示宽度 (已应用 conformance window)
    pub width: u32,
    /// 显示高度 (已应用 conformance window)
    pub height: u32,
    /// 样本宽高比
    pub sar: Rational,
    /// 帧率 (VUI timing_info)
    pub frame_rate: Option<Rational>,
}

impl HevcSps {
    /// 编解码器字符串
    pub fn codec_string(&self) -> String {
        self.profile_tier_level.codec_string()
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

/// 解析 profile_tier_level(1, max_sub_layers_minus1)
fn parse_profile_tier_level(
    br: &mut BitReader,
    max_sub_layers: u8,
) -> FhdResult<ProfileTierLevel> {
    let profile_space = br.read_bits(2)? as u8;
    let tier = br.read_flag()?;
    let profile_idc = br.read_bits(5)? as u8;
    let compatibility_flags = br.read_bits(32)?;
    let constraint_flags = br.read_bits_u64(48)?;
    let level_idc = br.read_bits(8)? as u8;

    let sub_layers = usize::from(max_sub_layers.saturating_sub(1));
    let mut profile_present = [false; 8];
    let mut level_present = [false; 8];
    for i in 0..sub_layers {
        profile_present[i] = br.read_flag()?;
        level_present[i] = br.read_flag()?;
    }
    if sub_layers > 0 {
        for _ in sub_layers..8 {
            br.skip_bits(2)?; // reserved_zero_2bits
        }
    }
    for i in 0..sub_layers {
        if profile_present[i] {
            // profile_space .. inbld/reserved, 共 88 位
            br.skip_bits(88)?;
        }
        if level_present[i] {
            br.skip_bits(8)?;
        }
    }

    Ok(ProfileTierLevel {
        profile_space,
        tier,
        profile_idc,
        compatibility_flags,
        constraint_flags,
        level_idc,
    })
}

/// 跳过 scaling_list_data()
fn skip_scaling_list_data(br: &mut BitReader) -> FhdResult<()> {
    for size_id in 0..4usize {
        let step = if size_id == 3 { 3 } else { 1 };
        for _ in (0..6).step_by(step) {
            if !br.read_flag()? {
                br.skip_ue()?; // scaling_list_pred_matrix_id_delta
                continue;
            }
            let coef_num = 64.min(1usize << (4 + (size_id << 1)));
            if size_id > 1 {
                br.skip_se()?; // scaling_list_dc_coef_minus8
            }
            for _ in 0..coef_num {
                br.skip_se()?;
            }
        }
    }
    Ok(())
}

/// 跳过全部 st_ref_pic_set(), 帧间预测形式需要参考集的 NumDeltaPocs
fn skip_short_term_ref_pic_sets(br: &mut BitReader, num_sets: u32) -> FhdResult<()> {
    let mut num_delta_pocs: Vec<u32> = Vec::with_capacity(num_sets as usize);
    for idx in 0..num_sets as usize {
        let inter_rps_pred = idx != 0 && br.read_flag()?;
        if inter_rps_pred {
            // SPS 中 delta_idx_minus1 不出现, 参考集为前一个
            br.skip_bits(1)?; // delta_rps_sign
            br.skip_ue()?; // abs_delta_rps_minus1
            let ref_count = num_delta_pocs[idx - 1];
            let mut count = 0;
            for _ in 0..=ref_count {
                let used_by_curr_pic = br.read_flag()?;
                let use_delta = used_by_curr_pic || br.read_flag()?;
                if use_delta {
                    count += 1;
                }
            }
            num_delta_pocs.push(count);
        } else {
            let num_negative = br.read_ue()?;
            let num_positive = br.read_ue()?;
            if num_negative > 16 || num_positive > 16 {
                return Err(FhdError::InvalidData(format!(
                    "HEVC: 短期参考图像数非法, negative={}, positive={}",
                    num_negative, num_positive
                )));
            }
            for _ in 0..num_negative + num_positive {
                br.skip_ue()?; // delta_poc_sX_minus1
                br.skip_bits(1)?; // used_by_curr_pic_sX_flag
            }
            num_delta_pocs.push(num_negative + num_positive);
        }
    }
    Ok(())
}

/// 从完整 NAL 单元 (含 2 字节头, 可能含防竞争字节) 解析 SPS
pub fn parse_hevc_sps_nal(nal: &[u8]) -> FhdResult<HevcSps> {
    if nal.len() < 3 {
        return Err(FhdError::InvalidData(format!(
            "HEVC: SPS NAL 太短, len={}",
            nal.len()
        )));
    }
    parse_hevc_sps(&remove_emulation_prevention(&nal[2..]))
}

/// 从 RBSP (不含 NAL 头) 解析 SPS
pub fn parse_hevc_sps(rbsp: &[u8]) -> FhdResult<HevcSps> {
    let mut br = BitReader::new(rbsp);

    let vps_id = br.read_bits(4)? as u8;
    let max_sub_layers = br.read_bits(3)? as u8 + 1;
    br.skip_bits(1)?; // sps_temporal_id_nesting_flag
    let profile_tier_level = parse_profile_tier_level(&mut br, max_sub_layers)?;

    let sps_id = br.read_ue()?;
    if sps_id > 15 {
        return Err(FhdError::InvalidData(format!(
            "HEVC: sps_id 超出范围, sps_id={}",
            sps_id
        )));
    }
    let chroma_format_idc = br.read_ue()?;
    if chroma_format_idc > 3 {
        return Err(FhdError::InvalidData(format!(
            "HEVC: chroma_format_idc 非法, value={}",
            chroma_format_idc
        )));
    }
    let separate_colour_plane = chroma_format_idc == 3 && br.read_flag()?;

    let pic_width = br.read_ue()?;
    let pic_height = br.read_ue()?;
    let mut conf_win = [0u32; 4];
    if br.read_flag()? {
        for v in conf_win.iter_mut() {
            *v = br.read_ue()?;
        }
    }

    let bit_depth_luma = read_ue_max(&mut br, 8, "HEVC: bit_depth_luma_minus8")? + 8;
    let bit_depth_chroma = read_ue_max(&mut br, 8, "HEVC: bit_depth_chroma_minus8")? + 8;
    let log2_max_poc_lsb = read_ue_max(&mut br, 12, "HEVC: log2_max_pic_order_cnt_lsb_minus4")? + 4;

    let sub_layer_ordering_info = br.read_flag()?;
    let first = if sub_layer_ordering_info { 0 } else { max_sub_layers - 1 };
    for _ in first..max_sub_layers {
        br.skip_ue()?; // sps_max_dec_pic_buffering_minus1
        br.skip_ue()?; // sps_max_num_reorder_pics
        br.skip_ue()?; // sps_max_latency_increase_plus1
    }

    // log2_min_luma_coding_block_size_minus3 .. max_transform_hierarchy_depth_intra
    for _ in 0..6 {
        br.skip_ue()?;
    }

    if br.read_flag()? && br.read_flag()? {
        // scaling_list_enabled_flag && sps_scaling_list_data_present_flag
        skip_scaling_list_data(&mut br)?;
    }
    br.skip_bits(2)?; // amp_enabled_flag, sample_adaptive_offset_enabled_flag

    if br.read_flag()? {
        // pcm_enabled_flag
        br.skip_bits(8)?; // pcm_sample_bit_depth_luma/chroma_minus1
        br.skip_ue()?;
        br.skip_ue()?;
        br.skip_bits(1)?; // pcm_loop_filter_disabled_flag
    }

    let num_short_term_ref_pic_sets = br.read_ue()?;
    if num_short_term_ref_pic_sets > 64 {
        return Err(FhdError::InvalidData(format!(
            "HEVC: num_short_term_ref_pic_sets 超出范围, value={}",
            num_short_term_ref_pic_sets
        )));
    }
    skip_short_term_ref_pic_sets(&mut br, num_short_term_ref_pic_sets)?;

    if br.read_flag()? {
        // long_term_ref_pics_present_flag
        let num_long_term = br.read_ue()?;
        if num_long_term > 32 {
            return Err(FhdError::InvalidData(format!(
                "HEVC: num_long_term_ref_pics_sps 超出范围, value={}",
                num_long_term
            )));
        }
        for _ in 0..num_long_term {
            br.skip_bits(log2_max_poc_lsb as usize + 1)?;
        }
    }
    br.skip_bits(2)?; // sps_temporal_mvp_enabled_flag, strong_intra_smoothing_enabled_flag

    let mut sar = Rational::ONE;
    let mut frame_rate = None;
    if br.read_flag()? {
        sar = read_vui_sar(&mut br)?;
        frame_rate = parse_vui_timing(&mut br)?;
    }

    let (sub_width_c, sub_height_c): (u32, u32) = match (chroma_format_idc, separate_colour_plane) {
        (1, _) => (2, 2),
        (2, _) => (2, 1),
        _ => (1, 1),
    };
    let crop_x = u64::from(sub_width_c) * (u64::from(conf_win[0]) + u64::from(conf_win[1]));
    let crop_y = u64::from(sub_height_c) * (u64::from(conf_win[2]) + u64::from(conf_win[3]));
    if crop_x >= u64::from(pic_width) || crop_y >= u64::from(pic_height) {
        return Err(FhdError::InvalidData(format!(
            "HEVC: conformance window 非法, pic={}x{}, crop_x={}, crop_y={}",
            pic_width, pic_height, crop_x, crop_y
        )));
    }

    Ok(HevcSps {
        vps_id,
        max_sub_layers,
        profile_tier_level,
        sps_id,
        chroma_format_idc,
        bit_depth_luma,
        bit_depth_chroma,
        pic_width,
        pic_height,
        conf_win,
        width: pic_width - crop_x as u32,
        height: pic_height - crop_y as u32,
        sar,
        frame_rate,
    })
}

/// 解析 aspect_ratio_info 之后到 vui_timing_info 为止的 VUI 字段
fn parse_vui_timing(br: &mut BitReader) -> FhdResult<Option<Rational>> {
    if br.read_flag()? {
        br.skip_bits(1)?; // overscan_appropriate_flag
    }
    if br.read_flag()? {
        br.skip_bits(4)?; // video_format, video_full_range_flag
        if br.read_flag()? {
            br.skip_bits(24)?;
        }
    }
    if br.read_flag()? {
        br.skip_ue()?;
        br.skip_ue()?;
    }
    // neutral_chroma_indication_flag, field_seq_flag, frame_field_info_present_flag
    br.skip_bits(3)?;
    if br.read_flag()? {
        // default_display_window
        for _ in 0..4 {
            br.skip_ue()?;
        }
    }
    if !br.read_flag()? {
        return Ok(None);
    }
    let num_units_in_tick = br.read_bits(32)?;
    let time_scale = br.read_bits(32)?;
    if num_units_in_tick == 0 || time_scale == 0 {
        return Ok(None);
    }
    Ok(Some(Rational::new(time_scale, num_units_in_tick).reduce()))
}

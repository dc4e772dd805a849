//! 码流解析集成测试
//!
//! 覆盖 Annex B 分帧, Exp-Golomb, SPS 与 avcC, ADTS 与 MPEG 音频帧头.

use bytes::Bytes;
use fhd::codec::audio::aac::AAC_SAMPLES_PER_FRAME;
use fhd::codec::audio::{
    parse_adts, parse_audio_specific_config, parse_mpeg_audio, parse_mpeg_audio_header,
    silent_frame,
};
use fhd::codec::nal::join_annex_b;
use fhd::codec::parsers::h264::{build_avc_decoder_config, parse_avc_decoder_config, parse_sps_nal};
use fhd::codec::parsers::sei::scan_sei;
use fhd::codec::{VideoCodec, remove_emulation_prevention, split_annex_b, split_length_prefixed};
use fhd::core::{BitReader, BitWriter};

// ============================================================
// 辅助函数
// ============================================================

/// 1920x1080 Main profile SPS (底部裁 8 行)
fn build_avc_sps() -> Vec<u8> {
    let mut bw = BitWriter::new();
    bw.write_bits(77, 8);
    bw.write_bits(0x40, 8);
    bw.write_bits(40, 8);
    bw.write_ue(0);
    bw.write_ue(0);
    bw.write_ue(0); // poc_type 0
    bw.write_ue(2);
    bw.write_ue(4);
    bw.write_flag(false);
    bw.write_ue(119); // 120 MB
    bw.write_ue(67); // 68 MB = 1088
    bw.write_flag(true);
    bw.write_flag(true);
    bw.write_flag(true); // cropping
    bw.write_ue(0);
    bw.write_ue(0);
    bw.write_ue(0);
    bw.write_ue(4);
    bw.write_flag(false);
    bw.write_trailing_bits();
    let mut nal = vec![0x67];
    nal.extend(bw.finish());
    nal
}

/// ADTS 帧: LC, 48kHz, 立体声
fn adts_frame(fill: u8, payload_len: usize) -> Vec<u8> {
    let len = payload_len + 7;
    let mut frame = vec![
        0xFF,
        0xF1,
        0x4C,
        0x80 | ((len >> 11) as u8 & 0x03),
        (len >> 3) as u8,
        ((len & 7) << 5) as u8 | 0x1F,
        0xFC,
    ];
    frame.resize(len, fill);
    frame
}

// ============================================================
// Annex B / 长度前缀
// ============================================================

#[test]
fn test_annex_b_分割后重新拼接与原始字节一致() {
    let data: Vec<u8> = [
        &[0x00, 0x00, 0x00, 0x01, 0x09, 0xF0][..],
        &[0x00, 0x00, 0x01, 0x67, 0x42, 0xC0, 0x1E][..],
        &[0x00, 0x00, 0x01, 0x68, 0xCE, 0x38, 0x80][..],
        &[0x00, 0x00, 0x00, 0x01, 0x65, 0x88, 0x84, 0x00, 0x03, 0x01][..],
        &[0x00, 0x00, 0x01, 0x41, 0x9A][..],
    ]
    .concat();
    let bytes = Bytes::from(data.clone());
    let split = split_annex_b(&bytes);
    assert_eq!(split.units.len(), 4);
    assert_eq!(split.units[0].start_code_len, 4);
    assert_eq!(split.units[1].start_code_len, 3);
    assert_eq!(split.trailing.as_ref().map(|u| u.data.as_ref()), Some(&[0x41, 0x9A][..]));

    let joined = join_annex_b(split.units.iter().chain(split.trailing.iter()));
    assert_eq!(joined, data);
}

#[test]
fn test_annex_b_丢弃首个起始码之前的字节() {
    let bytes = Bytes::from_static(&[0xAB, 0xCD, 0x00, 0x00, 0x01, 0x09, 0xF0]);
    let units = split_annex_b(&bytes).into_complete_units();
    assert_eq!(units, vec![Bytes::from_static(&[0x09, 0xF0])]);
}

#[test]
fn test_长度前缀_各种长度字段() {
    let data = Bytes::from_static(&[0x00, 0x02, 0x09, 0xF0, 0x00, 0x03, 0x65, 0x88, 0x84]);
    let units = split_length_prefixed(&data, 2);
    assert_eq!(units.len(), 2);
    assert_eq!(units[1].as_ref(), &[0x65, 0x88, 0x84]);

    let data = Bytes::from_static(&[0x01, 0x09, 0x02, 0x41, 0x9A]);
    assert_eq!(split_length_prefixed(&data, 1).len(), 2);
}

#[test]
fn test_去除防竞争字节() {
    assert_eq!(
        remove_emulation_prevention(&[0x00, 0x00, 0x03, 0x01, 0x00, 0x00, 0x03, 0x00]),
        vec![0x00, 0x00, 0x01, 0x00, 0x00, 0x00]
    );
}

// ============================================================
// Exp-Golomb
// ============================================================

#[test]
fn test_exp_golomb_往返() {
    let values = [0u32, 1, 2, 127, 128, 65535];
    let mut bw = BitWriter::new();
    for &v in &values {
        bw.write_ue(v);
    }
    for s in [0, 1, -1, 63, -64] {
        bw.write_se(s);
    }
    bw.write_trailing_bits();
    let data = bw.finish();

    let mut br = BitReader::new(&data);
    for &v in &values {
        assert_eq!(br.read_ue().ok(), Some(v));
    }
    for s in [0, 1, -1, 63, -64] {
        assert_eq!(br.read_se().ok(), Some(s));
    }
}

#[test]
fn test_exp_golomb_截断返回错误() {
    // 前导零之后没有足够的位
    let mut br = BitReader::new(&[0x00, 0x01]);
    assert!(br.read_ue().is_err());
}

// ============================================================
// SPS / avcC / SEI
// ============================================================

#[test]
fn test_sps_构建_avcc_后解析() {
    let sps = build_avc_sps();
    let parsed = match parse_sps_nal(&sps) {
        Ok(sps) => sps.info(),
        Err(e) => panic!("SPS 解析失败: {}", e),
    };
    assert_eq!((parsed.width, parsed.height), (1920, 1080));
    assert_eq!(parsed.codec, "avc1.4d4028");

    let pps = [0x68u8, 0xEE, 0x3C, 0x80];
    let record = match build_avc_decoder_config(&[&sps], &[&pps], 4) {
        Ok(record) => record,
        Err(e) => panic!("avcC 构建失败: {}", e),
    };
    let config = match parse_avc_decoder_config(&Bytes::from(record)) {
        Ok(config) => config,
        Err(e) => panic!("avcC 解析失败: {}", e),
    };
    assert_eq!(config.profile_idc, 77);
    assert_eq!(config.level_idc, 40);
    assert_eq!(config.length_size, 4);
    assert_eq!(config.sps_list, vec![Bytes::from(sps)]);
    assert_eq!(config.pps_list, vec![Bytes::copy_from_slice(&pps)]);
    assert_eq!(config.info.map(|i| i.codec), Some(parsed.codec));
}

#[test]
fn test_sei_user_data_unregistered() {
    let mut nal = vec![0x06, 0x05, 18];
    nal.extend(0x11u8..=0x20);
    nal.extend_from_slice(&[0xAA, 0xBB, 0x80]);

    let messages = scan_sei(VideoCodec::Avc, &nal);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].payload_type, 5);
    assert_eq!(messages[0].payload_size, 18);
    assert_eq!(messages[0].uuid.map(|u| u[0]), Some(0x11));
}

// ============================================================
// AAC / MPEG 音频
// ============================================================

#[test]
fn test_adts_解析与配置推导() {
    let mut data = vec![0x00, 0x12, 0x34];
    data.extend(adts_frame(0x01, 20));
    data.extend(adts_frame(0x02, 30));
    let mut tail = adts_frame(0x03, 40);
    tail.truncate(12);
    data.extend(&tail);

    let parsed = match parse_adts(&Bytes::from(data), 9000) {
        Some(parsed) => parsed,
        None => panic!("ADTS 解析失败"),
    };
    assert_eq!(parsed.skipped, 3);
    assert_eq!(parsed.remaining, 12);
    assert_eq!(parsed.frames.len(), 2);
    assert_eq!(parsed.frames[0].data.len(), 20);
    assert_eq!(parsed.frames[1].pts, 9000 + 1920);

    assert_eq!(parsed.config.codec, "mp4a.40.2");
    assert_eq!(parsed.config.config, vec![0x11, 0x90]);
    let asc = match parse_audio_specific_config(&parsed.config.config) {
        Ok(asc) => asc,
        Err(e) => panic!("ASC 解析失败: {}", e),
    };
    assert_eq!(asc.sample_rate, 48000);
    assert_eq!(asc.channel_count, 2);
}

#[test]
fn test_静音帧只覆盖_aac_lc() {
    assert!(silent_frame("mp4a.40.2", 2).is_some());
    assert!(silent_frame("mp4a.40.2", 7).is_none());
    assert!(silent_frame("mp4a.40.5", 2).is_none());
    assert!(silent_frame("mp3", 2).is_none());
}

#[test]
fn test_mpeg_音频帧头拒绝非法索引() {
    // 128kbps, 44100Hz
    let valid = [0xFF, 0xFB, 0x90, 0x00];
    let header = match parse_mpeg_audio_header(&valid) {
        Some(header) => header,
        None => panic!("合法帧头被拒绝"),
    };
    assert_eq!(header.frame_length, 417);
    assert_eq!(header.sample_rate, 44100);
    assert_eq!(header.samples_per_frame, 1152);
    assert_eq!(header.channel_count, 2);

    // 比特率索引 0 (自由格式) 与 15
    assert!(parse_mpeg_audio_header(&[0xFF, 0xFB, 0x00, 0x00]).is_none());
    assert!(parse_mpeg_audio_header(&[0xFF, 0xFB, 0xF0, 0x00]).is_none());
    // 采样率索引 3
    assert!(parse_mpeg_audio_header(&[0xFF, 0xFB, 0x9C, 0x00]).is_none());
}

#[test]
fn test_mpeg_音频帧扫描() {
    let mut frame = vec![0xFF, 0xFB, 0x90, 0x00];
    frame.resize(417, 0x55);
    let data: Vec<u8> = [frame.clone(), frame].concat();

    let parsed = parse_mpeg_audio(&Bytes::from(data), 1000, 90_000);
    assert!(!parsed.broken);
    assert_eq!(parsed.frames.len(), 2);
    assert_eq!(parsed.frames[0].pts, 1000);
    // round(1152 * 90000 / 44100) = 2351
    assert_eq!(parsed.frames[1].pts, 1000 + 2351);
    assert_eq!(parsed.samples_per_frame, 1152);
    assert_ne!(parsed.samples_per_frame, AAC_SAMPLES_PER_FRAME);
}

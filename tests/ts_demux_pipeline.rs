//! MPEG-TS 解封装器集成测试
//!
//! 字节流按 TS 包边界或任意字节位置拆分成多次调用, 结果应与一次送入一致.

use fhd::codec::VideoCodec;
use fhd::core::clock::PTS_WRAP;
use fhd::format::{
    AudioSample, ContainerFormat, DemuxOptions, Demuxer, TsDemuxer, VideoSample, detect,
};

// ============================================================
// 辅助函数: 构建 TS 包
// ============================================================

const TS_PACKET_SIZE: usize = 188;
const TS_SYNC_BYTE: u8 = 0x47;
const PMT_PID: u16 = 0x1000;
const VIDEO_PID: u16 = 0x100;
const AUDIO_PID: u16 = 0x101;

/// 构造普通 TS 包 (无 adaptation field)
fn build_ts_packet(pid: u16, pusi: bool, payload: &[u8]) -> [u8; TS_PACKET_SIZE] {
    let mut pkt = [0xFFu8; TS_PACKET_SIZE];
    pkt[0] = TS_SYNC_BYTE;
    pkt[1] = (if pusi { 0x40 } else { 0x00 }) | ((pid >> 8) as u8 & 0x1F);
    pkt[2] = pid as u8;
    pkt[3] = 0x10; // AFC=01, CC=0
    let n = payload.len().min(TS_PACKET_SIZE - 4);
    pkt[4..4 + n].copy_from_slice(&payload[..n]);
    pkt
}

/// 构造带 adaptation field 的 TS 包, 负载不足时以填充字节补齐
fn build_ts_packet_with_af(pid: u16, pusi: bool, payload: &[u8]) -> [u8; TS_PACKET_SIZE] {
    let mut pkt = [0xFFu8; TS_PACKET_SIZE];
    pkt[0] = TS_SYNC_BYTE;
    pkt[1] = (if pusi { 0x40 } else { 0x00 }) | ((pid >> 8) as u8 & 0x1F);
    pkt[2] = pid as u8;
    pkt[3] = 0x30; // AFC=11
    let payload_space = TS_PACKET_SIZE - 4 - 2;
    let n = payload.len().min(payload_space);
    let stuffing = payload_space - n;
    pkt[4] = (1 + stuffing) as u8;
    pkt[5] = 0x00;
    let start = 6 + stuffing;
    pkt[start..start + n].copy_from_slice(&payload[..n]);
    pkt
}

/// 把 PES 切分为 TS 包
fn packetize(pid: u16, pes: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut rest = pes;
    let mut first = true;
    while !rest.is_empty() {
        let take = if rest.len() >= TS_PACKET_SIZE - 4 {
            TS_PACKET_SIZE - 4
        } else {
            rest.len().min(TS_PACKET_SIZE - 6)
        };
        let (chunk, tail) = rest.split_at(take);
        if take == TS_PACKET_SIZE - 4 {
            out.extend_from_slice(&build_ts_packet(pid, first, chunk));
        } else {
            out.extend_from_slice(&build_ts_packet_with_af(pid, first, chunk));
        }
        first = false;
        rest = tail;
    }
    out
}

/// 编码 33-bit 时间戳到 5 字节
fn encode_timestamp(prefix: u8, ts: u64) -> [u8; 5] {
    [
        (prefix << 4) | ((((ts >> 30) as u8) & 0x07) << 1) | 0x01,
        (ts >> 22) as u8,
        0x01 | ((((ts >> 15) as u8) & 0x7F) << 1),
        (ts >> 7) as u8,
        0x01 | (((ts as u8) & 0x7F) << 1),
    ]
}

/// 构造 PES 包; `bounded` 为 false 时 PES_packet_length 为 0
fn build_pes(stream_id: u8, pts: u64, dts: Option<u64>, data: &[u8], bounded: bool) -> Vec<u8> {
    let mut header = Vec::new();
    let flags = match dts {
        Some(dts) => {
            header.extend_from_slice(&encode_timestamp(3, pts));
            header.extend_from_slice(&encode_timestamp(1, dts));
            0xC0
        }
        None => {
            header.extend_from_slice(&encode_timestamp(2, pts));
            0x80
        }
    };
    let pes_len = if bounded { 3 + header.len() + data.len() } else { 0 };
    let mut pes = vec![0x00, 0x00, 0x01, stream_id, (pes_len >> 8) as u8, pes_len as u8];
    pes.extend_from_slice(&[0x80, flags, header.len() as u8]);
    pes.extend_from_slice(&header);
    pes.extend_from_slice(data);
    pes
}

/// 构造 PAT 包
fn build_pat(pmt_pid: u16) -> [u8; TS_PACKET_SIZE] {
    let mut payload = vec![0x00]; // pointer_field
    payload.extend_from_slice(&[0x00, 0xB0, 13, 0x00, 0x01, 0xC1, 0x00, 0x00]);
    payload.extend_from_slice(&[0x00, 0x01, 0xE0 | (pmt_pid >> 8) as u8, pmt_pid as u8]);
    payload.extend_from_slice(&[0x00; 4]); // CRC (不校验)
    build_ts_packet(0x0000, true, &payload)
}

/// 构造 PMT 包
fn build_pmt(pmt_pid: u16, entries: &[(u8, u16)]) -> [u8; TS_PACKET_SIZE] {
    let section_length = 9 + entries.len() * 5 + 4;
    let mut payload = vec![0x00, 0x02, 0xB0, section_length as u8];
    payload.extend_from_slice(&[0x00, 0x01, 0xC1, 0x00, 0x00]);
    payload.extend_from_slice(&[0xE0 | (VIDEO_PID >> 8) as u8, VIDEO_PID as u8, 0xF0, 0x00]);
    for &(stream_type, pid) in entries {
        payload.extend_from_slice(&[stream_type, 0xE0 | (pid >> 8) as u8, pid as u8, 0xF0, 0x00]);
    }
    payload.extend_from_slice(&[0x00; 4]);
    build_ts_packet(pmt_pid, true, &payload)
}

fn annex_b(units: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::new();
    for unit in units {
        out.extend_from_slice(&[0x00, 0x00, 0x00, 0x01]);
        out.extend_from_slice(unit);
    }
    out
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

/// H.264 视频流: 每个 PES 一个访问单元, 不声明长度
fn build_video_ts(frames: u64) -> Vec<u8> {
    let mut ts = Vec::new();
    ts.extend_from_slice(&build_pat(PMT_PID));
    ts.extend_from_slice(&build_pmt(PMT_PID, &[(0x1B, VIDEO_PID)]));
    for i in 0..frames {
        let slice: Vec<u8> = if i % 4 == 0 {
            let mut s = vec![0x65, 0x88];
            s.resize(300, i as u8 | 0x10);
            s
        } else {
            let mut s = vec![0x41, 0x9A];
            s.resize(120, i as u8 | 0x10);
            s
        };
        let es = annex_b(&[&[0x09, 0xF0], &slice]);
        let dts = 3000 + i * 3000;
        let pes = build_pes(0xE0, dts + 6000, Some(dts), &es, false);
        ts.extend(packetize(VIDEO_PID, &pes));
    }
    ts
}

/// AAC 音频流: 每个 PES 三帧, 声明长度
fn build_audio_ts(pes_count: u64) -> Vec<u8> {
    let mut ts = Vec::new();
    ts.extend_from_slice(&build_pat(PMT_PID));
    ts.extend_from_slice(&build_pmt(PMT_PID, &[(0x0F, AUDIO_PID)]));
    for i in 0..pes_count {
        let mut es = Vec::new();
        for k in 0..3 {
            es.extend(adts_frame((i * 3 + k) as u8, 90 + k as usize * 10));
        }
        let pes = build_pes(0xC0, 9000 + i * 3 * 1920, None, &es, true);
        ts.extend(packetize(AUDIO_PID, &pes));
    }
    ts
}

/// 音视频交织: 每两个视频访问单元后跟一个三帧 AAC PES, 两路都从 3000 开始
fn build_av_ts(video_frames: u64) -> Vec<u8> {
    let mut ts = Vec::new();
    ts.extend_from_slice(&build_pat(PMT_PID));
    ts.extend_from_slice(&build_pmt(PMT_PID, &[(0x1B, VIDEO_PID), (0x0F, AUDIO_PID)]));
    for i in 0..video_frames {
        let slice: &[u8] = if i % 4 == 0 { &[0x65, 0x88, 0x84] } else { &[0x41, 0x9A, 0x21] };
        let es = annex_b(&[&[0x09, 0xF0], slice]);
        ts.extend(packetize(VIDEO_PID, &build_pes(0xE0, 3000 + i * 3000, None, &es, false)));
        if i % 2 == 0 {
            let j = i / 2;
            let mut es = Vec::new();
            for k in 0..3 {
                es.extend(adts_frame((j * 3 + k) as u8, 64));
            }
            ts.extend(packetize(AUDIO_PID, &build_pes(0xC0, 3000 + j * 3 * 1920, None, &es, true)));
        }
    }
    ts
}

fn init_log() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// 依次送入各段并在最后 flush, 收集全部样本
fn demux_in_parts(parts: &[&[u8]]) -> (Vec<VideoSample>, Vec<AudioSample>) {
    let mut demuxer = TsDemuxer::new();
    let mut video = Vec::new();
    let mut audio = Vec::new();
    for part in parts {
        let out = match demuxer.demux(part, &DemuxOptions::default()) {
            Ok(out) => out,
            Err(e) => panic!("解封装失败: {}", e),
        };
        video.extend(out.video_track.samples.iter().cloned());
        audio.extend(out.audio_track.samples.iter().cloned());
    }
    let out = demuxer.flush();
    video.extend(out.video_track.samples.iter().cloned());
    audio.extend(out.audio_track.samples.iter().cloned());
    (video, audio)
}

fn video_key(samples: &[VideoSample]) -> Vec<(i64, i64, bool, Vec<Vec<u8>>)> {
    samples
        .iter()
        .map(|s| (s.pts, s.dts, s.key, s.units.iter().map(|u| u.to_vec()).collect()))
        .collect()
}

// ============================================================
// 测试
// ============================================================

#[test]
fn test_探测_ts() {
    assert_eq!(detect(&build_video_ts(2)), Some(ContainerFormat::MpegTs));
}

#[test]
fn test_视频_单次与按包拆分一致() {
    init_log();
    let ts = build_video_ts(8);
    let (expected, _) = demux_in_parts(&[&ts]);
    assert_eq!(expected.len(), 8);
    assert!(expected[0].key && expected[4].key);
    assert!(!expected[1].key);
    assert_eq!((expected[0].pts, expected[0].dts), (9000, 3000));

    for boundary in (TS_PACKET_SIZE..ts.len()).step_by(TS_PACKET_SIZE) {
        let (video, _) = demux_in_parts(&[&ts[..boundary], &ts[boundary..]]);
        assert_eq!(video_key(&video), video_key(&expected), "boundary={}", boundary);
    }
}

#[test]
fn test_音频_单次与按包拆分一致() {
    let ts = build_audio_ts(5);
    let (_, expected) = demux_in_parts(&[&ts]);
    assert_eq!(expected.len(), 15);
    let pts: Vec<i64> = expected.iter().take(4).map(|s| s.pts).collect();
    assert_eq!(pts, vec![9000, 10920, 12840, 14760]);

    for boundary in (TS_PACKET_SIZE..ts.len()).step_by(TS_PACKET_SIZE) {
        let (_, audio) = demux_in_parts(&[&ts[..boundary], &ts[boundary..]]);
        assert_eq!(audio, expected, "boundary={}", boundary);
    }
}

#[test]
fn test_音视频交织_单次与按包拆分一致() {
    init_log();
    let ts = build_av_ts(12);
    let (expected_video, expected_audio) = demux_in_parts(&[&ts]);
    assert_eq!(expected_video.len(), 12);
    assert_eq!(expected_audio.len(), 18);
    assert_eq!((expected_video[0].pts, expected_video[0].dts), (3000, 3000));
    assert_eq!(expected_audio[0].pts, 3000);

    for boundary in (TS_PACKET_SIZE..ts.len()).step_by(TS_PACKET_SIZE) {
        let (video, audio) = demux_in_parts(&[&ts[..boundary], &ts[boundary..]]);
        assert_eq!(video_key(&video), video_key(&expected_video), "boundary={}", boundary);
        assert_eq!(audio, expected_audio, "boundary={}", boundary);
    }
}

#[test]
fn test_任意字节位置拆分() {
    let ts = build_video_ts(4);
    let (expected, _) = demux_in_parts(&[&ts]);
    for split in [1, 187, 189, 500, ts.len() - 1] {
        let (video, _) = demux_in_parts(&[&ts[..split], &ts[split..]]);
        assert_eq!(video_key(&video), video_key(&expected), "split={}", split);
    }

    // 逐块送入
    let chunks: Vec<&[u8]> = ts.chunks(100).collect();
    let (video, _) = demux_in_parts(&chunks);
    assert_eq!(video_key(&video), video_key(&expected));
}

#[test]
fn test_hevc_流() {
    let mut ts = Vec::new();
    ts.extend_from_slice(&build_pat(PMT_PID));
    ts.extend_from_slice(&build_pmt(PMT_PID, &[(0x24, VIDEO_PID)]));
    // AUD(35) + IDR_W_RADL(19), 然后 AUD + TRAIL_R(1)
    let es = annex_b(&[&[0x46, 0x01, 0x50], &[0x26, 0x01, 0xAF, 0x80], &[0x46, 0x01, 0x50], &[0x02, 0x01, 0xD0]]);
    ts.extend(packetize(VIDEO_PID, &build_pes(0xE0, 3000, None, &es, true)));

    let mut demuxer = TsDemuxer::new();
    let out = match demuxer.demux(&ts, &DemuxOptions::default()) {
        Ok(out) => out,
        Err(e) => panic!("解封装失败: {}", e),
    };
    let track = out.video_track;
    assert_eq!(track.codec, Some(VideoCodec::Hevc));
    assert_eq!(track.samples.len(), 2);
    assert!(track.samples[0].key);
    assert!(!track.samples[1].key);
    assert_eq!(track.samples[0].units.len(), 2);
}

#[test]
fn test_33_位回绕续接() {
    let wrap = PTS_WRAP as u64;
    let mut demuxer = TsDemuxer::new();
    let mut head = Vec::new();
    head.extend_from_slice(&build_pat(PMT_PID));
    head.extend_from_slice(&build_pmt(PMT_PID, &[(0x0F, AUDIO_PID)]));
    head.extend(packetize(AUDIO_PID, &build_pes(0xC0, wrap - 1920, None, &adts_frame(1, 50), true)));

    let out = match demuxer.demux(&head, &DemuxOptions::default()) {
        Ok(out) => out,
        Err(e) => panic!("解封装失败: {}", e),
    };
    assert_eq!(out.audio_track.samples[0].pts, PTS_WRAP - 1920);

    // 回绕后时间戳从 0 开始
    let next = packetize(AUDIO_PID, &build_pes(0xC0, 0, None, &adts_frame(2, 50), true));
    let out = match demuxer.demux(&next, &DemuxOptions::default()) {
        Ok(out) => out,
        Err(e) => panic!("解封装失败: {}", e),
    };
    let audio = out.audio_track;
    assert_eq!(audio.samples[0].pts, PTS_WRAP);
    assert_eq!(audio.inserted, 0);
    assert_eq!(audio.dropped, 0);
    assert_eq!(audio.base_media_decode_time, 1024);
    assert_eq!(audio.sequence_number, 2);
}

#[test]
fn test_discontinuity_重新发现流() {
    let mut demuxer = TsDemuxer::new();
    let video = build_video_ts(2);
    assert!(demuxer.demux(&video, &DemuxOptions::default()).is_ok());
    assert_eq!(demuxer.video_track().codec, Some(VideoCodec::Avc));

    let audio = build_audio_ts(1);
    let out = match demuxer.demux(&audio, &DemuxOptions::default().with_discontinuity(true)) {
        Ok(out) => out,
        Err(e) => panic!("解封装失败: {}", e),
    };
    assert_eq!(out.video_track.codec, None);
    assert_eq!(out.audio_track.samples.len(), 3);
    assert_eq!(out.audio_track.sequence_number, 1);
}

//! MPEG-TS (Transport Stream) 解封装器.
//!
//! # TS 包结构 (188 字节)
//! ```text
//! ┌──────────────────────────────────────────┐
//! │ 同步字节 (0x47)                    1 byte│
//! │ TEI(1) + PUSI(1) + Priority(1) +         │
//! │   PID(13)                         2 bytes│
//! │ TSC(2) + AFC(2) + CC(4)          1 byte │
//! │ [Adaptation Field]               可变     │
//! │ [Payload]                        可变     │
//! └──────────────────────────────────────────┘
//! ```
//!
//! # 跨调用状态
//! - 不足 188 字节的尾部被保留, 拼接到下一次输入之前
//! - 每个 ES 的 PES 片段一直累积到下一个 PUSI; 声明了长度的 PES 收齐后立即解析
//! - PMT 之前到达的 ES 包先排队, PMT 解析后重新分派
//! - 只使用 PMT 中第一个视频流与第一个音频流
//! - PMT 同时声明音视频且时间轴尚未开始时, 样本暂存到两条轨道各有至少 2 个
//!   样本为止, 起点对齐因此不受调用切分位置影响

use std::collections::HashSet;

use byteorder::{BigEndian, ByteOrder};
use bytes::{BufMut, Bytes, BytesMut};
use fhd_codec::audio::aac::{frame_duration, parse_adts};
use fhd_codec::audio::{MpegAudioParse, parse_mpeg_audio};
use fhd_codec::codec_id::NalRole;
use fhd_codec::parsers::h264::parse_sps_nal;
use fhd_codec::parsers::h265::parse_hevc_sps_nal;
use fhd_codec::{AudioCodec, VideoCodec, split_annex_b};
use fhd_core::clock::MPEG_CLOCK;
use fhd_core::{FhdError, FhdResult};
use log::debug;

use crate::demuxer::{DemuxOptions, DemuxOutput, DemuxWarning, Demuxer, push_warning};
use crate::format_id::ContainerFormat;
use crate::timeline::{MAX_TIMESTAMP_GAP, TimelineCorrector};
use crate::track::{AudioSample, AudioTrack, VideoSample, VideoTrack};

/// TS 包大小
pub const TS_PACKET_SIZE: usize = 188;
/// PAT PID
const PID_PAT: u16 = 0x0000;
/// SDT PID
const PID_SDT: u16 = 0x0011;
/// 空包 PID
const PID_NULL: u16 = 0x1FFF;
/// PTS 与 DTS 之差超过 60 秒视为头部损坏
const MAX_PTS_DTS_GAP: i64 = 60 * MPEG_CLOCK;
/// PMT 之前最多排队的包数
const MAX_QUEUED_PACKETS: usize = 1024;

/// MPEG-TS stream_type 映射到编解码器族
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamKind {
    Video(VideoCodec),
    Audio(AudioCodec),
}

fn stream_type_to_kind(stream_type: u8) -> Option<StreamKind> {
    match stream_type {
        0x1B => Some(StreamKind::Video(VideoCodec::Avc)),
        0x24 => Some(StreamKind::Video(VideoCodec::Hevc)),
        // ISO/IEC 11172-3, 13818-3
        0x03 | 0x04 => Some(StreamKind::Audio(AudioCodec::Mpeg)),
        0x0F => Some(StreamKind::Audio(AudioCodec::Aac)),
        _ => None,
    }
}

/// PES 片段累积缓冲区
#[derive(Debug, Default)]
struct PesBuffer {
    fragments: Vec<Bytes>,
    len: usize,
}

impl PesBuffer {
    fn push(&mut self, payload: Bytes) {
        self.len += payload.len();
        self.fragments.push(payload);
    }

    fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn clear(&mut self) {
        self.fragments.clear();
        self.len = 0;
    }

    /// 读取开头第 `index` 个字节
    fn byte_at(&self, mut index: usize) -> Option<u8> {
        for fragment in &self.fragments {
            if index < fragment.len() {
                return Some(fragment[index]);
            }
            index -= fragment.len();
        }
        None
    }

    /// 声明了 PES_packet_length 且已全部收齐
    fn is_complete(&self) -> bool {
        match (self.byte_at(4), self.byte_at(5)) {
            (Some(hi), Some(lo)) => {
                let declared = usize::from(u16::from_be_bytes([hi, lo]));
                declared != 0 && self.len >= 6 + declared
            }
            _ => false,
        }
    }

    /// 取出全部片段拼接后的数据
    fn take(&mut self) -> Bytes {
        let data = if self.fragments.len() == 1 {
            self.fragments.pop().unwrap_or_default()
        } else {
            let mut buf = BytesMut::with_capacity(self.len);
            for fragment in &self.fragments {
                buf.put_slice(fragment);
            }
            buf.freeze()
        };
        self.clear();
        data
    }
}

/// 解析后的 PES
#[derive(Debug, Clone, PartialEq, Eq)]
struct Pes {
    pts: Option<i64>,
    dts: Option<i64>,
    payload: Bytes,
}

/// 从 5 字节中提取 33-bit 时间戳
fn parse_timestamp(data: &[u8]) -> i64 {
    let b0 = i64::from(data[0]);
    let b1 = i64::from(data[1]);
    let b2 = i64::from(data[2]);
    let b3 = i64::from(data[3]);
    let b4 = i64::from(data[4]);

    ((b0 >> 1) & 0x07) << 30 | b1 << 22 | (b2 >> 1) << 15 | b3 << 7 | b4 >> 1
}

/// 解析 PES 包, 头部不完整, 起始码错误或声明长度超出数据时返回 None
fn parse_pes(data: &Bytes) -> Option<Pes> {
    if data.len() < 9 || data[..3] != [0x00, 0x00, 0x01] {
        return None;
    }
    let header_end = 9 + usize::from(data[8]);
    if data.len() < header_end {
        return None;
    }
    let declared = usize::from(BigEndian::read_u16(&data[4..6]));
    if declared != 0 && declared > data.len() - 6 {
        return None;
    }

    let flags = data[7];
    let (mut pts, mut dts) = (None, None);
    if flags & 0x80 != 0 && header_end >= 14 {
        let p = parse_timestamp(&data[9..14]);
        let d = if flags & 0x40 != 0 && header_end >= 19 {
            parse_timestamp(&data[14..19])
        } else {
            p
        };
        pts = Some(if p - d > MAX_PTS_DTS_GAP { d } else { p });
        dts = Some(d);
    }

    let end = if declared != 0 { 6 + declared } else { data.len() };
    Some(Pes {
        pts,
        dts,
        payload: data.slice(header_end..end),
    })
}

/// PMT 之前到达的 ES 包
#[derive(Debug, Clone)]
struct QueuedPacket {
    pid: u16,
    pusi: bool,
    payload: Bytes,
}

/// MPEG-TS 解封装器
pub struct TsDemuxer {
    /// PMT PID (从 PAT 获取)
    pmt_pid: Option<u16>,
    /// PMT 是否已解析
    pmt_parsed: bool,
    /// 上次调用不足一个包的尾部
    remaining: Vec<u8>,
    /// 视频 PES 片段
    video_pes: PesBuffer,
    /// 音频 PES 片段
    audio_pes: PesBuffer,
    /// PMT 之前的 ES 包
    queued: Vec<QueuedPacket>,
    /// 已报告过的未知 PID
    reported_pids: HashSet<u16>,
    /// 上一个视频样本的 (pts, dts)
    last_video_ts: Option<(i64, i64)>,
    /// 上一个 AAC 帧的 pts
    last_audio_pts: Option<i64>,
    video_track: VideoTrack,
    audio_track: AudioTrack,
    timeline: TimelineCorrector,
    /// 等待另一条轨道时暂存的样本及首次暂存时的调用参数
    held: Option<HeldSamples>,
    warnings: Vec<DemuxWarning>,
}

/// 等待音视频都出现时暂存的样本
struct HeldSamples {
    video: Vec<VideoSample>,
    audio: Vec<AudioSample>,
    start_time: f64,
    contiguous: bool,
}

impl Default for TsDemuxer {
    fn default() -> Self {
        Self::new()
    }
}

impl TsDemuxer {
    /// TS 同步字节
    pub const SYNC_BYTE: u8 = 0x47;

    /// 创建 MPEG-TS 解封装器
    pub fn new() -> Self {
        Self {
            pmt_pid: None,
            pmt_parsed: false,
            remaining: Vec::new(),
            video_pes: PesBuffer::default(),
            audio_pes: PesBuffer::default(),
            queued: Vec::new(),
            reported_pids: HashSet::new(),
            last_video_ts: None,
            last_audio_pts: None,
            video_track: VideoTrack::new(),
            audio_track: AudioTrack::new(),
            timeline: TimelineCorrector::new(),
            held: None,
            warnings: Vec::new(),
        }
    }

    fn warn(&mut self, warning: DemuxWarning) {
        push_warning(&mut self.warnings, warning);
    }

    /// 丢弃全部未完成的字节, 片段与暂存样本
    fn drop_pending(&mut self) {
        self.remaining.clear();
        self.video_pes.clear();
        self.audio_pes.clear();
        self.queued.clear();
        self.held = None;
    }

    /// 清空本次样本列表, 把暂存样本放回轨道
    fn begin_call(&mut self) {
        self.video_track.samples.clear();
        self.audio_track.samples.clear();
        if let Some(held) = &mut self.held {
            self.video_track.samples.append(&mut held.video);
            self.audio_track.samples.append(&mut held.audio);
        }
    }

    /// PMT 声明了音视频, 时间轴尚未开始 (或本次重新开始), 且还凑不齐对齐所需的样本
    fn awaiting_pair(&self, contiguous: bool) -> bool {
        if (contiguous && self.timeline.started())
            || self.video_track.pid.is_none()
            || self.audio_track.pid.is_none()
        {
            return false;
        }
        let video = &self.video_track.samples;
        let audio = &self.audio_track.samples;
        if video.len() > 1 && audio.len() > 1 {
            return false;
        }
        let video_span = match (video.first(), video.last()) {
            (Some(first), Some(last)) => (last.dts - first.dts).abs(),
            _ => 0,
        };
        let audio_span = match (audio.first(), audio.last()) {
            (Some(first), Some(last)) => (last.pts - first.pts).abs(),
            _ => 0,
        };
        video_span <= MAX_TIMESTAMP_GAP && audio_span <= MAX_TIMESTAMP_GAP
    }

    /// 处理一个 TS 包
    fn process_packet(&mut self, buf: &Bytes, start: usize) -> FhdResult<()> {
        let pkt = &buf[start..start + TS_PACKET_SIZE];
        if pkt[0] != Self::SYNC_BYTE {
            return Err(FhdError::FatalFormat(format!(
                "TS: 同步字节不匹配, offset={}, byte=0x{:02x}",
                start, pkt[0]
            )));
        }
        let pusi = pkt[1] & 0x40 != 0;
        let pid = BigEndian::read_u16(&pkt[1..3]) & 0x1FFF;
        let afc = (pkt[3] >> 4) & 0x03;

        // afc 的低位表示有负载
        if afc & 0x01 == 0 {
            return Ok(());
        }
        let offset = if afc & 0x02 != 0 {
            5 + usize::from(pkt[4])
        } else {
            4
        };
        if offset >= TS_PACKET_SIZE {
            return Ok(());
        }
        let payload = buf.slice(start + offset..start + TS_PACKET_SIZE);

        if pid == PID_PAT {
            self.parse_pat(&payload, pusi);
        } else if Some(pid) == self.pmt_pid {
            if !self.pmt_parsed {
                self.parse_pmt(&payload, pusi);
            }
        } else if pid == PID_SDT || pid == PID_NULL {
            // 忽略
        } else if !self.dispatch_es(pid, pusi, payload.clone()) {
            if !self.pmt_parsed {
                if self.queued.len() >= MAX_QUEUED_PACKETS {
                    self.queued.clear();
                    self.warn(DemuxWarning::QueuedPacketsDropped(MAX_QUEUED_PACKETS));
                }
                self.queued.push(QueuedPacket { pid, pusi, payload });
            } else if self.reported_pids.insert(pid) {
                self.warn(DemuxWarning::UnknownPid(pid));
            }
        }
        Ok(())
    }

    /// 去掉 PSI 的 pointer_field
    fn psi_section(payload: &[u8], pusi: bool) -> Option<&[u8]> {
        if !pusi {
            return Some(payload);
        }
        let start = 1 + usize::from(*payload.first()?);
        payload.get(start..)
    }

    /// 解析 PAT, 取第一个节目的 PMT PID
    fn parse_pat(&mut self, payload: &[u8], pusi: bool) {
        let Some(section) = Self::psi_section(payload, pusi) else {
            return;
        };
        if section.len() < 8 {
            return;
        }
        let section_length = usize::from(BigEndian::read_u16(&section[1..3]) & 0x0FFF);
        let entries_end = (3 + section_length).saturating_sub(4).min(section.len());
        let mut pos = 8;
        while pos + 4 <= entries_end {
            let program_number = BigEndian::read_u16(&section[pos..pos + 2]);
            let pid = BigEndian::read_u16(&section[pos + 2..pos + 4]) & 0x1FFF;
            if program_number != 0 {
                if self.pmt_pid != Some(pid) {
                    debug!("TS PAT: program={} PMT_PID={:#06x}", program_number, pid);
                }
                self.pmt_pid = Some(pid);
                return;
            }
            pos += 4;
        }
    }

    /// 解析 PMT, 记录第一个视频流与第一个音频流, 并重新分派排队的包
    fn parse_pmt(&mut self, payload: &[u8], pusi: bool) {
        let Some(section) = Self::psi_section(payload, pusi) else {
            return;
        };
        if section.len() < 12 {
            return;
        }
        let section_length = usize::from(BigEndian::read_u16(&section[1..3]) & 0x0FFF);
        let table_end = (3 + section_length).saturating_sub(4).min(section.len());
        let program_info_length = usize::from(BigEndian::read_u16(&section[10..12]) & 0x0FFF);

        let mut pos = 12 + program_info_length;
        while pos + 5 <= table_end {
            let stream_type = section[pos];
            let es_pid = BigEndian::read_u16(&section[pos + 1..pos + 3]) & 0x1FFF;
            let es_info_length = usize::from(BigEndian::read_u16(&section[pos + 3..pos + 5]) & 0x0FFF);

            match stream_type_to_kind(stream_type) {
                Some(StreamKind::Video(codec)) if self.video_track.pid.is_none() => {
                    debug!("TS PMT: 视频 PID={:#06x} codec={}", es_pid, codec);
                    self.video_track.pid = Some(es_pid);
                    self.video_track.codec = Some(codec);
                }
                Some(StreamKind::Audio(codec)) if self.audio_track.pid.is_none() => {
                    debug!("TS PMT: 音频 PID={:#06x} codec={}", es_pid, codec);
                    self.audio_track.pid = Some(es_pid);
                    self.audio_track.codec = Some(codec);
                }
                Some(_) => debug!("TS PMT: 忽略额外的流 PID={:#06x}", es_pid),
                None => self.warn(DemuxWarning::UnsupportedStreamType {
                    stream_type,
                    pid: es_pid,
                }),
            }
            pos += 5 + es_info_length;
        }
        self.pmt_parsed = true;

        for packet in std::mem::take(&mut self.queued) {
            if !self.dispatch_es(packet.pid, packet.pusi, packet.payload) {
                debug!("TS: 丢弃 PMT 之前的包 PID={:#06x}", packet.pid);
            }
        }
    }

    /// 把 ES 负载送入对应的 PES 缓冲区, PID 未映射时返回 false
    fn dispatch_es(&mut self, pid: u16, pusi: bool, payload: Bytes) -> bool {
        if Some(pid) == self.video_track.pid {
            if pusi {
                self.flush_video();
            }
            self.video_pes.push(payload);
            if self.video_pes.is_complete() {
                self.flush_video();
            }
            true
        } else if Some(pid) == self.audio_track.pid {
            if pusi {
                self.flush_audio();
            }
            self.audio_pes.push(payload);
            if self.audio_pes.is_complete() {
                self.flush_audio();
            }
            true
        } else {
            false
        }
    }

    /// 解析累积的视频 PES
    fn flush_video(&mut self) {
        if self.video_pes.is_empty() {
            return;
        }
        let data = self.video_pes.take();
        let Some(pes) = parse_pes(&data) else {
            let pid = self.video_track.pid.unwrap_or_default();
            self.warn(DemuxWarning::InvalidPes { pid });
            return;
        };
        // PES 已结束, 末尾单元视为完整
        let units = split_annex_b(&pes.payload).into_complete_units();
        self.create_video_samples(units, pes.pts, pes.dts);
    }

    /// 按访问单元分隔符把 NAL 单元分组为样本
    fn create_video_samples(&mut self, units: Vec<Bytes>, pts: Option<i64>, dts: Option<i64>) {
        let Some(codec) = self.video_track.codec else {
            return;
        };
        let mut current: Vec<Bytes> = Vec::new();
        for unit in units {
            match codec.classify(&unit) {
                NalRole::Sps if self.video_track.sps.is_empty() => {
                    let info = match codec {
                        VideoCodec::Avc => parse_sps_nal(&unit).map(|sps| sps.info()),
                        VideoCodec::Hevc => parse_hevc_sps_nal(&unit).map(|sps| sps.info()),
                    };
                    match info {
                        Ok(info) => {
                            debug!(
                                "TS: SPS codec={} {}x{} sar={}",
                                info.codec, info.width, info.height, info.sar
                            );
                            self.video_track.apply_sps_info(&info);
                            self.video_track.sps = vec![unit.clone()];
                        }
                        Err(e) => self.warn(DemuxWarning::InvalidConfig(format!("SPS: {}", e))),
                    }
                }
                NalRole::Pps if self.video_track.pps.is_empty() => {
                    self.video_track.pps = vec![unit.clone()];
                }
                NalRole::Vps if self.video_track.vps.is_empty() => {
                    self.video_track.vps = vec![unit.clone()];
                }
                NalRole::Aud if !current.is_empty() => {
                    self.push_video_sample(std::mem::take(&mut current), codec, pts, dts);
                }
                _ => {}
            }
            current.push(unit);
        }
        self.push_video_sample(current, codec, pts, dts);
    }

    fn push_video_sample(
        &mut self,
        units: Vec<Bytes>,
        codec: VideoCodec,
        pts: Option<i64>,
        dts: Option<i64>,
    ) {
        if units.is_empty() {
            return;
        }
        let (pts, dts) = match (pts, dts) {
            (Some(pts), Some(dts)) => (pts, dts),
            _ => {
                self.video_track.dropped += 1;
                let inherited = self.last_video_ts;
                self.warn(DemuxWarning::MissingVideoPts {
                    inherited: inherited.is_some(),
                });
                match inherited {
                    Some(ts) => ts,
                    None => return,
                }
            }
        };
        let mut sample = VideoSample::with_units(pts, dts, units);
        sample.classify_units(codec);
        self.last_video_ts = Some((pts, dts));
        self.video_track.samples.push(sample);
    }

    /// 解析累积的音频 PES
    fn flush_audio(&mut self) {
        if self.audio_pes.is_empty() {
            return;
        }
        let data = self.audio_pes.take();
        let Some(pes) = parse_pes(&data) else {
            let pid = self.audio_track.pid.unwrap_or_default();
            self.warn(DemuxWarning::InvalidPes { pid });
            return;
        };
        match self.audio_track.codec {
            Some(AudioCodec::Aac) => self.parse_aac(pes),
            Some(AudioCodec::Mpeg) => self.parse_mpeg(pes),
            None => {}
        }
    }

    fn parse_aac(&mut self, pes: Pes) {
        let sample_rate = self.audio_track.sample_rate;
        let pts = match (pes.pts, self.last_audio_pts) {
            (Some(pts), _) => pts,
            // 无 pts: 从上一帧续一个帧长
            (None, Some(last)) if sample_rate != 0 => last + frame_duration(sample_rate).round() as i64,
            _ => {
                self.warn(DemuxWarning::MissingAudioPts);
                return;
            }
        };

        let Some(ret) = parse_adts(&pes.payload, pts) else {
            self.warn(DemuxWarning::InvalidAudioFrame("ADTS"));
            return;
        };
        if ret.skipped > 0 {
            self.warn(DemuxWarning::AdtsSkipped(ret.skipped));
        }
        if ret.remaining > 0 {
            self.warn(DemuxWarning::AdtsRemaining(ret.remaining));
        }

        self.audio_track.apply_config(&ret.config);
        if let Some(last) = ret.frames.last() {
            self.last_audio_pts = Some(last.pts);
        }
        self.audio_track.samples.extend(
            ret.frames
                .into_iter()
                .map(|frame| AudioSample::new(frame.pts, frame.data)),
        );
    }

    fn parse_mpeg(&mut self, pes: Pes) {
        let Some(pts) = pes.pts else {
            self.warn(DemuxWarning::MissingAudioPts);
            return;
        };
        let ret = parse_mpeg_audio(&pes.payload, pts, MPEG_CLOCK as u32);
        if ret.broken {
            self.warn(DemuxWarning::MpegAudioBroken);
        }
        if ret.frames.is_empty() {
            if !ret.broken {
                self.warn(DemuxWarning::InvalidAudioFrame("MPEG"));
            }
            return;
        }

        let track = &mut self.audio_track;
        track.codec_string = MpegAudioParse::CODEC.to_string();
        track.sample_rate = ret.sample_rate;
        track.channel_count = ret.channel_count;
        track.samples_per_frame = ret.samples_per_frame;
        let samples_per_frame = ret.samples_per_frame;
        track.samples.extend(ret.frames.into_iter().map(|frame| AudioSample {
            pts: frame.pts,
            data: frame.data,
            sample_count: Some(samples_per_frame),
        }));
    }

    /// 每次调用结束: 设置时钟, 校正时间戳, 更新序号
    ///
    /// `flushing` 为 false 且仍在等待另一条轨道时, 样本转入暂存, 本次输出为空.
    fn finish_call(&mut self, start_time: f64, contiguous: bool, flushing: bool) {
        self.video_track.timescale = MPEG_CLOCK as u32;
        self.audio_track.timescale = self.audio_track.sample_rate;

        // 暂存过的样本按首次暂存时的调用参数校正
        let (start_time, contiguous) = match self.held.take() {
            Some(held) => (held.start_time, held.contiguous),
            None => (start_time, contiguous),
        };
        if !flushing && self.awaiting_pair(contiguous) {
            debug!(
                "TS: 等待另一条轨道, 暂存 {} 个视频样本, {} 个音频样本",
                self.video_track.samples.len(),
                self.audio_track.samples.len()
            );
            self.held = Some(HeldSamples {
                video: std::mem::take(&mut self.video_track.samples),
                audio: std::mem::take(&mut self.audio_track.samples),
                start_time,
                contiguous,
            });
            return;
        }

        let warnings = self.timeline.correct(
            &mut self.video_track,
            &mut self.audio_track,
            start_time,
            contiguous,
        );
        self.warnings.extend(warnings);

        if !self.video_track.samples.is_empty() {
            self.video_track.sequence_number += 1;
        }
        if !self.audio_track.samples.is_empty() {
            self.audio_track.sequence_number += 1;
        }
    }

    fn output(&self) -> DemuxOutput<'_> {
        DemuxOutput {
            video_track: &self.video_track,
            audio_track: &self.audio_track,
        }
    }
}

impl Demuxer for TsDemuxer {
    fn format(&self) -> ContainerFormat {
        ContainerFormat::MpegTs
    }

    fn demux(&mut self, data: &[u8], options: &DemuxOptions) -> FhdResult<DemuxOutput<'_>> {
        self.warnings.clear();
        if !options.contiguous || options.discontinuity {
            self.drop_pending();
        }
        if options.discontinuity {
            self.reset();
        }
        self.begin_call();

        let mut input = std::mem::take(&mut self.remaining);
        input.extend_from_slice(data);
        let whole = input.len() - input.len() % TS_PACKET_SIZE;
        self.remaining = input.split_off(whole);
        let buf = Bytes::from(input);

        for start in (0..whole).step_by(TS_PACKET_SIZE) {
            self.process_packet(&buf, start)?;
        }

        self.finish_call(options.start_time.unwrap_or(0.0), options.contiguous, false);
        Ok(self.output())
    }

    fn flush(&mut self) -> DemuxOutput<'_> {
        self.warnings.clear();
        self.begin_call();
        self.flush_video();
        self.flush_audio();
        self.finish_call(0.0, true, true);
        self.output()
    }

    fn reset(&mut self) {
        let warnings = std::mem::take(&mut self.warnings);
        *self = Self::new();
        self.warnings = warnings;
    }

    fn warnings(&self) -> &[DemuxWarning] {
        &self.warnings
    }

    fn video_track(&self) -> &VideoTrack {
        &self.video_track
    }

    fn audio_track(&self) -> &AudioTrack {
        &self.audio_track
    }
}

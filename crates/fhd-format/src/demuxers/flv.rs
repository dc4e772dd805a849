//! FLV (Flash Video) 解封装器.
//!
//! # FLV 字节流结构
//! ```text
//! FLV Header (9 bytes):
//!   "FLV" (3 bytes)
//!   Version (1 byte, = 1)
//!   Flags (1 byte): bit0=video, bit2=audio
//!   DataOffset (4 bytes, BE): 头部大小 (通常 9)
//!
//! PreviousTagSize0 (4 bytes, BE): 0
//!
//! FLV Tag:
//!   TagType (1 byte): 8=Audio, 9=Video, 18=Script
//!   DataSize (3 bytes, BE)
//!   Timestamp (3 bytes, BE) + TimestampExtended (1 byte, 高8位)
//!   StreamID (3 bytes, BE)
//!   TagData (DataSize bytes)
//! PreviousTagSize (4 bytes, BE) = 11 + DataSize
//! ```
//!
//! # 视频 Tag 数据
//! ```text
//! FrameType (4 bits): 1=keyframe, 2=inter
//! CodecID (4 bits): 7=AVC, 12=HEVC
//! PacketType (1 byte): 0=SeqHeader, 1=NALU, 2=EndOfSeq
//! CompositionTime (3 bytes, BE, signed)
//! ```
//!
//! Tag 自带长度, 尾部不足一个完整 tag (含 4 字节 trailer) 的字节保留到下一次调用.
//! 时间戳为 32 位毫秒, 不做回绕与对齐校正.

use std::collections::HashSet;
use std::io::Read;

use byteorder::{BigEndian, ByteOrder, ReadBytesExt};
use bytes::Bytes;
use fhd_codec::audio::parse_audio_specific_config;
use fhd_codec::parsers::h264::parse_avc_decoder_config;
use fhd_codec::parsers::h265::parse_hevc_decoder_config;
use fhd_codec::{AudioCodec, VideoCodec, split_length_prefixed};
use fhd_core::{FhdError, FhdResult};
use log::debug;

use crate::demuxer::{DemuxOptions, DemuxOutput, DemuxWarning, Demuxer, push_warning};
use crate::format_id::ContainerFormat;
use crate::probe::is_flv;
use crate::track::{AudioSample, AudioTrack, VideoSample, VideoTrack};

/// FLV Tag 类型
const TAG_AUDIO: u8 = 8;
const TAG_VIDEO: u8 = 9;
const TAG_SCRIPT: u8 = 18;

/// Tag 头部长度
const TAG_HEADER_SIZE: usize = 11;
/// PreviousTagSize 长度
const TAG_TRAILER_SIZE: usize = 4;

/// SoundFormat: AAC
const SOUND_FORMAT_AAC: u8 = 10;
/// CodecID
const CODEC_ID_AVC: u8 = 7;
const CODEC_ID_HEVC: u8 = 12;

/// FLV 视频/音频时钟 (毫秒)
const FLV_TIMESCALE: u32 = 1000;

/// AMF0 嵌套深度上限
const AMF_MAX_DEPTH: usize = 16;

/// onMetaData 中的数值字段
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlvMetadata {
    /// 时长 (秒)
    pub duration: Option<f64>,
    /// 宽度
    pub width: Option<f64>,
    /// 高度
    pub height: Option<f64>,
    /// 帧率
    pub framerate: Option<f64>,
    /// 音频采样率
    pub audiosamplerate: Option<f64>,
}

impl FlvMetadata {
    fn set(&mut self, key: &str, value: f64) {
        match key {
            "duration" => self.duration = Some(value),
            "width" => self.width = Some(value),
            "height" => self.height = Some(value),
            "framerate" => self.framerate = Some(value),
            "audiosamplerate" => self.audiosamplerate = Some(value),
            _ => {}
        }
    }
}

fn read_amf_string(rdr: &mut &[u8], long: bool) -> FhdResult<String> {
    let len = if long {
        rdr.read_u32::<BigEndian>()? as usize
    } else {
        usize::from(rdr.read_u16::<BigEndian>()?)
    };
    if len > rdr.len() {
        return Err(FhdError::NeedMoreData);
    }
    let mut buf = vec![0u8; len];
    rdr.read_exact(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// 读取一组 name/value 属性, 顶层的数值字段写入 `meta`
fn read_amf_properties(
    rdr: &mut &[u8],
    count: Option<u32>,
    depth: usize,
    meta: &mut Option<&mut FlvMetadata>,
) -> FhdResult<()> {
    let mut read = 0u32;
    loop {
        // object-end: 空名字 + 0x09, ECMA 数组在计数之后也可能带
        if rdr.starts_with(&[0x00, 0x00, 0x09]) {
            *rdr = &rdr[3..];
            return Ok(());
        }
        if count.is_some_and(|n| read >= n) || rdr.is_empty() {
            return Ok(());
        }
        let key = read_amf_string(rdr, false)?;
        if let Some(number) = read_amf_value(rdr, depth + 1)? {
            if let Some(meta) = meta.as_deref_mut() {
                meta.set(&key, number);
            }
        }
        read += 1;
    }
}

/// 读取一个 AMF0 值, 数值类型返回其值, 其余类型跳过
fn read_amf_value(rdr: &mut &[u8], depth: usize) -> FhdResult<Option<f64>> {
    if depth > AMF_MAX_DEPTH {
        return Err(FhdError::InvalidData("AMF0: 嵌套过深".into()));
    }
    let marker = rdr.read_u8()?;
    match marker {
        0x00 => return Ok(Some(rdr.read_f64::<BigEndian>()?)),
        0x01 => {
            rdr.read_u8()?;
        }
        0x02 => {
            read_amf_string(rdr, false)?;
        }
        0x03 => read_amf_properties(rdr, None, depth, &mut None)?,
        0x05 | 0x06 => {}
        0x08 => {
            let count = rdr.read_u32::<BigEndian>()?;
            read_amf_properties(rdr, Some(count), depth, &mut None)?;
        }
        0x0A => {
            let count = rdr.read_u32::<BigEndian>()?;
            for _ in 0..count {
                read_amf_value(rdr, depth + 1)?;
            }
        }
        0x0B => {
            rdr.read_f64::<BigEndian>()?;
            rdr.read_i16::<BigEndian>()?;
        }
        0x0C => {
            read_amf_string(rdr, true)?;
        }
        other => {
            return Err(FhdError::Unsupported(format!(
                "AMF0: 类型 0x{:02x}",
                other
            )));
        }
    }
    Ok(None)
}

/// 解析 `onMetaData` 脚本 tag
fn parse_on_metadata(data: &[u8], meta: &mut FlvMetadata) -> FhdResult<bool> {
    let mut rdr = data;
    if rdr.read_u8()? != 0x02 || read_amf_string(&mut rdr, false)? != "onMetaData" {
        return Ok(false);
    }
    let mut target = Some(meta);
    match rdr.read_u8()? {
        0x08 => {
            let count = rdr.read_u32::<BigEndian>()?;
            read_amf_properties(&mut rdr, Some(count), 0, &mut target)?;
        }
        0x03 => read_amf_properties(&mut rdr, None, 0, &mut target)?,
        other => {
            return Err(FhdError::InvalidData(format!(
                "onMetaData: 值类型 0x{:02x}",
                other
            )));
        }
    }
    Ok(true)
}

/// FLV 解封装器
pub struct FlvDemuxer {
    /// 文件头是否已解析
    header_parsed: bool,
    /// 上次调用不完整的 tag
    remaining: Vec<u8>,
    /// onMetaData 字段
    metadata: FlvMetadata,
    /// 已报告过的不支持编码 (tag 类型, 编码 ID)
    reported: HashSet<(u8, u8)>,
    video_track: VideoTrack,
    audio_track: AudioTrack,
    warnings: Vec<DemuxWarning>,
}

impl Default for FlvDemuxer {
    fn default() -> Self {
        Self::new()
    }
}

impl FlvDemuxer {
    /// 创建 FLV 解封装器
    pub fn new() -> Self {
        Self {
            header_parsed: false,
            remaining: Vec::new(),
            metadata: FlvMetadata::default(),
            reported: HashSet::new(),
            video_track: VideoTrack::new(),
            audio_track: AudioTrack::new(),
            warnings: Vec::new(),
        }
    }

    /// onMetaData 中的字段
    pub fn metadata(&self) -> &FlvMetadata {
        &self.metadata
    }

    fn warn(&mut self, warning: DemuxWarning) {
        push_warning(&mut self.warnings, warning);
    }

    fn warn_unsupported(&mut self, tag_type: u8, id: u8, what: String) {
        if self.reported.insert((tag_type, id)) {
            self.warn(DemuxWarning::UnsupportedCodec(what));
        }
    }

    /// 校验文件头, 返回第一个 tag 的偏移; 数据不足时返回 None
    fn parse_header(buf: &[u8]) -> FhdResult<Option<usize>> {
        if buf.len() < 9 {
            return Ok(None);
        }
        if !is_flv(buf) {
            return Err(FhdError::FatalFormat(format!(
                "FLV: 文件签名无效: {:02x?}",
                &buf[..4]
            )));
        }
        let offset = BigEndian::read_u32(&buf[5..9]) as usize + TAG_TRAILER_SIZE;
        if buf.len() < offset {
            return Ok(None);
        }
        debug!(
            "FLV: 文件头 has_audio={}, has_video={}",
            buf[4] & 0x04 != 0,
            buf[4] & 0x01 != 0
        );
        Ok(Some(offset))
    }

    fn handle_audio_tag(&mut self, body: Bytes, timestamp: u32) {
        if body.len() < 2 {
            return;
        }
        let sound_format = body[0] >> 4;
        if sound_format != SOUND_FORMAT_AAC {
            self.warn_unsupported(TAG_AUDIO, sound_format, format!("FLV SoundFormat={}", sound_format));
            return;
        }
        match body[1] {
            0 => match parse_audio_specific_config(&body[2..]) {
                Ok(config) => {
                    debug!(
                        "FLV: AAC 配置 codec={} {}Hz {}ch",
                        config.codec, config.sample_rate, config.channel_count
                    );
                    self.audio_track.codec = Some(AudioCodec::Aac);
                    self.audio_track.apply_config(&config);
                }
                Err(e) => self.warn(DemuxWarning::InvalidConfig(format!("AAC: {}", e))),
            },
            1 => self
                .audio_track
                .samples
                .push(AudioSample::new(i64::from(timestamp), body.slice(2..))),
            _ => {}
        }
    }

    fn handle_video_tag(&mut self, body: Bytes, timestamp: u32) {
        if body.len() < 6 {
            return;
        }
        let frame_type = body[0] >> 4;
        let codec_id = body[0] & 0x0F;
        let codec = match codec_id {
            CODEC_ID_AVC => VideoCodec::Avc,
            CODEC_ID_HEVC => VideoCodec::Hevc,
            _ => {
                self.warn_unsupported(TAG_VIDEO, codec_id, format!("FLV CodecID={}", codec_id));
                return;
            }
        };
        let packet_type = body[1];
        // 有符号 24 位
        let cts = BigEndian::read_i24(&body[2..5]);
        let payload = body.slice(5..);

        match packet_type {
            0 => self.parse_video_config(codec, &payload),
            1 => {
                let units = split_length_prefixed(&payload, self.video_track.nal_unit_size);
                if units.is_empty() {
                    return;
                }
                let dts = i64::from(timestamp);
                let mut sample = VideoSample::with_units(dts + i64::from(cts), dts, units);
                sample.classify_units(codec);
                if frame_type == 1 && !sample.key {
                    sample.set_key();
                }
                self.video_track.samples.push(sample);
            }
            _ => {}
        }
    }

    fn parse_video_config(&mut self, codec: VideoCodec, payload: &Bytes) {
        let parsed = match codec {
            VideoCodec::Avc => parse_avc_decoder_config(payload)
                .map(|c| (c.length_size, Vec::new(), c.sps_list, c.pps_list, c.info)),
            VideoCodec::Hevc => parse_hevc_decoder_config(payload)
                .map(|c| (c.length_size, c.vps_list, c.sps_list, c.pps_list, c.info)),
        };
        let (length_size, vps, sps, pps, info) = match parsed {
            Ok(parsed) => parsed,
            Err(e) => {
                self.warn(DemuxWarning::InvalidConfig(format!("{}: {}", codec, e)));
                return;
            }
        };

        let track = &mut self.video_track;
        track.codec = Some(codec);
        track.nal_unit_size = length_size;
        track.vps = vps;
        track.sps = sps;
        track.pps = pps;
        match info {
            Some(info) => {
                debug!(
                    "FLV: 视频配置 codec={} {}x{} sar={}",
                    info.codec, info.width, info.height, info.sar
                );
                track.apply_sps_info(&info);
            }
            None => self.warn(DemuxWarning::InvalidConfig(format!("{}: SPS 无法解析", codec))),
        }
    }

    fn handle_script_tag(&mut self, body: &[u8]) {
        match parse_on_metadata(body, &mut self.metadata) {
            Ok(true) => debug!("FLV: onMetaData {:?}", self.metadata),
            Ok(false) => {}
            Err(e) => debug!("FLV: 脚本 tag 解析失败: {}", e),
        }
    }

    fn output(&self) -> DemuxOutput<'_> {
        DemuxOutput {
            video_track: &self.video_track,
            audio_track: &self.audio_track,
        }
    }
}

impl Demuxer for FlvDemuxer {
    fn format(&self) -> ContainerFormat {
        ContainerFormat::Flv
    }

    fn demux(&mut self, data: &[u8], options: &DemuxOptions) -> FhdResult<DemuxOutput<'_>> {
        self.warnings.clear();
        if options.discontinuity {
            self.reset();
        }
        self.video_track.samples.clear();
        self.audio_track.samples.clear();

        let mut input = std::mem::take(&mut self.remaining);
        input.extend_from_slice(data);
        let buf = Bytes::from(input);

        let mut offset = 0;
        if !self.header_parsed {
            match Self::parse_header(&buf)? {
                Some(first_tag) => {
                    offset = first_tag;
                    self.header_parsed = true;
                }
                None => {
                    self.remaining = buf.to_vec();
                    return Ok(self.output());
                }
            }
        }

        while offset + TAG_HEADER_SIZE <= buf.len() {
            let header = &buf[offset..offset + TAG_HEADER_SIZE];
            let tag_type = header[0] & 0x1F;
            let data_size = BigEndian::read_u24(&header[1..4]) as usize;
            let timestamp = BigEndian::read_u24(&header[4..7]) | (u32::from(header[7]) << 24);

            let body_start = offset + TAG_HEADER_SIZE;
            let tag_end = body_start + data_size + TAG_TRAILER_SIZE;
            if tag_end > buf.len() {
                break;
            }
            let body = buf.slice(body_start..body_start + data_size);
            match tag_type {
                TAG_AUDIO => self.handle_audio_tag(body, timestamp),
                TAG_VIDEO => self.handle_video_tag(body, timestamp),
                TAG_SCRIPT => self.handle_script_tag(&body),
                other => self.warn(DemuxWarning::UnknownTagType(other)),
            }

            let expected = (TAG_HEADER_SIZE + data_size) as u32;
            let actual = BigEndian::read_u32(&buf[tag_end - TAG_TRAILER_SIZE..tag_end]);
            if actual != expected {
                self.warn(DemuxWarning::PrevTagSizeMismatch { expected, actual });
            }
            offset = tag_end;
        }
        self.remaining = buf[offset..].to_vec();

        self.video_track.timescale = FLV_TIMESCALE;
        self.audio_track.timescale = self.audio_track.sample_rate;
        if !self.video_track.samples.is_empty() {
            self.video_track.sequence_number += 1;
        }
        if !self.audio_track.samples.is_empty() {
            self.audio_track.sequence_number += 1;
        }
        Ok(self.output())
    }

    fn flush(&mut self) -> DemuxOutput<'_> {
        // 不完整的 tag 无法输出
        self.warnings.clear();
        self.video_track.samples.clear();
        self.audio_track.samples.clear();
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

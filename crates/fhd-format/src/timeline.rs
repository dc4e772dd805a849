//! 时间戳连续性与音视频同步校正.
//!
//! 每次解封装调用在两条轨道都解析完后运行一次, 为每条轨道给出单调的
//! base_media_decode_time 与逐样本时长. 处理 33 位时钟回绕与时间轴不连续.
//!
//! 流程:
//! 1. 选取参考时间 (首次或非连续调用时取首个视频 dts, 无视频时取首个音频 pts)
//! 2. 把所有样本的 pts/dts 归一化到参考时间轴
//! 3. 非连续调用且两轨各有至少 2 个样本时, 按整帧补静音或丢帧对齐音视频
//! 4. 逐轨记账: 起始解码时间, 样本时长, 下一次的预期续接点
//! 5. 以本次最后一个样本的时间作为下一次的参考
//!
//! 全部校正都是尽力而为的启发式, 从不返回错误, 只记录 [`DemuxWarning`].

use bytes::Bytes;
use fhd_codec::audio::silent_frame;
use fhd_core::clock::{MPEG_CLOCK, normalize_pts, seconds_to_mpeg};

use crate::demuxer::{DemuxWarning, push_warning};
use crate::track::{AudioSample, AudioTrack, VideoTrack};

/// 超过该差值 (90kHz) 的起点偏移或续接缺口视为时间轴跳变, 不补静音也不丢帧
pub const MAX_TIMESTAMP_GAP: i64 = 10 * MPEG_CLOCK;

/// 跨调用的时间轴状态, 由 TS 解封装器持有
#[derive(Debug, Clone, Default)]
pub struct TimelineCorrector {
    /// 参考时间 (90kHz)
    ref_dts: Option<i64>,
    /// 下一次视频的起始解码时间
    next_video_dts: Option<i64>,
    /// 下一次首个视频样本的预期 dts
    next_expect_video_dts: Option<i64>,
    /// 下一次音频的起始时间 (90kHz)
    next_audio_pts: Option<i64>,
    /// 下一次首个音频样本的预期 pts
    next_expect_audio_pts: Option<i64>,
    /// 最近一个视频样本的时长
    last_video_duration: i64,
}

impl TimelineCorrector {
    /// 创建空状态
    pub fn new() -> Self {
        Self::default()
    }

    /// 清空状态 (discontinuity)
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// 当前参考时间
    pub fn reference(&self) -> Option<i64> {
        self.ref_dts
    }

    /// 是否已有轨道开始记账
    pub fn started(&self) -> bool {
        self.next_video_dts.is_some() || self.next_audio_pts.is_some()
    }

    /// 校正两条轨道本次的样本
    ///
    /// 视频时钟固定为 90kHz; 音频轨道的 `timescale` 为 0 (尚未取得采样率) 时跳过音频.
    pub fn correct(
        &mut self,
        video: &mut VideoTrack,
        audio: &mut AudioTrack,
        start_time: f64,
        contiguous: bool,
    ) -> Vec<DemuxWarning> {
        let mut warnings = Vec::new();
        let has_video = !video.samples.is_empty();
        let has_audio = !audio.samples.is_empty() && audio.timescale > 0;
        if !has_video && !has_audio {
            return warnings;
        }

        if !contiguous || self.ref_dts.is_none() {
            self.ref_dts = video
                .samples
                .first()
                .map(|s| s.dts)
                .or_else(|| audio.samples.first().map(|s| s.pts));
        }
        let Some(reference) = self.ref_dts else {
            return warnings;
        };

        let video_delta = if has_video && has_audio {
            if video.samples.len() > 1
                && audio.samples.len() > 1
                && (!contiguous || self.next_video_dts.is_none())
            {
                align(video, audio, reference, &mut warnings);
            }
            self.correct_video(video, reference, start_time, contiguous, &mut warnings)
        } else if has_video {
            self.correct_video(video, reference, start_time, contiguous, &mut warnings);
            0
        } else {
            0
        };
        if has_audio {
            self.correct_audio(audio, reference, start_time, contiguous, video_delta, &mut warnings);
        }

        self.ref_dts = if has_video {
            video.samples.last().map(|s| s.dts)
        } else {
            audio.samples.last().map(|s| s.pts)
        };
        warnings
    }

    /// 视频记账, 返回实际首个 dts 与预期续接点之差
    fn correct_video(
        &mut self,
        video: &mut VideoTrack,
        reference: i64,
        start_time: f64,
        contiguous: bool,
        warnings: &mut Vec<DemuxWarning>,
    ) -> i64 {
        let samples = &mut video.samples;
        for sample in samples.iter_mut() {
            sample.pts = normalize_pts(sample.pts, reference);
            sample.dts = normalize_pts(sample.dts, reference);
            if sample.dts > sample.pts {
                sample.dts = sample.pts;
            }
        }

        if !contiguous || self.next_video_dts.is_none() {
            self.next_video_dts = Some((seconds_to_mpeg(start_time) - samples[0].cts()).max(0));
            self.next_expect_video_dts = None;
        }

        let delta = self
            .next_expect_video_dts
            .map_or(0, |expect| expect - samples[0].dts);
        if delta != 0 {
            push_warning(warnings, DemuxWarning::VideoDtsGap { delta });
        }

        let count = samples.len();
        for i in 0..count {
            let duration = if i + 1 < count {
                samples[i + 1].dts - samples[i].dts
            } else if i > 0 {
                samples[i - 1].duration
            } else {
                self.last_video_duration
            };
            samples[i].duration = duration;
        }

        let first_dts = samples[0].dts;
        let (last_dts, last_duration) = (samples[count - 1].dts, samples[count - 1].duration);
        self.last_video_duration = last_duration;

        let base = self.next_video_dts.unwrap_or(0);
        let span = last_dts - first_dts + last_duration;
        video.base_media_decode_time = base;
        video.duration = span;
        self.next_video_dts = Some(base + span);
        self.next_expect_video_dts = Some(last_dts + last_duration);
        delta
    }

    /// 音频记账, 用整帧补静音/丢帧吸收与预期续接点的漂移
    fn correct_audio(
        &mut self,
        audio: &mut AudioTrack,
        reference: i64,
        start_time: f64,
        contiguous: bool,
        video_delta: i64,
        warnings: &mut Vec<DemuxWarning>,
    ) {
        for sample in audio.samples.iter_mut() {
            sample.pts = normalize_pts(sample.pts, reference);
        }

        if !contiguous || self.next_audio_pts.is_none() {
            self.next_audio_pts = Some(seconds_to_mpeg(start_time).max(0));
            self.next_expect_audio_pts = None;
        }

        let frame_duration = frame_duration_f64(audio);
        if let Some(expect) = self.next_expect_audio_pts {
            let delta = expect - audio.samples[0].pts + video_delta;
            let frames = (delta.unsigned_abs() as f64 / frame_duration).floor() as usize;
            if delta.abs() > MAX_TIMESTAMP_GAP {
                push_warning(warnings, DemuxWarning::TimestampGapIgnored { delta });
            } else if frames > 0 && delta > 0 {
                drop_leading(audio, frames, warnings);
            } else if frames > 0 {
                let first_pts = audio.samples[0].pts;
                prepend_silence(audio, frames, warnings, |k| {
                    first_pts - (k as f64 * frame_duration).round() as i64
                });
            }
        }

        let next_audio_pts = self.next_audio_pts.unwrap_or(0);
        let timescale = i64::from(audio.timescale);
        audio.base_media_decode_time =
            (next_audio_pts as f64 * timescale as f64 / MPEG_CLOCK as f64).round() as i64;
        let total = (audio.samples.len() as f64 * frame_duration).round() as i64;
        audio.duration = audio.samples.len() as i64 * i64::from(audio.samples_per_frame);
        self.next_audio_pts = Some(next_audio_pts + total);
        self.next_expect_audio_pts = Some(audio.samples[0].pts + total);
    }
}

/// 一帧音频在 90kHz 下的时长
fn frame_duration_f64(audio: &AudioTrack) -> f64 {
    f64::from(audio.samples_per_frame) * MPEG_CLOCK as f64 / f64::from(audio.timescale)
}

/// 非连续调用时的音视频起点对齐
fn align(
    video: &mut VideoTrack,
    audio: &mut AudioTrack,
    reference: i64,
    warnings: &mut Vec<DemuxWarning>,
) {
    let frame_duration = frame_duration_f64(audio).round() as i64;
    if frame_duration <= 0 {
        return;
    }
    let first_audio_pts = normalize_pts(audio.samples[0].pts, reference);
    let first_video_pts = normalize_pts(video.samples[0].pts, reference);
    let first_video_dts = normalize_pts(video.samples[0].dts, reference);

    let mut delta = first_video_pts - first_audio_pts;
    if delta.abs() > MAX_TIMESTAMP_GAP {
        push_warning(warnings, DemuxWarning::TimestampGapIgnored { delta });
        return;
    }
    if delta < 0 {
        // 视频先于音频: 在音频前补静音帧直到覆盖视频起点
        let frames = (-delta / frame_duration + 1) as usize;
        prepend_silence(audio, frames, warnings, |k| {
            first_audio_pts - k as i64 * frame_duration
        });
        delta = first_video_pts - audio.samples[0].pts;
    } else {
        let dts_delta = first_video_dts - first_audio_pts;
        if dts_delta > frame_duration {
            let frames = (dts_delta / frame_duration) as usize;
            let dropped = drop_leading(audio, frames, warnings);
            delta -= dropped as i64 * frame_duration;
        }
    }

    if delta != 0 {
        video.samples[0].pts = first_video_dts + delta;
        push_warning(warnings, DemuxWarning::VideoPtsAdjusted { delta });
    }
}

/// 在音频开头补入 `frames` 个静音帧, 第 k 个 (从后往前, k 从 1 开始) 的 pts 由 `pts_of(k)` 给出
fn prepend_silence(
    audio: &mut AudioTrack,
    frames: usize,
    warnings: &mut Vec<DemuxWarning>,
    pts_of: impl Fn(usize) -> i64,
) {
    let payload = silent_frame(&audio.codec_string, audio.channel_count)
        .map(Bytes::from_static)
        .unwrap_or_else(|| audio.samples[0].data.clone());
    let sample_count = Some(audio.samples_per_frame);
    let silence: Vec<AudioSample> = (1..=frames)
        .rev()
        .map(|k| AudioSample {
            pts: pts_of(k),
            data: payload.clone(),
            sample_count,
        })
        .collect();
    audio.samples.splice(0..0, silence);
    audio.inserted += frames as u32;
    push_warning(
        warnings,
        DemuxWarning::SilentFramesInserted {
            count: frames as u32,
        },
    );
}

/// 丢弃开头的音频帧, 至少保留一帧, 返回实际丢弃数
fn drop_leading(audio: &mut AudioTrack, frames: usize, warnings: &mut Vec<DemuxWarning>) -> usize {
    let frames = frames.min(audio.samples.len().saturating_sub(1));
    if frames == 0 {
        return 0;
    }
    audio.samples.drain(..frames);
    audio.dropped += frames as u32;
    push_warning(
        warnings,
        DemuxWarning::AudioFramesDropped {
            count: frames as u32,
        },
    );
    frames
}

//! 预编码的 AAC-LC 静音帧.
//!
//! 用于音视频对齐时在音频开头补帧. 只覆盖 `mp4a.40.2` 的 1~6 声道,
//! 其他编码 (HE-AAC, MPEG 音频) 由调用方退回到复制第一帧的负载.

const SILENT_LC_1CH: &[u8] = &[0x00, 0xc8, 0x00, 0x80, 0x23, 0x80];
const SILENT_LC_2CH: &[u8] = &[0x21, 0x00, 0x49, 0x90, 0x02, 0x19, 0x00, 0x23, 0x80];
const SILENT_LC_3CH: &[u8] = &[
    0x00, 0xc8, 0x00, 0x80, 0x20, 0x84, 0x01, 0x26, 0x40, 0x08, 0x64, 0x00, 0x8e,
];
const SILENT_LC_4CH: &[u8] = &[
    0x00, 0xc8, 0x00, 0x80, 0x20, 0x84, 0x01, 0x26, 0x40, 0x08, 0x64, 0x00, 0x80, 0x2c, 0x80,
    0x08, 0x02, 0x38,
];
const SILENT_LC_5CH: &[u8] = &[
    0x00, 0xc8, 0x00, 0x80, 0x20, 0x84, 0x01, 0x26, 0x40, 0x08, 0x64, 0x00, 0x82, 0x30, 0x04,
    0x99, 0x00, 0x21, 0x90, 0x02, 0x38,
];
const SILENT_LC_6CH: &[u8] = &[
    0x00, 0xc8, 0x00, 0x80, 0x20, 0x84, 0x01, 0x26, 0x40, 0x08, 0x64, 0x00, 0x82, 0x30, 0x04,
    0x99, 0x00, 0x21, 0x90, 0x02, 0x00, 0xb2, 0x00, 0x20, 0x08, 0xe0,
];

/// 按 (编解码器字符串, 声道数) 查找静音帧
pub fn silent_frame(codec: &str, channel_count: u8) -> Option<&'static [u8]> {
    if codec != "mp4a.40.2" {
        return None;
    }
    match channel_count {
        1 => Some(SILENT_LC_1CH),
        2 => Some(SILENT_LC_2CH),
        3 => Some(SILENT_LC_3CH),
        4 => Some(SILENT_LC_4CH),
        5 => Some(SILENT_LC_5CH),
        6 => Some(SILENT_LC_6CH),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_静音帧查表() {
        assert_eq!(silent_frame("mp4a.40.2", 2).map(<[u8]>::len), Some(9));
        assert_eq!(silent_frame("mp4a.40.2", 6).map(<[u8]>::len), Some(26));
        assert!(silent_frame("mp4a.40.2", 0).is_none());
        assert!(silent_frame("mp4a.40.2", 8).is_none());
        assert!(silent_frame("mp4a.40.5", 2).is_none());
        assert!(silent_frame("mp3", 2).is_none());
    }
}

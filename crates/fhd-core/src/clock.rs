//! MPEG 33 位时钟工具.
//!
//! PES 中的 PTS/DTS 为 90kHz 的 33 位计数, 约 26.5 小时回绕一次.

/// MPEG 系统时钟频率 (90kHz)
pub const MPEG_CLOCK: i64 = 90_000;

/// 33 位时间戳的回绕周期 (2^33)
pub const PTS_WRAP: i64 = 1 << 33;

/// 回绕判定阈值 (2^32)
const PTS_HALF_WRAP: i64 = 1 << 32;

/// 将时间戳归一化到参考时间戳所在的时间轴
///
/// 不断加/减 2^33, 直到与参考值的距离不超过 2^32.
pub fn normalize_pts(value: i64, reference: i64) -> i64 {
    let offset = if reference < value { -PTS_WRAP } else { PTS_WRAP };
    let mut value = value;
    while (value - reference).abs() > PTS_HALF_WRAP {
        value += offset;
    }
    value
}

/// 秒转换为 90kHz 时钟刻度
pub fn seconds_to_mpeg(seconds: f64) -> i64 {
    (seconds * MPEG_CLOCK as f64).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_跨回绕边界归一化() {
        let reference = PTS_WRAP - 3;
        let after_wrap = normalize_pts(2, reference);
        assert_eq!(after_wrap - reference, 5);

        // 反方向: 参考在回绕之后
        let before_wrap = normalize_pts(PTS_WRAP - 3, 2);
        assert_eq!(2 - before_wrap, 5);
    }

    #[test]
    fn test_同一时间轴不变() {
        assert_eq!(normalize_pts(1000, 900_000), 1000);
        assert_eq!(normalize_pts(900_000, 1000), 900_000);
    }

    #[test]
    fn test_秒转换() {
        assert_eq!(seconds_to_mpeg(1.5), 135_000);
        assert_eq!(seconds_to_mpeg(0.0), 0);
    }
}

//! 容器格式标识符.

use std::fmt;

/// 支持的容器格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerFormat {
    /// MPEG Transport Stream
    MpegTs,
    /// Flash Video
    Flv,
}

impl ContainerFormat {
    /// 格式名称
    pub fn name(self) -> &'static str {
        match self {
            Self::MpegTs => "mpegts",
            Self::Flv => "flv",
        }
    }
}

impl fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

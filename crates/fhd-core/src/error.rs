//! 统一错误类型定义.
//!
//! 所有 fhd crate 共用的错误类型. 只有同步字节/签名错误会从 demux 调用中
//! 向外传播, 其余情况由解复用器内部吸收.

use thiserror::Error;

/// fhd 统一错误类型
#[derive(Debug, Error)]
pub enum FhdError {
    /// 无效参数
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// 不支持的码流或容器特性
    #[error("不支持: {0}")]
    Unsupported(String),

    /// 致命格式错误 (同步字节或文件签名不符), 整段输入不可用
    #[error("致命格式错误: {0}")]
    FatalFormat(String),

    /// 位读取越过缓冲区末尾
    #[error("比特流被截断")]
    TruncatedBitstream,

    /// 字节数据不足, 需要追加输入后重试
    #[error("数据不足, 需要更多输入")]
    NeedMoreData,

    /// 尚未解析到所需的编解码配置 (SPS/PPS/AudioSpecificConfig)
    #[error("缺少编解码配置: {0}")]
    MissingConfiguration(String),

    /// 无效数据 (损坏的码流字段等)
    #[error("无效数据: {0}")]
    InvalidData(String),

    /// I/O 错误
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),
}

impl FhdError {
    /// 是否为致命错误 (调用方应丢弃整段输入)
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::FatalFormat(_))
    }
}

/// fhd 统一 Result 类型
pub type FhdResult<T> = Result<T, FhdError>;

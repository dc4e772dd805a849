//! # fhd-core
//!
//! fhd 转封装框架的底层基础设施: 统一错误类型, 比特流读取/写入,
//! 有理数以及 MPEG 33 位时钟工具.

pub mod bitreader;
pub mod bitwriter;
pub mod clock;
pub mod error;
pub mod rational;

// 重导出常用类型
pub use bitreader::BitReader;
pub use bitwriter::BitWriter;
pub use error::{FhdError, FhdResult};
pub use rational::Rational;

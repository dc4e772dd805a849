//! 比特流读取器.
//!
//! H.264/H.265 参数集解析的基础设施: 定长字段, 无符号/有符号指数哥伦布码,
//! 以及缩放列表跳过.
//!
//! 按大端位序读取 (MSB first). 任何越过缓冲区末尾的读取都返回
//! [`FhdError::TruncatedBitstream`], 游标保持不变.

use crate::{FhdError, FhdResult};

/// 比特流读取器
///
/// # 示例
/// ```
/// use fhd_core::bitreader::BitReader;
///
/// // 0b1_010_011 -> ue 值 0, 1, 2
/// let data = [0b1010_0110];
/// let mut br = BitReader::new(&data);
/// assert_eq!(br.read_ue().unwrap(), 0);
/// assert_eq!(br.read_ue().unwrap(), 1);
/// assert_eq!(br.read_ue().unwrap(), 2);
/// ```
pub struct BitReader<'a> {
    /// 源数据
    data: &'a [u8],
    /// 已读取的位数 (游标)
    pos: usize,
}

impl<'a> BitReader<'a> {
    /// 创建新的比特流读取器
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// 缓冲区总位数
    fn bit_len(&self) -> usize {
        self.data.len() * 8
    }

    /// 获取已读取的总位数
    pub fn bits_read(&self) -> usize {
        self.pos
    }

    /// 获取剩余可读位数
    pub fn bits_left(&self) -> usize {
        self.bit_len().saturating_sub(self.pos)
    }

    /// 是否已到达末尾
    pub fn is_eof(&self) -> bool {
        self.bits_left() == 0
    }

    /// 读取 1 个位
    pub fn read_bit(&mut self) -> FhdResult<u32> {
        if self.pos >= self.bit_len() {
            return Err(FhdError::TruncatedBitstream);
        }
        let byte = self.data[self.pos >> 3];
        let bit = (byte >> (7 - (self.pos & 7))) & 1;
        self.pos += 1;
        Ok(u32::from(bit))
    }

    /// 读取 1 个位作为标志
    pub fn read_flag(&mut self) -> FhdResult<bool> {
        Ok(self.read_bit()? == 1)
    }

    /// 读取 N 个位 (最多 32 位)
    pub fn read_bits(&mut self, n: u32) -> FhdResult<u32> {
        if n > 32 {
            return Err(FhdError::InvalidArgument(format!(
                "read_bits: n={} 超过 32 位",
                n
            )));
        }
        if n as usize > self.bits_left() {
            return Err(FhdError::TruncatedBitstream);
        }

        let mut result: u64 = 0;
        let mut remaining = n as usize;
        while remaining > 0 {
            let offset = self.pos & 7;
            let take = remaining.min(8 - offset);
            let byte = self.data[self.pos >> 3];
            let bits = (byte >> (8 - offset - take)) & (0xFFu8 >> (8 - take));
            result = (result << take) | u64::from(bits);
            self.pos += take;
            remaining -= take;
        }
        Ok(result as u32)
    }

    /// 读取 N 个位 (最多 64 位)
    pub fn read_bits_u64(&mut self, n: u32) -> FhdResult<u64> {
        if n <= 32 {
            return self.read_bits(n).map(u64::from);
        }
        if n > 64 {
            return Err(FhdError::InvalidArgument(format!(
                "read_bits_u64: n={} 超过 64 位",
                n
            )));
        }
        if n as usize > self.bits_left() {
            return Err(FhdError::TruncatedBitstream);
        }
        let high = u64::from(self.read_bits(n - 32)?);
        let low = u64::from(self.read_bits(32)?);
        Ok((high << 32) | low)
    }

    /// 跳过 N 个位
    pub fn skip_bits(&mut self, n: usize) -> FhdResult<()> {
        if n > self.bits_left() {
            return Err(FhdError::TruncatedBitstream);
        }
        self.pos += n;
        Ok(())
    }

    /// 读取无符号指数哥伦布码 ue(v)
    pub fn read_ue(&mut self) -> FhdResult<u32> {
        let start = self.pos;
        let mut leading_zeros = 0u32;
        loop {
            match self.read_bit() {
                Ok(1) => break,
                Ok(_) => leading_zeros += 1,
                Err(e) => {
                    self.pos = start;
                    return Err(e);
                }
            }
            if leading_zeros > 31 {
                self.pos = start;
                return Err(FhdError::InvalidData("指数哥伦布码前导零超过 31 位".into()));
            }
        }
        match self.read_bits(leading_zeros) {
            Ok(suffix) => Ok(((1u64 << leading_zeros) - 1 + u64::from(suffix)) as u32),
            Err(e) => {
                self.pos = start;
                Err(e)
            }
        }
    }

    /// 读取有符号指数哥伦布码 se(v)
    ///
    /// 由 ue(v) 映射: 1 -> 1, 2 -> -1, 3 -> 2, 4 -> -2, ...
    pub fn read_se(&mut self) -> FhdResult<i32> {
        let code = i64::from(self.read_ue()?);
        let value = if code & 1 == 1 {
            (code + 1) / 2
        } else {
            -(code / 2)
        };
        Ok(value as i32)
    }

    /// 跳过一个 ue(v)
    pub fn skip_ue(&mut self) -> FhdResult<()> {
        self.read_ue().map(|_| ())
    }

    /// 跳过一个 se(v)
    pub fn skip_se(&mut self) -> FhdResult<()> {
        self.read_ue().map(|_| ())
    }

    /// 跳过一个 H.264 缩放列表 (4x4 为 16 项, 8x8 为 64 项)
    ///
    /// 按 delta_scale 差分规则推进, 一旦 next_scale 为 0 后续项沿用 last_scale 不再读取.
    pub fn skip_scaling_list(&mut self, size: usize) -> FhdResult<()> {
        let mut last_scale = 8i32;
        let mut next_scale = 8i32;
        for _ in 0..size {
            if next_scale != 0 {
                let delta = self.read_se()?;
                next_scale = (last_scale + delta).rem_euclid(256);
            }
            if next_scale != 0 {
                last_scale = next_scale;
            }
        }
        Ok(())
    }
}

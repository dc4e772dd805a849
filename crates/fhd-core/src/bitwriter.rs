//! 比特流写入器.
//!
//! 与 [`BitReader`](crate::bitreader::BitReader) 对应, 按大端位序写入.
//! 主要用于构造参数集 (SPS 等) 测试码流以及生成配置字节.

/// 比特流写入器
///
/// # 示例
/// ```
/// use fhd_core::bitwriter::BitWriter;
///
/// let mut bw = BitWriter::new();
/// bw.write_bits(0b1011, 4);
/// bw.write_ue(1);
/// assert_eq!(bw.finish(), vec![0b1011_0100]);
/// ```
#[derive(Debug, Default)]
pub struct BitWriter {
    /// 输出缓冲区
    data: Vec<u8>,
    /// 已写入的总位数
    len: usize,
}

impl BitWriter {
    /// 创建新的比特流写入器
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取已写入的总位数
    pub fn bits_written(&self) -> usize {
        self.len
    }

    /// 写入 1 个位
    pub fn write_bit(&mut self, bit: u32) {
        if self.len % 8 == 0 {
            self.data.push(0);
        }
        if bit & 1 == 1 {
            if let Some(last) = self.data.last_mut() {
                *last |= 0x80 >> (self.len % 8);
            }
        }
        self.len += 1;
    }

    /// 写入 1 个标志位
    pub fn write_flag(&mut self, flag: bool) {
        self.write_bit(u32::from(flag));
    }

    /// 写入值的低 N 位 (最多 32 位), 高位在前
    pub fn write_bits(&mut self, value: u32, n: u32) {
        debug_assert!(n <= 32, "write_bits: n={} 超过 32 位", n);
        for i in (0..n).rev() {
            self.write_bit((value >> i) & 1);
        }
    }

    /// 写入无符号指数哥伦布码 ue(v)
    pub fn write_ue(&mut self, value: u32) {
        let code = u64::from(value) + 1;
        let bits = 64 - code.leading_zeros();
        for _ in 1..bits {
            self.write_bit(0);
        }
        for i in (0..bits).rev() {
            self.write_bit(((code >> i) & 1) as u32);
        }
    }

    /// 写入有符号指数哥伦布码 se(v)
    pub fn write_se(&mut self, value: i32) {
        let code = if value > 0 {
            (i64::from(value) * 2 - 1) as u32
        } else {
            (-i64::from(value) * 2) as u32
        };
        self.write_ue(code);
    }

    /// 写入 rbsp_trailing_bits (停止位 1 + 零填充至字节边界)
    pub fn write_trailing_bits(&mut self) {
        self.write_bit(1);
        self.align_to_byte();
    }

    /// 对齐到字节边界 (用 0 填充)
    pub fn align_to_byte(&mut self) {
        self.len = (self.len + 7) & !7;
    }

    /// 完成写入, 返回字节数据 (不足一字节的部分以 0 填充)
    pub fn finish(self) -> Vec<u8> {
        self.data
    }
}

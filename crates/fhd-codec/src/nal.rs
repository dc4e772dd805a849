//! NAL 单元分帧.
//!
//! # Annex B
//!
//! 起始码 `00 00 01` 或 `00 00 00 01` 分隔 NAL 单元. 缓冲区末尾没有后继
//! 起始码的单元不能确定是否完整, 单独作为 `trailing` 返回, 由调用方决定是
//! 等待更多数据还是按完整单元处理 (例如 PES 已经结束).
//!
//! # 长度前缀 (AVCC/HVCC)
//!
//! ```text
//! [length: 1..=4 字节 BE] [NAL data: length 字节] ...
//! ```

use bytes::{BufMut, Bytes, BytesMut};

/// 带原始起始码长度的 Annex B 单元
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnexBUnit {
    /// 起始码长度 (3 或 4)
    pub start_code_len: usize,
    /// NAL 数据 (不含起始码)
    pub data: Bytes,
}

/// Annex B 分帧结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnexBSplit {
    /// 已被后继起始码确认完整的单元
    pub units: Vec<AnnexBUnit>,
    /// 末尾未被后继起始码终止的单元
    pub trailing: Option<AnnexBUnit>,
}

impl AnnexBSplit {
    /// 将末尾单元视为完整, 返回全部 NAL 数据
    pub fn into_complete_units(self) -> Vec<Bytes> {
        self.units
            .into_iter()
            .chain(self.trailing)
            .map(|u| u.data)
            .collect()
    }
}

/// 从 `from` 开始查找下一个起始码, 返回 (起始码位置, 起始码长度)
///
/// 只有 `from` 之后的额外零字节才会被并入 4 字节起始码.
fn find_start_code(data: &[u8], from: usize) -> Option<(usize, usize)> {
    let mut i = from + 2;
    while i < data.len() {
        match data[i] {
            0 => i += 1,
            1 if data[i - 1] == 0 && data[i - 2] == 0 => {
                let pos = i - 2;
                if pos > from && data[pos - 1] == 0 {
                    return Some((pos - 1, 4));
                }
                return Some((pos, 3));
            }
            // 当前字节不为 0, 以它结尾或经过它的起始码都不可能, 回看跳 3
            _ => i += 3,
        }
    }
    None
}

/// 按起始码分割 Annex B 字节流
///
/// 第一个起始码之前的字节被丢弃; 空单元 (连续起始码) 不输出.
pub fn split_annex_b(data: &Bytes) -> AnnexBSplit {
    let mut split = AnnexBSplit::default();
    let Some((first, first_len)) = find_start_code(data, 0) else {
        return split;
    };

    let mut unit_start = first + first_len;
    let mut prefix = first_len;
    loop {
        match find_start_code(data, unit_start) {
            Some((pos, len)) => {
                if pos > unit_start {
                    split.units.push(AnnexBUnit {
                        start_code_len: prefix,
                        data: data.slice(unit_start..pos),
                    });
                }
                unit_start = pos + len;
                prefix = len;
            }
            None => {
                if unit_start < data.len() {
                    split.trailing = Some(AnnexBUnit {
                        start_code_len: prefix,
                        data: data.slice(unit_start..),
                    });
                }
                break;
            }
        }
    }
    split
}

/// 以各自的原始起始码重新拼接 Annex B 单元
pub fn join_annex_b<'a>(units: impl IntoIterator<Item = &'a AnnexBUnit>) -> Vec<u8> {
    let mut out = BytesMut::new();
    for unit in units {
        if unit.start_code_len == 4 {
            out.put_u8(0);
        }
        out.put_slice(&[0, 0, 1]);
        out.put_slice(&unit.data);
    }
    out.to_vec()
}

/// 按长度前缀分割 NAL 单元
///
/// `length_size` 须为 1..=4, 否则返回空列表. 长度为 0 的单元被跳过;
/// 声明长度超出剩余数据时停止本次提取.
pub fn split_length_prefixed(data: &Bytes, length_size: usize) -> Vec<Bytes> {
    let mut units = Vec::new();
    if !(1..=4).contains(&length_size) {
        return units;
    }

    let mut pos = 0;
    while pos + length_size <= data.len() {
        let len = data[pos..pos + length_size]
            .iter()
            .fold(0usize, |acc, &b| (acc << 8) | usize::from(b));
        pos += length_size;
        if len == 0 {
            continue;
        }
        if pos + len > data.len() {
            log::debug!(
                "NAL 长度前缀越界: declared={}, remain={}",
                len,
                data.len() - pos
            );
            break;
        }
        units.push(data.slice(pos..pos + len));
        pos += len;
    }
    units
}

/// 移除防竞争字节 (`00 00 03` 中的 `03`)
pub fn remove_emulation_prevention(data: &[u8]) -> Vec<u8> {
    let mut rbsp = Vec::with_capacity(data.len());
    let mut zeros = 0usize;
    for &b in data {
        if zeros >= 2 && b == 0x03 {
            zeros = 0;
            continue;
        }
        zeros = if b == 0 { zeros + 1 } else { 0 };
        rbsp.push(b);
    }
    rbsp
}

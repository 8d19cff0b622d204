//! MBR 合成
//!
//! 块 0 不存储在闪存中，每次读取时按当前区域配置重新生成：
//! 只有第一个分区表项有效（FAT12，非引导），其余三个全零。
//!
//! 分区表项布局（16 字节）：
//!
//! ```text
//! +------+---------+------+---------+-----------+-----------+
//! | boot | CHS (3) | type | CHS (3) | LBA start | LBA count |
//! +------+---------+------+---------+-----------+-----------+
//!    0      1..4      4      5..8      8..12       12..16
//! ```

use crate::consts::*;
use crate::error::{Error, ErrorKind, Result};
use byteorder::{ByteOrder, LittleEndian};

/// CHS 字段占位值（使用 LBA 寻址时）
const CHS_PLACEHOLDER: [u8; 3] = [0xFF, 0xFF, 0xFF];

/// 分区表项
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PartitionEntry {
    /// 引导标志
    pub boot: u8,
    /// 分区类型
    pub part_type: u8,
    /// 起始 LBA
    pub start_block: u32,
    /// 块数
    pub block_count: u32,
}

impl PartitionEntry {
    /// 空表项
    pub const EMPTY: PartitionEntry = PartitionEntry {
        boot: 0,
        part_type: 0,
        start_block: 0,
        block_count: 0,
    };

    /// 非引导的 FAT12 分区
    pub const fn fat12(start_block: u32, block_count: u32) -> Self {
        Self {
            boot: PARTITION_NOT_BOOTABLE,
            part_type: PARTITION_TYPE_FAT12,
            start_block,
            block_count,
        }
    }

    /// 是否为空表项
    pub fn is_empty(&self) -> bool {
        self.part_type == 0 && self.block_count == 0
    }

    /// 编码到 16 字节缓冲区
    pub fn encode(&self, buf: &mut [u8]) {
        let buf = &mut buf[..MBR_PARTITION_ENTRY_SIZE];
        let chs = if self.block_count == 0 {
            [0u8; 3]
        } else {
            CHS_PLACEHOLDER
        };

        buf[0] = self.boot;
        buf[1..4].copy_from_slice(&chs);
        buf[4] = self.part_type;
        buf[5..8].copy_from_slice(&chs);
        LittleEndian::write_u32(&mut buf[8..12], self.start_block);
        LittleEndian::write_u32(&mut buf[12..16], self.block_count);
    }

    /// 从 16 字节缓冲区解码
    pub fn decode(buf: &[u8]) -> Self {
        Self {
            boot: buf[0],
            part_type: buf[4],
            start_block: LittleEndian::read_u32(&buf[8..12]),
            block_count: LittleEndian::read_u32(&buf[12..16]),
        }
    }
}

/// 生成 MBR
///
/// 写入 `buf` 的前 512 字节；更大的缓冲区其余部分清零。
pub fn fill_mbr(buf: &mut [u8], start_block: u32, block_count: u32) {
    buf.fill(0);

    let entries = [
        PartitionEntry::fat12(start_block, block_count),
        PartitionEntry::EMPTY,
        PartitionEntry::EMPTY,
        PartitionEntry::EMPTY,
    ];
    for (entry, &offset) in entries.iter().zip(MBR_PARTITION_OFFSETS.iter()) {
        entry.encode(&mut buf[offset..offset + MBR_PARTITION_ENTRY_SIZE]);
    }

    buf[MBR_SIGNATURE_OFFSET..MBR_SIZE].copy_from_slice(&MBR_SIGNATURE);
}

/// 解析后的分区表
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mbr {
    /// 四个分区表项
    pub partitions: [PartitionEntry; MBR_PARTITION_COUNT],
}

impl Mbr {
    /// 解析 512 字节的 MBR
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < MBR_SIZE {
            return Err(Error::new(ErrorKind::InvalidInput, "buffer too small for MBR"));
        }
        if buf[MBR_SIGNATURE_OFFSET..MBR_SIZE] != MBR_SIGNATURE {
            return Err(Error::new(ErrorKind::InvalidInput, "missing MBR signature"));
        }

        let mut partitions = [PartitionEntry::EMPTY; MBR_PARTITION_COUNT];
        for (entry, &offset) in partitions.iter_mut().zip(MBR_PARTITION_OFFSETS.iter()) {
            *entry = PartitionEntry::decode(&buf[offset..offset + MBR_PARTITION_ENTRY_SIZE]);
        }
        Ok(Self { partitions })
    }

    /// 第一个非空分区
    pub fn first_partition(&self) -> Option<&PartitionEntry> {
        self.partitions.iter().find(|p| !p.is_empty())
    }
}

//! 地址转换
//!
//! 把逻辑块号映射为物理闪存地址。分区从 `partition_start` 开始，
//! 依次铺满配置的各个闪存区域（区域之间可以不连续）。
//!
//! ```text
//! 逻辑块:   0     1 .. start-1   start ........................ block_count
//!          MBR    (无效)         |  区域 0  |  区域 1  | ...
//! ```

use crate::consts::*;
use crate::error::{Error, ErrorKind, Result};
use crate::types::FlashRegion;
use alloc::vec::Vec;

/// 擦除单元（扇区）
///
/// 以物理起始地址标识，不同大小的扇区也不会冲突。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sector {
    /// 物理起始地址
    pub start: u32,
    /// 扇区大小（字节）
    pub size: u32,
}

impl Sector {
    /// 创建扇区描述
    pub const fn new(start: u32, size: u32) -> Self {
        Self { start, size }
    }

    /// 扇区号（物理地址 / 擦除单元大小）
    pub const fn index(&self) -> u32 {
        self.start / self.size
    }

    /// 结束地址（不含）
    ///
    /// 以 `u64` 表示，扇区可以一直延伸到 4 GiB 边界。
    pub const fn end(&self) -> u64 {
        self.start as u64 + self.size as u64
    }

    /// 地址是否在扇区内
    pub const fn contains(&self, addr: u32) -> bool {
        addr >= self.start && (addr as u64) < self.end()
    }

    /// 地址在扇区内的偏移
    pub const fn offset_of(&self, addr: u32) -> usize {
        (addr - self.start) as usize
    }
}

/// 逻辑块到物理地址的转换器
///
/// 纯函数式：构造后只读，读写路径都可以共享。
#[derive(Debug, Clone)]
pub struct AddressTranslator {
    regions: Vec<FlashRegion>,
    block_size: u32,
    partition_start: u32,
    partition_blocks: u32,
}

impl AddressTranslator {
    /// 创建转换器并校验区域配置
    pub fn new(regions: &[FlashRegion], block_size: u32, partition_start: u32) -> Result<Self> {
        if regions.is_empty() {
            return Err(Error::new(ErrorKind::InvalidInput, "at least one flash region is required"));
        }
        if block_size < MIN_BLOCK_SIZE || !block_size.is_power_of_two() {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "block size must be a power of two of at least 512 bytes",
            ));
        }
        if partition_start == 0 {
            return Err(Error::new(ErrorKind::InvalidInput, "block 0 is reserved for the MBR"));
        }

        let mut partition_blocks: u32 = 0;
        for (i, region) in regions.iter().enumerate() {
            if region.erase_size == 0 || region.erase_size % block_size != 0 {
                return Err(Error::new(
                    ErrorKind::InvalidInput,
                    "erase unit must be a multiple of the block size",
                ));
            }
            if region.erase_size > MAX_ERASE_UNIT {
                return Err(Error::new(ErrorKind::InvalidInput, "erase unit is larger than the sector cache"));
            }
            if region.length == 0
                || region.base % region.erase_size != 0
                || region.length % region.erase_size != 0
            {
                return Err(Error::new(
                    ErrorKind::InvalidInput,
                    "region must be a non-empty whole number of erase units",
                ));
            }
            if region.end() > ADDRESS_SPACE_END {
                return Err(Error::new(ErrorKind::InvalidInput, "region exceeds the address space"));
            }
            if regions[..i].iter().any(|other| region.overlaps(other)) {
                return Err(Error::new(ErrorKind::InvalidInput, "flash regions overlap"));
            }
            partition_blocks = partition_blocks
                .checked_add(region.block_count(block_size))
                .ok_or(Error::new(ErrorKind::InvalidInput, "too many blocks"))?;
        }
        if partition_start.checked_add(partition_blocks).is_none() {
            return Err(Error::new(ErrorKind::InvalidInput, "too many blocks"));
        }

        Ok(Self {
            regions: regions.to_vec(),
            block_size,
            partition_start,
            partition_blocks,
        })
    }

    /// 逻辑块大小
    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    /// 分区起始块
    pub fn partition_start(&self) -> u32 {
        self.partition_start
    }

    /// 分区包含的块数（所有区域容量之和）
    pub fn partition_blocks(&self) -> u32 {
        self.partition_blocks
    }

    /// 设备总块数（分区起始偏移 + 分区块数）
    pub fn block_count(&self) -> u32 {
        self.partition_start + self.partition_blocks
    }

    /// 配置的区域
    pub fn regions(&self) -> &[FlashRegion] {
        &self.regions
    }

    /// 最大的擦除单元（决定扇区缓存大小）
    pub fn max_erase_size(&self) -> u32 {
        self.regions.iter().map(|r| r.erase_size).max().unwrap_or(0)
    }

    /// 逻辑块号 → 物理地址
    ///
    /// 块号不在分区内时返回 `None`。
    pub fn translate(&self, block: u32) -> Option<u32> {
        let mut relative = block.checked_sub(self.partition_start)?;
        for region in &self.regions {
            let count = region.block_count(self.block_size);
            if relative < count {
                return Some(region.base + relative * self.block_size);
            }
            relative -= count;
        }
        None
    }

    /// 物理地址所在的扇区
    pub fn sector_of(&self, addr: u32) -> Option<Sector> {
        self.regions
            .iter()
            .find(|region| region.contains(addr))
            .map(|region| {
                let start = addr - (addr - region.base) % region.erase_size;
                Sector::new(start, region.erase_size)
            })
    }

    /// 逻辑块号 → (物理地址, 所在扇区)
    pub fn locate(&self, block: u32) -> Option<(u32, Sector)> {
        let addr = self.translate(block)?;
        let sector = self.sector_of(addr)?;
        Some((addr, sector))
    }
}

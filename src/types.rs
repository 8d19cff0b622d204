//! 配置相关的数据结构
//!
//! 闪存区域在构建时固定，设备构造后不再修改。

use crate::consts::*;

/// 一段连续的物理闪存
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashRegion {
    /// 物理起始地址
    pub base: u32,
    /// 长度（字节）
    pub length: u32,
    /// 擦除单元大小（字节）
    pub erase_size: u32,
}

impl FlashRegion {
    /// 创建新的闪存区域
    pub const fn new(base: u32, length: u32, erase_size: u32) -> Self {
        Self {
            base,
            length,
            erase_size,
        }
    }

    /// 区域结束地址（不含）
    pub const fn end(&self) -> u64 {
        self.base as u64 + self.length as u64
    }

    /// 区域能容纳的逻辑块数
    pub const fn block_count(&self, block_size: u32) -> u32 {
        self.length / block_size
    }

    /// 两个区域是否有重叠的地址
    pub const fn overlaps(&self, other: &FlashRegion) -> bool {
        (self.base as u64) < other.end() && (other.base as u64) < self.end()
    }

    /// 地址是否落在本区域内
    pub const fn contains(&self, addr: u32) -> bool {
        addr >= self.base && (addr as u64) < self.end()
    }
}

/// 刷新策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushPolicy {
    /// 仅在显式同步或跨扇区写入时刷新
    #[default]
    OnDemand,
    /// 额外地，在最后一次写入后静默 `idle_ms` 毫秒时由 `poll()` 刷新
    Deferred {
        /// 静默时间（毫秒）
        idle_ms: u32,
    },
}

/// 块设备配置
#[derive(Debug, Clone, Copy)]
pub struct DiskConfig {
    /// 逻辑块大小
    pub block_size: u32,
    /// 分区起始块（块 0 是合成的 MBR）
    pub partition_start: u32,
    /// 擦除失败（Busy / SectorNotBlank）后的重试次数
    pub erase_retries: u32,
    /// 等待闪存控制器空闲的超时（毫秒）
    pub busy_timeout_ms: u32,
    /// 刷新策略
    pub flush_policy: FlushPolicy,
    /// 刷新成功后是否保留扇区作为干净缓存
    pub retain_after_flush: bool,
}

impl Default for DiskConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            partition_start: DEFAULT_PARTITION_START,
            erase_retries: DEFAULT_ERASE_RETRIES,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            flush_policy: FlushPolicy::OnDemand,
            retain_after_flush: false,
        }
    }
}

impl DiskConfig {
    /// 使用 `FlushPolicy::Deferred` 的配置
    pub fn deferred(idle_ms: u32) -> Self {
        Self {
            flush_policy: FlushPolicy::Deferred { idle_ms },
            ..Self::default()
        }
    }
}

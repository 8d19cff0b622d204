//! 单槽扇区写回缓存
//!
//! 闪存只能整扇区擦除（8–64 KiB），而文件系统按 512 字节块写入。
//! 缓存在 RAM 中保存一个完整扇区，同一扇区内的所有块写入只修改缓冲区，
//! 直到显式刷新、写入其他扇区或静默超时，才执行一次擦除 + 编程 + 校验。
//!
//! # 不变量
//!
//! - 槽脏时，缓冲区是该扇区的权威内容，闪存上的数据已过期
//! - 任何时刻最多只有一个扇区是脏的：写入其他扇区前先刷新当前扇区
//!
//! # 掉电
//!
//! 擦除完成到编程完成之间掉电，该扇区在闪存上为空白，
//! 丢失的数据最多为一个擦除单元。

use super::slot::{CacheFlags, SlotState};
use super::writeback::WriteBack;
use crate::error::{Error, ErrorKind, Result};
use crate::flash::{FlashPrimitives, IapStatus, TickSource};
use crate::translate::Sector;
use crate::types::DiskConfig;
use alloc::vec::Vec;

/// 缓存统计信息
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// 读取次数
    pub reads: u64,
    /// 由缓冲区直接满足的读取次数
    pub hits: u64,
    /// 写入次数
    pub writes: u64,
    /// 从闪存载入扇区的次数
    pub loads: u64,
    /// 成功写回的次数
    pub flushes: u64,
    /// 因写入其他扇区而触发的写回次数
    pub evictions: u64,
    /// 擦除重试次数
    pub erase_retries: u64,
}

impl CacheStats {
    /// 读命中率
    pub fn hit_rate(&self) -> f64 {
        if self.reads == 0 {
            0.0
        } else {
            self.hits as f64 / self.reads as f64
        }
    }
}

/// 扇区缓存
pub struct SectorCache {
    /// 驻留的扇区
    sector: Option<Sector>,
    /// 一个擦除单元大小的缓冲区
    buffer: Vec<u8>,
    /// 槽标志
    flags: CacheFlags,
    /// 最后一次写入的时间
    last_write_ms: u32,
    erase_retries: u32,
    busy_timeout_ms: u32,
    retain_after_flush: bool,
    stats: CacheStats,
}

impl SectorCache {
    /// 创建容量为 `capacity` 字节的缓存，使用默认写回参数
    pub fn new(capacity: usize) -> Self {
        Self::with_config(capacity, &DiskConfig::default())
    }

    /// 按配置创建缓存
    pub fn with_config(capacity: usize, config: &DiskConfig) -> Self {
        Self {
            sector: None,
            buffer: alloc::vec![0u8; capacity],
            flags: CacheFlags::empty(),
            last_write_ms: 0,
            erase_retries: config.erase_retries,
            busy_timeout_ms: config.busy_timeout_ms,
            retain_after_flush: config.retain_after_flush,
            stats: CacheStats::default(),
        }
    }

    /// 缓冲区容量（字节）
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// 当前状态
    pub fn state(&self) -> SlotState {
        SlotState::from_flags(self.sector.is_some(), self.flags)
    }

    /// 驻留的扇区
    pub fn resident(&self) -> Option<Sector> {
        self.sector
    }

    /// 是否有待写回的数据
    pub fn is_dirty(&self) -> bool {
        self.sector.is_some() && self.flags.contains(CacheFlags::DIRTY)
    }

    /// 最后一次写入的时间
    pub fn last_write_ms(&self) -> u32 {
        self.last_write_ms
    }

    /// 统计信息
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// 请求在下一次 poll 时写回
    pub fn request_flush(&mut self) {
        if self.is_dirty() {
            self.flags.insert(CacheFlags::FORCE);
        }
    }

    /// 是否有挂起的写回请求
    pub fn flush_requested(&self) -> bool {
        self.is_dirty() && self.flags.contains(CacheFlags::FORCE)
    }

    /// 丢弃缓冲区（不写回！）
    ///
    /// 警告：脏数据会丢失
    pub fn reset(&mut self) {
        if self.is_dirty() {
            log::warn!("[CACHE] discarding dirty sector {:#x}", self.sector.map_or(0, |s| s.start));
        }
        self.sector = None;
        self.flags = CacheFlags::empty();
        self.last_write_ms = 0;
    }

    /// 读取 `addr` 处的数据
    ///
    /// 所在扇区驻留时从缓冲区读取（无论脏与否），否则直接读闪存。
    pub fn read<F: FlashPrimitives>(&mut self, flash: &mut F, addr: u32, dest: &mut [u8]) -> Result<()> {
        self.stats.reads += 1;

        if let Some(sector) = self.sector {
            let end = addr as u64 + dest.len() as u64;
            if sector.contains(addr) && end <= sector.end() {
                let offset = sector.offset_of(addr);
                dest.copy_from_slice(&self.buffer[offset..offset + dest.len()]);
                self.stats.hits += 1;
                log::trace!("[CACHE] read {:#x} HIT (state={:?})", addr, self.state());
                return Ok(());
            }
        }

        match flash.read(addr, dest) {
            IapStatus::Success => Ok(()),
            status => Err(Error::with_status(ErrorKind::Io, "flash read failed", status)),
        }
    }

    /// 把 `src` 写入 `sector` 内的 `addr`
    ///
    /// 驻留的是另一个脏扇区时先同步写回。
    pub fn write<F: FlashPrimitives, T: TickSource>(
        &mut self,
        flash: &mut F,
        tick: &T,
        addr: u32,
        sector: Sector,
        src: &[u8],
    ) -> Result<()> {
        if !sector.contains(addr) || addr as u64 + src.len() as u64 > sector.end() {
            return Err(Error::new(ErrorKind::InvalidInput, "write crosses the sector boundary"));
        }
        if sector.size as usize > self.buffer.len() {
            return Err(Error::new(ErrorKind::InvalidInput, "sector larger than the cache buffer"));
        }

        if let Some(current) = self.sector {
            if current != sector {
                if self.is_dirty() {
                    log::debug!(
                        "[CACHE] evict dirty sector {:#x} for {:#x}",
                        current.start,
                        sector.start
                    );
                    self.flush(flash, tick)?;
                    self.stats.evictions += 1;
                }
                self.sector = None;
                self.flags = CacheFlags::empty();
            }
        }

        let offset = sector.offset_of(addr);
        if self.sector.is_none() {
            if offset == 0 && src.len() == sector.size as usize {
                log::debug!("[CACHE] sector {:#x} fully overwritten, skip load", sector.start);
            } else {
                self.load(flash, sector)?;
            }
            self.sector = Some(sector);
        }

        self.buffer[offset..offset + src.len()].copy_from_slice(src);
        self.flags.insert(CacheFlags::DIRTY);
        self.last_write_ms = tick.now_ms();
        self.stats.writes += 1;
        log::trace!("[CACHE] write {:#x} len={} into sector {:#x}", addr, src.len(), sector.start);
        Ok(())
    }

    /// 写回驻留扇区
    ///
    /// 槽为空或干净时什么都不做，返回 `Ok(false)`。
    /// 擦除、编程和校验在同一个临界区内完成，任何退出路径都会恢复中断。
    ///
    /// 失败时缓冲区保留，状态为 `Dirty`（擦除前失败）或
    /// `ErasedPendingProgram`（擦除后失败）。
    pub fn flush<F: FlashPrimitives, T: TickSource>(&mut self, flash: &mut F, tick: &T) -> Result<bool> {
        let sector = match self.sector {
            Some(sector) if self.flags.contains(CacheFlags::DIRTY) => sector,
            _ => return Ok(false),
        };

        log::debug!(
            "[CACHE] flush sector {:#x} (index {}, {} bytes)",
            sector.start,
            sector.index(),
            sector.size
        );

        let data = &self.buffer[..sector.size as usize];
        let flags = &mut self.flags;
        let mut seq = WriteBack::new(flash, tick, sector, self.erase_retries, self.busy_timeout_ms);

        let result = critical_section::with(|_| -> Result<()> {
            seq.erase()?;
            flags.insert(CacheFlags::ERASED);
            seq.program(data)?;
            seq.verify(data)
        });
        self.stats.erase_retries += seq.retries() as u64;

        match result {
            Ok(()) => {
                self.stats.flushes += 1;
                self.flags = CacheFlags::empty();
                if !self.retain_after_flush {
                    self.sector = None;
                }
                Ok(true)
            }
            Err(e) => {
                log::error!("[CACHE] flush of sector {:#x} failed: {}", sector.start, e);
                Err(e)
            }
        }
    }

    /// 从闪存载入整个扇区
    fn load<F: FlashPrimitives>(&mut self, flash: &mut F, sector: Sector) -> Result<()> {
        let buf = &mut self.buffer[..sector.size as usize];
        match flash.read(sector.start, buf) {
            IapStatus::Success => {
                self.stats.loads += 1;
                log::debug!("[CACHE] loaded sector {:#x}", sector.start);
                Ok(())
            }
            status => Err(Error::with_status(ErrorKind::Io, "sector load failed", status)),
        }
    }
}

impl core::fmt::Debug for SectorCache {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SectorCache")
            .field("sector", &self.sector)
            .field("state", &self.state())
            .field("capacity", &self.buffer.len())
            .field("last_write_ms", &self.last_write_ms)
            .field("stats", &self.stats)
            .finish()
    }
}

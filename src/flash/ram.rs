//! 基于内存的闪存模拟器
//!
//! 模拟 NOR 闪存的关键约束：
//! - 擦除把整个扇区置为 0xFF
//! - 编程只能把位从 1 变为 0（`old & new`）
//! - 擦除和编程前必须 `prepare_for_write`，准备状态用完即失效
//!
//! 另外提供调用计数和故障注入，供测试观察刷新序列。

use super::{FlashPrimitives, IapStatus};
use crate::consts::ERASED_BYTE;
use crate::translate::Sector;
use alloc::collections::{BTreeSet, VecDeque};
use alloc::vec::Vec;

/// 原语类别（用于故障注入）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashOp {
    /// prepare_for_write
    Prepare,
    /// erase
    Erase,
    /// blank_check
    BlankCheck,
    /// program
    Program,
    /// compare
    Compare,
    /// read
    Read,
}

/// 各原语的调用次数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlashCounters {
    /// prepare_for_write 次数
    pub prepares: u32,
    /// erase 次数
    pub erases: u32,
    /// blank_check 次数
    pub blank_checks: u32,
    /// program 次数
    pub programs: u32,
    /// compare 次数
    pub compares: u32,
    /// read 次数
    pub reads: u32,
}

impl FlashCounters {
    /// 所有原语调用总数
    pub fn total(&self) -> u32 {
        self.prepares + self.erases + self.blank_checks + self.programs + self.compares + self.reads
    }

    /// 修改闪存内容的调用总数（prepare / erase / program）
    pub fn mutating(&self) -> u32 {
        self.prepares + self.erases + self.programs
    }
}

/// 内存闪存
#[derive(Debug, Clone)]
pub struct RamFlash {
    base: u32,
    memory: Vec<u8>,
    prepared: Option<Sector>,
    faults: VecDeque<(FlashOp, IapStatus)>,
    stuck: BTreeSet<u32>,
    counters: FlashCounters,
}

impl RamFlash {
    /// 创建覆盖 `[base, base + size)` 的已擦除闪存
    pub fn new(base: u32, size: usize) -> Self {
        Self {
            base,
            memory: alloc::vec![ERASED_BYTE; size],
            prepared: None,
            faults: VecDeque::new(),
            stuck: BTreeSet::new(),
            counters: FlashCounters::default(),
        }
    }

    /// 起始地址
    pub fn base(&self) -> u32 {
        self.base
    }

    /// 全部内容
    pub fn contents(&self) -> &[u8] {
        &self.memory
    }

    /// 读取 `[addr, addr + len)` 的原始内容
    pub fn peek(&self, addr: u32, len: usize) -> Option<&[u8]> {
        let range = self.range(addr, len)?;
        Some(&self.memory[range])
    }

    /// 绕过原语直接写入内容（模拟出厂镜像）
    pub fn load_image(&mut self, addr: u32, data: &[u8]) -> bool {
        match self.range(addr, data.len()) {
            Some(range) => {
                self.memory[range].copy_from_slice(data);
                true
            }
            None => false,
        }
    }

    /// 调用计数
    pub fn counters(&self) -> FlashCounters {
        self.counters
    }

    /// 清零调用计数
    pub fn reset_counters(&mut self) {
        self.counters = FlashCounters::default();
    }

    /// 让下一次 `op` 调用返回 `status`（不执行实际操作）
    ///
    /// 多次注入按先后顺序消费。
    pub fn inject(&mut self, op: FlashOp, status: IapStatus) {
        self.faults.push_back((op, status));
    }

    /// 把 `addr` 处的字节固定为 0，擦除后查空将失败
    pub fn stick(&mut self, addr: u32) {
        self.stuck.insert(addr);
        if let Some(range) = self.range(addr, 1) {
            self.memory[range].fill(0);
        }
    }

    /// 取消所有坏字节
    pub fn unstick_all(&mut self) {
        self.stuck.clear();
    }

    fn range(&self, addr: u32, len: usize) -> Option<core::ops::Range<usize>> {
        let start = addr.checked_sub(self.base)? as usize;
        let end = start.checked_add(len)?;
        if end > self.memory.len() {
            return None;
        }
        Some(start..end)
    }

    fn take_fault(&mut self, op: FlashOp) -> Option<IapStatus> {
        let pos = self.faults.iter().position(|(o, _)| *o == op)?;
        self.faults.remove(pos).map(|(_, status)| status)
    }

    fn is_prepared_for(&self, addr: u32, len: usize) -> bool {
        match self.prepared {
            Some(sector) => {
                let end = addr as u64 + len as u64;
                sector.contains(addr) && end <= sector.end()
            }
            None => false,
        }
    }
}

impl FlashPrimitives for RamFlash {
    fn prepare_for_write(&mut self, sector: Sector) -> IapStatus {
        self.counters.prepares += 1;
        if let Some(status) = self.take_fault(FlashOp::Prepare) {
            return status;
        }
        if self.range(sector.start, sector.size as usize).is_none() {
            return IapStatus::InvalidSector;
        }
        self.prepared = Some(sector);
        IapStatus::Success
    }

    fn erase(&mut self, sector: Sector) -> IapStatus {
        self.counters.erases += 1;
        if let Some(status) = self.take_fault(FlashOp::Erase) {
            return status;
        }
        let range = match self.range(sector.start, sector.size as usize) {
            Some(range) => range,
            None => return IapStatus::InvalidSector,
        };
        if self.prepared != Some(sector) {
            return IapStatus::SectorNotPrepared;
        }
        self.prepared = None;
        self.memory[range].fill(ERASED_BYTE);
        for &addr in &self.stuck {
            if sector.contains(addr) {
                let offset = (addr - self.base) as usize;
                self.memory[offset] = 0;
            }
        }
        IapStatus::Success
    }

    fn blank_check(&mut self, addr: u32, len: u32) -> IapStatus {
        self.counters.blank_checks += 1;
        if let Some(status) = self.take_fault(FlashOp::BlankCheck) {
            return status;
        }
        match self.range(addr, len as usize) {
            Some(range) if self.memory[range.clone()].iter().all(|&b| b == ERASED_BYTE) => {
                IapStatus::Success
            }
            Some(_) => IapStatus::SectorNotBlank,
            None => IapStatus::InvalidSector,
        }
    }

    fn program(&mut self, addr: u32, src: &[u8]) -> IapStatus {
        self.counters.programs += 1;
        if let Some(status) = self.take_fault(FlashOp::Program) {
            return status;
        }
        if src.len() % 4 != 0 {
            return IapStatus::CountError;
        }
        let range = match self.range(addr, src.len()) {
            Some(range) => range,
            None => return IapStatus::DstAddrNotMapped,
        };
        if !self.is_prepared_for(addr, src.len()) {
            return IapStatus::SectorNotPrepared;
        }
        self.prepared = None;
        for (cell, &byte) in self.memory[range].iter_mut().zip(src) {
            *cell &= byte;
        }
        IapStatus::Success
    }

    fn compare(&mut self, addr: u32, buf: &[u8]) -> IapStatus {
        self.counters.compares += 1;
        if let Some(status) = self.take_fault(FlashOp::Compare) {
            return status;
        }
        match self.range(addr, buf.len()) {
            Some(range) if self.memory[range.clone()] == *buf => IapStatus::Success,
            Some(_) => IapStatus::CompareError,
            None => IapStatus::SrcAddrNotMapped,
        }
    }

    fn read(&mut self, addr: u32, buf: &mut [u8]) -> IapStatus {
        self.counters.reads += 1;
        if let Some(status) = self.take_fault(FlashOp::Read) {
            return status;
        }
        match self.range(addr, buf.len()) {
            Some(range) => {
                buf.copy_from_slice(&self.memory[range]);
                IapStatus::Success
            }
            None => IapStatus::SrcAddrNotMapped,
        }
    }
}

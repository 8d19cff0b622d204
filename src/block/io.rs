//! 块 I/O 操作实现

use super::FlashDisk;
use crate::error::{Error, ErrorKind, Result};
use crate::flash::{FlashPrimitives, TickSource};
use crate::mbr::fill_mbr;

impl<F: FlashPrimitives, T: TickSource> FlashDisk<F, T> {
    /// 读取单个逻辑块
    ///
    /// 块 0 返回生成的 MBR；其他块在缓存命中时从缓冲区读取，
    /// 否则直接从闪存读取（不载入缓存）。
    ///
    /// # 参数
    ///
    /// * `block` - 逻辑块号
    /// * `buf` - 目标缓冲区（大小至少为 block_size）
    ///
    /// # 返回
    ///
    /// 成功返回读取的字节数
    pub fn read_block(&mut self, block: u32, buf: &mut [u8]) -> Result<usize> {
        let block_size = self.check_buffer(buf.len())?;
        self.inc_read_count();

        let dest = &mut buf[..block_size];
        if block == 0 {
            fill_mbr(dest, self.translator.partition_start(), self.translator.partition_blocks());
            return Ok(block_size);
        }

        let addr = match self.translator.translate(block) {
            Some(addr) => addr,
            None => {
                log::debug!("[DISK] read of invalid block {}", block);
                return Err(Error::new(ErrorKind::InvalidBlock, "block out of range"));
            }
        };

        self.cache.read(&mut self.flash, addr, dest)?;
        Ok(block_size)
    }

    /// 写入单个逻辑块
    ///
    /// 数据只进入扇区缓存，直到写回（其他扇区的写入、flush、poll 或 init）
    /// 才落到闪存。写入块 0 被忽略。
    ///
    /// # 参数
    ///
    /// * `block` - 逻辑块号
    /// * `buf` - 源数据缓冲区（大小至少为 block_size）
    ///
    /// # 返回
    ///
    /// 成功返回写入的字节数
    pub fn write_block(&mut self, block: u32, buf: &[u8]) -> Result<usize> {
        let block_size = self.check_buffer(buf.len())?;
        self.inc_write_count();

        if block == 0 {
            log::debug!("[DISK] write to MBR block ignored");
            return Ok(block_size);
        }

        self.ensure_alive()?;

        let (addr, sector) = match self.translator.locate(block) {
            Some(location) => location,
            None => {
                log::debug!("[DISK] write of invalid block {}", block);
                return Err(Error::new(ErrorKind::InvalidBlock, "block out of range"));
            }
        };

        let result = self
            .cache
            .write(&mut self.flash, &self.tick, addr, sector, &buf[..block_size]);
        self.guard(result)?;
        Ok(block_size)
    }

    /// 连续读取多个块
    ///
    /// `buf.len()` 必须是块大小的整数倍。遇到第一个失败的块即返回错误，
    /// 此前的块已写入 `buf`。
    ///
    /// # 返回
    ///
    /// 成功返回读取的字节数
    pub fn read_blocks(&mut self, start: u32, buf: &mut [u8]) -> Result<usize> {
        let block_size = self.check_batch(buf.len())?;
        for (i, chunk) in buf.chunks_exact_mut(block_size).enumerate() {
            let block = next_block(start, i)?;
            self.read_block(block, chunk)?;
        }
        Ok(buf.len())
    }

    /// 连续写入多个块
    ///
    /// `buf.len()` 必须是块大小的整数倍。遇到第一个失败的块即返回错误，
    /// 此前的块已进入缓存（或已写回）。
    ///
    /// # 返回
    ///
    /// 成功返回写入的字节数
    pub fn write_blocks(&mut self, start: u32, buf: &[u8]) -> Result<usize> {
        let block_size = self.check_batch(buf.len())?;
        for (i, chunk) in buf.chunks_exact(block_size).enumerate() {
            let block = next_block(start, i)?;
            self.write_block(block, chunk)?;
        }
        Ok(buf.len())
    }

    fn check_buffer(&self, len: usize) -> Result<usize> {
        let block_size = self.translator.block_size() as usize;
        if len < block_size {
            return Err(Error::new(ErrorKind::InvalidInput, "buffer too small for block"));
        }
        Ok(block_size)
    }

    fn check_batch(&self, len: usize) -> Result<usize> {
        let block_size = self.translator.block_size() as usize;
        if len % block_size != 0 {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "buffer length is not a multiple of block size",
            ));
        }
        Ok(block_size)
    }
}

fn next_block(start: u32, index: usize) -> Result<u32> {
    u32::try_from(index)
        .ok()
        .and_then(|i| start.checked_add(i))
        .ok_or(Error::new(ErrorKind::InvalidBlock, "block number overflow"))
}

#[cfg(test)]
mod tests {
    use crate::block::FlashDisk;
    use crate::cache::SlotState;
    use crate::error::ErrorKind;
    use crate::flash::{FlashOp, IapStatus, RamFlash};
    use crate::mbr::Mbr;
    use crate::types::{DiskConfig, FlashRegion};
    use alloc::vec;

    const BASE: u32 = 0x7_0000;
    const KIB: u32 = 1024;

    fn disk() -> FlashDisk<RamFlash> {
        let regions = [FlashRegion::new(BASE, 64 * KIB, 32 * KIB)];
        let mut disk =
            FlashDisk::new(RamFlash::new(BASE, 64 * KIB as usize), &regions, DiskConfig::default()).unwrap();
        disk.init().unwrap();
        disk
    }

    fn pattern(seed: u8) -> [u8; 512] {
        let mut buf = [0u8; 512];
        for (i, b) in buf.iter_mut().enumerate() {
            *b = seed.wrapping_add(i as u8);
        }
        buf
    }

    #[test]
    fn test_mbr_block() {
        let mut disk = disk();
        let mut first = [0xAAu8; 512];
        let mut second = [0x55u8; 512];
        disk.read_block(0, &mut first).unwrap();
        disk.read_block(0, &mut second).unwrap();

        assert_eq!(first, second);
        assert_eq!(&first[446..450], &[0x00, 0xFF, 0xFF, 0xFF]);
        assert_eq!(first[450], 0x01);
        assert_eq!(&first[451..454], &[0xFF, 0xFF, 0xFF]);
        assert_eq!(&first[454..458], &1u32.to_le_bytes());
        assert_eq!(&first[458..462], &128u32.to_le_bytes());
        assert!(first[462..510].iter().all(|&b| b == 0));
        assert_eq!(&first[510..512], &[0x55, 0xAA]);
        assert!(first[..446].iter().all(|&b| b == 0));

        let mbr = Mbr::parse(&first).unwrap();
        let part = mbr.first_partition().unwrap();
        assert_eq!(part.start_block, disk.partition_start());
        assert_eq!(part.block_count, disk.partition_blocks());
        assert_eq!(disk.flash().counters().total(), 0);
    }

    #[test]
    fn test_write_block_zero_is_ignored() {
        let mut disk = disk();
        assert_eq!(disk.write_block(0, &[0u8; 512]).unwrap(), 512);
        assert_eq!(disk.cache_state(), SlotState::Empty);
        assert_eq!(disk.flash().counters().total(), 0);

        let mut buf = [0u8; 512];
        disk.read_block(0, &mut buf).unwrap();
        assert_eq!(&buf[510..512], &[0x55, 0xAA]);
    }

    #[test]
    fn test_read_erased_block() {
        let mut disk = disk();
        let mut buf = [0u8; 512];
        disk.read_block(128, &mut buf).unwrap();
        assert_eq!(buf, [0xFFu8; 512]);
        assert_eq!(disk.cache_state(), SlotState::Empty);
    }

    #[test]
    fn test_write_then_read_before_flush() {
        let mut disk = disk();
        disk.write_block(5, &pattern(5)).unwrap();

        let mut buf = [0u8; 512];
        disk.read_block(5, &mut buf).unwrap();
        assert_eq!(buf, pattern(5));
        assert_eq!(disk.flash().counters().mutating(), 0);
        assert_eq!(disk.cache_state(), SlotState::Dirty);
    }

    #[test]
    fn test_flush_survives_power_cycle() {
        let regions = [FlashRegion::new(BASE, 64 * KIB, 32 * KIB)];
        let mut disk = disk();
        disk.write_block(7, &pattern(7)).unwrap();
        disk.write_block(100, &pattern(100)).unwrap();
        disk.flush().unwrap();

        let flash = disk.into_flash();
        let mut disk = FlashDisk::new(flash, &regions, DiskConfig::default()).unwrap();
        disk.init().unwrap();

        let mut buf = [0u8; 512];
        disk.read_block(7, &mut buf).unwrap();
        assert_eq!(buf, pattern(7));
        disk.read_block(100, &mut buf).unwrap();
        assert_eq!(buf, pattern(100));
    }

    #[test]
    fn test_unflushed_data_lost_on_power_cycle() {
        let regions = [FlashRegion::new(BASE, 64 * KIB, 32 * KIB)];
        let mut disk = disk();
        disk.write_block(7, &pattern(7)).unwrap();

        let mut disk = FlashDisk::new(disk.into_flash(), &regions, DiskConfig::default()).unwrap();
        let mut buf = [0u8; 512];
        disk.read_block(7, &mut buf).unwrap();
        assert_eq!(buf, [0xFFu8; 512]);
    }

    #[test]
    fn test_writes_in_one_sector_coalesce() {
        let mut disk = disk();
        // 块 1..=64 都在第一个 32K 扇区
        for block in 1..=64u32 {
            disk.write_block(block, &pattern(block as u8)).unwrap();
        }
        assert_eq!(disk.flash().counters().mutating(), 0);

        disk.flush().unwrap();
        let counters = disk.flash().counters();
        assert_eq!(counters.erases, 1);
        assert_eq!(counters.programs, 1);
        assert_eq!(counters.compares, 1);

        let mut buf = [0u8; 512];
        for block in 1..=64u32 {
            disk.read_block(block, &mut buf).unwrap();
            assert_eq!(buf, pattern(block as u8));
        }
    }

    #[test]
    fn test_write_to_other_sector_evicts() {
        let mut disk = disk();
        disk.write_block(1, &pattern(1)).unwrap();
        disk.write_block(65, &pattern(65)).unwrap();

        // 第一个扇区已写回
        assert_eq!(disk.flash().counters().erases, 1);
        assert_eq!(disk.flash().peek(BASE, 512).unwrap(), &pattern(1)[..]);
        assert_eq!(disk.cache.resident().map(|s| s.start), Some(BASE + 32 * KIB));

        let mut buf = [0u8; 512];
        disk.read_block(1, &mut buf).unwrap();
        assert_eq!(buf, pattern(1));
        disk.read_block(65, &mut buf).unwrap();
        assert_eq!(buf, pattern(65));
    }

    #[test]
    fn test_out_of_range_rejected_without_flash_access() {
        let mut disk = disk();
        let mut buf = [0u8; 512];
        assert_eq!(disk.read_block(129, &mut buf).unwrap_err().kind(), ErrorKind::InvalidBlock);
        assert_eq!(disk.write_block(129, &buf).unwrap_err().kind(), ErrorKind::InvalidBlock);
        assert_eq!(disk.read_block(u32::MAX, &mut buf).unwrap_err().kind(), ErrorKind::InvalidBlock);
        assert_eq!(disk.flash().counters().total(), 0);
        assert_eq!(disk.cache_state(), SlotState::Empty);
    }

    #[test]
    fn test_reserved_blocks_rejected() {
        let regions = [FlashRegion::new(BASE, 64 * KIB, 32 * KIB)];
        let config = DiskConfig {
            partition_start: 4,
            ..DiskConfig::default()
        };
        let mut disk = FlashDisk::new(RamFlash::new(BASE, 64 * KIB as usize), &regions, config).unwrap();
        assert_eq!(disk.block_count(), 132);

        let mut buf = [0u8; 512];
        for block in 1..4 {
            assert_eq!(disk.read_block(block, &mut buf).unwrap_err().kind(), ErrorKind::InvalidBlock);
        }
        disk.write_block(4, &pattern(4)).unwrap();
        disk.flush().unwrap();
        assert_eq!(disk.flash().peek(BASE, 512).unwrap(), &pattern(4)[..]);
    }

    #[test]
    fn test_buffer_too_small() {
        let mut disk = disk();
        let mut buf = [0u8; 256];
        assert_eq!(disk.read_block(1, &mut buf).unwrap_err().kind(), ErrorKind::InvalidInput);
        assert_eq!(disk.write_block(1, &buf).unwrap_err().kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_batched_round_trip() {
        let mut disk = disk();
        let mut data = vec![0u8; 512 * 70];
        for (i, chunk) in data.chunks_mut(512).enumerate() {
            chunk.copy_from_slice(&pattern(i as u8));
        }

        // 跨越两个扇区
        assert_eq!(disk.write_blocks(10, &data).unwrap(), data.len());
        disk.flush().unwrap();
        assert_eq!(disk.flash().counters().erases, 2);

        let mut back = vec![0u8; data.len()];
        assert_eq!(disk.read_blocks(10, &mut back).unwrap(), back.len());
        assert_eq!(back, data);
    }

    #[test]
    fn test_batched_stops_at_first_failure() {
        let mut disk = disk();
        let data = vec![0x3Cu8; 512 * 4];
        // 块 127、128 有效，129 越界
        let err = disk.write_blocks(127, &data).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidBlock);

        let mut buf = [0u8; 512];
        disk.read_block(128, &mut buf).unwrap();
        assert_eq!(buf, [0x3Cu8; 512]);

        let mut back = vec![0u8; 512 * 3];
        assert_eq!(disk.read_blocks(127, &mut back).unwrap_err().kind(), ErrorKind::InvalidBlock);
        assert!(back[..1024].iter().all(|&b| b == 0x3C));
    }

    #[test]
    fn test_batched_rejects_partial_blocks() {
        let mut disk = disk();
        let mut buf = vec![0u8; 700];
        assert_eq!(disk.read_blocks(1, &mut buf).unwrap_err().kind(), ErrorKind::InvalidInput);
        assert_eq!(disk.write_blocks(1, &buf).unwrap_err().kind(), ErrorKind::InvalidInput);
        assert_eq!(disk.write_count(), 0);
    }

    #[test]
    fn test_eviction_failure_keeps_new_data_out() {
        let mut disk = disk();
        disk.write_block(1, &pattern(1)).unwrap();
        disk.flash_mut().inject(FlashOp::Program, IapStatus::DstAddrError);

        let err = disk.write_block(65, &pattern(65)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Flash);
        assert!(disk.is_failed());

        // 原扇区的数据仍在缓冲区中
        let mut buf = [0u8; 512];
        disk.read_block(1, &mut buf).unwrap();
        assert_eq!(buf, pattern(1));
        disk.read_block(65, &mut buf).unwrap();
        assert_eq!(buf, [0xFFu8; 512]);

        disk.init().unwrap();
        assert_eq!(disk.flash().peek(BASE, 512).unwrap(), &pattern(1)[..]);
    }

    #[test]
    fn test_load_failure_does_not_latch() {
        let mut disk = disk();
        disk.flash_mut().inject(FlashOp::Read, IapStatus::SrcAddrNotMapped);

        let err = disk.write_block(1, &pattern(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(err.status(), Some(IapStatus::SrcAddrNotMapped));
        assert!(!disk.is_failed());
        assert_eq!(disk.cache_state(), SlotState::Empty);
        assert_eq!(disk.flash().counters().mutating(), 0);

        // 后续写入照常进行
        disk.write_block(2, &pattern(2)).unwrap();
        disk.flush().unwrap();
        assert_eq!(disk.flash().peek(BASE + 512, 512).unwrap(), &pattern(2)[..]);
    }

    #[test]
    fn test_discontiguous_regions_survive_power_cycle() {
        const LOW: u32 = 0x1_0000;
        const HIGH: u32 = 0x4_0000;
        let regions = [
            FlashRegion::new(LOW, 16 * KIB, 8 * KIB),
            FlashRegion::new(HIGH, 128 * KIB, 64 * KIB),
        ];
        let flash = RamFlash::new(LOW, (HIGH + 128 * KIB - LOW) as usize);
        let mut disk = FlashDisk::new(flash, &regions, DiskConfig::default()).unwrap();
        disk.init().unwrap();
        assert_eq!(disk.partition_blocks(), 32 + 256);
        assert_eq!(disk.block_count(), 289);

        // 区域 0 的首块和末块、区域 1 的首块、最后一个块
        let blocks = [2u32, 32, 33, 288];
        for &block in &blocks {
            disk.write_block(block, &pattern(block as u8)).unwrap();
        }
        disk.flush().unwrap();
        // 8K 扇区 0x10000 和 0x12000，64K 扇区 0x40000 和 0x50000
        assert_eq!(disk.flash().counters().erases, 4);
        assert_eq!(disk.cache_stats().evictions, 3);
        assert_eq!(disk.flash().peek(LOW + 31 * 512, 512).unwrap(), &pattern(32)[..]);
        assert_eq!(disk.flash().peek(HIGH, 512).unwrap(), &pattern(33)[..]);

        let mut disk = FlashDisk::new(disk.into_flash(), &regions, DiskConfig::default()).unwrap();
        disk.init().unwrap();
        let mut buf = [0u8; 512];
        for &block in &blocks {
            disk.read_block(block, &mut buf).unwrap();
            assert_eq!(buf, pattern(block as u8));
        }
        // 未写过的邻块保持擦除状态
        disk.read_block(34, &mut buf).unwrap();
        assert_eq!(buf, [0xFFu8; 512]);
        assert_eq!(disk.read_block(289, &mut buf).unwrap_err().kind(), ErrorKind::InvalidBlock);
    }

    #[test]
    fn test_read_write_counts() {
        let mut disk = disk();
        let mut buf = [0u8; 512];
        disk.write_block(1, &buf).unwrap();
        disk.read_block(0, &mut buf).unwrap();
        disk.read_block(1, &mut buf).unwrap();
        assert_eq!(disk.write_count(), 1);
        assert_eq!(disk.read_count(), 2);
        assert_eq!(disk.cache_stats().hits, 1);
    }
}

//! 块设备核心类型

use crate::cache::{CacheStats, SectorCache, SlotState};
use crate::error::{Error, ErrorKind, Result};
use crate::flash::{FlashPrimitives, NoTick, TickSource};
use crate::translate::AddressTranslator;
use crate::types::{DiskConfig, FlashRegion, FlushPolicy};

/// 块设备接口
///
/// 文件系统层通过此 trait 访问存储，不关心底层是否为闪存。
///
/// # 示例
///
/// ```rust,ignore
/// use flashdisk_core::{BlockDevice, Result};
///
/// fn read_boot_sector<D: BlockDevice>(dev: &mut D) -> Result<[u8; 512]> {
///     let mut buf = [0u8; 512];
///     dev.read_blocks(0, &mut buf)?;
///     Ok(buf)
/// }
/// ```
pub trait BlockDevice {
    /// 逻辑块大小（通常 512）
    fn block_size(&self) -> u32;

    /// 总块数
    fn block_count(&self) -> u32;

    /// 从 `start` 开始读取 `buf.len() / block_size` 个块
    ///
    /// # 返回
    ///
    /// 成功返回读取的字节数
    fn read_blocks(&mut self, start: u32, buf: &mut [u8]) -> Result<usize>;

    /// 从 `start` 开始写入 `buf.len() / block_size` 个块
    ///
    /// # 返回
    ///
    /// 成功返回写入的字节数
    fn write_blocks(&mut self, start: u32, buf: &[u8]) -> Result<usize>;

    /// 刷新缓存
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// 是否只读
    fn is_read_only(&self) -> bool {
        false
    }
}

/// 闪存块设备
///
/// 把一个或多个闪存区域组合成固定块大小的存储：
/// - 块 0 是按区域配置生成的 MBR，写入被忽略
/// - 其余块经 [`AddressTranslator`] 映射到物理地址，通过 [`SectorCache`] 读写
///
/// # 失效状态
///
/// 擦除 / 编程 / 校验的致命错误会使设备进入失效状态：写入和刷新返回
/// `ErrorKind::DeviceFailed`，读取仍然可用（缓冲区中的数据依然有效）。
/// 调用 [`init`](Self::init) 会重试写回并清除失效状态。
///
/// # 并发使用
///
/// FlashDisk 不包含内部锁，由单一调用线程驱动。若在定时中断中调用
/// [`poll`](Self::poll)，调用方需保证它与主调用路径互斥。
pub struct FlashDisk<F, T = NoTick> {
    /// 闪存原语
    pub(super) flash: F,
    /// 计时源
    pub(super) tick: T,
    /// 地址转换
    pub(super) translator: AddressTranslator,
    /// 扇区缓存
    pub(super) cache: SectorCache,
    /// 配置
    config: DiskConfig,
    /// 是否已初始化闪存控制器
    initialised: bool,
    /// 是否处于失效状态
    failed: bool,
    /// 逻辑读取次数
    read_count: u64,
    /// 逻辑写入次数
    write_count: u64,
}

impl<F: FlashPrimitives> FlashDisk<F, NoTick> {
    /// 创建不带计时源的块设备
    ///
    /// 只能使用 `FlushPolicy::OnDemand`。
    pub fn new(flash: F, regions: &[FlashRegion], config: DiskConfig) -> Result<Self> {
        if config.flush_policy != FlushPolicy::OnDemand {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "deferred flush requires a tick source",
            ));
        }
        Self::with_tick(flash, NoTick, regions, config)
    }
}

impl<F: FlashPrimitives, T: TickSource> FlashDisk<F, T> {
    /// 创建块设备
    ///
    /// # 参数
    ///
    /// * `flash` - 闪存原语
    /// * `tick` - 计时源
    /// * `regions` - 闪存区域，按顺序组成分区
    /// * `config` - 设备配置
    pub fn with_tick(flash: F, tick: T, regions: &[FlashRegion], config: DiskConfig) -> Result<Self> {
        let translator = AddressTranslator::new(regions, config.block_size, config.partition_start)?;
        let cache = SectorCache::with_config(translator.max_erase_size() as usize, &config);

        log::debug!(
            "[DISK] {} regions, {} blocks of {} bytes, partition at {}",
            regions.len(),
            translator.block_count(),
            translator.block_size(),
            translator.partition_start()
        );

        Ok(Self {
            flash,
            tick,
            translator,
            cache,
            config,
            initialised: false,
            failed: false,
            read_count: 0,
            write_count: 0,
        })
    }

    /// 初始化设备
    ///
    /// 可重复调用。首次调用初始化闪存控制器；之后每次调用都会写回脏数据
    /// 并把缓存重置为空。设备失效后调用会重试写回，成功则清除失效状态。
    pub fn init(&mut self) -> Result<()> {
        if self.cache.is_dirty() {
            let result = self.cache.flush(&mut self.flash, &self.tick);
            self.guard(result)?;
        }

        if !self.initialised {
            let status = self.flash.init();
            if !status.is_success() {
                log::error!("[DISK] flash controller init failed: {}", status.message());
                return Err(Error::with_status(ErrorKind::Flash, "flash controller init failed", status));
            }
            self.initialised = true;
        }

        self.cache.reset();
        self.failed = false;
        Ok(())
    }

    /// 强制写回缓存
    ///
    /// 用于卸载、显式同步和介质分离。
    pub fn flush(&mut self) -> Result<()> {
        self.ensure_alive()?;
        let result = self.cache.flush(&mut self.flash, &self.tick);
        self.guard(result).map(|_| ())
    }

    /// 同 [`flush`](Self::flush)
    pub fn sync(&mut self) -> Result<()> {
        self.flush()
    }

    /// 请求由下一次 [`poll`](Self::poll) 写回
    pub fn request_sync(&mut self) {
        self.cache.request_flush();
    }

    /// 周期性调用的写回检查（定时中断或主循环）
    ///
    /// 满足以下任一条件时写回脏扇区：
    /// - 调用过 [`request_sync`](Self::request_sync)
    /// - `FlushPolicy::Deferred` 下距最后一次写入已超过 `idle_ms`
    ///
    /// # 返回
    ///
    /// 是否执行了写回
    pub fn poll(&mut self) -> Result<bool> {
        if !self.cache.is_dirty() {
            return Ok(false);
        }
        self.ensure_alive()?;

        let due = self.cache.flush_requested()
            || match self.config.flush_policy {
                FlushPolicy::OnDemand => false,
                FlushPolicy::Deferred { idle_ms } => {
                    self.tick.now_ms().wrapping_sub(self.cache.last_write_ms()) >= idle_ms
                }
            };
        if !due {
            return Ok(false);
        }

        log::debug!("[DISK] deferred flush");
        let result = self.cache.flush(&mut self.flash, &self.tick);
        self.guard(result)
    }

    /// 逻辑块大小
    pub fn block_size(&self) -> u32 {
        self.translator.block_size()
    }

    /// 总块数（包括块 0 和分区前的保留块）
    pub fn block_count(&self) -> u32 {
        self.translator.block_count()
    }

    /// 分区起始块
    pub fn partition_start(&self) -> u32 {
        self.translator.partition_start()
    }

    /// 分区块数
    pub fn partition_blocks(&self) -> u32 {
        self.translator.partition_blocks()
    }

    /// 地址转换器
    pub fn translator(&self) -> &AddressTranslator {
        &self.translator
    }

    /// 配置
    pub fn config(&self) -> &DiskConfig {
        &self.config
    }

    /// 缓存槽状态
    pub fn cache_state(&self) -> SlotState {
        self.cache.state()
    }

    /// 缓存统计信息
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// 逻辑读取次数
    pub fn read_count(&self) -> u64 {
        self.read_count
    }

    /// 逻辑写入次数
    pub fn write_count(&self) -> u64 {
        self.write_count
    }

    /// 是否处于失效状态
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// 是否已初始化
    pub fn is_initialised(&self) -> bool {
        self.initialised
    }

    /// 获取闪存原语的引用
    pub fn flash(&self) -> &F {
        &self.flash
    }

    /// 获取闪存原语的可变引用
    ///
    /// 绕过缓存直接修改闪存会破坏缓存一致性，仅用于诊断和测试。
    pub fn flash_mut(&mut self) -> &mut F {
        &mut self.flash
    }

    /// 获取计时源的引用
    pub fn tick(&self) -> &T {
        &self.tick
    }

    /// 丢弃缓存并取回闪存原语（不写回！）
    ///
    /// 相当于掉电：缓冲区中尚未写回的数据丢失。
    pub fn into_flash(self) -> F {
        if self.cache.is_dirty() {
            log::warn!("[DISK] released with unflushed data");
        }
        self.flash
    }

    // 内部辅助方法

    pub(super) fn inc_read_count(&mut self) {
        self.read_count += 1;
    }

    pub(super) fn inc_write_count(&mut self) {
        self.write_count += 1;
    }

    pub(super) fn ensure_alive(&self) -> Result<()> {
        if self.failed {
            Err(Error::new(ErrorKind::DeviceFailed, "device failed, call init to recover"))
        } else {
            Ok(())
        }
    }

    /// 致命错误时进入失效状态
    pub(super) fn guard<R>(&mut self, result: Result<R>) -> Result<R> {
        if let Err(e) = &result {
            if e.is_fatal() && !self.failed {
                log::error!("[DISK] device failed: {}", e);
                self.failed = true;
            }
        }
        result
    }
}

impl<F: FlashPrimitives, T: TickSource> BlockDevice for FlashDisk<F, T> {
    fn block_size(&self) -> u32 {
        FlashDisk::block_size(self)
    }

    fn block_count(&self) -> u32 {
        FlashDisk::block_count(self)
    }

    fn read_blocks(&mut self, start: u32, buf: &mut [u8]) -> Result<usize> {
        FlashDisk::read_blocks(self, start, buf)
    }

    fn write_blocks(&mut self, start: u32, buf: &[u8]) -> Result<usize> {
        FlashDisk::write_blocks(self, start, buf)
    }

    fn flush(&mut self) -> Result<()> {
        FlashDisk::flush(self)
    }
}

impl<F, T> core::fmt::Debug for FlashDisk<F, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FlashDisk")
            .field("translator", &self.translator)
            .field("cache", &self.cache)
            .field("config", &self.config)
            .field("initialised", &self.initialised)
            .field("failed", &self.failed)
            .finish()
    }
}

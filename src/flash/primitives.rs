//! 闪存原语接口与计时源

use super::IapStatus;
use crate::translate::Sector;
use core::cell::Cell;

/// 闪存原语接口
///
/// 实现此 trait 以接入具体芯片的 IAP 命令。所有方法都是同步的，
/// 在闪存控制器完成命令后才返回。
///
/// 擦除和编程前通常需要先 [`prepare_for_write`](Self::prepare_for_write)
/// 解除扇区保护，准备状态在一次擦除或编程后失效。
///
/// # 示例
///
/// ```rust,ignore
/// struct Lpc43Iap;
///
/// impl FlashPrimitives for Lpc43Iap {
///     fn prepare_for_write(&mut self, sector: Sector) -> IapStatus {
///         let id = sector.index();
///         IapStatus::from_code(chip_iap_prepare(id, id))
///     }
///     // ...
/// }
/// ```
pub trait FlashPrimitives {
    /// 初始化闪存控制器
    ///
    /// 默认实现什么都不做。
    fn init(&mut self) -> IapStatus {
        IapStatus::Success
    }

    /// 解除扇区写保护
    fn prepare_for_write(&mut self, sector: Sector) -> IapStatus;

    /// 擦除一个扇区（擦除后全部为 0xFF）
    fn erase(&mut self, sector: Sector) -> IapStatus;

    /// 检查 `[addr, addr + len)` 是否全部为擦除状态
    fn blank_check(&mut self, addr: u32, len: u32) -> IapStatus;

    /// 将 `src` 编程到 `addr`
    fn program(&mut self, addr: u32, src: &[u8]) -> IapStatus;

    /// 比较闪存 `addr` 处内容与 `buf`
    fn compare(&mut self, addr: u32, buf: &[u8]) -> IapStatus;

    /// 直接读取闪存（内存映射）
    fn read(&mut self, addr: u32, buf: &mut [u8]) -> IapStatus;
}

/// 单调毫秒计时源
///
/// 计数允许回绕，使用方总是以 `wrapping_sub` 计算间隔。
pub trait TickSource {
    /// 当前毫秒数
    fn now_ms(&self) -> u32;
}

/// 不提供时间的计时源
///
/// 适用于只使用 `FlushPolicy::OnDemand` 的设备。
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTick;

impl TickSource for NoTick {
    #[inline]
    fn now_ms(&self) -> u32 {
        0
    }
}

/// 手动推进的计时源
///
/// `step` 非零时，每次读取后自动前进 `step` 毫秒，用于模拟在忙等待中流逝的时间。
#[derive(Debug, Default)]
pub struct ManualTick {
    now: Cell<u32>,
    step: u32,
}

impl ManualTick {
    /// 从 0 开始、不自动推进的计时源
    pub const fn new() -> Self {
        Self {
            now: Cell::new(0),
            step: 0,
        }
    }

    /// 每次读取后自动前进 `step` 毫秒
    pub const fn with_step(step: u32) -> Self {
        Self {
            now: Cell::new(0),
            step,
        }
    }

    /// 前进 `ms` 毫秒
    pub fn advance(&self, ms: u32) {
        self.now.set(self.now.get().wrapping_add(ms));
    }

    /// 设置当前时间
    pub fn set(&self, ms: u32) {
        self.now.set(ms);
    }
}

impl TickSource for ManualTick {
    fn now_ms(&self) -> u32 {
        let now = self.now.get();
        self.now.set(now.wrapping_add(self.step));
        now
    }
}

impl<T: TickSource> TickSource for &T {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_tick() {
        assert_eq!(NoTick.now_ms(), 0);
    }

    #[test]
    fn test_manual_tick() {
        let tick = ManualTick::new();
        assert_eq!(tick.now_ms(), 0);
        tick.advance(1500);
        assert_eq!(tick.now_ms(), 1500);
        tick.set(u32::MAX);
        tick.advance(2);
        assert_eq!(tick.now_ms(), 1);
    }

    #[test]
    fn test_manual_tick_step() {
        let tick = ManualTick::with_step(10);
        assert_eq!(tick.now_ms(), 0);
        assert_eq!(tick.now_ms(), 10);
        assert_eq!((&tick).now_ms(), 20);
    }
}

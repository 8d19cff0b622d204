//! 扇区缓存槽的状态标志
//!
//! 对应原存储驱动的 `FLASH_FLAG_*` 常量

use bitflags::bitflags;

bitflags! {
    /// 缓存槽标志
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CacheFlags: u8 {
        /// 缓冲区与闪存不一致（脏）
        const DIRTY  = 0x01;
        /// 要求下一次 poll 立即写回
        const FORCE  = 0x02;
        /// 物理扇区已擦除，缓冲区尚未编程回去
        const ERASED = 0x04;
    }
}

/// 缓存槽状态
///
/// ```text
/// Empty → Clean → Dirty → (ErasedPendingProgram) → Empty
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// 没有驻留扇区
    Empty,
    /// 缓冲区与闪存一致
    Clean,
    /// 缓冲区比闪存新
    Dirty,
    /// 刷新中途：扇区已擦除但尚未编程
    ///
    /// 只有在编程或校验失败时才会停留在此状态，此时闪存上的扇区为空白，
    /// 缓冲区是唯一的数据副本。
    ErasedPendingProgram,
}

impl SlotState {
    /// 由驻留情况和标志推导状态
    pub fn from_flags(resident: bool, flags: CacheFlags) -> Self {
        if !resident {
            SlotState::Empty
        } else if flags.contains(CacheFlags::ERASED) {
            SlotState::ErasedPendingProgram
        } else if flags.contains(CacheFlags::DIRTY) {
            SlotState::Dirty
        } else {
            SlotState::Clean
        }
    }

    /// 缓冲区是否领先于闪存
    pub fn is_dirty(self) -> bool {
        matches!(self, SlotState::Dirty | SlotState::ErasedPendingProgram)
    }
}

//! 扇区缓存模块
//!
//! 在 RAM 中保存至多一个擦除单元，把多次块写入合并为一次擦除 + 编程 + 校验。
//!
//! # 主要组件
//!
//! - [`SectorCache`] - 单槽写回缓存
//! - [`SlotState`] - 槽状态（Empty / Clean / Dirty / ErasedPendingProgram）
//! - [`CacheFlags`] - 槽标志
//! - [`CacheStats`] - 缓存统计信息
//!
//! # 状态转换
//!
//! | 事件                        | 转换                                       |
//! |-----------------------------|--------------------------------------------|
//! | 写入（槽为空）              | Empty → 载入扇区 → Dirty                    |
//! | 写入（其他扇区且脏）        | 先写回 → Empty → 载入新扇区 → Dirty          |
//! | flush（脏）                 | Dirty → ErasedPendingProgram → Empty        |
//! | flush 失败                  | 停留在 Dirty 或 ErasedPendingProgram        |
//! | flush 成功且保留缓存         | Dirty → Clean                              |
//!
//! 读取从不触发写回。

mod slot;
mod sector_cache;
mod writeback;

pub use slot::{CacheFlags, SlotState};
pub use sector_cache::{CacheStats, SectorCache};

//! 闪存原语适配层
//!
//! 块设备本身不直接操作闪存控制器，而是通过 [`FlashPrimitives`] 调用
//! 芯片提供的 IAP（In-Application Programming）命令。
//!
//! - [`IapStatus`] - IAP 命令的结果码
//! - [`FlashPrimitives`] - 擦除 / 编程 / 查空 / 比较 / 读取
//! - [`TickSource`] - 毫秒计时，仅用于延迟刷新和忙等待超时
//! - [`RamFlash`] - 基于内存的闪存模拟器，用于主机端测试和工具

mod status;
mod primitives;
mod ram;

pub use status::IapStatus;
pub use primitives::{FlashPrimitives, ManualTick, NoTick, TickSource};
pub use ram::{FlashCounters, FlashOp, RamFlash};

//! flashdisk_core: 把片上 NOR 闪存暴露为 FAT 可用的块设备
//!
//! 这是一个纯 Rust 实现的闪存块设备库，提供：
//! - **合成 MBR**：块 0 按区域配置生成，分区从 `partition_start` 开始
//! - **地址转换**：逻辑块号映射到一个或多个（可不连续的）闪存区域
//! - **单扇区写回缓存**：多次块写入合并为一次擦除 + 编程 + 校验
//! - **失效保护**：写回失败时保留缓冲区，`init` 后重试
//!
//! # 示例
//!
//! ```rust,ignore
//! use flashdisk_core::{DiskConfig, FlashDisk, FlashPrimitives, FlashRegion, Result};
//!
//! // 实现 FlashPrimitives trait
//! struct MyIap {
//!     // ...
//! }
//!
//! impl FlashPrimitives for MyIap {
//!     // 实现 IAP 命令
//!     // ...
//! }
//!
//! fn main() -> Result<()> {
//!     let regions = [FlashRegion::new(0x7_0000, 64 * 1024, 32 * 1024)];
//!     let mut disk = FlashDisk::new(MyIap::new(), &regions, DiskConfig::default())?;
//!     disk.init()?;
//!
//!     // 写入并同步
//!     disk.write_block(1, &[0u8; 512])?;
//!     disk.flush()?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # 模块结构
//!
//! - [`error`] - 错误类型定义
//! - [`block`] - 块设备接口和 FlashDisk
//! - [`consts`] - 常量定义
//! - [`types`] - 配置和区域定义
//! - [`flash`] - 闪存原语接口和 RAM 模拟器
//! - [`translate`] - 地址转换
//! - [`mbr`] - MBR 生成与解析
//! - [`cache`] - 扇区写回缓存

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

// ===== 核心模块 =====

/// 错误处理
pub mod error;

/// 块设备抽象
pub mod block;

/// 常量定义
pub mod consts;

/// 数据结构定义
pub mod types;

/// 闪存原语
pub mod flash;

/// 地址转换
pub mod translate;

/// MBR 分区表
pub mod mbr;

/// 扇区缓存
pub mod cache;

// ===== 公共导出 =====

// 错误处理
pub use error::{Error, ErrorKind, Result};

// 块设备
pub use block::{BlockDevice, FlashDisk, IoctlCmd};

// 配置
pub use types::{DiskConfig, FlashRegion, FlushPolicy};

// 闪存
pub use flash::{FlashCounters, FlashOp, FlashPrimitives, IapStatus, ManualTick, NoTick, RamFlash, TickSource};

// 地址转换
pub use translate::{AddressTranslator, Sector};

// MBR
pub use mbr::{fill_mbr, Mbr, PartitionEntry};

// Cache
pub use cache::{CacheFlags, CacheStats, SectorCache, SlotState};

//! 闪存块设备常量定义
//!
//! 这个模块包含了：
//! - 块大小相关常量
//! - MBR 布局常量
//! - 刷新策略默认值

//=============================================================================
// 基础常量
//=============================================================================

/// 默认逻辑块大小（512 字节，FAT 文件系统的期望值）
pub const DEFAULT_BLOCK_SIZE: u32 = 512;

/// 最小块大小（必须能容纳一个 MBR）
pub const MIN_BLOCK_SIZE: u32 = 512;

/// 单个擦除单元的最大尺寸（扇区缓存的上限）
pub const MAX_ERASE_UNIT: u32 = 256 * 1024;

/// 擦除后闪存的字节值
pub const ERASED_BYTE: u8 = 0xFF;

/// 32 位物理地址空间的结束地址（不含）
pub const ADDRESS_SPACE_END: u64 = 1 << 32;

/// 默认分区起始块
pub const DEFAULT_PARTITION_START: u32 = 1;

//=============================================================================
// MBR 布局
//=============================================================================

/// MBR 大小（字节）
pub const MBR_SIZE: usize = 512;

/// 引导代码区长度
pub const MBR_BOOTSTRAP_SIZE: usize = 446;

/// 分区表项大小
pub const MBR_PARTITION_ENTRY_SIZE: usize = 16;

/// 分区表项数量
pub const MBR_PARTITION_COUNT: usize = 4;

/// 各分区表项偏移
pub const MBR_PARTITION_OFFSETS: [usize; MBR_PARTITION_COUNT] = [446, 462, 478, 494];

/// 签名偏移
pub const MBR_SIGNATURE_OFFSET: usize = 510;

/// MBR 签名 (0x55, 0xAA)
pub const MBR_SIGNATURE: [u8; 2] = [0x55, 0xAA];

/// FAT12 分区类型
pub const PARTITION_TYPE_FAT12: u8 = 0x01;

/// 非引导分区
pub const PARTITION_NOT_BOOTABLE: u8 = 0x00;

//=============================================================================
// 刷新策略
//=============================================================================

/// 擦除失败后的最大重试次数
pub const DEFAULT_ERASE_RETRIES: u32 = 3;

/// 等待闪存控制器空闲的默认超时（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u32 = 1000;

/// 延迟刷新的默认静默时间（毫秒）
pub const DEFAULT_FLUSH_IDLE_MS: u32 = 5000;

/// 忙等待的最大轮询次数
///
/// 关中断期间计时源可能停止计数，超时只靠时间判断会永远等待。
pub const BUSY_POLL_LIMIT: u32 = 100_000;

//! 块设备抽象
//!
//! 提供块设备接口和闪存块设备实现。
//! block/device.rs 定义 BlockDevice trait 和 FlashDisk，负责初始化、刷新和失效状态管理
//!
//! block/io.rs 提供单块和多块读写，块 0 返回生成的 MBR，其余块经地址转换后读写扇区缓存
//!
//! block/ioctl.rs 提供数字命令码形式的控制接口

mod device;
mod io;
mod ioctl;

pub use device::{BlockDevice, FlashDisk};
pub use ioctl::IoctlCmd;

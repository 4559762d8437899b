//! 块存储抽象
//!
//! block/device.rs 定义 xattr 使用的块存储接口：块分配、extent 记录、
//! 批量读取（先 submit 再 wait）、写入和按逻辑块截断释放。
//!
//! block/mem.rs 提供内存实现，用于测试和开发，支持注入读错误和容量限制。

mod device;
mod mem;

pub use device::BlockStore;
pub use mem::{IoEvent, MemBlockStore};

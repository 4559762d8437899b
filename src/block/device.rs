//! 块存储接口
//!
//! xattr 只通过这个 trait 使用物理块分配器和块 I/O，不关心空间管理器的
//! 内部实现。

use crate::error::Result;
use crate::types::Extent;

/// 块存储接口
///
/// 实现此 trait 以提供块分配、extent 记录和块级 I/O。
///
/// 读操作分两步：先对所有块调用 `submit_read` 发起读取，再逐个调用
/// `read_block` 等待完成并取回数据。同步设备可以保留 `submit_read` 的默认
/// 实现。
///
/// # 示例
///
/// ```rust,ignore
/// use apfs_xattr::{BlockStore, Result, types::Extent};
///
/// struct MyStore {
///     // ...
/// }
///
/// impl BlockStore for MyStore {
///     fn block_size(&self) -> u32 {
///         4096
///     }
///
///     fn allocate_block(&mut self, stream_id: u64, logical: u64) -> Result<u64> {
///         // 从空间管理器分配一个物理块
///         # unimplemented!()
///     }
///
///     // ...
/// }
/// ```
pub trait BlockStore {
    /// 块大小（字节）
    fn block_size(&self) -> u32;

    /// 为 dstream 的某个逻辑块分配物理块
    ///
    /// # 参数
    ///
    /// * `stream_id` - dstream 对象 ID
    /// * `logical` - 逻辑块号（分配提示）
    ///
    /// # 返回
    ///
    /// 成功返回物理块号（非 0），空间不足返回 `NoSpace`
    fn allocate_block(&mut self, stream_id: u64, logical: u64) -> Result<u64>;

    /// 查找包含某个逻辑块的 extent
    ///
    /// 没有记录时返回 `Ok(None)`
    fn lookup_extent(&self, stream_id: u64, logical: u64) -> Result<Option<Extent>>;

    /// 持久化一个 extent 记录
    fn record_extent(&mut self, stream_id: u64, extent: &Extent) -> Result<()>;

    /// 发起块读取（不等待完成）
    fn submit_read(&self, _paddr: u64) -> Result<()> {
        Ok(())
    }

    /// 等待块读取完成并复制数据
    ///
    /// # 参数
    ///
    /// * `paddr` - 物理块号
    /// * `buf` - 目标缓冲区（大小为一个块）
    fn read_block(&self, paddr: u64, buf: &mut [u8]) -> Result<()>;

    /// 写入一个块
    fn write_block(&mut self, paddr: u64, data: &[u8]) -> Result<()>;

    /// 释放 dstream 从某个逻辑块开始的所有块
    ///
    /// # 返回
    ///
    /// 被释放的物理块数
    fn free_blocks_from(&mut self, stream_id: u64, from_logical: u64) -> Result<u64>;

    /// 按物理块号释放单个块
    ///
    /// 不查 extent 记录，用于回收 extent 尚未持久化的块
    fn free_block(&mut self, paddr: u64) -> Result<()>;

    /// 删除 dstream 的所有 extent 记录，不释放块
    fn forget_extents(&mut self, stream_id: u64) -> Result<()>;
}

//! dstream 截断
//!
//! 对应 `apfs_truncate()`

use super::DstreamInfo;
use crate::{block::BlockStore, error::Result};

/// 把 dstream 截断到 `new_size`
///
/// 释放 `new_size` 之后的所有块；`new_size == 0` 时完全回收。
///
/// # 注意
///
/// 引用这个 dstream 的 catalog 记录必须已经删除或替换，
/// 否则会留下指向已释放块的记录。
pub fn truncate<B: BlockStore + ?Sized>(ds: &mut DstreamInfo, blocks: &mut B, new_size: u64) -> Result<()> {
    ds.flush_extent_cache(blocks)?;

    let first_freed = ds.blocks_for(new_size);
    let freed = blocks.free_blocks_from(ds.id(), first_freed)?;

    log::debug!(
        "[DSTREAM] truncate {:#x}: {} -> {} bytes, {} blocks freed",
        ds.id(),
        ds.size(),
        new_size,
        freed
    );

    ds.cache_mut().invalidate_from(first_freed);
    ds.set_size(new_size.min(ds.size()));
    Ok(())
}

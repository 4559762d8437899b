//! dstream extent 缓存
//!
//! 两部分组成：
//! - `clean` - 已持久化的 extent，用 `lru::LruCache` 管理，按起始逻辑块索引
//! - `pending` - 正在增长、尚未写回块存储的 extent（脏）
//!
//! 新分配的块如果与 pending 物理连续就直接延长；不连续时旧的 pending 需要
//! 先写回，再以新块开始一个 pending。

use core::num::NonZeroUsize;

use alloc::vec::Vec;
use lru::LruCache;

use crate::types::Extent;

/// extent 缓存
pub struct ExtentCache {
    /// 干净的 extent
    clean: LruCache<u64, Extent>,
    /// 脏 extent
    pending: Option<Extent>,
}

impl core::fmt::Debug for ExtentCache {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ExtentCache")
            .field("clean", &self.clean.len())
            .field("pending", &self.pending)
            .finish()
    }
}

impl ExtentCache {
    /// 创建缓存
    ///
    /// # 参数
    ///
    /// * `capacity` - 干净 extent 的最大数量（0 按 1 处理）
    pub fn new(capacity: usize) -> Self {
        Self {
            clean: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
            pending: None,
        }
    }

    /// 是否有未写回的 extent
    pub fn is_dirty(&self) -> bool {
        self.pending.is_some()
    }

    /// 查找包含逻辑块的 extent
    ///
    /// 命中干净 extent 时会更新其 LRU 位置
    pub fn lookup(&mut self, logical: u64) -> Option<Extent> {
        if let Some(ext) = self.pending.filter(|ext| ext.contains(logical)) {
            return Some(ext);
        }

        let key = self
            .clean
            .iter()
            .find(|(_, ext)| ext.contains(logical))
            .map(|(key, _)| *key)?;
        self.clean.get(&key).copied()
    }

    /// 缓存一个干净的 extent
    pub fn insert_clean(&mut self, ext: Extent) {
        if ext.len > 0 {
            self.clean.put(ext.logical_block, ext);
        }
    }

    /// 记录一个新分配的块
    ///
    /// # 返回
    ///
    /// 如果新块无法延长 pending，返回需要先写回的旧 pending
    pub fn push_block(&mut self, logical: u64, paddr: u64) -> Option<Extent> {
        if let Some(ext) = self.pending.as_mut() {
            if ext.logical_end() == logical && ext.phys_block + ext.len == paddr {
                ext.len += 1;
                return None;
            }
        }
        self.pending.replace(Extent::new(logical, paddr, 1))
    }

    /// 取出 pending extent（写回之前调用）
    pub fn take_pending(&mut self) -> Option<Extent> {
        self.pending.take()
    }

    /// 放回写回失败的 pending extent
    pub fn restore_pending(&mut self, ext: Extent) {
        self.pending = Some(ext);
    }

    /// 丢弃从某个逻辑块开始的所有缓存映射
    pub fn invalidate_from(&mut self, logical: u64) {
        if let Some(ext) = self.pending {
            if ext.logical_block >= logical {
                self.pending = None;
            } else if ext.logical_end() > logical {
                self.pending = Some(Extent::new(ext.logical_block, ext.phys_block, logical - ext.logical_block));
            }
        }

        let affected: Vec<Extent> = self
            .clean
            .iter()
            .map(|(_, ext)| *ext)
            .filter(|ext| ext.logical_end() > logical)
            .collect();
        for ext in affected {
            self.clean.pop(&ext.logical_block);
            if ext.logical_block < logical {
                self.clean.put(
                    ext.logical_block,
                    Extent::new(ext.logical_block, ext.phys_block, logical - ext.logical_block),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_contiguous_blocks() {
        let mut cache = ExtentCache::new(4);
        assert!(cache.push_block(0, 10).is_none());
        assert!(cache.push_block(1, 11).is_none());
        assert!(cache.push_block(2, 12).is_none());
        assert!(cache.is_dirty());
        assert_eq!(cache.lookup(2), Some(Extent::new(0, 10, 3)));
    }

    #[test]
    fn test_push_non_contiguous_returns_old() {
        let mut cache = ExtentCache::new(4);
        cache.push_block(0, 10);
        cache.push_block(1, 11);
        let old = cache.push_block(2, 50);
        assert_eq!(old, Some(Extent::new(0, 10, 2)));
        assert_eq!(cache.take_pending(), Some(Extent::new(2, 50, 1)));
        assert!(!cache.is_dirty());
    }

    #[test]
    fn test_clean_lookup_and_eviction() {
        let mut cache = ExtentCache::new(2);
        cache.insert_clean(Extent::new(0, 100, 2));
        cache.insert_clean(Extent::new(2, 200, 2));
        assert_eq!(cache.lookup(1), Some(Extent::new(0, 100, 2)));

        // 容量为 2，最久未使用的 [2, 4) 被驱逐
        cache.insert_clean(Extent::new(4, 300, 2));
        assert_eq!(cache.lookup(3), None);
        assert_eq!(cache.lookup(0), Some(Extent::new(0, 100, 2)));
        assert_eq!(cache.lookup(5), Some(Extent::new(4, 300, 2)));
    }

    #[test]
    fn test_invalidate_from_trims() {
        let mut cache = ExtentCache::new(4);
        cache.insert_clean(Extent::new(0, 100, 4));
        cache.insert_clean(Extent::new(4, 200, 4));
        cache.push_block(8, 300);

        cache.invalidate_from(2);
        assert_eq!(cache.lookup(1), Some(Extent::new(0, 100, 2)));
        assert_eq!(cache.lookup(2), None);
        assert_eq!(cache.lookup(5), None);
        assert!(!cache.is_dirty());
    }

    #[test]
    fn test_zero_capacity() {
        let mut cache = ExtentCache::new(0);
        cache.insert_clean(Extent::new(0, 1, 1));
        assert_eq!(cache.lookup(0), Some(Extent::new(0, 1, 1)));
    }
}

//! 卷级配置类型

use crate::consts::*;

/// xattr 配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XattrConfig {
    /// 内联阈值：值长度不超过此值时内联存储
    pub max_embedded_size: usize,
    /// 单个属性值的最大长度
    pub max_value_size: u64,
    /// 每个 dstream 的 extent 缓存容量
    pub extent_cache_size: usize,
}

impl Default for XattrConfig {
    fn default() -> Self {
        Self {
            max_embedded_size: APFS_XATTR_MAX_EMBEDDED_SIZE,
            max_value_size: APFS_XATTR_MAX_VALUE_SIZE,
            extent_cache_size: DEFAULT_EXTENT_CACHE_SIZE,
        }
    }
}

impl XattrConfig {
    /// 值是否需要独立 dstream
    pub fn needs_dstream(&self, len: usize) -> bool {
        len > self.max_embedded_size
    }
}

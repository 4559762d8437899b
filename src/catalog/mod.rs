//! Catalog（有序 key/value 索引）接口
//!
//! xattr 记录和其他 catalog 记录共享同一棵有序树。这里只定义 xattr 用到的
//! 查询和修改操作，树结构、平衡和节点格式都由实现者负责。
//!
//! ## 查询方式
//!
//! - `query_exact` - 按完整 key 精确查找
//! - `query_prefix` - 按 (obj_id, 记录类型) 前缀扫描，按 key 顺序返回所有匹配
//!
//! 任何修改操作都可能重组索引，修改之后必须重新查询，不能继续使用旧游标。

mod mem;

pub use mem::{MemCatalog, PrefixCursor};

use alloc::vec::Vec;

use crate::error::Result;

/// 查询得到的一条记录（原始字节副本）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRecord {
    /// 原始 key
    pub key: Vec<u8>,
    /// 原始 value
    pub val: Vec<u8>,
}

/// 有序索引接口
pub trait CatalogIndex {
    /// 前缀扫描游标
    type Cursor<'a>: Iterator<Item = Result<CatalogRecord>>
    where
        Self: 'a;

    /// 精确查找
    ///
    /// 不存在时返回 `Ok(None)`
    fn query_exact(&self, key: &[u8]) -> Result<Option<CatalogRecord>>;

    /// 前缀扫描：返回 obj_id 下某一类型的所有记录
    fn query_prefix(&self, obj_id: u64, obj_type: u8) -> Result<Self::Cursor<'_>>;

    /// 插入新记录（key 已存在返回 `AlreadyExists`）
    fn insert(&mut self, key: &[u8], val: &[u8]) -> Result<()>;

    /// 替换已有记录（key 不存在返回 `NotFound`）
    fn replace(&mut self, key: &[u8], val: &[u8]) -> Result<()>;

    /// 删除查询得到的记录
    fn remove(&mut self, record: &CatalogRecord) -> Result<()>;
}

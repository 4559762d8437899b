//! 内存 catalog
//!
//! 用 `BTreeMap` 实现的有序索引，排序规则为 (obj_id, 类型, 名称字节)。
//! 值按原样保存，测试可以直接插入损坏的记录。

use alloc::collections::btree_map::{self, BTreeMap};
use alloc::vec::Vec;

use byteorder::{ByteOrder, LittleEndian};

use super::{CatalogIndex, CatalogRecord};
use crate::{
    consts::*,
    error::{Error, ErrorKind, Result},
};

/// 排序 key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct SortKey {
    obj_id: u64,
    obj_type: u8,
    name: Vec<u8>,
}

impl SortKey {
    /// 从原始 key 解析排序 key
    ///
    /// 只要求 8 字节头部存在。名称按 C 字符串参与比较（截到第一个 NUL），
    /// 不看 name_len 字段
    fn parse(raw: &[u8]) -> Result<Self> {
        if raw.len() < 8 {
            return Err(Error::new(ErrorKind::InvalidInput, "catalog key too short"));
        }
        let hdr = LittleEndian::read_u64(&raw[..8]);
        let name = raw.get(XATTR_KEY_HDR_SIZE..).unwrap_or(&[]);
        let end = name.iter().position(|&b| b == 0).unwrap_or(name.len());
        Ok(Self {
            obj_id: hdr & OBJ_ID_MASK,
            obj_type: ((hdr & OBJ_TYPE_MASK) >> OBJ_TYPE_SHIFT) as u8,
            name: name[..end].to_vec(),
        })
    }

    fn bound(obj_id: u64, obj_type: u8) -> Self {
        Self { obj_id, obj_type, name: Vec::new() }
    }
}

/// 内存 catalog
#[derive(Debug, Clone, Default)]
pub struct MemCatalog {
    records: BTreeMap<SortKey, CatalogRecord>,
}

impl MemCatalog {
    /// 创建空 catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录总数
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// 前缀扫描游标
pub struct PrefixCursor<'a> {
    inner: btree_map::Range<'a, SortKey, CatalogRecord>,
}

impl<'a> Iterator for PrefixCursor<'a> {
    type Item = Result<CatalogRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, rec)| Ok(rec.clone()))
    }
}

impl CatalogIndex for MemCatalog {
    type Cursor<'a> = PrefixCursor<'a>;

    fn query_exact(&self, key: &[u8]) -> Result<Option<CatalogRecord>> {
        let sort_key = SortKey::parse(key)?;
        Ok(self.records.get(&sort_key).cloned())
    }

    fn query_prefix(&self, obj_id: u64, obj_type: u8) -> Result<Self::Cursor<'_>> {
        let start = SortKey::bound(obj_id, obj_type);
        let inner = match obj_type.checked_add(1) {
            Some(next) => self.records.range(start..SortKey::bound(obj_id, next)),
            None => self.records.range(start..),
        };
        Ok(PrefixCursor { inner })
    }

    fn insert(&mut self, key: &[u8], val: &[u8]) -> Result<()> {
        let sort_key = SortKey::parse(key)?;
        if self.records.contains_key(&sort_key) {
            return Err(Error::new(ErrorKind::AlreadyExists, "catalog record exists"));
        }
        self.records.insert(
            sort_key,
            CatalogRecord { key: key.to_vec(), val: val.to_vec() },
        );
        Ok(())
    }

    fn replace(&mut self, key: &[u8], val: &[u8]) -> Result<()> {
        let sort_key = SortKey::parse(key)?;
        let rec = self
            .records
            .get_mut(&sort_key)
            .ok_or(Error::new(ErrorKind::NotFound, "catalog record not found"))?;
        rec.key = key.to_vec();
        rec.val = val.to_vec();
        Ok(())
    }

    fn remove(&mut self, record: &CatalogRecord) -> Result<()> {
        let sort_key = SortKey::parse(&record.key)?;
        self.records
            .remove(&sort_key)
            .map(|_| ())
            .ok_or(Error::new(ErrorKind::NotFound, "catalog record not found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn key(obj_id: u64, obj_type: u8, name: &[u8]) -> Vec<u8> {
        let mut raw = vec![0u8; XATTR_KEY_HDR_SIZE];
        LittleEndian::write_u64(&mut raw[..8], obj_id | (u64::from(obj_type) << OBJ_TYPE_SHIFT));
        LittleEndian::write_u16(&mut raw[8..10], name.len() as u16);
        raw.extend_from_slice(name);
        raw
    }

    #[test]
    fn test_insert_and_exact_query() {
        let mut cat = MemCatalog::new();
        cat.insert(&key(1, 4, b"a\0"), b"v1").unwrap();

        let rec = cat.query_exact(&key(1, 4, b"a\0")).unwrap().unwrap();
        assert_eq!(rec.val, b"v1");
        assert!(cat.query_exact(&key(1, 4, b"b\0")).unwrap().is_none());

        let err = cat.insert(&key(1, 4, b"a\0"), b"v2").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }

    #[test]
    fn test_replace_and_remove() {
        let mut cat = MemCatalog::new();
        let k = key(9, 4, b"x\0");
        assert_eq!(cat.replace(&k, b"v").unwrap_err().kind(), ErrorKind::NotFound);

        cat.insert(&k, b"old").unwrap();
        cat.replace(&k, b"new").unwrap();
        let rec = cat.query_exact(&k).unwrap().unwrap();
        assert_eq!(rec.val, b"new");

        cat.remove(&rec).unwrap();
        assert!(cat.is_empty());
        assert_eq!(cat.remove(&rec).unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_prefix_scan_order_and_bounds() {
        let mut cat = MemCatalog::new();
        cat.insert(&key(5, 4, b"b\0"), b"2").unwrap();
        cat.insert(&key(5, 4, b"a\0"), b"1").unwrap();
        cat.insert(&key(5, 3, b"inode"), b"-").unwrap();
        cat.insert(&key(5, 5, b"other"), b"-").unwrap();
        cat.insert(&key(6, 4, b"a\0"), b"-").unwrap();

        let vals: Vec<Vec<u8>> = cat
            .query_prefix(5, 4)
            .unwrap()
            .map(|rec| rec.unwrap().val)
            .collect();
        assert_eq!(vals, vec![b"1".to_vec(), b"2".to_vec()]);
        assert_eq!(cat.query_prefix(7, 4).unwrap().count(), 0);
    }

    #[test]
    fn test_name_compared_up_to_nul() {
        let mut cat = MemCatalog::new();
        cat.insert(&key(2, 4, b"ab"), b"raw").unwrap();

        // 缺少 NUL 的记录也能按正常 key 找到，由解码层判定损坏
        let rec = cat.query_exact(&key(2, 4, b"ab\0")).unwrap().unwrap();
        assert_eq!(rec.key, key(2, 4, b"ab"));
        assert!(cat.query_exact(&key(2, 4, b"abc\0")).unwrap().is_none());
    }

    #[test]
    fn test_short_key_rejected() {
        let cat = MemCatalog::new();
        assert_eq!(
            cat.query_exact(&[1, 2, 3]).unwrap_err().kind(),
            ErrorKind::InvalidInput
        );
    }
}

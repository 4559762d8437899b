//! xattr 列表
//!
//! 对应 `apfs_listxattr()`

use super::codec::decode;
use super::prefix::{get_xattr_name_prefix, list_entry_size};
use super::read::report_corrupted;
use crate::{
    block::BlockStore,
    catalog::CatalogIndex,
    consts::APFS_TYPE_XATTR,
    error::{Error, ErrorKind, Result},
    fs::{ReadAccess, Volume},
    transaction::TransactionManager,
};

/// 列出 inode 的所有扩展属性
///
/// # 参数
///
/// * `vol` - 卷
/// * `access` - 共享或独占访问能力
/// * `owner` - 所属 inode
/// * `buffer` - 输出缓冲区（名称带 "osx." 前缀，以 \0 分隔）；为 None 时只计算长度
///
/// # 返回
///
/// 写入的字节数，或没有缓冲区时需要的字节数
///
/// # 错误
///
/// - `RangeTooSmall` - 缓冲区放不下某个条目（该条目一个字节也不写）
/// - `Corrupted` - 遇到损坏的记录，整个调用失败
///
/// # 示例
///
/// ```ignore
/// let len = list(&vol, &access, ino, None)?;
/// let mut buffer = vec![0u8; len];
/// list(&vol, &access, ino, Some(&mut buffer))?;
/// // buffer 包含: "osx.user.a\0osx.user.b\0"
/// ```
pub fn list<C, B, T, A>(
    vol: &Volume<C, B, T>,
    _access: &A,
    owner: u64,
    mut buffer: Option<&mut [u8]>,
) -> Result<usize>
where
    C: CatalogIndex,
    B: BlockStore,
    T: TransactionManager<C, B>,
    A: ReadAccess,
{
    let (prefix, prefix_len) = get_xattr_name_prefix();
    let mut total = 0;

    for rec in vol.catalog().query_prefix(owner, APFS_TYPE_XATTR)? {
        let rec = rec?;
        let xattr = decode(&rec.key, &rec.val).map_err(|e| report_corrupted(vol, owner, e))?;
        let size = list_entry_size(xattr.name.len());

        if let Some(buf) = buffer.as_deref_mut() {
            let entry = buf
                .get_mut(total..total + size)
                .ok_or(Error::new(ErrorKind::RangeTooSmall, "xattr list buffer too small"))?;
            entry[..prefix_len].copy_from_slice(prefix.as_bytes());
            entry[prefix_len..size - 1].copy_from_slice(xattr.name);
            entry[size - 1] = 0;
        }
        total += size;
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{BigSem, MemVolume, NoLock};
    use crate::transaction::MaxOps;
    use crate::xattr::{set, XattrSetFlags};
    use alloc::vec;

    fn populate(vol: &mut MemVolume) {
        let sem = BigSem::new(NoLock);
        let access = sem.write();
        vol.transaction_start(MaxOps::default()).unwrap();
        set(vol, &access, 3, "user.b", Some(b"2"), XattrSetFlags::empty()).unwrap();
        set(vol, &access, 3, "user.a", Some(&vec![1u8; 5000]), XattrSetFlags::empty()).unwrap();
        set(vol, &access, 4, "user.z", Some(b"x"), XattrSetFlags::empty()).unwrap();
        vol.transaction_commit().unwrap();
    }

    #[test]
    fn test_list_size_and_contents() {
        let mut vol = MemVolume::in_memory(4096, 16);
        populate(&mut vol);
        let sem = BigSem::new(NoLock);
        let access = sem.read();

        let total = list(&vol, &access, 3, None).unwrap();
        assert_eq!(total, 2 * (4 + 6 + 1));

        let mut buf = vec![0u8; total];
        assert_eq!(list(&vol, &access, 3, Some(&mut buf)).unwrap(), total);
        assert_eq!(&buf[..], b"osx.user.a\0osx.user.b\0");

        assert_eq!(list(&vol, &access, 99, None).unwrap(), 0);
    }

    #[test]
    fn test_list_buffer_too_small() {
        let mut vol = MemVolume::in_memory(4096, 16);
        populate(&mut vol);
        let sem = BigSem::new(NoLock);
        let access = sem.read();

        // 第一个条目放得下，第二个不行
        let mut buf = vec![0xffu8; 15];
        let err = list(&vol, &access, 3, Some(&mut buf)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RangeTooSmall);
        assert_eq!(&buf[..11], b"osx.user.a\0");
        assert!(buf[11..].iter().all(|&b| b == 0xff));
    }
}

//! xattr 命名空间前缀处理
//!
//! APFS 磁盘上的属性名没有命名空间。对外暴露时统一加上伪前缀 "osx."，
//! 传入时再去掉。

use crate::consts::*;

/// 从完整属性名中提取磁盘属性名
///
/// # 参数
///
/// * `full_name` - 完整的属性名（如 "osx.com.apple.FinderInfo"）
///
/// # 返回
///
/// 返回去除前缀后的磁盘属性名；前缀不匹配或前缀后为空时返回 None
///
/// # 示例
///
/// ```ignore
/// let result = extract_xattr_name("osx.user.comment");
/// assert_eq!(result, Some("user.comment"));
/// ```
pub fn extract_xattr_name(full_name: &str) -> Option<&str> {
    let name = full_name.strip_prefix(XATTR_MAC_OSX_PREFIX)?;
    if name.is_empty() {
        return None;
    }
    Some(name)
}

/// 列表输出使用的前缀
///
/// 返回 (prefix, prefix_len)
pub fn get_xattr_name_prefix() -> (&'static str, usize) {
    (XATTR_MAC_OSX_PREFIX, XATTR_MAC_OSX_PREFIX_LEN)
}

/// 列表中一个条目占用的字节数：前缀 + 名称 + NUL
pub fn list_entry_size(name_len: usize) -> usize {
    XATTR_MAC_OSX_PREFIX_LEN + name_len + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_osx_xattr() {
        assert_eq!(extract_xattr_name("osx.user.comment"), Some("user.comment"));
        assert_eq!(
            extract_xattr_name("osx.com.apple.fs.symlink"),
            Some(APFS_XATTR_NAME_SYMLINK)
        );
    }

    #[test]
    fn test_extract_empty_name() {
        // "osx." 后面没有名称，应该失败
        assert!(extract_xattr_name("osx.").is_none());
    }

    #[test]
    fn test_extract_invalid_prefix() {
        assert!(extract_xattr_name("user.name").is_none());
        assert!(extract_xattr_name("").is_none());
    }

    #[test]
    fn test_get_prefix() {
        let (prefix, len) = get_xattr_name_prefix();
        assert_eq!(prefix, "osx.");
        assert_eq!(len, 4);
        assert_eq!(list_entry_size(10), 15);
    }
}

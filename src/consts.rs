//! APFS xattr 常量定义
//!
//! 这个模块包含 xattr 记录的所有常量定义，包括：
//! - catalog key 头部布局
//! - xattr value 头部与 dstream 引用大小
//! - 内联阈值与长度上限
//! - 保留属性名与命名空间前缀

//=============================================================================
// 基础常量
//=============================================================================

/// 默认块大小（4096 字节）
pub const APFS_DEFAULT_BLOCK_SIZE: u32 = 4096;

//=============================================================================
// Catalog key 头部
//=============================================================================

/// obj_id_and_type 中对象 ID 的掩码
pub const OBJ_ID_MASK: u64 = 0x0fff_ffff_ffff_ffff;

/// obj_id_and_type 中记录类型的掩码
pub const OBJ_TYPE_MASK: u64 = 0xf000_0000_0000_0000;

/// 记录类型的位移
pub const OBJ_TYPE_SHIFT: u32 = 60;

/// xattr 记录类型
pub const APFS_TYPE_XATTR: u8 = 4;

/// xattr key 头部大小：obj_id_and_type (u64) + name_len (u16)
pub const XATTR_KEY_HDR_SIZE: usize = 10;

//=============================================================================
// xattr value
//=============================================================================

/// xattr value 头部大小：flags (u16) + xdata_len (u16)
pub const XATTR_VAL_HDR_SIZE: usize = 4;

/// 磁盘上 dstream 引用（j_xattr_dstream_t）的大小
///
/// xattr_obj_id + size + alloced_size + default_crypto_id
/// + total_bytes_written + total_bytes_read
pub const XATTR_DSTREAM_SIZE: usize = 48;

/// 可内联存储的最大值长度
pub const APFS_XATTR_MAX_EMBEDDED_SIZE: usize = 3804;

/// 单个属性值允许的最大长度（保证长度可用有符号 32 位表示）
pub const APFS_XATTR_MAX_VALUE_SIZE: u64 = i32::MAX as u64;

/// VFS 层单次 getxattr 允许返回的最大字节数
pub const XATTR_SIZE_MAX: usize = 65536;

/// VFS 层属性名最大长度（不含前缀）
pub const XATTR_NAME_MAX: usize = 255;

//=============================================================================
// 保留名称与命名空间
//=============================================================================

/// 符号链接目标所使用的保留属性名
pub const APFS_XATTR_NAME_SYMLINK: &str = "com.apple.fs.symlink";

/// 磁盘属性没有命名空间，对外统一使用伪前缀 "osx."
pub const XATTR_MAC_OSX_PREFIX: &str = "osx.";

/// "osx." 前缀长度
pub const XATTR_MAC_OSX_PREFIX_LEN: usize = XATTR_MAC_OSX_PREFIX.len();

//=============================================================================
// 事务
//=============================================================================

/// 一次 xattr set 最多涉及的 catalog 操作数
pub const APFS_XATTR_SET_MAXOPS: u32 = 1;

/// 默认 extent 缓存容量（每个 dstream）
pub const DEFAULT_EXTENT_CACHE_SIZE: usize = 8;

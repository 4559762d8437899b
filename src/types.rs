//! xattr 数据结构定义
//!
//! 磁盘记录布局（全部小端）：
//!
//! ```text
//! key:   obj_id_and_type: u64 | name_len: u16 | name: [u8; name_len]  (含结尾 NUL)
//! value: flags: u16 | xdata_len: u16 | xdata
//! xdata (dstream): xattr_obj_id: u64 | size: u64 | alloced_size: u64
//!                  | default_crypto_id: u64 | total_bytes_written: u64 | total_bytes_read: u64
//! ```
//!
//! 解码后的记录用 [`XattrData`] 区分内联值和 dstream，后续逻辑只匹配这个
//! 枚举，不再检查原始标志位。

use bitflags::bitflags;

use crate::consts::APFS_XATTR_NAME_SYMLINK;

bitflags! {
    /// xattr value 标志
    ///
    /// 对应 APFS 的 `XATTR_*` 标志
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct XattrFlags: u16 {
        /// 值存储在独立的 dstream 中
        const DATA_STREAM       = 0x0001;
        /// 值内联在记录中
        const DATA_EMBEDDED     = 0x0002;
        /// 文件系统自身拥有的属性（如符号链接目标）
        const FILE_SYSTEM_OWNED = 0x0004;
        /// 保留
        const RESERVED_8        = 0x0008;
    }
}

impl XattrFlags {
    /// 给定属性名需要额外设置的标志
    ///
    /// 目前只有符号链接目标属性需要 FILE_SYSTEM_OWNED
    pub fn for_name(name: &[u8]) -> Self {
        if name == APFS_XATTR_NAME_SYMLINK.as_bytes() {
            Self::FILE_SYSTEM_OWNED
        } else {
            Self::empty()
        }
    }
}

/// dstream 引用
///
/// 对应磁盘上的 `j_xattr_dstream_t`。统计字段
/// （total_bytes_written/read）对 xattr 无意义，编码时写 0。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DstreamRef {
    /// dstream 对象 ID
    pub obj_id: u64,
    /// 逻辑大小（字节）
    pub size: u64,
    /// 已分配大小（按块对齐）
    pub alloced_size: u64,
    /// 默认加密 ID（未加密卷为 0）
    pub default_crypto_id: u64,
}

/// 解码后的属性值位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XattrData<'a> {
    /// 内联值
    Inline(&'a [u8]),
    /// 独立 dstream
    Stream(DstreamRef),
}

/// 解码并校验过的 xattr 记录
///
/// 名称和内联值借用自 catalog 返回的原始字节
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Xattr<'a> {
    /// 所属 inode
    pub owner: u64,
    /// 属性名（不含结尾 NUL）
    pub name: &'a [u8],
    /// 原始标志
    pub flags: XattrFlags,
    /// 值
    pub data: XattrData<'a>,
}

impl<'a> Xattr<'a> {
    /// 是否使用 dstream 存储
    pub fn has_dstream(&self) -> bool {
        matches!(self.data, XattrData::Stream(_))
    }

    /// 值的逻辑长度
    pub fn value_len(&self) -> u64 {
        match self.data {
            XattrData::Inline(bytes) => bytes.len() as u64,
            XattrData::Stream(dref) => dref.size,
        }
    }

    /// dstream 引用（内联属性返回 None）
    pub fn dstream(&self) -> Option<DstreamRef> {
        match self.data {
            XattrData::Stream(dref) => Some(dref),
            XattrData::Inline(_) => None,
        }
    }
}

/// 物理 extent
///
/// 把一段连续的逻辑块映射到连续的物理块。`phys_block == 0` 表示空洞。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Extent {
    /// 起始逻辑块号
    pub logical_block: u64,
    /// 起始物理块号（0 表示空洞）
    pub phys_block: u64,
    /// 长度（块数）
    pub len: u64,
}

impl Extent {
    /// 创建新 extent
    pub const fn new(logical_block: u64, phys_block: u64, len: u64) -> Self {
        Self { logical_block, phys_block, len }
    }

    /// 结束逻辑块号（不含）
    pub fn logical_end(&self) -> u64 {
        self.logical_block + self.len
    }

    /// 是否包含给定逻辑块
    pub fn contains(&self, logical: u64) -> bool {
        logical >= self.logical_block && logical < self.logical_end()
    }

    /// 是否为空洞
    pub fn is_hole(&self) -> bool {
        self.phys_block == 0
    }

    /// 逻辑块对应的物理块（调用者保证 `contains(logical)`）
    pub fn phys_of(&self, logical: u64) -> u64 {
        if self.is_hole() {
            0
        } else {
            self.phys_block + (logical - self.logical_block)
        }
    }
}

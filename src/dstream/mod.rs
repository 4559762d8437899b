//! Dstream 管理
//!
//! 超过内联阈值的属性值存放在独立的 dstream 中。这个模块负责：
//!
//! - 从 xattr 记录重建 dstream 信息（[`DstreamInfo::from_xattr`]）
//! - 为新值创建 dstream（[`create`]）
//! - 逻辑块到物理块的映射，带 extent 缓存
//! - 截断和回收（[`truncate`]）

mod cache;
mod create;
mod info;
mod truncate;

pub use cache::ExtentCache;
pub use create::create;
pub use info::DstreamInfo;
pub use truncate::truncate;

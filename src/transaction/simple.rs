//! 简化的事务系统实现
//!
//! ⚠️ **重要警告**：此实现不提供崩溃恢复保证！
//!
//! ## 工作原理
//!
//! 1. **开始**: 克隆 catalog、块存储和卷 superblock 作为检查点
//! 2. **记录资源**: 跟踪加入事务的资源（superblock、catalog、块）
//! 3. **提交**: 丢弃检查点
//! 4. **回滚**: 用检查点覆盖当前状态
//!
//! ## 适用场景
//!
//! - ✅ 开发和测试
//! - ✅ 内存卷
//! - ❌ 需要崩溃一致性的磁盘卷

use alloc::vec::Vec;

use super::{MaxOps, Transaction, TransactionManager, TxResource};
use crate::{
    error::{Error, ErrorKind, Result},
    fs::VolumeSuperblock,
};

/// 事务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// 没有事务
    Idle,

    /// 事务活跃，可以进行修改
    Active,

    /// 事务已提交
    Committed,

    /// 事务已回滚
    Aborted,
}

/// 简化的事务系统
///
/// ⚠️ 不提供崩溃一致性保证，仅用于开发和测试
#[derive(Debug)]
pub struct SimpleTransaction<C, B> {
    /// 事务状态
    state: TransactionState,

    /// 开始时预估的操作数
    maxops: MaxOps,

    /// 在此事务中加入的资源
    joined: Vec<TxResource>,

    /// 开始时的状态快照
    checkpoint: Option<(C, B, VolumeSuperblock)>,
}

impl<C, B> SimpleTransaction<C, B> {
    /// 创建事务管理器（空闲状态）
    pub fn new() -> Self {
        Self {
            state: TransactionState::Idle,
            maxops: MaxOps::default(),
            joined: Vec::new(),
            checkpoint: None,
        }
    }

    /// 获取事务状态
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// 当前事务的操作数预估
    pub fn maxops(&self) -> MaxOps {
        self.maxops
    }

    /// 已加入的资源
    pub fn joined(&self) -> &[TxResource] {
        &self.joined
    }

    /// 检查事务是否活跃
    fn check_active(&self) -> Result<()> {
        if self.state != TransactionState::Active {
            return Err(Error::new(
                ErrorKind::InvalidState,
                "Transaction is not active",
            ));
        }
        Ok(())
    }
}

impl<C, B> Default for SimpleTransaction<C, B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C, B> Transaction for SimpleTransaction<C, B> {
    fn is_active(&self) -> bool {
        self.state == TransactionState::Active
    }

    fn join(&mut self, res: TxResource) -> Result<()> {
        self.check_active()?;

        // 避免重复添加
        if !self.joined.contains(&res) {
            self.joined.push(res);
        }
        Ok(())
    }
}

impl<C: Clone, B: Clone> TransactionManager<C, B> for SimpleTransaction<C, B> {
    fn start(&mut self, maxops: MaxOps, catalog: &C, blocks: &B, sb: &VolumeSuperblock) -> Result<()> {
        if self.state == TransactionState::Active {
            return Err(Error::new(ErrorKind::Busy, "Transaction already active"));
        }

        log::trace!("[TRANS] start cat={} blks={}", maxops.cat, maxops.blks);
        self.maxops = maxops;
        self.joined.clear();
        self.checkpoint = Some((catalog.clone(), blocks.clone(), sb.clone()));
        self.state = TransactionState::Active;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.check_active()?;

        log::trace!("[TRANS] commit, {} resources joined", self.joined.len());
        self.checkpoint = None;
        self.state = TransactionState::Committed;
        Ok(())
    }

    fn abort(&mut self, catalog: &mut C, blocks: &mut B, sb: &mut VolumeSuperblock) {
        if self.state != TransactionState::Active {
            return;
        }

        log::debug!("[TRANS] abort, rolling back {} resources", self.joined.len());
        if let Some((cat0, blk0, sb0)) = self.checkpoint.take() {
            *catalog = cat0;
            *blocks = blk0;
            *sb = sb0;
        }
        self.joined.clear();
        self.state = TransactionState::Aborted;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Trans = SimpleTransaction<u32, u32>;

    #[test]
    fn test_transaction_states() {
        let mut trans = Trans::new();
        let sb = VolumeSuperblock::new(16, false);
        assert_eq!(trans.state(), TransactionState::Idle);
        assert!(!trans.is_active());

        trans.start(MaxOps { cat: 1, blks: 0 }, &0, &0, &sb).unwrap();
        assert!(trans.is_active());
        assert_eq!(trans.maxops().cat, 1);

        trans.commit().unwrap();
        assert_eq!(trans.state(), TransactionState::Committed);
        assert_eq!(trans.commit().unwrap_err().kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn test_nested_start_is_busy() {
        let mut trans = Trans::new();
        let sb = VolumeSuperblock::new(16, false);
        trans.start(MaxOps::default(), &0, &0, &sb).unwrap();
        let err = trans.start(MaxOps::default(), &0, &0, &sb).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Busy);
    }

    #[test]
    fn test_abort_restores_checkpoint() {
        let mut trans = Trans::new();
        let mut cat = 1u32;
        let mut blk = 2u32;
        let mut sb = VolumeSuperblock::new(16, false);

        trans.start(MaxOps::default(), &cat, &blk, &sb).unwrap();
        trans.join(TxResource::Superblock).unwrap();
        cat = 10;
        blk = 20;
        sb.set_next_obj_id(99);

        trans.abort(&mut cat, &mut blk, &mut sb);
        assert_eq!((cat, blk), (1, 2));
        assert_eq!(sb.next_obj_id(), 16);
        assert_eq!(trans.state(), TransactionState::Aborted);
    }

    #[test]
    fn test_join_tracking() {
        let mut trans = Trans::new();
        let sb = VolumeSuperblock::new(16, false);
        assert_eq!(
            trans.join(TxResource::Catalog).unwrap_err().kind(),
            ErrorKind::InvalidState
        );

        trans.start(MaxOps::default(), &0, &0, &sb).unwrap();
        trans.join(TxResource::Block(7)).unwrap();
        trans.join(TxResource::Block(7)).unwrap();
        trans.join(TxResource::Catalog).unwrap();
        assert_eq!(trans.joined(), &[TxResource::Block(7), TxResource::Catalog]);
    }
}

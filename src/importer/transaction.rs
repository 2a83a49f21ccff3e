// ==========================================
// 配送单号 CSV 导入 - 导入事务（Unit of Work）
// ==========================================
// 职责:
// - 在首行处理前开启事务（IMMEDIATE，整批持有写锁）
// - 暂存配送记录（同一订单号后写覆盖前写）
// - 提交时一次性写入全部暂存记录；任一失败整体回滚
// ==========================================

use crate::domain::order::{Order, OrderId};
use crate::domain::shipment::ShipmentRecord;
use crate::importer::error::{ImportError, ImportResult};
use crate::repository::{
    OrderRepository, RepositoryResult, ShipmentRepository, SqliteOrderRepository,
    SqliteShipmentRepository, UpsertSummary,
};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::collections::HashMap;
use tracing::{debug, info};

// ==========================================
// ShipmentStaging Trait
// ==========================================
// 配送记录存储在事务中的视图：查询看得到已暂存的记录
pub trait ShipmentStaging {
    /// 按订单号查询（暂存优先，其次存储）
    fn find_by_id(&self, order_id: OrderId) -> RepositoryResult<Option<ShipmentRecord>>;

    /// 暂存一条记录（不单独提交）
    fn stage(&mut self, record: ShipmentRecord);

    /// 当前暂存的记录数
    fn staged_len(&self) -> usize;
}

// ==========================================
// StagedShipments - 暂存集合
// ==========================================
// 保持首次暂存的顺序；同一订单号覆盖原位置
#[derive(Debug, Default)]
pub struct StagedShipments {
    records: Vec<ShipmentRecord>,
    index: HashMap<OrderId, usize>,
}

impl StagedShipments {
    pub fn get(&self, order_id: OrderId) -> Option<&ShipmentRecord> {
        self.index.get(&order_id).map(|&i| &self.records[i])
    }

    pub fn put(&mut self, record: ShipmentRecord) {
        match self.index.get(&record.order_id) {
            Some(&i) => self.records[i] = record,
            None => {
                self.index.insert(record.order_id, self.records.len());
                self.records.push(record);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn as_slice(&self) -> &[ShipmentRecord] {
        &self.records
    }
}

// ==========================================
// ImportUnitOfWork
// ==========================================
pub struct ImportUnitOfWork<'conn> {
    tx: Transaction<'conn>,
    staged: StagedShipments,
}

impl<'conn> ImportUnitOfWork<'conn> {
    /// 开启导入事务
    pub fn begin(conn: &'conn mut Connection) -> ImportResult<Self> {
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| ImportError::DatabaseTransactionError(format!("事务开启失败: {}", e)))?;
        debug!("导入事务已开启");

        Ok(Self {
            tx,
            staged: StagedShipments::default(),
        })
    }

    /// 一次性写入全部暂存记录并提交
    ///
    /// 写入失败时事务随 Transaction 析构回滚
    pub fn commit(self) -> ImportResult<UpsertSummary> {
        let Self { tx, staged } = self;

        let summary = SqliteShipmentRepository::new(&tx).upsert_all(staged.as_slice())?;
        tx.commit()
            .map_err(|e| ImportError::DatabaseTransactionError(format!("事务提交失败: {}", e)))?;

        info!(
            inserted = summary.inserted,
            updated = summary.updated,
            "导入事务已提交"
        );
        Ok(summary)
    }

    /// 回滚并丢弃全部暂存记录
    ///
    /// # 返回
    /// - 被丢弃的暂存记录数
    pub fn rollback(self) -> ImportResult<usize> {
        let discarded = self.staged.len();
        self.tx
            .rollback()
            .map_err(|e| ImportError::DatabaseTransactionError(format!("事务回滚失败: {}", e)))?;
        info!(discarded, "导入事务已回滚");
        Ok(discarded)
    }
}

impl OrderRepository for ImportUnitOfWork<'_> {
    fn find_by_id(&self, order_id: OrderId) -> RepositoryResult<Option<Order>> {
        SqliteOrderRepository::new(&self.tx).find_by_id(order_id)
    }
}

impl ShipmentStaging for ImportUnitOfWork<'_> {
    fn find_by_id(&self, order_id: OrderId) -> RepositoryResult<Option<ShipmentRecord>> {
        if let Some(record) = self.staged.get(order_id) {
            return Ok(Some(record.clone()));
        }
        SqliteShipmentRepository::new(&self.tx).find_by_id(order_id)
    }

    fn stage(&mut self, record: ShipmentRecord) {
        self.staged.put(record);
    }

    fn staged_len(&self) -> usize {
        self.staged.len()
    }
}

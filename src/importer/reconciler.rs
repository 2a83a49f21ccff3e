// ==========================================
// 配送单号 CSV 导入 - 对账引擎
// ==========================================
// 职责: 每个有效行 find-or-create 一条配送记录并暂存
// 规则: 按文件行顺序处理；同一订单号后写覆盖前写
// ==========================================

use crate::domain::shipment::ShipmentRecord;
use crate::importer::error::ImportResult;
use crate::importer::row_validator::ValidatedRow;
use crate::importer::transaction::ShipmentStaging;
use tracing::debug;

#[derive(Debug, Default, Clone, Copy)]
pub struct ShipmentReconciler;

impl ShipmentReconciler {
    pub fn new() -> Self {
        Self
    }

    /// 对一个有效行执行 find-or-create 并暂存
    ///
    /// 新建/更新的计数以提交时的落库结果为准
    pub fn reconcile<S>(&self, row: ValidatedRow, store: &mut S) -> ImportResult<()>
    where
        S: ShipmentStaging + ?Sized,
    {
        let ValidatedRow {
            row_number,
            order,
            ship_number,
        } = row;

        let existing = store.find_by_id(order.order_id)?;
        let found = existing.is_some();
        let mut record = existing.unwrap_or_else(|| ShipmentRecord::new(order.clone()));
        record.assign(order, ship_number);

        debug!(
            row_number,
            order_id = record.order_id,
            ship_number = %record.ship_number,
            found,
            "配送记录已暂存"
        );
        store.stage(record);
        Ok(())
    }
}

// ==========================================
// 配送单号 CSV 导入 - 配送记录领域模型
// ==========================================
// 红线: 每个订单最多一条配送记录（以 order_id 为键 find-or-create）
// 红线: 本模块从不删除配送记录
// 对齐: ship_number 表
// ==========================================

use crate::domain::order::{Order, OrderId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// ShipmentRecord - 订单与配送单号的关联
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentRecord {
    // ===== 主键 =====
    pub order_id: OrderId, // 订单号（同时是 orders 的外键）

    // ===== 业务字段 =====
    pub ship_number: String, // 配送单号（TRIM 后非空）
    pub order: Order,        // 关联订单

    // ===== 审计字段 =====
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    // 是否已落库（从仓储读取的记录为 true）
    #[serde(skip)]
    persisted: bool,
}

impl ShipmentRecord {
    /// 为订单构造一条尚未落库的配送记录
    pub fn new(order: Order) -> Self {
        let now = Utc::now();
        Self {
            order_id: order.order_id,
            ship_number: String::new(),
            order,
            created_at: now,
            updated_at: now,
            persisted: false,
        }
    }

    /// 从仓储行还原（仅供仓储层使用）
    pub(crate) fn restore(
        order: Order,
        ship_number: String,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            order_id: order.order_id,
            ship_number,
            order,
            created_at,
            updated_at,
            persisted: true,
        }
    }

    /// 写入订单与配送单号
    ///
    /// order_id 始终与关联订单保持一致
    pub fn assign(&mut self, order: Order, ship_number: impl Into<String>) {
        self.order_id = order.order_id;
        self.order = order;
        self.ship_number = ship_number.into();
        self.updated_at = Utc::now();
    }

    pub fn is_persisted(&self) -> bool {
        self.persisted
    }
}

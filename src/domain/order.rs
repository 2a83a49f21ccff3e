// ==========================================
// 配送单号 CSV 导入 - 订单领域模型
// ==========================================
// 红线: 订单由宿主系统维护,本模块只读
// 对齐: orders 表
// ==========================================

use serde::{Deserialize, Serialize};

/// 订单 ID（宿主系统的整数主键）
pub type OrderId = i64;

// ==========================================
// Order - 订单（外部实体,只读）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,             // 订单号
    pub customer_name: Option<String>, // 顾客名
    pub order_date: Option<String>,    // 下单时间（宿主系统原样保存）
}

impl Order {
    pub fn new(order_id: OrderId) -> Self {
        Self {
            order_id,
            customer_name: None,
            order_date: None,
        }
    }
}

/// 解析 CSV 中的订单号文本
///
/// 非整数文本在宿主系统中不可能命中任何订单,因此返回 None,
/// 由调用方按"订单不存在"处理。
pub fn parse_order_id(raw: &str) -> Option<OrderId> {
    raw.trim().parse::<OrderId>().ok()
}

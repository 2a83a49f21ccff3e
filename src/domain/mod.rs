// ==========================================
// 配送单号 CSV 导入 - 领域层
// ==========================================
// 职责: 订单（只读）/ 配送记录 / 导入批次结果
// ==========================================

pub mod import;
pub mod order;
pub mod shipment;

pub use import::{
    CanonicalHeader, ErrorCategory, ImportOutcome, ValidationError, ValidationErrorKind,
    ORDER_ID_KEY, SHIP_NUMBER_KEY,
};
pub use order::{parse_order_id, Order, OrderId};
pub use shipment::ShipmentRecord;

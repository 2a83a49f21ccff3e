// ==========================================
// 配送单号 CSV 导入 - 数据仓储层
// ==========================================
// 职责: 订单查询 / 配送记录读写
// 说明: 仓储借用连接（或事务），事务边界由导入协调器控制
// ==========================================

pub mod error;
pub mod order_repo;
pub mod shipment_repo;

pub use error::{RepositoryError, RepositoryResult};
pub use order_repo::{OrderRepository, SqliteOrderRepository};
pub use shipment_repo::{ShipmentRepository, SqliteShipmentRepository, UpsertSummary};

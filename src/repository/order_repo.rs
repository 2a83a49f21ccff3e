// ==========================================
// 配送单号 CSV 导入 - 订单仓储
// ==========================================
// 职责: 按订单号查询订单（只读）
// 红线: Repository 不含业务规则，不创建/修改订单
// ==========================================

use crate::domain::order::{Order, OrderId};
use crate::repository::error::RepositoryResult;
use rusqlite::{params, Connection, OptionalExtension, Row};

// ==========================================
// OrderRepository Trait
// ==========================================
// 实现者: SqliteOrderRepository / 导入事务 ImportUnitOfWork
pub trait OrderRepository {
    /// 按订单号查询；不存在时返回 None
    fn find_by_id(&self, order_id: OrderId) -> RepositoryResult<Option<Order>>;
}

// ==========================================
// SqliteOrderRepository
// ==========================================
// 借用连接（可以是事务），以便与写入共享同一事务
pub struct SqliteOrderRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteOrderRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<Order> {
        Ok(Order {
            order_id: row.get(0)?,
            customer_name: row.get(1)?,
            order_date: row.get(2)?,
        })
    }
}

impl OrderRepository for SqliteOrderRepository<'_> {
    fn find_by_id(&self, order_id: OrderId) -> RepositoryResult<Option<Order>> {
        let order = self
            .conn
            .query_row(
                "SELECT order_id, customer_name, order_date FROM orders WHERE order_id = ?1",
                params![order_id],
                Self::map_row,
            )
            .optional()?;
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{configure_sqlite_connection, ensure_schema};

    #[test]
    fn test_find_by_id() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        ensure_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO orders (order_id, customer_name) VALUES (1001, '山田 太郎')",
            [],
        )
        .unwrap();

        let repo = SqliteOrderRepository::new(&conn);
        let order = repo.find_by_id(1001).unwrap().unwrap();
        assert_eq!(order.customer_name.as_deref(), Some("山田 太郎"));
        assert!(order.order_date.is_none());

        assert!(repo.find_by_id(9999).unwrap().is_none());
    }
}

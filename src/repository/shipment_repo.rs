// ==========================================
// 配送单号 CSV 导入 - 配送记录仓储
// ==========================================
// 职责: ship_number 表的查询与 UPSERT
// 红线: Repository 不含业务规则，只做数据 CRUD
// 红线: 不提供删除
// ==========================================

use crate::domain::order::{Order, OrderId};
use crate::domain::shipment::ShipmentRecord;
use crate::repository::error::RepositoryResult;
use rusqlite::{params, Connection, OptionalExtension, Row};

const SELECT_SHIPMENT: &str = r#"
    SELECT s.order_id, s.ship_number, s.created_at, s.updated_at,
           o.customer_name, o.order_date
    FROM ship_number s
    JOIN orders o ON o.order_id = s.order_id
"#;

/// 批量写入统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertSummary {
    pub inserted: usize,
    pub updated: usize,
}

impl UpsertSummary {
    pub fn total(&self) -> usize {
        self.inserted + self.updated
    }
}

// ==========================================
// ShipmentRepository Trait
// ==========================================
pub trait ShipmentRepository {
    /// 按订单号查询配送记录；不存在时返回 None
    fn find_by_id(&self, order_id: OrderId) -> RepositoryResult<Option<ShipmentRecord>>;

    /// 查询全部配送记录（按订单号升序）
    fn find_all(&self) -> RepositoryResult<Vec<ShipmentRecord>>;

    /// 批量 UPSERT（调用方负责事务边界）
    fn upsert_all(&self, records: &[ShipmentRecord]) -> RepositoryResult<UpsertSummary>;
}

// ==========================================
// SqliteShipmentRepository
// ==========================================
pub struct SqliteShipmentRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteShipmentRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<ShipmentRecord> {
        let order = Order {
            order_id: row.get(0)?,
            customer_name: row.get(4)?,
            order_date: row.get(5)?,
        };
        Ok(ShipmentRecord::restore(
            order,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
        ))
    }

    pub fn count(&self) -> RepositoryResult<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM ship_number", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

impl ShipmentRepository for SqliteShipmentRepository<'_> {
    fn find_by_id(&self, order_id: OrderId) -> RepositoryResult<Option<ShipmentRecord>> {
        let sql = format!("{} WHERE s.order_id = ?1", SELECT_SHIPMENT);
        let record = self
            .conn
            .query_row(&sql, params![order_id], Self::map_row)
            .optional()?;
        Ok(record)
    }

    fn find_all(&self) -> RepositoryResult<Vec<ShipmentRecord>> {
        let sql = format!("{} ORDER BY s.order_id", SELECT_SHIPMENT);
        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map([], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn upsert_all(&self, records: &[ShipmentRecord]) -> RepositoryResult<UpsertSummary> {
        let mut stmt = self.conn.prepare_cached(
            r#"
            INSERT INTO ship_number (order_id, ship_number, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(order_id) DO UPDATE SET
                ship_number = excluded.ship_number,
                updated_at = excluded.updated_at
            "#,
        )?;

        let mut summary = UpsertSummary::default();
        for record in records {
            stmt.execute(params![
                record.order_id,
                record.ship_number,
                record.created_at,
                record.updated_at,
            ])?;
            if record.is_persisted() {
                summary.updated += 1;
            } else {
                summary.inserted += 1;
            }
        }

        Ok(summary)
    }
}

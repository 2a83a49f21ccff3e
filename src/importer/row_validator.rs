// ==========================================
// 配送单号 CSV 导入 - 行校验器
// ==========================================
// 结构校验: 表头（顺序敏感）/ 空文件 / 行列数
// 业务校验: 订单号必填 / 订单存在 / 配送单号必填
// 策略: fail-fast，首个错误即终止整个批次
// ==========================================

use crate::domain::import::{CanonicalHeader, ValidationError, ValidationErrorKind};
use crate::domain::order::{parse_order_id, Order};
use crate::importer::error::ImportResult;
use crate::importer::file_parser::CsvRow;
use crate::repository::OrderRepository;
use std::iter::Peekable;
use tracing::warn;

// ==========================================
// ValidatedRow - 通过校验的行
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRow {
    pub row_number: usize,
    pub order: Order,
    pub ship_number: String, // 已 TRIM，非空
}

// ==========================================
// RowValidator
// ==========================================
#[derive(Debug, Clone)]
pub struct RowValidator {
    header: CanonicalHeader,
}

impl RowValidator {
    pub fn new(header: CanonicalHeader) -> Self {
        Self { header }
    }

    pub fn header(&self) -> &CanonicalHeader {
        &self.header
    }

    /// 校验文件表头与规范表头完全一致
    pub fn validate_header(&self, actual: &[String]) -> ImportResult<()> {
        if self.header.matches(actual) {
            return Ok(());
        }
        warn!(
            expected = ?self.header.labels(),
            actual = ?actual,
            "CSV 表头不一致"
        );
        Err(ValidationError::file(ValidationErrorKind::HeaderMismatch).into())
    }

    /// 校验至少存在一行数据（只窥视，不消费）
    pub fn ensure_not_empty<I: Iterator>(&self, rows: &mut Peekable<I>) -> ImportResult<()> {
        if rows.peek().is_none() {
            warn!("CSV 无数据行");
            return Err(ValidationError::file(ValidationErrorKind::EmptyFile).into());
        }
        Ok(())
    }

    /// 校验单行并解析订单
    ///
    /// 检查顺序: 列数 → 订单号非空 → 订单存在 → 配送单号非空
    pub fn validate_row<O>(&self, row: &CsvRow, orders: &O) -> ImportResult<ValidatedRow>
    where
        O: OrderRepository + ?Sized,
    {
        let row_number = row.row_number();
        let fail = |kind: ValidationErrorKind| -> ImportResult<ValidatedRow> {
            warn!(row_number, kind = ?kind, "行校验失败");
            Err(ValidationError::row(row_number, kind).into())
        };

        if row.len() != self.header.column_count() {
            return fail(ValidationErrorKind::RowFormatMismatch);
        }

        let raw_order_id = row.get(&self.header.order_id_label).unwrap_or_default();
        if raw_order_id.is_empty() {
            return fail(ValidationErrorKind::MissingOrderId);
        }

        let order = match parse_order_id(raw_order_id) {
            Some(order_id) => orders.find_by_id(order_id)?,
            None => None,
        };
        let Some(order) = order else {
            return fail(ValidationErrorKind::OrderNotFound);
        };

        let ship_number = row.get(&self.header.ship_number_label).unwrap_or_default();
        if ship_number.is_empty() {
            return fail(ValidationErrorKind::MissingShipNumber);
        }

        Ok(ValidatedRow {
            row_number,
            order,
            ship_number: ship_number.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ImportSettings;
    use crate::domain::order::OrderId;
    use crate::importer::error::ImportError;
    use crate::importer::file_parser::CsvParser;
    use crate::repository::RepositoryResult;
    use std::collections::HashMap;
    use tempfile::TempDir;

    struct MemoryOrders(HashMap<OrderId, Order>);

    impl MemoryOrders {
        fn with(ids: &[OrderId]) -> Self {
            Self(ids.iter().map(|id| (*id, Order::new(*id))).collect())
        }
    }

    impl OrderRepository for MemoryOrders {
        fn find_by_id(&self, order_id: OrderId) -> RepositoryResult<Option<Order>> {
            Ok(self.0.get(&order_id).cloned())
        }
    }

    fn rows(content: &str) -> (TempDir, Vec<CsvRow>) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("in.csv");
        std::fs::write(&path, content).unwrap();
        let settings = ImportSettings {
            temp_dir: dir.path().join("tmp"),
            ..ImportSettings::default()
        };
        let rows = CsvParser::from_settings(&settings)
            .open(&path)
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        (dir, rows)
    }

    fn kind_of(err: ImportError) -> (Option<usize>, ValidationErrorKind) {
        let v = err.as_validation().cloned().expect("validation error");
        (v.row_number, v.kind)
    }

    fn validator() -> RowValidator {
        RowValidator::new(CanonicalHeader::default())
    }

    #[test]
    fn test_header_validation() {
        let v = validator();
        assert!(v
            .validate_header(&["注文番号".to_string(), "配送伝票番号".to_string()])
            .is_ok());

        let err = v
            .validate_header(&["配送伝票番号".to_string(), "注文番号".to_string()])
            .unwrap_err();
        assert_eq!(kind_of(err), (None, ValidationErrorKind::HeaderMismatch));
    }

    #[test]
    fn test_ensure_not_empty() {
        let v = validator();
        let mut empty = Vec::<u8>::new().into_iter().peekable();
        let err = v.ensure_not_empty(&mut empty).unwrap_err();
        assert_eq!(kind_of(err), (None, ValidationErrorKind::EmptyFile));

        let mut one = vec![1].into_iter().peekable();
        assert!(v.ensure_not_empty(&mut one).is_ok());
        assert_eq!(one.next(), Some(1));
    }

    #[test]
    fn test_valid_row() {
        let (_dir, rows) = rows("注文番号,配送伝票番号\n 1001 ,　YT-555　\n");
        let validated = validator()
            .validate_row(&rows[0], &MemoryOrders::with(&[1001]))
            .unwrap();
        assert_eq!(validated.row_number, 1);
        assert_eq!(validated.order.order_id, 1001);
        assert_eq!(validated.ship_number, "YT-555");
    }

    #[test]
    fn test_row_errors_in_check_order() {
        let (_dir, rows) = rows(
            "注文番号,配送伝票番号\n\
             1001\n\
             ,YT-1\n\
             9999,YT-2\n\
             ABC,YT-3\n\
             1001,  \n",
        );
        let orders = MemoryOrders::with(&[1001]);
        let v = validator();

        let expected = [
            (1, ValidationErrorKind::RowFormatMismatch),
            (2, ValidationErrorKind::MissingOrderId),
            (3, ValidationErrorKind::OrderNotFound),
            (4, ValidationErrorKind::OrderNotFound),
            (5, ValidationErrorKind::MissingShipNumber),
        ];
        for (row, (row_number, kind)) in rows.iter().zip(expected) {
            let err = v.validate_row(row, &orders).unwrap_err();
            assert_eq!(kind_of(err), (Some(row_number), kind));
        }
    }

    #[test]
    fn test_missing_order_checked_before_ship_number() {
        let (_dir, rows) = rows("注文番号,配送伝票番号\n9999,\n");
        let err = validator()
            .validate_row(&rows[0], &MemoryOrders::with(&[]))
            .unwrap_err();
        assert_eq!(kind_of(err), (Some(1), ValidationErrorKind::OrderNotFound));
    }
}

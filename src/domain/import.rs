// ==========================================
// 配送单号 CSV 导入 - 导入批次领域模型
// ==========================================
// 职责: 规范表头 / 校验错误 / 导入结果
// 说明: ImportOutcome 不落库,只在一次导入内存在
// ==========================================

use crate::i18n::{t, t_with_args};
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 内部字段键
// ==========================================
pub const ORDER_ID_KEY: &str = "order_id";
pub const SHIP_NUMBER_KEY: &str = "ship_number";

pub const DEFAULT_ORDER_ID_LABEL: &str = "注文番号";
pub const DEFAULT_SHIP_NUMBER_LABEL: &str = "配送伝票番号";

// ==========================================
// CanonicalHeader - 规范表头
// ==========================================
// 固定两列、固定顺序: 人类可读列名 → 内部字段键
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalHeader {
    pub order_id_label: String,
    pub ship_number_label: String,
}

impl Default for CanonicalHeader {
    fn default() -> Self {
        Self {
            order_id_label: DEFAULT_ORDER_ID_LABEL.to_string(),
            ship_number_label: DEFAULT_SHIP_NUMBER_LABEL.to_string(),
        }
    }
}

impl CanonicalHeader {
    pub fn new(order_id_label: impl Into<String>, ship_number_label: impl Into<String>) -> Self {
        Self {
            order_id_label: order_id_label.into(),
            ship_number_label: ship_number_label.into(),
        }
    }

    /// (列名, 内部键) 列表,按文件列顺序
    pub fn columns(&self) -> [(&str, &str); 2] {
        [
            (self.order_id_label.as_str(), ORDER_ID_KEY),
            (self.ship_number_label.as_str(), SHIP_NUMBER_KEY),
        ]
    }

    pub fn labels(&self) -> Vec<&str> {
        self.columns().iter().map(|(label, _)| *label).collect()
    }

    /// 规范列数
    pub fn column_count(&self) -> usize {
        self.columns().len()
    }

    /// 文件表头是否与规范表头完全一致（顺序敏感）
    pub fn matches(&self, actual: &[String]) -> bool {
        actual.len() == self.column_count()
            && actual
                .iter()
                .zip(self.labels())
                .all(|(a, expected)| a == expected)
    }
}

// ==========================================
// 错误分类
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    Structural,         // 文件形状错误（表头/空文件/列数）
    BusinessValidation, // 业务规则错误（必填/订单不存在）
    Io,                 // 上传存储/转码/CSV 语法
    Persistence,        // 存储层错误
}

// ==========================================
// ValidationErrorKind
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationErrorKind {
    HeaderMismatch,
    EmptyFile,
    RowFormatMismatch,
    MissingOrderId,
    OrderNotFound,
    MissingShipNumber,
}

impl ValidationErrorKind {
    fn message_key(self) -> &'static str {
        match self {
            Self::HeaderMismatch => "import.header_mismatch",
            Self::EmptyFile => "import.empty_file",
            Self::RowFormatMismatch => "import.row_format_mismatch",
            Self::MissingOrderId => "import.missing_order_id",
            Self::OrderNotFound => "import.order_not_found",
            Self::MissingShipNumber => "import.missing_ship_number",
        }
    }

    pub fn category(self) -> ErrorCategory {
        match self {
            Self::HeaderMismatch | Self::EmptyFile | Self::RowFormatMismatch => {
                ErrorCategory::Structural
            }
            Self::MissingOrderId | Self::OrderNotFound | Self::MissingShipNumber => {
                ErrorCategory::BusinessValidation
            }
        }
    }
}

// ==========================================
// ValidationError - 行级/文件级校验错误
// ==========================================
// row_number: 1 起算,不含表头；文件级错误为 None
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub row_number: Option<usize>,
    pub kind: ValidationErrorKind,
    pub message: String,
}

impl ValidationError {
    /// 文件级错误（表头不一致 / 无数据行）
    pub fn file(kind: ValidationErrorKind) -> Self {
        Self {
            row_number: None,
            kind,
            message: t(kind.message_key()),
        }
    }

    /// 行级错误
    pub fn row(row_number: usize, kind: ValidationErrorKind) -> Self {
        Self {
            row_number: Some(row_number),
            kind,
            message: t(kind.message_key()),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.row_number {
            Some(row) => {
                let row = row.to_string();
                let text = t_with_args(
                    "import.row_message",
                    &[("row", row.as_str()), ("message", self.message.as_str())],
                );
                f.write_str(&text)
            }
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for ValidationError {}

// ==========================================
// ImportOutcome - 一次导入的结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportOutcome {
    pub batch_id: String,
    pub file_name: Option<String>,
    pub committed: bool,
    pub total_rows: usize,   // 已处理的数据行数
    pub created: usize,      // 新建的配送记录数
    pub updated: usize,      // 更新的配送记录数
    pub errors: Vec<ValidationError>,
    pub elapsed_ms: u128,
}

impl ImportOutcome {
    pub fn is_success(&self) -> bool {
        self.committed && self.errors.is_empty()
    }

    /// 提交成功时对账的行数；失败时为 0
    pub fn reconciled_rows(&self) -> usize {
        if self.is_success() {
            self.total_rows
        } else {
            0
        }
    }

    /// 供界面显示的消息列表
    pub fn messages(&self) -> Vec<String> {
        if self.is_success() {
            let rows = self.total_rows.to_string();
            vec![t_with_args("import.success", &[("rows", rows.as_str())])]
        } else {
            self.errors.iter().map(|e| e.to_string()).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_matches_is_order_sensitive() {
        let header = CanonicalHeader::new("orderId", "shipNumber");
        assert!(header.matches(&["orderId".to_string(), "shipNumber".to_string()]));
        assert!(!header.matches(&["shipNumber".to_string(), "orderId".to_string()]));
        assert!(!header.matches(&["orderId".to_string()]));
        assert!(!header.matches(&[
            "orderId".to_string(),
            "shipNumber".to_string(),
            "memo".to_string()
        ]));
    }

    #[test]
    fn test_default_header_labels() {
        let header = CanonicalHeader::default();
        assert_eq!(header.labels(), vec!["注文番号", "配送伝票番号"]);
        assert_eq!(header.columns()[0].1, ORDER_ID_KEY);
        assert_eq!(header.columns()[1].1, SHIP_NUMBER_KEY);
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(
            ValidationError::file(ValidationErrorKind::EmptyFile).category(),
            ErrorCategory::Structural
        );
        assert_eq!(
            ValidationError::row(3, ValidationErrorKind::RowFormatMismatch).category(),
            ErrorCategory::Structural
        );
        assert_eq!(
            ValidationError::row(2, ValidationErrorKind::OrderNotFound).category(),
            ErrorCategory::BusinessValidation
        );
    }

    #[test]
    fn test_failed_outcome_reconciles_nothing() {
        let outcome = ImportOutcome {
            batch_id: "b".to_string(),
            file_name: None,
            committed: false,
            total_rows: 1,
            created: 0,
            updated: 0,
            errors: vec![ValidationError::row(2, ValidationErrorKind::OrderNotFound)],
            elapsed_ms: 0,
        };
        assert!(!outcome.is_success());
        assert_eq!(outcome.reconciled_rows(), 0);
        assert_eq!(outcome.messages().len(), 1);
    }
}

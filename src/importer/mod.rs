// ==========================================
// 配送单号 CSV 导入 - 导入层
// ==========================================
// 职责: 上传 CSV → 订单关联 → 配送记录落库（整批一个事务）
// 附带: 导入模板导出
// ==========================================

// 模块声明
pub mod encoding;
pub mod error;
pub mod file_parser;
pub mod reconciler;
pub mod row_validator;
pub mod shipment_importer;
pub mod template;
pub mod transaction;
pub mod upload;

// 重导出核心类型
pub use error::{ImportError, ImportResult};
pub use file_parser::{CsvParser, CsvRow, CsvRows};
pub use reconciler::ShipmentReconciler;
pub use row_validator::{RowValidator, ValidatedRow};
pub use shipment_importer::{ShipNumberImporter, ShipNumberImporterImpl};
pub use template::{CsvTemplateEmitter, TEMPLATE_FILE_NAME};
pub use transaction::{ImportUnitOfWork, ShipmentStaging, StagedShipments};
pub use upload::TempUpload;

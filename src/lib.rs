// ==========================================
// 配送单号 CSV 导入 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 订单与配送单号的批量关联（整批成功或整批回滚）
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "en");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - CSV 导入与模板导出
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// ==========================================
// 重导出核心类型
// ==========================================

pub use domain::{
    CanonicalHeader, ImportOutcome, Order, OrderId, ShipmentRecord, ValidationError,
    ValidationErrorKind,
};

pub use importer::{
    CsvTemplateEmitter, ImportError, ImportResult, ShipNumberImporter, ShipNumberImporterImpl,
};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "ship-number-csv";

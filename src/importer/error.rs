// ==========================================
// 配送单号 CSV 导入 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 分类: 结构错误 / 业务校验错误 / IO 错误 / 持久化错误
// ==========================================

use crate::domain::import::{ErrorCategory, ValidationError};
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("上传文件保存失败: {0}")]
    UploadStorageError(String),

    #[error("字符编码转换失败 ({encoding}, 字节偏移 {offset}): 存在无法解码的字节序列")]
    EncodingError { encoding: String, offset: u64 },

    #[error("模板编码失败 ({encoding}): 列名无法用该编码表示")]
    UnmappableCharacter { encoding: String },

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("模板写出失败: {0}")]
    TemplateWriteError(String),

    // ===== 校验错误（结构/业务），导入时转换为失败结果 =====
    #[error("{0}")]
    Validation(ValidationError),

    // ===== 数据库错误 =====
    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    // ===== 配置错误 =====
    #[error("配置读取失败 (key: {key}): {message}")]
    ConfigReadError { key: String, message: String },

    #[error("配置值格式错误 (key: {key}, value: {value}): {message}")]
    ConfigValueError {
        key: String,
        value: String,
        message: String,
    },
}

impl ImportError {
    /// 按错误分类归档
    pub fn category(&self) -> ErrorCategory {
        match self {
            ImportError::Validation(v) => v.category(),
            ImportError::FileNotFound(_)
            | ImportError::FileReadError(_)
            | ImportError::UploadStorageError(_)
            | ImportError::EncodingError { .. }
            | ImportError::UnmappableCharacter { .. }
            | ImportError::CsvParseError(_)
            | ImportError::TemplateWriteError(_)
            | ImportError::ConfigReadError { .. }
            | ImportError::ConfigValueError { .. } => ErrorCategory::Io,
            ImportError::DatabaseConnectionError(_)
            | ImportError::DatabaseTransactionError(_)
            | ImportError::Repository(_) => ErrorCategory::Persistence,
        }
    }

    /// 若为校验错误，取出校验错误
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            ImportError::Validation(v) => Some(v),
            _ => None,
        }
    }
}

impl From<ValidationError> for ImportError {
    fn from(err: ValidationError) -> Self {
        ImportError::Validation(err)
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for ImportError {
    fn from(err: rusqlite::Error) -> Self {
        ImportError::Repository(RepositoryError::from(err))
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        match err.kind() {
            csv::ErrorKind::Io(_) => ImportError::FileReadError(err.to_string()),
            _ => ImportError::CsvParseError(err.to_string()),
        }
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;

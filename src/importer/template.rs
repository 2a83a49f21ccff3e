// ==========================================
// 配送单号 CSV 导入 - 模板导出
// ==========================================
// 内容: 仅规范表头一行（导出分隔符 + 导出编码）
// 文件名: ship_number.csv
// ==========================================

use crate::config::ImportSettings;
use crate::domain::import::CanonicalHeader;
use crate::importer::error::{ImportError, ImportResult};
use csv::{Terminator, WriterBuilder};
use encoding_rs::Encoding;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const TEMPLATE_FILE_NAME: &str = "ship_number.csv";

#[derive(Debug, Clone)]
pub struct CsvTemplateEmitter {
    header: CanonicalHeader,
    separator: u8,
    encoding: &'static Encoding,
}

impl CsvTemplateEmitter {
    pub fn new(header: CanonicalHeader, separator: u8, encoding: &'static Encoding) -> Self {
        Self {
            header,
            separator,
            encoding,
        }
    }

    pub fn from_settings(settings: &ImportSettings) -> Self {
        Self::new(
            settings.header.clone(),
            settings.export_separator,
            settings.export_encoding,
        )
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// 生成模板内容（已按导出编码编码）
    pub fn render(&self) -> ImportResult<Vec<u8>> {
        let mut writer = WriterBuilder::new()
            .delimiter(self.separator)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(Vec::new());
        writer
            .write_record(self.header.labels())
            .map_err(|e| ImportError::TemplateWriteError(e.to_string()))?;
        let utf8 = writer
            .into_inner()
            .map_err(|e| ImportError::TemplateWriteError(e.to_string()))?;
        let text =
            String::from_utf8(utf8).map_err(|e| ImportError::TemplateWriteError(e.to_string()))?;

        let (encoded, _, had_errors) = self.encoding.encode(&text);
        if had_errors {
            return Err(ImportError::UnmappableCharacter {
                encoding: self.encoding.name().to_string(),
            });
        }
        Ok(encoded.into_owned())
    }

    /// 写出模板文件
    ///
    /// # 参数
    /// - target: 目标文件路径；为目录时写入 `<目录>/ship_number.csv`
    pub fn write_to(&self, target: &Path) -> ImportResult<PathBuf> {
        let path = if target.is_dir() {
            target.join(TEMPLATE_FILE_NAME)
        } else {
            target.to_path_buf()
        };

        let bytes = self.render()?;
        fs::write(&path, &bytes)
            .map_err(|e| ImportError::TemplateWriteError(format!("{}: {}", path.display(), e)))?;
        info!(
            path = %path.display(),
            encoding = self.encoding.name(),
            size = bytes.len(),
            "模板已写出"
        );
        Ok(path)
    }
}

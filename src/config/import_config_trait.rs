// ==========================================
// 配送单号 CSV 导入 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入模块所需的配置读取接口
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::domain::import::CanonicalHeader;
use crate::importer::error::{ImportError, ImportResult};
use encoding_rs::{Encoding, EUC_JP, SHIFT_JIS, UTF_8};
use std::path::PathBuf;

// ===== 默认值 =====
pub const DEFAULT_DELIMITER: u8 = b',';
pub const DEFAULT_ENCLOSURE: u8 = b'"';
pub const DEFAULT_DETECT_PREFIX_BYTES: usize = 4096;

// ==========================================
// ImportSettings - 一次导入使用的配置快照
// ==========================================
#[derive(Debug, Clone)]
pub struct ImportSettings {
    pub delimiter: u8,
    pub enclosure: u8,
    pub export_separator: u8,
    pub export_encoding: &'static Encoding,
    pub temp_dir: PathBuf,
    pub detect_prefix_bytes: usize,
    pub detect_encodings: Vec<&'static Encoding>,
    pub header: CanonicalHeader,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
            enclosure: DEFAULT_ENCLOSURE,
            export_separator: DEFAULT_DELIMITER,
            export_encoding: SHIFT_JIS,
            temp_dir: std::env::temp_dir(),
            detect_prefix_bytes: DEFAULT_DETECT_PREFIX_BYTES,
            detect_encodings: vec![UTF_8, SHIFT_JIS, EUC_JP],
            header: CanonicalHeader::default(),
        }
    }
}

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 实现者: ConfigManager（config_kv 表）/ ImportSettings（静态配置）
pub trait ImportConfigReader {
    /// 导入 CSV 的字段分隔符（默认 `,`）
    fn get_import_delimiter(&self) -> ImportResult<u8>;

    /// 导入 CSV 的字段包围符（默认 `"`）
    fn get_import_enclosure(&self) -> ImportResult<u8>;

    /// 模板导出的字段分隔符（默认 `,`）
    fn get_export_separator(&self) -> ImportResult<u8>;

    /// 模板导出的字符编码（默认 Shift_JIS）
    fn get_export_encoding(&self) -> ImportResult<&'static Encoding>;

    /// 上传文件/解码文件的临时目录（默认系统临时目录）
    fn get_temp_dir(&self) -> ImportResult<PathBuf>;

    /// 编码判定读取的前缀字节数（默认 4096）
    fn get_detect_prefix_bytes(&self) -> ImportResult<usize>;

    /// 编码判定的候选列表，按优先级排列（默认 UTF-8, Shift_JIS, EUC-JP）
    fn get_detect_encodings(&self) -> ImportResult<Vec<&'static Encoding>>;

    /// 规范表头列名
    fn get_header(&self) -> ImportResult<CanonicalHeader>;

    /// 一次性读取全部导入配置
    fn load_import_settings(&self) -> ImportResult<ImportSettings> {
        Ok(ImportSettings {
            delimiter: self.get_import_delimiter()?,
            enclosure: self.get_import_enclosure()?,
            export_separator: self.get_export_separator()?,
            export_encoding: self.get_export_encoding()?,
            temp_dir: self.get_temp_dir()?,
            detect_prefix_bytes: self.get_detect_prefix_bytes()?,
            detect_encodings: self.get_detect_encodings()?,
            header: self.get_header()?,
        })
    }
}

impl ImportConfigReader for ImportSettings {
    fn get_import_delimiter(&self) -> ImportResult<u8> {
        Ok(self.delimiter)
    }

    fn get_import_enclosure(&self) -> ImportResult<u8> {
        Ok(self.enclosure)
    }

    fn get_export_separator(&self) -> ImportResult<u8> {
        Ok(self.export_separator)
    }

    fn get_export_encoding(&self) -> ImportResult<&'static Encoding> {
        Ok(self.export_encoding)
    }

    fn get_temp_dir(&self) -> ImportResult<PathBuf> {
        Ok(self.temp_dir.clone())
    }

    fn get_detect_prefix_bytes(&self) -> ImportResult<usize> {
        Ok(self.detect_prefix_bytes)
    }

    fn get_detect_encodings(&self) -> ImportResult<Vec<&'static Encoding>> {
        Ok(self.detect_encodings.clone())
    }

    fn get_header(&self) -> ImportResult<CanonicalHeader> {
        Ok(self.header.clone())
    }

    fn load_import_settings(&self) -> ImportResult<ImportSettings> {
        Ok(self.clone())
    }
}

// ==========================================
// 配置值解析
// ==========================================

/// 解析单字节字符配置（分隔符/包围符）
///
/// 接受单个 ASCII 字符，或 `\t` / `tab` 表示制表符
pub fn parse_char_setting(key: &str, value: &str) -> ImportResult<u8> {
    let raw = value.trim_matches(|c| c == '\r' || c == '\n');
    if raw == "\\t" || raw.eq_ignore_ascii_case("tab") || raw == "\t" {
        return Ok(b'\t');
    }

    let bytes = raw.as_bytes();
    if bytes.len() == 1 && bytes[0].is_ascii() {
        Ok(bytes[0])
    } else {
        Err(ImportError::ConfigValueError {
            key: key.to_string(),
            value: value.to_string(),
            message: "必须是单个 ASCII 字符".to_string(),
        })
    }
}

/// 解析字符编码名称（WHATWG 标签，如 `Shift_JIS`、`EUC-JP`、`UTF-8`）
pub fn parse_encoding_setting(key: &str, value: &str) -> ImportResult<&'static Encoding> {
    Encoding::for_label(value.trim().as_bytes()).ok_or_else(|| ImportError::ConfigValueError {
        key: key.to_string(),
        value: value.to_string(),
        message: "未知的字符编码".to_string(),
    })
}

/// 解析逗号分隔的编码候选列表；UTF-8 总是排在首位
pub fn parse_encoding_list(key: &str, value: &str) -> ImportResult<Vec<&'static Encoding>> {
    let mut encodings = vec![UTF_8];
    for label in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let encoding = parse_encoding_setting(key, label)?;
        if !encodings.contains(&encoding) {
            encodings.push(encoding);
        }
    }
    Ok(encodings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_char_setting() {
        assert_eq!(parse_char_setting("k", ",").unwrap(), b',');
        assert_eq!(parse_char_setting("k", ";").unwrap(), b';');
        assert_eq!(parse_char_setting("k", "\\t").unwrap(), b'\t');
        assert_eq!(parse_char_setting("k", "TAB").unwrap(), b'\t');
        assert!(parse_char_setting("k", "").is_err());
        assert!(parse_char_setting("k", ",,").is_err());
        assert!(parse_char_setting("k", "、").is_err());
    }

    #[test]
    fn test_parse_encoding_setting() {
        assert_eq!(parse_encoding_setting("k", "Shift_JIS").unwrap(), SHIFT_JIS);
        assert_eq!(parse_encoding_setting("k", "sjis").unwrap(), SHIFT_JIS);
        assert_eq!(parse_encoding_setting("k", " euc-jp ").unwrap(), EUC_JP);
        assert!(parse_encoding_setting("k", "klingon").is_err());
    }

    #[test]
    fn test_parse_encoding_list_keeps_utf8_first() {
        let list = parse_encoding_list("k", "EUC-JP, Shift_JIS, UTF-8").unwrap();
        assert_eq!(list, vec![UTF_8, EUC_JP, SHIFT_JIS]);
    }

    #[test]
    fn test_settings_as_reader() {
        let settings = ImportSettings::default();
        let loaded = settings.load_import_settings().unwrap();
        assert_eq!(loaded.delimiter, b',');
        assert_eq!(loaded.export_encoding, SHIFT_JIS);
        assert_eq!(loaded.header, CanonicalHeader::default());
    }
}

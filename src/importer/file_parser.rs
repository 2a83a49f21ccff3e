// ==========================================
// 配送单号 CSV 导入 - CSV 读取器
// ==========================================
// 流程: 前缀判定编码 → 流式转 UTF-8 + 换行统一（写入临时文件）→ 惰性逐行读取
// 说明: 行迭代器只能单向遍历一次，不会把整个文件读入内存
// ==========================================

use crate::config::ImportSettings;
use crate::importer::encoding::{detect_encoding, transcode_to_utf8};
use crate::importer::error::{ImportError, ImportResult};
use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter};
use encoding_rs::Encoding;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

// ==========================================
// DecodedFile - 解码后内容的临时存储
// ==========================================
// Drop 时删除；删除失败只记日志
struct DecodedFile {
    inner: Option<NamedTempFile>,
}

impl Drop for DecodedFile {
    fn drop(&mut self) {
        if let Some(file) = self.inner.take() {
            let path = file.path().to_path_buf();
            match file.close() {
                Ok(()) => debug!(path = %path.display(), "解码临时文件已删除"),
                Err(e) => warn!(path = %path.display(), error = %e, "解码临时文件删除失败"),
            }
        }
    }
}

// ==========================================
// CsvRow - 一行数据
// ==========================================
#[derive(Debug, Clone)]
pub struct CsvRow {
    index: usize,
    headers: Arc<[String]>,
    record: StringRecord,
}

impl CsvRow {
    /// 数据行下标（0 起算，不含表头）
    pub fn index(&self) -> usize {
        self.index
    }

    /// 面向用户的行号（1 起算，不含表头）
    pub fn row_number(&self) -> usize {
        self.index + 1
    }

    /// 本行字段数
    pub fn len(&self) -> usize {
        self.record.len()
    }

    pub fn is_empty(&self) -> bool {
        self.record.is_empty()
    }

    /// 按表头列名取值（已 TRIM，含全角空格）
    pub fn get(&self, name: &str) -> Option<&str> {
        let position = self.headers.iter().position(|h| h == name)?;
        self.get_index(position)
    }

    /// 按列位置取值（已 TRIM）
    pub fn get_index(&self, position: usize) -> Option<&str> {
        self.record.get(position).map(str::trim)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }
}

// ==========================================
// CsvRows - 惰性行迭代器
// ==========================================
pub struct CsvRows {
    // 字段按声明顺序析构：先关闭读句柄，再删除临时文件
    records: StringRecordsIntoIter<File>,
    headers: Arc<[String]>,
    next_index: usize,
    source_encoding: &'static Encoding,
    _decoded: DecodedFile,
}

impl CsvRows {
    /// 文件表头（已 TRIM）
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// 判定出的源编码
    pub fn source_encoding(&self) -> &'static Encoding {
        self.source_encoding
    }
}

impl Iterator for CsvRows {
    type Item = ImportResult<CsvRow>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = match self.records.next()? {
            Ok(record) => record,
            Err(e) => return Some(Err(ImportError::from(e))),
        };
        let row = CsvRow {
            index: self.next_index,
            headers: Arc::clone(&self.headers),
            record,
        };
        self.next_index += 1;
        Some(Ok(row))
    }
}

// ==========================================
// CsvParser
// ==========================================
#[derive(Debug, Clone)]
pub struct CsvParser {
    delimiter: u8,
    enclosure: u8,
    detect_prefix_bytes: usize,
    detect_encodings: Vec<&'static Encoding>,
    temp_dir: PathBuf,
}

impl CsvParser {
    pub fn from_settings(settings: &ImportSettings) -> Self {
        Self {
            delimiter: settings.delimiter,
            enclosure: settings.enclosure,
            detect_prefix_bytes: settings.detect_prefix_bytes,
            detect_encodings: settings.detect_encodings.clone(),
            temp_dir: settings.temp_dir.clone(),
        }
    }

    /// 打开 CSV 文件，返回惰性行迭代器
    ///
    /// 第一行视为表头；解码内容写入临时目录，迭代器析构时删除
    pub fn open(&self, path: &Path) -> ImportResult<CsvRows> {
        let mut file = File::open(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ImportError::FileNotFound(path.display().to_string()),
            _ => ImportError::FileReadError(format!("{}: {}", path.display(), e)),
        })?;

        // === 编码判定 ===
        let mut prefix = Vec::with_capacity(self.detect_prefix_bytes);
        (&mut file)
            .take(self.detect_prefix_bytes as u64)
            .read_to_end(&mut prefix)?;
        let encoding = detect_encoding(&prefix, &self.detect_encodings);
        file.seek(SeekFrom::Start(0))?;

        // === 转码到临时文件 ===
        fs::create_dir_all(&self.temp_dir)?;
        let mut decoded = tempfile::Builder::new()
            .prefix("decoded_")
            .suffix(".csv")
            .tempfile_in(&self.temp_dir)?;
        let decoded_bytes = transcode_to_utf8(
            BufReader::new(file),
            encoding,
            BufWriter::new(decoded.as_file_mut()),
        )?;
        let decoded_file = decoded.reopen()?;
        let guard = DecodedFile {
            inner: Some(decoded),
        };

        info!(
            path = %path.display(),
            encoding = encoding.name(),
            decoded_bytes,
            "CSV 解码完成"
        );

        // === 表头 ===
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .quote(self.enclosure)
            .has_headers(true)
            .flexible(true) // 列数不一致由校验器报告
            .from_reader(decoded_file);

        let headers: Arc<[String]> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect::<Vec<_>>()
            .into();

        Ok(CsvRows {
            records: reader.into_records(),
            headers,
            next_index: 0,
            source_encoding: encoding,
            _decoded: guard,
        })
    }
}

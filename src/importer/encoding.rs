// ==========================================
// 配送单号 CSV 导入 - 字符编码判定与转换
// ==========================================
// 职责:
// - 根据文件前缀判定源编码（BOM 优先，其次按候选顺序试解码）
// - 流式转换为 UTF-8（严格模式，不做替换字符）
// - 统一换行符（CR / LF / CRLF → LF）
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use encoding_rs::{DecoderResult, Encoding, UTF_8};
use std::io::{ErrorKind, Read, Write};
use tracing::debug;

/// 流式转换的读块大小
const CHUNK_SIZE: usize = 8 * 1024;

// ==========================================
// 编码判定
// ==========================================

/// 根据前缀字节判定源编码
///
/// # 规则
/// 1. 存在 BOM 时以 BOM 为准（UTF-8 / UTF-16LE / UTF-16BE）
/// 2. 按候选顺序试解码前缀，首个无非法序列的编码胜出
///    （前缀末尾被截断的多字节序列不算非法）
/// 3. 均不匹配时回退 UTF-8，由后续严格转换报告错误位置
pub fn detect_encoding(prefix: &[u8], candidates: &[&'static Encoding]) -> &'static Encoding {
    if let Some((encoding, bom_len)) = Encoding::for_bom(prefix) {
        debug!(encoding = encoding.name(), bom_len, "根据 BOM 判定编码");
        return encoding;
    }

    let detected = candidates
        .iter()
        .copied()
        .find(|encoding| decodes_cleanly(encoding, prefix))
        .unwrap_or(UTF_8);
    debug!(
        encoding = detected.name(),
        prefix_len = prefix.len(),
        "根据前缀判定编码"
    );
    detected
}

fn decodes_cleanly(encoding: &'static Encoding, bytes: &[u8]) -> bool {
    let mut decoder = encoding.new_decoder_without_bom_handling();
    let Some(capacity) = decoder.max_utf8_buffer_length_without_replacement(bytes.len()) else {
        return false;
    };
    let mut out = String::with_capacity(capacity);
    let (result, _) = decoder.decode_to_string_without_replacement(bytes, &mut out, false);
    matches!(result, DecoderResult::InputEmpty)
}

// ==========================================
// 换行符统一
// ==========================================

/// 跨块的换行符统一器（块尾的 CR 需要看到下一块首字符才能决定）
#[derive(Debug, Default)]
pub struct LineFeedNormalizer {
    pending_cr: bool,
}

impl LineFeedNormalizer {
    pub fn push(&mut self, input: &str, out: &mut String) {
        for ch in input.chars() {
            if self.pending_cr {
                self.pending_cr = false;
                out.push('\n');
                if ch == '\n' {
                    continue;
                }
            }
            if ch == '\r' {
                self.pending_cr = true;
            } else {
                out.push(ch);
            }
        }
    }

    pub fn finish(&mut self, out: &mut String) {
        if self.pending_cr {
            self.pending_cr = false;
            out.push('\n');
        }
    }
}

/// 一次性统一换行符
pub fn normalize_line_feeds(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut normalizer = LineFeedNormalizer::default();
    normalizer.push(text, &mut out);
    normalizer.finish(&mut out);
    out
}

// ==========================================
// 流式转换
// ==========================================

fn read_chunk<R: Read>(input: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    loop {
        match input.read(buf) {
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

/// 将输入按指定编码解码为 UTF-8 并统一换行符后写出
///
/// 与编码匹配的 BOM 会被去除。遇到无法解码的字节序列时返回
/// `ImportError::EncodingError`，偏移量为源字节位置。
///
/// # 返回
/// - 写出的 UTF-8 字节数
pub fn transcode_to_utf8<R: Read, W: Write>(
    mut input: R,
    encoding: &'static Encoding,
    mut output: W,
) -> ImportResult<u64> {
    let mut decoder = encoding.new_decoder_with_bom_removal();
    let mut normalizer = LineFeedNormalizer::default();
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut decoded = String::new();
    let mut normalized = String::new();
    let mut consumed: u64 = 0;
    let mut written: u64 = 0;

    loop {
        let n = read_chunk(&mut input, &mut buf)?;
        let last = n == 0;
        let mut chunk = &buf[..n];

        loop {
            let needed = decoder
                .max_utf8_buffer_length_without_replacement(chunk.len())
                .unwrap_or(CHUNK_SIZE * 4);
            decoded.clear();
            decoded.reserve(needed);

            let (result, read) = decoder.decode_to_string_without_replacement(chunk, &mut decoded, last);
            consumed += read as u64;
            chunk = &chunk[read..];
            normalizer.push(&decoded, &mut normalized);

            match result {
                DecoderResult::InputEmpty => break,
                DecoderResult::OutputFull => continue,
                DecoderResult::Malformed(bad, extra) => {
                    return Err(ImportError::EncodingError {
                        encoding: encoding.name().to_string(),
                        offset: consumed.saturating_sub(u64::from(bad) + u64::from(extra)),
                    });
                }
            }
        }

        if last {
            normalizer.finish(&mut normalized);
        }
        output.write_all(normalized.as_bytes())?;
        written += normalized.len() as u64;
        normalized.clear();

        if last {
            break;
        }
    }

    output.flush()?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::{EUC_JP, SHIFT_JIS, UTF_16LE};
    use std::io::Cursor;

    fn candidates() -> Vec<&'static Encoding> {
        vec![UTF_8, SHIFT_JIS, EUC_JP]
    }

    fn transcode(bytes: &[u8], encoding: &'static Encoding) -> ImportResult<String> {
        let mut out = Vec::new();
        transcode_to_utf8(Cursor::new(bytes), encoding, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_detect_utf8_and_ascii() {
        assert_eq!(detect_encoding("注文番号,配送伝票番号".as_bytes(), &candidates()), UTF_8);
        assert_eq!(detect_encoding(b"orderId,shipNumber", &candidates()), UTF_8);
    }

    #[test]
    fn test_detect_shift_jis() {
        let (bytes, _, _) = SHIFT_JIS.encode("注文番号,配送伝票番号\n1001,YT-555\n");
        assert_eq!(detect_encoding(&bytes, &candidates()), SHIFT_JIS);
    }

    #[test]
    fn test_detect_and_transcode_euc_jp() {
        let source = "注文番号,配送伝票番号\n1001,YT-555\n";
        let (bytes, _, _) = EUC_JP.encode(source);
        assert_eq!(detect_encoding(&bytes, &candidates()), EUC_JP);
        assert_eq!(transcode(&bytes, EUC_JP).unwrap(), source);
    }

    #[test]
    fn test_detect_tolerates_truncated_prefix() {
        // 截断在多字节字符中间
        let bytes = "注文番号".as_bytes();
        assert_eq!(detect_encoding(&bytes[..4], &candidates()), UTF_8);
    }

    #[test]
    fn test_detect_bom_wins() {
        let mut bytes = vec![0xFF, 0xFE];
        bytes.extend_from_slice(b"a\0b\0");
        assert_eq!(detect_encoding(&bytes, &candidates()), UTF_16LE);
    }

    #[test]
    fn test_normalize_line_feeds() {
        assert_eq!(normalize_line_feeds("a\r\nb\rc\nd\r"), "a\nb\nc\nd\n");
        assert_eq!(normalize_line_feeds("a\r\r\nb"), "a\n\nb");
    }

    #[test]
    fn test_normalizer_handles_cr_split_across_chunks() {
        let mut normalizer = LineFeedNormalizer::default();
        let mut out = String::new();
        normalizer.push("a\r", &mut out);
        normalizer.push("\nb", &mut out);
        normalizer.finish(&mut out);
        assert_eq!(out, "a\nb");
    }

    #[test]
    fn test_transcode_shift_jis_with_crlf() {
        let (bytes, _, _) = SHIFT_JIS.encode("注文番号,配送伝票番号\r\n1001,ヤマト-555\r\n");
        let text = transcode(&bytes, SHIFT_JIS).unwrap();
        assert_eq!(text, "注文番号,配送伝票番号\n1001,ヤマト-555\n");
    }

    #[test]
    fn test_transcode_strips_utf8_bom() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice("注文番号\r".as_bytes());
        assert_eq!(transcode(&bytes, UTF_8).unwrap(), "注文番号\n");
    }

    #[test]
    fn test_transcode_large_input_spanning_chunks() {
        let line = "1001,ＹＴ５５５\r\n";
        let source: String = line.repeat(2_000);
        let (bytes, _, _) = SHIFT_JIS.encode(&source);
        assert!(bytes.len() > CHUNK_SIZE);

        let text = transcode(&bytes, SHIFT_JIS).unwrap();
        assert_eq!(text, "1001,ＹＴ５５５\n".repeat(2_000));
    }

    #[test]
    fn test_transcode_reports_malformed_offset() {
        let mut bytes = b"abc,".to_vec();
        bytes.push(0xFF);
        let err = transcode(&bytes, UTF_8).unwrap_err();
        match err {
            ImportError::EncodingError { encoding, offset } => {
                assert_eq!(encoding, "UTF-8");
                assert_eq!(offset, 4);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

//! JSON 编码工具
//!
//! 按 [`JsonOptions`] 输出紧凑或美化的 JSON，并可选地把非 ASCII 字符转义为 `\uXXXX`。

use crate::config::JsonOptions;
use serde::Serialize;

/// 按选项编码任意可序列化的值
pub fn encode<T: Serialize + ?Sized>(value: &T, options: &JsonOptions) -> serde_json::Result<String> {
    let text = if options.pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };

    if options.escape_unicode {
        Ok(escape_non_ascii(&text))
    } else {
        Ok(text)
    }
}

/// 将非 ASCII 字符替换为 UTF-16 转义序列。
///
/// JSON 的结构字符都是 ASCII，因此非 ASCII 字符只可能出现在字符串字面量内部，
/// 逐字符替换后仍是合法的 JSON。
pub fn escape_non_ascii(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    let mut units = [0u16; 2];

    for ch in json.chars() {
        if ch.is_ascii() {
            out.push(ch);
        } else {
            for unit in ch.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }

    out
}

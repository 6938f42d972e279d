//! 类型化数据的行式文本编解码
//!
//! 每个条目一行 `key:value`，条目之间以 `\n` 分隔（末尾无换行）。
//! 复合类型按固定分量顺序以逗号连接（x,y,z / r,g,b,a）。
//!
//! 解码按行进行：坏行记录错误日志后跳过，不影响其余条目。

use crate::models::{Color, Vector3};
use std::fmt::Debug;
use thiserror::Error;

/// 单行解码错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("无法解析空行")]
    EmptyLine,

    #[error("缺少分隔符 ':'")]
    MissingSeparator,

    #[error("缺少键名")]
    EmptyKey,

    #[error("缺少值")]
    EmptyValue,

    #[error("无效的 {field} 值: {raw:?}")]
    InvalidNumber { field: &'static str, raw: String },
}

/// 可存入 [`TypedStore`](crate::services::typed_store::TypedStore) 的值类型
///
/// 每个实现对应一个持久化 blob（`<profile><BLOB_SUFFIX>`）。
pub trait StoredValue: Clone + PartialEq + Debug + 'static {
    /// 日志中使用的类型名
    const TYPE_NAME: &'static str;

    /// 持久化键后缀
    const BLOB_SUFFIX: &'static str;

    /// 编码值部分（不含键）
    fn encode_value(&self) -> String;

    /// 解码值部分（不含键）
    fn decode_value(raw: &str) -> Result<Self, CodecError>;

    /// 是否视为“已设置”：值不等于该类型的哨兵零值
    fn is_present(&self) -> bool;

    /// 写入去重使用的相等判断（浮点分量 NaN 与 NaN 视为相同）
    fn same_value(&self, other: &Self) -> bool {
        self == other
    }
}

impl StoredValue for i32 {
    const TYPE_NAME: &'static str = "int";
    const BLOB_SUFFIX: &'static str = "_IntData";

    fn encode_value(&self) -> String {
        self.to_string()
    }

    fn decode_value(raw: &str) -> Result<Self, CodecError> {
        parse_number(raw, "int")
    }

    fn is_present(&self) -> bool {
        *self != 0
    }
}

impl StoredValue for f32 {
    const TYPE_NAME: &'static str = "float";
    const BLOB_SUFFIX: &'static str = "_FloatData";

    fn encode_value(&self) -> String {
        self.to_string()
    }

    fn decode_value(raw: &str) -> Result<Self, CodecError> {
        parse_number(raw, "float")
    }

    fn is_present(&self) -> bool {
        *self != 0.0
    }

    fn same_value(&self, other: &Self) -> bool {
        same_float(*self, *other)
    }
}

impl StoredValue for String {
    const TYPE_NAME: &'static str = "string";
    const BLOB_SUFFIX: &'static str = "_StringData";

    fn encode_value(&self) -> String {
        self.clone()
    }

    fn decode_value(raw: &str) -> Result<Self, CodecError> {
        Ok(raw.to_string())
    }

    fn is_present(&self) -> bool {
        !self.is_empty()
    }
}

impl StoredValue for Vector3 {
    const TYPE_NAME: &'static str = "vector3";
    const BLOB_SUFFIX: &'static str = "_Vector3Data";

    fn encode_value(&self) -> String {
        format!("{},{},{}", self.x, self.y, self.z)
    }

    fn decode_value(raw: &str) -> Result<Self, CodecError> {
        let [x, y, z] = parse_components::<3>(raw, ["x", "y", "z"])?;
        Ok(Vector3::new(x, y, z))
    }

    fn is_present(&self) -> bool {
        *self != Vector3::ZERO
    }

    fn same_value(&self, other: &Self) -> bool {
        same_float(self.x, other.x) && same_float(self.y, other.y) && same_float(self.z, other.z)
    }
}

impl StoredValue for Color {
    const TYPE_NAME: &'static str = "color";
    const BLOB_SUFFIX: &'static str = "_ColorData";

    fn encode_value(&self) -> String {
        format!("{},{},{},{}", self.r, self.g, self.b, self.a)
    }

    fn decode_value(raw: &str) -> Result<Self, CodecError> {
        let [r, g, b, a] = parse_components::<4>(raw, ["r", "g", "b", "a"])?;
        Ok(Color::new(r, g, b, a))
    }

    fn is_present(&self) -> bool {
        *self != Color::BLACK
    }

    fn same_value(&self, other: &Self) -> bool {
        same_float(self.r, other.r)
            && same_float(self.g, other.g)
            && same_float(self.b, other.b)
            && same_float(self.a, other.a)
    }
}

/// `0.0 == -0.0`，且 NaN 与 NaN 相同
fn same_float(a: f32, b: f32) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

/// 解析数值，容忍首尾空白与指数写法（`1E-07`）
fn parse_number<N: std::str::FromStr>(raw: &str, field: &'static str) -> Result<N, CodecError> {
    raw.trim().parse().map_err(|_| CodecError::InvalidNumber {
        field,
        raw: raw.to_string(),
    })
}

/// 按位置解析逗号分隔的分量；缺失的尾部分量取 0，多余分量忽略
fn parse_components<const N: usize>(
    raw: &str,
    fields: [&'static str; N],
) -> Result<[f32; N], CodecError> {
    let mut out = [0.0f32; N];
    for (i, part) in raw.split(',').take(N).enumerate() {
        out[i] = parse_number(part, fields[i])?;
    }
    Ok(out)
}

/// 编码单个条目
pub fn serialize_entry<T: StoredValue>(key: &str, value: &T) -> String {
    format!("{}:{}", key, value.encode_value())
}

/// 编码整个类型化映射
pub fn serialize_entries<T: StoredValue>(entries: &[(String, T)]) -> String {
    entries
        .iter()
        .map(|(k, v)| serialize_entry(k, v))
        .collect::<Vec<_>>()
        .join("\n")
}

/// 解码单行
pub fn deserialize_line<T: StoredValue>(line: &str) -> Result<(String, T), CodecError> {
    if line.is_empty() {
        return Err(CodecError::EmptyLine);
    }

    let split_index = line.find(':').ok_or(CodecError::MissingSeparator)?;
    if split_index == 0 {
        return Err(CodecError::EmptyKey);
    }
    if split_index == line.len() - 1 {
        return Err(CodecError::EmptyValue);
    }

    let key = &line[..split_index];
    let value = T::decode_value(&line[split_index + 1..])?;
    Ok((key.to_string(), value))
}

/// 解码整个 blob 明文，空行跳过，坏行记录日志后跳过
pub fn deserialize_blob<T: StoredValue>(text: &str) -> Vec<(String, T)> {
    let mut entries = Vec::new();
    for line in text.split('\n') {
        if line.is_empty() {
            continue;
        }
        match deserialize_line::<T>(line) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                tracing::error!(value_type = T::TYPE_NAME, line = %line, error = %e, "反序列化失败，跳过该条目");
            }
        }
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_joins_without_trailing_newline() {
        let entries = vec![("a".to_string(), 1), ("b".to_string(), -2)];
        assert_eq!(serialize_entries(&entries), "a:1\nb:-2");
        assert_eq!(serialize_entries::<i32>(&[]), "");
    }

    #[test]
    fn test_composite_encoding_field_order() {
        assert_eq!(
            serialize_entry("pos", &Vector3::new(1.5, -2.0, 0.25)),
            "pos:1.5,-2,0.25"
        );
        assert_eq!(
            serialize_entry("tint", &Color::new(0.1, 0.2, 0.3, 1.0)),
            "tint:0.1,0.2,0.3,1"
        );
    }

    #[test]
    fn test_string_value_may_contain_colons() {
        let (key, value) = deserialize_line::<String>("url:http://example.com:8080").unwrap();
        assert_eq!(key, "url");
        assert_eq!(value, "http://example.com:8080");
    }

    #[test]
    fn test_rejects_malformed_lines() {
        assert_eq!(deserialize_line::<i32>(""), Err(CodecError::EmptyLine));
        assert_eq!(
            deserialize_line::<i32>("novalue"),
            Err(CodecError::MissingSeparator)
        );
        assert_eq!(deserialize_line::<i32>(":5"), Err(CodecError::EmptyKey));
        assert_eq!(deserialize_line::<i32>("k:"), Err(CodecError::EmptyValue));
        assert!(matches!(
            deserialize_line::<i32>("k:abc"),
            Err(CodecError::InvalidNumber { field: "int", .. })
        ));
        assert!(deserialize_line::<f32>("k:1.2.3").is_err());
    }

    #[test]
    fn test_partial_composite_defaults_missing_components() {
        let (_, v) = deserialize_line::<Vector3>("v:1,2").unwrap();
        assert_eq!(v, Vector3::new(1.0, 2.0, 0.0));

        let (_, c) = deserialize_line::<Color>("c:0.5").unwrap();
        assert_eq!(c, Color::new(0.5, 0.0, 0.0, 0.0));
    }

    #[test]
    fn test_surplus_components_ignored() {
        let (_, v) = deserialize_line::<Vector3>("v:1,2,3,4").unwrap();
        assert_eq!(v, Vector3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_present_bad_component_rejects_entry() {
        assert_eq!(
            deserialize_line::<Vector3>("v:1,oops,3"),
            Err(CodecError::InvalidNumber {
                field: "y",
                raw: "oops".to_string()
            })
        );
        assert!(deserialize_line::<Color>("c:1,1,,1").is_err());
    }

    #[test]
    fn test_accepts_exponent_and_padded_numbers() {
        let (_, f) = deserialize_line::<f32>("tiny:1E-07").unwrap();
        assert_eq!(f, 1e-7);

        let (_, i) = deserialize_line::<i32>("n: 42 ").unwrap();
        assert_eq!(i, 42);
    }

    #[test]
    fn test_blob_skips_bad_lines_and_keeps_the_rest() {
        let blob = "a:1\n\nbroken\nb:x\nc:3";
        let entries = deserialize_blob::<i32>(blob);
        assert_eq!(
            entries,
            vec![("a".to_string(), 1), ("c".to_string(), 3)]
        );
    }

    #[test]
    fn test_float_roundtrip_is_exact() {
        let values = [0.1f32, 1.0 / 3.0, -12345.678, f32::MIN_POSITIVE, 3.0e38];
        for v in values {
            let line = serialize_entry("f", &v);
            let (_, decoded) = deserialize_line::<f32>(&line).unwrap();
            assert_eq!(decoded, v, "line {line}");
        }
    }

    #[test]
    fn test_presence_sentinels() {
        assert!(!0i32.is_present());
        assert!(7i32.is_present());
        assert!(!0.0f32.is_present());
        assert!(!String::new().is_present());
        assert!(!Vector3::ZERO.is_present());
        assert!(!Color::BLACK.is_present());
        assert!(Color::CLEAR.is_present());
    }

    #[test]
    fn test_same_value_treats_nan_as_equal() {
        assert!(f32::NAN.same_value(&f32::NAN));
        assert!(0.0f32.same_value(&-0.0));
        assert!(!1.0f32.same_value(&f32::NAN));
        assert!(Vector3::new(f32::NAN, 1.0, 2.0).same_value(&Vector3::new(f32::NAN, 1.0, 2.0)));
        assert!(!Vector3::new(f32::NAN, 1.0, 2.0).same_value(&Vector3::new(f32::NAN, 1.0, 3.0)));
        assert!(Color::new(0.5, f32::NAN, 0.0, 1.0).same_value(&Color::new(0.5, f32::NAN, 0.0, 1.0)));
        assert!(7i32.same_value(&7));
        assert!(!"a".to_string().same_value(&"b".to_string()));
    }
}

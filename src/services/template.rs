//! 模板字符串插值
//!
//! 从左到右扫描 `[key]` / `[key(format)]` 令牌：
//! - 带格式的令牌按整数键取值并格式化
//! - 不带格式的令牌按字符串键取值
//! - 取不到值（零值 / 空串视为未设置）时令牌被移除，前后文本保留
//!
//! 替换进来的文本不会被再次扫描；遇到无法配对的括号时停止扫描，剩余部分原样保留。

/// 模板取值来源
///
/// 返回 `None` 表示键“未设置”（按零值 / 空串判定）。
pub trait TokenSource {
    fn int_value(&self, key: &str) -> Option<i32>;
    fn string_value(&self, key: &str) -> Option<String>;
}

/// 展开模板
pub fn parse_template(template: &str, source: &dyn TokenSource) -> String {
    let mut s = template.to_string();
    let mut cursor = 0;

    while cursor < s.len() {
        let start = match s[cursor..].find('[') {
            Some(i) => cursor + i,
            None => break,
        };
        let end = match s[cursor..].find(']') {
            Some(i) => cursor + i,
            None => break,
        };
        if end < start {
            break;
        }

        let body = &s[start + 1..end];
        let replacement = match body.find('(') {
            Some(open) => {
                let key = &body[..open];
                let rest = &body[open + 1..];
                let format = rest.find(')').map_or(rest, |close| &rest[..close]);
                source.int_value(key).map(|v| format_int(v, format))
            }
            None => source.string_value(body),
        };

        let replacement = replacement.unwrap_or_else(|| {
            tracing::trace!(token = %&s[start..=end], "模板令牌未解析，已移除");
            String::new()
        });

        s.replace_range(start..=end, &replacement);
        cursor = start + replacement.len();
    }

    s
}

/// 格式说明符允许的最大精度
pub const MAX_FORMAT_PRECISION: usize = 99;

/// 按数值格式说明符格式化整数
///
/// 支持 `D`（补零）、`N`（千分位，默认 2 位小数）、`F`（定点，默认 2 位小数）、
/// `X`/`x`（十六进制，补零）、`G`/空（原样）。
/// 精度超过 [`MAX_FORMAT_PRECISION`] 时按原样输出。
pub fn format_int(value: i32, format: &str) -> String {
    let mut chars = format.chars();
    let kind = match chars.next() {
        Some(c) => c,
        None => return value.to_string(),
    };
    let digits = chars.as_str();
    let precision = if digits.is_empty() {
        None
    } else {
        match digits.parse::<usize>() {
            Ok(p) if p <= MAX_FORMAT_PRECISION => Some(p),
            Ok(_) => {
                tracing::debug!(format = %format, max = MAX_FORMAT_PRECISION, "数值格式精度超出上限，按原样输出");
                return value.to_string();
            }
            Err(_) => {
                tracing::debug!(format = %format, "未知的数值格式，按原样输出");
                return value.to_string();
            }
        }
    };

    match kind {
        'D' | 'd' => {
            let width = precision.unwrap_or(0);
            let sign = if value < 0 { "-" } else { "" };
            format!("{}{:0>width$}", sign, value.unsigned_abs(), width = width)
        }
        'N' | 'n' => {
            let sign = if value < 0 { "-" } else { "" };
            let grouped = group_thousands(value.unsigned_abs());
            with_decimals(format!("{sign}{grouped}"), precision.unwrap_or(2))
        }
        'F' | 'f' => with_decimals(value.to_string(), precision.unwrap_or(2)),
        'X' => format!("{:0>width$X}", value as u32, width = precision.unwrap_or(0)),
        'x' => format!("{:0>width$x}", value as u32, width = precision.unwrap_or(0)),
        'G' | 'g' => value.to_string(),
        _ => {
            tracing::debug!(format = %format, "未知的数值格式，按原样输出");
            value.to_string()
        }
    }
}

fn group_thousands(n: u32) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn with_decimals(mut integral: String, decimals: usize) -> String {
    if decimals > 0 {
        integral.push('.');
        integral.extend(std::iter::repeat('0').take(decimals));
    }
    integral
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MapSource {
        ints: HashMap<String, i32>,
        strings: HashMap<String, String>,
    }

    impl MapSource {
        fn int(mut self, k: &str, v: i32) -> Self {
            self.ints.insert(k.to_string(), v);
            self
        }

        fn string(mut self, k: &str, v: &str) -> Self {
            self.strings.insert(k.to_string(), v.to_string());
            self
        }
    }

    impl TokenSource for MapSource {
        fn int_value(&self, key: &str) -> Option<i32> {
            self.ints.get(key).copied().filter(|v| *v != 0)
        }

        fn string_value(&self, key: &str) -> Option<String> {
            self.strings.get(key).cloned().filter(|v| !v.is_empty())
        }
    }

    #[test]
    fn test_formatted_int_token() {
        let source = MapSource::default().int("score", 42);
        assert_eq!(parse_template("Score: [score(D3)]", &source), "Score: 042");
    }

    #[test]
    fn test_missing_token_is_dropped() {
        let source = MapSource::default();
        assert_eq!(parse_template("[missing]", &source), "");
        assert_eq!(
            parse_template("Hi [who], bye", &source),
            "Hi , bye"
        );
    }

    #[test]
    fn test_zero_int_reads_as_absent() {
        let source = MapSource::default().int("lives", 0);
        assert_eq!(parse_template("Lives: [lives(D2)]!", &source), "Lives: !");
    }

    #[test]
    fn test_plain_token_uses_string_store() {
        let source = MapSource::default().string("name", "Ada").int("name", 5);
        assert_eq!(parse_template("Hello [name]!", &source), "Hello Ada!");
    }

    #[test]
    fn test_multiple_tokens() {
        let source = MapSource::default()
            .string("name", "Ada")
            .int("gold", 1234567);
        assert_eq!(
            parse_template("[name] has [gold(N0)] gold ([gold(D)])", &source),
            "Ada has 1,234,567 gold (1234567)"
        );
    }

    #[test]
    fn test_substituted_text_is_not_rescanned() {
        let source = MapSource::default()
            .string("a", "[b]")
            .string("b", "nope");
        assert_eq!(parse_template("x[a]y", &source), "x[b]y");
    }

    #[test]
    fn test_unmatched_brackets_stop_scanning() {
        let source = MapSource::default().string("k", "v");
        assert_eq!(parse_template("[k] and [k", &source), "v and [k");
        assert_eq!(parse_template("a ] [k]", &source), "a ] [k]");
        assert_eq!(parse_template("no tokens", &source), "no tokens");
        assert_eq!(parse_template("", &source), "");
    }

    #[test]
    fn test_unicode_around_tokens() {
        let source = MapSource::default().string("名字", "小明");
        assert_eq!(parse_template("你好，[名字]！", &source), "你好，小明！");
    }

    #[test]
    fn test_format_int_specifiers() {
        assert_eq!(format_int(42, "D3"), "042");
        assert_eq!(format_int(-42, "D4"), "-0042");
        assert_eq!(format_int(12345, "D2"), "12345");
        assert_eq!(format_int(1234, "N"), "1,234.00");
        assert_eq!(format_int(-1234567, "N0"), "-1,234,567");
        assert_eq!(format_int(999, "N0"), "999");
        assert_eq!(format_int(7, "F1"), "7.0");
        assert_eq!(format_int(7, "F"), "7.00");
        assert_eq!(format_int(255, "X4"), "00FF");
        assert_eq!(format_int(255, "x"), "ff");
        assert_eq!(format_int(-1, "X"), "FFFFFFFF");
        assert_eq!(format_int(5, ""), "5");
        assert_eq!(format_int(5, "G"), "5");
        assert_eq!(format_int(5, "Q"), "5");
        assert_eq!(format_int(5, "Dx"), "5");
    }

    #[test]
    fn test_format_int_precision_out_of_range() {
        assert_eq!(format_int(42, "D99").len(), 99);
        assert_eq!(format_int(42, "D100"), "42");
        assert_eq!(format_int(42, "D70000"), "42");
        assert_eq!(format_int(255, "X70000"), "255");
        assert_eq!(format_int(42, "F100000000"), "42");
        assert_eq!(format_int(42, "N99999999999"), "42");
        // 超出 usize 的精度同样按原样输出
        assert_eq!(format_int(42, "F99999999999999999999999"), "42");
    }

    #[test]
    fn test_huge_precision_in_template() {
        let source = MapSource::default().int("score", 42);
        assert_eq!(
            parse_template("Score: [score(D70000)]", &source),
            "Score: 42"
        );
    }
}

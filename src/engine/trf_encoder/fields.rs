// ==========================================
// TRF 定宽字段
// ==========================================
// 规则: 超长截断，不足右侧补空格；宽度按字符计
// ==========================================

/// 定宽字段（换行符替换为空格，避免破坏行结构）
pub fn fixed_width(value: &str, width: usize) -> String {
    let mut out: String = value
        .chars()
        .map(|c| if c == '\r' || c == '\n' { ' ' } else { c })
        .take(width)
        .collect();
    let len = out.chars().count();
    out.extend(std::iter::repeat(' ').take(width - len));
    out
}

/// 单行 TRF 记录构建器
#[derive(Debug, Clone)]
pub struct TrfLine {
    buf: String,
}

impl TrfLine {
    /// tag 例: "ORD" → "<ORD>"
    pub fn new(tag: &str) -> Self {
        Self {
            buf: format!("<{}>", tag),
        }
    }

    pub fn field(mut self, value: &str, width: usize) -> Self {
        self.buf.push_str(&fixed_width(value, width));
        self
    }

    /// 追加 CRLF 并写入文档
    pub fn write_to(self, content: &mut String) {
        content.push_str(&self.buf);
        content.push_str("\r\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_and_truncate() {
        assert_eq!(fixed_width("AB", 5), "AB   ");
        assert_eq!(fixed_width("ABCDEFG", 3), "ABC");
        assert_eq!(fixed_width("", 2), "  ");
        assert_eq!(fixed_width("a\r\nb", 4), "a  b");
    }

    #[test]
    fn test_width_counts_characters() {
        // 多字节字符按字符计宽
        assert_eq!(fixed_width("شیشه", 6).chars().count(), 6);
        assert_eq!(fixed_width("玻璃玻璃", 2), "玻璃");
    }

    #[test]
    fn test_line_layout() {
        let mut content = String::new();
        TrfLine::new("POS").field("1", 3).field("ID", 4).write_to(&mut content);
        assert_eq!(content, "<POS>1  ID  \r\n");
    }
}

/// 单次扫描的模板渲染
///
/// 模板中的 `{name}` 会被替换为 `values` 中同名的值；未知占位符原样保留。
/// 替换进来的文本不会再被扫描，因此输入内容中的花括号不会触发二次替换。
pub fn render_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        output.push_str(&rest[..open]);
        let after_open = &rest[open + 1..];

        let replaced = after_open.find('}').and_then(|close| {
            let name = &after_open[..close];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });

        match replaced {
            Some((value, close)) => {
                output.push_str(value);
                rest = &after_open[close + 1..];
            }
            None => {
                output.push('{');
                rest = after_open;
            }
        }
    }

    output.push_str(rest);
    output
}

/// 按字符（而非字节）截断文本
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

/// 将连续空白折叠为单个空格并去除首尾空白
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

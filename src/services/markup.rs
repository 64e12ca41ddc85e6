//! HTML 片段的结构化比较
//!
//! 撤回说明的比较不能按字节比较：属性顺序、空白、注释、实体写法都可能不同。
//! 这里把片段解析成一棵简单的树再比较。
//!
//! 规则：
//! - 标签名不区分大小写
//! - 属性按名称比较，与顺序无关
//! - 文本中的连续空白折叠为一个空格，首尾空白忽略，空文本节点丢弃
//! - 注释、doctype、处理指令忽略
//! - 子节点顺序有意义

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// 解析后的节点
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element {
        name: String,
        attributes: BTreeMap<String, String>,
        children: Vec<Node>,
    },
    Text(String),
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

fn tag_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"<(/)?([A-Za-z][A-Za-z0-9:-]*)((?:\s+[^\s/>="']+(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'>]+))?)*)\s*(/)?>"#,
        )
        .expect("valid tag regex")
    })
}

fn attribute_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"([^\s/>="']+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#)
            .expect("valid attribute regex")
    })
}

fn ignored_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<!--.*?-->|<![^>]*>|<\?.*?\?>").expect("valid comment regex"))
}

fn whitespace() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace regex"))
}

/// 两个 HTML 片段是否结构等价
pub fn equivalent(left: &str, right: &str) -> bool {
    parse(left) == parse(right)
}

/// 解析 HTML 片段
///
/// 容错解析：多余的结束标签忽略，未闭合的元素在片段末尾自动闭合
pub fn parse(markup: &str) -> Vec<Node> {
    let cleaned = ignored_pattern().replace_all(markup, "");

    // 栈底是虚拟根节点
    let mut stack: Vec<(String, BTreeMap<String, String>, Vec<Node>)> =
        vec![(String::new(), BTreeMap::new(), Vec::new())];
    let mut cursor = 0;

    for caps in tag_pattern().captures_iter(&cleaned) {
        let Some(whole) = caps.get(0) else { continue };
        push_text(&mut stack, &cleaned[cursor..whole.start()]);
        cursor = whole.end();

        let name = caps[2].to_ascii_lowercase();
        let closing = caps.get(1).is_some();

        if closing {
            close_element(&mut stack, &name);
            continue;
        }

        let attributes = parse_attributes(caps.get(3).map_or("", |m| m.as_str()));
        let self_closing = caps.get(4).is_some() || VOID_ELEMENTS.contains(&name.as_str());

        if self_closing {
            if let Some(parent) = stack.last_mut() {
                parent.2.push(Node::Element {
                    name,
                    attributes,
                    children: Vec::new(),
                });
            }
        } else {
            stack.push((name, attributes, Vec::new()));
        }
    }
    push_text(&mut stack, &cleaned[cursor..]);

    while stack.len() > 1 {
        pop_into_parent(&mut stack);
    }

    stack.pop().map(|(_, _, children)| children).unwrap_or_default()
}

fn parse_attributes(raw: &str) -> BTreeMap<String, String> {
    attribute_pattern()
        .captures_iter(raw)
        .map(|caps| {
            let name = caps[1].to_ascii_lowercase();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map_or("", |m| m.as_str());
            (name, normalize_text(value))
        })
        .collect()
}

fn push_text(stack: &mut [(String, BTreeMap<String, String>, Vec<Node>)], raw: &str) {
    let text = normalize_text(raw);
    if text.is_empty() {
        return;
    }
    let Some((_, _, children)) = stack.last_mut() else {
        return;
    };
    // 注释被删除后可能出现相邻的文本节点
    if let Some(Node::Text(previous)) = children.last_mut() {
        previous.push(' ');
        previous.push_str(&text);
    } else {
        children.push(Node::Text(text));
    }
}

fn close_element(stack: &mut Vec<(String, BTreeMap<String, String>, Vec<Node>)>, name: &str) {
    let Some(depth) = stack.iter().skip(1).rposition(|(open, _, _)| open == name) else {
        return;
    };
    // rposition 基于 skip(1) 之后的下标
    let target = depth + 1;
    while stack.len() > target {
        pop_into_parent(stack);
    }
}

fn pop_into_parent(stack: &mut Vec<(String, BTreeMap<String, String>, Vec<Node>)>) {
    if stack.len() <= 1 {
        return;
    }
    if let Some((name, attributes, children)) = stack.pop() {
        if let Some(parent) = stack.last_mut() {
            parent.2.push(Node::Element {
                name,
                attributes,
                children,
            });
        }
    }
}

fn normalize_text(raw: &str) -> String {
    let decoded = decode_entities(raw);
    whitespace().replace_all(decoded.trim(), " ").into_owned()
}

fn entity_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"&(?:#([0-9]{1,7})|#[xX]([0-9A-Fa-f]{1,6})|([A-Za-z][A-Za-z0-9]{1,31}));")
            .expect("valid entity regex")
    })
}

/// 常见命名实体，未知的命名实体保持原样
const NAMED_ENTITIES: &[(&str, char)] = &[
    ("amp", '&'),
    ("lt", '<'),
    ("gt", '>'),
    ("quot", '"'),
    ("apos", '\''),
    ("nbsp", ' '),
    ("lsquo", '\u{2018}'),
    ("rsquo", '\u{2019}'),
    ("sbquo", '\u{201A}'),
    ("ldquo", '\u{201C}'),
    ("rdquo", '\u{201D}'),
    ("bdquo", '\u{201E}'),
    ("laquo", '\u{00AB}'),
    ("raquo", '\u{00BB}'),
    ("ndash", '\u{2013}'),
    ("mdash", '\u{2014}'),
    ("hellip", '\u{2026}'),
    ("bull", '\u{2022}'),
    ("middot", '\u{00B7}'),
    ("copy", '\u{00A9}'),
    ("reg", '\u{00AE}'),
    ("trade", '\u{2122}'),
    ("pound", '\u{00A3}'),
    ("euro", '\u{20AC}'),
    ("cent", '\u{00A2}'),
    ("yen", '\u{00A5}'),
    ("sect", '\u{00A7}'),
    ("para", '\u{00B6}'),
    ("deg", '\u{00B0}'),
    ("times", '\u{00D7}'),
    ("divide", '\u{00F7}'),
    ("frac12", '\u{00BD}'),
    ("frac14", '\u{00BC}'),
    ("frac34", '\u{00BE}'),
    ("shy", '\u{00AD}'),
    ("zwnj", '\u{200C}'),
    ("zwj", '\u{200D}'),
    ("ensp", '\u{2002}'),
    ("emsp", '\u{2003}'),
    ("thinsp", '\u{2009}'),
    ("eacute", '\u{00E9}'),
    ("egrave", '\u{00E8}'),
    ("aacute", '\u{00E1}'),
    ("agrave", '\u{00E0}'),
    ("uuml", '\u{00FC}'),
    ("ouml", '\u{00F6}'),
    ("auml", '\u{00E4}'),
    ("ccedil", '\u{00E7}'),
];

fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    entity_pattern()
        .replace_all(raw, |caps: &regex::Captures<'_>| {
            let decoded = if let Some(dec) = caps.get(1) {
                dec.as_str().parse().ok().and_then(char::from_u32)
            } else if let Some(hex) = caps.get(2) {
                u32::from_str_radix(hex.as_str(), 16).ok().and_then(char::from_u32)
            } else {
                caps.get(3).and_then(|name| {
                    NAMED_ENTITIES
                        .iter()
                        .find(|(entity, _)| *entity == name.as_str())
                        .map(|(_, c)| *c)
                })
            };
            match decoded {
                // U+00A0 与普通空格等价，随后一起折叠
                Some('\u{00A0}') => " ".to_string(),
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

//! 说明文本渲染 - 业务能力层
//!
//! 撤回说明在上游以 markdown 保存，下游保存的是渲染后的 HTML。
//! 检查器只依赖 `ExplanationRenderer` 这个接口，渲染必须是纯函数。

use pulldown_cmark::{html, Parser};

/// 把说明文本渲染为 HTML
pub trait ExplanationRenderer: Send + Sync {
    fn render(&self, explanation: &str) -> String;
}

/// 默认渲染器，CommonMark
///
/// 空白说明渲染为空字符串；结尾换行去掉，段落之间保留 `\n`
#[derive(Debug, Default, Clone, Copy)]
pub struct ParagraphRenderer;

impl ParagraphRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl ExplanationRenderer for ParagraphRenderer {
    fn render(&self, explanation: &str) -> String {
        let text = explanation.trim();
        if text.is_empty() {
            return String::new();
        }

        let mut out = String::with_capacity(text.len() * 3 / 2);
        html::push_html(&mut out, Parser::new(text));
        out.truncate(out.trim_end().len());
        out
    }
}

/// 任意闭包都可以作为渲染器，测试中用来替换真实渲染
impl<F> ExplanationRenderer for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn render(&self, explanation: &str) -> String {
        self(explanation)
    }
}

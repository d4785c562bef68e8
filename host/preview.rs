/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use super::{PreviewRenderer, markdown_to_html};

/// Default preview renderer: pulldown-cmark HTML in a container tagged with
/// its source path.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkdownPreview;

impl PreviewRenderer for MarkdownPreview {
    fn render(&self, markdown: &str, source_path: &str) -> String {
        format!(
            "<div class=\"preview\" data-source=\"{}\">{}</div>",
            escape_attr(source_path),
            markdown_to_html(markdown)
        )
    }
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

//! WordprocessingML run builders.
//!
//! Everything here returns XML fragments that are appended to a paragraph
//! body. Text is always escaped; a `\t` in text becomes a `<w:tab/>`.

/// Character formatting for one run. `size_pt` is in whole points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStyle {
    pub bold: bool,
    pub italic: bool,
    pub size_pt: Option<u32>,
    pub hyperlink: bool,
}

/// Word's default hyperlink blue.
const HYPERLINK_COLOR: &str = "0563C1";

impl RunStyle {
    pub fn plain() -> Self {
        Self::default()
    }

    pub fn sized(size_pt: u32) -> Self {
        Self {
            size_pt: Some(size_pt),
            ..Self::default()
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    fn link(mut self) -> Self {
        self.hyperlink = true;
        self
    }

    // Children follow the CT_RPr sequence: b, i, color, sz, u.
    fn properties(&self) -> String {
        let mut props = String::new();
        if self.bold {
            props.push_str("<w:b/>");
        }
        if self.italic {
            props.push_str("<w:i/>");
        }
        if self.hyperlink {
            props.push_str(&format!("<w:color w:val=\"{HYPERLINK_COLOR}\"/>"));
        }
        if let Some(pt) = self.size_pt {
            props.push_str(&format!("<w:sz w:val=\"{}\"/>", pt * 2));
        }
        if self.hyperlink {
            props.push_str("<w:u w:val=\"single\"/>");
        }
        if props.is_empty() {
            props
        } else {
            format!("<w:rPr>{props}</w:rPr>")
        }
    }
}

/// A single run carrying `text`.
pub fn run(text: &str, style: RunStyle) -> String {
    let mut content = String::new();
    for (i, piece) in text.split('\t').enumerate() {
        if i > 0 {
            content.push_str("<w:tab/>");
        }
        if !piece.is_empty() {
            content.push_str(&format!(
                "<w:t xml:space=\"preserve\">{}</w:t>",
                escape(piece)
            ));
        }
    }
    format!("<w:r>{}{content}</w:r>", style.properties())
}

/// Splits on `**` markers: odd segments are bold. Empty segments are dropped.
pub fn bold_marked_runs(text: &str, size_pt: u32) -> String {
    text.split("**")
        .enumerate()
        .filter(|(_, part)| !part.is_empty())
        .map(|(i, part)| {
            let style = RunStyle::sized(size_pt);
            run(part, if i % 2 == 1 { style.bold() } else { style })
        })
        .collect()
}

/// An external hyperlink whose target lives in relationship `rel_id`.
pub fn hyperlink(rel_id: &str, text: &str, style: RunStyle) -> String {
    format!(
        "<w:hyperlink r:id=\"{}\">{}</w:hyperlink>",
        escape(rel_id),
        run(text, style.link())
    )
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

pub fn unescape(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

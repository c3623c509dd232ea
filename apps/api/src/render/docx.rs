//! Minimal OOXML package access: the zip container, the body paragraphs of
//! `word/document.xml`, and the hyperlink relationships.

use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use zip::write::{FileOptions, ZipWriter};
use zip::ZipArchive;

use super::markup::unescape;
use super::RenderError;

pub const DOCUMENT_PART: &str = "word/document.xml";
pub const RELS_PART: &str = "word/_rels/document.xml.rels";

const HYPERLINK_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";

/// Open, close and self-closing `w:p` / `w:tbl` tags. Paragraphs nest inside
/// text boxes, so block boundaries come from tag depth rather than the first
/// closing tag.
static BLOCK_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(/?)w:(p|tbl)(?:\s[^>]*?)?(/?)>").expect("valid block tag regex")
});

/// Text box bodies carry their own paragraphs and are not part of the
/// enclosing paragraph's text.
static TEXT_BOX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<w:txbxContent[\s>].*?</w:txbxContent>").expect("valid text box regex")
});

static TEXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<w:t(?:\s[^>]*)?>(.*?)</w:t>|<w:tab/>").expect("valid text regex")
});

static REL_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"Id="rId(\d+)""#).expect("valid rel id regex"));

/// pPr children that must come after `<w:tabs>`.
static AFTER_TABS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"<w:(?:suppressAutoHyphens|kinsoku|wordWrap|overflowPunct|topLinePunct|autoSpaceDE|autoSpaceDN|bidi|adjustRightInd|snapToGrid|spacing|ind|contextualSpacing|mirrorIndents|suppressOverlap|jc|textDirection|textAlignment|textboxTightWrap|outlineLvl|divId|cnfStyle|rPr|sectPr|pPrChange)[\s/>]",
    )
    .expect("valid pPr order regex")
});

// ── Package ─────────────────────────────────────────────────────────────────

/// Every entry of a `.docx` held in memory, in archive order.
pub struct DocxPackage {
    entries: Vec<(String, Vec<u8>)>,
}

impl DocxPackage {
    pub fn open(path: &Path) -> Result<Self, RenderError> {
        let bytes = std::fs::read(path).map_err(|source| RenderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(bytes)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, RenderError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut entries = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)
                .map_err(|e| RenderError::Package(format!("reading {}: {e}", file.name())))?;
            entries.push((file.name().to_string(), data));
        }
        Ok(Self { entries })
    }

    pub fn part_str(&self, name: &str) -> Result<String, RenderError> {
        let (_, data) = self
            .entries
            .iter()
            .find(|(entry, _)| entry == name)
            .ok_or_else(|| RenderError::MissingPart(name.to_string()))?;
        String::from_utf8(data.clone())
            .map_err(|_| RenderError::Package(format!("{name} is not valid UTF-8")))
    }

    pub fn set_part(&mut self, name: &str, data: Vec<u8>) {
        match self.entries.iter_mut().find(|(entry, _)| entry == name) {
            Some((_, existing)) => *existing = data,
            None => self.entries.push((name.to_string(), data)),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, RenderError> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in &self.entries {
            zip.start_file::<_, ()>(name.as_str(), FileOptions::default())?;
            zip.write_all(data)
                .map_err(|e| RenderError::Package(format!("writing {name}: {e}")))?;
        }
        Ok(zip.finish()?.into_inner())
    }
}

// ── Paragraphs ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Paragraph {
    open_tag: String,
    properties: Option<String>,
    content: String,
}

impl Paragraph {
    fn parse(xml: &str) -> Self {
        if let Some(tag) = xml.strip_suffix("/>") {
            return Self {
                open_tag: format!("{tag}>"),
                properties: None,
                content: String::new(),
            };
        }
        let open_end = xml.find('>').map_or(xml.len(), |i| i + 1);
        let open_tag = xml[..open_end].to_string();
        let inner = xml[open_end..]
            .strip_suffix("</w:p>")
            .unwrap_or(&xml[open_end..]);

        let (properties, content) = if inner.starts_with("<w:pPr/>") {
            (None, &inner["<w:pPr/>".len()..])
        } else if inner.starts_with("<w:pPr>") || inner.starts_with("<w:pPr ") {
            match inner.find("</w:pPr>") {
                Some(end) => {
                    let end = end + "</w:pPr>".len();
                    (Some(inner[..end].to_string()), &inner[end..])
                }
                None => (None, inner),
            }
        } else {
            (None, inner)
        };

        Self {
            open_tag,
            properties,
            content: content.to_string(),
        }
    }

    /// Visible text: every `<w:t>` plus a `\t` per tab, in document order.
    /// Text box contents are skipped.
    pub fn text(&self) -> String {
        let own = TEXT_BOX_RE.replace_all(&self.content, "");
        TEXT_RE
            .captures_iter(&own)
            .map(|caps| match caps.get(1) {
                Some(text) => unescape(text.as_str()),
                None => "\t".to_string(),
            })
            .collect()
    }

    /// Drops every run and hyperlink; paragraph properties are kept.
    pub fn clear(&mut self) {
        self.content.clear();
    }

    pub fn push(&mut self, xml: &str) {
        self.content.push_str(xml);
    }

    /// Adds a left-aligned tab stop at `pos_twips`.
    pub fn add_left_tab_stop(&mut self, pos_twips: u32) {
        let stop = format!("<w:tab w:val=\"left\" w:pos=\"{pos_twips}\"/>");
        let props = self
            .properties
            .get_or_insert_with(|| "<w:pPr></w:pPr>".to_string());

        if let Some(end) = props.find("</w:tabs>") {
            props.insert_str(end, &stop);
            return;
        }
        let tabs = format!("<w:tabs>{stop}</w:tabs>");
        let insert_at = AFTER_TABS_RE
            .find(props)
            .map(|m| m.start())
            .or_else(|| props.rfind("</w:pPr>"))
            .unwrap_or(props.len());
        props.insert_str(insert_at, &tabs);
    }

    fn to_xml(&self) -> String {
        format!(
            "{}{}{}</w:p>",
            self.open_tag,
            self.properties.as_deref().unwrap_or(""),
            self.content
        )
    }
}

enum Segment {
    Raw(String),
    Paragraph(Paragraph),
}

/// `word/document.xml` split into body paragraphs and untouched markup.
pub struct DocumentXml {
    segments: Vec<Segment>,
    paragraphs: Vec<usize>,
}

impl DocumentXml {
    pub fn parse(xml: &str) -> Self {
        let mut segments = Vec::new();
        let mut paragraphs = Vec::new();
        let mut cursor = 0;

        for block in top_level_blocks(xml) {
            if block.start > cursor {
                segments.push(Segment::Raw(xml[cursor..block.start].to_string()));
            }
            let text = &xml[block.start..block.end];
            if block.is_table {
                segments.push(Segment::Raw(text.to_string()));
            } else {
                paragraphs.push(segments.len());
                segments.push(Segment::Paragraph(Paragraph::parse(text)));
            }
            cursor = block.end;
        }
        if cursor < xml.len() {
            segments.push(Segment::Raw(xml[cursor..].to_string()));
        }

        Self {
            segments,
            paragraphs,
        }
    }

    pub fn len(&self) -> usize {
        self.paragraphs.len()
    }

    pub fn paragraph(&self, index: usize) -> Option<&Paragraph> {
        match self.segments.get(*self.paragraphs.get(index)?)? {
            Segment::Paragraph(p) => Some(p),
            Segment::Raw(_) => None,
        }
    }

    pub fn paragraph_mut(&mut self, index: usize) -> Option<&mut Paragraph> {
        match self.segments.get_mut(*self.paragraphs.get(index)?)? {
            Segment::Paragraph(p) => Some(p),
            Segment::Raw(_) => None,
        }
    }

    /// Index of the first paragraph whose text contains `needle`.
    pub fn find(&self, needle: &str) -> Option<usize> {
        (0..self.len()).find(|&i| self.paragraph(i).is_some_and(|p| p.text().contains(needle)))
    }

    pub fn to_xml(&self) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Raw(raw) => raw.clone(),
                Segment::Paragraph(p) => p.to_xml(),
            })
            .collect()
    }
}

struct Block {
    start: usize,
    end: usize,
    is_table: bool,
}

/// Outermost paragraphs and tables, matched by nesting depth. An unclosed
/// block at the end of input is left as raw markup.
fn top_level_blocks(xml: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut depth = 0usize;
    let mut open: Option<(usize, bool)> = None;

    for caps in BLOCK_TAG_RE.captures_iter(xml) {
        let Some(tag) = caps.get(0) else { continue };
        let closing = !caps[1].is_empty();
        let self_closing = !caps[3].is_empty();
        let is_table = &caps[2] == "tbl";

        if closing {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                if let Some((start, is_table)) = open.take() {
                    blocks.push(Block {
                        start,
                        end: tag.end(),
                        is_table,
                    });
                }
            }
        } else if self_closing {
            if depth == 0 {
                blocks.push(Block {
                    start: tag.start(),
                    end: tag.end(),
                    is_table,
                });
            }
        } else {
            if depth == 0 {
                open = Some((tag.start(), is_table));
            }
            depth += 1;
        }
    }
    blocks
}

// ── Relationships ───────────────────────────────────────────────────────────

/// `word/_rels/document.xml.rels` with new external hyperlinks appended.
pub struct Relationships {
    xml: String,
    next_id: u32,
    hyperlinks: HashMap<String, String>,
}

impl Relationships {
    pub fn parse(xml: String) -> Self {
        let max_id = REL_ID_RE
            .captures_iter(&xml)
            .filter_map(|caps| caps[1].parse::<u32>().ok())
            .max()
            .unwrap_or(0);
        Self {
            xml,
            next_id: max_id + 1,
            hyperlinks: HashMap::new(),
        }
    }

    /// Relationship id for an external hyperlink, reusing one per target.
    pub fn hyperlink(&mut self, target: &str) -> String {
        if let Some(id) = self.hyperlinks.get(target) {
            return id.clone();
        }
        let id = format!("rId{}", self.next_id);
        self.next_id += 1;

        let rel = format!(
            "<Relationship Id=\"{id}\" Type=\"{HYPERLINK_REL_TYPE}\" Target=\"{}\" TargetMode=\"External\"/>",
            super::markup::escape(target)
        );
        match self.xml.rfind("</Relationships>") {
            Some(end) => self.xml.insert_str(end, &rel),
            None => self.xml.push_str(&rel),
        }
        self.hyperlinks.insert(target.to_string(), id.clone());
        id
    }

    pub fn into_xml(self) -> String {
        self.xml
    }
}

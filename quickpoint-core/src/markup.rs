//! Lightweight scanning over slide HTML.
//!
//! The core never builds a DOM. It only needs two facts from a slide's
//! markup: which elements carry a `data-step` marker (and its integer
//! value), and the inner HTML of the first `notes` region. Both are found
//! with a single forward tag scan that understands quoted attribute values,
//! comments, and raw-text elements (`script`, `style`).

use log::debug;

/// Attribute that tags an element as an incremental reveal step.
pub const STEP_ATTRIBUTE: &str = "data-step";

/// Class that marks the presenter notes region.
pub const NOTES_CLASS: &str = "notes";

/// A step-tagged element found in slide markup, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepElement {
    /// Position among all step-tagged elements of the slide.
    pub ordinal: usize,
    /// Raw marker value (not normalized).
    pub marker: i64,
    /// Lowercased tag name.
    pub tag: String,
}

#[derive(Debug)]
struct Tag<'a> {
    name: String,
    attrs: Vec<(String, Option<&'a str>)>,
    closing: bool,
    self_closing: bool,
    /// Byte offset of `<`.
    start: usize,
    /// Byte offset just past `>`.
    end: usize,
}

impl Tag<'_> {
    fn attr(&self, name: &str) -> Option<Option<&str>> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| *value)
    }

    fn has_class(&self, class: &str) -> bool {
        matches!(self.attr("class"), Some(Some(value)) if value.split_ascii_whitespace().any(|c| c == class))
    }
}

/// Parse a leading integer the way a browser's `parseInt(value, 10)` does:
/// leading whitespace and one sign are allowed, trailing garbage is ignored.
pub fn parse_int_prefix(value: &str) -> Option<i64> {
    let trimmed = value.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let mut seen = false;
    let mut acc: i64 = 0;
    for byte in digits.bytes() {
        if !byte.is_ascii_digit() {
            break;
        }
        seen = true;
        acc = acc.saturating_mul(10).saturating_add(i64::from(byte - b'0'));
    }

    seen.then_some(if negative { -acc } else { acc })
}

/// All step-tagged elements of a slide, in document order.
///
/// Markers that are not integers are skipped, which matches how a
/// non-numeric marker never participates in step ordering.
pub fn scan_step_elements(html: &str) -> Vec<StepElement> {
    let mut elements = Vec::new();
    for tag in TagScanner::new(html) {
        if tag.closing {
            continue;
        }
        let Some(raw) = tag.attr(STEP_ATTRIBUTE) else {
            continue;
        };
        match raw.and_then(parse_int_prefix) {
            Some(marker) => elements.push(StepElement {
                ordinal: elements.len(),
                marker,
                tag: tag.name.clone(),
            }),
            None => debug!("markup: ignoring non-numeric step marker {raw:?} on <{}>", tag.name),
        }
    }
    elements
}

/// Normalize raw markers into the sorted, de-duplicated step sequence.
pub fn normalize_step_values(markers: impl IntoIterator<Item = i64>) -> Vec<i64> {
    let mut values: Vec<i64> = markers.into_iter().collect();
    values.sort_unstable();
    values.dedup();
    values
}

/// Inner HTML of the first element carrying the `notes` class.
pub fn extract_notes(html: &str) -> Option<String> {
    let mut scanner = TagScanner::new(html);
    let open = scanner.by_ref().find(|tag| !tag.closing && tag.has_class(NOTES_CLASS))?;
    if open.self_closing {
        return Some(String::new());
    }

    let mut depth = 1usize;
    for tag in scanner {
        if tag.name != open.name || tag.self_closing {
            continue;
        }
        if tag.closing {
            depth -= 1;
            if depth == 0 {
                return Some(html[open.end..tag.start].trim().to_string());
            }
        } else {
            depth += 1;
        }
    }

    // Unterminated region: take the rest of the document.
    Some(html[open.end..].trim().to_string())
}

/// Forward-only tag tokenizer.
struct TagScanner<'a> {
    html: &'a str,
    cursor: usize,
}

impl<'a> TagScanner<'a> {
    fn new(html: &'a str) -> Self {
        Self { html, cursor: 0 }
    }

    fn skip_past(&mut self, needle: &str) {
        self.cursor = match self.html[self.cursor..].find(needle) {
            Some(offset) => self.cursor + offset + needle.len(),
            None => self.html.len(),
        };
    }

    fn skip_raw_text(&mut self, name: &str) {
        let closing = format!("</{name}");
        let lower = self.html[self.cursor..].to_ascii_lowercase();
        self.cursor = match lower.find(&closing) {
            Some(offset) => self.cursor + offset,
            None => self.html.len(),
        };
    }

    fn parse_tag(&mut self, start: usize) -> Option<Tag<'a>> {
        let bytes = self.html.as_bytes();
        let mut pos = start + 1;

        let closing = bytes.get(pos) == Some(&b'/');
        if closing {
            pos += 1;
        }

        let name_start = pos;
        while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'-') {
            pos += 1;
        }
        if pos == name_start {
            return None;
        }
        let name = self.html[name_start..pos].to_ascii_lowercase();

        let mut attrs = Vec::new();
        let mut self_closing = false;
        loop {
            while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }
            match bytes.get(pos) {
                None => {
                    self.cursor = bytes.len();
                    return None;
                }
                Some(b'>') => {
                    pos += 1;
                    break;
                }
                Some(b'/') => {
                    self_closing = true;
                    pos += 1;
                    continue;
                }
                Some(_) => {}
            }

            let key_start = pos;
            while pos < bytes.len()
                && !bytes[pos].is_ascii_whitespace()
                && !matches!(bytes[pos], b'=' | b'>' | b'/')
            {
                pos += 1;
            }
            let key = self.html[key_start..pos].to_ascii_lowercase();

            while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }
            if bytes.get(pos) != Some(&b'=') {
                attrs.push((key, None));
                continue;
            }
            pos += 1;
            while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }

            let value = match bytes.get(pos) {
                Some(&quote) if quote == b'"' || quote == b'\'' => {
                    let value_start = pos + 1;
                    let value_end = self.html[value_start..]
                        .find(quote as char)
                        .map_or(bytes.len(), |offset| value_start + offset);
                    pos = (value_end + 1).min(bytes.len());
                    &self.html[value_start..value_end]
                }
                _ => {
                    let value_start = pos;
                    while pos < bytes.len() && !bytes[pos].is_ascii_whitespace() && bytes[pos] != b'>' {
                        pos += 1;
                    }
                    &self.html[value_start..pos]
                }
            };
            attrs.push((key, Some(value)));
        }

        Some(Tag {
            name,
            attrs,
            closing,
            self_closing,
            start,
            end: pos,
        })
    }
}

impl<'a> Iterator for TagScanner<'a> {
    type Item = Tag<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let offset = self.html[self.cursor..].find('<')?;
            let start = self.cursor + offset;
            let rest = &self.html[start..];

            if rest.starts_with("<!--") {
                self.cursor = start + 4;
                self.skip_past("-->");
                continue;
            }
            if rest.starts_with("<!") || rest.starts_with("<?") {
                self.cursor = start + 2;
                self.skip_past(">");
                continue;
            }

            match self.parse_tag(start) {
                Some(tag) => {
                    self.cursor = tag.end;
                    if !tag.closing && !tag.self_closing && matches!(tag.name.as_str(), "script" | "style") {
                        self.skip_raw_text(&tag.name);
                    }
                    return Some(tag);
                }
                None => {
                    // Stray `<` in text content.
                    self.cursor = self.cursor.max(start + 1);
                }
            }
        }
    }
}

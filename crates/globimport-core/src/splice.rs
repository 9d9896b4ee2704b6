//! Text splicing with source map generation.
//!
//! A [`SourceBuffer`] records overwrites against the original text and a
//! prefix. Offsets always refer to the original text, so several
//! overwrites can be applied in any order.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A V3 source map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMap {
    pub version: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources_content: Vec<String>,
    pub names: Vec<String>,
    pub mappings: String,
}

impl SourceMap {
    /// Serialize to JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone)]
struct Overwrite {
    start: usize,
    end: usize,
    text: String,
}

/// Original text plus pending edits.
#[derive(Debug, Clone)]
pub struct SourceBuffer {
    original: String,
    intro: String,
    /// Sorted by `start`, never overlapping.
    overwrites: Vec<Overwrite>,
}

impl SourceBuffer {
    pub fn new(original: impl Into<String>) -> Self {
        Self {
            original: original.into(),
            intro: String::new(),
            overwrites: Vec::new(),
        }
    }

    /// The unmodified text.
    pub fn original(&self) -> &str {
        &self.original
    }

    /// Replace `start..end` of the original text with `text`.
    pub fn overwrite(&mut self, start: usize, end: usize, text: &str) -> Result<()> {
        let splice_error = |message| Error::Splice {
            start,
            end,
            message,
        };

        if start >= end {
            return Err(splice_error("empty range"));
        }
        if end > self.original.len() {
            return Err(splice_error("out of bounds"));
        }
        if !self.original.is_char_boundary(start) || !self.original.is_char_boundary(end) {
            return Err(splice_error("not on a character boundary"));
        }

        let idx = self.overwrites.partition_point(|o| o.start < start);
        let overlaps_prev = idx > 0 && self.overwrites[idx - 1].end > start;
        let overlaps_next = self.overwrites.get(idx).is_some_and(|o| o.start < end);
        if overlaps_prev || overlaps_next {
            return Err(splice_error("overlaps an earlier overwrite"));
        }

        self.overwrites.insert(
            idx,
            Overwrite {
                start,
                end,
                text: text.to_string(),
            },
        );
        Ok(())
    }

    /// Insert `text` before everything, including earlier prepends.
    pub fn prepend(&mut self, text: &str) {
        self.intro.insert_str(0, text);
    }

    /// Whether any edit has been made.
    pub fn has_changed(&self) -> bool {
        !self.intro.is_empty() || !self.overwrites.is_empty()
    }

    /// Source map from the spliced output back to the original.
    ///
    /// Untouched text is mapped line by line. Each replacement maps to the
    /// start of the range it replaced.
    pub fn generate_map(&self, source: &str, include_content: bool) -> SourceMap {
        let mut builder = MappingsBuilder::default();
        let mut output = Position::default();
        let mut original = Position::default();

        output.advance(&self.intro);

        let mut pos = 0;
        for overwrite in &self.overwrites {
            builder.add_unchanged(&self.original[pos..overwrite.start], &mut output, &mut original);
            builder.add(output, original);
            output.advance(&overwrite.text);
            original.advance(&self.original[overwrite.start..overwrite.end]);
            pos = overwrite.end;
        }
        builder.add_unchanged(&self.original[pos..], &mut output, &mut original);

        SourceMap {
            version: 3,
            file: None,
            sources: vec![source.to_string()],
            sources_content: if include_content {
                vec![self.original.clone()]
            } else {
                Vec::new()
            },
            names: Vec::new(),
            mappings: builder.finish(),
        }
    }
}

impl fmt::Display for SourceBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.intro)?;
        let mut pos = 0;
        for overwrite in &self.overwrites {
            f.write_str(&self.original[pos..overwrite.start])?;
            f.write_str(&overwrite.text)?;
            pos = overwrite.end;
        }
        f.write_str(&self.original[pos..])
    }
}

/// Line and UTF-16 column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Position {
    line: u32,
    column: u32,
}

impl Position {
    fn advance(&mut self, text: &str) {
        for c in text.chars() {
            if c == '\n' {
                self.line += 1;
                self.column = 0;
            } else {
                self.column += c.len_utf16() as u32;
            }
        }
    }
}

#[derive(Debug, Default)]
struct MappingsBuilder {
    /// `(output, original)` pairs in output order.
    segments: Vec<(Position, Position)>,
}

impl MappingsBuilder {
    fn add(&mut self, output: Position, original: Position) {
        if self.segments.last().is_some_and(|(last, _)| *last == output) {
            return;
        }
        self.segments.push((output, original));
    }

    /// Map a run of unchanged text, one segment per non-empty line.
    fn add_unchanged(&mut self, text: &str, output: &mut Position, original: &mut Position) {
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                output.advance("\n");
                original.advance("\n");
            }
            if !line.is_empty() {
                self.add(*output, *original);
                output.advance(line);
                original.advance(line);
            }
        }
    }

    fn finish(&self) -> String {
        let mut mappings = String::new();
        let mut line = 0;
        let mut prev_column: i64 = 0;
        let mut prev_line: i64 = 0;
        let mut prev_original_column: i64 = 0;
        let mut first_on_line = true;

        for (output, original) in &self.segments {
            while line < output.line {
                mappings.push(';');
                line += 1;
                prev_column = 0;
                first_on_line = true;
            }
            if !first_on_line {
                mappings.push(',');
            }

            vlq_encode(i64::from(output.column) - prev_column, &mut mappings);
            vlq_encode(0, &mut mappings); // single source
            vlq_encode(i64::from(original.line) - prev_line, &mut mappings);
            vlq_encode(i64::from(original.column) - prev_original_column, &mut mappings);

            prev_column = i64::from(output.column);
            prev_line = i64::from(original.line);
            prev_original_column = i64::from(original.column);
            first_on_line = false;
        }

        mappings
    }
}

/// VLQ-encode a signed integer and append to output string.
fn vlq_encode(value: i64, out: &mut String) {
    const B64: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    #[allow(clippy::cast_sign_loss)]
    let mut v = (if value < 0 {
        ((-value) << 1) | 1
    } else {
        value << 1
    }) as u64;
    loop {
        let mut digit = (v & 0x1f) as u8;
        v >>= 5;
        if v > 0 {
            digit |= 0x20; // continuation bit
        }
        out.push(B64[digit as usize] as char);
        if v == 0 {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vlq_encode() {
        let mut out = String::new();
        for value in [0, 1, -1, 15, 16, -16, 1000] {
            vlq_encode(value, &mut out);
            out.push(' ');
        }
        assert_eq!(out, "A C D e gB hB w+B ");
    }

    #[test]
    fn test_overwrite_and_prepend() {
        let mut buffer = SourceBuffer::new("const a = X;\nconst b = Y;\n");
        buffer.overwrite(23, 24, "2").unwrap();
        buffer.overwrite(10, 11, "1").unwrap();
        buffer.prepend("import b from 'b'\n");
        buffer.prepend("import a from 'a'\n");
        assert_eq!(
            buffer.to_string(),
            "import a from 'a'\nimport b from 'b'\nconst a = 1;\nconst b = 2;\n"
        );
        assert!(buffer.has_changed());
    }

    #[test]
    fn test_invalid_overwrites() {
        let mut buffer = SourceBuffer::new("héllo world");
        assert!(matches!(buffer.overwrite(3, 3, "x"), Err(Error::Splice { .. })));
        assert!(matches!(buffer.overwrite(0, 100, "x"), Err(Error::Splice { .. })));
        assert!(matches!(buffer.overwrite(2, 4, "x"), Err(Error::Splice { .. })));

        buffer.overwrite(0, 6, "hello").unwrap();
        assert!(matches!(buffer.overwrite(5, 8, "x"), Err(Error::Splice { .. })));
        buffer.overwrite(7, 12, "there").unwrap();
        assert_eq!(buffer.to_string(), "hello there");
    }

    #[test]
    fn test_generate_map() {
        let mut buffer = SourceBuffer::new("a = X;\nb = 1;\n");
        buffer.overwrite(4, 5, "{\n}").unwrap();
        buffer.prepend("import x\n");

        let map = buffer.generate_map("/src/main.ts", true);
        assert_eq!(map.version, 3);
        assert_eq!(map.sources, vec!["/src/main.ts"]);
        assert_eq!(map.sources_content, vec!["a = X;\nb = 1;\n"]);
        // line 0: prefix; line 1: `a = ` + replacement start; line 2: `}` + `;`; line 3: `b = 1;`
        assert_eq!(map.mappings, ";AAAA,IAAI;CAAC;AACL");

        let json = map.to_json().unwrap();
        assert!(json.contains("\"sourcesContent\""));
        assert!(!json.contains("\"file\""));
    }
}

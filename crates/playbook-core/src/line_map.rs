use crate::model::{Point, TextRange};

/// Byte offset <-> UTF-16 point conversion for one text snapshot.
pub struct LineMap {
    line_starts: Vec<usize>,
}

impl LineMap {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, c) in text.char_indices() {
            if c == '\n' {
                line_starts.push(i + 1);
            }
        }
        Self { line_starts }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    pub fn line_start(&self, line: usize) -> Option<usize> {
        self.line_starts.get(line).copied()
    }

    pub fn offset_to_point(&self, text: &str, offset: usize) -> Point {
        let offset = offset.min(text.len());
        match self.line_starts.binary_search(&offset) {
            Ok(line) => Point::new(line as u32, 0),
            Err(next_line_idx) => {
                let line = next_line_idx - 1;
                let line_start = self.line_starts[line];
                let col = text
                    .get(line_start..offset)
                    .map(|s| s.encode_utf16().count())
                    .unwrap_or(0);
                Point::new(line as u32, col as u32)
            }
        }
    }

    pub fn span_to_range(&self, text: &str, start: usize, end: usize) -> TextRange {
        TextRange::new(
            self.offset_to_point(text, start),
            self.offset_to_point(text, end),
        )
    }

    /// Byte offset for `point`; columns past the end of the line clamp to it.
    pub fn point_to_offset(&self, text: &str, point: Point) -> Option<usize> {
        let line_start = *self.line_starts.get(point.line as usize)?;
        let mut current_col = 0u32;

        for (i, c) in text[line_start..].char_indices() {
            if current_col >= point.col || c == '\n' || c == '\r' {
                return Some(line_start + i);
            }
            current_col += c.len_utf16() as u32;
        }

        Some(text.len())
    }
}

//! Parsing of one textual record into a [`SampleRecord`].

use thiserror::Error;

use crate::{COMMENT_MARKER, MNIST_PIXELS, RECORD_FIELDS};

/// One labelled image, as read from the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleRecord {
    pub label: u8,
    pub pixels: [u8; MNIST_PIXELS],
}

impl SampleRecord {
    pub fn new(label: u8, pixels: [u8; MNIST_PIXELS]) -> Self {
        Self { label, pixels }
    }

    /// Leading pixels, handy for log lines.
    pub fn preview(&self, n: usize) -> &[u8] {
        &self.pixels[..n.min(MNIST_PIXELS)]
    }
}

/// Why a line could not be turned into a record.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("expected {expected} fields (label + pixels), found {found}")]
    FieldCount { expected: usize, found: usize },

    #[error("unexpected byte 0x{byte:02x} at offset {offset}")]
    UnexpectedByte { offset: usize, byte: u8 },
}

#[inline]
fn is_blank(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

#[inline]
fn is_separator(b: u8) -> bool {
    b == b',' || is_blank(b)
}

/// Parse one line of the record protocol.
///
/// Returns `Ok(None)` for blank lines and `#` comments; callers skip those
/// silently. Scanning stops once [`RECORD_FIELDS`] fields have been read, so
/// anything after the last pixel is ignored. Only a line that yields exactly
/// that many fields is accepted.
///
/// ```
/// use mnist_protocol::parse_line;
///
/// let line = format!("7{}", ",0".repeat(784));
/// let record = parse_line(&line).unwrap().unwrap();
/// assert_eq!(record.label, 7);
///
/// assert_eq!(parse_line("  # header").unwrap(), None);
/// assert!(parse_line("7,1,2,3").is_err());
/// ```
pub fn parse_line(line: &str) -> Result<Option<SampleRecord>, RecordError> {
    let bytes = line.as_bytes();
    let end = bytes.iter().position(|&b| b == b'\n' || b == b'\r').unwrap_or(bytes.len());
    let bytes = &bytes[..end];

    let mut pos = bytes.iter().position(|&b| !is_blank(b)).unwrap_or(bytes.len());
    if pos == bytes.len() || bytes[pos] == COMMENT_MARKER {
        return Ok(None);
    }

    let mut label = 0u8;
    let mut pixels = [0u8; MNIST_PIXELS];
    let mut fields = 0usize;

    while pos < bytes.len() && fields < RECORD_FIELDS {
        let start = pos;
        let mut value = 0u32;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            value = value.saturating_mul(10).saturating_add(u32::from(bytes[pos] - b'0'));
            pos += 1;
        }

        if pos > start {
            if fields == 0 {
                label = (value & 0xFF) as u8;
            } else {
                pixels[fields - 1] = value.min(255) as u8;
            }
            fields += 1;
        } else if !is_separator(bytes[pos]) {
            return Err(RecordError::UnexpectedByte { offset: pos, byte: bytes[pos] });
        }

        while pos < bytes.len() && is_separator(bytes[pos]) {
            pos += 1;
        }
    }

    if fields != RECORD_FIELDS {
        return Err(RecordError::FieldCount { expected: RECORD_FIELDS, found: fields });
    }
    if pos < bytes.len() {
        tracing::debug!(ignored_bytes = bytes.len() - pos, "ignoring data after last pixel");
    }
    Ok(Some(SampleRecord { label, pixels }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_with(label: &str, pixel: &str, count: usize) -> String {
        let mut s = label.to_string();
        for _ in 0..count {
            s.push(',');
            s.push_str(pixel);
        }
        s
    }

    #[test]
    fn parses_all_zero_record() {
        let rec = parse_line(&line_with("3", "0", 784)).unwrap().unwrap();
        assert_eq!(rec.label, 3);
        assert!(rec.pixels.iter().all(|&p| p == 0));
    }

    #[test]
    fn one_field_short_fails() {
        let err = parse_line(&line_with("3", "0", 783)).unwrap_err();
        assert_eq!(err, RecordError::FieldCount { expected: 785, found: 784 });
    }

    #[test]
    fn extra_fields_are_truncated() {
        let mut line = line_with("3", "1", 784);
        line.push_str(",99");
        let rec = parse_line(&line).unwrap().unwrap();
        assert_eq!(rec.pixels[783], 1);
    }

    #[test]
    fn blank_and_comment_lines_are_ignored() {
        assert_eq!(parse_line(""), Ok(None));
        assert_eq!(parse_line(" \t "), Ok(None));
        assert_eq!(parse_line("# label,pixels"), Ok(None));
        assert_eq!(parse_line("\t# indented comment"), Ok(None));
    }

    #[test]
    fn pixels_clamp_and_label_truncates() {
        let mut line = String::from("258");
        line.push_str(",300");
        for _ in 0..783 {
            line.push_str(",7");
        }
        let rec = parse_line(&line).unwrap().unwrap();
        assert_eq!(rec.label, 2); // 258 & 0xFF
        assert_eq!(rec.pixels[0], 255);
        assert_eq!(rec.pixels[1], 7);
    }

    #[test]
    fn mixed_separators_accepted() {
        let mut line = String::from("  5");
        for i in 0..784 {
            line.push_str(match i % 3 {
                0 => ", 1",
                1 => "\t2",
                _ => " ,3",
            });
        }
        let rec = parse_line(&line).unwrap().unwrap();
        assert_eq!(rec.label, 5);
        assert_eq!(&rec.pixels[..3], &[1, 2, 3]);
    }

    #[test]
    fn letters_are_rejected() {
        assert_eq!(parse_line("hello"), Err(RecordError::UnexpectedByte { offset: 0, byte: b'h' }));
        assert!(matches!(parse_line("1,2.5,3"), Err(RecordError::UnexpectedByte { offset: 3, .. })));
    }

    #[test]
    fn huge_numbers_saturate() {
        let line = line_with("99999999999999", "99999999999999", 784);
        let rec = parse_line(&line).unwrap().unwrap();
        assert_eq!(rec.label, 0xFF);
        assert_eq!(rec.pixels[0], 255);
    }

    #[test]
    fn stops_at_line_terminator() {
        let mut line = line_with("4", "0", 784);
        line.push_str("\nthis is not parsed");
        assert_eq!(parse_line(&line).unwrap().unwrap().label, 4);
    }
}

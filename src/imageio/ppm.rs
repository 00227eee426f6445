//! Plain-text (P3) PPM with a trailing comment footer.
//!
//! ```text
//! P3
//! 2 2
//! 255
//! 0 0 0 255 255 255
//! 255 255 255 0 0 0
//! # pathaccum 0.1.0 | 1 spp
//! ```
//!
//! Rows are written top-to-bottom while `FinalImage` stores them bottom-to-top.

use std::io::Write;

use crate::{Error, Result};
use crate::film::{FinalImage, CHANNELS};

pub fn write_ppm<W: Write>(mut w: W, image: &FinalImage, footer: &str) -> std::io::Result<()> {
    write!(w, "P3\n{} {}\n255\n", image.width, image.height)?;

    for output_row in 0..image.height {
        let source_row = image.height - 1 - output_row;
        let mut values = image.row(source_row).iter();
        if let Some(first) = values.next() {
            write!(w, "{}", first)?;
        }
        for v in values {
            write!(w, " {}", v)?;
        }
        writeln!(w)?;
    }

    for line in footer.lines() {
        writeln!(w, "# {}", line)?;
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedPpm {
    pub width: u32,
    pub height: u32,
    /// Bottom-to-top rows, the same order `FinalImage` uses.
    pub pixels: Vec<u8>,
    pub comments: Vec<String>,
}

pub fn parse_ppm(text: &str) -> Result<DecodedPpm> {
    let mut comments = Vec::new();
    let mut tokens = Vec::new();
    for line in text.lines() {
        let data = match line.find('#') {
            Some(pos) => {
                comments.push(line[pos + 1..].trim().to_string());
                &line[..pos]
            }
            None => line,
        };
        tokens.extend(data.split_whitespace());
    }

    let mut tokens = tokens.into_iter();
    match tokens.next() {
        Some("P3") => {}
        Some(magic) => return Err(Error::MalformedPpm(format!("expected P3 magic, found `{}`", magic))),
        None => return Err(Error::MalformedPpm("empty file".to_string())),
    }

    let mut header = |name: &str| -> Result<u32> {
        let tok = tokens.next().ok_or_else(|| Error::MalformedPpm(format!("missing {}", name)))?;
        tok.parse().map_err(|_| Error::MalformedPpm(format!("invalid {} `{}`", name, tok)))
    };
    let width = header("width")?;
    let height = header("height")?;
    let max_val = header("max value")?;
    if max_val != 255 {
        return Err(Error::MalformedPpm(format!("unsupported max value {}", max_val)));
    }

    let (row_len, expected) = (width as usize).checked_mul(CHANNELS)
        .and_then(|row_len| Some((row_len, row_len.checked_mul(height as usize)?)))
        .ok_or_else(|| Error::MalformedPpm("dimensions too large".to_string()))?;
    let values = tokens
        .map(|tok| tok.parse::<u8>().map_err(|_| Error::MalformedPpm(format!("invalid sample `{}`", tok))))
        .collect::<Result<Vec<u8>>>()?;
    if values.len() != expected {
        return Err(Error::MalformedPpm(format!(
            "expected {} samples for {}x{}, found {}", expected, width, height, values.len()
        )));
    }

    let mut pixels = Vec::with_capacity(expected);
    if row_len > 0 {
        for row in values.chunks(row_len).rev() {
            pixels.extend_from_slice(row);
        }
    }

    Ok(DecodedPpm { width, height, pixels, comments })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn two_by_two() -> FinalImage {
        // bottom row black, top row white
        FinalImage::new(2, 2, vec![0, 0, 0, 0, 0, 0, 255, 255, 255, 255, 255, 255], 1)
    }

    #[test]
    fn test_write_layout() {
        let mut out = Vec::new();
        write_ppm(&mut out, &two_by_two(), "made by a test").unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "P3\n2 2\n255\n255 255 255 255 255 255\n0 0 0 0 0 0\n# made by a test\n");
    }

    #[test]
    fn test_parse_inverts_rows_back() {
        let image = two_by_two();
        let mut out = Vec::new();
        write_ppm(&mut out, &image, "footer").unwrap();
        let decoded = parse_ppm(std::str::from_utf8(&out).unwrap()).unwrap();
        assert_eq!(decoded.width, 2);
        assert_eq!(decoded.height, 2);
        assert_eq!(decoded.pixels, image.pixels);
        assert_eq!(decoded.comments, vec!["footer".to_string()]);
    }

    #[test]
    fn test_parse_tolerates_header_comments() {
        let decoded = parse_ppm("P3\n# a comment\n1 1 # trailing\n255\n1 2 3\n").unwrap();
        assert_eq!(decoded.pixels, vec![1, 2, 3]);
        assert_eq!(decoded.comments.len(), 2);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_ppm("").is_err());
        assert!(parse_ppm("P6\n1 1\n255\n").is_err());
        assert!(parse_ppm("P3\n1 1\n65535\n1 2 3\n").is_err());
        assert!(parse_ppm("P3\n1 1\n255\n1 2\n").is_err());
        assert!(parse_ppm("P3\n1 1\n255\n1 2 300\n").is_err());
    }

    #[test]
    fn test_parse_rejects_huge_dimensions() {
        let err = parse_ppm("P3\n4294967295 4294967295\n255\n1 2 3\n").unwrap_err();
        assert!(matches!(err, Error::MalformedPpm(ref msg) if msg == "dimensions too large"), "{}", err);
    }
}

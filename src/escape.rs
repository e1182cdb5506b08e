//! Escape syntax for delimiter strings given on the command line.
//!
//! Supported forms:
//! - `\\`, `\a`, `\b`, `\f`, `\t`, `\r`, `\n`
//! - `^C` for a control character (keeps the low five bits of `C`)
//! - `\ddd` / `\dddd` decimal, `\oOOO` octal, `\xHH` hex (exact digit counts)
//! - any other `\c` stands for `c` itself

use crate::error::SelectError;

/// Decode `text` into the raw bytes it denotes.
pub fn decode_escapes(text: &str) -> Result<Vec<u8>, SelectError> {
    let fail = |reason| SelectError::InvalidEscape {
        text: text.to_string(),
        reason,
    };

    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'^' => {
                let c = *bytes.get(i + 1).ok_or_else(|| fail("trailing ^"))?;
                out.push(c & 31);
                i += 2;
            }
            b'\\' => {
                let c = *bytes.get(i + 1).ok_or_else(|| fail("trailing \\"))?;
                i += 2;
                match c {
                    b'a' => out.push(0x07),
                    b'b' => out.push(0x08),
                    b'f' => out.push(0x0c),
                    b't' => out.push(b'\t'),
                    b'r' => out.push(b'\r'),
                    b'n' => out.push(b'\n'),
                    b'd' => {
                        out.push(numeric(bytes, i, 3, 10).map_err(fail)?);
                        i += 3;
                    }
                    b'o' => {
                        out.push(numeric(bytes, i, 3, 8).map_err(fail)?);
                        i += 3;
                    }
                    b'x' => {
                        out.push(numeric(bytes, i, 2, 16).map_err(fail)?);
                        i += 2;
                    }
                    b'0'..=b'9' => {
                        // The first digit was consumed as the escape letter.
                        out.push(numeric(bytes, i - 1, 3, 10).map_err(fail)?);
                        i += 2;
                    }
                    other => out.push(other),
                }
            }
            other => {
                out.push(other);
                i += 1;
            }
        }
    }

    Ok(out)
}

/// Read exactly `digits` digits in `radix` starting at `start`.
fn numeric(bytes: &[u8], start: usize, digits: usize, radix: u32) -> Result<u8, &'static str> {
    let run = bytes
        .get(start..start + digits)
        .ok_or("too few digits in numeric escape")?;
    let mut value: u32 = 0;
    for &b in run {
        let d = (b as char)
            .to_digit(radix)
            .ok_or("bad digit in numeric escape")?;
        value = value * radix + d;
    }
    u8::try_from(value).map_err(|_| "numeric escape exceeds 255")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text() {
        assert_eq!(decode_escapes("| :").unwrap(), b"| :");
    }

    #[test]
    fn test_c_escapes() {
        assert_eq!(
            decode_escapes(r"\t\n\r\\\a\b\f").unwrap(),
            b"\t\n\r\\\x07\x08\x0c"
        );
    }

    #[test]
    fn test_control_caret() {
        assert_eq!(decode_escapes("^A^I").unwrap(), b"\x01\x09");
        assert_eq!(decode_escapes("^a").unwrap(), b"\x01");
    }

    #[test]
    fn test_numeric_forms() {
        assert_eq!(decode_escapes(r"\001").unwrap(), b"\x01");
        assert_eq!(decode_escapes(r"\d124").unwrap(), b"|");
        assert_eq!(decode_escapes(r"\o011").unwrap(), b"\t");
        assert_eq!(decode_escapes(r"\x7C\x7c").unwrap(), b"||");
    }

    #[test]
    fn test_unknown_escape_is_literal() {
        assert_eq!(decode_escapes(r"\|").unwrap(), b"|");
    }

    #[test]
    fn test_errors() {
        assert!(decode_escapes("^").is_err());
        assert!(decode_escapes("\\").is_err());
        assert!(decode_escapes(r"\256").is_err());
        assert!(decode_escapes(r"\12").is_err());
        assert!(decode_escapes(r"\o8").is_err());
        assert!(decode_escapes(r"\o777").is_err());
        assert!(decode_escapes(r"\xg0").is_err());
    }
}

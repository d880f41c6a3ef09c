//! Byte-level framing of a single JSON value.
//!
//! The scanner is resumable: bytes can arrive in arbitrarily small pieces and
//! `feed` picks up where the previous call stopped. Multi-byte UTF-8
//! sequences never contain ASCII bytes, so scanning raw bytes is sound.

/// Finds the end of the JSON value that starts at offset 0 of a buffer.
#[derive(Debug, Default)]
pub(crate) struct ElementScanner {
  pos:       usize,
  depth:     u32,
  in_string: bool,
  escaped:   bool,
}

impl ElementScanner {
  pub(crate) fn reset(&mut self) { *self = Self::default(); }

  /// Scan newly available bytes of `buf`.
  ///
  /// Returns the exclusive end offset of the value once it is complete.
  /// Containers end at their matching close bracket; scalars end before the
  /// first `,`, `]`, `}` or whitespace byte at depth zero. `buf` must be the
  /// same buffer (possibly extended) between calls until a value is found.
  pub(crate) fn feed(&mut self, buf: &[u8]) -> Option<usize> {
    while self.pos < buf.len() {
      let b = buf[self.pos];
      self.pos += 1;

      if self.in_string {
        if self.escaped {
          self.escaped = false;
        } else if b == b'\\' {
          self.escaped = true;
        } else if b == b'"' {
          self.in_string = false;
          if self.depth == 0 {
            return Some(self.pos);
          }
        }
        continue;
      }

      match b {
        b'"' => self.in_string = true,
        b'{' | b'[' => self.depth += 1,
        b'}' | b']' if self.depth > 0 => {
          self.depth -= 1;
          if self.depth == 0 {
            return Some(self.pos);
          }
        }
        b'}' | b']' => return Some(self.pos - 1),
        b if self.depth == 0 && (b == b',' || b.is_ascii_whitespace()) => {
          return Some(self.pos - 1);
        }
        _ => {}
      }
    }
    None
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn end_of(input: &str) -> Option<usize> {
    ElementScanner::default().feed(input.as_bytes())
  }

  #[test]
  fn object_ends_at_matching_brace() {
    assert_eq!(end_of(r#"{"a":{"b":[1,2]}},{"c":3}"#), Some(17));
  }

  #[test]
  fn brackets_inside_strings_are_ignored() {
    let input = r#"{"url":"http://x/}]{[","n":1}]"#;
    assert_eq!(end_of(input), Some(input.len() - 1));
  }

  #[test]
  fn escaped_quotes_do_not_end_strings() {
    let input = r#"{"t":"say \"hi\" \\","u":"}"}"#;
    assert_eq!(end_of(input), Some(input.len()));
  }

  #[test]
  fn scalars_end_before_delimiters() {
    assert_eq!(end_of("12345,"), Some(5));
    assert_eq!(end_of("true]"), Some(4));
    assert_eq!(end_of("null \n"), Some(4));
    assert_eq!(end_of(r#""s,]",1"#), Some(5));
  }

  #[test]
  fn incomplete_value_needs_more_bytes() {
    assert_eq!(end_of(r#"{"a":"#), None);
    assert_eq!(end_of(r#"{"a":"unterminated }"#), None);
  }

  #[test]
  fn resumes_across_partial_buffers() {
    let full = br#"{"phish_id":1,"url":"http://a/\"}"}  "#;
    let mut scanner = ElementScanner::default();
    let mut found = None;
    for end in 1..=full.len() {
      if let Some(pos) = scanner.feed(&full[..end]) {
        found = Some(pos);
        break;
      }
    }
    assert_eq!(found, Some(full.len() - 2));
  }
}

//! Shader source screening.
//!
//! The layer does not compile GLSL, but it rejects sources the native compiler
//! would otherwise accept in violation of WebGL rules: characters outside the
//! GLSL ES character set, identifiers using the reserved `webgl_` prefixes or
//! exceeding the length limit, and (WebGL 2) `do` loops.

/// Longest identifier accepted in shaders, attribute and uniform names.
pub const MAX_IDENTIFIER_LENGTH: usize = 256;

/// Whether `name` may be used as a GLSL identifier.
pub fn is_valid_identifier(name: &str) -> bool {
    !(name.starts_with("webgl_")
        || name.starts_with("_webgl_")
        || name.len() > MAX_IDENTIFIER_LENGTH)
}

/// Whether `name` is reserved for attribute bindings.
pub fn is_reserved_attrib_name(name: &str) -> bool {
    name.starts_with("webgl_a") || name.starts_with("_webgl_a")
}

fn is_valid_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\u{0B}' | '\u{0C}' | '\r')
        || ((' '..='~').contains(&c) && !matches!(c, '"' | '$' | '`' | '@' | '\\' | '\''))
}

/// Whether every character outside comments belongs to the GLSL ES set.
pub fn is_valid_string(source: &str) -> bool {
    strip_comments(source).chars().all(is_valid_char)
}

fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '/' {
            match chars.peek() {
                Some('/') => {
                    for c in chars.by_ref() {
                        if c == '\n' {
                            out.push('\n');
                            break;
                        }
                    }
                    continue;
                }
                Some('*') => {
                    chars.next();
                    let mut prev = '\0';
                    for c in chars.by_ref() {
                        if prev == '*' && c == '/' {
                            break;
                        }
                        prev = c;
                    }
                    out.push(' ');
                    continue;
                }
                _ => {}
            }
        }
        out.push(c);
    }
    out
}

/// An identifier-like token with its 1-based position.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Word<'a> {
    text: &'a str,
    line: usize,
    column: usize,
}

/// Identifier-like tokens of a source, skipping comments and numbers.
/// Preprocessor directive bodies are scanned as well.
fn words(source: &str) -> Vec<Word<'_>> {
    let bytes = source.as_bytes();
    let mut words = Vec::new();
    let (mut i, mut line, mut line_start) = (0usize, 1usize, 0usize);

    while i < bytes.len() {
        let b = bytes[i];
        match b {
            b'\n' => {
                i += 1;
                line += 1;
                line_start = i;
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                while i < bytes.len() && !(bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/')) {
                    if bytes[i] == b'\n' {
                        line += 1;
                        line_start = i + 1;
                    }
                    i += 1;
                }
                i = (i + 2).min(bytes.len());
            }
            b'0'..=b'9' => {
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'.') {
                    i += 1;
                }
            }
            b'.' if bytes.get(i + 1).is_some_and(u8::is_ascii_digit) => {
                i += 1;
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'.') {
                    i += 1;
                }
            }
            b if b.is_ascii_alphabetic() || b == b'_' => {
                let start = i;
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                words.push(Word {
                    text: &source[start..i],
                    line,
                    column: start - line_start + 1,
                });
            }
            _ => i += 1,
        }
    }
    words
}

/// Screen a WebGL 2 shader source.
///
/// Returns the compile log to record when the source is rejected.
pub fn check_source(source: &str) -> Result<(), String> {
    let mut log = Vec::new();
    for word in words(source) {
        if word.text == "do" {
            log.push(format!("{}:{} do not supported", word.line, word.column));
        } else if !is_valid_identifier(word.text) {
            log.push(format!(
                "{}:{} invalid identifier - {}",
                word.line, word.column, word.text
            ));
        }
    }
    if log.is_empty() {
        Ok(())
    } else {
        Err(log.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_rules() {
        assert!(is_valid_identifier("position"));
        assert!(!is_valid_identifier("webgl_position"));
        assert!(!is_valid_identifier("_webgl_thing"));
        assert!(!is_valid_identifier(&"a".repeat(257)));
        assert!(is_valid_identifier(&"a".repeat(256)));
    }

    #[test]
    fn test_reserved_attrib_names() {
        assert!(is_reserved_attrib_name("webgl_a"));
        assert!(is_reserved_attrib_name("_webgl_attr"));
        assert!(!is_reserved_attrib_name("aPosition"));
    }

    #[test]
    fn test_valid_string_ignores_comments() {
        assert!(is_valid_string("void main() { gl_FragColor = vec4(1.0); }"));
        assert!(is_valid_string("// it's fine in a comment\nvoid main() {}"));
        assert!(is_valid_string("/* $ */ void main() {}"));
        assert!(!is_valid_string("void main() { $x; }"));
        assert!(!is_valid_string("void main() { \"str\"; }"));
    }

    #[test]
    fn test_check_source_reports_positions() {
        let source = "void main() {\n  float webgl_x = 1.0;\n}";
        let log = check_source(source).unwrap_err();
        assert_eq!(log, "2:9 invalid identifier - webgl_x");
    }

    #[test]
    fn test_check_source_rejects_do() {
        let log = check_source("void main() { do { } while (false); }").unwrap_err();
        assert!(log.contains("do not supported"));
    }

    #[test]
    fn test_check_source_scans_preprocessor_and_skips_comments() {
        assert!(check_source("#define webgl_FOO 1\nvoid main() {}").is_err());
        assert!(check_source("// webgl_comment\n/* do */ void main() { float x = 1.0e5; }").is_ok());
    }
}

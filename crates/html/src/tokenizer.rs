//! Resumable HTML tokenizer with a constrained, practical tag-name character set.
//!
//! Supported tag-name characters (ASCII only): `[A-Za-z0-9:_-]`, lowercased on output.
//! Attribute names use the same ASCII character class.
//!
//! Input arrives in chunks through [`Tokenizer::feed`]; [`Tokenizer::next_token`] only
//! hands out a token once all of its text has arrived, so the token sequence does not
//! depend on where the chunk boundaries fall.
//!
//! Known limitations (intentional):
//! - No entity decoding and no rawtext/RCDATA content models.
//! - A tag still unterminated at end of input is dropped.
use memchr::memchr;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    Doctype(String),
    StartTag {
        name: String,
        attributes: Vec<(String, Option<String>)>,
        self_closing: bool,
    },
    EndTag(String),
    Comment(String),
    Text(String),
}

const COMMENT_START: &[u8] = b"<!--";
const COMMENT_END: &[u8] = b"-->";
const DOCTYPE: &[u8] = b"<!doctype";

/// Consumed input is dropped from the buffer once this much has piled up.
const COMPACT_THRESHOLD: usize = 4096;

pub(crate) fn is_void_element(name: &str) -> bool {
    matches!(
        name,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

fn is_name_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'-' || c == b'_' || c == b':'
}

fn starts_with_ignore_ascii_case(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.len() >= needle.len() && haystack[..needle.len()].eq_ignore_ascii_case(needle)
}

fn find_seq(haystack: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    let mut i = from;
    while i + needle.len() <= haystack.len() {
        i += memchr(needle[0], &haystack[i..])?;
        if haystack[i..].starts_with(needle) {
            return Some(i);
        }
        i += 1;
    }
    None
}

/// Index of the `>` closing a start tag, skipping quoted attribute values.
fn find_tag_end(bytes: &[u8], from: usize) -> Option<usize> {
    let mut i = from;
    let mut after_eq = false;
    while i < bytes.len() {
        let c = bytes[i];
        if after_eq && (c == b'"' || c == b'\'') {
            let close = memchr(c, &bytes[i + 1..])?;
            i += close + 2;
            after_eq = false;
            continue;
        }
        if c == b'>' {
            return Some(i);
        }
        if c == b'=' {
            after_eq = true;
        } else if !c.is_ascii_whitespace() {
            after_eq = false;
        }
        i += 1;
    }
    None
}

enum Scan {
    Token(Token, usize),
    Skip(usize),
    NeedMore,
}

/// `input` starts at an unconsumed position; `eof` says no more input will follow.
fn scan(input: &str, eof: bool) -> Scan {
    let bytes = input.as_bytes();
    if bytes[0] != b'<' {
        return scan_text(input, 0, eof);
    }
    if bytes.len() < 2 {
        return if eof {
            Scan::Token(Token::Text(input.to_string()), bytes.len())
        } else {
            Scan::NeedMore
        };
    }
    match bytes[1] {
        b'!' => scan_declaration(input, eof),
        b'/' => scan_end_tag(input, eof),
        c if c.is_ascii_alphabetic() => scan_start_tag(input, eof),
        _ => scan_text(input, 1, eof),
    }
}

fn scan_text(input: &str, from: usize, eof: bool) -> Scan {
    let bytes = input.as_bytes();
    match memchr(b'<', &bytes[from..]) {
        Some(rel) => {
            let end = from + rel;
            Scan::Token(Token::Text(input[..end].to_string()), end)
        }
        None if eof => Scan::Token(Token::Text(input.to_string()), bytes.len()),
        None => Scan::NeedMore,
    }
}

fn scan_declaration(input: &str, eof: bool) -> Scan {
    let bytes = input.as_bytes();
    if bytes.starts_with(COMMENT_START) {
        let body = COMMENT_START.len();
        return match find_seq(bytes, body, COMMENT_END) {
            Some(end) => Scan::Token(
                Token::Comment(input[body..end].to_string()),
                end + COMMENT_END.len(),
            ),
            None if eof => Scan::Token(Token::Comment(input[body..].to_string()), bytes.len()),
            None => Scan::NeedMore,
        };
    }
    if !eof && bytes.len() < COMMENT_START.len() && COMMENT_START.starts_with(bytes) {
        return Scan::NeedMore;
    }
    let Some(end) = memchr(b'>', bytes) else {
        return if eof {
            Scan::Skip(bytes.len())
        } else {
            Scan::NeedMore
        };
    };
    let token = if starts_with_ignore_ascii_case(bytes, DOCTYPE) {
        Token::Doctype(input[2..end].trim().to_string())
    } else {
        Token::Comment(input[2..end].to_string())
    };
    Scan::Token(token, end + 1)
}

fn scan_end_tag(input: &str, eof: bool) -> Scan {
    let bytes = input.as_bytes();
    let Some(end) = memchr(b'>', bytes) else {
        return if eof {
            Scan::Skip(bytes.len())
        } else {
            Scan::NeedMore
        };
    };
    let mut j = 2;
    while j < end && is_name_char(bytes[j]) {
        j += 1;
    }
    if j == 2 {
        return Scan::Skip(end + 1);
    }
    Scan::Token(Token::EndTag(input[2..j].to_ascii_lowercase()), end + 1)
}

fn scan_start_tag(input: &str, eof: bool) -> Scan {
    match find_tag_end(input.as_bytes(), 1) {
        Some(end) => Scan::Token(parse_start_tag(&input[1..end]), end + 1),
        None if eof => Scan::Skip(input.len()),
        None => Scan::NeedMore,
    }
}

/// Parses the text between `<` and `>` of a start tag.
fn parse_start_tag(inner: &str) -> Token {
    let bytes = inner.as_bytes();
    let len = bytes.len();
    let mut k = 0;
    while k < len && is_name_char(bytes[k]) {
        k += 1;
    }
    let name = inner[..k].to_ascii_lowercase();
    let mut attributes: Vec<(String, Option<String>)> = Vec::new();
    let mut self_closing = false;

    let skip_whitespace = |k: &mut usize| {
        while *k < len && bytes[*k].is_ascii_whitespace() {
            *k += 1;
        }
    };

    loop {
        skip_whitespace(&mut k);
        if k >= len {
            break;
        }
        if bytes[k] == b'/' {
            if k + 1 == len {
                self_closing = true;
            }
            k += 1;
            continue;
        }
        let name_start = k;
        while k < len && is_name_char(bytes[k]) {
            k += 1;
        }
        if name_start == k {
            k += 1;
            continue;
        }
        let attribute_name = inner[name_start..k].to_ascii_lowercase();

        skip_whitespace(&mut k);
        let value = if k < len && bytes[k] == b'=' {
            k += 1;
            skip_whitespace(&mut k);
            if k < len && (bytes[k] == b'"' || bytes[k] == b'\'') {
                let quote = bytes[k];
                k += 1;
                let vstart = k;
                while k < len && bytes[k] != quote {
                    k += 1;
                }
                let raw = &inner[vstart..k];
                if k < len {
                    k += 1;
                }
                Some(raw.to_string())
            } else {
                let vstart = k;
                while k < len && !bytes[k].is_ascii_whitespace() {
                    if bytes[k] == b'/' && k + 1 == len {
                        break;
                    }
                    k += 1;
                }
                Some(inner[vstart..k].to_string())
            }
        } else {
            None
        };
        if !attributes.iter().any(|(existing, _)| *existing == attribute_name) {
            attributes.push((attribute_name, value));
        }
    }
    if is_void_element(&name) {
        self_closing = true;
    }
    Token::StartTag {
        name,
        attributes,
        self_closing,
    }
}

#[derive(Debug, Default)]
pub struct Tokenizer {
    buffer: String,
    cursor: usize,
    finished: bool,
}

impl Tokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, chunk: &str) {
        debug_assert!(!self.finished, "feed after finish");
        if self.cursor >= COMPACT_THRESHOLD || self.cursor == self.buffer.len() {
            // The cursor only ever rests on ASCII structural bytes or the end of the
            // buffer, so it is a char boundary.
            self.buffer.drain(..self.cursor);
            self.cursor = 0;
        }
        self.buffer.push_str(chunk);
    }

    /// Marks end of input; everything still buffered becomes available.
    pub fn finish(&mut self) {
        self.finished = true;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Whether every buffered byte has been turned into tokens (or dropped).
    pub fn is_drained(&self) -> bool {
        self.cursor >= self.buffer.len()
    }

    pub fn next_token(&mut self) -> Option<Token> {
        loop {
            if self.is_drained() {
                return None;
            }
            match scan(&self.buffer[self.cursor..], self.finished) {
                Scan::Token(token, used) => {
                    self.cursor += used;
                    return Some(token);
                }
                Scan::Skip(used) => {
                    log::trace!(target: "html.tokenizer", "dropped {used} byte(s) of malformed markup");
                    self.cursor += used;
                }
                Scan::NeedMore => return None,
            }
        }
    }
}

/// Tokenizes a complete input in one go.
pub fn tokenize(input: &str) -> Vec<Token> {
    let mut tokenizer = Tokenizer::new();
    tokenizer.feed(input);
    tokenizer.finish();
    std::iter::from_fn(|| tokenizer.next_token()).collect()
}

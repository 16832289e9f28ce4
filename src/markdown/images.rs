//! Inline image target scanning over raw markdown source.
//!
//! Rewrites must leave every byte outside an image destination untouched, so
//! instead of round tripping through a rendered AST this module reports
//! byte spans of destinations in the original text. Block structure (code
//! and raw HTML blocks) comes from comrak source positions; inline syntax is
//! scanned directly.

use comrak::nodes::NodeValue;
use comrak::{Arena, Options, parse_document};
use std::collections::{HashMap, HashSet};
use std::ops::Range;

/// Destination of an inline image `![alt](destination "title")`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ImageTarget<'a> {
    /// Byte range of the destination, without `<...>` brackets or title.
    pub span: Range<usize>,
    /// Destination text as written.
    pub url: &'a str,
}

/// Finds all inline image destinations, left to right, non-overlapping.
///
/// Content of fenced or indented code blocks, raw HTML blocks and inline
/// code spans is skipped.
pub(crate) fn find_image_targets(source: &str) -> Vec<ImageTarget<'_>> {
    let skipped = block_ranges(source);
    let delimiters = Delimiters::match_in(source.as_bytes(), &skipped);
    let bytes = source.as_bytes();
    let mut targets = Vec::new();
    let mut blocks = skipped.iter().peekable();
    let mut pos = 0;

    while pos < bytes.len() {
        while blocks.next_if(|range| range.end <= pos).is_some() {}
        if let Some(range) = blocks.peek()
            && range.contains(&pos)
        {
            pos = range.end;
            continue;
        }

        match bytes[pos] {
            b'\\' => pos += 2,
            b'`' => pos = skip_code_span(bytes, pos),
            b'!' if bytes.get(pos + 1) == Some(&b'[') => {
                match parse_image(source, pos, &delimiters) {
                    Some((target, end)) => {
                        targets.push(target);
                        pos = end;
                    }
                    None => pos += 1,
                }
            }
            _ => pos += 1,
        }
    }

    targets
}

/// Byte ranges of code and raw HTML blocks, sorted by start.
fn block_ranges(source: &str) -> Vec<Range<usize>> {
    let line_starts: Vec<usize> = std::iter::once(0)
        .chain(source.match_indices('\n').map(|(i, _)| i + 1))
        .collect();
    let line_offset = |line: usize| {
        line.checked_sub(1)
            .and_then(|i| line_starts.get(i))
            .copied()
            .unwrap_or(source.len())
    };

    let arena = Arena::new();
    let options = Options::default();
    let root = parse_document(&arena, source, &options);

    let mut ranges: Vec<Range<usize>> = root
        .descendants()
        .filter_map(|node| {
            let ast = node.data.borrow();
            if !matches!(ast.value, NodeValue::CodeBlock(_) | NodeValue::HtmlBlock(_)) {
                return None;
            }
            let start = line_offset(ast.sourcepos.start.line);
            let end = line_offset(ast.sourcepos.end.line + 1);
            (start < end).then_some(start..end)
        })
        .collect();

    ranges.sort_by_key(|range| range.start);
    ranges
}

/// Matching bracket and parenthesis offsets, found in one pass each.
///
/// Lookups stay constant time per `![`, so unclosed openers never cause
/// the source to be rescanned.
#[derive(Debug, Default)]
struct Delimiters {
    /// `[` offset to its `]`. Pairs never cross a blank line, a block or a
    /// code span boundary.
    brackets: HashMap<usize, usize>,
    /// `(` offset to its `)` on the same line.
    parens: HashMap<usize, usize>,
    /// Innermost `(` still open at its line end, with a balanced remainder.
    open_at_line_end: HashSet<usize>,
}

impl Delimiters {
    fn match_in(bytes: &[u8], skipped: &[Range<usize>]) -> Self {
        let mut delimiters = Self::default();
        delimiters.match_brackets(bytes, skipped);
        delimiters.match_parens(bytes);
        delimiters
    }

    fn match_brackets(&mut self, bytes: &[u8], skipped: &[Range<usize>]) {
        let mut open = Vec::new();
        let mut blocks = skipped.iter().peekable();
        let mut pos = 0;

        while pos < bytes.len() {
            while blocks.next_if(|range| range.end <= pos).is_some() {}
            if let Some(range) = blocks.peek()
                && range.contains(&pos)
            {
                open.clear();
                pos = range.end;
                continue;
            }

            match bytes[pos] {
                b'\\' => pos += 2,
                b'`' => pos = skip_code_span(bytes, pos),
                b'[' => {
                    open.push(pos);
                    pos += 1;
                }
                b']' => {
                    if let Some(start) = open.pop() {
                        self.brackets.insert(start, pos);
                    }
                    pos += 1;
                }
                b'\n' => {
                    if blank_line_follows(bytes, pos) {
                        open.clear();
                    }
                    pos += 1;
                }
                _ => pos += 1,
            }
        }
    }

    fn match_parens(&mut self, bytes: &[u8]) {
        let mut open = Vec::new();
        let mut pos = 0;

        while pos < bytes.len() {
            match bytes[pos] {
                b'\\' if !matches!(bytes.get(pos + 1), Some(b'\n' | b'\r')) => pos += 1,
                b'(' => open.push(pos),
                b')' => {
                    if let Some(start) = open.pop() {
                        self.parens.insert(start, pos);
                    }
                }
                b'\n' | b'\r' => self.close_line(&mut open),
                _ => {}
            }
            pos += 1;
        }

        self.close_line(&mut open);
    }

    fn close_line(&mut self, open: &mut Vec<usize>) {
        if let Some(&innermost) = open.last() {
            self.open_at_line_end.insert(innermost);
        }
        open.clear();
    }
}

/// Parses image starting at `!`, returning target and end offset.
fn parse_image<'a>(
    source: &'a str,
    bang: usize,
    delimiters: &Delimiters,
) -> Option<(ImageTarget<'a>, usize)> {
    let bytes = source.as_bytes();

    let alt_end = *delimiters.brackets.get(&(bang + 1))?;
    let open = alt_end + 1;
    if bytes.get(open) != Some(&b'(') {
        return None;
    }

    let start = skip_inline_whitespace(bytes, open + 1);

    // Angle bracket destination: <disk::a b.png>
    let (span, close) = if bytes.get(start) == Some(&b'<') {
        let close_angle = find_unescaped(bytes, start + 1, b'>', Some(b'<'))?;
        let close = parse_title_tail(bytes, close_angle + 1)?;
        (start + 1..close_angle, close)
    } else if let Some(&close) = delimiters.parens.get(&open) {
        (start..destination_end(bytes, start, close), close)
    } else if delimiters.open_at_line_end.contains(&open) {
        parse_wrapped_title(bytes, start)?
    } else {
        return None;
    };

    Some((
        ImageTarget {
            url: &source[span.clone()],
            span,
        },
        close + 1,
    ))
}

/// Parses a destination that ends its line, with the title on the next.
///
/// `![a](disk::a.png` followed by `"Title")` on the following line.
fn parse_wrapped_title(bytes: &[u8], start: usize) -> Option<(Range<usize>, usize)> {
    let line_end = start + bytes[start..].iter().position(|&b| b == b'\n' || b == b'\r')?;
    let end = trim_inline_whitespace_end(bytes, start, line_end);
    if end == start {
        return None;
    }

    let next_line = if bytes[line_end..].starts_with(b"\r\n") {
        line_end + 2
    } else {
        line_end + 1
    };
    let title = skip_inline_whitespace(bytes, next_line);
    if !matches!(bytes.get(title), Some(b'"') | Some(b'\'')) {
        return None;
    }

    let close = parse_title_tail(bytes, title)?;
    Some((start..end, close))
}

/// End of the destination within `start..close`, excluding a trailing title.
///
/// A title is a quoted string at the end, separated from the destination
/// by whitespace. Trailing whitespace is never part of the destination.
fn destination_end(bytes: &[u8], start: usize, close: usize) -> usize {
    let end = trim_inline_whitespace_end(bytes, start, close);
    if end < start + 2 {
        return end;
    }

    let quote = bytes[end - 1];
    if quote != b'"' && quote != b'\'' {
        return end;
    }

    let mut pos = end - 1;
    while pos > start + 1 {
        pos -= 1;
        if bytes[pos] == quote && is_inline_whitespace(bytes[pos - 1]) && !is_escaped(bytes, start, pos)
        {
            return trim_inline_whitespace_end(bytes, start, pos);
        }
    }

    end
}

/// Parses optional title after an angle destination, returning `)` offset.
fn parse_title_tail(bytes: &[u8], start: usize) -> Option<usize> {
    let mut pos = skip_inline_whitespace(bytes, start);

    if let Some(&quote) = bytes.get(pos)
        && (quote == b'"' || quote == b'\'')
    {
        pos = find_unescaped(bytes, pos + 1, quote, None)? + 1;
        pos = skip_inline_whitespace(bytes, pos);
    }

    (bytes.get(pos) == Some(&b')')).then_some(pos)
}

/// Finds unescaped `target` on the current line, failing on `forbidden`.
fn find_unescaped(bytes: &[u8], start: usize, target: u8, forbidden: Option<u8>) -> Option<usize> {
    let mut pos = start;

    while pos < bytes.len() {
        match bytes[pos] {
            b'\\' => pos += 1,
            b'\n' | b'\r' => return None,
            b if b == target => return Some(pos),
            b if Some(b) == forbidden => return None,
            _ => {}
        }
        pos += 1;
    }

    None
}

/// Skips an inline code span, or just the backtick run if unclosed.
fn skip_code_span(bytes: &[u8], start: usize) -> usize {
    let open = run_length(bytes, start, b'`');
    let mut pos = start + open;

    while pos < bytes.len() {
        match bytes[pos] {
            b'`' => {
                let run = run_length(bytes, pos, b'`');
                if run == open {
                    return pos + run;
                }
                pos += run;
            }
            b'\n' if blank_line_follows(bytes, pos) => break,
            _ => pos += 1,
        }
    }

    start + open
}

fn run_length(bytes: &[u8], start: usize, byte: u8) -> usize {
    bytes[start..].iter().take_while(|&&b| b == byte).count()
}

/// Whether the line after the newline at `newline` is blank.
fn blank_line_follows(bytes: &[u8], newline: usize) -> bool {
    let pos = skip_inline_whitespace(bytes, newline + 1);
    matches!(bytes.get(pos), None | Some(b'\n') | Some(b'\r'))
}

fn is_escaped(bytes: &[u8], floor: usize, pos: usize) -> bool {
    bytes[floor..pos]
        .iter()
        .rev()
        .take_while(|&&b| b == b'\\')
        .count()
        % 2
        == 1
}

fn is_inline_whitespace(byte: u8) -> bool {
    byte == b' ' || byte == b'\t'
}

fn skip_inline_whitespace(bytes: &[u8], start: usize) -> usize {
    let mut pos = start;
    while pos < bytes.len() && is_inline_whitespace(bytes[pos]) {
        pos += 1;
    }
    pos
}

fn trim_inline_whitespace_end(bytes: &[u8], start: usize, end: usize) -> usize {
    let mut end = end;
    while end > start && is_inline_whitespace(bytes[end - 1]) {
        end -= 1;
    }
    end
}

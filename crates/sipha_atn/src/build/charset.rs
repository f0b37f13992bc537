//! # Character Data of Lexer Rules
//!
//! Escape decoding for string literals and `[...]` sets, case folding of
//! character ranges and the accumulation of set elements with collision
//! reporting.
//!
//! ## Escapes
//!
//! | Escape | Literal | Set |
//! |---|---|---|
//! | `\n \r \t \b \f \\` | yes | yes |
//! | `\'` | yes | no |
//! | `\-` `\]` | no | yes |
//! | `\uXXXX`, `\u{X..XXXXXX}` | yes | yes |
//! | `\p{Name}`, `\P{Name}` | no | yes |
//!
//! Unicode property names are whatever `regex-syntax` understands inside
//! `\p{...}`: general categories, scripts and binary properties.

use std::mem;

use regex_syntax::hir::{Class, HirKind};

use crate::error::{DiagnosticKind, Diagnostics};
use crate::grammar::SourcePos;
use crate::interval::{IntervalSet, char_literal};
use crate::symbol;

/// Where an escape occurs; the accepted escapes differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EscapeContext {
    Literal,
    CharSet,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Escape {
    CodePoint(i32),
    Property(IntervalSet),
    Invalid,
}

/// A decoded escape and the number of chars it spans, backslash included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParsedEscape {
    pub(crate) escape: Escape,
    pub(crate) len: usize,
}

impl ParsedEscape {
    const fn code_point(cp: i32, len: usize) -> Self {
        Self {
            escape: Escape::CodePoint(cp),
            len,
        }
    }

    const fn invalid(len: usize) -> Self {
        Self {
            escape: Escape::Invalid,
            len,
        }
    }
}

/// Decode the escape whose backslash is at `chars[start]`.
pub(crate) fn parse_escape(chars: &[char], start: usize, context: EscapeContext) -> ParsedEscape {
    let Some(&c) = chars.get(start + 1) else {
        return ParsedEscape::invalid(1);
    };
    match c {
        'n' => ParsedEscape::code_point(0x0A, 2),
        'r' => ParsedEscape::code_point(0x0D, 2),
        't' => ParsedEscape::code_point(0x09, 2),
        'b' => ParsedEscape::code_point(0x08, 2),
        'f' => ParsedEscape::code_point(0x0C, 2),
        '\\' => ParsedEscape::code_point('\\' as i32, 2),
        '\'' if context == EscapeContext::Literal => ParsedEscape::code_point('\'' as i32, 2),
        '-' | ']' if context == EscapeContext::CharSet => ParsedEscape::code_point(c as i32, 2),
        'u' => parse_unicode_escape(chars, start),
        'p' | 'P' if context == EscapeContext::CharSet => {
            parse_property_escape(chars, start, c == 'P')
        }
        _ => ParsedEscape::invalid(2),
    }
}

/// `\uXXXX` or `\u{X..XXXXXX}`.
fn parse_unicode_escape(chars: &[char], start: usize) -> ParsedEscape {
    let digits_start = start + 2;
    if chars.get(digits_start) == Some(&'{') {
        let Some(close) = find_close_brace(chars, digits_start + 1) else {
            return ParsedEscape::invalid(chars.len() - start);
        };
        let len = close + 1 - start;
        let digits = &chars[digits_start + 1..close];
        if digits.is_empty() || digits.len() > 6 {
            return ParsedEscape::invalid(len);
        }
        return match hex_value(digits) {
            Some(cp) if cp <= symbol::MAX_CHAR_VALUE => ParsedEscape::code_point(cp, len),
            _ => ParsedEscape::invalid(len),
        };
    }

    let end = (digits_start + 4).min(chars.len());
    let digits = &chars[digits_start..end];
    match hex_value(digits) {
        Some(cp) if digits.len() == 4 => ParsedEscape::code_point(cp, end - start),
        _ => ParsedEscape::invalid(end - start),
    }
}

/// `\p{Name}` or `\P{Name}`.
fn parse_property_escape(chars: &[char], start: usize, negated: bool) -> ParsedEscape {
    let open = start + 2;
    if chars.get(open) != Some(&'{') {
        return ParsedEscape::invalid((open + 1).min(chars.len()) - start);
    }
    let Some(close) = find_close_brace(chars, open + 1) else {
        return ParsedEscape::invalid(chars.len() - start);
    };
    let len = close + 1 - start;
    let name: String = chars[open + 1..close].iter().collect();
    match unicode_property(&name) {
        Some(set) if negated => ParsedEscape {
            escape: Escape::Property(set.complement(&IntervalSet::complete_char_set())),
            len,
        },
        Some(set) => ParsedEscape {
            escape: Escape::Property(set),
            len,
        },
        None => ParsedEscape::invalid(len),
    }
}

fn find_close_brace(chars: &[char], from: usize) -> Option<usize> {
    chars
        .get(from..)?
        .iter()
        .position(|&c| c == '}')
        .map(|offset| from + offset)
}

fn hex_value(digits: &[char]) -> Option<i32> {
    if digits.is_empty() || !digits.iter().all(char::is_ascii_hexdigit) {
        return None;
    }
    let text: String = digits.iter().collect();
    i32::from_str_radix(&text, 16).ok()
}

/// Code points of the Unicode property `name`, resolved through
/// `regex-syntax`.
pub(crate) fn unicode_property(name: &str) -> Option<IntervalSet> {
    if name.is_empty() {
        return None;
    }
    let hir = regex_syntax::Parser::new()
        .parse(&format!("\\p{{{name}}}"))
        .ok()?;
    let mut set = IntervalSet::new();
    match hir.kind() {
        HirKind::Class(Class::Unicode(class)) => {
            for range in class.ranges() {
                set.add_range(range.start() as i32, range.end() as i32);
            }
        }
        HirKind::Literal(lit) => {
            for c in std::str::from_utf8(&lit.0).ok()?.chars() {
                set.add(c as i32);
            }
        }
        _ => return None,
    }
    Some(set)
}

/// Code points of a string literal's contents.
///
/// Returns the offending escape sequence when one does not decode.
pub(crate) fn unescape_literal(text: &str) -> Result<Vec<i32>, String> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = Vec::with_capacity(chars.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '\\' {
            out.push(chars[i] as i32);
            i += 1;
            continue;
        }
        let parsed = parse_escape(&chars, i, EscapeContext::Literal);
        let end = (i + parsed.len).min(chars.len());
        match parsed.escape {
            Escape::CodePoint(cp) => out.push(cp),
            Escape::Property(_) | Escape::Invalid => return Err(chars[i..end].iter().collect()),
        }
        i = end;
    }
    Ok(out)
}

/// The single code point a literal stands for, if it stands for exactly one.
pub(crate) fn char_value_of_literal(text: &str) -> Option<i32> {
    match unescape_literal(text).ok()?.as_slice() {
        [cp] => Some(*cp),
        _ => None,
    }
}

/// Validate the endpoints of `'from'..'to'`, reporting why a range is
/// unusable.
pub(crate) fn checked_range(
    diagnostics: &mut Diagnostics,
    pos: Option<SourcePos>,
    from: &str,
    to: &str,
) -> Option<(i32, i32)> {
    let a = char_value_of_literal(from);
    let b = char_value_of_literal(to);
    for (value, text) in [(a, from), (b, to)] {
        if value.is_none() {
            diagnostics.report(
                DiagnosticKind::InvalidLiteralInLexerSet {
                    text: format!("'{text}'"),
                },
                pos,
            );
        }
    }
    let (a, b) = (a?, b?);
    if b < a {
        diagnostics.report(
            DiagnosticKind::EmptyStringsAndSetsNotAllowed {
                text: format!("'{from}'..'{to}'"),
            },
            pos,
        );
        return None;
    }
    Some((a, b))
}

fn simple_lower(cp: i32) -> i32 {
    fold_with(cp, char::to_lowercase)
}

fn simple_upper(cp: i32) -> i32 {
    fold_with(cp, char::to_uppercase)
}

/// Single-char case mapping; mappings that expand to several chars keep
/// the original.
fn fold_with<I: Iterator<Item = char>>(cp: i32, map: impl Fn(char) -> I) -> i32 {
    let Some(c) = u32::try_from(cp).ok().and_then(char::from_u32) else {
        return cp;
    };
    let mut mapped = map(c);
    match (mapped.next(), mapped.next()) {
        (Some(m), None) => m as i32,
        _ => cp,
    }
}

/// Lower- and upper-case images of a range's endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CaseFold {
    pub(crate) lower_from: i32,
    pub(crate) upper_from: i32,
    pub(crate) lower_to: i32,
    pub(crate) upper_to: i32,
    /// One endpoint is lower case and the other is not.
    pub(crate) mixed: bool,
}

impl CaseFold {
    pub(crate) fn of(from: i32, to: i32) -> Self {
        let lower_from = simple_lower(from);
        let lower_to = simple_lower(to);
        Self {
            lower_from,
            upper_from: simple_upper(from),
            lower_to,
            upper_to: simple_upper(to),
            mixed: (lower_from == from) != (lower_to == to),
        }
    }

    /// Folding does not produce two parallel ranges of equal length.
    pub(crate) const fn is_single_range(&self) -> bool {
        (self.lower_from == self.upper_from && self.lower_to == self.upper_to)
            || self.mixed
            || (self.lower_to - self.lower_from != self.upper_to - self.upper_from)
    }

    /// Both folded ranges, for a case-insensitive match.
    pub(crate) fn both_ranges(&self) -> IntervalSet {
        let mut set = IntervalSet::of_range(self.lower_from, self.lower_to);
        set.add_range(self.upper_from, self.upper_to);
        set
    }
}

/// Fold `from..to` and warn when an ASCII range spanning both cases also
/// covers characters that are not letters.
pub(crate) fn check_case_fold(
    diagnostics: &mut Diagnostics,
    pos: Option<SourcePos>,
    from: i32,
    to: i32,
) -> CaseFold {
    let fold = CaseFold::of(from, to);
    if fold.mixed && from <= 0x7F && to <= 0x7F {
        let chars: String = (from..to)
            .filter_map(|cp| u32::try_from(cp).ok().and_then(char::from_u32))
            .filter(|c| !c.is_alphabetic())
            .collect();
        if !chars.is_empty() {
            diagnostics.report(
                DiagnosticKind::RangeProbablyContainsNotImpliedCharacters {
                    from: display_char(from),
                    to: display_char(to),
                    chars,
                },
                pos,
            );
        }
    }
    fold
}

fn display_char(cp: i32) -> String {
    u32::try_from(cp)
        .ok()
        .and_then(char::from_u32)
        .map_or_else(|| format!("\\u{{{cp:X}}}"), String::from)
}

/// A code point as written inside a set, without quotes.
fn escaped_char(cp: i32) -> String {
    let quoted = char_literal(cp);
    quoted[1..quoted.len() - 1].to_string()
}

/// Accumulates a lexer set, reporting characters added more than once.
pub(crate) struct SetCollector<'d> {
    diagnostics: &'d mut Diagnostics,
    pos: Option<SourcePos>,
    case_insensitive: bool,
    text: String,
    set: IntervalSet,
}

impl<'d> SetCollector<'d> {
    pub(crate) fn new(
        diagnostics: &'d mut Diagnostics,
        pos: Option<SourcePos>,
        case_insensitive: bool,
        text: String,
    ) -> Self {
        Self {
            diagnostics,
            pos,
            case_insensitive,
            text,
            set: IntervalSet::new(),
        }
    }

    pub(crate) fn diagnostics(&mut self) -> &mut Diagnostics {
        &mut *self.diagnostics
    }

    pub(crate) fn report(&mut self, kind: DiagnosticKind) {
        self.diagnostics.report(kind, self.pos);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Add `a..=b`, both cases of it when case-insensitive.
    pub(crate) fn add_range(&mut self, a: i32, b: i32) {
        let fold = check_case_fold(&mut *self.diagnostics, self.pos, a, b);
        if self.case_insensitive && !fold.is_single_range() {
            let collided = self.add_checked(fold.lower_from, fold.lower_to, false);
            self.add_checked(fold.upper_from, fold.upper_to, collided);
        } else {
            self.add_checked(a, b, false);
        }
    }

    /// Add without collision checks.
    pub(crate) fn add_set(&mut self, other: &IntervalSet) {
        self.set.add_all(other);
    }

    fn add_checked(&mut self, a: i32, b: i32, already_reported: bool) -> bool {
        let mut collided = already_reported;
        if !collided && !self.set.and(&IntervalSet::of_range(a, b)).is_empty() {
            let chars = if a == b {
                display_char(a)
            } else {
                format!("{}-{}", display_char(a), display_char(b))
            };
            let set = self.text.clone();
            self.report(DiagnosticKind::CharactersCollisionInSet { chars, set });
            collided = true;
        }
        self.set.add_range(a, b);
        collided
    }

    pub(crate) fn finish(self) -> IntervalSet {
        self.set
    }
}

#[derive(Debug, Default)]
enum Previous {
    #[default]
    None,
    CodePoint(i32),
    Property(IntervalSet),
}

#[derive(Debug, Default)]
struct CharSetState {
    previous: Previous,
    in_range: bool,
}

/// Parse the contents of a `[...]` set.
///
/// A `-` is a range operator only between two code points; at either end
/// of the set, right after a finished range or right after another `-` it
/// stands for itself. Any error yields the empty set.
pub(crate) fn char_set_literal(
    diagnostics: &mut Diagnostics,
    pos: Option<SourcePos>,
    case_insensitive: bool,
    text: &str,
) -> IntervalSet {
    let set_text = format!("[{text}]");
    let reported = diagnostics.len();
    let mut collector = SetCollector::new(diagnostics, pos, case_insensitive, set_text.clone());
    let chars: Vec<char> = text.chars().collect();
    let n = chars.len();
    let mut state = CharSetState::default();

    let mut i = 0;
    while i < n {
        let c = chars[i];
        let mut len = 1;
        if c == '\\' {
            let parsed = parse_escape(&chars, i, EscapeContext::CharSet);
            len = parsed.len.max(1);
            match parsed.escape {
                Escape::Invalid => {
                    let end = (i + len).min(n);
                    collector.report(DiagnosticKind::InvalidEscapeSequence {
                        sequence: chars[i..end].iter().collect(),
                    });
                    return IntervalSet::new();
                }
                Escape::CodePoint(cp) => collector.move_to_code_point(&mut state, cp),
                Escape::Property(property) => {
                    if state.in_range {
                        collector.report(DiagnosticKind::UnicodePropertyNotAllowedInRange {
                            set: set_text,
                        });
                        return IntervalSet::new();
                    }
                    let previous = mem::replace(&mut state.previous, Previous::Property(property));
                    collector.apply(previous);
                }
            }
        } else if c == '-'
            && !state.in_range
            && i != 0
            && i != n - 1
            && !matches!(state.previous, Previous::None)
        {
            if matches!(state.previous, Previous::Property(_)) {
                collector.report(DiagnosticKind::UnicodePropertyNotAllowedInRange { set: set_text });
                return IntervalSet::new();
            }
            state.in_range = true;
        } else {
            collector.move_to_code_point(&mut state, c as i32);
        }
        i += len;
    }

    collector.apply(state.previous);
    // an inverted range already explained why the set is empty
    if collector.is_empty() && (text.is_empty() || collector.diagnostics().len() == reported) {
        collector.report(DiagnosticKind::EmptyStringsAndSetsNotAllowed {
            text: "[]".to_string(),
        });
    }
    collector.finish()
}

impl SetCollector<'_> {
    fn move_to_code_point(&mut self, state: &mut CharSetState, cp: i32) {
        if state.in_range {
            if let Previous::CodePoint(from) = state.previous {
                if from > cp {
                    self.report(DiagnosticKind::EmptyStringsAndSetsNotAllowed {
                        text: format!("{}-{}", escaped_char(from), escaped_char(cp)),
                    });
                } else {
                    self.add_range(from, cp);
                }
            }
            *state = CharSetState::default();
        } else {
            let previous = mem::replace(&mut state.previous, Previous::CodePoint(cp));
            self.apply(previous);
        }
    }

    fn apply(&mut self, previous: Previous) {
        match previous {
            Previous::None => {}
            Previous::CodePoint(cp) => self.add_range(cp, cp),
            Previous::Property(property) => self.add_set(&property),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::Interval;

    fn parse(text: &str) -> (IntervalSet, Diagnostics) {
        let mut diags = Diagnostics::new();
        let set = char_set_literal(&mut diags, None, false, text);
        (set, diags)
    }

    #[test]
    fn test_unescape_literal() {
        assert_eq!(
            unescape_literal("a\\n\\u0041\\u{1F600}"),
            Ok(vec!['a' as i32, 0x0A, 0x41, 0x1F600])
        );
        assert_eq!(unescape_literal("\\q"), Err("\\q".to_string()));
        assert_eq!(unescape_literal("\\u{110000}"), Err("\\u{110000}".to_string()));
        assert_eq!(unescape_literal("\\u12"), Err("\\u12".to_string()));
    }

    #[test]
    fn test_char_value_of_literal() {
        assert_eq!(char_value_of_literal("x"), Some('x' as i32));
        assert_eq!(char_value_of_literal("\\t"), Some(0x09));
        assert_eq!(char_value_of_literal("xy"), None);
        assert_eq!(char_value_of_literal(""), None);
    }

    #[test]
    fn test_char_set_ranges_and_dashes() {
        let (set, diags) = parse("a-z_");
        assert!(diags.is_empty());
        assert_eq!(
            set.intervals(),
            &[Interval::new('_' as i32, '_' as i32), Interval::new('a' as i32, 'z' as i32)]
        );

        let (set, _) = parse("-a-");
        assert!(set.contains('-' as i32));
        assert!(set.contains('a' as i32));
        assert_eq!(set.size(), 2);
    }

    #[test]
    fn test_char_set_escapes() {
        let (set, diags) = parse("\\]\\-\\n");
        assert!(diags.is_empty());
        assert!(set.contains(']' as i32));
        assert!(set.contains('-' as i32));
        assert!(set.contains(0x0A));
    }

    #[test]
    fn test_char_set_inverted_range() {
        let (set, diags) = parse("z-a");
        assert!(set.is_empty());
        let kinds: Vec<_> = diags.iter().map(|d| d.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![DiagnosticKind::EmptyStringsAndSetsNotAllowed {
                text: "z-a".into()
            }]
        );
    }

    #[test]
    fn test_empty_char_set_is_reported() {
        let (set, diags) = parse("");
        assert!(set.is_empty());
        let kinds: Vec<_> = diags.iter().map(|d| d.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![DiagnosticKind::EmptyStringsAndSetsNotAllowed {
                text: "[]".into()
            }]
        );
    }

    #[test]
    fn test_char_set_property() {
        let (set, diags) = parse("\\p{Lu}");
        assert!(diags.is_empty());
        assert!(set.contains('A' as i32));
        assert!(!set.contains('a' as i32));

        let (set, _) = parse("\\P{Lu}");
        assert!(set.contains('a' as i32));
        assert!(!set.contains('A' as i32));
    }

    #[test]
    fn test_property_cannot_start_range() {
        let (set, diags) = parse("\\p{Lu}-z");
        assert!(set.is_empty());
        assert!(matches!(
            diags.iter().next().map(|d| &d.kind),
            Some(DiagnosticKind::UnicodePropertyNotAllowedInRange { .. })
        ));
    }

    #[test]
    fn test_unknown_property_is_invalid_escape() {
        let (set, diags) = parse("\\p{NoSuchProperty}");
        assert!(set.is_empty());
        assert!(matches!(
            diags.iter().next().map(|d| &d.kind),
            Some(DiagnosticKind::InvalidEscapeSequence { .. })
        ));
    }

    #[test]
    fn test_collision_reported_once() {
        let (set, diags) = parse("a-fc");
        assert_eq!(set.size(), 6);
        assert_eq!(diags.len(), 1);
        assert_eq!(
            diags.iter().next().map(|d| d.kind.clone()),
            Some(DiagnosticKind::CharactersCollisionInSet {
                chars: "c".into(),
                set: "[a-fc]".into(),
            })
        );
    }

    #[test]
    fn test_case_fold() {
        let letters = CaseFold::of('a' as i32, 'z' as i32);
        assert!(!letters.is_single_range());
        assert_eq!(letters.both_ranges().size(), 52);

        let digits = CaseFold::of('0' as i32, '9' as i32);
        assert!(digits.is_single_range());

        let mixed = CaseFold::of('A' as i32, 'z' as i32);
        assert!(mixed.mixed);
        assert!(mixed.is_single_range());
    }

    #[test]
    fn test_mixed_range_warns_about_symbols() {
        let mut diags = Diagnostics::new();
        check_case_fold(&mut diags, None, 'A' as i32, 'z' as i32);
        assert_eq!(
            diags.iter().next().map(|d| d.kind.clone()),
            Some(DiagnosticKind::RangeProbablyContainsNotImpliedCharacters {
                from: "A".into(),
                to: "z".into(),
                chars: "[\\]^_`".into(),
            })
        );
    }

    #[test]
    fn test_case_insensitive_char_set() {
        let mut diags = Diagnostics::new();
        let set = char_set_literal(&mut diags, None, true, "a-c");
        assert!(diags.is_empty());
        assert_eq!(
            set.intervals(),
            &[Interval::new('A' as i32, 'C' as i32), Interval::new('a' as i32, 'c' as i32)]
        );
    }
}

//! Transliteration and collation helpers used by sorting and search.
//!
//! - [strip_diacritics] folds accented Latin and Vietnamese letters to their base letter.
//! - [natural_cmp] orders embedded digit runs by numeric value ("foo2" before "foo10").
//! - [Matcher] implements smart case / smart diacritic search, either as substring or shell glob.

use crate::core::error::Result;

use phf::phf_map;
use regex::Regex;

use std::borrow::Cow;
use std::cmp::Ordering;

/// Accented letter to base letter.
/// Case is preserved: uppercase forms map to uppercase base letters.
static DIACRITICS: phf::Map<char, char> = phf_map! {
    'à' => 'a',
    'À' => 'A',
    'á' => 'a',
    'Á' => 'A',
    'â' => 'a',
    'Â' => 'A',
    'ã' => 'a',
    'Ã' => 'A',
    'ä' => 'a',
    'Ä' => 'A',
    'å' => 'a',
    'Å' => 'A',
    'ā' => 'a',
    'Ā' => 'A',
    'ă' => 'a',
    'Ă' => 'A',
    'ą' => 'a',
    'Ą' => 'A',
    'ǎ' => 'a',
    'Ǎ' => 'A',
    'ạ' => 'a',
    'Ạ' => 'A',
    'ả' => 'a',
    'Ả' => 'A',
    'ấ' => 'a',
    'Ấ' => 'A',
    'ầ' => 'a',
    'Ầ' => 'A',
    'ẩ' => 'a',
    'Ẩ' => 'A',
    'ẫ' => 'a',
    'Ẫ' => 'A',
    'ậ' => 'a',
    'Ậ' => 'A',
    'ắ' => 'a',
    'Ắ' => 'A',
    'ằ' => 'a',
    'Ằ' => 'A',
    'ẳ' => 'a',
    'Ẳ' => 'A',
    'ẵ' => 'a',
    'Ẵ' => 'A',
    'ặ' => 'a',
    'Ặ' => 'A',
    'ç' => 'c',
    'Ç' => 'C',
    'ć' => 'c',
    'Ć' => 'C',
    'ĉ' => 'c',
    'Ĉ' => 'C',
    'ċ' => 'c',
    'Ċ' => 'C',
    'č' => 'c',
    'Č' => 'C',
    'ď' => 'd',
    'Ď' => 'D',
    'đ' => 'd',
    'Đ' => 'D',
    'è' => 'e',
    'È' => 'E',
    'é' => 'e',
    'É' => 'E',
    'ê' => 'e',
    'Ê' => 'E',
    'ë' => 'e',
    'Ë' => 'E',
    'ē' => 'e',
    'Ē' => 'E',
    'ĕ' => 'e',
    'Ĕ' => 'E',
    'ė' => 'e',
    'Ė' => 'E',
    'ę' => 'e',
    'Ę' => 'E',
    'ě' => 'e',
    'Ě' => 'E',
    'ẹ' => 'e',
    'Ẹ' => 'E',
    'ẻ' => 'e',
    'Ẻ' => 'E',
    'ẽ' => 'e',
    'Ẽ' => 'E',
    'ế' => 'e',
    'Ế' => 'E',
    'ề' => 'e',
    'Ề' => 'E',
    'ể' => 'e',
    'Ể' => 'E',
    'ễ' => 'e',
    'Ễ' => 'E',
    'ệ' => 'e',
    'Ệ' => 'E',
    'ĝ' => 'g',
    'Ĝ' => 'G',
    'ğ' => 'g',
    'Ğ' => 'G',
    'ġ' => 'g',
    'Ġ' => 'G',
    'ģ' => 'g',
    'Ģ' => 'G',
    'ĥ' => 'h',
    'Ĥ' => 'H',
    'ħ' => 'h',
    'Ħ' => 'H',
    'ì' => 'i',
    'Ì' => 'I',
    'í' => 'i',
    'Í' => 'I',
    'î' => 'i',
    'Î' => 'I',
    'ï' => 'i',
    'Ï' => 'I',
    'ĩ' => 'i',
    'Ĩ' => 'I',
    'ī' => 'i',
    'Ī' => 'I',
    'ĭ' => 'i',
    'Ĭ' => 'I',
    'į' => 'i',
    'Į' => 'I',
    'ı' => 'i',
    'ǐ' => 'i',
    'Ǐ' => 'I',
    'ỉ' => 'i',
    'Ỉ' => 'I',
    'ị' => 'i',
    'Ị' => 'I',
    'ĵ' => 'j',
    'Ĵ' => 'J',
    'ķ' => 'k',
    'Ķ' => 'K',
    'ĺ' => 'l',
    'Ĺ' => 'L',
    'ļ' => 'l',
    'Ļ' => 'L',
    'ľ' => 'l',
    'Ľ' => 'L',
    'ŀ' => 'l',
    'Ŀ' => 'L',
    'ł' => 'l',
    'Ł' => 'L',
    'ñ' => 'n',
    'Ñ' => 'N',
    'ń' => 'n',
    'Ń' => 'N',
    'ņ' => 'n',
    'Ņ' => 'N',
    'ň' => 'n',
    'Ň' => 'N',
    'ǹ' => 'n',
    'Ǹ' => 'N',
    'ò' => 'o',
    'Ò' => 'O',
    'ó' => 'o',
    'Ó' => 'O',
    'ô' => 'o',
    'Ô' => 'O',
    'õ' => 'o',
    'Õ' => 'O',
    'ö' => 'o',
    'Ö' => 'O',
    'ø' => 'o',
    'Ø' => 'O',
    'ō' => 'o',
    'Ō' => 'O',
    'ŏ' => 'o',
    'Ŏ' => 'O',
    'ő' => 'o',
    'Ő' => 'O',
    'ǒ' => 'o',
    'Ǒ' => 'O',
    'ọ' => 'o',
    'Ọ' => 'O',
    'ỏ' => 'o',
    'Ỏ' => 'O',
    'ố' => 'o',
    'Ố' => 'O',
    'ồ' => 'o',
    'Ồ' => 'O',
    'ổ' => 'o',
    'Ổ' => 'O',
    'ỗ' => 'o',
    'Ỗ' => 'O',
    'ộ' => 'o',
    'Ộ' => 'O',
    'ớ' => 'o',
    'Ớ' => 'O',
    'ờ' => 'o',
    'Ờ' => 'O',
    'ở' => 'o',
    'Ở' => 'O',
    'ỡ' => 'o',
    'Ỡ' => 'O',
    'ợ' => 'o',
    'Ợ' => 'O',
    'ơ' => 'o',
    'Ơ' => 'O',
    'ŕ' => 'r',
    'Ŕ' => 'R',
    'ŗ' => 'r',
    'Ŗ' => 'R',
    'ř' => 'r',
    'Ř' => 'R',
    'ś' => 's',
    'Ś' => 'S',
    'ŝ' => 's',
    'Ŝ' => 'S',
    'ş' => 's',
    'Ş' => 'S',
    'š' => 's',
    'Š' => 'S',
    'ș' => 's',
    'Ș' => 'S',
    'ţ' => 't',
    'Ţ' => 'T',
    'ť' => 't',
    'Ť' => 'T',
    'ŧ' => 't',
    'Ŧ' => 'T',
    'ț' => 't',
    'Ț' => 'T',
    'ù' => 'u',
    'Ù' => 'U',
    'ú' => 'u',
    'Ú' => 'U',
    'û' => 'u',
    'Û' => 'U',
    'ü' => 'u',
    'Ü' => 'U',
    'ũ' => 'u',
    'Ũ' => 'U',
    'ū' => 'u',
    'Ū' => 'U',
    'ŭ' => 'u',
    'Ŭ' => 'U',
    'ů' => 'u',
    'Ů' => 'U',
    'ű' => 'u',
    'Ű' => 'U',
    'ų' => 'u',
    'Ų' => 'U',
    'ư' => 'u',
    'Ư' => 'U',
    'ǔ' => 'u',
    'Ǔ' => 'U',
    'ǖ' => 'u',
    'Ǖ' => 'U',
    'ǘ' => 'u',
    'Ǘ' => 'U',
    'ǚ' => 'u',
    'Ǚ' => 'U',
    'ǜ' => 'u',
    'Ǜ' => 'U',
    'ụ' => 'u',
    'Ụ' => 'U',
    'ủ' => 'u',
    'Ủ' => 'U',
    'ứ' => 'u',
    'Ứ' => 'U',
    'ừ' => 'u',
    'Ừ' => 'U',
    'ử' => 'u',
    'Ử' => 'U',
    'ữ' => 'u',
    'Ữ' => 'U',
    'ự' => 'u',
    'Ự' => 'U',
    'ŵ' => 'w',
    'Ŵ' => 'W',
    'ẁ' => 'w',
    'Ẁ' => 'W',
    'ẃ' => 'w',
    'Ẃ' => 'W',
    'ẅ' => 'w',
    'Ẅ' => 'W',
    'ý' => 'y',
    'Ý' => 'Y',
    'ÿ' => 'y',
    'Ÿ' => 'Y',
    'ŷ' => 'y',
    'Ŷ' => 'Y',
    'ỳ' => 'y',
    'Ỳ' => 'Y',
    'ỵ' => 'y',
    'Ỵ' => 'Y',
    'ỷ' => 'y',
    'Ỷ' => 'Y',
    'ỹ' => 'y',
    'Ỹ' => 'Y',
    'ź' => 'z',
    'Ź' => 'Z',
    'ż' => 'z',
    'Ż' => 'Z',
    'ž' => 'z',
    'Ž' => 'Z',
};

/// Replaces every mapped accented rune with its base letter. Unmapped runes pass through.
///
/// Borrows when nothing needs replacing, so folding plain ASCII names costs no allocation.
pub fn strip_diacritics(s: &str) -> Cow<'_, str> {
    if !has_diacritics(s) {
        return Cow::Borrowed(s);
    }
    Cow::Owned(
        s.chars()
            .map(|c| DIACRITICS.get(&c).copied().unwrap_or(c))
            .collect(),
    )
}

/// True if any rune in `s` is in the diacritic table.
#[inline]
pub fn has_diacritics(s: &str) -> bool {
    s.chars().any(|c| DIACRITICS.contains_key(&c))
}

/// Natural string ordering.
///
/// Maximal runs of ASCII digits compare by numeric value, with no overflow for long runs.
/// Equal values compare by run length so "1" sorts before "01". Everything else compares
/// rune by rune. Only identical strings compare equal, which keeps the order total.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let (mut a_rest, mut b_rest) = (a, b);
    loop {
        let (ca, cb) = match (a_rest.chars().next(), b_rest.chars().next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(ca), Some(cb)) => (ca, cb),
        };

        if ca.is_ascii_digit() && cb.is_ascii_digit() {
            let (run_a, tail_a) = split_digit_run(a_rest);
            let (run_b, tail_b) = split_digit_run(b_rest);
            match cmp_digit_runs(run_a, run_b) {
                Ordering::Equal => {}
                ord => return ord,
            }
            a_rest = tail_a;
            b_rest = tail_b;
            continue;
        }

        if ca != cb {
            return ca.cmp(&cb);
        }
        a_rest = &a_rest[ca.len_utf8()..];
        b_rest = &b_rest[cb.len_utf8()..];
    }
}

/// `natural_cmp(a, b) == Less`.
#[inline]
pub fn natural_less(a: &str, b: &str) -> bool {
    natural_cmp(a, b) == Ordering::Less
}

fn split_digit_run(s: &str) -> (&str, &str) {
    let end = s
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(s.len());
    s.split_at(end)
}

fn cmp_digit_runs(a: &str, b: &str) -> Ordering {
    let a_trim = a.trim_start_matches('0');
    let b_trim = b.trim_start_matches('0');
    a_trim
        .len()
        .cmp(&b_trim.len())
        .then_with(|| a_trim.cmp(b_trim))
        .then_with(|| a.len().cmp(&b.len()))
}

/// Folding and matching flags for name search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchOptions {
    pub ignore_case: bool,
    pub ignore_diacritics: bool,
    /// Only fold case when the pattern is all lowercase.
    pub smart_case: bool,
    /// Only fold diacritics when the pattern has none.
    pub smart_diacritics: bool,
    /// Shell glob (`*`, `?`, `[...]`) over the whole name instead of substring containment.
    pub glob: bool,
}

/// A search pattern compiled against one set of [MatchOptions].
///
/// Folding is decided once from the pattern, then applied to every name the same way:
/// case fold first, diacritic fold second.
#[derive(Debug, Clone)]
pub struct Matcher {
    fold_case: bool,
    fold_diacritics: bool,
    kind: MatchKind,
}

#[derive(Debug, Clone)]
enum MatchKind {
    Substring(String),
    Glob(Regex),
}

impl Matcher {
    pub fn new(pattern: &str, opts: MatchOptions) -> Result<Self> {
        let mut pattern = pattern.to_string();

        let mut fold_case = false;
        if opts.ignore_case {
            let lowered = pattern.to_lowercase();
            if !opts.smart_case || lowered == pattern {
                pattern = lowered;
                fold_case = true;
            }
        }

        let mut fold_diacritics = false;
        if opts.ignore_diacritics && (!opts.smart_diacritics || !has_diacritics(&pattern)) {
            pattern = strip_diacritics(&pattern).into_owned();
            fold_diacritics = true;
        }

        let kind = if opts.glob {
            MatchKind::Glob(Regex::new(&glob_to_regex(&pattern))?)
        } else {
            MatchKind::Substring(pattern)
        };

        Ok(Self {
            fold_case,
            fold_diacritics,
            kind,
        })
    }

    pub fn is_match(&self, name: &str) -> bool {
        let mut folded = Cow::Borrowed(name);
        if self.fold_case {
            folded = Cow::Owned(folded.to_lowercase());
        }
        if self.fold_diacritics && has_diacritics(&folded) {
            folded = Cow::Owned(strip_diacritics(&folded).into_owned());
        }
        match &self.kind {
            MatchKind::Substring(p) => folded.contains(p.as_str()),
            MatchKind::Glob(re) => re.is_match(&folded),
        }
    }
}

/// One-shot form of [Matcher]: compiles `pattern` and tests `name`.
pub fn matches(name: &str, pattern: &str, opts: MatchOptions) -> Result<bool> {
    Ok(Matcher::new(pattern, opts)?.is_match(name))
}

/// Translates a shell glob into an anchored regex.
///
/// `*` and `?` never cross a path separator. An unterminated class is left as is so the regex
/// compiler rejects it.
fn glob_to_regex(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len() * 2 + 2);
    out.push('^');
    let mut chars = glob.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            '\\' => match chars.next() {
                Some(escaped) => out.push_str(&regex::escape(escaped.encode_utf8(&mut [0; 4]))),
                None => out.push_str(r"\\"),
            },
            '[' => {
                out.push('[');
                if matches!(chars.peek(), Some('!') | Some('^')) {
                    chars.next();
                    out.push('^');
                }
                let mut first = true;
                while let Some(inner) = chars.next() {
                    match inner {
                        ']' if !first => {
                            out.push(']');
                            break;
                        }
                        '-' if !first => out.push('-'),
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                out.push_str(&regex::escape(escaped.encode_utf8(&mut [0; 4])));
                            }
                        }
                        other => out.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
                    }
                    first = false;
                }
            }
            other => out.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    out.push('$');
    out
}

//! Canonicalisation of raw speech-to-text transcripts.
//!
//! Each pass is a function `&str -> String` applied in sequence. The
//! pipeline collapses spelled-out letters, joins spoken digit runs, and
//! rewrites spoken email addresses so the extractors only ever see one
//! spelling of each.

use std::sync::LazyLock;

use regex::Regex;

/// Run the full normalisation pipeline. Total and deterministic.
pub fn normalize(raw: &str) -> String {
    let mut result = collapse_whitespace(raw);

    result = collapse_spelled_letters(&result);
    result = join_spoken_digits(&result);
    result = rewrite_spoken_emails(&result);

    result
}

/// Sentence punctuation that may trail a token without breaking a run.
const TRAILING_PUNCT: &[char] = &['.', ',', '!', '?', ';', ':'];

fn split_trailing_punct(token: &str) -> (&str, &str) {
    let core = token.trim_end_matches(TRAILING_PUNCT);
    (core, &token[core.len()..])
}

// ---------------------------------------------------------------------------
// Pass 1: Whitespace
// ---------------------------------------------------------------------------

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ---------------------------------------------------------------------------
// Pass 2: Letter-by-letter spellings
// ---------------------------------------------------------------------------

/// Collapse `k a t i e` and `k-a-t-i-e` into `katie`.
///
/// Only runs of three or more letters collapse, so "I" and "a" on their own
/// are untouched. The first letter keeps its case; the rest are lowercased.
fn collapse_spelled_letters(text: &str) -> String {
    static HYPHENATED_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^[A-Za-z](?:-[A-Za-z]){2,}$").expect("valid regex")
    });

    let tokens: Vec<&str> = text.split(' ').filter(|t| !t.is_empty()).collect();
    let mut out: Vec<String> = Vec::with_capacity(tokens.len());
    let mut i = 0;

    while i < tokens.len() {
        let (core, punct) = split_trailing_punct(tokens[i]);

        if HYPHENATED_RE.is_match(core) {
            let letters: String = core.chars().filter(|c| *c != '-').collect();
            out.push(format!("{}{punct}", spelled_word(&letters)));
            i += 1;
            continue;
        }

        // Extend the run while tokens are single letters; punctuation ends it.
        let mut end = i;
        let mut letters = String::new();
        while end < tokens.len() {
            let (c, p) = split_trailing_punct(tokens[end]);
            if c.len() != 1 || !c.chars().all(|ch| ch.is_ascii_alphabetic()) {
                break;
            }
            letters.push_str(c);
            end += 1;
            if !p.is_empty() {
                break;
            }
        }

        if end - i >= 3 {
            let (_, last_punct) = split_trailing_punct(tokens[end - 1]);
            out.push(format!("{}{last_punct}", spelled_word(&letters)));
            i = end;
        } else {
            out.push(tokens[i].to_string());
            i += 1;
        }
    }

    out.join(" ")
}

fn spelled_word(letters: &str) -> String {
    let mut chars = letters.chars();
    match chars.next() {
        Some(first) => {
            let mut word = String::with_capacity(letters.len());
            word.push(first);
            word.push_str(&chars.as_str().to_ascii_lowercase());
            word
        }
        None => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Pass 3: Spoken digit runs
// ---------------------------------------------------------------------------

/// One token's contribution to a digit run.
#[derive(Debug, Clone, PartialEq)]
enum DigitPiece {
    Digits(String),
    /// `oh` / `o`, read as zero only after a digit and before another.
    Oh,
    /// `double` / `triple`, repeating the next digit.
    Repeat(usize),
}

fn classify_digit_token(core: &str) -> Option<DigitPiece> {
    static DIGIT_GROUP_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^\+?\(?\d+\)?(?:[-.]\(?\d+\)?)*$").expect("valid regex")
    });

    let word = core.to_ascii_lowercase();
    let digit = match word.as_str() {
        "zero" => Some('0'),
        "one" => Some('1'),
        "two" => Some('2'),
        "three" => Some('3'),
        "four" => Some('4'),
        "five" => Some('5'),
        "six" => Some('6'),
        "seven" => Some('7'),
        "eight" => Some('8'),
        "nine" => Some('9'),
        _ => None,
    };
    if let Some(d) = digit {
        return Some(DigitPiece::Digits(d.to_string()));
    }

    match word.as_str() {
        "oh" | "o" => Some(DigitPiece::Oh),
        "double" => Some(DigitPiece::Repeat(2)),
        "triple" => Some(DigitPiece::Repeat(3)),
        _ if DIGIT_GROUP_RE.is_match(core) => Some(DigitPiece::Digits(
            core.chars().filter(char::is_ascii_digit).collect(),
        )),
        _ => None,
    }
}

/// Join runs like `6 1 9 six five four 4321` into `6196544321`.
///
/// A run needs at least two tokens and 7 to 11 digits in total; anything
/// else is left as spoken. Commas may separate the groups of a full phone
/// number (`6 1 9, 6 5 4, 4 3 2 1`), so a comma-joined run needs 10 or 11
/// digits and otherwise falls back to stopping at the first comma.
fn join_spoken_digits(text: &str) -> String {
    let tokens: Vec<&str> = text.split(' ').filter(|t| !t.is_empty()).collect();
    let pieces: Vec<(Option<DigitPiece>, &str)> = tokens
        .iter()
        .map(|t| {
            let (core, punct) = split_trailing_punct(t);
            (classify_digit_token(core), punct)
        })
        .collect();

    let mut out: Vec<String> = Vec::with_capacity(tokens.len());
    let mut i = 0;

    while i < tokens.len() {
        let starts_run = match &pieces[i].0 {
            Some(DigitPiece::Digits(_)) => true,
            Some(DigitPiece::Repeat(_)) => pieces[i].1.is_empty() && is_digits(&pieces, i + 1),
            _ => false,
        };
        if !starts_run {
            out.push(tokens[i].to_string());
            i += 1;
            continue;
        }

        let mut run = scan_digit_run(&pieces, i, true);
        if run.comma_joined && !(10..=11).contains(&run.digits.chars().count()) {
            run = scan_digit_run(&pieces, i, false);
        }

        let end = run.end;
        let digit_count = run.digits.chars().count();
        if end - i >= 2 && (7..=11).contains(&digit_count) {
            let last_punct = pieces[end - 1].1;
            out.push(format!("{}{last_punct}", run.digits));
        } else {
            out.extend(tokens[i..end].iter().map(|t| t.to_string()));
        }
        i = end;
    }

    out.join(" ")
}

struct DigitRun {
    digits: String,
    /// One past the last token of the run.
    end: usize,
    comma_joined: bool,
}

fn is_digits(pieces: &[(Option<DigitPiece>, &str)], idx: usize) -> bool {
    matches!(pieces.get(idx), Some((Some(DigitPiece::Digits(_)), _)))
}

fn scan_digit_run(
    pieces: &[(Option<DigitPiece>, &str)],
    start: usize,
    allow_commas: bool,
) -> DigitRun {
    let mut digits = String::new();
    let mut repeat = 1;
    let mut end = start;
    let mut comma_joined = false;

    while end < pieces.len() {
        let (piece, punct) = &pieces[end];
        let next_is_digits = punct.is_empty() && is_digits(pieces, end + 1);
        match piece {
            Some(DigitPiece::Digits(d)) => {
                for _ in 0..repeat {
                    digits.push_str(d);
                }
                repeat = 1;
            }
            Some(DigitPiece::Oh) if !digits.is_empty() && repeat == 1 && next_is_digits => {
                digits.push('0');
            }
            Some(DigitPiece::Repeat(n)) if repeat == 1 && next_is_digits => repeat = *n,
            _ => break,
        }
        end += 1;
        if punct.is_empty() {
            continue;
        }
        if allow_commas && *punct == "," && repeat == 1 && is_digits(pieces, end) {
            comma_joined = true;
            continue;
        }
        break;
    }

    DigitRun {
        digits,
        end,
        comma_joined,
    }
}

// ---------------------------------------------------------------------------
// Pass 4: Spoken email addresses
// ---------------------------------------------------------------------------

/// Rewrite `bill at clinton dot org` to `bill@clinton.org`.
///
/// Single letters and digits spoken between the local word and `at`
/// belong to the local part: `bill 1 2 3 at gmail dot com` becomes
/// `bill123@gmail.com`.
fn rewrite_spoken_emails(text: &str) -> String {
    static SPOKEN_EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(
            r"(?i)\b([a-z0-9][a-z0-9._\-]*(?:\s+(?:dot|underscore|dash|hyphen)\s+[a-z0-9][a-z0-9._\-]*)*)((?:\s+(?:[a-z0-9]|zero|one|two|three|four|five|six|seven|eight|nine)\b)*)\s+at(?:\s+(?:sign|symbol))?\s+([a-z0-9][a-z0-9\-]*(?:(?:\s+dot\s+|\.)[a-z0-9][a-z0-9\-]*)+)",
        )
        .expect("valid regex")
    });
    static DOT_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?i)\s+dot\s+").expect("valid regex"));
    static UNDERSCORE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?i)\s+underscore\s+").expect("valid regex"));
    static DASH_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?i)\s+(?:dash|hyphen)\s+").expect("valid regex"));

    SPOKEN_EMAIL_RE
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let local = DOT_RE.replace_all(&caps[1], ".");
            let local = UNDERSCORE_RE.replace_all(&local, "_");
            let local = DASH_RE.replace_all(&local, "-");
            let tail: String = caps[2].split_whitespace().map(spoken_char).collect();
            let domain = DOT_RE.replace_all(&caps[3], ".");

            // "my email is 4 2 at ..." keeps the lead-in as prose.
            let (lead, local) = if !tail.is_empty() && is_lead_in(&local) {
                (format!("{local} "), tail)
            } else {
                (String::new(), format!("{local}{tail}"))
            };
            format!("{lead}{}@{}", local.to_ascii_lowercase(), domain.to_ascii_lowercase())
        })
        .into_owned()
}

/// Words that introduce an address rather than start one.
fn is_lead_in(word: &str) -> bool {
    matches!(
        word.to_ascii_lowercase().as_str(),
        "is" | "it's" | "its" | "was" | "email" | "address" | "me" | "be" | "reach"
    )
}

fn spoken_char(token: &str) -> String {
    let digit = match token.to_ascii_lowercase().as_str() {
        "zero" => "0",
        "one" => "1",
        "two" => "2",
        "three" => "3",
        "four" => "4",
        "five" => "5",
        "six" => "6",
        "seven" => "7",
        "eight" => "8",
        "nine" => "9",
        _ => return token.to_string(),
    };
    digit.to_string()
}

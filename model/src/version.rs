//! Package version ordering
//!
//! Versions coming from RPM and Debian metadata are not semver, so they
//! are ordered segment by segment:
//! - versions are split into maximal runs of digits or letters
//! - any other character separates segments and is otherwise ignored
//! - numeric runs compare numerically and sort after alphabetic runs
//! - `~` sorts before everything, including the end of the string
//! - when one side runs out of segments the longer version is newer

use std::cmp::Ordering;

/// Compare two version strings
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }

    let mut one = a;
    let mut two = b;

    loop {
        one = one.trim_start_matches(is_separator);
        two = two.trim_start_matches(is_separator);

        match (one.starts_with('~'), two.starts_with('~')) {
            (true, true) => {
                one = &one[1..];
                two = &two[1..];
                continue;
            }
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            (false, false) => {}
        }

        if one.is_empty() || two.is_empty() {
            break;
        }

        let numeric = one.starts_with(|c: char| c.is_ascii_digit());
        let (seg_one, rest_one) = split_segment(one, numeric);
        let (seg_two, rest_two) = split_segment(two, numeric);

        // Segments of different kinds: numbers are newer
        if seg_two.is_empty() {
            return if numeric {
                Ordering::Greater
            } else {
                Ordering::Less
            };
        }

        let ord = if numeric {
            compare_numeric(seg_one, seg_two)
        } else {
            seg_one.cmp(seg_two)
        };
        if ord != Ordering::Equal {
            return ord;
        }

        one = rest_one;
        two = rest_two;
    }

    match (one.is_empty(), two.is_empty()) {
        (true, true) => Ordering::Equal,
        (false, _) => Ordering::Greater,
        (true, false) => Ordering::Less,
    }
}

/// Compare two optional release strings; a missing release sorts first
pub fn compare_releases(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => compare_versions(a, b),
    }
}

fn is_separator(c: char) -> bool {
    !c.is_ascii_alphanumeric() && c != '~'
}

fn split_segment(s: &str, numeric: bool) -> (&str, &str) {
    let end = s
        .find(|c: char| {
            if numeric {
                !c.is_ascii_digit()
            } else {
                !c.is_ascii_alphabetic()
            }
        })
        .unwrap_or(s.len());
    s.split_at(end)
}

fn compare_numeric(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

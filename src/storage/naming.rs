//! Stored-name derivation for uploads

use chrono::{DateTime, Utc};

/// Derive the on-disk name for an upload: `<epoch_millis>-<name>` with every
/// run of whitespace in `original_name` collapsed to one underscore.
///
/// Two uploads of the same name within the same millisecond get the same
/// stored name, and the later one overwrites the earlier.
pub fn derive_stored_name(original_name: &str, now: DateTime<Utc>) -> String {
    format!(
        "{}-{}",
        now.timestamp_millis(),
        collapse_whitespace(original_name)
    )
}

/// Final path segment of a client-supplied filename.
///
/// Multipart clients may send a full local path; only the part after the
/// last `/` or `\` is kept.
pub fn client_basename(raw: &str) -> &str {
    raw.rsplit(['/', '\\']).next().unwrap_or(raw)
}

fn collapse_whitespace(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_run = false;
    for c in name.chars() {
        if is_separator_space(c) {
            if !in_run {
                out.push('_');
            }
            in_run = true;
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}

/// Whitespace as matched by the `\s` class of ECMAScript regular expressions,
/// which is what browser clients and older uploads of this service used.
/// Unlike `char::is_whitespace` it excludes U+0085 and includes U+FEFF.
fn is_separator_space(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n' | '\u{0B}' | '\u{0C}' | '\r' | ' '
            | '\u{A0}'
            | '\u{1680}'
            | '\u{2000}'..='\u{200A}'
            | '\u{2028}'
            | '\u{2029}'
            | '\u{202F}'
            | '\u{205F}'
            | '\u{3000}'
            | '\u{FEFF}'
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).unwrap()
    }

    #[test]
    fn test_derive_stored_name_format() {
        let name = derive_stored_name("hello world.txt", at(1_700_000_000_123));
        assert_eq!(name, "1700000000123-hello_world.txt");
    }

    #[test]
    fn test_whitespace_runs_collapse() {
        let now = at(5);
        assert_eq!(derive_stored_name("a  \t b", now), "5-a_b");
        assert_eq!(derive_stored_name(" lead", now), "5-_lead");
        assert_eq!(derive_stored_name("trail \n", now), "5-trail_");
        assert_eq!(derive_stored_name("no_spaces.tar.gz", now), "5-no_spaces.tar.gz");
    }

    #[test]
    fn test_whitespace_set_matches_ecmascript() {
        let now = at(5);
        assert_eq!(derive_stored_name("a\u{FEFF}b", now), "5-a_b");
        assert_eq!(derive_stored_name("a\u{A0}\u{3000}b", now), "5-a_b");
        assert_eq!(derive_stored_name("a\u{2009}\u{202F}b", now), "5-a_b");
        assert_eq!(derive_stored_name("a\u{0B}\u{0C}b", now), "5-a_b");
        assert_eq!(derive_stored_name("a\u{85}b", now), "5-a\u{85}b");
        assert_eq!(derive_stored_name("a\u{200B}b", now), "5-a\u{200B}b");
    }

    #[test]
    fn test_any_name_is_accepted() {
        let now = at(99);
        assert_eq!(derive_stored_name("", now), "99-");
        assert_eq!(derive_stored_name("README", now), "99-README");
    }

    #[test]
    fn test_deterministic_for_same_inputs() {
        let now = at(1234);
        assert_eq!(
            derive_stored_name("same name", now),
            derive_stored_name("same name", now)
        );
        assert_ne!(
            derive_stored_name("same name", now),
            derive_stored_name("same name", at(1235))
        );
    }

    #[test]
    fn test_client_basename() {
        assert_eq!(client_basename("photo.jpg"), "photo.jpg");
        assert_eq!(client_basename("/home/me/photo.jpg"), "photo.jpg");
        assert_eq!(client_basename("C:\\Users\\me\\photo.jpg"), "photo.jpg");
        assert_eq!(client_basename("dir/"), "");
    }
}

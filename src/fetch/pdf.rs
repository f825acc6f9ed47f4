//! PDF document information dictionary scanning.
//!
//! Only uncompressed info dictionaries near the start of the file are found,
//! which covers what most generators write.

use super::clean;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref AUTHOR: Regex = Regex::new(r"/Author\(([^)]+?)\)").unwrap();
    static ref TITLE: Regex = Regex::new(r"/Title\(([^)]+?)\)").unwrap();
    static ref SUBJECT: Regex = Regex::new(r"/Subject\(([^)]+?)\)").unwrap();
}

/// `title by author` from the document information dictionary.
///
/// Falls back to `/Subject` when there is no `/Title`; `None` when neither
/// exists.
pub fn title_from_pdf(data: &[u8]) -> Option<String> {
    let mut author = String::new();
    let mut title = String::new();
    let mut in_dictionary = false;

    for raw in data.split(|b| *b == b'\n') {
        let line = String::from_utf8_lossy(raw);
        let line = line.trim_end_matches('\r');

        if line.starts_with("<<") {
            in_dictionary = true;
        }

        if in_dictionary {
            if let Some(m) = AUTHOR.captures(line) {
                author = clean(&m[1]);
            }
            if let Some(m) = TITLE.captures(line) {
                title = clean(&m[1]);
            }
            if title.is_empty()
                && let Some(m) = SUBJECT.captures(line)
            {
                title = clean(&m[1]);
            }
        }

        if line.starts_with(">>") || line.ends_with(">>") {
            in_dictionary = false;
        }
    }

    match (title.is_empty(), author.is_empty()) {
        (true, _) => None,
        (false, true) => Some(title),
        (false, false) => Some(format!("{title} by {author}")),
    }
}

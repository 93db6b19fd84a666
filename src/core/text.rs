//! Unicode text folding for case-insensitive matching.
//!
//! Names coming from document libraries and mailboxes are frequently
//! non-ASCII (Arabic, CJK, accented Latin). Both stored fields and
//! queries go through [`fold`] so that compatibility forms and case
//! differences compare equal.

use unicode_normalization::UnicodeNormalization;

/// NFKC-normalize and lowercase `text`
pub fn fold(text: &str) -> String {
    text.nfkc().collect::<String>().to_lowercase()
}

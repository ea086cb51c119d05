//! Content-type detection from file extensions.

use std::path::Path;

use mime::Mime;
use new_mime_guess::MimeGuess;

/// Guesses the media type of a file from its extension.
///
/// Matching ignores ASCII case. Unknown or missing extensions fall back to
/// `application/octet-stream`. Textual types are labelled UTF-8.
pub fn from_path(path: &Path) -> Mime {
    let guess = MimeGuess::from_path(path).first_or_octet_stream();

    if guess.type_() == mime::TEXT && guess.get_param(mime::CHARSET).is_none() {
        return format!("{guess}; charset=utf-8").parse().unwrap_or(guess);
    }

    guess
}

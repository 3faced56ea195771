// ABOUTME: Shell command builders for remote reads and writes.
// ABOUTME: base64 pipeline for binary-safe writes, escaped here-document as fallback.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Prefix of the here-document delimiter; the process id is appended.
pub const HEREDOC_DELIMITER_PREFIX: &str = "SSHFILE_EOF_";

/// Quote `s` as a single shell word.
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Dump the file to stdout.
pub fn read_command(path: &str) -> String {
    format!("cat -- {}", shell_quote(path))
}

/// Decode base64 text remotely into `path`.
pub fn base64_write_command(path: &str, content: &[u8]) -> String {
    format!(
        "printf '%s' '{}' | base64 -d > {}",
        STANDARD.encode(content),
        shell_quote(path)
    )
}

/// Escape the characters an unquoted here-document body interprets.
///
/// Only backslash, dollar sign, and backtick are special there. A double
/// quote is literal, and `\"` would be written as two characters.
pub fn escape_heredoc_body(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '$' | '`') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Delimiter unique to this process, so a content line equal to a plain
/// `EOF` can't end the document early.
pub fn heredoc_delimiter() -> String {
    format!("{}{}", HEREDOC_DELIMITER_PREFIX, std::process::id())
}

/// Write `content` to `path` through a here-document.
///
/// A here-document always ends its text with a newline. Content that already
/// ends with one gives up its last newline to the document; other content is
/// passed through a command substitution that strips the added newline.
/// Content containing a line equal to `delimiter` is truncated there.
pub fn heredoc_write_command(path: &str, content: &str, delimiter: &str) -> String {
    let target = shell_quote(path);
    let escaped = escape_heredoc_body(content);
    match escaped.strip_suffix('\n') {
        Some(body) => format!("cat > {target} <<{delimiter}\n{body}\n{delimiter}\n"),
        None => format!(
            "printf '%s' \"$(cat <<{delimiter}\n{escaped}\n{delimiter}\n)\" > {target}"
        ),
    }
}

//! Lossless string keys for filesystem paths.
//!
//! Unix paths are arbitrary bytes, JSON strings are UTF-8. A key is the path
//! with every backslash doubled and every byte that is not part of valid
//! UTF-8 written as `\xHH`. The mapping is injective, so distinct paths never
//! share a key, and [`decode`] restores the exact bytes.

use std::ffi::OsString;
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::path::{Path, PathBuf};

/// Key for `path`. Identical to the path text for UTF-8 paths without `\`.
#[must_use]
pub fn encode(path: &Path) -> String {
    let mut out = String::new();
    let mut rest = path.as_os_str().as_bytes();

    loop {
        match std::str::from_utf8(rest) {
            Ok(valid) => {
                push_escaped(&mut out, valid);
                return out;
            }
            Err(e) => {
                let (valid, tail) = rest.split_at(e.valid_up_to());
                if let Ok(valid) = std::str::from_utf8(valid) {
                    push_escaped(&mut out, valid);
                }
                let bad = e.error_len().unwrap_or(tail.len());
                for byte in &tail[..bad] {
                    out.push_str(&format!("\\x{byte:02x}"));
                }
                rest = &tail[bad..];
            }
        }
    }
}

/// Path for a key produced by [`encode`]. Malformed escapes are kept
/// literally.
#[must_use]
pub fn decode(key: &str) -> PathBuf {
    let bytes = key.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\\' {
            match bytes.get(i + 1) {
                Some(b'\\') => {
                    out.push(b'\\');
                    i += 2;
                    continue;
                }
                Some(b'x') => {
                    let hex = key
                        .get(i + 2..i + 4)
                        .filter(|h| h.bytes().all(|b| b.is_ascii_hexdigit()))
                        .and_then(|h| u8::from_str_radix(h, 16).ok());
                    if let Some(byte) = hex {
                        out.push(byte);
                        i += 4;
                        continue;
                    }
                }
                _ => {}
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    PathBuf::from(OsString::from_vec(out))
}

fn push_escaped(out: &mut String, text: &str) {
    for ch in text.chars() {
        if ch == '\\' {
            out.push_str("\\\\");
        } else {
            out.push(ch);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;

    fn raw(bytes: &[u8]) -> &Path {
        Path::new(OsStr::from_bytes(bytes))
    }

    #[test]
    fn test_utf8_paths_unchanged() {
        assert_eq!(encode(Path::new("/etc/ssh/sshd_config")), "/etc/ssh/sshd_config");
        assert_eq!(encode(Path::new("/srv/naïve")), "/srv/naïve");
    }

    #[test]
    fn test_invalid_bytes_stay_distinct() {
        let ff = encode(raw(b"/srv/a\xff"));
        let fe = encode(raw(b"/srv/a\xfe"));
        assert_eq!(ff, "/srv/a\\xff");
        assert_ne!(ff, fe);
    }

    #[test]
    fn test_literal_escape_text_does_not_collide() {
        let literal = encode(Path::new("/srv/a\\xff"));
        let binary = encode(raw(b"/srv/a\xff"));
        assert_ne!(literal, binary);
        assert_eq!(decode(&literal), Path::new("/srv/a\\xff"));
    }

    #[test]
    fn test_decode_restores_exact_bytes() {
        for bytes in [
            &b"/srv/a\xff"[..],
            b"/srv/\xc3(mixed\\slash",
            b"/srv/trailing\xe2\x82",
            b"/plain/path",
        ] {
            assert_eq!(decode(&encode(raw(bytes))).as_os_str().as_bytes(), bytes);
        }
    }
}

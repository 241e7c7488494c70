//! Sanitization policies for caller-supplied names
//!
//! Two policies share one normalization pipeline: NFD decomposition, strip
//! combining marks, then an allow-set filter. Directory hints arrive from
//! untrusted callers and may carry arbitrary Unicode, traversal sequences or
//! null bytes; the output of either policy is always `""` or one or more
//! safe path segments, never `.`, `..` or an empty segment. Both policies
//! are idempotent.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Maximum length of a single sanitized segment
const MAX_SEGMENT_LEN: usize = 128;
/// Maximum length of a joined sanitized path
const MAX_PATH_LEN: usize = 512;

/// Decompose to NFD and drop combining diacritical marks
fn fold_marks(raw: &str) -> String {
    raw.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Sanitize one filesystem segment: allow-set `[A-Za-z0-9._-]`, everything
/// else (including whitespace) maps to `-` with runs collapsed.
fn sanitize_segment(raw: &str) -> String {
    let folded = fold_marks(raw);
    let mut out = String::with_capacity(folded.len());
    for c in folded.chars() {
        let mapped = if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
            c
        } else {
            '-'
        };
        if mapped == '-' && out.ends_with('-') {
            continue;
        }
        out.push(mapped);
    }
    let trimmed = out.trim_start_matches(['.', '-']).trim_end_matches('-');
    if trimmed.is_empty() {
        return String::new();
    }
    let mut segment = trimmed.to_string();
    if segment.len() > MAX_SEGMENT_LEN {
        // output is pure ASCII at this point, byte truncation is safe
        segment.truncate(MAX_SEGMENT_LEN);
        while segment.ends_with('-') {
            segment.pop();
        }
    }
    segment
}

/// Sanitize a directory hint under the filesystem-directory policy.
///
/// The hint is split on `/` and `\`, each segment sanitized independently,
/// and surviving segments joined with a single `/`. Segments that sanitize
/// to nothing are dropped; the joined result never exceeds 512 bytes.
pub fn sanitize_dir_path(raw: &str) -> String {
    let mut joined = String::new();
    for part in raw.split(['/', '\\']) {
        let segment = sanitize_segment(part);
        if segment.is_empty() {
            continue;
        }
        let extra = segment.len() + if joined.is_empty() { 0 } else { 1 };
        if joined.len() + extra > MAX_PATH_LEN {
            break;
        }
        if !joined.is_empty() {
            joined.push('/');
        }
        joined.push_str(&segment);
    }
    joined
}

/// Sanitize a metadata-folder name under the stricter folder-name policy.
///
/// The allow-set adds the space character; runs of whitespace collapse to a
/// single space, disallowed characters are dropped outright, and the result
/// is trimmed and capped at 128 bytes. Hyphens receive no special handling.
pub fn sanitize_folder_name(raw: &str) -> String {
    let folded = fold_marks(raw);
    let mut out = String::with_capacity(folded.len());
    for c in folded.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
            out.push(c);
        } else if c.is_whitespace() && !out.ends_with(' ') && !out.is_empty() {
            out.push(' ');
        }
    }
    let trimmed = out.trim();
    if trimmed.is_empty() || trimmed == "." || trimmed == ".." {
        return String::new();
    }
    let mut name = trimmed.to_string();
    if name.len() > MAX_SEGMENT_LEN {
        name.truncate(MAX_SEGMENT_LEN);
        name.truncate(name.trim_end().len());
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diacritics_are_folded() {
        assert_eq!(sanitize_dir_path("Café/Ãrvore"), "Cafe/Arvore");
        assert_eq!(sanitize_folder_name("Relatórios Técnicos"), "Relatorios Tecnicos");
    }

    #[test]
    fn test_traversal_sequences_never_survive() {
        assert_eq!(sanitize_dir_path(".."), "");
        assert_eq!(sanitize_dir_path("../../etc/passwd"), "etc/passwd");
        assert_eq!(sanitize_dir_path("a/./b"), "a/b");
        assert_eq!(sanitize_dir_path("..\\..\\windows"), "windows");
        assert_eq!(sanitize_dir_path("...."), "");
    }

    #[test]
    fn test_disallowed_chars_become_collapsed_hyphens() {
        assert_eq!(sanitize_dir_path("a b  c"), "a-b-c");
        assert_eq!(sanitize_dir_path("invoices!!2024"), "invoices-2024");
        assert_eq!(sanitize_dir_path("--weird--"), "weird");
        assert_eq!(sanitize_dir_path(".hidden"), "hidden");
    }

    #[test]
    fn test_null_bytes_are_neutralized() {
        assert_eq!(sanitize_dir_path("a\0b"), "a-b");
        assert_eq!(sanitize_folder_name("a\0b"), "ab");
    }

    #[test]
    fn test_empty_and_separator_only_inputs() {
        assert_eq!(sanitize_dir_path(""), "");
        assert_eq!(sanitize_dir_path("///"), "");
        assert_eq!(sanitize_dir_path("  /  /  "), "");
        assert_eq!(sanitize_folder_name("   "), "");
    }

    #[test]
    fn test_folder_name_policy_keeps_single_spaces() {
        assert_eq!(sanitize_folder_name("  Q3   Reports  "), "Q3 Reports");
        assert_eq!(sanitize_folder_name("a--b"), "a--b");
        assert_eq!(sanitize_folder_name("©2024®"), "2024");
    }

    #[test]
    fn test_folder_name_never_dot_or_dotdot() {
        assert_eq!(sanitize_folder_name("."), "");
        assert_eq!(sanitize_folder_name(".."), "");
        assert_eq!(sanitize_folder_name(" . "), "");
    }

    #[test]
    fn test_segment_length_cap() {
        let long = "x".repeat(300);
        let out = sanitize_dir_path(&long);
        assert_eq!(out.len(), 128);

        let path = (0..10).map(|_| "y".repeat(100)).collect::<Vec<_>>().join("/");
        let out = sanitize_dir_path(&path);
        assert!(out.len() <= 512);
    }

    #[test]
    fn test_idempotence() {
        let inputs = [
            "Café/Ãrvore",
            "../../etc/passwd",
            "a b  c/--d--",
            "  Q3   Reports  ",
            "pläne\\2024\\.. ",
            "a\0b/c",
            "....",
            "",
        ];
        for raw in inputs {
            let once = sanitize_dir_path(raw);
            assert_eq!(sanitize_dir_path(&once), once, "dir policy not idempotent for {raw:?}");
            let once = sanitize_folder_name(raw);
            assert_eq!(
                sanitize_folder_name(&once),
                once,
                "folder policy not idempotent for {raw:?}"
            );
        }
    }
}

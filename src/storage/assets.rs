use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref UNSAFE_FILE_CHARS: Regex = Regex::new(r"[^A-Za-z0-9._-]").unwrap();
}

/// Replaces every character outside `[A-Za-z0-9._-]` with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    let sanitized = UNSAFE_FILE_CHARS.replace_all(name, "_").into_owned();
    // a bare ".." would still be meaningful to the filesystem
    if sanitized.chars().all(|c| c == '.') {
        sanitized.replace('.', "_")
    } else {
        sanitized
    }
}

/// `<collection>_<recordId>_<epochMillis>_<sanitizedOriginalName>`
pub fn asset_file_name(
    collection: &str,
    record_id: &str,
    epoch_millis: i64,
    original_name: &str,
) -> String {
    let original = if original_name.is_empty() {
        "upload"
    } else {
        original_name
    };
    format!(
        "{}_{}_{}_{}",
        collection,
        sanitize_file_name(record_id),
        epoch_millis,
        sanitize_file_name(original)
    )
}

/// Inserts `-<n>` before the extension: `a_b_1_scan.pdf` -> `a_b_1_scan-2.pdf`.
pub fn with_collision_suffix(file_name: &str, n: usize) -> String {
    match file_name.rfind('.') {
        Some(dot) if dot > 0 => format!("{}-{}{}", &file_name[..dot], n, &file_name[dot..]),
        _ => format!("{file_name}-{n}"),
    }
}

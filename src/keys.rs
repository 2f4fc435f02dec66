// ABOUTME: Combined-key convention linking local namespace/key pairs to remote ids
// ABOUTME: Covers upload ids, export id stripping and deletion id formatting

/// Separator between the path and the local key in a combined id.
pub const KEY_DELIMITER: char = ',';

/// Paths under this prefix are deleted with an empty path component.
pub const RESERVED_PATH_PREFIX: &str = "blueprints/";

/// Drop everything up to and including the first delimiter.
///
/// Remote exports may carry `path,key` ids; reconciliation compares bare keys.
pub fn strip_namespace(id: &str) -> &str {
    match id.find(KEY_DELIMITER) {
        Some(pos) => &id[pos + KEY_DELIMITER.len_utf8()..],
        None => id,
    }
}

/// Split `path,key` at the first delimiter.
pub fn split_combined(id: &str) -> Option<(&str, &str)> {
    id.split_once(KEY_DELIMITER)
}

/// Remote id used when uploading an entry.
pub fn upload_id(namespace: &str, key: &str, combined: bool) -> String {
    if combined && !namespace.is_empty() {
        format!("{}{}{}", namespace, KEY_DELIMITER, key)
    } else {
        key.to_string()
    }
}

/// Whether `path` lies under [`RESERVED_PATH_PREFIX`], ignoring case.
pub fn is_reserved_path(path: &str) -> bool {
    path.get(..RESERVED_PATH_PREFIX.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(RESERVED_PATH_PREFIX))
}

/// Remote id used when deleting a record found under `path`.
pub fn deletion_id(path: &str, key: &str, combined: bool) -> String {
    if path.is_empty() || !combined {
        key.to_string()
    } else if is_reserved_path(path) {
        format!("{}{}", KEY_DELIMITER, key)
    } else {
        format!("{}{}{}", path, KEY_DELIMITER, key)
    }
}

/// Collapse doubled or space-padded delimiters left behind by id formatting.
pub fn sanitize_deletion_id(id: &str) -> String {
    id.replace(",,", ",").replace(" ,", ",").replace(", ", ",")
}

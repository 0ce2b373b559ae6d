//! Shadow backup naming.

/// Prefix of every shadow backup file name.
pub const BACKUP_PREFIX: &str = ".tmp-sew-";

/// Returns the shadow backup path for `path`: the same directory, with the base name prefixed by
/// [`BACKUP_PREFIX`]. One leading `/` is stripped from the result.
///
/// This is the only place the backup name is derived.
///
/// ```
/// use editor_sync::backup_path;
///
/// assert_eq!(backup_path("notes/todo.txt"), "notes/.tmp-sew-todo.txt");
/// assert_eq!(backup_path("todo.txt"), ".tmp-sew-todo.txt");
/// ```
pub fn backup_path(path: &str) -> String {
    let (dir, base) = match path.rsplit_once('/') {
        Some((dir, base)) => (dir, base),
        None => ("", path),
    };
    let shadow = format!("{dir}/{BACKUP_PREFIX}{base}");
    match shadow.strip_prefix('/') {
        Some(stripped) => stripped.to_string(),
        None => shadow,
    }
}

/// Returns `true` when `name` (a single entry name) is a shadow backup.
pub fn is_backup_name(name: &str) -> bool {
    name.starts_with(BACKUP_PREFIX)
}

/// Inverse of [`backup_path`] for a single entry name.
pub fn original_name(backup_name: &str) -> Option<&str> {
    backup_name
        .strip_prefix(BACKUP_PREFIX)
        .filter(|name| !name.is_empty())
}

//! Pure path arithmetic for the directory layer.

/// Whether `path` equals `ancestor` or lies beneath it.
#[inline]
pub fn is_same_or_descendant<A: AsRef<str>, B: AsRef<str>>(ancestor: &[A], path: &[B]) -> bool {
    path.len() >= ancestor.len() && ancestor.iter().zip(path).all(|(a, b)| a.as_ref() == b.as_ref())
}

/// Parent of `path`, or `None` for the root.
#[inline]
pub fn parent_path<S>(path: &[S]) -> Option<&[S]> {
    path.split_last().map(|(_, parent)| parent)
}

/// Rewrite `path` from under `old_root` to under `new_root`.
///
/// Returns `None` if `path` is not `old_root` or one of its descendants.
pub fn relocate_path(old_root: &[String], new_root: &[String], path: &[String]) -> Option<Vec<String>> {
    if !is_same_or_descendant(old_root, path) {
        return None;
    }
    let suffix = &path[old_root.len()..];
    let mut relocated = Vec::with_capacity(new_root.len() + suffix.len());
    relocated.extend_from_slice(new_root);
    relocated.extend_from_slice(suffix);
    Some(relocated)
}

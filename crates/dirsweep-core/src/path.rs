/// Relative path helpers.
///
/// Every path the engine hands to a backend, a filter, or a sink is a
/// `/`-separated path relative to the base file system. The root itself is
/// the empty string.

/// Normalise a user-supplied relative path: collapse `.` and empty
/// components, strip leading and trailing slashes, and map `"."` to `""`.
///
/// `..` components are kept as-is; resolving them is up to the backend.
pub fn normalize(path: &str) -> String {
    path.split(['/', '\\'])
        .filter(|c| !c.is_empty() && *c != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Join a directory path and a child name.
pub fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_owned()
    } else {
        let mut out = String::with_capacity(dir.len() + 1 + name.len());
        out.push_str(dir);
        out.push('/');
        out.push_str(name);
        out
    }
}

/// Final component of a path, or `""` for the root.
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// `true` if `path` equals `prefix` or lies underneath it.
pub fn is_within(path: &str, prefix: &str) -> bool {
    if prefix.is_empty() {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

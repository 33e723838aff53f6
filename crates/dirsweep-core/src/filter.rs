/// Path filters.
///
/// A watcher has two independent filter slots: a directory filter, consulted
/// before a directory is diffed or descended into, and a file filter,
/// consulted for each non-directory entry. Both receive the full path
/// relative to the base file system (sub-root prefix included).
///
/// Returning `Ok(false)` excludes the path. Returning an error aborts the
/// sweep at that point.
use crate::error::BoxError;
use crate::path;

pub trait Filter: Send + Sync {
    /// `true` if the path should be considered, `false` to ignore it.
    fn filter(&self, path: &str) -> Result<bool, BoxError>;
}

impl<F> Filter for F
where
    F: Fn(&str) -> Result<bool, BoxError> + Send + Sync,
{
    fn filter(&self, path: &str) -> Result<bool, BoxError> {
        self(path)
    }
}

/// Rejects any path equal to, or nested under, one of the listed prefixes.
#[derive(Debug, Clone, Default)]
pub struct ExcludePaths {
    prefixes: Vec<String>,
}

impl ExcludePaths {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            prefixes: prefixes
                .into_iter()
                .map(|p| path::normalize(p.as_ref()))
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }
}

impl Filter for ExcludePaths {
    fn filter(&self, path: &str) -> Result<bool, BoxError> {
        Ok(!self.prefixes.iter().any(|p| path::is_within(path, p)))
    }
}

/// Rejects dot-files and dot-directories.
#[derive(Debug, Clone, Copy, Default)]
pub struct HiddenFilter;

impl Filter for HiddenFilter {
    fn filter(&self, path: &str) -> Result<bool, BoxError> {
        Ok(!path::file_name(path).starts_with('.'))
    }
}

/// Accepts a path only if every inner filter does. Evaluation stops at the
/// first rejection or error.
#[derive(Default)]
pub struct AllOf {
    filters: Vec<Box<dyn Filter>>,
}

impl AllOf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, filter: impl Filter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }
}

impl Filter for AllOf {
    fn filter(&self, path: &str) -> Result<bool, BoxError> {
        for f in &self.filters {
            if !f.filter(path)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

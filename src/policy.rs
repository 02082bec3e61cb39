//! Category policy: path normalisation and allow-list checks.
//!
//! Categories are `/`-separated paths. An allow-list holds *prefix roots*: a
//! category is permitted when it equals a root or starts with `root + "/"`.
//! Plain string prefix matching is never used, so a root `Tasks` does not
//! admit `Tasks-evil`.

use crate::errors::{ErrorKind, ValidationError};

/// Validate a category path and return it unchanged.
///
/// Rejects the empty string, a leading or trailing `/`, and any empty,
/// `.` or `..` segment.
pub fn normalize(category: &str) -> Result<&str, ValidationError> {
    if category.is_empty() {
        return Err(ValidationError::new(ErrorKind::CategoryEmpty).field("category"));
    }
    if category.starts_with('/') || category.ends_with('/') {
        return Err(ValidationError::new(ErrorKind::CategoryInvalidPath)
            .field("category")
            .detail(format!("leading or trailing '/' in \"{}\"", category)));
    }
    for segment in category.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(ValidationError::new(ErrorKind::CategoryInvalidPath)
                .field("category")
                .detail(format!("invalid segment \"{}\" in \"{}\"", segment, category)));
        }
    }
    Ok(category)
}

/// Check `category` against an allow-list of prefix roots.
///
/// Both the candidate and every allow-list entry are normalised independently.
/// An invalid allow-list entry is a configuration error and fails the check.
pub fn is_allowed<S: AsRef<str>>(
    category: &str,
    allow_list: &[S],
) -> Result<bool, ValidationError> {
    let category = normalize(category)?;
    let mut allowed = false;

    for root in allow_list {
        let root = normalize(root.as_ref()).map_err(|e| {
            ValidationError::new(ErrorKind::CategoryInvalidPath)
                .field("allowed_categories")
                .detail("invalid allow-list entry")
                .cause(e)
        })?;
        if category == root
            || (category.len() > root.len()
                && category.starts_with(root)
                && category.as_bytes()[root.len()] == b'/')
        {
            allowed = true;
        }
    }

    Ok(allowed)
}

/// Require `category` to be on the allow-list.
pub fn ensure_allowed<S: AsRef<str>>(
    category: &str,
    allow_list: &[S],
) -> Result<(), ValidationError> {
    if is_allowed(category, allow_list)? {
        Ok(())
    } else {
        Err(ValidationError::new(ErrorKind::CategoryNotAllowed)
            .field("category")
            .detail(format!("\"{}\"", category)))
    }
}

/// Check that an update keeps a document where it already is.
///
/// The remote document's current category must itself be allowed, and the
/// new category must be byte-for-byte identical to it.
pub fn validate_update<S: AsRef<str>>(
    existing_category: &str,
    new_category: &str,
    allow_list: &[S],
) -> Result<(), ValidationError> {
    if !is_allowed(existing_category, allow_list)? {
        return Err(ValidationError::new(ErrorKind::CategoryNotAllowed)
            .field("category")
            .detail(format!("existing post is filed under \"{}\"", existing_category)));
    }
    if existing_category != new_category {
        return Err(ValidationError::new(ErrorKind::CategoryChangeNotAllowed)
            .field("category")
            .detail(format!("\"{}\" -> \"{}\"", existing_category, new_category)));
    }
    Ok(())
}

/// Require a trailing `yyyy/mm/dd` suffix on a write category.
///
/// Year 2000-2099, month 01-12, day 01-31. The day is range-checked only, so
/// `02/30` is accepted.
pub fn validate_date_suffix(category: &str) -> Result<(), ValidationError> {
    let invalid = || {
        ValidationError::new(ErrorKind::CategoryInvalidDate)
            .field("category")
            .detail(format!("\"{}\"", category))
    };

    let segments: Vec<&str> = category.split('/').collect();
    if segments.len() < 4 {
        return Err(invalid());
    }
    let [year, month, day] = [
        segments[segments.len() - 3],
        segments[segments.len() - 2],
        segments[segments.len() - 1],
    ];

    let year = parse_fixed_digits(year, 4).ok_or_else(invalid)?;
    let month = parse_fixed_digits(month, 2).ok_or_else(invalid)?;
    let day = parse_fixed_digits(day, 2).ok_or_else(invalid)?;

    if !(2000..=2099).contains(&year) || !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return Err(invalid());
    }
    Ok(())
}

fn parse_fixed_digits(s: &str, width: usize) -> Option<u32> {
    if s.len() != width || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// An allow-list checked once at construction.
///
/// Built from configuration at startup so a bad entry fails before any
/// document is processed.
#[derive(Debug, Clone)]
pub struct CategoryPolicy {
    roots: Vec<String>,
}

impl CategoryPolicy {
    pub fn new(roots: Vec<String>) -> Result<Self, ValidationError> {
        if roots.is_empty() {
            return Err(ValidationError::new(ErrorKind::MissingRequired)
                .field("allowed_categories")
                .detail("allow-list is empty"));
        }
        for (index, root) in roots.iter().enumerate() {
            normalize(root).map_err(|e| {
                ValidationError::new(ErrorKind::CategoryInvalidPath)
                    .field("allowed_categories")
                    .index(index)
                    .cause(e)
            })?;
        }
        Ok(Self { roots })
    }

    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    /// Full check for a category about to be written.
    pub fn check_write(&self, category: &str) -> Result<(), ValidationError> {
        normalize(category)?;
        validate_date_suffix(category)?;
        ensure_allowed(category, &self.roots)
    }

    pub fn validate_update(&self, existing: &str, new: &str) -> Result<(), ValidationError> {
        validate_update(existing, new, &self.roots)
    }
}

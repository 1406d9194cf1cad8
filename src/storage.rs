use std::path::{Component, Path};

use crate::error::{PhotoError, PhotoResult};

pub mod backends;
pub mod template;

/// Ensures a basename can be joined onto a storage directory without
/// escaping it.
pub fn validate_basename(basename: &str) -> PhotoResult<()> {
    let reject = |reason| Err(PhotoError::InvalidName(basename.to_string(), reason));

    if basename.is_empty() {
        return reject("name is empty");
    }

    if basename.contains(['/', '\\']) {
        return reject("name contains a path separator");
    }

    if basename.contains('\0') {
        return reject("name contains a NUL byte");
    }

    let mut components = Path::new(basename).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => reject("name is not a plain file name"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_names() {
        assert!(validate_basename("cat.jpeg").is_ok());
        assert!(validate_basename("holiday photo 01.jpeg").is_ok());
        assert!(validate_basename(".hidden.jpeg").is_ok());
    }

    #[test]
    fn rejects_traversal() {
        for name in ["", ".", "..", "../cat.jpeg", "/etc/passwd", "a/b.jpeg", "a\\b.jpeg", "nul\0.jpeg"] {
            let err = validate_basename(name).unwrap_err();
            assert!(err.is_validation(), "{:?} should be rejected", name);
        }
    }
}

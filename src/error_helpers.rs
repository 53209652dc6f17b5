//! Error helper functions for creating actionable error messages

use std::io;
use std::path::Path;

/// Check if an IO error is a permission denied error
pub fn is_permission_denied(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::PermissionDenied
}

/// Check if an IO error is a "not found" error
pub fn is_not_found(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::NotFound
}

/// Create an enhanced error message for file permission issues
pub fn permission_error(path: &Path, operation: &str) -> String {
    format!(
        "Permission denied when {} '{}'\n\n\
         Possible fixes:\n\
         1. Check file permissions: ls -l '{}'\n\
         2. Ensure write access with: chmod u+w '{}'\n\
         3. If owned by another user: Try with sudo (not recommended)",
        operation,
        path.display(),
        path.display(),
        path.display()
    )
}

/// Create an enhanced error message for file not found issues
pub fn not_found_error(path: &Path, context: &str) -> String {
    format!(
        "File not found: '{}'\n\n\
         Context: {}\n\n\
         Possible fixes:\n\
         1. Check the file path is correct\n\
         2. Use an absolute path if the relative path is ambiguous\n\
         3. Check if the file exists in a different directory",
        path.display(),
        context,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::ErrorKind;

    #[test]
    fn test_is_permission_denied() {
        let perm_err = io::Error::new(ErrorKind::PermissionDenied, "access denied");
        assert!(is_permission_denied(&perm_err));

        let not_found_err = io::Error::new(ErrorKind::NotFound, "not found");
        assert!(!is_permission_denied(&not_found_err));
    }

    #[test]
    fn test_is_not_found() {
        let not_found_err = io::Error::new(ErrorKind::NotFound, "not found");
        assert!(is_not_found(&not_found_err));
    }

    #[test]
    fn test_permission_error_formatting() {
        let path = Path::new("/tmp/screen.dart");
        let msg = permission_error(path, "writing");
        assert!(msg.contains("Permission denied"));
        assert!(msg.contains("writing"));
        assert!(msg.contains("/tmp/screen.dart"));
    }

    #[test]
    fn test_not_found_error_formatting() {
        let path = Path::new("lib/screens/login_screen.dart");
        let msg = not_found_error(path, "loading target file");
        assert!(msg.contains("File not found"));
        assert!(msg.contains("login_screen.dart"));
        assert!(msg.contains("loading target file"));
    }
}

//! Safety checks for destructive (replace-original) runs.

use std::path::Path;

const DANGEROUS_DIRS: &[&str] = &[
    "/",
    "/System",
    "/usr",
    "/bin",
    "/sbin",
    "/etc",
    "/var",
    "/private",
    "/Library",
    "/Applications",
    "/Users",
    "/home",
    "/root",
    "/boot",
    "/dev",
    "/proc",
    "/sys",
];

/// Refuse to run a replace-original batch rooted at a protected system
/// directory. Returns a user-facing explanation on refusal.
pub fn check_dangerous_directory(path: &Path) -> Result<(), String> {
    let path_str = path.to_string_lossy();

    for dangerous in DANGEROUS_DIRS {
        if path_str == *dangerous {
            return Err(format!(
                "🚨 Refusing to replace originals under protected directory '{}'.\n\
                 💡 Point the tool at a specific photo folder instead.",
                dangerous
            ));
        }
    }

    Ok(())
}

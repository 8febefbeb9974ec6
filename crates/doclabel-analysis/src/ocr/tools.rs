//! External tool lookup.

pub const POPPLER_HINT: &str = "pdftoppm/pdfinfo not installed. Install with: apt install poppler-utils";

/// Whether `name` resolves on PATH.
pub fn check_binary(name: &str) -> bool {
    which::which(name).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_binary() {
        assert!(!check_binary("doclabel-definitely-not-installed"));
    }
}

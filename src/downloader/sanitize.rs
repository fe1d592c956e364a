// Default path sanitizer

use lazy_static::lazy_static;
use regex::Regex;

use super::traits::PathSanitizer;

lazy_static! {
    static ref ILLEGAL_FILE_CHARS: Regex = Regex::new(r#"[\\/:*?"<>|]"#).unwrap();
    static ref NON_FOLDER_CHARS: Regex = Regex::new(r"[^\w\s.-]").unwrap();
    static ref DASH_RUNS: Regex = Regex::new(r"[-\s]+").unwrap();
}

/// Strips characters that are illegal in file names on common filesystems
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSanitizer;

impl PathSanitizer for DefaultSanitizer {
    fn to_file_name(&self, value: &str) -> String {
        ILLEGAL_FILE_CHARS
            .replace_all(value, "")
            .trim_matches(|c| matches!(c, '-' | '_' | ' '))
            .to_string()
    }

    /// Lowercase, dash-separated slug
    fn to_folder_name(&self, value: &str) -> String {
        let value = self.to_file_name(value).replace('.', "").to_lowercase();
        let value = NON_FOLDER_CHARS.replace_all(&value, "");
        DASH_RUNS
            .replace_all(&value, "-")
            .trim_matches(|c| matches!(c, '-' | '_'))
            .to_string()
    }
}

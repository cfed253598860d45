//! CLI output formatting module
//!
//! Every command renders its result through a serializable output struct
//! implementing [`CommandOutput`]; the global `--json` flag switches
//! between the human rendering and the machine-readable one.

pub mod progress;
pub mod table;

use serde::Serialize;

pub use table::TableFormatter;

pub trait CommandOutput: Serialize {
    fn to_human(&self) -> String;
    fn to_json(&self) -> serde_json::Value;
}

pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    if json_mode {
        println!(
            "{}",
            serde_json::to_string_pretty(&result.to_json()).unwrap_or_default()
        );
    } else {
        println!("{}", result.to_human());
    }
}

/// Truncate a string to a maximum length in characters, appending "..."
/// if truncated. Conclusions are model output, so this cuts on char
/// boundaries rather than bytes.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_string_unchanged() {
        assert_eq!(truncate("PowerPoint", 20), "PowerPoint");
    }

    #[test]
    fn test_truncate_long_string_gets_ellipsis() {
        assert_eq!(truncate("a basic Gomoku game", 10), "a basic...");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let s = "ナレッジベースのウェブサイト";
        let cut = truncate(s, 8);
        assert_eq!(cut, "ナレッジベ...");
    }
}

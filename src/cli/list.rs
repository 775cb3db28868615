//! Rendering of shelf listings

use std::path::Path;
use std::process::{Command, Stdio};

use chrono::{DateTime, Utc};

use super::output::Output;
use crate::domain::Shelf;

/// Messages are cut to this many characters in listings
pub const MESSAGE_WIDTH: usize = 50;

/// Produces a change summary for a stored patch
pub trait DiffstatRenderer {
    /// Returns `None` when no summary could be produced
    fn render(&self, patch: &Path) -> Option<String>;
}

/// Runs an external diffstat program on the patch file.
///
/// The command is split on whitespace into a program and its leading
/// arguments; the patch path is appended last.
pub struct ExternalDiffstat {
    command: String,
}

impl ExternalDiffstat {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl DiffstatRenderer for ExternalDiffstat {
    fn render(&self, patch: &Path) -> Option<String> {
        let mut words = self.command.split_whitespace();
        let program = words.next()?;

        // Whatever the tool printed is shown, even on a non-zero exit
        let output = Command::new(program)
            .args(words)
            .arg(patch)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .ok()?;

        Some(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// First line of `message`, cut to at most `width` characters
pub fn truncate_message(message: &str, width: usize) -> &str {
    let first_line = message.lines().next().unwrap_or("");
    match first_line.char_indices().nth(width) {
        Some((idx, _)) => &first_line[..idx],
        None => first_line,
    }
}

/// `<name> <age> mins old <size> bytes`
pub fn summary_line(shelf: &Shelf, now: DateTime<Utc>) -> String {
    format!(
        "{:<30} {:>6} mins old {:>10} bytes",
        shelf.name.as_str(),
        shelf.age_minutes(now),
        shelf.size_bytes
    )
}

/// Indented, truncated message line
pub fn message_line(shelf: &Shelf) -> String {
    format!(" {}", truncate_message(&shelf.message, MESSAGE_WIDTH))
}

/// Writes the listing for `shelves` in the order given
pub fn render(
    output: &Output,
    shelves: &[&Shelf],
    now: DateTime<Utc>,
    diffstat: Option<&dyn DiffstatRenderer>,
) {
    if output.is_json() {
        let items: Vec<_> = shelves
            .iter()
            .map(|shelf| {
                let mut item = serde_json::json!({
                    "name": shelf.name,
                    "age_minutes": shelf.age_minutes(now),
                    "size_bytes": shelf.size_bytes,
                    "message": shelf.message,
                    "modified": shelf.modified,
                });
                if let Some(renderer) = diffstat {
                    item["diffstat"] = renderer.render(&shelf.patch_path).into();
                }
                item
            })
            .collect();
        output.data(&items);
        return;
    }

    for shelf in shelves {
        output.line(&summary_line(shelf, now));
        output.line(&message_line(shelf));

        if let Some(renderer) = diffstat {
            if let Some(stat) = renderer.render(&shelf.patch_path) {
                output.raw(&stat);
            }
            output.blank();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::output::OutputFormat;
    use crate::domain::ShelfInfo;
    use chrono::{Duration, TimeZone};
    use std::path::PathBuf;

    struct FixedDiffstat(Option<&'static str>);

    impl DiffstatRenderer for FixedDiffstat {
        fn render(&self, _patch: &Path) -> Option<String> {
            self.0.map(str::to_string)
        }
    }

    fn shelf(name: &str, modified: DateTime<Utc>, message: &str, size: u64) -> Shelf {
        Shelf::new(
            name.parse().unwrap(),
            ShelfInfo {
                patch_path: PathBuf::from(format!("{}.patch", name)),
                modified,
                message: message.to_string(),
                size_bytes: size,
            },
        )
    }

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn truncates_to_width_in_characters() {
        let long = "é".repeat(60);
        assert_eq!(truncate_message(&long, 50).chars().count(), 50);
        assert_eq!(truncate_message("short", 50), "short");
        assert_eq!(truncate_message("first\nsecond", 50), "first");
        assert_eq!(truncate_message("", 50), "");
    }

    #[test]
    fn summary_line_layout() {
        let s = shelf("wip", base(), "", 1234);
        let line = summary_line(&s, base() + Duration::minutes(42));

        assert_eq!(
            line,
            format!("{:<30} {:>6} mins old {:>10} bytes", "wip", 42, 1234)
        );
        assert!(line.starts_with("wip "));
        assert!(line.ends_with("1234 bytes"));
    }

    #[test]
    fn renders_two_lines_per_shelf_without_diffstat() {
        let a = shelf("a", base(), "first message", 10);
        let b = shelf("b", base(), &"x".repeat(80), 20);
        let (output, captured) = Output::captured(OutputFormat::Text);

        render(&output, &[&a, &b], base(), None);

        let text = captured.contents();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("a "));
        assert_eq!(lines[1], " first message");
        assert!(lines[2].starts_with("b "));
        assert_eq!(lines[3], format!(" {}", "x".repeat(50)));
    }

    #[test]
    fn diffstat_output_follows_each_shelf() {
        let a = shelf("a", base(), "msg", 10);
        let (output, captured) = Output::captured(OutputFormat::Text);

        render(&output, &[&a], base(), Some(&FixedDiffstat(Some(" 1 file changed\n"))));

        assert_eq!(
            captured.contents(),
            format!("{}\n msg\n 1 file changed\n\n", summary_line(&a, base()))
        );
    }

    #[test]
    fn failed_diffstat_is_skipped() {
        let a = shelf("a", base(), "msg", 10);
        let (output, captured) = Output::captured(OutputFormat::Text);

        render(&output, &[&a], base(), Some(&FixedDiffstat(None)));

        assert_eq!(
            captured.contents(),
            format!("{}\n msg\n\n", summary_line(&a, base()))
        );
    }

    #[test]
    fn missing_diffstat_program_yields_none() {
        let renderer = ExternalDiffstat::new("definitely-not-a-diffstat-binary");
        assert!(renderer.render(Path::new("x.patch")).is_none());
    }

    #[cfg(unix)]
    #[test]
    fn diffstat_command_may_carry_arguments() {
        let renderer = ExternalDiffstat::new("echo  -stat ");
        let out = renderer.render(Path::new("wip.patch")).unwrap();
        assert_eq!(out, "-stat wip.patch\n");
    }

    #[test]
    fn blank_diffstat_command_yields_none() {
        assert!(ExternalDiffstat::new("  ").render(Path::new("wip.patch")).is_none());
    }

    #[test]
    fn json_listing() {
        let a = shelf("a", base(), "msg", 10);
        let (output, captured) = Output::captured(OutputFormat::Json);

        render(&output, &[&a], base() + Duration::minutes(3), None);

        let json: serde_json::Value = serde_json::from_str(captured.contents().trim()).unwrap();
        assert_eq!(json[0]["name"], "a");
        assert_eq!(json[0]["age_minutes"], 3);
        assert_eq!(json[0]["size_bytes"], 10);
        assert!(json[0].get("diffstat").is_none());
    }
}

use chrono::{DateTime, Utc};
use listing_uploads::{PreviewEntry, PreviewPane, PreviewView};
use serde::Serialize;

const BAR_CELLS: usize = 20;
const NAME_WIDTH: usize = 28;

/// Truncate a string to max_len characters, appending "..." if truncated.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Parse a `--field key=value` argument.
pub fn parse_field(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{}'", raw)),
    }
}

/// One terminal line for a preview: name, bar and status text.
pub fn render_line(view: &PreviewView) -> String {
    let filled = (view.bar_width as usize * BAR_CELLS + 50) / 100;
    let bar = format!(
        "{}{}",
        "#".repeat(filled),
        "-".repeat(BAR_CELLS - filled.min(BAR_CELLS))
    );
    format!(
        "{:<width$} [{}] {}",
        truncate_string(&view.file_name, NAME_WIDTH),
        bar,
        view.status_text,
        width = NAME_WIDTH
    )
}

/// A preview as printed by `upload --json`.
#[derive(Debug, Serialize)]
pub struct PreviewReport {
    #[serde(flatten)]
    pub view: PreviewView,
    pub selected_at: DateTime<Utc>,
}

impl PreviewReport {
    pub fn from_entry(entry: &PreviewEntry) -> Self {
        Self {
            view: entry.render(),
            selected_at: entry.created_at(),
        }
    }
}

/// Preview pane that prints a line to stderr on every change.
#[derive(Debug, Default)]
pub struct TerminalPane {
    lines_written: usize,
}

impl TerminalPane {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines_written(&self) -> usize {
        self.lines_written
    }

    fn write(&mut self, view: &PreviewView) {
        eprintln!("{}", render_line(view));
        self.lines_written += 1;
    }
}

impl PreviewPane for TerminalPane {
    fn mount(&mut self, view: &PreviewView) {
        self.write(view);
    }

    fn update(&mut self, view: &PreviewView) {
        self.write(view);
    }

    fn unmount(&mut self, preview_id: &str) {
        tracing::debug!(preview_id = %preview_id, "Preview removed");
    }
}

/// Initialize tracing for the CLI. Logs go to stderr so stdout stays parseable.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use listing_core::{PreviewStatus, SelectedFile, UploadPhase};

    fn view(file_name: &str, status: PreviewStatus, status_text: &str) -> PreviewView {
        PreviewView {
            id: "preview-1".to_string(),
            file_name: file_name.to_string(),
            thumbnail: None,
            bar_class: String::new(),
            bar_width: status.percent(),
            status_text: status_text.to_string(),
            status_class: String::new(),
            status,
        }
    }

    #[test]
    fn truncate_string_short() {
        assert_eq!(truncate_string("hello", 10), "hello");
        assert_eq!(truncate_string("", 5), "");
        assert_eq!(truncate_string("hello", 5), "hello");
    }

    #[test]
    fn truncate_string_long() {
        assert_eq!(truncate_string("hello world", 8), "hello...");
        assert_eq!(truncate_string("abc", 2), "...");
        assert_eq!(truncate_string("hello", 0), "...");
    }

    #[test]
    fn truncate_string_counts_characters() {
        assert_eq!(truncate_string("wohnküche.png", 8), "wohnk...");
    }

    #[test]
    fn parse_field_splits_on_first_equals() {
        assert_eq!(
            parse_field("listing[title]=Cabin=cosy"),
            Ok(("listing[title]".to_string(), "Cabin=cosy".to_string()))
        );
        assert_eq!(
            parse_field("listing[notes]="),
            Ok(("listing[notes]".to_string(), String::new()))
        );
        assert!(parse_field("novalue").is_err());
        assert!(parse_field("=x").is_err());
    }

    #[test]
    fn render_line_scales_bar() {
        let line = render_line(&view(
            "a.png",
            PreviewStatus::Uploading {
                phase: UploadPhase::Sending,
                percent: 45,
            },
            "Uploading... 45%",
        ));
        assert!(line.starts_with("a.png "));
        assert!(line.contains("[#########-----------]"));
        assert!(line.ends_with("Uploading... 45%"));

        let done = render_line(&view("a.png", PreviewStatus::Success, "Upload complete! ✓"));
        assert!(done.contains(&format!("[{}]", "#".repeat(20))));
    }

    #[test]
    fn terminal_pane_counts_lines() {
        let mut pane = TerminalPane::new();
        let preparing = view("a.png", PreviewStatus::Preparing, "Preparing upload...");
        pane.mount(&preparing);
        pane.update(&preparing);
        pane.unmount("preview-1");
        assert_eq!(pane.lines_written(), 2);
    }

    #[test]
    fn preview_report_flattens_view_and_adds_selection_time() {
        let before = Utc::now();
        let entry = PreviewEntry::new(
            SelectedFile::from_bytes("a.png", "image/png", vec![1u8; 4]),
            None,
        );
        let after = Utc::now();

        let report = PreviewReport::from_entry(&entry);
        assert!(report.selected_at >= before && report.selected_at <= after);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["file_name"], "a.png");
        assert_eq!(json["id"], entry.id());
        assert!(json.get("view").is_none());
        let selected_at: DateTime<Utc> = json["selected_at"].as_str().unwrap().parse().unwrap();
        assert_eq!(selected_at, entry.created_at());
    }
}

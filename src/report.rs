//! End-of-run reporting.
//!
//! Recoverable conditions are collected here while processing continues;
//! the user sees one summary at the end of the run, with errors, warnings,
//! and informational notices in separate sections.

/// Collects errors, warnings, and informational messages for the end-of-run
/// summary. Warnings can be deduplicated by an id so that a condition found
/// on many items is reported once.
#[derive(Debug, Default, Clone)]
pub struct Report {
    errors: Vec<String>,
    warnings: Vec<String>,
    info: Vec<String>,
    one_time_ids: Vec<String>,
}

impl Report {
    pub fn new() -> Report {
        Report::default()
    }

    /// Records a fatal error. Processing of the current document stops at
    /// the driver level; the report itself keeps accepting messages.
    pub fn error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    pub fn warn(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    /// Records a warning once per id. When `id` is `None` the message text
    /// itself is the id, for warnings whose wording never varies.
    pub fn warn_once(&mut self, msg: impl Into<String>, id: Option<&str>) {
        let msg = msg.into();
        let key = id.unwrap_or(&msg).to_string();
        if !self.one_time_ids.contains(&key) {
            self.one_time_ids.push(key);
            self.warnings.push(msg);
        }
    }

    /// Records an informational notice.
    pub fn message(&mut self, msg: impl Into<String>) {
        self.info.push(msg.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn info(&self) -> &[String] {
        &self.info
    }

    /// Formats the end-of-run summary: each non-empty category under a
    /// count-correct pluralized heading, followed by a version stamp.
    pub fn summary(&self, version: &str) -> String {
        const RULE: &str = "\n================\n";
        let mut out = String::new();
        out.push_str(&make_list(&self.errors, "Error", "Errors", RULE));
        out.push_str(&make_list(&self.warnings, "Warning", "Warnings", RULE));
        out.push_str(&make_list(&self.info, "Information", "Information", RULE));
        out.push('\n');
        out.push_str(RULE);
        out.push_str("artboard-tools v");
        out.push_str(version);
        out.push('\n');
        out
    }
}

fn make_list(items: &[String], singular: &str, plural: &str, rule: &str) -> String {
    let mut list = String::new();
    if !items.is_empty() {
        list.push('\n');
        list.push_str(if items.len() == 1 { singular } else { plural });
        list.push_str(rule);
        for item in items {
            list.push_str("\u{2022} ");
            list.push_str(item);
            list.push('\n');
        }
    }
    list
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warn_once_deduplicates_by_id() {
        let mut report = Report::new();
        report.warn_once("Missing a rule for converting font: A", Some("A"));
        report.warn_once("Missing a rule for converting font: A", Some("A"));
        report.warn_once("Missing a rule for converting font: B", Some("B"));
        assert_eq!(report.warnings().len(), 2);
    }

    #[test]
    fn summary_pluralizes_headings() {
        let mut report = Report::new();
        report.warn("only one");
        let s = report.summary("0.3.0");
        assert!(s.contains("\nWarning\n"));
        assert!(!s.contains("Warnings"));

        report.warn("now two");
        let s = report.summary("0.3.0");
        assert!(s.contains("\nWarnings\n"));
        assert!(s.contains("artboard-tools v0.3.0"));
    }

    #[test]
    fn summary_orders_errors_before_warnings() {
        let mut report = Report::new();
        report.warn("w");
        report.error("e");
        let s = report.summary("0.3.0");
        let err_at = s.find("Error").unwrap();
        let warn_at = s.find("Warning").unwrap();
        assert!(err_at < warn_at);
    }
}

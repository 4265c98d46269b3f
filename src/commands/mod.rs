pub mod login;
pub mod migrate;

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct CommandReport {
    pub command: String,
    pub ok: bool,
    pub details: Vec<String>,
    pub issues: Vec<String>,
}

impl CommandReport {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ok: true,
            details: Vec::new(),
            issues: Vec::new(),
        }
    }

    pub fn detail(&mut self, text: impl Into<String>) {
        self.details.push(text.into());
    }

    /// Record a non-fatal problem. The run still exits successfully.
    pub fn issue(&mut self, text: impl Into<String>) {
        self.ok = false;
        self.issues.push(text.into());
    }

    pub fn render_text(&self) -> String {
        let status = if self.ok { "ok" } else { "completed with issues" };
        let mut out = format!("{}: {status}\n", self.command);
        for detail in &self.details {
            out.push_str(&format!("  {detail}\n"));
        }
        for issue in &self.issues {
            out.push_str(&format!("  warning: {issue}\n"));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::CommandReport;

    #[test]
    fn issues_flip_ok_and_render_as_warnings() {
        let mut report = CommandReport::new("migrate");
        report.detail("rooms.created=2");
        assert_eq!(report.render_text(), "migrate: ok\n  rooms.created=2\n");

        report.issue("1 message(s) failed");
        assert!(!report.ok);
        assert!(report.render_text().contains("  warning: 1 message(s) failed\n"));
    }
}

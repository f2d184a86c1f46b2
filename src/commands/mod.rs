pub mod copy;
pub mod inspect;
pub mod load;
pub mod save;
pub mod scan;

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

    pub fn issue(&mut self, text: impl Into<String>) {
        self.ok = false;
        self.issues.push(text.into());
    }

    pub fn render_text(&self) -> String {
        let status = if self.ok { "ok" } else { "completed with issues" };
        let mut out = format!("[{}] {}\n", self.command, status);
        for detail in &self.details {
            out.push_str("  ");
            out.push_str(detail);
            out.push('\n');
        }
        for issue in &self.issues {
            out.push_str("  ! ");
            out.push_str(issue);
            out.push('\n');
        }
        out
    }
}

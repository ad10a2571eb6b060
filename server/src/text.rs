use crate::Subject;

/// Expands placeholder templates into display text
pub trait TextEngine: Send + Sync {
    fn expand(&self, template: &str, subject: &Subject) -> String;

    /// Expands the parts of an already expanded value that depend on who
    /// is looking
    fn expand_relational(&self, text: &str, _subject: &Subject, _viewer: &Subject) -> String {
        text.to_string()
    }
}

/// Text engine resolving only the built-in subject placeholders:
/// `%player%`, `%nick%`, `%server%`, `%world%`, `%group%` and `%ping%`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainText;

impl TextEngine for PlainText {
    fn expand(&self, template: &str, subject: &Subject) -> String {
        if !template.contains('%') {
            return template.to_string();
        }
        let state = subject.state();
        template
            .replace("%player%", subject.name())
            .replace("%nick%", &state.nickname)
            .replace("%server%", &state.server)
            .replace("%world%", &state.world)
            .replace("%group%", &state.group)
            .replace("%ping%", &state.latency.to_string())
    }
}

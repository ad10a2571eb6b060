use std::{collections::HashMap, sync::Arc};

use tabsync_shared::{server_matches, Property, SubjectId};

use crate::{
    condition::{Condition, DisableChecker},
    executor::{CategoryUsage, FeatureExecutor},
    features::{Feature, FeatureContext},
    ExecutorError, Subject,
};

const HEADER: &str = "header";
const FOOTER: &str = "footer";

/// Header and footer lines of one scope
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderFooterLines {
    pub header: Vec<String>,
    pub footer: Vec<String>,
}

/// Contains Config properties which will be used by [`HeaderFooter`]
#[derive(Clone, Default)]
pub struct HeaderFooterConfig {
    /// Lines used when no world or server scope matches
    pub lines: HeaderFooterLines,
    /// Lines for worlds matching any of the patterns, first match wins
    pub per_world: Vec<(Vec<String>, HeaderFooterLines)>,
    /// Lines for servers matching any of the patterns, first match wins
    pub per_server: Vec<(Vec<String>, HeaderFooterLines)>,
    pub disable_condition: Option<Condition>,
}

impl HeaderFooterConfig {
    /// Configured lines of `key` for a server and world, joined by new lines
    fn lines(&self, key: &str, server: &str, world: &str) -> String {
        let lines = scoped(&self.per_world, world)
            .or_else(|| scoped(&self.per_server, server))
            .unwrap_or(&self.lines);
        let lines = if key == HEADER { &lines.header } else { &lines.footer };
        lines.join("\n")
    }
}

fn scoped<'c>(
    scopes: &'c [(Vec<String>, HeaderFooterLines)],
    name: &str,
) -> Option<&'c HeaderFooterLines> {
    scopes
        .iter()
        .find(|(patterns, _)| server_matches(name, patterns))
        .map(|(_, lines)| lines)
}

/// Header and footer of every subject's player list
pub struct HeaderFooter {
    executor: FeatureExecutor<HeaderFooterState>,
}

impl HeaderFooter {
    pub fn new(context: FeatureContext, config: HeaderFooterConfig) -> Result<Self, ExecutorError> {
        let state = HeaderFooterState {
            context,
            disable: DisableChecker::new("Header/Footer", config.disable_condition.clone()),
            config,
            players: HashMap::new(),
        };
        Ok(Self {
            executor: FeatureExecutor::new("header-footer", state)?,
        })
    }

    /// Overrides the configured header; `None` restores it
    pub fn set_header(&self, subject: SubjectId, header: Option<String>) {
        self.executor.submit("api", move |state| {
            state.set_temporary(subject, Some(header), None)
        });
    }

    /// Overrides the configured footer; `None` restores it
    pub fn set_footer(&self, subject: SubjectId, footer: Option<String>) {
        self.executor.submit("api", move |state| {
            state.set_temporary(subject, None, Some(footer))
        });
    }

    pub fn set_header_and_footer(
        &self,
        subject: SubjectId,
        header: Option<String>,
        footer: Option<String>,
    ) {
        self.executor.submit("api", move |state| {
            state.set_temporary(subject, Some(header), Some(footer))
        });
    }
}

impl Feature for HeaderFooter {
    fn name(&self) -> &'static str {
        "Header/Footer"
    }

    fn on_join(&self, subject: &Arc<Subject>) {
        let subject = subject.clone();
        self.executor.submit("join", move |state| state.join(subject));
    }

    fn on_quit(&self, subject: &Arc<Subject>) {
        let id = subject.id();
        self.executor.submit("quit", move |state| {
            state.players.remove(&id);
        });
    }

    /// The platform clears the header and footer on a server switch, so
    /// they are sent even when unchanged
    fn on_server_switch(&self, subject: &Arc<Subject>) {
        let id = subject.id();
        self.executor.submit("server-switch", move |state| {
            state.reload(id);
            state.send(id);
        });
    }

    fn on_world_switch(&self, subject: &Arc<Subject>) {
        let id = subject.id();
        self.executor.submit("world-switch", move |state| {
            if state.reload(id) {
                state.send(id);
            }
        });
    }

    fn refresh(&self, subject: &Arc<Subject>, force: bool) {
        let id = subject.id();
        self.executor
            .submit("refresh", move |state| state.refresh(id, force));
    }

    fn unload(&self) {
        self.executor.submit("unload", |state| {
            for data in state.players.values() {
                if !data.disabled {
                    state.context.platform.set_header_footer(&data.subject, "", "");
                }
            }
            state.players.clear();
        });
    }

    fn flush(&self) -> Result<(), ExecutorError> {
        self.executor.flush()
    }

    fn shutdown(&self) {
        self.executor.shutdown();
    }

    fn usage(&self) -> Vec<(&'static str, CategoryUsage)> {
        self.executor.usage()
    }
}

struct HeaderFooterData {
    subject: Arc<Subject>,
    header: Property,
    footer: Property,
    disabled: bool,
}

struct HeaderFooterState {
    context: FeatureContext,
    config: HeaderFooterConfig,
    disable: DisableChecker,
    players: HashMap<SubjectId, HeaderFooterData>,
}

impl HeaderFooterState {
    fn join(&mut self, subject: Arc<Subject>) {
        let id = subject.id();
        if self.players.contains_key(&id) {
            return;
        }
        let expand = self.context.expander(&subject);
        let data = HeaderFooterData {
            header: Property::new(self.template(&subject, HEADER), &expand),
            footer: Property::new(self.template(&subject, FOOTER), &expand),
            disabled: self.disable.is_disabled(&subject),
            subject: subject.clone(),
        };
        self.players.insert(id, data);
        self.send(id);
    }

    fn refresh(&mut self, id: SubjectId, force: bool) {
        let Some(data) = self.players.get_mut(&id) else {
            return;
        };
        if let Some(disabled) = self.disable.check(&data.subject, &mut data.disabled) {
            if disabled {
                self.context.platform.set_header_footer(&data.subject, "", "");
            } else {
                self.send(id);
            }
            return;
        }
        let mut changed = force && self.reload(id);
        if let Some(data) = self.players.get_mut(&id) {
            let expand = self.context.expander(&data.subject);
            changed |= data.header.update(&expand);
            changed |= data.footer.update(&expand);
        }
        if changed {
            self.send(id);
        }
    }

    /// Resolves the templates again. Returns true if either changed.
    fn reload(&mut self, id: SubjectId) -> bool {
        let Some(subject) = self.players.get(&id).map(|data| data.subject.clone()) else {
            return false;
        };
        let header = self.template(&subject, HEADER);
        let footer = self.template(&subject, FOOTER);
        let Some(data) = self.players.get_mut(&id) else {
            return false;
        };
        let expand = self.context.expander(&subject);
        let changed = data.header.change_raw(&header, &expand);
        data.footer.change_raw(&footer, &expand) || changed
    }

    fn set_temporary(
        &mut self,
        id: SubjectId,
        header: Option<Option<String>>,
        footer: Option<Option<String>>,
    ) {
        let Some(data) = self.players.get_mut(&id) else {
            return;
        };
        let expand = self.context.expander(&data.subject);
        if let Some(header) = header {
            data.header.set_temporary(header, &expand);
        }
        if let Some(footer) = footer {
            data.footer.set_temporary(footer, &expand);
        }
        data.header.update(&expand);
        data.footer.update(&expand);
        self.send(id);
    }

    fn send(&self, id: SubjectId) {
        let Some(data) = self.players.get(&id) else {
            return;
        };
        if data.disabled {
            return;
        }
        self.context
            .platform
            .set_header_footer(&data.subject, data.header.get(), data.footer.get());
    }

    /// Template of `key` from the property store, falling back to the
    /// configured lines, followed by the `<key>append` property
    fn template(&self, subject: &Subject, key: &str) -> String {
        let base = self.context.template(subject, key).unwrap_or_else(|| {
            self.config
                .lines(key, &subject.server(), &subject.world())
        });
        match self.context.template(subject, &format!("{key}append")) {
            Some(append) if !append.is_empty() => format!("{base}\n{append}"),
            _ => base,
        }
    }
}

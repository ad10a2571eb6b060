use std::{collections::HashMap, sync::Arc};

use arc_swap::ArcSwap;

use tabsync_shared::{Property, SubjectId, TablistFormatMessage};

use crate::{
    condition::{in_worlds, Condition, DisableChecker},
    executor::{CategoryUsage, FeatureExecutor},
    features::{Feature, FeatureContext},
    replication::RemoteListener,
    ExecutorError, Subject,
};

const PREFIX: &str = "tabprefix";
const NAME: &str = "customtabname";
const SUFFIX: &str = "tabsuffix";

/// Contains Config properties which will be used by [`TablistFormat`]
#[derive(Clone)]
pub struct TablistFormatConfig {
    pub disable_condition: Option<Condition>,
}

impl Default for TablistFormatConfig {
    fn default() -> Self {
        Self {
            disable_condition: Some(in_worlds(&["disabledworld"])),
        }
    }
}

/// Player list names of every enabled local subject, readable from any
/// thread. Written only by the [`TablistFormat`] executor; readers get
/// whatever was published last.
#[derive(Default)]
pub struct PublishedFormats {
    formats: ArcSwap<HashMap<SubjectId, String>>,
}

impl PublishedFormats {
    pub fn get(&self, id: &SubjectId) -> Option<String> {
        self.formats.load().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.formats.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn publish(&self, id: SubjectId, format: Option<String>) {
        let mut formats = HashMap::clone(&self.formats.load());
        match format {
            Some(format) => formats.insert(id, format),
            None => formats.remove(&id),
        };
        self.formats.store(Arc::new(formats));
    }
}

/// Formatted player list names built from the `tabprefix`,
/// `customtabname` and `tabsuffix` properties
pub struct TablistFormat {
    formats: Arc<PublishedFormats>,
    executor: FeatureExecutor<FormatState>,
}

impl TablistFormat {
    pub fn new(context: FeatureContext, config: TablistFormatConfig) -> Result<Self, ExecutorError> {
        let formats = Arc::new(PublishedFormats::default());
        let state = FormatState {
            context,
            disable: DisableChecker::new("Tablist name formatting", config.disable_condition),
            players: HashMap::new(),
            formats: formats.clone(),
        };
        Ok(Self {
            formats,
            executor: FeatureExecutor::new("tablist-format", state)?,
        })
    }

    pub fn formats(&self) -> Arc<PublishedFormats> {
        self.formats.clone()
    }

    /// Overrides the configured prefix; `None` restores it
    pub fn set_prefix(&self, subject: SubjectId, prefix: Option<String>) {
        self.executor
            .submit("prefix", move |state| state.set_temporary(subject, Part::Prefix, prefix));
    }

    /// Overrides the configured name; `None` restores it
    pub fn set_name(&self, subject: SubjectId, name: Option<String>) {
        self.executor
            .submit("name", move |state| state.set_temporary(subject, Part::Name, name));
    }

    /// Overrides the configured suffix; `None` restores it
    pub fn set_suffix(&self, subject: SubjectId, suffix: Option<String>) {
        self.executor
            .submit("suffix", move |state| state.set_temporary(subject, Part::Suffix, suffix));
    }
}

impl Feature for TablistFormat {
    fn name(&self) -> &'static str {
        "Tablist name formatting"
    }

    fn on_join(&self, subject: &Arc<Subject>) {
        let subject = subject.clone();
        self.executor.submit("join", move |state| state.join(subject));
    }

    fn on_quit(&self, subject: &Arc<Subject>) {
        let id = subject.id();
        self.executor.submit("quit", move |state| state.quit(id));
    }

    fn on_server_switch(&self, subject: &Arc<Subject>) {
        let id = subject.id();
        self.executor
            .submit("server-switch", move |state| state.refresh(id, true));
    }

    fn on_world_switch(&self, subject: &Arc<Subject>) {
        let id = subject.id();
        self.executor
            .submit("world-switch", move |state| state.refresh(id, true));
    }

    fn on_nickname_change(&self, subject: &Arc<Subject>) {
        let id = subject.id();
        self.executor
            .submit("nickname", move |state| state.refresh(id, true));
    }

    fn refresh(&self, subject: &Arc<Subject>, force: bool) {
        let id = subject.id();
        self.executor
            .submit("refresh", move |state| state.refresh(id, force));
    }

    fn unload(&self) {
        self.executor.submit("unload", |state| state.unload());
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

impl RemoteListener for TablistFormat {
    fn on_load_request(&self) {
        self.executor.submit("load-request", |state| {
            for data in state.players.values() {
                if !data.disabled {
                    state.replicate(data);
                }
            }
        });
    }
}

#[derive(Clone, Copy)]
enum Part {
    Prefix,
    Name,
    Suffix,
}

struct FormatData {
    subject: Arc<Subject>,
    prefix: Property,
    name: Property,
    suffix: Property,
    disabled: bool,
}

impl FormatData {
    fn format(&self) -> String {
        format!("{}{}{}", self.prefix.get(), self.name.get(), self.suffix.get())
    }

    fn part(&mut self, part: Part) -> &mut Property {
        match part {
            Part::Prefix => &mut self.prefix,
            Part::Name => &mut self.name,
            Part::Suffix => &mut self.suffix,
        }
    }
}

struct FormatState {
    context: FeatureContext,
    disable: DisableChecker,
    players: HashMap<SubjectId, FormatData>,
    formats: Arc<PublishedFormats>,
}

impl FormatState {
    fn join(&mut self, subject: Arc<Subject>) {
        let id = subject.id();
        if self.players.contains_key(&id) {
            return;
        }
        let [prefix, name, suffix] = self.templates(&subject);
        let expand = self.context.expander(&subject);
        let data = FormatData {
            prefix: Property::new(prefix, &expand),
            name: Property::new(name, &expand),
            suffix: Property::new(suffix, &expand),
            disabled: self.disable.is_disabled(&subject),
            subject: subject.clone(),
        };
        self.players.insert(id, data);

        // names of everyone already online, for the newcomer
        for other in self.players.values() {
            if other.disabled || other.subject.id() == id {
                continue;
            }
            self.send_format(other, &subject);
        }
        if let Some(data) = self.players.get(&id) {
            if !data.disabled {
                self.publish(data);
            }
        }
    }

    fn quit(&mut self, id: SubjectId) {
        if self.players.remove(&id).is_some() {
            self.formats.publish(id, None);
        }
    }

    fn refresh(&mut self, id: SubjectId, force: bool) {
        let templates = match self.players.get(&id) {
            Some(data) if force => Some(self.templates(&data.subject)),
            Some(_) => None,
            None => return,
        };
        let Some(data) = self.players.get_mut(&id) else {
            return;
        };
        if let Some(disabled) = self.disable.check(&data.subject, &mut data.disabled) {
            if disabled {
                self.formats.publish(id, None);
                self.reset(id);
            } else if let Some(data) = self.players.get(&id) {
                self.publish(data);
            }
            return;
        }
        if data.disabled {
            return;
        }
        let expand = self.context.expander(&data.subject);
        let mut changed = false;
        if let Some([prefix, name, suffix]) = templates {
            changed |= data.prefix.change_raw(&prefix, &expand);
            changed |= data.name.change_raw(&name, &expand);
            changed |= data.suffix.change_raw(&suffix, &expand);
        }
        changed |= data.prefix.update(&expand);
        changed |= data.name.update(&expand);
        changed |= data.suffix.update(&expand);
        if changed {
            if let Some(data) = self.players.get(&id) {
                self.publish(data);
            }
        }
    }

    fn set_temporary(&mut self, id: SubjectId, part: Part, value: Option<String>) {
        let Some(data) = self.players.get_mut(&id) else {
            return;
        };
        let subject = data.subject.clone();
        let expand = self.context.expander(&subject);
        if !data.part(part).set_temporary(value, &expand) || data.disabled {
            return;
        }
        if let Some(data) = self.players.get(&id) {
            self.publish(data);
        }
    }

    fn unload(&mut self) {
        let ids: Vec<_> = self.players.keys().copied().collect();
        for id in ids {
            self.formats.publish(id, None);
            self.reset(id);
        }
        self.players.clear();
    }

    /// Publishes a subject's format and sends it to every viewer
    fn publish(&self, data: &FormatData) {
        self.formats.publish(data.subject.id(), Some(data.format()));
        for viewer in self.players.values() {
            self.send_format(data, &viewer.subject);
        }
        self.replicate(data);
    }

    fn send_format(&self, data: &FormatData, viewer: &Subject) {
        let format = self
            .context
            .text
            .expand_relational(&data.format(), &data.subject, viewer);
        self.context
            .platform
            .update_display_name(viewer, data.subject.tablist_id(), Some(&format));
    }

    /// Restores the plain name of a subject for every viewer
    fn reset(&self, id: SubjectId) {
        let Some(data) = self.players.get(&id) else {
            return;
        };
        for viewer in self.players.values() {
            self.context
                .platform
                .update_display_name(&viewer.subject, data.subject.tablist_id(), None);
        }
    }

    fn replicate(&self, data: &FormatData) {
        self.context.send(&TablistFormatMessage {
            id: data.subject.id(),
            format: data.format(),
        });
    }

    fn templates(&self, subject: &Subject) -> [String; 3] {
        [
            self.context.template(subject, PREFIX).unwrap_or_default(),
            self.context
                .template(subject, NAME)
                .unwrap_or_else(|| subject.nickname()),
            self.context.template(subject, SUFFIX).unwrap_or_default(),
        ]
    }
}

//! The features kept in sync for every viewer. Each one owns a
//! [`FeatureExecutor`](crate::executor::FeatureExecutor) and all of its
//! per-subject state; the [`Feature`] methods only enqueue work.

mod global_player_list;
mod header_footer;
mod name_tags;
mod player_list_objective;
mod tablist_format;

pub use global_player_list::{GlobalPlayerList, GlobalPlayerListConfig};
pub use header_footer::{HeaderFooter, HeaderFooterConfig, HeaderFooterLines};
pub use name_tags::{NameTagConfig, NameTags};
pub use player_list_objective::{PlayerListObjective, PlayerListObjectiveConfig, OBJECTIVE_NAME};
pub use tablist_format::{PublishedFormats, TablistFormat, TablistFormatConfig};

use std::sync::Arc;

use tabsync_shared::{Message, PropertyStore};

use crate::{
    executor::CategoryUsage, replication::Outbound, ExecutorError, Platform, RemoteRegistry,
    Subject, TextEngine,
};

/// Collaborators handed to every feature at construction
#[derive(Clone)]
pub struct FeatureContext {
    pub platform: Arc<dyn Platform>,
    pub text: Arc<dyn TextEngine>,
    pub properties: Arc<PropertyStore>,
    pub remotes: Arc<RemoteRegistry>,
    /// Absent when the node runs without replication
    pub outbound: Option<Outbound>,
}

impl FeatureContext {
    /// Configured template of `key` for a subject
    pub fn template(&self, subject: &Subject, key: &str) -> Option<String> {
        subject.with_lookup(|lookup| self.properties.property(lookup, key))
    }

    /// Expander of templates for one subject
    pub fn expander<'a>(&'a self, subject: &'a Subject) -> impl Fn(&str) -> String + Copy + 'a {
        move |raw| self.text.expand(raw, subject)
    }

    pub fn send<M: Message>(&self, message: &M) {
        if let Some(outbound) = &self.outbound {
            outbound.send(message);
        }
    }
}

/// Events a feature reacts to. Every method returns right after queuing
/// its work on the feature's executor.
pub trait Feature: Send + Sync {
    fn name(&self) -> &'static str;

    fn on_join(&self, subject: &Arc<Subject>);

    fn on_quit(&self, subject: &Arc<Subject>);

    fn on_server_switch(&self, _subject: &Arc<Subject>) {}

    fn on_world_switch(&self, _subject: &Arc<Subject>) {}

    fn on_vanish_change(&self, _subject: &Arc<Subject>) {}

    fn on_game_mode_change(&self, _subject: &Arc<Subject>) {}

    fn on_nickname_change(&self, _subject: &Arc<Subject>) {}

    /// The platform dropped every entry of the subject's player list
    fn on_tablist_clear(&self, _subject: &Arc<Subject>) {}

    /// Re-evaluates the subject's values; `force` reloads their templates
    fn refresh(&self, _subject: &Arc<Subject>, _force: bool) {}

    /// Removes everything the feature registered on the platform
    fn unload(&self);

    fn flush(&self) -> Result<(), ExecutorError>;

    fn shutdown(&self);

    fn usage(&self) -> Vec<(&'static str, CategoryUsage)>;
}

use std::{collections::HashMap, sync::Arc};

use log::warn;

use tabsync_shared::{
    parse_score, HealthDisplay, Message, Objective, Property, ProtocolError, ScoreUpdateMessage,
    ScoreValue, SubjectId,
};

use crate::{
    condition::{Condition, DisableChecker},
    executor::{CategoryUsage, FeatureExecutor},
    features::{Feature, FeatureContext},
    lifecycle::{report, RegistrationLedger},
    remote::RemoteScore,
    replication::{MessageKinds, RemoteListener},
    ExecutorError, RemoteSubject, Subject,
};

/// Name of the objective in the player list display slot
pub const OBJECTIVE_NAME: &str = "TAB-PlayerList";

const TITLE: &str = "PlayerListObjectiveTitle";
const HEALTH_PLACEHOLDERS: [&str; 3] = ["%health%", "%player_health%", "%player_health_rounded%"];

/// Contains Config properties which will be used by [`PlayerListObjective`]
#[derive(Clone)]
pub struct PlayerListObjectiveConfig {
    /// Template of the numeric score
    pub value: String,
    /// Template shown in place of the number by clients that support it
    pub fancy_value: String,
    pub disable_condition: Option<Condition>,
}

impl Default for PlayerListObjectiveConfig {
    fn default() -> Self {
        Self {
            value: "%ping%".to_string(),
            fancy_value: "&7Ping: %ping%".to_string(),
            disable_condition: None,
        }
    }
}

impl PlayerListObjectiveConfig {
    /// Health values are drawn as hearts
    pub fn display(&self) -> HealthDisplay {
        if HEALTH_PLACEHOLDERS.contains(&self.value.as_str()) {
            HealthDisplay::Hearts
        } else {
            HealthDisplay::Integer
        }
    }
}

/// A score next to every name in the player list
pub struct PlayerListObjective {
    executor: FeatureExecutor<ObjectiveState>,
}

impl PlayerListObjective {
    pub fn new(context: FeatureContext, config: PlayerListObjectiveConfig) -> Result<Self, ExecutorError> {
        let state = ObjectiveState {
            context,
            disable: DisableChecker::new("Playerlist Objective", config.disable_condition.clone()),
            objective: Objective {
                name: OBJECTIVE_NAME.to_string(),
                title: TITLE.to_string(),
                display: config.display(),
            },
            config,
            players: HashMap::new(),
            objectives: RegistrationLedger::new("objective"),
        };
        Ok(Self {
            executor: FeatureExecutor::new("playerlist-objective", state)?,
        })
    }

    pub(crate) fn register_messages(
        feature: &Arc<Self>,
        kinds: &mut MessageKinds,
    ) -> Result<(), ProtocolError> {
        let feature = feature.clone();
        kinds.add::<ScoreUpdateMessage>(move |inbound, _, message| {
            let Some(remote) = inbound.known(&message.id, ScoreUpdateMessage::NAME) else {
                return;
            };
            feature.executor.submit("remote-score", move |state| {
                state.remote_score(&remote, message)
            });
        })
    }
}

impl Feature for PlayerListObjective {
    fn name(&self) -> &'static str {
        "Playerlist Objective"
    }

    fn on_join(&self, subject: &Arc<Subject>) {
        let subject = subject.clone();
        self.executor.submit("join", move |state| state.join(subject));
    }

    fn on_quit(&self, subject: &Arc<Subject>) {
        let id = subject.id();
        self.executor.submit("quit", move |state| state.quit(id));
    }

    fn on_nickname_change(&self, subject: &Arc<Subject>) {
        let id = subject.id();
        self.executor
            .submit("nickname", move |state| state.send_everywhere(id));
    }

    fn refresh(&self, subject: &Arc<Subject>, _force: bool) {
        let id = subject.id();
        self.executor
            .submit("refresh", move |state| state.refresh(id));
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

impl RemoteListener for PlayerListObjective {
    fn on_remote_nickname_change(&self, remote: &Arc<RemoteSubject>, previous: &str) {
        let remote = remote.clone();
        let previous = previous.to_string();
        self.executor.submit("remote-nickname", move |state| {
            state.remote_rename(&remote, &previous)
        });
    }

    fn on_load_request(&self) {
        self.executor.submit("load-request", |state| {
            let ids: Vec<_> = state.players.keys().copied().collect();
            for id in ids {
                state.replicate(id);
            }
        });
    }
}

struct ScoreData {
    subject: Arc<Subject>,
    value: Property,
    fancy_value: Property,
    disabled: bool,
}

struct ObjectiveState {
    context: FeatureContext,
    config: PlayerListObjectiveConfig,
    disable: DisableChecker,
    objective: Objective,
    players: HashMap<SubjectId, ScoreData>,
    objectives: RegistrationLedger<String>,
}

impl ObjectiveState {
    fn join(&mut self, subject: Arc<Subject>) {
        let id = subject.id();
        if self.players.contains_key(&id) {
            return;
        }
        let expand = self.context.expander(&subject);
        let data = ScoreData {
            value: Property::new(self.config.value.clone(), &expand),
            fancy_value: Property::new(self.config.fancy_value.clone(), &expand),
            disabled: self.disable.is_disabled(&subject),
            subject: subject.clone(),
        };
        self.players.insert(id, data);
        self.load_viewer(id);
        let others: Vec<_> = self
            .players
            .values()
            .filter(|other| other.subject.id() != id)
            .map(|other| other.subject.clone())
            .collect();
        for viewer in others {
            self.send_score(id, &viewer);
        }
        self.replicate(id);
    }

    fn quit(&mut self, id: SubjectId) {
        if self.players.remove(&id).is_some() {
            self.objectives.forget_viewer(&id);
            for data in self.players.values_mut() {
                data.fancy_value.forget_viewer(&id);
            }
        }
    }

    fn refresh(&mut self, id: SubjectId) {
        let Some(data) = self.players.get_mut(&id) else {
            return;
        };
        if let Some(disabled) = self.disable.check(&data.subject, &mut data.disabled) {
            if disabled {
                self.unregister(id);
            } else {
                self.load_viewer(id);
            }
            return;
        }
        let expand = self.context.expander(&data.subject);
        let changed = data.value.update(&expand) | data.fancy_value.update(&expand);
        if changed {
            self.send_everywhere(id);
            self.replicate(id);
        }
    }

    /// Registers the objective for a viewer and sends every score it
    /// should hold
    fn load_viewer(&mut self, viewer_id: SubjectId) {
        let Some(viewer) = self.players.get(&viewer_id) else {
            return;
        };
        if viewer.disabled {
            return;
        }
        let viewer = viewer.subject.clone();
        let platform = &self.context.platform;
        let objective = &self.objective;
        if !self.objectives.contains(&viewer_id, &objective.name) {
            report(self.objectives.register(viewer_id, objective.name.clone(), || {
                platform.register_objective(&viewer, objective)
            }));
        }
        let holders: Vec<_> = self.players.keys().copied().collect();
        for holder in holders {
            self.send_score(holder, &viewer);
        }
        for remote in self.context.remotes.snapshot().iter() {
            if let Some(score) = remote.score() {
                self.context.platform.set_score(
                    &viewer,
                    OBJECTIVE_NAME,
                    &remote.nickname(),
                    score.value,
                    &score.fancy_value,
                );
            }
        }
    }

    fn unregister(&mut self, viewer_id: SubjectId) {
        let Some(viewer) = self.players.get(&viewer_id).map(|data| data.subject.clone()) else {
            return;
        };
        if !self.objectives.contains(&viewer_id, &self.objective.name) {
            return;
        }
        let platform = &self.context.platform;
        report(self.objectives.unregister(&viewer_id, &self.objective.name, || {
            platform.unregister_objective(&viewer, OBJECTIVE_NAME)
        }));
    }

    /// Sends the holder's score to every viewer
    fn send_everywhere(&mut self, holder: SubjectId) {
        let viewers: Vec<_> = self.players.values().map(|data| data.subject.clone()).collect();
        for viewer in viewers {
            self.send_score(holder, &viewer);
        }
    }

    fn send_score(&mut self, holder: SubjectId, viewer: &Subject) {
        if !self.objectives.contains(&viewer.id(), &self.objective.name) {
            return;
        }
        let Some(data) = self.players.get_mut(&holder) else {
            return;
        };
        let value = score_of(&self.config, data);
        let subject = data.subject.clone();
        let text = &self.context.text;
        let fancy = data
            .fancy_value
            .format_for(viewer.id(), |fancy| text.expand_relational(fancy, &subject, viewer))
            .to_string();
        self.context
            .platform
            .set_score(viewer, OBJECTIVE_NAME, &subject.nickname(), value, &fancy);
    }

    fn replicate(&self, id: SubjectId) {
        let Some(data) = self.players.get(&id) else {
            return;
        };
        let value = score_of(&self.config, data);
        self.context.send(&ScoreUpdateMessage {
            id,
            value,
            fancy_value: data.fancy_value.get().to_string(),
        });
    }

    fn remote_score(&mut self, remote: &RemoteSubject, message: ScoreUpdateMessage) {
        let score = RemoteScore {
            value: message.value,
            fancy_value: message.fancy_value,
        };
        remote.update(|state| state.score = Some(score.clone()));
        let holder = remote.nickname();
        for (viewer, _) in self.objectives.entries() {
            let Some(viewer) = self.players.get(&viewer) else {
                continue;
            };
            self.context.platform.set_score(
                &viewer.subject,
                OBJECTIVE_NAME,
                &holder,
                score.value,
                &score.fancy_value,
            );
        }
    }

    /// Moves a remote score from its old holder name to the new one
    fn remote_rename(&mut self, remote: &RemoteSubject, previous: &str) {
        let Some(score) = remote.score() else {
            return;
        };
        let holder = remote.nickname();
        for (viewer, _) in self.objectives.entries() {
            let Some(viewer) = self.players.get(&viewer) else {
                continue;
            };
            let platform = &self.context.platform;
            platform.remove_score(&viewer.subject, OBJECTIVE_NAME, previous);
            platform.set_score(
                &viewer.subject,
                OBJECTIVE_NAME,
                &holder,
                score.value,
                &score.fancy_value,
            );
        }
    }

    fn unload(&mut self) {
        for (viewer, objective) in self.objectives.entries() {
            if let Some(viewer) = self.players.get(&viewer) {
                self.context
                    .platform
                    .unregister_objective(&viewer.subject, &objective);
            }
        }
        self.objectives = RegistrationLedger::new("objective");
        self.players.clear();
    }
}

/// Current numeric score. Values that are not integers are rounded, or
/// replaced by 0 when they are not numbers at all.
fn score_of(config: &PlayerListObjectiveConfig, data: &ScoreData) -> i32 {
    let text = data.value.get();
    let score = parse_score(text);
    match score {
        ScoreValue::Integer(_) => {}
        ScoreValue::Rounded(value) => warn!(
            "Playerlist objective value \"{}\" of {} resolved to \"{text}\", which is not an \
             integer; using {value}",
            config.value,
            data.subject.name()
        ),
        ScoreValue::Invalid => warn!(
            "Playerlist objective value \"{}\" of {} resolved to \"{text}\", which is not a \
             number; using 0",
            config.value,
            data.subject.name()
        ),
    }
    score.value()
}

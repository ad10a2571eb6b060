use std::{collections::HashMap, fmt, sync::Arc};

use parking_lot::Mutex;

/// Server group and cluster definitions, in configuration order.
///
/// Patterns are exact names or single-sided wildcards (`lobby*`,
/// `*-event`), all compared case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct GroupDefinitions {
    /// Group name to the server patterns sharing a player list
    pub server_groups: Vec<(String, Vec<String>)>,
    /// Main server to the member patterns only the main server sees
    pub clusters: Vec<(String, Vec<String>)>,
    /// Servers whose occupants see everyone
    pub spy_servers: Vec<String>,
    /// Give every server matching no group a group of its own
    pub isolate_unlisted_servers: bool,
}

/// Identity of a server group.
///
/// Two tokens are equal only if they are the same allocation, so comparing
/// the groups of two subjects never touches the group name.
#[derive(Clone)]
pub struct GroupToken(Arc<str>);

impl GroupToken {
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl PartialEq for GroupToken {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for GroupToken {}

impl fmt::Debug for GroupToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GroupToken({}@{:p})", self.0, Arc::as_ptr(&self.0))
    }
}

/// Everything the visibility rules need to know about a server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMembership {
    pub group: GroupToken,
    pub cluster_main: Option<Arc<str>>,
    pub on_spy_server: bool,
}

#[derive(Default)]
struct GroupMemo {
    server_to_group: HashMap<String, GroupToken>,
    name_to_group: HashMap<String, GroupToken>,
    server_to_cluster: HashMap<String, Option<Arc<str>>>,
}

/// Memoizing resolver from server names to group membership
pub struct ServerGroups {
    definitions: GroupDefinitions,
    memo: Mutex<GroupMemo>,
}

pub const DEFAULT_SERVER_GROUP: &str = "DEFAULT";

impl ServerGroups {
    pub fn new(mut definitions: GroupDefinitions) -> Self {
        for spy in definitions.spy_servers.iter_mut() {
            *spy = spy.to_lowercase();
        }
        Self {
            definitions,
            memo: Mutex::new(GroupMemo::default()),
        }
    }

    /// Returns the group token of a server, computing it on first use
    pub fn group(&self, server: &str) -> GroupToken {
        let mut memo = self.memo.lock();
        if let Some(token) = memo.server_to_group.get(server) {
            return token.clone();
        }
        let name = self.compute_group_name(server);
        let token = memo
            .name_to_group
            .entry(name.clone())
            .or_insert_with(|| GroupToken(Arc::from(name.as_str())))
            .clone();
        memo.server_to_group
            .insert(server.to_string(), token.clone());
        token
    }

    /// Returns the main server of the cluster the server belongs to
    pub fn cluster_main(&self, server: &str) -> Option<Arc<str>> {
        let mut memo = self.memo.lock();
        if let Some(main) = memo.server_to_cluster.get(server) {
            return main.clone();
        }
        let main = self.compute_cluster_main(server);
        memo.server_to_cluster
            .insert(server.to_string(), main.clone());
        main
    }

    pub fn is_spy_server(&self, server: &str) -> bool {
        let server = server.to_lowercase();
        self.definitions.spy_servers.contains(&server)
    }

    pub fn membership(&self, server: &str) -> GroupMembership {
        GroupMembership {
            group: self.group(server),
            cluster_main: self.cluster_main(server),
            on_spy_server: self.is_spy_server(server),
        }
    }

    /// Server patterns of a configured group
    pub fn group_patterns(&self, group: &str) -> Option<&[String]> {
        self.definitions
            .server_groups
            .iter()
            .find(|(name, _)| name == group)
            .map(|(_, patterns)| patterns.as_slice())
    }

    fn compute_group_name(&self, server: &str) -> String {
        for (name, patterns) in &self.definitions.server_groups {
            if server_matches(server, patterns) {
                return name.clone();
            }
        }
        if self.definitions.isolate_unlisted_servers {
            format!("isolated:{server}")
        } else {
            DEFAULT_SERVER_GROUP.to_string()
        }
    }

    fn compute_cluster_main(&self, server: &str) -> Option<Arc<str>> {
        self.definitions
            .clusters
            .iter()
            .find(|(main, members)| main == server || server_matches(server, members))
            .map(|(main, _)| Arc::from(main.as_str()))
    }
}

/// Whether a server name matches any of the patterns
pub fn server_matches(server: &str, patterns: &[String]) -> bool {
    let server = server.to_lowercase();
    patterns.iter().any(|pattern| {
        let pattern = pattern.to_lowercase();
        if let Some(prefix) = pattern.strip_suffix('*') {
            if server.starts_with(prefix) {
                return true;
            }
        }
        if let Some(suffix) = pattern.strip_prefix('*') {
            if server.ends_with(suffix) {
                return true;
            }
        }
        server == pattern
    })
}

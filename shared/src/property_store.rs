use std::collections::HashMap;

use parking_lot::RwLock;

/// Group every subject falls back to
pub const DEFAULT_GROUP: &str = "_DEFAULT_";

#[derive(Debug, Default, Clone)]
struct PropertyTable {
    global: HashMap<String, String>,
    per_server: HashMap<String, HashMap<String, String>>,
    per_world: HashMap<String, HashMap<String, String>>,
}

impl PropertyTable {
    fn get(&self, key: &str, server: &str, world: &str) -> Option<&String> {
        self.per_world
            .get(world)
            .and_then(|values| values.get(key))
            .or_else(|| self.per_server.get(server).and_then(|values| values.get(key)))
            .or_else(|| self.global.get(key))
    }

    fn scope_mut(&mut self, server: Option<&str>, world: Option<&str>) -> &mut HashMap<String, String> {
        match (world, server) {
            (Some(world), _) => self.per_world.entry(world.to_string()).or_default(),
            (None, Some(server)) => self.per_server.entry(server.to_string()).or_default(),
            (None, None) => &mut self.global,
        }
    }

    fn entries(&self) -> Vec<(String, String)> {
        let mut entries: Vec<(String, String)> = self
            .global
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        entries.sort();
        entries
    }
}

/// What a property is being looked up for
#[derive(Debug, Clone, Copy)]
pub struct PropertyLookup<'a> {
    pub name: &'a str,
    pub id: &'a str,
    pub group: &'a str,
    pub server: &'a str,
    pub world: &'a str,
}

/// Group and user property tables edited through the command surface.
///
/// Lookups check the user by name, then by id, then the subject's group and
/// finally the default group; inside each table a per-world value beats a
/// per-server value which beats the global one.
#[derive(Debug, Default)]
pub struct PropertyStore {
    groups: RwLock<HashMap<String, PropertyTable>>,
    users: RwLock<HashMap<String, PropertyTable>>,
}

impl PropertyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn property(&self, lookup: &PropertyLookup<'_>, key: &str) -> Option<String> {
        {
            let users = self.users.read();
            for user in [lookup.name, lookup.id] {
                if let Some(value) = users
                    .get(user)
                    .and_then(|table| table.get(key, lookup.server, lookup.world))
                {
                    return Some(value.clone());
                }
            }
        }
        let groups = self.groups.read();
        for group in [lookup.group, DEFAULT_GROUP] {
            if let Some(value) = groups
                .get(group)
                .and_then(|table| table.get(key, lookup.server, lookup.world))
            {
                return Some(value.clone());
            }
        }
        None
    }

    pub fn group_property(
        &self,
        group: &str,
        key: &str,
        server: Option<&str>,
        world: Option<&str>,
    ) -> Option<String> {
        let groups = self.groups.read();
        let table = groups.get(group)?;
        Self::scoped(table, key, server, world)
    }

    /// Sets or, with `None`, removes a group value. Returns true if the
    /// stored value changed.
    pub fn set_group_property(
        &self,
        group: &str,
        key: &str,
        value: Option<&str>,
        server: Option<&str>,
        world: Option<&str>,
    ) -> bool {
        let mut groups = self.groups.write();
        let table = groups.entry(group.to_string()).or_default();
        Self::set_scoped(table, key, value, server, world)
    }

    /// Removes every value of a group. Returns true if the group existed.
    pub fn remove_group(&self, group: &str) -> bool {
        self.groups.write().remove(group).is_some()
    }

    pub fn group_entries(&self, group: &str) -> Vec<(String, String)> {
        self.groups
            .read()
            .get(group)
            .map(PropertyTable::entries)
            .unwrap_or_default()
    }

    pub fn set_user_property(
        &self,
        user: &str,
        key: &str,
        value: Option<&str>,
        server: Option<&str>,
        world: Option<&str>,
    ) -> bool {
        let mut users = self.users.write();
        let table = users.entry(user.to_string()).or_default();
        Self::set_scoped(table, key, value, server, world)
    }

    pub fn remove_user(&self, user: &str) -> bool {
        self.users.write().remove(user).is_some()
    }

    fn scoped(
        table: &PropertyTable,
        key: &str,
        server: Option<&str>,
        world: Option<&str>,
    ) -> Option<String> {
        let values = match (world, server) {
            (Some(world), _) => table.per_world.get(world)?,
            (None, Some(server)) => table.per_server.get(server)?,
            (None, None) => &table.global,
        };
        values.get(key).cloned()
    }

    fn set_scoped(
        table: &mut PropertyTable,
        key: &str,
        value: Option<&str>,
        server: Option<&str>,
        world: Option<&str>,
    ) -> bool {
        let values = table.scope_mut(server, world);
        match value {
            Some(value) => values.insert(key.to_string(), value.to_string()).as_deref() != Some(value),
            None => values.remove(key).is_some(),
        }
    }
}

//! The secret tree: groups containing entries and further groups.
//!
//! Every node carries lifecycle timestamps and an optional soft-delete
//! timestamp. Mutations go through typed setters which validate, refresh
//! `updated`, apply cascades and notify the tree's listener exactly once.
//!
//! The tree serializes to its portable form, the plaintext that the vault
//! encrypts: listener excluded, timestamps as text, keys in a fixed order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::listener::{notify, ListenerRef};
use crate::timestamp;
use coffer_common::{Error, GroupPath, NonEmptyText, Result};

/// A leaf secret.
#[derive(Debug, Clone, Serialize)]
pub struct Entry {
    label: NonEmptyText,
    content: NonEmptyText,
    secret: bool,
    #[serde(serialize_with = "timestamp::serialize")]
    created: DateTime<Utc>,
    #[serde(serialize_with = "timestamp::serialize")]
    updated: DateTime<Utc>,
    #[serde(serialize_with = "timestamp::option::serialize")]
    deleted: Option<DateTime<Utc>>,
    #[serde(skip)]
    listener: Option<ListenerRef>,
}

impl Entry {
    /// Create a new active entry.
    ///
    /// # Errors
    /// - Validation error if `label` or `content` is empty
    pub fn new(label: impl Into<String>, content: impl Into<String>, secret: bool) -> Result<Self> {
        let now = timestamp::now();
        Ok(Self {
            label: NonEmptyText::new(label)?,
            content: NonEmptyText::new(content)?,
            secret,
            created: now,
            updated: now,
            deleted: None,
            listener: None,
        })
    }

    pub fn label(&self) -> &str {
        self.label.as_str()
    }

    pub fn content(&self) -> &str {
        self.content.as_str()
    }

    /// Whether the content is sensitive and should be masked on display.
    pub fn secret(&self) -> bool {
        self.secret
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn updated(&self) -> DateTime<Utc> {
        self.updated
    }

    pub fn deleted(&self) -> Option<DateTime<Utc>> {
        self.deleted
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted.is_some()
    }

    pub fn listener(&self) -> Option<&ListenerRef> {
        self.listener.as_ref()
    }

    pub fn set_label(&mut self, label: impl Into<String>) -> Result<()> {
        self.label = NonEmptyText::new(label)?;
        self.touch();
        Ok(())
    }

    pub fn set_content(&mut self, content: impl Into<String>) -> Result<()> {
        self.content = NonEmptyText::new(content)?;
        self.touch();
        Ok(())
    }

    pub fn set_secret(&mut self, secret: bool) {
        self.secret = secret;
        self.touch();
    }

    /// Set or clear the soft-delete timestamp.
    pub fn set_deleted(&mut self, deleted: Option<DateTime<Utc>>) {
        self.deleted = deleted;
        self.touch();
    }

    /// Soft-delete as of now.
    pub fn mark_deleted(&mut self) {
        self.set_deleted(Some(timestamp::now()));
    }

    /// Undo a soft delete.
    pub fn restore(&mut self) {
        self.set_deleted(None);
    }

    /// Replace the listener. Does not touch `updated` and does not notify.
    pub fn set_listener(&mut self, listener: Option<ListenerRef>) {
        self.listener = listener;
    }

    /// Sort key: `deleted:type:secret:label`, entries being type 0.
    pub fn sort_key(&self) -> String {
        sort_key(self.is_deleted(), false, self.secret, self.label())
    }

    fn touch(&mut self) {
        self.updated = timestamp::now();
        notify(self.listener.as_ref());
    }
}

/// A container node holding an ordered list of entries and subgroups.
#[derive(Debug, Clone, Serialize)]
pub struct Group {
    label: NonEmptyText,
    description: Option<NonEmptyText>,
    #[serde(serialize_with = "timestamp::serialize")]
    created: DateTime<Utc>,
    #[serde(serialize_with = "timestamp::serialize")]
    updated: DateTime<Utc>,
    #[serde(serialize_with = "timestamp::option::serialize")]
    deleted: Option<DateTime<Utc>>,
    #[serde(skip)]
    listener: Option<ListenerRef>,
    pub(crate) entries: Vec<Node>,
}

impl Group {
    /// Create a new, empty, active group.
    ///
    /// # Errors
    /// - Validation error if `label` is empty or `description` is `Some("")`
    pub fn new(label: impl Into<String>, description: Option<String>) -> Result<Self> {
        Self::with_entries(label, description, Vec::new())
    }

    /// Create a group that takes ownership of `entries`.
    ///
    /// The group has no listener yet; `set_listener` hands one to the whole
    /// subtree.
    pub fn with_entries(
        label: impl Into<String>,
        description: Option<String>,
        entries: Vec<Node>,
    ) -> Result<Self> {
        let now = timestamp::now();
        Ok(Self {
            label: NonEmptyText::new(label)?,
            description: description.map(NonEmptyText::new).transpose()?,
            created: now,
            updated: now,
            deleted: None,
            listener: None,
            entries,
        })
    }

    pub fn label(&self) -> &str {
        self.label.as_str()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_ref().map(NonEmptyText::as_str)
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn updated(&self) -> DateTime<Utc> {
        self.updated
    }

    pub fn deleted(&self) -> Option<DateTime<Utc>> {
        self.deleted
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted.is_some()
    }

    pub fn listener(&self) -> Option<&ListenerRef> {
        self.listener.as_ref()
    }

    /// Direct children in display order.
    pub fn entries(&self) -> &[Node] {
        &self.entries
    }

    /// Direct children, mutable in place. Outside the crate children are
    /// reached through `child_*_mut` and `find_*_mut`, which cannot replace a
    /// node behind the listener's back.
    pub(crate) fn entries_mut(&mut self) -> &mut [Node] {
        &mut self.entries
    }

    pub fn set_label(&mut self, label: impl Into<String>) -> Result<()> {
        self.label = NonEmptyText::new(label)?;
        self.touch();
        Ok(())
    }

    pub fn set_description(&mut self, description: Option<String>) -> Result<()> {
        self.description = description.map(NonEmptyText::new).transpose()?;
        self.touch();
        Ok(())
    }

    /// Set or clear the soft-delete timestamp of this group and overwrite
    /// it on every descendant.
    ///
    /// Descendants keep their own `updated`; only this group is touched and
    /// the listener hears about it once.
    pub fn set_deleted(&mut self, deleted: Option<DateTime<Utc>>) {
        self.deleted = deleted;
        self.updated = timestamp::now();
        overwrite_deleted(&mut self.entries, deleted);
        notify(self.listener.as_ref());
    }

    /// Soft-delete this group and its subtree as of now.
    pub fn mark_deleted(&mut self) {
        self.set_deleted(Some(timestamp::now()));
    }

    /// Undo a soft delete on this group and its subtree.
    pub fn restore(&mut self) {
        self.set_deleted(None);
    }

    /// Replace the listener of this group and every descendant.
    ///
    /// Does not touch `updated` and does not notify.
    pub fn set_listener(&mut self, listener: Option<ListenerRef>) {
        overwrite_listener(&mut self.entries, &listener);
        self.listener = listener;
    }

    /// Append a new empty subgroup and notify the listener.
    ///
    /// The new group inherits this group's listener. This group's `updated`
    /// is left alone.
    pub fn add_group(
        &mut self,
        label: impl Into<String>,
        description: Option<String>,
    ) -> Result<&mut Group> {
        let group = Group::new(label, description)?;
        self.adopt(Node::Group(group))
            .and_then(Node::as_group_mut)
            .ok_or_else(|| Error::NotFound("Added group is missing".to_string()))
    }

    /// Append a new entry and notify the listener.
    ///
    /// The new entry inherits this group's listener. This group's `updated`
    /// is left alone.
    pub fn add_entry(
        &mut self,
        label: impl Into<String>,
        content: impl Into<String>,
        secret: bool,
    ) -> Result<&mut Entry> {
        let entry = Entry::new(label, content, secret)?;
        self.adopt(Node::Entry(entry))
            .and_then(Node::as_entry_mut)
            .ok_or_else(|| Error::NotFound("Added entry is missing".to_string()))
    }

    fn adopt(&mut self, mut node: Node) -> Option<&mut Node> {
        node.set_listener(self.listener.clone());
        self.entries.push(node);
        notify(self.listener.as_ref());
        self.entries.last_mut()
    }

    /// Sort key: `deleted:type:secret:label`, groups being type 1.
    pub fn sort_key(&self) -> String {
        sort_key(self.is_deleted(), true, false, self.label())
    }

    /// Sort direct children by their sort key, then every subgroup.
    ///
    /// The sort is stable and does not notify.
    pub fn sort_entries(&mut self) {
        self.entries.sort_by_cached_key(Node::sort_key);
        for node in &mut self.entries {
            if let Node::Group(group) = node {
                group.sort_entries();
            }
        }
    }

    /// Find a direct child group by label. An active group wins over a
    /// deleted one with the same label.
    pub fn child_group(&self, label: &str) -> Option<&Group> {
        let index = find_child(&self.entries, label, true)?;
        self.entries[index].as_group()
    }

    /// Find a direct child entry by label. An active entry wins over a
    /// deleted one with the same label.
    pub fn child_entry(&self, label: &str) -> Option<&Entry> {
        let index = find_child(&self.entries, label, false)?;
        self.entries[index].as_entry()
    }

    /// Find a direct child group by label, mutably.
    pub fn child_group_mut(&mut self, label: &str) -> Option<&mut Group> {
        let index = find_child(&self.entries, label, true)?;
        self.entries[index].as_group_mut()
    }

    /// Find a direct child entry by label, mutably.
    pub fn child_entry_mut(&mut self, label: &str) -> Option<&mut Entry> {
        let index = find_child(&self.entries, label, false)?;
        self.entries[index].as_entry_mut()
    }

    /// Navigate to a descendant group by label path.
    pub fn find_group(&self, path: &GroupPath) -> Result<&Group> {
        let mut current = self;
        for component in path.components() {
            current = current
                .child_group(component)
                .ok_or_else(|| Error::NotFound(format!("Group not found: {}", path)))?;
        }
        Ok(current)
    }

    /// Navigate to a descendant group by label path, mutably.
    pub fn find_group_mut(&mut self, path: &GroupPath) -> Result<&mut Group> {
        let mut current = self;
        for component in path.components() {
            current = current
                .child_group_mut(component)
                .ok_or_else(|| Error::NotFound(format!("Group not found: {}", path)))?;
        }
        Ok(current)
    }

    /// Find the entry `label` inside the group at `path`.
    pub fn find_entry(&self, path: &GroupPath, label: &str) -> Result<&Entry> {
        self.find_group(path)?
            .child_entry(label)
            .ok_or_else(|| Error::NotFound(format!("Entry not found: {}/{}", path, label)))
    }

    /// Find the entry `label` inside the group at `path`, mutably.
    pub fn find_entry_mut(&mut self, path: &GroupPath, label: &str) -> Result<&mut Entry> {
        self.find_group_mut(path)?
            .child_entry_mut(label)
            .ok_or_else(|| Error::NotFound(format!("Entry not found: {}/{}", path, label)))
    }

    /// Serialize to the portable form.
    pub fn to_portable_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Parse the portable form.
    ///
    /// Missing `created`/`updated` are filled with the current time. The
    /// result has no listener.
    ///
    /// # Errors
    /// - `Error::Format` on malformed JSON, unknown keys, or empty labels,
    ///   contents or descriptions
    pub fn from_portable_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| Error::Format(e.to_string()))
    }

    fn touch(&mut self) {
        self.updated = timestamp::now();
        notify(self.listener.as_ref());
    }
}

/// A child of a group.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Node {
    Group(Group),
    Entry(Entry),
}

impl Node {
    pub fn label(&self) -> &str {
        match self {
            Node::Group(group) => group.label(),
            Node::Entry(entry) => entry.label(),
        }
    }

    pub fn created(&self) -> DateTime<Utc> {
        match self {
            Node::Group(group) => group.created(),
            Node::Entry(entry) => entry.created(),
        }
    }

    pub fn updated(&self) -> DateTime<Utc> {
        match self {
            Node::Group(group) => group.updated(),
            Node::Entry(entry) => entry.updated(),
        }
    }

    pub fn deleted(&self) -> Option<DateTime<Utc>> {
        match self {
            Node::Group(group) => group.deleted(),
            Node::Entry(entry) => entry.deleted(),
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted().is_some()
    }

    pub fn listener(&self) -> Option<&ListenerRef> {
        match self {
            Node::Group(group) => group.listener(),
            Node::Entry(entry) => entry.listener(),
        }
    }

    pub fn set_label(&mut self, label: impl Into<String>) -> Result<()> {
        match self {
            Node::Group(group) => group.set_label(label),
            Node::Entry(entry) => entry.set_label(label),
        }
    }

    pub fn set_deleted(&mut self, deleted: Option<DateTime<Utc>>) {
        match self {
            Node::Group(group) => group.set_deleted(deleted),
            Node::Entry(entry) => entry.set_deleted(deleted),
        }
    }

    pub fn set_listener(&mut self, listener: Option<ListenerRef>) {
        match self {
            Node::Group(group) => group.set_listener(listener),
            Node::Entry(entry) => entry.set_listener(listener),
        }
    }

    pub fn sort_key(&self) -> String {
        match self {
            Node::Group(group) => group.sort_key(),
            Node::Entry(entry) => entry.sort_key(),
        }
    }

    pub fn as_group(&self) -> Option<&Group> {
        match self {
            Node::Group(group) => Some(group),
            Node::Entry(_) => None,
        }
    }

    pub fn as_entry(&self) -> Option<&Entry> {
        match self {
            Node::Entry(entry) => Some(entry),
            Node::Group(_) => None,
        }
    }

    pub fn as_group_mut(&mut self) -> Option<&mut Group> {
        match self {
            Node::Group(group) => Some(group),
            Node::Entry(_) => None,
        }
    }

    pub fn as_entry_mut(&mut self) -> Option<&mut Entry> {
        match self {
            Node::Entry(entry) => Some(entry),
            Node::Group(_) => None,
        }
    }
}

impl From<Group> for Node {
    fn from(group: Group) -> Self {
        Node::Group(group)
    }
}

impl From<Entry> for Node {
    fn from(entry: Entry) -> Self {
        Node::Entry(entry)
    }
}

fn sort_key(deleted: bool, is_group: bool, secret: bool, label: &str) -> String {
    format!(
        "{}:{}:{}:{}",
        u8::from(deleted),
        u8::from(is_group),
        u8::from(secret),
        label
    )
}

/// Index of the first child of the wanted kind labelled `label`, preferring
/// active children.
fn find_child(entries: &[Node], label: &str, group: bool) -> Option<usize> {
    let candidates = move || {
        entries
            .iter()
            .enumerate()
            .filter(move |(_, node)| matches!(node, Node::Group(_)) == group && node.label() == label)
    };
    candidates()
        .find(|(_, node)| !node.is_deleted())
        .or_else(|| candidates().next())
        .map(|(index, _)| index)
}

fn overwrite_deleted(entries: &mut [Node], deleted: Option<DateTime<Utc>>) {
    for node in entries {
        match node {
            Node::Entry(entry) => entry.deleted = deleted,
            Node::Group(group) => {
                group.deleted = deleted;
                overwrite_deleted(&mut group.entries, deleted);
            }
        }
    }
}

fn overwrite_listener(entries: &mut [Node], listener: &Option<ListenerRef>) {
    for node in entries {
        match node {
            Node::Entry(entry) => entry.listener = listener.clone(),
            Node::Group(group) => {
                group.listener = listener.clone();
                overwrite_listener(&mut group.entries, listener);
            }
        }
    }
}

// Parsing goes through records so that missing timestamps get defaults and
// unknown keys are rejected. A JSON object with `entries` is a group.

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct EntryRecord {
    label: NonEmptyText,
    content: NonEmptyText,
    secret: bool,
    #[serde(default, with = "timestamp::option")]
    created: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::option")]
    updated: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::option")]
    deleted: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct GroupRecord {
    label: NonEmptyText,
    #[serde(default)]
    description: Option<NonEmptyText>,
    #[serde(default, with = "timestamp::option")]
    created: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::option")]
    updated: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::option")]
    deleted: Option<DateTime<Utc>>,
    entries: Vec<NodeRecord>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NodeRecord {
    Group(GroupRecord),
    Entry(EntryRecord),
}

impl From<EntryRecord> for Entry {
    fn from(record: EntryRecord) -> Self {
        let now = timestamp::now();
        Self {
            label: record.label,
            content: record.content,
            secret: record.secret,
            created: record.created.unwrap_or(now),
            updated: record.updated.unwrap_or(now),
            deleted: record.deleted,
            listener: None,
        }
    }
}

impl From<GroupRecord> for Group {
    fn from(record: GroupRecord) -> Self {
        let now = timestamp::now();
        Self {
            label: record.label,
            description: record.description,
            created: record.created.unwrap_or(now),
            updated: record.updated.unwrap_or(now),
            deleted: record.deleted,
            listener: None,
            entries: record.entries.into_iter().map(Node::from).collect(),
        }
    }
}

impl From<NodeRecord> for Node {
    fn from(record: NodeRecord) -> Self {
        match record {
            NodeRecord::Group(group) => Node::Group(group.into()),
            NodeRecord::Entry(entry) => Node::Entry(entry.into()),
        }
    }
}

impl<'de> Deserialize<'de> for Entry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        EntryRecord::deserialize(deserializer).map(Entry::from)
    }
}

impl<'de> Deserialize<'de> for Group {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        GroupRecord::deserialize(deserializer).map(Group::from)
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        NodeRecord::deserialize(deserializer).map(Node::from)
    }
}

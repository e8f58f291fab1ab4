//! Contact identity registry
//!
//! Maps raw jids to contacts and resolves which jid several raw identifiers
//! should be aggregated under.
//!
//! ## Grouping by display name
//!
//! A person often shows up under more than one jid (a new number, a second
//! device, a chat export with a synthetic jid). When grouping is enabled the
//! engine aggregates every user contact that shares a display name under a
//! single canonical jid: the contact most recently added to that name.
//!
//! Two unrelated people saved under the exact same display name are merged
//! too. Nothing else disambiguates them, so callers that care must give
//! their contacts distinct names.
//!
//! ## Reconciliation
//!
//! [`ContactRegistry::merge_from`] fills names and profile images from a
//! second source (an address book export, the chat database's own contact
//! table). Matching is by exact jid first, then optionally by string
//! similarity of jids or display names.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::error::{Error, Result};
use crate::types::{Jid, JidKind};

/// Minimum [`similarity`] for two jids or names to be considered the same.
pub const SIMILARITY_THRESHOLD: f64 = 0.95;

/// A chat participant or group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub jid: Jid,
    pub display_name: Option<String>,
    /// Opaque image reference (base64 blob or path)
    pub profile_image: Option<String>,
}

impl Contact {
    fn new(jid: Jid, display_name: Option<String>) -> Self {
        Self {
            jid,
            display_name,
            profile_image: None,
        }
    }

    pub fn is_user(&self) -> bool {
        self.jid.is_user()
    }

    pub fn is_group(&self) -> bool {
        self.jid.is_group()
    }

    pub fn phone_number(&self) -> &str {
        self.jid.user_part()
    }

    /// Name to show for this contact: the display name, or `+number`.
    pub fn label(&self) -> String {
        match &self.display_name {
            Some(name) => name.clone(),
            None => format!("+{}", self.phone_number()),
        }
    }
}

/// One `(jid, display_name, profile_image)` triple from an identity source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactEntry {
    pub jid: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub profile_image: Option<String>,
}

/// When a merge may replace a value the registry already holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverwritePolicy {
    /// Always take the other source's value
    #[default]
    Always,
    /// Never replace an existing contact's value
    Never,
    /// Only fill the value when the contact has none
    IfEmpty,
}

impl OverwritePolicy {
    fn allows(&self, has_value: bool) -> bool {
        match self {
            OverwritePolicy::Always => true,
            OverwritePolicy::Never => false,
            OverwritePolicy::IfEmpty => !has_value,
        }
    }
}

/// Options for [`ContactRegistry::merge_from`].
#[derive(Debug, Clone, Deserialize)]
pub struct MergeOptions {
    /// Match contacts whose jids are nearly identical
    #[serde(default = "default_true")]
    pub by_jid_similarity: bool,
    /// Match contacts whose display names are nearly identical
    #[serde(default)]
    pub by_display_name_similarity: bool,
    #[serde(default)]
    pub overwrite_display_name: OverwritePolicy,
    #[serde(default)]
    pub overwrite_profile_image: OverwritePolicy,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            by_jid_similarity: true,
            by_display_name_similarity: false,
            overwrite_display_name: OverwritePolicy::Always,
            overwrite_profile_image: OverwritePolicy::Always,
        }
    }
}

fn default_true() -> bool {
    true
}

/// What a merge changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// Contacts that were not in the registry before
    pub added: usize,
    /// Display names replaced or filled
    pub renamed: usize,
    /// Profile images replaced or filled
    pub images_updated: usize,
}

/// Registry of contacts keyed by jid, with a display-name index.
#[derive(Debug, Clone, Default)]
pub struct ContactRegistry {
    users: BTreeMap<Jid, Contact>,
    groups: BTreeMap<Jid, Contact>,
    /// Display name -> user jids, oldest first
    display_names: HashMap<String, Vec<Jid>>,
}

impl ContactRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from an identity source.
    ///
    /// Entries with malformed jids are skipped, as data sources routinely
    /// contain rows for things that are not chats.
    pub fn from_entries(entries: impl IntoIterator<Item = ContactEntry>) -> Self {
        let mut registry = Self::new();
        let mut skipped = 0usize;

        for entry in entries {
            let jid = Jid::from(entry.jid);
            match registry.add_contact(jid.clone(), entry.display_name) {
                Ok(_) => {
                    if entry.profile_image.is_some() {
                        registry.set_profile_image(jid.as_str(), entry.profile_image);
                    }
                }
                Err(e) => {
                    tracing::debug!(jid = %jid, error = %e, "Skipping contact entry");
                    skipped += 1;
                }
            }
        }

        if skipped > 0 {
            tracing::debug!(skipped, "Skipped malformed contact entries");
        }
        registry
    }

    /// Add a contact, replacing any contact already registered under `jid`.
    ///
    /// Fails with [`Error::Identity`] when the jid is neither a user nor a
    /// group.
    pub fn add_contact(
        &mut self,
        jid: impl Into<Jid>,
        display_name: Option<String>,
    ) -> Result<&Contact> {
        let jid = jid.into();
        match jid.kind()? {
            JidKind::User => {
                if let Some(previous) = self.users.remove(&jid) {
                    Self::unindex(
                        &mut self.display_names,
                        &jid,
                        previous.display_name.as_deref(),
                    );
                }
                Self::index(&mut self.display_names, &jid, display_name.as_deref());
                self.users
                    .insert(jid.clone(), Contact::new(jid.clone(), display_name));
                Ok(&self.users[&jid])
            }
            JidKind::Group => {
                self.groups
                    .insert(jid.clone(), Contact::new(jid.clone(), display_name));
                Ok(&self.groups[&jid])
            }
            JidKind::Broadcast => Err(Error::Identity(format!(
                "jid {:?} is neither a user nor a group",
                jid.as_str()
            ))),
        }
    }

    /// Look up a contact. Unknown or malformed jids yield `None`.
    pub fn get(&self, jid: &str) -> Option<&Contact> {
        self.users.get(jid).or_else(|| self.groups.get(jid))
    }

    /// Mutable access to a contact. Rename through
    /// [`ContactRegistry::update_display_name`] instead, which keeps the name
    /// index in step.
    pub fn get_mut(&mut self, jid: &str) -> Option<&mut Contact> {
        match self.users.get_mut(jid) {
            Some(contact) => Some(contact),
            None => self.groups.get_mut(jid),
        }
    }

    pub fn contains(&self, jid: &str) -> bool {
        self.get(jid).is_some()
    }

    /// Change a contact's display name and move it in the name index.
    ///
    /// Returns `false` when the jid is not registered.
    pub fn update_display_name(&mut self, jid: &str, display_name: Option<String>) -> bool {
        if let Some(contact) = self.users.get_mut(jid) {
            let previous = std::mem::replace(&mut contact.display_name, display_name);
            Self::unindex(&mut self.display_names, &contact.jid, previous.as_deref());
            Self::index(
                &mut self.display_names,
                &contact.jid,
                contact.display_name.as_deref(),
            );
            true
        } else if let Some(group) = self.groups.get_mut(jid) {
            group.display_name = display_name;
            true
        } else {
            false
        }
    }

    /// Returns `false` when the jid is not registered.
    pub fn set_profile_image(&mut self, jid: &str, profile_image: Option<String>) -> bool {
        match self.get_mut(jid) {
            Some(contact) => {
                contact.profile_image = profile_image;
                true
            }
            None => false,
        }
    }

    /// User contacts indexed under exactly `display_name`, most recently
    /// added last.
    pub fn contacts_sharing_display_name(&self, display_name: &str) -> Vec<&Contact> {
        self.display_names
            .get(display_name)
            .map(|jids| jids.iter().filter_map(|jid| self.users.get(jid)).collect())
            .unwrap_or_default()
    }

    /// The jid contacts named `display_name` are aggregated under.
    pub fn canonical_for_name(&self, display_name: &str) -> Option<&Jid> {
        self.display_names
            .get(display_name)
            .and_then(|jids| jids.last())
    }

    pub fn users(&self) -> impl Iterator<Item = &Contact> {
        self.users.values()
    }

    pub fn groups(&self) -> impl Iterator<Item = &Contact> {
        self.groups.values()
    }

    /// Users first, then groups, each in jid order.
    pub fn iter(&self) -> impl Iterator<Item = &Contact> {
        self.users.values().chain(self.groups.values())
    }

    pub fn len(&self) -> usize {
        self.users.len() + self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Update names and profile images from another identity source.
    ///
    /// Contacts missing from this registry are added. Existing contacts
    /// matched by exact jid, and (when enabled) by jid or display name
    /// similarity, get the other source's values according to the
    /// overwrite policies. A missing value in `other` never erases one here.
    ///
    /// The similarity pass compares every pair of contacts, which is fine
    /// for address books of a few thousand entries.
    pub fn merge_from(
        &mut self,
        other: &ContactRegistry,
        options: &MergeOptions,
    ) -> Result<MergeSummary> {
        let mut summary = MergeSummary::default();

        for other_contact in other.iter() {
            if self.contains(other_contact.jid.as_str()) {
                self.apply_from(&other_contact.jid, other_contact, options, &mut summary);
            } else {
                self.add_contact(other_contact.jid.clone(), other_contact.display_name.clone())?;
                summary.added += 1;
                if other_contact.profile_image.is_some()
                    && options.overwrite_profile_image.allows(false)
                {
                    self.set_profile_image(
                        other_contact.jid.as_str(),
                        other_contact.profile_image.clone(),
                    );
                    summary.images_updated += 1;
                }
            }
        }

        if options.by_jid_similarity || options.by_display_name_similarity {
            let jids: Vec<Jid> = self.iter().map(|c| c.jid.clone()).collect();
            for jid in &jids {
                for other_contact in other.iter() {
                    let Some(contact) = self.get(jid.as_str()) else {
                        continue;
                    };

                    let similar_jid = options.by_jid_similarity
                        && similarity(jid.as_str(), other_contact.jid.as_str())
                            >= SIMILARITY_THRESHOLD;
                    let similar_name = options.by_display_name_similarity
                        && match (&contact.display_name, &other_contact.display_name) {
                            (Some(a), Some(b)) => similarity(a, b) >= SIMILARITY_THRESHOLD,
                            _ => false,
                        };

                    if similar_jid || similar_name {
                        self.apply_from(jid, other_contact, options, &mut summary);
                    }
                }
            }
        }

        tracing::debug!(
            added = summary.added,
            renamed = summary.renamed,
            images_updated = summary.images_updated,
            "Merged contact source"
        );
        Ok(summary)
    }

    fn apply_from(
        &mut self,
        jid: &Jid,
        source: &Contact,
        options: &MergeOptions,
        summary: &mut MergeSummary,
    ) {
        let Some(current) = self.get(jid.as_str()) else {
            return;
        };
        let rename = source.display_name.is_some()
            && current.display_name != source.display_name
            && options
                .overwrite_display_name
                .allows(current.display_name.is_some());
        let reimage = source.profile_image.is_some()
            && current.profile_image != source.profile_image
            && options
                .overwrite_profile_image
                .allows(current.profile_image.is_some());

        if rename {
            self.update_display_name(jid.as_str(), source.display_name.clone());
            summary.renamed += 1;
        }
        if reimage {
            self.set_profile_image(jid.as_str(), source.profile_image.clone());
            summary.images_updated += 1;
        }
    }

    fn index(index: &mut HashMap<String, Vec<Jid>>, jid: &Jid, display_name: Option<&str>) {
        if let Some(name) = display_name {
            index.entry(name.to_string()).or_default().push(jid.clone());
        }
    }

    fn unindex(index: &mut HashMap<String, Vec<Jid>>, jid: &Jid, display_name: Option<&str>) {
        if let Some(name) = display_name {
            if let Some(bucket) = index.get_mut(name) {
                bucket.retain(|j| j != jid);
                if bucket.is_empty() {
                    index.remove(name);
                }
            }
        }
    }
}

/// Jid to aggregate `jid`'s events under when grouping by display name.
///
/// Contacts with a display name resolve to the most recently added contact
/// sharing that name; everything else resolves to itself.
pub fn resolve_identity(jid: &Jid, registry: &ContactRegistry) -> Jid {
    registry
        .get(jid.as_str())
        .and_then(|contact| contact.display_name.as_deref())
        .and_then(|name| registry.canonical_for_name(name))
        .cloned()
        .unwrap_or_else(|| jid.clone())
}

/// Symmetric edit-distance ratio between two strings, in `[0, 1]`.
///
/// Computed as `(len(a) + len(b) - d) / (len(a) + len(b))` where `d` is the
/// Levenshtein distance with substitutions costing 2 (an insertion plus a
/// deletion).
pub fn similarity(a: &str, b: &str) -> f64 {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let total = a_chars.len() + b_chars.len();
    if total == 0 {
        return 1.0;
    }
    let distance = indel_distance(&a_chars, &b_chars);
    (total - distance) as f64 / total as f64
}

fn indel_distance(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    // Two rows instead of the full matrix
    let mut prev_row: Vec<usize> = (0..=b.len()).collect();
    let mut curr_row: Vec<usize> = vec![0; b.len() + 1];

    for (i, a_char) in a.iter().enumerate() {
        curr_row[0] = i + 1;
        for (j, b_char) in b.iter().enumerate() {
            let substitution = if a_char == b_char { 0 } else { 2 };
            curr_row[j + 1] = (prev_row[j + 1] + 1)
                .min(curr_row[j] + 1)
                .min(prev_row[j] + substitution);
        }
        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[b.len()]
}

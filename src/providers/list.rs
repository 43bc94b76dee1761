// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! View-list building: sort indexes, group buckets and de-duplication.

use std::collections::HashMap;

/// A backend payload with its position in a view list.
///
/// Two items are equal when their payloads are equal; the sort index and
/// group key do not take part.
#[derive(Debug, Clone)]
pub struct ListViewItem<T> {
    pub payload: T,
    pub sort_index: usize,
    pub group_key: Option<String>,
}

impl<T: PartialEq> PartialEq for ListViewItem<T> {
    fn eq(&self, other: &Self) -> bool {
        self.payload == other.payload
    }
}

/// A named bucket of items. Lives for one build.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupListViewItem<T> {
    pub group_key: String,
    /// Index of the first member.
    pub sort_index: usize,
    pub items: Vec<ListViewItem<T>>,
}

/// One entry of a built list.
#[derive(Debug, Clone, PartialEq)]
pub enum ListItem<T> {
    Single(ListViewItem<T>),
    Group(GroupListViewItem<T>),
}

impl<T> ListItem<T> {
    pub fn sort_index(&self) -> usize {
        match self {
            Self::Single(item) => item.sort_index,
            Self::Group(group) => group.sort_index,
        }
    }

    /// Number of payloads in the entry.
    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Group(group) => group.items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Payloads in display order.
    pub fn payloads(&self) -> Vec<&T> {
        match self {
            Self::Single(item) => vec![&item.payload],
            Self::Group(group) => group.items.iter().map(|i| &i.payload).collect(),
        }
    }
}

/// Get-or-create registry of group buckets for one build.
#[derive(Debug)]
pub struct ListGroupManager<T> {
    groups: Vec<GroupListViewItem<T>>,
    by_key: HashMap<String, usize>,
}

impl<T> ListGroupManager<T> {
    pub fn new() -> Self {
        Self {
            groups: Vec::new(),
            by_key: HashMap::new(),
        }
    }

    /// Return the group for `key`, creating it with `sort_index` on first
    /// encounter. Later calls return the same group unchanged.
    pub fn get_or_create(&mut self, key: &str, sort_index: usize) -> &mut GroupListViewItem<T> {
        let slot = match self.by_key.get(key) {
            Some(&slot) => slot,
            None => {
                self.groups.push(GroupListViewItem {
                    group_key: key.to_string(),
                    sort_index,
                    items: Vec::new(),
                });
                let slot = self.groups.len() - 1;
                self.by_key.insert(key.to_string(), slot);
                slot
            }
        };
        &mut self.groups[slot]
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Groups in creation order.
    pub fn into_groups(self) -> Vec<GroupListViewItem<T>> {
        self.groups
    }
}

impl<T> Default for ListGroupManager<T> {
    fn default() -> Self {
        Self::new()
    }
}

enum Entry<T> {
    Single(ListViewItem<T>),
    Group(usize),
}

/// Builds a sorted, de-duplicated list from payloads in discovery order.
///
/// Each payload gets the next discovery index. A group takes the index of
/// its first member. The output is sorted by index with a stable sort, so
/// entries with equal indexes keep insertion order.
pub struct ListBuilder<T> {
    entries: Vec<Entry<T>>,
    groups: ListGroupManager<T>,
    next_index: usize,
}

impl<T: PartialEq> ListBuilder<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            groups: ListGroupManager::new(),
            next_index: 0,
        }
    }

    /// Add a payload at the next discovery index.
    pub fn push(&mut self, payload: T, group_key: Option<String>) -> &mut Self {
        let index = self.next_index;
        self.push_at(payload, group_key, index)
    }

    /// Add a payload with an explicit sort index.
    ///
    /// Payloads equal to one already added are dropped.
    pub fn push_at(&mut self, payload: T, group_key: Option<String>, sort_index: usize) -> &mut Self {
        if self.contains(&payload) {
            return self;
        }
        self.next_index = self.next_index.max(sort_index + 1);

        let item = ListViewItem {
            payload,
            sort_index,
            group_key: group_key.clone(),
        };
        match group_key {
            Some(key) => {
                let created = self.groups.len();
                let group = self.groups.get_or_create(&key, sort_index);
                group.items.push(item);
                if self.groups.len() > created {
                    self.entries.push(Entry::Group(created));
                }
            }
            None => self.entries.push(Entry::Single(item)),
        }
        self
    }

    fn contains(&self, payload: &T) -> bool {
        self.entries.iter().any(|entry| match entry {
            Entry::Single(item) => &item.payload == payload,
            Entry::Group(_) => false,
        }) || self
            .groups
            .groups
            .iter()
            .any(|g| g.items.iter().any(|i| &i.payload == payload))
    }

    pub fn build(self) -> Vec<ListItem<T>> {
        let mut groups: Vec<Option<GroupListViewItem<T>>> =
            self.groups.into_groups().into_iter().map(Some).collect();
        let mut list: Vec<ListItem<T>> = self
            .entries
            .into_iter()
            .filter_map(|entry| match entry {
                Entry::Single(item) => Some(ListItem::Single(item)),
                Entry::Group(slot) => groups.get_mut(slot).and_then(Option::take).map(ListItem::Group),
            })
            .collect();
        list.sort_by_key(ListItem::sort_index);
        list
    }
}

impl<T: PartialEq> Default for ListBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a list from payloads in discovery order, grouping by `group_key`.
pub fn build_list<T, I, F>(payloads: I, group_key: F) -> Vec<ListItem<T>>
where
    T: PartialEq,
    I: IntoIterator<Item = T>,
    F: Fn(&T) -> Option<String>,
{
    let mut builder = ListBuilder::new();
    for payload in payloads {
        let key = group_key(&payload);
        builder.push(payload, key);
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Rec {
        name: &'static str,
        group: Option<&'static str>,
    }

    fn rec(name: &'static str, group: Option<&'static str>) -> Rec {
        Rec { name, group }
    }

    fn by_group(r: &Rec) -> Option<String> {
        r.group.map(str::to_string)
    }

    #[test]
    fn test_item_equality_ignores_index() {
        let a = ListViewItem {
            payload: "x",
            sort_index: 1,
            group_key: None,
        };
        let b = ListViewItem {
            payload: "x",
            sort_index: 9,
            group_key: Some("g".to_string()),
        };
        assert_eq!(a, b);
    }

    #[test]
    fn test_group_manager_is_idempotent() {
        let mut manager: ListGroupManager<u32> = ListGroupManager::new();
        manager.get_or_create("flow:1", 3).items.push(ListViewItem {
            payload: 7,
            sort_index: 3,
            group_key: Some("flow:1".to_string()),
        });
        let again = manager.get_or_create("flow:1", 10);
        assert_eq!(again.sort_index, 3);
        assert_eq!(again.items.len(), 1);
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_groups_take_first_member_index() {
        let list = build_list(
            vec![
                rec("a", None),
                rec("b", Some("g1")),
                rec("c", None),
                rec("d", Some("g1")),
                rec("e", Some("g2")),
            ],
            by_group,
        );

        let indexes: Vec<usize> = list.iter().map(ListItem::sort_index).collect();
        assert_eq!(indexes, vec![0, 1, 2, 4]);
        match &list[1] {
            ListItem::Group(group) => {
                assert_eq!(group.group_key, "g1");
                let names: Vec<&str> = group.items.iter().map(|i| i.payload.name).collect();
                assert_eq!(names, vec!["b", "d"]);
            }
            other => panic!("expected group, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicates_dropped_keeping_first() {
        let list = build_list(
            vec![rec("a", Some("g")), rec("b", None), rec("a", Some("g")), rec("b", None)],
            by_group,
        );
        let total: usize = list.iter().map(ListItem::len).sum();
        assert_eq!(total, 2);
        assert_eq!(list[0].sort_index(), 0);
        assert_eq!(list[1].sort_index(), 1);
    }

    #[test]
    fn test_build_is_idempotent() {
        let input = vec![rec("x", Some("g")), rec("y", None), rec("z", Some("g"))];
        let first = build_list(input.clone(), by_group);
        let second = build_list(input, by_group);
        assert_eq!(first, second);
    }

    #[test]
    fn test_equal_indexes_keep_insertion_order() {
        let mut builder = ListBuilder::new();
        builder
            .push_at("late", None, 5)
            .push_at("first-tie", None, 1)
            .push_at("second-tie", Some("g".to_string()), 1)
            .push_at("third-tie", None, 1);
        let list = builder.build();
        let heads: Vec<&str> = list.iter().map(|e| *e.payloads()[0]).collect();
        assert_eq!(heads, vec!["first-tie", "second-tie", "third-tie", "late"]);
    }
}

use std::collections::{BTreeMap, HashMap};

use log::debug;

use crate::types::{Link, LinkKind, LinkStatus, PairKey};

/// Store of labeled record pairs.
pub trait LinkDatabase: Send + Sync {
    /// Adds `link`, replacing any existing link between the same two ids.
    fn assert_link(&mut self, link: Link);

    /// The link between `id1` and `id2` in either direction, if known.
    fn infer_link(&self, id1: &str, id2: &str) -> Option<Link>;

    fn links_for(&self, id: &str) -> Vec<Link>;
}

/// Keeps every link in memory, indexed under both of its ids.
///
/// With inference on, asserting a new SAME link gives every member of each
/// cluster copies of the other cluster's links, and asserting a new
/// DIFFERENT link marks every member of each side's cluster as different
/// from the other side.
#[derive(Debug, Default, Clone)]
pub struct InMemoryLinkDatabase {
    links: BTreeMap<PairKey, Link>,
    by_id: HashMap<String, Vec<PairKey>>,
    infer: bool,
}

impl InMemoryLinkDatabase {
    pub fn new(infer: bool) -> Self {
        Self {
            infer,
            ..Default::default()
        }
    }

    pub fn from_links(links: impl IntoIterator<Item = Link>, infer: bool) -> Self {
        let mut db = Self::new(infer);
        for link in links {
            db.assert_link(link);
        }
        db
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn contains(&self, pair: &PairKey) -> bool {
        self.links.contains_key(pair)
    }

    /// Number of SAME links, the denominator of recall.
    pub fn same_count(&self) -> usize {
        self.links
            .values()
            .filter(|l| l.kind == LinkKind::Same)
            .count()
    }

    fn linked(&self, id: &str) -> impl Iterator<Item = &Link> {
        self.by_id
            .get(id)
            .into_iter()
            .flatten()
            .filter_map(|key| self.links.get(key))
    }

    /// `id` plus every id directly SAME-linked to it.
    fn cluster(&self, id: &str) -> Vec<String> {
        let mut members = vec![id.to_string()];
        members.extend(
            self.linked(id)
                .filter(|l| l.kind == LinkKind::Same)
                .map(|l| l.other_id(id).to_string()),
        );
        members
    }

    fn index(&mut self, link: Link) {
        let key = link.key();
        for id in [&link.id1, &link.id2] {
            let keys = self.by_id.entry(id.clone()).or_default();
            if !keys.contains(&key) {
                keys.push(key.clone());
            }
        }
        self.links.insert(key, link);
    }

    fn add_if_absent(&mut self, link: Link) {
        if link.id1 != link.id2 && !self.links.contains_key(&link.key()) {
            self.index(link);
        }
    }

    /// Gives every member of `from`'s cluster a copy of each link of `to`.
    fn copy_links(&mut self, from: &str, to: &str) {
        let to_copy: Vec<Link> = self.linked(to).cloned().collect();
        for member in self.cluster(from) {
            for link in &to_copy {
                let other = link.other_id(to);
                if member == other {
                    continue;
                }
                self.add_if_absent(Link::new(
                    member.clone(),
                    other,
                    LinkStatus::Inferred,
                    link.kind,
                    link.confidence,
                ));
            }
        }
    }

    fn mark_different(&mut self, from: &str, to: &str, confidence: f64) {
        for member in self.cluster(from) {
            self.add_if_absent(Link::new(
                member,
                to,
                LinkStatus::Inferred,
                LinkKind::Different,
                confidence,
            ));
        }
    }
}

impl LinkDatabase for InMemoryLinkDatabase {
    fn assert_link(&mut self, link: Link) {
        let known = self.links.contains_key(&link.key());
        if known || !self.infer {
            self.index(link);
            return;
        }

        let before = self.links.len();
        match link.kind {
            LinkKind::Same => {
                self.copy_links(&link.id1, &link.id2);
                self.copy_links(&link.id2, &link.id1);
            }
            LinkKind::Different => {
                self.mark_different(&link.id1, &link.id2, link.confidence);
                self.mark_different(&link.id2, &link.id1, link.confidence);
            }
        }
        // the asserted link wins over anything inferred for the same pair
        self.index(link);
        debug!("Inferred {} links", self.links.len().saturating_sub(before + 1));
    }

    fn infer_link(&self, id1: &str, id2: &str) -> Option<Link> {
        self.links.get(&PairKey::new(id1, id2)).cloned()
    }

    fn links_for(&self, id: &str) -> Vec<Link> {
        self.linked(id).cloned().collect()
    }
}

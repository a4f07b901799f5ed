//! In-memory bone hierarchy and per-vertex weight channels.
//!
//! This is the boundary the surrounding host maps its scene graph into: a
//! mutable set of named bones (parent link, head/tail positions, +Z up) and
//! a mutable per-bone weight-channel table. The repair passes in [`crate::fix`]
//! mutate both in place and hand them back together with a validation report.

use std::collections::BTreeMap;

use nalgebra::Vector3;

/// Stable bone handle. Ids are slot indices; slots are never reused within
/// one fix run, so an id stays valid (or dead) for the run's lifetime.
pub type BoneId = usize;

#[derive(Debug, Clone)]
pub struct Bone {
    pub name: String,
    pub parent: Option<BoneId>,
    pub head: Vector3<f32>,
    pub tail: Vector3<f32>,
}

/// Editable bone set. Lookup by name is case-insensitive everywhere, since
/// source rigs disagree on capitalization more than on anything else.
#[derive(Debug, Clone, Default)]
pub struct Skeleton {
    slots: Vec<Option<Bone>>,
}

impl Skeleton {
    pub fn add(
        &mut self,
        name: impl Into<String>,
        parent: Option<BoneId>,
        head: Vector3<f32>,
        tail: Vector3<f32>,
    ) -> BoneId {
        self.slots.push(Some(Bone {
            name: name.into(),
            parent,
            head,
            tail,
        }));
        self.slots.len() - 1
    }

    pub fn get(&self, id: BoneId) -> Option<&Bone> {
        self.slots.get(id).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: BoneId) -> Option<&mut Bone> {
        self.slots.get_mut(id).and_then(Option::as_mut)
    }

    pub fn name(&self, id: BoneId) -> Option<&str> {
        self.get(id).map(|bone| bone.name.as_str())
    }

    /// Find a live bone by name, case-insensitively.
    pub fn find(&self, name: &str) -> Option<BoneId> {
        self.iter()
            .find(|(_, bone)| bone.name.eq_ignore_ascii_case(name))
            .map(|(id, _)| id)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    pub fn rename(&mut self, id: BoneId, name: impl Into<String>) {
        if let Some(bone) = self.get_mut(id) {
            bone.name = name.into();
        }
    }

    pub fn set_parent(&mut self, id: BoneId, parent: Option<BoneId>) {
        if let Some(bone) = self.get_mut(id) {
            bone.parent = parent;
        }
    }

    /// Remove a bone. Its children are reparented to the removed bone's
    /// parent so the hierarchy never gains new roots mid-repair.
    pub fn remove(&mut self, id: BoneId) {
        let Some(removed) = self.slots.get_mut(id).and_then(Option::take) else {
            return;
        };
        for slot in self.slots.iter_mut().flatten() {
            if slot.parent == Some(id) {
                slot.parent = removed.parent;
            }
        }
    }

    pub fn children(&self, id: BoneId) -> Vec<BoneId> {
        self.iter()
            .filter(|(_, bone)| bone.parent == Some(id))
            .map(|(child, _)| child)
            .collect()
    }

    /// All transitive children of a bone, depth-first.
    pub fn descendants(&self, id: BoneId) -> Vec<BoneId> {
        let mut out = Vec::new();
        let mut stack = self.children(id);
        while let Some(next) = stack.pop() {
            stack.extend(self.children(next));
            out.push(next);
        }
        out
    }

    pub fn roots(&self) -> Vec<BoneId> {
        self.iter()
            .filter(|(_, bone)| bone.parent.is_none())
            .map(|(id, _)| id)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BoneId, &Bone)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(id, slot)| slot.as_ref().map(|bone| (id, bone)))
    }

    /// Snapshot of live ids, for passes that mutate while walking.
    pub fn ids(&self) -> Vec<BoneId> {
        self.iter().map(|(id, _)| id).collect()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ─── Weight channels ──────────────────────────────────────────────────────────

/// One bone's scalar influence per vertex.
#[derive(Debug, Clone)]
pub struct WeightChannel {
    pub name: String,
    pub weights: BTreeMap<u32, f32>,
}

/// Per-bone-name weight channels for one mesh.
#[derive(Debug, Clone, Default)]
pub struct WeightChannels {
    channels: Vec<WeightChannel>,
}

impl WeightChannels {
    /// Case-insensitive channel lookup.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.channels
            .iter()
            .position(|channel| channel.name.eq_ignore_ascii_case(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Existing channel for `name`, or a fresh empty one.
    pub fn ensure(&mut self, name: &str) -> &mut WeightChannel {
        let index = match self.find(name) {
            Some(index) => index,
            None => {
                self.channels.push(WeightChannel {
                    name: name.to_string(),
                    weights: BTreeMap::new(),
                });
                self.channels.len() - 1
            }
        };
        &mut self.channels[index]
    }

    pub fn get(&self, index: usize) -> Option<&WeightChannel> {
        self.channels.get(index)
    }

    /// Rename a channel, the way a host keeps deform channels in sync with
    /// bone renames.
    pub fn rename(&mut self, index: usize, name: &str) {
        if let Some(channel) = self.channels.get_mut(index) {
            channel.name = name.to_string();
        }
    }

    pub fn set_weight(&mut self, name: &str, vertex: u32, weight: f32) {
        self.ensure(name).weights.insert(vertex, weight);
    }

    pub fn add_weight(&mut self, name: &str, vertex: u32, weight: f32) {
        *self.ensure(name).weights.entry(vertex).or_insert(0.0) += weight;
    }

    /// Sum the source channel into the target channel per vertex, then drop
    /// the source channel. Both lookups are case-insensitive; a missing
    /// channel on either side leaves the table untouched.
    pub fn merge(&mut self, source: &str, target: &str) -> bool {
        let (Some(from), Some(to)) = (self.find(source), self.find(target)) else {
            return false;
        };
        if from == to {
            return false;
        }

        let moved = self.channels.remove(from);
        let to = if to > from { to - 1 } else { to };
        for (vertex, weight) in moved.weights {
            *self.channels[to].weights.entry(vertex).or_insert(0.0) += weight;
        }
        true
    }

    pub fn names(&self) -> Vec<String> {
        self.channels
            .iter()
            .map(|channel| channel.name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

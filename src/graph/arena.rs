use std::collections::BTreeMap;

use crate::{
    animation::value::Value,
    foundation::core::SceneTiming,
    foundation::error::{TrellisError, TrellisResult},
    graph::ids::NodeId,
    graph::node::{BufferData, BufferSource, Node, NodeKind},
};

#[derive(Clone, Debug)]
struct Entry {
    node: Node,
    refcount: u32,
    /// Construction sequence number; teardown runs in descending order.
    seq: u64,
}

#[derive(Clone, Debug)]
struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

/// Which name-keyed binding table of a draw or compute node to edit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindingSlot {
    Uniforms,
    Textures,
    Buffers,
    Attributes,
    InstanceAttributes,
}

impl BindingSlot {
    fn name(self) -> &'static str {
        match self {
            Self::Uniforms => "uniforms",
            Self::Textures => "textures",
            Self::Buffers => "buffers",
            Self::Attributes => "attributes",
            Self::InstanceAttributes => "instance_attributes",
        }
    }
}

/// Node arena plus scene-wide timing.
///
/// Every parent-to-child reference holds one count on the child, and the root holds one more.
/// A node whose count drops to zero is freed together with everything only it kept alive.
#[derive(Clone, Debug)]
pub struct Scene {
    timing: SceneTiming,
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: Option<NodeId>,
    next_seq: u64,
    live: usize,
    /// Freed nodes not yet reported to the engine, with their construction sequence.
    released: Vec<(u64, NodeId)>,
}

impl Scene {
    pub fn new(timing: SceneTiming) -> Self {
        Self {
            timing,
            slots: Vec::new(),
            free: Vec::new(),
            root: None,
            next_seq: 0,
            live: 0,
            released: Vec::new(),
        }
    }

    pub fn timing(&self) -> &SceneTiming {
        &self.timing
    }

    pub fn set_timing(&mut self, timing: SceneTiming) -> TrellisResult<()> {
        timing.validate()?;
        self.timing = timing;
        Ok(())
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.entry(id).is_some()
    }

    fn entry(&self, id: NodeId) -> Option<&Entry> {
        let slot = self.slots.get(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.entry.as_ref()
    }

    fn entry_mut(&mut self, id: NodeId) -> Option<&mut Entry> {
        let slot = self.slots.get_mut(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.entry.as_mut()
    }

    pub fn get(&self, id: NodeId) -> TrellisResult<&Node> {
        self.entry(id)
            .map(|e| &e.node)
            .ok_or_else(|| stale(id))
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> TrellisResult<&mut Node> {
        self.entry_mut(id)
            .map(|e| &mut e.node)
            .ok_or_else(|| stale(id))
    }

    pub fn refcount(&self, id: NodeId) -> Option<u32> {
        self.entry(id).map(|e| e.refcount)
    }

    pub(crate) fn seq(&self, id: NodeId) -> Option<u64> {
        self.entry(id).map(|e| e.seq)
    }

    /// Label or `#index` of a node, for diagnostics.
    pub fn display_label(&self, id: NodeId) -> String {
        match self.entry(id) {
            Some(e) => e.node.display_label(id),
            None => id.to_string(),
        }
    }

    /// Live nodes in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.slots.iter().enumerate().filter_map(|(i, s)| {
            s.entry
                .as_ref()
                .map(|e| (NodeId::new(i as u32, s.generation), &e.node))
        })
    }

    /// Live nodes ordered by construction time, oldest first.
    pub fn construction_order(&self) -> Vec<NodeId> {
        let mut ids: Vec<(u64, NodeId)> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| {
                s.entry
                    .as_ref()
                    .map(|e| (e.seq, NodeId::new(i as u32, s.generation)))
            })
            .collect();
        ids.sort_unstable();
        ids.into_iter().map(|(_, id)| id).collect()
    }

    /// Add a node. Every node it references must already be live.
    pub fn insert(&mut self, node: Node) -> TrellisResult<NodeId> {
        let edges = node.kind.edges();
        if let Some(bad) = edges.iter().find(|e| !self.contains(e.target)) {
            return Err(TrellisError::construction(format!(
                "{} references unknown node {} through `{}`",
                node.kind.name(),
                bad.target,
                bad.slot
            )));
        }
        for e in &edges {
            self.retain(e.target)?;
        }
        Ok(self.alloc(node))
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.live += 1;
        let entry = Entry {
            node,
            refcount: 0,
            seq,
        };
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.entry = Some(entry);
            return NodeId::new(index, slot.generation);
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            entry: Some(entry),
        });
        NodeId::new(index, 0)
    }

    fn retain(&mut self, id: NodeId) -> TrellisResult<()> {
        let e = self.entry_mut(id).ok_or_else(|| stale(id))?;
        e.refcount += 1;
        Ok(())
    }

    /// Drop one reference; frees `id` and, transitively, whatever only it referenced.
    fn release(&mut self, id: NodeId) {
        let mut pending = vec![id];
        while let Some(id) = pending.pop() {
            let Some(e) = self.entry_mut(id) else {
                continue;
            };
            e.refcount = e.refcount.saturating_sub(1);
            if e.refcount > 0 {
                continue;
            }
            let slot = &mut self.slots[id.index() as usize];
            let Some(entry) = slot.entry.take() else {
                continue;
            };
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(id.index());
            self.live -= 1;
            self.released.push((entry.seq, id));
            tracing::debug!(node = %id, kind = entry.node.kind.name(), "node freed");
            pending.extend(entry.node.kind.edges().into_iter().map(|e| e.target));
        }
    }

    /// Nodes freed since the last call, newest construction first.
    pub(crate) fn take_released(&mut self) -> Vec<NodeId> {
        let mut out = std::mem::take(&mut self.released);
        out.sort_unstable_by(|a, b| b.0.cmp(&a.0));
        out.into_iter().map(|(_, id)| id).collect()
    }

    pub fn set_root(&mut self, id: NodeId) -> TrellisResult<()> {
        self.retain(id)?;
        if let Some(old) = self.root.replace(id) {
            self.release(old);
        }
        Ok(())
    }

    pub fn clear_root(&mut self) {
        if let Some(old) = self.root.take() {
            self.release(old);
        }
    }

    /// Free every node that neither the root nor another node references.
    pub fn collect_unreachable(&mut self) -> usize {
        let before = self.live;
        loop {
            let orphans: Vec<NodeId> = self
                .iter()
                .filter(|&(id, _)| Some(id) != self.root)
                .filter(|&(id, _)| self.refcount(id) == Some(0))
                .map(|(id, _)| id)
                .collect();
            if orphans.is_empty() {
                break;
            }
            for id in orphans {
                self.release(id);
            }
        }
        before - self.live
    }

    pub fn set_label(&mut self, id: NodeId, label: impl Into<String>) -> TrellisResult<()> {
        self.get_mut(id)?.label = Some(label.into());
        Ok(())
    }

    /// First live node carrying `label`, in slot order.
    pub fn find(&self, label: &str) -> Option<NodeId> {
        self.iter()
            .find(|(_, n)| n.label.as_deref() == Some(label))
            .map(|(id, _)| id)
    }

    /// `true` when `target` is reachable from `from` (including `from == target`).
    pub fn reaches(&self, from: NodeId, target: NodeId) -> bool {
        let mut stack = vec![from];
        let mut seen = std::collections::HashSet::new();
        while let Some(id) = stack.pop() {
            if id == target {
                return true;
            }
            if !seen.insert(id) {
                continue;
            }
            if let Some(e) = self.entry(id) {
                stack.extend(e.node.kind.edges().into_iter().map(|e| e.target));
            }
        }
        false
    }

    fn check_new_edge(&self, parent: NodeId, child: NodeId) -> TrellisResult<()> {
        if !self.contains(child) {
            return Err(stale(child));
        }
        if self.reaches(child, parent) {
            return Err(TrellisError::construction(format!(
                "linking {parent} -> {child} would create a cycle"
            )));
        }
        Ok(())
    }

    /// Append `child` to a `Group`.
    pub fn add_child(&mut self, group: NodeId, child: NodeId) -> TrellisResult<()> {
        self.check_new_edge(group, child)?;
        match &mut self.get_mut(group)?.kind {
            NodeKind::Group(g) => g.children.push(child),
            other => {
                return Err(TrellisError::construction(format!(
                    "add_child needs a Group, got {}",
                    other.name()
                )));
            }
        }
        self.retain(child)
    }

    /// Remove the first occurrence of `child` from a `Group`, freeing it if unreferenced.
    pub fn detach(&mut self, group: NodeId, child: NodeId) -> TrellisResult<()> {
        let removed = match &mut self.get_mut(group)?.kind {
            NodeKind::Group(g) => match g.children.iter().position(|&c| c == child) {
                Some(pos) => g.children.remove(pos),
                None => {
                    return Err(TrellisError::construction(format!(
                        "{child} is not a child of {group}"
                    )));
                }
            },
            other => {
                return Err(TrellisError::construction(format!(
                    "detach needs a Group, got {}",
                    other.name()
                )));
            }
        };
        self.release(removed);
        Ok(())
    }

    fn binding_table(
        node: &mut Node,
        slot: BindingSlot,
    ) -> TrellisResult<&mut BTreeMap<String, NodeId>> {
        let kind_name = node.kind.name();
        let table = match (&mut node.kind, slot) {
            (NodeKind::Render(r), BindingSlot::Uniforms) => &mut r.bindings.uniforms,
            (NodeKind::Render(r), BindingSlot::Textures) => &mut r.bindings.textures,
            (NodeKind::Render(r), BindingSlot::Buffers) => &mut r.bindings.buffers,
            (NodeKind::Render(r), BindingSlot::Attributes) => &mut r.attributes,
            (NodeKind::Render(r), BindingSlot::InstanceAttributes) => &mut r.instance_attributes,
            (NodeKind::Compute(c), BindingSlot::Uniforms) => &mut c.bindings.uniforms,
            (NodeKind::Compute(c), BindingSlot::Textures) => &mut c.bindings.textures,
            (NodeKind::Compute(c), BindingSlot::Buffers) => &mut c.bindings.buffers,
            _ => {
                return Err(TrellisError::construction(format!(
                    "{kind_name} has no `{}` bindings",
                    slot.name()
                )));
            }
        };
        Ok(table)
    }

    /// Bind `name -> target` on a draw or compute node, replacing any previous binding.
    pub fn bind(
        &mut self,
        owner: NodeId,
        slot: BindingSlot,
        name: &str,
        target: NodeId,
    ) -> TrellisResult<()> {
        self.check_new_edge(owner, target)?;
        let node = self.get_mut(owner)?;
        let previous = Self::binding_table(node, slot)?.insert(name.to_string(), target);
        self.retain(target)?;
        if let Some(old) = previous {
            self.release(old);
        }
        Ok(())
    }

    /// Remove a binding, freeing the target if unreferenced.
    pub fn unbind(&mut self, owner: NodeId, slot: BindingSlot, name: &str) -> TrellisResult<()> {
        let node = self.get_mut(owner)?;
        let removed = Self::binding_table(node, slot)?.remove(name);
        if let Some(old) = removed {
            self.release(old);
        }
        Ok(())
    }

    pub fn update_uniforms<'a>(
        &mut self,
        owner: NodeId,
        bindings: impl IntoIterator<Item = (&'a str, NodeId)>,
    ) -> TrellisResult<()> {
        self.bind_all(owner, BindingSlot::Uniforms, bindings)
    }

    pub fn update_textures<'a>(
        &mut self,
        owner: NodeId,
        bindings: impl IntoIterator<Item = (&'a str, NodeId)>,
    ) -> TrellisResult<()> {
        self.bind_all(owner, BindingSlot::Textures, bindings)
    }

    pub fn update_buffers<'a>(
        &mut self,
        owner: NodeId,
        bindings: impl IntoIterator<Item = (&'a str, NodeId)>,
    ) -> TrellisResult<()> {
        self.bind_all(owner, BindingSlot::Buffers, bindings)
    }

    pub fn update_attributes<'a>(
        &mut self,
        owner: NodeId,
        bindings: impl IntoIterator<Item = (&'a str, NodeId)>,
    ) -> TrellisResult<()> {
        self.bind_all(owner, BindingSlot::Attributes, bindings)
    }

    pub fn update_instance_attributes<'a>(
        &mut self,
        owner: NodeId,
        bindings: impl IntoIterator<Item = (&'a str, NodeId)>,
    ) -> TrellisResult<()> {
        self.bind_all(owner, BindingSlot::InstanceAttributes, bindings)
    }

    fn bind_all<'a>(
        &mut self,
        owner: NodeId,
        slot: BindingSlot,
        bindings: impl IntoIterator<Item = (&'a str, NodeId)>,
    ) -> TrellisResult<()> {
        for (name, target) in bindings {
            self.bind(owner, slot, name, target)?;
        }
        Ok(())
    }

    /// Replace the payload of a static buffer and return the previous one. The scalar count
    /// must not change.
    pub fn set_buffer_data(&mut self, id: NodeId, data: BufferData) -> TrellisResult<BufferData> {
        let NodeKind::Buffer(buf) = &mut self.get_mut(id)?.kind else {
            return Err(TrellisError::construction(format!(
                "{id} is not a Buffer"
            )));
        };
        match &mut buf.source {
            BufferSource::Static(old) => {
                if old.component() != data.component() || old.len() != data.len() {
                    return Err(TrellisError::construction(format!(
                        "buffer {id} is fixed-size: expected {} {:?} components, got {} {:?}",
                        old.len(),
                        old.component(),
                        data.len(),
                        data.component()
                    )));
                }
                Ok(std::mem::replace(old, data))
            }
            BufferSource::Animated(_) => Err(TrellisError::construction(format!(
                "buffer {id} is animated; its payload comes from keyframes"
            ))),
        }
    }

    /// Replace a uniform with a constant of the same kind.
    pub fn set_uniform_value(&mut self, id: NodeId, value: Value) -> TrellisResult<()> {
        let NodeKind::Uniform(u) = &mut self.get_mut(id)?.kind else {
            return Err(TrellisError::construction(format!(
                "{id} is not a Uniform"
            )));
        };
        if u.param.kind() != value.kind() {
            return Err(TrellisError::construction(format!(
                "uniform {id} holds {} values, got {}",
                u.param.kind(),
                value.kind()
            )));
        }
        u.param = value.into();
        Ok(())
    }

    pub fn set_user_switch(&mut self, id: NodeId, enabled: bool) -> TrellisResult<()> {
        match &mut self.get_mut(id)?.kind {
            NodeKind::UserSwitch(s) => {
                s.enabled = enabled;
                Ok(())
            }
            other => Err(TrellisError::construction(format!(
                "{id} is a {}, not a UserSwitch",
                other.name()
            ))),
        }
    }

    pub fn set_program_sources(
        &mut self,
        id: NodeId,
        vertex: Option<String>,
        fragment: Option<String>,
    ) -> TrellisResult<()> {
        match &mut self.get_mut(id)?.kind {
            NodeKind::Program(p) => {
                p.vertex = vertex;
                p.fragment = fragment;
                Ok(())
            }
            other => Err(TrellisError::construction(format!(
                "{id} is a {}, not a Program",
                other.name()
            ))),
        }
    }

    /// Rebuild an arena from nodes whose references are dense indices into `nodes`.
    pub(crate) fn from_dense(
        timing: SceneTiming,
        nodes: Vec<Node>,
        root: Option<NodeId>,
    ) -> TrellisResult<Self> {
        let n = nodes.len();
        let mut scene = Scene::new(timing);
        for (i, node) in nodes.into_iter().enumerate() {
            if let Some(bad) = node
                .kind
                .edges()
                .into_iter()
                .find(|e| e.target.index() as usize >= n || e.target.generation() != 0)
            {
                return Err(TrellisError::serde(format!(
                    "node {i} references out-of-range node {} through `{}`",
                    bad.target, bad.slot
                )));
            }
            scene.alloc(node);
        }
        let targets: Vec<NodeId> = scene
            .iter()
            .flat_map(|(_, node)| node.kind.edges().into_iter().map(|e| e.target))
            .collect();
        for t in targets {
            scene.retain(t)?;
        }
        if let Some(root) = root {
            if !scene.contains(root) {
                return Err(TrellisError::serde(format!(
                    "root {root} is out of range"
                )));
            }
            scene.set_root(root)?;
        }
        Ok(scene)
    }
}

fn stale(id: NodeId) -> TrellisError {
    TrellisError::construction(format!("node {id} does not exist (freed or never created)"))
}

#[cfg(test)]
#[path = "../../tests/unit/graph/arena.rs"]
mod tests;

use std::{collections::HashMap, fmt::Write as _, path::Path};

use crate::{
    foundation::core::SceneTiming,
    foundation::error::{TrellisError, TrellisResult},
    graph::arena::Scene,
    graph::ids::NodeId,
    graph::node::{Capability, Node},
};

/// Current on-disk format version.
pub const SCENE_FORMAT_VERSION: u32 = 1;

fn format_version() -> u32 {
    SCENE_FORMAT_VERSION
}

/// Serializable form of a [`Scene`].
///
/// Nodes are listed in construction order; every reference is `[index, 0]` into `nodes`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SceneDef {
    #[serde(default = "format_version")]
    pub version: u32,
    #[serde(default)]
    pub timing: SceneTiming,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<NodeId>,
    pub nodes: Vec<Node>,
}

impl Scene {
    pub fn to_def(&self) -> SceneDef {
        let order = self.construction_order();
        let dense: HashMap<NodeId, NodeId> = order
            .iter()
            .enumerate()
            .map(|(i, &id)| (id, NodeId::new(i as u32, 0)))
            .collect();
        let nodes = order
            .iter()
            .filter_map(|&id| self.get(id).ok())
            .map(|node| {
                let mut node = node.clone();
                for r in node.kind.refs_mut() {
                    if let Some(&d) = dense.get(r) {
                        *r = d;
                    }
                }
                node
            })
            .collect();
        SceneDef {
            version: SCENE_FORMAT_VERSION,
            timing: *self.timing(),
            root: self.root().and_then(|r| dense.get(&r).copied()),
            nodes,
        }
    }

    /// Rebuild and validate a scene from its serialized form.
    pub fn from_def(def: SceneDef) -> TrellisResult<Self> {
        if def.version != SCENE_FORMAT_VERSION {
            return Err(TrellisError::serde(format!(
                "unsupported scene format version {} (expected {SCENE_FORMAT_VERSION})",
                def.version
            )));
        }
        def.timing.validate()?;
        let scene = Scene::from_dense(def.timing, def.nodes, def.root)?;
        scene.validate()?;
        Ok(scene)
    }

    pub fn to_json(&self) -> TrellisResult<String> {
        Ok(serde_json::to_string_pretty(&self.to_def())?)
    }

    pub fn from_json(s: &str) -> TrellisResult<Self> {
        let def: SceneDef = serde_json::from_str(s)?;
        Self::from_def(def)
    }

    #[tracing::instrument]
    pub fn from_path(path: &Path) -> TrellisResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            TrellisError::serde(format!("read scene '{}': {e}", path.display()))
        })?;
        Self::from_json(&text)
    }

    /// Graphviz rendering of the live graph; edges carry their slot names.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph scene {\n    node [shape=box, fontname=monospace];\n");
        for (id, node) in self.iter() {
            let shape = match node.kind.capability() {
                Capability::Container => "folder",
                Capability::Drawable | Capability::ComputeDispatch => "box3d",
                Capability::Resource => "note",
                Capability::Filter => "octagon",
                Capability::Transform => "box",
            };
            let label = match &node.label {
                Some(l) => format!("{}\\n{}", escape(l), node.kind.name()),
                None => format!("{id}\\n{}", node.kind.name()),
            };
            let peripheries = if Some(id) == self.root() { 2 } else { 1 };
            let _ = writeln!(
                out,
                "    n{}_{} [label=\"{label}\", shape={shape}, peripheries={peripheries}];",
                id.index(),
                id.generation()
            );
        }
        for (id, node) in self.iter() {
            for edge in node.kind.edges() {
                let style = if edge.slot == "child" { "solid" } else { "dashed" };
                let _ = writeln!(
                    out,
                    "    n{}_{} -> n{}_{} [label=\"{}\", style={style}];",
                    id.index(),
                    id.generation(),
                    edge.target.index(),
                    edge.target.generation(),
                    escape(&edge.slot)
                );
            }
        }
        out.push_str("}\n");
        out
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
#[path = "../../tests/unit/graph/serialize.rs"]
mod tests;

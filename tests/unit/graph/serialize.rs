use super::*;
use crate::{foundation::core::Vec3, graph::builder::SceneBuilder};

fn sample() -> Scene {
    let mut b = SceneBuilder::new(SceneTiming::default());
    let g = b.triangle(Vec3::ZERO, Vec3::X, Vec3::Y).unwrap();
    let color = b.uniform(Vec3::new(1.0, 0.5, 0.0).extend(1.0)).unwrap();
    let r = b.render(g, None).unwrap();
    b.update_uniforms(r, [("color", color)]).unwrap();
    let spin = b.rotate(r, 45.0, Vec3::Z).unwrap();
    b.label(spin, "spin").unwrap();
    b.build(spin).unwrap()
}

#[test]
fn json_round_trip_preserves_structure() {
    let scene = sample();
    let json = scene.to_json().unwrap();
    let back = Scene::from_json(&json).unwrap();
    assert_eq!(back.len(), scene.len());
    assert_eq!(back.to_def(), scene.to_def());
    assert!(back.find("spin").is_some());
}

#[test]
fn def_uses_dense_construction_order() {
    let scene = sample();
    let def = scene.to_def();
    assert_eq!(def.nodes.len(), scene.len());
    assert_eq!(def.root, Some(NodeId::new(def.nodes.len() as u32 - 1, 0)));
    for (i, node) in def.nodes.iter().enumerate() {
        for e in node.kind.edges() {
            assert!((e.target.index() as usize) < i, "{} must precede node {i}", e.slot);
            assert_eq!(e.target.generation(), 0);
        }
    }
}

#[test]
fn out_of_range_reference_is_a_serde_error() {
    let json = r#"{
        "root": [0, 0],
        "nodes": [ { "kind": { "type": "Group", "children": [[5, 0]] } } ]
    }"#;
    let err = Scene::from_json(json).unwrap_err();
    assert_eq!(err.category(), crate::foundation::error::ErrorCategory::Serde);
}

#[test]
fn cycles_in_files_are_rejected() {
    let json = r#"{
        "root": [0, 0],
        "nodes": [
            { "kind": { "type": "Group", "children": [[1, 0]] } },
            { "kind": { "type": "Group", "children": [[0, 0]] } }
        ]
    }"#;
    let err = Scene::from_json(json).unwrap_err();
    assert!(err.to_string().contains("cycle"), "{err}");
}

#[test]
fn unknown_version_is_rejected() {
    let json = r#"{ "version": 99, "nodes": [] }"#;
    assert!(Scene::from_json(json).is_err());
}

#[test]
fn dot_lists_nodes_and_slots() {
    let dot = sample().to_dot();
    assert!(dot.starts_with("digraph scene {"));
    assert!(dot.contains("spin\\nRotate"));
    assert!(dot.contains("label=\"uniforms.color\""));
    assert!(dot.contains("peripheries=2"));
}

#[test]
fn dot_shapes_follow_node_capability() {
    let dot = sample().to_dot();
    let shape_of = |kind: &str| {
        dot.lines()
            .find(|l| l.contains(&format!("\\n{kind}\"")))
            .and_then(|l| l.split("shape=").nth(1))
            .and_then(|s| s.split(',').next())
            .map(str::to_string)
    };
    assert_eq!(shape_of("Rotate").as_deref(), Some("box"));
    assert_eq!(shape_of("Render").as_deref(), Some("box3d"));
    assert_eq!(shape_of("Geometry").as_deref(), Some("note"));
    assert_eq!(shape_of("Uniform").as_deref(), Some("note"));
}

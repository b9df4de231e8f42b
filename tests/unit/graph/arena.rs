use super::*;
use crate::graph::node::{BufferFormat, Group, Program, Uniform};

fn scene() -> Scene {
    Scene::new(SceneTiming::default())
}

fn program(s: &mut Scene) -> NodeId {
    s.insert(Node::new(Program::default())).unwrap()
}

#[test]
fn insert_rejects_dangling_references() {
    let mut s = scene();
    let ghost = NodeId::new(7, 0);
    let err = s
        .insert(Node::new(Group {
            children: vec![ghost],
        }))
        .unwrap_err();
    assert!(err.to_string().contains("unknown node #7"));
    assert!(s.is_empty());
}

#[test]
fn shared_children_are_refcounted() {
    let mut s = scene();
    let p = program(&mut s);
    let a = s.insert(Node::new(Group { children: vec![p] })).unwrap();
    let b = s.insert(Node::new(Group { children: vec![p, p] })).unwrap();
    assert_eq!(s.refcount(p), Some(3));

    let root = s.insert(Node::new(Group { children: vec![a, b] })).unwrap();
    s.set_root(root).unwrap();

    s.detach(root, b).unwrap();
    assert!(!s.contains(b));
    assert_eq!(s.refcount(p), Some(1));
    assert_eq!(s.take_released(), vec![b]);

    s.detach(root, a).unwrap();
    assert!(!s.contains(p));
    // Newest construction first.
    assert_eq!(s.take_released(), vec![a, p]);
}

#[test]
fn stale_handles_are_rejected_after_slot_reuse() {
    let mut s = scene();
    let p = program(&mut s);
    let g = s.insert(Node::new(Group { children: vec![p] })).unwrap();
    s.set_root(g).unwrap();
    s.clear_root();
    assert!(!s.contains(p));

    let q = program(&mut s);
    assert_eq!(q.index(), p.index());
    assert_ne!(q, p);
    assert!(s.get(p).is_err());
    assert!(s.get(g).is_err());
}

#[test]
fn add_child_rejects_cycles() {
    let mut s = scene();
    let inner = s.insert(Node::new(Group::default())).unwrap();
    let outer = s.insert(Node::new(Group { children: vec![inner] })).unwrap();
    assert!(s.add_child(inner, outer).is_err());
    assert!(s.add_child(inner, inner).is_err());
    let p = program(&mut s);
    s.add_child(inner, p).unwrap();
    assert!(s.reaches(outer, p));
}

#[test]
fn rebinding_releases_previous_target() {
    let mut s = scene();
    let geom_buf = s
        .insert(Node::new(crate::graph::node::Buffer::new(
            BufferFormat::VEC3,
            BufferData::Float(vec![0.0; 9]),
        )))
        .unwrap();
    let geom = s
        .insert(Node::new(crate::graph::node::Geometry {
            vertices: geom_buf,
            uvcoords: None,
            normals: None,
            indices: None,
            topology: Default::default(),
        }))
        .unwrap();
    let prog = program(&mut s);
    let render = s
        .insert(Node::new(crate::graph::node::Render::new(geom, prog)))
        .unwrap();
    s.set_root(render).unwrap();

    let u0 = s
        .insert(Node::new(Uniform {
            param: Value::Float(1.0).into(),
        }))
        .unwrap();
    let u1 = s
        .insert(Node::new(Uniform {
            param: Value::Float(2.0).into(),
        }))
        .unwrap();
    s.update_uniforms(render, [("gain", u0)]).unwrap();
    s.update_uniforms(render, [("gain", u1)]).unwrap();
    assert!(!s.contains(u0));
    assert_eq!(s.refcount(u1), Some(1));

    assert!(s.update_uniforms(prog, [("gain", u1)]).is_err());
}

#[test]
fn payload_updates_keep_size_and_kind() {
    let mut s = scene();
    let buf = s
        .insert(Node::new(crate::graph::node::Buffer::new(
            BufferFormat::FLOAT,
            BufferData::Float(vec![0.0; 4]),
        )))
        .unwrap();
    assert!(s.set_buffer_data(buf, BufferData::Float(vec![1.0; 4])).is_ok());
    assert!(s.set_buffer_data(buf, BufferData::Float(vec![1.0; 5])).is_err());
    assert!(s.set_buffer_data(buf, BufferData::Int(vec![1; 4])).is_err());

    let u = s
        .insert(Node::new(Uniform {
            param: Value::Float(0.0).into(),
        }))
        .unwrap();
    assert!(s.set_uniform_value(u, Value::Float(3.0)).is_ok());
    assert!(s.set_uniform_value(u, Value::Int(3)).is_err());
}

#[test]
fn construction_order_follows_insertion() {
    let mut s = scene();
    let a = program(&mut s);
    let b = program(&mut s);
    let g = s.insert(Node::new(Group { children: vec![b, a] })).unwrap();
    assert_eq!(s.construction_order(), vec![a, b, g]);
    s.set_label(g, "top").unwrap();
    assert_eq!(s.find("top"), Some(g));
    assert_eq!(s.display_label(a), a.to_string());
}

use super::*;

#[test]
fn scalar_and_vector_mix_componentwise() {
    let v = Value::mix(&Value::Float(0.0), &Value::Float(90.0), 0.5).unwrap();
    assert_eq!(v, Value::Float(45.0));

    let v = Value::mix(
        &Value::Vec3(Vec3::ZERO),
        &Value::Vec3(Vec3::new(2.0, 4.0, -8.0)),
        0.25,
    )
    .unwrap();
    assert_eq!(v, Value::Vec3(Vec3::new(0.5, 1.0, -2.0)));
}

#[test]
fn buffer_mix_is_elementwise_and_length_checked() {
    let a = Value::Buffer(vec![0.0, 10.0, -4.0]);
    let b = Value::Buffer(vec![1.0, 20.0, 4.0]);
    assert_eq!(
        Value::mix(&a, &b, 0.5),
        Some(Value::Buffer(vec![0.5, 15.0, 0.0]))
    );
    assert!(Value::mix(&a, &Value::Buffer(vec![1.0]), 0.5).is_none());
}

#[test]
fn constant_only_kinds_do_not_mix() {
    assert!(Value::mix(&Value::Int(1), &Value::Int(2), 0.5).is_none());
    assert!(!ValueKind::Mat4.is_animatable());
    assert!(ValueKind::Quat.is_animatable());
}

#[test]
fn mismatched_kinds_do_not_mix() {
    assert!(Value::mix(&Value::Float(1.0), &Value::Vec2(Vec2::ONE), 0.5).is_none());
}

#[test]
fn slerp_takes_the_short_arc() {
    let a = Quat::from_rotation_z(0.0);
    // 350 degrees is 10 degrees the other way round.
    let b = Quat::from_rotation_z(350f32.to_radians());
    let mid = slerp_shortest(a, b, 0.5);
    let (axis, angle) = mid.to_axis_angle();
    let signed = if axis.z < 0.0 { -angle } else { angle };
    assert!(
        (signed.to_degrees() + 5.0).abs() < 1e-3,
        "got {}",
        signed.to_degrees()
    );
}

#[test]
fn slerp_never_exceeds_endpoint_distance() {
    let a = Quat::from_rotation_y(0.3);
    let b = -Quat::from_rotation_y(2.8);
    let total = a.angle_between(b);
    for i in 0..=20 {
        let t = i as f32 / 20.0;
        let q = slerp_shortest(a, b, t);
        assert!(a.angle_between(q) <= total + 1e-4);
        assert!((q.length() - 1.0).abs() < 1e-4);
    }
}

#[test]
fn slerp_hits_endpoints() {
    let a = Quat::from_rotation_x(0.4);
    let b = Quat::from_rotation_y(1.2);
    assert!(slerp_shortest(a, b, 0.0).abs_diff_eq(a, 1e-5));
    assert!(slerp_shortest(a, b, 1.0).abs_diff_eq(b, 1e-5));
}

#[test]
fn nearly_parallel_endpoints_come_back_exact() {
    let a = Quat::from_xyzw(0.0, 0.0, 0.0, 2.0);
    let b = Quat::from_xyzw(1e-4, 0.0, 0.0, 2.0);
    assert_eq!(slerp_shortest(a, b, 0.0), a);
    assert_eq!(slerp_shortest(a, b, 1.0), b);
    assert!((slerp_shortest(a, b, 0.5).length() - 1.0).abs() < 1e-5);
}

#[test]
fn tagged_json_shape() {
    let s = serde_json::to_string(&Value::Vec2(Vec2::new(1.0, 2.0))).unwrap();
    assert_eq!(s, r#"{"type":"vec2","value":[1.0,2.0]}"#);
    let v: Value = serde_json::from_str(r#"{"type":"float","value":0.1}"#).unwrap();
    assert_eq!(v, Value::Float(0.1));
}

use super::*;
use crate::foundation::core::{Quat, Vec3};

fn float_param(keys: &[(f64, f64)]) -> AnimatedParam {
    AnimatedParam::new(keys.iter().map(|&(t, v)| Keyframe::new(t, v)).collect()).unwrap()
}

#[test]
fn linear_midpoint() {
    let p = float_param(&[(0.0, 0.0), (1.0, 90.0)]);
    assert_eq!(p.evaluate(0.5), Value::Float(45.0));
}

#[test]
fn clamps_outside_keyframe_span() {
    let p = float_param(&[(1.0, 10.0), (2.0, 20.0), (4.0, -5.0)]);
    assert_eq!(p.evaluate(0.0), Value::Float(10.0));
    assert_eq!(p.evaluate(-100.0), Value::Float(10.0));
    assert_eq!(p.evaluate(4.0), Value::Float(-5.0));
    assert_eq!(p.evaluate(1e9), Value::Float(-5.0));
    assert_eq!(p.evaluate(f64::NAN), Value::Float(10.0));
}

#[test]
fn exact_at_every_keyframe_time() {
    let keys = [(0.0, 3.0), (0.5, -1.0), (1.25, 7.5), (3.0, 0.0)];
    let p = AnimatedParam::new(
        keys.iter()
            .map(|&(t, v)| Keyframe::eased(t, v, Easing::CubicInOut))
            .collect(),
    )
    .unwrap();
    for (t, v) in keys {
        assert_eq!(p.evaluate(t), Value::Float(v));
    }
}

#[test]
fn continuous_across_interval_boundaries() {
    let p = AnimatedParam::new(vec![
        Keyframe::new(0.0, 0.0),
        Keyframe::eased(1.0, 1.0, Easing::QuadraticIn),
        Keyframe::eased(2.0, 5.0, Easing::SinusOut),
    ])
    .unwrap();
    let eps = 1e-7;
    for t in [1.0, 2.0] {
        let before = p.evaluate(t - eps).as_float().unwrap();
        let after = p.evaluate(t + eps).as_float().unwrap();
        assert!((before - after).abs() < 1e-4, "jump at {t}");
    }
}

#[test]
fn destination_keyframe_easing_shapes_the_interval() {
    let p = AnimatedParam::new(vec![
        Keyframe::eased(0.0, 0.0, Easing::Linear),
        Keyframe::eased(1.0, 1.0, Easing::QuadraticIn),
    ])
    .unwrap();
    assert_eq!(p.evaluate(0.5), Value::Float(0.25));

    let first_ignored = AnimatedParam::new(vec![
        Keyframe::eased(0.0, 0.0, Easing::QuadraticIn),
        Keyframe::eased(1.0, 1.0, Easing::Linear),
    ])
    .unwrap();
    assert_eq!(first_ignored.evaluate(0.5), Value::Float(0.5));
}

#[test]
fn single_keyframe_is_constant() {
    let p = float_param(&[(2.0, 7.0)]);
    for t in [0.0, 2.0, 9.0] {
        assert_eq!(p.evaluate(t), Value::Float(7.0));
    }
}

#[test]
fn rejects_malformed_keyframes() {
    assert!(AnimatedParam::new(vec![]).is_err());
    // Zero-length interval.
    assert!(AnimatedParam::new(vec![Keyframe::new(1.0, 0.0), Keyframe::new(1.0, 2.0)]).is_err());
    assert!(AnimatedParam::new(vec![Keyframe::new(2.0, 0.0), Keyframe::new(1.0, 2.0)]).is_err());
    assert!(AnimatedParam::new(vec![Keyframe::new(-1.0, 0.0)]).is_err());
    assert!(AnimatedParam::new(vec![Keyframe::new(0.0, 0.0), Keyframe::new(1.0, Vec3::ONE)]).is_err());
    assert!(AnimatedParam::new(vec![Keyframe::new(0.0, 4_i32)]).is_err());
}

#[test]
fn buffer_keyframes_must_share_length() {
    let err = AnimatedParam::new(vec![
        Keyframe::new(0.0, vec![0.0_f32, 1.0]),
        Keyframe::new(1.0, vec![0.0_f32, 1.0, 2.0]),
    ])
    .unwrap_err();
    assert!(err.to_string().contains("animation error:"));
    assert!(AnimatedParam::new(vec![Keyframe::new(0.0, Vec::<f32>::new())]).is_err());

    let ok = AnimatedParam::new(vec![
        Keyframe::new(0.0, vec![0.0_f32, 2.0]),
        Keyframe::new(1.0, vec![1.0_f32, 4.0]),
    ])
    .unwrap();
    assert_eq!(ok.buffer_len(), Some(2));
    assert_eq!(ok.evaluate(0.5), Value::Buffer(vec![0.5, 3.0]));
}

#[test]
fn quaternion_keyframes_slerp() {
    let p = AnimatedParam::new(vec![
        Keyframe::new(0.0, Quat::IDENTITY),
        Keyframe::new(1.0, Quat::from_rotation_z(std::f32::consts::FRAC_PI_2)),
    ])
    .unwrap();
    let mid = p.evaluate(0.5).as_quat().unwrap();
    assert!(mid.abs_diff_eq(Quat::from_rotation_z(std::f32::consts::FRAC_PI_4), 1e-5));
}

#[test]
fn deserialization_revalidates() {
    let good: AnimatedParam = serde_json::from_str(
        r#"[{"time":0.0,"value":{"type":"float","value":0.0}},
            {"time":1.0,"value":{"type":"float","value":90.0},"easing":"exp_in_out"}]"#,
    )
    .unwrap();
    assert_eq!(good.keyframes()[1].easing, Easing::ExpInOut);

    let bad = serde_json::from_str::<AnimatedParam>(
        r#"[{"time":1.0,"value":{"type":"float","value":0.0}},
            {"time":0.5,"value":{"type":"float","value":1.0}}]"#,
    );
    assert!(bad.is_err());
}

#[test]
fn param_kind_check() {
    let p = Param::from(Vec3::Z);
    assert!(p.expect_kind(crate::animation::value::ValueKind::Vec3, "axis").is_ok());
    assert!(p.expect_kind(crate::animation::value::ValueKind::Float, "angle").is_err());
}

use super::*;

#[test]
fn defaults_match_fixed_function_pipeline() {
    let s = DrawState::default();
    assert!(!s.blend.enabled);
    assert_eq!(s.color_write_mask, 0b1111);
    assert!(!s.depth.test);
    assert!(s.depth.write);
    assert_eq!(s.stencil.func, CompareFunc::Always);
    assert_eq!(s.cull, None);
    assert_eq!(s.scissor, None);
}

#[test]
fn empty_override_is_identity() {
    let base = DrawStateOverride::alpha_blend().apply(&DrawState::default());
    assert!(DrawStateOverride::default().is_empty());
    assert_eq!(DrawStateOverride::default().apply(&base), base);
}

#[test]
fn cull_mode_only_applies_when_enabled() {
    let base = DrawState::default();
    let mode_only = DrawStateOverride {
        cull_face_mode: Some(CullMode::Front),
        ..Default::default()
    };
    assert_eq!(mode_only.apply(&base).cull, None);

    let enabled = DrawStateOverride {
        cull_face: Some(true),
        ..Default::default()
    }
    .apply(&base);
    assert_eq!(enabled.cull, Some(CullMode::Back));
    assert_eq!(mode_only.apply(&enabled).cull, Some(CullMode::Front));

    let disabled = DrawStateOverride {
        cull_face: Some(false),
        ..Default::default()
    };
    assert_eq!(disabled.apply(&enabled).cull, None);
}

#[test]
fn scissor_override() {
    let rect = Scissor::new(0, 8, 32, 24);
    let on = DrawStateOverride {
        scissor_test: Some(true),
        scissor: Some(rect),
        ..Default::default()
    }
    .apply(&DrawState::default());
    assert_eq!(on.scissor, Some(rect));
}

#[test]
fn write_mask_is_truncated_to_rgba() {
    let s = DrawStateOverride {
        color_write_mask: Some(0xff),
        ..Default::default()
    }
    .apply(&DrawState::default());
    assert_eq!(s.color_write_mask, 0b1111);
}

#[test]
fn override_json_omits_unset_fields() {
    let json = serde_json::to_string(&DrawStateOverride {
        blend: Some(true),
        ..Default::default()
    })
    .unwrap();
    assert_eq!(json, r#"{"blend":true}"#);
    let back: DrawStateOverride = serde_json::from_str(&json).unwrap();
    assert_eq!(back.blend, Some(true));
    assert!(back.depth_test.is_none());
}

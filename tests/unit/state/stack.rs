use super::*;
use crate::state::draw_state::{BlendFactor, CullMode};

#[test]
fn push_pop_restores_previous_top() {
    let mut s = DrawStateStack::default();
    let base = *s.top();
    s.push(&DrawStateOverride::alpha_blend());
    assert!(s.top().blend.enabled);
    assert_eq!(s.depth(), 1);
    s.pop().unwrap();
    assert_eq!(*s.top(), base);
    assert_eq!(s.depth(), 0);
}

#[test]
fn nested_scopes_override_only_set_fields() {
    let mut s = DrawStateStack::default();
    s.push(&DrawStateOverride::alpha_blend());
    s.push(&DrawStateOverride {
        cull_face: Some(true),
        cull_face_mode: Some(CullMode::Front),
        ..Default::default()
    });
    assert!(s.top().blend.enabled);
    assert_eq!(s.top().blend.dst_color, BlendFactor::OneMinusSrcAlpha);
    assert_eq!(s.top().cull, Some(CullMode::Front));
    s.pop().unwrap();
    assert_eq!(s.top().cull, None);
}

#[test]
fn base_cannot_be_popped() {
    let mut s = DrawStateStack::default();
    assert!(s.pop().is_err());
    assert_eq!(s.depth(), 0);
}

#[test]
fn scoped_pops_on_error() {
    let mut s = DrawStateStack::default();
    let r: crate::foundation::error::TrellisResult<()> =
        s.scoped(&DrawStateOverride::alpha_blend(), |inner| {
            assert_eq!(inner.depth(), 1);
            inner.scoped(&DrawStateOverride::default(), |_| {
                Err(crate::foundation::error::TrellisError::resource("boom"))
            })
        });
    assert!(r.is_err());
    assert_eq!(s.depth(), 0);
    assert!(!s.top().blend.enabled);
}

#[test]
fn scoped_repairs_leaked_scopes() {
    let mut s = DrawStateStack::default();
    let r = s.scoped(&DrawStateOverride::default(), |inner| {
        inner.push(&DrawStateOverride::alpha_blend());
        Ok(())
    });
    assert!(r.is_err());
    assert_eq!(s.depth(), 0);
}

#[test]
fn scoped_in_hands_the_whole_context_to_the_body() {
    struct Walk {
        states: DrawStateStack,
        seen: Vec<usize>,
    }
    let mut w = Walk {
        states: DrawStateStack::default(),
        seen: Vec::new(),
    };
    let r: crate::foundation::error::TrellisResult<()> = DrawStateStack::scoped_in(
        &mut w,
        |w| &mut w.states,
        &DrawStateOverride::alpha_blend(),
        |w| {
            w.seen.push(w.states.depth());
            Err(crate::foundation::error::TrellisError::resource("boom"))
        },
    );
    assert!(r.is_err());
    assert_eq!(w.seen, vec![1]);
    assert_eq!(w.states.depth(), 0);
}

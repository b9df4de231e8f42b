use super::*;

#[test]
fn endpoints_are_exact_for_every_easing() {
    for e in Easing::ALL {
        assert!(e.apply(0.0).abs() < 1e-9, "{e:?} at 0 = {}", e.apply(0.0));
        assert!(
            (e.apply(1.0) - 1.0).abs() < 1e-9,
            "{e:?} at 1 = {}",
            e.apply(1.0)
        );
    }
}

#[test]
fn input_is_clamped() {
    for e in Easing::ALL {
        assert_eq!(e.apply(-3.0), e.apply(0.0));
        assert_eq!(e.apply(7.0), e.apply(1.0));
        assert_eq!(e.apply(f64::NAN), e.apply(0.0));
    }
}

#[test]
fn monotonic_families_do_not_decrease() {
    for e in Easing::ALL.into_iter().filter(|e| e.is_monotonic()) {
        let mut prev = e.apply(0.0);
        for i in 1..=100 {
            let v = e.apply(f64::from(i) / 100.0);
            assert!(v + 1e-12 >= prev, "{e:?} decreased at step {i}");
            prev = v;
        }
    }
}

#[test]
fn in_out_is_symmetric_about_midpoint() {
    for e in [
        Easing::QuadraticInOut,
        Easing::CubicInOut,
        Easing::SinusInOut,
        Easing::ExpInOut,
    ] {
        assert!((e.apply(0.5) - 0.5).abs() < 1e-9);
        let a = e.apply(0.2);
        let b = e.apply(0.8);
        assert!((a + b - 1.0).abs() < 1e-9, "{e:?}");
    }
}

#[test]
fn names_are_snake_case_on_the_wire() {
    let s = serde_json::to_string(&Easing::ExpInOut).unwrap();
    assert_eq!(s, "\"exp_in_out\"");
    let e: Easing = serde_json::from_str("\"quadratic_out_in\"").unwrap();
    assert_eq!(e, Easing::QuadraticOutIn);
}

use super::*;

fn ranges(cmds: Vec<RangeCommand>) -> TimeRanges {
    TimeRanges::new(cmds).unwrap()
}

#[test]
fn noop_cont_noop_window() {
    let r = ranges(vec![
        RangeCommand::noop(0.0),
        RangeCommand::cont(2.0),
        RangeCommand::noop(5.0),
    ]);
    assert!(!r.is_live(1.0));
    assert!(r.is_live(2.0));
    assert!(r.is_live(3.0));
    assert!(!r.is_live(5.0));
    assert!(!r.is_live(50.0));
}

#[test]
fn inactive_before_first_command() {
    let r = ranges(vec![RangeCommand::cont(1.5)]);
    assert!(!r.is_live(0.0));
    assert!(r.is_live(1.5));
    assert!(ranges(vec![]).liveness(3.0) == Liveness::Inactive);
}

#[test]
fn repeated_queries_are_pure() {
    let r = ranges(vec![
        RangeCommand::noop(0.0),
        RangeCommand::cont(2.0),
        RangeCommand::noop(5.0),
        RangeCommand::cont(7.0),
    ]);
    let times = [6.0, 1.0, 7.5, 3.0, 6.0, 0.0, 7.5];
    let first: Vec<bool> = times.iter().map(|&t| r.is_live(t)).collect();
    let mut reversed: Vec<bool> = times.iter().rev().map(|&t| r.is_live(t)).collect();
    reversed.reverse();
    assert_eq!(first, reversed);
    assert_eq!(first, vec![false, false, true, true, false, false, true]);
}

#[test]
fn later_command_wins_on_equal_times() {
    let r = ranges(vec![RangeCommand::cont(1.0), RangeCommand::noop(1.0)]);
    assert!(!r.is_live(1.0));
    assert_eq!(r.active_command(1.0).unwrap().kind, RangeKind::Noop);
}

#[test]
fn prefetch_window_precedes_cont() {
    let r = TimeRanges::with_prefetch_time(
        vec![RangeCommand::noop(0.0), RangeCommand::cont(2.0), RangeCommand::noop(5.0)],
        0.5,
    )
    .unwrap();
    assert_eq!(r.liveness(1.0), Liveness::Inactive);
    assert_eq!(r.liveness(1.5), Liveness::Prefetch);
    assert_eq!(r.liveness(1.9), Liveness::Prefetch);
    assert_eq!(r.liveness(2.0), Liveness::Active);
    assert_eq!(r.liveness(5.0), Liveness::Inactive);
}

#[test]
fn rejects_unordered_or_negative_times() {
    assert!(TimeRanges::new(vec![RangeCommand::cont(2.0), RangeCommand::noop(1.0)]).is_err());
    assert!(TimeRanges::new(vec![RangeCommand::cont(-1.0)]).is_err());
    assert!(TimeRanges::with_prefetch_time(vec![], -1.0).is_err());
}

#[test]
fn json_defaults_prefetch_and_validates() {
    let r: TimeRanges = serde_json::from_str(
        r#"{"commands":[{"time":0.0,"kind":"noop"},{"time":2.0,"kind":"cont"}]}"#,
    )
    .unwrap();
    assert_eq!(r.prefetch_time(), DEFAULT_PREFETCH_TIME);
    assert!(r.is_live(2.0));

    let bad = serde_json::from_str::<TimeRanges>(
        r#"{"commands":[{"time":3.0,"kind":"noop"},{"time":2.0,"kind":"cont"}]}"#,
    );
    assert!(bad.is_err());
}

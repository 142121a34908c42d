use proptest::prelude::*;
use sr1e_engine::{
    parse_notation, roll, roll_opposed, Dice, DiceFault, DiceSource, Limits, RollResult, Scripted,
    ValidationError,
};

fn spec(text: &str) -> sr1e_engine::DiceSpec {
    parse_notation(text, &Limits::default()).unwrap()
}

fn spec_tn(text: &str, tn: u32) -> sr1e_engine::DiceSpec {
    spec(text).with_target_number(tn, &Limits::default()).unwrap()
}

#[test]
fn mocked_two_dice_total() {
    let mut src = Scripted::new(vec![5, 3]);
    let res = roll(&spec("2d6"), &Limits::default(), &mut src).unwrap();
    assert_eq!(res.rolls, vec![5, 3]);
    assert_eq!(res.total, 8);
    assert_eq!(res.successes, None);
    assert_eq!(res.exploded_count, 0);
}

#[test]
fn rolls_are_sorted_descending() {
    let mut src = Scripted::new(vec![1, 6, 3, 4]);
    let res = roll(&spec("4d6-2"), &Limits::default(), &mut src).unwrap();
    assert_eq!(res.rolls, vec![6, 4, 3, 1]);
    assert_eq!(res.total, 12);
}

#[test]
fn successes_count_exploded_sub_rolls() {
    // 6 explodes into 6, then 2; the other die shows 5.
    let mut src = Scripted::new(vec![6, 6, 2, 5]);
    let s = spec_tn("2d6!", 5);
    let res = roll(&s, &Limits::default(), &mut src).unwrap();
    assert_eq!(res.rolls, vec![6, 6, 5, 2]);
    assert_eq!(res.exploded_count, 2);
    assert_eq!(res.successes, Some(3));
}

#[test]
fn always_max_stops_at_the_cap() {
    let mut always_max = |_min: u32, max: u32| max;
    let limits = Limits { explosion_cap: 5, ..Limits::default() };
    let res = roll(&spec("3d6!"), &limits, &mut always_max).unwrap();
    assert_eq!(res.rolls.len(), 15);
    assert_eq!(res.exploded_count, 12);
    assert!(res.rolls.iter().all(|&r| r == 6));
}

#[test]
fn default_cap_is_a_hundred_draws_per_die() {
    let mut always_max = |_min: u32, max: u32| max;
    let res = roll(&spec("1d6!"), &Limits::default(), &mut always_max).unwrap();
    assert_eq!(res.rolls.len(), 100);
}

#[test]
fn out_of_range_source_is_fatal() {
    let mut broken = |_min: u32, _max: u32| 7;
    let err = roll(&spec("2d6"), &Limits::default(), &mut broken).unwrap_err();
    assert_eq!(err, DiceFault::OutOfRange { value: 7, max: 6 });

    let mut zero = |_min: u32, _max: u32| 0;
    assert!(roll(&spec("1d6"), &Limits::default(), &mut zero).is_err());
}

#[test]
fn opposed_may_go_negative() {
    let attacker = spec_tn("2d6", 5);
    let defender = spec_tn("3d6", 4);
    let mut src = Scripted::new(vec![5, 1, 6, 4, 4]);
    let res = roll_opposed(&attacker, &defender, &Limits::default(), &mut src).unwrap();
    assert_eq!(res.attacker.successes, Some(1));
    assert_eq!(res.defender.successes, Some(3));
    assert_eq!(res.net_successes, -2);
}

#[test]
fn attached_targets_share_the_typed_bounds() {
    let limits = Limits::default();
    assert_eq!(
        spec("2d6").with_target_number(1_000_000, &limits).unwrap_err(),
        ValidationError::TargetTooHigh { maximum: 999_999 }
    );
    assert_eq!(
        spec("2d6").with_target_number(0, &limits).unwrap_err(),
        ValidationError::NonPositiveTarget
    );
    let tight = Limits { max_target_number: 12, ..Limits::default() };
    assert!(spec("2d6").with_target_number(13, &tight).is_err());
    assert_eq!(spec("2d6").with_target_number(12, &tight).unwrap().target_number(), Some(12));
}

#[test]
fn disaster_and_failures() {
    let ones = RollResult::from_rolls(vec![1, 1, 1], 0, Some(4));
    assert!(ones.is_disaster());
    assert_eq!(ones.successes, Some(0));

    let mixed = RollResult::from_rolls(vec![2, 6, 1, 4], 0, Some(4));
    assert!(!mixed.is_disaster());
    assert_eq!(mixed.failures(4), vec![2, 1]);
    assert!(!RollResult::from_rolls(vec![], 0, None).is_disaster());
}

#[test]
fn seeded_rolls_repeat() {
    let s = spec("10d10+3");
    let a = roll(&s, &Limits::default(), &mut Dice::from_seed(99)).unwrap();
    let b = roll(&s, &Limits::default(), &mut Dice::from_seed(99)).unwrap();
    assert_eq!(a, b);
}

#[test]
fn trait_objects_work_too() {
    let mut boxed: Box<dyn DiceSource> = Box::new(Scripted::new(vec![2]));
    let res = roll(&spec("3d4"), &Limits::default(), boxed.as_mut()).unwrap();
    assert_eq!(res.total, 6);
}

proptest! {
    #[test]
    fn rolls_stay_in_bounds(
        seed in any::<u64>(),
        count in 1u32..=30,
        sides in 2u32..=100,
        modifier in -50i64..=50,
    ) {
        let text = format!("{count}d{sides}{modifier:+}");
        let s = spec(&text);
        let res = roll(&s, &Limits::default(), &mut Dice::from_seed(seed)).unwrap();
        prop_assert_eq!(res.rolls.len(), count as usize);
        prop_assert!(res.rolls.iter().all(|&r| (1..=sides).contains(&r)));
        prop_assert_eq!(res.total, res.rolls.iter().map(|&r| i64::from(r)).sum::<i64>() + modifier);
        prop_assert!(res.rolls.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn exploding_never_loses_dice(seed in any::<u64>(), count in 1u32..=20, tn in 1u32..=8) {
        let s = spec_tn(&format!("{count}d6!"), tn);
        let res = roll(&s, &Limits::default(), &mut Dice::from_seed(seed)).unwrap();
        prop_assert!(res.rolls.len() >= count as usize);
        prop_assert_eq!(res.rolls.len(), count as usize + res.exploded_count as usize);
        let expected = res.rolls.iter().filter(|&&r| r >= tn).count() as u32;
        prop_assert_eq!(res.successes, Some(expected));
    }

    #[test]
    fn opposed_net_is_a_difference(
        seed in any::<u64>(),
        a in 1u32..=12,
        d in 1u32..=12,
        tn in 2u32..=6,
    ) {
        let att = spec_tn(&format!("{a}d6"), tn);
        let def = spec_tn(&format!("{d}d6"), tn);
        let res = roll_opposed(&att, &def, &Limits::default(), &mut Dice::from_seed(seed)).unwrap();
        prop_assert_eq!(
            res.net_successes,
            i64::from(res.attacker.success_count()) - i64::from(res.defender.success_count())
        );
    }
}

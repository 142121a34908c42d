use sr1e_engine::karma::{reroll_cost, PERMANENT_COST_WARNING};
use sr1e_engine::{
    avoid_disaster, buy_karma_dice, buy_successes, reroll_failures, Error, KarmaLedger,
    KarmaRules, Limits, RollResult, RuleViolation, Scripted,
};

#[test]
fn ledger_spends_and_refuses() {
    let mut ledger = KarmaLedger::new(5);
    ledger.spend(3, "reroll").unwrap();
    assert_eq!(ledger.remaining(), 2);
    assert_eq!(
        ledger.spend(3, "too much"),
        Err(RuleViolation::NotEnoughKarma { needed: 3, remaining: 2 })
    );
    assert!(ledger.can_afford(2));
    assert!(!ledger.can_afford(3));
}

#[test]
fn refresh_keeps_permanent_costs() {
    let mut ledger = KarmaLedger::new(10);
    ledger.spend(4, "buy dice").unwrap();
    ledger.spend_permanent(3, "buy successes").unwrap();
    assert_eq!(ledger.remaining(), 3);
    assert_eq!(ledger.permanent_spent(), 3);

    ledger.refresh();
    assert_eq!(ledger.remaining(), 7);
    assert_eq!(ledger.permanent_spent(), 3);
    ledger.refresh();
    assert_eq!(ledger.remaining(), 7);
}

#[test]
fn history_is_ordered_and_restartable() {
    let mut ledger = KarmaLedger::new(10);
    ledger.spend(1, "first").unwrap();
    ledger.spend_permanent(2, "second").unwrap();
    ledger.spend(3, "third").unwrap();

    let history = ledger.history();
    let reasons: Vec<&str> = history.clone().map(|s| s.reason.as_str()).collect();
    assert_eq!(reasons, vec!["first", "second", "third"]);
    let total: u32 = history.map(|s| s.amount).sum();
    assert_eq!(total, 6);
    assert_eq!(ledger.history().filter(|s| s.permanent).count(), 1);
}

#[test]
fn reroll_cost_follows_iteration() {
    for iteration in 1..=5 {
        assert_eq!(reroll_cost(iteration), iteration);
    }
    assert!(reroll_cost(6) > reroll_cost(5));
}

#[test]
fn reroll_partitions_by_target() {
    let mut src = Scripted::new(vec![5, 2, 6, 4]);
    let out = reroll_failures(
        &[4, 3, 2, 1],
        5,
        1,
        false,
        &KarmaRules::default(),
        &Limits::default(),
        &mut src,
    )
    .unwrap();
    assert_eq!(out.karma_cost, 1);
    assert_eq!(out.rolls, vec![6, 5, 4, 2]);
    assert_eq!(out.new_successes, vec![6, 5]);
    assert_eq!(out.remaining_failures, vec![4, 2]);
    assert_eq!(src.draws(), 4);
}

#[test]
fn exploding_reroll() {
    let mut src = Scripted::new(vec![6, 3, 1]);
    let (rules, limits) = (KarmaRules::default(), Limits::default());
    let out = reroll_failures(&[2, 1], 4, 2, true, &rules, &limits, &mut src).unwrap();
    assert_eq!(out.karma_cost, 2);
    assert_eq!(out.rolls, vec![6, 3, 1]);
    assert_eq!(out.exploded_count, 1);
    assert_eq!(out.new_successes, vec![6]);
}

#[test]
fn reroll_faults() {
    let rules = KarmaRules::default();
    let limits = Limits::default();
    let mut src = Scripted::new(vec![3]);
    assert_eq!(
        reroll_failures(&[], 5, 1, false, &rules, &limits, &mut src),
        Err(Error::Rule(RuleViolation::NoFailuresToReroll))
    );
    assert_eq!(
        reroll_failures(&[2], 5, 0, false, &rules, &limits, &mut src),
        Err(Error::Rule(RuleViolation::InvalidIteration))
    );

    let capped = KarmaRules { max_reroll_iteration: Some(3), ..KarmaRules::default() };
    assert!(reroll_failures(&[2], 5, 3, false, &capped, &limits, &mut src).is_ok());
    assert_eq!(
        reroll_failures(&[2], 5, 4, false, &capped, &limits, &mut src),
        Err(Error::Rule(RuleViolation::RerollLimitReached { iteration: 4, maximum: 3 }))
    );
    assert!(reroll_failures(&[2], 5, 40, false, &rules, &limits, &mut src).is_ok());
}

#[test]
fn buying_dice() {
    let rules = KarmaRules::default();
    let limits = Limits::default();
    let mut src = Scripted::new(vec![5, 1, 6]);
    let bought = buy_karma_dice(3, 5, false, None, &rules, &limits, &mut src).unwrap();
    assert_eq!(bought.karma_cost, 3);
    assert_eq!(bought.rolls(), &[6, 5, 1]);
    assert_eq!(bought.successes(), 2);

    assert_eq!(
        buy_karma_dice(0, 5, false, None, &rules, &limits, &mut src),
        Err(Error::Rule(RuleViolation::MustBuyAtLeastOne))
    );
    assert_eq!(
        buy_karma_dice(21, 5, false, None, &rules, &limits, &mut src),
        Err(Error::Rule(RuleViolation::TooManyKarmaDice { maximum: 20 }))
    );
    assert_eq!(
        buy_karma_dice(4, 5, false, Some(3), &rules, &limits, &mut src),
        Err(Error::Rule(RuleViolation::TooManyKarmaDice { maximum: 3 }))
    );
}

#[test]
fn buying_successes_is_permanent() {
    let bought = buy_successes(2, 3).unwrap();
    assert_eq!(bought.karma_cost, 3);
    assert!(bought.permanent);
    assert_eq!(bought.total_successes, 5);
    assert_eq!(bought.warning, PERMANENT_COST_WARNING);

    assert_eq!(buy_successes(0, 1), Err(RuleViolation::RequiresNaturalSuccess));
    assert_eq!(buy_successes(1, 0), Err(RuleViolation::MustBuyAtLeastOne));
    assert_eq!(
        buy_successes(u32::MAX - 2, 3),
        Err(RuleViolation::TooManySuccesses { maximum: 2 })
    );
    assert_eq!(buy_successes(u32::MAX - 2, 2).unwrap().total_successes, u32::MAX);

    let mut ledger = KarmaLedger::new(6);
    ledger.charge(&bought).unwrap();
    ledger.refresh();
    assert_eq!(ledger.remaining(), 3);
}

#[test]
fn avoiding_disaster() {
    let ones = RollResult::from_rolls(vec![1, 1, 1, 1], 0, Some(4));
    let saved = avoid_disaster(&ones).unwrap();
    assert_eq!(saved.karma_cost, 1);
    assert_eq!(saved.successes, 0);
    assert!(!saved.disaster);
    assert!(!saved.can_reroll);
    assert!(saved.final_result);

    let meh = RollResult::from_rolls(vec![1, 2], 0, Some(4));
    assert_eq!(avoid_disaster(&meh), Err(RuleViolation::NotADisaster));
}

#[test]
fn charged_outcomes_land_in_history() {
    let mut ledger = KarmaLedger::new(4);
    let mut src = Scripted::new(vec![3]);
    let (rules, limits) = (KarmaRules::default(), Limits::default());
    let out = reroll_failures(&[2, 2], 4, 2, false, &rules, &limits, &mut src).unwrap();
    ledger.charge(&out).unwrap();
    let saved = avoid_disaster(&RollResult::from_rolls(vec![1], 0, None)).unwrap();
    ledger.charge(&saved).unwrap();
    assert_eq!(ledger.remaining(), 1);

    let reasons: Vec<String> = ledger.history().map(|s| s.reason.clone()).collect();
    assert_eq!(reasons, vec!["reroll #2".to_string(), "avoid disaster".to_string()]);
}

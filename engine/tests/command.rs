use sr1e_engine::{parse_roll_command, Limits, ValidationError};

fn cmd(text: &str) -> Result<sr1e_engine::RollCommand, ValidationError> {
    parse_roll_command(text, &Limits::default())
}

#[test]
fn plain_and_prefixed_commands() {
    let c = cmd("roll 2d6+5 tn4").unwrap();
    assert_eq!(c.notation, "2d6+5");
    assert_eq!(c.spec.target_number(), Some(4));

    let c = cmd("!ROLL 3d6").unwrap();
    assert_eq!(c.notation, "3d6");
    assert_eq!(c.spec.target_number(), None);
}

#[test]
fn notation_may_be_spread_over_tokens() {
    let c = cmd("roll 2d6 + 5 TN5").unwrap();
    assert_eq!(c.notation, "2d6+5");
    assert_eq!(c.spec.target_number(), Some(5));

    let c = cmd("roll tn6 4d6!").unwrap();
    assert_eq!(c.notation, "4d6!");
    assert!(c.spec.exploding());
}

#[test]
fn wrong_keyword() {
    assert!(matches!(cmd("rol 2d6"), Err(ValidationError::InvalidNotation(_))));
    assert!(matches!(cmd("2d6"), Err(ValidationError::InvalidNotation(_))));
}

#[test]
fn nothing_to_roll() {
    assert_eq!(cmd("roll"), Err(ValidationError::MustSpecifyDice));
    assert_eq!(cmd("roll tn4"), Err(ValidationError::MustSpecifyDice));
}

#[test]
fn target_clause_faults() {
    assert_eq!(cmd("roll 2d6 tn0"), Err(ValidationError::NonPositiveTarget));
    assert!(matches!(cmd("roll 2d6 tn-5"), Err(ValidationError::InvalidTarget(_))));
    assert!(matches!(cmd("roll 2d6 tn"), Err(ValidationError::InvalidTarget(_))));
    assert!(matches!(cmd("roll 2d6 tnx"), Err(ValidationError::InvalidTarget(_))));
    assert_eq!(cmd("roll 2d6 tn4.5"), Err(ValidationError::NonIntegerTarget));
    assert_eq!(
        cmd("roll 2d6 tn1000000"),
        Err(ValidationError::TargetTooHigh { maximum: 999_999 })
    );
    assert!(matches!(cmd("roll 2d6 tn4 tn5"), Err(ValidationError::InvalidTarget(_))));
}

#[test]
fn trailing_shell_syntax_is_a_bad_character() {
    assert_eq!(cmd("roll 2d6 && reboot"), Err(ValidationError::InvalidCharacter('&')));
    assert_eq!(cmd("roll 2d6 | cat"), Err(ValidationError::InvalidCharacter('|')));
}

#[test]
fn length_is_checked_first() {
    let long = format!("roll 2d6 {}", ";".repeat(250));
    assert_eq!(cmd(&long), Err(ValidationError::InputTooLong { maximum: 200 }));

    let exact = format!("roll {}", " ".repeat(191) + "2d6");
    assert_eq!(exact.chars().count(), 199);
    assert!(cmd(&exact).is_ok());
}

#[test]
fn custom_prefix_and_length() {
    let limits = Limits {
        command_prefix: "/".to_string(),
        max_command_length: 10,
        ..Limits::default()
    };
    assert_eq!(parse_roll_command("/roll 1d6", &limits).unwrap().notation, "1d6");
    assert_eq!(
        parse_roll_command("/roll 1d6+10", &limits),
        Err(ValidationError::InputTooLong { maximum: 10 })
    );
}

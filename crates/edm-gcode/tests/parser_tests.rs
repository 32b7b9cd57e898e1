//! Parser vectors for the fixed G/M-code dialect.

use edm_gcode::{parse, AxisArg, CmdKind, ParseError};

#[test]
fn g1_with_coordinates() {
    let cmd = parse("G1 X10.5 Y-20.3 Z5").unwrap();
    assert_eq!(cmd.kind, CmdKind::G);
    assert_eq!(cmd.code, 1);
    assert_eq!(cmd.sub_code, None);
    assert_eq!(cmd.x, AxisArg::Value(10.5));
    assert_eq!(cmd.y, AxisArg::Value(-20.3));
    assert_eq!(cmd.z, AxisArg::Value(5.0));
}

#[test]
fn g28_bare_axis() {
    let cmd = parse("G28 X").unwrap();
    assert_eq!(cmd.code, 28);
    assert_eq!(cmd.x, AxisArg::Bare);
    assert_eq!(cmd.y, AxisArg::Absent);
    assert_eq!(cmd.z, AxisArg::Absent);
}

#[test]
fn m3_without_parameters() {
    let cmd = parse("M3").unwrap();
    assert_eq!(cmd.kind, CmdKind::M);
    assert_eq!(cmd.code, 3);
    assert_eq!(cmd.p, None);
    assert_eq!(cmd.q, None);
    assert_eq!(cmd.r, None);
}

#[test]
fn m3_with_all_parameters() {
    let cmd = parse("M3 P750 Q1.5 R30").unwrap();
    assert_eq!(cmd.p, Some(750.0));
    assert_eq!(cmd.q, Some(1.5));
    assert_eq!(cmd.r, Some(30.0));
}

#[test]
fn m4_with_partial_parameters() {
    let cmd = parse("M4 Q2.0 R25").unwrap();
    assert_eq!(cmd.code, 4);
    assert_eq!(cmd.p, None);
    assert_eq!(cmd.q, Some(2.0));
    assert_eq!(cmd.r, Some(25.0));
}

#[test]
fn m10_feed_rate() {
    let cmd = parse("M10 R120").unwrap();
    assert_eq!(cmd.code, 10);
    assert_eq!(cmd.r, Some(120.0));
}

#[test]
fn code_range() {
    assert_eq!(parse("G999").unwrap().code, 999);
    assert_eq!(parse("G1000"), Err(ParseError::BadCode));
    assert_eq!(parse("G-1"), Err(ParseError::BadCode));
    assert_eq!(parse("G"), Err(ParseError::BadCode));
}

#[test]
fn sub_code_range() {
    assert_eq!(parse("G38.9").unwrap().sub_code, Some(9));
    assert_eq!(parse("G38.10"), Err(ParseError::BadSubCode));
    assert_eq!(parse("G38."), Err(ParseError::BadSubCode));
}

#[test]
fn scalar_requires_value() {
    assert_eq!(parse("M3 P"), Err(ParseError::MissingValue('P')));
}

#[test]
fn unknown_letter_rejects_line() {
    assert_eq!(parse("G0 X1 W2"), Err(ParseError::UnknownParameter('W')));
}

#[test]
fn malformed_value_rejects_line() {
    assert_eq!(parse("G0 X1.2.3"), Err(ParseError::BadValue('X')));
    assert_eq!(parse("M3 Qfast"), Err(ParseError::BadValue('Q')));
}

#[test]
fn empty_and_whitespace() {
    assert_eq!(parse(""), Err(ParseError::Empty));
    assert_eq!(parse("   "), Err(ParseError::Empty));
}

#[test]
fn extra_whitespace_between_tokens() {
    let cmd = parse("G0   X1.5    Y2").unwrap();
    assert_eq!(cmd.x, AxisArg::Value(1.5));
    assert_eq!(cmd.y, AxisArg::Value(2.0));
}

/// Printing a parsed command and re-parsing it yields the same record.
#[test]
fn canonical_print_round_trip() {
    let lines = [
        "G0",
        "G38.2",
        "G0 X10.5 Y20.3",
        "G1 X-0.25 Z3",
        "G28 Y",
        "M3 P750 Q1.5 R30",
        "M5",
        "M10 R120",
    ];
    for line in lines {
        let cmd = parse(line).unwrap();
        let printed = cmd.to_string();
        assert_eq!(parse(&printed).unwrap(), cmd, "round-trip of {line:?}");
    }
}

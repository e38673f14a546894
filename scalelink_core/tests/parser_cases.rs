use proptest::prelude::*;
use rstest::rstest;
use scalelink_core::parser::{decode, extract_reading};

#[rstest]
#[case::status_sign_unit(b"ST,+0012.345kg\r\n".as_slice(), Some("0012.345"))]
#[case::gross_frame(b"ST,GS,+0001.500kg\r\n".as_slice(), Some("0001.500"))]
#[case::negative_weight_drops_sign(b"US,NT,-0000.120kg".as_slice(), Some("0000.120"))]
#[case::bare(b"3.14".as_slice(), Some("3.14"))]
#[case::first_of_two(b"1.5 then 2.5".as_slice(), Some("1.5"))]
#[case::control_bytes(b"\x02\x03noise".as_slice(), None)]
#[case::integer_only(b"ST,+0012kg".as_slice(), None)]
#[case::trailing_dot(b"12.".as_slice(), None)]
#[case::leading_dot(b".5".as_slice(), None)]
#[case::empty(b"".as_slice(), None)]
#[case::comma_decimal(b"12,5kg".as_slice(), None)]
fn extracts_first_decimal_token(#[case] frame: &[u8], #[case] expected: Option<&str>) {
    assert_eq!(extract_reading(frame), expected);
}

#[rstest]
fn non_ascii_digits_are_not_weights() {
    // Arabic-Indic digits around an ASCII dot.
    assert_eq!(extract_reading("١٢.٣٤".as_bytes()), None);
}

#[rstest]
fn decode_is_lossy_not_failing() {
    let text = decode(b"\xffST,+1.0kg");
    assert!(text.ends_with("ST,+1.0kg"));
}

proptest! {
    #[test]
    fn embedded_token_is_found(
        prefix in "[A-Za-z,+ ]{0,8}",
        int in "[0-9]{1,5}",
        frac in "[0-9]{1,4}",
        suffix in "[a-z\r\n]{0,4}",
    ) {
        let frame = format!("{prefix}{int}.{frac}{suffix}");
        let expected = format!("{int}.{frac}");
        prop_assert_eq!(extract_reading(frame.as_bytes()), Some(expected.as_str()));
    }

    #[test]
    fn token_is_always_digits_dot_digits(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        if let Some(tok) = extract_reading(&bytes) {
            let (a, b) = tok.split_once('.').unwrap();
            prop_assert!(!a.is_empty() && a.bytes().all(|c| c.is_ascii_digit()));
            prop_assert!(!b.is_empty() && b.bytes().all(|c| c.is_ascii_digit()));
        }
    }
}

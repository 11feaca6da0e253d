use imgbase::{
    floatconv::{eisel_lemire, hpd::HighPrecisionDecimal, parse_number_f64, render_number_f64},
    ParseNumberOptions, RenderNumberOptions,
};
use proptest::prelude::*;

const STYLES: [RenderNumberOptions; 3] = [
    RenderNumberOptions::DEFAULT,
    RenderNumberOptions::EXPONENT_ABSENT,
    RenderNumberOptions::EXPONENT_PRESENT,
];

fn render_shortest(x: f64, style: RenderNumberOptions) -> Vec<u8> {
    let mut buf = [0u8; 2048];
    let n = render_number_f64(
        &mut buf,
        x,
        0,
        style | RenderNumberOptions::JUST_ENOUGH_PRECISION,
    );
    assert!(n > 0, "{x:e} did not fit");
    buf[..n].to_vec()
}

fn finite_f64() -> impl Strategy<Value = f64> {
    prop_oneof![
        any::<u64>().prop_map(f64::from_bits),
        any::<f64>(),
        (1u64..1 << 52).prop_map(f64::from_bits),
    ]
    .prop_filter("finite", |x| x.is_finite())
}

proptest! {
    #[test]
    fn shortest_rendering_round_trips(x in finite_f64()) {
        for style in STYLES {
            let text = render_shortest(x, style);
            let parsed = parse_number_f64(&text, ParseNumberOptions::DEFAULT);
            prop_assert_eq!(
                parsed.map(f64::to_bits),
                Ok(x.to_bits()),
                "{}",
                String::from_utf8_lossy(&text)
            );
        }
    }

    #[test]
    fn parse_agrees_with_std(
        s in "[+-]?[0-9]{1,25}(\\.[0-9]{0,25})?([eE][+-]?[0-9]{1,3})?"
    ) {
        let expected: f64 = s.parse().unwrap();
        let ours = parse_number_f64(
            s.as_bytes(),
            ParseNumberOptions::ALLOW_MULTIPLE_LEADING_ZEROES,
        );
        prop_assert_eq!(ours.map(f64::to_bits), Ok(expected.to_bits()), "{}", s);
    }

    #[test]
    fn eisel_lemire_agrees_with_exact_conversion(
        man in 1u64..,
        exp10 in eisel_lemire::EXP10_MIN_INCL..=eisel_lemire::EXP10_MAX_INCL,
    ) {
        let text = format!("{man}e{exp10}");
        let mut h = HighPrecisionDecimal::parse(text.as_bytes(), ParseNumberOptions::DEFAULT)
            .unwrap();
        let exact = h.to_f64_exact(ParseNumberOptions::DEFAULT).unwrap();
        prop_assert_eq!(exact, text.parse::<f64>().unwrap());

        if let Some(bits) = eisel_lemire::eisel_lemire(man, exp10) {
            prop_assert_eq!(bits, exact.to_bits(), "{}", text);
        }
    }

    #[test]
    fn trimming_is_idempotent_and_lossless(
        digits in "[1-9][0-9]{0,40}0{0,20}",
        exp10 in -400i32..400,
    ) {
        let text = format!("{digits}e{exp10}");
        let original = HighPrecisionDecimal::parse(text.as_bytes(), ParseNumberOptions::DEFAULT)
            .unwrap();

        let mut once = original.clone();
        once.trim();
        let mut twice = once.clone();
        twice.trim();
        prop_assert_eq!(once.digits(), twice.digits());
        prop_assert_eq!(once.decimal_point(), twice.decimal_point());
        prop_assert_eq!(once.decimal_point(), original.decimal_point());
        prop_assert!(once.digits().last() != Some(&0));

        let value = |mut h: HighPrecisionDecimal| h.to_f64_exact(ParseNumberOptions::DEFAULT);
        prop_assert_eq!(value(once), value(original));
    }
}

#[test]
fn round_trips_at_the_edges() {
    let edges = [
        0.0,
        -0.0,
        f64::MIN_POSITIVE,
        f64::MAX,
        f64::MIN,
        f64::EPSILON,
        f64::from_bits(1),
        f64::from_bits(0x000F_FFFF_FFFF_FFFF),
        9007199254740993.0,
        0.1,
        1e23,
        5e-324,
    ];
    for x in edges {
        for style in STYLES {
            let text = render_shortest(x, style);
            assert_eq!(
                parse_number_f64(&text, ParseNumberOptions::DEFAULT).map(f64::to_bits),
                Ok(x.to_bits()),
                "{}",
                String::from_utf8_lossy(&text)
            );
        }
    }
}

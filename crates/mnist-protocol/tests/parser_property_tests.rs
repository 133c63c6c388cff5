use mnist_protocol::{parse_line, MNIST_PIXELS};
use mnist_test_support::record_line_with;
use proptest::prelude::*;

proptest! {
    #[test]
    fn arbitrary_text_never_panics(line in ".{0,2000}") {
        let _ = parse_line(&line);
    }

    #[test]
    fn well_formed_lines_round_trip(
        label in 0u8..10,
        pixels in prop::collection::vec(any::<u8>(), MNIST_PIXELS),
    ) {
        let record = parse_line(&record_line_with(label, &pixels)).unwrap().unwrap();
        prop_assert_eq!(record.label, label);
        prop_assert_eq!(&record.pixels[..], &pixels[..]);
    }

    #[test]
    fn wrong_field_counts_are_rejected(count in 0usize..MNIST_PIXELS) {
        let pixels = vec![0u8; count];
        prop_assert!(parse_line(&record_line_with(1, &pixels)).is_err());
    }
}

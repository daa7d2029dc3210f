//! Property tests over random chains and filters.

use popdb_core::query::compile_segment_selector;
use popdb_core::SegmentFilter;
use popdb_testkit::prelude::*;
use proptest::prelude::*;

proptest! {
    #![proptest_config(PropTestConfig::quick().to_proptest_config())]

    #[test]
    fn chains_match_model(ops in chain_sequence_strategy(1, 24)) {
        for backend in ALL_BACKENDS {
            let mut harness = ChainHarness::new(backend);
            for op in &ops {
                harness.apply(op);
            }
            harness.verify_reads();
            harness.verify_maps();
            harness.verify_listing();
        }
    }

    #[test]
    fn selector_compilation_is_deterministic(params in filter_params_strategy()) {
        let filter = SegmentFilter::parse(&params.to_query()).unwrap();
        let first = compile_segment_selector(&filter).unwrap();
        let second = compile_segment_selector(&filter).unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert!(!first.contains(r#""$in":[]"#));
        prop_assert!(!first.contains(r#""$all":[]"#));
    }

    #[test]
    fn stored_genesis_reads_back(segment in genesis_strategy()) {
        for backend in ALL_BACKENDS {
            let mut store = TestStore::memory(backend);
            let hash = store.put(&segment);
            prop_assert_eq!(store.get_segment(&hash.to_hex()).unwrap(), canonical(&segment));
        }
    }
}

use proptest::prelude::*;
use cliptalk_server::config::TextFilterConfig;
use cliptalk_server::intake::{clean_text, TextFilter};
use std::time::Instant;

mod common;
use common::*;

proptest! {
    #[test]
    fn test_clean_text_property(raw in "[a-z #*:/.]{0,60}") {
        let cleaned = clean_text(&raw);
        assert!(!cleaned.contains('#'));
        assert!(!cleaned.contains('*'));
        assert!(!cleaned.contains("://"));
        assert_eq!(cleaned.trim(), cleaned.as_str());
    }

    #[test]
    fn test_accepted_text_meets_thresholds(
        texts in prop::collection::vec("[a-z ]{0,30}", 1..20),
        min_len in 1usize..8,
    ) {
        let config = TextFilterConfig {
            min_text_length: min_len,
            min_space_ratio: 0.05,
            debounce_ms: 0,
        };
        let mut filter = TextFilter::new(config);
        let now = Instant::now();

        for raw in &texts {
            if let Ok(text) = filter.check(raw, now) {
                let length = text.chars().count();
                let spaces = text.chars().filter(|c| *c == ' ').count();
                assert!(length >= min_len);
                assert!(spaces as f64 / length as f64 >= 0.05);
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn test_delivery_order_property(count in 1usize..12, input_capacity in 1usize..4) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let config = config(input_capacity, 2);
            let pipeline = pipeline(&config, echo);
            start_worker(&pipeline);
            let mut listener = connect(&pipeline);

            let texts: Vec<String> = (0..count).map(|i| format!("item {}", i)).collect();
            let producer = {
                let input = pipeline.state.input.clone();
                let texts = texts.clone();
                tokio::spawn(async move {
                    for text in texts {
                        input.enqueue(text.into()).await;
                    }
                })
            };

            for text in &texts {
                assert_eq!(&listener.next_text().await, text);
                pipeline.state.session.advance();
            }
            producer.await.unwrap();

            let sizes = listener.depth_sizes("input-queue");
            assert!(sizes.iter().all(|size| *size <= input_capacity));
        });
    }
}

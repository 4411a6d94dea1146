#![no_main]
use libfuzzer_sys::fuzz_target;
use mandate_core::decision::Decision;
use mandate_core::traits::DecisionClassifier;
use mandate_engine::policy::classifier::ThresholdClassifier;

fuzz_target!(|data: &[u8]| {
    if let Ok(decision) = serde_json::from_slice::<Decision>(data) {
        let classifier = ThresholdClassifier::default();
        let level = classifier.classify(&decision);
        // same input, same level
        assert_eq!(level, classifier.explain(&decision).0);
    }
});

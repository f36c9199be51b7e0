#![no_main]
use libfuzzer_sys::fuzz_target;
use tunnel_policy::{PolicyEngine, PolicyEngineBuilder};

const POLICY: &str = r#"[
    [{"attribute":{"name":"user.role","type":"string"},"operator":"equal","value":["admin"]}],
    [{"attribute":{"name":"user.groups","type":"list"},"operator":"contain_at_least_one","value":["ops","sre"]},
     {"attribute":{"name":"device.flags","type":"list"},"operator":"not_contains","value":["quarantined"]}]
]"#;

// Trace and decision must agree for any input document
fuzz_target!(|input: &[u8]| {
    let fast = PolicyEngine::default();
    let full = PolicyEngineBuilder::new().short_circuit(false).build();

    let decision = fast.validate(POLICY, input);
    assert_eq!(decision, full.validate(POLICY, input));

    if let Ok(evaluation) = full.explain(POLICY, input) {
        assert_eq!(evaluation.matched, decision);
    }
});

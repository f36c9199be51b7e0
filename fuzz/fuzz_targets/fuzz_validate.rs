#![no_main]
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tunnel_policy::validate_tunnel_policy;

#[derive(Arbitrary, Debug)]
struct Payloads<'a> {
    policy: &'a [u8],
    input: &'a [u8],
}

// Arbitrary payloads must never panic and never match unless both decode
fuzz_target!(|payloads: Payloads<'_>| {
    let matched = validate_tunnel_policy(payloads.policy, payloads.input);

    if matched {
        assert!(tunnel_policy::parse_policy(payloads.policy).is_ok());
        assert!(tunnel_policy::parse_input(payloads.input).is_ok());
    }
});

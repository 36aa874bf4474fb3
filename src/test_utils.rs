//! Shared test utilities and arbitrary generators for property-based testing.

use proptest::prelude::*;

use crate::message::QueueMessage;
use crate::types::{BuildSpec, Environment, PackageName};

pub fn arb_environment() -> impl Strategy<Value = Environment> {
    prop_oneof![
        Just(Environment::Dev),
        Just(Environment::Test),
        Just(Environment::Prod),
    ]
}

pub fn arb_package_name() -> impl Strategy<Value = PackageName> {
    "[a-z][a-z0-9-]{0,30}".prop_map(PackageName::new)
}

pub fn arb_version() -> impl Strategy<Value = String> {
    "[0-9]{1,3}\\.[0-9]{1,3}\\.[0-9]{1,3}".prop_map(String::from)
}

pub fn arb_spec() -> impl Strategy<Value = BuildSpec> {
    (arb_package_name(), arb_environment(), arb_version())
        .prop_map(|(pkg, env, version)| BuildSpec::new(pkg, env, version))
}

pub fn arb_event_tag() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("event".to_string()),
        Just("queued".to_string()),
        Just("error".to_string()),
        Just("complete".to_string()),
        Just("ignored".to_string()),
    ]
}

pub fn arb_message() -> impl Strategy<Value = QueueMessage> {
    (
        arb_event_tag(),
        arb_package_name(),
        arb_environment(),
        arb_version(),
        prop::option::of("[a-zA-Z0-9 ]{1,40}"),
        prop::option::of(1u32..10),
    )
        .prop_map(|(event_type, pkg, env, version, message, total)| QueueMessage {
            event_type,
            pkg: Some(pkg.as_str().to_string()),
            name: None,
            version,
            env,
            message,
            details: None,
            total,
            error: None,
            locale: None,
        })
}

mod tests {
    use super::*;
    use crate::message::EventType;

    proptest! {
        #[test]
        fn generated_messages_round_trip(msg in arb_message()) {
            let json = serde_json::to_string(&msg).unwrap();
            let parsed: QueueMessage = serde_json::from_str(&json).unwrap();
            prop_assert_eq!(&msg, &parsed);
            prop_assert!(msg.spec().is_some());
            prop_assert!(EventType::from_tag(&msg.event_type).is_some());
        }
    }
}

//! Property tests for destination canonicalization and ingestion.

use courier_core::{read_notifications, Destination};
use proptest::prelude::*;

fn host() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,10}(\\.[a-z]{2,6}){1,2}"
}

fn path() -> impl Strategy<Value = String> {
    prop::collection::vec("[A-Za-z0-9_-]{1,8}", 0..4).prop_map(|segments| segments.join("/"))
}

proptest! {
    #[test]
    fn spelling_variants_share_identity(
        host in host(),
        path in path(),
        https in any::<bool>(),
        trailing_slashes in 0usize..3,
    ) {
        let scheme = if https { "https" } else { "http" };
        let default_port = if https { 443 } else { 80 };
        let canonical = Destination::parse(&format!("{scheme}://{host}/{path}")).unwrap();

        let shouted = format!(
            "{}://{}:{default_port}/{path}{}#frag",
            scheme.to_uppercase(),
            host.to_uppercase(),
            "/".repeat(trailing_slashes),
        );
        let variant = Destination::parse(&shouted).unwrap();

        prop_assert_eq!(&variant, &canonical);
        prop_assert_eq!(variant.as_str(), canonical.as_str());
    }

    #[test]
    fn canonical_form_is_a_fixed_point(host in host(), path in path()) {
        let once = Destination::parse(&format!("https://{host}/{path}/")).unwrap();
        let twice = Destination::parse(once.as_str()).unwrap();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn ingestion_preserves_row_count_and_order(ids in prop::collection::vec(0u32..10_000, 0..40)) {
        let mut input = String::from("URL,ORDER ID,NAME,EVENT\n");
        for id in &ids {
            input.push_str(&format!("https://example.com/{id},{id},name {id},event\n"));
        }

        let notifications = read_notifications(input.as_bytes()).unwrap();

        let read: Vec<String> =
            notifications.iter().map(|n| n.sequence_id.to_string()).collect();
        let expected: Vec<String> = ids.iter().map(ToString::to_string).collect();
        prop_assert_eq!(read, expected);
    }
}

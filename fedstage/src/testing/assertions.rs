//! Test assertions for datasets, run events and API responses.

use crate::data::{Dataset, Schema};
use crate::events::CollectingEventSink;
use crate::query::ApiResponse;

/// Asserts that every record of `key` ends with `tag`.
pub fn assert_tagged(dataset: &Dataset, key: &str, tag: &str) {
    let mut found = false;
    for value in dataset.get(key) {
        found = true;
        let last = value.values().last().and_then(|v| v.as_str());
        assert_eq!(
            last,
            Some(tag),
            "Expected record '{key}' to be tagged '{tag}', got {last:?}"
        );
    }
    assert!(found, "Expected dataset to contain key '{key}'");
}

/// Asserts that the dataset carries the prediction schema.
pub fn assert_predict_schema(dataset: &Dataset) {
    assert_eq!(
        dataset.schema(),
        &Schema::predict(),
        "Expected prediction schema, got {:?}",
        dataset.schema()
    );
}

/// Asserts the sink saw exactly these event kinds, in order.
pub fn assert_events(sink: &CollectingEventSink, expected: &[&str]) {
    let kinds = sink.kinds();
    assert_eq!(kinds, expected, "Unexpected run events: {kinds:?}");
}

/// Asserts the response carries `retcode`.
pub fn assert_retcode(response: &ApiResponse, retcode: i32) {
    assert_eq!(
        response.retcode, retcode,
        "Expected retcode {retcode}, got {} ({})",
        response.retcode, response.retmsg
    );
}

/// Asserts a successful "no data" response.
pub fn assert_no_data(response: &ApiResponse) {
    assert_retcode(response, 0);
    assert_eq!(response.retmsg, "no data");
}

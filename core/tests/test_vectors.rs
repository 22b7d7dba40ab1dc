//! Verify `build_request` and `normalize` against JSON test vectors stored in
//! `test-vectors/`.
//!
//! Each vector file describes inputs, expected requests, simulated responses,
//! and expected outcomes. JSON bodies are compared as parsed values so field
//! ordering cannot cause false negatives.

use fetch_core::{FetchError, HttpResponse, Normalizer, RequestSpec, ResponseOutcome};
use serde_json::Value;

fn pairs(value: &Value) -> Vec<(String, String)> {
    value
        .as_array()
        .map(|arr| {
            arr.iter()
                .map(|h| {
                    let h = h.as_array().unwrap();
                    (h[0].as_str().unwrap().to_string(), h[1].as_str().unwrap().to_string())
                })
                .collect()
        })
        .unwrap_or_default()
}

fn spec_from(input: &Value) -> RequestSpec {
    let mut spec = RequestSpec::new(input["target"].as_str().unwrap()).headers(pairs(&input["headers"]));
    if let Some(method) = input["method"].as_str() {
        spec = spec.method(method);
    }
    if let Some(body) = input.get("body") {
        spec = spec.body(body.clone());
    }
    spec
}

// ---------------------------------------------------------------------------
// Build
// ---------------------------------------------------------------------------

#[test]
fn build_test_vectors() {
    let raw = include_str!("../../test-vectors/build.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let n = Normalizer::new();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let result = n.build_request(&spec_from(&case["input"]));

        if let Some(expected_error) = case.get("expected_error") {
            let err = result.unwrap_err();
            match expected_error.as_str().unwrap() {
                "invalid_target" => assert_eq!(err, FetchError::InvalidTarget, "{name}"),
                other => panic!("unknown expected_error: {other}"),
            }
            continue;
        }

        let req = result.unwrap();
        let expected = &case["expected_request"];
        assert_eq!(req.method.as_str(), expected["method"].as_str().unwrap(), "{name}: method");
        assert_eq!(req.url, expected["url"].as_str().unwrap(), "{name}: url");
        assert_eq!(req.headers, pairs(&expected["headers"]), "{name}: headers");

        match (&expected["body"], req.body.as_deref()) {
            (Value::Null, body) => assert!(body.is_none(), "{name}: body should be None"),
            (Value::String(raw), body) => assert_eq!(body, Some(raw.as_str()), "{name}: raw body"),
            (json, Some(body)) => {
                let sent: Value = serde_json::from_str(body).unwrap();
                assert_eq!(&sent, json, "{name}: json body");
            }
            (_, None) => panic!("{name}: expected a body"),
        }
    }
}

// ---------------------------------------------------------------------------
// Normalize
// ---------------------------------------------------------------------------

#[test]
fn normalize_test_vectors() {
    let raw = include_str!("../../test-vectors/normalize.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let n = Normalizer::new();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let sim = &case["simulated_response"];
        let response = HttpResponse::new(
            sim["status"].as_u64().unwrap() as u16,
            sim["status_text"].as_str().unwrap(),
            sim["body"].as_str().unwrap(),
        );
        let result = n.normalize(response, case["key"].as_str());

        if let Some(expected_error) = case.get("expected_error") {
            let err = result.unwrap_err();
            match expected_error.as_str().unwrap() {
                "http" => {
                    let status = case["expected_status"].as_u64().unwrap() as u16;
                    assert_eq!(err.status(), Some(status), "{name}: status");
                    assert!(matches!(err, FetchError::Http { .. }), "{name}");
                }
                "parse" => assert!(matches!(err, FetchError::Parse(_)), "{name}"),
                other => panic!("unknown expected_error: {other}"),
            }
            continue;
        }

        let expected = &case["expected_result"];
        let outcome = result.unwrap();
        if let Some(text) = expected.get("text") {
            assert_eq!(outcome, ResponseOutcome::Text(text.as_str().unwrap().to_string()), "{name}");
        } else {
            assert_eq!(outcome, ResponseOutcome::Json(expected["json"].clone()), "{name}");
        }
    }
}

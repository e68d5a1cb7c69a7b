//! Tests for per-target payload transformation.

use super::*;
use crate::{TargetName, Url};
use serde_json::json;

fn mappers_target() -> TargetSpec {
    TargetSpec::mapped(
        TargetName::new("mappers").unwrap(),
        Url::parse("https://mappers.example.com/api/v1/ingest/uplink").unwrap(),
    )
}

fn dev_app_target() -> TargetSpec {
    TargetSpec::pass_through(
        TargetName::new("dev-app").unwrap(),
        Url::parse("https://dev.example.com/api/payloads").unwrap(),
    )
}

fn mapped_object(payload: serde_json::Value) -> serde_json::Value {
    let transformed = PayloadTransformer::new()
        .transform(&InboundPayload::new(payload), &mappers_target())
        .expect("mapping transform should succeed");

    transformed.to_value()["object"].clone()
}

mod pass_through {
    use super::*;

    #[test]
    fn test_pass_through_returns_payload_unchanged() {
        let payload = json!({
            "fCnt": 7,
            "tenantId": "kept-as-is",
            "object": { "accuracy": 10.6 }
        });

        let transformed = PayloadTransformer::new()
            .transform(&InboundPayload::new(payload.clone()), &dev_app_target())
            .unwrap();

        assert_eq!(transformed, TransformedPayload::PassThrough(payload));
    }

    #[test]
    fn test_pass_through_does_not_require_object() {
        let result = PayloadTransformer::new()
            .transform(&InboundPayload::new(json!({ "fCnt": 1 })), &dev_app_target());

        assert!(result.is_ok());
    }
}

mod mappers {
    use super::*;

    #[test]
    fn test_rounds_accuracy_and_altitude_and_copies_coordinates() {
        let object = mapped_object(json!({
            "object": {
                "accuracy": 10.6,
                "altitude": 199.4,
                "latitude": 40.7128,
                "longitude": -74.0060
            }
        }));

        assert_eq!(
            object,
            json!({
                "accuracy": 11,
                "altitude": 199,
                "latitude": 40.7128,
                "longitude": -74.0060
            })
        );
    }

    #[test]
    fn test_defaults_accuracy_and_altitude_when_absent() {
        let object = mapped_object(json!({
            "object": { "latitude": 51.5072, "longitude": -0.1276 }
        }));

        assert_eq!(
            object,
            json!({
                "accuracy": 2.5,
                "altitude": 2,
                "latitude": 51.5072,
                "longitude": -0.1276
            })
        );
    }

    #[test]
    fn test_null_measurements_are_defaulted() {
        let object = mapped_object(json!({
            "object": { "accuracy": null, "altitude": null, "latitude": 1.0, "longitude": 2.0 }
        }));

        assert_eq!(object["accuracy"], json!(2.5));
        assert_eq!(object["altitude"], json!(2));
    }

    #[test]
    fn test_rounding_is_half_up() {
        let object = mapped_object(json!({
            "object": { "accuracy": 2.5, "altitude": -2.5, "latitude": 0.0, "longitude": 0.0 }
        }));

        assert_eq!(object["accuracy"], json!(3));
        assert_eq!(object["altitude"], json!(-2));
    }

    #[test]
    fn test_rounding_is_exact_near_float_limits() {
        let object = mapped_object(json!({
            "object": {
                "accuracy": 0.49999999999999994,
                "altitude": 4503599627370497.0,
                "latitude": 0.0,
                "longitude": 0.0
            }
        }));

        assert_eq!(object["accuracy"], json!(0));
        assert_eq!(object["altitude"], json!(4503599627370497_i64));
    }

    #[test]
    fn test_integer_measurements_are_kept() {
        let object = mapped_object(json!({
            "object": { "accuracy": 10, "altitude": 200, "latitude": 0.0, "longitude": 0.0 }
        }));

        assert_eq!(object["accuracy"], json!(10));
        assert_eq!(object["altitude"], json!(200));
    }

    #[test]
    fn test_missing_coordinates_are_not_defaulted() {
        let object = mapped_object(json!({ "object": { "accuracy": 3.2 } }));

        assert_eq!(object, json!({ "accuracy": 3, "altitude": 2 }));
    }

    #[test]
    fn test_non_numeric_measurement_is_copied_verbatim() {
        let object = mapped_object(json!({
            "object": { "accuracy": "high", "altitude": 1.2, "latitude": 0.0, "longitude": 0.0 }
        }));

        assert_eq!(object["accuracy"], json!("high"));
    }

    #[test]
    fn test_copies_whitelisted_top_level_fields() {
        let transformed = PayloadTransformer::new()
            .transform(
                &InboundPayload::new(json!({
                    "deduplicationId": "abc",
                    "fCnt": 42,
                    "tenantName": "dropped",
                    "object": { "latitude": 1.0, "longitude": 2.0 }
                })),
                &mappers_target(),
            )
            .unwrap()
            .to_value();

        assert_eq!(transformed["deduplicationId"], json!("abc"));
        assert_eq!(transformed["fCnt"], json!(42));
        assert!(transformed.get("tenantName").is_none());
    }

    #[test]
    fn test_missing_object_is_a_transform_error() {
        let result = PayloadTransformer::new()
            .transform(&InboundPayload::new(json!({ "fCnt": 1 })), &mappers_target());

        assert_eq!(
            result,
            Err(TransformError::MissingField {
                field: "object".to_string()
            })
        );
    }

    #[test]
    fn test_non_object_object_field_is_a_transform_error() {
        let transformer = PayloadTransformer::new();

        for object in [json!([1, 2]), json!("somewhere")] {
            let result = transformer.transform(
                &InboundPayload::new(json!({ "object": object })),
                &mappers_target(),
            );

            assert_eq!(
                result,
                Err(TransformError::NotAnObject {
                    field: "object".to_string()
                })
            );
        }
    }

    #[test]
    fn test_null_object_is_missing() {
        let result = PayloadTransformer::new().transform(
            &InboundPayload::new(json!({ "object": null })),
            &mappers_target(),
        );

        assert!(matches!(result, Err(TransformError::MissingField { .. })));
    }
}

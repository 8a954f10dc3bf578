//! Object-created notifications and the object references they carry.
//!
//! Two shapes are accepted:
//! - a plain S3 notification (`Records[*].s3`)
//! - an SNS envelope whose `Records[*].Sns.Message` is the S3 notification
//!   serialized as a JSON string; it is unwrapped exactly one level.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

const S3_TEST_EVENT: &str = "s3:TestEvent";

/// A stored object to ingest. The key is URL-decoded.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ObjectRef {
    pub bucket: String,
    pub key: String,
}

#[derive(Debug, Error)]
pub enum EventError {
    #[error("notification is not valid json")]
    Json(#[from] serde_json::Error),
    #[error("record {index} is missing `{field}`")]
    MissingField { index: usize, field: &'static str },
    #[error("object key `{key}` is not valid percent-encoding")]
    KeyEncoding { key: String },
    #[error("notification has no `Records` and is not an s3 test event")]
    Unrecognized,
}

#[derive(Deserialize)]
struct Notification {
    #[serde(rename = "Records")]
    records: Option<Vec<NotificationRecord>>,
    #[serde(rename = "Event")]
    event: Option<String>,
}

#[derive(Deserialize)]
struct NotificationRecord {
    #[serde(rename = "Sns")]
    sns: Option<SnsMessage>,
    s3: Option<S3Entity>,
}

#[derive(Deserialize)]
struct SnsMessage {
    #[serde(rename = "Message")]
    message: String,
}

#[derive(Deserialize)]
struct S3Entity {
    bucket: S3Bucket,
    object: S3Object,
}

#[derive(Deserialize)]
struct S3Bucket {
    name: Option<String>,
}

#[derive(Deserialize)]
struct S3Object {
    key: Option<String>,
}

/// Resolve a notification payload into the objects it references.
///
/// An S3 test event resolves to no objects.
pub fn object_refs(payload: Value) -> Result<Vec<ObjectRef>, EventError> {
    let notification: Notification = serde_json::from_value(payload)?;
    resolve(notification, true)
}

fn resolve(notification: Notification, unwrap_sns: bool) -> Result<Vec<ObjectRef>, EventError> {
    let Some(records) = notification.records else {
        return match notification.event.as_deref() {
            Some(S3_TEST_EVENT) => Ok(Vec::new()),
            _ => Err(EventError::Unrecognized),
        };
    };

    let mut refs = Vec::with_capacity(records.len());
    for (index, record) in records.into_iter().enumerate() {
        match (record.sns, record.s3) {
            (Some(sns), _) if unwrap_sns => {
                let inner: Notification = serde_json::from_str(&sns.message)?;
                refs.extend(resolve(inner, false)?);
            }
            (_, Some(s3)) => {
                let bucket = s3
                    .bucket
                    .name
                    .ok_or(EventError::MissingField { index, field: "s3.bucket.name" })?;
                let raw_key = s3
                    .object
                    .key
                    .ok_or(EventError::MissingField { index, field: "s3.object.key" })?;
                refs.push(ObjectRef {
                    bucket,
                    key: decode_key(&raw_key)?,
                });
            }
            _ => return Err(EventError::MissingField { index, field: "s3" }),
        }
    }

    Ok(refs)
}

/// S3 notifications form-encode keys: `+` is a space, the rest is percent-encoded.
pub fn decode_key(raw: &str) -> Result<String, EventError> {
    urlencoding::decode(&raw.replace('+', " "))
        .map(|key| key.into_owned())
        .map_err(|_| EventError::KeyEncoding {
            key: raw.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn s3_notification(bucket: &str, key: &str) -> Value {
        json!({
            "Records": [{
                "eventVersion": "2.1",
                "eventSource": "aws:s3",
                "eventName": "ObjectCreated:Put",
                "s3": {
                    "s3SchemaVersion": "1.0",
                    "bucket": { "name": bucket, "arn": format!("arn:aws:s3:::{bucket}") },
                    "object": { "key": key, "size": 42 }
                }
            }]
        })
    }

    #[test]
    fn resolves_plain_s3_notification() {
        let refs = object_refs(s3_notification("cards", "data/cert-x/Intro.csv")).unwrap();
        assert_eq!(
            refs,
            vec![ObjectRef {
                bucket: "cards".into(),
                key: "data/cert-x/Intro.csv".into(),
            }]
        );
    }

    #[test]
    fn decodes_form_encoded_keys() {
        let refs = object_refs(s3_notification(
            "cards",
            "uploads/aws-solutions-architect/Networking+Basics%281%29.csv",
        ))
        .unwrap();
        assert_eq!(
            refs[0].key,
            "uploads/aws-solutions-architect/Networking Basics(1).csv"
        );
        assert_eq!(decode_key("a/b/1%2B1.csv").unwrap(), "a/b/1+1.csv");
    }

    #[test]
    fn unwraps_one_level_of_sns() {
        let inner = s3_notification("cards", "data/cert-x/Intro.csv").to_string();
        let envelope = json!({
            "Records": [{
                "EventSource": "aws:sns",
                "Sns": { "Type": "Notification", "Message": inner }
            }]
        });
        let refs = object_refs(envelope).unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].bucket, "cards");
        assert_eq!(refs[0].key, "data/cert-x/Intro.csv");
    }

    #[test]
    fn s3_test_event_has_no_objects() {
        let test_event = json!({
            "Service": "Amazon S3",
            "Event": "s3:TestEvent",
            "Bucket": "cards"
        });
        assert!(object_refs(test_event.clone()).unwrap().is_empty());

        let envelope = json!({
            "Records": [{ "Sns": { "Message": test_event.to_string() } }]
        });
        assert!(object_refs(envelope).unwrap().is_empty());
    }

    #[test]
    fn rejects_unknown_payloads() {
        assert!(matches!(
            object_refs(json!({ "hello": "world" })),
            Err(EventError::Unrecognized)
        ));
        assert!(matches!(object_refs(json!([1, 2])), Err(EventError::Json(_))));
        assert!(matches!(
            object_refs(json!({ "Records": [{ "Sns": { "Message": "not json" } }] })),
            Err(EventError::Json(_))
        ));
    }

    #[test]
    fn rejects_records_without_key() {
        let payload = json!({
            "Records": [{ "s3": { "bucket": { "name": "cards" }, "object": {} } }]
        });
        assert!(matches!(
            object_refs(payload),
            Err(EventError::MissingField { index: 0, field: "s3.object.key" })
        ));
    }

    #[test]
    fn rejects_bad_percent_encoding() {
        assert!(matches!(
            decode_key("data/cert-x/%FF%FE.csv"),
            Err(EventError::KeyEncoding { .. })
        ));
    }
}

use super::*;

#[test]
fn request_sets_fields() {
    let frame = Frame::request("feed.mount", Data::new());
    assert_eq!(frame.event, "feed.mount");
    assert_eq!(frame.status, Status::Request);
    assert!(frame.parent_id.is_none());
    assert!(frame.component_id.is_none());
    assert!(frame.ts > 0);
}

#[test]
fn reply_inherits_context() {
    let component_id = Uuid::new_v4();
    let req = Frame::request("feed.load_more", Data::new()).with_component_id(component_id);
    let done = req.done_with(Data::new());

    assert_eq!(done.parent_id, Some(req.id));
    assert_eq!(done.component_id, Some(component_id));
    assert_eq!(done.event, "feed.load_more");
    assert_ne!(done.id, req.id);
}

#[test]
fn done_with_carries_payload() {
    let req = Frame::request("feed.render", Data::new());
    let mut data = Data::new();
    data.insert("view".into(), serde_json::json!({"per_page": 5}));
    let done = req.done_with(data);

    assert_eq!(done.status, Status::Done);
    assert_eq!(done.parent_id, Some(req.id));
    assert!(done.data.contains_key("view"));
}

#[test]
fn status_serializes_lowercase() {
    assert_eq!(serde_json::to_string(&Status::Done).unwrap(), "\"done\"");
    let status: Status = serde_json::from_str("\"error\"").unwrap();
    assert_eq!(status, Status::Error);
}

#[test]
fn namespace_and_operation_extraction() {
    let frame = Frame::request("question.destroy", Data::new());
    assert_eq!(frame.namespace(), "question");
    assert_eq!(frame.operation(), "destroy");

    let frame = Frame::request("noseparator", Data::new());
    assert_eq!(frame.namespace(), "noseparator");
    assert_eq!(frame.operation(), "");
}

#[test]
fn inbound_json_without_optional_fields_parses() {
    let json = r#"{
        "id": "00000000-0000-0000-0000-000000000001",
        "parent_id": null,
        "ts": 1,
        "event": "feed.mount",
        "status": "request",
        "data": {"user_id": 7}
    }"#;
    let frame: Frame = serde_json::from_str(json).expect("deserialize");
    assert_eq!(frame.event, "feed.mount");
    assert!(frame.component_id.is_none());
    assert!(frame.from.is_none());
    assert_eq!(frame.data.get("user_id").and_then(serde_json::Value::as_i64), Some(7));
}

#[test]
fn data_str_reads_string_fields_only() {
    let frame = Frame::request("question.destroy", Data::new())
        .with_data("questionId", "abc")
        .with_data("count", 3);
    assert_eq!(frame.data_str("questionId"), Some("abc"));
    assert_eq!(frame.data_str("count"), None);
    assert_eq!(frame.data_str("missing"), None);
}

#[test]
fn error_from_typed() {
    #[derive(Debug, thiserror::Error)]
    #[error("not found")]
    struct NotFound;

    impl ErrorCode for NotFound {
        fn error_code(&self) -> &'static str {
            "E_NOT_FOUND"
        }
    }

    let req = Frame::request("feed.render", Data::new());
    let err = req.error_from(&NotFound);

    assert_eq!(err.status, Status::Error);
    assert_eq!(err.data_str("code"), Some("E_NOT_FOUND"));
    assert_eq!(err.data_str("message"), Some("not found"));
    assert_eq!(err.data.get("retryable").and_then(serde_json::Value::as_bool), Some(false));
}

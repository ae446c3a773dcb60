//! Airtable client tests

use super::client::page_params;
use super::*;
use serde_json::json;

fn request() -> ListRecordsRequest {
    ListRecordsRequest::new("appABC", "Orders")
        .with_view(Some("Grid view".to_string()))
        .with_filter(Some("{Status} = 'shipped'".to_string()))
        .with_fields(vec!["Name".to_string(), "Items".to_string()])
}

#[test]
fn test_page_params_first_page() {
    let params = page_params(&request(), None);

    assert!(params.contains(&("pageSize".to_string(), "100".to_string())));
    assert!(params.contains(&("view".to_string(), "Grid view".to_string())));
    assert!(params.contains(&(
        "filterByFormula".to_string(),
        "{Status} = 'shipped'".to_string()
    )));
    assert!(!params.iter().any(|(k, _)| k == "offset"));

    // fields[] repeats, one pair per field
    let fields: Vec<_> = params
        .iter()
        .filter(|(k, _)| k == "fields[]")
        .map(|(_, v)| v.as_str())
        .collect();
    assert_eq!(fields, vec!["Name", "Items"]);
}

#[test]
fn test_page_params_continuation() {
    let params = page_params(&request(), Some("itrNEXT/recLAST"));
    assert!(params.contains(&("offset".to_string(), "itrNEXT/recLAST".to_string())));
}

#[test]
fn test_page_params_minimal_request() {
    let params = page_params(&ListRecordsRequest::new("appABC", "Orders"), None);
    assert_eq!(params, vec![("pageSize".to_string(), "100".to_string())]);
}

#[test]
fn test_record_page_deserialization() {
    let page: RecordPage = serde_json::from_value(json!({
        "records": [
            {
                "id": "rec001",
                "createdTime": "2024-06-01T10:00:00.000Z",
                "fields": {"Name": "Widget", "Tags": ["a", "b"]}
            },
            {
                "id": "rec002",
                "fields": {}
            }
        ],
        "offset": "itrNEXT/rec002"
    }))
    .unwrap();

    assert_eq!(page.records.len(), 2);
    assert!(page.has_more());
    assert_eq!(page.records[0].id, "rec001");
    assert!(page.records[0].created_time.is_some());
    assert_eq!(page.records[0].fields["Name"], json!("Widget"));
    assert!(page.records[1].created_time.is_none());
}

#[test]
fn test_record_page_last_page() {
    let page: RecordPage = serde_json::from_value(json!({"records": []})).unwrap();
    assert!(!page.has_more());
    assert!(page.records.is_empty());
}

#[tokio::test]
async fn test_page_stream_follows_offsets_and_ends() {
    use async_trait::async_trait;
    use futures::TryStreamExt;
    use std::sync::Mutex;

    struct Scripted(Mutex<Vec<RecordPage>>);

    #[async_trait]
    impl RecordSource for Scripted {
        async fn fetch_page(
            &self,
            _request: &ListRecordsRequest,
            offset: Option<&str>,
        ) -> crate::error::Result<RecordPage> {
            let mut pages = self.0.lock().unwrap();
            // Only the continuation fetch carries the token.
            assert_eq!(offset.is_some(), pages.len() == 1);
            Ok(pages.remove(0))
        }
    }

    let source = Scripted(Mutex::new(vec![
        RecordPage {
            records: Vec::new(),
            offset: Some("next".to_string()),
        },
        RecordPage::default(),
    ]));
    let request = ListRecordsRequest::new("appABC", "Orders");

    let pages: Vec<RecordPage> = page_stream(&source, &request).try_collect().await.unwrap();
    assert_eq!(pages.len(), 2);
    assert!(pages[1].offset.is_none());
}

use reqwest::Client;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use the_watcher::clients::{
    AiError, AiIntegration, AiIntegrationClient, ChangeKind, Collection, EntityClient, EntityError,
    RestEntityClient, Sort,
};

fn entity_client(server: &MockServer) -> RestEntityClient {
    RestEntityClient::with_client(Client::new(), server.uri(), Some("chave".to_string()))
}

#[tokio::test]
async fn test_list_sends_sort_and_api_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/entities/FrotaACP"))
        .and(query_param("sort", "-created_date"))
        .and(header("api_key", "chave"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "m1", "modelo": "E16", "serie": "A1" },
            { "id": "m2", "modelo": "E20", "serie": "A2" }
        ])))
        .mount(&server)
        .await;

    let client = entity_client(&server);
    let records = client
        .list(Collection::Machines, Some(&Sort::newest_first()), None)
        .await
        .unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1]["serie"], "A2");
}

#[tokio::test]
async fn test_get_missing_record_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/entities/Pedido/nao-existe"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "not found" })))
        .mount(&server)
        .await;

    let client = entity_client(&server);
    let record = client.get(Collection::PartRequests, "nao-existe").await.unwrap();
    assert!(record.is_none());
}

#[tokio::test]
async fn test_create_publishes_change() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/entities/Notificacao"))
        .and(body_json(json!({ "message": "olá", "userId": "all" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "n1",
            "message": "olá",
            "userId": "all"
        })))
        .mount(&server)
        .await;

    let client = entity_client(&server);
    let mut changes = client.subscribe();
    let created = client
        .create(Collection::Notifications, json!({ "message": "olá", "userId": "all" }))
        .await
        .unwrap();
    assert_eq!(created["id"], "n1");

    let change = changes.recv().await.unwrap();
    assert_eq!(change.collection, Collection::Notifications);
    assert_eq!(change.kind, ChangeKind::Create);
    assert_eq!(change.id, "n1");
}

#[tokio::test]
async fn test_update_missing_record_maps_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/entities/FrotaACP/m9"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = entity_client(&server);
    let result = client
        .update(Collection::Machines, "m9", json!({ "prioridade": true }))
        .await;
    assert!(matches!(result, Err(EntityError::NotFound { .. })));
}

#[tokio::test]
async fn test_backend_error_message_is_kept() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/entities/OrdemServico"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "detail": "backend em baixo" })))
        .mount(&server)
        .await;

    let client = entity_client(&server);
    match client.list(Collection::ServiceOrders, None, None).await {
        Err(EntityError::Status { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "backend em baixo");
        }
        other => panic!("esperado erro de estado, obtido {:?}", other),
    }
}

#[tokio::test]
async fn test_ai_upload_and_extract() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/integration-endpoints/Core/UploadFile"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "file_url": "https://files.example/placa.jpg"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/integration-endpoints/Core/ExtractDataFromUploadedFile"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "output": { "modelo": "ETV 214", "serie": "ABC123", "ano": 2019 }
        })))
        .mount(&server)
        .await;

    let client = AiIntegrationClient::with_client(Client::new(), server.uri(), None);
    let url = client.upload_file("placa.jpg", vec![1, 2, 3]).await.unwrap();
    assert_eq!(url, "https://files.example/placa.jpg");

    let result = client.extract_data(&url, &json!({ "type": "object" })).await.unwrap();
    assert!(result.is_success());
    assert_eq!(result.output.unwrap()["serie"], "ABC123");
}

#[tokio::test]
async fn test_ai_unexpected_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/integration-endpoints/Core/UploadFile"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "url": "sem file_url" })))
        .mount(&server)
        .await;

    let client = AiIntegrationClient::with_client(Client::new(), server.uri(), None);
    let result = client.upload_file("placa.jpg", vec![0]).await;
    assert!(matches!(result, Err(AiError::UnexpectedResponse(_))));
}

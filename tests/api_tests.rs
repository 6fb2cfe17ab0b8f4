use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceExt;

use the_watcher::clients::{AiError, AiIntegration, ExtractionResult, InMemoryEntityClient};
use the_watcher::config::EnvironmentConfig;
use the_watcher::routes::create_router;
use the_watcher::state::AppState;

/// Integración de IA que siempre falla; los tests de API no la usan
struct OfflineAi;

#[async_trait]
impl AiIntegration for OfflineAi {
    async fn upload_file(&self, _file_name: &str, _bytes: Vec<u8>) -> Result<String, AiError> {
        Err(AiError::UnexpectedResponse("offline".to_string()))
    }

    async fn extract_data(&self, _file_url: &str, _json_schema: &Value) -> Result<ExtractionResult, AiError> {
        Err(AiError::UnexpectedResponse("offline".to_string()))
    }

    async fn invoke_llm(&self, _prompt: &str, _schema: &Value) -> Result<Value, AiError> {
        Err(AiError::UnexpectedResponse("offline".to_string()))
    }
}

struct TestApp {
    router: Router,
}

impl TestApp {
    fn new() -> Self {
        let mut profile_passwords = HashMap::new();
        profile_passwords.insert("admin".to_string(), bcrypt::hash("chefe", 4).unwrap());
        profile_passwords.insert("nuno".to_string(), bcrypt::hash("nuno123", 4).unwrap());
        profile_passwords.insert("joao".to_string(), bcrypt::hash("joao123", 4).unwrap());
        let config = EnvironmentConfig {
            technicians: vec!["nuno".to_string(), "joao".to_string()],
            profile_passwords,
            rate_limit_requests: 100,
            ..Default::default()
        };
        let state = AppState::new(config, Arc::new(InMemoryEntityClient::new()), Arc::new(OfflineAi));
        Self {
            router: create_router(state),
        }
    }

    async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.dispatch(request).await
    }

    async fn send_text(&self, method: Method, uri: &str, token: &str, body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(header::CONTENT_TYPE, "text/csv")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.dispatch(request).await
    }

    async fn dispatch(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
        };
        (status, body)
    }

    async fn login(&self, body: Value) -> String {
        let (status, response) = self.send(Method::POST, "/api/auth/profile", None, Some(body)).await;
        assert_eq!(status, StatusCode::OK, "login falhou: {}", response);
        response["data"]["token"].as_str().unwrap().to_string()
    }

    async fn login_admin(&self) -> String {
        self.login(json!({
            "email": "chefe@oficina.pt",
            "perfil": "admin",
            "password": "chefe"
        }))
        .await
    }

    async fn login_technician(&self, name: &str, password: &str) -> String {
        self.login(json!({
            "email": format!("{}@oficina.pt", name),
            "perfil": "tecnico",
            "nomeTecnico": name,
            "password": password
        }))
        .await
    }

    /// Crea una máquina y devuelve el bloque `data`
    async fn create_machine(&self, token: &str, body: Value) -> Value {
        let (status, response) = self.send(Method::POST, "/api/machines", Some(token), Some(body)).await;
        assert_eq!(status, StatusCode::OK, "criação falhou: {}", response);
        response["data"].clone()
    }

    async fn unread_count(&self, token: &str) -> u64 {
        let (status, response) = self
            .send(Method::GET, "/api/notifications/unread-count", Some(token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        response["data"]["count"].as_u64().unwrap()
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_profile_login_and_session() {
    let app = TestApp::new();

    let (status, _) = app
        .send(
            Method::POST,
            "/api/auth/profile",
            None,
            Some(json!({ "email": "chefe@oficina.pt", "perfil": "admin", "password": "errada" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send(
            Method::POST,
            "/api/auth/profile",
            None,
            Some(json!({
                "email": "x@oficina.pt",
                "perfil": "tecnico",
                "nomeTecnico": "desconhecido",
                "password": "x"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let token = app.login_technician("nuno", "nuno123").await;
    let (status, body) = app.send(Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["sessao"]["role"], "tecnico");
    assert_eq!(body["data"]["sessao"]["technician"], "nuno");
    assert_eq!(body["data"]["permissoes"]["deleteMachine"], false);
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = TestApp::new();

    let (status, _) = app.send(Method::GET, "/api/machines", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.send(Method::GET, "/api/machines", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_technician_permission_denials() {
    let app = TestApp::new();
    let admin = app.login_admin().await;
    let nuno = app.login_technician("nuno", "nuno123").await;

    let (status, _) = app
        .send(
            Method::POST,
            "/api/machines",
            Some(&nuno),
            Some(json!({ "modelo": "E16", "serie": "TEC001" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let created = app
        .create_machine(&admin, json!({ "modelo": "E16", "serie": "TEC002" }))
        .await;
    let id = created["maquina"]["id"].as_str().unwrap();

    let (status, _) = app.send(Method::DELETE, &format!("/api/machines/{}", id), Some(&nuno), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Não pode atribuir a outro técnico
    let (status, _) = app
        .send(
            Method::POST,
            &format!("/api/machines/{}/assign", id),
            Some(&nuno),
            Some(json!({ "tecnico": "joao" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.send(Method::GET, "/api/backup/json", Some(&nuno), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.send(Method::GET, "/api/reports/utilization", Some(&nuno), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_workflow_sets_and_clears_conclusion_date() {
    let app = TestApp::new();
    let admin = app.login_admin().await;
    let nuno = app.login_technician("nuno", "nuno123").await;

    let created = app
        .create_machine(&admin, json!({ "modelo": "RX20", "serie": "WF0001" }))
        .await;
    let id = created["maquina"]["id"].as_str().unwrap().to_string();
    assert_eq!(created["maquina"]["estado"], "a-fazer");

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/machines/{}/assign", id),
            Some(&nuno),
            Some(json!({ "tecnico": "nuno" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["estado"], "em-preparacao-nuno");
    assert_eq!(body["data"]["tecnico"], "nuno");
    assert!(!body["data"]["dataAtribuicao"].is_null());

    let (status, body) = app
        .send(Method::POST, &format!("/api/machines/{}/complete", id), Some(&nuno), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["estado"], "concluida-nuno");
    assert!(!body["data"]["dataConclusao"].is_null());

    // Conclusão geral só pelo admin
    let (status, _) = app
        .send(
            Method::POST,
            &format!("/api/machines/{}/complete", id),
            Some(&nuno),
            Some(json!({ "geral": true })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send(Method::POST, &format!("/api/machines/{}/return-to-queue", id), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["estado"], "a-fazer");
    assert!(body["data"]["tecnico"].is_null());
    assert!(body["data"]["dataConclusao"].is_null());
    assert_eq!(body["data"]["historico"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_rental_return_is_offered_for_known_serial() {
    let app = TestApp::new();
    let admin = app.login_admin().await;

    let rented = app
        .create_machine(
            &admin,
            json!({ "modelo": "ETV 214", "serie": "ABC123", "origem": "sts", "estado": "Em Aluguer" }),
        )
        .await;
    let rented_id = rented["maquina"]["id"].as_str().unwrap().to_string();
    assert!(!rented["maquina"]["dataInicioAluguer"].is_null());

    let (status, body) = app
        .send(
            Method::POST,
            "/api/machines",
            Some(&admin),
            Some(json!({ "modelo": "ETV 214", "serie": "ABC123" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["resultado"], "confirmarRetorno");
    assert_eq!(body["data"]["maquina"]["id"], rented_id.as_str());

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/machines/{}/confirm-return", rented_id),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["estado"], "Disponível");
    assert!(body["data"]["dataInicioAluguer"].is_null());
    let last = body["data"]["historico"].as_array().unwrap().last().unwrap().clone();
    assert_eq!(last["tipo"], "retorno_aluguer");

    // Só existe uma máquina com a série
    let (_, body) = app.send(Method::GET, "/api/machines?q=ABC123", Some(&admin), None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_duplicate_serial_conflict_and_override() {
    let app = TestApp::new();
    let admin = app.login_admin().await;

    let first = app
        .create_machine(&admin, json!({ "modelo": "E20", "serie": "DUP-77" }))
        .await;
    let first_id = first["maquina"]["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .send(
            Method::POST,
            "/api/machines",
            Some(&admin),
            Some(json!({ "modelo": "E20", "serie": "dup-77" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let second = app
        .create_machine(
            &admin,
            json!({ "modelo": "E20", "serie": "DUP-77", "permitirDuplicado": true }),
        )
        .await;
    assert_eq!(second["resultado"], "criada");
    let lineage = second["maquina"]["historicoCriacoes"].as_array().unwrap();
    assert_eq!(lineage.len(), 1);
    assert_eq!(lineage[0]["maquinaId"], first_id.as_str());
}

#[tokio::test]
async fn test_search_by_characteristic_synonym() {
    let app = TestApp::new();
    let admin = app.login_admin().await;

    app.create_machine(
        &admin,
        json!({ "modelo": "E16", "serie": "SRC001", "caracteristicas": { "corPneus": "Brancas" } }),
    )
    .await;
    app.create_machine(
        &admin,
        json!({ "modelo": "E16", "serie": "SRC002", "caracteristicas": { "corPneus": "Pretas" } }),
    )
    .await;

    let (status, body) = app
        .send(Method::GET, "/api/machines?q=rodas%20brancas", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let results = body["data"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["serie"], "SRC001");
}

#[tokio::test]
async fn test_part_requests_toggle_awaiting_parts() {
    let app = TestApp::new();
    let admin = app.login_admin().await;
    let nuno = app.login_technician("nuno", "nuno123").await;

    let created = app
        .create_machine(&admin, json!({ "modelo": "R14", "serie": "PEC001" }))
        .await;
    let machine_id = created["maquina"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .send(
            Method::POST,
            "/api/part-requests",
            Some(&nuno),
            Some(json!({ "maquinaId": machine_id })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let request_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["maquinaSerie"], "PEC001");

    let (_, body) = app
        .send(Method::GET, &format!("/api/machines/{}", machine_id), Some(&admin), None)
        .await;
    assert_eq!(body["data"]["aguardaPecas"], true);

    let (status, _) = app
        .send(
            Method::POST,
            &format!("/api/part-requests/{}/complete", request_id),
            Some(&nuno),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(
            Method::POST,
            &format!("/api/part-requests/{}/complete", request_id),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app
        .send(Method::GET, &format!("/api/machines/{}", machine_id), Some(&admin), None)
        .await;
    assert_eq!(body["data"]["aguardaPecas"], false);
}

#[tokio::test]
async fn test_notifications_unread_count() {
    let app = TestApp::new();
    let admin = app.login_admin().await;
    let nuno = app.login_technician("nuno", "nuno123").await;
    let joao = app.login_technician("joao", "joao123").await;

    let created = app
        .create_machine(&admin, json!({ "modelo": "E16", "serie": "NOT001" }))
        .await;
    let id = created["maquina"]["id"].as_str().unwrap().to_string();
    assert_eq!(app.unread_count(&nuno).await, 1);

    let (status, _) = app
        .send(
            Method::POST,
            &format!("/api/machines/{}/assign", id),
            Some(&admin),
            Some(json!({ "tecnico": "nuno" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.unread_count(&nuno).await, 2);
    assert_eq!(app.unread_count(&joao).await, 1);

    let (status, body) = app
        .send(Method::POST, "/api/notifications/read-all", Some(&nuno), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["count"], 2);
    assert_eq!(app.unread_count(&nuno).await, 0);
}

#[tokio::test]
async fn test_backup_json_round_trip() {
    let app = TestApp::new();
    let admin = app.login_admin().await;

    app.create_machine(&admin, json!({ "modelo": "E16", "serie": "BAK001" })).await;
    app.create_machine(&admin, json!({ "modelo": "E20", "serie": "BAK002" })).await;

    let (status, document) = app.send(Method::GET, "/api/backup/json", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(document["version"], "1.0");
    assert_eq!(document["data"]["machines"].as_array().unwrap().len(), 2);

    app.create_machine(&admin, json!({ "modelo": "E25", "serie": "BAK003" })).await;

    let (status, body) = app
        .send(Method::POST, "/api/backup/json", Some(&admin), Some(document))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["collections"][0]["deleted"], 3);
    assert_eq!(body["data"]["collections"][0]["created"], 2);

    let (_, body) = app.send(Method::GET, "/api/machines", Some(&admin), None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_csv_export_and_header_validation() {
    let app = TestApp::new();
    let admin = app.login_admin().await;
    app.create_machine(&admin, json!({ "modelo": "E16", "serie": "CSV001", "origem": "uts" }))
        .await;

    let (status, body) = app.send(Method::GET, "/api/backup/csv", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    let csv = body.as_str().unwrap();
    assert!(csv.starts_with("ID,Origem,Modelo,Serie"));
    assert!(csv.contains("CSV001"));

    let (status, _) = app
        .send_text(Method::POST, "/api/backup/csv", &admin, "Modelo,Ano\nE16,2020\n")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .send_text(
            Method::POST,
            "/api/backup/csv",
            &admin,
            "Origem,Modelo,Serie\nsts,E20,CSV002\nnova,,CSV003\n",
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["collections"][0]["created"], 1);
    assert_eq!(body["data"]["rejectedRows"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_service_order_board_and_assignment() {
    let app = TestApp::new();
    let admin = app.login_admin().await;
    let nuno = app.login_technician("nuno", "nuno123").await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/service-orders",
            Some(&admin),
            Some(json!({
                "modelo": "E16",
                "serie": "OS0001",
                "cliente": "Armazéns Silva",
                "prioridade": "alta",
                "tecnico": "nuno"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(app.unread_count(&nuno).await, 1);

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/service-orders/{}/move", id),
            Some(&nuno),
            Some(json!({ "status": "em-progresso" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["status"], "em-progresso");

    let (status, _) = app
        .send(Method::DELETE, &format!("/api/service-orders/{}", id), Some(&nuno), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_utilization_report_rejects_inverted_period() {
    let app = TestApp::new();
    let admin = app.login_admin().await;
    app.create_machine(&admin, json!({ "modelo": "E16", "serie": "REP001" })).await;

    let (status, body) = app
        .send(Method::GET, "/api/reports/utilization", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["frota"]["total"], 1);

    let (status, _) = app
        .send(
            Method::GET,
            "/api/reports/utilization?desde=2025-02-01&ate=2025-01-01",
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_deleting_last_part_request_clears_awaiting_parts() {
    let app = TestApp::new();
    let admin = app.login_admin().await;
    let nuno = app.login_technician("nuno", "nuno123").await;

    let created = app
        .create_machine(&admin, json!({ "modelo": "R14", "serie": "PEC002" }))
        .await;
    let machine_id = created["maquina"]["id"].as_str().unwrap().to_string();

    let mut request_ids = Vec::new();
    for _ in 0..2 {
        let (status, body) = app
            .send(
                Method::POST,
                "/api/part-requests",
                Some(&nuno),
                Some(json!({ "maquinaId": machine_id })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        request_ids.push(body["data"]["id"].as_str().unwrap().to_string());
    }

    let machine_uri = format!("/api/machines/{}", machine_id);
    let (status, _) = app
        .send(Method::DELETE, &format!("/api/part-requests/{}", request_ids[0]), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = app.send(Method::GET, &machine_uri, Some(&admin), None).await;
    assert_eq!(body["data"]["aguardaPecas"], true);

    let (status, _) = app
        .send(Method::DELETE, &format!("/api/part-requests/{}", request_ids[1]), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = app.send(Method::GET, &machine_uri, Some(&admin), None).await;
    assert_eq!(body["data"]["aguardaPecas"], false);
}

#[tokio::test]
async fn test_large_photo_reaches_extraction() {
    let app = TestApp::new();
    let nuno = app.login_technician("nuno", "nuno123").await;

    // ~3 MB de base64, acima do limite por omissão do axum
    let photo = "A".repeat(3 * 1024 * 1024);
    let (status, _) = app
        .send(
            Method::POST,
            "/api/extraction/image",
            Some(&nuno),
            Some(json!({ "imagemBase64": photo, "nomeFicheiro": "chapa.jpg" })),
        )
        .await;
    assert_ne!(status, StatusCode::PAYLOAD_TOO_LARGE);
    // Chega ao cliente de IA, que está offline
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_extraction_attempts_are_counted_by_server() {
    let app = TestApp::new();
    let nuno = app.login_technician("nuno", "nuno123").await;
    let body = json!({ "imagemBase64": "AQIDBA==", "nomeFicheiro": "chapa.jpg", "tentativa": 1 });

    for _ in 0..3 {
        let (status, _) = app
            .send(Method::POST, "/api/extraction/image", Some(&nuno), Some(body.clone()))
            .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }
    let (status, _) = app
        .send(Method::POST, "/api/extraction/image", Some(&nuno), Some(body))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_token_stops_working_after_logout() {
    let app = TestApp::new();
    let nuno = app.login_technician("nuno", "nuno123").await;

    let (status, _) = app.send(Method::GET, "/api/machines", Some(&nuno), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.send(Method::POST, "/api/auth/logout", Some(&nuno), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.send(Method::GET, "/api/machines", Some(&nuno), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.send(Method::GET, "/api/auth/me", Some(&nuno), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Nova sessão volta a funcionar
    let again = app.login_technician("nuno", "nuno123").await;
    let (status, _) = app.send(Method::GET, "/api/machines", Some(&again), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_deactivated_user_loses_access() {
    let app = TestApp::new();
    let admin = app.login_admin().await;
    let joao = app.login_technician("joao", "joao123").await;

    let (_, body) = app.send(Method::GET, "/api/auth/me", Some(&joao), None).await;
    let joao_id = body["data"]["sessao"]["userId"].as_str().unwrap().to_string();

    let (status, body) = app
        .send(
            Method::PATCH,
            &format!("/api/users/{}", joao_id),
            Some(&admin),
            Some(json!({ "ativo": false })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["ativo"], false);

    let (status, _) = app.send(Method::GET, "/api/auth/me", Some(&joao), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app
        .send(
            Method::POST,
            "/api/machines/nao-existe/observations",
            Some(&joao),
            Some(json!({ "texto": "Óleo a verter" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_csv_reimport_does_not_duplicate_fleet() {
    let app = TestApp::new();
    let admin = app.login_admin().await;
    app.create_machine(&admin, json!({ "modelo": "E16", "serie": "DUP001", "origem": "nova" }))
        .await;

    let (status, body) = app.send(Method::GET, "/api/backup/csv", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    let exported = body.as_str().unwrap().to_string();

    let (status, body) = app
        .send_text(Method::POST, "/api/backup/csv", &admin, &exported)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["collections"][0]["created"], 0);
    assert_eq!(body["data"]["rejectedRows"].as_array().unwrap().len(), 1);

    let (_, body) = app.send(Method::GET, "/api/machines", Some(&admin), None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

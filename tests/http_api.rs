//! HTTP contract over a live `may_minihttp` listener.
//!
//! Each test starts its own server on an ephemeral port with a fresh
//! in-memory store and talks to it with `ureq`.

use serde_json::{json, Value};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::time::{Duration, Instant};
use stockroom::http::server;
use stockroom::{Catalog, MemoryCatalog, ValidationRules};

struct TestServer {
    base: String,
}

impl TestServer {
    fn start() -> Self {
        let port = TcpListener::bind("127.0.0.1:0")
            .and_then(|l| l.local_addr())
            .unwrap()
            .port();
        let addr = format!("127.0.0.1:{port}");

        let catalog = Catalog::new(Arc::new(MemoryCatalog::new()), ValidationRules::default());
        // Never joined; the listener lives until the test binary exits.
        let _handle = server::start(catalog, &addr).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while TcpStream::connect(&addr).is_err() {
            assert!(Instant::now() < deadline, "server did not start on {addr}");
            std::thread::sleep(Duration::from_millis(20));
        }

        Self {
            base: format!("http://{addr}"),
        }
    }

    fn send(&self, method: &str, path: &str, body: Option<&str>) -> (u16, String) {
        let request = ureq::request(method, &format!("{}{}", self.base, path));
        let result = match body {
            Some(body) => request
                .set("Content-Type", "application/json")
                .send_string(body),
            None => request.call(),
        };
        match result {
            Ok(response) => (response.status(), response.into_string().unwrap()),
            Err(ureq::Error::Status(code, response)) => (code, response.into_string().unwrap()),
            Err(e) => panic!("{method} {path}: {e}"),
        }
    }

    fn get(&self, path: &str) -> (u16, String) {
        self.send("GET", path, None)
    }

    fn post(&self, path: &str, body: &Value) -> (u16, String) {
        self.send("POST", path, Some(&body.to_string()))
    }
}

fn message(body: &str) -> String {
    serde_json::from_str(body).unwrap()
}

#[test]
fn category_post_then_duplicate() {
    let server = TestServer::start();
    let body = json!({ "nome_categoria": "Processador" });

    let (status, text) = server.post("/categorias", &body);
    assert_eq!(status, 200);
    assert_eq!(message(&text), "Categoria cadastrada com sucesso");

    let (status, text) = server.post("/categorias", &body);
    assert_eq!(status, 400);
    assert_eq!(message(&text), "BAD_REQUEST: Categoria já cadastrada.");
}

#[test]
fn product_post_then_list_shows_its_category() {
    let server = TestServer::start();
    server.post("/categorias", &json!({ "nome_categoria": "Placa de vídeo" }));

    let (_, text) = server.get("/categorias");
    let listed: Value = serde_json::from_str(&text).unwrap();
    let category = &listed["result"][0];

    let (status, text) = server.post(
        "/produtos",
        &json!({
            "nome_produto": "RTX 4060",
            "preco": 2000,
            "estoque": 3,
            "categorias": [{ "id": category["id"], "nome_categoria": category["nome_categoria"] }],
        }),
    );
    assert_eq!(status, 200, "{text}");
    assert_eq!(message(&text), "Produto cadastrado com sucesso");

    let (status, text) = server.get("/produtos");
    assert_eq!(status, 200);
    let listed: Value = serde_json::from_str(&text).unwrap();
    let product = &listed["result"][0];
    assert_eq!(product["nome_produto"], "RTX 4060");
    assert_eq!(product["preco"], json!(2000.0));
    assert_eq!(product["estoque"], 3);
    assert_eq!(product["categorias"][0]["nome_categoria"], "Placa de vídeo");
    assert_eq!(product["fornecedores"], json!([]));
}

#[test]
fn invalid_bodies_are_bad_requests() {
    let server = TestServer::start();

    let (status, text) = server.send("POST", "/fornecedores", Some("{not json"));
    assert_eq!(status, 400);
    assert_eq!(message(&text), "BAD_REQUEST: Dados invalidos");

    let (status, _) = server.post(
        "/fornecedores",
        &json!({ "nome_empresa": "Kabum", "cnpj": "1234567890123" }),
    );
    assert_eq!(status, 400);

    let (status, _) = server.post(
        "/produtos",
        &json!({ "nome_produto": "Ryzen 5 5500", "preco": 600, "estoque": 1, "categorias": [] }),
    );
    assert_eq!(status, 400);
}

#[test]
fn supplier_duplicate_is_bad_request() {
    let server = TestServer::start();
    let body = json!({ "nome_empresa": "Terabyteshop", "cnpj": "28653659000166" });

    let (status, text) = server.post("/fornecedores", &body);
    assert_eq!(status, 200);
    assert_eq!(message(&text), "Fornecedor cadastrado com sucesso");

    let (status, text) = server.post("/fornecedores", &body);
    assert_eq!(status, 400);
    assert_eq!(message(&text), "BAD_REQUEST: Fornecedor já cadastrado");

    let (_, text) = server.get("/fornecedores");
    let listed: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(listed["result"].as_array().unwrap().len(), 1);
    assert_eq!(listed["result"][0]["produtos_fornecidos"], json!([]));
}

#[test]
fn routing_errors_and_health() {
    let server = TestServer::start();

    let (status, _) = server.get("/nada");
    assert_eq!(status, 404);

    let (status, _) = server.send("PUT", "/categorias", Some("{}"));
    assert_eq!(status, 405);

    let (status, text) = server.get("/health");
    assert_eq!(status, 200);
    assert_eq!(serde_json::from_str::<Value>(&text).unwrap(), json!({ "status": "ok" }));
}

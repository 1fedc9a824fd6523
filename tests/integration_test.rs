//! Tests de integración para el agente
//! tests/integration_test.rs
//!
//! Cada test levanta su propio engine en un puerto efímero con una raíz de
//! almacenamiento temporal, y habla con él por TCP como lo haría el cliente.

use nullboard_agent::areas::SettingsFile;
use nullboard_agent::config::Config;
use nullboard_agent::server::{Engine, EngineDeps, EngineHandle};
use nullboard_agent::storage::BoardStore;
use std::fs;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

/// Engine corriendo sobre una raíz temporal con un área "work"
struct Agent {
    dir: TempDir,
    token: String,
    addr: SocketAddr,
    activity: Arc<AtomicUsize>,
    handle: Option<EngineHandle>,
}

impl Agent {
    fn start() -> Self {
        Self::start_with(Config::default())
    }

    fn start_with(base: Config) -> Self {
        let dir = TempDir::new().unwrap();
        let config = Config {
            port: 0,
            root: Some(dir.path().to_path_buf()),
            header_timeout_ms: 500,
            accept_poll_ms: 20,
            ..base
        };

        let store = BoardStore::new(config.storage_root());
        let mut settings = SettingsFile::open(config.settings_path()).unwrap();
        let token = settings.add_area("work", &store).unwrap().token;

        let activity = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&activity);

        let deps = EngineDeps {
            registry: Box::new(settings),
            store,
            on_activity: Some(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })),
        };

        let handle = Engine::bind(&config, deps).unwrap().spawn().unwrap();

        Self {
            dir,
            token,
            addr: handle.local_addr(),
            activity,
            handle: Some(handle),
        }
    }

    /// Envía bytes crudos y lee hasta que el agente cierre
    fn send_raw(&self, raw: &[u8]) -> String {
        self.send_chunks(&[raw])
    }

    /// Envía el request en varios pedazos, con pausas entre medio
    fn send_chunks(&self, chunks: &[&[u8]]) -> String {
        let mut stream = TcpStream::connect(self.addr).unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        stream.set_nodelay(true).unwrap();

        for (i, chunk) in chunks.iter().enumerate() {
            if i > 0 {
                thread::sleep(Duration::from_millis(50));
            }
            stream.write_all(chunk).unwrap();
        }

        let mut response = Vec::new();
        let _ = stream.read_to_end(&mut response);
        String::from_utf8_lossy(&response).into_owned()
    }

    fn put(&self, path: &str, token: Option<&str>, body: &str) -> String {
        let mut raw = format!("PUT {} HTTP/1.1\r\nHost: localhost\r\n", path);
        if let Some(token) = token {
            raw += &format!("X-Access-Token: {}\r\n", token);
        }
        raw += &format!(
            "Content-Type: application/x-www-form-urlencoded; charset=UTF-8\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        );
        self.send_raw(raw.as_bytes())
    }

    fn delete(&self, path: &str, token: &str) -> String {
        let raw = format!(
            "DELETE {} HTTP/1.1\r\nHost: localhost\r\nX-Access-Token: {}\r\n\r\n",
            path, token
        );
        self.send_raw(raw.as_bytes())
    }

    fn area(&self) -> PathBuf {
        self.dir.path().join("work")
    }
}

impl Drop for Agent {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.stop();
        }
    }
}

/// Helper: status line de una response
fn status_line(response: &str) -> &str {
    response.split("\r\n").next().unwrap_or("")
}

/// Helper: extrae el body de una response HTTP
fn extract_body(response: &str) -> &str {
    // Buscar la línea vacía que separa headers del body
    if let Some(pos) = response.find("\r\n\r\n") {
        &response[pos + 4..]
    } else {
        ""
    }
}

fn has_header(response: &str, header: &str) -> bool {
    response.split("\r\n").any(|line| line.eq_ignore_ascii_case(header))
}

const EXAMPLE_BOARD: &str = "data=%7B%22revision%22%3A3%7D&meta=%7B%22title%22%3A%22x%22%7D&self=";

// ==================== PUT /board ====================

#[test]
fn test_put_board_example() {
    let agent = Agent::start();
    let response = agent.put("/board/7", Some(agent.token.as_str()), EXAMPLE_BOARD);

    assert_eq!(status_line(&response), "HTTP/1.1 204 OK", "got: {}", response);
    assert!(extract_body(&response).is_empty());

    let board = agent.area().join("7");
    assert_eq!(fs::read_to_string(board.join("meta.json")).unwrap(), r#"{"title":"x"}"#);
    assert_eq!(fs::read_to_string(board.join("rev-00000003.nbx")).unwrap(), r#"{"revision":3}"#);
}

#[test]
fn test_put_board_without_revision_writes_nothing() {
    let agent = Agent::start();
    let response = agent.put(
        "/board/7",
        Some(agent.token.as_str()),
        "data=%7B%22title%22%3A%22x%22%7D&meta=%7B%7D",
    );

    assert_eq!(status_line(&response), "HTTP/1.1 400 Bad request");
    assert_eq!(extract_body(&response), "No revision in board data");
    assert!(!agent.area().join("7").exists());
}

#[test]
fn test_board_id_validation() {
    let agent = Agent::start();

    for path in ["/board/12a", "/board/-1", "/board/"] {
        let response = agent.put(path, Some(agent.token.as_str()), "meta=m");
        assert_eq!(status_line(&response), "HTTP/1.1 400 Bad request", "{}", path);
    }
    assert_eq!(fs::read_dir(agent.area()).unwrap().count(), 0);

    let response = agent.put("/board/123", Some(agent.token.as_str()), "meta=m");
    assert_eq!(status_line(&response), "HTTP/1.1 204 OK");
    assert!(agent.area().join("123").join("meta.json").is_file());
}

#[test]
fn test_revisions_accumulate() {
    let agent = Agent::start();
    agent.put("/board/1", Some(agent.token.as_str()), "data=%7B%22revision%22%3A1%7D");
    agent.put("/board/1", Some(agent.token.as_str()), "data=%7B%22revision%22%3A2%7D");

    let board = agent.area().join("1");
    assert!(board.join("rev-00000001.nbx").is_file());
    assert!(board.join("rev-00000002.nbx").is_file());
}

#[test]
fn test_same_revision_overwrites_only_that_file() {
    let agent = Agent::start();
    let token = Some(agent.token.as_str());

    agent.put("/board/1", token, "data=%7B%22revision%22%3A1%2C%22v%22%3A%22one%22%7D&meta=m1");
    agent.put("/board/1", token, "data=%7B%22revision%22%3A2%2C%22v%22%3A%22two%22%7D");
    let response = agent.put("/board/1", token, "data=%7B%22revision%22%3A1%2C%22v%22%3A%22ONE%22%7D&meta=m2");
    assert_eq!(status_line(&response), "HTTP/1.1 204 OK");

    let board = agent.area().join("1");
    assert_eq!(fs::read_to_string(board.join("rev-00000001.nbx")).unwrap(), "{\"revision\":1,\"v\":\"ONE\"}");
    assert_eq!(fs::read_to_string(board.join("rev-00000002.nbx")).unwrap(), "{\"revision\":2,\"v\":\"two\"}");
    assert_eq!(fs::read_to_string(board.join("meta.json")).unwrap(), "m2");
    assert_eq!(fs::read_dir(&board).unwrap().count(), 3);
}

// ==================== DELETE /board ====================

#[test]
fn test_delete_missing_board() {
    let agent = Agent::start();
    let response = agent.delete("/board/5", &agent.token);

    assert_eq!(status_line(&response), "HTTP/1.1 400 Bad request");
    assert_eq!(extract_body(&response), "Non-existent board");
    assert!(!agent.area().join("$DeletedBoards").exists());
}

#[test]
fn test_delete_moves_whole_board_then_fails() {
    let agent = Agent::start();
    agent.put("/board/7", Some(agent.token.as_str()), EXAMPLE_BOARD);
    agent.put("/board/7", Some(agent.token.as_str()), "data=%7B%22revision%22%3A4%7D");

    let response = agent.delete("/board/7", &agent.token);
    assert_eq!(status_line(&response), "HTTP/1.1 204 OK");

    let archived = agent.area().join("$DeletedBoards").join("7");
    assert!(archived.join("meta.json").is_file());
    assert!(archived.join("rev-00000003.nbx").is_file());
    assert!(archived.join("rev-00000004.nbx").is_file());
    assert!(!agent.area().join("7").exists());

    let again = agent.delete("/board/7", &agent.token);
    assert_eq!(status_line(&again), "HTTP/1.1 400 Bad request");
}

#[test]
fn test_delete_refuses_existing_archive_entry() {
    let agent = Agent::start();
    agent.put("/board/7", Some(agent.token.as_str()), "meta=m");
    fs::create_dir_all(agent.area().join("$DeletedBoards").join("7")).unwrap();

    let response = agent.delete("/board/7", &agent.token);

    assert_eq!(status_line(&response), "HTTP/1.1 500 Internal error");
    assert!(agent.area().join("7").join("meta.json").is_file());
}

// ==================== PUT /config ====================

#[test]
fn test_put_config_writes_and_remembers_url() {
    let agent = Agent::start();
    let response = agent.put(
        "/config",
        Some(agent.token.as_str()),
        "conf=%7B%22fontSize%22%3A13%7D&self=file%3A%2F%2F%2Fhome%2Fnb.html",
    );

    assert_eq!(status_line(&response), "HTTP/1.1 204 OK");
    assert_eq!(
        fs::read_to_string(agent.area().join("app-config.json")).unwrap(),
        r#"{"fontSize":13}"#
    );

    let settings = SettingsFile::open(agent.dir.path().join("settings.json")).unwrap();
    assert_eq!(settings.areas()[0].url, "file:///home/nb.html");
}

// ==================== Autenticación ====================

#[test]
fn test_token_is_case_insensitive() {
    let agent = Agent::start();
    let lower = agent.token.to_lowercase();

    let response = agent.put("/board/7", Some(lower.as_str()), "meta=m");
    assert_eq!(status_line(&response), "HTTP/1.1 204 OK");
}

#[test]
fn test_unknown_token_is_forbidden() {
    let agent = Agent::start();
    let response = agent.put("/board/7", Some("Z999-Z999-Z999-Z999"), "meta=m");

    assert_eq!(status_line(&response), "HTTP/1.1 403 Access denied");
    assert_eq!(extract_body(&response), "Invalid access token");
    assert!(!agent.area().join("7").exists());
}

#[test]
fn test_missing_token() {
    let agent = Agent::start();
    let response = agent.put("/board/7", None, "meta=m");

    assert_eq!(status_line(&response), "HTTP/1.1 400 Bad request");
    assert_eq!(extract_body(&response), "No Access-Token header");
}

// ==================== Verbos y CORS ====================

#[test]
fn test_options_needs_no_token() {
    let agent = Agent::start();
    let response = agent.send_raw(b"OPTIONS /anything/at/all HTTP/1.1\r\nOrigin: null\r\n\r\n");

    assert_eq!(status_line(&response), "HTTP/1.1 204 No Content");
    assert!(has_header(&response, "Allow: OPTIONS, GET, PUT, DELETE"));
    assert!(has_header(&response, "Access-Control-Allow-Headers: *"));
    assert!(has_header(&response, "Access-Control-Allow-Methods: OPTIONS, GET, PUT, DELETE"));
    assert!(response.ends_with("\r\n\r\n"));
}

#[test]
fn test_unsupported_verb() {
    let agent = Agent::start();
    let response = agent.send_raw(b"GET /board/7 HTTP/1.1\r\nHost: localhost\r\n\r\n");

    assert_eq!(status_line(&response), "HTTP/1.1 405 Unsupported Method");
}

#[test]
fn test_every_response_has_common_headers() {
    let agent = Agent::start();
    let responses = [
        agent.put("/board/7", Some(agent.token.as_str()), "meta=m"),
        agent.put("/board/7", None, "meta=m"),
        agent.send_raw(b"OPTIONS / HTTP/1.1\r\nHost: x\r\n\r\n"),
        agent.send_raw(b"POST / HTTP/1.1\r\nHost: x\r\n\r\n"),
    ];

    for response in &responses {
        assert!(has_header(response, "Access-Control-Allow-Origin: *"), "{}", response);
        assert!(has_header(response, "Cache-Control: no-cache"), "{}", response);
    }
}

// ==================== Paths y Content-Length ====================

#[test]
fn test_invalid_paths() {
    let agent = Agent::start();

    let response = agent.put("board/7", Some(agent.token.as_str()), "meta=m");
    assert_eq!(extract_body(&response), "Invalid path, 1");

    let response = agent.put("//", Some(agent.token.as_str()), "meta=m");
    assert_eq!(extract_body(&response), "Invalid path, 2");

    let response = agent.put("/boards/7", Some(agent.token.as_str()), "meta=m");
    assert_eq!(extract_body(&response), "Invalid request");

    let response = agent.delete("/config", &agent.token);
    assert_eq!(extract_body(&response), "Invalid request");
}

#[test]
fn test_content_length_validation() {
    let agent = Agent::start();
    let token = agent.token.clone();

    let missing = format!("PUT /config HTTP/1.1\r\nX-Access-Token: {}\r\n\r\n", token);
    assert_eq!(extract_body(&agent.send_raw(missing.as_bytes())), "No Content-Length header");

    for bad in ["12x", "-5", "", "1 2"] {
        let raw = format!(
            "PUT /config HTTP/1.1\r\nX-Access-Token: {}\r\nContent-Length: {}\r\n\r\n",
            token, bad
        );
        assert_eq!(
            extract_body(&agent.send_raw(raw.as_bytes())),
            "Invalid Content-Length header",
            "{:?}",
            bad
        );
    }
}

#[test]
fn test_content_length_above_limit() {
    let agent = Agent::start_with(Config {
        initial_buffer: 1024,
        max_request_bytes: 4096,
        ..Config::default()
    });

    let raw = format!(
        "PUT /config HTTP/1.1\r\nX-Access-Token: {}\r\nContent-Length: 100000\r\n\r\n",
        agent.token
    );
    assert_eq!(extract_body(&agent.send_raw(raw.as_bytes())), "Content-Length too large");
}

#[test]
fn test_body_larger_than_initial_buffer() {
    let agent = Agent::start_with(Config {
        initial_buffer: 64,
        ..Config::default()
    });

    let data = format!("%7B%22revision%22%3A9%2C%22pad%22%3A%22{}%22%7D", "x".repeat(5000));
    let response = agent.put("/board/9", Some(agent.token.as_str()), &format!("data={}", data));

    assert_eq!(status_line(&response), "HTTP/1.1 204 OK");
    let written = fs::read_to_string(agent.area().join("9").join("rev-00000009.nbx")).unwrap();
    assert_eq!(written.len(), r#"{"revision":9,"pad":""}"#.len() + 5000);
}

// ==================== Entrega parcial ====================

#[test]
fn test_request_split_across_packets() {
    let agent = Agent::start();
    let body = EXAMPLE_BOARD.as_bytes();
    let headers = format!(
        "PUT /board/7 HTTP/1.1\r\nX-Access-Token: {}\r\nContent-Length: {}\r\n\r\n",
        agent.token,
        body.len()
    );
    let headers = headers.as_bytes();

    let response = agent.send_chunks(&[&headers[..10], &headers[10..30], &headers[30..], &body[..5], &body[5..]]);

    assert_eq!(status_line(&response), "HTTP/1.1 204 OK", "got: {}", response);
    assert!(agent.area().join("7").join("rev-00000003.nbx").is_file());
}

#[test]
fn test_header_terminator_split_across_packets() {
    let agent = Agent::start();
    let raw = format!(
        "PUT /config HTTP/1.1\r\nX-Access-Token: {}\r\nContent-Length: 6\r\n\r\nconf=x",
        agent.token
    );
    let raw = raw.as_bytes();
    let eoh = raw.len() - 6 - 4;

    // El "\r\n\r\n" llega en tres lecturas distintas
    let response = agent.send_chunks(&[&raw[..eoh + 1], &raw[eoh + 1..eoh + 3], &raw[eoh + 3..]]);

    assert_eq!(status_line(&response), "HTTP/1.1 204 OK", "got: {}", response);
    assert_eq!(fs::read_to_string(agent.area().join("app-config.json")).unwrap(), "x");
}

// ==================== Cierre silencioso ====================

#[test]
fn test_malformed_request_gets_no_response() {
    let agent = Agent::start();

    let folded = agent.send_raw(b"PUT /config HTTP/1.1\r\nX-Access-Token: a\r\n  folded\r\n\r\n");
    assert!(folded.is_empty());

    let bad_line = agent.send_raw(b"PUT /config\r\nHost: x\r\n\r\n");
    assert!(bad_line.is_empty());
}

#[test]
fn test_truncated_body_gets_no_response() {
    let agent = Agent::start();
    let raw = format!(
        "PUT /config HTTP/1.1\r\nX-Access-Token: {}\r\nContent-Length: 50\r\n\r\nconf=1",
        agent.token
    );

    assert!(agent.send_raw(raw.as_bytes()).is_empty());
    assert!(!agent.area().join("app-config.json").exists());
}

// ==================== Ciclo de vida ====================

#[test]
fn test_sequential_requests_and_activity() {
    let agent = Agent::start();

    for i in 1..=3 {
        let response = agent.put(&format!("/board/{}", i), Some(agent.token.as_str()), "meta=m");
        assert_eq!(status_line(&response), "HTTP/1.1 204 OK");
    }
    agent.send_raw(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n");

    let mut agent = agent;
    let handle = agent.handle.take().unwrap();
    handle.stop().unwrap();

    assert_eq!(agent.activity.load(Ordering::SeqCst), 4);
}

#[test]
fn test_stop_releases_port() {
    let mut agent = Agent::start();
    let addr = agent.addr;

    agent.handle.take().unwrap().stop().unwrap();
    assert!(TcpStream::connect(addr).is_err());
}

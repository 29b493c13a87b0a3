//! Line-based HTTP/JSON surface over `ParkingService`.
//!
//! One background thread accepts connections and serves them one at a time.
//! Every response is JSON; service errors map to status codes through
//! `OccupancyError::http_status`.

use anyhow::{anyhow, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::error::OccupancyError;
use crate::service::ParkingService;

const MAX_REQUEST_BYTES: usize = 16 * 1024;

#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub addr: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8000".to_string(),
        }
    }
}

#[derive(Debug)]
pub struct ApiHandle {
    pub addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl ApiHandle {
    pub fn stop(mut self) -> Result<()> {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            join.join()
                .map_err(|_| anyhow!("api server thread panicked"))?;
        }
        Ok(())
    }
}

pub struct ApiServer {
    cfg: ApiConfig,
    service: Arc<ParkingService>,
}

impl ApiServer {
    pub fn new(cfg: ApiConfig, service: Arc<ParkingService>) -> Self {
        Self { cfg, service }
    }

    pub fn spawn(self) -> Result<ApiHandle> {
        let configured_addr: SocketAddr = self.cfg.addr.parse()?;
        let listener = TcpListener::bind(configured_addr)?;
        let addr = listener.local_addr()?;
        if configured_addr.ip().is_loopback() && !addr.ip().is_loopback() {
            return Err(anyhow!(
                "api configured for loopback address '{}', but bound to non-loopback address '{}'",
                configured_addr,
                addr
            ));
        }
        listener.set_nonblocking(true)?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_thread = shutdown.clone();
        let service = self.service;
        let join = std::thread::spawn(move || {
            if let Err(err) = run_api(listener, &service, shutdown_thread) {
                log::error!("parking api stopped: {}", err);
            }
        });
        log::info!("parking api listening on {}", addr);

        Ok(ApiHandle {
            addr,
            shutdown,
            join: Some(join),
        })
    }
}

fn run_api(
    listener: TcpListener,
    service: &ParkingService,
    shutdown: Arc<AtomicBool>,
) -> Result<()> {
    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        match listener.accept() {
            Ok((stream, _)) => {
                if let Err(err) = handle_connection(stream, service) {
                    log::warn!("parking api request rejected: {}", err);
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(Duration::from_millis(50));
                continue;
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

fn handle_connection(mut stream: TcpStream, service: &ParkingService) -> Result<()> {
    stream.set_nonblocking(false)?;
    let peer = stream.peer_addr()?;
    let local = stream.local_addr()?;
    if local.ip().is_loopback() && !peer.ip().is_loopback() {
        write_json_response(&mut stream, 403, r#"{"error":"forbidden"}"#)?;
        return Ok(());
    }

    let request = match read_request(&mut stream) {
        Ok(request) => request,
        Err(err) => {
            write_json_response(&mut stream, 400, r#"{"error":"bad_request"}"#)?;
            return Err(err);
        }
    };
    log::debug!("{} {}", request.method, request.raw_path);
    let (status, body) = route(&request, service);
    if status >= 400 {
        log::warn!(
            "{} {} -> {}: {}",
            request.method,
            request.path,
            status,
            body
        );
    }
    write_response(&mut stream, status, "application/json", body.to_string().as_bytes())
}

fn route(request: &HttpRequest, service: &ParkingService) -> (u16, serde_json::Value) {
    match (request.method.as_str(), request.path.as_str()) {
        ("GET", "/health") => (200, json!({ "ok": true })),
        ("GET", "/areas") => (200, json!({ "areas": service.list_areas() })),
        ("GET", "/capabilities") => respond(Ok(service.capabilities())),
        ("GET", "/status") => match request.query("area") {
            Some(area) => respond(service.status(&area)),
            None => missing("area"),
        },
        ("GET", "/bookings") => match request.query("area") {
            Some(area) => respond(
                service
                    .bookings(&area)
                    .map(|bookings| json!({ "area": area, "bookings": bookings })),
            ),
            None => missing("area"),
        },
        ("GET", "/debug") => match request.query("area") {
            Some(area) => respond(service.diagnostics(&area)),
            None => missing("area"),
        },
        ("GET", "/detections") => match request.query("area") {
            Some(area) => respond(service.detections(&area)),
            None => missing("area"),
        },
        ("POST", "/scan") => with_body(request, |body: AreaBody| service.scan(&body.area)),
        ("POST", "/assign") => with_body(request, |body: AssignBody| {
            service.assign(&body.area, &body.user_id).map(|record| {
                json!({
                    "area": record.area,
                    "slotId": record.slot_id,
                    "status": "booked",
                    "bookingId": record.id,
                })
            })
        }),
        ("POST", "/book") => with_body(request, |body: BookBody| {
            service
                .book(&body.area, &body.slot_id, &body.user_id)
                .map(|record| {
                    json!({
                        "area": record.area,
                        "slotId": record.slot_id,
                        "status": "booked",
                        "bookingId": record.id,
                    })
                })
        }),
        ("POST", "/release") => with_body(request, |body: SlotBody| {
            service
                .release(&body.area, &body.slot_id)
                .map(|released| json!({ "ok": true, "released": released }))
        }),
        (
            _,
            "/health" | "/areas" | "/capabilities" | "/status" | "/bookings" | "/debug"
            | "/detections" | "/scan" | "/assign" | "/book" | "/release",
        ) => (405, json!({ "error": "method_not_allowed" })),
        _ => (404, json!({ "error": "not_found" })),
    }
}

#[derive(Debug, Deserialize)]
struct AreaBody {
    area: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssignBody {
    area: String,
    user_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SlotBody {
    area: String,
    slot_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookBody {
    area: String,
    slot_id: String,
    user_id: String,
}

fn with_body<B, T, F>(request: &HttpRequest, f: F) -> (u16, serde_json::Value)
where
    B: DeserializeOwned,
    T: serde::Serialize,
    F: FnOnce(B) -> crate::error::Result<T>,
{
    match serde_json::from_slice::<B>(&request.body) {
        Ok(body) => respond(f(body)),
        Err(err) => (
            400,
            json!({ "error": "bad_request", "message": err.to_string() }),
        ),
    }
}

fn respond<T: serde::Serialize>(result: crate::error::Result<T>) -> (u16, serde_json::Value) {
    match result {
        Ok(value) => match serde_json::to_value(value) {
            Ok(body) => (200, body),
            Err(err) => (500, json!({ "error": "internal", "message": err.to_string() })),
        },
        Err(err) => error_body(&err),
    }
}

fn error_body(err: &OccupancyError) -> (u16, serde_json::Value) {
    (
        err.http_status(),
        json!({ "error": err.code(), "message": err.to_string() }),
    )
}

fn missing(param: &str) -> (u16, serde_json::Value) {
    (
        400,
        json!({ "error": "bad_request", "message": format!("missing query parameter '{}'", param) }),
    )
}

fn read_request(stream: &mut TcpStream) -> Result<HttpRequest> {
    stream.set_read_timeout(Some(Duration::from_secs(2)))?;
    let mut buf = [0u8; 1024];
    let mut data = Vec::new();
    let header_end = loop {
        let n = stream.read(&mut buf)?;
        if n == 0 {
            break find_header_end(&data);
        }
        data.extend_from_slice(&buf[..n]);
        if data.len() > MAX_REQUEST_BYTES {
            return Err(anyhow!("request too large"));
        }
        if let Some(end) = find_header_end(&data) {
            break Some(end);
        }
    };
    let header_end = header_end.ok_or_else(|| anyhow!("incomplete request headers"))?;

    let text = String::from_utf8_lossy(&data[..header_end]).into_owned();
    let mut lines = text.split("\r\n");
    let request_line = lines.next().ok_or_else(|| anyhow!("empty request"))?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().ok_or_else(|| anyhow!("missing method"))?;
    let raw_path = parts.next().ok_or_else(|| anyhow!("missing path"))?;
    let mut headers = HashMap::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        if let Some((k, v)) = line.split_once(':') {
            headers.insert(k.trim().to_lowercase(), v.trim().to_string());
        }
    }

    let content_length: usize = match headers.get("content-length") {
        Some(value) => value
            .parse()
            .map_err(|_| anyhow!("invalid content-length '{}'", value))?,
        None => 0,
    };
    let body_start = header_end + 4;
    if content_length > MAX_REQUEST_BYTES.saturating_sub(body_start) {
        return Err(anyhow!("request too large"));
    }
    let mut body = data[body_start..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut buf)?;
        if n == 0 {
            return Err(anyhow!("request body shorter than content-length"));
        }
        body.extend_from_slice(&buf[..n]);
    }
    body.truncate(content_length);

    let (path, query) = match raw_path.split_once('?') {
        Some((path, query)) => (path.to_string(), parse_query(query)),
        None => (raw_path.to_string(), HashMap::new()),
    };
    Ok(HttpRequest {
        method: method.to_string(),
        path,
        query,
        body,
        raw_path: raw_path.to_string(),
    })
}

fn find_header_end(data: &[u8]) -> Option<usize> {
    data.windows(4).position(|w| w == b"\r\n\r\n")
}

fn parse_query(query: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}

fn write_json_response(stream: &mut TcpStream, status: u16, body: &str) -> Result<()> {
    write_response(stream, status, "application/json", body.as_bytes())
}

fn write_response(
    stream: &mut TcpStream,
    status: u16,
    content_type: &str,
    body: &[u8],
) -> Result<()> {
    let status_line = match status {
        200 => "HTTP/1.1 200 OK",
        400 => "HTTP/1.1 400 Bad Request",
        403 => "HTTP/1.1 403 Forbidden",
        404 => "HTTP/1.1 404 Not Found",
        405 => "HTTP/1.1 405 Method Not Allowed",
        409 => "HTTP/1.1 409 Conflict",
        _ => "HTTP/1.1 500 Internal Server Error",
    };
    let header = format!(
        "{status_line}\r\nContent-Type: {content_type}\r\nContent-Length: {len}\r\nCache-Control: no-store\r\nConnection: close\r\n\r\n",
        status_line = status_line,
        content_type = content_type,
        len = body.len()
    );
    stream.write_all(header.as_bytes())?;
    stream.write_all(body)?;
    Ok(())
}

#[derive(Debug)]
struct HttpRequest {
    method: String,
    path: String,
    query: HashMap<String, String>,
    body: Vec<u8>,
    raw_path: String,
}

impl HttpRequest {
    fn query(&self, key: &str) -> Option<String> {
        self.query
            .get(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_query_values() {
        let query = parse_query("area=Lot%20B&user=a+b&empty=&bad=%zz&name=caf%C3%A9&flag");
        assert_eq!(query["area"], "Lot B");
        assert_eq!(query["user"], "a b");
        assert_eq!(query["empty"], "");
        assert_eq!(query["bad"], "%zz");
        assert_eq!(query["name"], "café");
        assert_eq!(query["flag"], "");
    }

    #[test]
    fn finds_header_terminator() {
        assert_eq!(find_header_end(b"GET / HTTP/1.1\r\n\r\nbody"), Some(14));
        assert_eq!(find_header_end(b"GET / HTTP/1.1\r\n"), None);
    }
}

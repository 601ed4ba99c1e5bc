//! A small server showing routing, cookies, ranges and compression.
//!
//! Try it with:
//!
//! ```text
//! curl -i http://127.0.0.1:8080/hello?name=Ada
//! curl -i --compressed http://127.0.0.1:8080/lorem
//! curl -i -H 'Range: bytes=0-15' http://127.0.0.1:8080/lorem
//! curl -i -b 'visits=3' http://127.0.0.1:8080/visits
//! ```

use log::info;
use tinyhttpd::{Cookie, HttpRequest, HttpResponse, HttpServer, Method, ServerConfig, ServerError, StatusCode};

const LOREM: &str = "Lorem ipsum dolor sit amet, consectetur adipiscing elit. ";

async fn route(req: HttpRequest) -> Result<HttpResponse, ServerError> {
    info!("{} {} from {:?}", req.method, req.raw_uri, req.remote_addr);

    match (req.method, req.path.as_str()) {
        (Method::GET, "/") => Ok(HttpResponse::new(StatusCode::Ok)
            .with_content_type("text/html")
            .with_body_string("<html><body><h1>Welcome to tinyhttpd-rs!</h1></body></html>")),

        (Method::GET, "/hello") => {
            let name = req.get_query_param("name").unwrap_or("World");
            Ok(HttpResponse::new(StatusCode::Ok)
                .with_content_type("text/plain")
                .with_body_string(format!("Hello, {name}!")))
        }

        (Method::GET | Method::HEAD, "/lorem") => Ok(HttpResponse::new(StatusCode::Ok)
            .with_content_type("text/plain")
            .with_etag("\"lorem-v1\"")
            .with_ranges()
            .with_gzip(true)
            .with_body_string(LOREM.repeat(64))),

        (Method::GET, "/visits") => {
            let visits: u64 = req.cookies.get("visits").and_then(|v| v.parse().ok()).unwrap_or(0) + 1;
            let mut cookies = req.cookies.clone();
            cookies.set(Cookie::new("visits", visits.to_string()).with_path("/").with_max_age(3600));
            Ok(HttpResponse::new(StatusCode::Ok)
                .with_content_type("text/plain")
                .with_cookies(cookies)
                .with_body_string(format!("Visit number {visits}")))
        }

        (Method::POST, "/echo") => match req.body.raw().and_then(|part| part.as_text()) {
            Some(text) => Ok(HttpResponse::new(StatusCode::Ok)
                .with_content_type("text/plain")
                .with_body_string(text.to_string())),
            None => Ok(HttpResponse::new(StatusCode::BadRequest).with_body_string("Expected a small text body")),
        },

        _ => Ok(HttpResponse::new(StatusCode::NotFound)
            .with_content_type("text/plain")
            .with_body_string("Not Found")),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig {
        addr: "127.0.0.1:8080".parse()?,
        ..ServerConfig::default()
    };

    let server = HttpServer::new(config, route);

    info!("Press Ctrl+C to stop the server");
    server.start().await?;

    Ok(())
}

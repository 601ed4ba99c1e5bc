//! Accepts multipart uploads and reports what arrived.
//!
//! ```text
//! curl -F title=holiday -F photo=@beach.jpg http://127.0.0.1:8080/upload
//! ```
//!
//! Uploaded files live in temporary storage only until the response has been
//! written, so anything worth keeping must be copied out by the handler.

use std::path::PathBuf;

use log::{info, warn};
use tinyhttpd::{BodyValue, HttpRequest, HttpResponse, HttpServer, ServerConfig, ServerError, StatusCode};

async fn upload(req: HttpRequest) -> Result<HttpResponse, ServerError> {
    if req.path != "/upload" {
        return Ok(HttpResponse::new(StatusCode::NotFound).with_body_string("Not Found"));
    }

    let mut names: Vec<&str> = req.body.names().collect();
    names.sort_unstable();

    let mut report = String::new();
    for name in names {
        for part in req.body.get_all(name) {
            match &part.value {
                BodyValue::Text(text) => report.push_str(&format!("{name} = {text:?}\n")),
                BodyValue::File(item) => {
                    let size = item.size().await?;
                    report.push_str(&format!(
                        "{name} = file {:?} ({}, {size} bytes)\n",
                        part.filename.as_deref().unwrap_or("<unnamed>"),
                        part.content_type.as_deref().unwrap_or("application/octet-stream"),
                    ));
                }
            }
        }
    }
    if report.is_empty() {
        warn!("Upload from {:?} carried no fields", req.remote_addr);
        report.push_str("No fields received\n");
    }

    Ok(HttpResponse::new(StatusCode::Ok)
        .with_content_type("text/plain")
        .with_body_string(report))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();

    let cache_dir = PathBuf::from("uploads-tmp");
    std::fs::create_dir_all(&cache_dir)?;

    let config = ServerConfig {
        addr: "127.0.0.1:8080".parse()?,
        max_body_size: 16 * 1024 * 1024,
        cache_dir: Some(cache_dir),
        ..ServerConfig::default()
    };

    let server = HttpServer::new(config, upload);
    info!("Uploads are staged in ./uploads-tmp");
    server.start().await?;

    Ok(())
}

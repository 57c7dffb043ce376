use anyhow::{anyhow, Result};
use log::{info, warn};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use tiny_http::{Header, Request, Response, Server};

use infreqdb::{metrics, Error, PartitionHandle};

use super::util::{display_text, loader, percent_decode};

pub fn exec(store: PathBuf, key: String, addr: String, threads: usize) -> Result<()> {
    let part = loader(&store)?.load(&key)?;
    let server = Server::http(&addr).map_err(|e| anyhow!("bind http at {}: {}", addr, e))?;
    info!(
        "serve: key={} version={} listening on {}",
        key,
        part.version_marker(),
        addr
    );

    // Воркеры делят один handle; Server::recv безопасен из нескольких потоков.
    let threads = threads.max(1);
    let stop = AtomicBool::new(false);
    std::thread::scope(|s| {
        for _ in 0..threads {
            s.spawn(|| worker(&server, &part, &stop, threads));
        }
    });

    // Все воркеры вышли: закрытие не ждёт ни одного чтения.
    part.close()?;
    info!("serve: stopped");
    Ok(())
}

fn worker(server: &Server, part: &PartitionHandle, stop: &AtomicBool, threads: usize) {
    while !stop.load(Ordering::Acquire) {
        let rq = match server.recv() {
            Ok(rq) => rq,
            Err(e) => {
                if !stop.load(Ordering::Acquire) {
                    warn!("http recv error: {}", e);
                }
                continue;
            }
        };
        if handle(rq, part) {
            stop.store(true, Ordering::Release);
            for _ in 0..threads {
                server.unblock();
            }
        }
    }
}

/// Returns true when the request asked the server to stop.
fn handle(rq: Request, part: &PartitionHandle) -> bool {
    let url = rq.url().to_string();
    let is_get = rq.method().as_str() == "GET";

    if rq.method().as_str() == "POST" && url == "/shutdown" {
        info!("serve: shutdown requested");
        let _ = rq.respond(Response::from_string("bye\n"));
        return true;
    }

    if is_get && (url == "/" || url == "/health") {
        let _ = rq.respond(Response::from_string("OK\n"));
        return false;
    }

    if is_get && url == "/metrics" {
        let body = metrics::render_prometheus(&metrics::snapshot());
        let mut resp = Response::from_string(body);
        if let Ok(ct) = Header::from_bytes(b"Content-Type", b"text/plain; version=0.0.4") {
            resp.add_header(ct);
        }
        let _ = rq.respond(resp);
        return false;
    }

    if let Some(rest) = url.strip_prefix("/get/").filter(|_| is_get) {
        let Some((bucket, key)) = rest.split_once('/') else {
            let _ = rq.respond(Response::from_string("expected /get/<bucket>/<key>\n").with_status_code(400));
            return false;
        };
        // Сегменты percent-encoded: пробелы и '/' внутри ключа приходят как %20 / %2F.
        let (bucket, key) = match (percent_decode(bucket), percent_decode(key)) {
            (Ok(b), Ok(k)) => (b, k),
            (Err(e), _) | (_, Err(e)) => {
                let _ = rq.respond(Response::from_string(format!("{}\n", e)).with_status_code(400));
                return false;
            }
        };
        let resp = match part.get(&bucket, &key) {
            Ok(v) => Response::from_data(v),
            Err(e) if e.is_not_found() => Response::from_string(format!("{}\n", e)).with_status_code(404),
            Err(Error::Unavailable) => Response::from_string("unavailable\n").with_status_code(503),
            Err(e) => {
                warn!(
                    "serve: get {}/{} failed: {}",
                    display_text(&bucket),
                    display_text(&key),
                    e
                );
                Response::from_string(format!("{}\n", e)).with_status_code(500)
            }
        };
        let _ = rq.respond(resp);
        return false;
    }

    let _ = rq.respond(Response::from_string("not found\n").with_status_code(404));
    false
}

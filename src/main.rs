use std::io::{self, BufRead, Write};

use campusd::api;

fn main() {
    // stdout carries the wire protocol; logs go to stderr.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut state = api::AppState {
        workspace: None,
        db: None,
    };

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: api::ApiRequest = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply with a request id we never parsed.
                let _ = writeln!(
                    stdout,
                    "{{\"success\":false,\"status\":400,\"error\":\"bad json: {}\"}}",
                    e
                );
                let _ = stdout.flush();
                continue;
            }
        };

        log::debug!("{} {} (id={})", req.method, req.path, req.id);
        let resp = api::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"success\":false}".to_string())
        );
        let _ = stdout.flush();
    }
}

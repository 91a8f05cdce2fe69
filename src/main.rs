mod activities;
mod attendance;
mod backup;
mod config;
mod db;
mod error;
mod fees;
mod ipc;
mod model;
mod payroll;
mod results;
mod roster;
mod timetable;
mod validate;

use serde_json::json;
use std::io::{self, BufRead, Write};

fn write_line(stdout: &mut impl Write, value: &serde_json::Value) {
    let _ = writeln!(
        stdout,
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{\"ok\":false}".to_string())
    );
    let _ = stdout.flush();
}

fn main() {
    let config = config::Config::from_env();
    config::init_tracing(&config);

    let mut state = ipc::AppState::default();
    if let Some(workspace) = config.workspace.as_deref() {
        if let Err(e) = ipc::open_workspace(&mut state, workspace) {
            tracing::error!(workspace = %workspace.to_string_lossy(), error = %e, "failed to open startup workspace");
        }
    }
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "schoold ready");

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

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // No id to echo back.
                tracing::warn!(error = %e, "unparseable request line");
                write_line(
                    &mut stdout,
                    &json!({ "ok": false, "error": { "code": "bad_json", "message": e.to_string() } }),
                );
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        write_line(&mut stdout, &resp);
    }
}

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use anyhow::{anyhow, Context};
use serde_json::json;

/// One REST-style call as the harness sees it. The transport fills in the
/// request id and the session token.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiCall {
    pub method: String,
    pub path: String,
    pub query: serde_json::Value,
    pub body: serde_json::Value,
}

impl ApiCall {
    pub fn get(path: impl Into<String>, query: serde_json::Value) -> Self {
        ApiCall {
            method: "GET".to_string(),
            path: path.into(),
            query,
            body: serde_json::Value::Null,
        }
    }

    pub fn with_body(
        method: impl Into<String>,
        path: impl Into<String>,
        body: serde_json::Value,
    ) -> Self {
        ApiCall {
            method: method.into(),
            path: path.into(),
            query: serde_json::Value::Null,
            body,
        }
    }
}

pub trait Transport {
    fn send(&mut self, call: &ApiCall) -> anyhow::Result<serde_json::Value>;
}

/// Talks to a spawned campusd over the line protocol.
pub struct SidecarTransport {
    child: Child,
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
    token: Option<String>,
    next_id: u64,
}

impl SidecarTransport {
    pub fn spawn(exe: &str) -> anyhow::Result<Self> {
        let mut child = Command::new(exe)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to spawn {}", exe))?;
        let stdin = child.stdin.take().ok_or_else(|| anyhow!("no child stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("no child stdout"))?;
        Ok(SidecarTransport {
            child,
            stdin,
            reader: BufReader::new(stdout),
            token: None,
            next_id: 1,
        })
    }

    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = Some(token.into());
    }
}

impl Transport for SidecarTransport {
    fn send(&mut self, call: &ApiCall) -> anyhow::Result<serde_json::Value> {
        let id = self.next_id.to_string();
        self.next_id += 1;
        let payload = json!({
            "id": id,
            "method": call.method,
            "path": call.path,
            "query": call.query,
            "body": call.body,
            "token": self.token,
        });
        writeln!(self.stdin, "{}", payload).context("failed to write request")?;
        self.stdin.flush().context("failed to flush request")?;

        let mut line = String::new();
        self.reader
            .read_line(&mut line)
            .context("failed to read response")?;
        if line.trim().is_empty() {
            return Err(anyhow!("empty response for {} {}", call.method, call.path));
        }
        serde_json::from_str(line.trim()).context("response is not valid JSON")
    }
}

impl Drop for SidecarTransport {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

use super::ObjectStore;
use crate::{Error, Result};
use std::time::Duration;

const UPLOAD_URL: &str = "https://content.dropboxapi.com/2/files/upload";

/// Dropbox object store using a pre-authorized access token
pub struct DropboxStore {
    agent: ureq::Agent,
    access_token: String,
}

impl DropboxStore {
    pub fn new(access_token: String, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            access_token,
        }
    }
}

/// `Dropbox-API-Arg` value for an upload to `path`
///
/// HTTP headers must stay ASCII, so anything beyond it is escaped as
/// JSON `\uXXXX` sequences.
fn api_arg(path: &str) -> String {
    let json = serde_json::json!({
        "path": path,
        "mode": "add",
        "autorename": true,
        "mute": false,
    })
    .to_string();

    let mut escaped = String::with_capacity(json.len());
    for ch in json.chars() {
        if ch.is_ascii() {
            escaped.push(ch);
        } else {
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                escaped.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }
    escaped
}

impl ObjectStore for DropboxStore {
    fn put_file(&mut self, path: &str, bytes: &[u8]) -> Result<()> {
        let _span = tracing::debug_span!("dropbox_upload").entered();

        let response = self
            .agent
            .post(UPLOAD_URL)
            .set("Authorization", &format!("Bearer {}", self.access_token))
            .set("Dropbox-API-Arg", &api_arg(path))
            .set("Content-Type", "application/octet-stream")
            .send_bytes(bytes);

        match response {
            Ok(_) => Ok(()),
            Err(ureq::Error::Status(code, response)) => {
                let body = response.into_string().unwrap_or_default();
                Err(Error::Upload(format!(
                    "Dropbox rejected {} with status {}: {}",
                    path, code, body
                )))
            }
            Err(e) => Err(Error::Upload(format!("Failed to reach Dropbox: {}", e))),
        }
    }

    fn name(&self) -> &str {
        "dropbox"
    }
}

//! `multipart/mixed` bodies for workbook uploads, and content digests.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

/// Hex SHA-256 of a file, read in blocks.
pub fn file_digest(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Boundary derived from the payload digest, so it does not occur in it.
pub fn boundary_for(digest: &str) -> String {
    let seed = digest.get(..32).unwrap_or(digest);
    format!("tabpub-{seed}")
}

/// Incrementally built `multipart/mixed` body.
#[derive(Debug)]
pub struct MultipartBody {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartBody {
    pub fn new(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            body: Vec::new(),
        }
    }

    pub fn json_part(mut self, name: &str, value: &serde_json::Value) -> Self {
        self.open_part(&format!("name=\"{name}\""), "application/json");
        self.body.extend_from_slice(value.to_string().as_bytes());
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn file_part(mut self, name: &str, file_name: &str, bytes: &[u8]) -> Self {
        self.open_part(
            &format!("name=\"{name}\"; filename=\"{}\"", quoted(file_name)),
            "application/octet-stream",
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    fn open_part(&mut self, disposition: &str, content_type: &str) {
        let header = format!(
            "--{}\r\nContent-Disposition: {disposition}\r\nContent-Type: {content_type}\r\n\r\n",
            self.boundary
        );
        self.body.extend_from_slice(header.as_bytes());
    }

    /// Close the body; returns the `Content-Type` header value and the bytes.
    pub fn finish(mut self) -> (String, Vec<u8>) {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        (
            format!("multipart/mixed; boundary={}", self.boundary),
            self.body,
        )
    }
}

/// Body of a header quoted-string: `\` and `"` are escaped, line breaks
/// become spaces so the value cannot end the header early.
fn quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '\r' | '\n' => out.push(' '),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn digest_of_known_content() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"abc").unwrap();
        assert_eq!(
            file_digest(file.path()).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn boundary_uses_digest_prefix() {
        let b = boundary_for("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad");
        assert_eq!(b, "tabpub-ba7816bf8f01cfea414140de5dae2223");
        assert_eq!(boundary_for("short"), "tabpub-short");
    }

    #[test]
    fn body_has_payload_then_file_then_terminator() {
        let payload = serde_json::json!({"workbook": {"name": "A"}});
        let (content_type, body) = MultipartBody::new("B")
            .json_part("request_payload", &payload)
            .file_part("tableau_workbook", "A.twb", b"<workbook/>")
            .finish();
        assert_eq!(content_type, "multipart/mixed; boundary=B");

        let text = String::from_utf8(body).unwrap();
        let expected = "--B\r\n\
            Content-Disposition: name=\"request_payload\"\r\n\
            Content-Type: application/json\r\n\r\n\
            {\"workbook\":{\"name\":\"A\"}}\r\n\
            --B\r\n\
            Content-Disposition: name=\"tableau_workbook\"; filename=\"A.twb\"\r\n\
            Content-Type: application/octet-stream\r\n\r\n\
            <workbook/>\r\n\
            --B--\r\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn file_name_is_quoted_in_disposition() {
        let (_, body) = MultipartBody::new("B")
            .file_part("tableau_workbook", "Q\"3\r\nDraft.twb", b"")
            .finish();
        let text = String::from_utf8(body).unwrap();
        assert!(text.contains("filename=\"Q\\\"3  Draft.twb\"\r\n"));
        assert_eq!(text.matches("\r\n").count(), 6);
    }
}

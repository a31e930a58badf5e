//! `TableauGateway` against a local canned HTTP server: one session per run,
//! project lookup, multipart publish, tags and sign-out.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::path::Path;
use std::sync::mpsc;
use std::thread;

use secrecy::SecretString;
use tabpub_core::{WorkbookFile, WorkbookOptions, WorkbookSpec};
use tabpub_publish::{
    DestinationId, PublishGateway, PublishGatewayError, PublishRequest, PublishedWorkbook,
};
use tabpub_tableau::{TableauConfig, TableauGateway};

struct Recorded {
    request_line: String,
    headers: Vec<String>,
    body: Vec<u8>,
}

impl Recorded {
    fn header(&self, name: &str) -> Option<&str> {
        let prefix = format!("{}:", name.to_ascii_lowercase());
        self.headers
            .iter()
            .find(|h| h.to_ascii_lowercase().starts_with(&prefix))
            .map(|h| h[prefix.len()..].trim())
    }
}

fn serve(responses: Vec<(u16, &'static str)>) -> (String, mpsc::Receiver<Recorded>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for (status, body) in responses {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            let mut headers = Vec::new();
            let mut content_length = 0;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                let line = line.trim_end().to_owned();
                if line.is_empty() {
                    break;
                }
                if let Some(v) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                    content_length = v.trim().parse().unwrap();
                }
                headers.push(line);
            }
            let mut body_in = vec![0; content_length];
            reader.read_exact(&mut body_in).unwrap();
            tx.send(Recorded {
                request_line: request_line.trim_end().to_owned(),
                headers,
                body: body_in,
            })
            .unwrap();
            let mut stream = reader.into_inner();
            write!(
                stream,
                "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\n\
                 Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            )
            .unwrap();
        }
    });
    (base, rx)
}

const SIGN_IN: &str = r#"{"credentials":{"site":{"id":"site-1","contentUrl":"acme"},
    "user":{"id":"u1"},"token":"tok-123"}}"#;
const PROJECTS: &str = r#"{"pagination":{"pageNumber":"1","pageSize":"100","totalAvailable":"2"},
    "projects":{"project":[{"id":"p-fin","name":"Finance"},
        {"id":"p-q","name":"Quarterly","parentProjectId":"p-fin"}]}}"#;
const PUBLISHED: &str =
    r#"{"workbook":{"id":"wb-9","name":"Sales Overview","webpageUrl":"http://t/#/workbooks/9"}}"#;

fn gateway(base: &str) -> TableauGateway {
    TableauGateway::new(
        TableauConfig::new(base, "acme", "ci-bot", SecretString::from("pw".to_string()))
            .with_api_version("3.19"),
    )
}

fn spec(tags: &[&str]) -> WorkbookSpec {
    WorkbookSpec {
        file_name: WorkbookFile::from("Sales.twb"),
        display_name: "Sales Overview".into(),
        destination_path: "Finance/Quarterly".into(),
        options: WorkbookOptions {
            hidden_views: vec!["Scratch".into()],
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ..WorkbookOptions::default()
        },
    }
}

fn publish(
    gateway: &mut TableauGateway,
    spec: &WorkbookSpec,
    path: &Path,
) -> Result<PublishedWorkbook, PublishGatewayError> {
    let destination = DestinationId::from("p-q");
    gateway.publish(&PublishRequest {
        spec,
        destination: &destination,
        local_path: path,
    })
}

#[test]
fn full_session_resolves_publishes_tags_and_signs_out() {
    let (base, rx) = serve(vec![
        (200, SIGN_IN),
        (200, PROJECTS),
        (201, PUBLISHED),
        (200, r#"{"tags":{"tag":[{"label":"finance"}]}}"#),
        (204, ""),
    ]);
    let dir = tempfile::tempdir().unwrap();
    let workbook = dir.path().join("Sales.twb");
    std::fs::write(&workbook, "<workbook/>").unwrap();

    let mut gateway = gateway(&base);
    let destination = gateway
        .resolve_destination("Finance/Quarterly")
        .expect("resolve");
    assert_eq!(destination, Some(DestinationId::from("p-q")));
    assert!(gateway.is_signed_in());

    let published = publish(&mut gateway, &spec(&["finance"]), &workbook).expect("publish");
    assert_eq!(published.id, "wb-9");
    assert_eq!(published.url.as_deref(), Some("http://t/#/workbooks/9"));
    gateway.sign_out();
    assert!(!gateway.is_signed_in());

    let sign_in = rx.recv().unwrap();
    assert_eq!(sign_in.request_line, "POST /api/3.19/auth/signin HTTP/1.1");
    let creds: serde_json::Value = serde_json::from_slice(&sign_in.body).unwrap();
    assert_eq!(creds["credentials"]["site"]["contentUrl"], "acme");

    let projects = rx.recv().unwrap();
    assert!(projects
        .request_line
        .starts_with("GET /api/3.19/sites/site-1/projects?"));
    assert_eq!(projects.header("x-tableau-auth"), Some("tok-123"));

    let upload = rx.recv().unwrap();
    assert!(upload.request_line.starts_with(
        "POST /api/3.19/sites/site-1/workbooks?overwrite=true&skipConnectionCheck=true"
    ));
    assert!(upload
        .header("content-type")
        .is_some_and(|ct| ct.starts_with("multipart/mixed; boundary=tabpub-")));
    let body = String::from_utf8_lossy(&upload.body);
    assert!(body.contains(r#""hidden":"true""#));
    assert!(body.contains("filename=\"Sales.twb\""));
    assert!(body.contains("<workbook/>"));

    assert!(rx
        .recv()
        .unwrap()
        .request_line
        .starts_with("PUT /api/3.19/sites/site-1/workbooks/wb-9/tags"));
    assert_eq!(
        rx.recv().unwrap().request_line,
        "POST /api/3.19/auth/signout HTTP/1.1"
    );
}

#[test]
fn large_file_goes_through_an_upload_session() {
    const UPLOAD: &str = r#"{"fileUpload":{"uploadSessionId":"up-7","fileSize":"0"}}"#;
    let (base, rx) = serve(vec![
        (200, SIGN_IN),
        (201, UPLOAD),
        (200, UPLOAD),
        (200, UPLOAD),
        (200, UPLOAD),
        (201, PUBLISHED),
    ]);
    let dir = tempfile::tempdir().unwrap();
    let workbook = dir.path().join("Sales.twb");
    std::fs::write(&workbook, "0123456789ab").unwrap();

    let mut gateway = gateway(&base).with_chunking(4, 5);
    let published = publish(&mut gateway, &spec(&[]), &workbook).expect("publish");
    assert_eq!(published.id, "wb-9");

    assert!(rx.recv().unwrap().request_line.contains("/auth/signin"));
    assert!(rx
        .recv()
        .unwrap()
        .request_line
        .starts_with("POST /api/3.19/sites/site-1/fileUploads "));

    let mut sent = String::new();
    for _ in 0..3 {
        let chunk = rx.recv().unwrap();
        assert!(chunk
            .request_line
            .starts_with("PUT /api/3.19/sites/site-1/fileUploads/up-7 "));
        assert_eq!(chunk.header("x-tableau-auth"), Some("tok-123"));
        let body = String::from_utf8_lossy(&chunk.body).into_owned();
        assert!(body.contains("name=\"tableau_file\"; filename=\"file\""));
        let piece = body
            .split("\r\n\r\n")
            .nth(2)
            .and_then(|rest| rest.split("\r\n").next())
            .unwrap()
            .to_owned();
        assert!(piece.len() <= 5);
        sent.push_str(&piece);
    }
    assert_eq!(sent, "0123456789ab");

    let commit = rx.recv().unwrap();
    assert!(commit.request_line.starts_with(
        "POST /api/3.19/sites/site-1/workbooks?overwrite=true&skipConnectionCheck=true\
         &uploadSessionId=up-7&workbookType=twb "
    ));
    let body = String::from_utf8_lossy(&commit.body);
    assert!(body.contains("request_payload"));
    assert!(!body.contains("tableau_workbook"));
    assert!(!body.contains("0123456789ab"));
}

#[test]
fn refused_credentials_are_an_auth_error() {
    let (base, _rx) = serve(vec![(
        401,
        r#"{"error":{"summary":"Signin Error","detail":"bad credentials","code":"401001"}}"#,
    )]);
    let err = gateway(&base).resolve_destination("Finance").unwrap_err();
    match err {
        PublishGatewayError::Auth(message) => assert!(message.contains("401001")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unknown_project_resolves_to_none() {
    let (base, _rx) = serve(vec![(200, SIGN_IN), (200, PROJECTS)]);
    let mut gateway = gateway(&base);
    assert_eq!(gateway.resolve_destination("Marketing").unwrap(), None);
    // cached: no further requests are served
    assert_eq!(
        gateway.resolve_destination("Finance").unwrap(),
        Some(DestinationId::from("p-fin"))
    );
}

#[test]
fn missing_local_file_fails_with_its_path() {
    let (base, _rx) = serve(vec![(200, SIGN_IN)]);
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("Gone.twb");
    let err = publish(&mut gateway(&base), &spec(&[]), &missing).unwrap_err();
    assert!(matches!(err, PublishGatewayError::Io { ref path, .. } if path == &missing));
}

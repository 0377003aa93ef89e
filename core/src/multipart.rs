//! `multipart/form-data` bodies built from a `ValueSet`.
//!
//! Keys named in `file_keys` hold local file paths; their content is read and
//! attached as file parts. Every file is read before the request is returned,
//! so a missing file fails the whole submission and nothing reaches the
//! transport.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest};
use crate::values::ValueSet;

const CRLF: &[u8] = b"\r\n";

/// Incremental writer for a multipart body.
#[derive(Debug, Clone)]
pub struct MultipartForm {
    boundary: String,
    body: Vec<u8>,
}

impl Default for MultipartForm {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipartForm {
    /// New form with a random boundary.
    pub fn new() -> Self {
        Self::with_boundary(Uuid::new_v4().simple().to_string())
    }

    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            body: Vec::new(),
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Value for the request's `Content-Type` header.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn write_field(&mut self, name: &str, value: &str) {
        self.open_part(&format!(
            "Content-Disposition: form-data; name=\"{}\"",
            escape_quotes(name)
        ));
        self.body.extend_from_slice(value.as_bytes());
        self.body.extend_from_slice(CRLF);
    }

    pub fn write_file(&mut self, name: &str, filename: &str, content: &[u8]) {
        self.open_part(&format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream",
            escape_quotes(name),
            escape_quotes(filename)
        ));
        self.body.extend_from_slice(content);
        self.body.extend_from_slice(CRLF);
    }

    /// Close the body and return it.
    pub fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        self.body
    }

    fn open_part(&mut self, headers: &str) {
        self.body
            .extend_from_slice(format!("--{}\r\n{headers}\r\n\r\n", self.boundary).as_bytes());
    }
}

fn escape_quotes(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Last path segment of `path`, or the whole path when it has none.
fn file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

fn read_file(path: &str) -> Result<Vec<u8>, ApiError> {
    std::fs::read(path).map_err(|source| ApiError::FileAccess {
        path: PathBuf::from(path),
        source,
    })
}

/// Write every entry of `params` into `form`, reading file-valued keys from
/// disk.
pub fn write_values(
    form: &mut MultipartForm,
    params: &ValueSet,
    file_keys: &[&str],
) -> Result<(), ApiError> {
    for key in params.keys() {
        let is_file = file_keys.iter().any(|k| *k == key);
        for (name, value) in params.entries(key) {
            if is_file {
                let content = read_file(value)?;
                form.write_file(&name, &file_name(value), &content);
            } else {
                form.write_field(&name, value);
            }
        }
    }
    Ok(())
}

/// Build a multipart POST to `endpoint` carrying `params`.
pub fn multipart_request(
    endpoint: &str,
    params: &ValueSet,
    file_keys: &[&str],
) -> Result<HttpRequest, ApiError> {
    let mut form = MultipartForm::new();
    write_values(&mut form, params, file_keys)?;
    let content_type = form.content_type();

    Ok(HttpRequest {
        method: HttpMethod::Post,
        path: endpoint.to_string(),
        headers: vec![("Content-Type".to_string(), content_type)],
        body: Some(form.finish()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn body_text(req: &HttpRequest) -> String {
        String::from_utf8(req.body.clone().unwrap()).unwrap()
    }

    fn boundary_of(req: &HttpRequest) -> String {
        req.header("content-type")
            .unwrap()
            .strip_prefix("multipart/form-data; boundary=")
            .unwrap()
            .to_string()
    }

    #[test]
    fn empty_form_is_just_the_closing_boundary() {
        let form = MultipartForm::with_boundary("xyz");
        assert_eq!(form.finish(), b"--xyz--\r\n");
    }

    #[test]
    fn field_framing() {
        let mut form = MultipartForm::with_boundary("b");
        form.write_field("name", "value");
        let body = String::from_utf8(form.finish()).unwrap();
        assert_eq!(
            body,
            "--b\r\nContent-Disposition: form-data; name=\"name\"\r\n\r\nvalue\r\n--b--\r\n"
        );
    }

    #[test]
    fn quotes_in_names_are_escaped() {
        let mut form = MultipartForm::with_boundary("b");
        form.write_file("a\"b", "c\\d", b"x");
        let body = String::from_utf8(form.finish()).unwrap();
        assert!(body.contains(r#"name="a\"b"; filename="c\\d""#));
    }

    #[test]
    fn request_carries_fields_and_content_type() {
        let mut params = ValueSet::new();
        params.add("title", "Hello");
        params.add("tags", "a");
        params.add("tags", "b");

        let req = multipart_request("http://host/api/content/create?type=Post", &params, &[])
            .unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.path, "http://host/api/content/create?type=Post");

        let boundary = boundary_of(&req);
        assert_eq!(boundary.len(), 32);
        let body = body_text(&req);
        assert!(body.starts_with(&format!("--{boundary}\r\n")));
        assert!(body.ends_with(&format!("--{boundary}--\r\n")));
        assert!(body.contains("name=\"title\"\r\n\r\nHello\r\n"));
        assert!(body.contains("name=\"tags.0\"\r\n\r\na\r\n"));
        assert!(body.contains("name=\"tags.1\"\r\n\r\nb\r\n"));
    }

    #[test]
    fn single_file_key_attaches_file_part() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.png");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"PNGDATA")
            .unwrap();

        let mut params = ValueSet::new();
        params.add("photo", path.to_str().unwrap());

        let req = multipart_request("http://host/x", &params, &["photo"]).unwrap();
        let body = body_text(&req);
        assert!(body.contains("name=\"photo\"; filename=\"photo.png\""));
        assert!(body.contains("Content-Type: application/octet-stream\r\n\r\nPNGDATA\r\n"));
        assert!(!body.contains(path.to_str().unwrap()));
    }

    #[test]
    fn repeated_file_key_attaches_indexed_parts() {
        let dir = tempfile::tempdir().unwrap();
        let mut params = ValueSet::new();
        for (i, name) in ["a.txt", "b.txt"].iter().enumerate() {
            let path = dir.path().join(name);
            std::fs::write(&path, format!("content-{i}")).unwrap();
            params.add("files", path.to_str().unwrap());
        }

        let req = multipart_request("http://host/x", &params, &["files"]).unwrap();
        let body = body_text(&req);
        assert!(body.contains("name=\"files.0\"; filename=\"a.txt\""));
        assert!(body.contains("name=\"files.1\"; filename=\"b.txt\""));
        assert!(body.contains("content-0"));
        assert!(body.contains("content-1"));
    }

    #[test]
    fn missing_file_aborts_encoding() {
        let mut params = ValueSet::new();
        params.add("title", "x");
        params.add("photo", "/definitely/not/here.png");

        let err = multipart_request("http://host/x", &params, &["photo"]).unwrap_err();
        match err {
            ApiError::FileAccess { path, source } => {
                assert_eq!(path, PathBuf::from("/definitely/not/here.png"));
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn file_name_falls_back_to_whole_path() {
        assert_eq!(file_name("dir/sub/file.txt"), "file.txt");
        assert_eq!(file_name("/"), "/");
    }
}

//! Client for a remote report-generation endpoint (feature `remote`).

use reqwest::blocking::Client;
use reqwest::blocking::multipart::{Form, Part};
use thiserror::Error;
use tracing::{debug, info};

const C_ENDPOINT_PATH: &str = "generate-reports/";
const C_XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Remote call failures; local artifacts stay valid when these occur.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The request could not be built or sent.
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },
    /// The endpoint answered with a non-success status.
    #[error("{url} answered {status}: {body}")]
    Status { url: String, status: u16, body: String },
}

/// `POST {base_url}/generate-reports/` URL.
pub fn derive_endpoint_url(base_url: &str) -> String {
    format!("{}/{C_ENDPOINT_PATH}", base_url.trim_end_matches('/'))
}

/// Upload a packing list as multipart field `file`; returns the workbook bytes.
pub fn post_generate_reports(
    base_url: &str,
    file_name: &str,
    v_bytes: &[u8],
) -> Result<Vec<u8>, RemoteError> {
    let url = derive_endpoint_url(base_url);
    let derive_request_error = |err: reqwest::Error| RemoteError::Request {
        url: url.clone(),
        message: err.to_string(),
    };

    let part = Part::bytes(v_bytes.to_vec())
        .file_name(file_name.to_string())
        .mime_str(C_XLSX_MIME)
        .map_err(derive_request_error)?;
    let form = Form::new().part("file", part);
    debug!(%url, n_bytes = v_bytes.len(), "posting packing list");

    let response = Client::new()
        .post(&url)
        .multipart(form)
        .send()
        .map_err(derive_request_error)?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(RemoteError::Status {
            url,
            status: status.as_u16(),
            body,
        });
    }

    let v_body = response.bytes().map_err(derive_request_error)?.to_vec();
    info!(%url, n_bytes = v_body.len(), "remote report received");
    Ok(v_body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url_joins_single_slash() {
        assert_eq!(
            derive_endpoint_url("http://localhost:8000/"),
            "http://localhost:8000/generate-reports/"
        );
        assert_eq!(
            derive_endpoint_url("https://reports.example.com/api"),
            "https://reports.example.com/api/generate-reports/"
        );
    }

    #[test]
    fn test_invalid_url_is_a_request_error() {
        let err = post_generate_reports("not a url", "a.xlsx", b"PK").expect_err("request fails");
        assert!(matches!(err, RemoteError::Request { .. }));
    }
}

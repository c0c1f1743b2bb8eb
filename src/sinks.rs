//! Output sinks: printer, share upload and QR codes

use std::io::Write;
use std::process::{Command, Stdio};
use std::time::Duration;

use base64::Engine;
use futures::future::BoxFuture;
use image::{ImageOutputFormat, Luma};
use qrcode::QrCode;
use serde::Deserialize;
use thiserror::Error;

/// Largest photo the upload endpoint accepts
pub const MAX_UPLOAD_BYTES: usize = 15 * 1024 * 1024;

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";
const JPEG_SIGNATURE: &[u8] = &[0xFF, 0xD8, 0xFF];

// --- printing ---------------------------------------------------------------

#[derive(Debug, Error)]
pub enum PrintError {
    #[error("failed to start print command: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("print command failed: {0}")]
    Failed(String),
}

pub trait PrinterSink: Send + Sync {
    /// Send a laid-out page (PNG) to `device`
    fn print(&self, png: &[u8], device: &str, width_mm: f64, height_mm: f64) -> Result<(), PrintError>;
}

/// Pipes the page into a CUPS-style command (`lp` by default)
pub struct CommandPrinter {
    command: String,
}

impl CommandPrinter {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl PrinterSink for CommandPrinter {
    fn print(&self, png: &[u8], device: &str, width_mm: f64, height_mm: f64) -> Result<(), PrintError> {
        let media = format!("media=Custom.{}x{}mm", width_mm.round(), height_mm.round());
        tracing::info!("Printing {} bytes on {} ({})", png.len(), device, media);

        let mut child = Command::new(&self.command)
            .args(["-d", device, "-o", &media, "-o", "fit-to-page"])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            // The command may exit without reading everything; its status decides
            if let Err(e) = stdin.write_all(png) {
                tracing::debug!("Print command closed stdin early: {}", e);
            }
        }

        let output = child.wait_with_output()?;
        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            Err(PrintError::Failed(if stderr.is_empty() {
                output.status.to_string()
            } else {
                stderr
            }))
        }
    }
}

// --- upload -----------------------------------------------------------------

#[derive(Debug, Clone, Error)]
pub enum UploadError {
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
    #[error("upload failed: {0}")]
    Failure(String),
}

pub trait UploadSink: Send + Sync {
    /// Upload a photo and return its download URL
    fn upload(&self, photo: Vec<u8>) -> BoxFuture<'static, Result<String, UploadError>>;
}

/// Image type for a payload, or why it is refused
pub fn validate_payload(bytes: &[u8]) -> Result<&'static str, UploadError> {
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(UploadError::InvalidPayload(format!(
            "image is {} bytes, limit is {}",
            bytes.len(),
            MAX_UPLOAD_BYTES
        )));
    }
    if bytes.starts_with(PNG_SIGNATURE) {
        Ok("png")
    } else if bytes.starts_with(JPEG_SIGNATURE) {
        Ok("jpeg")
    } else {
        Err(UploadError::InvalidPayload("not a PNG or JPEG image".into()))
    }
}

pub fn data_url(bytes: &[u8], kind: &str) -> String {
    format!(
        "data:image/{};base64,{}",
        kind,
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    #[serde(default)]
    success: bool,
    download_url: Option<String>,
    error: Option<String>,
}

/// POSTs `{"imageData": "data:..."}` to an HTTP endpoint
#[derive(Clone)]
pub struct HttpUploadSink {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpUploadSink {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    async fn send(self, photo: Vec<u8>) -> Result<String, UploadError> {
        let kind = validate_payload(&photo)?;
        let body = serde_json::json!({ "imageData": data_url(&photo, kind) });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| UploadError::Failure(e.to_string()))?;
        let status = response.status();
        let parsed: UploadResponse = response
            .json()
            .await
            .map_err(|e| UploadError::Failure(format!("{}: unreadable response ({})", status, e)))?;

        match parsed {
            UploadResponse {
                success: true,
                download_url: Some(url),
                ..
            } if status.is_success() => Ok(url),
            UploadResponse { error: Some(error), .. } => Err(UploadError::Failure(error)),
            _ => Err(UploadError::Failure(format!("unexpected response ({})", status))),
        }
    }
}

impl UploadSink for HttpUploadSink {
    fn upload(&self, photo: Vec<u8>) -> BoxFuture<'static, Result<String, UploadError>> {
        Box::pin(self.clone().send(photo))
    }
}

// --- QR codes ---------------------------------------------------------------

pub trait QrEncoder: Send + Sync {
    /// Render `text` as a PNG QR code
    fn encode(&self, text: &str) -> anyhow::Result<Vec<u8>>;
}

pub struct QrCodeEncoder {
    pub min_size: u32,
}

impl Default for QrCodeEncoder {
    fn default() -> Self {
        Self { min_size: 256 }
    }
}

impl QrEncoder for QrCodeEncoder {
    fn encode(&self, text: &str) -> anyhow::Result<Vec<u8>> {
        let code = QrCode::new(text.as_bytes()).map_err(|e| anyhow::anyhow!("QR encoding failed: {}", e))?;
        let img = code
            .render::<Luma<u8>>()
            .min_dimensions(self.min_size, self.min_size)
            .build();
        let mut out = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut out), ImageOutputFormat::Png)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::post, Json, Router};

    fn png_bytes() -> Vec<u8> {
        let mut bytes = PNG_SIGNATURE.to_vec();
        bytes.extend_from_slice(&[0u8; 16]);
        bytes
    }

    #[test]
    fn test_validate_payload() {
        assert_eq!(validate_payload(&png_bytes()).unwrap(), "png");
        assert_eq!(validate_payload(&[0xFF, 0xD8, 0xFF, 0xE0]).unwrap(), "jpeg");
        assert!(matches!(
            validate_payload(b"GIF89a"),
            Err(UploadError::InvalidPayload(_))
        ));

        let mut huge = png_bytes();
        huge.resize(MAX_UPLOAD_BYTES + 1, 0);
        assert!(matches!(validate_payload(&huge), Err(UploadError::InvalidPayload(_))));
    }

    #[test]
    fn test_data_url_prefix() {
        assert_eq!(data_url(&[1, 2, 3], "png"), "data:image/png;base64,AQID");
    }

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/upload", addr)
    }

    #[tokio::test]
    async fn test_http_upload_returns_download_url() {
        let app = Router::new().route(
            "/upload",
            post(|Json(body): Json<serde_json::Value>| async move {
                let data = body["imageData"].as_str().unwrap_or_default();
                assert!(data.starts_with("data:image/png;base64,"));
                Json(serde_json::json!({"success": true, "downloadUrl": "https://photos/abc.png"}))
            }),
        );
        let sink = HttpUploadSink::new(serve(app).await, Duration::from_secs(5)).unwrap();
        let url = sink.upload(png_bytes()).await.unwrap();
        assert_eq!(url, "https://photos/abc.png");
    }

    #[tokio::test]
    async fn test_http_upload_reports_server_error() {
        let app = Router::new().route(
            "/upload",
            post(|| async {
                (
                    axum::http::StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({"error": "Invalid image data"})),
                )
            }),
        );
        let sink = HttpUploadSink::new(serve(app).await, Duration::from_secs(5)).unwrap();
        match sink.upload(png_bytes()).await {
            Err(UploadError::Failure(message)) => assert_eq!(message, "Invalid image data"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_payload_never_hits_network() {
        let sink = HttpUploadSink::new("http://127.0.0.1:9/upload", Duration::from_secs(1)).unwrap();
        assert!(matches!(
            sink.upload(b"plain text".to_vec()).await,
            Err(UploadError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_command_printer_exit_status() {
        let page = png_bytes();
        assert!(CommandPrinter::new("true").print(&page, "Selphy", 152.0, 102.0).is_ok());
        assert!(matches!(
            CommandPrinter::new("false").print(&page, "Selphy", 152.0, 102.0),
            Err(PrintError::Failed(_))
        ));
        assert!(matches!(
            CommandPrinter::new("/nonexistent/lp").print(&page, "Selphy", 152.0, 102.0),
            Err(PrintError::Spawn(_))
        ));
    }

    #[test]
    fn test_qr_code_is_png() {
        let png = QrCodeEncoder::default().encode("https://photos/abc.png").unwrap();
        let img = image::load_from_memory(&png).unwrap();
        assert!(img.width() >= 256);
        assert_eq!(img.width(), img.height());
    }
}

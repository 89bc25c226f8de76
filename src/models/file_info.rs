use serde::Serialize;

use crate::services::drive_client::DriveFileInfo;

/// Metadata payload for `GET /info/{fileId}`: the raw Drive fields plus the
/// derived type classifiers the plugin switches its preview UI on.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfoResponse {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub size: Option<u64>,
    pub size_formatted: Option<String>,
    pub created_time: String,
    pub modified_time: String,
    pub web_view_link: Option<String>,
    pub download_url: String,
    pub thumbnail_link: Option<String>,
    pub parents: Option<Vec<String>>,
    pub is_image: bool,
    pub is_document: bool,
    pub is_spreadsheet: bool,
    pub is_presentation: bool,
    pub is_pdf: bool,
    pub is_video: bool,
    pub is_audio: bool,
    pub is_archive: bool,
}

impl From<DriveFileInfo> for FileInfoResponse {
    fn from(file: DriveFileInfo) -> Self {
        let size = file.size_bytes();
        let mime = file.mime_type.as_str();
        Self {
            download_url: format!("/download/{}", file.id),
            size_formatted: size.map(format_file_size),
            size,
            is_image: mime.starts_with("image/"),
            is_document: is_document_type(mime),
            is_spreadsheet: mime.contains("spreadsheet") || mime.contains("excel"),
            is_presentation: mime.contains("presentation") || mime.contains("powerpoint"),
            is_pdf: mime == "application/pdf",
            is_video: mime.starts_with("video/"),
            is_audio: mime.starts_with("audio/"),
            is_archive: is_archive_type(mime),
            id: file.id,
            name: file.name,
            mime_type: file.mime_type,
            created_time: file.created_time,
            modified_time: file.modified_time,
            web_view_link: file.web_view_link,
            thumbnail_link: file.thumbnail_link,
            parents: file.parents,
        }
    }
}

/// Human-readable size, 1024-based, two decimals, trailing zeros trimmed.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    const UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];
    let exponent = ((bytes as f64).ln() / 1024_f64.ln()).floor() as usize;
    let exponent = exponent.min(UNITS.len() - 1);
    let value = bytes as f64 / 1024_f64.powi(exponent as i32);
    // Mirror JS parseFloat(value.toFixed(2)): at most two decimals, no
    // trailing zeros.
    let rounded = (value * 100.0).round() / 100.0;
    let mut text = format!("{:.2}", rounded);
    while text.ends_with('0') {
        text.pop();
    }
    if text.ends_with('.') {
        text.pop();
    }
    format!("{} {}", text, UNITS[exponent])
}

fn is_document_type(mime: &str) -> bool {
    matches!(
        mime,
        "application/vnd.google-apps.document"
            | "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            | "application/msword"
            | "text/plain"
            | "text/html"
            | "text/rtf"
    )
}

fn is_archive_type(mime: &str) -> bool {
    matches!(
        mime,
        "application/zip"
            | "application/x-rar-compressed"
            | "application/x-7z-compressed"
            | "application/gzip"
            | "application/x-tar"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdf_file() -> DriveFileInfo {
        DriveFileInfo {
            id: "a".repeat(28),
            name: "report.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
            size: Some("1048576".to_string()),
            created_time: "2024-01-01T00:00:00Z".to_string(),
            modified_time: "2024-01-02T00:00:00Z".to_string(),
            web_view_link: None,
            thumbnail_link: None,
            parents: None,
        }
    }

    #[test]
    fn pdf_sets_only_the_pdf_classifier() {
        let info = FileInfoResponse::from(pdf_file());
        assert!(info.is_pdf);
        assert!(!info.is_image);
        assert!(!info.is_document);
        assert!(!info.is_spreadsheet);
        assert!(!info.is_presentation);
        assert!(!info.is_video);
        assert!(!info.is_audio);
        assert!(!info.is_archive);
        assert_eq!(info.download_url, format!("/download/{}", "a".repeat(28)));
    }

    #[test]
    fn spreadsheet_classifier_matches_excel_mime() {
        let mut file = pdf_file();
        file.mime_type = "application/vnd.ms-excel".to_string();
        let info = FileInfoResponse::from(file);
        assert!(info.is_spreadsheet);
        assert!(!info.is_pdf);
    }

    #[test]
    fn format_file_size_uses_1024_units() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(512), "512 Bytes");
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(1048576), "1 MB");
        assert_eq!(format_file_size(1288490189), "1.2 GB");
    }
}

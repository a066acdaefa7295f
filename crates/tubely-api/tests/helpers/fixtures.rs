use axum_test::multipart::{MultipartForm, Part};

/// An `ftyp` box; enough for the stubbed prober and remuxer.
pub fn mp4_bytes() -> Vec<u8> {
    let mut bytes = b"\x00\x00\x00\x18ftypmp42\x00\x00\x00\x00mp42isom".to_vec();
    bytes.extend_from_slice(&[0u8; 1000]);
    bytes
}

pub fn png_bytes() -> Vec<u8> {
    b"\x89PNG\r\n\x1a\n\x00\x00\x00\x0dIHDR\x00\x00\x00\x01\x00\x00\x00\x01\x08\x02\x00\x00\x00"
        .to_vec()
}

/// Single-field form as a browser would send it.
pub fn file_form(field: &str, bytes: Vec<u8>, file_name: &str, mime_type: &str) -> MultipartForm {
    MultipartForm::new().add_part(
        field,
        Part::bytes(bytes).file_name(file_name).mime_type(mime_type),
    )
}

pub fn video_form(bytes: Vec<u8>) -> MultipartForm {
    file_form("video", bytes, "boots.mp4", "video/mp4")
}

//! Login link and QR code rendering.
//!
//! The admin page shows a QR code that opens `<base>/login.html?pwd=<code>`
//! on the scanning phone.  The image is returned inline as a
//! `data:image/png;base64,...` URL so the page can drop it into an `<img>`.

use std::io::Cursor;

use audio_gate_core::EncodingError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageFormat, Luma};
use qrcode::QrCode;
use url::Url;

/// Smallest edge length of the rendered QR image, in pixels.
pub const QR_MIN_SIZE: u32 = 300;

/// Path of the login page the QR code points at.
pub const LOGIN_PAGE_PATH: &str = "/login.html";

/// Query parameter the login page reads the code from.
pub const LOGIN_CODE_PARAM: &str = "pwd";

const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Builds the login link for `secret` under `base`.
///
/// Any path or query already on `base` is replaced.
///
/// # Errors
///
/// [`EncodingError::InvalidUrl`] if `base` does not parse or is not an
/// `http`/`https` URL.
pub fn login_url(base: &str, secret: &str) -> Result<Url, EncodingError> {
    let mut url =
        Url::parse(base).map_err(|e| EncodingError::InvalidUrl(format!("{base}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(EncodingError::InvalidUrl(format!(
            "{base}: expected an http or https base URL"
        )));
    }
    url.set_path(LOGIN_PAGE_PATH);
    url.set_fragment(None);
    url.query_pairs_mut()
        .clear()
        .append_pair(LOGIN_CODE_PARAM, secret);
    Ok(url)
}

/// Renders `data` as a QR code and returns it as a PNG data URL.
///
/// # Errors
///
/// [`EncodingError::Qr`] if the payload does not fit in a QR code,
/// [`EncodingError::Image`] if PNG encoding fails.
pub fn render_png_data_url(data: &str) -> Result<String, EncodingError> {
    let code = QrCode::new(data.as_bytes()).map_err(|e| EncodingError::Qr(e.to_string()))?;
    let pixels = code
        .render::<Luma<u8>>()
        .min_dimensions(QR_MIN_SIZE, QR_MIN_SIZE)
        .quiet_zone(true)
        .build();

    let mut png = Vec::new();
    DynamicImage::ImageLuma8(pixels)
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| EncodingError::Image(e.to_string()))?;

    Ok(format!("{PNG_DATA_URL_PREFIX}{}", STANDARD.encode(&png)))
}

/// Login link for `secret` rendered straight to a PNG data URL.
///
/// # Errors
///
/// See [`login_url`] and [`render_png_data_url`].
pub fn login_qr_data_url(base: &str, secret: &str) -> Result<String, EncodingError> {
    let url = login_url(base, secret)?;
    render_png_data_url(url.as_str())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

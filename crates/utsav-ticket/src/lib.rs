//! Ticket codec: a registration id rendered as a scannable QR image.
//!
//! The QR content is the bare decimal id and nothing else. Images are cheap to
//! rebuild, so ticket views regenerate them on every render instead of storing them.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use qrcode::QrCode;
use qrcode::render::svg;
use thiserror::Error;

/// Rendered images are at least this many pixels on each side.
const MIN_DIMENSION: u32 = 512;

#[derive(Debug, Error)]
pub enum TicketError {
    #[error("registration id must be positive, got {0}")]
    InvalidId(i64),
    #[error("QR encoding failed: {0}")]
    Encode(#[from] qrcode::types::QrError),
}

/// The string embedded in the QR code for a registration.
pub fn payload_for(registration_id: i64) -> String {
    registration_id.to_string()
}

/// Standalone SVG document encoding `payload_for(registration_id)`.
pub fn render_svg(registration_id: i64) -> Result<String, TicketError> {
    if registration_id <= 0 {
        return Err(TicketError::InvalidId(registration_id));
    }

    let code = QrCode::new(payload_for(registration_id).as_bytes())?;
    let image = code
        .render::<svg::Color>()
        .min_dimensions(MIN_DIMENSION, MIN_DIMENSION)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build();

    Ok(image)
}

/// Self-contained `data:` URL of the ticket image, ready for an `<img src>`.
pub fn data_url(registration_id: i64) -> Result<String, TicketError> {
    let svg = render_svg(registration_id)?;
    Ok(format!("data:image/svg+xml;base64,{}", B64.encode(svg.as_bytes())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_is_plain_decimal() {
        assert_eq!(payload_for(42), "42");
        assert_eq!(payload_for(1_000_007), "1000007");
    }

    #[test]
    fn rendering_is_deterministic() {
        assert_eq!(render_svg(42).unwrap(), render_svg(42).unwrap());
        assert_ne!(render_svg(42).unwrap(), render_svg(43).unwrap());
    }

    #[test]
    fn rejects_non_positive_ids() {
        assert!(matches!(render_svg(0), Err(TicketError::InvalidId(0))));
        assert!(matches!(data_url(-5), Err(TicketError::InvalidId(-5))));
    }

    #[test]
    fn data_url_wraps_the_svg() {
        let url = data_url(42).unwrap();
        let encoded = url.strip_prefix("data:image/svg+xml;base64,").unwrap();
        let decoded = String::from_utf8(B64.decode(encoded).unwrap()).unwrap();
        assert_eq!(decoded, render_svg(42).unwrap());
        assert!(decoded.contains("<svg"));
    }
}

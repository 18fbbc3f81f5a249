use std::borrow::Cow;

use chardetng::EncodingDetector;
use encoding_rs::Encoding;

/// Decode manifest bytes to text.
///
/// Manifests in the wild are often declared UTF-8 but saved in a legacy
/// code page. A BOM wins; otherwise valid UTF-8 is used as-is, and anything
/// else goes through chardetng and is transcoded with encoding_rs.
pub(crate) fn decode_manifest(bytes: &[u8]) -> (Cow<'_, str>, &'static Encoding) {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return (text, encoding);
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        return (Cow::Borrowed(text), encoding_rs::UTF_8);
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);
    let (text, _, had_errors) = encoding.decode(bytes);
    tracing::warn!(
        encoding = encoding.name(),
        had_errors,
        "imsmanifest.xml is not valid UTF-8, transcoded"
    );
    (text, encoding)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_is_borrowed() {
        let (text, encoding) = decode_manifest("<a>ñ</a>".as_bytes());
        assert!(matches!(text, Cow::Borrowed(_)));
        assert_eq!(encoding, encoding_rs::UTF_8);
    }

    #[test]
    fn bom_is_stripped() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"<a/>");
        let (text, _) = decode_manifest(&bytes);
        assert_eq!(text, "<a/>");
    }

    #[test]
    fn latin1_is_transcoded() {
        // "Introducción" in windows-1252.
        let bytes = b"<title>Introducci\xf3n a las fracciones y la divisi\xf3n</title>";
        let (text, encoding) = decode_manifest(bytes);
        assert_ne!(encoding, encoding_rs::UTF_8);
        assert!(text.contains("Introducción"));
        assert!(text.contains("división"));
    }
}

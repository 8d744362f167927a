//! Marker search in decompressed module data
//!
//! Build strings sit close to the metadata tables at the end of the
//! read-only segment, so the search runs backward and the last occurrence
//! wins when a module carries several similar markers.

use memchr::{memchr, memmem};

/// Offset of the last occurrence of `marker` in `data`.
pub fn find_last(data: &[u8], marker: &[u8]) -> Option<usize> {
    if marker.is_empty() {
        return None;
    }
    memmem::rfind(data, marker)
}

/// Read the NUL-terminated string at the last occurrence of `marker`.
///
/// The returned string starts with the marker itself.
pub fn read_marker_string(data: &[u8], marker: &str) -> Option<String> {
    let offset = find_last(data, marker.as_bytes())?;
    Some(read_cstr(&data[offset..]))
}

/// Decode a NUL-terminated UTF-8 string, or the whole slice if unterminated.
pub fn read_cstr(data: &[u8]) -> String {
    let end = memchr(0, data).unwrap_or(data.len());
    String::from_utf8_lossy(&data[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_last_prefers_highest_offset() {
        let data = b"xxSDK MW-1\0yySDK MW-2\0";
        assert_eq!(find_last(data, b"SDK MW"), Some(13));
    }

    #[test]
    fn test_find_last_missing() {
        assert_eq!(find_last(b"nothing here", b"SDK MW"), None);
        assert_eq!(find_last(b"SDK", b"SDK MW"), None);
        assert_eq!(find_last(b"abc", b""), None);
    }

    #[test]
    fn test_read_marker_string() {
        let mut data = vec![0u8; 32];
        data.extend_from_slice(b"SDK MW+Nintendo+NintendoSDK_nnSdk-5_1_0-Release\0trailing");
        assert_eq!(
            read_marker_string(&data, "SDK MW").as_deref(),
            Some("SDK MW+Nintendo+NintendoSDK_nnSdk-5_1_0-Release")
        );
    }

    #[test]
    fn test_read_marker_string_unterminated() {
        let data = b"....SDK MW-1_0_0-Debug";
        assert_eq!(
            read_marker_string(data, "SDK MW").as_deref(),
            Some("SDK MW-1_0_0-Debug")
        );
    }

    #[test]
    fn test_read_cstr() {
        assert_eq!(read_cstr(b"nnSdk\0rest"), "nnSdk");
        assert_eq!(read_cstr(b"\0"), "");
        assert_eq!(read_cstr(b""), "");
    }
}

//! Response header extraction.

use reqwest::header::{HeaderMap, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE};
use reqwest::StatusCode;
use transport_traits::TransferInfo;

/// Build a [`TransferInfo`] from response headers.
///
/// For a 206 response the total length comes from `Content-Range`; for a
/// plain 200 it is `Content-Length` (only meaningful when the transfer
/// started at offset zero — `resume_from` is carried to reject the
/// ambiguous case).
pub(crate) fn extract_info(headers: &HeaderMap, status: StatusCode, resume_from: u64) -> TransferInfo {
    let total_length = if status == StatusCode::PARTIAL_CONTENT {
        header_str(headers, CONTENT_RANGE.as_str()).and_then(content_range_total)
    } else if resume_from == 0 {
        header_str(headers, CONTENT_LENGTH.as_str()).and_then(|v| v.parse().ok())
    } else {
        None
    };

    TransferInfo {
        total_length: total_length.filter(|&len| len > 0),
        station_name: header_str(headers, "icy-name")
            .or_else(|| header_str(headers, "ice-name"))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from),
        metadata_interval: header_str(headers, "icy-metaint")
            .and_then(|v| v.trim().parse().ok())
            .filter(|&n: &usize| n > 0),
        content_type: header_str(headers, CONTENT_TYPE.as_str()).map(String::from),
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Total length from a `Content-Range` value: `bytes 100-999/1000` -> 1000.
/// A server that does not know the total sends `bytes 100-999/*`.
fn content_range_total(value: &str) -> Option<u64> {
    let (_, total) = value.rsplit_once('/')?;
    total.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(
                reqwest::header::HeaderName::from_bytes(k.as_bytes()).unwrap(),
                HeaderValue::from_str(v).unwrap(),
            );
        }
        map
    }

    #[test]
    fn test_content_range_total() {
        assert_eq!(content_range_total("bytes 100-999/1000"), Some(1000));
        assert_eq!(content_range_total("bytes 0-0/52"), Some(52));
        assert_eq!(content_range_total("bytes 100-999/*"), None);
        assert_eq!(content_range_total("garbage"), None);
    }

    #[test]
    fn test_extract_info_plain_200() {
        let map = headers(&[("content-length", "4096"), ("content-type", "audio/mpeg")]);
        let info = extract_info(&map, StatusCode::OK, 0);
        assert_eq!(info.total_length, Some(4096));
        assert_eq!(info.content_type.as_deref(), Some("audio/mpeg"));
        assert_eq!(info.metadata_interval, None);
    }

    #[test]
    fn test_extract_info_partial_content() {
        let map = headers(&[("content-range", "bytes 500-999/1000")]);
        let info = extract_info(&map, StatusCode::PARTIAL_CONTENT, 500);
        assert_eq!(info.total_length, Some(1000));
    }

    #[test]
    fn test_extract_info_icy_headers() {
        let map = headers(&[("icy-name", " Some Station "), ("icy-metaint", "16000")]);
        let info = extract_info(&map, StatusCode::OK, 0);
        assert_eq!(info.station_name.as_deref(), Some("Some Station"));
        assert_eq!(info.metadata_interval, Some(16000));
    }

    #[test]
    fn test_extract_info_zero_length_is_unknown() {
        // Shoutcast servers report content-length 0 for endless streams.
        let map = headers(&[("content-length", "0")]);
        let info = extract_info(&map, StatusCode::OK, 0);
        assert_eq!(info.total_length, None);
    }

    #[test]
    fn test_content_length_ignored_after_resume() {
        let map = headers(&[("content-length", "500")]);
        let info = extract_info(&map, StatusCode::OK, 500);
        assert_eq!(info.total_length, None);
    }
}

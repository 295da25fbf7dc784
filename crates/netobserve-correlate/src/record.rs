/// A single HTTP request, and its response once paired, keyed by the
/// TCP five-tuple it was captured on (§3, §4.4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRecord {
    pub src_ip: String,
    pub src_port: u32,
    pub dst_ip: String,
    pub dst_port: u32,
    pub src: String,
    pub src_ns: String,
    pub dst: String,
    pub dst_ns: String,
    pub method: String,
    pub url: String,
    pub status: Option<String>,
    pub request_timestamp_nanos: i64,
    pub response_timestamp_nanos: Option<i64>,
    pub tcp_request_timestamp: Vec<u8>,
    pub tcp_response_timestamp: Option<Vec<u8>>,
}

impl RequestRecord {
    /// Duration between request and response, in seconds. `None` until a
    /// response has been paired. Clamped to zero if the response timestamp
    /// does not postdate the request (clock skew, out-of-order capture).
    #[must_use]
    pub fn duration_seconds(&self) -> Option<f64> {
        let response_nanos = self.response_timestamp_nanos?;
        let response_micros = response_nanos / 1_000;
        let request_micros = self.request_timestamp_nanos / 1_000;
        if response_micros <= request_micros {
            Some(0.0)
        } else {
            Some((response_micros - request_micros) as f64 / 1_000_000.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(request_nanos: i64, response_nanos: Option<i64>) -> RequestRecord {
        RequestRecord {
            src_ip: "10.1.1.1".to_string(),
            src_port: 123,
            dst_ip: "10.1.2.2".to_string(),
            dst_port: 456,
            src: String::new(),
            src_ns: String::new(),
            dst: String::new(),
            dst_ns: String::new(),
            method: "GET".to_string(),
            url: "/x".to_string(),
            status: None,
            request_timestamp_nanos: request_nanos,
            response_timestamp_nanos: response_nanos,
            tcp_request_timestamp: vec![1, 2, 3],
            tcp_response_timestamp: None,
        }
    }

    #[test]
    fn unpaired_request_has_no_duration() {
        assert_eq!(record(0, None).duration_seconds(), None);
    }

    #[test]
    fn duration_is_response_minus_request_in_seconds() {
        let r = record(1_000_000_000, Some(1_250_000_000));
        assert_eq!(r.duration_seconds(), Some(0.25));
    }

    #[test]
    fn out_of_order_response_clamps_to_zero() {
        let r = record(2_000_000_000, Some(1_000_000_000));
        assert_eq!(r.duration_seconds(), Some(0.0));
    }
}

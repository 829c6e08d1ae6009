//! Key layout for the `jobs` partition: `job:{job_id}` -> Job (JSON).

/// Encode a job key: `job:{job_id}`
pub fn encode_job_key(job_id: &str) -> Vec<u8> {
    format!("job:{job_id}").into_bytes()
}

/// Decode a job key back to its job id.
pub fn decode_job_key(key: &[u8]) -> Option<String> {
    let key_str = std::str::from_utf8(key).ok()?;
    key_str.strip_prefix("job:").map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_key_round_trip() {
        let key = encode_job_key("0192-abc");
        assert_eq!(key, b"job:0192-abc");
        assert_eq!(decode_job_key(&key).unwrap(), "0192-abc");
    }

    #[test]
    fn decode_rejects_foreign_keys() {
        assert!(decode_job_key(b"meta:cursor").is_none());
        assert!(decode_job_key(&[0xff, 0xfe]).is_none());
    }
}

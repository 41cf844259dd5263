use tracing::{self, error, warn};

// For signature verification
use hmac::{Hmac, Mac};
use sha1::Sha1;
use subtle::ConstantTimeEq;
type HmacSha1 = Hmac<Sha1>;

/// The only algorithm tag accepted in `X-Hub-Signature`
pub const SIGNATURE_ALGORITHM: &str = "sha1";

/// Splits a signature header on the first `=` into (algorithm tag, hex digest).
/// A header without `=` yields an empty digest.
pub fn split_signature_header(signature_header: &str) -> (&str, &str) {
    signature_header
        .split_once('=')
        .unwrap_or((signature_header, ""))
}

/// Lowercase hex HMAC-SHA1 of `body` keyed by `secret`.
pub fn compute_signature(secret: &[u8], body: &[u8]) -> Option<String> {
    let mut mac = HmacSha1::new_from_slice(secret).ok()?;
    mac.update(body);
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Verifies a GitHub `X-Hub-Signature` header (`sha1=<hexdigest>`) against the raw body.
///
/// The computed digest is compared to the supplied one in constant time.
pub fn verify_github_signature(secret: &[u8], signature_header: &str, body: &[u8]) -> bool {
    let (algorithm, git_signature) = split_signature_header(signature_header);
    if algorithm != SIGNATURE_ALGORITHM {
        warn!("Unexpected signature hash algorithm: {:?}", algorithm);
        return false;
    }

    let Some(my_sig) = compute_signature(secret, body) else {
        error!("Could not compute HMAC for the request body");
        return false;
    };
    let matches: bool = my_sig.as_bytes().ct_eq(git_signature.as_bytes()).into();
    if !matches {
        warn!("Signature verification failed");
    }
    matches
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"It's a Secret to Everybody";
    const BODY: &[u8] = b"Hello, World!";

    fn header_for(secret: &[u8], body: &[u8]) -> String {
        format!("sha1={}", compute_signature(secret, body).unwrap())
    }

    #[test]
    fn computes_known_hmac_sha1() {
        // RFC 2202 test case 2
        assert_eq!(
            compute_signature(b"Jefe", b"what do ya want for nothing?").unwrap(),
            "effcdf6ae5eb2fa2d27416d5f184df9c259a7c79"
        );
    }

    #[test]
    fn accepts_valid_signature() {
        let header = header_for(SECRET, BODY);
        assert!(verify_github_signature(SECRET, &header, BODY));
    }

    #[test]
    fn accepts_empty_body() {
        let header = header_for(SECRET, b"");
        assert!(verify_github_signature(SECRET, &header, b""));
    }

    #[test]
    fn rejects_any_single_bit_flip() {
        let header = header_for(SECRET, BODY);
        for byte in 0..BODY.len() {
            for bit in 0..8 {
                let mut tampered = BODY.to_vec();
                tampered[byte] ^= 1 << bit;
                assert!(
                    !verify_github_signature(SECRET, &header, &tampered),
                    "flip at byte {} bit {} was accepted",
                    byte,
                    bit
                );
            }
        }
    }

    #[test]
    fn rejects_wrong_secret() {
        let header = header_for(b"other secret", BODY);
        assert!(!verify_github_signature(SECRET, &header, BODY));
    }

    #[test]
    fn rejects_other_algorithms_even_with_correct_digest() {
        let digest = compute_signature(SECRET, BODY).unwrap();
        for tag in ["sha256", "SHA1", "md5", ""] {
            let header = format!("{}={}", tag, digest);
            assert!(!verify_github_signature(SECRET, &header, BODY), "tag {:?}", tag);
        }
    }

    #[test]
    fn rejects_uppercase_digest() {
        let header = format!("sha1={}", compute_signature(SECRET, BODY).unwrap().to_uppercase());
        assert!(!verify_github_signature(SECRET, &header, BODY));
    }

    #[test]
    fn rejects_malformed_headers() {
        assert!(!verify_github_signature(SECRET, "sha1", BODY));
        assert!(!verify_github_signature(SECRET, "sha1=", BODY));
        assert!(!verify_github_signature(SECRET, "sha1=zz", BODY));
    }

    #[test]
    fn splits_on_first_equals_only() {
        assert_eq!(split_signature_header("sha1=ab=cd"), ("sha1", "ab=cd"));
        assert_eq!(split_signature_header("sha1"), ("sha1", ""));
    }
}

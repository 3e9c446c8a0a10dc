//! Signed double-submit CSRF tokens.
//!
//! A token is `<nonce>.<hmac(nonce)>`, both base64url. The server hands it out
//! as a cookie; mutating requests must echo it in a header. A forged cookie
//! without the server key fails the signature check.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const NONCE_LEN: usize = 32;

pub fn issue_token(secret: &[u8]) -> anyhow::Result<String> {
    let mut nonce = [0u8; NONCE_LEN];
    getrandom::getrandom(&mut nonce)
        .map_err(|e| anyhow::anyhow!("OS random source unavailable: {}", e))?;

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| anyhow::anyhow!("Invalid CSRF key: {}", e))?;
    mac.update(&nonce);
    let sig = mac.finalize().into_bytes();

    Ok(format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(nonce),
        URL_SAFE_NO_PAD.encode(sig)
    ))
}

pub fn verify_token(secret: &[u8], token: &str) -> bool {
    let Some((nonce_b64, sig_b64)) = token.split_once('.') else {
        return false;
    };
    let (Ok(nonce), Ok(sig)) = (
        URL_SAFE_NO_PAD.decode(nonce_b64),
        URL_SAFE_NO_PAD.decode(sig_b64),
    ) else {
        return false;
    };
    if nonce.len() != NONCE_LEN {
        return false;
    }

    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(&nonce);
    mac.verify_slice(&sig).is_ok()
}

/// The header copy must match the cookie copy and carry our signature.
pub fn tokens_match(secret: &[u8], cookie: &str, header: &str) -> bool {
    let same = cookie.len() == header.len()
        && cookie
            .bytes()
            .zip(header.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0;
    same && verify_token(secret, cookie)
}

//! HTTP digest access authentication (RFC 7616).
//!
//! Supports the MD5 and MD5-sess algorithms with `qop=auth`, plus the legacy
//! RFC 2069 form when the server offers no qop. That covers what the
//! Ops Manager public API issues.

use std::collections::HashMap;
use std::fmt::Write as _;

use super::Credentials;

/// Digest hash algorithm named in the challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Md5,
    Md5Sess,
}

impl Algorithm {
    fn as_str(self) -> &'static str {
        match self {
            Self::Md5 => "MD5",
            Self::Md5Sess => "MD5-sess",
        }
    }
}

/// A parsed `WWW-Authenticate: Digest ...` challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestChallenge {
    pub realm: String,
    pub nonce: String,
    pub opaque: Option<String>,
    /// `true` when the server offered `qop=auth`.
    pub qop_auth: bool,
    pub algorithm: Algorithm,
}

impl DigestChallenge {
    /// Parse a `WWW-Authenticate` header value.
    ///
    /// Returns `None` for non-digest schemes, challenges without realm or
    /// nonce, and algorithms other than MD5 / MD5-sess.
    pub fn parse(header: &str) -> Option<Self> {
        let header = header.trim_start();
        let (scheme, rest) = header.split_once(char::is_whitespace)?;
        if !scheme.eq_ignore_ascii_case("digest") {
            return None;
        }

        let mut params = parse_params(rest);
        let realm = params.remove("realm")?;
        let nonce = params.remove("nonce")?;

        let algorithm = match params.get("algorithm").map(|a| a.to_ascii_lowercase()) {
            None => Algorithm::Md5,
            Some(a) if a == "md5" => Algorithm::Md5,
            Some(a) if a == "md5-sess" => Algorithm::Md5Sess,
            Some(_) => return None,
        };

        let qop_auth = params
            .get("qop")
            .is_some_and(|qop| qop.split(',').any(|q| q.trim().eq_ignore_ascii_case("auth")));

        Some(Self {
            realm,
            nonce,
            opaque: params.remove("opaque"),
            qop_auth,
            algorithm,
        })
    }

    /// Build the `Authorization` header value answering this challenge.
    ///
    /// `uri` is the request target (path plus query), `nc` the nonce count.
    pub fn authorization(
        &self,
        credentials: &Credentials,
        method: &str,
        uri: &str,
        cnonce: &str,
        nc: u32,
    ) -> String {
        let nc = format!("{nc:08x}");

        let mut ha1 = md5_hex(&format!(
            "{}:{}:{}",
            credentials.public_key, self.realm, credentials.private_key
        ));
        if self.algorithm == Algorithm::Md5Sess {
            ha1 = md5_hex(&format!("{ha1}:{}:{cnonce}", self.nonce));
        }
        let ha2 = md5_hex(&format!("{method}:{uri}"));

        let response = if self.qop_auth {
            md5_hex(&format!("{ha1}:{}:{nc}:{cnonce}:auth:{ha2}", self.nonce))
        } else {
            md5_hex(&format!("{ha1}:{}:{ha2}", self.nonce))
        };

        let mut header = format!(
            "Digest username=\"{}\", realm=\"{}\", nonce=\"{}\", uri=\"{uri}\", response=\"{response}\", algorithm={}",
            credentials.public_key,
            self.realm,
            self.nonce,
            self.algorithm.as_str()
        );
        if self.qop_auth {
            let _ = write!(header, ", qop=auth, nc={nc}, cnonce=\"{cnonce}\"");
        }
        if let Some(opaque) = &self.opaque {
            let _ = write!(header, ", opaque=\"{opaque}\"");
        }
        header
    }
}

/// Fresh client nonce.
pub fn generate_cnonce() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..16].to_string()
}

fn md5_hex(input: &str) -> String {
    format!("{:x}", md5::compute(input))
}

/// Split `key=value, key="quoted, value"` pairs. Keys are lowercased.
fn parse_params(input: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    let mut chars = input.chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace() || *c == ',') {
            chars.next();
        }
        if chars.peek().is_none() {
            break;
        }

        let mut key = String::new();
        while let Some(&c) = chars.peek() {
            if c == '=' || c == ',' {
                break;
            }
            key.push(c);
            chars.next();
        }
        if chars.next_if_eq(&'=').is_none() {
            // bare token without a value
            continue;
        }

        while chars.next_if(|c| c.is_whitespace()).is_some() {}

        let mut value = String::new();
        if chars.next_if_eq(&'"').is_some() {
            while let Some(c) = chars.next() {
                match c {
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            value.push(escaped);
                        }
                    }
                    '"' => break,
                    _ => value.push(c),
                }
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c == ',' {
                    break;
                }
                value.push(c);
                chars.next();
            }
            value = value.trim_end().to_string();
        }

        params.insert(key.trim().to_ascii_lowercase(), value);
    }

    params
}

//! Secured API key derivation
//!
//! A secured API key is `base64(hex(HMAC-SHA256(master_key, query)) + query)`,
//! where `query` is the form-urlencoded restriction set with keys in ascending
//! order. The service recomputes the HMAC from the embedded query, so a token
//! carries its own restrictions and needs no server-side lookup.
//!
//! Tokens must match other client libraries byte for byte, which is why the
//! encoding is fixed: standard padded base64, lowercase hex, `+` for spaces.

use std::{
    collections::{BTreeMap, HashMap},
    time::Duration,
};

use algoliasearch_types::{Error, Result};
use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Length of a hex-encoded SHA-256 HMAC
const SIGNATURE_HEX_LEN: usize = 64;

pub const TAG_FILTERS: &str = "tagFilters";
pub const USER_TOKEN: &str = "userToken";
pub const VALID_UNTIL: &str = "validUntil";
pub const RESTRICT_INDICES: &str = "restrictIndices";
pub const RESTRICT_SOURCES: &str = "restrictSources";

/// Restrictions embedded in a secured API key
///
/// A bare tag filter string is shorthand for `{tagFilters: value}` and yields
/// exactly the same token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Restrictions {
    TagFilters(String),
    Params(BTreeMap<String, String>),
}

impl Default for Restrictions {
    fn default() -> Self {
        Restrictions::Params(BTreeMap::new())
    }
}

impl Restrictions {
    /// Empty restriction set
    pub fn new() -> Self {
        Self::default()
    }

    /// Canonical mapping form
    pub fn into_params(self) -> BTreeMap<String, String> {
        match self {
            Restrictions::TagFilters(tag_filters) => {
                BTreeMap::from([(TAG_FILTERS.to_string(), tag_filters)])
            },
            Restrictions::Params(params) => params,
        }
    }

    /// Set any restriction; unknown names are forwarded unchanged
    pub fn param(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let mut params = self.into_params();
        params.insert(name.into(), value.into());
        Restrictions::Params(params)
    }

    pub fn tag_filters(self, tag_filters: impl Into<String>) -> Self {
        self.param(TAG_FILTERS, tag_filters)
    }

    pub fn user_token(self, user_token: impl Into<String>) -> Self {
        self.param(USER_TOKEN, user_token)
    }

    /// Expiry as a unix timestamp in seconds
    pub fn valid_until(self, unix_secs: i64) -> Self {
        self.param(VALID_UNTIL, unix_secs.to_string())
    }

    /// Expiry relative to now
    pub fn valid_for(self, duration: Duration) -> Self {
        let secs = i64::try_from(duration.as_secs()).unwrap_or(i64::MAX);
        let expires = Utc::now().timestamp().saturating_add(secs);
        self.valid_until(expires)
    }

    /// Limit the key to the given index names (or patterns)
    pub fn restrict_indices<I, S>(self, indices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined =
            indices.into_iter().map(|s| s.as_ref().to_string()).collect::<Vec<_>>().join(",");
        self.param(RESTRICT_INDICES, joined)
    }

    /// Limit the key to the given IPv4 network (CIDR)
    pub fn restrict_sources(self, sources: impl Into<String>) -> Self {
        self.param(RESTRICT_SOURCES, sources)
    }

    /// Form-urlencoded query with keys in ascending order
    pub fn to_query(&self) -> String {
        match self {
            Restrictions::TagFilters(tag_filters) => {
                encode_query([(TAG_FILTERS, tag_filters.as_str())])
            },
            Restrictions::Params(params) => {
                encode_query(params.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            },
        }
    }
}

impl From<&str> for Restrictions {
    fn from(tag_filters: &str) -> Self {
        Restrictions::TagFilters(tag_filters.to_string())
    }
}

impl From<String> for Restrictions {
    fn from(tag_filters: String) -> Self {
        Restrictions::TagFilters(tag_filters)
    }
}

impl From<BTreeMap<String, String>> for Restrictions {
    fn from(params: BTreeMap<String, String>) -> Self {
        Restrictions::Params(params)
    }
}

impl From<HashMap<String, String>> for Restrictions {
    fn from(params: HashMap<String, String>) -> Self {
        Restrictions::Params(params.into_iter().collect())
    }
}

impl TryFrom<Value> for Restrictions {
    type Error = Error;

    /// Accepts a string (tag filters) or an object of string, number or boolean values
    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::String(tag_filters) => Ok(Restrictions::TagFilters(tag_filters)),
            Value::Object(map) => {
                let mut params = BTreeMap::new();
                for (name, value) in map {
                    let value = match value {
                        Value::String(s) => s,
                        Value::Number(n) => n.to_string(),
                        Value::Bool(b) => b.to_string(),
                        other => {
                            return Err(Error::KeyGeneration(format!(
                                "restriction '{}' must be a string, number or boolean, got {}",
                                name,
                                json_type(&other)
                            )));
                        },
                    };
                    params.insert(name, value);
                }
                Ok(Restrictions::Params(params))
            },
            other => Err(Error::KeyGeneration(format!(
                "restrictions must be a string or an object, got {}",
                json_type(&other)
            ))),
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Form-urlencode key/value pairs in the order given
pub fn encode_query<'a, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    url::form_urlencoded::Serializer::new(String::new()).extend_pairs(pairs).finish()
}

/// Derive a secured API key from a master key
pub fn generate_secured_api_key(
    master_key: &str,
    restrictions: impl Into<Restrictions>,
) -> Result<String> {
    let query = restrictions.into().to_query();
    let signature = sign(master_key, &query)?;
    Ok(STANDARD.encode(format!("{}{}", signature, query)))
}

/// Derive a secured API key with a `userToken` restriction
///
/// The user token overrides any `userToken` already present in `restrictions`.
pub fn generate_secured_api_key_with_user_token(
    master_key: &str,
    restrictions: impl Into<Restrictions>,
    user_token: impl Into<String>,
) -> Result<String> {
    generate_secured_api_key(master_key, restrictions.into().user_token(user_token))
}

fn mac(master_key: &str) -> Result<HmacSha256> {
    HmacSha256::new_from_slice(master_key.as_bytes())
        .map_err(|e| Error::KeyGeneration(format!("invalid master key: {}", e)))
}

fn sign(master_key: &str, query: &str) -> Result<String> {
    let mut mac = mac(master_key)?;
    mac.update(query.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Decoded contents of a secured API key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecuredApiKey {
    /// Hex-encoded HMAC as embedded in the token
    pub signature: String,
    /// Query string exactly as embedded in the token
    pub query: String,
}

impl SecuredApiKey {
    /// Restrictions parsed from the embedded query
    pub fn restrictions(&self) -> BTreeMap<String, String> {
        url::form_urlencoded::parse(self.query.as_bytes()).into_owned().collect()
    }

    /// `validUntil` restriction, if present and numeric
    pub fn valid_until(&self) -> Option<i64> {
        self.restrictions().get(VALID_UNTIL).and_then(|v| v.parse().ok())
    }
}

/// Split a secured API key into signature and query
pub fn decode_secured_api_key(token: &str) -> Result<SecuredApiKey> {
    let bytes = STANDARD
        .decode(token.trim())
        .map_err(|e| Error::KeyGeneration(format!("secured API key is not valid base64: {}", e)))?;
    let decoded = String::from_utf8(bytes)
        .map_err(|_| Error::KeyGeneration("secured API key is not valid UTF-8".to_string()))?;

    if decoded.len() < SIGNATURE_HEX_LEN || !decoded.is_char_boundary(SIGNATURE_HEX_LEN) {
        return Err(Error::KeyGeneration("secured API key is too short".to_string()));
    }
    let (signature, query) = decoded.split_at(SIGNATURE_HEX_LEN);
    if !signature.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(Error::KeyGeneration("secured API key signature is not hex".to_string()));
    }

    Ok(SecuredApiKey { signature: signature.to_string(), query: query.to_string() })
}

/// Check that a secured API key was derived from `master_key`
///
/// The comparison runs in constant time. A well-formed token signed with a
/// different key yields `Ok(false)`; a malformed token is an error.
pub fn verify_secured_api_key(token: &str, master_key: &str) -> Result<bool> {
    let key = decode_secured_api_key(token)?;
    let signature = hex::decode(&key.signature)
        .map_err(|e| Error::KeyGeneration(format!("invalid signature: {}", e)))?;

    let mut mac = mac(master_key)?;
    mac.update(key.query.as_bytes());
    Ok(mac.verify_slice(&signature).is_ok())
}

/// Seconds until the key's `validUntil`, negative once expired
pub fn remaining_validity(token: &str) -> Result<i64> {
    let valid_until = decode_secured_api_key(token)?.valid_until().ok_or_else(|| {
        Error::KeyGeneration("secured API key has no numeric validUntil".to_string())
    })?;
    Ok(valid_until.saturating_sub(Utc::now().timestamp()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const MASTER_KEY: &str = "182634d8894831d5dbce3b3185c50881";

    #[test]
    fn test_known_tag_filters_token() {
        let token = generate_secured_api_key(MASTER_KEY, "(public,user1)").unwrap();
        assert_eq!(
            token,
            "MDZkNWNjNDY4M2MzMDA0NmUyNmNkZjY5OTMzYjVlNmVlMTk1NTEwMGNmNTVjZmJhMmIwOTIzYjdjMTk2NTFiMnRhZ0ZpbHRlcnM9JTI4cHVibGljJTJDdXNlcjElMjk="
        );
    }

    #[test]
    fn test_known_user_token_token() {
        let token =
            generate_secured_api_key_with_user_token(MASTER_KEY, "(public,user1)", "42").unwrap();
        assert_eq!(
            token,
            "OGYwN2NlNTdlOGM2ZmM4MjA5NGM0ZmYwNTk3MDBkNzMzZjQ0MDI3MWZjNTNjM2Y3YTAzMWM4NTBkMzRiNTM5YnRhZ0ZpbHRlcnM9JTI4cHVibGljJTJDdXNlcjElMjkmdXNlclRva2VuPTQy"
        );
    }

    #[test]
    fn test_empty_restrictions() {
        let token = generate_secured_api_key(MASTER_KEY, Restrictions::new()).unwrap();
        assert_eq!(
            token,
            "M2YwYzg3NzQ0NTYzNmY0NDZlZTdmMGEzZTQ5OTE0ZThkMmM3ODRkNTI3NTgxMGZmZDM3NDIzOTRlNzJjMjQ1Yg=="
        );
        assert!(verify_secured_api_key(&token, MASTER_KEY).unwrap());
        assert_eq!(decode_secured_api_key(&token).unwrap().query, "");
    }

    #[test]
    fn test_scalar_and_mapping_equivalent() {
        for tags in ["public", "(public,user1)", "a b&c=d", ""] {
            let scalar = generate_secured_api_key(MASTER_KEY, tags).unwrap();
            let restrictions = Restrictions::new().tag_filters(tags);
            let mapping = generate_secured_api_key(MASTER_KEY, restrictions).unwrap();
            assert_eq!(scalar, mapping, "tag filters {tags:?}");
        }
    }

    #[test]
    fn test_user_token_argument_equivalent() {
        let inline = generate_secured_api_key(
            MASTER_KEY,
            BTreeMap::from([
                ("tagFilters".to_string(), "(public,user1)".to_string()),
                ("userToken".to_string(), "42".to_string()),
            ]),
        )
        .unwrap();
        let argument =
            generate_secured_api_key_with_user_token(MASTER_KEY, "(public,user1)", "42").unwrap();
        assert_eq!(inline, argument);
    }

    #[test]
    fn test_user_token_argument_overrides() {
        let restrictions = Restrictions::new().tag_filters("x").user_token("1");
        let overridden =
            generate_secured_api_key_with_user_token(MASTER_KEY, restrictions, "2").unwrap();
        let decoded = decode_secured_api_key(&overridden).unwrap();
        assert_eq!(decoded.restrictions().get("userToken"), Some(&"2".to_string()));
    }

    #[test]
    fn test_query_is_sorted_and_form_encoded() {
        let restrictions = Restrictions::new()
            .valid_until(1_700_000_000)
            .restrict_indices(["index1", "index2"])
            .param("filters", "brand:apple AND price<100");

        assert_eq!(
            restrictions.to_query(),
            "filters=brand%3Aapple+AND+price%3C100&restrictIndices=index1%2Cindex2&validUntil=1700000000"
        );
    }

    #[test]
    fn test_unknown_keys_forwarded() {
        let restrictions = Restrictions::new().param("someFutureRestriction", "value");
        let token = generate_secured_api_key(MASTER_KEY, restrictions).unwrap();
        let decoded = decode_secured_api_key(&token).unwrap();
        assert_eq!(decoded.query, "someFutureRestriction=value");
    }

    #[test]
    fn test_hash_map_matches_btree_map() {
        let hash = HashMap::from([
            ("userToken".to_string(), "user-1".to_string()),
            ("restrictSources".to_string(), "192.168.1.0/24".to_string()),
            ("tagFilters".to_string(), "public".to_string()),
        ]);
        let btree: BTreeMap<String, String> = hash.clone().into_iter().collect();

        assert_eq!(
            generate_secured_api_key(MASTER_KEY, hash).unwrap(),
            generate_secured_api_key(MASTER_KEY, btree).unwrap()
        );
    }

    #[test]
    fn test_try_from_json() {
        let restrictions =
            Restrictions::try_from(json!({"tagFilters": "(public,user1)", "userToken": 42}))
                .unwrap();
        assert_eq!(
            generate_secured_api_key(MASTER_KEY, restrictions).unwrap(),
            "OGYwN2NlNTdlOGM2ZmM4MjA5NGM0ZmYwNTk3MDBkNzMzZjQ0MDI3MWZjNTNjM2Y3YTAzMWM4NTBkMzRiNTM5YnRhZ0ZpbHRlcnM9JTI4cHVibGljJTJDdXNlcjElMjkmdXNlclRva2VuPTQy"
        );

        let restrictions = Restrictions::try_from(json!("(public,user1)")).unwrap();
        assert_eq!(restrictions, Restrictions::TagFilters("(public,user1)".to_string()));

        let restrictions = Restrictions::try_from(json!({"analytics": false})).unwrap();
        assert_eq!(restrictions.to_query(), "analytics=false");
    }

    #[test]
    fn test_try_from_json_rejects_other_shapes() {
        let rejected = [
            json!(42),
            json!(null),
            json!(["a"]),
            json!({"tags": ["a", "b"]}),
            json!({"x": null}),
        ];
        for value in rejected {
            let err = Restrictions::try_from(value).unwrap_err();
            assert!(matches!(err, Error::KeyGeneration(_)));
        }
    }

    #[test]
    fn test_verify_round_trip() {
        let restrictions = Restrictions::new()
            .tag_filters("public")
            .user_token("user 1")
            .restrict_sources("10.0.0.0/8");
        let token = generate_secured_api_key(MASTER_KEY, restrictions.clone()).unwrap();

        assert!(verify_secured_api_key(&token, MASTER_KEY).unwrap());
        assert!(!verify_secured_api_key(&token, "another-master-key").unwrap());

        let decoded = decode_secured_api_key(&token).unwrap();
        assert_eq!(decoded.restrictions(), restrictions.into_params());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_secured_api_key("not base64!").is_err());
        assert!(decode_secured_api_key(&STANDARD.encode("short")).is_err());
        assert!(decode_secured_api_key(&STANDARD.encode("z".repeat(70))).is_err());
    }

    #[test]
    fn test_remaining_validity() {
        let future = Utc::now().timestamp() + 3600;
        let token =
            generate_secured_api_key(MASTER_KEY, Restrictions::new().valid_until(future)).unwrap();
        let remaining = remaining_validity(&token).unwrap();
        assert!(remaining > 3500 && remaining <= 3600);

        let past = Utc::now().timestamp() - 60;
        let token =
            generate_secured_api_key(MASTER_KEY, Restrictions::new().valid_until(past)).unwrap();
        assert!(remaining_validity(&token).unwrap() < 0);

        let token = generate_secured_api_key(MASTER_KEY, "public").unwrap();
        assert!(matches!(remaining_validity(&token), Err(Error::KeyGeneration(_))));
    }

    #[test]
    fn test_valid_for() {
        let restrictions = Restrictions::new().valid_for(Duration::from_secs(600));
        let token = generate_secured_api_key(MASTER_KEY, restrictions).unwrap();
        let remaining = remaining_validity(&token).unwrap();
        assert!(remaining > 500 && remaining <= 600);
    }

    #[test]
    fn test_valid_for_saturates_huge_durations() {
        let restrictions = Restrictions::new().valid_for(Duration::from_secs(u64::MAX));
        let token = generate_secured_api_key(MASTER_KEY, restrictions).unwrap();

        let key = decode_secured_api_key(&token).unwrap();
        assert_eq!(key.valid_until(), Some(i64::MAX));
        assert!(remaining_validity(&token).unwrap() > 0);
    }

    #[test]
    fn test_remaining_validity_saturates_at_extremes() {
        let restrictions = Restrictions::new().param("validUntil", "-9223372036854775808");
        let token = generate_secured_api_key(MASTER_KEY, restrictions).unwrap();

        assert!(verify_secured_api_key(&token, MASTER_KEY).unwrap());
        assert_eq!(remaining_validity(&token).unwrap(), i64::MIN);
    }
}

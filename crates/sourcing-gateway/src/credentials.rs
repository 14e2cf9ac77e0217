//! Where direct mode gets a user's marketplace credentials from.

use std::path::{Path, PathBuf};

use sourcing_core::CredentialRecord;

use crate::error::GatewayError;

/// Lookup of active credentials by owning user.
pub trait CredentialSource: Send + Sync {
    /// All active credentials owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] if the backing store cannot be read.
    fn active_credentials(&self, user_id: &str) -> Result<Vec<CredentialRecord>, GatewayError>;
}

/// Resolves the single active credential for `user_id`.
///
/// # Errors
///
/// - [`GatewayError::NoCredentials`] when none is active.
/// - [`GatewayError::AmbiguousCredentials`] when more than one is active.
pub fn resolve_active(
    source: &dyn CredentialSource,
    user_id: &str,
) -> Result<CredentialRecord, GatewayError> {
    let mut active = source.active_credentials(user_id)?;
    match active.len() {
        0 => Err(GatewayError::NoCredentials {
            user_id: user_id.to_owned(),
        }),
        1 => Ok(active.remove(0)),
        count => Err(GatewayError::AmbiguousCredentials {
            user_id: user_id.to_owned(),
            count,
        }),
    }
}

/// JSON file holding a list of [`CredentialRecord`]s. Read on every lookup so
/// rotated keys are picked up without a restart. A missing file holds no
/// credentials.
#[derive(Debug, Clone)]
pub struct FileCredentialSource {
    path: PathBuf,
}

impl FileCredentialSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Vec<CredentialRecord>, GatewayError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(GatewayError::CredentialsIo {
                    path: self.path.display().to_string(),
                    source: e,
                })
            }
        };
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content).map_err(|e| GatewayError::CredentialsParse {
            path: self.path.display().to_string(),
            source: e,
        })
    }
}

impl CredentialSource for FileCredentialSource {
    fn active_credentials(&self, user_id: &str) -> Result<Vec<CredentialRecord>, GatewayError> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|c| c.is_active && c.user_id == user_id)
            .collect())
    }
}

/// A single operator credential taken from the environment. It answers for
/// every user, which suits local single-tenant use.
#[derive(Debug, Clone, Default)]
pub struct EnvCredentialSource {
    record: Option<CredentialRecord>,
}

impl EnvCredentialSource {
    /// Reads `COUPANG_ACCESS_KEY`, `COUPANG_SECRET_KEY`, `COUPANG_VENDOR_ID`
    /// and optionally `COUPANG_VENDOR_USER_ID`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Any missing required variable yields a source with no credentials.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let record = match (
            get("COUPANG_ACCESS_KEY"),
            get("COUPANG_SECRET_KEY"),
            get("COUPANG_VENDOR_ID"),
        ) {
            (Some(access_key), Some(secret_key), Some(vendor_id)) => Some(CredentialRecord {
                user_id: String::new(),
                alias: Some("env".to_owned()),
                access_key,
                secret_key,
                vendor_user_id: Some(
                    get("COUPANG_VENDOR_USER_ID").unwrap_or_else(|| vendor_id.clone()),
                ),
                vendor_id,
                is_active: true,
                created_at: None,
            }),
            _ => None,
        };

        Self { record }
    }
}

impl CredentialSource for EnvCredentialSource {
    fn active_credentials(&self, user_id: &str) -> Result<Vec<CredentialRecord>, GatewayError> {
        Ok(self
            .record
            .iter()
            .cloned()
            .map(|mut c| {
                c.user_id = user_id.to_owned();
                c
            })
            .collect())
    }
}

/// Tries each source in order and answers with the first non-empty result.
pub struct ChainedCredentialSource {
    sources: Vec<Box<dyn CredentialSource>>,
}

impl ChainedCredentialSource {
    #[must_use]
    pub fn new(sources: Vec<Box<dyn CredentialSource>>) -> Self {
        Self { sources }
    }
}

impl CredentialSource for ChainedCredentialSource {
    fn active_credentials(&self, user_id: &str) -> Result<Vec<CredentialRecord>, GatewayError> {
        for source in &self.sources {
            let found = source.active_credentials(user_id)?;
            if !found.is_empty() {
                return Ok(found);
            }
        }
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn temp_file(content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("credentials-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, content).unwrap();
        path
    }

    const RECORDS: &str = r#"[
        {"userId": "u1", "accessKey": "ak1", "secretKey": "sk1", "vendorId": "A1", "isActive": true},
        {"userId": "u1", "accessKey": "ak0", "secretKey": "sk0", "vendorId": "A1", "isActive": false},
        {"userId": "u2", "accessKey": "ak2", "secretKey": "sk2", "vendorId": "A2", "isActive": true},
        {"userId": "u2", "accessKey": "ak3", "secretKey": "sk3", "vendorId": "A2", "isActive": true}
    ]"#;

    #[test]
    fn resolves_the_single_active_record() {
        let path = temp_file(RECORDS);
        let source = FileCredentialSource::new(&path);

        let rec = resolve_active(&source, "u1").unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(rec.access_key, "ak1");
    }

    #[test]
    fn several_active_records_are_ambiguous() {
        let path = temp_file(RECORDS);
        let source = FileCredentialSource::new(&path);

        let err = resolve_active(&source, "u2").unwrap_err();
        std::fs::remove_file(&path).ok();

        assert!(matches!(
            err,
            GatewayError::AmbiguousCredentials { count: 2, .. }
        ));
    }

    #[test]
    fn unknown_user_and_missing_file_have_no_credentials() {
        let path = temp_file(RECORDS);
        let source = FileCredentialSource::new(&path);
        let err = resolve_active(&source, "nobody").unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, GatewayError::NoCredentials { .. }));

        let missing = FileCredentialSource::new("/nonexistent/credentials.json");
        assert!(matches!(
            resolve_active(&missing, "u1"),
            Err(GatewayError::NoCredentials { .. })
        ));
    }

    #[test]
    fn corrupt_file_is_a_parse_error() {
        let path = temp_file("{not json");
        let err = FileCredentialSource::new(&path)
            .active_credentials("u1")
            .unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, GatewayError::CredentialsParse { .. }));
    }

    #[test]
    fn env_source_requires_all_keys() {
        let mut vars = HashMap::from([
            ("COUPANG_ACCESS_KEY", "ak"),
            ("COUPANG_SECRET_KEY", "sk"),
        ]);
        let partial = EnvCredentialSource::from_lookup(|k| vars.get(k).map(|v| (*v).to_owned()));
        assert!(partial.active_credentials("u").unwrap().is_empty());

        vars.insert("COUPANG_VENDOR_ID", "A0001");
        let full = EnvCredentialSource::from_lookup(|k| vars.get(k).map(|v| (*v).to_owned()));
        let rec = resolve_active(&full, "u9").unwrap();
        assert_eq!(rec.user_id, "u9");
        assert_eq!(rec.vendor_user_id.as_deref(), Some("A0001"));
        assert_eq!(rec.requester_id(), "A0001");
    }

    #[test]
    fn chain_falls_through_empty_sources() {
        let env = EnvCredentialSource::from_lookup(|k| match k {
            "COUPANG_ACCESS_KEY" => Some("ak".to_owned()),
            "COUPANG_SECRET_KEY" => Some("sk".to_owned()),
            "COUPANG_VENDOR_ID" => Some("A9".to_owned()),
            _ => None,
        });
        let chain = ChainedCredentialSource::new(vec![
            Box::new(FileCredentialSource::new("/nonexistent/credentials.json")),
            Box::new(env),
        ]);
        assert_eq!(resolve_active(&chain, "u").unwrap().vendor_id, "A9");
    }
}

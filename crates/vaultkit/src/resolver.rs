//! Substitute secret references inside `key=value` parameter lists.

use crate::client::SecretStore;
use crate::credential::Credential;
use crate::error::{Error, Result};
use crate::reference::{SecretReference, is_secret_reference};

/// Split an entry on its first `=`.
pub fn split_entry(index: usize, entry: &str) -> Result<(&str, &str)> {
    entry
        .split_once('=')
        .filter(|(key, _)| !key.trim().is_empty())
        .ok_or(Error::MalformedEntry { index })
}

/// Resolve every secret reference in `entries`.
///
/// The output has the same length, order and keys as the input. Values that
/// are references are replaced by the field they point at; all others pass
/// through untouched. The first failure is returned, attributed to its key.
pub fn resolve_parameters(
    entries: &[String],
    credential: &Credential,
    store: &dyn SecretStore,
) -> Result<Vec<String>> {
    let mut parsed = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let (key, value) = split_entry(index, entry)?;
        parsed.push((entry, key, value.trim()));
    }

    if credential.is_missing()
        && let Some((_, key, _)) = parsed.iter().find(|(_, _, value)| is_secret_reference(value))
    {
        return Err(Error::for_key(*key, Error::MissingCredentials));
    }

    parsed
        .into_iter()
        .map(|(entry, key, value)| {
            if !is_secret_reference(value) {
                return Ok(entry.clone());
            }
            let reference = SecretReference::parse(value).map_err(|e| Error::for_key(key, e))?;
            let secret = store
                .read(credential, &reference)
                .map_err(|e| Error::for_key(key, e))?;
            log::debug!("Resolved secret parameter '{}' from {}", key, reference);
            Ok(format!("{key}={secret}"))
        })
        .collect()
}

/// Whether any entry's value is a secret reference.
pub fn has_references(entries: &[String]) -> bool {
    entries.iter().any(|entry| {
        entry
            .split_once('=')
            .is_some_and(|(_, value)| is_secret_reference(value.trim()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MemoryStore;
    use crate::credential::CredentialKind;

    fn entries(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    fn token() -> Credential {
        Credential::new(CredentialKind::StaticToken, "https://vault", "team", "s.abc")
    }

    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert("kv/data/app:password", "s3cr3t");
        store.insert("kv/data/app:user", "admin");
        store
    }

    #[test]
    fn test_resolves_references_only() {
        let input = entries(&["db_pass=kv/data/app:password", "region=eu-west-1"]);
        let output = resolve_parameters(&input, &token(), &store()).unwrap();
        assert_eq!(output, entries(&["db_pass=s3cr3t", "region=eu-west-1"]));
    }

    #[test]
    fn test_keys_and_order_preserved() {
        let input = entries(&[
            "b=kv/data/app:user",
            "a=plain",
            "c=kv/data/app:password",
            "url=https://host/data/x",
        ]);
        let output = resolve_parameters(&input, &token(), &store()).unwrap();

        assert_eq!(output.len(), input.len());
        for (before, after) in input.iter().zip(&output) {
            assert_eq!(before.split_once('=').unwrap().0, after.split_once('=').unwrap().0);
        }
        assert_eq!(output[3], "url=https://host/data/x");
    }

    #[test]
    fn test_idempotent_on_resolved_input() {
        let input = entries(&["db_pass=kv/data/app:password", "x=1"]);
        let store = store();
        let once = resolve_parameters(&input, &token(), &store).unwrap();
        let twice = resolve_parameters(&once, &token(), &store).unwrap();
        assert_eq!(once, twice);
        assert_eq!(store.read_count(), 1);
    }

    #[test]
    fn test_value_may_contain_equals() {
        let input = entries(&["conn=host=db;port=5432"]);
        let output = resolve_parameters(&input, &token(), &store()).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn test_key_is_never_matched() {
        let input = entries(&["kv/data/app:password=literal"]);
        let output = resolve_parameters(&input, &Credential::missing(), &store()).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn test_failure_names_key() {
        let store = store();
        store.fail("kv/data/app:password");
        let input = entries(&["region=eu-west-1", "db_pass=kv/data/app:password"]);

        let err = resolve_parameters(&input, &token(), &store).unwrap_err();
        assert_eq!(err.key(), Some("db_pass"));
        assert!(!err.to_string().contains("s3cr3t"));
    }

    #[test]
    fn test_missing_field_names_key() {
        let input = entries(&["api=kv/data/app:api_key"]);
        let err = resolve_parameters(&input, &token(), &store()).unwrap_err();
        assert_eq!(err.key(), Some("api"));
    }

    #[test]
    fn test_missing_credentials_with_reference() {
        let store = store();
        let input = entries(&["x=1", "db_pass=kv/data/app:password"]);
        let err = resolve_parameters(&input, &Credential::missing(), &store).unwrap_err();
        assert!(err.is_credential_error());
        assert_eq!(err.key(), Some("db_pass"));
        assert_eq!(store.read_count(), 0);
    }

    #[test]
    fn test_missing_credentials_without_reference() {
        let input = entries(&["x=1"]);
        let output = resolve_parameters(&input, &Credential::missing(), &store()).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn test_malformed_entry() {
        let input = entries(&["ok=1", "novalue"]);
        let err = resolve_parameters(&input, &token(), &store()).unwrap_err();
        assert!(matches!(err, Error::MalformedEntry { index: 1 }));

        let empty_key = entries(&["=value"]);
        assert!(resolve_parameters(&empty_key, &token(), &store()).is_err());
    }

    #[test]
    fn test_plain_entries_untouched() {
        let input = entries(&["note= spaced value "]);
        let output = resolve_parameters(&input, &token(), &store()).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn test_trims_references() {
        let input = entries(&["db_pass= kv/data/app:password "]);
        let output = resolve_parameters(&input, &token(), &store()).unwrap();
        assert_eq!(output, entries(&["db_pass=s3cr3t"]));
    }

    #[test]
    fn test_has_references() {
        assert!(has_references(&entries(&["a=1", "b=kv/data/app:x"])));
        assert!(!has_references(&entries(&["a=1", "kv/data/app:x=2"])));
    }
}

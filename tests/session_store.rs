//! Integration tests for cookie persistence: plaintext and encrypted files,
//! tolerant parsing, and the guard against saving an empty jar.
//!
//! Every test works in its own temporary directory.

use lurk::session::{CookiePair, Session, SessionError, SessionStore};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use secrecy::SecretString;
use tempfile::TempDir;
use url::Url;

fn session() -> Session {
    Session::new(Url::parse("https://forum.example.com/").unwrap())
}

fn sorted(mut cookies: Vec<CookiePair>) -> Vec<CookiePair> {
    cookies.sort();
    cookies
}

// ============================================================================
// Plaintext
// ============================================================================

#[test]
fn test_plaintext_round_trip_through_jar() {
    let dir = TempDir::new().unwrap();
    let store = SessionStore::new(dir.path().join("cookies.txt"));

    let original = session();
    original.insert(&CookiePair::new("_t", "token-value"));
    original.insert(&CookiePair::new("_forum_session", "abc"));
    store.save(&original).unwrap();

    let text = std::fs::read_to_string(store.path()).unwrap();
    assert!(text.contains("_t=token-value"));

    let restored = session();
    assert_eq!(store.load_into(&restored).unwrap(), 2);
    assert_eq!(sorted(restored.cookies()), sorted(original.cookies()));
}

#[test]
fn test_load_skips_blank_and_malformed_lines() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cookies.txt");
    std::fs::write(&path, "\n  _t = abc  \nno-equals-sign\n=orphan\n_forum_session=x=y\n\n").unwrap();

    let cookies = SessionStore::new(&path).load().unwrap();
    assert_eq!(
        cookies,
        vec![
            CookiePair::new("_t", "abc"),
            CookiePair::new("_forum_session", "x=y"),
        ]
    );
}

#[test]
fn test_missing_file_is_not_found() {
    let dir = TempDir::new().unwrap();
    let store = SessionStore::new(dir.path().join("absent.txt"));

    assert!(!store.exists());
    assert!(matches!(store.load(), Err(SessionError::NotFound(_))));
}

#[test]
fn test_empty_jar_is_never_written() {
    let dir = TempDir::new().unwrap();
    let store = SessionStore::new(dir.path().join("cookies.txt"));

    assert!(matches!(store.save(&session()), Err(SessionError::NoCookies)));
    assert!(!store.exists());
}

#[test]
fn test_remove_reports_whether_a_file_existed() {
    let dir = TempDir::new().unwrap();
    let store = SessionStore::new(dir.path().join("cookies.txt"));
    store.save_pairs(&[CookiePair::new("_t", "1")]).unwrap();

    assert!(store.remove().unwrap());
    assert!(!store.remove().unwrap());
}

#[cfg(unix)]
#[test]
fn test_session_file_is_private() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let store = SessionStore::new(dir.path().join("cookies.txt"));
    store.save_pairs(&[CookiePair::new("_t", "1")]).unwrap();

    let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

// ============================================================================
// Encrypted
// ============================================================================

#[test]
fn test_encrypted_file_hides_values_and_round_trips() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cookies.enc");
    let store = SessionStore::new(&path).with_passphrase(SecretString::from("hunter2"));

    store
        .save_pairs(&[CookiePair::new("_t", "very-secret-token")])
        .unwrap();

    let raw = std::fs::read(&path).unwrap();
    assert!(!raw.windows(17).any(|w| w == b"very-secret-token"));

    assert_eq!(store.load().unwrap(), vec![CookiePair::new("_t", "very-secret-token")]);
}

#[test]
fn test_wrong_passphrase_is_auth_failed() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cookies.enc");
    SessionStore::new(&path)
        .with_passphrase(SecretString::from("right"))
        .save_pairs(&[CookiePair::new("_t", "abc")])
        .unwrap();

    let wrong = SessionStore::new(&path).with_passphrase(SecretString::from("wrong"));
    assert!(matches!(wrong.load(), Err(SessionError::AuthFailed)));
}

#[test]
fn test_plaintext_file_read_as_encrypted_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cookies.txt");
    std::fs::write(&path, "_t=abc\n").unwrap();

    let store = SessionStore::new(&path).with_passphrase(SecretString::from("pw"));
    assert!(store.load().is_err());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn prop_encrypted_pairs_survive_save_and_load(
        pairs in proptest::collection::vec(("[A-Za-z_][A-Za-z0-9_]{0,12}", "[A-Za-z0-9%._-]{0,24}"), 1..6)
    ) {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path().join("cookies.enc"))
            .with_passphrase(SecretString::from("passphrase"));
        let cookies: Vec<CookiePair> = pairs
            .iter()
            .map(|(name, value)| CookiePair::new(name.as_str(), value.as_str()))
            .collect();

        store.save_pairs(&cookies).unwrap();
        prop_assert_eq!(store.load().unwrap(), cookies);
    }

    #[test]
    fn prop_plaintext_cookies_survive_save_and_load(
        pairs in proptest::collection::btree_map("[A-Za-z_][A-Za-z0-9_]{0,12}", "[A-Za-z0-9._-]{0,24}", 1..6)
    ) {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path().join("cookies.txt"));

        // Names are unique: the jar keeps one cookie per name.
        let original = session();
        for (name, value) in &pairs {
            original.insert(&CookiePair::new(name.as_str(), value.as_str()));
        }
        store.save(&original).unwrap();

        let expected: Vec<CookiePair> = pairs
            .iter()
            .map(|(name, value)| CookiePair::new(name.as_str(), value.as_str()))
            .collect();
        prop_assert_eq!(sorted(original.cookies()), expected);

        let restored = session();
        prop_assert_eq!(store.load_into(&restored).unwrap(), pairs.len());
        prop_assert_eq!(sorted(restored.cookies()), sorted(original.cookies()));
    }
}

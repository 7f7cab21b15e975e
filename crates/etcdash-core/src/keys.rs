//! Key-hierarchy projection over etcd's flat namespace.
//!
//! etcd stores keys as a flat sorted byte space. The browser imposes a
//! `/`-delimited hierarchy purely by convention: a "directory" is any
//! prefix that at least one longer key passes through, and it exists only
//! for as long as such a key does. Nothing here is cached; every listing
//! is a fresh prefix scan.
//!
//! [`project`] is the pure half (prefix scan result in, children out) and
//! [`KeyBrowser`] wraps it with the backend round-trips.

use std::collections::HashSet;
use std::sync::Arc;

use etcdash_backend::{EtcdBackend, Key, KeyValue};
use serde::Serialize;
use tracing::debug;

use crate::Success;
use crate::error::{ConsoleError, ConsoleResultExt};
use crate::listing::{ListQuery, paginate};
use crate::validate;

/// Scan prefix for a logical directory path.
///
/// The root (`""` or `"/"`) scans everything; any other path gets its
/// trailing slashes replaced by exactly one.
#[must_use]
pub fn scan_prefix(path: &str) -> String {
    if path.is_empty() || path == "/" {
        return String::new();
    }
    format!("{}/", path.trim_end_matches('/'))
}

/// A direct child found by [`project`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Child {
    /// Display name; directories carry a trailing `/`.
    pub name: String,
    pub is_directory: bool,
    /// Full key of a leaf child, used for its metadata lookup.
    pub full_key: Option<String>,
}

/// Derive the direct children of `prefix` from the keys a prefix scan
/// returned.
///
/// Keys equal to the prefix itself, or whose remainder starts with `/`,
/// contribute nothing. A child is a directory when its remainder has more
/// than one segment or ends with `/`. The result keeps first-seen order
/// and holds each display name once, so leaf `a` and directory `a/` may
/// both appear.
#[must_use]
pub fn project<'a>(prefix: &str, keys: impl IntoIterator<Item = &'a str>) -> Vec<Child> {
    let mut seen = HashSet::new();
    let mut children = Vec::new();

    for full_key in keys {
        let Some(relative) = full_key.strip_prefix(prefix) else {
            continue;
        };
        if relative.is_empty() {
            continue;
        }

        let mut segments = relative.split('/');
        let child = segments.next().unwrap_or_default();
        if child.is_empty() {
            continue;
        }

        let is_directory = segments.next().is_some() || relative.ends_with('/');
        let name = if is_directory {
            format!("{child}/")
        } else {
            child.to_owned()
        };
        if !seen.insert(name.clone()) {
            continue;
        }

        children.push(Child {
            full_key: (!is_directory).then(|| format!("{prefix}{child}")),
            name,
            is_directory,
        });
    }
    children
}

/// Value and metadata of a single key.
///
/// A missing key is `{ value: "", key: null }`, not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KeyDetail {
    pub value: String,
    pub key: Option<Key>,
}

/// One page of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyListing {
    /// The path as requested.
    pub path: String,
    /// The scan prefix it normalized to.
    pub prefix: String,
    pub keys: Vec<Key>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

/// What the browser shows for a path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BrowseResult {
    Directory { path: String, keys: Vec<Key> },
    Leaf { path: String, detail: KeyDetail },
}

/// Key browsing and editing against a backend.
pub struct KeyBrowser {
    backend: Arc<dyn EtcdBackend>,
}

impl KeyBrowser {
    #[must_use]
    pub fn new(backend: Arc<dyn EtcdBackend>) -> Self {
        Self { backend }
    }

    /// Direct children of `path`.
    ///
    /// Leaf children carry revision metadata when the point lookup
    /// succeeds; a failed or empty lookup leaves them bare.
    ///
    /// # Errors
    ///
    /// Returns a normalized [`ConsoleError`] if the prefix scan fails for
    /// any reason other than not-found.
    pub async fn get_keys(&self, path: &str) -> Result<Vec<Key>, ConsoleError> {
        let prefix = scan_prefix(path);
        let full_keys = self.backend.list_keys(&prefix).await.or_not_found(Vec::new())?;
        let children = project(&prefix, full_keys.iter().map(String::as_str));
        debug!(prefix = %prefix, scanned = full_keys.len(), children = children.len(), "projected keys");

        let mut keys = Vec::with_capacity(children.len());
        for child in children {
            let Some(full_key) = child.full_key else {
                keys.push(Key::directory(child.name));
                continue;
            };
            let key = match self.backend.get(&full_key).await {
                Ok(Some(kv)) => Key::leaf(child.name).with_revisions(&kv),
                Ok(None) => Key::leaf(child.name),
                Err(e) => {
                    debug!(key = %full_key, error = %e, "metadata lookup failed");
                    Key::leaf(child.name)
                }
            };
            keys.push(key);
        }
        Ok(keys)
    }

    /// Filtered, paginated children of `path`.
    ///
    /// # Errors
    ///
    /// Same as [`KeyBrowser::get_keys`].
    pub async fn list_keys(&self, path: &str, query: &ListQuery) -> Result<KeyListing, ConsoleError> {
        let keys = self.get_keys(path).await?;
        let page = paginate(keys, query, |k: &Key| k.key.as_str());
        Ok(KeyListing {
            path: path.to_owned(),
            prefix: scan_prefix(path),
            keys: page.items,
            total: page.total,
            page: page.page,
            page_size: page.page_size,
            total_pages: page.total_pages,
        })
    }

    /// Value and metadata of `key`: the record at that exact path, or else
    /// the first record under `key/`. A sibling that merely shares the
    /// string prefix (`/a/fl` vs `/a/flag`) never matches.
    ///
    /// # Errors
    ///
    /// Returns a normalized [`ConsoleError`] for any failure other than
    /// not-found.
    pub async fn get_key_value(&self, key: &str) -> Result<KeyDetail, ConsoleError> {
        let path = key.trim_end_matches('/');
        let exact = if path.is_empty() {
            None
        } else {
            self.backend.get(path).await.or_not_found(None)?
        };
        let found = match exact {
            Some(kv) => Some(kv),
            None => self
                .backend
                .first_under(&scan_prefix(path))
                .await
                .or_not_found(None)?,
        };
        Ok(found.map_or_else(KeyDetail::default, |kv| detail(path, &kv)))
    }

    /// Directory listing if `path` is a directory, otherwise key detail.
    ///
    /// A path is a directory when it is empty, ends with `/`, or has at
    /// least one child.
    ///
    /// # Errors
    ///
    /// Returns a normalized [`ConsoleError`] if a backend call fails.
    pub async fn browse(&self, path: &str) -> Result<BrowseResult, ConsoleError> {
        let keys = self.get_keys(path).await?;
        if path.is_empty() || path.ends_with('/') || !keys.is_empty() {
            return Ok(BrowseResult::Directory {
                path: path.to_owned(),
                keys,
            });
        }
        Ok(BrowseResult::Leaf {
            path: path.to_owned(),
            detail: self.get_key_value(path).await?,
        })
    }

    /// Write a UTF-8 value.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::InvalidInput`] for an empty key, or a
    /// normalized backend error.
    pub async fn put_key(&self, key: &str, value: &str) -> Result<Success, ConsoleError> {
        let key = validate::key(key)?;
        self.backend.put(key, value.as_bytes()).await?;
        debug!(key, bytes = value.len(), "key written");
        Ok(Success::ok())
    }

    /// Delete a single key.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::InvalidInput`] for an empty key, or a
    /// normalized backend error.
    pub async fn delete_key(&self, key: &str) -> Result<Success, ConsoleError> {
        let key = validate::key(key)?;
        self.backend.delete(key).await?;
        debug!(key, "key deleted");
        Ok(Success::ok())
    }
}

fn detail(path: &str, kv: &KeyValue) -> KeyDetail {
    let name = path.rsplit('/').next().filter(|s| !s.is_empty()).unwrap_or(path);
    KeyDetail {
        value: String::from_utf8_lossy(&kv.value).into_owned(),
        key: Some(Key::leaf(name).with_revisions(kv)),
    }
}

#[cfg(test)]
mod tests {
    use etcdash_backend::{KvRead, MemoryBackend};

    use super::*;
    use crate::error::ErrorCode;

    async fn browser_with(keys: &[(&str, &str)]) -> KeyBrowser {
        let backend = MemoryBackend::new();
        for (k, v) in keys {
            backend.put(k, v.as_bytes()).await.unwrap();
        }
        KeyBrowser::new(Arc::new(backend))
    }

    fn names(keys: &[Key]) -> Vec<(&str, bool)> {
        keys.iter().map(|k| (k.key.as_str(), k.is_directory)).collect()
    }

    #[test]
    fn scan_prefix_normalizes_trailing_slashes() {
        assert_eq!(scan_prefix(""), "");
        assert_eq!(scan_prefix("/"), "");
        assert_eq!(scan_prefix("/config"), "/config/");
        assert_eq!(scan_prefix("/config//"), "/config/");
    }

    #[test]
    fn projection_is_independent_of_scan_order() {
        let forward = ["/a/x/1", "/a/y", "/a/z/"];
        let mut backward = forward;
        backward.reverse();

        let mut a = project("/a/", forward);
        let mut b = project("/a/", backward);
        a.sort_by(|l, r| l.name.cmp(&r.name));
        b.sort_by(|l, r| l.name.cmp(&r.name));
        assert_eq!(a, b);
        assert!(a.iter().any(|c| c.name == "z/" && c.is_directory));
        assert!(a.iter().any(|c| c.name == "y" && !c.is_directory));
    }

    #[test]
    fn leaf_and_directory_with_same_stem_are_distinct() {
        let children = project("", ["a", "a/b", "a/c"]);
        let names: Vec<_> = children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a", "a/"]);
    }

    #[test]
    fn prefix_marker_and_leading_slash_remainders_are_skipped() {
        let children = project("/cfg/", ["/cfg/", "/cfg//x", "/cfg/ok"]);
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].name, "ok");
        assert_eq!(children[0].full_key.as_deref(), Some("/cfg/ok"));
    }

    #[tokio::test]
    async fn get_keys_splits_directories_and_leaves() {
        let browser = browser_with(&[
            ("/config/db/host", "10.0.0.10"),
            ("/config/db/port", "5432"),
            ("/config/flag", "true"),
        ])
        .await;

        let keys = browser.get_keys("/config/").await.unwrap();
        assert_eq!(names(&keys), vec![("db/", true), ("flag", false)]);

        let flag = &keys[1];
        assert!(flag.create_revision.is_some());
        assert!(keys[0].revision.is_none());
    }

    #[tokio::test]
    async fn get_keys_has_no_duplicates() {
        let browser = browser_with(&[("/a/b/1", "1"), ("/a/b/2", "2"), ("/a/b/3", "3")]).await;
        let keys = browser.get_keys("/a").await.unwrap();
        assert_eq!(names(&keys), vec![("b/", true)]);
    }

    #[tokio::test]
    async fn get_key_value_missing_is_empty() {
        let browser = browser_with(&[]).await;
        let detail = browser.get_key_value("/nope").await.unwrap();
        assert_eq!(detail, KeyDetail::default());
        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json, serde_json::json!({ "value": "", "key": null }));
    }

    #[tokio::test]
    async fn get_key_value_ignores_siblings_sharing_a_string_prefix() {
        let browser = browser_with(&[("/config/flag", "true"), ("/config/db/host", "h")]).await;

        let detail = browser.get_key_value("/config/fl").await.unwrap();
        assert_eq!(detail, KeyDetail::default());
        match browser.browse("/config/fl").await.unwrap() {
            BrowseResult::Leaf { detail, .. } => {
                assert!(detail.key.is_none());
                assert_eq!(detail.value, "");
            }
            other => panic!("expected leaf, got {other:?}"),
        }

        let detail = browser.get_key_value("/config/d").await.unwrap();
        assert!(detail.key.is_none());

        // A directory path still resolves to the first record beneath it.
        let detail = browser.get_key_value("/config").await.unwrap();
        assert_eq!(detail.value, "h");
        assert_eq!(detail.key.unwrap().key, "config");
    }

    #[tokio::test]
    async fn get_key_value_uses_last_segment() {
        let browser = browser_with(&[("/config/db/host", "10.0.0.10")]).await;
        let detail = browser.get_key_value("/config/db/host/").await.unwrap();
        assert_eq!(detail.value, "10.0.0.10");
        let key = detail.key.unwrap();
        assert_eq!(key.key, "host");
        assert!(!key.is_directory);
        assert!(key.mod_revision.is_some());
    }

    #[tokio::test]
    async fn browse_distinguishes_directories_from_leaves() {
        let browser = browser_with(&[("/config/db/host", "h"), ("/config/flag", "true")]).await;

        match browser.browse("/config").await.unwrap() {
            BrowseResult::Directory { keys, .. } => assert_eq!(keys.len(), 2),
            other => panic!("expected directory, got {other:?}"),
        }
        match browser.browse("/config/flag").await.unwrap() {
            BrowseResult::Leaf { detail, .. } => assert_eq!(detail.value, "true"),
            other => panic!("expected leaf, got {other:?}"),
        }
        assert!(matches!(
            browser.browse("/empty/").await.unwrap(),
            BrowseResult::Directory { .. }
        ));
    }

    #[tokio::test]
    async fn get_keys_keeps_bare_leaves_when_lookups_fail() {
        let backend = MemoryBackend::new();
        backend.put("/svc/a", b"1").await.unwrap();
        backend.put("/svc/b", b"2").await.unwrap();
        backend.put("/svc/inner/c", b"3").await.unwrap();
        backend.fail_reads(KvRead::Get, true).await;
        let browser = KeyBrowser::new(Arc::new(backend));

        let keys = browser.get_keys("/svc/").await.unwrap();
        assert_eq!(names(&keys), vec![("a", false), ("b", false), ("inner/", true)]);
        for key in &keys {
            assert!(key.revision.is_none());
            assert!(key.create_revision.is_none());
            assert!(key.mod_revision.is_none());
        }
    }

    #[tokio::test]
    async fn get_keys_surfaces_scan_failure_as_etcd_error() {
        let backend = MemoryBackend::new();
        backend.put("/svc/a", b"1").await.unwrap();
        backend.fail_reads(KvRead::Scan, true).await;
        let browser = KeyBrowser::new(Arc::new(backend));

        let err = browser.get_keys("/svc/").await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::EtcdError));
        let err = browser
            .list_keys("/svc/", &ListQuery::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::EtcdError));
        assert!(browser.browse("/svc/").await.is_err());
    }

    #[tokio::test]
    async fn list_keys_filters_and_pages() {
        let browser = browser_with(&[
            ("/svc/alpha", "1"),
            ("/svc/beta", "2"),
            ("/svc/alphabet/x", "3"),
        ])
        .await;
        let query = ListQuery {
            filter: Some("ALPHA".to_owned()),
            page_size: Some(1),
            ..ListQuery::default()
        };
        let listing = browser.list_keys("/svc", &query).await.unwrap();
        assert_eq!(listing.prefix, "/svc/");
        assert_eq!(listing.total, 2);
        assert_eq!(listing.total_pages, 2);
        assert_eq!(listing.keys.len(), 1);
    }

    #[tokio::test]
    async fn put_then_delete() {
        let browser = browser_with(&[]).await;
        browser.put_key("/x", "1").await.unwrap();
        assert_eq!(browser.get_key_value("/x").await.unwrap().value, "1");
        browser.delete_key("/x").await.unwrap();
        assert!(browser.get_key_value("/x").await.unwrap().key.is_none());
        assert!(browser.put_key("", "v").await.is_err());
    }
}

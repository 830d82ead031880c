use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};
use url::Url;

#[derive(Debug, Default)]
struct Claims {
    admitted: HashSet<String>,
    /// Post-redirect addresses of admitted pages. Blocked from admission but
    /// not counted against the limit.
    aliases: HashSet<String>,
}

impl Claims {
    fn claimed(&self, url: &str) -> bool {
        self.admitted.contains(url) || self.aliases.contains(url)
    }
}

/// Every URL ever admitted to the crawl, in flight or finished.
///
/// `try_admit` is the only way in. The capacity check, the membership check
/// and the insert all happen under one lock, so concurrent admitters can
/// never overshoot `limit` or admit the same URL twice.
#[derive(Debug)]
pub struct Frontier {
    claims: Mutex<Claims>,
    limit: usize,
}

impl Frontier {
    pub fn new(limit: usize) -> Self {
        Self {
            claims: Mutex::new(Claims::default()),
            limit,
        }
    }

    pub fn try_admit(&self, url: &Url) -> bool {
        let mut claims = self.lock();
        if claims.admitted.len() >= self.limit || claims.claimed(url.as_str()) {
            return false;
        }
        claims.admitted.insert(url.as_str().to_string())
    }

    /// Claim `url` as another address of a page already admitted, e.g. the
    /// target of a redirect. Returns false if it was already claimed.
    pub fn add_alias(&self, url: &Url) -> bool {
        let mut claims = self.lock();
        if claims.claimed(url.as_str()) {
            return false;
        }
        claims.aliases.insert(url.as_str().to_string())
    }

    /// Number of admitted URLs. Aliases are not counted.
    pub fn count(&self) -> usize {
        self.lock().admitted.len()
    }

    pub fn at_capacity(&self) -> bool {
        self.lock().admitted.len() >= self.limit
    }

    pub fn contains(&self, url: &Url) -> bool {
        self.lock().claimed(url.as_str())
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    // A panic while holding the lock cannot leave the sets half-updated.
    fn lock(&self) -> MutexGuard<'_, Claims> {
        self.claims.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    fn url(path: &str) -> Url {
        Url::parse(&format!("http://a.test{}", path)).unwrap()
    }

    #[test]
    fn test_admit_once() {
        let frontier = Frontier::new(10);
        assert!(frontier.try_admit(&url("/")));
        assert!(!frontier.try_admit(&url("/")));
        assert_eq!(frontier.count(), 1);
        assert!(frontier.contains(&url("/")));
    }

    #[test]
    fn test_limit_is_hard_ceiling() {
        let frontier = Frontier::new(2);
        assert!(frontier.try_admit(&url("/a")));
        assert!(!frontier.at_capacity());
        assert!(frontier.try_admit(&url("/b")));
        assert!(frontier.at_capacity());
        assert!(!frontier.try_admit(&url("/c")));
        assert!(!frontier.contains(&url("/c")));
        assert_eq!(frontier.count(), 2);
    }

    #[test]
    fn test_zero_limit_admits_nothing() {
        let frontier = Frontier::new(0);
        assert!(frontier.at_capacity());
        assert!(!frontier.try_admit(&url("/")));
        assert_eq!(frontier.count(), 0);
    }

    #[test]
    fn test_alias_blocks_admission_without_using_capacity() {
        let frontier = Frontier::new(2);
        assert!(frontier.try_admit(&url("/b")));
        assert!(frontier.add_alias(&url("/b/")));
        assert!(!frontier.add_alias(&url("/b/")));
        assert!(!frontier.add_alias(&url("/b")));

        assert!(frontier.contains(&url("/b/")));
        assert!(!frontier.try_admit(&url("/b/")));
        assert_eq!(frontier.count(), 1);
        assert!(frontier.try_admit(&url("/c")));
    }

    #[test]
    fn test_concurrent_admitters_never_overshoot() {
        let frontier = Arc::new(Frontier::new(50));
        let successes = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let frontier = frontier.clone();
                let successes = successes.clone();
                thread::spawn(move || {
                    for i in 0..100 {
                        if frontier.try_admit(&url(&format!("/p{}", i))) {
                            successes.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(frontier.count(), 50);
        assert_eq!(successes.load(Ordering::SeqCst), 50);
    }

    #[test]
    fn test_concurrent_duplicate_admitted_exactly_once() {
        let frontier = Arc::new(Frontier::new(100));
        let successes = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let frontier = frontier.clone();
                let successes = successes.clone();
                thread::spawn(move || {
                    if frontier.try_admit(&url("/same")) {
                        successes.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(successes.load(Ordering::SeqCst), 1);
        assert_eq!(frontier.count(), 1);
    }
}

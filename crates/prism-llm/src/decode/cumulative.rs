/// Reconciles a provider convention of resending the entire value so far
/// on each update instead of only the new fragment
///
/// Handles three cases: a prefix-extension yields the tail as a delta, a
/// resent prefix yields nothing, and a divergent restart (the provider
/// began a new segment) yields the new value in full and replaces the
/// tracked state rather than concatenating.
#[derive(Debug, Default)]
pub struct CumulativeText {
    seen: String,
}

impl CumulativeText {
    /// Create an empty reconciler
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconcile a newly received cumulative string, returning the delta to
    /// emit, if any
    pub fn reconcile(&mut self, update: &str) -> Option<String> {
        if let Some(tail) = update.strip_prefix(self.seen.as_str()) {
            if tail.is_empty() {
                return None;
            }
            let delta = tail.to_owned();
            self.seen = update.to_owned();
            return Some(delta);
        }

        if self.seen.starts_with(update) {
            // Provider resent a prefix of what we already have
            return None;
        }

        // Divergent restart: a new segment began
        self.seen = update.to_owned();
        if update.is_empty() { None } else { Some(update.to_owned()) }
    }

    /// Record a pure delta fragment the caller is emitting directly
    ///
    /// Keeps the tracked value current so a later full-string event (a
    /// "done" payload carrying the entire text) reconciles to nothing, or
    /// to exactly the tail a lossy relay dropped.
    pub fn extend(&mut self, fragment: &str) {
        self.seen.push_str(fragment);
    }

    /// Forget the tracked value, so the next update is treated as fresh
    pub fn reset(&mut self) {
        self.seen.clear();
    }
}

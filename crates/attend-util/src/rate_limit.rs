//! Per-client request rate limiting for the IPC surface

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::ClientId;

/// Token bucket per connected client
#[derive(Debug)]
pub struct RateLimiter {
    capacity: u32,
    window: Duration,
    buckets: HashMap<ClientId, Bucket>,
}

#[derive(Debug)]
struct Bucket {
    tokens: u32,
    window_start: Instant,
}

impl RateLimiter {
    /// Allow `max_requests` per `window` for each client.
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            capacity: max_requests,
            window,
            buckets: HashMap::new(),
        }
    }

    /// Consume one request for `client_id`. Returns `false` when the client
    /// has exhausted its budget for the current window.
    pub fn check(&mut self, client_id: &ClientId) -> bool {
        self.check_at(client_id, Instant::now())
    }

    fn check_at(&mut self, client_id: &ClientId, now: Instant) -> bool {
        let capacity = self.capacity;
        let bucket = self.buckets.entry(client_id.clone()).or_insert(Bucket {
            tokens: capacity,
            window_start: now,
        });

        if now.duration_since(bucket.window_start) >= self.window {
            bucket.tokens = capacity;
            bucket.window_start = now;
        }

        if bucket.tokens == 0 {
            return false;
        }
        bucket.tokens -= 1;
        true
    }

    /// Forget a disconnected client
    pub fn remove_client(&mut self, client_id: &ClientId) {
        self.buckets.remove(client_id);
    }
}

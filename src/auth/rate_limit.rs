//! Fixed-window admission control.
//!
//! Counts requests per (client key, route class) within a fixed window and
//! rejects before a request reaches business logic. Windows are created
//! lazily on first check and reset on read once they have elapsed; there is
//! no background sweeper.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::error::{AppError, AuthError};

/// Route classes carry distinct ceilings; the quota itself arrives with each
/// check so the limiter stays free of route knowledge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteClass {
    Signup,
    ContactCreate,
    General,
}

/// Ceiling and window length for one check.
#[derive(Debug, Clone, Copy)]
pub struct RateQuota {
    pub ceiling: u32,
    pub window: Duration,
}

struct Window {
    count: u32,
    started_at: Instant,
}

pub struct RateLimiter {
    windows: Mutex<HashMap<(String, RouteClass), Window>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Admit or reject one request.
    ///
    /// The increment-and-compare is atomic per key: the map lock is held for
    /// the whole check, and nothing inside it blocks.
    ///
    /// # Errors
    /// `RateExceeded` with the remaining time until the window resets.
    pub fn check(
        &self,
        key: &str,
        class: RouteClass,
        quota: RateQuota,
    ) -> Result<(), AppError> {
        let now = Instant::now();
        let mut windows = self.windows.lock().unwrap();

        let window = windows
            .entry((key.to_string(), class))
            .or_insert(Window {
                count: 0,
                started_at: now,
            });

        // Expired windows reset on read.
        if now.duration_since(window.started_at) >= quota.window {
            window.count = 0;
            window.started_at = now;
        }

        window.count += 1;
        if window.count > quota.ceiling {
            let retry_after = quota.window - now.duration_since(window.started_at);
            return Err(AppError::Auth(AuthError::RateExceeded { retry_after }));
        }

        Ok(())
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUOTA: RateQuota = RateQuota {
        ceiling: 3,
        window: Duration::from_secs(60),
    };

    #[test]
    fn admits_up_to_ceiling_then_rejects() {
        let limiter = RateLimiter::new();

        for _ in 0..3 {
            assert!(limiter.check("client-1", RouteClass::Signup, QUOTA).is_ok());
        }

        let rejection = limiter.check("client-1", RouteClass::Signup, QUOTA);
        match rejection {
            Err(AppError::Auth(AuthError::RateExceeded { retry_after })) => {
                assert!(retry_after <= Duration::from_secs(60));
            }
            other => panic!("expected RateExceeded, got {:?}", other),
        }
    }

    #[test]
    fn keys_are_counted_independently() {
        let limiter = RateLimiter::new();

        for _ in 0..3 {
            assert!(limiter.check("client-1", RouteClass::General, QUOTA).is_ok());
        }
        assert!(limiter.check("client-1", RouteClass::General, QUOTA).is_err());
        assert!(limiter.check("client-2", RouteClass::General, QUOTA).is_ok());
    }

    #[test]
    fn route_classes_are_counted_independently() {
        let limiter = RateLimiter::new();

        for _ in 0..3 {
            assert!(limiter.check("client-1", RouteClass::General, QUOTA).is_ok());
        }
        assert!(limiter.check("client-1", RouteClass::General, QUOTA).is_err());
        assert!(limiter
            .check("client-1", RouteClass::ContactCreate, QUOTA)
            .is_ok());
    }

    #[test]
    fn window_elapse_admits_again() {
        let limiter = RateLimiter::new();
        let quota = RateQuota {
            ceiling: 3,
            window: Duration::from_millis(50),
        };

        for _ in 0..3 {
            assert!(limiter.check("client-1", RouteClass::Signup, quota).is_ok());
        }
        assert!(limiter.check("client-1", RouteClass::Signup, quota).is_err());

        std::thread::sleep(Duration::from_millis(60));
        assert!(limiter.check("client-1", RouteClass::Signup, quota).is_ok());
    }

    #[test]
    fn limiter_is_safe_under_concurrent_checks() {
        use std::sync::Arc;

        let limiter = Arc::new(RateLimiter::new());
        let quota = RateQuota {
            ceiling: 100,
            window: Duration::from_secs(60),
        };

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || {
                    (0..25)
                        .filter(|_| limiter.check("shared", RouteClass::General, quota).is_ok())
                        .count()
                })
            })
            .collect();

        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        // 8 * 25 = 200 checks against a ceiling of 100: exactly 100 admitted.
        assert_eq!(admitted, 100);
    }
}

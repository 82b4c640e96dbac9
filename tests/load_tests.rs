use kisschat::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

#[cfg(test)]
mod rate_limiter_tests {
    use super::*;

    #[test]
    fn test_capacity_boundary() {
        let start = Instant::now();
        let limiter = RateLimiter::starting_at(start, Duration::from_secs(1), 20);

        for i in 0..20 {
            assert!(limiter.admit_at(start), "admission {} refused", i + 1);
        }
        assert!(!limiter.admit_at(start));
        assert!(!limiter.admit_at(start + Duration::from_millis(500)));
    }

    #[test]
    fn test_window_resets_after_it_elapses() {
        let start = Instant::now();
        let limiter = RateLimiter::starting_at(start, Duration::from_secs(1), 20);
        for _ in 0..20 {
            limiter.admit_at(start);
        }

        // Exactly one window later is still the same window
        assert!(!limiter.admit_at(start + Duration::from_secs(1)));

        let later = start + Duration::from_millis(1001);
        for _ in 0..20 {
            assert!(limiter.admit_at(later));
        }
        assert!(!limiter.admit_at(later));
    }

    #[test]
    fn test_new_window_starts_at_reset_time() {
        let start = Instant::now();
        let limiter = RateLimiter::starting_at(start, Duration::from_secs(1), 1);
        assert!(limiter.admit_at(start));

        let reset = start + Duration::from_millis(1500);
        assert!(limiter.admit_at(reset));
        // 2.0s is inside the window opened at 1.5s
        assert!(!limiter.admit_at(start + Duration::from_secs(2)));
        assert!(limiter.admit_at(start + Duration::from_millis(2600)));
    }

    #[test]
    fn test_earlier_instant_does_not_reset() {
        let start = Instant::now() + Duration::from_secs(5);
        let limiter = RateLimiter::starting_at(start, Duration::from_secs(1), 1);
        assert!(limiter.admit_at(start));
        assert!(!limiter.admit_at(start - Duration::from_secs(3)));
    }

    #[test]
    fn test_admit_uses_wall_clock() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 3);
        assert!(limiter.admit());
        assert!(limiter.admit());
        assert!(limiter.admit());
        assert!(!limiter.admit());
        assert_eq!(limiter.capacity(), 3);
        assert_eq!(limiter.window_length(), Duration::from_secs(60));
    }

    #[test]
    fn test_concurrent_callers_never_exceed_capacity() {
        const THREADS: usize = 8;
        const CALLS: usize = 50;

        let limiter = Arc::new(RateLimiter::new(Duration::from_secs(60), 20));
        let admitted = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                let admitted = Arc::clone(&admitted);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    for _ in 0..CALLS {
                        if limiter.admit() {
                            admitted.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(admitted.load(Ordering::Relaxed), 20);
    }
}

#[cfg(test)]
mod concurrent_store_tests {
    use super::*;

    #[test]
    fn test_concurrent_posts_keep_log_bounded_and_intact() {
        const THREADS: usize = 8;
        const POSTS: usize = 100;

        let store = Arc::new(MessageStore::new(50));
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    for i in 0..POSTS {
                        store.post(&format!("user{}", t), &format!("{}-{}", t, i));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let log = store.snapshot();
        assert_eq!(log.len(), 50);

        // Per-writer order survives interleaving
        for t in 0..THREADS {
            let seq: Vec<usize> = log
                .iter()
                .filter(|m| m.user() == format!("user{}", t))
                .map(|m| {
                    let (writer, index) = m.text().split_once('-').unwrap();
                    assert_eq!(writer, t.to_string());
                    index.parse().unwrap()
                })
                .collect();
            assert!(seq.windows(2).all(|w| w[0] < w[1]), "writer {} out of order: {:?}", t, seq);
        }
    }

    #[test]
    fn test_render_while_posting() {
        let store = Arc::new(MessageStore::new(50));
        let writer = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..500 {
                    store.post("w", &format!("m{}", i));
                }
            })
        };

        for _ in 0..100 {
            let page = render_template(b"<!-- CHAT_MESSAGES -->", &store).to_bytes();
            let text = String::from_utf8(page).unwrap();
            let count = text.matches("<div class=\"message\">").count();
            assert!(count <= 50);
            assert_eq!(count, text.matches("</div>\n").count());
        }

        writer.join().unwrap();
        assert_eq!(store.len(), 50);
    }
}

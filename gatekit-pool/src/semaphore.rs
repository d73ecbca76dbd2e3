use std::sync::{Condvar, Mutex};

/// A counting semaphore built on `Mutex` + `Condvar`: the blocking primitive spec.md
/// §4.3/§5 calls for when the pool's cap is reached ("drop the mutex, await the
/// semaphore, reacquire, scan again"). At most one waiter is woken per `post`
/// (`Condvar::notify_one`), matching invariant 3 in §4.3 ("at most one acquirer is
/// unblocked per release").
pub struct Semaphore {
    permits: Mutex<usize>,
    cond: Condvar,
}

impl Semaphore {
    pub fn new(initial: usize) -> Semaphore {
        Semaphore { permits: Mutex::new(initial), cond: Condvar::new() }
    }

    /// Blocks until a permit is available, then consumes it.
    pub fn acquire(&self) {
        let mut permits = self.permits.lock().unwrap();
        while *permits == 0 {
            permits = self.cond.wait(permits).unwrap();
        }
        *permits -= 1;
    }

    /// Returns one permit and wakes exactly one waiter.
    pub fn post(&self) {
        let mut permits = self.permits.lock().unwrap();
        *permits += 1;
        self.cond.notify_one();
    }

    /// Wakes every waiter without granting extra permits beyond what is posted;
    /// used on shutdown to unblock everyone waiting on a cap that will never free up.
    pub fn post_all(&self, n: usize) {
        let mut permits = self.permits.lock().unwrap();
        *permits += n;
        self.cond.notify_all();
    }
}

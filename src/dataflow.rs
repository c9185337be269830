//! Background loading and invalidation.
//!
//! [`Remote`] owns a value fetched off the UI thread. Every (re)load bumps
//! a monotonically increasing request generation; a completion carrying an
//! older generation is discarded, so a slow fetch can never overwrite the
//! result of a newer one. [`Signal`] and [`Derived`] form the invalidation
//! pipeline: derived entities recompute exactly when an input generation
//! changes, never on unrelated state.

use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::RwLock;

use crate::error::DataError;

type LoadResult<T> = Result<T, DataError>;

enum State<T> {
    Idle,
    Pending {
        handle: JoinHandle<LoadResult<T>>,
        generation: u64,
    },
    /// A previous value stays visible while its replacement loads.
    Stale {
        value: T,
        value_generation: u64,
        handle: JoinHandle<LoadResult<T>>,
        generation: u64,
    },
    Ready {
        value: T,
        generation: u64,
    },
    Failed {
        error: DataError,
        generation: u64,
    },
}

pub struct Remote<T> {
    state: State<T>,
    requested: u64,
}

impl<T> Default for Remote<T> {
    fn default() -> Self {
        Self {
            state: State::Idle,
            requested: 0,
        }
    }
}

impl<T: Send + 'static> Remote<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) a load on a background thread. Supersedes any
    /// fetch still in flight: its handle is dropped here and its result,
    /// carrying an older generation, can never land.
    pub fn spawn(&mut self, loader: impl FnOnce() -> LoadResult<T> + Send + 'static) {
        self.requested += 1;
        let generation = self.requested;
        let handle = std::thread::spawn(loader);
        self.state = match std::mem::replace(&mut self.state, State::Idle) {
            State::Ready { value, generation: value_generation }
            | State::Stale {
                value,
                value_generation,
                ..
            } => State::Stale {
                value,
                value_generation,
                handle,
                generation,
            },
            _ => State::Pending { handle, generation },
        };
    }

    /// Spawn only if nothing was ever loaded.
    pub fn ensure_started(&mut self, loader: impl FnOnce() -> LoadResult<T> + Send + 'static) {
        if matches!(self.state, State::Idle) {
            self.spawn(loader);
        }
    }

    /// Advance the state machine. Returns `true` while a load is in flight,
    /// so the caller keeps repainting.
    pub fn poll(&mut self) -> bool {
        let state = std::mem::replace(&mut self.state, State::Idle);
        self.state = match state {
            State::Pending { handle, generation } if handle.is_finished() => {
                self.resolve(generation, join(handle), None)
            }
            State::Stale {
                value,
                value_generation,
                handle,
                generation,
            } if handle.is_finished() => {
                self.resolve(generation, join(handle), Some((value, value_generation)))
            }
            other => other,
        };
        matches!(self.state, State::Pending { .. } | State::Stale { .. })
    }

    fn resolve(
        &self,
        generation: u64,
        result: LoadResult<T>,
        previous: Option<(T, u64)>,
    ) -> State<T> {
        if generation != self.requested {
            log::debug!(
                "discarding stale response (generation {generation}, latest {})",
                self.requested
            );
            return match previous {
                Some((value, value_generation)) => State::Ready {
                    value,
                    generation: value_generation,
                },
                None => State::Idle,
            };
        }
        match result {
            Ok(value) => State::Ready { value, generation },
            Err(error) => {
                log::warn!("load failed: {error}");
                State::Failed { error, generation }
            }
        }
    }
}

fn join<T>(handle: JoinHandle<LoadResult<T>>) -> LoadResult<T> {
    handle
        .join()
        .unwrap_or_else(|_| Err(DataError::load("loader panicked")))
}

impl<T> Remote<T> {
    pub fn value(&self) -> Option<&T> {
        match &self.state {
            State::Ready { value, .. } | State::Stale { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&DataError> {
        match &self.state {
            State::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, State::Pending { .. } | State::Stale { .. })
    }
}

impl<T> std::fmt::Debug for Remote<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self.state {
            State::Idle => "Idle",
            State::Pending { .. } => "Pending",
            State::Stale { .. } => "Stale",
            State::Ready { .. } => "Ready",
            State::Failed { .. } => "Failed",
        };
        write!(f, "Remote::{name}(requested={})", self.requested)
    }
}

// ---------------------------------------------------------------------------
// Signals and derived values

/// A generation-counted input cell. Writing bumps the generation so
/// derivations depending on it know to recompute.
#[derive(Debug, Clone, Default)]
pub struct Signal<T> {
    value: T,
    generation: u64,
}

impl<T> Signal<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            generation: 0,
        }
    }

    pub fn set(&mut self, value: T) {
        self.value = value;
        self.generation += 1;
    }

    pub fn update(&mut self, f: impl FnOnce(&mut T)) {
        f(&mut self.value);
        self.generation += 1;
    }

    /// Mark changed without replacing the value.
    pub fn notify(&mut self) {
        self.generation += 1;
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl<T> std::ops::Deref for Signal<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

/// Shared form for signals crossing panel boundaries (e.g. a year filter
/// driving both a map and its paired chart).
pub type SharedSignal<T> = Arc<RwLock<Signal<T>>>;

pub fn shared<T>(value: T) -> SharedSignal<T> {
    Arc::new(RwLock::new(Signal::new(value)))
}

/// Anything a derivation can declare as an input.
pub trait DependencyStamp {
    fn stamp(&self) -> u64;
}

impl<T> DependencyStamp for Signal<T> {
    fn stamp(&self) -> u64 {
        self.generation
    }
}

impl<T> DependencyStamp for Remote<T> {
    fn stamp(&self) -> u64 {
        match &self.state {
            State::Idle => 0,
            State::Pending { generation, .. } => generation * 4 + 1,
            State::Stale {
                value_generation, ..
            } => value_generation * 4 + 2,
            State::Ready { generation, .. } => generation * 4 + 2,
            State::Failed { generation, .. } => generation * 4 + 3,
        }
    }
}

fn mix(acc: u64, next: u64) -> u64 {
    acc.rotate_left(17) ^ next.wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

impl<A: DependencyStamp> DependencyStamp for (&A,) {
    fn stamp(&self) -> u64 {
        self.0.stamp()
    }
}

impl<A: DependencyStamp, B: DependencyStamp> DependencyStamp for (&A, &B) {
    fn stamp(&self) -> u64 {
        mix(self.0.stamp(), self.1.stamp())
    }
}

impl<A: DependencyStamp, B: DependencyStamp, C: DependencyStamp> DependencyStamp
    for (&A, &B, &C)
{
    fn stamp(&self) -> u64 {
        mix(mix(self.0.stamp(), self.1.stamp()), self.2.stamp())
    }
}

impl<A: DependencyStamp, B: DependencyStamp, C: DependencyStamp, D: DependencyStamp>
    DependencyStamp for (&A, &B, &C, &D)
{
    fn stamp(&self) -> u64 {
        mix(
            mix(mix(self.0.stamp(), self.1.stamp()), self.2.stamp()),
            self.3.stamp(),
        )
    }
}

/// A lazily recomputed pure derivation over declared inputs.
///
/// The cached value is returned until the combined input stamp changes;
/// then `compute` runs once and the cache is replaced. Unrelated state
/// never invalidates it.
#[derive(Debug, Default)]
pub struct Derived<T> {
    value: Option<T>,
    seen: Option<u64>,
}

impl<T> Derived<T> {
    pub fn new() -> Self {
        Self {
            value: None,
            seen: None,
        }
    }

    pub fn read(&mut self, deps: &impl DependencyStamp, compute: impl FnOnce() -> T) -> &T {
        let stamp = deps.stamp();
        if self.seen != Some(stamp) {
            self.value = None;
            self.seen = Some(stamp);
        }
        self.value.get_or_insert_with(compute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn settle<T: Send + 'static>(remote: &mut Remote<T>) {
        for _ in 0..500 {
            if !remote.poll() {
                return;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        panic!("remote never settled");
    }

    #[test]
    fn load_reaches_ready() {
        let mut remote: Remote<u32> = Remote::new();
        assert!(remote.value().is_none());
        remote.spawn(|| Ok(41));
        settle(&mut remote);
        assert_eq!(remote.value(), Some(&41));
        assert!(remote.error().is_none());
    }

    #[test]
    fn failed_load_surfaces_the_error() {
        let mut remote: Remote<u32> = Remote::new();
        remote.spawn(|| Err(DataError::load("boom")));
        settle(&mut remote);
        assert!(remote.value().is_none());
        assert!(matches!(remote.error(), Some(DataError::Load { .. })));
    }

    #[test]
    fn refresh_keeps_the_previous_value_visible() {
        let mut remote: Remote<u32> = Remote::new();
        remote.spawn(|| Ok(1));
        settle(&mut remote);
        remote.spawn(|| {
            std::thread::sleep(Duration::from_millis(30));
            Ok(2)
        });
        // Still showing the old value while the reload runs.
        assert!(remote.is_loading());
        assert_eq!(remote.value(), Some(&1));
        settle(&mut remote);
        assert_eq!(remote.value(), Some(&2));
    }

    #[test]
    fn superseded_fetch_never_lands() {
        let mut remote: Remote<u32> = Remote::new();
        remote.spawn(|| {
            std::thread::sleep(Duration::from_millis(40));
            Ok(1)
        });
        // A newer request supersedes before the first completes.
        remote.spawn(|| Ok(2));
        settle(&mut remote);
        assert_eq!(remote.value(), Some(&2));
        // Give the orphaned thread time to finish; the value must not move.
        std::thread::sleep(Duration::from_millis(60));
        remote.poll();
        assert_eq!(remote.value(), Some(&2));
    }

    #[test]
    fn stale_generation_is_discarded_on_resolve() {
        let mut remote: Remote<u32> = Remote::new();
        remote.requested = 3;
        let state = remote.resolve(2, Ok(99), None);
        assert!(matches!(state, State::Idle));
        let state = remote.resolve(2, Ok(99), Some((7, 1)));
        match state {
            State::Ready { value, .. } => assert_eq!(value, 7),
            _ => panic!("expected the previous value to survive"),
        }
        // The matching generation does land.
        let state = remote.resolve(3, Ok(99), None);
        match state {
            State::Ready { value, .. } => assert_eq!(value, 99),
            _ => panic!("expected the fresh value"),
        }
    }

    #[test]
    fn signal_bumps_generation_on_every_write() {
        let mut year = Signal::new(2000u16);
        assert_eq!(year.generation(), 0);
        year.set(2001);
        year.update(|y| *y += 1);
        year.notify();
        assert_eq!(year.generation(), 3);
        assert_eq!(*year, 2002);
    }

    #[test]
    fn derived_recomputes_exactly_on_input_change() {
        let mut year = Signal::new(2000u16);
        let mut category = Signal::new(String::from("All"));
        let mut derived: Derived<String> = Derived::new();
        let mut runs = 0;

        let v = derived.read(&(&year, &category), || {
            runs += 1;
            format!("{} {}", *year, *category)
        });
        assert_eq!(v, "2000 All");

        // Same generations: cached, no recompute.
        derived.read(&(&year, &category), || {
            runs += 1;
            unreachable!("must not recompute")
        });

        year.set(2014);
        let v = derived.read(&(&year, &category), || {
            runs += 1;
            format!("{} {}", *year, *category)
        });
        assert_eq!(v, "2014 All");
        assert_eq!(runs, 2);
    }

    #[test]
    fn remote_stamp_tracks_value_arrival() {
        let mut remote: Remote<u32> = Remote::new();
        let idle = remote.stamp();
        remote.spawn(|| Ok(1));
        let pending = remote.stamp();
        settle(&mut remote);
        let ready = remote.stamp();
        assert_ne!(idle, pending);
        assert_ne!(pending, ready);
    }
}

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, RwLock, RwLockReadGuard};
use std::time::{Duration, Instant};

use cartograph_world::{ChunkCoord, COLUMNS};

use crate::config::CacheLimits;

#[inline]
pub fn column_index(x: usize, z: usize) -> usize {
    z * 16 + x
}

/// Cache key: a chunk, plus the vertical slice for slice-scoped grids.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GridKey {
    pub coord: ChunkCoord,
    pub slice: Option<i32>,
}

impl GridKey {
    #[inline]
    pub const fn new(coord: ChunkCoord, slice: Option<i32>) -> Self {
        Self { coord, slice }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct CacheStats {
    pub name: &'static str,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
}

struct CacheEntry<V> {
    value: Arc<V>,
    created: Instant,
}

/// Bounded LRU of per-chunk grids with optional age expiry.
pub struct ChunkGridCache<V> {
    name: &'static str,
    entries: RwLock<HashMap<GridKey, CacheEntry<V>>>,
    order: Mutex<VecDeque<GridKey>>,
    capacity: usize,
    max_age: Option<Duration>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl<V: Default> ChunkGridCache<V> {
    pub fn new(name: &'static str, capacity: usize, max_age: Option<Duration>) -> Self {
        Self {
            name,
            entries: RwLock::new(HashMap::new()),
            order: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
            max_age,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Returns the grid for `key`, creating an empty one on a miss.
    ///
    /// Concurrent callers racing on the same key all receive the same grid.
    pub fn get_or_default(&self, key: GridKey) -> Arc<V> {
        if let Some(v) = self.lookup(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            self.touch(&key);
            return v;
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        let (value, inserted) = {
            let mut entries = self.entries.write().unwrap();
            let fresh = entries.get(&key).is_some_and(|e| !self.expired(e));
            if fresh {
                (Arc::clone(&entries[&key].value), false)
            } else {
                let value = Arc::new(V::default());
                entries.insert(
                    key,
                    CacheEntry {
                        value: Arc::clone(&value),
                        created: Instant::now(),
                    },
                );
                (value, true)
            }
        };
        if inserted {
            self.remove_from_order(&key);
            self.order.lock().unwrap().push_back(key);
            self.enforce_capacity();
        }
        value
    }

    /// The grid for `key` if one is cached and not expired.
    pub fn get(&self, key: GridKey) -> Option<Arc<V>> {
        self.lookup(&key)
    }

    pub fn invalidate(&self, key: GridKey) -> bool {
        let removed = self.entries.write().unwrap().remove(&key).is_some();
        if removed {
            self.evictions.fetch_add(1, Ordering::Relaxed);
            self.remove_from_order(&key);
        }
        removed
    }

    /// Drops every grid belonging to `coord`, whatever the slice.
    pub fn invalidate_chunk(&self, coord: ChunkCoord) -> usize {
        let removed = {
            let mut entries = self.entries.write().unwrap();
            let before = entries.len();
            entries.retain(|k, _| k.coord != coord);
            before - entries.len()
        };
        if removed > 0 {
            self.evictions.fetch_add(removed as u64, Ordering::Relaxed);
            self.order.lock().unwrap().retain(|k| k.coord != coord);
        }
        removed
    }

    pub fn clear(&self) {
        let removed = {
            let mut entries = self.entries.write().unwrap();
            let len = entries.len() as u64;
            entries.clear();
            len
        };
        if removed > 0 {
            self.evictions.fetch_add(removed, Ordering::Relaxed);
        }
        self.order.lock().unwrap().clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            name: self.name,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries: self.entries.read().map(|m| m.len()).unwrap_or(0),
        }
    }

    fn expired(&self, entry: &CacheEntry<V>) -> bool {
        self.max_age.is_some_and(|age| entry.created.elapsed() > age)
    }

    fn lookup(&self, key: &GridKey) -> Option<Arc<V>> {
        let stale = {
            let entries = self.entries.read().ok()?;
            let entry = entries.get(key)?;
            if !self.expired(entry) {
                return Some(Arc::clone(&entry.value));
            }
            true
        };
        if stale {
            log::trace!(target: "cache", "{}: expired {:?}", self.name, key);
            self.invalidate(*key);
        }
        None
    }

    fn touch(&self, key: &GridKey) {
        let mut order = self.order.lock().unwrap();
        if let Some(pos) = order.iter().position(|k| k == key) {
            if let Some(entry) = order.remove(pos) {
                order.push_back(entry);
            }
        }
    }

    fn remove_from_order(&self, key: &GridKey) {
        let mut order = self.order.lock().unwrap();
        if let Some(pos) = order.iter().position(|k| k == key) {
            order.remove(pos);
        }
    }

    fn enforce_capacity(&self) {
        let mut victims: Vec<GridKey> = Vec::new();
        {
            let mut order = self.order.lock().unwrap();
            while order.len() > self.capacity {
                if let Some(old) = order.pop_front() {
                    victims.push(old);
                }
            }
        }
        if victims.is_empty() {
            return;
        }
        let mut entries = self.entries.write().unwrap();
        for key in victims {
            if entries.remove(&key).is_some() {
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

/// 16x16 resolved heights; `None` until a column is computed.
pub struct HeightGrid {
    cells: Mutex<[Option<i32>; COLUMNS]>,
}

impl Default for HeightGrid {
    fn default() -> Self {
        Self {
            cells: Mutex::new([None; COLUMNS]),
        }
    }
}

impl HeightGrid {
    pub fn get(&self, x: usize, z: usize) -> Option<i32> {
        self.cells.lock().unwrap()[column_index(x, z)]
    }

    /// Cached height for a column, computing it under the grid lock on first
    /// use. Errors are returned without being cached.
    pub fn get_or_try<E>(
        &self,
        x: usize,
        z: usize,
        compute: impl FnOnce() -> Result<i32, E>,
    ) -> Result<i32, E> {
        let mut cells = self.cells.lock().unwrap();
        let i = column_index(x, z);
        if let Some(y) = cells[i] {
            return Ok(y);
        }
        let y = compute()?;
        cells[i] = Some(y);
        Ok(y)
    }

    pub fn resolved(&self) -> usize {
        self.cells.lock().unwrap().iter().filter(|c| c.is_some()).count()
    }
}

/// Slope multipliers for a whole chunk, computed at most once.
#[derive(Default)]
pub struct SlopeGrid {
    slopes: OnceLock<[f32; COLUMNS]>,
}

impl SlopeGrid {
    pub fn get_or_populate(&self, populate: impl FnOnce() -> [f32; COLUMNS]) -> &[f32; COLUMNS] {
        self.slopes.get_or_init(populate)
    }

    pub fn get(&self, x: usize, z: usize) -> Option<f32> {
        self.slopes.get().map(|s| s[column_index(x, z)])
    }

    pub fn is_populated(&self) -> bool {
        self.slopes.get().is_some()
    }
}

pub const WATER_HEIGHT: &str = "water_height";

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PropValue {
    Int(i32),
    Float(f32),
    Flag(bool),
}

impl PropValue {
    pub fn as_i32(self) -> Option<i32> {
        match self {
            PropValue::Int(v) => Some(v),
            _ => None,
        }
    }
}

/// Sparse per-column scratch values recorded during height resolution.
pub struct ColumnProperties {
    columns: Mutex<Vec<Option<hashbrown::HashMap<&'static str, PropValue>>>>,
}

impl Default for ColumnProperties {
    fn default() -> Self {
        Self {
            columns: Mutex::new(vec![None; COLUMNS]),
        }
    }
}

impl ColumnProperties {
    pub fn set(&self, x: usize, z: usize, key: &'static str, value: PropValue) {
        let mut columns = self.columns.lock().unwrap();
        columns[column_index(x, z)]
            .get_or_insert_with(hashbrown::HashMap::new)
            .insert(key, value);
    }

    pub fn get(&self, x: usize, z: usize, key: &str) -> Option<PropValue> {
        let columns = self.columns.lock().unwrap();
        columns[column_index(x, z)].as_ref()?.get(key).copied()
    }

    pub fn get_i32(&self, x: usize, z: usize, key: &str) -> Option<i32> {
        self.get(x, z, key).and_then(PropValue::as_i32)
    }

    pub fn has_column(&self, x: usize, z: usize) -> bool {
        self.columns.lock().unwrap()[column_index(x, z)].is_some()
    }
}

/// The three per-chunk caches one renderer owns.
pub struct RenderCaches {
    pub name: &'static str,
    pub heights: ChunkGridCache<HeightGrid>,
    pub slopes: ChunkGridCache<SlopeGrid>,
    pub props: ChunkGridCache<ColumnProperties>,
    // Renders hold it shared; chunk invalidation holds it exclusively
    gate: RwLock<()>,
}

impl RenderCaches {
    pub fn new(name: &'static str, limits: &CacheLimits) -> Self {
        let age = limits.max_age();
        Self {
            name,
            heights: ChunkGridCache::new("heights", limits.capacity, age),
            slopes: ChunkGridCache::new("slopes", limits.capacity, age),
            props: ChunkGridCache::new("column_props", limits.capacity, age),
            gate: RwLock::new(()),
        }
    }

    pub fn read_gate(&self) -> RwLockReadGuard<'_, ()> {
        self.gate.read().unwrap()
    }

    /// Forgets every grid for `coord`; waits for in-flight renders first.
    pub fn invalidate_chunk(&self, coord: ChunkCoord) {
        let _exclusive = self.gate.write().unwrap();
        let n = self.heights.invalidate_chunk(coord)
            + self.slopes.invalidate_chunk(coord)
            + self.props.invalidate_chunk(coord);
        if n > 0 {
            log::debug!(
                target: "cache",
                "{}: dropped {n} grids for chunk ({}, {})",
                self.name,
                coord.cx,
                coord.cz
            );
        }
    }

    pub fn clear(&self) {
        let _exclusive = self.gate.write().unwrap();
        self.heights.clear();
        self.slopes.clear();
        self.props.clear();
    }

    pub fn stats(&self) -> [CacheStats; 3] {
        [self.heights.stats(), self.slopes.stats(), self.props.stats()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(cx: i32, slice: Option<i32>) -> GridKey {
        GridKey::new(ChunkCoord::new(cx, 0), slice)
    }

    #[test]
    fn get_or_default_shares_one_grid() {
        let cache: ChunkGridCache<HeightGrid> = ChunkGridCache::new("t", 8, None);
        let a = cache.get_or_default(key(0, None));
        let b = cache.get_or_default(key(0, None));
        assert!(Arc::ptr_eq(&a, &b));
        let s = cache.stats();
        assert_eq!((s.hits, s.misses, s.entries), (1, 1, 1));
    }

    #[test]
    fn capacity_evicts_least_recent() {
        let cache: ChunkGridCache<SlopeGrid> = ChunkGridCache::new("t", 2, None);
        cache.get_or_default(key(0, None));
        cache.get_or_default(key(1, None));
        cache.get_or_default(key(0, None));
        cache.get_or_default(key(2, None));
        assert!(cache.get(key(0, None)).is_some());
        assert!(cache.get(key(1, None)).is_none());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn invalidate_chunk_drops_every_slice() {
        let cache: ChunkGridCache<HeightGrid> = ChunkGridCache::new("t", 16, None);
        cache.get_or_default(key(0, Some(1)));
        cache.get_or_default(key(0, Some(2)));
        cache.get_or_default(key(1, Some(1)));
        assert_eq!(cache.invalidate_chunk(ChunkCoord::new(0, 0)), 2);
        assert_eq!(cache.stats().entries, 1);
    }

    #[test]
    fn zero_max_age_expires_immediately() {
        let cache: ChunkGridCache<HeightGrid> =
            ChunkGridCache::new("t", 16, Some(Duration::from_secs(0)));
        let a = cache.get_or_default(key(0, None));
        std::thread::sleep(Duration::from_millis(2));
        let b = cache.get_or_default(key(0, None));
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn height_grid_caches_only_successes() {
        let grid = HeightGrid::default();
        let r: Result<i32, ()> = grid.get_or_try(1, 2, || Err(()));
        assert!(r.is_err());
        assert_eq!(grid.get(1, 2), None);
        assert_eq!(grid.get_or_try::<()>(1, 2, || Ok(7)), Ok(7));
        assert_eq!(grid.get_or_try::<()>(1, 2, || Ok(9)), Ok(7));
        assert_eq!(grid.resolved(), 1);
    }

    #[test]
    fn slope_grid_populates_once() {
        let grid = SlopeGrid::default();
        let mut calls = 0;
        grid.get_or_populate(|| {
            calls += 1;
            [1.0; COLUMNS]
        });
        grid.get_or_populate(|| {
            calls += 1;
            [2.0; COLUMNS]
        });
        assert_eq!(calls, 1);
        assert_eq!(grid.get(3, 3), Some(1.0));
    }

    #[test]
    fn racing_threads_compute_a_height_once() {
        use std::sync::atomic::AtomicUsize;
        use std::sync::Barrier;

        let cache: ChunkGridCache<HeightGrid> = ChunkGridCache::new("t", 8, None);
        let calls = AtomicUsize::new(0);
        let barrier = Barrier::new(8);
        let seen: Vec<i32> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        let grid = cache.get_or_default(key(0, Some(1)));
                        grid.get_or_try::<()>(4, 5, || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            std::thread::sleep(Duration::from_millis(5));
                            Ok(42)
                        })
                        .unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(seen.iter().all(|y| *y == 42));
        assert_eq!(cache.stats().entries, 1);
    }

    #[test]
    fn racing_threads_populate_slopes_once() {
        use std::sync::atomic::AtomicUsize;
        use std::sync::Barrier;

        let grid = SlopeGrid::default();
        let calls = AtomicUsize::new(0);
        let barrier = Barrier::new(8);
        std::thread::scope(|s| {
            for i in 0..8 {
                let (grid, calls, barrier) = (&grid, &calls, &barrier);
                s.spawn(move || {
                    barrier.wait();
                    let slopes = grid.get_or_populate(|| {
                        calls.fetch_add(1, Ordering::SeqCst);
                        std::thread::sleep(Duration::from_millis(5));
                        [i as f32; COLUMNS]
                    });
                    assert!(slopes.iter().all(|v| *v == slopes[0]));
                });
            }
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(grid.is_populated());
    }

    #[test]
    fn column_properties_are_sparse() {
        let props = ColumnProperties::default();
        assert!(!props.has_column(0, 0));
        props.set(0, 0, WATER_HEIGHT, PropValue::Int(62));
        assert_eq!(props.get_i32(0, 0, WATER_HEIGHT), Some(62));
        assert_eq!(props.get_i32(1, 0, WATER_HEIGHT), None);
    }
}

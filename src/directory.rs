//! Master-data directories and the session cache that loads them
use crate::rate::{MaterialRate, RatePartyType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::{debug, info};

/// One `{id, name}` row of a master-data list endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub id: u64,
    pub name: String,
}

impl DirectoryEntry {
    pub fn new(id: u64, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
        }
    }
}

/// A read-only `{id, name}` list, looked up by exact name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directory {
    entries: Vec<DirectoryEntry>,
}

impl Directory {
    pub fn new(entries: Vec<DirectoryEntry>) -> Self {
        Self { entries }
    }
    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.entries
    }
    pub fn find_exact(&self, name: &str) -> Option<u64> {
        self.entries.iter().find(|e| e.name == name).map(|e| e.id)
    }
    pub fn contains(&self, name: &str) -> bool {
        self.find_exact(name).is_some()
    }
    /// Entries whose normalized name contains the normalized query.
    /// Only used to hint at near matches; rate resolution never goes through here.
    pub fn suggest(&self, name: &str) -> Vec<&DirectoryEntry> {
        let needle = normalize(name);
        if needle.is_empty() {
            return vec![];
        }
        self.entries
            .iter()
            .filter(|e| {
                let candidate = normalize(&e.name);
                candidate.contains(&needle) || needle.contains(&candidate)
            })
            .collect()
    }
}

impl FromIterator<DirectoryEntry> for Directory {
    fn from_iter<I: IntoIterator<Item = DirectoryEntry>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

fn normalize(name: &str) -> String {
    name.split_whitespace()
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// One directory per rate-party role, all looked up through the same function.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RatePartyDirectories {
    directories: HashMap<RatePartyType, Directory>,
}

impl RatePartyDirectories {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with(mut self, party_type: RatePartyType, directory: Directory) -> Self {
        self.directories.insert(party_type, directory);
        self
    }
    pub fn directory(&self, party_type: RatePartyType) -> Option<&Directory> {
        self.directories.get(&party_type)
    }
    pub fn lookup(&self, party_type: RatePartyType, name: &str) -> Option<u64> {
        self.directory(party_type)?.find_exact(name)
    }
}

/// Everything the resolver and the one-off check read, captured at one moment.
#[derive(Debug, Clone, Default)]
pub struct MasterData {
    pub parties: RatePartyDirectories,
    pub sites: Directory,
    pub materials: Directory,
    pub vehicles: Directory,
    pub rates: Vec<MaterialRate>,
}

/// Where a cached list comes from, typically a list endpoint.
pub trait Loader<T>: Send + Sync {
    fn load(&self) -> anyhow::Result<Vec<T>>;
}

impl<T, F> Loader<T> for F
where
    F: Fn() -> anyhow::Result<Vec<T>> + Send + Sync,
{
    fn load(&self) -> anyhow::Result<Vec<T>> {
        self()
    }
}

/// A load-once list. `invalidate` drops the data so the next `ensure_loaded` refetches.
pub struct Cached<T> {
    label: &'static str,
    loader: Box<dyn Loader<T>>,
    items: RwLock<Option<Vec<T>>>,
}

impl<T: Clone> Cached<T> {
    pub fn new(label: &'static str, loader: impl Loader<T> + 'static) -> Self {
        Self {
            label,
            loader: Box::new(loader),
            items: RwLock::new(None),
        }
    }
    /// Current items, empty when nothing has been loaded yet.
    pub fn get(&self) -> Vec<T> {
        match self.items.read() {
            Ok(guard) => guard.clone().unwrap_or_default(),
            Err(poisoned) => poisoned.into_inner().clone().unwrap_or_default(),
        }
    }
    pub fn is_loaded(&self) -> bool {
        match self.items.read() {
            Ok(guard) => guard.is_some(),
            Err(poisoned) => poisoned.into_inner().is_some(),
        }
    }
    pub fn invalidate(&self) {
        debug!(list = self.label, "invalidating cached list");
        match self.items.write() {
            Ok(mut guard) => *guard = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }
    pub fn ensure_loaded(&self) -> anyhow::Result<()> {
        if self.is_loaded() {
            return Ok(());
        }
        let items = self.loader.load()?;
        info!(list = self.label, count = items.len(), "loaded master data");
        match self.items.write() {
            Ok(mut guard) => *guard = Some(items),
            Err(poisoned) => *poisoned.into_inner() = Some(items),
        }
        Ok(())
    }
}

/// The session's master-data cache. Built once and shared by reference.
pub struct MasterDataCache {
    parties: HashMap<RatePartyType, Cached<DirectoryEntry>>,
    sites: Cached<DirectoryEntry>,
    materials: Cached<DirectoryEntry>,
    vehicles: Cached<DirectoryEntry>,
    rates: Cached<MaterialRate>,
}

impl MasterDataCache {
    pub fn builder() -> MasterDataCacheBuilder {
        MasterDataCacheBuilder::default()
    }

    pub fn ensure_loaded(&self) -> anyhow::Result<()> {
        for cached in self.parties.values() {
            cached.ensure_loaded()?;
        }
        self.sites.ensure_loaded()?;
        self.materials.ensure_loaded()?;
        self.vehicles.ensure_loaded()?;
        self.rates.ensure_loaded()
    }

    pub fn invalidate(&self) {
        for cached in self.parties.values() {
            cached.invalidate();
        }
        self.sites.invalidate();
        self.materials.invalidate();
        self.vehicles.invalidate();
        self.rates.invalidate();
    }

    /// Drop only the rate table, e.g. after a rate record was edited.
    pub fn invalidate_rates(&self) {
        self.rates.invalidate();
    }

    /// Loads anything missing and copies the lists into a snapshot.
    pub fn snapshot(&self) -> anyhow::Result<MasterData> {
        self.ensure_loaded()?;

        let parties = self
            .parties
            .iter()
            .fold(RatePartyDirectories::new(), |dirs, (party_type, cached)| {
                dirs.with(*party_type, cached.get().into_iter().collect())
            });

        Ok(MasterData {
            parties,
            sites: self.sites.get().into_iter().collect(),
            materials: self.materials.get().into_iter().collect(),
            vehicles: self.vehicles.get().into_iter().collect(),
            rates: self.rates.get(),
        })
    }
}

/// Missing loaders default to empty lists.
#[derive(Default)]
pub struct MasterDataCacheBuilder {
    parties: HashMap<RatePartyType, Cached<DirectoryEntry>>,
    sites: Option<Cached<DirectoryEntry>>,
    materials: Option<Cached<DirectoryEntry>>,
    vehicles: Option<Cached<DirectoryEntry>>,
    rates: Option<Cached<MaterialRate>>,
}

fn empty<T>() -> anyhow::Result<Vec<T>> {
    Ok(vec![])
}

impl MasterDataCacheBuilder {
    pub fn parties(
        mut self,
        party_type: RatePartyType,
        loader: impl Loader<DirectoryEntry> + 'static,
    ) -> Self {
        self.parties
            .insert(party_type, Cached::new(party_type.as_str(), loader));
        self
    }
    pub fn sites(mut self, loader: impl Loader<DirectoryEntry> + 'static) -> Self {
        self.sites = Some(Cached::new("sites", loader));
        self
    }
    pub fn materials(mut self, loader: impl Loader<DirectoryEntry> + 'static) -> Self {
        self.materials = Some(Cached::new("materials", loader));
        self
    }
    pub fn vehicles(mut self, loader: impl Loader<DirectoryEntry> + 'static) -> Self {
        self.vehicles = Some(Cached::new("vehicles", loader));
        self
    }
    pub fn rates(mut self, loader: impl Loader<MaterialRate> + 'static) -> Self {
        self.rates = Some(Cached::new("material rates", loader));
        self
    }
    pub fn build(self) -> MasterDataCache {
        MasterDataCache {
            parties: self.parties,
            sites: self
                .sites
                .unwrap_or_else(|| Cached::new("sites", empty::<DirectoryEntry>)),
            materials: self
                .materials
                .unwrap_or_else(|| Cached::new("materials", empty::<DirectoryEntry>)),
            vehicles: self
                .vehicles
                .unwrap_or_else(|| Cached::new("vehicles", empty::<DirectoryEntry>)),
            rates: self
                .rates
                .unwrap_or_else(|| Cached::new("material rates", empty::<MaterialRate>)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn quarries() -> Directory {
        Directory::new(vec![
            DirectoryEntry::new(1, "North Quarry"),
            DirectoryEntry::new(2, "South  Quarry"),
        ])
    }

    #[test]
    fn exact_lookup_is_case_sensitive() {
        let dir = quarries();

        assert_eq!(dir.find_exact("North Quarry"), Some(1));
        assert_eq!(dir.find_exact("north quarry"), None);
    }

    #[test]
    fn suggestions_ignore_case_and_spacing() {
        let dir = quarries();
        let hits: Vec<u64> = dir.suggest("south quarry").iter().map(|e| e.id).collect();

        assert_eq!(hits, vec![2]);
        assert!(dir.suggest("   ").is_empty());
    }

    #[test]
    fn party_lookup_goes_through_role_directory() {
        let dirs = RatePartyDirectories::new().with(RatePartyType::MineQuarry, quarries());

        assert_eq!(dirs.lookup(RatePartyType::MineQuarry, "North Quarry"), Some(1));
        assert_eq!(dirs.lookup(RatePartyType::VendorCustomer, "North Quarry"), None);
    }

    #[test]
    fn cached_list_loads_once_until_invalidated() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let cached = Cached::new("sites", move || -> anyhow::Result<Vec<DirectoryEntry>> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(vec![DirectoryEntry::new(7, "Depot")])
        });

        assert!(cached.get().is_empty());
        cached.ensure_loaded().unwrap();
        cached.ensure_loaded().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cached.get().len(), 1);

        cached.invalidate();
        assert!(!cached.is_loaded());
        cached.ensure_loaded().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn failed_load_leaves_cache_empty() {
        let cached: Cached<DirectoryEntry> =
            Cached::new("sites", || -> anyhow::Result<Vec<DirectoryEntry>> {
                Err(anyhow::anyhow!("endpoint unavailable"))
            });

        assert!(cached.ensure_loaded().is_err());
        assert!(!cached.is_loaded());
    }

    #[test]
    fn snapshot_collects_every_list() {
        let cache = MasterDataCache::builder()
            .parties(RatePartyType::MineQuarry, || -> anyhow::Result<Vec<DirectoryEntry>> {
                Ok(quarries().entries().to_vec())
            })
            .sites(|| -> anyhow::Result<Vec<DirectoryEntry>> {
                Ok(vec![DirectoryEntry::new(10, "Gate A")])
            })
            .build();

        let master = cache.snapshot().unwrap();
        assert_eq!(master.parties.lookup(RatePartyType::MineQuarry, "North Quarry"), Some(1));
        assert_eq!(master.sites.find_exact("Gate A"), Some(10));
        assert!(master.rates.is_empty());
    }
}

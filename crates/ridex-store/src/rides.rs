//! # Ride Collection
//!
//! Ride documents with rider, driver and open-ride indexes.
//!
//! Mutations run their closure while the store's write lock is held, so a
//! check such as "still requested" and the write that depends on it cannot
//! interleave with another request.

use crate::errors::StoreError;
use crate::ports::outbound::{BatchOperation, KeyValueStore};
use crate::store::{encode, load, DocumentStore};
use ridex_types::{Ride, RideId, UserId, VehicleType};
use tracing::debug;

const RIDE_PREFIX: &str = "rides/";
const RIDER_INDEX_PREFIX: &str = "idx/rides/rider/";
const DRIVER_INDEX_PREFIX: &str = "idx/rides/driver/";
const OPEN_INDEX_PREFIX: &str = "idx/rides/open/";

fn ride_key(id: RideId) -> Vec<u8> {
    format!("{RIDE_PREFIX}{id}").into_bytes()
}

fn rider_prefix(rider: UserId) -> String {
    format!("{RIDER_INDEX_PREFIX}{rider}/")
}

fn driver_prefix(driver: UserId) -> String {
    format!("{DRIVER_INDEX_PREFIX}{driver}/")
}

fn rider_key(rider: UserId, ride: RideId) -> Vec<u8> {
    format!("{}{ride}", rider_prefix(rider)).into_bytes()
}

fn driver_key(driver: UserId, ride: RideId) -> Vec<u8> {
    format!("{}{ride}", driver_prefix(driver)).into_bytes()
}

fn open_key(ride: RideId) -> Vec<u8> {
    format!("{OPEN_INDEX_PREFIX}{ride}").into_bytes()
}

/// Ride ids referenced by the index entries under `prefix`.
fn indexed_ids(kv: &dyn KeyValueStore, prefix: &str) -> Result<Vec<RideId>, StoreError> {
    kv.prefix_scan(prefix.as_bytes())?
        .into_iter()
        .map(|(key, _)| {
            let tail = key.get(prefix.len()..).unwrap_or_default();
            std::str::from_utf8(tail)
                .ok()
                .and_then(|s| RideId::parse(s).ok())
                .ok_or_else(|| StoreError::Corruption {
                    message: format!("bad index key {}", String::from_utf8_lossy(&key)),
                })
        })
        .collect()
}

/// Load the rides behind an index prefix, oldest first.
fn load_indexed(kv: &dyn KeyValueStore, prefix: &str) -> Result<Vec<Ride>, StoreError> {
    let mut rides = Vec::new();
    for id in indexed_ids(kv, prefix)? {
        match load::<Ride>(kv, &ride_key(id))? {
            Some(ride) => rides.push(ride),
            None => debug!(ride_id = %id, "Dangling ride index entry"),
        }
    }
    rides.sort_by_key(|r| r.created_at);
    Ok(rides)
}

/// Index maintenance for a ride moving from `before` to `after`.
fn index_ops(before: Option<&Ride>, after: &Ride) -> Vec<BatchOperation> {
    let mut ops = Vec::new();

    if before.is_none() {
        ops.push(BatchOperation::put(rider_key(after.rider, after.id), ""));
    }

    let was_open = before.is_some_and(Ride::is_open);
    match (was_open, after.is_open()) {
        (false, true) => ops.push(BatchOperation::put(open_key(after.id), "")),
        (true, false) => ops.push(BatchOperation::delete(open_key(after.id))),
        _ => {}
    }

    let old_driver = before.and_then(|r| r.driver);
    if old_driver != after.driver {
        if let Some(old) = old_driver {
            ops.push(BatchOperation::delete(driver_key(old, after.id)));
        }
        if let Some(new) = after.driver {
            ops.push(BatchOperation::put(driver_key(new, after.id), ""));
        }
    }

    ops
}

/// Ride documents.
#[derive(Debug, Clone)]
pub struct RideCollection {
    store: DocumentStore,
}

impl RideCollection {
    pub fn new(store: DocumentStore) -> Self {
        Self { store }
    }

    pub fn insert(&self, ride: Ride) -> Result<Ride, StoreError> {
        self.insert_guarded(ride, |_| Ok::<_, StoreError>(()))
    }

    /// Insert a ride after `guard` has approved the rider's existing rides.
    ///
    /// The guard runs under the write lock, so a rider racing two requests
    /// sees the first one.
    pub fn insert_guarded<E, G>(&self, ride: Ride, guard: G) -> Result<Ride, E>
    where
        G: FnOnce(&[Ride]) -> Result<(), E>,
        E: From<StoreError>,
    {
        let mut kv = self.store.write();
        let key = ride_key(ride.id);
        if kv.exists(&key)? {
            return Err(StoreError::AlreadyExists(ride.id.to_string()).into());
        }

        let existing = load_indexed(&**kv, &rider_prefix(ride.rider))?;
        guard(&existing)?;

        let mut ops = vec![BatchOperation::put(key, encode(&ride)?)];
        ops.extend(index_ops(None, &ride));
        kv.atomic_batch_write(ops)?;

        debug!(ride_id = %ride.id, rider_id = %ride.rider, "Ride inserted");
        Ok(ride)
    }

    pub fn get(&self, id: RideId) -> Result<Option<Ride>, StoreError> {
        let kv = self.store.read();
        load(&**kv, &ride_key(id))
    }

    /// Rides requested by `rider`, oldest first.
    pub fn list_for_rider(&self, rider: UserId) -> Result<Vec<Ride>, StoreError> {
        let kv = self.store.read();
        load_indexed(&**kv, &rider_prefix(rider))
    }

    /// Rides assigned to `driver`, oldest first.
    pub fn list_for_driver(&self, driver: UserId) -> Result<Vec<Ride>, StoreError> {
        let kv = self.store.read();
        load_indexed(&**kv, &driver_prefix(driver))
    }

    /// Rides still waiting for a driver, oldest first.
    pub fn list_open(&self, vehicle_type: Option<VehicleType>) -> Result<Vec<Ride>, StoreError> {
        let kv = self.store.read();
        let mut rides = load_indexed(&**kv, OPEN_INDEX_PREFIX)?;
        if let Some(wanted) = vehicle_type {
            rides.retain(|r| r.vehicle_type == wanted);
        }
        Ok(rides)
    }

    /// Apply `f` to the stored ride and write it back with its indexes.
    pub fn transition<E, F>(&self, id: RideId, f: F) -> Result<Ride, E>
    where
        F: FnOnce(&mut Ride) -> Result<(), E>,
        E: From<StoreError>,
    {
        self.mutate(id, None, |ride, _| f(ride))
    }

    /// Like `transition`, but `f` also sees every ride already assigned to
    /// `driver`, read under the same lock.
    pub fn transition_for_driver<E, F>(&self, id: RideId, driver: UserId, f: F) -> Result<Ride, E>
    where
        F: FnOnce(&mut Ride, &[Ride]) -> Result<(), E>,
        E: From<StoreError>,
    {
        self.mutate(id, Some(driver), f)
    }

    fn mutate<E, F>(&self, id: RideId, driver: Option<UserId>, f: F) -> Result<Ride, E>
    where
        F: FnOnce(&mut Ride, &[Ride]) -> Result<(), E>,
        E: From<StoreError>,
    {
        let mut kv = self.store.write();
        let key = ride_key(id);
        let before: Ride =
            load(&**kv, &key)?.ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let driver_rides = match driver {
            Some(driver) => load_indexed(&**kv, &driver_prefix(driver))?,
            None => Vec::new(),
        };

        let mut after = before.clone();
        f(&mut after, &driver_rides)?;
        after.id = id;
        after.rider = before.rider;

        let mut ops = vec![BatchOperation::put(key, encode(&after)?)];
        ops.extend(index_ops(Some(&before), &after));
        kv.atomic_batch_write(ops)?;

        debug!(
            ride_id = %id,
            from = %before.status,
            to = %after.status,
            "Ride updated"
        );
        Ok(after)
    }
}

//! In-memory device registry: the single owner of device records and their
//! reading histories for the lifetime of the process.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use log::warn;
use serde::Deserialize;
use thiserror::Error;

use crate::devices::{Device, DeviceStatus, DeviceType, DeviceUpdate, Reading};
use crate::tariff::Tariff;

/// Default number of readings kept per device.
pub const DEFAULT_HISTORY_LIMIT: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("device not found: {0}")]
    NotFound(String),
}

/// Optional building/type/status filters combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DeviceFilter {
    pub building: Option<String>,
    #[serde(rename = "type")]
    pub device_type: Option<DeviceType>,
    pub status: Option<DeviceStatus>,
}

impl DeviceFilter {
    pub fn matches(&self, device: &Device) -> bool {
        self.building
            .as_deref()
            .is_none_or(|b| device.location.building == b)
            && self.device_type.is_none_or(|t| device.device_type == t)
            && self.status.is_none_or(|s| device.status == s)
    }
}

struct Inner {
    devices: BTreeMap<String, Device>,
    readings: HashMap<String, VecDeque<Reading>>,
    /// Status to restore when a toggled-off device comes back.
    resume: HashMap<String, DeviceStatus>,
}

/// Holds every device record and a bounded reading history per device.
///
/// All operations lock an internal mutex for their whole read-modify-write,
/// so concurrent callers never observe a half-applied mutation. The lock is
/// never held across an `.await`.
pub struct DeviceRegistry {
    inner: Mutex<Inner>,
    history_limit: usize,
    tariff: Tariff,
}

impl DeviceRegistry {
    /// Creates a registry seeded with `devices`.
    ///
    /// Later devices replace earlier ones with the same id.
    pub fn new(devices: Vec<Device>, history_limit: usize, tariff: Tariff) -> Self {
        let readings = devices
            .iter()
            .map(|d| (d.id.clone(), VecDeque::new()))
            .collect();
        let devices = devices.into_iter().map(|d| (d.id.clone(), d)).collect();
        Self {
            inner: Mutex::new(Inner {
                devices,
                readings,
                resume: HashMap::new(),
            }),
            history_limit: history_limit.max(1),
            tariff,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn tariff(&self) -> &Tariff {
        &self.tariff
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    pub fn len(&self) -> usize {
        self.lock().devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every device, ordered by id.
    pub fn all(&self) -> Vec<Device> {
        self.lock().devices.values().cloned().collect()
    }

    /// Returns the device with `id`.
    ///
    /// # Errors
    ///
    /// `RegistryError::NotFound` if no device has that id.
    pub fn get(&self, id: &str) -> Result<Device, RegistryError> {
        self.lock()
            .devices
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    /// Devices matching every set field of `filter`.
    pub fn filter(&self, filter: &DeviceFilter) -> Vec<Device> {
        self.lock()
            .devices
            .values()
            .filter(|d| filter.matches(d))
            .cloned()
            .collect()
    }

    pub fn by_building(&self, building: &str) -> Vec<Device> {
        self.filter(&DeviceFilter {
            building: Some(building.to_string()),
            ..DeviceFilter::default()
        })
    }

    pub fn by_type(&self, device_type: DeviceType) -> Vec<Device> {
        self.filter(&DeviceFilter {
            device_type: Some(device_type),
            ..DeviceFilter::default()
        })
    }

    pub fn by_status(&self, status: DeviceStatus) -> Vec<Device> {
        self.filter(&DeviceFilter {
            status: Some(status),
            ..DeviceFilter::default()
        })
    }

    /// Switches a device off, or back on to the status it had before it was
    /// switched off (`online` if it started offline). Returns the new record.
    ///
    /// # Errors
    ///
    /// `RegistryError::NotFound` if no device has that id.
    pub fn toggle(&self, id: &str) -> Result<Device, RegistryError> {
        let mut guard = self.lock();
        let Inner {
            devices, resume, ..
        } = &mut *guard;
        let device = devices
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        let next = if device.is_active() {
            resume.insert(id.to_string(), device.status);
            DeviceStatus::Offline
        } else {
            resume.remove(id).unwrap_or(DeviceStatus::Online)
        };
        device.set_status(next, self.tariff.cost_per_kwh);
        device.last_update = Utc::now();
        Ok(device.clone())
    }

    /// Merges `update` into a device and returns the new record.
    ///
    /// # Errors
    ///
    /// `RegistryError::NotFound` if no device has that id.
    pub fn apply_update(&self, id: &str, update: DeviceUpdate) -> Result<Device, RegistryError> {
        let mut guard = self.lock();
        let Inner {
            devices, resume, ..
        } = &mut *guard;
        let device = devices
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        if update.status.is_some() {
            resume.remove(id);
        }
        device.apply(update, self.tariff.cost_per_kwh, Utc::now());
        Ok(device.clone())
    }

    /// The newest `limit` readings for a device, oldest first.
    ///
    /// # Errors
    ///
    /// `RegistryError::NotFound` if no device has that id.
    pub fn readings(&self, id: &str, limit: usize) -> Result<Vec<Reading>, RegistryError> {
        let inner = self.lock();
        if !inner.devices.contains_key(id) {
            return Err(RegistryError::NotFound(id.to_string()));
        }
        let history = inner.readings.get(id).map(|h| {
            let skip = h.len().saturating_sub(limit);
            h.iter().skip(skip).cloned().collect()
        });
        Ok(history.unwrap_or_default())
    }

    pub fn latest_reading(&self, id: &str) -> Option<Reading> {
        self.lock().readings.get(id).and_then(|h| h.back().cloned())
    }

    /// Runs `step` once per device while holding the lock and appends any
    /// reading it returns to that device's history.
    ///
    /// Returns the number of readings recorded. Readings whose `device_id`
    /// does not match the device they were produced for are dropped.
    pub fn advance<F>(&self, mut step: F) -> usize
    where
        F: FnMut(&mut Device) -> Option<Reading>,
    {
        let mut guard = self.lock();
        let Inner {
            devices, readings, ..
        } = &mut *guard;
        let mut recorded = 0;

        for (id, device) in devices.iter_mut() {
            let Some(reading) = step(device) else {
                continue;
            };
            if reading.device_id != *id {
                warn!("dropping reading for {} produced by {id}", reading.device_id);
                continue;
            }
            let history = readings.entry(id.clone()).or_default();
            history.push_back(reading);
            while history.len() > self.history_limit {
                history.pop_front();
            }
            recorded += 1;
        }

        recorded
    }
}

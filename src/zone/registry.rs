use std::collections::{BTreeMap, BTreeSet};

use crate::error::ZoneError;
use crate::geometry::{NaturalPoint, DEFAULT_MIN_POINT_SEPARATION};

use super::{validate_zone_name, Zone, ZoneId, ZonePayload, ZoneShape, ZoneSpec};

/// The set of zones for one monitored stream.
///
/// Create/update paths validate strictly. `load` is lenient: persisted zones
/// that fail validation are kept but marked malformed and never match a
/// containment query.
#[derive(Clone, Debug)]
pub struct ZoneRegistry {
    zones: BTreeMap<ZoneId, Zone>,
    malformed: BTreeSet<ZoneId>,
    /// Wider than `ZoneId` so a zone persisted at `u32::MAX` cannot wrap it.
    next_id: u64,
    min_separation: f64,
}

impl ZoneRegistry {
    pub fn new() -> Self {
        Self::with_min_separation(DEFAULT_MIN_POINT_SEPARATION)
    }

    pub fn with_min_separation(min_separation: f64) -> Self {
        Self {
            zones: BTreeMap::new(),
            malformed: BTreeSet::new(),
            next_id: 1,
            min_separation,
        }
    }

    pub fn min_separation(&self) -> f64 {
        self.min_separation
    }

    fn allocate_id(&mut self) -> Result<ZoneId, ZoneError> {
        let id = u32::try_from(self.next_id).map_err(|_| ZoneError::IdsExhausted)?;
        self.next_id += 1;
        Ok(ZoneId(id))
    }

    fn reserve_id(&mut self, id: ZoneId) {
        self.next_id = self.next_id.max(u64::from(id.0) + 1);
    }

    fn check(&self, spec_name: &str, shape: &ZoneShape) -> Result<(), ZoneError> {
        validate_zone_name(spec_name)?;
        shape.validate(self.min_separation)?;
        Ok(())
    }

    pub fn create(&mut self, spec: ZoneSpec) -> Result<ZoneId, ZoneError> {
        self.check(&spec.name, &spec.shape)?;
        let id = self.allocate_id()?;
        log::info!(
            "zone {} '{}' created ({}, scooper required: {})",
            id,
            spec.name,
            spec.shape.kind().as_str(),
            spec.requires_scooper
        );
        self.zones.insert(id, spec.into_zone(id));
        Ok(id)
    }

    /// Replace every attribute of a zone. Returns the previous zone.
    pub fn update(&mut self, id: ZoneId, spec: ZoneSpec) -> Result<Zone, ZoneError> {
        if !self.zones.contains_key(&id) {
            return Err(ZoneError::UnknownZone(id));
        }
        self.check(&spec.name, &spec.shape)?;
        self.malformed.remove(&id);
        let previous = self.zones.insert(id, spec.into_zone(id));
        previous.ok_or(ZoneError::UnknownZone(id))
    }

    /// Replace a zone's geometry only. Returns the previous zone.
    pub fn update_shape(&mut self, id: ZoneId, shape: ZoneShape) -> Result<Zone, ZoneError> {
        shape.validate(self.min_separation)?;
        let zone = self.zones.get_mut(&id).ok_or(ZoneError::UnknownZone(id))?;
        let previous = zone.clone();
        zone.shape = shape;
        self.malformed.remove(&id);
        Ok(previous)
    }

    pub fn delete(&mut self, id: ZoneId) -> Result<Zone, ZoneError> {
        let zone = self.zones.remove(&id).ok_or(ZoneError::UnknownZone(id))?;
        self.malformed.remove(&id);
        log::info!("zone {} '{}' deleted", id, zone.name);
        Ok(zone)
    }

    /// Re-insert a zone under its original id (undo of a delete or create).
    /// A zone that fails validation comes back marked malformed, as it was
    /// before it was removed.
    pub fn restore(&mut self, zone: Zone) -> Result<(), ZoneError> {
        if self.zones.contains_key(&zone.id) {
            return Err(ZoneError::DuplicateId(zone.id));
        }
        if let Err(err) = self.check(&zone.name, &zone.shape) {
            log::warn!("zone {} '{}' restored as malformed: {}", zone.id, zone.name, err);
            self.malformed.insert(zone.id);
        }
        self.reserve_id(zone.id);
        self.zones.insert(zone.id, zone);
        Ok(())
    }

    /// Import persisted zones. Returns how many were accepted as well-formed.
    pub fn load(&mut self, payloads: Vec<ZonePayload>) -> usize {
        let mut accepted = 0;
        for payload in payloads {
            let spec = match payload.to_spec() {
                Ok(spec) => spec,
                Err(err) => {
                    log::warn!("skipping zone '{}': {}", payload.name, err);
                    continue;
                }
            };
            let id = match payload.id {
                Some(id) if self.zones.contains_key(&id) => {
                    log::warn!("skipping zone '{}': {}", payload.name, ZoneError::DuplicateId(id));
                    continue;
                }
                Some(id) => id,
                None => match self.allocate_id() {
                    Ok(id) => id,
                    Err(err) => {
                        log::warn!("skipping zone '{}': {}", payload.name, err);
                        continue;
                    }
                },
            };
            self.reserve_id(id);

            match self.check(&spec.name, &spec.shape) {
                Ok(()) => accepted += 1,
                Err(err) => {
                    log::warn!(
                        "zone {} '{}' is malformed and will be ignored for containment: {}",
                        id,
                        spec.name,
                        err
                    );
                    self.malformed.insert(id);
                }
            }
            self.zones.insert(id, spec.into_zone(id));
        }
        accepted
    }

    pub fn to_payloads(&self) -> Vec<ZonePayload> {
        self.zones.values().map(ZonePayload::from_zone).collect()
    }

    pub fn get(&self, id: ZoneId) -> Option<&Zone> {
        self.zones.get(&id)
    }

    pub fn is_malformed(&self, id: ZoneId) -> bool {
        self.malformed.contains(&id)
    }

    /// All zones in id order, malformed ones included.
    pub fn iter(&self) -> impl Iterator<Item = &Zone> {
        self.zones.values()
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Well-formed zones containing `point`, in id order.
    pub fn zones_containing(&self, point: NaturalPoint) -> impl Iterator<Item = &Zone> {
        self.zones
            .values()
            .filter(move |zone| !self.malformed.contains(&zone.id) && zone.contains(point))
    }

    /// Lowest-id well-formed zone containing `point`.
    pub fn zone_at(&self, point: NaturalPoint) -> Option<&Zone> {
        self.zones_containing(point).next()
    }

    /// The zone a hand at `point` is working in. Where zones overlap, a
    /// scooper-required zone wins over a plain one; ties go to the lowest id.
    pub fn monitored_zone_at(&self, point: NaturalPoint) -> Option<&Zone> {
        let mut fallback = None;
        for zone in self.zones_containing(point) {
            if zone.requires_scooper {
                return Some(zone);
            }
            if fallback.is_none() {
                fallback = Some(zone);
            }
        }
        fallback
    }
}

impl Default for ZoneRegistry {
    fn default() -> Self {
        Self::new()
    }
}

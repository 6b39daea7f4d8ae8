//! Spot registry - the in-memory table of all parking spots
//!
//! Spots are created once at init in stable id order and only mutated through
//! `allocate_first_free` / `release`. The registry enforces the two hard
//! invariants: a spot is never double-assigned, and no plate occupies more
//! than one spot.

use crate::domain::types::{Spot, SpotId, SpotStatus, Vehicle};
use tracing::{debug, error, info};

/// Why an allocation did not happen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// Every spot is occupied
    LotFull,
    /// The plate already occupies a spot (duplicate-entry guard)
    DuplicatePlate,
}

pub struct SpotRegistry {
    /// All spots, sorted by id at construction and never reordered
    spots: Vec<Spot>,
}

impl SpotRegistry {
    /// Build the fixed grid: floor 1 is "A-01".."A-nn", floor 2 "B-01".. etc.
    pub fn with_grid(floors: u8, spots_per_floor: u16, now_ms: u64) -> Self {
        let mut spots = Vec::with_capacity(floors as usize * spots_per_floor as usize);
        for floor in 1..=floors {
            for index in 1..=spots_per_floor {
                spots.push(Spot::new(SpotId::grid(floor, index), floor, now_ms));
            }
        }
        info!(floors = %floors, spots = %spots.len(), "spot_grid_initialized");
        Self { spots }
    }

    /// Restore a previously persisted grid (spots snapshot from the store)
    pub fn from_spots(mut spots: Vec<Spot>) -> Self {
        spots.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Self { spots }
    }

    pub fn spots(&self) -> &[Spot] {
        &self.spots
    }

    pub fn occupied_count(&self) -> usize {
        self.spots.iter().filter(|s| s.status == SpotStatus::Occupied).count()
    }

    pub fn free_count(&self) -> usize {
        self.spots.len() - self.occupied_count()
    }

    /// Mark the first free spot (in id order) occupied by `vehicle`.
    ///
    /// Rejects the allocation if the plate is already parked somewhere -
    /// that is the duplicate-entry guard, not a registry fault.
    pub fn allocate_first_free(
        &mut self,
        vehicle: Vehicle,
        now_ms: u64,
    ) -> Result<SpotId, AllocError> {
        if self.find_occupied_by_plate(&vehicle.plate_code).is_some() {
            debug!(plate = %vehicle.plate_code, "allocate_rejected_duplicate_plate");
            return Err(AllocError::DuplicatePlate);
        }

        let Some(spot) = self.spots.iter_mut().find(|s| s.status == SpotStatus::Free) else {
            return Err(AllocError::LotFull);
        };

        // A free spot holding an occupant means the mutual-exclusion
        // contract was broken upstream.
        debug_assert!(spot.occupant.is_none(), "free spot {} had an occupant", spot.id);

        spot.status = SpotStatus::Occupied;
        spot.occupant = Some(vehicle);
        spot.last_changed_ms = now_ms;
        Ok(spot.id.clone())
    }

    pub fn find_occupied_by_plate(&self, plate_code: &str) -> Option<&Spot> {
        self.spots.iter().find(|s| {
            s.status == SpotStatus::Occupied
                && s.occupant.as_ref().is_some_and(|v| v.plate_code == plate_code)
        })
    }

    pub fn get(&self, spot_id: &SpotId) -> Option<&Spot> {
        self.spots.iter().find(|s| &s.id == spot_id)
    }

    /// Clear the occupant and return it. No-op (None) for unknown or free spots.
    pub fn release(&mut self, spot_id: &SpotId, now_ms: u64) -> Option<Vehicle> {
        let spot = self.spots.iter_mut().find(|s| &s.id == spot_id)?;

        if spot.status != SpotStatus::Occupied {
            error!(spot_id = %spot_id, "release_on_free_spot");
            debug_assert!(false, "release on free spot {}", spot_id);
            return None;
        }

        let vehicle = spot.occupant.take();
        debug_assert!(vehicle.is_some(), "occupied spot {} had no occupant", spot_id);
        spot.status = SpotStatus::Free;
        spot.last_changed_ms = now_ms;
        vehicle
    }

    /// Occupied spots whose vehicle has stayed at least `min_stay_minutes`.
    ///
    /// The dwell filter keeps the random-exit driver from flip-flopping a
    /// vehicle that entered in the same tick.
    pub fn eligible_for_exit(&self, min_stay_minutes: u64, now_ms: u64) -> Vec<&Spot> {
        let min_stay_ms = min_stay_minutes * 60 * 1000;
        self.spots
            .iter()
            .filter(|s| {
                s.status == SpotStatus::Occupied
                    && s.occupant
                        .as_ref()
                        .is_some_and(|v| now_ms.saturating_sub(v.entry_ms) >= min_stay_ms)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vehicle(plate: &str, entry_ms: u64) -> Vehicle {
        Vehicle { plate_code: plate.to_string(), region: "بغداد".to_string(), entry_ms }
    }

    #[test]
    fn test_grid_is_in_id_order() {
        let registry = SpotRegistry::with_grid(2, 3, 0);
        let ids: Vec<String> = registry.spots().iter().map(|s| s.id.0.clone()).collect();
        assert_eq!(ids, vec!["A-01", "A-02", "A-03", "B-01", "B-02", "B-03"]);
    }

    #[test]
    fn test_allocate_takes_first_free() {
        let mut registry = SpotRegistry::with_grid(1, 3, 0);

        let first = registry.allocate_first_free(vehicle("11-11111", 100), 100).unwrap();
        assert_eq!(first, SpotId::grid(1, 1));

        let second = registry.allocate_first_free(vehicle("21-22222", 200), 200).unwrap();
        assert_eq!(second, SpotId::grid(1, 2));

        assert_eq!(registry.occupied_count(), 2);
    }

    #[test]
    fn test_allocate_rejects_duplicate_plate() {
        let mut registry = SpotRegistry::with_grid(1, 3, 0);
        registry.allocate_first_free(vehicle("11-11111", 100), 100).unwrap();

        let result = registry.allocate_first_free(vehicle("11-11111", 200), 200);
        assert_eq!(result, Err(AllocError::DuplicatePlate));
        assert_eq!(registry.occupied_count(), 1);
    }

    #[test]
    fn test_allocate_reports_lot_full() {
        let mut registry = SpotRegistry::with_grid(1, 2, 0);
        registry.allocate_first_free(vehicle("11-11111", 0), 0).unwrap();
        registry.allocate_first_free(vehicle("21-22222", 0), 0).unwrap();

        let result = registry.allocate_first_free(vehicle("31-33333", 0), 0);
        assert_eq!(result, Err(AllocError::LotFull));
    }

    #[test]
    fn test_release_frees_and_returns_vehicle() {
        let mut registry = SpotRegistry::with_grid(1, 2, 0);
        let spot_id = registry.allocate_first_free(vehicle("11-11111", 100), 100).unwrap();

        let released = registry.release(&spot_id, 500).unwrap();
        assert_eq!(released.plate_code, "11-11111");

        let spot = registry.get(&spot_id).unwrap();
        assert!(spot.is_free());
        assert!(spot.occupant.is_none());
        assert_eq!(spot.last_changed_ms, 500);

        // Spot is reusable after release
        let again = registry.allocate_first_free(vehicle("21-22222", 600), 600).unwrap();
        assert_eq!(again, spot_id);
    }

    #[test]
    fn test_release_unknown_spot_is_none() {
        let mut registry = SpotRegistry::with_grid(1, 1, 0);
        assert!(registry.release(&SpotId("Z-99".to_string()), 0).is_none());
    }

    #[test]
    fn test_find_occupied_by_plate() {
        let mut registry = SpotRegistry::with_grid(1, 3, 0);
        registry.allocate_first_free(vehicle("41-77777", 100), 100).unwrap();

        assert!(registry.find_occupied_by_plate("41-77777").is_some());
        assert!(registry.find_occupied_by_plate("99-00000").is_none());
    }

    #[test]
    fn test_eligible_for_exit_respects_min_stay() {
        let mut registry = SpotRegistry::with_grid(1, 3, 0);
        registry.allocate_first_free(vehicle("11-11111", 0), 0).unwrap();
        registry.allocate_first_free(vehicle("21-22222", 150_000), 150_000).unwrap();

        // At t=180s only the first vehicle has been in 3 minutes
        let eligible = registry.eligible_for_exit(3, 180_000);
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].occupant.as_ref().unwrap().plate_code, "11-11111");

        // Well past the dwell window both qualify
        let eligible = registry.eligible_for_exit(3, 400_000);
        assert_eq!(eligible.len(), 2);
    }

    #[test]
    fn test_from_spots_restores_sorted() {
        let spots = vec![
            Spot::new(SpotId::grid(2, 1), 2, 0),
            Spot::new(SpotId::grid(1, 1), 1, 0),
        ];
        let registry = SpotRegistry::from_spots(spots);
        assert_eq!(registry.spots()[0].id, SpotId::grid(1, 1));
    }
}

use crate::{
    backend::{KeyValueStore, StorageError},
    slot_grid::{self, is_weekend, Weekend},
    types::{Availability, Block, Booking, Slot, SlotStatus},
};
use chrono::{Local, NaiveDate, NaiveTime, SecondsFormat};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{error, info};

pub const BOOKINGS_KEY: &str = "mm_bookings";
pub const BLOCKS_KEY: &str = "mm_blocks";

const CSV_HEADER: [&str; 12] = [
    "Service",
    "Name",
    "Phone",
    "Email",
    "Contact Method",
    "Date",
    "Time",
    "Hours",
    "Address",
    "Referral",
    "Special Requests",
    "Created",
];

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("{0} is not a Saturday or Sunday. Bookings are taken on weekends only")]
    NotWeekend(NaiveDate),
    #[error("{0} is not one of the offered service times")]
    OffGrid(Slot),
    #[error("Slot {0} is already blocked")]
    AlreadyBlocked(Slot),
    #[error("Slot {0} is not blocked")]
    NotBlocked(Slot),
    #[error("Slot {slot} is {availability}")]
    SlotUnavailable {
        slot: Slot,
        availability: Availability,
    },
    #[error("No booking at index {0}")]
    BookingNotFound(usize),
    #[error("No bookings to export")]
    NothingToExport,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Bookings and blocks of the weekend grid, persisted through a [`KeyValueStore`].
///
/// Every query re-reads the stored collections. Mutations hold the write lock
/// across read, check and write, so a multi-hour booking validates and
/// reserves its whole span without another writer of this ledger interleaving.
pub struct SlotLedger<S> {
    store: Arc<S>,
    write_lock: Arc<Mutex<()>>,
}

impl<S> Clone for SlotLedger<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            write_lock: self.write_lock.clone(),
        }
    }
}

impl<S: KeyValueStore> SlotLedger<S> {
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(store),
            write_lock: Arc::default(),
        }
    }

    pub fn bookings(&self) -> Result<Vec<Booking>, LedgerError> {
        Ok(self.load(BOOKINGS_KEY)?)
    }

    pub fn blocks(&self) -> Result<Vec<Block>, LedgerError> {
        Ok(self.load(BLOCKS_KEY)?)
    }

    pub fn upcoming_weekends(&self, count: usize, skip: usize) -> impl Iterator<Item = Weekend> {
        slot_grid::upcoming_weekends(Local::now().date_naive(), count, skip)
    }

    pub fn availability(
        &self,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<Availability, LedgerError> {
        let bookings: Vec<Booking> = self.load(BOOKINGS_KEY)?;
        let blocks: Vec<Block> = self.load(BLOCKS_KEY)?;
        Ok(classify(Slot::new(date, time), &bookings, &blocks))
    }

    /// Availability for raw form keys. Keys that do not parse match nothing and
    /// therefore report [`Availability::Available`].
    pub fn availability_of(&self, date: &str, time: &str) -> Result<Availability, LedgerError> {
        match (slot_grid::parse_date(date), slot_grid::parse_time(time)) {
            (Some(date), Some(time)) => self.availability(date, time),
            _ => Ok(Availability::Available),
        }
    }

    pub fn day_schedule(&self, date: NaiveDate) -> Result<Vec<SlotStatus>, LedgerError> {
        let bookings: Vec<Booking> = self.load(BOOKINGS_KEY)?;
        let blocks: Vec<Block> = self.load(BLOCKS_KEY)?;
        Ok(slot_grid::service_times()
            .map(|time| SlotStatus {
                time,
                availability: classify(Slot::new(date, time), &bookings, &blocks),
            })
            .collect())
    }

    /// Stores `booking` and blocks its continuation hours.
    ///
    /// Fails without writing anything if any hour of the span is booked or
    /// blocked. A failed write leaves both collections as they were.
    pub fn record_booking(&self, booking: Booking) -> Result<(), LedgerError> {
        if !is_weekend(booking.date) {
            return Err(LedgerError::NotWeekend(booking.date));
        }

        let _guard = self.lock();
        let mut bookings: Vec<Booking> = self.load(BOOKINGS_KEY)?;
        let mut blocks: Vec<Block> = self.load(BLOCKS_KEY)?;

        for slot in booking.occupied_slots() {
            let availability = classify(slot, &bookings, &blocks);
            if availability != Availability::Available {
                return Err(LedgerError::SlotUnavailable { slot, availability });
            }
        }

        blocks.extend(
            booking
                .occupied_slots()
                .skip(1)
                .map(|slot| Block::derived(slot, booking.id)),
        );
        info!(
            slot = %booking.slot(),
            hours = booking.hours,
            service = %booking.service,
            "Recording booking"
        );
        bookings.push(booking);

        self.save_both((BLOCKS_KEY, blocks.as_slice()), (BOOKINGS_KEY, bookings.as_slice()))?;
        Ok(())
    }

    pub fn record_block(&self, date: NaiveDate, time: NaiveTime) -> Result<Block, LedgerError> {
        if !is_weekend(date) {
            return Err(LedgerError::NotWeekend(date));
        }
        let slot = Slot::new(date, time);
        if !slot_grid::is_service_time(time) {
            return Err(LedgerError::OffGrid(slot));
        }

        let _guard = self.lock();
        let mut blocks: Vec<Block> = self.load(BLOCKS_KEY)?;
        if blocks.iter().any(|block| block.slot() == slot) {
            return Err(LedgerError::AlreadyBlocked(slot));
        }

        let block = Block::manual(slot);
        blocks.push(block.clone());
        self.save(BLOCKS_KEY, &blocks)?;
        info!(%slot, "Blocked slot");
        Ok(block)
    }

    pub fn remove_block(&self, date: NaiveDate, time: NaiveTime) -> Result<(), LedgerError> {
        if !is_weekend(date) {
            return Err(LedgerError::NotWeekend(date));
        }
        let slot = Slot::new(date, time);

        let _guard = self.lock();
        let mut blocks: Vec<Block> = self.load(BLOCKS_KEY)?;
        let before = blocks.len();
        blocks.retain(|block| block.slot() != slot);
        if blocks.len() == before {
            return Err(LedgerError::NotBlocked(slot));
        }

        self.save(BLOCKS_KEY, &blocks)?;
        info!(%slot, "Unblocked slot");
        Ok(())
    }

    /// Removes the booking at `index` (insertion order) together with the
    /// blocks derived from it.
    pub fn delete_booking(&self, index: usize) -> Result<Booking, LedgerError> {
        let _guard = self.lock();
        let mut bookings: Vec<Booking> = self.load(BOOKINGS_KEY)?;
        if index >= bookings.len() {
            return Err(LedgerError::BookingNotFound(index));
        }
        let booking = bookings.remove(index);

        let mut blocks: Vec<Block> = self.load(BLOCKS_KEY)?;
        blocks.retain(|block| block.booking_id != Some(booking.id));

        self.save_both((BOOKINGS_KEY, bookings.as_slice()), (BLOCKS_KEY, blocks.as_slice()))?;
        info!(slot = %booking.slot(), name = %booking.name, "Deleted booking");
        Ok(booking)
    }

    /// Drops every booking and its derived blocks. Manual blocks stay.
    pub fn clear_bookings(&self) -> Result<usize, LedgerError> {
        let _guard = self.lock();
        let bookings: Vec<Booking> = self.load(BOOKINGS_KEY)?;
        let mut blocks: Vec<Block> = self.load(BLOCKS_KEY)?;
        blocks.retain(|block| block.booking_id.is_none());

        self.save_both((BOOKINGS_KEY, &[] as &[Booking]), (BLOCKS_KEY, blocks.as_slice()))?;
        info!(removed = bookings.len(), "Cleared bookings");
        Ok(bookings.len())
    }

    pub fn export_csv(&self) -> Result<String, LedgerError> {
        let bookings: Vec<Booking> = self.load(BOOKINGS_KEY)?;
        if bookings.is_empty() {
            return Err(LedgerError::NothingToExport);
        }

        let header = csv_row(CSV_HEADER.iter().map(|column| column.to_string()));
        let rows = bookings.iter().map(|booking| {
            csv_row([
                booking.service.clone(),
                booking.name.clone(),
                booking.phone.clone(),
                booking.email.clone(),
                booking.contact_method.to_string(),
                booking.date.format("%Y-%m-%d").to_string(),
                booking.time.format("%H:%M").to_string(),
                booking.hours.to_string(),
                booking.address.clone(),
                booking.referral.clone().unwrap_or_default(),
                booking.special_requests.clone(),
                booking.created.to_rfc3339_opts(SecondsFormat::Secs, true),
            ])
        });

        Ok(std::iter::once(header)
            .chain(rows)
            .collect::<Vec<_>>()
            .join("\n"))
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, StorageError> {
        match self.store.get(key)? {
            Some(raw) => serde_json::from_str(&raw).map_err(|err| {
                error!(?err, key, "Failed to decode stored records");
                StorageError::from(err)
            }),
            None => Ok(vec![]),
        }
    }

    fn save<T: Serialize>(&self, key: &str, records: &[T]) -> Result<(), StorageError> {
        let raw = serde_json::to_string(records)?;
        self.store.set(key, raw).inspect_err(|err| {
            error!(?err, key, "Failed to persist records");
        })
    }

    /// Writes two collections as a pair. When the second write fails the first
    /// key is put back to its previous stored value.
    fn save_both<A: Serialize, B: Serialize>(
        &self,
        (first_key, first): (&str, &[A]),
        (second_key, second): (&str, &[B]),
    ) -> Result<(), StorageError> {
        let previous = self.store.get(first_key)?;
        self.save(first_key, first)?;
        if let Err(err) = self.save(second_key, second) {
            let restored = previous.unwrap_or_else(|| "[]".to_string());
            if let Err(rollback_err) = self.store.set(first_key, restored) {
                error!(?rollback_err, key = first_key, "Failed to restore records");
            }
            return Err(err);
        }
        Ok(())
    }
}

fn classify(slot: Slot, bookings: &[Booking], blocks: &[Block]) -> Availability {
    if bookings.iter().any(|booking| booking.slot() == slot) {
        Availability::Booked
    } else if blocks.iter().any(|block| block.slot() == slot) {
        Availability::Blocked
    } else {
        Availability::Available
    }
}

fn csv_row(fields: impl IntoIterator<Item = String>) -> String {
    fields
        .into_iter()
        .map(|field| format!("\"{}\"", field.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(",")
}

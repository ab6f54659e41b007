//! Read-only views of the temple and seva directories.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Temple {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deity: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimingBlock {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// A bookable ritual as published by the seva directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Seva {
    pub id: String,
    pub name: String,
    pub is_free: bool,
    /// Slots booked for the day; each booking is owed prasad.
    pub booking_slots: u32,
    #[serde(default)]
    pub timing_blocks: Vec<TimingBlock>,
    pub temple_id: String,
}

pub trait TempleDirectory {
    fn list_temples(&self) -> Vec<Temple>;
}

pub trait SevaDirectory {
    fn sevas_by_date(&self, date: NaiveDate) -> Vec<Seva>;
}

/// Fixed directory contents, useful for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    pub temples: Vec<Temple>,
    pub sevas: Vec<(NaiveDate, Seva)>,
}

impl StaticDirectory {
    pub fn with_temple(mut self, temple: Temple) -> Self {
        self.temples.push(temple);
        self
    }

    pub fn with_seva(mut self, date: NaiveDate, seva: Seva) -> Self {
        self.sevas.push((date, seva));
        self
    }
}

impl TempleDirectory for StaticDirectory {
    fn list_temples(&self) -> Vec<Temple> {
        self.temples.clone()
    }
}

impl SevaDirectory for StaticDirectory {
    fn sevas_by_date(&self, date: NaiveDate) -> Vec<Seva> {
        self.sevas
            .iter()
            .filter(|(day, _)| *day == date)
            .map(|(_, seva)| seva.clone())
            .collect()
    }
}

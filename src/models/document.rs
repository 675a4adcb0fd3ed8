// Root aggregate persisted to the data file

use super::{Container, Group, Schedule, parse_clock};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Logical version in epoch milliseconds.
    #[serde(default)]
    pub last_update: i64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataDocument {
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub containers: Vec<Container>,
    #[serde(default)]
    pub order: Vec<String>,
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub group_order: Vec<String>,
    #[serde(default)]
    pub schedules: Vec<Schedule>,
}

impl DataDocument {
    /// Structural equality ignoring `metadata`.
    pub fn content_eq(&self, other: &DataDocument) -> bool {
        self.containers == other.containers
            && self.order == other.order
            && self.groups == other.groups
            && self.group_order == other.group_order
            && self.schedules == other.schedules
    }

    pub fn container(&self, name: &str) -> Option<&Container> {
        self.containers.iter().find(|c| c.name == name)
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Containers in `order`; entries missing from `order` follow in collection order.
    pub fn ordered_containers(&self) -> Vec<&Container> {
        ordered_by(&self.containers, &self.order, |c| &c.name)
    }

    pub fn ordered_groups(&self) -> Vec<&Group> {
        ordered_by(&self.groups, &self.group_order, |g| &g.name)
    }

    /// Rewrites `order`/`groupOrder` so each live name appears exactly once,
    /// keeping first-seen order and appending names the lists were missing.
    pub fn normalize_order(&mut self) {
        let names: Vec<&str> = self.containers.iter().map(|c| c.name.as_str()).collect();
        self.order = normalized(&self.order, &names);
        let names: Vec<&str> = self.groups.iter().map(|g| g.name.as_str()).collect();
        self.group_order = normalized(&self.group_order, &names);
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for c in &self.containers {
            validate_container(c)?;
            if !seen.insert(c.name.as_str()) {
                return Err(Error::Validation(format!(
                    "duplicate container name {:?}",
                    c.name
                )));
            }
        }
        let mut seen = HashSet::new();
        for g in &self.groups {
            validate_group(g)?;
            if !seen.insert(g.name.as_str()) {
                return Err(Error::Validation(format!(
                    "duplicate group name {:?}",
                    g.name
                )));
            }
        }
        let mut seen = HashSet::new();
        for s in &self.schedules {
            validate_schedule(s)?;
            if !seen.insert(s.id.as_str()) {
                return Err(Error::Validation(format!("duplicate schedule id {:?}", s.id)));
            }
        }
        Ok(())
    }
}

pub fn validate_container(c: &Container) -> Result<()> {
    if c.name.trim().is_empty() {
        return Err(Error::Validation("container name must be non-empty".into()));
    }
    Ok(())
}

pub fn validate_group(g: &Group) -> Result<()> {
    if g.name.trim().is_empty() {
        return Err(Error::Validation("group name must be non-empty".into()));
    }
    Ok(())
}

pub fn validate_schedule(s: &Schedule) -> Result<()> {
    if s.id.trim().is_empty() {
        return Err(Error::Validation("schedule id must be non-empty".into()));
    }
    if s.target.trim().is_empty() {
        return Err(Error::Validation(format!(
            "schedule {:?}: target must be non-empty",
            s.id
        )));
    }
    for (i, t) in s.timers.iter().enumerate() {
        for (field, value) in [("startTime", &t.start_time), ("stopTime", &t.stop_time)] {
            if parse_clock(value).is_none() {
                return Err(Error::Validation(format!(
                    "schedule {:?} timer {}: {} must be HH:MM, got {:?}",
                    s.id, i, field, value
                )));
            }
        }
        if let Some(day) = t.days.iter().find(|d| !(0..=6).contains(*d)) {
            return Err(Error::Validation(format!(
                "schedule {:?} timer {}: day {} out of range 0..=6",
                s.id, i, day
            )));
        }
    }
    Ok(())
}

fn ordered_by<'a, T>(
    items: &'a [T],
    order: &[String],
    key: impl Fn(&T) -> &String,
) -> Vec<&'a T> {
    let mut out: Vec<&T> = Vec::with_capacity(items.len());
    for name in order {
        if let Some(item) = items.iter().find(|i| key(i) == name)
            && !out.iter().any(|o| key(o) == name)
        {
            out.push(item);
        }
    }
    for item in items {
        if !out.iter().any(|o| key(o) == key(item)) {
            out.push(item);
        }
    }
    out
}

fn normalized(order: &[String], live: &[&str]) -> Vec<String> {
    let live_set: HashSet<&str> = live.iter().copied().collect();
    let mut seen = HashSet::with_capacity(live.len());
    let mut out = Vec::with_capacity(live.len());
    for name in order {
        if live_set.contains(name.as_str()) && seen.insert(name.as_str()) {
            out.push(name.clone());
        }
    }
    for name in live {
        if seen.insert(name) {
            out.push((*name).to_string());
        }
    }
    out
}

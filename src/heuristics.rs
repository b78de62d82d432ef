//! Weight maps that bias which slots a swap mutation picks.
//!
//! A swap draws its first index from the push map and its second from the
//! pull map. Each [`Heuristic`] contributes a pair of maps; requested
//! heuristics are summed element-wise.

use crate::grid::{MIDDLE_TIMESLOTS, SLOT_COUNT, translate_index};
use crate::model::Model;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Heuristic {
    /// Push high-penalty slots, pull low-penalty slots.
    Balance,
    /// Push high-penalty slots, pull the central timeslots of each day.
    Middle,
    /// Push the day with the most conflicts, pull the day with the most gaps.
    Days,
}

impl Heuristic {
    pub const ALL: [Heuristic; 3] = [Heuristic::Balance, Heuristic::Middle, Heuristic::Days];

    #[inline]
    const fn bit(self) -> u8 {
        match self {
            Heuristic::Balance => 1,
            Heuristic::Middle => 2,
            Heuristic::Days => 4,
        }
    }

    fn generator(self) -> fn(&Model, f64) -> WeightMaps {
        match self {
            Heuristic::Balance => balance,
            Heuristic::Middle => middle,
            Heuristic::Days => days,
        }
    }
}

/// A set of heuristics, serialized as a list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<Heuristic>", into = "Vec<Heuristic>")]
pub struct HeuristicSet(u8);

impl HeuristicSet {
    #[inline]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[inline]
    pub const fn with(self, heuristic: Heuristic) -> Self {
        Self(self.0 | heuristic.bit())
    }

    #[inline]
    pub fn insert(&mut self, heuristic: Heuristic) {
        self.0 |= heuristic.bit();
    }

    #[inline]
    pub const fn contains(&self, heuristic: Heuristic) -> bool {
        self.0 & heuristic.bit() != 0
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Heuristic> + '_ {
        Heuristic::ALL.into_iter().filter(|h| self.contains(*h))
    }
}

impl FromIterator<Heuristic> for HeuristicSet {
    fn from_iter<I: IntoIterator<Item = Heuristic>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), Self::with)
    }
}

impl From<Vec<Heuristic>> for HeuristicSet {
    fn from(heuristics: Vec<Heuristic>) -> Self {
        heuristics.into_iter().collect()
    }
}

impl From<HeuristicSet> for Vec<Heuristic> {
    fn from(set: HeuristicSet) -> Self {
        set.iter().collect()
    }
}

/// Sampling weights for the two indices of a swap.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightMaps {
    pub push: Vec<f64>,
    pub pull: Vec<f64>,
}

impl WeightMaps {
    pub fn uniform() -> Self {
        Self {
            push: vec![1.0; SLOT_COUNT],
            pull: vec![1.0; SLOT_COUNT],
        }
    }

    fn zeroed() -> Self {
        Self {
            push: vec![0.0; SLOT_COUNT],
            pull: vec![0.0; SLOT_COUNT],
        }
    }

    fn add(&mut self, other: &WeightMaps) {
        for (a, b) in self.push.iter_mut().zip(&other.push) {
            *a += b;
        }
        for (a, b) in self.pull.iter_mut().zip(&other.pull) {
            *a += b;
        }
    }
}

/// Builds the combined maps for `heuristics` from the model's penalty caches.
///
/// Returns `None` for an empty set, meaning uniform sampling.
pub fn weight_maps(model: &Model, heuristics: HeuristicSet, modifier: f64) -> Option<WeightMaps> {
    if heuristics.is_empty() {
        return None;
    }
    let mut maps = WeightMaps::zeroed();
    for heuristic in heuristics.iter() {
        maps.add(&heuristic.generator()(model, modifier));
    }
    Some(maps)
}

/// Index penalties min-max scaled into `[0, 1]`.
///
/// Returns `None` when every index carries the same penalty.
pub fn normalized_penalties(model: &Model) -> Option<Vec<f64>> {
    let penalties = model.penalty_per_index();
    let lowest = *penalties.iter().min()?;
    let highest = *penalties.iter().max()?;
    if highest == lowest {
        return None;
    }
    let range = (highest - lowest) as f64;
    Some(
        penalties
            .iter()
            .map(|&p| (p - lowest) as f64 / range)
            .collect(),
    )
}

fn balance(model: &Model, _modifier: f64) -> WeightMaps {
    match normalized_penalties(model) {
        Some(normalized) => WeightMaps {
            pull: normalized.iter().map(|p| 1.0 - p).collect(),
            push: normalized,
        },
        None => WeightMaps::uniform(),
    }
}

fn middle(model: &Model, modifier: f64) -> WeightMaps {
    let push = normalized_penalties(model).unwrap_or_else(|| vec![1.0; SLOT_COUNT]);
    let pull = (0..SLOT_COUNT)
        .map(|i| {
            if MIDDLE_TIMESLOTS.contains(&translate_index(i).timeslot) {
                modifier
            } else {
                1.0
            }
        })
        .collect();
    WeightMaps { push, pull }
}

fn days(model: &Model, modifier: f64) -> WeightMaps {
    let worst = model.worst_days();
    let boost = |day: usize| -> Vec<f64> {
        (0..SLOT_COUNT)
            .map(|i| {
                if translate_index(i).day == day {
                    modifier
                } else {
                    1.0
                }
            })
            .collect()
    };
    WeightMaps {
        push: boost(worst.conflict_day),
        pull: boost(worst.gap_day),
    }
}

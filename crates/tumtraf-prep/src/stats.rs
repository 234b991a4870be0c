// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Class statistics over an [`AnnotationIndex`].

use serde::{Deserialize, Serialize};
use std::{
    collections::{HashMap, HashSet},
    fmt,
};

use crate::index::AnnotationIndex;

/// Class distribution of an index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassStats {
    /// Number of index entries scanned.
    pub total_samples: usize,
    /// Entries without a single in-vocabulary object.
    pub empty_samples: usize,
    /// Object count per class, highest first, ties by name.
    pub class_counts: Vec<(String, usize)>,
}

impl ClassStats {
    /// Share of empty entries in percent, zero for an empty index.
    pub fn empty_percentage(&self) -> f64 {
        if self.total_samples == 0 {
            0.0
        } else {
            self.empty_samples as f64 * 100.0 / self.total_samples as f64
        }
    }

    /// Count for `class`, zero when never seen.
    pub fn count(&self, class: &str) -> usize {
        self.class_counts
            .iter()
            .find(|(name, _)| name == class)
            .map_or(0, |(_, n)| *n)
    }
}

impl fmt::Display for ClassStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total samples: {}", self.total_samples)?;
        writeln!(
            f,
            "Empty samples: {} ({:.2}%)",
            self.empty_samples,
            self.empty_percentage()
        )?;
        writeln!(f, "Class counts:")?;
        for (class, count) in &self.class_counts {
            writeln!(f, "  {}: {}", class, count)?;
        }
        Ok(())
    }
}

/// Count in-vocabulary objects per class across every entry of `index`.
///
/// An object counts when its declared type belongs to the index vocabulary;
/// any other object is ignored. An entry with no counted object is empty.
pub fn scan(index: &AnnotationIndex) -> ClassStats {
    let vocabulary: HashSet<&str> = index.classes().iter().map(String::as_str).collect();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut stats = ClassStats::default();

    for sample in index.samples() {
        stats.total_samples += 1;
        let mut empty = true;

        for object in sample.iter().flat_map(|frame| frame.annotation.objects()) {
            if let Some(class) = object.object_type()
                && let Some(class) = vocabulary.get(class)
            {
                *counts.entry(*class).or_default() += 1;
                empty = false;
            }
        }

        if empty {
            stats.empty_samples += 1;
        }
    }

    let mut class_counts: Vec<_> = counts
        .into_iter()
        .map(|(class, n)| (class.to_string(), n))
        .collect();
    class_counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    stats.class_counts = class_counts;

    stats
}

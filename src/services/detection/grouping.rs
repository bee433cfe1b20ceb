// Grouper
// Merges detections into one species group per normalized common name.
// Created per run and consumed into the catalog; nothing outlives the run.

use crate::models::{Detection, DetectionMethod, SpeciesGroup};
use crate::services::text_processor::normalize_key;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct Grouper {
    groups: Vec<SpeciesGroup>,
    /// normalized common name -> position in `groups`
    index: HashMap<String, usize>,
}

impl Grouper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Add one detection, creating its group on first sight. Returns the group id.
    pub fn add(&mut self, common_name: &str, scientific_name: Option<&str>, detection: Detection) -> u32 {
        let key = normalize_key(common_name);

        if let Some(&pos) = self.index.get(&key) {
            let group = &mut self.groups[pos];
            if group.scientific_name.is_none() {
                group.scientific_name = scientific_name.filter(|s| !s.trim().is_empty()).map(str::to_string);
            }
            insert_occurrence(group, detection);
            return group.id;
        }

        let id = self.groups.len() as u32 + 1;
        let group = SpeciesGroup {
            id,
            common_name: common_name.trim().to_string(),
            scientific_name: scientific_name.filter(|s| !s.trim().is_empty()).map(str::to_string),
            phylum: detection.phylum.clone(),
            class: detection.class.clone(),
            detection_method: detection.detection_method,
            confidence: detection.confidence,
            total_mentions: 1,
            first_timestamp: detection.timestamp,
            last_timestamp: detection.timestamp,
            main_thumbnail: detection.thumbnail_url.clone(),
            all_occurrences: vec![detection],
        };
        self.index.insert(key, self.groups.len());
        self.groups.push(group);
        id
    }

    /// Groups in id order
    pub fn into_groups(self) -> Vec<SpeciesGroup> {
        self.groups
    }
}

fn insert_occurrence(group: &mut SpeciesGroup, detection: Detection) {
    let key = (detection.timestamp, detection.cue_index);
    let pos = group
        .all_occurrences
        .partition_point(|o| (o.timestamp, o.cue_index) <= key);
    group.all_occurrences.insert(pos, detection);
    refresh_aggregates(group);
}

fn refresh_aggregates(group: &mut SpeciesGroup) {
    let occurrences = &group.all_occurrences;
    let (Some(first), Some(last)) = (occurrences.first(), occurrences.last()) else {
        return;
    };

    group.first_timestamp = first.timestamp;
    group.last_timestamp = last.timestamp;
    group.main_thumbnail = first.thumbnail_url.clone();
    group.total_mentions = occurrences.len();
    group.confidence = occurrences.iter().map(|o| o.confidence).sum::<f64>() / occurrences.len() as f64;
    group.detection_method = dominant_method(occurrences);
}

/// Most frequent method; ties go to the higher-precedence one
fn dominant_method(occurrences: &[Detection]) -> DetectionMethod {
    let mut best = DetectionMethod::ALL[0];
    let mut best_count = 0usize;
    for method in DetectionMethod::ALL {
        let count = occurrences.iter().filter(|o| o.detection_method == method).count();
        if count > best_count {
            best = method;
            best_count = count;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Timestamp;

    fn detection(ms: u64, cue_index: usize, confidence: f64, method: DetectionMethod) -> Detection {
        Detection {
            timestamp: Timestamp::from_millis(ms),
            context: format!("cue {}", cue_index),
            thumbnail_url: Some(format!("/thumb/{}", ms)),
            confidence,
            detection_method: method,
            additional_info: None,
            phylum: "Mollusca".to_string(),
            class: "Cephalopoda".to_string(),
            cue_index,
        }
    }

    #[test]
    fn test_first_detection_creates_group() {
        let mut grouper = Grouper::new();
        let id = grouper.add("pulpo", Some("Octopoda"), detection(70_500, 0, 0.9, DetectionMethod::KnownPattern));
        assert_eq!(id, 1);
        let groups = grouper.into_groups();
        let g = &groups[0];
        assert_eq!(g.total_mentions, 1);
        assert_eq!(g.first_timestamp, g.last_timestamp);
        assert_eq!(g.scientific_name.as_deref(), Some("Octopoda"));
        assert_eq!(g.main_thumbnail.as_deref(), Some("/thumb/70500"));
    }

    #[test]
    fn test_key_is_case_and_diacritic_insensitive() {
        let mut grouper = Grouper::new();
        let a = grouper.add("Camarón", None, detection(1_000, 0, 0.9, DetectionMethod::KnownPattern));
        let b = grouper.add("camaron", Some("Caridea"), detection(2_000, 1, 0.7, DetectionMethod::Context));
        let c = grouper.add("coral", None, detection(3_000, 2, 0.9, DetectionMethod::KnownPattern));
        assert_eq!(a, b);
        assert_eq!(c, 2);
        assert_eq!(grouper.len(), 2);
        let groups = grouper.into_groups();
        assert_eq!(groups[0].common_name, "Camarón");
        assert_eq!(groups[0].scientific_name.as_deref(), Some("Caridea"));
    }

    #[test]
    fn test_out_of_order_detections_are_sorted() {
        let mut grouper = Grouper::new();
        grouper.add("pulpo", None, detection(9_000, 5, 0.9, DetectionMethod::KnownPattern));
        grouper.add("pulpo", None, detection(1_000, 1, 0.5, DetectionMethod::KnownPattern));
        grouper.add("pulpo", None, detection(9_000, 3, 0.6, DetectionMethod::KnownPattern));
        let groups = grouper.into_groups();
        let g = &groups[0];
        let order: Vec<usize> = g.all_occurrences.iter().map(|o| o.cue_index).collect();
        assert_eq!(order, vec![1, 3, 5]);
        assert_eq!(g.first_timestamp, Timestamp::from_millis(1_000));
        assert_eq!(g.last_timestamp, Timestamp::from_millis(9_000));
        assert_eq!(g.main_thumbnail.as_deref(), Some("/thumb/1000"));
        assert_eq!(g.total_mentions, 3);
        assert!((g.confidence - (0.9 + 0.5 + 0.6) / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_dominant_method_ties_go_to_precedence() {
        let mut grouper = Grouper::new();
        grouper.add("pulpo", None, detection(1_000, 0, 0.6, DetectionMethod::Context));
        grouper.add("pulpo", None, detection(2_000, 1, 0.9, DetectionMethod::KnownPattern));
        assert_eq!(grouper.groups[0].detection_method, DetectionMethod::KnownPattern);
        grouper.add("pulpo", None, detection(3_000, 2, 0.6, DetectionMethod::Context));
        assert_eq!(grouper.groups[0].detection_method, DetectionMethod::Context);
    }
}

//! The filter and pagination pipeline (C3), consumed by every search
//! variant in this module.

use crate::atoms::constants::PAGINATION_DEFAULT_LIMIT;
use crate::atoms::types::Entity;
use crate::config::GraphConfig;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Default)]
pub struct EntityFilter {
    /// Any-of match, case-insensitive.
    pub tags: Option<Vec<String>>,
    pub min_importance: Option<f64>,
    pub max_importance: Option<f64>,
    pub entity_type: Option<String>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    pub modified_after: Option<DateTime<Utc>>,
    pub modified_before: Option<DateTime<Utc>>,
}

impl EntityFilter {
    pub fn is_active(&self) -> bool {
        self.tags.is_some()
            || self.min_importance.is_some()
            || self.max_importance.is_some()
            || self.entity_type.is_some()
            || self.created_after.is_some()
            || self.created_before.is_some()
            || self.modified_after.is_some()
            || self.modified_before.is_some()
    }

    pub fn matches(&self, entity: &Entity) -> bool {
        if !self.is_active() {
            return true;
        }

        if let Some(tags) = &self.tags {
            let lowered: Vec<String> = tags.iter().map(|t| t.to_lowercase()).collect();
            let entity_tags_lower: Vec<String> =
                entity.tags.iter().map(|t| t.to_lowercase()).collect();
            if !lowered.iter().any(|t| entity_tags_lower.contains(t)) {
                return false;
            }
        }

        if self.min_importance.is_some() || self.max_importance.is_some() {
            match entity.importance {
                Some(importance) => {
                    if let Some(min) = self.min_importance {
                        if importance < min {
                            return false;
                        }
                    }
                    if let Some(max) = self.max_importance {
                        if importance > max {
                            return false;
                        }
                    }
                }
                None => {
                    let zero_inclusive = self.min_importance.map(|m| m <= 0.0).unwrap_or(true)
                        && self.max_importance.map(|m| m >= 0.0).unwrap_or(true);
                    if !zero_inclusive {
                        return false;
                    }
                }
            }
        }

        if let Some(entity_type) = &self.entity_type {
            if !entity.entity_type.eq_ignore_ascii_case(entity_type) {
                return false;
            }
        }

        if let Some(after) = self.created_after {
            match entity.created_at {
                Some(created) if created >= after => {}
                _ => return false,
            }
        }
        if let Some(before) = self.created_before {
            match entity.created_at {
                Some(created) if created <= before => {}
                _ => return false,
            }
        }
        if let Some(after) = self.modified_after {
            match entity.last_modified {
                Some(modified) if modified >= after => {}
                _ => return false,
            }
        }
        if let Some(before) = self.modified_before {
            match entity.last_modified {
                Some(modified) if modified <= before => {}
                _ => return false,
            }
        }

        true
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    pub offset: usize,
    pub limit: usize,
}

impl Pagination {
    pub fn clamped(offset: usize, limit: Option<usize>, config: &GraphConfig) -> Self {
        let limit = limit
            .unwrap_or(config.pagination_default_limit)
            .clamp(config.pagination_min_limit, config.pagination_max_limit);
        Pagination { offset, limit }
    }

    pub fn default_for(config: &GraphConfig) -> Self {
        Pagination {
            offset: 0,
            limit: config.pagination_default_limit,
        }
    }

    pub fn has_more(&self, total: usize) -> bool {
        self.offset + self.limit < total
    }

    pub fn apply<T: Clone>(&self, items: &[T]) -> Vec<T> {
        items
            .iter()
            .skip(self.offset)
            .take(self.limit)
            .cloned()
            .collect()
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Pagination {
            offset: 0,
            limit: PAGINATION_DEFAULT_LIMIT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity_with_importance(value: Option<f64>) -> Entity {
        let mut e = Entity::new("A", "person");
        e.importance = value;
        e
    }

    #[test]
    fn importance_bounds_are_inclusive() {
        let filter = EntityFilter {
            min_importance: Some(0.0),
            max_importance: Some(10.0),
            ..Default::default()
        };
        assert!(filter.matches(&entity_with_importance(Some(0.0))));
        assert!(filter.matches(&entity_with_importance(Some(10.0))));
        assert!(!filter.matches(&entity_with_importance(Some(10.0001))));
    }

    #[test]
    fn limit_above_max_is_clamped_not_errored() {
        let config = GraphConfig::default();
        let page = Pagination::clamped(0, Some(999_999), &config);
        assert_eq!(page.limit, config.pagination_max_limit);
    }
}

use std::collections::BTreeMap;

use crate::models::Tenant;

use super::normalize::{normalize_name, NormalizerConfig};

/// Group tenants by normalized name.
///
/// Tenants whose normalized name is empty are excluded from merge
/// consideration and kept as-is. The BTreeMap keeps group order stable
/// across runs.
pub fn group_by_normalized(
    tenants: &[Tenant],
    config: &NormalizerConfig,
) -> BTreeMap<String, Vec<Tenant>> {
    let mut groups: BTreeMap<String, Vec<Tenant>> = BTreeMap::new();
    for tenant in tenants {
        let normalized = normalize_name(&tenant.name, config);
        if normalized.is_empty() {
            continue;
        }
        groups.entry(normalized).or_default().push(tenant.clone());
    }
    groups
}

/// Pick the keeper from a duplicate group: earliest `created_at`, ties
/// broken by lowest id so repeated runs always choose the same record.
pub fn select_keeper(mut group: Vec<Tenant>) -> Option<(Tenant, Vec<Tenant>)> {
    if group.is_empty() {
        return None;
    }
    group.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
    let keeper = group.remove(0);
    Some((keeper, group))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn tenant(id: &str, name: &str, created_offset_secs: i64) -> Tenant {
        Tenant {
            id: id.to_string(),
            name: name.to_string(),
            created_at: Utc::now() + Duration::seconds(created_offset_secs),
        }
    }

    #[test]
    fn test_groups_by_normalized_name() {
        let tenants = vec![
            tenant("1", "Acme Pos", 0),
            tenant("2", "acme", 10),
            tenant("3", "Acme's Company", 20),
            tenant("4", "Other Store", 30),
        ];
        let groups = group_by_normalized(&tenants, &NormalizerConfig::default());

        assert_eq!(groups.len(), 2);
        assert_eq!(groups["Acme"].len(), 3);
        assert_eq!(groups["Other Store"].len(), 1);
    }

    #[test]
    fn test_empty_normalized_name_excluded() {
        let tenants = vec![tenant("1", "   ", 0), tenant("2", "Pos", 10)];
        let groups = group_by_normalized(&tenants, &NormalizerConfig::default());
        assert!(groups.is_empty());
    }

    #[test]
    fn test_keeper_is_earliest_created() {
        let group = vec![
            tenant("b", "acme", 20),
            tenant("a", "Acme Pos", 0),
            tenant("c", "Acme's Company", 10),
        ];
        let (keeper, duplicates) = select_keeper(group).unwrap();
        assert_eq!(keeper.id, "a");
        assert_eq!(
            duplicates.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(),
            vec!["c", "b"]
        );
    }

    #[test]
    fn test_keeper_tie_break_is_lowest_id() {
        let created = Utc::now();
        let make = |id: &str| Tenant {
            id: id.to_string(),
            name: "Acme".to_string(),
            created_at: created,
        };
        let (keeper, _) = select_keeper(vec![make("z"), make("a"), make("m")]).unwrap();
        assert_eq!(keeper.id, "a");
    }

    #[test]
    fn test_keeper_choice_is_deterministic() {
        let group = vec![
            tenant("x", "acme", 5),
            tenant("y", "Acme", 5),
            tenant("w", "ACME", 1),
        ];
        let first = select_keeper(group.clone()).unwrap().0.id;
        for _ in 0..10 {
            let mut shuffled = group.clone();
            shuffled.reverse();
            assert_eq!(select_keeper(shuffled).unwrap().0.id, first);
        }
    }

    #[test]
    fn test_empty_group() {
        assert!(select_keeper(Vec::new()).is_none());
    }
}

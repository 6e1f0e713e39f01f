use super::{Activity, Verb};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActivityOrder {
    /// Oldest first; equal timestamps keep log (id) order.
    #[default]
    OldestFirst,
    /// Newest first; equal timestamps put the latest appended record first.
    NewestFirst,
}

/// Filter and ordering over the activity log.
#[derive(Debug, Clone, Default)]
pub struct ActivityQuery {
    table_name: Option<String>,
    entity_identifier: Option<Uuid>,
    verb: Option<Verb>,
    entity_key: Option<(String, i64)>,
    since: Option<DateTime<Utc>>,
    excluded_ids: HashSet<i64>,
    order: ActivityOrder,
    limit: Option<usize>,
}

impl ActivityQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    pub fn entity_identifier(mut self, entity_identifier: Uuid) -> Self {
        self.entity_identifier = Some(entity_identifier);
        self
    }

    pub fn verb(mut self, verb: Verb) -> Self {
        self.verb = Some(verb);
        self
    }

    /// Matches records whose `datum()` carries `primary_key == key`.
    pub fn entity_key(mut self, primary_key: impl Into<String>, key: i64) -> Self {
        self.entity_key = Some((primary_key.into(), key));
        self
    }

    /// Matches records with `dateCreated >= since`.
    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn excluding(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.excluded_ids.extend(ids);
        self
    }

    pub fn newest_first(mut self) -> Self {
        self.order = ActivityOrder::NewestFirst;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, activity: &Activity) -> bool {
        if let Some(table_name) = &self.table_name
            && &activity.table_name != table_name
        {
            return false;
        }
        if let Some(identifier) = self.entity_identifier
            && activity.entity_identifier != Some(identifier)
        {
            return false;
        }
        if let Some(verb) = self.verb
            && activity.verb != verb
        {
            return false;
        }
        if let Some((primary_key, key)) = &self.entity_key
            && activity.entity_key(primary_key) != Some(*key)
        {
            return false;
        }
        if let Some(since) = self.since
            && activity.date_created < since
        {
            return false;
        }
        if let Some(id) = activity.id
            && self.excluded_ids.contains(&id)
        {
            return false;
        }
        true
    }

    /// Applies the filter, ordering and limit to `activities`.
    pub fn apply<'a, I>(&self, activities: I) -> Vec<Activity>
    where
        I: IntoIterator<Item = &'a Activity>,
    {
        let mut selected: Vec<Activity> = activities
            .into_iter()
            .filter(|activity| self.matches(activity))
            .cloned()
            .collect();

        selected.sort_by(|a, b| {
            let by_date = a.date_created.cmp(&b.date_created).then_with(|| a.id.cmp(&b.id));
            match self.order {
                ActivityOrder::OldestFirst => by_date,
                ActivityOrder::NewestFirst => by_date.reverse(),
            }
        });

        if let Some(limit) = self.limit {
            selected.truncate(limit);
        }
        selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().unwrap()
    }

    fn logged(id: i64, secs: i64, key: i64) -> Activity {
        let mut activity = Activity::update(Uuid::nil(), "user", at(secs))
            .with_old_data(fields! { "id" => key });
        activity.id = Some(id);
        activity
    }

    #[test]
    fn test_filters_by_key_and_date() {
        let log = vec![logged(1, 10, 1), logged(2, 20, 1), logged(3, 30, 2), logged(4, 5, 1)];

        let found = ActivityQuery::new()
            .table_name("user")
            .entity_key("id", 1)
            .since(at(10))
            .apply(&log);
        let ids: Vec<i64> = found.iter().filter_map(|a| a.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_newest_first_with_limit_and_exclusions() {
        let log = vec![logged(1, 10, 1), logged(2, 20, 1), logged(3, 20, 1)];

        let found = ActivityQuery::new().newest_first().limit(1).apply(&log);
        assert_eq!(found[0].id, Some(3));

        let found = ActivityQuery::new().excluding([1, 3]).apply(&log);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, Some(2));
    }
}

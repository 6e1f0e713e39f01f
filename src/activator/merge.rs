use crate::activity::Activity;
use crate::core::FieldMap;
use crate::schema::{ModelSchema, relationships_in};

/// Folds each activity's patch over `initial`, in the order given.
///
/// Later activities overwrite earlier ones field by field. Both the seed and
/// every patch are filtered through [`relationships_in`] first, and column
/// values the schema rejects are dropped so they never shadow valid ones.
pub fn merged_datum_from_activities<'a, I>(
    activities: I,
    model: &ModelSchema,
    initial: Option<&FieldMap>,
) -> FieldMap
where
    I: IntoIterator<Item = &'a Activity>,
{
    let seed = initial
        .map(|datum| applicable(datum, model))
        .unwrap_or_default();

    activities.into_iter().fold(seed, |merged, activity| {
        merged.merged(&applicable(&activity.patch, model))
    })
}

fn applicable(fields: &FieldMap, model: &ModelSchema) -> FieldMap {
    let mut fields = relationships_in(fields, model);
    model.discard_invalid(&mut fields);
    fields
}
